/*!
# Metropolis Sampler

A random-walk Metropolis sampler for any target implementing [`Density`].
Candidates come from a symmetric [`Proposal`] (by default [`IsotropicGaussian`])
and are accepted with probability `min(1, p(x') / p(x))`.

Several independent chains can be run in parallel through [`ChainRunner`](crate::core::ChainRunner).
All chains start at the same state. A global seed keeps runs reproducible: chain
`i` seeds its generator with `seed + i`.

## Zero density

If the density at the current state is exactly 0 (the chain was started
outside the support) every candidate is accepted until the chain reaches a
point of positive density. A candidate with density 0 is never accepted from a
state of positive density.

## Example Usage

```rust
use mcmc_engine::core::ChainRunner;
use mcmc_engine::distributions::Gaussian2D;
use mcmc_engine::metropolis_hastings::MetropolisHastings;
use mcmc_engine::proposal::IsotropicGaussian;

let target = Gaussian2D::new([0.0, 0.0], [1.0, 1.0], 0.5);
let proposal = IsotropicGaussian::new(1.0).unwrap();
let mut mh = MetropolisHastings::new(target, proposal, &[0.0, 0.0], 2)
    .unwrap()
    .set_seed(42);

let results = mh.run(500, 100).unwrap();
assert_eq!(results.len(), 2);
assert_eq!(results[0].chain.shape(), &[500, 2]);
```
*/

use num_traits::Float;
use rand::distributions::{Distribution, Standard};
use rand::prelude::*;

use crate::core::{accept, HasChains, MarkovChain};
use crate::distributions::{checked_density, validate_initial_state, Density};
use crate::error::Result;
use crate::proposal::{IsotropicGaussian, Proposal};

/// Probability of moving from a state with density `current` to one with
/// density `proposed`: `min(1, proposed / current)`, or 1 when `current` is 0.
///
/// # Examples
///
/// ```rust
/// use mcmc_engine::metropolis_hastings::acceptance_ratio;
///
/// assert_eq!(acceptance_ratio(0.5, 0.25), 0.5);
/// assert_eq!(acceptance_ratio(0.2, 0.4), 1.0);
/// assert_eq!(acceptance_ratio(0.0, 0.0), 1.0);
/// ```
pub fn acceptance_ratio<T: Float>(current: T, proposed: T) -> T {
    if current == T::zero() {
        T::one()
    } else {
        (proposed / current).min(T::one())
    }
}

/**
The Metropolis sampler: a set of independent [`MHMarkovChain`]s sharing one
target and one proposal.

# Type Parameters
- `T`: The floating-point type (e.g. `f32` or `f64`).
- `D`: The target density. Must implement [`Density`].
- `Q`: The proposal. Must implement [`Proposal`].
*/
#[derive(Debug, Clone)]
pub struct MetropolisHastings<T: Float, D, Q = IsotropicGaussian<T>> {
    /// The target density we want to sample from.
    pub target: D,
    /// The proposal used to generate candidate states.
    pub proposal: Q,
    /// The independent Markov chains.
    pub chains: Vec<MHMarkovChain<T, D, Q>>,
    /// The global random seed.
    pub seed: u64,
}

/// A single Metropolis chain.
///
/// Each chain owns a copy of the target and the proposal, its current state,
/// the density at that state and a chain-specific random number generator.
#[derive(Debug, Clone)]
pub struct MHMarkovChain<T, D, Q> {
    pub target: D,
    pub proposal: Q,
    pub current_state: Vec<T>,
    current_density: T,
    /// The chain-specific random seed.
    pub seed: u64,
    pub rng: SmallRng,
}

impl<T, D, Q> MetropolisHastings<T, D, Q>
where
    T: Float + Send,
    D: Density<T> + Clone + Send,
    Q: Proposal<T> + Clone + Send,
    Standard: Distribution<T>,
{
    /**
    Creates a sampler with `n_chains` chains, all starting at `initial_state`.

    Fails if `initial_state` is empty, contains non-finite values, does not
    match the dimension of `target`, or if the density at `initial_state` is
    negative or non-finite.

    # Examples

    ```rust
    use mcmc_engine::distributions::Uniform;
    use mcmc_engine::metropolis_hastings::MetropolisHastings;
    use mcmc_engine::proposal::IsotropicGaussian;

    let proposal = IsotropicGaussian::new(0.5).unwrap();
    let mh = MetropolisHastings::new(Uniform::new(-2.0, 2.0), proposal, &[0.0], 3).unwrap();
    assert_eq!(mh.chains.len(), 3);
    assert!(MetropolisHastings::new(Uniform::new(-2.0, 2.0), proposal, &[0.0, 1.0], 3).is_err());
    ```
    */
    pub fn new(target: D, proposal: Q, initial_state: &[T], n_chains: usize) -> Result<Self> {
        let seed = thread_rng().gen::<u64>();
        let chains = (0..n_chains)
            .map(|i| {
                MHMarkovChain::new(
                    target.clone(),
                    proposal.clone(),
                    initial_state,
                    seed.wrapping_add(i as u64),
                )
            })
            .collect::<Result<Vec<_>>>()?;
        log::debug!(
            "Created Metropolis sampler with {n_chains} chains in {} dimensions",
            initial_state.len()
        );
        Ok(Self {
            target,
            proposal,
            chains,
            seed,
        })
    }

    /**
    Sets a new global seed. Chain `i` is reseeded with `seed + i`.

    # Examples

    ```rust
    use mcmc_engine::distributions::Gaussian1D;
    use mcmc_engine::metropolis_hastings::MetropolisHastings;
    use mcmc_engine::proposal::IsotropicGaussian;

    let proposal = IsotropicGaussian::new(1.0).unwrap();
    let mh = MetropolisHastings::new(Gaussian1D::standard(), proposal, &[0.0], 2)
        .unwrap()
        .set_seed(42);
    assert_eq!(mh.chains[0].seed, 42);
    assert_eq!(mh.chains[1].seed, 43);
    ```
    */
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        for (i, chain) in self.chains.iter_mut().enumerate() {
            let chain_seed = seed.wrapping_add(i as u64);
            chain.seed = chain_seed;
            chain.rng = SmallRng::seed_from_u64(chain_seed);
        }
        self
    }
}

impl<T, D, Q> HasChains<T> for MetropolisHastings<T, D, Q>
where
    T: Float + Send,
    D: Density<T> + Clone + Send,
    Q: Proposal<T> + Clone + Send,
    Standard: Distribution<T>,
{
    type Chain = MHMarkovChain<T, D, Q>;

    fn chains_mut(&mut self) -> &mut Vec<Self::Chain> {
        &mut self.chains
    }
}

impl<T, D, Q> MHMarkovChain<T, D, Q>
where
    T: Float,
    D: Density<T>,
    Q: Proposal<T>,
{
    /// Creates a chain at `initial_state` with a generator seeded by `seed`.
    pub fn new(target: D, proposal: Q, initial_state: &[T], seed: u64) -> Result<Self> {
        validate_initial_state(&target, initial_state)?;
        let current_density = checked_density(&target, initial_state)?;
        if current_density == T::zero() {
            log::warn!(
                "Initial state has zero density; candidates are accepted unconditionally until the chain enters the support"
            );
        }
        Ok(Self {
            target,
            proposal,
            current_state: initial_state.to_vec(),
            current_density,
            seed,
            rng: SmallRng::seed_from_u64(seed),
        })
    }

    /// The density at the current state.
    pub fn current_density(&self) -> T {
        self.current_density
    }
}

impl<T, D, Q> MarkovChain<T> for MHMarkovChain<T, D, Q>
where
    T: Float,
    D: Density<T>,
    Q: Proposal<T>,
    Standard: Distribution<T>,
{
    /// Proposes a candidate and accepts it if `u < min(1, p(x') / p(x))` with
    /// `u ~ U[0, 1)`. The candidate density is cached with the state.
    fn step(&mut self) -> Result<bool> {
        let proposed = self.proposal.sample(&self.current_state, &mut self.rng);
        let proposed_density = checked_density(&self.target, &proposed)?;
        let ratio = acceptance_ratio(self.current_density, proposed_density);
        if accept(&mut self.rng, ratio) {
            self.current_state = proposed;
            self.current_density = proposed_density;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn current_state(&self) -> &[T] {
        &self.current_state
    }
}
