/*!
Single-run entry points that select the sampler from an [`Algorithm`] value.

This is the surface an application drives: pick an algorithm together with its
parameters, hand over a density, a starting point, the run lengths and a seed,
and get back a [`RunResult`].

# Examples

```rust
use mcmc_engine::algorithm::{sample, Algorithm};
use mcmc_engine::config::{HmcParams, MetropolisParams, RunParams};
use mcmc_engine::distributions::Gaussian1D;

let run = RunParams::new(2_000, 200);
let target = Gaussian1D::standard();

let random_walk = Algorithm::RandomWalk(MetropolisParams::new(1.0));
let mh = sample(target, random_walk, &[0.0], run, 42).unwrap();

let hamiltonian = Algorithm::Hamiltonian(HmcParams::default());
let hmc = sample(target, hamiltonian, &[0.0], run, 42).unwrap();

assert_eq!(mh.chain.nrows(), 2_000);
assert!(hmc.acceptance_rate > mh.acceptance_rate);
```
*/

use std::fmt;

use num_traits::Float;
use rand::distributions::{Distribution, Standard};
use rand_distr::StandardNormal;

use crate::config::{HmcParams, MetropolisParams, RunParams};
use crate::core::{run_chain, run_chain_cancellable, CancellationToken, MarkovChain, RunResult};
use crate::distributions::Density;
use crate::error::Result;
use crate::gradient::{GradientSource, NumericalGradient};
use crate::hmc::HMCMarkovChain;
use crate::metropolis_hastings::MHMarkovChain;
use crate::proposal::IsotropicGaussian;

/// The available samplers and their parameters.
///
/// `MetropolisHastings` and `RandomWalk` run the same engine: with a
/// symmetric Gaussian proposal the Hastings correction vanishes. Both names
/// are kept because callers select them separately.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Algorithm<T> {
    MetropolisHastings(MetropolisParams<T>),
    RandomWalk(MetropolisParams<T>),
    Hamiltonian(HmcParams<T>),
}

impl<T: Float> Algorithm<T> {
    /// Checks the parameters without running anything.
    pub fn validate(&self) -> Result<()> {
        match self {
            Algorithm::MetropolisHastings(params) | Algorithm::RandomWalk(params) => {
                params.validate()
            }
            Algorithm::Hamiltonian(params) => params.validate(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::MetropolisHastings(_) => "Metropolis-Hastings",
            Algorithm::RandomWalk(_) => "Random Walk Metropolis",
            Algorithm::Hamiltonian(_) => "Hamiltonian Monte Carlo",
        }
    }
}

impl<T: Float> fmt::Display for Algorithm<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Runs `algorithm` on `target` from `initial_state`.
///
/// Hamiltonian runs estimate the gradient with
/// [`NumericalGradient`] on `target`; use [`sample_with_gradient`] to supply
/// one.
pub fn sample<T, D>(
    target: D,
    algorithm: Algorithm<T>,
    initial_state: &[T],
    run: RunParams,
    seed: u64,
) -> Result<RunResult<T>>
where
    T: Float,
    D: Density<T> + Clone,
    StandardNormal: Distribution<T>,
    Standard: Distribution<T>,
{
    let gradient = NumericalGradient::new(target.clone());
    dispatch(target, gradient, algorithm, initial_state, run, seed, None)
}

/// Like [`sample`], with an explicit gradient of the log-density for
/// Hamiltonian runs. Metropolis runs ignore `gradient`.
///
/// # Examples
///
/// ```rust
/// use mcmc_engine::algorithm::{sample_with_gradient, Algorithm};
/// use mcmc_engine::config::{HmcParams, RunParams};
/// use mcmc_engine::distributions::Gaussian1D;
///
/// let grad = |x: &[f64]| vec![-x[0]];
/// let result = sample_with_gradient(
///     Gaussian1D::standard(),
///     grad,
///     Algorithm::Hamiltonian(HmcParams::new(0.1, 10)),
///     &[0.0],
///     RunParams::new(500, 50),
///     7,
/// )
/// .unwrap();
/// assert_eq!(result.acceptance_history.len(), 500);
/// ```
pub fn sample_with_gradient<T, D, G>(
    target: D,
    gradient: G,
    algorithm: Algorithm<T>,
    initial_state: &[T],
    run: RunParams,
    seed: u64,
) -> Result<RunResult<T>>
where
    T: Float,
    D: Density<T>,
    G: GradientSource<T>,
    StandardNormal: Distribution<T>,
    Standard: Distribution<T>,
{
    dispatch(target, gradient, algorithm, initial_state, run, seed, None)
}

/// Like [`sample`], but stops with [`McmcError::Cancelled`](crate::error::McmcError::Cancelled)
/// as soon as `token` is cancelled. Intended for runs offloaded to a worker
/// thread.
///
/// # Examples
///
/// ```rust
/// use mcmc_engine::algorithm::{sample_cancellable, Algorithm};
/// use mcmc_engine::config::{MetropolisParams, RunParams};
/// use mcmc_engine::core::CancellationToken;
/// use mcmc_engine::distributions::Gaussian1D;
/// use mcmc_engine::error::McmcError;
///
/// let token = CancellationToken::new();
/// let worker = {
///     let token = token.clone();
///     std::thread::spawn(move || {
///         let algorithm = Algorithm::MetropolisHastings(MetropolisParams::default());
///         let run = RunParams::default();
///         sample_cancellable(Gaussian1D::standard(), algorithm, &[0.0], run, 1, &token)
///     })
/// };
/// let result = worker.join().unwrap();
/// assert!(result.is_ok());
///
/// token.cancel();
/// let algorithm = Algorithm::RandomWalk(MetropolisParams::default());
/// let run = RunParams::default();
/// let cancelled = sample_cancellable(Gaussian1D::standard(), algorithm, &[0.0], run, 1, &token);
/// assert_eq!(cancelled, Err(McmcError::Cancelled { completed: 0 }));
/// ```
pub fn sample_cancellable<T, D>(
    target: D,
    algorithm: Algorithm<T>,
    initial_state: &[T],
    run: RunParams,
    seed: u64,
    token: &CancellationToken,
) -> Result<RunResult<T>>
where
    T: Float,
    D: Density<T> + Clone,
    StandardNormal: Distribution<T>,
    Standard: Distribution<T>,
{
    let gradient = NumericalGradient::new(target.clone());
    dispatch(target, gradient, algorithm, initial_state, run, seed, Some(token))
}

/// [`sample_with_gradient`] that can be stopped through `token`, as in
/// [`sample_cancellable`].
pub fn sample_with_gradient_cancellable<T, D, G>(
    target: D,
    gradient: G,
    algorithm: Algorithm<T>,
    initial_state: &[T],
    run: RunParams,
    seed: u64,
    token: &CancellationToken,
) -> Result<RunResult<T>>
where
    T: Float,
    D: Density<T>,
    G: GradientSource<T>,
    StandardNormal: Distribution<T>,
    Standard: Distribution<T>,
{
    dispatch(target, gradient, algorithm, initial_state, run, seed, Some(token))
}

fn dispatch<T, D, G>(
    target: D,
    gradient: G,
    algorithm: Algorithm<T>,
    initial_state: &[T],
    run: RunParams,
    seed: u64,
    token: Option<&CancellationToken>,
) -> Result<RunResult<T>>
where
    T: Float,
    D: Density<T>,
    G: GradientSource<T>,
    StandardNormal: Distribution<T>,
    Standard: Distribution<T>,
{
    algorithm.validate()?;
    log::debug!(
        "{algorithm}: {} burn-in + {} recorded iterations, seed {seed}",
        run.n_discard,
        run.n_collect
    );
    match algorithm {
        Algorithm::MetropolisHastings(params) | Algorithm::RandomWalk(params) => {
            let proposal = IsotropicGaussian::new(params.step_size)?;
            let mut chain = MHMarkovChain::new(target, proposal, initial_state, seed)?;
            execute(&mut chain, run, token)
        }
        Algorithm::Hamiltonian(params) => {
            let mut chain = HMCMarkovChain::new(target, gradient, initial_state, params, seed)?;
            execute(&mut chain, run, token)
        }
    }
}

fn execute<T, M>(
    chain: &mut M,
    run: RunParams,
    token: Option<&CancellationToken>,
) -> Result<RunResult<T>>
where
    T: Float,
    M: MarkovChain<T>,
{
    let result = match token {
        Some(token) => run_chain_cancellable(chain, run.n_collect, run.n_discard, token),
        None => run_chain(chain, run.n_collect, run.n_discard),
    }?;
    log::debug!("finished with acceptance rate {:.3}", result.acceptance_rate);
    Ok(result)
}
