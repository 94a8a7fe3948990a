//! Hamiltonian (Hybrid) Monte Carlo.
//!
//! Each iteration draws a standard normal momentum, simulates Hamiltonian
//! dynamics with the leapfrog integrator and accepts the end point with
//! probability `min(1, exp(H(x, p) - H(x', p')))`, where
//!
//! ```text
//! H(x, p) = -ln(f(x) + 1e-10) + ½ Σ p²
//! ```
//!
//! The sampler only needs point evaluations of the target density and a
//! [`GradientSource`] for ∇ ln f. [`HMC::numerical`] uses central finite
//! differences; an analytic gradient can be passed as a closure.

use num_traits::Float;
use rand::distributions::{Distribution, Standard};
use rand::prelude::*;
use rand_distr::StandardNormal;

use crate::config::HmcParams;
use crate::core::{accept, HasChains, MarkovChain};
use crate::distributions::{checked_density, validate_initial_state, Density};
use crate::error::{McmcError, Result};
use crate::gradient::{GradientSource, NumericalGradient, LOG_FLOOR};
use crate::proposal::momentum;

/// Total energy of a state with density `density` and momentum `momentum`:
/// potential `-ln(density + 1e-10)` plus kinetic `½ Σ p²`.
///
/// # Examples
///
/// ```rust
/// use mcmc_engine::hmc::hamiltonian;
///
/// let h = hamiltonian(1.0_f64, &[1.0, 1.0]);
/// assert!((h - 1.0).abs() < 1e-9);
/// ```
pub fn hamiltonian<T: Float>(density: T, momentum: &[T]) -> T {
    let half = T::from(0.5).unwrap();
    let potential = -(density + T::from(LOG_FLOOR).unwrap()).ln();
    let kinetic = momentum.iter().fold(T::zero(), |acc, &p| acc + p * p) * half;
    potential + kinetic
}

fn checked_gradient<T, G>(gradient: &G, position: &[T]) -> Result<Vec<T>>
where
    G: GradientSource<T> + ?Sized,
{
    let grad = gradient.grad_log_density(position);
    if grad.len() != position.len() {
        return Err(McmcError::DimensionMismatch {
            expected: position.len(),
            found: grad.len(),
        });
    }
    Ok(grad)
}

/**
Simulates `n_leapfrog` leapfrog steps from `(position, momentum)`.

The momentum gets a half step, then the position and momentum alternate full
steps with the last momentum update being a half step again. The gradient is
re-evaluated at every intermediate position (`n_leapfrog + 1` evaluations in
total). The returned momentum is negated, which makes the map its own inverse.

Fails if the gradient does not have the dimension of the position.

# Examples

```rust
use mcmc_engine::hmc::leapfrog;

let grad = |x: &[f64]| vec![-x[0]];
let (x, p) = leapfrog(&grad, &[1.0], &[0.0], 0.1, 1).unwrap();
assert!((x[0] - 0.995).abs() < 1e-12);
assert!((p[0] - 0.09975).abs() < 1e-12);
```
*/
pub fn leapfrog<T, G>(
    gradient: &G,
    position: &[T],
    momentum: &[T],
    step_size: T,
    n_leapfrog: usize,
) -> Result<(Vec<T>, Vec<T>)>
where
    T: Float,
    G: GradientSource<T> + ?Sized,
{
    let half_step = step_size * T::from(0.5).unwrap();
    let mut x = position.to_vec();
    let mut p = momentum.to_vec();

    let grad = checked_gradient(gradient, &x)?;
    p.iter_mut().zip(&grad).for_each(|(p, &g)| *p = *p + half_step * g);

    for i in 0..n_leapfrog {
        x.iter_mut().zip(&p).for_each(|(x, &p)| *x = *x + step_size * p);
        if i + 1 < n_leapfrog {
            let grad = checked_gradient(gradient, &x)?;
            p.iter_mut().zip(&grad).for_each(|(p, &g)| *p = *p + step_size * g);
        }
    }

    let grad = checked_gradient(gradient, &x)?;
    p.iter_mut().zip(&grad).for_each(|(p, &g)| *p = *p + half_step * g);
    p.iter_mut().for_each(|p| *p = -*p);

    Ok((x, p))
}

/// A Hamiltonian Monte Carlo sampler running several independent
/// [`HMCMarkovChain`]s.
///
/// # Type Parameters
///
/// * `T`: Floating-point type for numerical calculations.
/// * `D`: The target density.
/// * `G`: The source of ∇ ln f.
#[derive(Debug, Clone)]
pub struct HMC<T, D, G> {
    pub target: D,
    pub gradient: G,
    /// Step size and number of leapfrog steps shared by all chains.
    pub params: HmcParams<T>,
    pub chains: Vec<HMCMarkovChain<T, D, G>>,
    /// The global random seed.
    pub seed: u64,
}

/// A single HMC chain.
#[derive(Debug, Clone)]
pub struct HMCMarkovChain<T, D, G> {
    pub target: D,
    pub gradient: G,
    pub step_size: T,
    pub n_leapfrog: usize,
    pub current_state: Vec<T>,
    current_density: T,
    pub seed: u64,
    pub rng: SmallRng,
}

impl<T, D, G> HMC<T, D, G>
where
    T: Float + Send,
    D: Density<T> + Clone + Send,
    G: GradientSource<T> + Clone + Send,
    StandardNormal: Distribution<T>,
    Standard: Distribution<T>,
{
    /// Creates an HMC sampler with `n_chains` chains, all starting at
    /// `initial_state`.
    ///
    /// Fails if `params` are invalid, if `initial_state` is unusable for
    /// `target`, or if the density at `initial_state` is negative or
    /// non-finite.
    pub fn new(
        target: D,
        gradient: G,
        initial_state: &[T],
        params: HmcParams<T>,
        n_chains: usize,
    ) -> Result<Self> {
        params.validate()?;
        let seed = thread_rng().gen::<u64>();
        let chains = (0..n_chains)
            .map(|i| {
                HMCMarkovChain::new(
                    target.clone(),
                    gradient.clone(),
                    initial_state,
                    params,
                    seed.wrapping_add(i as u64),
                )
            })
            .collect::<Result<Vec<_>>>()?;
        log::debug!(
            "Created HMC sampler with {n_chains} chains, step size {:?}, {} leapfrog steps",
            params.step_size.to_f64(),
            params.n_leapfrog
        );
        Ok(Self {
            target,
            gradient,
            params,
            chains,
            seed,
        })
    }

    /// Sets a new global seed. Chain `i` is reseeded with `seed + i`.
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

impl<T, D> HMC<T, D, NumericalGradient<T, D>>
where
    T: Float + Send,
    D: Density<T> + Clone + Send,
    StandardNormal: Distribution<T>,
    Standard: Distribution<T>,
{
    /**
    Creates an HMC sampler whose gradient is estimated by central finite
    differences of the target density.

    # Examples

    ```rust
    use mcmc_engine::config::HmcParams;
    use mcmc_engine::core::ChainRunner;
    use mcmc_engine::distributions::Gaussian1D;
    use mcmc_engine::hmc::HMC;

    let mut hmc = HMC::numerical(Gaussian1D::standard(), &[0.0], HmcParams::default(), 2)
        .unwrap()
        .set_seed(42);
    let results = hmc.run(100, 10).unwrap();
    assert_eq!(results[1].chain.shape(), &[100, 1]);
    ```
    */
    pub fn numerical(
        target: D,
        initial_state: &[T],
        params: HmcParams<T>,
        n_chains: usize,
    ) -> Result<Self> {
        let gradient = NumericalGradient::new(target.clone());
        Self::new(target, gradient, initial_state, params, n_chains)
    }
}

impl<T, D, G> HasChains<T> for HMC<T, D, G>
where
    T: Float + Send,
    D: Density<T> + Clone + Send,
    G: GradientSource<T> + Clone + Send,
    StandardNormal: Distribution<T>,
    Standard: Distribution<T>,
{
    type Chain = HMCMarkovChain<T, D, G>;

    fn chains_mut(&mut self) -> &mut Vec<Self::Chain> {
        &mut self.chains
    }
}

impl<T, D, G> HMCMarkovChain<T, D, G>
where
    T: Float,
    D: Density<T>,
    G: GradientSource<T>,
{
    /// Creates a chain at `initial_state` with a generator seeded by `seed`.
    pub fn new(
        target: D,
        gradient: G,
        initial_state: &[T],
        params: HmcParams<T>,
        seed: u64,
    ) -> Result<Self> {
        params.validate()?;
        validate_initial_state(&target, initial_state)?;
        let current_density = checked_density(&target, initial_state)?;
        Ok(Self {
            target,
            gradient,
            step_size: params.step_size,
            n_leapfrog: params.n_leapfrog,
            current_state: initial_state.to_vec(),
            current_density,
            seed,
            rng: SmallRng::seed_from_u64(seed),
        })
    }
}

impl<T, D, G> MarkovChain<T> for HMCMarkovChain<T, D, G>
where
    T: Float,
    D: Density<T>,
    G: GradientSource<T>,
    StandardNormal: Distribution<T>,
    Standard: Distribution<T>,
{
    /// One HMC iteration.
    ///
    /// Proposals that leave the finite reals, or whose energy difference is
    /// NaN, are rejected.
    fn step(&mut self) -> Result<bool> {
        let p0: Vec<T> = momentum(&mut self.rng, self.current_state.len());
        let h0 = hamiltonian(self.current_density, &p0);

        let (proposed, p1) = leapfrog(
            &self.gradient,
            &self.current_state,
            &p0,
            self.step_size,
            self.n_leapfrog,
        )?;
        if proposed.iter().any(|x| !x.is_finite()) {
            log::debug!("Rejecting HMC proposal with non-finite coordinates");
            return Ok(false);
        }
        let proposed_density = checked_density(&self.target, &proposed)?;
        let h1 = hamiltonian(proposed_density, &p1);

        let log_ratio = h0 - h1;
        if log_ratio.is_nan() {
            log::debug!("Rejecting HMC proposal with undefined energy difference");
            return Ok(false);
        }
        if accept(&mut self.rng, log_ratio.exp().min(T::one())) {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{run_chain, ChainRunner};
    use crate::distributions::{Gaussian1D, Gaussian2D};
    use approx::assert_abs_diff_eq;
    use std::cell::Cell;

    const SEED: u64 = 42;

    fn standard_normal_grad(x: &[f64]) -> Vec<f64> {
        x.iter().map(|v| -v).collect()
    }

    #[test]
    fn hamiltonian_adds_potential_and_kinetic() {
        assert_abs_diff_eq!(hamiltonian(1.0, &[1.0, 1.0]), 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(hamiltonian((-2.0_f64).exp(), &[]), 2.0, epsilon = 1e-8);
        // Zero density is floored, not infinite.
        assert_abs_diff_eq!(hamiltonian(0.0, &[0.0]), -(1e-10_f64).ln(), epsilon = 1e-9);
    }

    #[test]
    fn single_leapfrog_step_by_hand() {
        let (x, p) = leapfrog(&standard_normal_grad, &[1.0], &[0.0], 0.1, 1).unwrap();
        assert_abs_diff_eq!(x[0], 0.995, epsilon = 1e-12);
        assert_abs_diff_eq!(p[0], 0.09975, epsilon = 1e-12);
    }

    #[test]
    fn leapfrog_is_an_involution() {
        let x0 = [0.7, -1.3];
        let p0 = [0.4, 0.9];
        let (x1, p1) = leapfrog(&standard_normal_grad, &x0, &p0, 0.1, 25).unwrap();
        let (x2, p2) = leapfrog(&standard_normal_grad, &x1, &p1, 0.1, 25).unwrap();
        for d in 0..2 {
            assert_abs_diff_eq!(x2[d], x0[d], epsilon = 1e-10);
            assert_abs_diff_eq!(p2[d], p0[d], epsilon = 1e-10);
        }
    }

    #[test]
    fn leapfrog_nearly_conserves_energy() {
        let target = Gaussian1D::standard();
        let x0 = [1.2];
        let p0 = [-0.5];
        let (x1, p1) = leapfrog(&standard_normal_grad, &x0, &p0, 0.01, 100).unwrap();
        let h0 = hamiltonian(target.density(&x0), &p0);
        let h1 = hamiltonian(target.density(&x1), &p1);
        assert_abs_diff_eq!(h0, h1, epsilon = 1e-4);
    }

    #[test]
    fn gradient_is_evaluated_at_every_substep() {
        let calls = Cell::new(0);
        let counting = |x: &[f64]| {
            calls.set(calls.get() + 1);
            standard_normal_grad(x)
        };
        leapfrog(&counting, &[0.0], &[1.0], 0.05, 10).unwrap();
        assert_eq!(calls.get(), 11);
    }

    #[test]
    fn gradient_dimension_is_checked() {
        let wrong = |_: &[f64]| vec![0.0];
        assert_eq!(
            leapfrog(&wrong, &[0.0, 0.0], &[1.0, 1.0], 0.1, 3),
            Err(McmcError::DimensionMismatch {
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn non_finite_proposals_are_rejected() {
        let exploding = |_: &[f64]| vec![f64::INFINITY];
        let mut chain = HMCMarkovChain::new(
            Gaussian1D::standard(),
            exploding,
            &[0.5],
            HmcParams::default(),
            SEED,
        )
        .unwrap();
        for _ in 0..20 {
            assert_eq!(chain.step(), Ok(false));
        }
        assert_eq!(chain.current_state(), &[0.5]);
    }

    #[test]
    fn invalid_params_are_rejected() {
        let params = HmcParams::new(0.1, 0);
        assert_eq!(
            HMC::numerical(Gaussian1D::standard(), &[0.0], params, 1).err(),
            Some(McmcError::InvalidLeapfrogSteps)
        );
        let params = HmcParams::new(-0.1, 10);
        assert_eq!(
            HMC::numerical(Gaussian1D::standard(), &[0.0], params, 1).err(),
            Some(McmcError::InvalidStepSize(-0.1))
        );
    }

    #[test]
    fn standard_normal_mean() {
        let params = HmcParams::new(0.05, 10);
        let mut chain = HMCMarkovChain::new(
            Gaussian1D::standard(),
            NumericalGradient::new(Gaussian1D::standard()),
            &[0.0],
            params,
            SEED,
        )
        .unwrap();
        let result = run_chain(&mut chain, 5_000, 500).unwrap();
        let mean = result.chain.column(0).mean().unwrap();
        assert!(mean.abs() < 0.2, "Expected mean near 0, got {mean}");
        assert!(result.acceptance_rate > 0.95);
    }

    #[test]
    fn correlated_gaussian_moments() {
        let target = Gaussian2D::new([1.0, -1.0], [1.0, 2.0], 0.6);
        let mut hmc = HMC::numerical(target, &[0.0, 0.0], HmcParams::new(0.2, 10), 4)
            .unwrap()
            .set_seed(SEED);
        let results = hmc.run(5_000, 500).unwrap();
        for result in &results {
            let mean = result.chain.mean_axis(ndarray::Axis(0)).unwrap();
            assert_abs_diff_eq!(mean[0], 1.0, epsilon = 0.25);
            assert_abs_diff_eq!(mean[1], -1.0, epsilon = 0.5);
            assert!(result.acceptance_rate > 0.7);
        }
        let var = results[0].chain.column(1).var(0.0);
        assert_abs_diff_eq!(var, 4.0, epsilon = 1.0);
    }

    #[test]
    fn analytic_and_numerical_gradients_agree() {
        let params = HmcParams::new(0.1, 10);
        let mut analytic = HMCMarkovChain::new(
            Gaussian1D::standard(),
            standard_normal_grad,
            &[0.3],
            params,
            SEED,
        )
        .unwrap();
        let mut numerical = HMCMarkovChain::new(
            Gaussian1D::standard(),
            NumericalGradient::new(Gaussian1D::standard()),
            &[0.3],
            params,
            SEED,
        )
        .unwrap();
        let a = run_chain(&mut analytic, 200, 0).unwrap();
        let n = run_chain(&mut numerical, 200, 0).unwrap();
        assert_eq!(a.acceptance_history.len(), n.acceptance_history.len());
        assert_abs_diff_eq!(a.chain, n.chain, epsilon = 1e-3);
    }

    #[test]
    fn chains_are_seeded_in_sequence() {
        let hmc = HMC::numerical(Gaussian1D::standard(), &[0.0], HmcParams::default(), 3)
            .unwrap()
            .set_seed(7);
        let seeds: Vec<u64> = hmc.chains.iter().map(|c| c.seed).collect();
        assert_eq!(seeds, vec![7, 8, 9]);
    }
}
