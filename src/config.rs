/*!
Immutable parameter structs for sampler runs.

Every run takes its parameters explicitly. The defaults mirror the values an
interactive session starts from: 1000 recorded iterations after 100 burn-in
iterations, a random-walk step of 0.5 and, for HMC, a step of 0.05 with 10
leapfrog steps.

# Examples

```rust
use mcmc_engine::config::{HmcParams, RunParams};

let run = RunParams::default().with_n_collect(5_000).with_n_discard(500);
assert_eq!(run.total(), 5_500);

let hmc = HmcParams::new(0.05_f64, 10);
assert!(hmc.validate().is_ok());
assert!(HmcParams::new(0.05_f64, 0).validate().is_err());
```
*/

use num_traits::Float;

use crate::error::{McmcError, Result};

/// How many iterations a run performs and how many of them it records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunParams {
    /// Number of recorded iterations (the chain length).
    pub n_collect: usize,
    /// Number of burn-in iterations discarded before recording starts.
    pub n_discard: usize,
}

impl RunParams {
    pub fn new(n_collect: usize, n_discard: usize) -> Self {
        Self {
            n_collect,
            n_discard,
        }
    }

    pub fn with_n_collect(mut self, n_collect: usize) -> Self {
        self.n_collect = n_collect;
        self
    }

    pub fn with_n_discard(mut self, n_discard: usize) -> Self {
        self.n_discard = n_discard;
        self
    }

    /// Total number of iterations, burn-in included.
    pub fn total(&self) -> usize {
        self.n_collect + self.n_discard
    }
}

impl Default for RunParams {
    fn default() -> Self {
        Self::new(1000, 100)
    }
}

/// Parameters of the (random walk) Metropolis sampler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetropolisParams<T> {
    /// Standard deviation of the Gaussian perturbation added to each coordinate.
    pub step_size: T,
}

impl<T: Float> MetropolisParams<T> {
    pub fn new(step_size: T) -> Self {
        Self { step_size }
    }

    pub fn validate(&self) -> Result<()> {
        validate_step_size(self.step_size)
    }
}

impl<T: Float> Default for MetropolisParams<T> {
    fn default() -> Self {
        Self::new(T::from(0.5).unwrap())
    }
}

/// Parameters of the Hamiltonian Monte Carlo sampler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HmcParams<T> {
    /// Leapfrog integrator step size.
    pub step_size: T,
    /// Number of leapfrog steps per iteration.
    pub n_leapfrog: usize,
}

impl<T: Float> HmcParams<T> {
    pub fn new(step_size: T, n_leapfrog: usize) -> Self {
        Self {
            step_size,
            n_leapfrog,
        }
    }

    pub fn with_step_size(mut self, step_size: T) -> Self {
        self.step_size = step_size;
        self
    }

    pub fn with_n_leapfrog(mut self, n_leapfrog: usize) -> Self {
        self.n_leapfrog = n_leapfrog;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_step_size(self.step_size)?;
        if self.n_leapfrog == 0 {
            return Err(McmcError::InvalidLeapfrogSteps);
        }
        Ok(())
    }
}

impl<T: Float> Default for HmcParams<T> {
    fn default() -> Self {
        Self::new(T::from(0.05).unwrap(), 10)
    }
}

pub(crate) fn validate_step_size<T: Float>(step_size: T) -> Result<()> {
    if step_size.is_finite() && step_size > T::zero() {
        Ok(())
    } else {
        Err(McmcError::InvalidStepSize(
            step_size.to_f64().unwrap_or(f64::NAN),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_interactive_session() {
        let run = RunParams::default();
        assert_eq!(run.n_collect, 1000);
        assert_eq!(run.n_discard, 100);

        let mh = MetropolisParams::<f64>::default();
        assert_eq!(mh.step_size, 0.5);

        let hmc = HmcParams::<f64>::default();
        assert_eq!(hmc.step_size, 0.05);
        assert_eq!(hmc.n_leapfrog, 10);
    }

    #[test]
    fn step_size_validation() {
        assert!(MetropolisParams::new(0.1_f64).validate().is_ok());
        assert_eq!(
            MetropolisParams::new(0.0_f64).validate(),
            Err(McmcError::InvalidStepSize(0.0))
        );
        assert_eq!(
            MetropolisParams::new(-1.0_f32).validate(),
            Err(McmcError::InvalidStepSize(-1.0))
        );
        assert!(MetropolisParams::new(f64::NAN).validate().is_err());
        assert!(MetropolisParams::new(f64::INFINITY).validate().is_err());
    }

    #[test]
    fn leapfrog_validation() {
        assert_eq!(
            HmcParams::<f64>::default().with_n_leapfrog(0).validate(),
            Err(McmcError::InvalidLeapfrogSteps)
        );
        assert!(HmcParams::<f64>::default()
            .with_step_size(0.2)
            .validate()
            .is_ok());
    }
}
