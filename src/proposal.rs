/*!
Random draws used by the samplers: Gaussian random-walk proposals for
Metropolis and momentum draws for HMC.

All functions take the random number generator explicitly, so every chain can
own its generator and runs stay reproducible.

# Examples

```rust
use mcmc_engine::proposal::{IsotropicGaussian, Proposal};
use rand::rngs::SmallRng;
use rand::SeedableRng;

let mut rng = SmallRng::seed_from_u64(42);
let proposal = IsotropicGaussian::new(0.5).unwrap();
let candidate = proposal.sample(&[0.0, 0.0], &mut rng);
assert_eq!(candidate.len(), 2);
```
*/

use num_traits::Float;
use rand::Rng;
use rand_distr::{Distribution, Normal, StandardNormal};

use crate::config::validate_step_size;
use crate::error::{McmcError, Result};

/// Draws one value from N(`mean`, `std`²).
///
/// `std` must be finite and non-negative.
pub fn normal<T, R>(rng: &mut R, mean: T, std: T) -> Result<T>
where
    T: Float,
    R: Rng + ?Sized,
    StandardNormal: Distribution<T>,
{
    if !std.is_finite() || std < T::zero() {
        return Err(McmcError::InvalidStd(std.to_f64().unwrap_or(f64::NAN)));
    }
    let dist =
        Normal::new(mean, std).map_err(|_| McmcError::InvalidStd(std.to_f64().unwrap_or(f64::NAN)))?;
    Ok(dist.sample(rng))
}

/// Draws a momentum vector with independent standard normal coordinates.
pub fn momentum<T, R>(rng: &mut R, dim: usize) -> Vec<T>
where
    R: Rng + ?Sized,
    StandardNormal: Distribution<T>,
{
    (0..dim).map(|_| StandardNormal.sample(rng)).collect()
}

/// A symmetric proposal mechanism, q(x' | x) = q(x | x').
///
/// Symmetry is what lets the Metropolis sampler accept with the plain density
/// ratio, without a Hastings correction.
pub trait Proposal<T> {
    /// Draws a candidate state given the current one.
    fn sample<R: Rng + ?Sized>(&self, current: &[T], rng: &mut R) -> Vec<T>;
}

/**
An isotropic Gaussian random-walk proposal.

Adds independent Gaussian noise with mean 0 and standard deviation
`step_size` to each coordinate of the current state.
*/
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IsotropicGaussian<T: Float> {
    step_size: T,
}

impl<T: Float> IsotropicGaussian<T> {
    /// Creates the proposal. Fails unless `step_size` is finite and positive.
    pub fn new(step_size: T) -> Result<Self> {
        validate_step_size(step_size)?;
        Ok(Self { step_size })
    }

    pub fn step_size(&self) -> T {
        self.step_size
    }
}

impl<T: Float> Proposal<T> for IsotropicGaussian<T>
where
    StandardNormal: Distribution<T>,
{
    fn sample<R: Rng + ?Sized>(&self, current: &[T], rng: &mut R) -> Vec<T> {
        current
            .iter()
            .map(|&x| {
                let z: T = StandardNormal.sample(rng);
                x + self.step_size * z
            })
            .collect()
    }
}
