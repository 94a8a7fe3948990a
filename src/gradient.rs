//! Gradients of the log-density for gradient-based samplers.
//!
//! [`GradientSource`] is what the HMC sampler consumes. It is implemented by
//! analytic gradients written as closures, by [`NumericalGradient`] which only
//! needs point evaluations of a [`Density`], and, with the `burn` feature, by
//! `AutodiffGradient` which differentiates a log-density through `burn`'s
//! autodiff backend.

use num_traits::Float;

use crate::distributions::Density;

/// Default perturbation for [`gradient`].
pub const DEFAULT_EPSILON: f64 = 1e-5;

/// Added to densities before taking logarithms so that `ln(0)` never occurs.
pub const LOG_FLOOR: f64 = 1e-10;

/// A provider of ∇ log p(x).
pub trait GradientSource<T> {
    /// Returns the gradient of the log-density at `position`. The result has
    /// the same length as `position`.
    fn grad_log_density(&self, position: &[T]) -> Vec<T>;
}

impl<T, F> GradientSource<T> for F
where
    F: Fn(&[T]) -> Vec<T>,
{
    fn grad_log_density(&self, position: &[T]) -> Vec<T> {
        self(position)
    }
}

/**
Estimates ∇ log p(x) with central finite differences.

Coordinate `i` of the result is

```text
(ln(p(x + ε eᵢ) + δ) - ln(p(x - ε eᵢ) + δ)) / 2ε
```

with δ = [`LOG_FLOOR`]. Only coordinate `i` is perturbed; all others keep
their value at `position`. A call costs `2 * position.len()` density
evaluations. Where the density vanishes around `position` the estimate is 0.

# Panics

Whatever `density` does on a position of the wrong length; see
[`Bivariate`](crate::distributions::Bivariate).

# Examples

```rust
use mcmc_engine::distributions::Gaussian1D;
use mcmc_engine::gradient::gradient;

let g = gradient(&Gaussian1D::<f64>::standard(), &[1.5], 1e-5);
assert!((g[0] + 1.5).abs() < 1e-6);
```
*/
pub fn gradient<T, D>(density: &D, position: &[T], epsilon: T) -> Vec<T>
where
    T: Float,
    D: Density<T> + ?Sized,
{
    let floor = T::from(LOG_FLOOR).unwrap();
    let two_eps = epsilon + epsilon;
    let mut shifted = position.to_vec();
    (0..position.len())
        .map(|i| {
            shifted[i] = position[i] + epsilon;
            let plus = density.density(&shifted);
            shifted[i] = position[i] - epsilon;
            let minus = density.density(&shifted);
            shifted[i] = position[i];
            ((plus + floor).ln() - (minus + floor).ln()) / two_eps
        })
        .collect()
}

/// A [`GradientSource`] backed by [`gradient`] on a wrapped density.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericalGradient<T, D> {
    pub target: D,
    pub epsilon: T,
}

impl<T: Float, D: Density<T>> NumericalGradient<T, D> {
    /// Wraps `target` using [`DEFAULT_EPSILON`].
    pub fn new(target: D) -> Self {
        Self {
            target,
            epsilon: T::from(DEFAULT_EPSILON).unwrap(),
        }
    }

    pub fn with_epsilon(mut self, epsilon: T) -> Self {
        self.epsilon = epsilon;
        self
    }
}

impl<T: Float, D: Density<T>> GradientSource<T> for NumericalGradient<T, D> {
    fn grad_log_density(&self, position: &[T]) -> Vec<T> {
        gradient(&self.target, position, self.epsilon)
    }
}

#[cfg(feature = "burn")]
pub use autodiff::AutodiffGradient;

#[cfg(feature = "burn")]
mod autodiff {
    use super::GradientSource;
    use burn::tensor::backend::AutodiffBackend;
    use burn::tensor::{Element, Tensor, TensorData};
    use num_traits::Float;
    use std::marker::PhantomData;

    /// Differentiates a log-density written with `burn` tensor operations.
    ///
    /// The closure receives the position as a rank-1 tensor of length D and
    /// must return the (unnormalized) log-density as a single-element tensor.
    pub struct AutodiffGradient<B, F> {
        log_density: F,
        phantom: PhantomData<B>,
    }

    impl<B, F: Clone> Clone for AutodiffGradient<B, F> {
        fn clone(&self) -> Self {
            Self {
                log_density: self.log_density.clone(),
                phantom: PhantomData,
            }
        }
    }

    impl<B: AutodiffBackend, F> AutodiffGradient<B, F>
    where
        F: Fn(Tensor<B, 1>) -> Tensor<B, 1>,
    {
        pub fn new(log_density: F) -> Self {
            Self {
                log_density,
                phantom: PhantomData,
            }
        }
    }

    impl<T, B, F> GradientSource<T> for AutodiffGradient<B, F>
    where
        T: Float + Element,
        B: AutodiffBackend,
        F: Fn(Tensor<B, 1>) -> Tensor<B, 1>,
    {
        fn grad_log_density(&self, position: &[T]) -> Vec<T> {
            let dim = position.len();
            let data = TensorData::new(position.to_vec(), [dim]);
            let pos = Tensor::<B, 1>::from_data(data, &B::Device::default()).require_grad();
            let logp = (self.log_density)(pos.clone());
            let grads = logp.backward();
            pos.grad(&grads)
                .and_then(|g| g.into_data().convert::<T>().to_vec::<T>().ok())
                .unwrap_or_else(|| vec![T::zero(); dim])
        }
    }

}
