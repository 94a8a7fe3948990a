/*!
Target densities the samplers draw from.

A target only has to implement [`Density`]: a point evaluation of a (possibly
unnormalized) probability density. Any `Fn(&[T]) -> T` closure already is one,
two-argument functions are adapted with [`Bivariate`] and independent 1D
densities are combined with [`Product`].

This module is generic over the floating-point precision (e.g. `f32` or `f64`)
using [`num_traits::Float`].

# Examples

```rust
use mcmc_engine::distributions::{Bivariate, Density, Gaussian1D, Product, Uniform};

// A closure is a density.
let bump = |x: &[f64]| (-x[0] * x[0]).exp();
assert_eq!(bump.density(&[0.0]), 1.0);

// Two-argument form, as used for 2D targets.
let flat = Bivariate::new(|x: f64, y: f64| if x.abs() < 1.0 && y.abs() < 1.0 { 0.25 } else { 0.0 });
assert_eq!(flat.density(&[0.5, -0.5]), 0.25);

// A 3D target as the product of three 1D densities.
let cube = Product::new(vec![Uniform::new(-1.0, 1.0); 3]);
assert_eq!(cube.density(&[0.0, 0.0, 0.0]), 0.125);

let normal = Gaussian1D::<f64>::standard();
assert!((normal.density(&[0.0]) - 0.3989422804014327).abs() < 1e-12);
```
*/

use num_traits::Float;
use std::f64::consts::PI;

use crate::error::{McmcError, Result};

/// A (possibly unnormalized) probability density over `T`-valued coordinates.
///
/// Implementations must return a finite, non-negative value for every finite
/// position. Zero is allowed and marks points outside the support. The
/// samplers reject anything else with [`McmcError::InvalidDensity`].
pub trait Density<T> {
    /// Evaluates the density at `position`.
    fn density(&self, position: &[T]) -> T;

    /// The dimensionality this density is defined for, if it is fixed.
    fn dim(&self) -> Option<usize> {
        None
    }
}

impl<T, F> Density<T> for F
where
    F: Fn(&[T]) -> T,
{
    fn density(&self, position: &[T]) -> T {
        self(position)
    }
}

/// Adapts a two-argument function `f(x, y)` into a 2D [`Density`].
///
/// # Panics
///
/// [`Density::density`] panics unless the position has exactly two
/// coordinates. The samplers check positions against [`Density::dim`] before
/// evaluating; direct callers such as [`crate::gradient::gradient`] do not.
#[derive(Debug, Clone, Copy)]
pub struct Bivariate<F> {
    f: F,
}

impl<F> Bivariate<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<T: Copy, F: Fn(T, T) -> T> Density<T> for Bivariate<F> {
    fn density(&self, position: &[T]) -> T {
        match *position {
            [x, y] => (self.f)(x, y),
            _ => panic!(
                "Bivariate density needs 2 coordinates, got {}",
                position.len()
            ),
        }
    }

    fn dim(&self) -> Option<usize> {
        Some(2)
    }
}

/// A 1D normal distribution with the given mean and standard deviation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gaussian1D<T: Float> {
    pub mean: T,
    pub std: T,
}

impl<T: Float> Gaussian1D<T> {
    pub fn new(mean: T, std: T) -> Self {
        Self { mean, std }
    }

    /// The standard normal N(0, 1).
    pub fn standard() -> Self {
        Self::new(T::zero(), T::one())
    }
}

impl<T: Float> Density<T> for Gaussian1D<T> {
    fn density(&self, position: &[T]) -> T {
        let two = T::from(2.0).unwrap();
        let z = (position[0] - self.mean) / self.std;
        let coefficient = T::one() / (self.std * (two * T::from(PI).unwrap()).sqrt());
        coefficient * (-z * z / two).exp()
    }

    fn dim(&self) -> Option<usize> {
        Some(1)
    }
}

/// The uniform distribution on the closed interval `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Uniform<T: Float> {
    pub min: T,
    pub max: T,
}

impl<T: Float> Uniform<T> {
    pub fn new(min: T, max: T) -> Self {
        Self { min, max }
    }
}

impl<T: Float> Density<T> for Uniform<T> {
    fn density(&self, position: &[T]) -> T {
        let x = position[0];
        if x >= self.min && x <= self.max {
            T::one() / (self.max - self.min)
        } else {
            T::zero()
        }
    }

    fn dim(&self) -> Option<usize> {
        Some(1)
    }
}

/**
A bivariate normal distribution parameterized by its means, standard deviations
and the correlation coefficient between the two coordinates.

# Examples

```rust
use mcmc_engine::distributions::{Density, Gaussian2D};

let gauss = Gaussian2D::new([0.0, 0.0], [1.0, 1.0], 0.0);
let p = gauss.density(&[0.0, 0.0]);
assert!((p - 1.0 / (2.0 * std::f64::consts::PI)).abs() < 1e-12);
```
*/
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gaussian2D<T: Float> {
    pub mean: [T; 2],
    pub std: [T; 2],
    pub correlation: T,
}

impl<T: Float> Gaussian2D<T> {
    pub fn new(mean: [T; 2], std: [T; 2], correlation: T) -> Self {
        Self {
            mean,
            std,
            correlation,
        }
    }

    /// Covariance matrix in row-major order.
    pub fn cov(&self) -> [[T; 2]; 2] {
        let off = self.correlation * self.std[0] * self.std[1];
        [
            [self.std[0] * self.std[0], off],
            [off, self.std[1] * self.std[1]],
        ]
    }
}

impl<T: Float> Density<T> for Gaussian2D<T> {
    fn density(&self, position: &[T]) -> T {
        let two = T::from(2.0).unwrap();
        let rho = self.correlation;
        let one_m_rho2 = T::one() - rho * rho;
        let z1 = (position[0] - self.mean[0]) / self.std[0];
        let z2 = (position[1] - self.mean[1]) / self.std[1];
        let coefficient = T::one()
            / (two * T::from(PI).unwrap() * self.std[0] * self.std[1] * one_m_rho2.sqrt());
        let exponent = -(z1 * z1 + z2 * z2 - two * rho * z1 * z2) / (two * one_m_rho2);
        coefficient * exponent.exp()
    }

    fn dim(&self) -> Option<usize> {
        Some(2)
    }
}

/// Joint density of independent coordinates: coordinate `i` is distributed
/// according to `marginals[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Product<D> {
    pub marginals: Vec<D>,
}

impl<D> Product<D> {
    pub fn new(marginals: Vec<D>) -> Self {
        Self { marginals }
    }
}

impl<T: Float, D: Density<T>> Density<T> for Product<D> {
    fn density(&self, position: &[T]) -> T {
        self.marginals
            .iter()
            .zip(position)
            .fold(T::one(), |acc, (marginal, x)| {
                acc * marginal.density(std::slice::from_ref(x))
            })
    }

    fn dim(&self) -> Option<usize> {
        Some(self.marginals.len())
    }
}

/// Evaluates `target` at `position` and enforces the [`Density`] contract.
pub(crate) fn checked_density<T, D>(target: &D, position: &[T]) -> Result<T>
where
    T: Float,
    D: Density<T> + ?Sized,
{
    let value = target.density(position);
    if value.is_finite() && value >= T::zero() {
        Ok(value)
    } else {
        Err(McmcError::InvalidDensity {
            value: value.to_f64().unwrap_or(f64::NAN),
        })
    }
}

/// Checks that `initial_state` is a usable starting point for `target`.
pub(crate) fn validate_initial_state<T, D>(target: &D, initial_state: &[T]) -> Result<()>
where
    T: Float,
    D: Density<T> + ?Sized,
{
    if initial_state.is_empty() {
        return Err(McmcError::ZeroDimension);
    }
    if let Some(expected) = target.dim() {
        if expected != initial_state.len() {
            return Err(McmcError::DimensionMismatch {
                expected,
                found: initial_state.len(),
            });
        }
    }
    if initial_state.iter().any(|x| !x.is_finite()) {
        return Err(McmcError::InvalidInitialState);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    #[should_panic(expected = "Bivariate density needs 2 coordinates, got 1")]
    fn bivariate_rejects_wrong_dimension() {
        let flat = Bivariate::new(|_: f64, _: f64| 1.0);
        flat.density(&[0.5]);
    }

    #[test]
    fn gaussian_1d_density() {
        let normal = Gaussian1D::standard();
        assert_abs_diff_eq!(normal.density(&[1.0]), 0.24197072451914337, epsilon = 1e-12);

        let shifted = Gaussian1D::new(2.0_f32, 0.5);
        assert_abs_diff_eq!(shifted.density(&[2.0]), 0.7978846, epsilon = 1e-6);
    }

    #[test]
    fn uniform_support_is_closed() {
        let u = Uniform::new(-2.0, 2.0);
        assert_eq!(u.density(&[-2.0]), 0.25);
        assert_eq!(u.density(&[2.0]), 0.25);
        assert_eq!(u.density(&[2.0 + 1e-12]), 0.0);
        assert_eq!(u.density(&[-7.0]), 0.0);
    }

    #[test]
    fn gaussian_2d_matches_product_without_correlation() {
        let joint = Gaussian2D::new([1.0, -1.0], [2.0, 0.5], 0.0);
        let product = Product::new(vec![Gaussian1D::new(1.0, 2.0), Gaussian1D::new(-1.0, 0.5)]);
        for point in [[0.0, 0.0], [1.0, -1.0], [3.5, 0.2]] {
            assert_abs_diff_eq!(
                joint.density(&point),
                product.density(&point),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn gaussian_2d_cov() {
        let gauss = Gaussian2D::new([0.0, 0.0], [2.0, 3.0], 0.5);
        assert_eq!(gauss.cov(), [[4.0, 3.0], [3.0, 9.0]]);
    }

    #[test]
    fn bivariate_adapter() {
        let f = Bivariate::new(|x: f64, y: f64| (-(x * x + y * y)).exp());
        assert_eq!(f.dim(), Some(2));
        assert_abs_diff_eq!(f.density(&[1.0, 1.0]), (-2.0_f64).exp(), epsilon = 1e-15);
    }

    #[test]
    fn checked_density_rejects_contract_violations() {
        let negative = |_: &[f64]| -1.0;
        let nan = |_: &[f64]| f64::NAN;
        let zero = |_: &[f64]| 0.0;
        assert_eq!(
            checked_density(&negative, &[0.0]),
            Err(McmcError::InvalidDensity { value: -1.0 })
        );
        assert!(checked_density(&nan, &[0.0]).is_err());
        assert_eq!(checked_density(&zero, &[0.0]), Ok(0.0));
    }

    #[test]
    fn initial_state_validation() {
        let target = Gaussian2D::new([0.0, 0.0], [1.0, 1.0], 0.0);
        let empty: [f64; 0] = [];
        assert_eq!(
            validate_initial_state(&target, &empty),
            Err(McmcError::ZeroDimension)
        );
        assert_eq!(
            validate_initial_state(&target, &[0.0]),
            Err(McmcError::DimensionMismatch {
                expected: 2,
                found: 1
            })
        );
        assert_eq!(
            validate_initial_state(&target, &[0.0, f64::INFINITY]),
            Err(McmcError::InvalidInitialState)
        );
        assert!(validate_initial_state(&target, &[0.0, 1.0]).is_ok());
    }
}
