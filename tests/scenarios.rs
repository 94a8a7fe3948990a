//! End-to-end scenarios through the public API: support constraints, step size
//! limits, reproducibility and the gradient estimator.

use mcmc_engine::algorithm::{sample, sample_with_gradient, Algorithm};
use mcmc_engine::config::{HmcParams, MetropolisParams, RunParams};
use mcmc_engine::distributions::{Bivariate, Gaussian1D, Product, Uniform};
use mcmc_engine::gradient::{gradient, DEFAULT_EPSILON};
use mcmc_engine::stats::{autocorrelation, DEFAULT_MAX_LAG};

const SEED: u64 = 42;

#[test]
fn uniform_target_keeps_chain_in_support() {
    let algorithm = Algorithm::MetropolisHastings(MetropolisParams::new(0.5));
    let run = RunParams::new(1_000, 0);
    let result = sample(Uniform::new(-2.0, 2.0), algorithm, &[0.0], run, SEED).unwrap();
    assert_eq!(result.len(), 1_000);
    assert!(
        result.chain.iter().all(|&x| (-2.0..=2.0).contains(&x)),
        "Expected every sample in [-2, 2]"
    );
}

#[test]
fn uniform_cube_via_product() {
    let cube = Product::new(vec![Uniform::new(-1.0_f64, 1.0); 3]);
    let algorithm = Algorithm::RandomWalk(MetropolisParams::new(0.3));
    let result = sample(cube, algorithm, &[0.0, 0.0, 0.0], RunParams::new(2_000, 100), SEED).unwrap();
    assert_eq!(result.dim(), 3);
    assert!(result.chain.iter().all(|x| x.abs() <= 1.0));
}

#[test]
fn tiny_steps_are_nearly_always_accepted() {
    let algorithm = Algorithm::RandomWalk(MetropolisParams::new(1e-6));
    let result = sample(Gaussian1D::standard(), algorithm, &[0.0], RunParams::default(), SEED).unwrap();
    assert!(
        result.acceptance_rate > 0.95,
        "Expected acceptance > 0.95, got {}",
        result.acceptance_rate
    );
}

#[test]
fn hmc_standard_normal_mean() {
    let algorithm = Algorithm::Hamiltonian(HmcParams::new(0.05, 10));
    let run = RunParams::new(5_000, 500);
    let result = sample(Gaussian1D::standard(), algorithm, &[0.0], run, SEED).unwrap();
    let mean: f64 = result.chain.column(0).mean().unwrap();
    assert!(mean.abs() < 0.2, "Expected mean within 0.2 of 0, got {mean}");
}

#[test]
fn hmc_with_analytic_gradient_on_bivariate_target() {
    // Independent N(1, 1) and N(-1, 1), written in the two-argument form.
    let target = Bivariate::new(|x: f64, y: f64| {
        (-0.5 * ((x - 1.0).powi(2) + (y + 1.0).powi(2))).exp()
    });
    let grad = |p: &[f64]| vec![1.0 - p[0], -1.0 - p[1]];
    let algorithm = Algorithm::Hamiltonian(HmcParams::new(0.2, 10));
    let run = RunParams::new(4_000, 400);
    let result = sample_with_gradient(target, grad, algorithm, &[0.0, 0.0], run, SEED).unwrap();

    let mean = result.chain.mean_axis(ndarray::Axis(0)).unwrap();
    assert!((mean[0] - 1.0).abs() < 0.15, "Mean x: {}", mean[0]);
    assert!((mean[1] + 1.0).abs() < 0.15, "Mean y: {}", mean[1]);
}

#[test]
fn fixed_seed_runs_are_reproducible() {
    let run = RunParams::new(500, 50);
    for algorithm in [
        Algorithm::MetropolisHastings(MetropolisParams::new(0.7)),
        Algorithm::Hamiltonian(HmcParams::default()),
    ] {
        let a = sample(Gaussian1D::standard(), algorithm, &[1.0], run, SEED).unwrap();
        let b = sample(Gaussian1D::standard(), algorithm, &[1.0], run, SEED).unwrap();
        let c = sample(Gaussian1D::standard(), algorithm, &[1.0], run, SEED + 1).unwrap();
        assert_eq!(a, b, "{algorithm}");
        assert_ne!(a.chain, c.chain, "{algorithm}");
    }
}

#[test]
fn numerical_gradient_of_standard_normal() {
    let normal = Gaussian1D::standard();
    for x in [-2.0, -1.0, 0.0, 1.0, 2.0] {
        let g = gradient(&normal, &[x], DEFAULT_EPSILON);
        assert!((g[0] + x).abs() < 1e-3, "x = {x}: got {}", g[0]);
    }
}

#[test]
fn sampled_chain_autocorrelation_starts_at_one() {
    let algorithm = Algorithm::RandomWalk(MetropolisParams::new(0.5));
    let result = sample(Gaussian1D::standard(), algorithm, &[0.0], RunParams::default(), SEED).unwrap();
    let acf = autocorrelation(result.chain.view(), 0, DEFAULT_MAX_LAG).unwrap();
    assert_eq!(acf.len(), DEFAULT_MAX_LAG + 1);
    assert!((acf[0].value - 1.0).abs() < 1e-12);
    // Random walk samples are positively correlated at short lags.
    assert!(acf[1].value > 0.5);
}
