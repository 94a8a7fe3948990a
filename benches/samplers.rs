use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use mcmc_engine::algorithm::{sample, Algorithm};
use mcmc_engine::config::{HmcParams, MetropolisParams, RunParams};
use mcmc_engine::distributions::Gaussian2D;
use mcmc_engine::gradient::{gradient, DEFAULT_EPSILON};
use mcmc_engine::stats::{autocorrelation, autocorrelation_fft};
use ndarray::Array2;

fn target() -> Gaussian2D<f64> {
    Gaussian2D::new([0.0, 0.0], [1.0, 1.0], 0.8)
}

fn criterion_benchmark(c: &mut Criterion) {
    let run = RunParams::new(1_000, 100);

    c.bench_function("metropolis 2d 1100 iterations", |b| {
        let algorithm = Algorithm::MetropolisHastings(MetropolisParams::new(0.5));
        b.iter(|| sample(target(), algorithm, black_box(&[0.0, 0.0]), run, 42).unwrap())
    });

    c.bench_function("hmc 2d 1100 iterations", |b| {
        let algorithm = Algorithm::Hamiltonian(HmcParams::default());
        b.iter(|| sample(target(), algorithm, black_box(&[0.0, 0.0]), run, 42).unwrap())
    });

    c.bench_function("numerical gradient 2d", |b| {
        let density = target();
        b.iter(|| gradient(&density, black_box(&[0.3, -0.2]), DEFAULT_EPSILON))
    });

    let long = sample(
        target(),
        Algorithm::RandomWalk(MetropolisParams::new(0.5)),
        &[0.0, 0.0],
        RunParams::new(20_000, 0),
        7,
    )
    .unwrap();
    let chain: Array2<f64> = long.chain;

    c.bench_function("autocorrelation direct 20000x200", |b| {
        b.iter_batched(
            || chain.view(),
            |view| autocorrelation(view, 0, 200).unwrap(),
            BatchSize::SmallInput,
        )
    });

    c.bench_function("autocorrelation fft 20000x200", |b| {
        b.iter_batched(
            || chain.view(),
            |view| autocorrelation_fft(view, 0, 200).unwrap(),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
