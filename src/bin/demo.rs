//! Runs every algorithm on a correlated 2D Gaussian and prints the diagnostics
//! a front end would display.

use mcmc_engine::algorithm::{sample, Algorithm};
use mcmc_engine::config::{HmcParams, MetropolisParams, RunParams};
use mcmc_engine::core::ChainRunner;
use mcmc_engine::distributions::Gaussian2D;
use mcmc_engine::metropolis_hastings::MetropolisHastings;
use mcmc_engine::proposal::IsotropicGaussian;
use mcmc_engine::stats::{autocorrelation, max_rhat, summarize_chain};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    const ITERATIONS: usize = 5_000;
    const BURNIN: usize = 500;
    const N_CHAINS: usize = 4;
    const SEED: u64 = 42;

    let target = Gaussian2D::new([0.0, 0.0], [1.0, 1.0], 0.8);
    let initial_state = [2.0, -2.0];
    let run = RunParams::new(ITERATIONS, BURNIN);

    for algorithm in [
        Algorithm::MetropolisHastings(MetropolisParams::new(0.5)),
        Algorithm::RandomWalk(MetropolisParams::new(1.0)),
        Algorithm::Hamiltonian(HmcParams::new(0.1, 10)),
    ] {
        let result = sample(target, algorithm, &initial_state, run, SEED)?;
        let summary = summarize_chain(&result)?;
        let acf = autocorrelation(result.chain.view(), 0, 10)?;

        println!("== {algorithm} ==");
        println!("Total samples: {}", summary.total_samples);
        println!("Acceptance rate: {:.1}%", 100.0 * summary.acceptance_rate);
        println!(
            "Effective sample size: {:.0} ({:.1}% efficiency)",
            summary.effective_sample_size,
            100.0 * summary.efficiency
        );
        if let Some(point) = acf.last() {
            println!("Autocorrelation at lag {}: {:.3}", point.lag, point.value);
        }
        for (label, dim) in ["X", "Y"].iter().zip(&summary.dimensions) {
            println!(
                "  {label}: mean {:.3}, std {:.3}, median {:.3}, [q25, q75] = [{:.3}, {:.3}], range [{:.3}, {:.3}]",
                dim.mean, dim.std, dim.median, dim.q25, dim.q75, dim.min, dim.max
            );
        }
        println!();
    }

    // Independent chains in parallel, checked for agreement with R-hat.
    let proposal = IsotropicGaussian::new(0.5)?;
    let mut mh =
        MetropolisHastings::new(target, proposal, &initial_state, N_CHAINS)?.set_seed(SEED);
    let results = mh.run_progress(ITERATIONS, BURNIN)?;
    let views: Vec<_> = results.iter().map(|r| r.chain.view()).collect();
    println!("max(rhat) over {N_CHAINS} chains: {:.4}", max_rhat(&views)?);

    Ok(())
}

#[test]
fn test_main() {
    main().expect("Expected main to not return an error.");
}
