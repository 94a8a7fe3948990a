//! Metropolis-Hastings and Hamiltonian Monte Carlo samplers for arbitrary,
//! possibly unnormalized densities, plus chain diagnostics.
//!
//! ```rust
//! use mcmc_engine::algorithm::{sample, Algorithm};
//! use mcmc_engine::config::{MetropolisParams, RunParams};
//! use mcmc_engine::distributions::Gaussian2D;
//! use mcmc_engine::stats::summarize_chain;
//!
//! let target = Gaussian2D::new([0.0, 0.0], [1.0, 1.0], 0.8);
//! let algorithm = Algorithm::MetropolisHastings(MetropolisParams::new(0.5));
//! let result = sample(target, algorithm, &[0.0, 0.0], RunParams::default(), 42).unwrap();
//!
//! let summary = summarize_chain(&result).unwrap();
//! assert_eq!(summary.total_samples, 1000);
//! assert_eq!(summary.dimensions.len(), 2);
//! ```

pub mod algorithm;
pub mod config;
pub mod core;
pub mod distributions;
pub mod error;
pub mod gradient;
pub mod hmc;
pub mod metropolis_hastings;
pub mod proposal;
pub mod stats;
