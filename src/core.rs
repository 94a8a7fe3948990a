//! The run loop shared by all samplers.
//!
//! A sampler only has to implement [`MarkovChain`]: one accept/reject iteration
//! at a time. [`run_chain`] turns that into a [`RunResult`] by doing the
//! burn-in, recording the chain and keeping the acceptance bookkeeping.
//! Samplers owning several independent chains implement [`HasChains`] and get
//! the parallel [`ChainRunner`] methods for free.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use ndarray::{Array1, Array2, ArrayView1};
use num_traits::Float;
use rand::distributions::{Distribution, Standard};
use rand::Rng;
use rayon::prelude::*;

use crate::error::{McmcError, Result};

/// A Markov chain that can be advanced one iteration at a time.
pub trait MarkovChain<T> {
    /// Performs one iteration and returns whether the proposed state was accepted.
    fn step(&mut self) -> Result<bool>;

    /// Returns the current state without stepping.
    fn current_state(&self) -> &[T];
}

/// Everything a finished run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult<T> {
    /// Recorded states, shape `[n_collect, dim]`, in iteration order.
    pub chain: Array2<T>,
    /// Accepted proposals over all iterations, burn-in included.
    /// A run with zero iterations reports 0.
    pub acceptance_rate: f64,
    /// Running acceptance rate `accepted / (i + 1)` at every recorded iteration `i`.
    pub acceptance_history: Array1<f64>,
}

impl<T> RunResult<T> {
    /// Number of recorded states.
    pub fn len(&self) -> usize {
        self.chain.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.nrows() == 0
    }

    /// Dimensionality of the recorded states.
    pub fn dim(&self) -> usize {
        self.chain.ncols()
    }
}

/// A flag that asks a running chain to stop at the next iteration boundary.
///
/// Clones share the same flag, so one clone can be handed to the thread
/// running the chain and the other kept by the caller.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The Metropolis acceptance test: draws u ~ U[0, 1) and accepts iff `u < ratio`.
///
/// A ratio of 1 or more is therefore always accepted, a ratio of 0 (or NaN) never.
pub fn accept<T, R>(rng: &mut R, ratio: T) -> bool
where
    T: Float,
    R: Rng + ?Sized,
    Standard: Distribution<T>,
{
    let u: T = Standard.sample(rng);
    u < ratio
}

const UPDATE_INTERVAL: Duration = Duration::from_millis(500);

fn drive<T, M, F>(
    chain: &mut M,
    n_collect: usize,
    n_discard: usize,
    cancel: Option<&CancellationToken>,
    mut on_iteration: F,
) -> Result<RunResult<T>>
where
    T: Float,
    M: MarkovChain<T> + ?Sized,
    F: FnMut(usize, usize),
{
    let dim = chain.current_state().len();
    let total = n_collect + n_discard;
    let mut out = Array2::<T>::zeros((n_collect, dim));
    let mut history = Array1::<f64>::zeros(n_collect);
    let mut accepted = 0_usize;

    for i in 0..total {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            log::debug!("run cancelled after {i} of {total} iterations");
            return Err(McmcError::Cancelled { completed: i });
        }
        if chain.step()? {
            accepted += 1;
        }
        if i >= n_discard {
            let row = i - n_discard;
            out.row_mut(row)
                .assign(&ArrayView1::from(chain.current_state()));
            history[row] = accepted as f64 / (i + 1) as f64;
        }
        on_iteration(i, accepted);
    }

    let acceptance_rate = if total == 0 {
        0.0
    } else {
        accepted as f64 / total as f64
    };
    Ok(RunResult {
        chain: out,
        acceptance_rate,
        acceptance_history: history,
    })
}

/// Runs `n_discard` burn-in iterations followed by `n_collect` recorded ones.
pub fn run_chain<T, M>(chain: &mut M, n_collect: usize, n_discard: usize) -> Result<RunResult<T>>
where
    T: Float,
    M: MarkovChain<T> + ?Sized,
{
    drive(chain, n_collect, n_discard, None, |_, _| {})
}

/// Like [`run_chain`], but checks `token` before every iteration and returns
/// [`McmcError::Cancelled`] once it is set. No partial chain is returned.
pub fn run_chain_cancellable<T, M>(
    chain: &mut M,
    n_collect: usize,
    n_discard: usize,
    token: &CancellationToken,
) -> Result<RunResult<T>>
where
    T: Float,
    M: MarkovChain<T> + ?Sized,
{
    drive(chain, n_collect, n_discard, Some(token), |_, _| {})
}

/// Like [`run_chain`], but reports progress and the running acceptance rate
/// on `pb`, refreshing the message roughly every 500 milliseconds.
pub fn run_chain_with_progress<T, M>(
    chain: &mut M,
    n_collect: usize,
    n_discard: usize,
    pb: &ProgressBar,
) -> Result<RunResult<T>>
where
    T: Float,
    M: MarkovChain<T> + ?Sized,
{
    let total = n_collect + n_discard;
    pb.set_length(total as u64);
    let mut last_update = Instant::now();

    drive(chain, n_collect, n_discard, None, |i, accepted| {
        pb.inc(1);
        if last_update.elapsed() >= UPDATE_INTERVAL || i + 1 == total {
            let accept_rate = accepted as f64 / (i + 1) as f64;
            pb.set_message(format!("p(accept)≈{:.3}", accept_rate));
            last_update = Instant::now();
        }
    })
}

/// A trait for anything that owns several independent [`MarkovChain`]s.
pub trait HasChains<T> {
    type Chain: MarkovChain<T> + Send;

    /// Returns a mutable reference to the vector of chains.
    fn chains_mut(&mut self) -> &mut Vec<Self::Chain>;
}

/// Parallel execution of all chains of a [`HasChains`] sampler with `rayon`.
///
/// Every chain owns its random number generator, so results do not depend on
/// how the chains are scheduled.
pub trait ChainRunner<T>: HasChains<T>
where
    T: Float + Send,
{
    /// Runs every chain for `n_discard` burn-in plus `n_collect` recorded iterations.
    fn run(&mut self, n_collect: usize, n_discard: usize) -> Result<Vec<RunResult<T>>> {
        let chains = self.chains_mut();
        log::debug!(
            "running {} chains: {} burn-in + {} recorded iterations",
            chains.len(),
            n_discard,
            n_collect
        );
        chains
            .par_iter_mut()
            .map(|chain| run_chain(chain, n_collect, n_discard))
            .collect()
    }

    /// Same as [`ChainRunner::run`], with one progress bar per chain.
    fn run_progress(&mut self, n_collect: usize, n_discard: usize) -> Result<Vec<RunResult<T>>> {
        let multi = MultiProgress::new();
        let pb_style = ProgressStyle::default_bar()
            .template("{prefix} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");

        self.chains_mut()
            .par_iter_mut()
            .enumerate()
            .map(|(i, chain)| {
                let pb = multi.add(ProgressBar::new((n_collect + n_discard) as u64));
                pb.set_prefix(format!("Chain {i}"));
                pb.set_style(pb_style.clone());

                let result = run_chain_with_progress(chain, n_collect, n_discard, &pb);
                pb.finish_with_message("Done!");
                result
            })
            .collect()
    }
}

impl<T: Float + Send, M: HasChains<T>> ChainRunner<T> for M {}
