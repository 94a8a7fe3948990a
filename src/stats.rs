/*!
Diagnostics for finished chains: autocorrelation, effective sample size,
per-dimension summaries and the Gelman-Rubin R-hat.

Chains are `[n_samples, dim]` arrays as produced by
[`RunResult`](crate::core::RunResult). All statistics are computed in `f64`.

# Examples

```rust
use mcmc_engine::stats::{autocorrelation, effective_sample_size, summarize};
use ndarray::array;

let chain = array![[5.0], [1.0], [4.0], [2.0], [3.0]];

let acf = autocorrelation(chain.view(), 0, 50).unwrap();
assert_eq!(acf.len(), 5);
assert!((acf[0].value - 1.0).abs() < 1e-12);

let summary = summarize(chain.view(), 0).unwrap().unwrap();
assert_eq!(summary.median, 3.0);
assert!((summary.variance - 2.0).abs() < 1e-12);

// Too short for lag 10: the autocorrelation is taken as 0.
assert_eq!(effective_sample_size(chain.view(), 0, 10).unwrap(), 5.0);
```
*/

use ndarray::prelude::*;
use ndarray_stats::{QuantileExt, SummaryStatisticsExt};
use num_traits::Float;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::core::RunResult;
use crate::error::{McmcError, Result};

/// Largest lag reported by default.
pub const DEFAULT_MAX_LAG: usize = 50;

/// Lag used by [`effective_sample_size`] by default.
pub const DEFAULT_REFERENCE_LAG: usize = 10;

/// One entry of an autocorrelation series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutocorrelationPoint {
    pub lag: usize,
    pub value: f64,
}

/// Autocorrelation values for lags `0..=max_lag`, in increasing lag order.
pub type AutocorrelationSeries = Vec<AutocorrelationPoint>;

/// Summary statistics of one coordinate of a chain.
///
/// Variance and standard deviation are population statistics (divided by n).
/// Median and quartiles are nearest-rank values `sorted[⌊n q⌋]`, not
/// interpolated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DimensionSummary {
    pub mean: f64,
    pub variance: f64,
    pub std: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub q25: f64,
    pub q75: f64,
}

/// Summary of a whole run.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainSummary {
    pub total_samples: usize,
    pub acceptance_rate: f64,
    /// [`effective_sample_size`] of the first coordinate.
    pub effective_sample_size: f64,
    /// `effective_sample_size / total_samples`.
    pub efficiency: f64,
    pub dimensions: Vec<DimensionSummary>,
}

fn column<T: Float>(chain: ArrayView2<T>, dimension: usize) -> Result<Array1<f64>> {
    let dim = chain.ncols();
    if dimension >= dim {
        return Err(McmcError::DimensionOutOfRange { dimension, dim });
    }
    Ok(chain
        .column(dimension)
        .mapv(|x| x.to_f64().unwrap_or(f64::NAN)))
}

/// Mean and population variance, or `None` when the correlation is undefined.
fn moments(values: &Array1<f64>) -> Option<(f64, f64)> {
    let mean = values.mean()?;
    let variance = values.central_moment(2).ok()?;
    (variance.is_finite() && variance > 0.0).then_some((mean, variance))
}

/**
Autocorrelation of coordinate `dimension` for lags `0..=min(max_lag, n - 1)`:

```text
ρ(L) = Σ_{i < n-L} (x_i - m)(x_{i+L} - m) / ((n - L) · var)
```

where `m` and the population variance `var` are computed once over the whole
series, so `ρ(0) = 1`. An empty or constant series has no defined
autocorrelation and yields an empty result.

Costs O(n · max_lag); see [`autocorrelation_fft`] for long series.
*/
pub fn autocorrelation<T: Float>(
    chain: ArrayView2<T>,
    dimension: usize,
    max_lag: usize,
) -> Result<AutocorrelationSeries> {
    let values = column(chain, dimension)?;
    let Some((mean, variance)) = moments(&values) else {
        return Ok(Vec::new());
    };
    let n = values.len();
    let centered = values.mapv(|x| x - mean);
    Ok((0..=max_lag.min(n - 1))
        .map(|lag| {
            let sum = centered
                .slice(s![..n - lag])
                .dot(&centered.slice(s![lag..]));
            AutocorrelationPoint {
                lag,
                value: sum / ((n - lag) as f64 * variance),
            }
        })
        .collect())
}

/// Same series as [`autocorrelation`], computed through the power spectrum
/// of the zero-padded centered series in O(n log n).
pub fn autocorrelation_fft<T: Float>(
    chain: ArrayView2<T>,
    dimension: usize,
    max_lag: usize,
) -> Result<AutocorrelationSeries> {
    let values = column(chain, dimension)?;
    let Some((mean, variance)) = moments(&values) else {
        return Ok(Vec::new());
    };
    let n = values.len();
    // Zero padding to at least 2n keeps the circular correlation from wrapping.
    let size = (2 * n).next_power_of_two();
    let mut buffer: Vec<Complex<f64>> = values
        .iter()
        .map(|&x| Complex::new(x - mean, 0.0))
        .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
        .take(size)
        .collect();

    let mut planner = FftPlanner::<f64>::new();
    planner.plan_fft_forward(size).process(&mut buffer);
    buffer
        .iter_mut()
        .for_each(|c| *c = Complex::new(c.norm_sqr(), 0.0));
    planner.plan_fft_inverse(size).process(&mut buffer);

    // rustfft does not normalize the inverse transform.
    let scale = size as f64;
    Ok((0..=max_lag.min(n - 1))
        .map(|lag| AutocorrelationPoint {
            lag,
            value: buffer[lag].re / scale / ((n - lag) as f64 * variance),
        })
        .collect())
}

/**
Effective sample size estimated from a single lag:

```text
ESS = n / (1 + 2 ρ(reference_lag))
```

This is a rough approximation, not the summed-autocorrelation estimator: it
ignores every other lag and is not clamped, so strongly anti-correlated chains
can report more than `n` (or even negative values).

When `reference_lag` is not available (chain of at most `reference_lag`
samples, or zero variance) ρ is taken as 0 and the result is `n`. An empty
chain has an ESS of 0.
*/
pub fn effective_sample_size<T: Float>(
    chain: ArrayView2<T>,
    dimension: usize,
    reference_lag: usize,
) -> Result<f64> {
    let series = autocorrelation(chain, dimension, reference_lag)?;
    let n = chain.nrows() as f64;
    let rho = series
        .get(reference_lag)
        .map_or(0.0, |point| point.value);
    Ok(n / (1.0 + 2.0 * rho))
}

/// Summary statistics of coordinate `dimension`, or `None` for an empty chain.
pub fn summarize<T: Float>(
    chain: ArrayView2<T>,
    dimension: usize,
) -> Result<Option<DimensionSummary>> {
    let values = column(chain, dimension)?;
    let n = values.len();
    let (Some(mean), Ok(variance)) = (values.mean(), values.central_moment(2)) else {
        return Ok(None);
    };

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let nearest_rank = |q: f64| sorted[((n as f64 * q).floor() as usize).min(n - 1)];

    Ok(Some(DimensionSummary {
        mean,
        variance,
        std: variance.sqrt(),
        median: sorted[n / 2],
        min: sorted[0],
        max: sorted[n - 1],
        q25: nearest_rank(0.25),
        q75: nearest_rank(0.75),
    }))
}

/**
Summarizes every coordinate of a run, plus the ESS of the first coordinate
at [`DEFAULT_REFERENCE_LAG`].

An empty run has no per-dimension summaries, and its ESS and efficiency
are 0.

# Examples

```rust
use mcmc_engine::core::RunResult;
use mcmc_engine::stats::summarize_chain;
use ndarray::{array, Array1};

let result = RunResult {
    chain: array![[0.0, 1.0], [1.0, 2.0], [2.0, 3.0]],
    acceptance_rate: 0.5,
    acceptance_history: Array1::zeros(3),
};
let summary = summarize_chain(&result).unwrap();
assert_eq!(summary.total_samples, 3);
assert_eq!(summary.dimensions[1].mean, 2.0);
assert_eq!(summary.efficiency, 1.0);
```
*/
pub fn summarize_chain<T: Float>(result: &RunResult<T>) -> Result<ChainSummary> {
    let chain = result.chain.view();
    let total_samples = chain.nrows();
    if total_samples == 0 {
        return Ok(ChainSummary {
            total_samples,
            acceptance_rate: result.acceptance_rate,
            effective_sample_size: 0.0,
            efficiency: 0.0,
            dimensions: Vec::new(),
        });
    }
    let dimensions = (0..chain.ncols())
        .map(|d| summarize(chain, d))
        .collect::<Result<Option<Vec<_>>>>()?
        .unwrap_or_default();
    let effective_sample_size = effective_sample_size(chain, 0, DEFAULT_REFERENCE_LAG)?;
    Ok(ChainSummary {
        total_samples,
        acceptance_rate: result.acceptance_rate,
        effective_sample_size,
        efficiency: effective_sample_size / total_samples as f64,
        dimensions,
    })
}

/**
Gelman-Rubin potential scale reduction factor for every coordinate.

All chains must have the same shape with at least 2 samples, and there must
be at least 2 chains. With `n` samples per chain, `W` the mean within-chain
sample variance and `B` the between-chain variance of the chain means scaled
by `n`,

```text
R-hat = sqrt(((n - 1) / n · W + B / n) / W)
```

Values close to 1 indicate that the chains sample the same distribution.
Constant chains (every proposal rejected) leave R-hat undefined and are
reported as [`McmcError::UndefinedRhat`]. See
the [Stan Reference Manual][1].

[1]: https://mc-stan.org/docs/2_18/reference-manual/notation-for-samples-chains-and-draws.html
*/
pub fn rhat<T: Float>(chains: &[ArrayView2<T>]) -> Result<Array1<f64>> {
    let n_chains = chains.len();
    if n_chains < 2 {
        return Err(McmcError::InsufficientSamples {
            needed: 2,
            found: n_chains,
        });
    }
    let (n, dim) = chains[0].dim();
    if n < 2 {
        return Err(McmcError::InsufficientSamples { needed: 2, found: n });
    }
    if let Some(other) = chains.iter().find(|c| c.dim() != (n, dim)) {
        let (expected, found) = if other.nrows() != n {
            (n, other.nrows())
        } else {
            (dim, other.ncols())
        };
        return Err(McmcError::DimensionMismatch { expected, found });
    }

    let mut means = Array2::<f64>::zeros((n_chains, dim));
    let mut variances = Array2::<f64>::zeros((n_chains, dim));
    for (i, chain) in chains.iter().enumerate() {
        let chain = chain.mapv(|x| x.to_f64().unwrap_or(f64::NAN));
        means
            .row_mut(i)
            .assign(&chain.mean_axis(Axis(0)).ok_or(McmcError::EmptyInput)?);
        variances.row_mut(i).assign(&chain.var_axis(Axis(0), 1.0));
    }

    let n = n as f64;
    let within = variances.mean_axis(Axis(0)).ok_or(McmcError::EmptyInput)?;
    if let Some((dimension, &w)) = within
        .iter()
        .enumerate()
        .find(|(_, w)| !(w.is_finite() && **w > 0.0))
    {
        return Err(McmcError::UndefinedRhat {
            dimension,
            within: w,
        });
    }
    let grand_mean = means.mean_axis(Axis(0)).ok_or(McmcError::EmptyInput)?;
    let between = (means - grand_mean.insert_axis(Axis(0)))
        .pow2()
        .sum_axis(Axis(0))
        * (n / (n_chains as f64 - 1.0));
    let pooled = &within * ((n - 1.0) / n) + between / n;
    Ok((pooled / within).sqrt())
}

/// Largest R-hat over all coordinates.
pub fn max_rhat<T: Float>(chains: &[ArrayView2<T>]) -> Result<f64> {
    let all = rhat(chains)?;
    all.max().copied().map_err(|_| McmcError::EmptyInput)
}
