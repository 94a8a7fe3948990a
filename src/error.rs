//! Error types shared by the samplers and the diagnostics.

use thiserror::Error;

/// Errors reported by the sampling engine.
///
/// Everything except [`McmcError::Cancelled`] is a caller error: bad parameters,
/// a malformed initial state or a density that broke its contract.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum McmcError {
    /// Step sizes must be finite and strictly positive.
    #[error("Invalid step size {0}: expected a finite value > 0")]
    InvalidStepSize(f64),

    /// HMC needs at least one leapfrog step per iteration.
    #[error("Invalid number of leapfrog steps: expected at least 1")]
    InvalidLeapfrogSteps,

    /// The state has no coordinates.
    #[error("States must have at least one dimension")]
    ZeroDimension,

    /// Two collaborators disagree on the dimensionality of the state.
    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// The initial state contains NaN or infinite coordinates.
    #[error("Initial state must only contain finite coordinates")]
    InvalidInitialState,

    /// The density returned a negative or non-finite value.
    #[error("Density returned {value}, expected a finite value >= 0")]
    InvalidDensity { value: f64 },

    /// Standard deviation of a normal draw was negative or non-finite.
    #[error("Invalid standard deviation {0}")]
    InvalidStd(f64),

    /// A diagnostic was asked for a coordinate the chain does not have.
    #[error("Dimension {dimension} out of range for {dim}-dimensional chain")]
    DimensionOutOfRange { dimension: usize, dim: usize },

    /// A statistic that needs at least one sample got none.
    #[error("Expected a non-empty input")]
    EmptyInput,

    /// A statistic needs more chains or longer chains than it was given.
    #[error("Expected at least {needed}, found {found}")]
    InsufficientSamples { needed: usize, found: usize },

    /// R-hat is 0/0 or ∞/∞ when the within-chain variance vanishes or is not finite.
    #[error("R-hat undefined for dimension {dimension}: within-chain variance is {within}")]
    UndefinedRhat { dimension: usize, within: f64 },

    /// The run was cancelled through its [`crate::core::CancellationToken`].
    #[error("Run cancelled after {completed} iterations")]
    Cancelled { completed: usize },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, McmcError>;
