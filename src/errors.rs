//! Error types for discretization, entropy and ranking.
//!
//! Two kinds of failure exist:
//!
//! | Kind | Scope | Examples |
//! |------|-------|----------|
//! | [`DataError`] | one (metric, horizon) pair | too few samples, constant series, missing field |
//! | [`ConfigError`] | one metric, or every metric of a run | unknown strategy, bin count <= 1 |
//!
//! Neither kind aborts a batch; see [`crate::batch`].

use crate::types::HorizonFailure;
#[cfg(feature = "python")]
use pyo3::prelude::*;
use thiserror::Error;

/// Problems with the data itself. Always recoverable per (metric, horizon).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("insufficient samples: found {found}, need at least {required}")]
    InsufficientSamples { found: usize, required: usize },

    #[error("need at least 2 distinct values to discretize, found {distinct}")]
    TooFewDistinctValues { distinct: usize },

    #[error("non-finite sample at index {index}")]
    NonFiniteSample { index: usize },

    #[error("observation missing required field `{field}`")]
    MissingField { field: String },

    #[error("close price is zero at timestamp {timestamp}")]
    ZeroClose { timestamp: i64 },

    #[error("malformed OHLC bar at timestamp {timestamp}: high must bound open, low and close")]
    MalformedBar { timestamp: i64 },

    #[error("distribution shares sum to a non-positive total at timestamp {timestamp}")]
    NonPositiveShareTotal { timestamp: i64 },

    #[error("negative share for field `{field}` at timestamp {timestamp}")]
    NegativeShare { timestamp: i64, field: String },

    #[error("observation at timestamp {timestamp} has no fields")]
    EmptyObservation { timestamp: i64 },

    #[error("observation at timestamp {timestamp} is multi-field but metric is declared scalar")]
    UnexpectedFields { timestamp: i64 },

    #[error("observation at timestamp {timestamp} is scalar but `{strategy}` reduction needs named fields")]
    ExpectedFields {
        timestamp: i64,
        strategy: &'static str,
    },

    #[error("non-finite value in field `{field}` at timestamp {timestamp}")]
    NonFiniteField { timestamp: i64, field: String },

    #[error("{role} series has zero entropy after discretization")]
    ZeroEntropy { role: &'static str },

    #[error("paired series differ in length: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("timestamps not strictly increasing at index {index}: prev={prev}, curr={curr}")]
    UnsortedTimestamps { index: usize, prev: i64, curr: i64 },

    #[error("all {} horizons failed", .failures.len())]
    AllHorizonsFailed { failures: Vec<HorizonFailure> },
}

/// Problems with how a metric or analysis run was configured.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("unknown reduction strategy `{name}` (expected auto, scalar, concentration, range or mean)")]
    UnknownStrategy { name: String },

    #[error("invalid bin count {n_bins}: must be at least 2")]
    InvalidBinCount { n_bins: usize },

    #[error("no horizons configured")]
    NoHorizons,

    #[error("invalid horizon {horizon}: must be at least 1 period")]
    InvalidHorizon { horizon: u32 },

    #[error("invalid sampling interval {interval_secs}s: must be positive")]
    InvalidInterval { interval_secs: i64 },

    #[error("invalid minimum sample count {min_samples}: must be at least 2")]
    InvalidMinSamples { min_samples: usize },

    #[error("invalid composite weights: {reason}")]
    InvalidWeights { reason: String },

    #[error("failed to build worker pool: {reason}")]
    ThreadPool { reason: String },

    #[error("failed to load configuration: {reason}")]
    Load { reason: String },
}

/// Either kind of failure, as returned by the evaluator and batch entry points.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AnalysisError {
    pub fn is_data(&self) -> bool {
        matches!(self, Self::Data(_))
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::Load {
            reason: err.to_string(),
        }
    }
}

impl From<rayon::ThreadPoolBuildError> for ConfigError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        ConfigError::ThreadPool {
            reason: err.to_string(),
        }
    }
}

#[cfg(feature = "python")]
impl From<AnalysisError> for PyErr {
    fn from(err: AnalysisError) -> PyErr {
        pyo3::exceptions::PyValueError::new_err(err.to_string())
    }
}
