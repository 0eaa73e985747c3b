//! Information-gain ranking of time-series metrics against future price moves.
//!
//! Every metric is discretized into quantile buckets and scored by how much
//! it reduces the entropy of the forward price change over several horizons.
//! The per-horizon scores are combined into one composite score per metric.
//!
//! # Pipeline
//!
//! | Stage | Module |
//! |-------|--------|
//! | Multi-field reduction (HHI, OHLC range, mean) | [`reduce`] |
//! | Timestamp alignment, forward change | [`align`] |
//! | Quantile discretization | [`discretize`] |
//! | Entropy, conditional entropy, transfer entropy | [`entropy`] |
//! | Per-horizon evaluation | [`evaluator`] |
//! | Composite scoring and ranking | [`ranker`] |
//! | Parallel batch runs | [`batch`] |
//!
//! # Example
//!
//! ```rust
//! use infogain_metrics::{analyze, AnalysisConfig, AnalysisInput, CancellationFlag, MetricInput, ScalarSeries, Series};
//!
//! let day = 86_400;
//! let ts: Vec<i64> = (0..120).map(|i| i * day).collect();
//! let signal: Vec<f64> = (0..120).map(|i| (i as f64 * 0.3).sin()).collect();
//! let mut prices = vec![100.0];
//! for s in &signal[..119] {
//!     let last = *prices.last().unwrap();
//!     prices.push(last * (1.0 + 0.01 * s));
//! }
//!
//! let input = AnalysisInput::new(
//!     ScalarSeries::new(ts.clone(), prices).unwrap(),
//!     vec![MetricInput::new("signal", Series::from_scalars(&ts, &signal))],
//! );
//! let report = analyze(&input, &AnalysisConfig::default(), &CancellationFlag::new());
//! assert_eq!(report.rankings[0].metric, "signal");
//! ```

pub mod align;
pub mod batch;
pub mod discretize;
pub mod entropy;
pub mod errors;
pub mod evaluator;
pub mod guards;
pub mod ranker;
pub mod reduce;
pub mod settings;
pub mod types;

#[cfg(feature = "python")]
mod python;

#[cfg(test)]
mod proptest_strategies;

// Re-export public API
pub use batch::{analyze, AnalysisInput, CancellationFlag, FailureKind, MetricFailure, RankingReport};
pub use discretize::{quantile_discretize, Discretization};
pub use entropy::{conditional_entropy, mutual_information, shannon_entropy_bits, transfer_entropy};
pub use errors::{AnalysisError, ConfigError, DataError};
pub use evaluator::{information_measures, InformationGainEvaluator, MetricEvaluation, MetricInput};
pub use ranker::{
    composite_score, rank_metrics, summarize, CompositeScore, CompositeWeights, RankedMetric,
    RankingRow, RankingSummary,
};
pub use reduce::{herfindahl_index, reduce_series, ReductionStrategy};
pub use settings::{AnalysisConfig, TransferEntropyConfig};
pub use types::{
    DerivedSignal, GainResult, HorizonFailure, Observation, ObservationValue, OhlcBar,
    PriceSeries, ScalarSeries, Series, Timestamp,
};
