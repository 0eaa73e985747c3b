//! Information-gain evaluation of one metric across horizons.
//!
//! For every configured horizon the metric is aligned against the forward
//! price change, both sides are quantile-discretized, and the entropy
//! measures are computed on the bucket labels.
//!
//! # Failure policy
//!
//! | Error | Scope |
//! |-------|-------|
//! | [`DataError`] inside a horizon | horizon skipped, recorded as [`HorizonFailure`] |
//! | [`DataError`] while reducing or validating the series | metric fails |
//! | [`ConfigError`] anywhere | metric fails |
//! | every horizon skipped | metric fails with [`DataError::AllHorizonsFailed`] |

use crate::align::{align_forward_changes, horizon_offset, lagged_triples, AlignedSamples};
use crate::discretize::quantile_discretize;
use crate::entropy::{conditional_entropy, pearson_correlation, shannon_entropy_bits, transfer_entropy};
use crate::errors::{AnalysisError, ConfigError, DataError};
use crate::guards::{safe_ratio, ENTROPY_TOLERANCE};
use crate::reduce::{reduce_series, ReductionStrategy};
use crate::settings::AnalysisConfig;
use crate::types::{DerivedSignal, GainResult, HorizonFailure, PriceSeries, ScalarSeries, Series};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

// ============================================================================
// Inputs and Outputs
// ============================================================================

/// One candidate metric with its declared reduction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricInput {
    pub name: String,
    #[serde(default)]
    pub strategy: ReductionStrategy,
    pub series: Series,
}

impl MetricInput {
    /// Metric with no declared reduction ([`ReductionStrategy::Auto`]).
    pub fn new(name: impl Into<String>, series: Series) -> Self {
        Self {
            name: name.into(),
            strategy: ReductionStrategy::Auto,
            series,
        }
    }

    pub fn with_strategy(mut self, strategy: ReductionStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

/// Scored horizons of one metric, plus the horizons that were skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEvaluation {
    pub metric: String,
    pub strategy: ReductionStrategy,
    pub results: Vec<GainResult>,
    pub failures: Vec<HorizonFailure>,
}

// ============================================================================
// Information Measures
// ============================================================================

/// Discretize both sides and compute every per-horizon measure except the
/// lagged transfer-entropy term.
///
/// # Errors
///
/// * [`DataError::ZeroEntropy`] when either side has fewer than 2 distinct
///   values, so no split exists
/// * [`DataError::LengthMismatch`] for unequal inputs
/// * [`ConfigError::InvalidBinCount`] when `n_bins < 2`
pub fn information_measures(
    horizon: u32,
    predictor: &[f64],
    target: &[f64],
    n_bins: usize,
) -> Result<GainResult, AnalysisError> {
    if predictor.len() != target.len() {
        return Err(DataError::LengthMismatch {
            left: predictor.len(),
            right: target.len(),
        }
        .into());
    }

    let target_bins = quantile_discretize(target, n_bins).map_err(|e| degenerate(e, "target"))?;
    let predictor_bins =
        quantile_discretize(predictor, n_bins).map_err(|e| degenerate(e, "predictor"))?;

    let h_target = shannon_entropy_bits(&target_bins.labels);
    if h_target <= ENTROPY_TOLERANCE {
        return Err(DataError::ZeroEntropy { role: "target" }.into());
    }
    let h_predictor = shannon_entropy_bits(&predictor_bins.labels);
    if h_predictor <= ENTROPY_TOLERANCE {
        return Err(DataError::ZeroEntropy { role: "predictor" }.into());
    }

    let h_conditional = conditional_entropy(&predictor_bins.labels, &target_bins.labels)?;
    let information_gain = (h_target - h_conditional).max(0.0);

    Ok(GainResult {
        horizon,
        n_samples: target.len(),
        target_bins: target_bins.effective_bins,
        predictor_bins: predictor_bins.effective_bins,
        target_entropy: h_target,
        indicator_entropy: h_predictor,
        conditional_entropy: h_conditional,
        information_gain,
        gain_ratio: safe_ratio(information_gain, h_predictor),
        normalized_mutual_information: safe_ratio(information_gain, h_target.min(h_predictor)),
        symmetric_uncertainty: safe_ratio(2.0 * information_gain, h_target + h_predictor),
        reduction_ratio: safe_ratio(information_gain, h_target),
        transfer_entropy: None,
        correlation: pearson_correlation(predictor, target),
    })
}

/// A series with a single distinct value has no entropy to explain.
fn degenerate(err: AnalysisError, role: &'static str) -> AnalysisError {
    match err {
        AnalysisError::Data(DataError::TooFewDistinctValues { .. }) => {
            DataError::ZeroEntropy { role }.into()
        }
        other => other,
    }
}

// ============================================================================
// Evaluator
// ============================================================================

/// Evaluates metrics against a price series with a validated configuration.
#[derive(Debug, Clone)]
pub struct InformationGainEvaluator {
    config: AnalysisConfig,
}

impl InformationGainEvaluator {
    /// # Errors
    ///
    /// Any [`ConfigError`] from [`AnalysisConfig::validate`].
    pub fn new(config: AnalysisConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Validate a metric's series and reduce it to one scalar per timestamp.
    pub fn prepare_signal(&self, metric: &MetricInput) -> Result<DerivedSignal, DataError> {
        metric.series.validate()?;
        reduce_series(&metric.series, metric.strategy)
    }

    /// Score one horizon of an already reduced signal.
    pub fn evaluate_horizon(
        &self,
        signal: &ScalarSeries,
        price: &PriceSeries,
        horizon: u32,
    ) -> Result<GainResult, AnalysisError> {
        let aligned = align_forward_changes(signal, price, horizon, self.config.interval_secs);
        if aligned.len() < self.config.min_samples {
            return Err(DataError::InsufficientSamples {
                found: aligned.len(),
                required: self.config.min_samples,
            }
            .into());
        }

        let mut result =
            information_measures(horizon, &aligned.predictor, &aligned.target, self.config.n_bins)?;
        result.transfer_entropy = self.lagged_transfer_entropy(&aligned, horizon)?;
        Ok(result)
    }

    /// Transfer entropy with lag equal to the horizon.
    ///
    /// `None` when disabled, when too few lagged rows exist, or when a lagged
    /// column is constant. Only configuration problems are errors.
    fn lagged_transfer_entropy(
        &self,
        aligned: &AlignedSamples,
        horizon: u32,
    ) -> Result<Option<f64>, AnalysisError> {
        let te = &self.config.transfer_entropy;
        if !te.enabled {
            return Ok(None);
        }
        let Some(lag_secs) = horizon_offset(horizon, self.config.interval_secs) else {
            return Ok(None);
        };

        let triples = lagged_triples(aligned, lag_secs);
        let required = self.config.min_samples;
        if triples.len() < required {
            trace!(horizon, rows = triples.len(), required, "too few lagged rows for transfer entropy");
            return Ok(None);
        }

        let discretized = (
            quantile_discretize(&triples.future, te.n_bins),
            quantile_discretize(&triples.past, te.n_bins),
            quantile_discretize(&triples.source, te.n_bins),
        );
        match discretized {
            (Ok(future), Ok(past), Ok(source)) => {
                let value = transfer_entropy(&future.labels, &past.labels, &source.labels)?;
                Ok(Some(value))
            }
            (Err(AnalysisError::Config(e)), _, _)
            | (_, Err(AnalysisError::Config(e)), _)
            | (_, _, Err(AnalysisError::Config(e))) => Err(e.into()),
            _ => {
                trace!(horizon, "lagged column is constant; transfer entropy skipped");
                Ok(None)
            }
        }
    }

    /// Score every configured horizon of one metric.
    ///
    /// Horizons failing with a [`DataError`] are skipped and listed in
    /// [`MetricEvaluation::failures`].
    ///
    /// # Errors
    ///
    /// * [`DataError`] when the series is unsorted or cannot be reduced, or
    ///   [`DataError::AllHorizonsFailed`] when no horizon could be scored
    /// * [`ConfigError`] from any horizon
    pub fn evaluate_metric(
        &self,
        metric: &MetricInput,
        price: &PriceSeries,
    ) -> Result<MetricEvaluation, AnalysisError> {
        let signal = self.prepare_signal(metric)?;

        let mut horizons = self.config.horizons.clone();
        horizons.sort_unstable();
        horizons.dedup();

        let mut results = Vec::with_capacity(horizons.len());
        let mut failures = Vec::new();
        for horizon in horizons {
            match self.evaluate_horizon(&signal, price, horizon) {
                Ok(result) => results.push(result),
                Err(AnalysisError::Data(err)) => {
                    debug!(metric = %metric.name, horizon, error = %err, "horizon skipped");
                    failures.push(HorizonFailure {
                        horizon,
                        reason: err.to_string(),
                    });
                }
                Err(err @ AnalysisError::Config(_)) => return Err(err),
            }
        }

        if results.is_empty() {
            return Err(DataError::AllHorizonsFailed { failures }.into());
        }

        Ok(MetricEvaluation {
            metric: metric.name.clone(),
            strategy: metric.strategy,
            results,
            failures,
        })
    }
}
