//! Batch analysis over many metrics.
//!
//! Metrics are independent: each one reads only its own series and the
//! shared price series, so they are evaluated in parallel with rayon. No
//! metric failure aborts the batch. Failed metrics are listed next to the
//! ranking with the reason they could not be scored.
//!
//! Cancellation is cooperative and checked once per metric, before its
//! evaluation starts. A metric already running finishes normally.

use crate::errors::{AnalysisError, ConfigError, DataError};
use crate::evaluator::{InformationGainEvaluator, MetricEvaluation, MetricInput};
use crate::ranker::{rank_metrics, summarize, RankedMetric, RankingRow, RankingSummary};
use crate::reduce::ReductionStrategy;
use crate::settings::AnalysisConfig;
use crate::types::{HorizonFailure, PriceSeries, ScalarSeries, Series};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

// ============================================================================
// Input
// ============================================================================

/// Price series plus every candidate metric of one analysis run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisInput {
    pub price: PriceSeries,
    pub metrics: Vec<MetricInput>,
    /// Metrics rejected while building the input, e.g. for an unknown
    /// strategy tag. Reported as failures by [`analyze`].
    pub rejected: Vec<MetricFailure>,
}

impl AnalysisInput {
    /// Reserved key of the price series in [`AnalysisInput::from_series_map`].
    pub const PRICE_KEY: &'static str = "price";

    pub fn new(price: PriceSeries, metrics: Vec<MetricInput>) -> Self {
        Self {
            price,
            metrics,
            rejected: Vec::new(),
        }
    }

    /// Build from a map of identifier to series, with the price under
    /// [`Self::PRICE_KEY`].
    ///
    /// `strategies` maps metric identifiers to strategy tags (`"auto"`,
    /// `"scalar"`, `"concentration"`, `"range"`, `"mean"`). Metrics without
    /// a tag use [`ReductionStrategy::Auto`], so multi-field values fall back
    /// to their mean. A metric with an unknown tag is moved to
    /// [`AnalysisInput::rejected`]; the rest of the input is unaffected.
    ///
    /// # Errors
    ///
    /// * [`DataError::MissingField`] when no price series is present
    /// * [`DataError::UnexpectedFields`] when the price series is not scalar
    pub fn from_series_map(
        mut series: BTreeMap<String, Series>,
        strategies: &BTreeMap<String, String>,
    ) -> Result<Self, DataError> {
        let price_series = series
            .remove(Self::PRICE_KEY)
            .ok_or_else(|| DataError::MissingField {
                field: Self::PRICE_KEY.to_string(),
            })?;
        let price = ScalarSeries::try_from(&price_series)?;

        let mut input = Self::new(price, Vec::with_capacity(series.len()));
        for (name, observations) in series {
            let strategy = match strategies.get(&name) {
                None => Ok(ReductionStrategy::Auto),
                Some(tag) => tag.parse::<ReductionStrategy>(),
            };
            match strategy {
                Ok(strategy) => input
                    .metrics
                    .push(MetricInput::new(name, observations).with_strategy(strategy)),
                Err(err) => input
                    .rejected
                    .push(MetricFailure::new(name, AnalysisError::Config(err))),
            }
        }
        Ok(input)
    }
}

// ============================================================================
// Cancellation
// ============================================================================

/// Shared flag for stopping a batch between metrics.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
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

// ============================================================================
// Report
// ============================================================================

/// Why a metric is missing from the ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Data,
    Config,
    Cancelled,
}

/// A metric that could not be scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricFailure {
    pub metric: String,
    pub kind: FailureKind,
    pub reason: String,
    /// Per-horizon reasons when every horizon failed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub horizons: Vec<HorizonFailure>,
}

impl MetricFailure {
    pub(crate) fn new(metric: String, err: AnalysisError) -> Self {
        let kind = if err.is_config() {
            FailureKind::Config
        } else {
            FailureKind::Data
        };
        let reason = err.to_string();
        let horizons = match err {
            AnalysisError::Data(DataError::AllHorizonsFailed { failures }) => failures,
            _ => Vec::new(),
        };
        Self {
            metric,
            kind,
            reason,
            horizons,
        }
    }

    fn cancelled(metric: String) -> Self {
        Self {
            metric,
            kind: FailureKind::Cancelled,
            reason: "analysis cancelled before this metric started".to_string(),
            horizons: Vec::new(),
        }
    }
}

/// Ranked metrics, failures, and the cross-metric summary of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankingReport {
    /// Best first.
    pub rankings: Vec<RankedMetric>,
    pub failures: Vec<MetricFailure>,
    pub summary: RankingSummary,
    pub cancelled: bool,
}

impl RankingReport {
    /// One flat row per ranked metric, in rank order.
    pub fn rows(&self) -> Vec<RankingRow> {
        self.rankings.iter().map(RankedMetric::row).collect()
    }

    /// True when at least one metric could not be scored.
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn top(&self, n: usize) -> &[RankedMetric] {
        &self.rankings[..n.min(self.rankings.len())]
    }

    pub fn get(&self, metric: &str) -> Option<&RankedMetric> {
        self.rankings.iter().find(|r| r.metric == metric)
    }

    pub fn failure(&self, metric: &str) -> Option<&MetricFailure> {
        self.failures.iter().find(|f| f.metric == metric)
    }
}

// ============================================================================
// Analysis
// ============================================================================

/// Evaluate and rank every metric of `input`.
///
/// Never fails as a whole. Problems that affect every metric (an invalid
/// `config`, a worker pool that cannot be built, an invalid price series)
/// list each metric in [`RankingReport::failures`] with an empty ranking.
/// Per-metric problems are reported the same way for that metric only.
pub fn analyze(
    input: &AnalysisInput,
    config: &AnalysisConfig,
    cancel: &CancellationFlag,
) -> RankingReport {
    let mut failures = input.rejected.clone();

    let evaluator = match InformationGainEvaluator::new(config.clone()) {
        Ok(evaluator) => evaluator,
        Err(err) => {
            warn!(error = %err, "configuration invalid; no metric can be scored");
            return fail_every_metric(
                input,
                failures,
                FailureKind::Config,
                format!("configuration: {err}"),
                config,
                cancel,
            );
        }
    };
    info!(
        metrics = input.metrics.len(),
        horizons = ?config.horizons,
        n_bins = config.n_bins,
        "starting information-gain analysis"
    );

    if let Err(err) = input.price.validate() {
        warn!(error = %err, "price series invalid; no metric can be scored");
        return fail_every_metric(
            input,
            failures,
            FailureKind::Data,
            format!("price series: {err}"),
            config,
            cancel,
        );
    }

    let run = || {
        input
            .metrics
            .par_iter()
            .map(|metric| evaluate_one(&evaluator, metric, &input.price, cancel))
            .collect::<Vec<_>>()
    };
    let outcomes = match config.parallel_threads {
        Some(threads) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| format!("infogain-{i}"))
                .build()
                .map_err(ConfigError::from);
            match pool {
                Ok(pool) => pool.install(run),
                Err(err) => {
                    warn!(threads, error = %err, "worker pool unavailable; no metric can be scored");
                    return fail_every_metric(
                        input,
                        failures,
                        FailureKind::Config,
                        format!("configuration: {err}"),
                        config,
                        cancel,
                    );
                }
            }
        }
        None => run(),
    };

    let mut evaluations = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        match outcome {
            Ok(evaluation) => evaluations.push(evaluation),
            Err(failure) => failures.push(failure),
        }
    }

    let cancelled = cancel.is_cancelled();
    if cancelled {
        info!(
            scored = evaluations.len(),
            "analysis cancelled; returning partial ranking"
        );
    }
    finish(evaluations, failures, config, cancelled)
}

/// Report every metric of `input` as failed for one run-wide reason.
fn fail_every_metric(
    input: &AnalysisInput,
    mut failures: Vec<MetricFailure>,
    kind: FailureKind,
    reason: String,
    config: &AnalysisConfig,
    cancel: &CancellationFlag,
) -> RankingReport {
    failures.extend(input.metrics.iter().map(|m| MetricFailure {
        metric: m.name.clone(),
        kind,
        reason: reason.clone(),
        horizons: Vec::new(),
    }));
    finish(Vec::new(), failures, config, cancel.is_cancelled())
}

fn evaluate_one(
    evaluator: &InformationGainEvaluator,
    metric: &MetricInput,
    price: &PriceSeries,
    cancel: &CancellationFlag,
) -> Result<MetricEvaluation, MetricFailure> {
    if cancel.is_cancelled() {
        return Err(MetricFailure::cancelled(metric.name.clone()));
    }
    evaluator.evaluate_metric(metric, price).map_err(|err| {
        warn!(metric = %metric.name, error = %err, "metric could not be scored");
        MetricFailure::new(metric.name.clone(), err)
    })
}

fn finish(
    evaluations: Vec<MetricEvaluation>,
    mut failures: Vec<MetricFailure>,
    config: &AnalysisConfig,
    cancelled: bool,
) -> RankingReport {
    let rankings = rank_metrics(evaluations, &config.weights);
    let summary = summarize(&rankings);
    failures.sort_by(|a, b| a.metric.cmp(&b.metric));

    info!(
        ranked = rankings.len(),
        failed = failures.len(),
        "information-gain analysis finished"
    );
    RankingReport {
        rankings,
        failures,
        summary,
        cancelled,
    }
}
