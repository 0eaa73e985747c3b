//! Composite scoring and ranking of evaluated metrics.
//!
//! Each measure is first averaged over the horizons a metric could be scored
//! on, then the averages are combined with [`CompositeWeights`]:
//!
//! | Measure | Default weight | Always present |
//! |---------|----------------|----------------|
//! | Information gain | 0.3 | yes |
//! | Normalized mutual information | 0.3 | yes |
//! | Symmetric uncertainty | 0.2 | yes |
//! | Transfer entropy | 0.2 | no |
//!
//! When a measure is missing for every horizon its weight is dropped and the
//! remaining weights are scaled up to the original total, so a metric is not
//! penalized for lacking an optional term.

use crate::errors::ConfigError;
use crate::evaluator::MetricEvaluation;
use crate::reduce::ReductionStrategy;
use crate::types::{GainResult, HorizonFailure};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Weights
// ============================================================================

/// Weights of the four measures in the composite score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeWeights {
    pub information_gain: f64,
    pub normalized_mutual_information: f64,
    pub symmetric_uncertainty: f64,
    pub transfer_entropy: f64,
}

impl Default for CompositeWeights {
    fn default() -> Self {
        Self {
            information_gain: 0.3,
            normalized_mutual_information: 0.3,
            symmetric_uncertainty: 0.2,
            transfer_entropy: 0.2,
        }
    }
}

impl CompositeWeights {
    pub fn new(
        information_gain: f64,
        normalized_mutual_information: f64,
        symmetric_uncertainty: f64,
        transfer_entropy: f64,
    ) -> Self {
        Self {
            information_gain,
            normalized_mutual_information,
            symmetric_uncertainty,
            transfer_entropy,
        }
    }

    fn as_array(&self) -> [f64; 4] {
        [
            self.information_gain,
            self.normalized_mutual_information,
            self.symmetric_uncertainty,
            self.transfer_entropy,
        ]
    }

    pub fn total(&self) -> f64 {
        self.as_array().iter().sum()
    }

    /// Weights must be finite, non-negative and not all zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(w) = self.as_array().iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(ConfigError::InvalidWeights {
                reason: format!("weight {w} is negative or not finite"),
            });
        }
        if self.total() <= 0.0 {
            return Err(ConfigError::InvalidWeights {
                reason: "weights sum to zero".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Composite Score
// ============================================================================

/// Per-measure means over a metric's scored horizons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureAverages {
    pub information_gain: f64,
    pub normalized_mutual_information: f64,
    pub symmetric_uncertainty: f64,
    /// Mean over horizons where transfer entropy was computed.
    pub transfer_entropy: Option<f64>,
    pub reduction_ratio: f64,
    pub gain_ratio: f64,
}

/// Ranking-ready aggregate for one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeScore {
    pub score: f64,
    pub averages: MeasureAverages,
    pub horizons_used: usize,
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Combine per-horizon results into one score.
///
/// Returns `None` for an empty slice.
pub fn composite_score(results: &[GainResult], weights: &CompositeWeights) -> Option<CompositeScore> {
    let information_gain = mean(results.iter().map(|r| r.information_gain))?;
    let averages = MeasureAverages {
        information_gain,
        normalized_mutual_information: mean(
            results.iter().map(|r| r.normalized_mutual_information),
        )?,
        symmetric_uncertainty: mean(results.iter().map(|r| r.symmetric_uncertainty))?,
        transfer_entropy: mean(results.iter().filter_map(|r| r.transfer_entropy)),
        reduction_ratio: mean(results.iter().map(|r| r.reduction_ratio))?,
        gain_ratio: mean(results.iter().map(|r| r.gain_ratio))?,
    };

    let terms = [
        (weights.information_gain, Some(averages.information_gain)),
        (
            weights.normalized_mutual_information,
            Some(averages.normalized_mutual_information),
        ),
        (
            weights.symmetric_uncertainty,
            Some(averages.symmetric_uncertainty),
        ),
        (weights.transfer_entropy, averages.transfer_entropy),
    ];
    let available_weight: f64 = terms
        .iter()
        .filter(|(_, v)| v.is_some())
        .map(|(w, _)| w)
        .sum();
    let weighted: f64 = terms
        .iter()
        .filter_map(|(w, v)| v.map(|v| w * v))
        .sum();

    let score = if available_weight > 0.0 {
        weighted * weights.total() / available_weight
    } else {
        0.0
    };

    Some(CompositeScore {
        score,
        averages,
        horizons_used: results.len(),
    })
}

// ============================================================================
// Ranking
// ============================================================================

/// One metric in the final ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedMetric {
    /// 1-based position.
    pub rank: usize,
    pub metric: String,
    pub strategy: ReductionStrategy,
    pub composite: CompositeScore,
    /// Scored horizons, ascending.
    pub horizons: Vec<GainResult>,
    /// Horizons that could not be scored.
    pub horizon_failures: Vec<HorizonFailure>,
}

/// Flat row-per-metric view of a [`RankedMetric`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingRow {
    pub rank: usize,
    pub metric: String,
    pub strategy: ReductionStrategy,
    pub composite_score: f64,
    pub avg_information_gain: f64,
    pub avg_normalized_mutual_information: f64,
    pub avg_symmetric_uncertainty: f64,
    pub avg_transfer_entropy: Option<f64>,
    pub horizons_scored: usize,
    pub horizons_failed: usize,
}

impl RankedMetric {
    pub fn score(&self) -> f64 {
        self.composite.score
    }

    pub fn horizon(&self, horizon: u32) -> Option<&GainResult> {
        self.horizons.iter().find(|r| r.horizon == horizon)
    }

    pub fn row(&self) -> RankingRow {
        let avg = &self.composite.averages;
        RankingRow {
            rank: self.rank,
            metric: self.metric.clone(),
            strategy: self.strategy,
            composite_score: self.composite.score,
            avg_information_gain: avg.information_gain,
            avg_normalized_mutual_information: avg.normalized_mutual_information,
            avg_symmetric_uncertainty: avg.symmetric_uncertainty,
            avg_transfer_entropy: avg.transfer_entropy,
            horizons_scored: self.horizons.len(),
            horizons_failed: self.horizon_failures.len(),
        }
    }
}

/// Score and sort evaluated metrics, best first.
///
/// Ties on score are broken by metric name so the order is deterministic.
/// Evaluations without any scored horizon are left out.
pub fn rank_metrics(evaluations: Vec<MetricEvaluation>, weights: &CompositeWeights) -> Vec<RankedMetric> {
    let mut ranked: Vec<RankedMetric> = evaluations
        .into_iter()
        .filter_map(|eval| {
            let composite = composite_score(&eval.results, weights)?;
            Some(RankedMetric {
                rank: 0,
                metric: eval.metric,
                strategy: eval.strategy,
                composite,
                horizons: eval.results,
                horizon_failures: eval.failures,
            })
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.composite
            .score
            .total_cmp(&a.composite.score)
            .then_with(|| a.metric.cmp(&b.metric))
    });
    for (i, entry) in ranked.iter_mut().enumerate() {
        entry.rank = i + 1;
    }
    ranked
}

// ============================================================================
// Summary
// ============================================================================

/// Metric with the highest information gain at one horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonLeader {
    pub metric: String,
    pub information_gain: f64,
}

/// Horizon with the highest mean information gain across metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestHorizon {
    pub horizon: u32,
    pub mean_information_gain: f64,
    pub metrics: usize,
}

/// Cross-metric highlights of a ranking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankingSummary {
    pub best_by_horizon: BTreeMap<u32, HorizonLeader>,
    pub best_horizon: Option<BestHorizon>,
}

/// Build the per-horizon leaders and best horizon from a ranking.
///
/// Equal gains keep the better-ranked metric.
pub fn summarize(ranked: &[RankedMetric]) -> RankingSummary {
    let mut best_by_horizon: BTreeMap<u32, HorizonLeader> = BTreeMap::new();
    let mut per_horizon: BTreeMap<u32, (f64, usize)> = BTreeMap::new();

    for entry in ranked {
        for result in &entry.horizons {
            let ig = result.information_gain;
            let slot = per_horizon.entry(result.horizon).or_insert((0.0, 0));
            slot.0 += ig;
            slot.1 += 1;

            let better = best_by_horizon
                .get(&result.horizon)
                .map_or(true, |leader| ig > leader.information_gain);
            if better {
                best_by_horizon.insert(
                    result.horizon,
                    HorizonLeader {
                        metric: entry.metric.clone(),
                        information_gain: ig,
                    },
                );
            }
        }
    }

    let best_horizon = per_horizon
        .into_iter()
        .map(|(horizon, (sum, n))| BestHorizon {
            horizon,
            mean_information_gain: sum / n as f64,
            metrics: n,
        })
        .fold(None, |best: Option<BestHorizon>, candidate| match best {
            Some(b) if b.mean_information_gain >= candidate.mean_information_gain => Some(b),
            _ => Some(candidate),
        });

    RankingSummary {
        best_by_horizon,
        best_horizon,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gain(horizon: u32, ig: f64, nmi: f64, su: f64, te: Option<f64>) -> GainResult {
        GainResult {
            horizon,
            n_samples: 100,
            target_bins: 10,
            predictor_bins: 10,
            target_entropy: 3.0,
            indicator_entropy: 3.0,
            conditional_entropy: 3.0 - ig,
            information_gain: ig,
            gain_ratio: ig / 3.0,
            normalized_mutual_information: nmi,
            symmetric_uncertainty: su,
            reduction_ratio: ig / 3.0,
            transfer_entropy: te,
            correlation: None,
        }
    }

    fn evaluation(name: &str, results: Vec<GainResult>) -> MetricEvaluation {
        MetricEvaluation {
            metric: name.to_string(),
            strategy: ReductionStrategy::Scalar,
            results,
            failures: vec![],
        }
    }

    #[test]
    fn test_composite_with_all_terms() {
        let results = vec![gain(1, 1.0, 0.5, 0.4, Some(0.2))];
        let score = composite_score(&results, &CompositeWeights::default()).unwrap();
        let expected = 0.3 * 1.0 + 0.3 * 0.5 + 0.2 * 0.4 + 0.2 * 0.2;
        assert!((score.score - expected).abs() < 1e-12);
    }

    #[test]
    fn test_composite_renormalizes_missing_transfer_entropy() {
        let results = vec![gain(1, 1.0, 0.5, 0.4, None)];
        let score = composite_score(&results, &CompositeWeights::default()).unwrap();
        let expected = (0.3 * 1.0 + 0.3 * 0.5 + 0.2 * 0.4) / 0.8;
        assert!((score.score - expected).abs() < 1e-12);
        assert!(score.averages.transfer_entropy.is_none());
    }

    #[test]
    fn test_composite_averages_across_horizons() {
        let results = vec![
            gain(1, 1.0, 0.4, 0.2, Some(0.3)),
            gain(7, 0.5, 0.2, 0.1, None),
        ];
        let score = composite_score(&results, &CompositeWeights::default()).unwrap();
        assert!((score.averages.information_gain - 0.75).abs() < 1e-12);
        // transfer entropy averages only where present
        assert_eq!(score.averages.transfer_entropy, Some(0.3));
        assert_eq!(score.horizons_used, 2);
    }

    #[test]
    fn test_composite_empty_is_none() {
        assert!(composite_score(&[], &CompositeWeights::default()).is_none());
    }

    #[test]
    fn test_alternate_weights() {
        let results = vec![gain(1, 1.0, 0.5, 0.4, Some(0.2))];
        let ig_only = CompositeWeights::new(1.0, 0.0, 0.0, 0.0);
        let score = composite_score(&results, &ig_only).unwrap();
        assert!((score.score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_weights_validation() {
        assert!(CompositeWeights::default().validate().is_ok());
        assert!(CompositeWeights::new(-0.1, 0.5, 0.3, 0.3).validate().is_err());
        assert!(CompositeWeights::new(0.0, 0.0, 0.0, 0.0).validate().is_err());
        assert!(CompositeWeights::new(f64::NAN, 0.5, 0.3, 0.3).validate().is_err());
    }

    #[test]
    fn test_rank_descending_with_name_tiebreak() {
        let evals = vec![
            evaluation("zeta", vec![gain(1, 0.5, 0.2, 0.1, None)]),
            evaluation("alpha", vec![gain(1, 0.5, 0.2, 0.1, None)]),
            evaluation("best", vec![gain(1, 1.5, 0.6, 0.5, None)]),
        ];
        let ranked = rank_metrics(evals, &CompositeWeights::default());
        let names: Vec<&str> = ranked.iter().map(|r| r.metric.as_str()).collect();
        assert_eq!(names, vec!["best", "alpha", "zeta"]);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[2].rank, 3);
    }

    #[test]
    fn test_rank_skips_unscored() {
        let evals = vec![evaluation("empty", vec![]), evaluation("ok", vec![gain(1, 0.1, 0.1, 0.1, None)])];
        let ranked = rank_metrics(evals, &CompositeWeights::default());
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].metric, "ok");
    }

    #[test]
    fn test_row_flattens() {
        let evals = vec![evaluation("m", vec![gain(1, 0.4, 0.2, 0.1, Some(0.05))])];
        let ranked = rank_metrics(evals, &CompositeWeights::default());
        let row = ranked[0].row();
        assert_eq!(row.rank, 1);
        assert_eq!(row.metric, "m");
        assert_eq!(row.horizons_scored, 1);
        assert_eq!(row.avg_transfer_entropy, Some(0.05));
    }

    #[test]
    fn test_summary_leaders_and_best_horizon() {
        let evals = vec![
            evaluation("a", vec![gain(1, 0.9, 0.3, 0.3, None), gain(7, 0.1, 0.1, 0.1, None)]),
            evaluation("b", vec![gain(1, 0.3, 0.1, 0.1, None), gain(7, 0.4, 0.2, 0.2, None)]),
        ];
        let ranked = rank_metrics(evals, &CompositeWeights::default());
        let summary = summarize(&ranked);

        assert_eq!(summary.best_by_horizon[&1].metric, "a");
        assert_eq!(summary.best_by_horizon[&7].metric, "b");
        let best = summary.best_horizon.unwrap();
        assert_eq!(best.horizon, 1);
        assert!((best.mean_information_gain - 0.6).abs() < 1e-12);
    }
}
