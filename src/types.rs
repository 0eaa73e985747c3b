//! Type definitions for input series and per-horizon results.
//!
//! Inputs are caller-owned and only ever borrowed. Outputs are plain
//! serde-serializable records so a report layer can write them out as-is.

use crate::errors::DataError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Unix timestamp in seconds.
pub type Timestamp = i64;

// ============================================================================
// Observations and Series
// ============================================================================

/// Value carried by one observation.
///
/// Deserializes from either a bare number or an object of named numbers,
/// matching the `v` / `o` payload shapes of the metrics API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObservationValue {
    Scalar(f64),
    Fields(BTreeMap<String, f64>),
}

impl ObservationValue {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar(v) => Some(*v),
            Self::Fields(_) => None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Scalar(_))
    }
}

/// One timestamped sample of a metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    #[serde(alias = "t")]
    pub timestamp: Timestamp,
    #[serde(alias = "v", alias = "o")]
    pub value: ObservationValue,
}

impl Observation {
    pub fn scalar(timestamp: Timestamp, value: f64) -> Self {
        Self {
            timestamp,
            value: ObservationValue::Scalar(value),
        }
    }

    /// Build a multi-field observation from `(name, value)` pairs.
    pub fn fields<I, K>(timestamp: Timestamp, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        Self {
            timestamp,
            value: ObservationValue::Fields(
                fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            ),
        }
    }
}

/// Ordered observations of one metric.
///
/// Timestamps must be strictly increasing; gaps are allowed and never
/// interpolated. Ordering is checked by [`Series::validate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Series {
    pub observations: Vec<Observation>,
}

impl Series {
    pub fn new(observations: Vec<Observation>) -> Self {
        Self { observations }
    }

    /// Build a scalar-valued series from parallel slices.
    pub fn from_scalars(timestamps: &[Timestamp], values: &[f64]) -> Self {
        Self {
            observations: timestamps
                .iter()
                .zip(values)
                .map(|(&t, &v)| Observation::scalar(t, v))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn is_all_scalar(&self) -> bool {
        self.observations.iter().all(|o| o.value.is_scalar())
    }

    /// Check that timestamps are strictly increasing.
    pub fn validate(&self) -> Result<(), DataError> {
        check_strictly_increasing(self.observations.iter().map(|o| o.timestamp))
    }
}

/// Scalar series stored as parallel columns.
///
/// Used both for the price target and for signals derived from
/// multi-field metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScalarSeries {
    pub timestamps: Vec<Timestamp>,
    pub values: Vec<f64>,
}

/// Closing-price series used as the prediction target.
pub type PriceSeries = ScalarSeries;

/// Scalar signal produced from a multi-field series. Never persisted.
pub type DerivedSignal = ScalarSeries;

impl ScalarSeries {
    pub fn new(timestamps: Vec<Timestamp>, values: Vec<f64>) -> Result<Self, DataError> {
        if timestamps.len() != values.len() {
            return Err(DataError::LengthMismatch {
                left: timestamps.len(),
                right: values.len(),
            });
        }
        Ok(Self { timestamps, values })
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Check column lengths and strictly increasing timestamps.
    pub fn validate(&self) -> Result<(), DataError> {
        if self.timestamps.len() != self.values.len() {
            return Err(DataError::LengthMismatch {
                left: self.timestamps.len(),
                right: self.values.len(),
            });
        }
        check_strictly_increasing(self.timestamps.iter().copied())
    }

    /// Value at an exact timestamp, if present.
    pub fn value_at(&self, timestamp: Timestamp) -> Option<f64> {
        self.timestamps
            .binary_search(&timestamp)
            .ok()
            .map(|idx| self.values[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = (Timestamp, f64)> + '_ {
        self.timestamps.iter().copied().zip(self.values.iter().copied())
    }
}

impl TryFrom<&Series> for ScalarSeries {
    type Error = DataError;

    /// Convert a series whose every value is scalar.
    fn try_from(series: &Series) -> Result<Self, Self::Error> {
        let mut timestamps = Vec::with_capacity(series.len());
        let mut values = Vec::with_capacity(series.len());
        for obs in &series.observations {
            match obs.value {
                ObservationValue::Scalar(v) => {
                    timestamps.push(obs.timestamp);
                    values.push(v);
                }
                ObservationValue::Fields(_) => {
                    return Err(DataError::UnexpectedFields {
                        timestamp: obs.timestamp,
                    })
                }
            }
        }
        Ok(Self { timestamps, values })
    }
}

fn check_strictly_increasing(
    mut timestamps: impl Iterator<Item = Timestamp>,
) -> Result<(), DataError> {
    let Some(mut prev) = timestamps.next() else {
        return Ok(());
    };
    for (offset, curr) in timestamps.enumerate() {
        if curr <= prev {
            return Err(DataError::UnsortedTimestamps {
                index: offset + 1,
                prev,
                curr,
            });
        }
        prev = curr;
    }
    Ok(())
}

// ============================================================================
// OHLC
// ============================================================================

/// One OHLC observation, as reduced by the `range` strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcBar {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl OhlcBar {
    /// Returns `None` unless high and low bound open and close.
    pub fn new(open: f64, high: f64, low: f64, close: f64) -> Option<Self> {
        let bar = Self {
            open,
            high,
            low,
            close,
        };
        bar.is_valid().then_some(bar)
    }

    /// High is the bar maximum and low its minimum.
    pub fn is_valid(&self) -> bool {
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }

    /// Range normalized by close: `(high - low) / close`.
    ///
    /// Returns `None` when close is zero.
    pub fn normalized_range(&self) -> Option<f64> {
        if self.close == 0.0 {
            None
        } else {
            Some((self.high - self.low) / self.close)
        }
    }
}

// ============================================================================
// Results
// ============================================================================

/// Information measures for one (metric, horizon) pair. All entropies in bits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GainResult {
    /// Horizon in sampling periods.
    pub horizon: u32,
    /// Aligned (predictor, target) pairs used.
    pub n_samples: usize,
    /// Effective buckets of the discretized target.
    pub target_bins: usize,
    /// Effective buckets of the discretized predictor.
    pub predictor_bins: usize,
    /// H(target)
    pub target_entropy: f64,
    /// H(predictor)
    pub indicator_entropy: f64,
    /// H(target | predictor)
    pub conditional_entropy: f64,
    /// H(target) - H(target | predictor), clamped at 0.
    pub information_gain: f64,
    /// information_gain / H(predictor)
    pub gain_ratio: f64,
    /// information_gain / min(H(target), H(predictor))
    pub normalized_mutual_information: f64,
    /// 2 * information_gain / (H(target) + H(predictor))
    pub symmetric_uncertainty: f64,
    /// information_gain / H(target)
    pub reduction_ratio: f64,
    /// Lagged transfer entropy; absent when too few lagged rows exist.
    pub transfer_entropy: Option<f64>,
    /// Pearson correlation of raw predictor and target; absent for zero variance.
    pub correlation: Option<f64>,
}

/// A horizon that could not be scored for a metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonFailure {
    pub horizon: u32,
    pub reason: String,
}
