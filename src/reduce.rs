//! Reduction of multi-field observations to one scalar.
//!
//! | Strategy | Input | Output |
//! |----------|-------|--------|
//! | `auto` | bare value or named values | the value, or the mean of the fields |
//! | `scalar` | bare value | the value |
//! | `concentration` | distribution shares | HHI = Σ share², shares normalized by their sum |
//! | `range` | open/high/low/close | (high - low) / close |
//! | `mean` | any named values | arithmetic mean |
//!
//! An undeclared metric uses `auto`, which only looks at the value's shape.
//! The reducer never guesses from field names. Missing or malformed fields
//! are errors, never defaults.

use crate::errors::{ConfigError, DataError};
use crate::types::{DerivedSignal, Observation, ObservationValue, OhlcBar, Series, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// How a metric's observations become one scalar per timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReductionStrategy {
    /// No declared strategy: scalars pass through, fields are averaged.
    #[default]
    Auto,
    /// Value must already be scalar.
    Scalar,
    /// Herfindahl-Hirschman index of distribution shares.
    Concentration,
    /// Close-normalized high-low range of an OHLC bar.
    Range,
    /// Mean of every field present.
    Mean,
}

impl ReductionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Scalar => "scalar",
            Self::Concentration => "concentration",
            Self::Range => "range",
            Self::Mean => "mean",
        }
    }

    /// Reduce one observation.
    pub fn reduce(&self, observation: &Observation) -> Result<f64, DataError> {
        let timestamp = observation.timestamp;
        match (&observation.value, self) {
            (ObservationValue::Scalar(v), Self::Auto | Self::Scalar | Self::Mean) => Ok(*v),
            (ObservationValue::Scalar(_), Self::Concentration | Self::Range) => {
                Err(DataError::ExpectedFields {
                    timestamp,
                    strategy: self.as_str(),
                })
            }
            (ObservationValue::Fields(_), Self::Scalar) => {
                Err(DataError::UnexpectedFields { timestamp })
            }
            (ObservationValue::Fields(fields), Self::Concentration) => {
                herfindahl_index(timestamp, fields)
            }
            (ObservationValue::Fields(fields), Self::Range) => {
                let bar = ohlc_from_fields(timestamp, fields)?;
                bar.normalized_range()
                    .ok_or(DataError::ZeroClose { timestamp })
            }
            (ObservationValue::Fields(fields), Self::Auto | Self::Mean) => {
                field_mean(timestamp, fields)
            }
        }
    }
}

impl fmt::Display for ReductionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReductionStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "scalar" => Ok(Self::Scalar),
            "concentration" | "hhi" => Ok(Self::Concentration),
            "range" | "ohlc" => Ok(Self::Range),
            "mean" => Ok(Self::Mean),
            _ => Err(ConfigError::UnknownStrategy {
                name: s.to_string(),
            }),
        }
    }
}

/// Reduce every observation of `series`, preserving timestamps.
///
/// Fails on the first observation that cannot be reduced.
///
/// # Example
///
/// ```rust
/// use infogain_metrics::{reduce_series, Observation, ReductionStrategy, Series};
///
/// let series = Series::new(vec![
///     Observation::fields(1, [("a", 0.5), ("b", 0.5)]),
///     Observation::fields(2, [("a", 1.0), ("b", 0.0)]),
/// ]);
/// let signal = reduce_series(&series, ReductionStrategy::Concentration).unwrap();
/// assert_eq!(signal.timestamps, vec![1, 2]);
/// assert!((signal.values[0] - 0.5).abs() < 1e-12);
/// assert!((signal.values[1] - 1.0).abs() < 1e-12);
/// ```
pub fn reduce_series(series: &Series, strategy: ReductionStrategy) -> Result<DerivedSignal, DataError> {
    let mut timestamps = Vec::with_capacity(series.len());
    let mut values = Vec::with_capacity(series.len());
    for observation in &series.observations {
        values.push(strategy.reduce(observation)?);
        timestamps.push(observation.timestamp);
    }
    Ok(DerivedSignal { timestamps, values })
}

// ============================================================================
// Concentration (HHI)
// ============================================================================

/// Herfindahl-Hirschman index of the shares in `fields`.
///
/// Shares are normalized by their sum, so the result lies in `[1/k, 1]`
/// for `k` non-zero shares.
pub fn herfindahl_index(timestamp: Timestamp, fields: &BTreeMap<String, f64>) -> Result<f64, DataError> {
    if fields.is_empty() {
        return Err(DataError::EmptyObservation { timestamp });
    }
    for (field, &share) in fields {
        check_finite(timestamp, field, share)?;
        if share < 0.0 {
            return Err(DataError::NegativeShare {
                timestamp,
                field: field.clone(),
            });
        }
    }

    let total: f64 = fields.values().sum();
    if total <= 0.0 {
        return Err(DataError::NonPositiveShareTotal { timestamp });
    }
    Ok(fields.values().map(|s| (s / total).powi(2)).sum())
}

// ============================================================================
// Range (OHLC)
// ============================================================================

const OHLC_FIELDS: [(&str, &str); 4] = [("open", "o"), ("high", "h"), ("low", "l"), ("close", "c")];

fn ohlc_from_fields(timestamp: Timestamp, fields: &BTreeMap<String, f64>) -> Result<OhlcBar, DataError> {
    let mut values = [0.0f64; 4];
    for (slot, (long, short)) in values.iter_mut().zip(OHLC_FIELDS) {
        let (name, value) = fields
            .get_key_value(long)
            .or_else(|| fields.get_key_value(short))
            .ok_or_else(|| DataError::MissingField {
                field: long.to_string(),
            })?;
        check_finite(timestamp, name, *value)?;
        *slot = *value;
    }
    let [open, high, low, close] = values;
    OhlcBar::new(open, high, low, close).ok_or(DataError::MalformedBar { timestamp })
}

// ============================================================================
// Mean
// ============================================================================

fn field_mean(timestamp: Timestamp, fields: &BTreeMap<String, f64>) -> Result<f64, DataError> {
    if fields.is_empty() {
        return Err(DataError::EmptyObservation { timestamp });
    }
    for (field, &value) in fields {
        check_finite(timestamp, field, value)?;
    }
    Ok(fields.values().sum::<f64>() / fields.len() as f64)
}

fn check_finite(timestamp: Timestamp, field: &str, value: f64) -> Result<(), DataError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(DataError::NonFiniteField {
            timestamp,
            field: field.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shares(values: &[f64]) -> BTreeMap<String, f64> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| (format!("bucket_{i:02}"), v))
            .collect()
    }

    // Concentration tests
    #[test]
    fn test_hhi_even_shares() {
        let hhi = herfindahl_index(0, &shares(&[0.1; 10])).unwrap();
        assert!((hhi - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_hhi_single_holder() {
        let hhi = herfindahl_index(0, &shares(&[0.0, 0.0, 1.0])).unwrap();
        assert!((hhi - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_hhi_normalizes_unscaled_shares() {
        // 30/70 written as percentages
        let hhi = herfindahl_index(0, &shares(&[30.0, 70.0])).unwrap();
        assert!((hhi - 0.58).abs() < 1e-12);
    }

    #[test]
    fn test_hhi_rejects_negative_share() {
        let err = herfindahl_index(7, &shares(&[0.5, -0.1])).unwrap_err();
        assert_eq!(
            err,
            DataError::NegativeShare {
                timestamp: 7,
                field: "bucket_01".to_string()
            }
        );
    }

    #[test]
    fn test_hhi_rejects_zero_total() {
        let err = herfindahl_index(3, &shares(&[0.0, 0.0])).unwrap_err();
        assert_eq!(err, DataError::NonPositiveShareTotal { timestamp: 3 });
    }

    // Range tests
    #[test]
    fn test_range_long_field_names() {
        let obs = Observation::fields(
            1,
            [("open", 100.0), ("high", 110.0), ("low", 95.0), ("close", 105.0)],
        );
        let v = ReductionStrategy::Range.reduce(&obs).unwrap();
        assert!((v - 15.0 / 105.0).abs() < 1e-12);
    }

    #[test]
    fn test_range_short_field_names() {
        let obs = Observation::fields(1, [("o", 10.0), ("h", 12.0), ("l", 9.0), ("c", 10.0)]);
        let v = ReductionStrategy::Range.reduce(&obs).unwrap();
        assert!((v - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_range_missing_field_named() {
        let obs = Observation::fields(1, [("open", 10.0), ("high", 12.0), ("close", 10.0)]);
        let err = ReductionStrategy::Range.reduce(&obs).unwrap_err();
        assert_eq!(
            err,
            DataError::MissingField {
                field: "low".to_string()
            }
        );
    }

    #[test]
    fn test_range_rejects_inverted_bar() {
        // low above high
        let obs = Observation::fields(4, [("o", 10.0), ("h", 9.0), ("l", 11.0), ("c", 10.0)]);
        let err = ReductionStrategy::Range.reduce(&obs).unwrap_err();
        assert_eq!(err, DataError::MalformedBar { timestamp: 4 });
    }

    #[test]
    fn test_range_rejects_close_outside_bar() {
        let obs = Observation::fields(6, [("o", 10.0), ("h", 12.0), ("l", 9.0), ("c", 13.0)]);
        let err = ReductionStrategy::Range.reduce(&obs).unwrap_err();
        assert_eq!(err, DataError::MalformedBar { timestamp: 6 });
    }

    #[test]
    fn test_range_zero_close() {
        let obs = Observation::fields(9, [("o", 1.0), ("h", 2.0), ("l", 0.0), ("c", 0.0)]);
        let err = ReductionStrategy::Range.reduce(&obs).unwrap_err();
        assert_eq!(err, DataError::ZeroClose { timestamp: 9 });
    }

    // Mean and dispatch tests
    #[test]
    fn test_mean_of_fields() {
        let obs = Observation::fields(1, [("a", 1.0), ("b", 2.0), ("c", 6.0)]);
        assert_eq!(ReductionStrategy::Mean.reduce(&obs).unwrap(), 3.0);
    }

    #[test]
    fn test_mean_passes_scalar_through() {
        let obs = Observation::scalar(1, 4.5);
        assert_eq!(ReductionStrategy::Mean.reduce(&obs).unwrap(), 4.5);
    }

    #[test]
    fn test_auto_averages_fields_and_passes_scalars() {
        let fields = Observation::fields(1, [("a", 1.0), ("b", 2.0), ("c", 6.0)]);
        assert_eq!(ReductionStrategy::Auto.reduce(&fields).unwrap(), 3.0);
        assert_eq!(ReductionStrategy::Auto.reduce(&Observation::scalar(2, -0.5)).unwrap(), -0.5);
        assert_eq!(ReductionStrategy::default(), ReductionStrategy::Auto);
    }

    #[test]
    fn test_scalar_strategy_rejects_fields() {
        let obs = Observation::fields(5, [("a", 1.0)]);
        let err = ReductionStrategy::Scalar.reduce(&obs).unwrap_err();
        assert_eq!(err, DataError::UnexpectedFields { timestamp: 5 });
    }

    #[test]
    fn test_concentration_rejects_scalar() {
        let err = ReductionStrategy::Concentration
            .reduce(&Observation::scalar(2, 0.3))
            .unwrap_err();
        assert_eq!(
            err,
            DataError::ExpectedFields {
                timestamp: 2,
                strategy: "concentration"
            }
        );
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!("Range".parse::<ReductionStrategy>().unwrap(), ReductionStrategy::Range);
        assert_eq!("auto".parse::<ReductionStrategy>().unwrap(), ReductionStrategy::Auto);
        assert_eq!(
            "hhi".parse::<ReductionStrategy>().unwrap(),
            ReductionStrategy::Concentration
        );
        let err = "median".parse::<ReductionStrategy>().unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownStrategy {
                name: "median".to_string()
            }
        );
    }

    #[test]
    fn test_reduce_series_stops_at_first_bad_observation() {
        let series = Series::new(vec![
            Observation::fields(1, [("a", 1.0)]),
            Observation::fields(2, BTreeMap::<String, f64>::new()),
        ]);
        let err = reduce_series(&series, ReductionStrategy::Mean).unwrap_err();
        assert_eq!(err, DataError::EmptyObservation { timestamp: 2 });
    }
}
