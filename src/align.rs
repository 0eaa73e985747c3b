//! Timestamp alignment of a metric against the price target.
//!
//! Alignment is an exact inner join on timestamps. A base timestamp `t` is
//! kept for horizon `h` only when the metric has a value at `t` and the price
//! series has values at both `t` and `t + h * interval`. Nothing is
//! interpolated or forward-filled.

use crate::types::{PriceSeries, ScalarSeries, Timestamp};

/// Metric values paired with the forward price change from the same base time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedSamples {
    pub timestamps: Vec<Timestamp>,
    /// Metric value at `t`.
    pub predictor: Vec<f64>,
    /// `(price[t + horizon] - price[t]) / price[t]`
    pub target: Vec<f64>,
}

impl AlignedSamples {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// Rows `t` and `t + lag` of an [`AlignedSamples`], joined.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaggedTriples {
    /// Target at `t + lag`.
    pub future: Vec<f64>,
    /// Target at `t`.
    pub past: Vec<f64>,
    /// Predictor at `t`.
    pub source: Vec<f64>,
}

impl LaggedTriples {
    pub fn len(&self) -> usize {
        self.future.len()
    }

    pub fn is_empty(&self) -> bool {
        self.future.is_empty()
    }
}

/// Offset in seconds for `periods` sampling intervals, if representable.
pub fn horizon_offset(periods: u32, interval_secs: i64) -> Option<i64> {
    i64::from(periods).checked_mul(interval_secs)
}

/// Pair each metric value with the forward price change over `horizon` periods.
///
/// Pairs whose metric value or price change is not finite (for example a
/// zero base price) are dropped.
///
/// # Example
///
/// ```rust
/// use infogain_metrics::align::align_forward_changes;
/// use infogain_metrics::ScalarSeries;
///
/// let metric = ScalarSeries::new(vec![1, 2, 3, 5], vec![0.1, 0.2, 0.3, 0.5]).unwrap();
/// let price = ScalarSeries::new(vec![1, 2, 3, 4, 5], vec![10.0, 11.0, 12.0, 13.0, 14.0]).unwrap();
/// let aligned = align_forward_changes(&metric, &price, 1, 1);
/// assert_eq!(aligned.timestamps, vec![1, 2, 3]);
/// ```
pub fn align_forward_changes(
    metric: &ScalarSeries,
    price: &PriceSeries,
    horizon: u32,
    interval_secs: i64,
) -> AlignedSamples {
    let mut aligned = AlignedSamples::default();
    let Some(offset) = horizon_offset(horizon, interval_secs) else {
        return aligned;
    };

    for (t, value) in metric.iter() {
        let Some(future_t) = t.checked_add(offset) else {
            continue;
        };
        let (Some(base), Some(future)) = (price.value_at(t), price.value_at(future_t)) else {
            continue;
        };
        let change = (future - base) / base;
        if value.is_finite() && change.is_finite() {
            aligned.timestamps.push(t);
            aligned.predictor.push(value);
            aligned.target.push(change);
        }
    }
    aligned
}

/// Join each aligned row with the row `lag_secs` later.
pub fn lagged_triples(aligned: &AlignedSamples, lag_secs: i64) -> LaggedTriples {
    let mut triples = LaggedTriples::default();
    for (i, &t) in aligned.timestamps.iter().enumerate() {
        let Some(later) = t.checked_add(lag_secs) else {
            continue;
        };
        if let Ok(j) = aligned.timestamps.binary_search(&later) {
            triples.future.push(aligned.target[j]);
            triples.past.push(aligned.target[i]);
            triples.source.push(aligned.predictor[i]);
        }
    }
    triples
}
