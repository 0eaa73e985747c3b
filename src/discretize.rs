//! Quantile discretization of scalar samples.
//!
//! Cut points are computed from the same samples being binned (in-sample).
//! Quantiles use linear interpolation between order statistics. Bins are
//! right-closed, `(e_k, e_{k+1}]`, with the first bin also holding the minimum.
//!
//! Repeated values can make neighbouring cut points coincide. Coincident cut
//! points are collapsed, and any bin left empty is merged into its right
//! neighbour, so every reported bucket is populated and
//! [`Discretization::effective_bins`] is the true cardinality.

use crate::errors::{AnalysisError, ConfigError, DataError};

/// Bucket assignment for a scalar sample set.
#[derive(Debug, Clone, PartialEq)]
pub struct Discretization {
    /// Bucket index per input sample, in `[0, effective_bins)`.
    pub labels: Vec<usize>,
    /// Non-decreasing bucket boundaries, `effective_bins + 1` values from min to max.
    pub boundaries: Vec<f64>,
    /// Number of populated buckets.
    pub effective_bins: usize,
    /// Bucket count asked for.
    pub requested_bins: usize,
}

impl Discretization {
    /// Population of each bucket.
    pub fn counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.effective_bins];
        for &label in &self.labels {
            counts[label] += 1;
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// True when repeated values forced fewer buckets than requested.
    pub fn is_collapsed(&self) -> bool {
        self.effective_bins < self.requested_bins
    }
}

/// Discretize `samples` into (at most) `n_bins` equal-population buckets.
///
/// # Errors
///
/// * [`ConfigError::InvalidBinCount`] when `n_bins < 2`
/// * [`DataError::NonFiniteSample`] for NaN or infinite input
/// * [`DataError::TooFewDistinctValues`] when fewer than 2 distinct values exist
///
/// # Example
///
/// ```rust
/// use infogain_metrics::quantile_discretize;
///
/// let samples: Vec<f64> = (0..100).map(|i| i as f64).collect();
/// let d = quantile_discretize(&samples, 4).unwrap();
/// assert_eq!(d.effective_bins, 4);
/// assert_eq!(d.counts(), vec![25, 25, 25, 25]);
/// ```
pub fn quantile_discretize(samples: &[f64], n_bins: usize) -> Result<Discretization, AnalysisError> {
    if n_bins < 2 {
        return Err(ConfigError::InvalidBinCount { n_bins }.into());
    }
    if let Some(index) = samples.iter().position(|v| !v.is_finite()) {
        return Err(DataError::NonFiniteSample { index }.into());
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);

    let distinct = count_distinct_sorted(&sorted);
    if distinct < 2 {
        return Err(DataError::TooFewDistinctValues { distinct }.into());
    }

    let edges = collapsed_quantile_edges(&sorted, n_bins);
    let labels = assign(samples, &edges);
    let (labels, boundaries) = merge_empty_bins(labels, edges);

    Ok(Discretization {
        effective_bins: boundaries.len() - 1,
        labels,
        boundaries,
        requested_bins: n_bins,
    })
}

fn count_distinct_sorted(sorted: &[f64]) -> usize {
    match sorted.first() {
        None => 0,
        Some(_) => 1 + sorted.windows(2).filter(|w| w[1] > w[0]).count(),
    }
}

/// Linear-interpolation quantile of already sorted data.
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let last = sorted.len() - 1;
    let pos = q * last as f64;
    let lo = pos.floor() as usize;
    if lo >= last {
        return sorted[last];
    }
    let frac = pos - lo as f64;
    sorted[lo] + frac * (sorted[lo + 1] - sorted[lo])
}

/// Cut points at `i / n_bins`, with duplicates dropped.
fn collapsed_quantile_edges(sorted: &[f64], n_bins: usize) -> Vec<f64> {
    let mut edges: Vec<f64> = Vec::with_capacity(n_bins + 1);
    for i in 0..=n_bins {
        let raw = quantile_sorted(sorted, i as f64 / n_bins as f64);
        match edges.last() {
            // Interpolation rounding can dip an ulp below the previous edge.
            Some(&prev) if raw <= prev => continue,
            _ => edges.push(raw),
        }
    }
    // The top edge must be the maximum so it lands in the last bin.
    if let (Some(last), Some(&max)) = (edges.last_mut(), sorted.last()) {
        if *last < max {
            *last = max;
        }
    }
    edges
}

fn assign(samples: &[f64], edges: &[f64]) -> Vec<usize> {
    let interior = &edges[1..edges.len() - 1];
    samples
        .iter()
        .map(|&x| interior.partition_point(|&e| e < x))
        .collect()
}

/// Drop the upper edge of every empty bin and relabel densely.
fn merge_empty_bins(labels: Vec<usize>, edges: Vec<f64>) -> (Vec<usize>, Vec<f64>) {
    let n_bins = edges.len() - 1;
    let mut occupied = vec![false; n_bins];
    for &label in &labels {
        occupied[label] = true;
    }
    if occupied.iter().all(|&o| o) {
        return (labels, edges);
    }

    let mut remap = vec![0usize; n_bins];
    let mut boundaries = vec![edges[0]];
    let mut next = 0usize;
    for bin in 0..n_bins {
        remap[bin] = next;
        if occupied[bin] {
            boundaries.push(edges[bin + 1]);
            next += 1;
        }
    }
    // Empty bins were mapped to the index of the next occupied bin.
    let labels = labels.into_iter().map(|l| remap[l]).collect();
    (labels, boundaries)
}
