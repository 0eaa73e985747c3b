//! Entropy measures over discretized series.
//!
//! All entropies are in bits.
//!
//! | Measure | Formula | Range |
//! |---------|---------|-------|
//! | Shannon entropy | H(Y) = -Σ p(y) log2 p(y) | [0, log2 k] |
//! | Conditional entropy | H(Y\|X) = Σ_x p(x) H(Y\|X=x) | [0, H(Y)] |
//! | Mutual information | I(X;Y) = H(Y) - H(Y\|X) | [0, min(H(X), H(Y))] |
//! | Transfer entropy | T = H(Y' \| Y) - H(Y' \| Y, X) | [0, H(Y' \| Y)] |

use crate::errors::DataError;
use crate::guards::PROBABILITY_FLOOR;
use std::collections::BTreeMap;

// ============================================================================
// Shannon Entropy
// ============================================================================

/// Shannon entropy in bits of a histogram.
///
/// Empty buckets contribute 0. Returns 0 for an all-zero histogram.
///
/// # Example
///
/// ```rust
/// use infogain_metrics::entropy::entropy_from_counts;
///
/// let h = entropy_from_counts(&[5, 5, 0, 5, 5]);
/// assert!((h - 2.0).abs() < 1e-12);
/// ```
pub fn entropy_from_counts(counts: &[usize]) -> f64 {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let n = total as f64;

    let mut entropy = 0.0;
    for &count in counts {
        if count > 0 {
            let p = count as f64 / n;
            entropy -= p * p.max(PROBABILITY_FLOOR).log2();
        }
    }
    // -0.0 for a single bucket
    entropy.max(0.0)
}

/// Shannon entropy in bits of a label sequence.
///
/// Labels may be any `usize`; only their distinct values matter.
pub fn shannon_entropy_bits(labels: &[usize]) -> f64 {
    entropy_from_counts(&label_counts(labels))
}

/// Occurrences per distinct label, in ascending label order.
fn label_counts(labels: &[usize]) -> Vec<usize> {
    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    for &label in labels {
        *counts.entry(label).or_default() += 1;
    }
    counts.into_values().collect()
}

// ============================================================================
// Conditional Entropy
// ============================================================================

/// Conditional entropy H(target | condition) in bits.
///
/// Partitions `target` by the value of `condition` and returns the
/// probability-weighted sum of each partition's entropy. Partitions are
/// summed in ascending condition order, so repeated calls agree bit for bit.
///
/// # Errors
///
/// [`DataError::LengthMismatch`] when the series differ in length.
pub fn conditional_entropy(condition: &[usize], target: &[usize]) -> Result<f64, DataError> {
    if condition.len() != target.len() {
        return Err(DataError::LengthMismatch {
            left: condition.len(),
            right: target.len(),
        });
    }
    if target.is_empty() {
        return Ok(0.0);
    }

    let mut partitions: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (&x, &y) in condition.iter().zip(target) {
        partitions.entry(x).or_default().push(y);
    }

    let n = target.len() as f64;
    let h = partitions
        .values()
        .map(|ys| (ys.len() as f64 / n) * shannon_entropy_bits(ys))
        .sum::<f64>();
    Ok(h)
}

/// Combine two label sequences into one label per distinct pair.
///
/// Labels are assigned in order of first appearance.
pub fn joint_labels(a: &[usize], b: &[usize]) -> Result<Vec<usize>, DataError> {
    if a.len() != b.len() {
        return Err(DataError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    let mut ids: BTreeMap<(usize, usize), usize> = BTreeMap::new();
    Ok(a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let next = ids.len();
            *ids.entry((x, y)).or_insert(next)
        })
        .collect())
}

// ============================================================================
// Mutual Information / Transfer Entropy
// ============================================================================

/// Mutual information I(X;Y) = H(Y) - H(Y|X), clamped at 0.
pub fn mutual_information(predictor: &[usize], target: &[usize]) -> Result<f64, DataError> {
    let h_target = shannon_entropy_bits(target);
    let h_conditional = conditional_entropy(predictor, target)?;
    Ok((h_target - h_conditional).max(0.0))
}

/// Transfer entropy from `source` to the target process, in bits.
///
/// `future[i]`, `past[i]` and `source[i]` are the target at `t + lag`,
/// the target at `t`, and the source at `t` for the same row `i`:
///
/// T = H(future | past) - H(future | past, source), clamped at 0.
pub fn transfer_entropy(future: &[usize], past: &[usize], source: &[usize]) -> Result<f64, DataError> {
    let h_own = conditional_entropy(past, future)?;
    let joint = joint_labels(past, source)?;
    let h_both = conditional_entropy(&joint, future)?;
    Ok((h_own - h_both).max(0.0))
}

// ============================================================================
// Correlation
// ============================================================================

/// Pearson correlation of two raw series.
///
/// Returns `None` for mismatched or short input, or when either series has
/// zero variance.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (&a, &b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x <= 0.0 || var_y <= 0.0 {
        return None;
    }
    let r = cov / (var_x.sqrt() * var_y.sqrt());
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}
