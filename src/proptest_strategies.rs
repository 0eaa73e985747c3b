//! Property-based tests for discretization, entropy and reduction invariants.
//!
//! Invariants checked:
//! 1. Discretization is deterministic and every reported bucket is populated
//! 2. 0 <= H <= log2(effective buckets)
//! 3. H(Y|X) <= H(Y)
//! 4. 1/k <= HHI <= 1 for k positive shares

use crate::discretize::quantile_discretize;
use crate::entropy::{conditional_entropy, shannon_entropy_bits, transfer_entropy};
use crate::guards::ENTROPY_TOLERANCE;
use crate::reduce::herfindahl_index;
use proptest::prelude::*;
use std::collections::BTreeMap;

// ============================================================================
// Strategies
// ============================================================================

/// Samples with at least two distinct values, including heavy ties.
fn samples_strategy() -> impl Strategy<Value = Vec<f64>> {
    prop_oneof![
        prop::collection::vec(-1e6f64..1e6, 2..400),
        // few distinct values, many repeats
        prop::collection::vec((0i32..4).prop_map(f64::from), 2..400),
    ]
    .prop_filter("needs two distinct values", |v| {
        v.iter().any(|&x| x != v[0])
    })
}

fn bins_strategy() -> impl Strategy<Value = usize> {
    2usize..20
}

/// Paired label sequences of equal length.
fn paired_labels_strategy() -> impl Strategy<Value = (Vec<usize>, Vec<usize>)> {
    (1usize..300).prop_flat_map(|n| {
        (
            prop::collection::vec(0usize..8, n),
            prop::collection::vec(0usize..8, n),
        )
    })
}

fn shares_strategy() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1e-6f64..1e3, 1..50)
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Same samples, same boundaries and labels.
    #[test]
    fn discretization_deterministic(samples in samples_strategy(), n_bins in bins_strategy()) {
        let first = quantile_discretize(&samples, n_bins).unwrap();
        let second = quantile_discretize(&samples, n_bins).unwrap();
        prop_assert_eq!(first, second);
    }

    /// Boundaries non-decreasing, no empty buckets, at most n_bins.
    #[test]
    fn discretization_buckets_populated(samples in samples_strategy(), n_bins in bins_strategy()) {
        let d = quantile_discretize(&samples, n_bins).unwrap();
        // heavy ties can leave a single bucket
        prop_assert!(d.effective_bins >= 1);
        prop_assert!(d.effective_bins <= n_bins);
        prop_assert_eq!(d.boundaries.len(), d.effective_bins + 1);
        prop_assert!(d.boundaries.windows(2).all(|w| w[0] <= w[1]));
        prop_assert!(d.counts().iter().all(|&c| c > 0));
    }

    #[test]
    fn entropy_bounded_by_bucket_count(samples in samples_strategy(), n_bins in bins_strategy()) {
        let d = quantile_discretize(&samples, n_bins).unwrap();
        let h = shannon_entropy_bits(&d.labels);
        prop_assert!(h >= 0.0);
        prop_assert!(h <= (d.effective_bins as f64).log2() + ENTROPY_TOLERANCE);
    }

    #[test]
    fn conditioning_never_increases_entropy((x, y) in paired_labels_strategy()) {
        let h_y = shannon_entropy_bits(&y);
        let h_y_given_x = conditional_entropy(&x, &y).unwrap();
        prop_assert!(h_y_given_x >= -1e-9);
        prop_assert!(h_y_given_x <= h_y + 1e-9, "H(Y|X)={} > H(Y)={}", h_y_given_x, h_y);
    }

    #[test]
    fn transfer_entropy_non_negative((past, source) in paired_labels_strategy()) {
        let future: Vec<usize> = past.iter().zip(&source).map(|(a, b)| (a + b) % 5).collect();
        let te = transfer_entropy(&future, &past, &source).unwrap();
        prop_assert!(te >= 0.0);
    }

    #[test]
    fn hhi_within_bounds(shares in shares_strategy()) {
        let k = shares.len() as f64;
        let fields: BTreeMap<String, f64> = shares
            .iter()
            .enumerate()
            .map(|(i, &s)| (format!("s{i}"), s))
            .collect();
        let hhi = herfindahl_index(0, &fields).unwrap();
        prop_assert!(hhi >= 1.0 / k - 1e-12);
        prop_assert!(hhi <= 1.0 + 1e-12);
    }
}
