//! Numeric guards and sample-size floors.
//!
//! Every constant used by the entropy and ranking code lives here so the
//! thresholds are visible in one place.

// ============================================================================
// Division Guards
// ============================================================================

/// Floor applied to probabilities before taking a logarithm.
///
/// Empirical probabilities are at least `1 / n`, so for any realistic sample
/// count the floor never binds and adds no bias.
pub const PROBABILITY_FLOOR: f64 = 1e-15;

/// Tolerance below which an entropy (in bits) is treated as zero.
pub const ENTROPY_TOLERANCE: f64 = 1e-12;

/// `numerator / denominator`, or 0 when the denominator is (near) zero.
#[inline]
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator.abs() <= ENTROPY_TOLERANCE {
        0.0
    } else {
        numerator / denominator
    }
}

// ============================================================================
// Minimum Samples
// ============================================================================

/// Minimum samples for statistically meaningful computation.
pub struct MinimumSamples;

impl MinimumSamples {
    /// Aligned (predictor, target) pairs required per horizon.
    /// Also the floor on lagged triples for transfer entropy.
    pub const ALIGNED_PAIRS: usize = 30;
}

// ============================================================================
// Defaults
// ============================================================================

/// Default number of quantile buckets.
pub const DEFAULT_BINS: usize = 10;

/// Default number of quantile buckets for transfer entropy.
pub const DEFAULT_TRANSFER_ENTROPY_BINS: usize = 5;

/// Default horizons, in sampling periods.
pub const DEFAULT_HORIZONS: [u32; 3] = [1, 7, 30];

/// One day in seconds.
pub const SECONDS_PER_DAY: i64 = 86_400;
