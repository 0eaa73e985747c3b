//! Analysis configuration.
//!
//! Precedence when loading (highest to lowest):
//! 1. Environment variables prefixed `INFOGAIN_` (nested keys use `__`)
//! 2. `infogain.toml` in the working directory, if present
//! 3. Default values
//!
//! Callers can also build an [`AnalysisConfig`] in code; every entry point
//! validates it before use.

use crate::errors::ConfigError;
use crate::guards::{
    MinimumSamples, DEFAULT_BINS, DEFAULT_HORIZONS, DEFAULT_TRANSFER_ENTROPY_BINS,
    SECONDS_PER_DAY,
};
use crate::ranker::CompositeWeights;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for the lagged transfer-entropy term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferEntropyConfig {
    pub enabled: bool,
    /// Quantile buckets per variable; coarser than the main bin count
    /// because the joint histogram has three dimensions.
    pub n_bins: usize,
}

impl Default for TransferEntropyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            n_bins: DEFAULT_TRANSFER_ENTROPY_BINS,
        }
    }
}

/// Configuration for one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Quantile buckets for predictor and target.
    pub n_bins: usize,
    /// Lookahead horizons, in sampling periods.
    pub horizons: Vec<u32>,
    /// Length of one sampling period in seconds.
    pub interval_secs: i64,
    /// Aligned pairs required before a horizon is scored.
    pub min_samples: usize,
    pub transfer_entropy: TransferEntropyConfig,
    pub weights: CompositeWeights,
    /// Worker threads for batch runs; `None` uses the global rayon pool.
    pub parallel_threads: Option<usize>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            n_bins: DEFAULT_BINS,
            horizons: DEFAULT_HORIZONS.to_vec(),
            interval_secs: SECONDS_PER_DAY,
            min_samples: MinimumSamples::ALIGNED_PAIRS,
            transfer_entropy: TransferEntropyConfig::default(),
            weights: CompositeWeights::default(),
            parallel_threads: None,
        }
    }
}

impl AnalysisConfig {
    /// Default configuration with custom horizons.
    pub fn with_horizons(horizons: Vec<u32>) -> Self {
        Self {
            horizons,
            ..Self::default()
        }
    }

    pub fn n_bins(mut self, n_bins: usize) -> Self {
        self.n_bins = n_bins;
        self
    }

    pub fn interval_secs(mut self, interval_secs: i64) -> Self {
        self.interval_secs = interval_secs;
        self
    }

    pub fn min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples = min_samples;
        self
    }

    pub fn weights(mut self, weights: CompositeWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn without_transfer_entropy(mut self) -> Self {
        self.transfer_entropy.enabled = false;
        self
    }

    /// Check every field; the first problem found is returned.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_bins < 2 {
            return Err(ConfigError::InvalidBinCount {
                n_bins: self.n_bins,
            });
        }
        if self.transfer_entropy.enabled && self.transfer_entropy.n_bins < 2 {
            return Err(ConfigError::InvalidBinCount {
                n_bins: self.transfer_entropy.n_bins,
            });
        }
        if self.horizons.is_empty() {
            return Err(ConfigError::NoHorizons);
        }
        if let Some(&horizon) = self.horizons.iter().find(|&&h| h == 0) {
            return Err(ConfigError::InvalidHorizon { horizon });
        }
        if self.interval_secs <= 0 {
            return Err(ConfigError::InvalidInterval {
                interval_secs: self.interval_secs,
            });
        }
        if self.min_samples < 2 {
            return Err(ConfigError::InvalidMinSamples {
                min_samples: self.min_samples,
            });
        }
        self.weights.validate()
    }

    /// Load from defaults, `infogain.toml` and `INFOGAIN_*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(
                config::File::with_name("infogain")
                    .format(config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix("INFOGAIN")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("horizons"),
            );

        let loaded: Self = builder.build()?.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Load from a specific TOML file layered over defaults.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(config::File::from(path).format(config::FileFormat::Toml));

        let loaded: Self = builder.build()?.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }
}
