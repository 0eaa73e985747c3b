//! Python bindings for infogain-metrics using PyO3.
//!
//! NumPy arrays are read without copying where the crate only needs slices.
//! Batch analysis releases the GIL while metrics are evaluated.

#![cfg(feature = "python")]

use crate::errors::AnalysisError;
use crate::reduce::ReductionStrategy;
use crate::types::{GainResult, Observation, ScalarSeries, Series};
use crate::{AnalysisConfig, AnalysisInput, CancellationFlag, MetricFailure, MetricInput, RankingRow};
use numpy::{PyArray1, PyReadonlyArray1};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use std::collections::{BTreeMap, HashMap};

fn to_py_err<E: Into<AnalysisError>>(err: E) -> PyErr {
    PyErr::from(err.into())
}

// ============================================================================
// Discretization & Entropy
// ============================================================================

/// Quantile-discretize a sample set.
///
/// Args:
///     samples: NumPy array of samples (float64)
///     n_bins: Requested number of buckets (default: 10)
///
/// Returns:
///     Tuple of (bucket labels, effective bucket count)
#[pyfunction]
#[pyo3(signature = (samples, n_bins=10))]
fn quantile_discretize<'py>(
    py: Python<'py>,
    samples: PyReadonlyArray1<'py, f64>,
    n_bins: usize,
) -> PyResult<(Bound<'py, PyArray1<usize>>, usize)> {
    let slice = samples
        .as_slice()
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    let d = crate::quantile_discretize(slice, n_bins)?;
    Ok((PyArray1::from_vec(py, d.labels), d.effective_bins))
}

/// Shannon entropy in bits of a bucket-label array.
#[pyfunction]
fn shannon_entropy_bits(labels: PyReadonlyArray1<usize>) -> PyResult<f64> {
    let slice = labels
        .as_slice()
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    Ok(crate::shannon_entropy_bits(slice))
}

/// Conditional entropy H(target | condition) in bits.
#[pyfunction]
fn conditional_entropy(
    condition: PyReadonlyArray1<usize>,
    target: PyReadonlyArray1<usize>,
) -> PyResult<f64> {
    let x = condition
        .as_slice()
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    let y = target
        .as_slice()
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    crate::conditional_entropy(x, y).map_err(to_py_err)
}

/// Herfindahl-Hirschman index of a share mapping, normalized by its sum.
#[pyfunction]
fn herfindahl_index(shares: BTreeMap<String, f64>) -> PyResult<f64> {
    crate::herfindahl_index(0, &shares).map_err(to_py_err)
}

// ============================================================================
// Per-Horizon Measures
// ============================================================================

/// Python wrapper for GainResult.
#[pyclass(name = "GainResult")]
#[derive(Clone)]
pub struct PyGainResult {
    inner: GainResult,
}

#[pymethods]
impl PyGainResult {
    #[getter]
    fn horizon(&self) -> u32 {
        self.inner.horizon
    }

    #[getter]
    fn n_samples(&self) -> usize {
        self.inner.n_samples
    }

    #[getter]
    fn target_entropy(&self) -> f64 {
        self.inner.target_entropy
    }

    #[getter]
    fn indicator_entropy(&self) -> f64 {
        self.inner.indicator_entropy
    }

    #[getter]
    fn conditional_entropy(&self) -> f64 {
        self.inner.conditional_entropy
    }

    #[getter]
    fn information_gain(&self) -> f64 {
        self.inner.information_gain
    }

    #[getter]
    fn gain_ratio(&self) -> f64 {
        self.inner.gain_ratio
    }

    #[getter]
    fn normalized_mutual_information(&self) -> f64 {
        self.inner.normalized_mutual_information
    }

    #[getter]
    fn symmetric_uncertainty(&self) -> f64 {
        self.inner.symmetric_uncertainty
    }

    #[getter]
    fn reduction_ratio(&self) -> f64 {
        self.inner.reduction_ratio
    }

    #[getter]
    fn transfer_entropy(&self) -> Option<f64> {
        self.inner.transfer_entropy
    }

    #[getter]
    fn correlation(&self) -> Option<f64> {
        self.inner.correlation
    }

    fn __repr__(&self) -> String {
        format!(
            "GainResult(horizon={}, n_samples={}, information_gain={:.4}, nmi={:.4})",
            self.inner.horizon,
            self.inner.n_samples,
            self.inner.information_gain,
            self.inner.normalized_mutual_information
        )
    }
}

/// Information measures between an already aligned predictor and target.
///
/// Args:
///     predictor: NumPy array of metric values (float64)
///     target: NumPy array of forward price changes (float64)
///     n_bins: Quantile buckets per side (default: 10)
#[pyfunction]
#[pyo3(signature = (predictor, target, n_bins=10))]
fn information_measures(
    predictor: PyReadonlyArray1<f64>,
    target: PyReadonlyArray1<f64>,
    n_bins: usize,
) -> PyResult<PyGainResult> {
    let x = predictor
        .as_slice()
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    let y = target
        .as_slice()
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    let inner = crate::information_measures(0, x, y, n_bins)?;
    Ok(PyGainResult { inner })
}

// ============================================================================
// Batch Ranking
// ============================================================================

/// Python wrapper for one ranking row.
#[pyclass(name = "RankingRow")]
#[derive(Clone)]
pub struct PyRankingRow {
    inner: RankingRow,
}

#[pymethods]
impl PyRankingRow {
    #[getter]
    fn rank(&self) -> usize {
        self.inner.rank
    }

    #[getter]
    fn metric(&self) -> String {
        self.inner.metric.clone()
    }

    #[getter]
    fn strategy(&self) -> &'static str {
        self.inner.strategy.as_str()
    }

    #[getter]
    fn composite_score(&self) -> f64 {
        self.inner.composite_score
    }

    #[getter]
    fn avg_information_gain(&self) -> f64 {
        self.inner.avg_information_gain
    }

    #[getter]
    fn avg_normalized_mutual_information(&self) -> f64 {
        self.inner.avg_normalized_mutual_information
    }

    #[getter]
    fn avg_symmetric_uncertainty(&self) -> f64 {
        self.inner.avg_symmetric_uncertainty
    }

    #[getter]
    fn avg_transfer_entropy(&self) -> Option<f64> {
        self.inner.avg_transfer_entropy
    }

    #[getter]
    fn horizons_scored(&self) -> usize {
        self.inner.horizons_scored
    }

    #[getter]
    fn horizons_failed(&self) -> usize {
        self.inner.horizons_failed
    }

    fn __repr__(&self) -> String {
        format!(
            "RankingRow(rank={}, metric='{}', composite_score={:.4})",
            self.inner.rank, self.inner.metric, self.inner.composite_score
        )
    }
}

/// Structured observations of one multi-field metric.
type StructuredMetric = (Vec<i64>, Vec<HashMap<String, f64>>, String);

/// Rank metrics by information gain against future price changes.
///
/// Args:
///     price_timestamps: Price timestamps in seconds (int64, strictly increasing)
///     prices: Closing prices (float64)
///     metrics: Mapping of name to (timestamps, values) for scalar metrics
///     structured: Mapping of name to (timestamps, list of field dicts, strategy tag);
///         a metric with an unknown tag is returned as a config failure
///     horizons: Lookahead horizons in periods (default: [1, 7, 30])
///     n_bins: Quantile buckets (default: 10)
///     interval_secs: Seconds per period (default: 86400)
///
/// Returns:
///     Tuple of (ranking rows, list of (metric, kind, reason) failures)
#[pyfunction]
#[pyo3(signature = (price_timestamps, prices, metrics, structured=None, horizons=None, n_bins=10, interval_secs=86_400))]
#[allow(clippy::too_many_arguments)]
fn rank_metrics(
    py: Python<'_>,
    price_timestamps: Vec<i64>,
    prices: PyReadonlyArray1<f64>,
    metrics: HashMap<String, (Vec<i64>, Vec<f64>)>,
    structured: Option<HashMap<String, StructuredMetric>>,
    horizons: Option<Vec<u32>>,
    n_bins: usize,
    interval_secs: i64,
) -> PyResult<(Vec<PyRankingRow>, Vec<(String, String, String)>)> {
    let price_values = prices
        .as_slice()
        .map_err(|e| PyValueError::new_err(e.to_string()))?
        .to_vec();
    let price = ScalarSeries::new(price_timestamps, price_values).map_err(to_py_err)?;

    let mut inputs = Vec::with_capacity(metrics.len());
    let mut rejected = Vec::new();
    for (name, (timestamps, values)) in metrics {
        if timestamps.len() != values.len() {
            return Err(PyValueError::new_err(format!(
                "metric '{name}': {} timestamps but {} values",
                timestamps.len(),
                values.len()
            )));
        }
        inputs.push(MetricInput::new(name, Series::from_scalars(&timestamps, &values)));
    }
    for (name, (timestamps, records, strategy)) in structured.unwrap_or_default() {
        if timestamps.len() != records.len() {
            return Err(PyValueError::new_err(format!(
                "metric '{name}': {} timestamps but {} records",
                timestamps.len(),
                records.len()
            )));
        }
        let strategy = match strategy.parse::<ReductionStrategy>() {
            Ok(strategy) => strategy,
            Err(err) => {
                rejected.push(MetricFailure::new(name, err.into()));
                continue;
            }
        };
        let observations = timestamps
            .into_iter()
            .zip(records)
            .map(|(t, fields)| Observation::fields(t, fields))
            .collect();
        inputs.push(MetricInput::new(name, Series::new(observations)).with_strategy(strategy));
    }
    inputs.sort_by(|a, b| a.name.cmp(&b.name));

    let mut config = AnalysisConfig::default()
        .n_bins(n_bins)
        .interval_secs(interval_secs);
    if let Some(horizons) = horizons {
        config.horizons = horizons;
    }

    let mut input = AnalysisInput::new(price, inputs);
    input.rejected = rejected;
    let report = py.allow_threads(|| crate::analyze(&input, &config, &CancellationFlag::new()));

    let rows = report
        .rows()
        .into_iter()
        .map(|inner| PyRankingRow { inner })
        .collect();
    let failures = report
        .failures
        .into_iter()
        .map(|f| {
            let kind = format!("{:?}", f.kind).to_lowercase();
            (f.metric, kind, f.reason)
        })
        .collect();
    Ok((rows, failures))
}

// ============================================================================
// Module
// ============================================================================

#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Discretization & entropy
    m.add_function(wrap_pyfunction!(quantile_discretize, m)?)?;
    m.add_function(wrap_pyfunction!(shannon_entropy_bits, m)?)?;
    m.add_function(wrap_pyfunction!(conditional_entropy, m)?)?;
    m.add_function(wrap_pyfunction!(herfindahl_index, m)?)?;

    // Per-horizon measures
    m.add_function(wrap_pyfunction!(information_measures, m)?)?;

    // Batch API
    m.add_function(wrap_pyfunction!(rank_metrics, m)?)?;

    // Classes
    m.add_class::<PyGainResult>()?;
    m.add_class::<PyRankingRow>()?;

    Ok(())
}
