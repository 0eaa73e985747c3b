//! End-to-end ranking scenarios through the batch entry point.

use infogain_metrics::{
    analyze, AnalysisConfig, AnalysisInput, CancellationFlag, FailureKind, MetricInput,
    Observation, ReductionStrategy, ScalarSeries, Series,
};
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rand_pcg::Pcg64;
use std::collections::BTreeMap;

const DAY: i64 = 86_400;

fn daily_timestamps(n: usize) -> Vec<i64> {
    (0..n as i64).map(|i| 1_600_000_000 + i * DAY).collect()
}

/// Metric `sin(t) + noise` and a rising price whose daily return depends
/// on it, plus an unrelated random metric.
fn planted_trial(seed: u64, n: usize) -> AnalysisInput {
    let mut rng = Pcg64::seed_from_u64(seed);
    let metric_noise = Normal::new(0.0, 0.1).unwrap();
    let return_noise = Normal::new(0.0, 0.001).unwrap();
    let random = Normal::new(0.0, 1.0).unwrap();

    let ts = daily_timestamps(n);
    let planted: Vec<f64> = (0..n)
        .map(|t| (t as f64).sin() + metric_noise.sample(&mut rng))
        .collect();
    let unrelated: Vec<f64> = (0..n).map(|_| random.sample(&mut rng)).collect();

    let mut price = Vec::with_capacity(n);
    let mut level = 100.0;
    for m in &planted {
        price.push(level);
        level *= 1.0 + 0.02 + 0.01 * m + return_noise.sample(&mut rng);
    }

    AnalysisInput::new(
        ScalarSeries::new(ts.clone(), price).unwrap(),
        vec![
            MetricInput::new("planted", Series::from_scalars(&ts, &planted)),
            MetricInput::new("unrelated", Series::from_scalars(&ts, &unrelated)),
        ],
    )
}

#[test]
fn test_planted_dependency_outranks_random_metric() {
    let config = AnalysisConfig::default();
    let cancel = CancellationFlag::new();

    let wins = (0..100)
        .filter(|&seed| {
            let report = analyze(&planted_trial(seed, 1000), &config, &cancel);
            report.rankings.first().map(|r| r.metric.as_str()) == Some("planted")
        })
        .count();
    assert!(wins >= 95, "planted metric ranked first in only {wins}/100 trials");
}

#[test]
fn test_price_is_monotonic_in_planted_trial() {
    let input = planted_trial(3, 1000);
    assert!(input.price.values.windows(2).all(|w| w[1] > w[0]));
}

#[test]
fn test_short_horizon_failure_keeps_metric() {
    // 40 daily samples: h=1 -> 39 pairs, h=7 -> 33 pairs, h=30 -> 10 pairs
    let n = 40;
    let ts = daily_timestamps(n);
    let metric: Vec<f64> = (0..n).map(|t| (t as f64 * 0.9).sin()).collect();
    let price: Vec<f64> = (0..n)
        .map(|t| 100.0 + t as f64 + 3.0 * (t as f64 * 0.9).cos())
        .collect();
    let input = AnalysisInput::new(
        ScalarSeries::new(ts.clone(), price).unwrap(),
        vec![MetricInput::new("short", Series::from_scalars(&ts, &metric))],
    );

    let report = analyze(&input, &AnalysisConfig::default(), &CancellationFlag::new());
    assert!(report.failures.is_empty());

    let ranked = report.get("short").unwrap();
    let horizons: Vec<u32> = ranked.horizons.iter().map(|r| r.horizon).collect();
    assert_eq!(horizons, vec![1, 7]);
    assert_eq!(ranked.horizons[0].n_samples, 39);
    assert_eq!(ranked.horizons[1].n_samples, 33);

    assert_eq!(ranked.horizon_failures.len(), 1);
    assert_eq!(ranked.horizon_failures[0].horizon, 30);
    assert!(ranked.horizon_failures[0].reason.contains("found 10"));
}

#[test]
fn test_multi_field_metrics_from_series_map() {
    let n = 200;
    let ts = daily_timestamps(n);
    let base = planted_trial(5, n);

    let mut series = BTreeMap::new();
    series.insert(
        "price".to_string(),
        Series::from_scalars(&ts, &base.price.values),
    );
    series.insert(
        "supply_distribution".to_string(),
        Series::new(
            ts.iter()
                .enumerate()
                .map(|(i, &t)| {
                    let tilt = 0.3 * (i as f64 * 0.2).sin();
                    Observation::fields(t, [("whales", 0.4 + tilt), ("retail", 0.6 - tilt)])
                })
                .collect(),
        ),
    );
    series.insert(
        "price_usd_ohlc".to_string(),
        Series::new(
            ts.iter()
                .zip(&base.price.values)
                .enumerate()
                .map(|(i, (&t, &c))| {
                    let spread = 0.01 + 0.005 * (i as f64 * 0.5).cos().abs();
                    Observation::fields(
                        t,
                        [("o", c), ("h", c * (1.0 + spread)), ("l", c * (1.0 - spread)), ("c", c)],
                    )
                })
                .collect(),
        ),
    );
    let planted: Vec<f64> = base.metrics[0]
        .series
        .observations
        .iter()
        .map(|o| o.value.as_scalar().unwrap())
        .collect();
    series.insert("mvrv".to_string(), Series::from_scalars(&ts, &planted));

    let mut tags = BTreeMap::new();
    tags.insert("supply_distribution".to_string(), "concentration".to_string());
    tags.insert("price_usd_ohlc".to_string(), "range".to_string());

    let input = AnalysisInput::from_series_map(series, &tags).unwrap();
    let report = analyze(&input, &AnalysisConfig::default(), &CancellationFlag::new());

    assert!(report.failures.is_empty(), "{:?}", report.failures);
    assert_eq!(report.rankings.len(), 3);
    assert_eq!(
        report.get("supply_distribution").unwrap().strategy,
        ReductionStrategy::Concentration
    );
    assert_eq!(report.get("price_usd_ohlc").unwrap().strategy, ReductionStrategy::Range);
    assert_eq!(report.rankings[0].metric, "mvrv");
}

#[test]
fn test_missing_ohlc_field_reported_as_data_failure() {
    let n = 60;
    let ts = daily_timestamps(n);
    let base = planted_trial(9, n);
    let bars = Series::new(
        ts.iter()
            .map(|&t| Observation::fields(t, [("open", 1.0), ("high", 2.0), ("close", 1.5)]))
            .collect(),
    );
    let mut input = base.clone();
    input
        .metrics
        .push(MetricInput::new("bars", bars).with_strategy(ReductionStrategy::Range));

    let report = analyze(&input, &AnalysisConfig::default(), &CancellationFlag::new());
    let failure = report.failure("bars").unwrap();
    assert_eq!(failure.kind, FailureKind::Data);
    assert!(failure.reason.contains("`low`"));
    assert_eq!(report.rankings.len(), 2);
}

#[test]
fn test_report_serializes_hierarchically_and_as_rows() {
    let report = analyze(
        &planted_trial(1, 300),
        &AnalysisConfig::default(),
        &CancellationFlag::new(),
    );

    let json = serde_json::to_value(&report).unwrap();
    let first = &json["rankings"][0];
    assert_eq!(first["metric"], "planted");
    assert_eq!(first["horizons"].as_array().unwrap().len(), 3);
    assert!(first["horizons"][0]["information_gain"].as_f64().unwrap() > 0.0);
    assert!(json["summary"]["best_by_horizon"]["1"].is_object());

    let rows = report.rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].rank, 1);
    assert!(rows[0].composite_score >= rows[1].composite_score);
    let row_json = serde_json::to_value(&rows).unwrap();
    assert_eq!(row_json[1]["metric"], "unrelated");
}

#[test]
fn test_alternate_weights_change_scores_not_inputs() {
    let input = planted_trial(2, 500);
    let cancel = CancellationFlag::new();
    let default = analyze(&input, &AnalysisConfig::default(), &cancel);

    let mut config = AnalysisConfig::default();
    config.weights.transfer_entropy = 0.0;
    config.weights.symmetric_uncertainty = 0.0;
    let reweighted = analyze(&input, &config, &cancel);

    let a = default.get("planted").unwrap();
    let b = reweighted.get("planted").unwrap();
    assert_eq!(a.horizons, b.horizons);
    assert_ne!(a.composite.score, b.composite.score);
}
