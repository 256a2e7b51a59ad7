//! Baseline deviation checks on the latest snapshot

use super::HealthSnapshot;
use crate::models::{Category, Severity};
use crate::stats::{mean, round2};
use serde::{Deserialize, Serialize};

/// Snapshots required before a baseline exists
pub const MIN_BASELINE_SNAPSHOTS: usize = 20;
/// Snapshots preceding the latest that form the baseline
pub const BASELINE_WINDOW: usize = 60;

const CPU_DEVIATION: f64 = 0.5;
const MEMORY_DEVIATION: f64 = 0.3;
const SPIKE_FACTOR: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyMetric {
    Cpu,
    Memory,
    ApiLatency,
    ThreatLevel,
}

impl AnomalyMetric {
    pub fn category(&self) -> Category {
        match self {
            AnomalyMetric::Cpu | AnomalyMetric::Memory => Category::System,
            AnomalyMetric::ApiLatency => Category::Api,
            AnomalyMetric::ThreatLevel => Category::Security,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyMetric::Cpu => "cpu",
            AnomalyMetric::Memory => "memory",
            AnomalyMetric::ApiLatency => "api_latency",
            AnomalyMetric::ThreatLevel => "threat_level",
        }
    }

    fn value(&self, snapshot: &HealthSnapshot) -> Option<f64> {
        match self {
            AnomalyMetric::Cpu => snapshot.cpu_percent(),
            AnomalyMetric::Memory => snapshot.memory_percent(),
            AnomalyMetric::ApiLatency => snapshot.api_latency_ms(),
            AnomalyMetric::ThreatLevel => snapshot.threat_level(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub timestamp_ms: i64,
    pub category: Category,
    pub metric: AnomalyMetric,
    pub severity: Severity,
    pub value: f64,
    pub baseline: f64,
    pub deviation_percent: f64,
}

/// Compare the last snapshot of `history` against the average of the
/// snapshots before it
pub fn detect(history: &[HealthSnapshot]) -> Vec<Anomaly> {
    let Some((latest, earlier)) = history.split_last() else {
        return Vec::new();
    };
    if history.len() < MIN_BASELINE_SNAPSHOTS {
        return Vec::new();
    }
    let start = earlier.len().saturating_sub(BASELINE_WINDOW);
    let baseline_window = &earlier[start..];

    [
        AnomalyMetric::Cpu,
        AnomalyMetric::Memory,
        AnomalyMetric::ApiLatency,
        AnomalyMetric::ThreatLevel,
    ]
    .into_iter()
    .filter_map(|metric| {
        let value = metric.value(latest)?;
        let values: Vec<f64> = baseline_window
            .iter()
            .filter_map(|s| metric.value(s))
            .collect();
        let baseline = mean(&values)?;
        let severity = classify(metric, value, baseline)?;

        Some(Anomaly {
            timestamp_ms: latest.timestamp_ms,
            category: metric.category(),
            metric,
            severity,
            value: round2(value),
            baseline: round2(baseline),
            deviation_percent: round2((value - baseline) / baseline * 100.0),
        })
    })
    .collect()
}

/// Severity of a deviation, or `None` when within bounds
///
/// A zero baseline never yields an anomaly.
fn classify(metric: AnomalyMetric, value: f64, baseline: f64) -> Option<Severity> {
    if baseline <= 0.0 {
        return None;
    }

    let relative = |threshold: f64| {
        ((value - baseline).abs() > baseline * threshold).then(|| {
            if value > baseline {
                Severity::High
            } else {
                Severity::Medium
            }
        })
    };

    match metric {
        AnomalyMetric::Cpu => relative(CPU_DEVIATION),
        AnomalyMetric::Memory => relative(MEMORY_DEVIATION),
        AnomalyMetric::ApiLatency => (value > baseline * SPIKE_FACTOR).then_some(Severity::High),
        AnomalyMetric::ThreatLevel => {
            (value > baseline * SPIKE_FACTOR).then_some(Severity::Critical)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::tests::snapshot_with;

    fn steady(n: usize) -> Vec<HealthSnapshot> {
        (0..n)
            .map(|i| snapshot_with(i as i64 * 60_000, 40.0, 50.0, 200.0, 10.0))
            .collect()
    }

    #[test]
    fn test_no_anomalies_before_baseline_exists() {
        let mut history = steady(MIN_BASELINE_SNAPSHOTS - 2);
        history.push(snapshot_with(0, 99.0, 99.0, 9_000.0, 90.0));
        assert!(detect(&history).is_empty());
    }

    #[test]
    fn test_steady_history_is_quiet() {
        assert!(detect(&steady(40)).is_empty());
    }

    #[test]
    fn test_cpu_spike_high_and_drop_medium() {
        let mut history = steady(30);
        history.push(snapshot_with(30 * 60_000, 70.0, 50.0, 200.0, 10.0));
        let anomalies = detect(&history);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].metric, AnomalyMetric::Cpu);
        assert_eq!(anomalies[0].severity, Severity::High);
        assert_eq!(anomalies[0].baseline, 40.0);
        assert_eq!(anomalies[0].deviation_percent, 75.0);

        let mut history = steady(30);
        history.push(snapshot_with(30 * 60_000, 10.0, 50.0, 200.0, 10.0));
        let anomalies = detect(&history);
        assert_eq!(anomalies[0].severity, Severity::Medium);
    }

    #[test]
    fn test_memory_threshold_is_thirty_percent() {
        let mut history = steady(30);
        history.push(snapshot_with(30 * 60_000, 40.0, 64.0, 200.0, 10.0));
        assert!(detect(&history).is_empty());

        let mut history = steady(30);
        history.push(snapshot_with(30 * 60_000, 40.0, 66.0, 200.0, 10.0));
        assert_eq!(detect(&history)[0].metric, AnomalyMetric::Memory);
    }

    #[test]
    fn test_latency_and_threat_spikes() {
        let mut history = steady(30);
        history.push(snapshot_with(30 * 60_000, 40.0, 50.0, 450.0, 25.0));
        let anomalies = detect(&history);
        let metrics: Vec<(AnomalyMetric, Severity)> =
            anomalies.iter().map(|a| (a.metric, a.severity)).collect();
        assert_eq!(
            metrics,
            vec![
                (AnomalyMetric::ApiLatency, Severity::High),
                (AnomalyMetric::ThreatLevel, Severity::Critical)
            ]
        );
    }

    #[test]
    fn test_zero_baseline_never_flags() {
        let mut history: Vec<HealthSnapshot> = (0..30)
            .map(|i| snapshot_with(i * 60_000, 40.0, 50.0, 0.0, 0.0))
            .collect();
        history.push(snapshot_with(30 * 60_000, 40.0, 50.0, 500.0, 80.0));
        assert!(detect(&history).is_empty());
    }
}
