//! Health analytics engine
//!
//! The only component with cross-monitor knowledge. Each cycle reads every
//! category probe into a [`HealthSnapshot`], appends it to a 24 hour
//! history, checks the latest snapshot against a trailing baseline and
//! refreshes the linear trend projections.
//!
//! A probe that fails or panics is left out of the snapshot and the overall
//! score is re-weighted over the categories that were read. A cycle in
//! which no probe could be read stores nothing.

pub mod anomaly;
pub mod prediction;
pub mod scoring;
pub mod summary;

pub use anomaly::{Anomaly, AnomalyMetric};
pub use prediction::{CategoryPrediction, PredictionSet};
pub use summary::{AnalyticsSummary, CurrentHealth, Recommendation};

use crate::clock::SharedClock;
use crate::error::{CaptureError, SourceError};
use crate::health::{components, HealthRegistry};
use crate::models::{Category, Trend};
use crate::monitor::{CategoryProbe, CategoryReading};
use crate::observability::{DashboardMetrics, StructuredLogger};
use crate::scheduler::PeriodicTask;
use crate::stats::round2;
use crate::window::TimeWindow;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

pub const HISTORY_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);
pub const DERIVED_RETENTION: Duration = Duration::from_secs(6 * 60 * 60);
/// Consecutive skipped cycles before the analytics component turns unhealthy
pub const UNHEALTHY_AFTER_SKIPPED_CYCLES: u32 = 3;
const RECENT_ANOMALY_WINDOW_MS: i64 = 60 * 60 * 1000;
const SUMMARY_TREND_WINDOW: usize = 20;

/// One timestamped composite of every category score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthSnapshot {
    pub timestamp_ms: i64,
    pub scores: BTreeMap<Category, f64>,
    pub overall: f64,
    /// Categories that could not be read for this snapshot
    pub missing: Vec<Category>,
    pub readings: Vec<CategoryReading>,
}

impl HealthSnapshot {
    pub fn is_partial(&self) -> bool {
        !self.missing.is_empty()
    }

    pub fn score(&self, category: Category) -> Option<f64> {
        self.scores.get(&category).copied()
    }

    pub fn cpu_percent(&self) -> Option<f64> {
        self.readings.iter().find_map(|r| match r {
            CategoryReading::System { cpu_percent, .. } => Some(*cpu_percent),
            _ => None,
        })
    }

    pub fn memory_percent(&self) -> Option<f64> {
        self.readings.iter().find_map(|r| match r {
            CategoryReading::System { memory_percent, .. } => Some(*memory_percent),
            _ => None,
        })
    }

    pub fn api_latency_ms(&self) -> Option<f64> {
        self.readings.iter().find_map(|r| match r {
            CategoryReading::Api { avg_latency_ms, .. } => Some(*avg_latency_ms),
            _ => None,
        })
    }

    pub fn threat_level(&self) -> Option<f64> {
        self.readings.iter().find_map(|r| match r {
            CategoryReading::Security { threat_level, .. } => Some(*threat_level),
            _ => None,
        })
    }
}

/// Outcome of one stored cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub snapshot: HealthSnapshot,
    pub failures: Vec<SourceError>,
    pub anomalies: Vec<Anomaly>,
    pub predictions: Option<PredictionSet>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsExport {
    pub exported_ms: i64,
    pub history: Vec<HealthSnapshot>,
    pub anomalies: Vec<Anomaly>,
    pub predictions: Vec<PredictionSet>,
}

struct Inner {
    history: TimeWindow<HealthSnapshot>,
    anomalies: TimeWindow<Anomaly>,
    predictions: TimeWindow<PredictionSet>,
}

pub struct HealthAnalytics {
    clock: SharedClock,
    probes: Vec<Arc<dyn CategoryProbe>>,
    inner: Mutex<Inner>,
    metrics: DashboardMetrics,
    logger: StructuredLogger,
}

impl HealthAnalytics {
    pub fn new(probes: Vec<Arc<dyn CategoryProbe>>, clock: SharedClock) -> Self {
        Self {
            clock,
            probes,
            inner: Mutex::new(Inner {
                history: TimeWindow::new(HISTORY_RETENTION),
                anomalies: TimeWindow::new(DERIVED_RETENTION),
                predictions: TimeWindow::new(DERIVED_RETENTION),
            }),
            metrics: DashboardMetrics::new(),
            logger: StructuredLogger::default(),
        }
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Read every probe into a snapshot without storing it
    pub fn capture(&self) -> Result<(HealthSnapshot, Vec<SourceError>), CaptureError> {
        let mut readings = Vec::with_capacity(self.probes.len());
        let mut failures = Vec::new();

        for probe in &self.probes {
            let category = probe.category();
            match catch_unwind(AssertUnwindSafe(|| probe.read())) {
                Ok(Ok(reading)) => readings.push(reading),
                Ok(Err(e)) => {
                    warn!(category = %category, error = %e, "Category read failed, leaving it out of the snapshot");
                    failures.push(e);
                }
                Err(_) => {
                    warn!(category = %category, "Category read panicked, leaving it out of the snapshot");
                    failures.push(SourceError::Panicked { category });
                }
            }
        }

        let scores: BTreeMap<Category, f64> = readings
            .iter()
            .map(|r| (r.category(), round2(scoring::score(r))))
            .collect();

        let Some(overall) = scoring::overall(&scores) else {
            return Err(CaptureError::NoCategories(failures));
        };

        let missing = Category::ALL
            .iter()
            .filter(|c| !scores.contains_key(c))
            .copied()
            .collect();

        Ok((
            HealthSnapshot {
                timestamp_ms: self.clock.now_ms(),
                scores,
                overall: round2(overall),
                missing,
                readings,
            },
            failures,
        ))
    }

    /// Capture, store, then refresh anomalies and predictions
    pub fn run_cycle(&self) -> Result<CycleReport, CaptureError> {
        let started = Instant::now();
        let captured = self.capture();
        self.metrics
            .observe_capture_latency(started.elapsed().as_secs_f64());

        let (snapshot, failures) = match captured {
            Ok(captured) => captured,
            Err(e) => {
                self.metrics.inc_skipped_cycles();
                warn!(error = %e, "Skipping analytics cycle");
                return Err(e);
            }
        };

        let (anomalies, predictions) = {
            let mut inner = self.inner.lock();
            let now = snapshot.timestamp_ms;
            inner.history.push(now, snapshot.clone());

            let tail: Vec<HealthSnapshot> = inner
                .history
                .last_n(anomaly::BASELINE_WINDOW + 1)
                .map(|s| s.value.clone())
                .collect();

            let anomalies = anomaly::detect(&tail);
            for a in &anomalies {
                inner.anomalies.push(now, a.clone());
            }
            inner.anomalies.evict_expired(now);

            let predictions = prediction::predict(&tail, now);
            if let Some(set) = &predictions {
                inner.predictions.push(now, set.clone());
            }
            inner.predictions.evict_expired(now);

            (anomalies, predictions)
        };

        let missing: Vec<&str> = snapshot.missing.iter().map(|c| c.as_str()).collect();
        self.metrics
            .record_snapshot(snapshot.overall, snapshot.is_partial());
        self.logger
            .log_snapshot(snapshot.overall, snapshot.scores.len(), &missing);

        if !anomalies.is_empty() {
            self.metrics.inc_anomalies_detected(anomalies.len() as u64);
        }
        for a in &anomalies {
            self.logger.log_anomaly(
                a.category.as_str(),
                a.metric.as_str(),
                a.severity.as_str(),
                a.value,
                a.baseline,
            );
        }

        Ok(CycleReport {
            snapshot,
            failures,
            anomalies,
            predictions,
        })
    }

    pub fn current(&self) -> Option<HealthSnapshot> {
        self.inner.lock().history.back().map(|s| s.value.clone())
    }

    pub fn snapshot_count(&self) -> usize {
        self.inner.lock().history.len()
    }

    pub fn history(&self) -> Vec<HealthSnapshot> {
        self.inner
            .lock()
            .history
            .iter()
            .map(|s| s.value.clone())
            .collect()
    }

    /// Anomalies detected in the last hour
    pub fn recent_anomalies(&self) -> Vec<Anomaly> {
        let cutoff = self.clock.now_ms() - RECENT_ANOMALY_WINDOW_MS;
        self.inner
            .lock()
            .anomalies
            .since(cutoff)
            .map(|a| a.value.clone())
            .collect()
    }

    pub fn latest_predictions(&self) -> Option<PredictionSet> {
        self.inner.lock().predictions.back().map(|p| p.value.clone())
    }

    pub fn summary(&self) -> AnalyticsSummary {
        let now = self.clock.now_ms();
        let (count, tail, predictions) = {
            let inner = self.inner.lock();
            let tail: Vec<HealthSnapshot> = inner
                .history
                .last_n(SUMMARY_TREND_WINDOW)
                .map(|s| s.value.clone())
                .collect();
            let predictions = inner.predictions.back().map(|p| p.value.clone());
            (inner.history.len(), tail, predictions)
        };

        let current = match tail.last() {
            Some(s) => CurrentHealth {
                timestamp_ms: Some(s.timestamp_ms),
                scores: s.scores.clone(),
                overall: s.overall,
                missing: s.missing.clone(),
            },
            None => CurrentHealth::neutral(),
        };

        let trends: BTreeMap<Category, Trend> = if count < summary::MIN_TREND_SNAPSHOTS {
            Category::ALL
                .iter()
                .map(|c| (*c, Trend::InsufficientData))
                .collect()
        } else {
            prediction::trends(&tail).into_iter().collect()
        };

        let overall: Vec<f64> = tail.iter().map(|s| s.overall).collect();
        let anomalies = self.recent_anomalies();

        AnalyticsSummary {
            timestamp_ms: now,
            snapshot_count: count,
            harmony_index: summary::harmony_index(&current.scores),
            stability_index: summary::stability_index(&overall),
            enhancement_potential: round2((100.0 - current.overall).max(0.0)),
            recommendations: summary::recommendations(&current.scores),
            trends,
            predictions,
            anomaly_pattern: summary::anomaly_pattern(anomalies.len()),
            disturbance_frequency: anomalies.len(),
            anomalies,
            current,
        }
    }

    pub fn export(&self) -> AnalyticsExport {
        let inner = self.inner.lock();
        AnalyticsExport {
            exported_ms: self.clock.now_ms(),
            history: inner.history.iter().map(|s| s.value.clone()).collect(),
            anomalies: inner.anomalies.iter().map(|a| a.value.clone()).collect(),
            predictions: inner.predictions.iter().map(|p| p.value.clone()).collect(),
        }
    }
}

/// Periodic analytics cycle that also reports per-monitor health
pub struct AnalyticsTask {
    analytics: Arc<HealthAnalytics>,
    health: HealthRegistry,
    skipped: u32,
}

impl AnalyticsTask {
    pub fn new(analytics: Arc<HealthAnalytics>, health: HealthRegistry) -> Self {
        Self {
            analytics,
            health,
            skipped: 0,
        }
    }
}

#[async_trait]
impl PeriodicTask for AnalyticsTask {
    fn name(&self) -> &'static str {
        "analytics"
    }

    async fn run_once(&mut self) -> anyhow::Result<()> {
        match self.analytics.run_cycle() {
            Ok(report) => {
                for category in Category::ALL {
                    let component = components::for_category(category);
                    match report.failures.iter().find(|f| f.category() == category) {
                        Some(failure) => self.health.set_degraded(component, failure.to_string()).await,
                        None => self.health.set_healthy(component).await,
                    }
                }
                self.skipped = 0;
                self.health.set_healthy(components::ANALYTICS).await;
            }
            Err(e) => {
                for category in Category::ALL {
                    self.health
                        .set_degraded(components::for_category(category), "read failed")
                        .await;
                }
                self.skipped += 1;
                if self.skipped >= UNHEALTHY_AFTER_SKIPPED_CYCLES {
                    let message = format!("{} consecutive cycles skipped: {}", self.skipped, e);
                    self.health.set_unhealthy(components::ANALYTICS, message).await;
                } else {
                    self.health
                        .set_degraded(components::ANALYTICS, e.to_string())
                        .await;
                }
            }
        }
        Ok(())
    }
}
