//! Observability infrastructure for the dashboard pipeline
//!
//! Provides:
//! - Prometheus metrics (capture latency, snapshot counters, broadcast fan-out, security events)
//! - Structured JSON logging with tracing

use prometheus::{
    register_gauge, register_histogram, register_int_counter, register_int_counter_vec,
    register_int_gauge, Gauge, Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for snapshot capture latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<DashboardMetricsInner> = OnceLock::new();

struct DashboardMetricsInner {
    capture_latency_seconds: Histogram,
    snapshots_captured: IntCounter,
    partial_snapshots: IntCounter,
    skipped_cycles: IntCounter,
    task_failures: IntCounterVec,
    broadcasts_sent: IntCounter,
    connected_clients: IntGauge,
    security_events: IntCounterVec,
    anomalies_detected: IntCounter,
    overall_health: Gauge,
}

impl DashboardMetricsInner {
    fn new() -> Self {
        Self {
            capture_latency_seconds: register_histogram!(
                "vigil_snapshot_capture_seconds",
                "Time spent reading all monitors into one health snapshot",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register snapshot_capture_seconds"),

            snapshots_captured: register_int_counter!(
                "vigil_snapshots_captured_total",
                "Total number of health snapshots appended to history"
            )
            .expect("Failed to register snapshots_captured"),

            partial_snapshots: register_int_counter!(
                "vigil_partial_snapshots_total",
                "Snapshots captured with at least one category missing"
            )
            .expect("Failed to register partial_snapshots"),

            skipped_cycles: register_int_counter!(
                "vigil_skipped_cycles_total",
                "Analytics cycles skipped because no category could be read"
            )
            .expect("Failed to register skipped_cycles"),

            task_failures: register_int_counter_vec!(
                "vigil_task_failures_total",
                "Periodic task iterations that returned an error or panicked",
                &["task"]
            )
            .expect("Failed to register task_failures"),

            broadcasts_sent: register_int_counter!(
                "vigil_broadcasts_sent_total",
                "Composite state broadcasts published to subscribers"
            )
            .expect("Failed to register broadcasts_sent"),

            connected_clients: register_int_gauge!(
                "vigil_connected_clients",
                "Number of currently connected real-time clients"
            )
            .expect("Failed to register connected_clients"),

            security_events: register_int_counter_vec!(
                "vigil_security_events_total",
                "Security events recorded, by severity",
                &["severity"]
            )
            .expect("Failed to register security_events"),

            anomalies_detected: register_int_counter!(
                "vigil_anomalies_detected_total",
                "Total number of health anomalies detected"
            )
            .expect("Failed to register anomalies_detected"),

            overall_health: register_gauge!(
                "vigil_overall_health",
                "Weighted overall health score of the latest snapshot"
            )
            .expect("Failed to register overall_health"),
        }
    }
}

/// Dashboard metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct DashboardMetrics {
    _private: (),
}

impl Default for DashboardMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DashboardMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DashboardMetrics")
    }
}

impl DashboardMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(DashboardMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &DashboardMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_capture_latency(&self, duration_secs: f64) {
        self.inner().capture_latency_seconds.observe(duration_secs);
    }

    /// Count a stored snapshot and publish its overall score
    pub fn record_snapshot(&self, overall: f64, partial: bool) {
        self.inner().snapshots_captured.inc();
        if partial {
            self.inner().partial_snapshots.inc();
        }
        self.inner().overall_health.set(overall);
    }

    pub fn inc_skipped_cycles(&self) {
        self.inner().skipped_cycles.inc();
    }

    pub fn inc_task_failure(&self, task: &str) {
        self.inner().task_failures.with_label_values(&[task]).inc();
    }

    pub fn inc_broadcasts_sent(&self) {
        self.inner().broadcasts_sent.inc();
    }

    pub fn set_connected_clients(&self, count: i64) {
        self.inner().connected_clients.set(count);
    }

    pub fn inc_security_event(&self, severity: &str) {
        self.inner()
            .security_events
            .with_label_values(&[severity])
            .inc();
    }

    pub fn inc_anomalies_detected(&self, count: u64) {
        self.inner().anomalies_detected.inc_by(count);
    }
}

/// Structured logger for pipeline events
///
/// Provides consistent JSON-formatted logging for lifecycle, security,
/// anomaly and client events.
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl Default for StructuredLogger {
    fn default() -> Self {
        Self::new("vigil")
    }
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    /// Log server startup
    pub fn log_startup(&self, version: &str, bind: &str, metric_source: &str) {
        info!(
            event = "server_started",
            instance = %self.instance,
            version = %version,
            bind = %bind,
            metric_source = %metric_source,
            "Dashboard server started"
        );
    }

    /// Log server shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "server_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Dashboard server shutting down"
        );
    }

    /// Log a recorded security event
    pub fn log_security_event(&self, kind: &str, severity: &str, details: &str) {
        match severity {
            "high" | "critical" => {
                warn!(
                    event = "security_event",
                    instance = %self.instance,
                    kind = %kind,
                    severity = %severity,
                    details = %details,
                    "Security event recorded"
                );
            }
            _ => {
                info!(
                    event = "security_event",
                    instance = %self.instance,
                    kind = %kind,
                    severity = %severity,
                    details = %details,
                    "Security event recorded"
                );
            }
        }
    }

    /// Log a health anomaly
    pub fn log_anomaly(&self, category: &str, metric: &str, severity: &str, current: f64, baseline: f64) {
        match severity {
            "critical" | "high" => {
                warn!(
                    event = "anomaly_detected",
                    instance = %self.instance,
                    category = %category,
                    metric = %metric,
                    severity = %severity,
                    current = current,
                    baseline = baseline,
                    "Health anomaly detected"
                );
            }
            _ => {
                info!(
                    event = "anomaly_detected",
                    instance = %self.instance,
                    category = %category,
                    metric = %metric,
                    severity = %severity,
                    current = current,
                    baseline = baseline,
                    "Health anomaly detected"
                );
            }
        }
    }

    pub fn log_client_connected(&self, client_id: &str, connected: usize) {
        info!(
            event = "client_connected",
            instance = %self.instance,
            client_id = %client_id,
            connected = connected,
            "Client connected"
        );
    }

    pub fn log_client_disconnected(&self, client_id: &str, reason: &str, connected: usize) {
        info!(
            event = "client_disconnected",
            instance = %self.instance,
            client_id = %client_id,
            reason = %reason,
            connected = connected,
            "Client disconnected"
        );
    }

    /// Log a stored health snapshot
    pub fn log_snapshot(&self, overall: f64, categories: usize, missing: &[&str]) {
        if missing.is_empty() {
            info!(
                event = "snapshot_captured",
                instance = %self.instance,
                overall = overall,
                categories = categories,
                "Health snapshot captured"
            );
        } else {
            warn!(
                event = "snapshot_captured",
                instance = %self.instance,
                overall = overall,
                categories = categories,
                missing = ?missing,
                "Partial health snapshot captured"
            );
        }
    }
}
