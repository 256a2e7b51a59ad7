//! External API performance monitor
//!
//! Records per-API call outcomes (latency, success, rate limiting) and
//! derives rolling statistics and a stability class from the most recent
//! outcomes.

use crate::clock::SharedClock;
use crate::models::Trend;
use crate::scheduler::PeriodicTask;
use crate::stats::{clamp_score, coefficient_of_variation, mean, round2};
use crate::window::BoundedLog;
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Recent outcomes kept per API
pub const RECENT_OUTCOMES_CAP: usize = 100;
/// Outcomes considered when classifying stability
const STABILITY_WINDOW: usize = 20;
/// Below this many outcomes stability is not classified
const STABILITY_MIN_SAMPLES: usize = 5;
/// Below this many outcomes in the trend window no trend is reported
const TREND_MIN_SAMPLES: usize = 3;
/// Relative latency change that counts as a trend
const TREND_THRESHOLD_PERCENT: f64 = 10.0;

/// One recorded API call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiOutcome {
    pub timestamp_ms: i64,
    pub latency_ms: f64,
    pub success: bool,
    pub rate_limited: bool,
}

/// Stability of one API, best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stability {
    Excellent,
    Good,
    Fair,
    Unstable,
    Poor,
    InsufficientData,
}

impl Stability {
    /// Classify from a success rate (percent) and latency coefficient of variation
    pub fn classify(success_rate: f64, cv: f64) -> Self {
        if success_rate >= 95.0 && cv < 0.3 {
            Stability::Excellent
        } else if success_rate >= 90.0 && cv < 0.5 {
            Stability::Good
        } else if success_rate >= 80.0 && cv < 0.7 {
            Stability::Fair
        } else if success_rate >= 70.0 {
            Stability::Unstable
        } else {
            Stability::Poor
        }
    }

    pub fn score(&self) -> f64 {
        match self {
            Stability::Excellent => 100.0,
            Stability::Good => 85.0,
            Stability::Fair => 70.0,
            Stability::Unstable => 50.0,
            Stability::Poor => 25.0,
            Stability::InsufficientData => 75.0,
        }
    }
}

/// Stability across every tracked API
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayStability {
    Excellent,
    Stable,
    Fluctuating,
    Turbulent,
    Chaotic,
}

impl GatewayStability {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            GatewayStability::Excellent
        } else if score >= 80.0 {
            GatewayStability::Stable
        } else if score >= 60.0 {
            GatewayStability::Fluctuating
        } else if score >= 40.0 {
            GatewayStability::Turbulent
        } else {
            GatewayStability::Chaotic
        }
    }
}

/// Five-level API health
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiHealth {
    Excellent,
    Good,
    Fair,
    Poor,
    Critical,
}

impl ApiHealth {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            ApiHealth::Excellent
        } else if score >= 80.0 {
            ApiHealth::Good
        } else if score >= 60.0 {
            ApiHealth::Fair
        } else if score >= 40.0 {
            ApiHealth::Poor
        } else {
            ApiHealth::Critical
        }
    }
}

/// Derived view of one API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiMetrics {
    pub name: String,
    pub total_requests: u64,
    pub avg_latency_ms: f64,
    pub last_latency_ms: f64,
    pub success_rate_percent: f64,
    pub rate_limit_rate_percent: f64,
    pub requests_per_hour: f64,
    pub stability: Stability,
}

/// Request-weighted aggregate of several APIs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedMetrics {
    pub apis: Vec<String>,
    pub total_requests: u64,
    pub avg_latency_ms: f64,
    pub success_rate_percent: f64,
}

/// Everything the dashboard shows about external APIs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSummary {
    pub timestamp_ms: i64,
    pub apis: Vec<ApiMetrics>,
    pub combined: CombinedMetrics,
    pub gateway_stability: GatewayStability,
    pub health_score: f64,
    pub health: ApiHealth,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiTrends {
    pub window_minutes: u64,
    pub apis: BTreeMap<String, Trend>,
    pub combined: Trend,
}

#[derive(Debug, Clone, Default, Serialize)]
struct ApiRecord {
    requests: u64,
    errors: u64,
    rate_limits: u64,
    total_latency_ms: f64,
    last_latency_ms: f64,
    recent: RecentOutcomes,
}

#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
struct RecentOutcomes(BoundedLog<ApiOutcome>);

impl Default for RecentOutcomes {
    fn default() -> Self {
        Self(BoundedLog::new(RECENT_OUTCOMES_CAP))
    }
}

/// Raw counters for offline analysis
#[derive(Debug, Clone, Serialize)]
pub struct ApiExport {
    pub started_ms: i64,
    pub exported_ms: i64,
    pub apis: BTreeMap<String, serde_json::Value>,
}

struct Inner {
    started_ms: i64,
    apis: BTreeMap<String, ApiRecord>,
}

/// Per-API latency and error tracking
pub struct ApiMonitor {
    clock: SharedClock,
    inner: Mutex<Inner>,
}

/// Whether an error message indicates rate limiting
pub fn is_rate_limit_message(message: &str) -> bool {
    let message = message.to_lowercase();
    ["rate limit", "too many requests", "429", "quota exceeded"]
        .iter()
        .any(|needle| message.contains(needle))
}

impl ApiMonitor {
    pub fn new(clock: SharedClock) -> Self {
        let started_ms = clock.now_ms();
        Self {
            clock,
            inner: Mutex::new(Inner {
                started_ms,
                apis: BTreeMap::new(),
            }),
        }
    }

    /// Pre-register API names so they appear before their first call
    pub fn with_tracked<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        {
            let mut inner = self.inner.lock();
            for name in names {
                inner
                    .apis
                    .entry(normalize(name.as_ref()))
                    .or_default();
            }
        }
        self
    }

    /// Record one API call outcome
    pub fn record_outcome(&self, api_name: &str, elapsed_ms: f64, succeeded: bool, is_rate_limited: bool) {
        let now = self.clock.now_ms();
        let elapsed_ms = elapsed_ms.max(0.0);
        let mut inner = self.inner.lock();
        let record = inner.apis.entry(normalize(api_name)).or_default();

        record.requests += 1;
        record.total_latency_ms += elapsed_ms;
        if succeeded {
            record.last_latency_ms = elapsed_ms;
        } else {
            record.errors += 1;
            if is_rate_limited {
                record.rate_limits += 1;
            }
        }

        record.recent.0.push(ApiOutcome {
            timestamp_ms: now,
            latency_ms: elapsed_ms,
            success: succeeded,
            rate_limited: !succeeded && is_rate_limited,
        });
    }

    /// Time an async call and record its outcome
    pub async fn track<T, E, F>(&self, api_name: &str, call: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: Display,
    {
        let start = tokio::time::Instant::now();
        let result = call.await;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        match &result {
            Ok(_) => self.record_outcome(api_name, elapsed_ms, true, false),
            Err(e) => {
                let rate_limited = is_rate_limit_message(&e.to_string());
                self.record_outcome(api_name, elapsed_ms, false, rate_limited);
            }
        }

        result
    }

    /// Derived metrics for one API; unknown names report neutral defaults
    pub fn metrics(&self, api_name: &str) -> ApiMetrics {
        let now = self.clock.now_ms();
        let inner = self.inner.lock();
        let name = normalize(api_name);
        match inner.apis.get(&name) {
            Some(record) => derive(&name, record, now - inner.started_ms),
            None => ApiMetrics {
                name,
                total_requests: 0,
                avg_latency_ms: 0.0,
                last_latency_ms: 0.0,
                success_rate_percent: 100.0,
                rate_limit_rate_percent: 0.0,
                requests_per_hour: 0.0,
                stability: Stability::InsufficientData,
            },
        }
    }

    /// Request-count-weighted aggregate of the named APIs
    pub fn combined_metrics(&self, api_names: &[&str]) -> CombinedMetrics {
        let metrics: Vec<ApiMetrics> = api_names.iter().map(|n| self.metrics(n)).collect();
        combine(&metrics)
    }

    /// Names of every API seen or pre-registered
    pub fn api_names(&self) -> Vec<String> {
        self.inner.lock().apis.keys().cloned().collect()
    }

    /// Full dashboard view across every tracked API
    pub fn summary(&self) -> ApiSummary {
        let now = self.clock.now_ms();
        let apis: Vec<ApiMetrics> = {
            let inner = self.inner.lock();
            inner
                .apis
                .iter()
                .map(|(name, record)| derive(name, record, now - inner.started_ms))
                .collect()
        };

        let combined = combine(&apis);

        let stability_scores: Vec<f64> = apis.iter().map(|m| m.stability.score()).collect();
        let gateway_score = mean(&stability_scores).unwrap_or(Stability::InsufficientData.score());

        let health_score = api_health_score(&apis, combined.avg_latency_ms, combined.total_requests);

        ApiSummary {
            timestamp_ms: now,
            apis,
            combined,
            gateway_stability: GatewayStability::from_score(gateway_score),
            health_score,
            health: ApiHealth::from_score(health_score),
        }
    }

    /// Latency trend per API over the trailing window
    pub fn trends(&self, window: Duration) -> ApiTrends {
        let cutoff = self.clock.now_ms() - window.as_millis() as i64;
        let inner = self.inner.lock();

        let apis: BTreeMap<String, Trend> = inner
            .apis
            .iter()
            .map(|(name, record)| {
                let latencies: Vec<f64> = record
                    .recent
                    .0
                    .iter()
                    .filter(|o| o.timestamp_ms >= cutoff)
                    .map(|o| o.latency_ms)
                    .collect();
                (name.clone(), latency_trend(&latencies))
            })
            .collect();

        let combined = combine_trends(apis.values().copied());

        ApiTrends {
            window_minutes: window.as_secs() / 60,
            apis,
            combined,
        }
    }

    /// Clear every counter and restart the requests-per-hour clock
    pub fn reset(&self) {
        let now = self.clock.now_ms();
        let mut inner = self.inner.lock();
        inner.started_ms = now;
        for record in inner.apis.values_mut() {
            *record = ApiRecord::default();
        }
    }

    pub fn export(&self) -> ApiExport {
        let inner = self.inner.lock();
        ApiExport {
            started_ms: inner.started_ms,
            exported_ms: self.clock.now_ms(),
            apis: inner
                .apis
                .iter()
                .map(|(name, record)| {
                    (
                        name.clone(),
                        serde_json::to_value(record).unwrap_or(serde_json::Value::Null),
                    )
                })
                .collect(),
        }
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

fn derive(name: &str, record: &ApiRecord, elapsed_ms: i64) -> ApiMetrics {
    let total = record.requests;
    let (avg_latency, success_rate, rate_limit_rate) = if total > 0 {
        let total_f = total as f64;
        (
            record.total_latency_ms / total_f,
            (total - record.errors) as f64 / total_f * 100.0,
            record.rate_limits as f64 / total_f * 100.0,
        )
    } else {
        (0.0, 100.0, 0.0)
    };

    let hours = elapsed_ms as f64 / 3_600_000.0;
    let requests_per_hour = if hours > 0.0 { total as f64 / hours } else { 0.0 };

    ApiMetrics {
        name: name.to_string(),
        total_requests: total,
        avg_latency_ms: round2(avg_latency),
        last_latency_ms: record.last_latency_ms,
        success_rate_percent: round2(clamp_score(success_rate)),
        rate_limit_rate_percent: round2(clamp_score(rate_limit_rate)),
        requests_per_hour: round2(requests_per_hour),
        stability: assess_stability(&record.recent.0),
    }
}

/// Stability from the last [`STABILITY_WINDOW`] outcomes
fn assess_stability(recent: &BoundedLog<ApiOutcome>) -> Stability {
    if recent.len() < STABILITY_MIN_SAMPLES {
        return Stability::InsufficientData;
    }

    let window: Vec<&ApiOutcome> = recent.last_n(STABILITY_WINDOW).collect();
    let successes = window.iter().filter(|o| o.success).count();
    let success_rate = successes as f64 / window.len() as f64 * 100.0;
    let latencies: Vec<f64> = window.iter().map(|o| o.latency_ms).collect();

    Stability::classify(success_rate, coefficient_of_variation(&latencies))
}

fn combine(metrics: &[ApiMetrics]) -> CombinedMetrics {
    let total_requests: u64 = metrics.iter().map(|m| m.total_requests).sum();
    let (avg_latency, success_rate) = if total_requests > 0 {
        let total = total_requests as f64;
        let weighted_latency: f64 = metrics
            .iter()
            .map(|m| m.avg_latency_ms * m.total_requests as f64)
            .sum();
        let weighted_success: f64 = metrics
            .iter()
            .map(|m| m.success_rate_percent * m.total_requests as f64)
            .sum();
        (weighted_latency / total, weighted_success / total)
    } else {
        (0.0, 100.0)
    };

    CombinedMetrics {
        apis: metrics.iter().map(|m| m.name.clone()).collect(),
        total_requests,
        avg_latency_ms: round2(avg_latency),
        success_rate_percent: round2(success_rate),
    }
}

fn api_health_score(apis: &[ApiMetrics], combined_latency_ms: f64, total_requests: u64) -> f64 {
    if total_requests == 0 {
        return 50.0;
    }

    let success_rates: Vec<f64> = apis.iter().map(|m| m.success_rate_percent).collect();
    let avg_success = mean(&success_rates).unwrap_or(100.0);

    let mut score = 100.0;
    if avg_success < 90.0 {
        score -= 20.0;
    } else if avg_success < 95.0 {
        score -= 10.0;
    }

    if combined_latency_ms > 10_000.0 {
        score -= 20.0;
    } else if combined_latency_ms > 5_000.0 {
        score -= 10.0;
    }

    clamp_score(score)
}

/// Compare the mean latency of the older and newer halves of the window
fn latency_trend(latencies: &[f64]) -> Trend {
    if latencies.len() < TREND_MIN_SAMPLES {
        return Trend::InsufficientData;
    }

    let midpoint = latencies.len() / 2;
    let (first, second) = latencies.split_at(midpoint);
    let (Some(first_avg), Some(second_avg)) = (mean(first), mean(second)) else {
        return Trend::InsufficientData;
    };
    if first_avg <= f64::EPSILON {
        return Trend::Stable;
    }

    // positive when latency went down
    let improvement = (first_avg - second_avg) / first_avg * 100.0;
    if improvement > TREND_THRESHOLD_PERCENT {
        Trend::Improving
    } else if improvement < -TREND_THRESHOLD_PERCENT {
        Trend::Degrading
    } else {
        Trend::Stable
    }
}

fn combine_trends(trends: impl Iterator<Item = Trend>) -> Trend {
    let (mut improving, mut degrading, mut known) = (0, 0, 0);
    for trend in trends {
        match trend {
            Trend::Improving => improving += 1,
            Trend::Degrading => degrading += 1,
            Trend::Stable => {}
            Trend::InsufficientData => continue,
        }
        known += 1;
    }

    if known == 0 {
        Trend::InsufficientData
    } else if improving > degrading {
        Trend::Improving
    } else if degrading > improving {
        Trend::Degrading
    } else {
        Trend::Stable
    }
}

/// Synthetic API traffic for simulated deployments
///
/// Records one outcome per tracked API each run: latency drawn from
/// 200..3000 ms, 5% failures of which a fifth are rate limits.
pub struct ApiTrafficSimulator {
    monitor: Arc<ApiMonitor>,
    rng: StdRng,
}

impl ApiTrafficSimulator {
    pub fn new(monitor: Arc<ApiMonitor>) -> Self {
        Self {
            monitor,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(monitor: Arc<ApiMonitor>, seed: u64) -> Self {
        Self {
            monitor,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

#[async_trait]
impl PeriodicTask for ApiTrafficSimulator {
    fn name(&self) -> &'static str {
        "api_traffic_simulator"
    }

    async fn run_once(&mut self) -> anyhow::Result<()> {
        for name in self.monitor.api_names() {
            let latency = self.rng.gen_range(200.0..3000.0);
            let failed = self.rng.gen_bool(0.05);
            let rate_limited = failed && self.rng.gen_bool(0.2);
            self.monitor.record_outcome(&name, latency, !failed, rate_limited);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::Arc;

    fn monitor() -> (ApiMonitor, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        (ApiMonitor::new(clock.clone()), clock)
    }

    #[test]
    fn test_success_rate_and_average_latency() {
        let (monitor, _) = monitor();
        for _ in 0..9 {
            monitor.record_outcome("claude", 200.0, true, false);
        }
        monitor.record_outcome("claude", 200.0, false, false);

        let metrics = monitor.metrics("claude");
        assert_eq!(metrics.total_requests, 10);
        assert_eq!(metrics.success_rate_percent, 90.0);
        assert_eq!(metrics.avg_latency_ms, 200.0);
        assert_eq!(metrics.rate_limit_rate_percent, 0.0);
    }

    #[test]
    fn test_unknown_api_defaults() {
        let (monitor, _) = monitor();
        let metrics = monitor.metrics("nope");
        assert_eq!(metrics.total_requests, 0);
        assert_eq!(metrics.success_rate_percent, 100.0);
        assert_eq!(metrics.stability, Stability::InsufficientData);
    }

    #[test]
    fn test_recent_outcomes_bounded() {
        let (monitor, clock) = monitor();
        for i in 0..150 {
            clock.advance(Duration::from_millis(10));
            monitor.record_outcome("gemini", i as f64, true, false);
        }

        let inner = monitor.inner.lock();
        let recent = &inner.apis["gemini"].recent.0;
        assert_eq!(recent.len(), RECENT_OUTCOMES_CAP);
        // oldest fifty evicted first
        assert_eq!(recent.iter().next().map(|o| o.latency_ms), Some(50.0));
        assert_eq!(inner.apis["gemini"].requests, 150);
    }

    #[test]
    fn test_stability_insufficient_data_below_five() {
        let (monitor, _) = monitor();
        for _ in 0..4 {
            monitor.record_outcome("claude", 100.0, true, false);
        }
        assert_eq!(monitor.metrics("claude").stability, Stability::InsufficientData);

        monitor.record_outcome("claude", 100.0, true, false);
        assert_eq!(monitor.metrics("claude").stability, Stability::Excellent);
    }

    #[test]
    fn test_stability_uses_last_twenty_outcomes() {
        let (monitor, _) = monitor();
        for _ in 0..30 {
            monitor.record_outcome("claude", 100.0, false, false);
        }
        for _ in 0..20 {
            monitor.record_outcome("claude", 100.0, true, false);
        }
        assert_eq!(monitor.metrics("claude").stability, Stability::Excellent);
    }

    #[test]
    fn test_stability_monotonic_in_success_rate() {
        for cv in [0.0, 0.2, 0.4, 0.6, 0.8, 1.5] {
            let mut previous = Stability::classify(0.0, cv);
            for step in 1..=100 {
                let current = Stability::classify(step as f64, cv);
                // lower ordinal is better
                assert!(current <= previous, "cv {cv} rate {step}: {current:?} worse than {previous:?}");
                previous = current;
            }
        }
    }

    #[test]
    fn test_stability_classification_table() {
        assert_eq!(Stability::classify(96.0, 0.1), Stability::Excellent);
        assert_eq!(Stability::classify(96.0, 0.4), Stability::Good);
        assert_eq!(Stability::classify(85.0, 0.6), Stability::Fair);
        assert_eq!(Stability::classify(75.0, 0.9), Stability::Unstable);
        assert_eq!(Stability::classify(50.0, 0.0), Stability::Poor);
    }

    #[test]
    fn test_combined_metrics_weighted_by_requests() {
        let (monitor, _) = monitor();
        for _ in 0..3 {
            monitor.record_outcome("claude", 100.0, true, false);
        }
        monitor.record_outcome("gemini", 500.0, true, false);

        let combined = monitor.combined_metrics(&["claude", "gemini"]);
        assert_eq!(combined.total_requests, 4);
        assert_eq!(combined.avg_latency_ms, 200.0);
    }

    #[test]
    fn test_rate_limit_detection() {
        assert!(is_rate_limit_message("HTTP 429 returned"));
        assert!(is_rate_limit_message("Rate limit reached"));
        assert!(is_rate_limit_message("Quota exceeded for project"));
        assert!(!is_rate_limit_message("connection reset"));
    }

    #[tokio::test]
    async fn test_track_records_failures_as_rate_limited() {
        let (monitor, _) = monitor();

        let ok: Result<u32, String> = monitor.track("claude", async { Ok(1) }).await;
        assert_eq!(ok, Ok(1));

        let err: Result<u32, String> = monitor
            .track("claude", async { Err("Too Many Requests".to_string()) })
            .await;
        assert!(err.is_err());

        let metrics = monitor.metrics("claude");
        assert_eq!(metrics.total_requests, 2);
        assert_eq!(metrics.success_rate_percent, 50.0);
        assert_eq!(metrics.rate_limit_rate_percent, 50.0);
    }

    #[test]
    fn test_requests_per_hour() {
        let (monitor, clock) = monitor();
        for _ in 0..30 {
            monitor.record_outcome("claude", 100.0, true, false);
        }
        clock.advance(Duration::from_secs(30 * 60));
        assert_eq!(monitor.metrics("claude").requests_per_hour, 60.0);
    }

    #[test]
    fn test_reads_are_idempotent() {
        let (monitor, _) = monitor();
        for i in 0..12 {
            monitor.record_outcome("claude", 100.0 + i as f64, i % 4 != 0, false);
        }
        assert_eq!(monitor.summary(), monitor.summary());
        assert_eq!(monitor.metrics("claude"), monitor.metrics("claude"));
    }

    #[test]
    fn test_trends_detect_degrading_latency() {
        let (monitor, clock) = monitor();
        for latency in [100.0, 100.0, 100.0, 300.0, 300.0, 300.0] {
            clock.advance(Duration::from_secs(1));
            monitor.record_outcome("claude", latency, true, false);
        }
        monitor.record_outcome("gemini", 100.0, true, false);

        let trends = monitor.trends(Duration::from_secs(3600));
        assert_eq!(trends.apis["claude"], Trend::Degrading);
        assert_eq!(trends.apis["gemini"], Trend::InsufficientData);
        assert_eq!(trends.combined, Trend::Degrading);
    }

    #[test]
    fn test_summary_health_without_traffic() {
        let (monitor, _) = monitor();
        let monitor = monitor.with_tracked(["claude", "gemini"]);
        let summary = monitor.summary();

        assert_eq!(summary.apis.len(), 2);
        assert_eq!(summary.health_score, 50.0);
        assert_eq!(summary.gateway_stability, GatewayStability::Fluctuating);
    }

    #[test]
    fn test_reset_clears_counters() {
        let (monitor, _) = monitor();
        monitor.record_outcome("claude", 100.0, true, false);
        monitor.reset();
        assert_eq!(monitor.metrics("claude").total_requests, 0);
        assert_eq!(monitor.api_names(), vec!["claude".to_string()]);
    }

    #[tokio::test]
    async fn test_simulator_records_tracked_apis() {
        let (monitor, _) = monitor();
        let monitor = Arc::new(monitor.with_tracked(["claude", "gemini"]));
        let mut simulator = ApiTrafficSimulator::with_seed(monitor.clone(), 11);

        for _ in 0..4 {
            simulator.run_once().await.unwrap();
        }

        for name in ["claude", "gemini"] {
            let metrics = monitor.metrics(name);
            assert_eq!(metrics.total_requests, 4);
        }
    }
}
