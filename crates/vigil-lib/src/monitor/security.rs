//! Security event monitor
//!
//! Tracks per-IP connection outcomes, keeps a bounded security event log,
//! pattern-matches request URLs for common attack payloads and folds recent
//! events into a severity-weighted threat score.

use crate::clock::SharedClock;
use crate::models::Severity;
use crate::observability::{DashboardMetrics, StructuredLogger};
use crate::scheduler::PeriodicTask;
use crate::stats::{clamp_score, round2};
use crate::window::BoundedLog;
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use regex::{Regex, RegexSet};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::debug;

/// Security events kept in memory
pub const EVENT_LOG_CAP: usize = 1000;
/// Failures above this count from one IP raise a brute-force event
pub const BRUTE_FORCE_FAILURES: u64 = 10;
/// Events and idle IP records older than this are pruned
pub const RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);
const RECENT_WINDOW_MS: i64 = 60 * 60 * 1000;
const RECENT_EVENTS_SHOWN: usize = 10;
/// Distinct user agents / endpoints remembered per IP
const MAX_TRACKED_VALUES: usize = 50;
const HEAVY_HITTER_ATTEMPTS: u64 = 100;

/// Kind of recorded security event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    BruteForceDetected,
    SuspiciousUserAgent,
    RateLimitExceeded,
    UnusualEndpointAccess,
    FailedAuthentication,
    PotentialSqlInjection,
    XssAttempt,
    DirectoryTraversal,
    AnomalousTrafficPattern,
    FailedSshAttempt,
}

impl EventKind {
    /// Fixed kind to severity table
    pub fn severity(&self) -> Severity {
        match self {
            EventKind::BruteForceDetected => Severity::Critical,
            EventKind::PotentialSqlInjection
            | EventKind::XssAttempt
            | EventKind::DirectoryTraversal => Severity::High,
            EventKind::SuspiciousUserAgent
            | EventKind::UnusualEndpointAccess
            | EventKind::AnomalousTrafficPattern => Severity::Medium,
            EventKind::RateLimitExceeded
            | EventKind::FailedAuthentication
            | EventKind::FailedSshAttempt => Severity::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::BruteForceDetected => "BRUTE_FORCE_DETECTED",
            EventKind::SuspiciousUserAgent => "SUSPICIOUS_USER_AGENT",
            EventKind::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            EventKind::UnusualEndpointAccess => "UNUSUAL_ENDPOINT_ACCESS",
            EventKind::FailedAuthentication => "FAILED_AUTHENTICATION",
            EventKind::PotentialSqlInjection => "POTENTIAL_SQL_INJECTION",
            EventKind::XssAttempt => "XSS_ATTEMPT",
            EventKind::DirectoryTraversal => "DIRECTORY_TRAVERSAL",
            EventKind::AnomalousTrafficPattern => "ANOMALOUS_TRAFFIC_PATTERN",
            EventKind::FailedSshAttempt => "FAILED_SSH_ATTEMPT",
        }
    }

    fn is_intrusion(&self) -> bool {
        matches!(
            self,
            EventKind::BruteForceDetected | EventKind::FailedSshAttempt
        )
    }
}

/// Attack payload family detected in a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackKind {
    SqlInjection,
    CrossSiteScripting,
    PathTraversal,
}

impl AttackKind {
    pub fn event_kind(&self) -> EventKind {
        match self {
            AttackKind::SqlInjection => EventKind::PotentialSqlInjection,
            AttackKind::CrossSiteScripting => EventKind::XssAttempt,
            AttackKind::PathTraversal => EventKind::DirectoryTraversal,
        }
    }
}

/// Four-level security status from the threat score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityStatus {
    Protected,
    Vigilant,
    Alert,
    UnderSiege,
}

impl SecurityStatus {
    pub fn from_score(score: u32) -> Self {
        if score < 10 {
            SecurityStatus::Protected
        } else if score < 30 {
            SecurityStatus::Vigilant
        } else if score < 60 {
            SecurityStatus::Alert
        } else {
            SecurityStatus::UnderSiege
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub id: String,
    pub kind: EventKind,
    pub severity: Severity,
    pub timestamp_ms: i64,
    pub details: serde_json::Value,
}

/// Per-IP connection history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub ip: String,
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub first_seen_ms: i64,
    pub last_seen_ms: i64,
    pub user_agents: BTreeSet<String>,
    pub endpoints: BTreeSet<String>,
}

impl ConnectionRecord {
    fn new(ip: &str, now: i64) -> Self {
        Self {
            ip: ip.to_string(),
            attempts: 0,
            successes: 0,
            failures: 0,
            first_seen_ms: now,
            last_seen_ms: now,
            user_agents: BTreeSet::new(),
            endpoints: BTreeSet::new(),
        }
    }

    fn is_suspicious(&self) -> bool {
        self.failures > self.successes * 2 || self.attempts > HEAVY_HITTER_ATTEMPTS
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThreatAssessment {
    /// Raw severity-weighted sum over the last hour
    pub score: u32,
    /// Score clamped to [0, 100]
    pub level: f64,
    pub status: SecurityStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityMetrics {
    pub timestamp_ms: i64,
    pub intrusion_attempts: usize,
    pub rate_limit_events: usize,
    pub critical_events: usize,
    pub enforcement_effectiveness: f64,
    pub suspicious_connections: usize,
    pub unique_ips: usize,
    pub anomalous_traffic_events: usize,
    pub pattern_deviation_percent: f64,
    pub event_frequency: usize,
    pub threat: ThreatAssessment,
    pub recent_events: Vec<SecurityEvent>,
    pub active_monitoring: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SecurityExport {
    pub exported_ms: i64,
    pub events: Vec<SecurityEvent>,
    pub connections: Vec<ConnectionRecord>,
}

fn sql_patterns() -> &'static RegexSet {
    static SET: OnceLock<RegexSet> = OnceLock::new();
    SET.get_or_init(|| {
        RegexSet::new([
            r"(?i)union.*select",
            r"(?i)or.*1=1",
            r"(?i)drop.*table",
            r"(?i)insert.*into",
            r"(?i)delete.*from",
            r"(?i)'\s*or\s+'?\w+'?\s*=\s*'?\w+",
        ])
        .expect("static SQL injection patterns")
    })
}

fn xss_patterns() -> &'static RegexSet {
    static SET: OnceLock<RegexSet> = OnceLock::new();
    SET.get_or_init(|| {
        RegexSet::new([
            r"(?i)<script",
            r"(?i)javascript:",
            r"(?i)\bon\w+\s*=",
            r"(?i)<iframe",
        ])
        .expect("static XSS patterns")
    })
}

fn traversal_patterns() -> &'static RegexSet {
    static SET: OnceLock<RegexSet> = OnceLock::new();
    SET.get_or_init(|| {
        RegexSet::new([
            r"\.\./\.\./",
            r"\.\.\\\.\.\\",
            r"(?i)%2e%2e%2f",
            r"(?i)%252e%252e%252f",
        ])
        .expect("static traversal patterns")
    })
}

fn suspicious_agent_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)bot|crawler|scanner|sqlmap|nikto|nmap|curl|wget|python")
            .expect("static user agent pattern")
    })
}

/// Whether a user agent matches the denylist; an empty agent is suspicious
pub fn analyze_user_agent(user_agent: &str) -> bool {
    user_agent.is_empty() || suspicious_agent_pattern().is_match(user_agent)
}

/// Attack families matched by the URL and its parameters
///
/// The query string is inspected both raw and percent-decoded. Each family
/// is reported at most once; several families may fire for one request.
pub fn analyze_request(url: &str, params: &[(String, String)]) -> Vec<AttackKind> {
    let mut haystack = String::with_capacity(url.len() * 2);
    haystack.push_str(url);

    if let Some((_, query)) = url.split_once('?') {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            haystack.push(' ');
            haystack.push_str(&key);
            haystack.push('=');
            haystack.push_str(&value);
        }
    }
    for (key, value) in params {
        haystack.push(' ');
        haystack.push_str(key);
        haystack.push('=');
        haystack.push_str(value);
    }

    let mut attacks = Vec::new();
    if sql_patterns().is_match(&haystack) {
        attacks.push(AttackKind::SqlInjection);
    }
    if xss_patterns().is_match(&haystack) {
        attacks.push(AttackKind::CrossSiteScripting);
    }
    if traversal_patterns().is_match(&haystack) {
        attacks.push(AttackKind::PathTraversal);
    }
    attacks
}

/// Flatten a request body into `(field, value)` pairs for [`analyze_request`]
///
/// JSON bodies yield one pair per scalar leaf keyed by its dotted path, form
/// bodies one pair per field. Any other non-empty body is inspected as text.
pub fn body_params(content_type: Option<&str>, body: &[u8]) -> Vec<(String, String)> {
    if body.is_empty() {
        return Vec::new();
    }

    let mime = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .unwrap_or_default();

    if mime == "application/x-www-form-urlencoded" {
        return url::form_urlencoded::parse(body)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
    }

    if mime.ends_with("json") {
        if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
            let mut params = Vec::new();
            flatten_json(String::new(), &value, &mut params);
            return params;
        }
    }

    vec![("body".to_string(), String::from_utf8_lossy(body).into_owned())]
}

fn flatten_json(path: String, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
    match value {
        serde_json::Value::Object(fields) => {
            for (key, child) in fields {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                flatten_json(child_path, child, out);
            }
        }
        serde_json::Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                flatten_json(format!("{}[{}]", path, i), child, out);
            }
        }
        serde_json::Value::String(text) => out.push((path, text.clone())),
        serde_json::Value::Null => {}
        other => out.push((path, other.to_string())),
    }
}

/// Security event and connection tracking
pub struct SecurityMonitor {
    clock: SharedClock,
    connections: DashMap<String, ConnectionRecord>,
    events: Mutex<BoundedLog<SecurityEvent>>,
    log_scanning: bool,
    metrics: DashboardMetrics,
    logger: StructuredLogger,
}

impl SecurityMonitor {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            connections: DashMap::new(),
            events: Mutex::new(BoundedLog::new(EVENT_LOG_CAP)),
            log_scanning: false,
            metrics: DashboardMetrics::new(),
            logger: StructuredLogger::default(),
        }
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Report host log scanning among the active monitoring systems
    pub fn with_log_scanning(mut self, enabled: bool) -> Self {
        self.log_scanning = enabled;
        self
    }

    /// Record a connection attempt from `ip`
    ///
    /// The failure that takes an IP past [`BRUTE_FORCE_FAILURES`] raises
    /// exactly one `BRUTE_FORCE_DETECTED` event.
    pub fn record_connection(
        &self,
        ip: &str,
        succeeded: bool,
        user_agent: Option<&str>,
        endpoint: Option<&str>,
    ) {
        let now = self.clock.now_ms();

        let brute_force = {
            let mut record = self
                .connections
                .entry(ip.to_string())
                .or_insert_with(|| ConnectionRecord::new(ip, now));

            record.attempts += 1;
            record.last_seen_ms = record.last_seen_ms.max(now);

            if let Some(agent) = user_agent {
                if record.user_agents.len() < MAX_TRACKED_VALUES {
                    record.user_agents.insert(agent.to_string());
                }
            }
            if let Some(endpoint) = endpoint {
                if record.endpoints.len() < MAX_TRACKED_VALUES {
                    record.endpoints.insert(endpoint.to_string());
                }
            }

            if succeeded {
                record.successes += 1;
                None
            } else {
                record.failures += 1;
                (record.failures == BRUTE_FORCE_FAILURES + 1)
                    .then(|| (record.failures, now - record.first_seen_ms))
            }
        };

        if let Some((failures, window_ms)) = brute_force {
            self.record_event(
                EventKind::BruteForceDetected,
                json!({ "ip": ip, "failures": failures, "window_ms": window_ms }),
            );
        }
    }

    /// Append an event to the bounded log
    pub fn record_event(&self, kind: EventKind, details: serde_json::Value) -> SecurityEvent {
        let severity = kind.severity();
        let event = SecurityEvent {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            severity,
            timestamp_ms: self.clock.now_ms(),
            details,
        };

        self.logger.log_security_event(
            kind.as_str(),
            severity.as_str(),
            &event.details.to_string(),
        );
        self.metrics.inc_security_event(severity.as_str());

        self.events.lock().push(event.clone());
        event
    }

    /// Analyze an inbound request and record one event per detected family
    ///
    /// `params` carries the decoded body fields, see [`body_params`].
    pub fn inspect_request(
        &self,
        ip: &str,
        url: &str,
        params: &[(String, String)],
        user_agent: Option<&str>,
    ) -> Vec<AttackKind> {
        let agent = user_agent.unwrap_or("");
        if analyze_user_agent(agent) {
            self.record_event(
                EventKind::SuspiciousUserAgent,
                json!({ "ip": ip, "user_agent": agent, "url": url }),
            );
        }

        let attacks = analyze_request(url, params);
        for attack in &attacks {
            self.record_event(attack.event_kind(), json!({ "ip": ip, "url": url }));
        }
        attacks
    }

    /// Severity-weighted sum of events in the last hour
    pub fn threat_score(&self) -> ThreatAssessment {
        let cutoff = self.clock.now_ms() - RECENT_WINDOW_MS;
        let events = self.events.lock();
        let score: u32 = events
            .iter()
            .filter(|e| e.timestamp_ms > cutoff)
            .map(|e| e.severity.threat_weight())
            .sum();
        assess(score)
    }

    pub fn metrics(&self) -> SecurityMetrics {
        let now = self.clock.now_ms();
        let cutoff = now - RECENT_WINDOW_MS;

        let recent: Vec<SecurityEvent> = self
            .events
            .lock()
            .iter()
            .filter(|e| e.timestamp_ms > cutoff)
            .cloned()
            .collect();

        let count = |pred: &dyn Fn(&SecurityEvent) -> bool| recent.iter().filter(|e| pred(e)).count();
        let critical_events = count(&|e| e.severity == Severity::Critical);
        let score: u32 = recent.iter().map(|e| e.severity.threat_weight()).sum();

        let enforcement_effectiveness = if recent.is_empty() {
            100.0
        } else {
            clamp_score(100.0 - critical_events as f64 / recent.len() as f64 * 100.0)
        };

        let mut suspicious = 0;
        let mut unique_ips = 0;
        for record in self.connections.iter() {
            unique_ips += 1;
            if record.last_seen_ms > cutoff {
                if record.failures > record.successes * 2 {
                    suspicious += 1;
                }
                if record.attempts > HEAVY_HITTER_ATTEMPTS {
                    suspicious += 1;
                }
            }
        }
        let pattern_deviation = if unique_ips > 0 {
            clamp_score(suspicious as f64 / unique_ips as f64 * 100.0)
        } else {
            0.0
        };

        let mut active_monitoring = vec![
            "connection_monitor".to_string(),
            "request_analyzer".to_string(),
            "pattern_detector".to_string(),
        ];
        if self.log_scanning && cfg!(target_os = "linux") {
            active_monitoring.push("log_scanner".to_string());
        }

        let skip = recent.len().saturating_sub(RECENT_EVENTS_SHOWN);

        SecurityMetrics {
            timestamp_ms: now,
            intrusion_attempts: count(&|e| e.kind.is_intrusion()),
            rate_limit_events: count(&|e| e.kind == EventKind::RateLimitExceeded),
            critical_events,
            enforcement_effectiveness: round2(enforcement_effectiveness),
            suspicious_connections: suspicious,
            unique_ips,
            anomalous_traffic_events: count(&|e| e.kind == EventKind::AnomalousTrafficPattern),
            pattern_deviation_percent: round2(pattern_deviation),
            event_frequency: recent.len(),
            threat: assess(score),
            recent_events: recent[skip..].to_vec(),
            active_monitoring,
        }
    }

    /// Snapshot of the per-IP record, if any
    pub fn connection(&self, ip: &str) -> Option<ConnectionRecord> {
        self.connections.get(ip).map(|r| r.clone())
    }

    /// Whether an IP currently looks hostile
    pub fn is_suspicious(&self, ip: &str) -> bool {
        self.connections
            .get(ip)
            .map(|r| r.is_suspicious())
            .unwrap_or(false)
    }

    pub fn event_count(&self) -> usize {
        self.events.lock().len()
    }

    /// Drop events and idle IP records older than `retention`
    pub fn prune(&self, retention: Duration) -> (usize, usize) {
        let cutoff = self.clock.now_ms() - retention.as_millis() as i64;

        let events_removed = {
            let mut events = self.events.lock();
            let before = events.len();
            events.drain_front_while(|e| e.timestamp_ms <= cutoff);
            before - events.len()
        };

        let before = self.connections.len();
        self.connections.retain(|_, record| record.last_seen_ms >= cutoff);
        let records_removed = before - self.connections.len();

        (events_removed, records_removed)
    }

    pub fn export(&self) -> SecurityExport {
        SecurityExport {
            exported_ms: self.clock.now_ms(),
            events: self.events.lock().to_vec(),
            connections: self.connections.iter().map(|r| r.clone()).collect(),
        }
    }
}

fn assess(score: u32) -> ThreatAssessment {
    ThreatAssessment {
        score,
        level: clamp_score(score as f64),
        status: SecurityStatus::from_score(score),
    }
}

/// Periodic pruning of stale security data
pub struct SecurityCleanup {
    monitor: Arc<SecurityMonitor>,
    retention: Duration,
}

impl SecurityCleanup {
    pub fn new(monitor: Arc<SecurityMonitor>) -> Self {
        Self {
            monitor,
            retention: RETENTION,
        }
    }
}

#[async_trait]
impl PeriodicTask for SecurityCleanup {
    fn name(&self) -> &'static str {
        "security_cleanup"
    }

    async fn run_once(&mut self) -> anyhow::Result<()> {
        let (events, records) = self.monitor.prune(self.retention);
        if events > 0 || records > 0 {
            debug!(events, records, "Pruned stale security data");
        }
        Ok(())
    }
}

/// Failed SSH logins: (source ip, log line)
pub fn parse_ssh_failures(output: &str) -> Vec<(String, String)> {
    static IP: OnceLock<Regex> = OnceLock::new();
    let ip = IP.get_or_init(|| Regex::new(r"from ([0-9a-fA-F:.]+)").expect("static ip pattern"));

    output
        .lines()
        .filter(|line| line.contains("Failed password"))
        .filter_map(|line| {
            let caps = ip.captures(line)?;
            Some((caps[1].to_string(), line.trim().to_string()))
        })
        .collect()
}

/// Authentication failure lines, most recent ten
pub fn parse_auth_failures(output: &str) -> Vec<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?i)authentication failure|invalid user|failed login")
            .expect("static auth failure pattern")
    });

    let lines: Vec<String> = output
        .lines()
        .filter(|line| re.is_match(line))
        .map(|line| line.trim().to_string())
        .collect();
    let skip = lines.len().saturating_sub(10);
    lines.into_iter().skip(skip).collect()
}

/// Host auth-log scanner
///
/// Only active on Linux hosts with `journalctl`; every failure (missing
/// binary, permissions, timeout) degrades to a silent no-op.
pub struct LogScanner {
    monitor: Arc<SecurityMonitor>,
    timeout: Duration,
    last_scan_secs: Option<i64>,
}

impl LogScanner {
    pub fn new(monitor: Arc<SecurityMonitor>) -> Self {
        Self {
            monitor,
            timeout: Duration::from_secs(5),
            last_scan_secs: None,
        }
    }

    /// `--since` argument: the previous scan, or five minutes back on the monitor clock
    fn since_arg(&self) -> (i64, String) {
        let now_secs = self.monitor.clock.now_ms().div_euclid(1000);
        let since = self.last_scan_secs.unwrap_or(now_secs - 300);
        (now_secs, format!("@{}", since))
    }

    async fn journal(&self, extra: &[&str], since: &str) -> Option<String> {
        let mut cmd = tokio::process::Command::new("journalctl");
        cmd.args(extra)
            .args(["--since", since, "--no-pager", "-q"])
            .kill_on_drop(true);

        match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) if output.status.success() => {
                Some(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(Ok(output)) => {
                debug!(status = %output.status, "journalctl exited unsuccessfully");
                None
            }
            Ok(Err(e)) => {
                debug!(error = %e, "journalctl unavailable");
                None
            }
            Err(_) => {
                debug!(timeout_secs = self.timeout.as_secs(), "journalctl timed out");
                None
            }
        }
    }
}

#[async_trait]
impl PeriodicTask for LogScanner {
    fn name(&self) -> &'static str {
        "security_log_scan"
    }

    async fn run_once(&mut self) -> anyhow::Result<()> {
        if !cfg!(target_os = "linux") {
            return Ok(());
        }

        let (now_secs, since) = self.since_arg();

        if let Some(output) = self.journal(&["-u", "ssh"], &since).await {
            for (ip, line) in parse_ssh_failures(&output) {
                self.monitor.record_event(
                    EventKind::FailedSshAttempt,
                    json!({ "ip": ip, "log_entry": line }),
                );
            }
        }

        if let Some(output) = self.journal(&[], &since).await {
            for line in parse_auth_failures(&output) {
                self.monitor
                    .record_event(EventKind::FailedAuthentication, json!({ "log_entry": line }));
            }
        }

        self.last_scan_secs = Some(now_secs);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn monitor() -> (SecurityMonitor, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        (SecurityMonitor::new(clock.clone()), clock)
    }

    fn brute_force_events(monitor: &SecurityMonitor) -> usize {
        monitor
            .export()
            .events
            .iter()
            .filter(|e| e.kind == EventKind::BruteForceDetected)
            .count()
    }

    #[test]
    fn test_brute_force_fires_once_on_eleventh_failure() {
        let (monitor, _) = monitor();

        for _ in 0..10 {
            monitor.record_connection("10.0.0.9", false, None, None);
        }
        assert_eq!(brute_force_events(&monitor), 0);

        monitor.record_connection("10.0.0.9", false, None, None);
        assert_eq!(brute_force_events(&monitor), 1);

        for _ in 0..20 {
            monitor.record_connection("10.0.0.9", false, None, None);
        }
        assert_eq!(brute_force_events(&monitor), 1);

        let event = monitor.export().events.into_iter().next().unwrap();
        assert_eq!(event.severity, Severity::Critical);
        assert_eq!(event.details["failures"], 11);
    }

    #[test]
    fn test_connection_record_tracks_agents_and_endpoints() {
        let (monitor, clock) = monitor();
        monitor.record_connection("1.2.3.4", true, Some("Mozilla/5.0"), Some("/api/state"));
        clock.advance(Duration::from_secs(5));
        monitor.record_connection("1.2.3.4", false, Some("curl/8.0"), Some("/api/state"));

        let record = monitor.connection("1.2.3.4").unwrap();
        assert_eq!(record.attempts, 2);
        assert_eq!(record.successes, 1);
        assert_eq!(record.failures, 1);
        assert_eq!(record.user_agents.len(), 2);
        assert_eq!(record.endpoints.len(), 1);
        assert_eq!(record.last_seen_ms - record.first_seen_ms, 5_000);
    }

    #[test]
    fn test_event_log_is_bounded_fifo() {
        let (monitor, clock) = monitor();
        for i in 0..(EVENT_LOG_CAP + 25) {
            clock.advance(Duration::from_millis(1));
            monitor.record_event(EventKind::RateLimitExceeded, json!({ "seq": i }));
        }

        let events = monitor.export().events;
        assert_eq!(events.len(), EVENT_LOG_CAP);
        assert_eq!(events[0].details["seq"], 25);
    }

    #[test]
    fn test_severity_table() {
        assert_eq!(EventKind::BruteForceDetected.severity(), Severity::Critical);
        assert_eq!(EventKind::PotentialSqlInjection.severity(), Severity::High);
        assert_eq!(EventKind::SuspiciousUserAgent.severity(), Severity::Medium);
        assert_eq!(EventKind::FailedSshAttempt.severity(), Severity::Low);
    }

    #[test]
    fn test_event_kind_wire_name_matches_serde() {
        let json = serde_json::to_string(&EventKind::XssAttempt).unwrap();
        assert_eq!(json, format!("\"{}\"", EventKind::XssAttempt.as_str()));
    }

    #[test]
    fn test_user_agent_denylist() {
        assert!(analyze_user_agent(""));
        assert!(analyze_user_agent("sqlmap/1.7"));
        assert!(analyze_user_agent("Googlebot/2.1"));
        assert!(analyze_user_agent("python-requests/2.31"));
        assert!(!analyze_user_agent(
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36"
        ));
    }

    #[test]
    fn test_analyze_request_sql_injection() {
        let attacks = analyze_request("/x?id=1' OR '1'='1", &[]);
        assert!(attacks.contains(&AttackKind::SqlInjection));
    }

    #[test]
    fn test_analyze_request_decodes_query() {
        let attacks = analyze_request("/x?id=1%27%20OR%20%271%27%3D%271", &[]);
        assert_eq!(attacks, vec![AttackKind::SqlInjection]);

        let attacks = analyze_request("/search?q=%3Cscript%3Ealert(1)%3C%2Fscript%3E", &[]);
        assert_eq!(attacks, vec![AttackKind::CrossSiteScripting]);
    }

    #[test]
    fn test_analyze_request_multiple_kinds() {
        let attacks = analyze_request(
            "/files/../../etc/passwd",
            &[("q".to_string(), "<iframe src=x>".to_string())],
        );
        assert_eq!(
            attacks,
            vec![AttackKind::CrossSiteScripting, AttackKind::PathTraversal]
        );
    }

    #[test]
    fn test_analyze_request_clean() {
        assert!(analyze_request("/api/monitoring/system?month=3", &[]).is_empty());
        assert!(analyze_request("/api/messages", &[]).is_empty());
    }

    #[test]
    fn test_threat_score_weights_and_status() {
        let (monitor, _) = monitor();
        assert_eq!(monitor.threat_score().status, SecurityStatus::Protected);

        monitor.record_event(EventKind::BruteForceDetected, json!({}));
        monitor.record_event(EventKind::XssAttempt, json!({}));
        monitor.record_event(EventKind::SuspiciousUserAgent, json!({}));
        monitor.record_event(EventKind::FailedAuthentication, json!({}));

        let threat = monitor.threat_score();
        assert_eq!(threat.score, 36);
        assert_eq!(threat.status, SecurityStatus::Alert);
    }

    #[test]
    fn test_threat_level_clamped_and_windowed() {
        let (monitor, clock) = monitor();
        for _ in 0..10 {
            monitor.record_event(EventKind::BruteForceDetected, json!({}));
        }
        let threat = monitor.threat_score();
        assert_eq!(threat.score, 200);
        assert_eq!(threat.level, 100.0);
        assert_eq!(threat.status, SecurityStatus::UnderSiege);

        clock.advance(Duration::from_secs(3601));
        assert_eq!(monitor.threat_score().score, 0);
    }

    #[test]
    fn test_metrics_connection_analysis() {
        let (monitor, _) = monitor();
        for _ in 0..3 {
            monitor.record_connection("6.6.6.6", false, None, None);
        }
        monitor.record_connection("1.1.1.1", true, None, None);

        let metrics = monitor.metrics();
        assert_eq!(metrics.unique_ips, 2);
        assert_eq!(metrics.suspicious_connections, 1);
        assert_eq!(metrics.pattern_deviation_percent, 50.0);
        assert!(monitor.is_suspicious("6.6.6.6"));
        assert!(!monitor.is_suspicious("1.1.1.1"));
    }

    #[test]
    fn test_metrics_idempotent() {
        let (monitor, _) = monitor();
        monitor.record_event(EventKind::FailedSshAttempt, json!({ "ip": "9.9.9.9" }));
        monitor.record_connection("9.9.9.9", false, None, None);
        assert_eq!(monitor.metrics(), monitor.metrics());
        assert_eq!(monitor.metrics().intrusion_attempts, 1);
    }

    #[test]
    fn test_inspect_request_records_events() {
        let (monitor, _) = monitor();
        let attacks = monitor.inspect_request("5.5.5.5", "/x?id=1' OR '1'='1", &[], Some("nikto"));
        assert_eq!(attacks, vec![AttackKind::SqlInjection]);

        let kinds: Vec<EventKind> = monitor.export().events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![EventKind::SuspiciousUserAgent, EventKind::PotentialSqlInjection]
        );
    }

    #[test]
    fn test_inspect_request_scans_body_fields() {
        let (monitor, _) = monitor();
        let params = body_params(
            Some("application/json"),
            br#"{"text":"hi <script>alert(1)</script> ' OR '1'='1","author":"ops"}"#,
        );

        let attacks = monitor.inspect_request("5.5.5.5", "/api/messages", &params, Some("Mozilla/5.0"));
        assert_eq!(
            attacks,
            vec![AttackKind::SqlInjection, AttackKind::CrossSiteScripting]
        );
        assert_eq!(monitor.export().events.len(), 2);
    }

    #[test]
    fn test_log_scan_window_follows_monitor_clock() {
        let (monitor, clock) = monitor();
        let mut scanner = LogScanner::new(Arc::new(monitor));

        let (now_secs, since) = scanner.since_arg();
        assert_eq!(now_secs, 1_704_067_200);
        assert_eq!(since, "@1704066900");

        scanner.last_scan_secs = Some(now_secs);
        clock.advance(Duration::from_secs(30));
        let (now_secs, since) = scanner.since_arg();
        assert_eq!(now_secs, 1_704_067_230);
        assert_eq!(since, "@1704067200");
    }

    #[test]
    fn test_body_params_shapes() {
        let json = body_params(
            Some("application/json; charset=utf-8"),
            br#"{"a":{"b":"x"},"list":[1,null],"flag":true}"#,
        );
        assert_eq!(
            json,
            vec![
                ("a.b".to_string(), "x".to_string()),
                ("flag".to_string(), "true".to_string()),
                ("list[0]".to_string(), "1".to_string()),
            ]
        );

        let form = body_params(
            Some("application/x-www-form-urlencoded"),
            b"q=%3Cscript%3E&page=2",
        );
        assert_eq!(form[0], ("q".to_string(), "<script>".to_string()));

        let text = body_params(Some("text/plain"), b"../../etc/passwd");
        assert_eq!(text, vec![("body".to_string(), "../../etc/passwd".to_string())]);

        assert!(body_params(Some("application/json"), b"").is_empty());
    }

    #[test]
    fn test_prune_drops_stale_data() {
        let (monitor, clock) = monitor();
        monitor.record_event(EventKind::FailedAuthentication, json!({}));
        monitor.record_connection("7.7.7.7", true, None, None);

        clock.advance(RETENTION + Duration::from_secs(1));
        monitor.record_connection("8.8.8.8", true, None, None);

        let (events, records) = monitor.prune(RETENTION);
        assert_eq!((events, records), (1, 1));
        assert!(monitor.connection("7.7.7.7").is_none());
        assert!(monitor.connection("8.8.8.8").is_some());
    }

    #[test]
    fn test_parse_journal_output() {
        let ssh = "Jan 01 sshd[1]: Failed password for root from 203.0.113.5 port 22 ssh2\n\
Jan 01 sshd[1]: Accepted publickey for admin from 198.51.100.1 port 22\n";
        let failures = parse_ssh_failures(ssh);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "203.0.113.5");

        let auth = "pam_unix(sudo:auth): authentication failure; user=bob\nnormal line\nInvalid user admin\n";
        assert_eq!(parse_auth_failures(auth).len(), 2);
    }
}
