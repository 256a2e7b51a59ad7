//! Real-time client connection monitor
//!
//! Transport-agnostic lifecycle hooks for connected clients. Keeps the live
//! connection map, a trailing 60 second message window and a one hour
//! history of derived performance snapshots.

use crate::clock::SharedClock;
use crate::observability::{DashboardMetrics, StructuredLogger};
use crate::scheduler::PeriodicTask;
use crate::stats::{clamp_score, mean, round2};
use crate::window::{BoundedLog, Stamped, TimeWindow};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

const MESSAGE_WINDOW: Duration = Duration::from_secs(60);
const PERFORMANCE_RETENTION: Duration = Duration::from_secs(60 * 60);
/// Connection events kept in history
pub const CONNECTION_HISTORY_CAP: usize = 1000;
/// Connections alive longer than this count as stable
const STABLE_AFTER_MS: i64 = 5 * 60 * 1000;
/// Connections seen within this window count as active streams
const ACTIVE_WITHIN_MS: i64 = 5 * 60 * 1000;

/// Live client session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub id: String,
    pub connected_at_ms: i64,
    pub last_seen_ms: i64,
    pub message_count: u64,
    pub bytes_received: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_event: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionEventKind {
    Connect,
    Disconnect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionEvent {
    pub kind: ConnectionEventKind,
    pub connection_id: String,
    pub timestamp_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_ms: Option<i64>,
}

/// Four-level health of the real-time layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentHealth {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl AgentHealth {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            AgentHealth::Excellent
        } else if score >= 60.0 {
            AgentHealth::Good
        } else if score >= 40.0 {
            AgentHealth::Fair
        } else {
            AgentHealth::Poor
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMetrics {
    pub timestamp_ms: i64,
    pub connected: usize,
    pub total_connections: u64,
    pub active_streams: usize,
    pub messages_per_minute: usize,
    pub average_message_bytes: f64,
    pub bandwidth_bytes_per_minute: u64,
    pub total_messages: u64,
    /// Percentage of live connections older than five minutes
    pub stability_score: f64,
    pub average_session_secs: f64,
    pub websocket_health: f64,
    pub ecosystem_vitality: f64,
    pub overall_score: f64,
    pub health: AgentHealth,
}

/// Derived values captured on each tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub connected: usize,
    pub messages_per_minute: usize,
    pub stability_score: f64,
    pub overall_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentExport {
    pub exported_ms: i64,
    pub connections: Vec<ConnectionRecord>,
    pub history: Vec<ConnectionEvent>,
    pub performance: Vec<Stamped<PerformanceSnapshot>>,
    pub total_messages: u64,
}

struct Inner {
    connections: BTreeMap<String, ConnectionRecord>,
    history: BoundedLog<ConnectionEvent>,
    messages: TimeWindow<u64>,
    performance: TimeWindow<PerformanceSnapshot>,
    total_messages: u64,
    total_connections: u64,
}

/// Connection lifecycle and message-rate tracking
pub struct AgentMonitor {
    clock: SharedClock,
    inner: Mutex<Inner>,
    metrics: DashboardMetrics,
    logger: StructuredLogger,
}

impl AgentMonitor {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            inner: Mutex::new(Inner {
                connections: BTreeMap::new(),
                history: BoundedLog::new(CONNECTION_HISTORY_CAP),
                messages: TimeWindow::new(MESSAGE_WINDOW),
                performance: TimeWindow::new(PERFORMANCE_RETENTION),
                total_messages: 0,
                total_connections: 0,
            }),
            metrics: DashboardMetrics::new(),
            logger: StructuredLogger::default(),
        }
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Register a new live connection
    pub fn on_connect(&self, id: &str) {
        let now = self.clock.now_ms();
        let connected = {
            let mut inner = self.inner.lock();
            inner.connections.insert(
                id.to_string(),
                ConnectionRecord {
                    id: id.to_string(),
                    connected_at_ms: now,
                    last_seen_ms: now,
                    message_count: 0,
                    bytes_received: 0,
                    last_event: None,
                },
            );
            inner.total_connections += 1;
            inner.history.push(ConnectionEvent {
                kind: ConnectionEventKind::Connect,
                connection_id: id.to_string(),
                timestamp_ms: now,
                reason: None,
                session_ms: None,
            });
            inner.connections.len()
        };

        self.metrics.set_connected_clients(connected as i64);
        self.logger.log_client_connected(id, connected);
    }

    /// Count an inbound message and refresh the sender's liveness
    pub fn on_message(&self, id: &str, event_name: &str, payload_size: usize) {
        let now = self.clock.now_ms();
        let mut inner = self.inner.lock();

        if let Some(record) = inner.connections.get_mut(id) {
            record.message_count += 1;
            record.bytes_received += payload_size as u64;
            record.last_seen_ms = record.last_seen_ms.max(now);
            record.last_event = Some(event_name.to_string());
        }

        inner.total_messages += 1;
        inner.messages.push(now, payload_size as u64);
    }

    /// Refresh liveness without counting a message
    pub fn on_heartbeat(&self, id: &str) {
        let now = self.clock.now_ms();
        if let Some(record) = self.inner.lock().connections.get_mut(id) {
            record.last_seen_ms = record.last_seen_ms.max(now);
        }
    }

    /// Remove a connection; returns the final record if it was live
    pub fn on_disconnect(&self, id: &str, reason: &str) -> Option<ConnectionRecord> {
        let now = self.clock.now_ms();
        let (removed, connected) = {
            let mut inner = self.inner.lock();
            let removed = inner.connections.remove(id);
            inner.history.push(ConnectionEvent {
                kind: ConnectionEventKind::Disconnect,
                connection_id: id.to_string(),
                timestamp_ms: now,
                reason: Some(reason.to_string()),
                session_ms: removed.as_ref().map(|r| now - r.connected_at_ms),
            });
            (removed, inner.connections.len())
        };

        self.metrics.set_connected_clients(connected as i64);
        self.logger.log_client_disconnected(id, reason, connected);
        removed
    }

    pub fn connected_count(&self) -> usize {
        self.inner.lock().connections.len()
    }

    pub fn connection(&self, id: &str) -> Option<ConnectionRecord> {
        self.inner.lock().connections.get(id).cloned()
    }

    /// Most recent connection events, oldest first
    pub fn connection_history(&self, limit: usize) -> Vec<ConnectionEvent> {
        self.inner.lock().history.last_n(limit).cloned().collect()
    }

    pub fn metrics(&self) -> AgentMetrics {
        let now = self.clock.now_ms();
        let inner = self.inner.lock();
        derive(&inner, now)
    }

    /// Snapshot derived values into the one hour performance history
    pub fn tick(&self) -> PerformanceSnapshot {
        let now = self.clock.now_ms();
        let mut inner = self.inner.lock();

        inner.messages.evict_expired(now);
        let derived = derive(&inner, now);
        let snapshot = PerformanceSnapshot {
            connected: derived.connected,
            messages_per_minute: derived.messages_per_minute,
            stability_score: derived.stability_score,
            overall_score: derived.overall_score,
        };
        inner.performance.push(now, snapshot);
        snapshot
    }

    pub fn performance_history(&self) -> Vec<Stamped<PerformanceSnapshot>> {
        self.inner.lock().performance.to_vec()
    }

    pub fn export(&self) -> AgentExport {
        let inner = self.inner.lock();
        AgentExport {
            exported_ms: self.clock.now_ms(),
            connections: inner.connections.values().cloned().collect(),
            history: inner.history.to_vec(),
            performance: inner.performance.to_vec(),
            total_messages: inner.total_messages,
        }
    }
}

fn derive(inner: &Inner, now: i64) -> AgentMetrics {
    let window_start = now - MESSAGE_WINDOW.as_millis() as i64;
    let sizes: Vec<u64> = inner
        .messages
        .iter()
        .filter(|m| m.timestamp_ms > window_start)
        .map(|m| m.value)
        .collect();

    let messages_per_minute = sizes.len();
    let bandwidth: u64 = sizes.iter().sum();
    let average_message_bytes = if sizes.is_empty() {
        0.0
    } else {
        bandwidth as f64 / sizes.len() as f64
    };

    let connected = inner.connections.len();
    let stable = inner
        .connections
        .values()
        .filter(|c| now - c.connected_at_ms > STABLE_AFTER_MS)
        .count();
    let stability_score = if connected == 0 {
        100.0
    } else {
        stable as f64 / connected as f64 * 100.0
    };

    let active_streams = inner
        .connections
        .values()
        .filter(|c| c.last_seen_ms > now - ACTIVE_WITHIN_MS)
        .count();

    let sessions: Vec<f64> = inner
        .connections
        .values()
        .map(|c| (now - c.connected_at_ms).max(0) as f64 / 1000.0)
        .collect();
    let average_session_secs = mean(&sessions).unwrap_or(0.0);

    let websocket_health = websocket_health(connected, stability_score);
    let ecosystem_vitality = ecosystem_vitality(connected, messages_per_minute);
    let overall_score = (websocket_health + ecosystem_vitality) / 2.0;

    AgentMetrics {
        timestamp_ms: now,
        connected,
        total_connections: inner.total_connections,
        active_streams,
        messages_per_minute,
        average_message_bytes: round2(average_message_bytes),
        bandwidth_bytes_per_minute: bandwidth,
        total_messages: inner.total_messages,
        stability_score: round2(stability_score),
        average_session_secs: round2(average_session_secs),
        websocket_health,
        ecosystem_vitality,
        overall_score,
        health: AgentHealth::from_score(overall_score),
    }
}

fn websocket_health(connected: usize, stability_score: f64) -> f64 {
    if connected == 0 {
        return 50.0;
    }
    let mut score = 100.0;
    if stability_score < 80.0 {
        score -= 20.0;
    }
    clamp_score(score)
}

fn ecosystem_vitality(connected: usize, messages_per_minute: usize) -> f64 {
    let mut score = 100.0;
    if messages_per_minute < 1 {
        score -= 30.0;
    }
    if connected < 2 {
        score -= 20.0;
    }
    clamp_score(score)
}

/// Periodic snapshot of derived connection values
pub struct AgentTick {
    monitor: Arc<AgentMonitor>,
}

impl AgentTick {
    pub fn new(monitor: Arc<AgentMonitor>) -> Self {
        Self { monitor }
    }
}

#[async_trait]
impl PeriodicTask for AgentTick {
    fn name(&self) -> &'static str {
        "agent_tick"
    }

    async fn run_once(&mut self) -> anyhow::Result<()> {
        self.monitor.tick();
        Ok(())
    }
}
