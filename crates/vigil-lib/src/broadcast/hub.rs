//! Fan-out hub shared by the broadcast loop, WebSocket sessions and REST
//!
//! Every outbound frame is serialized once and pushed on a single tokio
//! broadcast channel, so subscribers see frames in send order. Each frame
//! carries its origin connection; sessions skip frames they originated.

use super::directory::{ClientDirectory, ClientEntry};
use super::validation::{validate_registration, validate_text, DEFAULT_MAX_MESSAGE_LEN};
use super::wire::{
    parse_client_message, ChatMessage, ClientMessage, CompositeState, ErrorFrame,
    MessageSubmission, ServerMessage,
};
use crate::analytics::HealthAnalytics;
use crate::clock::SharedClock;
use crate::error::InputError;
use crate::health::{components, HealthRegistry};
use crate::monitor::Monitors;
use crate::observability::DashboardMetrics;
use crate::scheduler::PeriodicTask;
use crate::window::BoundedLog;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Shared output queue depth; slow subscribers lag past this
pub const CHANNEL_CAPACITY: usize = 1024;
/// Relayed messages kept for `GET /api/messages`
pub const MESSAGE_HISTORY_CAP: usize = 50;
const ANONYMOUS_AUTHOR: &str = "anonymous";
const FRAME_ENVELOPE_ALLOWANCE: usize = 1024;

/// One serialized frame on the shared queue
#[derive(Debug, Clone)]
pub struct Outbound {
    pub origin: Option<String>,
    pub frame: Arc<str>,
}

impl Outbound {
    /// Whether the session `client_id` should forward this frame
    pub fn is_for(&self, client_id: &str) -> bool {
        self.origin.as_deref() != Some(client_id)
    }
}

pub fn encode(message: &ServerMessage) -> Result<Arc<str>, serde_json::Error> {
    serde_json::to_string(message).map(Arc::from)
}

pub struct BroadcastHub {
    monitors: Monitors,
    analytics: Arc<HealthAnalytics>,
    clock: SharedClock,
    directory: ClientDirectory,
    messages: Mutex<BoundedLog<ChatMessage>>,
    tx: broadcast::Sender<Outbound>,
    max_message_len: usize,
    started_ms: i64,
    metrics: DashboardMetrics,
}

impl BroadcastHub {
    pub fn new(monitors: Monitors, analytics: Arc<HealthAnalytics>, clock: SharedClock) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        let started_ms = clock.now_ms();
        Self {
            monitors,
            analytics,
            clock,
            directory: ClientDirectory::new(),
            messages: Mutex::new(BoundedLog::new(MESSAGE_HISTORY_CAP)),
            tx,
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
            started_ms,
            metrics: DashboardMetrics::new(),
        }
    }

    pub fn with_max_message_len(mut self, max_message_len: usize) -> Self {
        self.max_message_len = max_message_len;
        self
    }

    pub fn max_message_len(&self) -> usize {
        self.max_message_len
    }

    /// Upper bound in bytes for one inbound frame or request body
    ///
    /// Covers a maximal UTF-8 message plus its JSON envelope.
    pub fn max_frame_len(&self) -> usize {
        self.max_message_len.saturating_mul(4).saturating_add(FRAME_ENVELOPE_ALLOWANCE)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Outbound> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn monitors(&self) -> &Monitors {
        &self.monitors
    }

    pub fn analytics(&self) -> &Arc<HealthAnalytics> {
        &self.analytics
    }

    pub fn uptime_seconds(&self) -> u64 {
        ((self.clock.now_ms() - self.started_ms).max(0) / 1000) as u64
    }

    /// Gather every monitor's current output into one value
    pub fn composite_state(&self) -> CompositeState {
        CompositeState {
            timestamp_ms: self.clock.now_ms(),
            uptime_seconds: self.uptime_seconds(),
            connected_clients: self.directory.len(),
            system: self.monitors.system.sample(),
            api: self.monitors.api.summary(),
            agents: self.monitors.agents.metrics(),
            security: self.monitors.security.metrics(),
            health: self.analytics.current(),
            analytics: self.analytics.summary(),
        }
    }

    /// Push the composite state to every subscriber
    ///
    /// Returns the number of subscribers reached.
    pub fn publish_state(&self) -> Result<usize, serde_json::Error> {
        let state = self.composite_state();
        let reached = self.send(None, &ServerMessage::StateUpdate(Box::new(state)))?;
        self.metrics.inc_broadcasts_sent();
        Ok(reached)
    }

    /// Register a new session; returns the directory frame for it alone
    pub fn connect(&self, client_id: &str) -> ServerMessage {
        self.directory.insert(client_id, self.clock.now_ms());
        self.monitors.agents.on_connect(client_id);
        ServerMessage::ClientUpdate(self.directory.list())
    }

    /// Handle one text frame from `client_id`
    ///
    /// Returns a frame to send back to the sender only, if any.
    pub fn handle_frame(&self, client_id: &str, text: &str) -> Option<ServerMessage> {
        let message = match parse_client_message(text) {
            Ok(message) => message,
            Err(e) => return Some(self.reject(client_id, &e)),
        };

        match message {
            ClientMessage::Heartbeat => {
                self.monitors.agents.on_heartbeat(client_id);
                None
            }
            ClientMessage::Register(registration) => {
                self.monitors.agents.on_message(client_id, "register", text.len());
                let registration = match validate_registration(registration, self.max_message_len) {
                    Ok(registration) => registration,
                    Err(e) => return Some(self.reject(client_id, &e)),
                };
                self.directory
                    .register(client_id, registration, self.clock.now_ms());
                self.broadcast_directory();
                None
            }
            ClientMessage::Message(submission) => {
                self.monitors.agents.on_message(client_id, "message", text.len());
                match self.submit_message(Some(client_id), submission) {
                    Ok(_) => None,
                    Err(e) => Some(self.reject(client_id, &e)),
                }
            }
        }
    }

    /// Stamp, store and relay a message
    ///
    /// Messages with an origin are relayed to every other subscriber; HTTP
    /// submissions reach everyone.
    pub fn submit_message(
        &self,
        origin: Option<&str>,
        submission: MessageSubmission,
    ) -> Result<ChatMessage, InputError> {
        let text = validate_text(&submission.text, self.max_message_len)?;
        let author = submission
            .author
            .and_then(|a| validate_text(&a, self.max_message_len).ok())
            .unwrap_or_else(|| ANONYMOUS_AUTHOR.to_string());

        let message = ChatMessage {
            id: uuid::Uuid::new_v4().to_string(),
            text,
            author,
            origin: origin.map(str::to_string),
            timestamp_ms: self.clock.now_ms(),
        };
        self.messages.lock().push(message.clone());

        if let Err(e) = self.send(origin, &ServerMessage::NewMessage(message.clone())) {
            warn!(error = %e, message_id = %message.id, "Failed to encode relayed message");
        }
        Ok(message)
    }

    /// Most recent relayed messages, oldest first
    pub fn recent_messages(&self) -> Vec<ChatMessage> {
        self.messages.lock().to_vec()
    }

    pub fn clients(&self) -> Vec<ClientEntry> {
        self.directory.list()
    }

    /// Drop a session from the directory and the agent monitor
    pub fn disconnect(&self, client_id: &str, reason: &str) {
        self.directory.remove(client_id);
        self.monitors.agents.on_disconnect(client_id, reason);
        self.broadcast_directory();
    }

    fn broadcast_directory(&self) {
        if let Err(e) = self.send(None, &ServerMessage::ClientUpdate(self.directory.list())) {
            warn!(error = %e, "Failed to encode client directory");
        }
    }

    fn reject(&self, client_id: &str, err: &InputError) -> ServerMessage {
        debug!(client_id = %client_id, code = err.code(), error = %err, "Rejected client frame");
        ServerMessage::Error(ErrorFrame::from(err))
    }

    fn send(&self, origin: Option<&str>, message: &ServerMessage) -> Result<usize, serde_json::Error> {
        let frame = encode(message)?;
        // Err only means nobody is subscribed right now
        let reached = self
            .tx
            .send(Outbound {
                origin: origin.map(str::to_string),
                frame,
            })
            .unwrap_or(0);
        Ok(reached)
    }
}

/// Periodic composite-state broadcast
pub struct Broadcaster {
    hub: Arc<BroadcastHub>,
    health: HealthRegistry,
}

impl Broadcaster {
    pub fn new(hub: Arc<BroadcastHub>, health: HealthRegistry) -> Self {
        Self { hub, health }
    }
}

#[async_trait]
impl PeriodicTask for Broadcaster {
    fn name(&self) -> &'static str {
        "broadcaster"
    }

    async fn run_once(&mut self) -> anyhow::Result<()> {
        match self.hub.publish_state() {
            Ok(reached) => {
                debug!(subscribers = reached, "Broadcast composite state");
                self.health.set_healthy(components::BROADCASTER).await;
                Ok(())
            }
            Err(e) => {
                self.health
                    .set_degraded(components::BROADCASTER, e.to_string())
                    .await;
                Err(e.into())
            }
        }
    }
}
