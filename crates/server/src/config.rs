//! Server configuration

use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;
use vigil_lib::monitor::SourceKind;

/// Dashboard server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct VigilConfig {
    /// HTTP and WebSocket listen port
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Composite state broadcast period in seconds
    #[serde(default = "default_broadcast_interval")]
    pub broadcast_interval_secs: u64,

    #[serde(default = "default_broadcast_initial_delay")]
    pub broadcast_initial_delay_secs: u64,

    /// Health snapshot period in seconds
    #[serde(default = "default_analytics_interval")]
    pub analytics_interval_secs: u64,

    /// Warm-up grace before the first snapshot
    #[serde(default = "default_analytics_initial_delay")]
    pub analytics_initial_delay_secs: u64,

    #[serde(default = "default_agent_tick")]
    pub agent_tick_secs: u64,

    #[serde(default = "default_security_cleanup")]
    pub security_cleanup_secs: u64,

    #[serde(default = "default_log_scan_interval")]
    pub log_scan_interval_secs: u64,

    /// Scan the host auth log for failed logins (Linux only)
    #[serde(default = "default_scan_host_logs")]
    pub scan_host_logs: bool,

    #[serde(default)]
    pub metric_source: SourceKind,

    /// Comma-separated API names registered at startup
    #[serde(default = "default_tracked_apis")]
    pub tracked_apis: String,

    /// Synthetic API outcome period when running simulated
    #[serde(default = "default_simulation_interval")]
    pub simulation_interval_secs: u64,

    /// Maximum accepted message text length in characters
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,

    /// Take the client address from `X-Forwarded-For`; enable only behind a trusted proxy
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

fn default_port() -> u16 {
    3001
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_broadcast_interval() -> u64 {
    5
}

fn default_broadcast_initial_delay() -> u64 {
    1
}

fn default_analytics_interval() -> u64 {
    60
}

fn default_analytics_initial_delay() -> u64 {
    5
}

fn default_agent_tick() -> u64 {
    5
}

fn default_security_cleanup() -> u64 {
    300
}

fn default_log_scan_interval() -> u64 {
    30
}

fn default_scan_host_logs() -> bool {
    true
}

fn default_tracked_apis() -> String {
    "claude,gemini".to_string()
}

fn default_simulation_interval() -> u64 {
    10
}

fn default_max_message_len() -> usize {
    vigil_lib::broadcast::DEFAULT_MAX_MESSAGE_LEN
}

impl Default for VigilConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            broadcast_interval_secs: default_broadcast_interval(),
            broadcast_initial_delay_secs: default_broadcast_initial_delay(),
            analytics_interval_secs: default_analytics_interval(),
            analytics_initial_delay_secs: default_analytics_initial_delay(),
            agent_tick_secs: default_agent_tick(),
            security_cleanup_secs: default_security_cleanup(),
            log_scan_interval_secs: default_log_scan_interval(),
            scan_host_logs: default_scan_host_logs(),
            metric_source: SourceKind::default(),
            tracked_apis: default_tracked_apis(),
            simulation_interval_secs: default_simulation_interval(),
            max_message_len: default_max_message_len(),
            trust_forwarded_for: false,
        }
    }
}

impl VigilConfig {
    /// Load configuration from `vigil.toml` and `VIGIL_` environment variables
    ///
    /// Invalid configuration falls back to defaults.
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("vigil").required(false))
            .add_source(config::Environment::with_prefix("VIGIL"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_else(|e| {
            warn!(error = %e, "Invalid configuration, using defaults");
            VigilConfig::default()
        }))
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn tracked_api_names(&self) -> Vec<String> {
        self.tracked_apis
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn broadcast_interval(&self) -> Duration {
        secs(self.broadcast_interval_secs)
    }

    pub fn broadcast_initial_delay(&self) -> Duration {
        Duration::from_secs(self.broadcast_initial_delay_secs)
    }

    pub fn analytics_interval(&self) -> Duration {
        secs(self.analytics_interval_secs)
    }

    pub fn analytics_initial_delay(&self) -> Duration {
        Duration::from_secs(self.analytics_initial_delay_secs)
    }

    pub fn agent_tick(&self) -> Duration {
        secs(self.agent_tick_secs)
    }

    pub fn security_cleanup(&self) -> Duration {
        secs(self.security_cleanup_secs)
    }

    pub fn log_scan_interval(&self) -> Duration {
        secs(self.log_scan_interval_secs)
    }

    pub fn simulation_interval(&self) -> Duration {
        secs(self.simulation_interval_secs)
    }
}

// tokio intervals panic on a zero period
fn secs(value: u64) -> Duration {
    Duration::from_secs(value.max(1))
}
