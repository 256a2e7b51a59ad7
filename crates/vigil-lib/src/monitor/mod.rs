//! Category monitors
//!
//! Each monitor exclusively owns its state and exposes derived, copied views.
//! The analytics engine reads them only through [`CategoryProbe`].

pub mod agent;
pub mod api;
pub mod security;
pub mod system;

pub use agent::{AgentMetrics, AgentMonitor, AgentTick};
pub use api::{ApiMonitor, ApiSummary, ApiTrafficSimulator, GatewayStability};
pub use security::{AttackKind, EventKind, LogScanner, SecurityCleanup, SecurityMetrics, SecurityMonitor};
pub use system::{HostSource, MetricSource, SimulatedSource, SourceKind, SystemMetrics, SystemMonitor};

use crate::error::SourceError;
use crate::models::Category;
use serde::Serialize;
use std::sync::Arc;

/// Raw inputs to one category score
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "category", rename_all = "lowercase")]
pub enum CategoryReading {
    System {
        cpu_percent: f64,
        memory_percent: f64,
        disk_percent: f64,
    },
    Api {
        avg_latency_ms: f64,
        gateway: GatewayStability,
    },
    Agents {
        connections: usize,
        messages_per_minute: usize,
        stability_score: f64,
    },
    Security {
        threat_level: f64,
        intrusion_attempts: usize,
    },
}

impl CategoryReading {
    pub fn category(&self) -> Category {
        match self {
            CategoryReading::System { .. } => Category::System,
            CategoryReading::Api { .. } => Category::Api,
            CategoryReading::Agents { .. } => Category::Agents,
            CategoryReading::Security { .. } => Category::Security,
        }
    }
}

/// Read access to one category for snapshot capture
pub trait CategoryProbe: Send + Sync {
    fn category(&self) -> Category;

    fn read(&self) -> Result<CategoryReading, SourceError>;
}

impl CategoryProbe for SystemMonitor {
    fn category(&self) -> Category {
        Category::System
    }

    fn read(&self) -> Result<CategoryReading, SourceError> {
        let sample = self.sample();
        Ok(CategoryReading::System {
            cpu_percent: sample.cpu.load_percent,
            memory_percent: sample.memory.utilization_percent,
            disk_percent: sample.disk.utilization_percent,
        })
    }
}

impl CategoryProbe for ApiMonitor {
    fn category(&self) -> Category {
        Category::Api
    }

    fn read(&self) -> Result<CategoryReading, SourceError> {
        let summary = self.summary();
        Ok(CategoryReading::Api {
            avg_latency_ms: summary.combined.avg_latency_ms,
            gateway: summary.gateway_stability,
        })
    }
}

impl CategoryProbe for AgentMonitor {
    fn category(&self) -> Category {
        Category::Agents
    }

    fn read(&self) -> Result<CategoryReading, SourceError> {
        let metrics = self.metrics();
        Ok(CategoryReading::Agents {
            connections: metrics.connected,
            messages_per_minute: metrics.messages_per_minute,
            stability_score: metrics.stability_score,
        })
    }
}

impl CategoryProbe for SecurityMonitor {
    fn category(&self) -> Category {
        Category::Security
    }

    fn read(&self) -> Result<CategoryReading, SourceError> {
        let metrics = self.metrics();
        Ok(CategoryReading::Security {
            threat_level: metrics.threat.level,
            intrusion_attempts: metrics.intrusion_attempts,
        })
    }
}

/// The four monitors, shared between the analytics engine, the broadcaster
/// and the HTTP layer
#[derive(Clone)]
pub struct Monitors {
    pub system: Arc<SystemMonitor>,
    pub api: Arc<ApiMonitor>,
    pub agents: Arc<AgentMonitor>,
    pub security: Arc<SecurityMonitor>,
}

impl Monitors {
    /// Probes in capture order
    pub fn probes(&self) -> Vec<Arc<dyn CategoryProbe>> {
        vec![
            self.system.clone(),
            self.api.clone(),
            self.agents.clone(),
            self.security.clone(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn monitors() -> Monitors {
        let clock = Arc::new(ManualClock::default());
        Monitors {
            system: Arc::new(SystemMonitor::new(
                Arc::new(SimulatedSource::with_seed(7)),
                clock.clone(),
            )),
            api: Arc::new(ApiMonitor::new(clock.clone())),
            agents: Arc::new(AgentMonitor::new(clock.clone())),
            security: Arc::new(SecurityMonitor::new(clock)),
        }
    }

    #[test]
    fn test_probes_cover_every_category_once() {
        let probes = monitors().probes();
        let categories: Vec<Category> = probes.iter().map(|p| p.category()).collect();
        assert_eq!(categories, Category::ALL.to_vec());
    }

    #[test]
    fn test_reading_category_matches_probe() {
        for probe in monitors().probes() {
            let reading = probe.read().unwrap();
            assert_eq!(reading.category(), probe.category());
        }
    }
}
