//! Construction and task wiring of the metrics pipeline

use crate::config::VigilConfig;
use std::sync::Arc;
use vigil_lib::{
    analytics::{AnalyticsTask, HealthAnalytics},
    broadcast::{BroadcastHub, Broadcaster},
    clock::SharedClock,
    health::HealthRegistry,
    monitor::{
        AgentMonitor, AgentTick, ApiMonitor, ApiTrafficSimulator, LogScanner, Monitors,
        SecurityCleanup, SecurityMonitor, SourceKind, SystemMonitor,
    },
    observability::StructuredLogger,
    scheduler::{Schedule, Scheduler},
};

/// Every long-lived component of the server
#[derive(Clone)]
pub struct Pipeline {
    pub monitors: Monitors,
    pub analytics: Arc<HealthAnalytics>,
    pub hub: Arc<BroadcastHub>,
    pub health: HealthRegistry,
}

impl Pipeline {
    pub fn build(config: &VigilConfig, clock: SharedClock, logger: &StructuredLogger) -> Self {
        let monitors = Monitors {
            system: Arc::new(SystemMonitor::new(config.metric_source.build(), clock.clone())),
            api: Arc::new(
                ApiMonitor::new(clock.clone()).with_tracked(config.tracked_api_names()),
            ),
            agents: Arc::new(AgentMonitor::new(clock.clone()).with_logger(logger.clone())),
            security: Arc::new(
                SecurityMonitor::new(clock.clone())
                    .with_logger(logger.clone())
                    .with_log_scanning(config.scan_host_logs),
            ),
        };

        let analytics = Arc::new(
            HealthAnalytics::new(monitors.probes(), clock.clone()).with_logger(logger.clone()),
        );
        let hub = Arc::new(
            BroadcastHub::new(monitors.clone(), analytics.clone(), clock)
                .with_max_message_len(config.max_message_len),
        );

        Self {
            monitors,
            analytics,
            hub,
            health: HealthRegistry::new(),
        }
    }

    /// Start every periodic task
    pub fn spawn_tasks(&self, config: &VigilConfig) -> Scheduler {
        let mut scheduler = Scheduler::new();

        scheduler.spawn(
            AnalyticsTask::new(self.analytics.clone(), self.health.clone()),
            Schedule::every(config.analytics_interval()).after(config.analytics_initial_delay()),
        );
        scheduler.spawn(
            Broadcaster::new(self.hub.clone(), self.health.clone()),
            Schedule::every(config.broadcast_interval()).after(config.broadcast_initial_delay()),
        );
        scheduler.spawn(
            AgentTick::new(self.monitors.agents.clone()),
            Schedule::every(config.agent_tick()),
        );
        scheduler.spawn(
            SecurityCleanup::new(self.monitors.security.clone()),
            Schedule::every(config.security_cleanup()).after(config.security_cleanup()),
        );

        if config.scan_host_logs && cfg!(target_os = "linux") {
            scheduler.spawn(
                LogScanner::new(self.monitors.security.clone()),
                Schedule::every(config.log_scan_interval()),
            );
        }

        if config.metric_source == SourceKind::Simulated {
            scheduler.spawn(
                ApiTrafficSimulator::new(self.monitors.api.clone()),
                Schedule::every(config.simulation_interval()),
            );
        }

        scheduler
    }
}
