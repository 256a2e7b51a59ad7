//! Metrics aggregation and broadcast pipeline for the Vigil dashboard
//!
//! This crate provides the core functionality for:
//! - Host, external API, connected client and security monitors
//! - Health analytics with anomaly detection and trend projection
//! - Periodic task scheduling
//! - Publish/subscribe broadcast of the composite state
//! - Health checks and observability

pub mod analytics;
pub mod broadcast;
pub mod clock;
pub mod error;
pub mod health;
pub mod models;
pub mod monitor;
pub mod observability;
pub mod scheduler;
pub mod stats;
pub mod window;

pub use analytics::{AnalyticsTask, HealthAnalytics, HealthSnapshot};
pub use broadcast::{BroadcastHub, Broadcaster};
pub use clock::{system_clock, Clock, ManualClock, SharedClock, SystemClock};
pub use error::{CaptureError, InputError, SourceError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use monitor::Monitors;
pub use observability::{DashboardMetrics, StructuredLogger};
pub use scheduler::{PeriodicTask, Schedule, Scheduler};
