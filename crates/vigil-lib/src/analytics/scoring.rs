//! Category health scores
//!
//! Every score starts at 100 and loses fixed penalties as its inputs cross
//! thresholds; the result is clamped to [0, 100].

use crate::models::Category;
use crate::monitor::{CategoryReading, GatewayStability};
use crate::stats::clamp_score;
use std::collections::BTreeMap;

pub fn score(reading: &CategoryReading) -> f64 {
    match *reading {
        CategoryReading::System {
            cpu_percent,
            memory_percent,
            disk_percent,
        } => system_score(cpu_percent, memory_percent, disk_percent),
        CategoryReading::Api {
            avg_latency_ms,
            gateway,
        } => api_score(avg_latency_ms, gateway),
        CategoryReading::Agents {
            connections,
            messages_per_minute,
            stability_score,
        } => agents_score(connections, messages_per_minute, stability_score),
        CategoryReading::Security {
            threat_level,
            intrusion_attempts,
        } => security_score(threat_level, intrusion_attempts),
    }
}

fn system_score(cpu: f64, memory: f64, disk: f64) -> f64 {
    let mut score = 100.0;

    if cpu > 90.0 {
        score -= 30.0;
    } else if cpu > 70.0 {
        score -= 15.0;
    }

    if memory > 95.0 {
        score -= 30.0;
    } else if memory > 80.0 {
        score -= 15.0;
    }

    if disk > 95.0 {
        score -= 25.0;
    } else if disk > 85.0 {
        score -= 10.0;
    }

    clamp_score(score)
}

fn api_score(latency_ms: f64, gateway: GatewayStability) -> f64 {
    let mut score = 100.0;

    if latency_ms > 10_000.0 {
        score -= 40.0;
    } else if latency_ms > 5_000.0 {
        score -= 20.0;
    }

    score -= match gateway {
        GatewayStability::Excellent => 0.0,
        GatewayStability::Stable => 5.0,
        GatewayStability::Fluctuating => 15.0,
        GatewayStability::Turbulent => 30.0,
        GatewayStability::Chaotic => 50.0,
    };

    clamp_score(score)
}

fn agents_score(connections: usize, messages_per_minute: usize, stability: f64) -> f64 {
    let mut score = 100.0;

    if connections == 0 {
        score -= 50.0;
    } else if connections < 2 {
        score -= 20.0;
    }

    if messages_per_minute == 0 {
        score -= 30.0;
    } else if messages_per_minute < 5 {
        score -= 15.0;
    }

    if stability < 50.0 {
        score -= 20.0;
    } else if stability < 70.0 {
        score -= 10.0;
    }

    clamp_score(score)
}

fn security_score(threat_level: f64, intrusion_attempts: usize) -> f64 {
    let mut score = 100.0;

    if threat_level > 60.0 {
        score -= 40.0;
    } else if threat_level > 30.0 {
        score -= 20.0;
    }

    if intrusion_attempts > 50 {
        score -= 30.0;
    } else if intrusion_attempts > 20 {
        score -= 15.0;
    }

    clamp_score(score)
}

/// Weighted overall score, re-normalized over the categories present
///
/// Returns `None` when no category is present.
pub fn overall(scores: &BTreeMap<Category, f64>) -> Option<f64> {
    let total_weight: f64 = scores.keys().map(|c| c.weight()).sum();
    if scores.is_empty() || total_weight <= 0.0 {
        return None;
    }
    let weighted: f64 = scores.iter().map(|(c, s)| c.weight() * s).sum();
    Some(clamp_score(weighted / total_weight))
}
