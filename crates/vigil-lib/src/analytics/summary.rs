//! Analytics summary view

use super::anomaly::Anomaly;
use super::prediction::PredictionSet;
use crate::models::{Category, Level, Trend};
use crate::stats::{clamp_score, round2, variance};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Score reported for every category before the first capture
pub const NEUTRAL_SCORE: f64 = 50.0;
/// Categories scoring below this get a recommendation
const RECOMMENDATION_THRESHOLD: f64 = 70.0;
/// Snapshots needed for trend labels and the stability index
pub const MIN_TREND_SNAPSHOTS: usize = 10;
const FREQUENT_ANOMALIES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentHealth {
    /// Capture time of the snapshot, absent before the first capture
    pub timestamp_ms: Option<i64>,
    pub scores: BTreeMap<Category, f64>,
    pub overall: f64,
    pub missing: Vec<Category>,
}

impl CurrentHealth {
    pub fn neutral() -> Self {
        Self {
            timestamp_ms: None,
            scores: Category::ALL.iter().map(|c| (*c, NEUTRAL_SCORE)).collect(),
            overall: NEUTRAL_SCORE,
            missing: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub category: Category,
    pub priority: Level,
    pub score: f64,
    pub recommendation: String,
    pub action: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyPattern {
    Normal,
    FrequentDisturbances,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub timestamp_ms: i64,
    pub snapshot_count: usize,
    pub current: CurrentHealth,
    pub trends: BTreeMap<Category, Trend>,
    pub predictions: Option<PredictionSet>,
    pub anomalies: Vec<Anomaly>,
    pub anomaly_pattern: AnomalyPattern,
    pub disturbance_frequency: usize,
    /// 100 minus the variance of the current category scores
    pub harmony_index: f64,
    /// 100 minus twice the variance of the last ten overall scores
    pub stability_index: f64,
    pub enhancement_potential: f64,
    pub recommendations: Vec<Recommendation>,
}

pub fn harmony_index(scores: &BTreeMap<Category, f64>) -> f64 {
    let values: Vec<f64> = scores.values().copied().collect();
    round2(clamp_score(100.0 - variance(&values)))
}

/// Neutral 50 until enough snapshots exist
pub fn stability_index(recent_overall: &[f64]) -> f64 {
    if recent_overall.len() < MIN_TREND_SNAPSHOTS {
        return NEUTRAL_SCORE;
    }
    let tail = &recent_overall[recent_overall.len() - MIN_TREND_SNAPSHOTS..];
    round2(clamp_score(100.0 - variance(tail) * 2.0))
}

pub fn anomaly_pattern(count: usize) -> AnomalyPattern {
    if count > FREQUENT_ANOMALIES {
        AnomalyPattern::FrequentDisturbances
    } else {
        AnomalyPattern::Normal
    }
}

pub fn recommendations(scores: &BTreeMap<Category, f64>) -> Vec<Recommendation> {
    scores
        .iter()
        .filter(|(_, score)| **score < RECOMMENDATION_THRESHOLD)
        .map(|(category, score)| {
            let (priority, recommendation, action) = match category {
                Category::System => (
                    Level::High,
                    "Reduce host resource pressure",
                    "Lower the number of active processes or add CPU, memory or disk capacity",
                ),
                Category::Api => (
                    Level::Medium,
                    "Improve external API stability",
                    "Cache API responses and reuse pooled connections",
                ),
                Category::Agents => (
                    Level::Medium,
                    "Strengthen real-time client connections",
                    "Monitor client heartbeats and enable automatic reconnection",
                ),
                Category::Security => (
                    Level::High,
                    "Investigate recent security events",
                    "Review flagged IPs and tighten request filtering",
                ),
            };
            Recommendation {
                category: *category,
                priority,
                score: round2(*score),
                recommendation: recommendation.to_string(),
                action: action.to_string(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harmony_of_equal_scores_is_full() {
        let scores: BTreeMap<Category, f64> = Category::ALL.iter().map(|c| (*c, 73.0)).collect();
        assert_eq!(harmony_index(&scores), 100.0);
    }

    #[test]
    fn test_harmony_clamped_at_zero() {
        let mut scores = BTreeMap::new();
        scores.insert(Category::System, 100.0);
        scores.insert(Category::Security, 0.0);
        assert_eq!(harmony_index(&scores), 0.0);
    }

    #[test]
    fn test_stability_index() {
        assert_eq!(stability_index(&[80.0; 5]), NEUTRAL_SCORE);
        assert_eq!(stability_index(&[80.0; 12]), 100.0);

        let alternating: Vec<f64> = (0..10).map(|i| if i % 2 == 0 { 78.0 } else { 82.0 }).collect();
        assert_eq!(stability_index(&alternating), 92.0);
    }

    #[test]
    fn test_recommendations_below_seventy() {
        let mut scores = BTreeMap::new();
        scores.insert(Category::System, 65.0);
        scores.insert(Category::Api, 90.0);
        scores.insert(Category::Security, 10.0);

        let recs = recommendations(&scores);
        let categories: Vec<Category> = recs.iter().map(|r| r.category).collect();
        assert_eq!(categories, vec![Category::System, Category::Security]);
        assert!(recs.iter().all(|r| r.priority == Level::High));
    }

    #[test]
    fn test_anomaly_pattern() {
        assert_eq!(anomaly_pattern(5), AnomalyPattern::Normal);
        assert_eq!(anomaly_pattern(6), AnomalyPattern::FrequentDisturbances);
    }
}
