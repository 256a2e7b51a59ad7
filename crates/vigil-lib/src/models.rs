//! Shared vocabulary for the metrics pipeline

use serde::{Deserialize, Serialize};
use std::fmt;

/// Metric category scored by the analytics engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    System,
    Api,
    Agents,
    Security,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::System,
        Category::Api,
        Category::Agents,
        Category::Security,
    ];

    /// Fixed weight of this category in the overall score; weights sum to 1.0
    pub fn weight(&self) -> f64 {
        match self {
            Category::System => 0.30,
            Category::Api => 0.25,
            Category::Agents => 0.25,
            Category::Security => 0.20,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::System => "system",
            Category::Api => "api",
            Category::Agents => "agents",
            Category::Security => "security",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event / anomaly severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Weight used when summing recent events into a threat score
    pub fn threat_weight(&self) -> u32 {
        match self {
            Severity::Critical => 20,
            Severity::High => 10,
            Severity::Medium => 5,
            Severity::Low => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// Direction of a metric over a trailing window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Stable,
    Degrading,
    InsufficientData,
}

/// Coarse three-level rating used for risk and confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Low,
    Medium,
    High,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_weights_sum_to_one() {
        let total: f64 = Category::ALL.iter().map(|c| c.weight()).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_severity_serialization() {
        let json = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(json, "\"CRITICAL\"");
        assert_eq!(Severity::High.threat_weight(), 10);
    }

    #[test]
    fn test_trend_serialization() {
        let json = serde_json::to_string(&Trend::InsufficientData).unwrap();
        assert_eq!(json, "\"insufficient_data\"");
    }
}
