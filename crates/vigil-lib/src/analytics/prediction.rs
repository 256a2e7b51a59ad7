//! Linear trend projection per category
//!
//! An ordinary-least-squares slope over the trailing snapshots, extrapolated
//! 60 minutes ahead. This is a trend indicator, not a forecasting model.

use super::HealthSnapshot;
use crate::models::{Category, Level, Trend};
use crate::stats::{clamp_score, mean, ols_slope, round2, variance};
use serde::{Deserialize, Serialize};

/// Snapshots required before predictions are produced
pub const MIN_PREDICTION_SNAPSHOTS: usize = 30;
/// Trailing snapshots used for a prediction
pub const PREDICTION_WINDOW: usize = 30;
pub const HORIZON_MINUTES: f64 = 60.0;
/// Relative change across the window that counts as a trend
const TREND_THRESHOLD_PERCENT: f64 = 5.0;
const MIN_TREND_POINTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryPrediction {
    pub category: Category,
    pub trend: Trend,
    pub current: f64,
    pub slope_per_minute: f64,
    pub projected: f64,
    pub risk: Level,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionSet {
    pub timestamp_ms: i64,
    pub horizon_minutes: f64,
    pub categories: Vec<CategoryPrediction>,
    pub confidence: Level,
}

/// `(minutes since first point, score)` for one category
fn series(snapshots: &[HealthSnapshot], category: Category) -> Vec<(f64, f64)> {
    let Some(first) = snapshots.first() else {
        return Vec::new();
    };
    snapshots
        .iter()
        .filter_map(|s| {
            let score = s.scores.get(&category)?;
            let minutes = (s.timestamp_ms - first.timestamp_ms) as f64 / 60_000.0;
            Some((minutes, *score))
        })
        .collect()
}

/// Trend label from the OLS slope relative to the window mean
pub fn trend_of(points: &[(f64, f64)]) -> Trend {
    if points.len() < MIN_TREND_POINTS {
        return Trend::InsufficientData;
    }
    let values: Vec<f64> = points.iter().map(|(_, y)| *y).collect();
    let avg = mean(&values).unwrap_or(0.0);
    let span = points[points.len() - 1].0 - points[0].0;
    if avg <= 0.0 || span <= 0.0 {
        return Trend::Stable;
    }

    let change_percent = ols_slope(points) * span / avg * 100.0;
    if change_percent > TREND_THRESHOLD_PERCENT {
        Trend::Improving
    } else if change_percent < -TREND_THRESHOLD_PERCENT {
        Trend::Degrading
    } else {
        Trend::Stable
    }
}

pub fn risk(trend: Trend, current: f64) -> Level {
    match trend {
        Trend::Degrading if current < 50.0 => Level::High,
        Trend::Degrading if current < 70.0 => Level::Medium,
        Trend::Stable if current < 40.0 => Level::Medium,
        _ => Level::Low,
    }
}

/// Lower variance of overall scores means higher confidence
pub fn confidence(overall: &[f64]) -> Level {
    let v = variance(overall);
    if v < 10.0 {
        Level::High
    } else if v < 25.0 {
        Level::Medium
    } else {
        Level::Low
    }
}

/// Per-category trend labels over `snapshots`
pub fn trends(snapshots: &[HealthSnapshot]) -> Vec<(Category, Trend)> {
    Category::ALL
        .iter()
        .map(|c| (*c, trend_of(&series(snapshots, *c))))
        .collect()
}

/// Project every category from the trailing window of `history`
///
/// Returns `None` until enough snapshots exist.
pub fn predict(history: &[HealthSnapshot], now_ms: i64) -> Option<PredictionSet> {
    if history.len() < MIN_PREDICTION_SNAPSHOTS {
        return None;
    }
    let window = &history[history.len() - PREDICTION_WINDOW..];

    let categories = Category::ALL
        .iter()
        .filter_map(|category| {
            let points = series(window, *category);
            let &(_, current) = points.last()?;
            let trend = trend_of(&points);
            let slope = ols_slope(&points);

            Some(CategoryPrediction {
                category: *category,
                trend,
                current: round2(current),
                slope_per_minute: slope,
                projected: round2(clamp_score(current + slope * HORIZON_MINUTES)),
                risk: risk(trend, current),
            })
        })
        .collect();

    let overall: Vec<f64> = window.iter().map(|s| s.overall).collect();

    Some(PredictionSet {
        timestamp_ms: now_ms,
        horizon_minutes: HORIZON_MINUTES,
        categories,
        confidence: confidence(&overall),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::tests::scored_snapshot;

    fn line(n: usize, start: f64, step: f64) -> Vec<HealthSnapshot> {
        (0..n)
            .map(|i| scored_snapshot(i as i64 * 60_000, start + step * i as f64))
            .collect()
    }

    #[test]
    fn test_trend_labels() {
        let up: Vec<(f64, f64)> = (0..10).map(|i| (i as f64, 50.0 + i as f64)).collect();
        let down: Vec<(f64, f64)> = (0..10).map(|i| (i as f64, 90.0 - 2.0 * i as f64)).collect();
        let flat: Vec<(f64, f64)> = (0..10).map(|i| (i as f64, 80.0)).collect();

        assert_eq!(trend_of(&up), Trend::Improving);
        assert_eq!(trend_of(&down), Trend::Degrading);
        assert_eq!(trend_of(&flat), Trend::Stable);
        assert_eq!(trend_of(&up[..3]), Trend::InsufficientData);
    }

    #[test]
    fn test_no_prediction_below_minimum() {
        assert!(predict(&line(MIN_PREDICTION_SNAPSHOTS - 1, 80.0, 0.0), 0).is_none());
    }

    #[test]
    fn test_projection_extrapolates_and_clamps() {
        let rising = line(40, 40.0, 1.0);
        let set = predict(&rising, 0).unwrap();
        let system = &set.categories[0];
        assert_eq!(system.category, Category::System);
        assert_eq!(system.trend, Trend::Improving);
        assert!((system.slope_per_minute - 1.0).abs() < 1e-9);
        assert_eq!(system.current, 79.0);
        assert_eq!(system.projected, 100.0);

        let falling = line(40, 90.0, -1.0);
        let set = predict(&falling, 0).unwrap();
        let system = &set.categories[0];
        assert_eq!(system.trend, Trend::Degrading);
        assert_eq!(system.current, 51.0);
        assert_eq!(system.projected, 0.0);
        assert_eq!(system.risk, Level::Medium);
    }

    #[test]
    fn test_risk_table() {
        assert_eq!(risk(Trend::Degrading, 45.0), Level::High);
        assert_eq!(risk(Trend::Degrading, 65.0), Level::Medium);
        assert_eq!(risk(Trend::Degrading, 85.0), Level::Low);
        assert_eq!(risk(Trend::Stable, 35.0), Level::Medium);
        assert_eq!(risk(Trend::Improving, 10.0), Level::Low);
    }

    #[test]
    fn test_confidence_from_variance() {
        assert_eq!(confidence(&[80.0; 30]), Level::High);
        assert_eq!(confidence(&[70.0, 78.0, 70.0, 78.0]), Level::Medium);
        assert_eq!(confidence(&[20.0, 90.0, 20.0, 90.0]), Level::Low);
    }
}
