//! Small numeric helpers shared by the monitors and the analytics engine

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population variance, 0 for fewer than one value
pub fn variance(values: &[f64]) -> f64 {
    let Some(mean) = mean(values) else {
        return 0.0;
    };
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Coefficient of variation (std dev / mean); 0 when the mean is zero
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    match mean(values) {
        Some(mean) if mean.abs() > f64::EPSILON => std_dev(values) / mean,
        _ => 0.0,
    }
}

/// Ordinary least squares slope of `y` over `x`
///
/// `x` values are normalized to the first point to keep precision with
/// large timestamps. Returns 0 for fewer than two points or a degenerate fit.
pub fn ols_slope(points: &[(f64, f64)]) -> f64 {
    let n = points.len() as f64;
    if n < 2.0 {
        return 0.0;
    }

    let x0 = points[0].0;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xy = 0.0;
    let mut sum_xx = 0.0;

    for (x, y) in points {
        let x = x - x0;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_xx += x * x;
    }

    let denominator = n * sum_xx - sum_x * sum_x;
    if denominator.abs() < f64::EPSILON {
        return 0.0;
    }

    (n * sum_xy - sum_x * sum_y) / denominator
}

/// Clamp a score into [0, 100]; NaN maps to 0
pub fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// Round to two decimal places for presentation
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
