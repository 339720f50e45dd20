// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/mandiwatch

//! Statistical primitives shared by every detector and analyzer.
//!
//! All functions are total: empty input, zero variance and zero denominators
//! map to documented sentinels instead of NaN or infinity.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

const EPSILON: f64 = 1e-12;

/// Direction of a series after applying a stability dead-band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesDirection {
    Increasing,
    Decreasing,
    Stable,
}

impl SeriesDirection {
    pub fn is_stable(self) -> bool {
        matches!(self, SeriesDirection::Stable)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SeriesDirection::Increasing => "increasing",
            SeriesDirection::Decreasing => "decreasing",
            SeriesDirection::Stable => "stable",
        }
    }
}

/// Ordinary least squares fit of value against index
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearTrend {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

/// Arithmetic mean, 0 for an empty series.
pub fn mean(series: &[f64]) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    series.iter().mean()
}

/// Sample standard deviation (n - 1), 0 below two points.
pub fn std_dev(series: &[f64]) -> f64 {
    if series.len() < 2 {
        return 0.0;
    }
    let sd = series.iter().std_dev();
    if sd.is_finite() {
        sd
    } else {
        0.0
    }
}

/// Sample variance (n - 1), 0 below two points.
pub fn variance(series: &[f64]) -> f64 {
    if series.len() < 2 {
        return 0.0;
    }
    let var = series.iter().variance();
    if var.is_finite() {
        var
    } else {
        0.0
    }
}

/// Causal trailing mean of the `window` points strictly before `index`.
///
/// Returns `None` when fewer than `window` prior points exist, which callers
/// treat as insufficient history for that index.
pub fn moving_average(series: &[f64], index: usize, window: usize) -> Option<f64> {
    if window == 0 || index < window || index > series.len() {
        return None;
    }
    Some(mean(&series[index - window..index]))
}

/// The trailing reference window for `index`, or `None` during warm-up.
pub fn trailing_window(series: &[f64], index: usize, window: usize) -> Option<&[f64]> {
    if window == 0 || index < window || index > series.len() {
        return None;
    }
    Some(&series[index - window..index])
}

/// (value - mean) / stddev of the reference; 0 when stddev is 0.
pub fn z_score(value: f64, reference: &[f64]) -> f64 {
    let sd = std_dev(reference);
    if sd <= EPSILON {
        return 0.0;
    }
    (value - mean(reference)) / sd
}

/// OLS slope and R² of value against index.
///
/// Degenerate inputs (fewer than two points, zero x or y variance) give a
/// flat fit with R² = 0.
pub fn linear_trend(series: &[f64]) -> LinearTrend {
    let n = series.len();
    if n < 2 {
        return LinearTrend {
            slope: 0.0,
            intercept: series.first().copied().unwrap_or(0.0),
            r_squared: 0.0,
        };
    }

    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = mean(series);

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (i, &y) in series.iter().enumerate() {
        let dx = i as f64 - x_mean;
        let dy = y - y_mean;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx <= EPSILON || syy <= EPSILON {
        return LinearTrend {
            slope: 0.0,
            intercept: y_mean,
            r_squared: 0.0,
        };
    }

    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;
    let r_squared = ((sxy * sxy) / (sxx * syy)).clamp(0.0, 1.0);

    LinearTrend {
        slope,
        intercept,
        r_squared,
    }
}

/// Pearson correlation of two paired series.
///
/// 0 for mismatched lengths, fewer than two pairs, or a constant series.
pub fn correlation(xs: &[f64], ys: &[f64]) -> f64 {
    if xs.len() != ys.len() || xs.len() < 2 {
        return 0.0;
    }
    let (sx, sy) = (std_dev(xs), std_dev(ys));
    if sx <= EPSILON || sy <= EPSILON {
        return 0.0;
    }
    let r = xs.iter().covariance(ys.iter()) / (sx * sy);
    finite_or(r, 0.0).clamp(-1.0, 1.0)
}

/// stddev / mean, 0 when the mean is not positive.
pub fn coefficient_of_variation(series: &[f64]) -> f64 {
    let m = mean(series);
    if m <= EPSILON {
        return 0.0;
    }
    std_dev(series) / m
}

/// Percentage move from `first` to `last`, 0 when `first` is not positive.
pub fn percent_change(first: f64, last: f64) -> f64 {
    if first <= EPSILON || !first.is_finite() || !last.is_finite() {
        return 0.0;
    }
    (last - first) / first * 100.0
}

/// Sign of the OLS slope with a stability band of `dead_band_fraction` × mean.
pub fn series_direction(series: &[f64], dead_band_fraction: f64) -> SeriesDirection {
    if series.len() < 2 {
        return SeriesDirection::Stable;
    }
    let slope = linear_trend(series).slope;
    let band = dead_band_fraction * mean(series).abs();

    if slope > band {
        SeriesDirection::Increasing
    } else if slope < -band {
        SeriesDirection::Decreasing
    } else {
        SeriesDirection::Stable
    }
}

/// `value` when finite, otherwise `fallback`.
pub fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Median, 0 for an empty series.
pub fn median(series: &[f64]) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    let mut sorted = series.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Minimum and maximum, `(0, 0)` for an empty series.
pub fn min_max(series: &[f64]) -> (f64, f64) {
    if series.is_empty() {
        return (0.0, 0.0);
    }
    series
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| (lo.min(x), hi.max(x)))
}

/// Exponential moving average seeded with the first value.
pub fn exponential_moving_average(series: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || series.len() < window {
        return Vec::new();
    }
    let alpha = 2.0 / (window as f64 + 1.0);
    let mut ema = Vec::with_capacity(series.len());
    ema.push(series[0]);
    for &x in &series[1..] {
        let prev = ema[ema.len() - 1];
        ema.push(alpha * x + (1.0 - alpha) * prev);
    }
    ema
}

/// Wilder-smoothed relative strength index of the final point.
///
/// Returns `None` until `window + 1` points exist. A window with no losses
/// reads 100.
pub fn relative_strength_index(series: &[f64], window: usize) -> Option<f64> {
    if window == 0 || series.len() < window + 1 {
        return None;
    }

    let changes: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();
    let mut avg_gain = changes[..window].iter().map(|c| c.max(0.0)).sum::<f64>() / window as f64;
    let mut avg_loss = changes[..window].iter().map(|c| (-c).max(0.0)).sum::<f64>() / window as f64;

    for &change in &changes[window..] {
        avg_gain = (avg_gain * (window as f64 - 1.0) + change.max(0.0)) / window as f64;
        avg_loss = (avg_loss * (window as f64 - 1.0) + (-change).max(0.0)) / window as f64;
    }

    if avg_loss <= EPSILON {
        return Some(100.0);
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}
