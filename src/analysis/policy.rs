// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/mandiwatch

//! Fixed domain policy constants.
//!
//! These are not runtime configuration. Anything tunable lives in
//! [`crate::config::AnomalyDetectionConfig`].

/// Share of total supply held back for local consumption
pub const RESERVE_FRACTION: f64 = 0.25;

/// Share of estimated demand assumed to be actual consumption
pub const CONSUMPTION_FRACTION: f64 = 0.8;

/// Daily traded quantity is projected over this many days to estimate demand
pub const DEMAND_PROJECTION_DAYS: f64 = 30.0;

/// Consumption samples older than this (relative to the analysis time) are ignored
pub const CONSUMPTION_LOOKBACK_DAYS: i64 = 30;

/// Supply/demand ratio cut-points
pub const SURPLUS_RATIO: f64 = 1.5;
pub const BALANCED_RATIO: f64 = 0.9;
pub const DEFICIT_RATIO: f64 = 0.6;

/// Balance score anchors at the ratio cut-points
pub const SURPLUS_SCORE_FLOOR: f64 = 0.25;
pub const BALANCED_SCORE_FLOOR: f64 = -0.2;
pub const DEFICIT_SCORE_FLOOR: f64 = -0.5;
/// Ratio units above `SURPLUS_RATIO` per unit of score
pub const SURPLUS_SCORE_SPAN: f64 = 2.0;

/// Price pressure: percent move over the recent window
pub const PRESSURE_PRICE_MOVE_PCT: f64 = 5.0;
pub const PRESSURE_WINDOW: usize = 5;
pub const PRESSURE_UPWARD_RATIO: f64 = 0.8;
pub const PRESSURE_DOWNWARD_RATIO: f64 = 1.3;

/// Volatility risk buckets on CoV / stability factor
pub const VOLATILITY_RISK_MEDIUM: f64 = 0.15;
pub const VOLATILITY_RISK_HIGH: f64 = 0.30;
/// Below this many prices the risk is reported as medium
pub const VOLATILITY_RISK_MIN_PRICES: usize = 5;
pub const STABLE_TREND_STABILITY: f64 = 1.0;
pub const MOVING_TREND_STABILITY: f64 = 0.5;

/// Supply and demand trends use the most recent points only
pub const TREND_LOOKBACK_POINTS: usize = 7;
/// Slope band, as a fraction of the mean, inside which a series is stable
pub const TREND_DEAD_BAND_FRACTION: f64 = 0.05;

/// Balance confidence weights
pub const BALANCE_VOLUME_WEIGHT: f64 = 0.6;
pub const BALANCE_FRESHNESS_WEIGHT: f64 = 0.4;
pub const BALANCE_FULL_VOLUME: f64 = 50.0;
pub const BALANCE_STALE_HOURS: f64 = 48.0;
pub const BALANCE_MIN_FRESHNESS: f64 = 0.1;
/// Freshness reported when no sample carries a timestamp
pub const DEFAULT_FRESHNESS_HOURS: f64 = 24.0;
/// Confidence of the degraded balance record
pub const DEGRADED_CONFIDENCE: f64 = 0.1;

/// Default price spike severity cut-points (percent deviation)
pub const PRICE_SPIKE_THRESHOLD_PCT: f64 = 25.0;
pub const PRICE_HIGH_PCT: f64 = 35.0;
pub const PRICE_CRITICAL_PCT: f64 = 50.0;

/// Default inventory severity cut-points (percent deviation)
pub const INVENTORY_THRESHOLD_PCT: f64 = 30.0;
pub const INVENTORY_HIGH_PCT: f64 = 50.0;
pub const INVENTORY_CRITICAL_PCT: f64 = 75.0;

/// Storage utilisation above which stockpiling is suspected
pub const STORAGE_PRESSURE_UTILISATION: f64 = 0.9;

/// Coordinated stockpiling: locations, samples per location, and the
/// rate spread (sd / mean) under which rates count as synchronized
pub const COORDINATION_MIN_LOCATIONS: usize = 3;
pub const COORDINATION_MIN_SAMPLES: usize = 3;
pub const COORDINATION_RATE_SPREAD: f64 = 0.3;
/// Locations and units/day at which those confidence terms saturate
pub const COORDINATION_FULL_LOCATIONS: f64 = 5.0;
pub const COORDINATION_FULL_RATE: f64 = 10.0;

/// Cross-regional patterns need this many samples per state and this
/// day-aligned inventory/price correlation
pub const CROSS_REGIONAL_MIN_SAMPLES: usize = 3;
pub const CROSS_REGIONAL_CORRELATION: f64 = 0.6;

/// Seasonal-unusual accumulation against the same calendar month
pub const SEASONAL_RECENT_DAYS: i64 = 30;
pub const SEASONAL_MIN_HISTORY: usize = 3;
pub const SEASONAL_UNUSUAL_PCT: f64 = 40.0;
pub const SEASONAL_HIGH_PCT: f64 = 60.0;
pub const SEASONAL_CRITICAL_PCT: f64 = 80.0;

/// Trend classification thresholds (percent change over the period)
pub const SIDEWAYS_CHANGE_PCT: f64 = 2.0;
pub const DIRECTIONAL_CHANGE_PCT: f64 = 5.0;
/// CoV (fraction) above which an undirected market is volatile
pub const VOLATILE_COV: f64 = 0.15;

/// Volatility level cut-points on CoV percent
pub const VOLATILITY_LOW_PCT: f64 = 5.0;
pub const VOLATILITY_MEDIUM_PCT: f64 = 15.0;
pub const VOLATILITY_HIGH_PCT: f64 = 25.0;
/// CoV percent mapped to a volatility score of 1
pub const VOLATILITY_SCORE_SATURATION_PCT: f64 = 30.0;

/// Minimum samples for trend analysis and prediction
pub const MIN_TREND_SAMPLES: usize = 5;
/// Local extrema kept for support and resistance
pub const SUPPORT_RESISTANCE_EXTREMA: usize = 5;

/// Prediction bounds relative to the observed period range
pub const PREDICTION_FLOOR_FACTOR: f64 = 0.8;
pub const PREDICTION_CEILING_FACTOR: f64 = 1.2;

/// z-value of the two-sided 95% normal interval
pub const CONFIDENCE_INTERVAL_Z: f64 = 1.96;
/// Samples used for the prediction interval
pub const CONFIDENCE_INTERVAL_SAMPLES: usize = 30;

/// Confidence score ranges
pub const TREND_CONFIDENCE_RANGE: (f64, f64) = (0.1, 1.0);
pub const PREDICTION_CONFIDENCE_RANGE: (f64, f64) = (0.1, 0.9);
pub const CONTINUATION_PROBABILITY_RANGE: (f64, f64) = (0.1, 0.9);

/// Market volatility indicator cut-points on the volatility score
pub const INDICATOR_LOW_SCORE: f64 = 0.2;
pub const INDICATOR_MEDIUM_SCORE: f64 = 0.5;
pub const INDICATOR_HIGH_SCORE: f64 = 0.8;
/// CoV percent mapped to an indicator score of 1
pub const INDICATOR_SCORE_SATURATION_PCT: f64 = 50.0;

/// RSI momentum bands
pub const RSI_WINDOW: usize = 14;
pub const RSI_OVERBOUGHT: f64 = 70.0;
pub const RSI_OVERSOLD: f64 = 30.0;

/// |last - EMA| percent reported as a momentum factor
pub const EMA_MOMENTUM_PCT: f64 = 5.0;

/// Clamp a confidence-like score into `range`, mapping NaN to the floor.
pub fn clamp_score(value: f64, range: (f64, f64)) -> f64 {
    if value.is_nan() {
        return range.0;
    }
    value.clamp(range.0, range.1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_cut_points_are_ordered() {
        assert!(SURPLUS_RATIO > BALANCED_RATIO);
        assert!(BALANCED_RATIO > DEFICIT_RATIO);
        assert!(DEFICIT_RATIO > 0.0);
        assert!(PRESSURE_UPWARD_RATIO < PRESSURE_DOWNWARD_RATIO);
    }

    #[test]
    fn test_fixed_policy_values() {
        assert_eq!(RESERVE_FRACTION, 0.25);
        assert_eq!(CONSUMPTION_FRACTION, 0.8);
        assert_eq!(CONFIDENCE_INTERVAL_Z, 1.96);
        assert_eq!(DEMAND_PROJECTION_DAYS, 30.0);
    }

    #[test]
    fn test_severity_bands_are_monotone() {
        assert!(PRICE_SPIKE_THRESHOLD_PCT < PRICE_HIGH_PCT);
        assert!(PRICE_HIGH_PCT < PRICE_CRITICAL_PCT);
        assert!(INVENTORY_THRESHOLD_PCT < INVENTORY_HIGH_PCT);
        assert!(INVENTORY_HIGH_PCT < INVENTORY_CRITICAL_PCT);
    }

    #[test]
    fn test_clamp_score() {
        assert_eq!(clamp_score(f64::NAN, TREND_CONFIDENCE_RANGE), 0.1);
        assert_eq!(clamp_score(1.4, PREDICTION_CONFIDENCE_RANGE), 0.9);
        assert_eq!(clamp_score(-3.0, CONTINUATION_PROBABILITY_RANGE), 0.1);
        assert_eq!(clamp_score(0.5, TREND_CONFIDENCE_RANGE), 0.5);
    }
}
