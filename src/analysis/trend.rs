// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/mandiwatch

//! Price trend classification, short-horizon prediction and volatility

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::policy::*;
use super::seasonal::{SeasonalAnalyzer, SeasonalPattern};
use super::statistics::{
    coefficient_of_variation, exponential_moving_average, finite_or, linear_trend, mean, median,
    min_max, percent_change, relative_strength_index, std_dev, variance, SeriesDirection,
};
use crate::config::TrendConfig;
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::market::{CommodityScoped, PriceSample};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Bullish,
    Bearish,
    Sideways,
    Volatile,   // No direction, wide swings
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityLevel {
    Low,
    Medium,
    High,
    Extreme,
}

/// Trend summary over an analysis period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub commodity: String,
    pub region: Option<String>,
    pub analysis_period_days: u32,
    pub trend_direction: TrendDirection,
    pub trend_strength: f64,
    pub price_change_percent: f64,
    pub volatility_level: VolatilityLevel,
    pub volatility_score: f64,
    pub current_price: f64,
    pub average_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub support_level: f64,
    pub resistance_level: f64,
    pub rsi: Option<f64>,
    pub sample_count: usize,
    pub confidence_score: f64,
    pub key_factors: Vec<String>,
    /// Timestamp of the latest observation used
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
    pub confidence_interval: f64,
}

/// Price forecast for a fixed horizon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePrediction {
    pub commodity: String,
    pub region: Option<String>,
    pub horizon_days: u32,
    pub predicted_price: f64,
    pub price_range: PriceRange,
    pub confidence_score: f64,
    pub trend_continuation_probability: f64,
    pub seasonal_pattern: SeasonalPattern,
    pub key_drivers: Vec<String>,
    pub risk_factors: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Market volatility over a measurement period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketVolatilityIndicator {
    pub commodity: String,
    pub region: Option<String>,
    pub volatility_score: f64,
    pub volatility_level: VolatilityLevel,
    pub price_variance: f64,
    /// Percent
    pub coefficient_of_variation: f64,
    pub max_daily_change_percent: f64,
    pub volatility_trend: SeriesDirection,
    pub measurement_period_days: u32,
    pub timestamp: DateTime<Utc>,
}

/// Prices in scope for one analysis, oldest first
struct PriceWindow {
    prices: Vec<f64>,
    first: DateTime<Utc>,
    last: DateTime<Utc>,
}

impl PriceWindow {
    fn span_days(&self) -> f64 {
        (self.last - self.first).num_seconds() as f64 / 86_400.0
    }

    /// Prices divided by the largest one, plus that divisor.
    ///
    /// Shape statistics run on the unit series so sums of squares stay finite
    /// for any finite input; price-valued results are scaled back.
    fn normalized(&self) -> (Vec<f64>, f64) {
        let scale = self.prices.iter().fold(0.0_f64, |acc, p| acc.max(p.abs()));
        if scale <= 0.0 || !scale.is_finite() {
            return (self.prices.clone(), 1.0);
        }
        (self.prices.iter().map(|p| p / scale).collect(), scale)
    }
}

/// Trend, prediction and volatility analyzer
pub struct PriceTrendAnalyzer {
    config: TrendConfig,
    seasonal: SeasonalAnalyzer,
}

impl PriceTrendAnalyzer {
    pub fn new(config: TrendConfig) -> Self {
        Self {
            config,
            seasonal: SeasonalAnalyzer::new(),
        }
    }

    pub fn config(&self) -> &TrendConfig {
        &self.config
    }

    /// Classify the price trend over the `period_days` ending at the latest sample.
    pub fn analyze_trend(
        &self,
        commodity: &str,
        region: Option<&str>,
        samples: &[PriceSample],
        period_days: u32,
    ) -> AnalyticsResult<TrendAnalysis> {
        let window = self.collect_window(commodity, region, samples, period_days)?;
        let prices = &window.prices;
        let (unit, scale) = window.normalized();

        let fit = linear_trend(&unit);
        let current_price = prices[prices.len() - 1];
        let price_change_percent = percent_change(unit[0], unit[unit.len() - 1]);
        let cov = coefficient_of_variation(&unit);

        let trend_direction = classify_trend(fit.slope, price_change_percent, cov);
        let (volatility_level, volatility_score) = volatility_bucket(cov * 100.0);
        let (support, resistance) = support_resistance(&unit, self.config.support_resistance_window);
        let (min_price, max_price) = min_max(prices);
        let average_price = finite_or(mean(&unit) * scale, current_price);
        let rsi = relative_strength_index(&unit, RSI_WINDOW);
        let ema_gap = ema_gap_percent(&unit, self.config.ema_window);

        let n = prices.len() as f64;
        let confidence_score = clamp_score(
            0.4 * (n / 50.0).min(1.0)
                + 0.3 * (period_days as f64 / 30.0).min(1.0)
                + 0.3 * (1.0 - 0.3 * volatility_score),
            TREND_CONFIDENCE_RANGE,
        );

        let season = self.seasonal.identify_pattern(window.last, commodity);
        let mut key_factors =
            key_factors(season, trend_direction, volatility_level, prices.len(), rsi);
        if let Some(gap) = ema_gap {
            if gap >= EMA_MOMENTUM_PCT {
                key_factors.push(format!("Price {:.1}% above its {}-point EMA", gap, self.config.ema_window));
            } else if gap <= -EMA_MOMENTUM_PCT {
                key_factors.push(format!("Price {:.1}% below its {}-point EMA", -gap, self.config.ema_window));
            }
        }

        Ok(TrendAnalysis {
            commodity: commodity.to_string(),
            region: region.map(str::to_string),
            analysis_period_days: period_days,
            trend_direction,
            trend_strength: fit.r_squared,
            price_change_percent,
            volatility_level,
            volatility_score,
            current_price,
            average_price,
            min_price,
            max_price,
            support_level: finite_or(support * scale, min_price),
            resistance_level: finite_or(resistance * scale, max_price),
            rsi,
            sample_count: prices.len(),
            confidence_score,
            key_factors,
            timestamp: window.last,
        })
    }

    /// Forecast the price `horizon_days` after the latest sample.
    pub fn predict(
        &self,
        commodity: &str,
        region: Option<&str>,
        samples: &[PriceSample],
        horizon_days: u32,
    ) -> AnalyticsResult<PricePrediction> {
        let period = self.config.prediction_history_days;
        let trend = self.analyze_trend(commodity, region, samples, period)?;
        let window = self.collect_window(commodity, region, samples, period)?;
        let (unit, scale) = window.normalized();

        let fit = linear_trend(&unit);
        let span = window.span_days();
        let unit_slope_per_day = if span > 0.0 && unit.len() > 1 {
            fit.slope / (span / (unit.len() - 1) as f64)
        } else {
            fit.slope
        };

        // Blend in unit space, then scale back
        let horizon = horizon_days as f64;
        let unit_current = trend.current_price / scale;
        let unit_average = trend.average_price / scale;
        let extrapolated = unit_current + unit_slope_per_day * horizon;
        let base = trend.trend_strength * extrapolated + (1.0 - trend.trend_strength) * unit_average;

        let target_date = window.last + Duration::days(horizon_days as i64);
        let (seasonal_pattern, multiplier) = self.seasonal.multiplier_for(target_date, commodity);
        let floor = PREDICTION_FLOOR_FACTOR * trend.min_price;
        let ceiling = finite_or(PREDICTION_CEILING_FACTOR * trend.max_price, trend.max_price);
        let predicted_price = finite_or(base * multiplier * scale, trend.current_price).clamp(floor, ceiling);

        let recent = &unit[unit.len().saturating_sub(CONFIDENCE_INTERVAL_SAMPLES)..];
        let confidence_interval =
            finite_or(CONFIDENCE_INTERVAL_Z * std_dev(recent) * scale, 0.0);
        let price_range = PriceRange {
            min: (predicted_price - confidence_interval).max(0.0),
            max: finite_or(predicted_price + confidence_interval, f64::MAX),
            confidence_interval,
        };

        let confidence_score = clamp_score(
            trend.confidence_score * (1.0 - horizon / 30.0).max(0.3)
                + 0.2 * trend.trend_strength
                - 0.3 * trend.volatility_score,
            PREDICTION_CONFIDENCE_RANGE,
        );

        let directional = matches!(
            trend.trend_direction,
            TrendDirection::Bullish | TrendDirection::Bearish
        );
        let base_probability = trend.trend_strength + if directional { 0.2 } else { 0.0 };
        let trend_continuation_probability = clamp_score(
            base_probability * (1.0 - horizon / 60.0).max(0.3) - 0.2 * trend.volatility_score,
            CONTINUATION_PROBABILITY_RANGE,
        );

        debug!(
            "Predicted {} at {:.2} over {} days ({:?}, x{:.2})",
            commodity, predicted_price, horizon_days, seasonal_pattern, multiplier
        );

        Ok(PricePrediction {
            commodity: commodity.to_string(),
            region: region.map(str::to_string),
            horizon_days,
            predicted_price,
            price_range,
            confidence_score,
            trend_continuation_probability,
            seasonal_pattern,
            key_drivers: price_drivers(trend.trend_direction, seasonal_pattern),
            risk_factors: risk_factors(&trend, seasonal_pattern),
            timestamp: window.last,
        })
    }

    /// Volatility score, level and recent-vs-earlier trend over `period_days`.
    pub fn volatility_indicator(
        &self,
        commodity: &str,
        region: Option<&str>,
        samples: &[PriceSample],
        period_days: u32,
    ) -> AnalyticsResult<MarketVolatilityIndicator> {
        let window = self.collect_window(commodity, region, samples, period_days)?;
        let (prices, scale) = window.normalized();
        let prices = &prices;

        let cov_pct = coefficient_of_variation(prices) * 100.0;
        let volatility_score = (cov_pct / INDICATOR_SCORE_SATURATION_PCT).min(1.0);
        let volatility_level = if volatility_score < INDICATOR_LOW_SCORE {
            VolatilityLevel::Low
        } else if volatility_score < INDICATOR_MEDIUM_SCORE {
            VolatilityLevel::Medium
        } else if volatility_score < INDICATOR_HIGH_SCORE {
            VolatilityLevel::High
        } else {
            VolatilityLevel::Extreme
        };

        let max_daily_change_percent = prices
            .windows(2)
            .map(|w| percent_change(w[0], w[1]).abs())
            .fold(0.0, f64::max);

        let volatility_trend = if prices.len() >= 20 {
            let recent = std_dev(&prices[prices.len() - 10..]);
            let earlier = std_dev(&prices[prices.len() - 20..prices.len() - 10]);
            if recent > earlier * 1.1 {
                SeriesDirection::Increasing
            } else if recent < earlier * 0.9 {
                SeriesDirection::Decreasing
            } else {
                SeriesDirection::Stable
            }
        } else {
            SeriesDirection::Stable
        };

        Ok(MarketVolatilityIndicator {
            commodity: commodity.to_string(),
            region: region.map(str::to_string),
            volatility_score,
            volatility_level,
            price_variance: finite_or(variance(prices) * scale * scale, f64::MAX),
            coefficient_of_variation: cov_pct,
            max_daily_change_percent,
            volatility_trend,
            measurement_period_days: period_days,
            timestamp: window.last,
        })
    }

    fn collect_window(
        &self,
        commodity: &str,
        region: Option<&str>,
        samples: &[PriceSample],
        period_days: u32,
    ) -> AnalyticsResult<PriceWindow> {
        let mut scoped: Vec<&PriceSample> = samples
            .iter()
            .filter(|s| s.belongs_to(commodity, None) && s.is_valid())
            .filter(|s| region.map_or(true, |r| s.location.matches_region(r)))
            .collect();
        scoped.sort_by_key(|s| s.timestamp);

        let last = match scoped.last() {
            Some(s) => s.timestamp,
            None => {
                return Err(AnalyticsError::InsufficientData {
                    required: MIN_TREND_SAMPLES,
                    actual: 0,
                })
            }
        };
        let cutoff = last - Duration::days(period_days as i64);
        scoped.retain(|s| s.timestamp >= cutoff);

        if scoped.len() < MIN_TREND_SAMPLES {
            return Err(AnalyticsError::InsufficientData {
                required: MIN_TREND_SAMPLES,
                actual: scoped.len(),
            });
        }

        Ok(PriceWindow {
            prices: scoped.iter().map(|s| s.price).collect(),
            first: scoped[0].timestamp,
            last,
        })
    }
}

fn classify_trend(slope: f64, change_pct: f64, cov: f64) -> TrendDirection {
    if change_pct.abs() < SIDEWAYS_CHANGE_PCT {
        TrendDirection::Sideways
    } else if slope > 0.0 && change_pct > DIRECTIONAL_CHANGE_PCT {
        TrendDirection::Bullish
    } else if slope < 0.0 && change_pct < -DIRECTIONAL_CHANGE_PCT {
        TrendDirection::Bearish
    } else if cov > VOLATILE_COV {
        TrendDirection::Volatile
    } else {
        TrendDirection::Sideways
    }
}

fn volatility_bucket(cov_pct: f64) -> (VolatilityLevel, f64) {
    let level = if cov_pct < VOLATILITY_LOW_PCT {
        VolatilityLevel::Low
    } else if cov_pct < VOLATILITY_MEDIUM_PCT {
        VolatilityLevel::Medium
    } else if cov_pct < VOLATILITY_HIGH_PCT {
        VolatilityLevel::High
    } else {
        VolatilityLevel::Extreme
    };
    (level, (cov_pct / VOLATILITY_SCORE_SATURATION_PCT).min(1.0))
}

/// Percent gap between the last price and its EMA, `None` below `window` points.
fn ema_gap_percent(prices: &[f64], window: usize) -> Option<f64> {
    let ema = exponential_moving_average(prices, window);
    let (&last_ema, &last) = (ema.last()?, prices.last()?);
    Some(percent_change(last_ema, last))
}

/// Median of the most recent local minima and maxima over `window` points
/// on either side. Falls back to the period min/max.
fn support_resistance(prices: &[f64], window: usize) -> (f64, f64) {
    let (lo, hi) = min_max(prices);
    if window == 0 || prices.len() < 2 * window + 1 {
        return (lo, hi);
    }

    let mut minima = Vec::new();
    let mut maxima = Vec::new();
    for i in window..prices.len() - window {
        let (local_lo, local_hi) = min_max(&prices[i - window..=i + window]);
        if prices[i] == local_lo {
            minima.push(prices[i]);
        }
        if prices[i] == local_hi {
            maxima.push(prices[i]);
        }
    }

    let recent = |v: &[f64]| v[v.len().saturating_sub(SUPPORT_RESISTANCE_EXTREMA)..].to_vec();
    let support = if minima.is_empty() { lo } else { median(&recent(&minima[..])) };
    let resistance = if maxima.is_empty() { hi } else { median(&recent(&maxima[..])) };
    (support, resistance)
}

fn key_factors(
    season: SeasonalPattern,
    direction: TrendDirection,
    volatility: VolatilityLevel,
    sample_count: usize,
    rsi: Option<f64>,
) -> Vec<String> {
    let mut factors = vec![format!("Seasonal pattern: {}", season.as_str())];

    match direction {
        TrendDirection::Bullish => factors.push("Strong upward price momentum".to_string()),
        TrendDirection::Bearish => factors.push("Downward price pressure".to_string()),
        TrendDirection::Volatile => {
            factors.push("High market uncertainty and volatility".to_string())
        }
        TrendDirection::Sideways => {}
    }

    match volatility {
        VolatilityLevel::High => {
            factors.push("High price volatility indicating market instability".to_string())
        }
        VolatilityLevel::Extreme => {
            factors.push("Extreme volatility suggesting major market disruption".to_string())
        }
        VolatilityLevel::Low | VolatilityLevel::Medium => {}
    }

    if sample_count < 20 {
        factors.push("Limited data availability affecting analysis reliability".to_string());
    }

    match rsi {
        Some(r) if r >= RSI_OVERBOUGHT => factors.push(format!("Overbought momentum (RSI {:.1})", r)),
        Some(r) if r <= RSI_OVERSOLD => factors.push(format!("Oversold momentum (RSI {:.1})", r)),
        _ => {}
    }

    factors
}

fn price_drivers(direction: TrendDirection, season: SeasonalPattern) -> Vec<String> {
    let mut drivers: Vec<String> = match direction {
        TrendDirection::Bullish => vec![
            "Strong demand fundamentals".into(),
            "Supply constraints".into(),
            "Positive market sentiment".into(),
        ],
        TrendDirection::Bearish => vec![
            "Oversupply conditions".into(),
            "Weak demand".into(),
            "Market correction".into(),
        ],
        TrendDirection::Sideways | TrendDirection::Volatile => Vec::new(),
    };

    match season {
        SeasonalPattern::HarvestSeason => drivers.push("Harvest season supply increase".into()),
        SeasonalPattern::FestivalDemand => drivers.push("Festival season demand surge".into()),
        _ => {}
    }
    drivers
}

fn risk_factors(trend: &TrendAnalysis, season: SeasonalPattern) -> Vec<String> {
    let mut risks = Vec::new();
    if trend.volatility_level >= VolatilityLevel::High {
        risks.push("High market volatility".to_string());
    }
    if trend.confidence_score < 0.6 {
        risks.push("Limited data reliability".to_string());
    }
    if season == SeasonalPattern::MonsoonImpact {
        risks.push("Weather-related supply disruption risk".to_string());
    }
    risks.extend([
        "Weather and climate variability".to_string(),
        "Government policy changes".to_string(),
        "Global market fluctuations".to_string(),
    ]);
    risks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::Location;
    use chrono::TimeZone;

    fn series(prices: &[f64]) -> Vec<PriceSample> {
        let start = Utc.with_ymd_and_hms(2026, 4, 1, 10, 0, 0).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &price)| PriceSample {
                commodity: "Onion".to_string(),
                variety: None,
                price,
                quantity: 50.0,
                mandi_id: "LSG".to_string(),
                mandi_name: "Lasalgaon".to_string(),
                location: Location::new("Maharashtra", Some("Nashik")),
                timestamp: start + Duration::days(i as i64),
                confidence: 1.0,
            })
            .collect()
    }

    fn analyzer() -> PriceTrendAnalyzer {
        PriceTrendAnalyzer::new(TrendConfig::default())
    }

    #[test]
    fn test_bullish_trend() {
        let prices: Vec<f64> = (0..30).map(|i| 2000.0 + 20.0 * i as f64).collect();
        let trend = analyzer().analyze_trend("onion", None, &series(&prices), 30).unwrap();

        assert_eq!(trend.trend_direction, TrendDirection::Bullish);
        assert!(trend.trend_strength > 0.99);
        assert!(trend.price_change_percent > 25.0);
        assert_eq!(trend.current_price, 2580.0);
        assert!(trend.support_level <= trend.resistance_level);
        assert!(trend.confidence_score >= 0.1 && trend.confidence_score <= 1.0);
        assert!(trend.key_factors.iter().any(|f| f == "Strong upward price momentum"));
    }

    #[test]
    fn test_flat_series_is_sideways_and_calm() {
        let trend = analyzer()
            .analyze_trend("onion", None, &series(&[1500.0; 12]), 30)
            .unwrap();
        assert_eq!(trend.trend_direction, TrendDirection::Sideways);
        assert_eq!(trend.volatility_level, VolatilityLevel::Low);
        assert_eq!(trend.trend_strength, 0.0);
        assert_eq!(trend.volatility_score, 0.0);
    }

    #[test]
    fn test_insufficient_data() {
        let err = analyzer()
            .analyze_trend("onion", None, &series(&[10.0, 11.0, 12.0, 13.0]), 30)
            .unwrap_err();
        assert_eq!(err, AnalyticsError::InsufficientData { required: 5, actual: 4 });

        let err = analyzer().predict("potato", None, &series(&[10.0; 10]), 7).unwrap_err();
        assert_eq!(err, AnalyticsError::InsufficientData { required: 5, actual: 0 });
    }

    #[test]
    fn test_period_window_drops_old_samples() {
        let prices: Vec<f64> = (0..40).map(|i| 1000.0 + i as f64).collect();
        let trend = analyzer().analyze_trend("onion", None, &series(&prices), 10).unwrap();
        assert_eq!(trend.sample_count, 11);
    }

    #[test]
    fn test_region_filter() {
        let prices = series(&[1000.0; 8]);
        assert!(analyzer().analyze_trend("onion", Some("nashik"), &prices, 30).is_ok());
        assert!(analyzer().analyze_trend("onion", Some("punjab"), &prices, 30).is_err());
    }

    #[test]
    fn test_prediction_is_bounded() {
        let prices: Vec<f64> = (0..30).map(|i| 2000.0 + 20.0 * i as f64).collect();
        let prediction = analyzer().predict("onion", None, &series(&prices), 7).unwrap();

        assert!(prediction.predicted_price >= 0.8 * 2000.0);
        assert!(prediction.predicted_price <= 1.2 * 2580.0);
        assert!(prediction.price_range.min >= 0.0);
        assert!(prediction.price_range.min <= prediction.predicted_price);
        assert!(prediction.price_range.max >= prediction.predicted_price);
        assert!(prediction.confidence_score >= 0.1 && prediction.confidence_score <= 0.9);
        assert!(
            prediction.trend_continuation_probability >= 0.1
                && prediction.trend_continuation_probability <= 0.9
        );
        assert!(prediction.key_drivers.iter().any(|d| d == "Supply constraints"));
        assert!(prediction.risk_factors.iter().any(|r| r == "Government policy changes"));
    }

    #[test]
    fn test_flat_prediction_has_zero_interval() {
        let prediction = analyzer().predict("onion", None, &series(&[1800.0; 15]), 5).unwrap();
        assert_eq!(prediction.price_range.confidence_interval, 0.0);
        assert_eq!(prediction.price_range.min, prediction.predicted_price);
    }

    #[test]
    fn test_support_resistance_extrema() {
        let prices: Vec<f64> = (0..80)
            .map(|i| 1000.0 + 100.0 * ((i as f64) * std::f64::consts::PI / 10.0).sin())
            .collect();
        let (support, resistance) = support_resistance(&prices, 5);
        assert!(support < 920.0);
        assert!(resistance > 1080.0);

        assert_eq!(support_resistance(&[3.0, 1.0, 2.0], 20), (1.0, 3.0));
    }

    #[test]
    fn test_volatility_indicator() {
        let calm = analyzer()
            .volatility_indicator("onion", None, &series(&[1000.0; 10]), 30)
            .unwrap();
        assert_eq!(calm.volatility_level, VolatilityLevel::Low);
        assert_eq!(calm.max_daily_change_percent, 0.0);
        assert_eq!(calm.volatility_trend, SeriesDirection::Stable);

        let wild: Vec<f64> = (0..24)
            .map(|i| if i < 12 { 1000.0 } else if i % 2 == 0 { 400.0 } else { 1800.0 })
            .collect();
        let indicator = analyzer().volatility_indicator("onion", None, &series(&wild), 30).unwrap();
        assert!(indicator.volatility_score > 0.5);
        assert_eq!(indicator.volatility_trend, SeriesDirection::Increasing);
        assert!(indicator.max_daily_change_percent > 100.0);
    }

    #[test]
    fn test_extreme_magnitudes_stay_finite() {
        let prices: Vec<f64> = (0..30).map(|i| 1e306 * (1.0 + 0.05 * i as f64)).collect();
        let samples = series(&prices);

        let trend = analyzer().analyze_trend("onion", None, &samples, 30).unwrap();
        assert_eq!(trend.trend_direction, TrendDirection::Bullish);
        assert!(trend.average_price.is_finite());
        assert!(trend.support_level.is_finite() && trend.resistance_level.is_finite());

        let prediction = analyzer().predict("onion", None, &samples, 7).unwrap();
        assert!(prediction.predicted_price.is_finite());
        assert!(prediction.predicted_price >= 0.8 * prices[0]);
        assert!(prediction.predicted_price <= 1.2 * prices[29]);
        assert!(prediction.price_range.min.is_finite());
        assert!(prediction.price_range.max.is_finite());
        assert!(prediction.price_range.confidence_interval > 0.0);

        let indicator = analyzer().volatility_indicator("onion", None, &samples, 30).unwrap();
        assert!(indicator.coefficient_of_variation > 0.0);
        assert!(indicator.price_variance.is_finite());
    }

    #[test]
    fn test_jump_above_ema_is_a_key_factor() {
        let mut prices = vec![1000.0; 20];
        prices.push(1200.0);
        let trend = analyzer().analyze_trend("onion", None, &series(&prices), 30).unwrap();
        assert!(trend
            .key_factors
            .iter()
            .any(|f| f.starts_with("Price") && f.ends_with("above its 12-point EMA")));

        let flat = analyzer()
            .analyze_trend("onion", None, &series(&[1000.0; 20]), 30)
            .unwrap();
        assert!(!flat.key_factors.iter().any(|f| f.contains("EMA")));
    }
}
