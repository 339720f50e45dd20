// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/mandiwatch

//! Price spike detection against a causal moving average

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{severity_for, Severity};
use crate::analysis::statistics::{mean, moving_average, std_dev, trailing_window, z_score};
use crate::config::AnomalyDetectionConfig;
use crate::market::{sort_chronologically, CommodityScoped, PriceSample};

/// A price that deviates sharply from its trailing average
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAnomaly {
    pub commodity: String,
    pub variety: Option<String>,
    pub mandi_id: String,
    pub mandi_name: String,
    pub current_price: f64,
    pub moving_average: f64,
    pub price_deviation: f64,
    pub deviation_percentage: f64,
    pub standard_deviation: f64,
    pub z_score: f64,
    pub confidence_score: f64,
    pub severity: Severity,
    pub analysis_window_days: usize,
    pub contributing_factors: Vec<String>,
    pub detected_at: DateTime<Utc>,
}

pub struct PriceSpikeDetector {
    config: Arc<AnomalyDetectionConfig>,
}

impl PriceSpikeDetector {
    pub fn new(config: Arc<AnomalyDetectionConfig>) -> Self {
        Self { config }
    }

    /// Flag every price whose deviation from the trailing average reaches the
    /// spike threshold. Short series produce no anomalies.
    ///
    /// `region` matches state or district, case-insensitively.
    pub fn detect(
        &self,
        samples: &[PriceSample],
        commodity: &str,
        variety: Option<&str>,
        region: Option<&str>,
    ) -> Vec<PriceAnomaly> {
        let cfg = &self.config;

        let mut scoped: Vec<&PriceSample> = samples
            .iter()
            .filter(|s| s.belongs_to(commodity, variety))
            .filter(|s| region.map_or(true, |r| s.location.matches_region(r)))
            .filter(|s| {
                let valid = s.is_valid();
                if !valid {
                    debug!("Skipping invalid price {} from {}", s.price, s.mandi_id);
                }
                valid
            })
            .collect();

        if scoped.len() < cfg.min_data_points {
            debug!(
                "{} price samples for {}, need {}",
                scoped.len(),
                commodity,
                cfg.min_data_points
            );
            return Vec::new();
        }
        sort_chronologically(&mut scoped, "price");

        let prices: Vec<f64> = scoped.iter().map(|s| s.price).collect();
        let quantities: Vec<f64> = scoped.iter().map(|s| s.quantity).collect();
        let window = cfg.moving_average_window_days;

        // Keyed by timestamp; the largest deviation at an instant wins
        let mut by_time: BTreeMap<DateTime<Utc>, PriceAnomaly> = BTreeMap::new();

        for (i, sample) in scoped.iter().enumerate().skip(window) {
            let (avg, reference) = match (
                moving_average(&prices, i, window),
                trailing_window(&prices, i, window),
            ) {
                (Some(avg), Some(reference)) if avg > 0.0 => (avg, reference),
                _ => continue,
            };

            let price_deviation = sample.price - avg;
            let deviation_percentage = price_deviation / avg * 100.0;
            if deviation_percentage.abs() < cfg.price_spike_threshold_percentage {
                continue;
            }

            let standard_deviation = std_dev(reference);
            let z = z_score(sample.price, reference);
            let mean_quantity = trailing_window(&quantities, i, window).map(mean).unwrap_or(0.0);

            let anomaly = PriceAnomaly {
                commodity: sample.commodity.clone(),
                variety: sample.variety.clone(),
                mandi_id: sample.mandi_id.clone(),
                mandi_name: sample.mandi_name.clone(),
                current_price: sample.price,
                moving_average: avg,
                price_deviation,
                deviation_percentage,
                standard_deviation,
                z_score: z,
                confidence_score: spike_confidence(z, deviation_percentage, prices.len()),
                severity: severity_for(
                    deviation_percentage.abs(),
                    cfg.price_spike_threshold_percentage,
                    &cfg.price_severity,
                ),
                analysis_window_days: window,
                contributing_factors: self.contributing_factors(
                    sample,
                    deviation_percentage,
                    z,
                    standard_deviation,
                    avg,
                    mean_quantity,
                ),
                detected_at: sample.timestamp,
            };

            let keep = by_time
                .get(&sample.timestamp)
                .map_or(true, |prev| anomaly.deviation_percentage.abs() > prev.deviation_percentage.abs());
            if keep {
                by_time.insert(sample.timestamp, anomaly);
            }
        }

        let anomalies: Vec<PriceAnomaly> = by_time.into_values().collect();
        for a in &anomalies {
            warn!(
                "Price spike: {} at {} {:.2} vs avg {:.2} ({:+.1}%, {:?})",
                a.commodity, a.mandi_name, a.current_price, a.moving_average, a.deviation_percentage, a.severity
            );
        }
        anomalies
    }

    fn contributing_factors(
        &self,
        sample: &PriceSample,
        deviation_percentage: f64,
        z: f64,
        window_std: f64,
        window_mean: f64,
        mean_quantity: f64,
    ) -> Vec<String> {
        let mut factors = Vec::new();

        if deviation_percentage > 0.0 {
            factors.push("Upward price pressure detected".to_string());
        } else {
            factors.push("Downward price pressure detected".to_string());
        }

        if z.abs() >= self.config.z_score_threshold {
            factors.push("Statistically extreme price movement".to_string());
        }

        if window_std > window_mean * 0.2 {
            factors.push("High price volatility in recent period".to_string());
        }

        if mean_quantity > 0.0 && sample.quantity < mean_quantity * 0.5 {
            factors.push("Lower than average trading volume".to_string());
        }

        let hour = sample.timestamp.hour();
        if !(8..=18).contains(&hour) {
            factors.push("Price movement outside normal trading hours".to_string());
        }

        factors
    }
}

/// Blend of statistical extremity, deviation size and series length
fn spike_confidence(z: f64, deviation_percentage: f64, data_points: usize) -> f64 {
    let z_confidence = (z.abs() / 5.0).min(1.0);
    let deviation_confidence = (deviation_percentage.abs() / 100.0).min(1.0);
    let data_confidence = (data_points as f64 / 50.0).min(1.0);

    let confidence = z_confidence * 0.4 + deviation_confidence * 0.4 + data_confidence * 0.2;
    if confidence.is_nan() {
        return 0.1;
    }
    confidence.clamp(0.1, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::Location;
    use chrono::{Duration, TimeZone};

    fn series(prices: &[f64]) -> Vec<PriceSample> {
        let start = Utc.with_ymd_and_hms(2026, 2, 1, 11, 0, 0).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &price)| PriceSample {
                commodity: "Tomato".to_string(),
                variety: Some("Hybrid".to_string()),
                price,
                quantity: 80.0,
                mandi_id: "KLR".to_string(),
                mandi_name: "Kolar".to_string(),
                location: Location::new("Karnataka", Some("Kolar")),
                timestamp: start + Duration::days(i as i64),
                confidence: 1.0,
            })
            .collect()
    }

    fn detector() -> PriceSpikeDetector {
        PriceSpikeDetector::new(Arc::new(AnomalyDetectionConfig::default()))
    }

    fn jittered(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 2000.0 * (1.0 + 0.02 * ((i as f64) * 1.7).sin()))
            .collect()
    }

    #[test]
    fn test_single_spike_flagged_high() {
        let mut prices = jittered(30);
        prices.push(2800.0);
        let anomalies = detector().detect(&series(&prices), "tomato", None, None);

        assert_eq!(anomalies.len(), 1);
        let a = &anomalies[0];
        assert!((a.deviation_percentage - 40.0).abs() < 2.0);
        assert_eq!(a.severity, Severity::High);
        assert!(a.z_score > 2.5);
        assert!(a.confidence_score >= 0.1 && a.confidence_score <= 1.0);
        assert_eq!(a.analysis_window_days, 30);
        assert!(a.contributing_factors.iter().any(|f| f == "Upward price pressure detected"));
        assert!(a.contributing_factors.iter().any(|f| f == "Statistically extreme price movement"));
    }

    #[test]
    fn test_crash_is_critical() {
        let mut prices = jittered(30);
        prices.push(900.0);
        let anomalies = detector().detect(&series(&prices), "tomato", Some("hybrid"), None);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].severity, Severity::Critical);
        assert!(anomalies[0].deviation_percentage < -50.0);
    }

    #[test]
    fn test_quiet_series_has_no_spikes() {
        let anomalies = detector().detect(&series(&jittered(60)), "tomato", None, None);
        assert!(anomalies.is_empty());

        let flat = detector().detect(&series(&[1500.0; 45]), "tomato", None, None);
        assert!(flat.is_empty());
    }

    #[test]
    fn test_short_series_is_empty() {
        let mut prices = vec![2000.0; 8];
        prices.push(5000.0);
        assert!(detector().detect(&series(&prices), "tomato", None, None).is_empty());
    }

    #[test]
    fn test_invalid_prices_are_skipped() {
        let mut prices = jittered(40);
        prices[10] = -1.0;
        prices[11] = f64::NAN;
        prices.push(2800.0);
        let anomalies = detector().detect(&series(&prices), "tomato", None, None);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].current_price, 2800.0);
        assert!(anomalies[0].moving_average.is_finite());
    }

    #[test]
    fn test_other_variety_ignored() {
        let mut prices = jittered(30);
        prices.push(2800.0);
        assert!(detector().detect(&series(&prices), "tomato", Some("Desi"), None).is_empty());
        assert!(detector().detect(&series(&prices), "onion", None, None).is_empty());
    }

    #[test]
    fn test_region_scopes_prices() {
        let mut prices = jittered(30);
        prices.push(2800.0);
        let samples = series(&prices);

        assert_eq!(detector().detect(&samples, "tomato", None, Some("karnataka")).len(), 1);
        assert_eq!(detector().detect(&samples, "tomato", None, Some("KOLAR")).len(), 1);
        assert!(detector().detect(&samples, "tomato", None, Some("punjab")).is_empty());
    }

    #[test]
    fn test_confidence_floor() {
        assert_eq!(spike_confidence(0.0, 0.0, 0), 0.1);
        assert_eq!(spike_confidence(10.0, 200.0, 500), 1.0);
    }
}
