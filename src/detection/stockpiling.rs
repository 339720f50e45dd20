// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/mandiwatch


//! Stockpiling pattern detection
//!
//! Four shapes are recognised:
//! - sustained accumulation: a hoarding signal from the inventory tracker
//!   that persists for `stockpiling_threshold_days` calendar days. The
//!   baseline is frozen at the onset of the run: a moving baseline would
//!   rise with the accumulation and end the run early.
//! - coordinated: several locations accumulating at near-identical rates
//! - cross-regional: stock building in one state while prices climb in another
//! - seasonal-unusual: the latest month far above the same month historically

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::inventory::{deviation_from, InventoryAnomalyTracker, InventorySeries};
use super::Severity;
use crate::analysis::policy::*;
use crate::analysis::statistics::{correlation, linear_trend, mean, percent_change, std_dev};
use crate::config::AnomalyDetectionConfig;
use crate::market::{CommodityScoped, InventorySample, PriceSample};

/// Dips allowed inside one run
const MAX_DIPS: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockpilingPatternType {
    SustainedAccumulation,
    Coordinated,
    CrossRegional,
    SeasonalUnusual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockpilingPattern {
    pub commodity: String,
    pub variety: Option<String>,
    pub pattern_type: StockpilingPatternType,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub duration_days: i64,
    pub baseline_level: f64,
    pub peak_level: f64,
    pub peak_deviation_percentage: f64,
    pub mean_deviation_percentage: f64,
    /// Change in level per sample (sustained) or per day (other shapes)
    pub accumulation_rate: f64,
    pub dips_tolerated: usize,
    pub involved_mandis: Vec<String>,
    /// `State/District` labels, or states for cross-regional patterns
    pub involved_regions: Vec<String>,
    pub total_accumulated_quantity: f64,
    /// Price move in the affected state; cross-regional patterns only
    pub price_impact_percentage: Option<f64>,
    pub severity: Severity,
    pub confidence_score: f64,
    pub pattern_indicators: Vec<String>,
    pub detected_at: DateTime<Utc>,
}

/// Per-location accumulation used by the coordination check
struct LocationTrend<'a> {
    label: String,
    samples: Vec<&'a InventorySample>,
    rate_per_day: f64,
}

pub struct StockpilingPatternDetector {
    config: Arc<AnomalyDetectionConfig>,
    tracker: InventoryAnomalyTracker,
}

impl StockpilingPatternDetector {
    pub fn new(config: Arc<AnomalyDetectionConfig>) -> Self {
        Self {
            tracker: InventoryAnomalyTracker::new(config.clone()),
            config,
        }
    }

    /// Every enabled pattern shape for one market.
    ///
    /// Cross-regional patterns look at all states and keep those where either
    /// side matches `region`.
    pub fn detect(
        &self,
        inventory: &[InventorySample],
        prices: &[PriceSample],
        commodity: &str,
        variety: Option<&str>,
        region: Option<&str>,
    ) -> Vec<StockpilingPattern> {
        let mut patterns = Vec::new();

        if let Some(series) = self.tracker.scoped_series(inventory, commodity, variety, region) {
            patterns.extend(self.detect_sustained(&series, variety));
            if self.config.coordination_detection_enabled {
                patterns.extend(self.detect_coordinated(&series, variety));
            }
            patterns.extend(self.detect_seasonal_unusual(&series, variety));
        }

        if self.config.cross_regional_analysis_enabled {
            if let Some(all) = self.tracker.scoped_series(inventory, commodity, variety, None) {
                patterns.extend(self.detect_cross_regional(&all, prices, commodity, variety, region));
            }
        }

        patterns.sort_by_key(|p| p.detected_at);
        patterns
    }

    /// Runs of consecutive flagged samples against a frozen onset baseline.
    pub fn detect_sustained(
        &self,
        series: &InventorySeries<'_>,
        variety: Option<&str>,
    ) -> Vec<StockpilingPattern> {
        let points = self.tracker.deviation_series(series);
        let threshold = self.config.inventory_deviation_threshold_percentage;
        let n = points.len();

        let mut patterns = Vec::new();
        let mut i = 0;

        while i < n {
            let baseline = match (points[i].baseline, points[i].deviation_percentage) {
                (Some(b), Some(d)) if d >= threshold => b,
                _ => {
                    i += 1;
                    continue;
                }
            };

            let start = i;
            let mut last_qualifying = i;
            let mut dips = 0;
            for (j, point) in points.iter().enumerate().skip(start + 1) {
                if deviation_from(point.level, baseline) >= threshold {
                    last_qualifying = j;
                } else {
                    dips += 1;
                    if dips > MAX_DIPS {
                        break;
                    }
                }
            }

            let run = start..=last_qualifying;
            let deviations: Vec<f64> = points[run.clone()]
                .iter()
                .map(|p| deviation_from(p.level, baseline))
                .collect();
            let qualifying: Vec<f64> = deviations.iter().copied().filter(|&d| d >= threshold).collect();
            let dips_tolerated = deviations.len() - qualifying.len();

            let window_start = points[start].timestamp;
            let window_end = points[last_qualifying].timestamp;
            let duration_days = (window_end - window_start).num_days() + 1;

            if duration_days >= self.config.stockpiling_threshold_days {
                let levels = &series.levels[run.clone()];
                let peak_level = levels.iter().copied().fold(f64::MIN, f64::max);
                let mean_deviation = mean(&qualifying);
                let run_samples = &series.samples[run];

                let pattern = StockpilingPattern {
                    commodity: series.samples[start].commodity.clone(),
                    variety: variety.map(str::to_string),
                    pattern_type: StockpilingPatternType::SustainedAccumulation,
                    window_start,
                    window_end,
                    duration_days,
                    baseline_level: baseline,
                    peak_level,
                    peak_deviation_percentage: deviation_from(peak_level, baseline),
                    mean_deviation_percentage: mean_deviation,
                    accumulation_rate: linear_trend(levels).slope,
                    dips_tolerated,
                    severity: self.pattern_severity(mean_deviation, duration_days),
                    confidence_score: self.pattern_confidence(
                        duration_days,
                        mean_deviation,
                        qualifying.len(),
                        deviations.len(),
                    ),
                    pattern_indicators: Vec::new(),
                    involved_mandis: mandi_ids(run_samples),
                    involved_regions: location_labels(run_samples),
                    total_accumulated_quantity: levels.iter().sum(),
                    price_impact_percentage: None,
                    detected_at: window_end,
                };
                let pattern = StockpilingPattern {
                    pattern_indicators: self.pattern_indicators(&pattern),
                    ..pattern
                };

                warn!(
                    "Stockpiling pattern: {} for {} days from {} ({:.0}% above {:.0}, {:?})",
                    pattern.commodity,
                    pattern.duration_days,
                    pattern.window_start.format("%Y-%m-%d"),
                    pattern.mean_deviation_percentage,
                    pattern.baseline_level,
                    pattern.severity
                );
                patterns.push(pattern);
            }

            i = last_qualifying + 1;
        }

        patterns
    }

    /// Three or more locations accumulating at near-identical positive rates.
    pub fn detect_coordinated(
        &self,
        series: &InventorySeries<'_>,
        variety: Option<&str>,
    ) -> Vec<StockpilingPattern> {
        let mut groups: BTreeMap<String, Vec<&InventorySample>> = BTreeMap::new();
        for &sample in &series.samples {
            groups.entry(sample.location.label()).or_default().push(sample);
        }
        if groups.len() < COORDINATION_MIN_LOCATIONS {
            return Vec::new();
        }

        let trends: Vec<LocationTrend<'_>> = groups
            .into_iter()
            .filter(|(_, samples)| samples.len() >= COORDINATION_MIN_SAMPLES)
            .filter_map(|(label, samples)| {
                let (first, last) = (samples[0], samples[samples.len() - 1]);
                let span_days = (last.timestamp - first.timestamp).num_days();
                (span_days > 0).then(|| LocationTrend {
                    rate_per_day: (last.inventory_level - first.inventory_level) / span_days as f64,
                    label,
                    samples,
                })
            })
            .collect();
        if trends.len() < COORDINATION_MIN_LOCATIONS {
            return Vec::new();
        }

        let rates: Vec<f64> = trends.iter().map(|t| t.rate_per_day).collect();
        let rate_mean = mean(&rates);
        let rate_sd = std_dev(&rates);
        if rate_mean <= 0.0 || rate_sd >= COORDINATION_RATE_SPREAD * rate_mean {
            debug!("Accumulation rates not synchronized: mean {:.2}, sd {:.2}", rate_mean, rate_sd);
            return Vec::new();
        }

        let confidence_score = coordination_confidence(trends.len(), rate_mean, rate_sd);
        if confidence_score < self.config.pattern_confidence_threshold {
            debug!("Coordination confidence {:.2} below threshold", confidence_score);
            return Vec::new();
        }

        let involved: Vec<&InventorySample> =
            trends.iter().flat_map(|t| t.samples.iter().copied()).collect();
        let total_accumulated_quantity: f64 = involved.iter().map(|s| s.inventory_level).sum();
        let baseline_level: f64 = trends.iter().map(|t| t.samples[0].inventory_level).sum();
        let peak_level: f64 = trends
            .iter()
            .map(|t| t.samples[t.samples.len() - 1].inventory_level)
            .sum();
        let first_seen = involved[0].timestamp;
        let window_start = involved.iter().map(|s| s.timestamp).fold(first_seen, DateTime::min);
        let window_end = involved.iter().map(|s| s.timestamp).fold(first_seen, DateTime::max);
        let growth = deviation_from(peak_level, baseline_level);

        let pattern = StockpilingPattern {
            commodity: series.samples[0].commodity.clone(),
            variety: variety.map(str::to_string),
            pattern_type: StockpilingPatternType::Coordinated,
            window_start,
            window_end,
            duration_days: (window_end - window_start).num_days() + 1,
            baseline_level,
            peak_level,
            peak_deviation_percentage: growth,
            mean_deviation_percentage: growth,
            accumulation_rate: rate_mean,
            dips_tolerated: 0,
            involved_mandis: mandi_ids(&involved),
            involved_regions: trends.iter().map(|t| t.label.clone()).collect(),
            total_accumulated_quantity,
            price_impact_percentage: None,
            severity: coordination_severity(trends.len(), total_accumulated_quantity, rate_mean),
            confidence_score,
            pattern_indicators: vec![
                "Synchronized inventory accumulation across multiple locations".to_string(),
                format!("Similar accumulation rates detected in {} locations", trends.len()),
                format!("Total accumulated quantity: {:.2} units", total_accumulated_quantity),
            ],
            detected_at: window_end,
        };

        warn!(
            "Coordinated stockpiling: {} across {} locations at {:.1}/day (confidence {:.2}, {:?})",
            pattern.commodity,
            pattern.involved_regions.len(),
            rate_mean,
            confidence_score,
            pattern.severity
        );
        vec![pattern]
    }

    /// Stock building in one state while prices rise in another, with the
    /// two day-aligned series correlated above the cross-regional cut-off.
    pub fn detect_cross_regional(
        &self,
        series: &InventorySeries<'_>,
        prices: &[PriceSample],
        commodity: &str,
        variety: Option<&str>,
        region: Option<&str>,
    ) -> Vec<StockpilingPattern> {
        let mut stock_by_state: BTreeMap<&str, Vec<&InventorySample>> = BTreeMap::new();
        for &sample in &series.samples {
            stock_by_state.entry(sample.location.state.as_str()).or_default().push(sample);
        }

        let mut scoped_prices: Vec<&PriceSample> = prices
            .iter()
            .filter(|p| p.belongs_to(commodity, variety) && p.is_valid())
            .collect();
        scoped_prices.sort_by_key(|p| p.timestamp);
        let mut prices_by_state: BTreeMap<&str, Vec<&PriceSample>> = BTreeMap::new();
        for sample in scoped_prices {
            prices_by_state.entry(sample.location.state.as_str()).or_default().push(sample);
        }

        let mut patterns = Vec::new();
        for (&accumulating, stock) in &stock_by_state {
            if stock.len() < CROSS_REGIONAL_MIN_SAMPLES {
                continue;
            }
            let levels: Vec<f64> = stock.iter().map(|s| s.inventory_level).collect();
            let stock_trend = (levels[levels.len() - 1] - levels[0]) / levels.len() as f64;
            if stock_trend <= 0.0 {
                continue;
            }

            for (&affected, state_prices) in &prices_by_state {
                if affected == accumulating || state_prices.len() < CROSS_REGIONAL_MIN_SAMPLES {
                    continue;
                }
                let values: Vec<f64> = state_prices.iter().map(|p| p.price).collect();
                if values[values.len() - 1] <= values[0] {
                    continue;
                }
                if let Some(r) = region {
                    let touches = stock.iter().any(|s| s.location.matches_region(r))
                        || state_prices.iter().any(|p| p.location.matches_region(r));
                    if !touches {
                        continue;
                    }
                }

                let strength = day_aligned_correlation(stock, state_prices);
                if strength <= CROSS_REGIONAL_CORRELATION {
                    continue;
                }

                let price_impact = percent_change(values[0], values[values.len() - 1]);
                let window_start = stock[0].timestamp.min(state_prices[0].timestamp);
                let window_end = stock[stock.len() - 1]
                    .timestamp
                    .max(state_prices[state_prices.len() - 1].timestamp);
                let peak_level = levels.iter().copied().fold(f64::MIN, f64::max);

                let mut mandis: BTreeSet<String> = stock.iter().map(|s| s.mandi_id.clone()).collect();
                mandis.extend(state_prices.iter().map(|p| p.mandi_id.clone()));

                warn!(
                    "Cross-regional pattern: {} stock rising in {} while prices rise {:.1}% in {} (r = {:.2})",
                    commodity, accumulating, price_impact, affected, strength
                );
                patterns.push(StockpilingPattern {
                    commodity: stock[0].commodity.clone(),
                    variety: variety.map(str::to_string),
                    pattern_type: StockpilingPatternType::CrossRegional,
                    window_start,
                    window_end,
                    duration_days: (window_end - window_start).num_days() + 1,
                    baseline_level: levels[0],
                    peak_level,
                    peak_deviation_percentage: deviation_from(peak_level, levels[0]),
                    mean_deviation_percentage: deviation_from(mean(&levels), levels[0]),
                    accumulation_rate: stock_trend,
                    dips_tolerated: 0,
                    involved_mandis: mandis.into_iter().collect(),
                    involved_regions: vec![accumulating.to_string(), affected.to_string()],
                    total_accumulated_quantity: levels.iter().sum(),
                    price_impact_percentage: Some(price_impact),
                    severity: Severity::High,
                    confidence_score: strength,
                    pattern_indicators: vec![
                        format!("Inventory accumulation in {}", accumulating),
                        format!("Price increases in {}", affected),
                        format!("Cross-regional correlation: {:.2}", strength),
                    ],
                    detected_at: window_end,
                });
            }
        }
        patterns
    }

    /// The latest sample's month compared with the same calendar month in
    /// older history. Only accumulation above the seasonal norm is reported.
    pub fn detect_seasonal_unusual(
        &self,
        series: &InventorySeries<'_>,
        variety: Option<&str>,
    ) -> Vec<StockpilingPattern> {
        let latest = match series.samples.last() {
            Some(s) => s.timestamp,
            None => return Vec::new(),
        };
        let month = latest.month();
        let recent_cutoff = latest - Duration::days(SEASONAL_RECENT_DAYS);

        let (recent, history): (Vec<&InventorySample>, Vec<&InventorySample>) = series
            .samples
            .iter()
            .copied()
            .filter(|s| s.timestamp.month() == month)
            .partition(|s| s.timestamp >= recent_cutoff);
        if recent.is_empty() || history.len() < SEASONAL_MIN_HISTORY {
            return Vec::new();
        }

        let historical: Vec<f64> = history.iter().map(|s| s.inventory_level).collect();
        let current: Vec<f64> = recent.iter().map(|s| s.inventory_level).collect();
        let seasonal_baseline = mean(&historical);
        let current_average = mean(&current);
        let deviation = deviation_from(current_average, seasonal_baseline);
        if deviation < SEASONAL_UNUSUAL_PCT {
            return Vec::new();
        }

        let severity = if deviation >= SEASONAL_CRITICAL_PCT {
            Severity::Critical
        } else if deviation >= SEASONAL_HIGH_PCT {
            Severity::High
        } else {
            Severity::Medium
        };
        let peak_level = current.iter().copied().fold(f64::MIN, f64::max);
        let window_start = recent[0].timestamp;

        warn!(
            "Seasonal-unusual stockpiling: {} {:.1}% above the month {} norm of {:.0}",
            series.samples[0].commodity, deviation, month, seasonal_baseline
        );
        vec![StockpilingPattern {
            commodity: series.samples[0].commodity.clone(),
            variety: variety.map(str::to_string),
            pattern_type: StockpilingPatternType::SeasonalUnusual,
            window_start,
            window_end: latest,
            duration_days: (latest - window_start).num_days() + 1,
            baseline_level: seasonal_baseline,
            peak_level,
            peak_deviation_percentage: deviation_from(peak_level, seasonal_baseline),
            mean_deviation_percentage: deviation,
            accumulation_rate: deviation / SEASONAL_RECENT_DAYS as f64,
            dips_tolerated: 0,
            involved_mandis: mandi_ids(&recent),
            involved_regions: location_labels(&recent),
            total_accumulated_quantity: current.iter().sum(),
            price_impact_percentage: None,
            severity,
            confidence_score: (deviation / 100.0).clamp(0.1, 1.0),
            pattern_indicators: vec![
                format!("Unusual seasonal pattern detected for month {}", month),
                format!("Deviation from seasonal baseline: {:.1}%", deviation),
                format!("{} historical samples for this month", history.len()),
            ],
            detected_at: latest,
        }]
    }

    /// Magnitude sets the base level; twice and three times the minimum
    /// duration each add one.
    fn pattern_severity(&self, mean_deviation: f64, duration_days: i64) -> Severity {
        let bands = &self.config.inventory_severity;
        let magnitude = if mean_deviation >= bands.critical_pct {
            3
        } else if mean_deviation >= bands.high_pct {
            2
        } else {
            1
        };

        let threshold_days = self.config.stockpiling_threshold_days;
        let duration_bonus = if duration_days >= 3 * threshold_days {
            2
        } else if duration_days >= 2 * threshold_days {
            1
        } else {
            0
        };

        match (magnitude + duration_bonus).min(3) {
            3 => Severity::Critical,
            2 => Severity::High,
            _ => Severity::Medium,
        }
    }

    fn pattern_confidence(
        &self,
        duration_days: i64,
        mean_deviation: f64,
        qualifying: usize,
        total: usize,
    ) -> f64 {
        let full_duration = (2 * self.config.stockpiling_threshold_days).max(1) as f64;
        let duration = (duration_days as f64 / full_duration).min(1.0);
        let magnitude = (mean_deviation / 100.0).min(1.0);
        let consistency = if total == 0 { 0.0 } else { qualifying as f64 / total as f64 };

        let confidence = 0.4 * duration + 0.4 * magnitude + 0.2 * consistency;
        if confidence.is_nan() {
            return 0.1;
        }
        confidence.clamp(0.1, 1.0)
    }

    fn pattern_indicators(&self, pattern: &StockpilingPattern) -> Vec<String> {
        let mut indicators = vec![format!(
            "Inventory held above baseline for {} days",
            pattern.duration_days
        )];

        if pattern.involved_mandis.len() > 1 {
            indicators.push(format!(
                "Coordinated accumulation across {} mandis",
                pattern.involved_mandis.len()
            ));
        }
        if pattern.dips_tolerated > 0 {
            indicators.push("Accumulation resumed after a brief drawdown".to_string());
        }
        if pattern.accumulation_rate > 0.0 {
            indicators.push("Inventory still rising during the pattern".to_string());
        }
        if pattern.peak_deviation_percentage >= self.config.inventory_severity.critical_pct {
            indicators.push("Peak inventory far above pre-accumulation baseline".to_string());
        }

        indicators
    }
}

fn mandi_ids(samples: &[&InventorySample]) -> Vec<String> {
    samples
        .iter()
        .map(|s| s.mandi_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn location_labels(samples: &[&InventorySample]) -> Vec<String> {
    samples
        .iter()
        .map(|s| s.location.label())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Rate similarity, location count and rate magnitude, weighted 0.5/0.3/0.2.
fn coordination_confidence(locations: usize, rate_mean: f64, rate_sd: f64) -> f64 {
    let similarity = if rate_mean > 0.0 { 1.0 - rate_sd / rate_mean } else { 0.0 };
    let coverage = (locations as f64 / COORDINATION_FULL_LOCATIONS).min(1.0);
    let magnitude = (rate_mean / COORDINATION_FULL_RATE).min(1.0);

    let confidence = 0.5 * similarity + 0.3 * coverage + 0.2 * magnitude;
    if confidence.is_nan() {
        return 0.1;
    }
    confidence.clamp(0.1, 1.0)
}

/// Up to four points each for locations, thousands of units held and
/// tenths of a unit per day.
fn coordination_severity(locations: usize, total_quantity: f64, rate_per_day: f64) -> Severity {
    let score = (locations as f64).min(4.0)
        + (total_quantity / 1000.0).clamp(0.0, 4.0)
        + (rate_per_day * 10.0).clamp(0.0, 4.0);

    if score >= 10.0 {
        Severity::Critical
    } else if score >= 7.0 {
        Severity::High
    } else if score >= 4.0 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Pearson correlation of daily mean inventory against daily mean price
/// over the calendar days both series cover.
fn day_aligned_correlation(stock: &[&InventorySample], prices: &[&PriceSample]) -> f64 {
    let mut stock_days: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for s in stock {
        stock_days.entry(s.timestamp.date_naive()).or_default().push(s.inventory_level);
    }
    let mut price_days: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for p in prices {
        price_days.entry(p.timestamp.date_naive()).or_default().push(p.price);
    }

    let (xs, ys): (Vec<f64>, Vec<f64>) = stock_days
        .iter()
        .filter_map(|(day, levels)| price_days.get(day).map(|p| (mean(levels), mean(p))))
        .unzip();
    if xs.len() < CROSS_REGIONAL_MIN_SAMPLES {
        return 0.0;
    }
    correlation(&xs, &ys)
}
