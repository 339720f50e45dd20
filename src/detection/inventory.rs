// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/mandiwatch

//! Inventory hoarding detection across mandis

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{severity_for, Severity};
use crate::analysis::policy::{STORAGE_PRESSURE_UTILISATION, TREND_DEAD_BAND_FRACTION};
use crate::analysis::statistics::{moving_average, series_direction, SeriesDirection};
use crate::config::AnomalyDetectionConfig;
use crate::market::{sort_chronologically, CommodityScoped, InventorySample};

/// Inventory held far above its recent baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryAnomaly {
    pub commodity: String,
    pub variety: Option<String>,
    pub mandi_id: String,
    pub mandi_name: String,
    pub region: String,
    pub current_inventory_level: f64,
    pub normal_inventory_level: f64,
    pub deviation_percentage: f64,
    pub concentration_ratio: f64,
    pub total_mandis_monitored: usize,
    pub trend_direction: SeriesDirection,
    pub accumulation_period_days: i64,
    pub severity: Severity,
    pub stockpiling_indicators: Vec<String>,
    pub detected_at: DateTime<Utc>,
}

/// Scoped, chronologically ordered inventory samples
#[derive(Debug, Clone)]
pub struct InventorySeries<'a> {
    pub samples: Vec<&'a InventorySample>,
    pub levels: Vec<f64>,
    pub reordered: bool,
}

impl<'a> InventorySeries<'a> {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Causal deviation of one sample from its baseline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviationPoint {
    pub timestamp: DateTime<Utc>,
    pub level: f64,
    /// `None` during baseline warm-up
    pub baseline: Option<f64>,
    pub deviation_percentage: Option<f64>,
}

/// Percent above `baseline`; 0 when the baseline is not positive.
pub fn deviation_from(level: f64, baseline: f64) -> f64 {
    if baseline <= 0.0 {
        return 0.0;
    }
    (level - baseline) / baseline * 100.0
}

pub struct InventoryAnomalyTracker {
    config: Arc<AnomalyDetectionConfig>,
}

impl InventoryAnomalyTracker {
    pub fn new(config: Arc<AnomalyDetectionConfig>) -> Self {
        Self { config }
    }

    /// Valid samples for the commodity, variety and region, oldest first.
    /// `None` below `min_data_points`.
    pub fn scoped_series<'a>(
        &self,
        samples: &'a [InventorySample],
        commodity: &str,
        variety: Option<&str>,
        region: Option<&str>,
    ) -> Option<InventorySeries<'a>> {
        let mut scoped: Vec<&InventorySample> = samples
            .iter()
            .filter(|s| s.belongs_to(commodity, variety))
            .filter(|s| region.map_or(true, |r| s.location.matches_region(r)))
            .filter(|s| {
                let valid = s.is_valid();
                if !valid {
                    debug!("Skipping invalid inventory level from {}", s.mandi_id);
                }
                valid
            })
            .collect();

        if scoped.len() < self.config.min_data_points {
            return None;
        }
        let reordered = sort_chronologically(&mut scoped, "inventory");
        let levels = scoped.iter().map(|s| s.inventory_level).collect();

        Some(InventorySeries {
            samples: scoped,
            levels,
            reordered,
        })
    }

    /// Deviation of every point from the causal baseline.
    ///
    /// The baseline is the trailing mean over all scoped mandis interleaved in
    /// time order, not a per-mandi mean. Mandis held at very different steady
    /// levels therefore deviate from each other's baseline; scope by region or
    /// mandi upstream when that matters.
    pub fn deviation_series(&self, series: &InventorySeries<'_>) -> Vec<DeviationPoint> {
        let window = self.config.inventory_baseline_window_days;
        series
            .samples
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let baseline = moving_average(&series.levels, i, window);
                DeviationPoint {
                    timestamp: s.timestamp,
                    level: s.inventory_level,
                    baseline,
                    deviation_percentage: baseline.map(|b| deviation_from(s.inventory_level, b)),
                }
            })
            .collect()
    }

    /// Mandis whose latest level sits at least the deviation threshold below
    /// the mean of their own preceding baseline window.
    pub fn depleted_mandis(&self, series: &InventorySeries<'_>) -> Vec<String> {
        let window = self.config.inventory_baseline_window_days;
        let threshold = self.config.inventory_deviation_threshold_percentage;

        let mut by_mandi: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for s in &series.samples {
            by_mandi.entry(s.mandi_id.as_str()).or_default().push(s.inventory_level);
        }

        by_mandi
            .into_iter()
            .filter_map(|(mandi, levels)| {
                let last = levels.len() - 1;
                let baseline = moving_average(&levels, last, window)?;
                (baseline > 0.0 && deviation_from(levels[last], baseline) <= -threshold)
                    .then(|| mandi.to_string())
            })
            .collect()
    }

    pub fn detect(
        &self,
        samples: &[InventorySample],
        commodity: &str,
        variety: Option<&str>,
        region: Option<&str>,
    ) -> Vec<InventoryAnomaly> {
        let series = match self.scoped_series(samples, commodity, variety, region) {
            Some(series) => series,
            None => return Vec::new(),
        };
        let cfg = &self.config;
        let window = cfg.inventory_baseline_window_days;
        let deviations = self.deviation_series(&series);

        let mut anomalies = Vec::new();
        let mut latest_by_mandi: HashMap<&str, f64> = HashMap::new();
        let mut run_start: Option<DateTime<Utc>> = None;

        for (i, (sample, point)) in series.samples.iter().zip(&deviations).enumerate() {
            latest_by_mandi.insert(sample.mandi_id.as_str(), sample.inventory_level);

            let (baseline, deviation_percentage) = match (point.baseline, point.deviation_percentage) {
                (Some(b), Some(d)) if d >= cfg.inventory_deviation_threshold_percentage => (b, d),
                _ => {
                    run_start = None;
                    continue;
                }
            };

            let start = *run_start.get_or_insert(sample.timestamp);
            let accumulation_period_days = (sample.timestamp - start).num_days() + 1;

            let trend_window = &series.levels[(i + 1).saturating_sub(window)..=i];
            let trend_direction = series_direction(trend_window, TREND_DEAD_BAND_FRACTION);

            let anomaly = InventoryAnomaly {
                commodity: sample.commodity.clone(),
                variety: sample.variety.clone(),
                mandi_id: sample.mandi_id.clone(),
                mandi_name: sample.mandi_name.clone(),
                region: sample.location.state.clone(),
                current_inventory_level: sample.inventory_level,
                normal_inventory_level: baseline,
                deviation_percentage,
                concentration_ratio: concentration_ratio(&latest_by_mandi),
                total_mandis_monitored: latest_by_mandi.len(),
                trend_direction,
                accumulation_period_days,
                severity: severity_for(
                    deviation_percentage,
                    cfg.inventory_deviation_threshold_percentage,
                    &cfg.inventory_severity,
                ),
                stockpiling_indicators: stockpiling_indicators(sample, deviation_percentage, trend_direction),
                detected_at: sample.timestamp,
            };

            warn!(
                "Inventory anomaly: {} at {} {:.0} vs normal {:.0} ({:+.1}%, {:?})",
                anomaly.commodity,
                anomaly.mandi_name,
                anomaly.current_inventory_level,
                anomaly.normal_inventory_level,
                anomaly.deviation_percentage,
                anomaly.severity
            );
            anomalies.push(anomaly);
        }

        anomalies
    }
}

/// Largest mandi's share of the latest known total. Zero total is 0.
pub fn concentration_ratio(latest_by_mandi: &HashMap<&str, f64>) -> f64 {
    let total: f64 = latest_by_mandi.values().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let largest = latest_by_mandi.values().copied().fold(0.0, f64::max);
    (largest / total).clamp(0.0, 1.0)
}

fn stockpiling_indicators(
    sample: &InventorySample,
    deviation_percentage: f64,
    trend: SeriesDirection,
) -> Vec<String> {
    let mut indicators = Vec::new();

    if deviation_percentage > 50.0 {
        indicators.push("Significantly above normal inventory levels".to_string());
    }

    if trend == SeriesDirection::Increasing {
        indicators.push("Consistent inventory accumulation pattern".to_string());
    }

    if let Some(capacity) = sample.storage_capacity {
        if sample.inventory_level > capacity * STORAGE_PRESSURE_UTILISATION {
            indicators.push("Near maximum storage capacity utilization".to_string());
        }
    }

    match sample.timestamp.month() {
        3..=5 => indicators.push("Unusual stockpiling during pre-harvest period".to_string()),
        10..=12 => {
            indicators.push("Extended storage beyond normal post-harvest period".to_string())
        }
        _ => {}
    }

    indicators
}
