// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/mandiwatch

//! Detection module - price spikes, inventory hoarding, stockpiling and
//! market manipulation

mod cache;
mod inventory;
mod manipulation;
mod price_spike;
mod stockpiling;

pub use cache::*;
pub use inventory::*;
pub use manipulation::*;
pub use price_spike::*;
pub use stockpiling::*;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::analysis::{BalanceInputs, SupplyDemandBalanceAnalyzer};
use crate::config::{AnomalyDetectionConfig, CacheConfig, SeverityBands};
use crate::error::ConfigError;
use crate::market::{is_chronological, InventorySample, PriceSample};

/// Severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// Band a deviation magnitude: below `threshold` is low, then medium up to
/// the high and critical cut-points.
pub fn severity_for(deviation_pct: f64, threshold: f64, bands: &SeverityBands) -> Severity {
    if deviation_pct >= bands.critical_pct {
        Severity::Critical
    } else if deviation_pct >= bands.high_pct {
        Severity::High
    } else if deviation_pct >= threshold {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// One commodity / variety / region worth of market data
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketSeries {
    pub commodity: String,
    #[serde(default)]
    pub variety: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub prices: Vec<PriceSample>,
    #[serde(default)]
    pub inventory: Vec<InventorySample>,
}

impl MarketSeries {
    pub fn new(commodity: &str) -> Self {
        Self {
            commodity: commodity.to_string(),
            ..Default::default()
        }
    }

    pub fn with_variety(mut self, variety: &str) -> Self {
        self.variety = Some(variety.to_string());
        self
    }

    pub fn with_region(mut self, region: &str) -> Self {
        self.region = Some(region.to_string());
        self
    }

    pub fn with_prices(mut self, prices: Vec<PriceSample>) -> Self {
        self.prices = prices;
        self
    }

    pub fn with_inventory(mut self, inventory: Vec<InventorySample>) -> Self {
        self.inventory = inventory;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    PriceSpike,
    InventoryAnomaly,
    StockpilingPattern,
    MarketManipulation,
}

/// Any detector finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarketAnomaly {
    #[serde(rename = "price_spike")]
    Price(PriceAnomaly),
    #[serde(rename = "inventory_anomaly")]
    Inventory(InventoryAnomaly),
    #[serde(rename = "stockpiling_pattern")]
    Stockpiling(StockpilingPattern),
    #[serde(rename = "market_manipulation")]
    Manipulation(ManipulationAlert),
}

impl MarketAnomaly {
    pub fn kind(&self) -> AnomalyKind {
        match self {
            MarketAnomaly::Price(_) => AnomalyKind::PriceSpike,
            MarketAnomaly::Inventory(_) => AnomalyKind::InventoryAnomaly,
            MarketAnomaly::Stockpiling(_) => AnomalyKind::StockpilingPattern,
            MarketAnomaly::Manipulation(_) => AnomalyKind::MarketManipulation,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            MarketAnomaly::Price(a) => a.severity,
            MarketAnomaly::Inventory(a) => a.severity,
            MarketAnomaly::Stockpiling(p) => p.severity,
            MarketAnomaly::Manipulation(m) => m.severity,
        }
    }

    pub fn detected_at(&self) -> DateTime<Utc> {
        match self {
            MarketAnomaly::Price(a) => a.detected_at,
            MarketAnomaly::Inventory(a) => a.detected_at,
            MarketAnomaly::Stockpiling(p) => p.detected_at,
            MarketAnomaly::Manipulation(m) => m.detected_at,
        }
    }

    pub fn commodity(&self) -> &str {
        match self {
            MarketAnomaly::Price(a) => &a.commodity,
            MarketAnomaly::Inventory(a) => &a.commodity,
            MarketAnomaly::Stockpiling(p) => &p.commodity,
            MarketAnomaly::Manipulation(m) => &m.commodity,
        }
    }
}

/// Counts per detector and per severity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionStatistics {
    pub total: usize,
    pub price_spikes: usize,
    pub inventory_anomalies: usize,
    pub stockpiling_patterns: usize,
    pub manipulation_alerts: usize,
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub critical: usize,
    pub highest_severity: Option<Severity>,
}

impl DetectionStatistics {
    pub fn from_anomalies(anomalies: &[MarketAnomaly]) -> Self {
        let mut stats = Self::default();
        for anomaly in anomalies {
            stats.total += 1;
            match anomaly.kind() {
                AnomalyKind::PriceSpike => stats.price_spikes += 1,
                AnomalyKind::InventoryAnomaly => stats.inventory_anomalies += 1,
                AnomalyKind::StockpilingPattern => stats.stockpiling_patterns += 1,
                AnomalyKind::MarketManipulation => stats.manipulation_alerts += 1,
            }
            match anomaly.severity() {
                Severity::Low => stats.low += 1,
                Severity::Medium => stats.medium += 1,
                Severity::High => stats.high += 1,
                Severity::Critical => stats.critical += 1,
            }
        }
        stats.highest_severity = anomalies.iter().map(MarketAnomaly::severity).max();
        stats
    }
}

/// Combined result of one engine pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionReport {
    pub commodity: String,
    pub variety: Option<String>,
    pub region: Option<String>,
    pub anomalies: Vec<MarketAnomaly>,
    pub statistics: DetectionStatistics,
    /// Input arrived out of timestamp order and was sorted
    pub input_reordered: bool,
    pub generated_at: DateTime<Utc>,
}

/// Runs every detector over one market series
pub struct AnomalyDetectionEngine {
    config: Arc<AnomalyDetectionConfig>,
    price_detector: PriceSpikeDetector,
    inventory_tracker: InventoryAnomalyTracker,
    stockpiling_detector: StockpilingPatternDetector,
    manipulation_detector: MarketManipulationDetector,
    balance: SupplyDemandBalanceAnalyzer,
    cache: Option<DetectionCache>,
}

impl AnomalyDetectionEngine {
    /// Validate `config` and build every detector over it.
    pub fn new(config: Arc<AnomalyDetectionConfig>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            price_detector: PriceSpikeDetector::new(config.clone()),
            inventory_tracker: InventoryAnomalyTracker::new(config.clone()),
            stockpiling_detector: StockpilingPatternDetector::new(config.clone()),
            manipulation_detector: MarketManipulationDetector::new(config.clone()),
            balance: SupplyDemandBalanceAnalyzer::new(),
            config,
            cache: None,
        })
    }

    /// Enable the report cache when the config asks for it.
    pub fn with_cache(mut self, cache: &CacheConfig) -> Self {
        self.cache = cache.enabled.then(|| DetectionCache::new(cache));
        self
    }

    pub fn config(&self) -> &AnomalyDetectionConfig {
        &self.config
    }

    pub fn cache(&self) -> Option<&DetectionCache> {
        self.cache.as_ref()
    }

    pub fn analyze(&self, series: &MarketSeries) -> DetectionReport {
        let key = self.cache.as_ref().map(|_| CacheKey::for_series(series));
        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            if let Some(report) = cache.get(key) {
                debug!("Cache hit for {}", series.commodity);
                return report;
            }
        }

        let commodity = series.commodity.as_str();
        let variety = series.variety.as_deref();
        let region = series.region.as_deref();

        let spikes = self.price_detector.detect(&series.prices, commodity, variety, region);
        let hoards = self
            .inventory_tracker
            .detect(&series.inventory, commodity, variety, region);
        let patterns = self.stockpiling_detector.detect(
            &series.inventory,
            &series.prices,
            commodity,
            variety,
            region,
        );
        let alerts = self.manipulation_alerts(series, &spikes, &hoards, &patterns);

        let mut anomalies: Vec<MarketAnomaly> = Vec::new();
        anomalies.extend(spikes.into_iter().map(MarketAnomaly::Price));
        anomalies.extend(hoards.into_iter().map(MarketAnomaly::Inventory));
        anomalies.extend(patterns.into_iter().map(MarketAnomaly::Stockpiling));
        anomalies.extend(alerts.into_iter().map(MarketAnomaly::Manipulation));
        anomalies.sort_by_key(MarketAnomaly::detected_at);

        let statistics = DetectionStatistics::from_anomalies(&anomalies);
        let input_reordered =
            !is_chronological(&series.prices) || !is_chronological(&series.inventory);

        info!(
            "Analyzed {}: {} price spikes, {} inventory anomalies, {} stockpiling patterns, {} manipulation alerts",
            commodity,
            statistics.price_spikes,
            statistics.inventory_anomalies,
            statistics.stockpiling_patterns,
            statistics.manipulation_alerts
        );

        let report = DetectionReport {
            commodity: series.commodity.clone(),
            variety: series.variety.clone(),
            region: series.region.clone(),
            anomalies,
            statistics,
            input_reordered,
            generated_at: Utc::now(),
        };

        if let (Some(cache), Some(key)) = (&self.cache, key) {
            cache.insert(key, report.clone());
        }
        report
    }

    /// Manipulation rules over this pass's findings, with the balance taken at
    /// the latest sample.
    fn manipulation_alerts(
        &self,
        series: &MarketSeries,
        spikes: &[PriceAnomaly],
        hoards: &[InventoryAnomaly],
        patterns: &[StockpilingPattern],
    ) -> Vec<ManipulationAlert> {
        let commodity = series.commodity.as_str();
        let variety = series.variety.as_deref();
        let region = series.region.as_deref();

        let as_of = series
            .prices
            .iter()
            .map(|p| p.timestamp)
            .chain(series.inventory.iter().map(|s| s.timestamp))
            .max()
            .unwrap_or_else(Utc::now);
        let balance = self.balance.calculate_at(
            commodity,
            variety,
            region,
            &BalanceInputs::new(&series.prices, &series.inventory),
            as_of,
        );
        let depleted = self
            .inventory_tracker
            .scoped_series(&series.inventory, commodity, variety, region)
            .map(|s| self.inventory_tracker.depleted_mandis(&s))
            .unwrap_or_default();

        let evidence = ManipulationEvidence {
            price_anomalies: spikes,
            inventory_anomalies: hoards,
            stockpiling_patterns: patterns,
            depleted_mandis: &depleted,
            balance: &balance,
        };
        self.manipulation_detector
            .detect(commodity, variety, region, &evidence, as_of)
    }

    /// Analyze independent series in parallel. Output order follows input.
    pub fn analyze_batch(&self, batch: &[MarketSeries]) -> Vec<DetectionReport> {
        batch.par_iter().map(|series| self.analyze(series)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::Location;
    use chrono::{Duration, TimeZone};

    fn prices(values: &[f64]) -> Vec<PriceSample> {
        let start = Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &price)| PriceSample {
                commodity: "Wheat".to_string(),
                variety: None,
                price,
                quantity: 100.0,
                mandi_id: "KNL".to_string(),
                mandi_name: "Karnal".to_string(),
                location: Location::new("Haryana", Some("Karnal")),
                timestamp: start + Duration::days(i as i64),
                confidence: 1.0,
            })
            .collect()
    }

    fn inventory(levels: &[f64]) -> Vec<InventorySample> {
        let start = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();
        levels
            .iter()
            .enumerate()
            .map(|(i, &level)| InventorySample {
                commodity: "Wheat".to_string(),
                variety: None,
                inventory_level: level,
                mandi_id: "KNL".to_string(),
                mandi_name: "Karnal".to_string(),
                location: Location::new("Haryana", Some("Karnal")),
                timestamp: start + Duration::days(i as i64),
                storage_capacity: None,
            })
            .collect()
    }

    fn engine() -> AnomalyDetectionEngine {
        AnomalyDetectionEngine::new(Arc::new(AnomalyDetectionConfig::default())).unwrap()
    }

    fn market() -> MarketSeries {
        let mut price_values = vec![2000.0; 30];
        price_values.push(2800.0);
        let mut levels = vec![1000.0; 10];
        levels.extend([2000.0; 12]);
        MarketSeries::new("wheat")
            .with_prices(prices(&price_values))
            .with_inventory(inventory(&levels))
    }

    #[test]
    fn test_severity_bands() {
        let bands = SeverityBands {
            high_pct: 35.0,
            critical_pct: 50.0,
        };
        assert_eq!(severity_for(10.0, 25.0, &bands), Severity::Low);
        assert_eq!(severity_for(25.0, 25.0, &bands), Severity::Medium);
        assert_eq!(severity_for(35.0, 25.0, &bands), Severity::High);
        assert_eq!(severity_for(49.9, 25.0, &bands), Severity::High);
        assert_eq!(severity_for(50.0, 25.0, &bands), Severity::Critical);
        assert!(Severity::Critical > Severity::Low);
    }

    #[test]
    fn test_engine_combines_detectors() {
        let report = engine().analyze(&market());
        let stats = &report.statistics;

        assert_eq!(stats.price_spikes, 1);
        assert!(stats.inventory_anomalies >= 1);
        assert_eq!(stats.stockpiling_patterns, 1);
        // 40% spike with ample stock held above baseline
        assert_eq!(stats.manipulation_alerts, 1);
        assert_eq!(stats.total, report.anomalies.len());
        assert_eq!(stats.highest_severity, Some(Severity::Critical));
        assert!(!report.input_reordered);

        let times: Vec<_> = report.anomalies.iter().map(MarketAnomaly::detected_at).collect();
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_out_of_order_input_is_flagged() {
        let mut series = market();
        series.prices.reverse();
        let report = engine().analyze(&series);
        assert!(report.input_reordered);
        assert_eq!(report.statistics.price_spikes, 1);
    }

    #[test]
    fn test_empty_series() {
        let report = engine().analyze(&MarketSeries::new("wheat"));
        assert!(report.anomalies.is_empty());
        assert_eq!(report.statistics, DetectionStatistics::default());
    }

    #[test]
    fn test_batch_preserves_order() {
        let batch = vec![market(), MarketSeries::new("rice"), market().with_region("punjab")];
        let reports = engine().analyze_batch(&batch);

        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].statistics.price_spikes, 1);
        assert!(reports[1].anomalies.is_empty());
        assert_eq!(reports[2].region.as_deref(), Some("punjab"));
        assert!(reports[2].anomalies.is_empty());
    }

    #[test]
    fn test_region_scopes_every_detector() {
        let elsewhere = engine().analyze(&market().with_region("punjab"));
        assert_eq!(elsewhere.statistics.price_spikes, 0);
        assert_eq!(elsewhere.statistics.inventory_anomalies, 0);
        assert_eq!(elsewhere.statistics.stockpiling_patterns, 0);
        assert_eq!(elsewhere.statistics.manipulation_alerts, 0);

        let karnal = engine().analyze(&market().with_region("karnal"));
        assert_eq!(karnal.statistics.price_spikes, 1);
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let mut config = AnomalyDetectionConfig::default();
        config.price_severity = SeverityBands {
            high_pct: 60.0,
            critical_pct: 40.0,
        };
        match AnomalyDetectionEngine::new(Arc::new(config)) {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "price_severity"),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("unordered bands accepted"),
        }
    }

    #[test]
    fn test_synchronized_spikes_raise_price_fixing() {
        let start = Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap();
        let mut samples = Vec::new();
        for (k, mandi) in ["KNL", "PNP", "SNP"].iter().enumerate() {
            for d in 0..31 {
                let mut sample = prices(&[if d == 30 { 2800.0 } else { 2000.0 }]).remove(0);
                sample.mandi_id = mandi.to_string();
                sample.timestamp = start + Duration::days(d) + Duration::hours(k as i64);
                samples.push(sample);
            }
        }

        let report = engine().analyze(&MarketSeries::new("wheat").with_prices(samples));
        assert_eq!(report.statistics.price_spikes, 3);
        let fixing: Vec<_> = report
            .anomalies
            .iter()
            .filter_map(|a| match a {
                MarketAnomaly::Manipulation(m) => Some(m),
                _ => None,
            })
            .collect();
        assert_eq!(fixing.len(), 1);
        assert_eq!(fixing[0].manipulation_type, ManipulationType::PriceFixing);

        let json = serde_json::to_value(&report.anomalies[report.anomalies.len() - 1]).unwrap();
        assert_eq!(json.get("kind").and_then(|k| k.as_str()), Some("market_manipulation"));
    }

    #[test]
    fn test_cached_report_reused() {
        let engine = engine().with_cache(&CacheConfig {
            enabled: true,
            ..CacheConfig::default()
        });
        let first = engine.analyze(&market());
        let second = engine.analyze(&market());
        assert_eq!(first.generated_at, second.generated_at);
        assert_eq!(engine.cache().map(DetectionCache::len), Some(1));
    }

    #[test]
    fn test_anomaly_serializes_with_kind_tag() {
        let report = engine().analyze(&market());
        let json = serde_json::to_value(&report.anomalies[0]).unwrap();
        assert!(json.get("kind").is_some());
        assert!(json.get("severity").and_then(|s| s.as_str()).is_some());
    }
}
