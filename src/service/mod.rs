// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/mandiwatch

//! Service layer - fetches series from a data source, runs the analytics
//! core and hands derived records to a store.
//!
//! The core itself never does I/O. Detection runs on tokio's blocking pool.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::analysis::{
    BalanceInputs, MarketVolatilityIndicator, PricePrediction, PriceTrendAnalyzer,
    SupplyDemandBalance, SupplyDemandBalanceAnalyzer, TrendAnalysis,
};
use crate::config::Config;
use crate::error::ConfigError;
use crate::detection::{AnomalyDetectionEngine, DetectionReport, MarketAnomaly, MarketSeries};
use crate::market::{CommodityScoped, InventorySample, PriceSample};

/// Identifies the series a request is about
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarketKey {
    pub commodity: String,
    pub variety: Option<String>,
    pub region: Option<String>,
}

impl MarketKey {
    pub fn new(commodity: &str) -> Self {
        Self {
            commodity: commodity.to_string(),
            variety: None,
            region: None,
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
}

/// Where sample series come from
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn price_samples(&self, key: &MarketKey) -> Result<Vec<PriceSample>>;
    async fn inventory_samples(&self, key: &MarketKey) -> Result<Vec<InventorySample>>;
}

/// Any record the core derives
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "record_type", content = "record", rename_all = "snake_case")]
pub enum AnalyticsRecord {
    Anomaly(MarketAnomaly),
    Balance(SupplyDemandBalance),
    Trend(TrendAnalysis),
    Prediction(PricePrediction),
    Volatility(MarketVolatilityIndicator),
}

/// A derived record with the identity assigned on storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: Uuid,
    pub stored_at: DateTime<Utc>,
    pub record: AnalyticsRecord,
}

/// Where derived records go
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn save(&self, record: StoredRecord) -> Result<()>;
}

/// Fixed sample sets held in memory
#[derive(Debug, Default)]
pub struct InMemoryMarketData {
    prices: RwLock<Vec<PriceSample>>,
    inventory: RwLock<Vec<InventorySample>>,
}

impl InMemoryMarketData {
    pub fn new(prices: Vec<PriceSample>, inventory: Vec<InventorySample>) -> Self {
        Self {
            prices: RwLock::new(prices),
            inventory: RwLock::new(inventory),
        }
    }

    pub fn push_prices(&self, samples: impl IntoIterator<Item = PriceSample>) {
        self.prices.write().extend(samples);
    }

    pub fn push_inventory(&self, samples: impl IntoIterator<Item = InventorySample>) {
        self.inventory.write().extend(samples);
    }
}

#[async_trait]
impl MarketDataSource for InMemoryMarketData {
    async fn price_samples(&self, key: &MarketKey) -> Result<Vec<PriceSample>> {
        Ok(self
            .prices
            .read()
            .iter()
            .filter(|s| s.belongs_to(&key.commodity, key.variety.as_deref()))
            .cloned()
            .collect())
    }

    async fn inventory_samples(&self, key: &MarketKey) -> Result<Vec<InventorySample>> {
        Ok(self
            .inventory
            .read()
            .iter()
            .filter(|s| s.belongs_to(&key.commodity, key.variety.as_deref()))
            .cloned()
            .collect())
    }
}

/// Keeps every saved record in memory
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Mutex<Vec<StoredRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<StoredRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn save(&self, record: StoredRecord) -> Result<()> {
        self.records.lock().push(record);
        Ok(())
    }
}

/// Orchestrates fetch, analysis and storage
pub struct AnalyticsService {
    source: Arc<dyn MarketDataSource>,
    store: Arc<dyn RecordStore>,
    engine: Arc<AnomalyDetectionEngine>,
    trend: PriceTrendAnalyzer,
    balance: SupplyDemandBalanceAnalyzer,
    analysis_period_days: u32,
    default_horizon_days: u32,
}

impl AnalyticsService {
    /// Fails when the detection or trend settings are out of range.
    pub fn new(
        config: &Config,
        source: Arc<dyn MarketDataSource>,
        store: Arc<dyn RecordStore>,
    ) -> std::result::Result<Self, ConfigError> {
        config.trend.validate()?;
        let engine = AnomalyDetectionEngine::new(Arc::new(config.detection.clone()))?
            .with_cache(&config.cache);
        Ok(Self {
            source,
            store,
            engine: Arc::new(engine),
            trend: PriceTrendAnalyzer::new(config.trend.clone()),
            balance: SupplyDemandBalanceAnalyzer::new(),
            analysis_period_days: config.trend.analysis_period_days,
            default_horizon_days: config.trend.default_horizon_days,
        })
    }

    pub fn engine(&self) -> &AnomalyDetectionEngine {
        &self.engine
    }

    /// Run every detector and store each anomaly.
    pub async fn detect(&self, key: &MarketKey) -> Result<DetectionReport> {
        let series = MarketSeries {
            commodity: key.commodity.clone(),
            variety: key.variety.clone(),
            region: key.region.clone(),
            prices: self.source.price_samples(key).await?,
            inventory: self.source.inventory_samples(key).await?,
        };
        debug!(
            "Fetched {} prices and {} inventory samples for {}",
            series.prices.len(),
            series.inventory.len(),
            key.commodity
        );

        let engine = self.engine.clone();
        let report = tokio::task::spawn_blocking(move || engine.analyze(&series)).await?;

        for anomaly in &report.anomalies {
            self.persist(AnalyticsRecord::Anomaly(anomaly.clone())).await?;
        }
        info!(
            "Stored {} anomalies for {}",
            report.anomalies.len(),
            key.commodity
        );
        Ok(report)
    }

    pub async fn balance(&self, key: &MarketKey) -> Result<SupplyDemandBalance> {
        let prices = self.source.price_samples(key).await?;
        let inventory = self.source.inventory_samples(key).await?;

        let balance = self.balance.calculate(
            &key.commodity,
            key.variety.as_deref(),
            key.region.as_deref(),
            &BalanceInputs::new(&prices, &inventory),
        );
        self.persist(AnalyticsRecord::Balance(balance.clone())).await?;
        Ok(balance)
    }

    pub async fn trend(&self, key: &MarketKey, period_days: Option<u32>) -> Result<TrendAnalysis> {
        let prices = self.source.price_samples(key).await?;
        let trend = self.trend.analyze_trend(
            &key.commodity,
            key.region.as_deref(),
            &prices,
            period_days.unwrap_or(self.analysis_period_days),
        )?;
        self.persist(AnalyticsRecord::Trend(trend.clone())).await?;
        Ok(trend)
    }

    pub async fn predict(&self, key: &MarketKey, horizon_days: Option<u32>) -> Result<PricePrediction> {
        let prices = self.source.price_samples(key).await?;
        let prediction = self.trend.predict(
            &key.commodity,
            key.region.as_deref(),
            &prices,
            horizon_days.unwrap_or(self.default_horizon_days),
        )?;
        self.persist(AnalyticsRecord::Prediction(prediction.clone())).await?;
        Ok(prediction)
    }

    pub async fn volatility(
        &self,
        key: &MarketKey,
        period_days: Option<u32>,
    ) -> Result<MarketVolatilityIndicator> {
        let prices = self.source.price_samples(key).await?;
        let indicator = self.trend.volatility_indicator(
            &key.commodity,
            key.region.as_deref(),
            &prices,
            period_days.unwrap_or(self.analysis_period_days),
        )?;
        self.persist(AnalyticsRecord::Volatility(indicator.clone())).await?;
        Ok(indicator)
    }

    async fn persist(&self, record: AnalyticsRecord) -> Result<()> {
        self.store
            .save(StoredRecord {
                id: Uuid::new_v4(),
                stored_at: Utc::now(),
                record,
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::BalanceStatus;
    use crate::error::AnalyticsError;
    use crate::market::Location;
    use chrono::{Duration, TimeZone};

    fn price(day: i64, price: f64) -> PriceSample {
        PriceSample {
            commodity: "Rice".to_string(),
            variety: Some("Basmati".to_string()),
            price,
            quantity: 60.0,
            mandi_id: "AMR".to_string(),
            mandi_name: "Amritsar".to_string(),
            location: Location::new("Punjab", Some("Amritsar")),
            timestamp: Utc.with_ymd_and_hms(2026, 5, 1, 10, 0, 0).unwrap() + Duration::days(day),
            confidence: 1.0,
        }
    }

    fn stock(day: i64, level: f64) -> InventorySample {
        InventorySample {
            commodity: "Rice".to_string(),
            variety: Some("Basmati".to_string()),
            inventory_level: level,
            mandi_id: "AMR".to_string(),
            mandi_name: "Amritsar".to_string(),
            location: Location::new("Punjab", Some("Amritsar")),
            timestamp: Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap() + Duration::days(day),
            storage_capacity: None,
        }
    }

    fn service(source: InMemoryMarketData) -> (AnalyticsService, Arc<MemoryRecordStore>) {
        let store = Arc::new(MemoryRecordStore::new());
        let service = AnalyticsService::new(&Config::default(), Arc::new(source), store.clone()).unwrap();
        (service, store)
    }

    fn spiking_market() -> InMemoryMarketData {
        let mut prices: Vec<_> = (0..30).map(|d| price(d, 4000.0)).collect();
        prices.push(price(30, 6000.0));
        let inventory = (0..31).map(|d| stock(d, 5000.0)).collect();
        InMemoryMarketData::new(prices, inventory)
    }

    #[tokio::test]
    async fn test_detect_stores_anomalies() {
        let (service, store) = service(spiking_market());
        let report = service.detect(&MarketKey::new("rice")).await.unwrap();

        assert_eq!(report.statistics.price_spikes, 1);
        assert_eq!(store.len(), 1);
        match &store.records()[0].record {
            AnalyticsRecord::Anomaly(MarketAnomaly::Price(a)) => assert_eq!(a.current_price, 6000.0),
            other => panic!("unexpected record: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_balance_and_trend_records() {
        let (service, store) = service(spiking_market());
        let key = MarketKey::new("rice").with_variety("basmati").with_region("punjab");

        let balance = service.balance(&key).await.unwrap();
        assert_ne!(balance.balance_status, BalanceStatus::Unknown);

        let trend = service.trend(&key, None).await.unwrap();
        assert_eq!(trend.commodity, "rice");

        let prediction = service.predict(&key, Some(5)).await.unwrap();
        assert_eq!(prediction.horizon_days, 5);

        let volatility = service.volatility(&key, Some(30)).await.unwrap();
        assert_eq!(volatility.measurement_period_days, 30);

        let records = store.records();
        assert_eq!(records.len(), 4);
        assert_ne!(records[0].id, records[1].id);
    }

    #[tokio::test]
    async fn test_short_history_surfaces_error() {
        let source = InMemoryMarketData::new((0..3).map(|d| price(d, 4000.0)).collect(), Vec::new());
        let (service, store) = service(source);

        let err = service.trend(&MarketKey::new("rice"), None).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<AnalyticsError>(),
            Some(&AnalyticsError::InsufficientData { required: 5, actual: 3 })
        );
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_source_can_grow() {
        let source = InMemoryMarketData::default();
        source.push_prices((0..10).map(|d| price(d, 4000.0)));
        source.push_inventory((0..10).map(|d| stock(d, 100.0)));

        let key = MarketKey::new("rice");
        assert_eq!(source.price_samples(&key).await.unwrap().len(), 10);
        assert_eq!(source.inventory_samples(&key).await.unwrap().len(), 10);
        assert!(source.price_samples(&MarketKey::new("wheat")).await.unwrap().is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = Config::default();
        config.trend.ema_window = 0;
        let result = AnalyticsService::new(
            &config,
            Arc::new(InMemoryMarketData::default()),
            Arc::new(MemoryRecordStore::new()),
        );
        assert!(matches!(result, Err(ConfigError::Invalid { field: "ema_window", .. })));
    }
}
