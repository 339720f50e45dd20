// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/mandiwatch

//! MandiWatch - Agricultural Market Analytics Core
//!
//! Turns raw mandi price and inventory observations into market intelligence:
//! - Price spike detection against a trailing moving average
//! - Inventory deviation and hoarding detection
//! - Stockpiling patterns: sustained, coordinated, cross-regional and seasonal
//! - Market manipulation alerts built from the combined evidence
//! - Supply/demand balance with price pressure and volatility risk
//! - Trend classification, volatility indicators and short-horizon predictions
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Analytics Service                       │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐   ┌─────────────────────┐   ┌────────────┐  │
//! │  │ MarketData │ → │  Detection Engine   │ → │   Record   │  │
//! │  │   Source   │   │ spike│stock│pile│rig  │   │   Store    │  │
//! │  └────────────┘   └─────────────────────┘   └────────────┘  │
//! │        ↓                     ↓                     ↑        │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │   Analysis: statistics │ trend │ seasonal │ balance   │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod analysis;
pub mod config;
pub mod detection;
pub mod error;
pub mod market;
pub mod service;
pub mod simulator;

// Re-exports for convenience
pub use analysis::{PriceTrendAnalyzer, SeasonalAnalyzer, SupplyDemandBalanceAnalyzer};
pub use config::Config;
pub use detection::{
    AnomalyDetectionEngine, DetectionReport, ManipulationAlert, MarketAnomaly, MarketSeries, Severity,
};
pub use error::{AnalyticsError, AnalyticsResult, ConfigError};
pub use market::{InventorySample, Location, PriceSample};
pub use service::{AnalyticsService, MarketDataSource, MarketKey, RecordStore};

/// MandiWatch version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// MandiWatch name
pub const NAME: &str = "MandiWatch";
