// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/mandiwatch

//! Configuration module

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::analysis::policy::{
    INVENTORY_CRITICAL_PCT, INVENTORY_HIGH_PCT, INVENTORY_THRESHOLD_PCT, PRICE_CRITICAL_PCT,
    PRICE_HIGH_PCT, PRICE_SPIKE_THRESHOLD_PCT,
};
use crate::error::ConfigError;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application name
    pub app_name: String,

    /// Application version
    pub version: String,

    /// Log level
    pub log_level: String,

    /// Anomaly detection thresholds
    pub detection: AnomalyDetectionConfig,

    /// Trend and prediction settings
    pub trend: TrendConfig,

    /// Detection result cache
    pub cache: CacheConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "MandiWatch".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: "info".to_string(),
            detection: AnomalyDetectionConfig::default(),
            trend: TrendConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::from)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::from)?;
        config.validate()?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::from)?;
        std::fs::write(path, content).map_err(ConfigError::from)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("mandiwatch"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.detection.validate()?;
        self.trend.validate()
    }
}

/// Severity cut-points above a detection threshold (percent deviation)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityBands {
    pub high_pct: f64,
    pub critical_pct: f64,
}

/// Anomaly detection thresholds, shared read-only by every detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyDetectionConfig {
    /// Minimum |deviation| from the moving average to flag a price
    pub price_spike_threshold_percentage: f64,

    /// Causal moving average window for prices, in samples
    pub moving_average_window_days: usize,

    /// Detectors return nothing below this many usable samples
    pub min_data_points: usize,

    /// |z| at or above this marks a move as statistically extreme
    pub z_score_threshold: f64,

    /// Minimum deviation above the inventory baseline to flag
    pub inventory_deviation_threshold_percentage: f64,

    /// Inventory baseline window, in samples
    pub inventory_baseline_window_days: usize,

    /// Calendar days a hoarding signal must persist to count as stockpiling
    pub stockpiling_threshold_days: i64,

    pub price_severity: SeverityBands,
    pub inventory_severity: SeverityBands,

    /// Minimum confidence for coordinated stockpiling to be reported
    pub pattern_confidence_threshold: f64,

    /// Look for several locations accumulating at the same rate
    pub coordination_detection_enabled: bool,

    /// Correlate stock build-up in one state with price rises in another
    pub cross_regional_analysis_enabled: bool,
}

impl Default for AnomalyDetectionConfig {
    fn default() -> Self {
        Self {
            price_spike_threshold_percentage: PRICE_SPIKE_THRESHOLD_PCT,
            moving_average_window_days: 30,
            min_data_points: 10,
            z_score_threshold: 2.5,
            inventory_deviation_threshold_percentage: INVENTORY_THRESHOLD_PCT,
            inventory_baseline_window_days: 7,
            stockpiling_threshold_days: 7,
            price_severity: SeverityBands {
                high_pct: PRICE_HIGH_PCT,
                critical_pct: PRICE_CRITICAL_PCT,
            },
            inventory_severity: SeverityBands {
                high_pct: INVENTORY_HIGH_PCT,
                critical_pct: INVENTORY_CRITICAL_PCT,
            },
            pattern_confidence_threshold: 0.75,
            coordination_detection_enabled: true,
            cross_regional_analysis_enabled: true,
        }
    }
}

fn check_range<T>(field: &'static str, value: T, min: T, max: T) -> Result<(), ConfigError>
where
    T: PartialOrd + std::fmt::Display,
{
    if value < min || value > max {
        return Err(ConfigError::Invalid {
            field,
            reason: format!("{} is outside {}..={}", value, min, max),
        });
    }
    Ok(())
}

/// Bands must sit at or above their detection threshold, high before critical.
fn check_bands(
    field: &'static str,
    threshold_field: &'static str,
    threshold: f64,
    bands: SeverityBands,
) -> Result<(), ConfigError> {
    if threshold > bands.high_pct {
        return Err(ConfigError::Invalid {
            field,
            reason: format!(
                "{}.high_pct ({}) is below {} ({}); raise {}.high_pct and {}.critical_pct together with the threshold",
                field, bands.high_pct, threshold_field, threshold, field, field
            ),
        });
    }
    if bands.high_pct > bands.critical_pct {
        return Err(ConfigError::Invalid {
            field,
            reason: format!(
                "{}.high_pct ({}) exceeds {}.critical_pct ({})",
                field, bands.high_pct, field, bands.critical_pct
            ),
        });
    }
    Ok(())
}

impl AnomalyDetectionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range(
            "price_spike_threshold_percentage",
            self.price_spike_threshold_percentage,
            5.0,
            100.0,
        )?;
        check_range("moving_average_window_days", self.moving_average_window_days, 7, 90)?;
        check_range("min_data_points", self.min_data_points, 5, 100)?;
        check_range("z_score_threshold", self.z_score_threshold, 1.0, 5.0)?;
        check_range(
            "inventory_deviation_threshold_percentage",
            self.inventory_deviation_threshold_percentage,
            10.0,
            100.0,
        )?;
        check_range("inventory_baseline_window_days", self.inventory_baseline_window_days, 2, 90)?;
        check_range("stockpiling_threshold_days", self.stockpiling_threshold_days, 3, 30)?;
        check_range("pattern_confidence_threshold", self.pattern_confidence_threshold, 0.5, 1.0)?;
        check_bands(
            "price_severity",
            "price_spike_threshold_percentage",
            self.price_spike_threshold_percentage,
            self.price_severity,
        )?;
        check_bands(
            "inventory_severity",
            "inventory_deviation_threshold_percentage",
            self.inventory_deviation_threshold_percentage,
            self.inventory_severity,
        )
    }
}

/// Trend and prediction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Points on each side of a candidate support/resistance extremum
    pub support_resistance_window: usize,

    pub analysis_period_days: u32,

    /// History used to fit a prediction
    pub prediction_history_days: u32,

    pub default_horizon_days: u32,

    /// EMA span for the price momentum factor
    pub ema_window: usize,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            support_resistance_window: 20,
            analysis_period_days: 30,
            prediction_history_days: 60,
            default_horizon_days: 7,
            ema_window: 12,
        }
    }
}

impl TrendConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("support_resistance_window", self.support_resistance_window, 1, 200)?;
        check_range("analysis_period_days", self.analysis_period_days, 1, 3650)?;
        check_range("prediction_history_days", self.prediction_history_days, 1, 3650)?;
        check_range("default_horizon_days", self.default_horizon_days, 1, 365)?;
        check_range("ema_window", self.ema_window, 2, 100)
    }
}

/// Detection result cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_secs: u64,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl_secs: 300,
            max_entries: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.detection.price_spike_threshold_percentage, 25.0);
        assert_eq!(config.detection.moving_average_window_days, 30);
        assert_eq!(config.detection.min_data_points, 10);
        assert_eq!(config.detection.stockpiling_threshold_days, 7);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut detection = AnomalyDetectionConfig::default();
        detection.min_data_points = 2;
        match detection.validate() {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "min_data_points"),
            other => panic!("unexpected: {:?}", other),
        }

        let mut detection = AnomalyDetectionConfig::default();
        detection.z_score_threshold = 7.5;
        assert!(detection.validate().is_err());
    }

    #[test]
    fn test_unordered_bands_rejected() {
        let mut detection = AnomalyDetectionConfig::default();
        detection.price_severity = SeverityBands {
            high_pct: 60.0,
            critical_pct: 40.0,
        };
        assert!(detection.validate().is_err());

        detection.price_severity = SeverityBands {
            high_pct: 20.0,
            critical_pct: 40.0,
        };
        assert!(detection.validate().is_err());
    }

    #[test]
    fn test_raised_threshold_names_the_bands() {
        let mut detection = AnomalyDetectionConfig::default();
        detection.price_spike_threshold_percentage = 40.0;
        match detection.validate() {
            Err(ConfigError::Invalid { field, reason }) => {
                assert_eq!(field, "price_severity");
                assert!(reason.contains("price_severity.high_pct (35)"));
                assert!(reason.contains("price_spike_threshold_percentage (40)"));
                assert!(reason.contains("price_severity.critical_pct together"));
            }
            other => panic!("unexpected: {:?}", other),
        }

        detection.price_severity = SeverityBands {
            high_pct: 45.0,
            critical_pct: 60.0,
        };
        assert!(detection.validate().is_ok());
    }

    #[test]
    fn test_pattern_confidence_range() {
        let mut detection = AnomalyDetectionConfig::default();
        assert_eq!(detection.pattern_confidence_threshold, 0.75);
        detection.pattern_confidence_threshold = 0.4;
        match detection.validate() {
            Err(ConfigError::Invalid { field, .. }) => {
                assert_eq!(field, "pattern_confidence_threshold")
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let created = Config::load_or_create(&path).unwrap();
        assert!(path.exists());

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.detection, created.detection);
        assert_eq!(loaded.trend, created.trend);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[detection]\nprice_spike_threshold_percentage = 30.0\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.detection.price_spike_threshold_percentage, 30.0);
        assert_eq!(config.detection.moving_average_window_days, 30);
        assert_eq!(config.cache, CacheConfig::default());
    }

    #[test]
    fn test_invalid_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[detection]\nmin_data_points = 1\n").unwrap();
        assert!(Config::load(&path).is_err());
    }
}
