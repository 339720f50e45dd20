// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/mandiwatch

//! Error types

use thiserror::Error;

/// Errors surfaced by the analytics core.
///
/// Detectors never return these: "not enough history" and "nothing found"
/// are both an empty result. Only summary analyzers that must produce
/// exactly one record fail, and only when the series is too short.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    #[error("Insufficient data: {required} samples required, {actual} available")]
    InsufficientData { required: usize, actual: usize },
}

/// Why an analyzer fell back to a degraded record. Never leaves the crate.
#[derive(Error, Debug, Clone, PartialEq)]
pub(crate) enum DataGap {
    #[error("No usable {series} samples")]
    NoUsableSamples { series: &'static str },

    #[error("Non-finite value while computing {quantity}")]
    NonFinite { quantity: &'static str },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Configuration IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Configuration serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

pub type AnalyticsResult<T> = std::result::Result<T, AnalyticsError>;
