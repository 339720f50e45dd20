// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/mandiwatch

//! Analysis module - statistics, trends, seasonality, supply/demand balance

pub mod balance;
pub mod policy;
pub mod seasonal;
pub mod statistics;
pub mod trend;

pub use balance::*;
pub use seasonal::*;
pub use statistics::{LinearTrend, SeriesDirection};
pub use trend::*;
