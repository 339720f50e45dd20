// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/mandiwatch

//! Seasonal calendar for Indian agricultural markets

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// Seasonal price regime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonalPattern {
    HarvestSeason,
    PostHarvest,
    PreHarvest,
    FestivalDemand,
    MonsoonImpact,
}

impl SeasonalPattern {
    pub fn as_str(self) -> &'static str {
        match self {
            SeasonalPattern::HarvestSeason => "harvest_season",
            SeasonalPattern::PostHarvest => "post_harvest",
            SeasonalPattern::PreHarvest => "pre_harvest",
            SeasonalPattern::FestivalDemand => "festival_demand",
            SeasonalPattern::MonsoonImpact => "monsoon_impact",
        }
    }
}

/// A festival demand window: `duration_days` from the first of `month`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FestivalWindow {
    pub name: &'static str,
    pub month: u32,
    pub duration_days: u32,
}

pub const FESTIVAL_WINDOWS: [FestivalWindow; 4] = [
    FestivalWindow { name: "Holi", month: 3, duration_days: 7 },
    FestivalWindow { name: "Eid", month: 5, duration_days: 5 },
    FestivalWindow { name: "Dussehra", month: 9, duration_days: 10 },
    FestivalWindow { name: "Diwali", month: 10, duration_days: 15 },
];

/// Monsoon months, inclusive
pub const MONSOON_MONTHS: (u32, u32) = (6, 9);
/// Kharif harvest month, once the monsoon is over
pub const HARVEST_MONTH: u32 = 10;
/// Post-harvest months: November through February
pub const POST_HARVEST_MONTHS: [u32; 4] = [11, 12, 1, 2];

/// Price multiplier per seasonal regime
pub const SEASONAL_MULTIPLIERS: [(SeasonalPattern, f64); 5] = [
    (SeasonalPattern::HarvestSeason, 0.85),
    (SeasonalPattern::PostHarvest, 0.90),
    (SeasonalPattern::PreHarvest, 1.15),
    (SeasonalPattern::FestivalDemand, 1.20),
    (SeasonalPattern::MonsoonImpact, 1.10),
];

/// Maps dates to seasonal regimes and price multipliers
#[derive(Debug, Clone, Copy, Default)]
pub struct SeasonalAnalyzer;

impl SeasonalAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Festival windows take precedence, then monsoon, harvest, post-harvest;
    /// everything else is pre-harvest. A festival window covers only its
    /// `duration_days` from the first of the month, so harvest and
    /// pre-harvest months stay reachable.
    pub fn identify_pattern(&self, date: DateTime<Utc>, _commodity: &str) -> SeasonalPattern {
        let month = date.month();
        let day = date.day();

        if FESTIVAL_WINDOWS
            .iter()
            .any(|f| f.month == month && day <= f.duration_days)
        {
            return SeasonalPattern::FestivalDemand;
        }

        if (MONSOON_MONTHS.0..=MONSOON_MONTHS.1).contains(&month) {
            return SeasonalPattern::MonsoonImpact;
        }

        if month == HARVEST_MONTH {
            return SeasonalPattern::HarvestSeason;
        }

        if POST_HARVEST_MONTHS.contains(&month) {
            return SeasonalPattern::PostHarvest;
        }

        SeasonalPattern::PreHarvest
    }

    /// The same table applies to every commodity.
    pub fn multiplier(&self, pattern: SeasonalPattern, _commodity: &str) -> f64 {
        SEASONAL_MULTIPLIERS
            .iter()
            .find(|(p, _)| *p == pattern)
            .map(|(_, m)| *m)
            .unwrap_or(1.0)
    }

    /// Multiplier for the regime in force on `date`.
    pub fn multiplier_for(&self, date: DateTime<Utc>, commodity: &str) -> (SeasonalPattern, f64) {
        let pattern = self.identify_pattern(date, commodity);
        (pattern, self.multiplier(pattern, commodity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn on(month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, month, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_every_regime_is_reachable() {
        let seasonal = SeasonalAnalyzer::new();
        assert_eq!(seasonal.identify_pattern(on(10, 5), "wheat"), SeasonalPattern::FestivalDemand);
        assert_eq!(seasonal.identify_pattern(on(7, 15), "wheat"), SeasonalPattern::MonsoonImpact);
        assert_eq!(seasonal.identify_pattern(on(10, 20), "wheat"), SeasonalPattern::HarvestSeason);
        assert_eq!(seasonal.identify_pattern(on(12, 1), "wheat"), SeasonalPattern::PostHarvest);
        assert_eq!(seasonal.identify_pattern(on(4, 10), "wheat"), SeasonalPattern::PreHarvest);
    }

    #[test]
    fn test_festival_overrides_monsoon() {
        let seasonal = SeasonalAnalyzer::new();
        assert_eq!(seasonal.identify_pattern(on(9, 3), "rice"), SeasonalPattern::FestivalDemand);
        assert_eq!(seasonal.identify_pattern(on(9, 11), "rice"), SeasonalPattern::MonsoonImpact);
        assert_eq!(seasonal.identify_pattern(on(3, 8), "rice"), SeasonalPattern::PreHarvest);
    }

    #[test]
    fn test_festival_window_ends_with_its_duration() {
        let seasonal = SeasonalAnalyzer::new();
        assert_eq!(seasonal.identify_pattern(on(10, 15), "onion"), SeasonalPattern::FestivalDemand);
        assert_eq!(seasonal.identify_pattern(on(10, 16), "onion"), SeasonalPattern::HarvestSeason);
        // Neighbouring months keep their own regime
        assert_eq!(seasonal.identify_pattern(on(11, 1), "onion"), SeasonalPattern::PostHarvest);
        assert_eq!(seasonal.identify_pattern(on(2, 28), "onion"), SeasonalPattern::PostHarvest);
        assert_eq!(seasonal.identify_pattern(on(4, 1), "onion"), SeasonalPattern::PreHarvest);
        assert_eq!(seasonal.identify_pattern(on(5, 6), "onion"), SeasonalPattern::PreHarvest);
    }

    #[test]
    fn test_multiplier_table() {
        let seasonal = SeasonalAnalyzer::new();
        assert_eq!(seasonal.multiplier(SeasonalPattern::HarvestSeason, "onion"), 0.85);
        assert_eq!(seasonal.multiplier(SeasonalPattern::PostHarvest, "onion"), 0.90);
        assert_eq!(seasonal.multiplier(SeasonalPattern::PreHarvest, "onion"), 1.15);
        assert_eq!(seasonal.multiplier(SeasonalPattern::FestivalDemand, "onion"), 1.20);
        assert_eq!(seasonal.multiplier(SeasonalPattern::MonsoonImpact, "onion"), 1.10);

        let (pattern, m) = seasonal.multiplier_for(on(1, 15), "onion");
        assert_eq!(pattern, SeasonalPattern::PostHarvest);
        assert_eq!(m, 0.90);
    }
}
