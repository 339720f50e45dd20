// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/mandiwatch

//! Market sample types consumed by the analytics core

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Geographic location of a mandi
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl Location {
    pub fn new(state: &str, district: Option<&str>) -> Self {
        Self {
            state: state.to_string(),
            district: district.map(str::to_string),
            latitude: None,
            longitude: None,
        }
    }

    /// `State/District`, or just the state.
    pub fn label(&self) -> String {
        match &self.district {
            Some(district) => format!("{}/{}", self.state, district),
            None => self.state.clone(),
        }
    }

    /// Case-insensitive substring match against state or district.
    pub fn matches_region(&self, region: &str) -> bool {
        let region = region.to_lowercase();
        if self.state.to_lowercase().contains(&region) {
            return true;
        }
        self.district
            .as_deref()
            .map(|d| d.to_lowercase().contains(&region))
            .unwrap_or(false)
    }
}

/// One traded price observation at a mandi
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSample {
    pub commodity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variety: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub quantity: f64,
    pub mandi_id: String,
    pub mandi_name: String,
    pub location: Location,
    pub timestamp: DateTime<Utc>,
    /// Source confidence, carried through untouched
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

impl PriceSample {
    /// Non-positive or non-finite prices are skipped by every algorithm.
    pub fn is_valid(&self) -> bool {
        self.price.is_finite() && self.price > 0.0 && self.quantity.is_finite()
    }
}

/// One inventory snapshot at a mandi
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventorySample {
    pub commodity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variety: Option<String>,
    pub inventory_level: f64,
    pub mandi_id: String,
    pub mandi_name: String,
    pub location: Location,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_capacity: Option<f64>,
}

impl InventorySample {
    pub fn is_valid(&self) -> bool {
        self.inventory_level.is_finite() && self.inventory_level >= 0.0
    }
}

/// Production volume reported for a region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionSample {
    pub commodity: String,
    pub region: String,
    pub production_volume: f64,
    pub timestamp: DateTime<Utc>,
}

/// Consumption volume reported for a region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionSample {
    pub commodity: String,
    pub region: String,
    pub consumption_volume: f64,
    pub timestamp: DateTime<Utc>,
}

fn default_confidence() -> f64 {
    1.0
}

/// Anything placed on the analysis timeline
pub trait Timestamped {
    fn timestamp(&self) -> DateTime<Utc>;
}

impl Timestamped for PriceSample {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl Timestamped for InventorySample {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Commodity / variety selector shared by the detectors
pub trait CommodityScoped {
    fn commodity(&self) -> &str;
    fn variety(&self) -> Option<&str>;

    fn belongs_to(&self, commodity: &str, variety: Option<&str>) -> bool {
        if !self.commodity().eq_ignore_ascii_case(commodity) {
            return false;
        }
        match variety {
            Some(v) => self.variety().map(|own| own.eq_ignore_ascii_case(v)).unwrap_or(false),
            None => true,
        }
    }
}

impl CommodityScoped for PriceSample {
    fn commodity(&self) -> &str {
        &self.commodity
    }
    fn variety(&self) -> Option<&str> {
        self.variety.as_deref()
    }
}

impl CommodityScoped for InventorySample {
    fn commodity(&self) -> &str {
        &self.commodity
    }
    fn variety(&self) -> Option<&str> {
        self.variety.as_deref()
    }
}

/// True when timestamps never decrease.
pub fn is_chronological<T: Timestamped>(samples: &[T]) -> bool {
    samples.windows(2).all(|w| w[0].timestamp() <= w[1].timestamp())
}

/// Stable-sorts references by timestamp. Returns true if the input had to be
/// reordered, which is logged since the causal windows assume sorted input.
pub fn sort_chronologically<T: Timestamped>(samples: &mut [&T], series: &str) -> bool {
    let ordered = samples.windows(2).all(|w| w[0].timestamp() <= w[1].timestamp());
    if !ordered {
        warn!("{} series is out of timestamp order, sorting before analysis", series);
        samples.sort_by_key(|s| s.timestamp());
    }
    !ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn sample(day: i64, price: f64) -> PriceSample {
        PriceSample {
            commodity: "Wheat".to_string(),
            variety: Some("Sharbati".to_string()),
            price,
            quantity: 100.0,
            mandi_id: "M1".to_string(),
            mandi_name: "Indore".to_string(),
            location: Location::new("Madhya Pradesh", Some("Indore")),
            timestamp: Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap() + Duration::days(day),
            confidence: 0.9,
        }
    }

    #[test]
    fn test_region_matching() {
        let loc = Location::new("Madhya Pradesh", Some("Indore"));
        assert!(loc.matches_region("madhya"));
        assert!(loc.matches_region("INDORE"));
        assert!(!loc.matches_region("Punjab"));
    }

    #[test]
    fn test_commodity_scope() {
        let s = sample(0, 2000.0);
        assert!(s.belongs_to("wheat", None));
        assert!(s.belongs_to("wheat", Some("sharbati")));
        assert!(!s.belongs_to("wheat", Some("Lokwan")));
        assert!(!s.belongs_to("rice", None));
    }

    #[test]
    fn test_invalid_price_rejected() {
        assert!(sample(0, 2000.0).is_valid());
        assert!(!sample(0, 0.0).is_valid());
        assert!(!sample(0, -5.0).is_valid());
        assert!(!sample(0, f64::NAN).is_valid());
    }

    #[test]
    fn test_sort_chronologically_flags_reorder() {
        let a = sample(2, 1.0);
        let b = sample(0, 2.0);
        let c = sample(1, 3.0);
        let mut refs = vec![&a, &b, &c];
        assert!(sort_chronologically(&mut refs, "price"));
        let prices: Vec<f64> = refs.iter().map(|s| s.price).collect();
        assert_eq!(prices, vec![2.0, 3.0, 1.0]);

        let mut sorted = refs.clone();
        assert!(!sort_chronologically(&mut sorted, "price"));
        assert!(is_chronological(&[b.clone(), c.clone(), a.clone()]));
    }
}
