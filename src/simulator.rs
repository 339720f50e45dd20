// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/mandiwatch

//! Synthetic mandi data for demos and tests
//!
//! Daily series with gaussian noise around a drifting base, plus injected
//! price spikes and hoarding windows. Seeded runs are reproducible.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use rand::prelude::*;
use rand_distr::{Normal, Uniform};

use crate::market::{InventorySample, Location, PriceSample};

/// Mandi the simulated samples are attributed to
#[derive(Debug, Clone)]
pub struct MandiSite {
    pub id: String,
    pub name: String,
    pub location: Location,
}

impl MandiSite {
    pub fn new(id: &str, name: &str, state: &str, district: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            location: Location::new(state, district),
        }
    }
}

impl Default for MandiSite {
    fn default() -> Self {
        Self::new("NSK-01", "Lasalgaon", "Maharashtra", Some("Nashik"))
    }
}

/// Disturbance injected into a simulated series
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarketEvent {
    /// Price on one day multiplied by `factor`
    PriceSpike { day: usize, factor: f64 },
    /// Inventory multiplied by `multiplier` for `days` from `start_day`
    Hoarding { start_day: usize, days: usize, multiplier: f64 },
}

#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub commodity: String,
    pub variety: Option<String>,
    pub start: DateTime<Utc>,
    pub days: usize,
    pub base_price: f64,
    pub price_drift_per_day: f64,
    pub price_noise_pct: f64,
    pub trade_quantity: f64,
    pub base_inventory: f64,
    pub inventory_growth_per_day: f64,
    pub inventory_noise_pct: f64,
    pub events: Vec<MarketEvent>,
}

impl SimulationPlan {
    pub fn new(commodity: &str, start: DateTime<Utc>, days: usize) -> Self {
        Self {
            commodity: commodity.to_string(),
            variety: None,
            start,
            days,
            base_price: 2000.0,
            price_drift_per_day: 0.0,
            price_noise_pct: 2.0,
            trade_quantity: 50.0,
            base_inventory: 1000.0,
            inventory_growth_per_day: 0.0,
            inventory_noise_pct: 2.0,
            events: Vec::new(),
        }
    }

    pub fn with_variety(mut self, variety: &str) -> Self {
        self.variety = Some(variety.to_string());
        self
    }

    pub fn with_event(mut self, event: MarketEvent) -> Self {
        self.events.push(event);
        self
    }

    fn price_factor(&self, day: usize) -> f64 {
        self.events
            .iter()
            .map(|e| match *e {
                MarketEvent::PriceSpike { day: d, factor } if d == day => factor,
                _ => 1.0,
            })
            .product()
    }

    fn inventory_factor(&self, day: usize) -> f64 {
        self.events
            .iter()
            .map(|e| match *e {
                MarketEvent::Hoarding { start_day, days, multiplier }
                    if day >= start_day && day < start_day + days =>
                {
                    multiplier
                }
                _ => 1.0,
            })
            .product()
    }
}

/// Generates price and inventory series for a [`SimulationPlan`]
pub struct MarketSimulator {
    site: MandiSite,
    rng: rand::rngs::StdRng,
}

impl MarketSimulator {
    pub fn new(seed: u64) -> Self {
        Self {
            site: MandiSite::default(),
            rng: rand::rngs::StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            site: MandiSite::default(),
            rng: rand::rngs::StdRng::from_entropy(),
        }
    }

    pub fn with_site(mut self, site: MandiSite) -> Self {
        self.site = site;
        self
    }

    pub fn site(&self) -> &MandiSite {
        &self.site
    }

    pub fn price_series(&mut self, plan: &SimulationPlan) -> Result<Vec<PriceSample>> {
        let noise = gaussian(plan.base_price * plan.price_noise_pct / 100.0)?;
        let quantity = (plan.trade_quantity > 0.0)
            .then(|| Uniform::new(0.5 * plan.trade_quantity, 1.5 * plan.trade_quantity));

        let mut samples = Vec::with_capacity(plan.days);
        for day in 0..plan.days {
            let base = plan.base_price + plan.price_drift_per_day * day as f64;
            let price = (base + self.rng.sample(noise)) * plan.price_factor(day);

            samples.push(PriceSample {
                commodity: plan.commodity.clone(),
                variety: plan.variety.clone(),
                price: price.max(1.0),
                quantity: quantity.map(|q| self.rng.sample(q)).unwrap_or(0.0),
                mandi_id: self.site.id.clone(),
                mandi_name: self.site.name.clone(),
                location: self.site.location.clone(),
                timestamp: plan.start + Duration::days(day as i64),
                confidence: 1.0,
            });
        }
        Ok(samples)
    }

    pub fn inventory_series(&mut self, plan: &SimulationPlan) -> Result<Vec<InventorySample>> {
        let noise = gaussian(plan.base_inventory * plan.inventory_noise_pct / 100.0)?;

        let mut samples = Vec::with_capacity(plan.days);
        for day in 0..plan.days {
            let base = plan.base_inventory + plan.inventory_growth_per_day * day as f64;
            let level = (base + self.rng.sample(noise)) * plan.inventory_factor(day);

            samples.push(InventorySample {
                commodity: plan.commodity.clone(),
                variety: plan.variety.clone(),
                inventory_level: level.max(0.0),
                mandi_id: self.site.id.clone(),
                mandi_name: self.site.name.clone(),
                location: self.site.location.clone(),
                // snapshots are taken before trading opens
                timestamp: plan.start + Duration::days(day as i64) - Duration::hours(2),
                storage_capacity: None,
            });
        }
        Ok(samples)
    }
}

fn gaussian(std_dev: f64) -> Result<Normal<f64>> {
    Normal::new(0.0, std_dev.max(0.0)).map_err(|e| anyhow!("invalid noise level {}: {}", std_dev, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn plan() -> SimulationPlan {
        SimulationPlan::new("Onion", Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap(), 40)
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let a = MarketSimulator::new(7).price_series(&plan()).unwrap();
        let b = MarketSimulator::new(7).price_series(&plan()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 40);
        assert!(a.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn test_noise_free_spike() {
        let mut plan = plan().with_event(MarketEvent::PriceSpike { day: 35, factor: 1.5 });
        plan.price_noise_pct = 0.0;

        let prices = MarketSimulator::new(1).price_series(&plan).unwrap();
        assert_eq!(prices[34].price, 2000.0);
        assert_eq!(prices[35].price, 3000.0);
        assert!(prices.iter().all(|p| p.quantity >= 25.0 && p.quantity < 75.0));
    }

    #[test]
    fn test_hoarding_window() {
        let mut plan = plan().with_event(MarketEvent::Hoarding {
            start_day: 10,
            days: 5,
            multiplier: 2.0,
        });
        plan.inventory_noise_pct = 0.0;
        plan.inventory_growth_per_day = 10.0;

        let stock = MarketSimulator::new(3).inventory_series(&plan).unwrap();
        assert_eq!(stock[9].inventory_level, 1090.0);
        assert_eq!(stock[10].inventory_level, 2200.0);
        assert_eq!(stock[14].inventory_level, 2280.0);
        assert_eq!(stock[15].inventory_level, 1150.0);
    }

    #[test]
    fn test_site_attribution() {
        let site = MandiSite::new("AZD", "Azadpur", "Delhi", None);
        let mut sim = MarketSimulator::new(9).with_site(site);
        let stock = sim.inventory_series(&plan()).unwrap();
        assert!(stock.iter().all(|s| s.mandi_id == "AZD" && s.location.state == "Delhi"));
        assert_eq!(sim.site().name, "Azadpur");
    }
}
