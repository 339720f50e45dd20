// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/mandiwatch

//! Market manipulation alerts built from the other detectors' findings
//!
//! Nothing here reads raw samples. Each rule combines anomalies, stockpiling
//! patterns and the supply/demand balance for one market into a
//! farmer-facing alert.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{InventoryAnomaly, PriceAnomaly, Severity, StockpilingPattern, StockpilingPatternType};
use crate::analysis::statistics::{coefficient_of_variation, mean};
use crate::analysis::{BalanceStatus, SupplyDemandBalance};
use crate::config::AnomalyDetectionConfig;

/// Price spikes at or above this deviation can indicate artificial scarcity
const SCARCITY_SPIKE_PCT: f64 = 30.0;
/// Available supply above this share of demand counts as adequate
const ADEQUATE_SUPPLY_FRACTION: f64 = 0.8;
/// Price fixing: mandis, time span and price dispersion
const PRICE_FIXING_MIN_MANDIS: usize = 3;
const PRICE_FIXING_WINDOW_HOURS: f64 = 6.0;
const PRICE_FIXING_MAX_COV: f64 = 0.05;
/// Supply restriction needs the ratio below this
const RESTRICTED_SUPPLY_RATIO: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManipulationType {
    ArtificialScarcity,
    Hoarding,
    PriceFixing,
    SupplyRestriction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManipulationAlert {
    pub commodity: String,
    pub variety: Option<String>,
    pub region: Option<String>,
    pub manipulation_type: ManipulationType,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub affected_regions: Vec<String>,
    pub estimated_impact: String,
    pub farmer_recommendations: Vec<String>,
    pub alternative_markets: Vec<String>,
    pub authority_actions: Vec<String>,
    pub confidence_score: f64,
    /// Findings the alert was built from
    pub price_anomalies: usize,
    pub inventory_anomalies: usize,
    pub stockpiling_patterns: usize,
    pub detected_at: DateTime<Utc>,
}

/// Everything the rules look at for one market
#[derive(Debug, Clone, Copy)]
pub struct ManipulationEvidence<'a> {
    pub price_anomalies: &'a [PriceAnomaly],
    pub inventory_anomalies: &'a [InventoryAnomaly],
    pub stockpiling_patterns: &'a [StockpilingPattern],
    /// Mandis whose latest stock sits far below their own recent level
    pub depleted_mandis: &'a [String],
    pub balance: &'a SupplyDemandBalance,
}

pub struct MarketManipulationDetector {
    config: Arc<AnomalyDetectionConfig>,
}

impl MarketManipulationDetector {
    pub fn new(config: Arc<AnomalyDetectionConfig>) -> Self {
        Self { config }
    }

    pub fn detect(
        &self,
        commodity: &str,
        variety: Option<&str>,
        region: Option<&str>,
        evidence: &ManipulationEvidence<'_>,
        as_of: DateTime<Utc>,
    ) -> Vec<ManipulationAlert> {
        let scope = AlertScope {
            commodity,
            variety,
            region,
            as_of,
        };

        let alerts: Vec<ManipulationAlert> = [
            self.artificial_scarcity(&scope, evidence),
            self.hoarding(&scope, evidence),
            self.price_fixing(&scope, evidence),
            self.supply_restriction(&scope, evidence),
        ]
        .into_iter()
        .flatten()
        .collect();

        info!(
            "Manipulation check for {}: {} alerts",
            commodity,
            alerts.len()
        );
        alerts
    }

    /// Large price spikes while supply is adequate and stock is being held back.
    fn artificial_scarcity(
        &self,
        scope: &AlertScope<'_>,
        evidence: &ManipulationEvidence<'_>,
    ) -> Option<ManipulationAlert> {
        let spikes: Vec<&PriceAnomaly> = evidence
            .price_anomalies
            .iter()
            .filter(|a| a.severity >= Severity::High && a.deviation_percentage > SCARCITY_SPIKE_PCT)
            .collect();
        let balance = evidence.balance;
        let supply_adequate = matches!(
            balance.balance_status,
            BalanceStatus::Balanced | BalanceStatus::Surplus
        ) && balance.available_supply > balance.estimated_demand * ADEQUATE_SUPPLY_FRACTION;

        if spikes.is_empty() || !supply_adequate || evidence.inventory_anomalies.is_empty() {
            return None;
        }

        let worst = spikes.iter().map(|a| a.deviation_percentage).fold(0.0, f64::max);
        let hoarding_mandis: HashSet<&str> = evidence
            .inventory_anomalies
            .iter()
            .map(|a| a.mandi_id.as_str())
            .collect();

        let alert = scope.alert(
            ManipulationType::ArtificialScarcity,
            Severity::High,
            format!("Artificial Scarcity Detected - {}", scope.commodity),
            format!(
                "Artificial scarcity detected for {} in {}. Despite adequate supply levels ({:.0} units), \
                 prices have spiked by up to {:.1}%. This appears to be caused by inventory hoarding across {} locations.",
                scope.commodity,
                scope.region_name(),
                balance.available_supply,
                worst,
                hoarding_mandis.len()
            ),
            format!("Price inflation of {:.1}%", worst),
            0.8,
        );
        warn!(
            "Artificial scarcity: {} spikes up to {:.1}% with {:?} supply",
            spikes.len(),
            worst,
            balance.balance_status
        );
        Some(ManipulationAlert {
            farmer_recommendations: strings(&[
                "Consider alternative markets with normal pricing",
                "Wait for market correction if possible",
                "Report suspicious pricing to authorities",
                "Form farmer groups for collective bargaining",
            ]),
            authority_actions: strings(&[
                "Investigate inventory hoarding patterns",
                "Monitor price movements closely",
                "Consider market intervention if needed",
                "Increase market transparency measures",
            ]),
            price_anomalies: spikes.len(),
            inventory_anomalies: evidence.inventory_anomalies.len(),
            ..alert
        })
    }

    /// Coordinated stockpiling serious enough to restrict supply.
    fn hoarding(
        &self,
        scope: &AlertScope<'_>,
        evidence: &ManipulationEvidence<'_>,
    ) -> Option<ManipulationAlert> {
        let coordinated: Vec<&StockpilingPattern> = evidence
            .stockpiling_patterns
            .iter()
            .filter(|p| p.pattern_type == StockpilingPatternType::Coordinated)
            .filter(|p| p.severity >= Severity::High)
            .collect();
        if coordinated.is_empty() {
            return None;
        }

        let total: f64 = coordinated.iter().map(|p| p.total_accumulated_quantity).sum();
        let locations: BTreeSet<String> = coordinated
            .iter()
            .flat_map(|p| p.involved_regions.iter().cloned())
            .collect();

        let alert = scope.alert(
            ManipulationType::Hoarding,
            Severity::Critical,
            format!("Coordinated Hoarding Detected - {}", scope.commodity),
            format!(
                "Coordinated hoarding detected for {} across {} locations. Total accumulated quantity: {:.0} units. \
                 This coordinated stockpiling may be artificially restricting supply to inflate prices.",
                scope.commodity,
                locations.len(),
                total
            ),
            format!("Supply restriction of {:.0} units", total),
            0.9,
        );
        warn!(
            "Coordinated hoarding: {:.0} units across {} locations",
            total,
            locations.len()
        );
        Some(ManipulationAlert {
            affected_regions: locations.into_iter().collect(),
            farmer_recommendations: strings(&[
                "Seek alternative buyers immediately",
                "Consider direct-to-consumer sales",
                "Report coordinated hoarding to authorities",
                "Form farmer cooperatives for better bargaining power",
            ]),
            authority_actions: strings(&[
                "Investigate coordinated hoarding network",
                "Consider releasing strategic reserves",
                "Implement anti-hoarding measures",
                "Monitor inventory movements closely",
            ]),
            stockpiling_patterns: coordinated.len(),
            ..alert
        })
    }

    /// Spikes at several mandis within hours of each other, at nearly the same price.
    fn price_fixing(
        &self,
        scope: &AlertScope<'_>,
        evidence: &ManipulationEvidence<'_>,
    ) -> Option<ManipulationAlert> {
        let anomalies = evidence.price_anomalies;
        let mandis: HashSet<&str> = anomalies.iter().map(|a| a.mandi_id.as_str()).collect();
        if anomalies.len() < PRICE_FIXING_MIN_MANDIS || mandis.len() < PRICE_FIXING_MIN_MANDIS {
            return None;
        }

        let first = anomalies.iter().map(|a| a.detected_at).min()?;
        let last = anomalies.iter().map(|a| a.detected_at).max()?;
        let span_hours = (last - first).num_seconds() as f64 / 3600.0;
        let prices: Vec<f64> = anomalies.iter().map(|a| a.current_price).collect();
        let dispersion = coefficient_of_variation(&prices);

        if span_hours > PRICE_FIXING_WINDOW_HOURS || dispersion >= PRICE_FIXING_MAX_COV {
            return None;
        }

        let alert = scope.alert(
            ManipulationType::PriceFixing,
            Severity::High,
            format!("Potential Price Fixing Detected - {}", scope.commodity),
            format!(
                "Potential price fixing detected for {} in {}. Synchronized price movements across {} mandis \
                 within {:.1} hours with unusually similar price levels (variation: {:.3}, average {:.2}).",
                scope.commodity,
                scope.region_name(),
                mandis.len(),
                span_hours,
                dispersion,
                mean(&prices)
            ),
            format!("Artificial price coordination across {} markets", mandis.len()),
            0.7,
        );
        warn!(
            "Possible price fixing: {} mandis within {:.1}h, CoV {:.3}",
            mandis.len(),
            span_hours,
            dispersion
        );
        Some(ManipulationAlert {
            farmer_recommendations: strings(&[
                "Seek markets outside the affected region",
                "Report suspicious price coordination",
                "Consider holding produce if possible",
                "Form farmer groups for collective action",
            ]),
            authority_actions: strings(&[
                "Investigate price coordination patterns",
                "Monitor trader communications",
                "Implement market surveillance measures",
                "Consider anti-trust enforcement",
            ]),
            price_anomalies: anomalies.len(),
            ..alert
        })
    }

    /// Stock drawn down at some mandis while the market is in deficit.
    fn supply_restriction(
        &self,
        scope: &AlertScope<'_>,
        evidence: &ManipulationEvidence<'_>,
    ) -> Option<ManipulationAlert> {
        let balance = evidence.balance;
        if evidence.depleted_mandis.is_empty()
            || balance.balance_status != BalanceStatus::Deficit
            || balance.supply_demand_ratio >= RESTRICTED_SUPPLY_RATIO
        {
            return None;
        }

        let alert = scope.alert(
            ManipulationType::SupplyRestriction,
            Severity::High,
            format!("Supply Restriction Detected - {}", scope.commodity),
            format!(
                "Supply restriction detected for {} in {}. Stock drawn down at least {:.0}% below normal \
                 at {} locations. Supply-demand ratio: {:.2}",
                scope.commodity,
                scope.region_name(),
                self.config.inventory_deviation_threshold_percentage,
                evidence.depleted_mandis.len(),
                balance.supply_demand_ratio
            ),
            format!("Supply shortage with ratio {:.2}", balance.supply_demand_ratio),
            0.8,
        );
        warn!(
            "Supply restriction: {} depleted mandis, ratio {:.2}",
            evidence.depleted_mandis.len(),
            balance.supply_demand_ratio
        );
        Some(ManipulationAlert {
            farmer_recommendations: strings(&[
                "Seek alternative markets immediately",
                "Consider emergency sales to avoid losses",
                "Report supply restrictions to authorities",
                "Coordinate with other farmers for collective action",
            ]),
            authority_actions: strings(&[
                "Investigate supply restriction practices",
                "Consider emergency market interventions",
                "Monitor inventory movements",
                "Implement supply chain transparency measures",
            ]),
            inventory_anomalies: evidence.depleted_mandis.len(),
            ..alert
        })
    }
}

struct AlertScope<'a> {
    commodity: &'a str,
    variety: Option<&'a str>,
    region: Option<&'a str>,
    as_of: DateTime<Utc>,
}

impl AlertScope<'_> {
    fn region_name(&self) -> &str {
        self.region.unwrap_or("all regions")
    }

    /// Alert skeleton; rules fill in advice and evidence counts.
    fn alert(
        &self,
        manipulation_type: ManipulationType,
        severity: Severity,
        title: String,
        message: String,
        estimated_impact: String,
        confidence_score: f64,
    ) -> ManipulationAlert {
        ManipulationAlert {
            commodity: self.commodity.to_string(),
            variety: self.variety.map(str::to_string),
            region: self.region.map(str::to_string),
            manipulation_type,
            severity,
            title,
            message,
            affected_regions: self.region.map(|r| vec![r.to_string()]).unwrap_or_default(),
            estimated_impact,
            farmer_recommendations: Vec::new(),
            alternative_markets: alternative_markets(self.commodity),
            authority_actions: Vec::new(),
            confidence_score,
            price_anomalies: 0,
            inventory_anomalies: 0,
            stockpiling_patterns: 0,
            detected_at: self.as_of,
        }
    }
}

fn alternative_markets(commodity: &str) -> Vec<String> {
    vec![
        format!("Online platform for {}", commodity),
        "Cooperative markets in neighboring districts".to_string(),
        "Direct-to-consumer sales channels".to_string(),
        format!("Export markets for {}", commodity),
        format!("Processing units requiring {}", commodity),
    ]
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
