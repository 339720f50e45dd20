// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/mandiwatch

//! Best-effort read-through cache for detection reports

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::{DetectionReport, MarketSeries};
use crate::config::CacheConfig;

/// (commodity, variety, region, window) identity of a request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    commodity: String,
    variety: Option<String>,
    region: Option<String>,
    window_start: Option<DateTime<Utc>>,
    window_end: Option<DateTime<Utc>>,
    price_count: usize,
    inventory_count: usize,
}

impl CacheKey {
    pub fn for_series(series: &MarketSeries) -> Self {
        let timestamps = series
            .prices
            .iter()
            .map(|s| s.timestamp)
            .chain(series.inventory.iter().map(|s| s.timestamp));
        let (window_start, window_end) = timestamps.fold((None, None), |(lo, hi), ts| {
            (
                Some(lo.map_or(ts, |l: DateTime<Utc>| l.min(ts))),
                Some(hi.map_or(ts, |h: DateTime<Utc>| h.max(ts))),
            )
        });

        Self {
            commodity: series.commodity.to_lowercase(),
            variety: series.variety.as_ref().map(|v| v.to_lowercase()),
            region: series.region.as_ref().map(|r| r.to_lowercase()),
            window_start,
            window_end,
            price_count: series.prices.len(),
            inventory_count: series.inventory.len(),
        }
    }
}

struct CacheEntry {
    report: DetectionReport,
    inserted: Instant,
}

pub struct DetectionCache {
    ttl: Duration,
    max_entries: usize,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl DetectionCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            ttl: Duration::from_secs(config.ttl_secs),
            max_entries: config.max_entries.max(1),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<DetectionReport> {
        let entries = self.entries.read();
        entries
            .get(key)
            .filter(|e| e.inserted.elapsed() < self.ttl)
            .map(|e| e.report.clone())
    }

    pub fn insert(&self, key: CacheKey, report: DetectionReport) {
        let mut entries = self.entries.write();

        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            let ttl = self.ttl;
            entries.retain(|_, e| e.inserted.elapsed() < ttl);

            if entries.len() >= self.max_entries {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, e)| e.inserted)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                }
            }
        }

        entries.insert(
            key,
            CacheEntry {
                report,
                inserted: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
