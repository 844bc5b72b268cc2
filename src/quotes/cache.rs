//! Shared live price cache
//!
//! Holds the last known price per symbol and the set of watched symbols.
//! Every change of the watched set bumps `generation`; a poll cycle records
//! the generation it started under and its results are dropped if the set
//! changed in the meantime, so a late response for an old set never lands.

use super::CurrentPrice;
use crate::ledger::PriceResolver;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

pub type SharedPriceCache = Arc<RwLock<PriceCache>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LivePrice {
    pub symbol: String,
    pub price: f64,
    pub diff: f64,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct PriceCache {
    prices: HashMap<String, LivePrice>,
    watched: BTreeSet<String>,
    generation: u64,
}

impl PriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedPriceCache {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Replace the watched symbol set. Returns the current generation.
    pub fn watch<I, S>(&mut self, symbols: I) -> u64
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let next: BTreeSet<String> = symbols.into_iter().map(Into::into).collect();
        if next != self.watched {
            self.watched = next;
            self.generation += 1;
            log::debug!(
                "Watching {} symbols (generation {})",
                self.watched.len(),
                self.generation
            );
        }
        self.generation
    }

    pub fn watched(&self) -> Vec<String> {
        self.watched.iter().cloned().collect()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Generation and symbols a poll cycle should work on
    pub fn begin_cycle(&self) -> (u64, Vec<String>) {
        (self.generation, self.watched())
    }

    /// Merge the results of a poll cycle. Returns the number of prices stored,
    /// or `None` if the cycle is stale and everything was discarded.
    pub fn merge(&mut self, generation: u64, results: Vec<(String, CurrentPrice)>) -> Option<usize> {
        if generation < self.generation {
            log::debug!(
                "Discarding {} quotes from generation {} (current {})",
                results.len(),
                generation,
                self.generation
            );
            return None;
        }

        let mut stored = 0;
        for (symbol, current) in results {
            if self.update(&symbol, &current) {
                stored += 1;
            }
        }
        Some(stored)
    }

    /// Store a single fresh quote, e.g. the refresh before a trade
    pub fn update(&mut self, symbol: &str, current: &CurrentPrice) -> bool {
        if !current.price.is_finite() || current.price <= 0.0 {
            log::warn!("Ignoring unusable price {} for {}", current.price, symbol);
            return false;
        }
        self.prices.insert(
            symbol.to_string(),
            LivePrice {
                symbol: symbol.to_string(),
                price: current.price,
                diff: current.diff,
                fetched_at: Utc::now(),
            },
        );
        true
    }

    pub fn get(&self, symbol: &str) -> Option<&LivePrice> {
        self.prices.get(symbol)
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl PriceResolver for PriceCache {
    fn live_price(&self, symbol: &str) -> Option<f64> {
        self.prices.get(symbol).map(|p| p.price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(p: f64) -> CurrentPrice {
        CurrentPrice {
            price: p,
            diff: 0.5,
            percent_change: None,
            currency: None,
        }
    }

    #[test]
    fn test_watch_bumps_generation_only_on_change() {
        let mut cache = PriceCache::new();
        assert_eq!(cache.watch(["AAPL", "MSFT"]), 1);
        assert_eq!(cache.watch(["MSFT", "AAPL"]), 1);
        assert_eq!(cache.watch(["AAPL"]), 2);
        assert_eq!(cache.watched(), vec!["AAPL".to_string()]);
    }

    #[test]
    fn test_stale_cycle_is_discarded() {
        let mut cache = PriceCache::new();
        cache.watch(["AAPL"]);
        let (generation, symbols) = cache.begin_cycle();
        assert_eq!(symbols, vec!["AAPL".to_string()]);

        // Watched set changes while the cycle is in flight
        cache.watch(["MSFT"]);

        assert_eq!(cache.merge(generation, vec![("AAPL".to_string(), price(190.0))]), None);
        assert!(cache.get("AAPL").is_none());

        let (generation, _) = cache.begin_cycle();
        assert_eq!(cache.merge(generation, vec![("MSFT".to_string(), price(410.0))]), Some(1));
        assert_eq!(cache.live_price("MSFT"), Some(410.0));
    }

    #[test]
    fn test_merge_overwrites_and_skips_bad_prices() {
        let mut cache = PriceCache::new();
        let generation = cache.watch(["AAPL", "MSFT"]);

        cache.merge(generation, vec![("AAPL".to_string(), price(180.0))]);
        let stored = cache.merge(
            generation,
            vec![
                ("AAPL".to_string(), price(181.0)),
                ("MSFT".to_string(), price(f64::NAN)),
            ],
        );

        assert_eq!(stored, Some(1));
        assert_eq!(cache.get("AAPL").unwrap().price, 181.0);
        assert_eq!(cache.get("AAPL").unwrap().diff, 0.5);
        assert!(cache.get("MSFT").is_none());
        assert_eq!(cache.len(), 1);
    }
}
