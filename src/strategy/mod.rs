//! Bargain engine: watch-list, vendor arbitrage, and collectible rules.
//!
//! Each rule family looks at one realm's listings independently. The
//! engine unions their signals, collapses duplicates by display string,
//! and orders the result lexicographically.

pub mod arbitrage;
pub mod collectible;
pub mod watchlist;

use anyhow::Result;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

use crate::collections::CollectionTracker;
use crate::config::StrategyConfig;
use crate::engine::fetcher::ListingBook;
use crate::types::{ItemRecord, Signal};
use arbitrage::ArbitrageRule;
use collectible::CollectibleRules;
use watchlist::WatchListRule;

/// Insert `signal` unless a cheaper one with the same display is present.
pub(crate) fn keep_cheapest(found: &mut HashMap<String, Signal>, signal: Signal) {
    match found.get(&signal.display) {
        Some(existing) if existing.rank <= signal.rank => {}
        _ => {
            found.insert(signal.display.clone(), signal);
        }
    }
}

/// Unions the rule families over one realm's listings.
pub struct BargainEngine {
    watch_list: WatchListRule,
    arbitrage: ArbitrageRule,
    /// `None` when no collection data is available.
    collectibles: Option<CollectibleRules>,
}

impl BargainEngine {
    pub fn new(
        watch_list: WatchListRule,
        arbitrage: ArbitrageRule,
        collectibles: Option<CollectibleRules>,
    ) -> Self {
        Self {
            watch_list,
            arbitrage,
            collectibles,
        }
    }

    /// Build from config. Collectible rules need a tracker.
    pub fn from_config(
        cfg: &StrategyConfig,
        tracker: Option<Arc<dyn CollectionTracker>>,
    ) -> Result<Self> {
        let collectibles = tracker.map(|t| {
            CollectibleRules::new(t, cfg.pets.clone(), cfg.toys.clone(), cfg.transmog.clone())
        });
        Ok(Self::new(
            WatchListRule::new(cfg.watch_list_ids()?),
            ArbitrageRule::new(cfg.min_arbitrage_profit),
            collectibles,
        ))
    }

    /// Signals for one realm, de-duplicated by display string and sorted.
    ///
    /// When two families produce the same display string, the earlier
    /// family wins: arbitrage, then watch-list, then collectibles.
    pub fn evaluate(
        &self,
        realm: &str,
        book: &ListingBook,
        items: &HashMap<i64, ItemRecord>,
    ) -> Vec<Signal> {
        let arbitrage = self.arbitrage.find(realm, book, items);
        let watched = self.watch_list.find(realm, book, items);
        let collectible = self
            .collectibles
            .as_ref()
            .map(|c| c.find(realm, book, items))
            .unwrap_or_default();

        debug!(
            realm,
            arbitrage = arbitrage.len(),
            watch_list = watched.len(),
            collectible = collectible.len(),
            "Rule families evaluated"
        );

        let mut merged: BTreeMap<String, Signal> = BTreeMap::new();
        for signal in arbitrage.into_iter().chain(watched).chain(collectible) {
            merged.entry(signal.display.clone()).or_insert(signal);
        }

        // BTreeMap iteration is already lexicographic by display.
        merged.into_values().collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::StaticCollection;
    use crate::types::{ListingRecord, SignalKind};
    use chrono::Utc;

    fn item(id: i64, name: &str, sell_price: i64) -> ItemRecord {
        ItemRecord {
            id,
            name: name.to_string(),
            equippable: false,
            sell_price,
            item_level: 0,
            updated: Utc::now(),
        }
    }

    fn listing(id: i64, item_id: i64, price: i64, quantity: i64) -> ListingRecord {
        ListingRecord { id, item_id, unit_price: price, quantity, pet: None }
    }

    fn engine(watch: &[(i64, i64)]) -> BargainEngine {
        BargainEngine::new(
            WatchListRule::new(watch.iter().copied().collect()),
            ArbitrageRule::new(500),
            None,
        )
    }

    #[test]
    fn test_keep_cheapest() {
        let mut found = HashMap::new();
        keep_cheapest(&mut found, Signal::new("r", SignalKind::NeededGood, "a", 10));
        keep_cheapest(&mut found, Signal::new("r", SignalKind::NeededGood, "a", 20));
        keep_cheapest(&mut found, Signal::new("r", SignalKind::NeededGood, "a", 5));
        assert_eq!(found.len(), 1);
        assert_eq!(found["a"].rank, 5);
    }

    #[test]
    fn test_signals_sorted_lexicographically() {
        let e = engine(&[(1, 1000), (2, 1000), (3, 1000)]);
        let items = HashMap::from([
            (1, item(1, "Zinc Ore", 0)),
            (2, item(2, "Anchor Weed", 0)),
            (3, item(3, "Mithril Bar", 0)),
        ]);
        let book: ListingBook = [listing(1, 1, 10, 1), listing(2, 2, 10, 1), listing(3, 3, 10, 1)]
            .into_iter()
            .collect();

        let names: Vec<String> = e.evaluate("r", &book, &items).into_iter().map(|s| s.display).collect();
        assert_eq!(names, vec!["Anchor Weed", "Mithril Bar", "Zinc Ore"]);
    }

    #[test]
    fn test_same_display_collapses_to_one() {
        // Two different item ids resolving to the same name.
        let e = engine(&[(1, 1000), (2, 1000)]);
        let items = HashMap::from([(1, item(1, "Copper Ore", 0)), (2, item(2, "Copper Ore", 0))]);
        let book: ListingBook = [listing(1, 1, 10, 1), listing(2, 2, 20, 1)].into_iter().collect();

        let signals = e.evaluate("r", &book, &items);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].display, "Copper Ore");
    }

    #[test]
    fn test_arbitrage_wins_display_collision() {
        let e = engine(&[(7, 1000)]);
        let items = HashMap::from([(7, item(7, "Runecloth", 300))]);
        let book: ListingBook = [listing(1, 7, 100, 2), listing(2, 7, 150, 3)].into_iter().collect();

        let signals = e.evaluate("r", &book, &items);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].kind, SignalKind::Arbitrage);
        assert_eq!(signals[0].rank, 850);
    }

    #[test]
    fn test_collectibles_included_with_tracker() {
        let cfg = StrategyConfig::default();
        let tracker: Arc<dyn CollectionTracker> =
            Arc::new(StaticCollection::default().with_needed_toys([44430]));
        let e = BargainEngine::from_config(&cfg, Some(tracker)).unwrap();

        let items = HashMap::from([(44430, item(44430, "Titanium Seal of Dalaran", 0))]);
        let book: ListingBook = [listing(1, 44430, 1000, 1)].into_iter().collect();
        let signals = e.evaluate("r", &book, &items);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].kind, SignalKind::CollectibleNeeded);

        let without = BargainEngine::from_config(&cfg, None).unwrap();
        assert!(without.evaluate("r", &book, &items).is_empty());
    }

    #[test]
    fn test_bad_watch_list_key_rejected() {
        let mut cfg = StrategyConfig::default();
        cfg.watch_list.insert("linen".to_string(), 10);
        assert!(BargainEngine::from_config(&cfg, None).is_err());
    }
}
