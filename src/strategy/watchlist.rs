//! Watch-list bargains.
//!
//! A fixed item id → ceiling table. Any listing at or below its item's
//! ceiling is a signal; a zero price means "unknown" and never qualifies.

use std::collections::HashMap;

use super::keep_cheapest;
use crate::engine::fetcher::ListingBook;
use crate::types::{ItemRecord, Signal, SignalKind};

pub struct WatchListRule {
    ceilings: HashMap<i64, i64>,
}

impl WatchListRule {
    pub fn new(ceilings: HashMap<i64, i64>) -> Self {
        Self { ceilings }
    }

    /// Whether `price` qualifies against `ceiling`.
    pub fn qualifies(price: i64, ceiling: i64) -> bool {
        price > 0 && price <= ceiling
    }

    /// One signal per watched item, carrying its cheapest qualifying price.
    pub fn find(
        &self,
        realm: &str,
        book: &ListingBook,
        items: &HashMap<i64, ItemRecord>,
    ) -> Vec<Signal> {
        let mut found: HashMap<String, Signal> = HashMap::new();

        for (item_id, listings) in book.groups() {
            let Some(&ceiling) = self.ceilings.get(&item_id) else {
                continue;
            };
            let Some(item) = items.get(&item_id) else {
                continue;
            };

            for listing in listings {
                if Self::qualifies(listing.unit_price, ceiling) {
                    keep_cheapest(
                        &mut found,
                        Signal::new(realm, SignalKind::NeededGood, &item.name, listing.unit_price),
                    );
                }
            }
        }

        found.into_values().collect()
    }
}
