//! Vendor arbitrage.
//!
//! Buying everything listed below an item's vendor price and selling it
//! back yields `(sell - price) * quantity` per listing. The rule sums that
//! over every underpriced listing of an item and signals when the total
//! clears the configured minimum. This is a group-by reduction: several
//! small listings can add up to one worthwhile signal.

use std::collections::HashMap;
use tracing::debug;

use crate::engine::fetcher::ListingBook;
use crate::types::{ItemRecord, Signal, SignalKind};

pub struct ArbitrageRule {
    min_profit: i64,
}

impl ArbitrageRule {
    pub fn new(min_profit: i64) -> Self {
        Self { min_profit }
    }

    /// Aggregate profit per item name, before thresholding.
    ///
    /// Equippable items and items without a realizable vendor price are
    /// skipped. Only listings priced above zero and below the vendor price
    /// contribute.
    pub fn aggregate(
        book: &ListingBook,
        items: &HashMap<i64, ItemRecord>,
    ) -> HashMap<String, i64> {
        let mut totals: HashMap<String, i64> = HashMap::new();

        for (item_id, listings) in book.groups() {
            let Some(item) = items.get(&item_id) else {
                continue;
            };
            if item.equippable {
                continue;
            }
            let sell = item.realizable_sell_price();
            if sell <= 0 {
                continue;
            }

            // Feed quantities are untrusted; totals saturate instead of wrapping.
            let profit = listings
                .iter()
                .filter(|l| l.unit_price > 0 && l.unit_price < sell)
                .map(|l| (sell - l.unit_price).saturating_mul(l.quantity))
                .fold(0i64, |acc, p| acc.saturating_add(p));

            if profit > 0 {
                let total = totals.entry(item.name.clone()).or_insert(0);
                *total = total.saturating_add(profit);
            }
        }

        totals
    }

    pub fn find(
        &self,
        realm: &str,
        book: &ListingBook,
        items: &HashMap<i64, ItemRecord>,
    ) -> Vec<Signal> {
        Self::aggregate(book, items)
            .into_iter()
            .filter(|(name, profit)| {
                let keep = *profit > self.min_profit;
                if !keep {
                    debug!(realm, item = %name, profit, "Arbitrage below minimum");
                }
                keep
            })
            .map(|(name, profit)| Signal::new(realm, SignalKind::Arbitrage, name, profit))
            .collect()
    }
}
