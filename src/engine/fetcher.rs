//! Listing retrieval and normalisation.
//!
//! Both feeds (per-realm and commodity) are reduced to one
//! `ListingRecord` shape and grouped by item id in first-seen order.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::resolver::DenyList;
use crate::api::{ApiError, AuctionEntry, MarketplaceApi};
use crate::types::{ListingRecord, MarketScope, PetInfo, PET_CAGE_ITEM_ID};

// ---------------------------------------------------------------------------
// ListingBook
// ---------------------------------------------------------------------------

/// Listings of one poll, grouped by item id in insertion order.
#[derive(Debug, Default, Clone)]
pub struct ListingBook {
    order: Vec<i64>,
    groups: HashMap<i64, Vec<ListingRecord>>,
    listings: usize,
}

/// Cheap change detector for a whole snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SnapshotFingerprint {
    pub listings: usize,
    pub total_quantity: i64,
}

impl ListingBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, listing: ListingRecord) {
        let item_id = listing.item_id;
        if !self.groups.contains_key(&item_id) {
            self.order.push(item_id);
        }
        self.groups.entry(item_id).or_default().push(listing);
        self.listings += 1;
    }

    /// Distinct item ids in first-seen order.
    pub fn item_ids(&self) -> &[i64] {
        &self.order
    }

    pub fn listings(&self, item_id: i64) -> &[ListingRecord] {
        self.groups.get(&item_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `(item_id, listings)` groups in first-seen order.
    pub fn groups(&self) -> impl Iterator<Item = (i64, &[ListingRecord])> + '_ {
        self.order.iter().map(move |&id| (id, self.listings(id)))
    }

    /// Total number of listings.
    pub fn len(&self) -> usize {
        self.listings
    }

    pub fn is_empty(&self) -> bool {
        self.listings == 0
    }

    pub fn fingerprint(&self) -> SnapshotFingerprint {
        SnapshotFingerprint {
            listings: self.listings,
            total_quantity: self
                .groups
                .values()
                .flatten()
                .map(|l| l.quantity)
                .fold(0i64, |acc, q| acc.saturating_add(q)),
        }
    }
}

impl FromIterator<ListingRecord> for ListingBook {
    fn from_iter<I: IntoIterator<Item = ListingRecord>>(iter: I) -> Self {
        let mut book = ListingBook::new();
        for listing in iter {
            book.push(listing);
        }
        book
    }
}

// ---------------------------------------------------------------------------
// Normalisation
// ---------------------------------------------------------------------------

/// Reduce a wire entry to a listing.
///
/// Realm feeds price by buyout, the commodity feed by unit price; the
/// other field is only a fallback. No price at all gives 0.
pub fn normalize(entry: AuctionEntry, scope: MarketScope) -> ListingRecord {
    let price = match scope {
        MarketScope::Realm(_) => entry.buyout.or(entry.unit_price),
        MarketScope::Commodities => entry.unit_price.or(entry.buyout),
    }
    .unwrap_or(0);

    let pet = if entry.item.id == PET_CAGE_ITEM_ID {
        Some(PetInfo {
            breed_id: entry.item.pet_breed_id.unwrap_or(0),
            level: entry.item.pet_level.unwrap_or(0),
            quality_id: entry.item.pet_quality_id.unwrap_or(0),
            species_id: entry.item.pet_species_id.unwrap_or(0),
        })
    } else {
        None
    };

    ListingRecord {
        id: entry.id,
        item_id: entry.item.id,
        unit_price: price,
        quantity: entry.quantity,
        pet,
    }
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// Pulls one market's current listings.
pub struct AuctionFetcher {
    api: Arc<dyn MarketplaceApi>,
    deny: Arc<DenyList>,
}

impl AuctionFetcher {
    pub fn new(api: Arc<dyn MarketplaceApi>, deny: Arc<DenyList>) -> Self {
        Self { api, deny }
    }

    pub async fn fetch(&self, scope: MarketScope) -> Result<ListingBook, ApiError> {
        let entries = match scope {
            MarketScope::Realm(id) => self.api.auctions(id).await?,
            MarketScope::Commodities => self.api.commodities().await?,
        };

        let total = entries.len();
        let book: ListingBook = entries
            .into_iter()
            .filter(|e| !self.deny.contains(e.item.id))
            .map(|e| normalize(e, scope))
            .collect();

        let skipped = total - book.len();
        if skipped > 0 {
            debug!(?scope, skipped, "Dropped deny-listed listings");
        }
        info!(
            ?scope,
            listings = book.len(),
            items = book.item_ids().len(),
            "Listings fetched"
        );
        Ok(book)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
