//! In-memory marketplace for integration testing.
//!
//! Provides a deterministic `MarketplaceApi` implementation with known
//! realms, listings, and items. Individual realms can be made to fail or
//! stall, and every endpoint counts its calls.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use auctionhawk::api::{
    ApiError, AuctionEntry, AuctionItem, ConnectedRealmDetail, ItemDocument, MarketplaceApi,
    RealmSummary,
};
use auctionhawk::types::RealmId;

#[derive(Default)]
pub struct MockMarketplace {
    rosters: Vec<ConnectedRealmDetail>,
    auctions: HashMap<i64, Vec<AuctionEntry>>,
    commodities: Vec<AuctionEntry>,
    items: HashMap<i64, ItemDocument>,
    failing: HashSet<i64>,
    stalled: HashMap<i64, Duration>,
    pub search_calls: AtomicUsize,
    pub auction_calls: AtomicUsize,
    pub item_calls: AtomicUsize,
}

impl MockMarketplace {
    pub fn new() -> Self {
        Self::default()
    }

    /// A connected realm with one member realm and its listings.
    pub fn with_realm(mut self, id: i64, name: &str, listings: Vec<AuctionEntry>) -> Self {
        self.rosters.push(ConnectedRealmDetail {
            id,
            realms: vec![RealmSummary {
                name: name.to_string(),
                slug: name.to_lowercase().replace('\'', "").replace(' ', "-"),
            }],
        });
        self.auctions.insert(id, listings);
        self
    }

    pub fn with_commodities(mut self, listings: Vec<AuctionEntry>) -> Self {
        self.commodities = listings;
        self
    }

    pub fn with_item(mut self, id: i64, name: &str, sell_price: i64) -> Self {
        self.items.insert(
            id,
            ItemDocument {
                id,
                name: name.to_string(),
                is_equippable: false,
                sell_price: Some(sell_price),
                preview_item: None,
            },
        );
        self
    }

    /// Auction fetches for this connected realm fail.
    pub fn failing(mut self, id: i64) -> Self {
        self.failing.insert(id);
        self
    }

    /// Auction fetches for this connected realm sleep before answering.
    pub fn stalled(mut self, id: i64, delay: Duration) -> Self {
        self.stalled.insert(id, delay);
        self
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// A buyout listing of `quantity` units.
pub fn listing(id: i64, item_id: i64, price: i64, quantity: i64) -> AuctionEntry {
    AuctionEntry {
        id,
        item: AuctionItem {
            id: item_id,
            pet_breed_id: None,
            pet_level: None,
            pet_quality_id: None,
            pet_species_id: None,
        },
        buyout: Some(price),
        unit_price: None,
        quantity,
    }
}

/// A commodity listing priced per unit.
pub fn commodity(id: i64, item_id: i64, unit_price: i64, quantity: i64) -> AuctionEntry {
    AuctionEntry {
        buyout: None,
        unit_price: Some(unit_price),
        ..listing(id, item_id, 0, quantity)
    }
}

#[async_trait]
impl MarketplaceApi for MockMarketplace {
    async fn connected_realm_ids(&self) -> Result<Vec<RealmId>, ApiError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.rosters.iter().map(|r| RealmId(r.id)).collect())
    }

    async fn connected_realm(&self, id: RealmId) -> Result<ConnectedRealmDetail, ApiError> {
        self.rosters
            .iter()
            .find(|r| r.id == id.0)
            .cloned()
            .ok_or_else(|| ApiError::Status {
                endpoint: "connected-realm".to_string(),
                status: 404,
            })
    }

    async fn auctions(&self, id: RealmId) -> Result<Vec<AuctionEntry>, ApiError> {
        self.auction_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.stalled.get(&id.0) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(&id.0) {
            return Err(ApiError::Http {
                endpoint: "auctions".to_string(),
                message: "connection reset by peer".to_string(),
            });
        }
        Ok(self.auctions.get(&id.0).cloned().unwrap_or_default())
    }

    async fn commodities(&self) -> Result<Vec<AuctionEntry>, ApiError> {
        Ok(self.commodities.clone())
    }

    async fn item(&self, id: i64) -> Result<ItemDocument, ApiError> {
        self.item_calls.fetch_add(1, Ordering::SeqCst);
        self.items.get(&id).cloned().ok_or_else(|| ApiError::Api {
            endpoint: "item".to_string(),
            code: 404,
            detail: "Not Found".to_string(),
        })
    }
}
