//! Marketplace API integration.
//!
//! Defines the `MarketplaceApi` trait and the typed wire records every
//! endpoint decodes into. JSON is decoded exactly once here; nothing
//! downstream probes untyped trees.
//!
//! - `blizzard`: reqwest client for the Game Data API
//! - `auth`: bearer tokens supplied at startup

pub mod auth;
pub mod blizzard;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::types::RealmId;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Transport-level failure. Never retried within one pass.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request to {endpoint} failed: {message}")]
    Http { endpoint: String, message: String },

    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },

    /// The body carried a numeric error code even though transport succeeded.
    #[error("{endpoint} returned error code {code}: {detail}")]
    Api {
        endpoint: String,
        code: i64,
        detail: String,
    },

    #[error("Failed to decode {endpoint} response: {message}")]
    Decode { endpoint: String, message: String },
}

// ---------------------------------------------------------------------------
// Wire records
// ---------------------------------------------------------------------------

/// One member realm of a connected-realm cluster.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RealmSummary {
    pub name: String,
    pub slug: String,
}

/// `/connected-realm/{id}` response.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ConnectedRealmDetail {
    pub id: i64,
    #[serde(default)]
    pub realms: Vec<RealmSummary>,
}

/// The `item` object nested in an auction entry. Pet fields appear only
/// on pet-cage listings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AuctionItem {
    pub id: i64,
    #[serde(default)]
    pub pet_breed_id: Option<i64>,
    #[serde(default)]
    pub pet_level: Option<i64>,
    #[serde(default)]
    pub pet_quality_id: Option<i64>,
    #[serde(default)]
    pub pet_species_id: Option<i64>,
}

/// One entry of either auction feed.
///
/// Realm feeds carry `buyout` (sometimes absent); the commodity feed
/// carries `unit_price` (always present).
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AuctionEntry {
    pub id: i64,
    pub item: AuctionItem,
    #[serde(default)]
    pub buyout: Option<i64>,
    #[serde(default)]
    pub unit_price: Option<i64>,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

/// `{ "value": n }` wrapper used throughout preview items.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ValueField {
    pub value: i64,
}

/// `{ "type": "ON_EQUIP", ... }` binding descriptor.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Binding {
    #[serde(rename = "type")]
    pub binding_type: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct PreviewItem {
    #[serde(default)]
    pub binding: Option<Binding>,
    #[serde(default)]
    pub level: Option<ValueField>,
    #[serde(default)]
    pub sell_price: Option<ValueField>,
}

/// `/item/{id}` response. Only the fields the scanner needs.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ItemDocument {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub is_equippable: bool,
    #[serde(default)]
    pub sell_price: Option<i64>,
    #[serde(default)]
    pub preview_item: Option<PreviewItem>,
}

impl ItemDocument {
    /// Equippable per the API flag or per a use/equip binding.
    pub fn equippable(&self) -> bool {
        if self.is_equippable {
            return true;
        }
        let binding = self
            .preview_item
            .as_ref()
            .and_then(|p| p.binding.as_ref())
            .map(|b| b.binding_type.to_uppercase())
            .unwrap_or_default();
        matches!(binding.as_str(), "ON_EQUIP" | "ON_USE")
    }

    /// Vendor sell price, preferring the top-level field.
    pub fn vendor_price(&self) -> i64 {
        self.sell_price
            .or_else(|| {
                self.preview_item
                    .as_ref()
                    .and_then(|p| p.sell_price.as_ref())
                    .map(|v| v.value)
            })
            .unwrap_or(0)
    }

    pub fn item_level(&self) -> i64 {
        self.preview_item
            .as_ref()
            .and_then(|p| p.level.as_ref())
            .map(|v| v.value)
            .unwrap_or(0)
    }
}

/// Decode a raw auction array entry by entry.
///
/// Entries that fail to decode (no item, wrong types) are dropped and
/// counted; one malformed entry never fails the batch.
pub fn decode_auctions(raw: Vec<serde_json::Value>) -> Vec<AuctionEntry> {
    let total = raw.len();
    let entries: Vec<AuctionEntry> = raw
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect();

    let dropped = total - entries.len();
    if dropped > 0 {
        warn!(dropped, total, "Dropped malformed auction entries");
    }
    entries
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Abstraction over the marketplace HTTP API.
///
/// Every method is one network round trip (or one paginated sequence).
/// Implementors must surface body-level error codes as `ApiError::Api`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketplaceApi: Send + Sync {
    /// Ids of every connected realm that is currently up.
    async fn connected_realm_ids(&self) -> Result<Vec<RealmId>, ApiError>;

    /// Member realms of one connected realm.
    async fn connected_realm(&self, id: RealmId) -> Result<ConnectedRealmDetail, ApiError>;

    /// Current listings of one connected realm's auction house.
    async fn auctions(&self, id: RealmId) -> Result<Vec<AuctionEntry>, ApiError>;

    /// Current listings of the region-wide commodity market.
    async fn commodities(&self) -> Result<Vec<AuctionEntry>, ApiError>;

    /// Static metadata for a single item.
    async fn item(&self, id: i64) -> Result<ItemDocument, ApiError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
