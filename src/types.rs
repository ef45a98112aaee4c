//! Shared types for the AUCTIONHAWK scanner.
//!
//! These types form the data model used across all modules.
//! Wire-format shapes live in `api`; everything here is already
//! decoded, validated, and safe to pass between tasks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Item id of the universal battle-pet cage. Listings for this id carry
/// a pet sub-record; the cage itself has no vendor value.
pub const PET_CAGE_ITEM_ID: i64 = 82800;

/// Display name of the global commodity market pseudo-realm.
pub const COMMODITIES_REALM: &str = "Commodities";

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// Slow-changing metadata for a single item, as cached on disk.
///
/// Records are replaced wholesale on refresh; `updated` is stamped by the
/// resolver at fetch time and never decreases for a given id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: i64,
    pub name: String,
    pub equippable: bool,
    /// Advertised vendor sell price in copper.
    pub sell_price: i64,
    /// Preview item level; zero for items that have none.
    pub item_level: i64,
    pub updated: DateTime<Utc>,
}

impl ItemRecord {
    /// Vendor price actually paid for this item.
    ///
    /// Levelled items do not sell for their advertised price, so they are
    /// treated as having no realizable value.
    pub fn realizable_sell_price(&self) -> i64 {
        if self.item_level > 0 {
            0
        } else {
            self.sell_price
        }
    }

    /// Age of the record relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.updated
    }

    /// Whether the record is older than `max_age`. Equal age counts as fresh.
    pub fn is_stale(&self, max_age: chrono::Duration, now: DateTime<Utc>) -> bool {
        self.age(now) > max_age
    }
}

impl fmt::Display for ItemRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let equippable = if self.equippable { "T" } else { "F" };
        write!(
            f,
            "{:7}  {} {:>11}   {:3}   {}   {}",
            self.id,
            equippable,
            format_coins(self.sell_price),
            self.item_level,
            self.updated.format("%Y-%m-%d"),
            self.name,
        )
    }
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

/// Battle-pet attributes attached to a pet-cage listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetInfo {
    pub breed_id: i64,
    pub level: i64,
    pub quality_id: i64,
    pub species_id: i64,
}

/// One normalized auction house listing.
///
/// `unit_price` holds the buyout for realm listings and the unit price for
/// commodity listings. Zero means the feed carried no price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRecord {
    pub id: i64,
    pub item_id: i64,
    pub unit_price: i64,
    pub quantity: i64,
    pub pet: Option<PetInfo>,
}

// ---------------------------------------------------------------------------
// Markets
// ---------------------------------------------------------------------------

/// Identifier of a connected-realm cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RealmId(pub i64);

impl fmt::Display for RealmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a scan reads its listings from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarketScope {
    /// A connected realm's own auction house.
    Realm(RealmId),
    /// The region-wide commodity market.
    Commodities,
}

impl MarketScope {
    pub fn kind(&self) -> MarketKind {
        match self {
            MarketScope::Realm(_) => MarketKind::Realm,
            MarketScope::Commodities => MarketKind::Commodity,
        }
    }
}

/// Report priority key. Realm markets sort before the commodity market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MarketKind {
    Realm,
    Commodity,
}

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

/// Which rule family produced a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    NeededGood,
    Arbitrage,
    CollectibleBargain,
    CollectibleNeeded,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SignalKind::NeededGood => "Bargain",
            SignalKind::Arbitrage => "Arbitrage",
            SignalKind::CollectibleBargain => "Collectible",
            SignalKind::CollectibleNeeded => "Needed",
        };
        f.pad(label)
    }
}

/// A "worth buying" signal for one realm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    pub realm: String,
    pub kind: SignalKind,
    pub display: String,
    /// Aggregate profit (arbitrage) or price (everything else), in copper.
    pub rank: i64,
}

impl Signal {
    pub fn new(realm: &str, kind: SignalKind, display: impl Into<String>, rank: i64) -> Self {
        Self {
            realm: realm.to_string(),
            kind,
            display: display.into(),
            rank,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<11} {} ({})", self.kind, self.display, format_coins(self.rank))
    }
}

// ---------------------------------------------------------------------------
// Coins
// ---------------------------------------------------------------------------

/// Render a copper amount as `gold.silver.copper`, dropping empty
/// leading denominations. Negative amounts keep their sign.
pub fn format_coins(amount: i64) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let amount = amount.unsigned_abs();

    let copper = amount % 100;
    let silver = (amount / 100) % 100;
    let gold = amount / 10_000;

    if gold > 0 {
        format!("{sign}{gold}.{silver:02}.{copper:02}")
    } else if silver > 0 {
        format!("{sign}{silver}.{copper:02}")
    } else {
        format!("{sign}{copper}")
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Failures that remove one unit of work (a realm) from a scan.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Realm not found: {0}")]
    RealmNotFound(String),

    #[error("Transport failure: {0}")]
    Transport(#[from] crate::api::ApiError),

    #[error("Scan of {realm} exceeded its {secs}s deadline")]
    Deadline { realm: String, secs: u64 },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
