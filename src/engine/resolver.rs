//! Staleness-aware item metadata resolution.
//!
//! `ItemResolver` answers from the shared `ItemCache` when it can and goes
//! to the item endpoint when it must. It is the only place record
//! timestamps are produced. A failed live fetch never touches the cache,
//! so a stale but usable record survives a bad refresh attempt.

use chrono::{Duration, Utc};
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::{ApiError, ItemDocument, MarketplaceApi};
use crate::storage::ItemCache;
use crate::types::ItemRecord;

/// Concurrent item lookups per realm task.
const ITEM_FETCH_CONCURRENCY: usize = 8;

/// Item ids that can never be resolved.
///
/// Seeded from config and extended whenever the item endpoint reports an
/// id as not found. Shared between the resolver and the fetcher.
#[derive(Debug, Default)]
pub struct DenyList {
    ids: Mutex<HashSet<i64>>,
}

impl DenyList {
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            ids: Mutex::new(ids.into_iter().collect()),
        }
    }

    pub fn contains(&self, id: i64) -> bool {
        self.ids.lock().contains(&id)
    }

    /// Returns true if the id was not already denied.
    pub fn insert(&self, id: i64) -> bool {
        self.ids.lock().insert(id)
    }

    pub fn len(&self) -> usize {
        self.ids.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn is_not_found(err: &ApiError) -> bool {
    match err {
        ApiError::Api { code, .. } => *code == 404,
        ApiError::Status { status, .. } => *status == 404,
        _ => false,
    }
}

fn record_from(doc: &ItemDocument) -> ItemRecord {
    ItemRecord {
        id: doc.id,
        name: doc.name.clone(),
        equippable: doc.equippable(),
        sell_price: doc.vendor_price(),
        item_level: doc.item_level(),
        updated: Utc::now(),
    }
}

/// Cache-first item metadata lookups with write-through refresh.
pub struct ItemResolver {
    api: Arc<dyn MarketplaceApi>,
    cache: Arc<ItemCache>,
    deny: Arc<DenyList>,
}

impl ItemResolver {
    pub fn new(api: Arc<dyn MarketplaceApi>, cache: Arc<ItemCache>, deny: Arc<DenyList>) -> Self {
        Self { api, cache, deny }
    }

    pub fn cache(&self) -> &Arc<ItemCache> {
        &self.cache
    }

    /// Resolve one item.
    ///
    /// A cached record is used when reads are enabled and it is no older
    /// than `max_age` (`None` accepts any age). Otherwise the record is
    /// fetched live and written through. `None` on deny-list hits and
    /// failed fetches.
    pub async fn resolve(&self, id: i64, max_age: Option<Duration>) -> Option<ItemRecord> {
        if let Some(cached) = self.cache.read(id) {
            match max_age {
                Some(max_age) if cached.is_stale(max_age, Utc::now()) => {
                    debug!(item_id = id, "Cached item is stale, refreshing");
                }
                _ => return Some(cached),
            }
        }

        if self.deny.contains(id) {
            return None;
        }

        self.fetch_live(id).await
    }

    /// Resolve a batch of items, keyed by id. Unresolvable ids are absent.
    pub async fn resolve_many(
        &self,
        ids: &[i64],
        max_age: Option<Duration>,
    ) -> HashMap<i64, ItemRecord> {
        stream::iter(ids.iter().copied())
            .map(|id| async move { self.resolve(id, max_age).await.map(|r| (id, r)) })
            .buffer_unordered(ITEM_FETCH_CONCURRENCY)
            .filter_map(|r| async move { r })
            .collect()
            .await
    }

    /// Refresh up to `limit` stale cache entries in ascending id order.
    ///
    /// Returns `(refreshed, stale_total)`. Failed refreshes leave their
    /// entries in place and do not count as refreshed.
    pub async fn refresh_stale(&self, max_age: Duration, limit: usize) -> (usize, usize) {
        let now = Utc::now();
        let stale: Vec<i64> = self
            .cache
            .entries()
            .into_iter()
            .filter(|r| r.is_stale(max_age, now))
            .map(|r| r.id)
            .collect();

        let mut refreshed = 0;
        for &id in stale.iter().take(limit) {
            if self.deny.contains(id) {
                continue;
            }
            if self.fetch_live(id).await.is_some() {
                refreshed += 1;
            }
        }

        info!(refreshed, stale = stale.len(), limit, "Stale cache refresh finished");
        (refreshed, stale.len())
    }

    async fn fetch_live(&self, id: i64) -> Option<ItemRecord> {
        match self.api.item(id).await {
            Ok(doc) => {
                let record = record_from(&doc);
                self.cache.write(id, record.clone());
                debug!(item_id = id, name = %record.name, "Item fetched");
                Some(record)
            }
            Err(e) if is_not_found(&e) => {
                if self.deny.insert(id) {
                    info!(item_id = id, "Item not found, added to deny-list");
                }
                None
            }
            Err(e) => {
                warn!(item_id = id, error = %e, "Item fetch failed");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
