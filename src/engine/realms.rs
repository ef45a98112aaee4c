//! Realm name → connected-realm resolution.
//!
//! A small static table short-circuits well-known names. Everything else
//! goes through a dynamic search: list every connected realm, fetch each
//! one's member roster, and string-match the requested name. Rosters
//! change when realms merge, so the table is only ever a shortcut.
//!
//! Every roster fetched during a search is remembered, so later lookups
//! for other names usually resolve without touching the network, and each
//! distinct name triggers at most one search per run.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::{ConnectedRealmDetail, MarketplaceApi};
use crate::types::{MarketScope, RealmId, ScanError, COMMODITIES_REALM};

/// Normalise a realm name or slug for comparison.
///
/// Case-insensitive; apostrophes and hyphens are dropped and runs of
/// whitespace become a single hyphen, matching the API's slug form
/// (`Mal'Ganis` → `malganis`, `Sisters of Elune` → `sisters-of-elune`).
pub fn normalize_realm(name: &str) -> String {
    let cleaned: String = name
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '\'' | '’' | '-'))
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join("-")
}

#[derive(Default)]
struct Roster {
    /// Normalised member name/slug → owning connected realm.
    members: HashMap<String, RealmId>,
    /// Connected realms whose rosters are already in `members`.
    visited: HashSet<RealmId>,
    /// Names a completed search could not find.
    missing: HashSet<String>,
}

impl Roster {
    fn record(&mut self, detail: &ConnectedRealmDetail) {
        let id = RealmId(detail.id);
        for realm in &detail.realms {
            self.members.insert(normalize_realm(&realm.slug), id);
            self.members.insert(normalize_realm(&realm.name), id);
        }
        self.visited.insert(id);
    }
}

/// Resolves realm names to market scopes.
pub struct RealmDirectory {
    api: Arc<dyn MarketplaceApi>,
    known: HashMap<String, RealmId>,
    roster: Mutex<Roster>,
    /// Held across a dynamic search so concurrent lookups share its results.
    search: tokio::sync::Mutex<()>,
}

impl RealmDirectory {
    /// Create a directory with a static table of exact names.
    pub fn new(api: Arc<dyn MarketplaceApi>, known: HashMap<String, i64>) -> Self {
        Self {
            api,
            known: known.into_iter().map(|(k, v)| (k, RealmId(v))).collect(),
            roster: Mutex::new(Roster::default()),
            search: tokio::sync::Mutex::new(()),
        }
    }

    /// Resolve a realm name.
    ///
    /// `ScanError::RealmNotFound` only after a complete search; any failed
    /// API call during the search surfaces as `ScanError::Transport`.
    pub async fn resolve(&self, name: &str) -> Result<MarketScope, ScanError> {
        if name.trim().eq_ignore_ascii_case(COMMODITIES_REALM) {
            return Ok(MarketScope::Commodities);
        }

        if let Some(id) = self.known.get(name) {
            debug!(realm = name, %id, "Realm resolved from static table");
            return Ok(MarketScope::Realm(*id));
        }

        let target = normalize_realm(name);
        if let Some(scope) = self.lookup(name, &target)? {
            return Ok(scope);
        }

        let _search = self.search.lock().await;

        // Another task may have finished a search while we waited.
        if let Some(scope) = self.lookup(name, &target)? {
            return Ok(scope);
        }

        self.search_for(name, &target).await
    }

    /// Memoised answer, if any.
    fn lookup(&self, name: &str, target: &str) -> Result<Option<MarketScope>, ScanError> {
        let roster = self.roster.lock();
        if let Some(id) = roster.members.get(target) {
            return Ok(Some(MarketScope::Realm(*id)));
        }
        if roster.missing.contains(target) {
            debug!(realm = name, "Realm known to be missing");
            return Err(ScanError::RealmNotFound(name.to_string()));
        }
        Ok(None)
    }

    async fn search_for(&self, name: &str, target: &str) -> Result<MarketScope, ScanError> {
        info!(realm = name, "Searching connected realms");

        let ids = self.api.connected_realm_ids().await?;

        for id in ids {
            if self.roster.lock().visited.contains(&id) {
                continue;
            }

            let detail = self.api.connected_realm(id).await?;

            let mut roster = self.roster.lock();
            roster.record(&detail);
            if let Some(found) = roster.members.get(target) {
                info!(realm = name, id = %found, "Realm resolved");
                return Ok(MarketScope::Realm(*found));
            }
        }

        warn!(realm = name, "Realm not found in any connected realm");
        self.roster.lock().missing.insert(target.to_string());
        Err(ScanError::RealmNotFound(name.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
