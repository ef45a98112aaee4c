//! Collection ownership trackers.
//!
//! The collectible rules ask "is this wanted?" and take the answer as
//! given. Ownership data is produced elsewhere (profile API exports,
//! addon dumps) and handed to this crate as a JSON snapshot.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::info;

/// Read-only ownership queries by item or species identity.
pub trait CollectionTracker: Send + Sync {
    /// Whether any pet of this species is already owned.
    fn owns_pet(&self, species_id: i64) -> bool;

    /// Species display name, if known.
    fn pet_name(&self, species_id: i64) -> Option<String>;

    /// Whether this item is a toy that is not yet owned.
    fn needs_toy(&self, item_id: i64) -> bool;

    /// Whether this item provides an appearance that is not yet collected.
    fn needs_transmog(&self, item_id: i64) -> bool;
}

/// Snapshot-backed tracker.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StaticCollection {
    owned_pet_species: HashSet<i64>,
    pet_names: HashMap<i64, String>,
    needed_toys: HashSet<i64>,
    needed_transmogs: HashSet<i64>,
}

impl StaticCollection {
    /// Load a snapshot from disk. Returns `None` if the file is absent.
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "No collection snapshot found");
            return Ok(None);
        }

        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read collection snapshot {}", path.display()))?;
        let snapshot: StaticCollection = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse collection snapshot {}", path.display()))?;

        info!(
            pets_owned = snapshot.owned_pet_species.len(),
            toys_needed = snapshot.needed_toys.len(),
            transmogs_needed = snapshot.needed_transmogs.len(),
            "Collection snapshot loaded"
        );
        Ok(Some(snapshot))
    }

    pub fn with_owned_pets(mut self, species: impl IntoIterator<Item = i64>) -> Self {
        self.owned_pet_species.extend(species);
        self
    }

    pub fn with_pet_name(mut self, species_id: i64, name: &str) -> Self {
        self.pet_names.insert(species_id, name.to_string());
        self
    }

    pub fn with_needed_toys(mut self, items: impl IntoIterator<Item = i64>) -> Self {
        self.needed_toys.extend(items);
        self
    }

    pub fn with_needed_transmogs(mut self, items: impl IntoIterator<Item = i64>) -> Self {
        self.needed_transmogs.extend(items);
        self
    }
}

impl CollectionTracker for StaticCollection {
    fn owns_pet(&self, species_id: i64) -> bool {
        self.owned_pet_species.contains(&species_id)
    }

    fn pet_name(&self, species_id: i64) -> Option<String> {
        self.pet_names.get(&species_id).cloned()
    }

    fn needs_toy(&self, item_id: i64) -> bool {
        self.needed_toys.contains(&item_id)
    }

    fn needs_transmog(&self, item_id: i64) -> bool {
        item_id > 0 && self.needed_transmogs.contains(&item_id)
    }
}
