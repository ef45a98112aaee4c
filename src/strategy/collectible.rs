//! Collectible rules: battle pets, toys, and transmog appearances.
//!
//! Each rule asks the `CollectionTracker` whether the thing is wanted and
//! takes the answer as given, then applies its own price ceiling and
//! quality floors. All ceilings are inclusive.

use std::collections::HashMap;
use std::sync::Arc;

use super::keep_cheapest;
use crate::collections::CollectionTracker;
use crate::config::{PetRuleConfig, ToyRuleConfig, TransmogRuleConfig};
use crate::engine::fetcher::ListingBook;
use crate::types::{ItemRecord, ListingRecord, PetInfo, Signal, SignalKind};

pub struct CollectibleRules {
    tracker: Arc<dyn CollectionTracker>,
    pets: PetRuleConfig,
    toys: ToyRuleConfig,
    transmog: TransmogRuleConfig,
}

impl CollectibleRules {
    pub fn new(
        tracker: Arc<dyn CollectionTracker>,
        pets: PetRuleConfig,
        toys: ToyRuleConfig,
        transmog: TransmogRuleConfig,
    ) -> Self {
        Self {
            tracker,
            pets,
            toys,
            transmog,
        }
    }

    /// Cheapest qualifying listing per display name, over all three rules.
    pub fn find(
        &self,
        realm: &str,
        book: &ListingBook,
        items: &HashMap<i64, ItemRecord>,
    ) -> Vec<Signal> {
        let mut found: HashMap<String, Signal> = HashMap::new();

        for (item_id, listings) in book.groups() {
            for listing in listings {
                if listing.unit_price <= 0 {
                    continue;
                }

                let signal = match &listing.pet {
                    Some(pet) => self.pet_signal(realm, listing, pet),
                    None => items.get(&item_id).and_then(|item| {
                        self.toy_signal(realm, listing, item)
                            .or_else(|| self.transmog_signal(realm, listing, item))
                    }),
                };

                if let Some(signal) = signal {
                    keep_cheapest(&mut found, signal);
                }
            }
        }

        found.into_values().collect()
    }

    fn pet_signal(&self, realm: &str, listing: &ListingRecord, pet: &PetInfo) -> Option<Signal> {
        let cfg = &self.pets;
        if !cfg.enabled || pet.quality_id < cfg.min_quality || pet.level < cfg.min_level {
            return None;
        }

        let kind = if self.tracker.owns_pet(pet.species_id) {
            (listing.unit_price <= cfg.bargain_price).then_some(SignalKind::CollectibleBargain)?
        } else {
            (listing.unit_price <= cfg.max_price).then_some(SignalKind::CollectibleNeeded)?
        };

        let name = self
            .tracker
            .pet_name(pet.species_id)
            .unwrap_or_else(|| format!("Pet species {}", pet.species_id));
        Some(Signal::new(realm, kind, name, listing.unit_price))
    }

    fn toy_signal(&self, realm: &str, listing: &ListingRecord, item: &ItemRecord) -> Option<Signal> {
        let cfg = &self.toys;
        if cfg.enabled && listing.unit_price <= cfg.max_price && self.tracker.needs_toy(item.id) {
            Some(Signal::new(realm, SignalKind::CollectibleNeeded, &item.name, listing.unit_price))
        } else {
            None
        }
    }

    fn transmog_signal(
        &self,
        realm: &str,
        listing: &ListingRecord,
        item: &ItemRecord,
    ) -> Option<Signal> {
        let cfg = &self.transmog;
        if cfg.enabled
            && item.equippable
            && item.item_level >= cfg.min_item_level
            && listing.unit_price <= cfg.max_price
            && self.tracker.needs_transmog(item.id)
        {
            Some(Signal::new(realm, SignalKind::CollectibleNeeded, &item.name, listing.unit_price))
        } else {
            None
        }
    }
}
