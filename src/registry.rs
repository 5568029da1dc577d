//! Bidirectional dependency index.
//!
//! Tracks which cache keys depend on which entities so that invalidation
//! touches only the affected entries, never the whole cache. The index is
//! plain data; the owning store serializes access under its own lock so
//! that entry insertion and index registration stay atomic.

use std::collections::{HashMap, HashSet};

use crate::keys::{CacheKey, EntityRef};

/// Entity ↔ cache-key index.
///
/// Registration indexes each reference twice: once exactly as extracted and
/// once at type level (`id: None`). A type-only matcher therefore resolves
/// in a single lookup, proportional to its dependents.
#[derive(Debug, Default)]
pub struct DependencyIndex {
    /// Maps entity references to the cache keys depending on them.
    entity_to_keys: HashMap<EntityRef, HashSet<CacheKey>>,
    /// Reverse mapping, used to clean up when an entry is removed.
    key_to_entities: HashMap<CacheKey, HashSet<EntityRef>>,
}

impl DependencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cache entry with the entities it depends on.
    ///
    /// Re-registering an existing key replaces its previous dependency set.
    pub fn register(&mut self, key: CacheKey, entities: &HashSet<EntityRef>) {
        self.unregister(&key);

        let mut indexed: HashSet<EntityRef> = HashSet::with_capacity(entities.len() * 2);
        for entity in entities {
            indexed.insert(entity.clone());
            indexed.insert(entity.type_level());
        }

        for entity in &indexed {
            self.entity_to_keys
                .entry(entity.clone())
                .or_default()
                .insert(key.clone());
        }
        self.key_to_entities.insert(key, indexed);
    }

    /// Cache keys depending on the given entity (exact id match, or every
    /// entry referencing the type when the reference carries no id).
    pub fn keys_for(&self, entity: &EntityRef) -> HashSet<CacheKey> {
        self.entity_to_keys
            .get(entity)
            .cloned()
            .unwrap_or_default()
    }

    /// Remove a cache key and clean up its entity mappings.
    pub fn unregister(&mut self, key: &CacheKey) {
        let Some(entities) = self.key_to_entities.remove(key) else {
            return;
        };
        for entity in entities {
            if let Some(keys) = self.entity_to_keys.get_mut(&entity) {
                keys.remove(key);
                if keys.is_empty() {
                    self.entity_to_keys.remove(&entity);
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.entity_to_keys.clear();
        self.key_to_entities.clear();
    }

    pub fn entity_count(&self) -> usize {
        self.entity_to_keys.len()
    }

    pub fn key_count(&self) -> usize {
        self.key_to_entities.len()
    }
}
