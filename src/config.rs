//! Cache configuration.
//!
//! Controls TTL tiers, mutation-driven invalidation, and the bounds of the
//! default in-memory store.

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;

use serde::Deserialize;

// Default values for cache configuration
const DEFAULT_ENABLED: bool = true;
const DEFAULT_INVALIDATE_VIA_MUTATION: bool = true;
const DEFAULT_MAX_ENTRIES: usize = 1_000;

/// Configuration for the response cache.
///
/// All TTLs are expressed in milliseconds. An unset default TTL means
/// cached responses never expire on their own and are only removed by
/// invalidation or capacity eviction.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Master switch. When false, every operation executes live.
    pub enabled: bool,
    /// Default TTL in milliseconds. `None` means no expiry.
    pub ttl: Option<u64>,
    /// TTL override per GraphQL type name, e.g. `User -> 500`.
    pub ttl_per_type: HashMap<String, u64>,
    /// TTL override per schema coordinate, e.g. `Query.me -> 0`.
    pub ttl_per_schema_coordinate: HashMap<String, u64>,
    /// Purge dependent entries after mutations. Default true.
    pub invalidate_via_mutation: bool,
    /// Responses containing any of these types are never cached.
    pub ignored_types: HashSet<String>,
    /// Field names probed, in order, for an entity id.
    pub id_fields: Vec<String>,
    /// Maximum entries held by the in-memory store.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: DEFAULT_ENABLED,
            ttl: None,
            ttl_per_type: HashMap::new(),
            ttl_per_schema_coordinate: HashMap::new(),
            invalidate_via_mutation: DEFAULT_INVALIDATE_VIA_MUTATION,
            ignored_types: HashSet::new(),
            id_fields: vec!["id".to_string()],
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl CacheConfig {
    /// Returns the entry limit as NonZeroUsize, clamping to 1 if zero.
    pub fn max_entries_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.max_entries).unwrap_or(NonZeroUsize::MIN)
    }
}
