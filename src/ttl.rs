//! Tiered TTL resolution.
//!
//! A cached response may contain entities of several types across several
//! schema coordinates; the most restrictive freshness requirement among
//! them governs the whole entry.

use std::time::{Duration, Instant};

use crate::config::CacheConfig;
use crate::extract::ResultFacts;

/// Effective time-to-live for one cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Entry never expires; only invalidation or eviction removes it.
    Never,
    /// Entry expires this long after insertion.
    After(Duration),
}

impl Ttl {
    pub fn from_millis(millis: u64) -> Self {
        Ttl::After(Duration::from_millis(millis))
    }

    /// A zero TTL means the entry must not be persisted at all.
    pub fn is_pass_through(&self) -> bool {
        matches!(self, Ttl::After(duration) if duration.is_zero())
    }

    /// Absolute expiry deadline for an entry inserted at `now`.
    pub fn deadline(&self, now: Instant) -> Option<Instant> {
        match self {
            Ttl::Never => None,
            Ttl::After(duration) => Some(now + *duration),
        }
    }
}

/// Compute the effective TTL for a response with the given facts.
///
/// Candidates are every matching `ttl_per_type` entry and every matching
/// `ttl_per_schema_coordinate` entry; the minimum wins. With no candidate
/// the global default applies (`None` meaning no expiry).
pub fn resolve_ttl(config: &CacheConfig, facts: &ResultFacts) -> Ttl {
    let per_type = facts
        .type_names()
        .into_iter()
        .filter_map(|type_name| config.ttl_per_type.get(type_name));
    let per_coordinate = facts
        .coordinates
        .iter()
        .filter_map(|coordinate| config.ttl_per_schema_coordinate.get(coordinate));

    match per_type.chain(per_coordinate).min() {
        Some(millis) => Ttl::from_millis(*millis),
        None => config.ttl.map_or(Ttl::Never, Ttl::from_millis),
    }
}
