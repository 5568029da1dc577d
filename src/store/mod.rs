//! Storage contract for cached responses.
//!
//! The in-memory store is the default; external stores (a remote key-value
//! service, a shared cache tier) implement the same trait. Store failures
//! never surface to callers of the cache engine: they degrade to live
//! execution.

mod memory;

use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;

use crate::keys::{CacheKey, EntityRef};
use crate::operation::ExecutionResult;
use crate::ttl::Ttl;

pub use memory::InMemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cache backend error: {0}")]
    Backend(String),
    #[error("cached payload could not be decoded: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Key-value storage for cached responses with entity-indexed invalidation.
///
/// Implementations must keep the dependency index in step with entry
/// insertion so that an entry is always reachable by every entity it
/// references, and never reachable once expired or invalidated.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up an unexpired, uninvalidated entry.
    async fn get(&self, key: &CacheKey) -> Result<Option<ExecutionResult>, StoreError>;

    /// Insert an entry with its expiry and dependency set.
    ///
    /// A pass-through TTL (zero) must not persist anything.
    async fn set(
        &self,
        key: CacheKey,
        response: ExecutionResult,
        ttl: Ttl,
        entities: HashSet<EntityRef>,
    ) -> Result<(), StoreError>;

    /// Purge every entry whose dependency set matches one of the given
    /// references. Returns the number of purged entries. Matchers naming
    /// unknown types are no-ops.
    async fn invalidate(&self, matchers: &[EntityRef]) -> Result<u64, StoreError>;

    /// Presence check with the same expiry semantics as `get`.
    async fn has(&self, key: &CacheKey) -> Result<bool, StoreError>;

    /// Drop every entry and index record.
    async fn clear(&self) -> Result<(), StoreError>;
}
