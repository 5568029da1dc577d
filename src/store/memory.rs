//! In-memory cache store.
//!
//! LRU-bounded storage guarded by a single `RwLock`, so an entry and its
//! dependency-index registration always change together. Expiry is checked
//! lazily on lookup; there is no background sweep.

use std::collections::HashSet;
use std::sync::RwLock;
use std::time::Instant;

use async_trait::async_trait;
use lru::LruCache;
use metrics::counter;
use tracing::debug;

use crate::config::CacheConfig;
use crate::keys::{CacheKey, EntityRef};
use crate::lock::{rw_read, rw_write};
use crate::operation::ExecutionResult;
use crate::registry::DependencyIndex;
use crate::telemetry::{METRIC_EVICT_TOTAL, METRIC_EXPIRED_TOTAL};
use crate::ttl::Ttl;

use super::{CacheStore, StoreError};

const SOURCE: &str = "store::memory";

struct Entry {
    response: ExecutionResult,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

struct Inner {
    entries: LruCache<CacheKey, Entry>,
    index: DependencyIndex,
}

/// Default store: bounded, process-local, safe under concurrent access.
///
/// Two concurrent misses for the same key may both write; the last write
/// wins. Likewise a write racing an invalidation is resolved by lock
/// acquisition order, so a write landing after the purge produces a fresh,
/// valid entry.
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            inner: RwLock::new(Inner {
                entries: LruCache::new(config.max_entries_non_zero()),
                index: DependencyIndex::new(),
            }),
        }
    }

    /// Number of stored entries, including any not yet lazily expired.
    pub fn len(&self) -> usize {
        rw_read(&self.inner, SOURCE, "len").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of entity references currently indexed, counting each exact
    /// reference and its type-level alias separately.
    pub fn indexed_entity_count(&self) -> usize {
        rw_read(&self.inner, SOURCE, "indexed_entity_count")
            .index
            .entity_count()
    }

    /// Number of cache keys with a registered dependency set.
    pub fn indexed_key_count(&self) -> usize {
        rw_read(&self.inner, SOURCE, "indexed_key_count")
            .index
            .key_count()
    }

    /// Drop the entry if its deadline has passed. Returns true when an
    /// unexpired entry remains.
    fn prune_expired(inner: &mut Inner, key: &CacheKey, now: Instant) -> bool {
        match inner.entries.peek(key) {
            None => false,
            Some(entry) if entry.is_expired(now) => {
                inner.entries.pop(key);
                inner.index.unregister(key);
                counter!(METRIC_EXPIRED_TOTAL).increment(1);
                false
            }
            Some(_) => true,
        }
    }
}

#[async_trait]
impl CacheStore for InMemoryStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<ExecutionResult>, StoreError> {
        let mut guard = rw_write(&self.inner, SOURCE, "get");
        let inner = &mut *guard;

        if !Self::prune_expired(inner, key, Instant::now()) {
            return Ok(None);
        }
        Ok(inner.entries.get(key).map(|entry| entry.response.clone()))
    }

    async fn set(
        &self,
        key: CacheKey,
        response: ExecutionResult,
        ttl: Ttl,
        entities: HashSet<EntityRef>,
    ) -> Result<(), StoreError> {
        if ttl.is_pass_through() {
            debug!(cache_key = %key, "Zero TTL, entry not persisted");
            return Ok(());
        }

        let entry = Entry {
            response,
            expires_at: ttl.deadline(Instant::now()),
        };

        let mut guard = rw_write(&self.inner, SOURCE, "set");
        let inner = &mut *guard;

        if let Some((evicted, _)) = inner.entries.push(key.clone(), entry) {
            // `push` also reports a same-key replacement, which is not an
            // eviction; `register` below refreshes that key's dependencies.
            if evicted != key {
                inner.index.unregister(&evicted);
                counter!(METRIC_EVICT_TOTAL).increment(1);
            }
        }
        inner.index.register(key, &entities);
        Ok(())
    }

    async fn invalidate(&self, matchers: &[EntityRef]) -> Result<u64, StoreError> {
        let mut guard = rw_write(&self.inner, SOURCE, "invalidate");
        let inner = &mut *guard;

        let mut purged = 0u64;
        for matcher in matchers {
            for key in inner.index.keys_for(matcher) {
                if inner.entries.pop(&key).is_some() {
                    purged += 1;
                }
                inner.index.unregister(&key);
            }
        }
        Ok(purged)
    }

    async fn has(&self, key: &CacheKey) -> Result<bool, StoreError> {
        let mut guard = rw_write(&self.inner, SOURCE, "has");
        Ok(Self::prune_expired(&mut guard, key, Instant::now()))
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut guard = rw_write(&self.inner, SOURCE, "clear");
        guard.entries.clear();
        guard.index.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::keys::build_cache_key;
    use crate::operation::Operation;

    fn store() -> InMemoryStore {
        InMemoryStore::new(&CacheConfig::default())
    }

    fn key(document: &str) -> CacheKey {
        build_cache_key(&Operation::query(document), None).expect("fingerprintable operation")
    }

    fn response(marker: &str) -> ExecutionResult {
        ExecutionResult::ok(json!({"marker": marker}))
    }

    fn user_deps(id: &str) -> HashSet<EntityRef> {
        HashSet::from([EntityRef::new("User", id)])
    }

    #[tokio::test]
    async fn set_get_roundtrip() {
        let store = store();
        let key = key("{ me { id } }");

        assert!(store.get(&key).await.expect("get").is_none());

        store
            .set(key.clone(), response("a"), Ttl::Never, user_deps("1"))
            .await
            .expect("set");

        let cached = store.get(&key).await.expect("get").expect("cached entry");
        assert_eq!(cached, response("a"));
        assert!(store.has(&key).await.expect("has"));
    }

    #[tokio::test]
    async fn expired_entries_are_pruned_on_get() {
        let store = store();
        let key = key("{ me { id } }");

        store
            .set(key.clone(), response("a"), Ttl::from_millis(10), user_deps("1"))
            .await
            .expect("set");

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(store.get(&key).await.expect("get").is_none());
        assert!(!store.has(&key).await.expect("has"));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn zero_ttl_is_never_persisted() {
        let store = store();
        let key = key("{ now }");

        store
            .set(key.clone(), response("a"), Ttl::from_millis(0), HashSet::new())
            .await
            .expect("set");

        assert!(store.get(&key).await.expect("get").is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn invalidate_by_exact_entity() {
        let store = store();
        let one = key("{ user(id: 1) { id } }");
        let two = key("{ user(id: 2) { id } }");

        store
            .set(one.clone(), response("1"), Ttl::Never, user_deps("1"))
            .await
            .expect("set");
        store
            .set(two.clone(), response("2"), Ttl::Never, user_deps("2"))
            .await
            .expect("set");

        let purged = store
            .invalidate(&[EntityRef::new("User", "1")])
            .await
            .expect("invalidate");
        assert_eq!(purged, 1);
        assert!(store.get(&one).await.expect("get").is_none());
        assert!(store.get(&two).await.expect("get").is_some());
    }

    #[tokio::test]
    async fn invalidate_by_type_sweeps_all_ids() {
        let store = store();
        let one = key("{ user(id: 1) { id } }");
        let two = key("{ user(id: 2) { id } }");

        store
            .set(one.clone(), response("1"), Ttl::Never, user_deps("1"))
            .await
            .expect("set");
        store
            .set(two.clone(), response("2"), Ttl::Never, user_deps("2"))
            .await
            .expect("set");

        let purged = store
            .invalidate(&[EntityRef::typed("User")])
            .await
            .expect("invalidate");
        assert_eq!(purged, 2);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn invalidating_unknown_type_is_a_no_op() {
        let store = store();
        let key = key("{ me { id } }");

        store
            .set(key.clone(), response("a"), Ttl::Never, user_deps("1"))
            .await
            .expect("set");

        let purged = store
            .invalidate(&[EntityRef::typed("Ghost")])
            .await
            .expect("invalidate");
        assert_eq!(purged, 0);
        assert!(store.get(&key).await.expect("get").is_some());
    }

    #[tokio::test]
    async fn lru_eviction_unregisters_dependencies() {
        let config = CacheConfig {
            max_entries: 1,
            ..Default::default()
        };
        let store = InMemoryStore::new(&config);
        let first = key("{ user(id: 1) { id } }");
        let second = key("{ user(id: 2) { id } }");

        store
            .set(first.clone(), response("1"), Ttl::Never, user_deps("1"))
            .await
            .expect("set");
        store
            .set(second.clone(), response("2"), Ttl::Never, user_deps("2"))
            .await
            .expect("set");

        assert!(store.get(&first).await.expect("get").is_none());

        // The evicted entry's dependencies are gone: invalidating User:1
        // purges nothing and leaves the surviving entry alone.
        let purged = store
            .invalidate(&[EntityRef::new("User", "1")])
            .await
            .expect("invalidate");
        assert_eq!(purged, 0);
        assert!(store.get(&second).await.expect("get").is_some());
    }

    #[tokio::test]
    async fn clear_drops_entries_and_index() {
        let store = store();
        let key = key("{ me { id } }");

        store
            .set(key.clone(), response("a"), Ttl::Never, user_deps("1"))
            .await
            .expect("set");
        store.clear().await.expect("clear");

        assert!(store.is_empty());
        let purged = store
            .invalidate(&[EntityRef::typed("User")])
            .await
            .expect("invalidate");
        assert_eq!(purged, 0);
    }

    #[tokio::test]
    async fn index_counts_track_the_stored_entries() {
        let store = store();
        let key = key("{ user(id: 1) { id } }");

        assert_eq!(store.indexed_key_count(), 0);
        assert_eq!(store.indexed_entity_count(), 0);

        store
            .set(key.clone(), response("1"), Ttl::Never, user_deps("1"))
            .await
            .expect("set");

        assert_eq!(store.indexed_key_count(), 1);
        // User:1 plus its type-level alias.
        assert_eq!(store.indexed_entity_count(), 2);

        store
            .invalidate(&[EntityRef::new("User", "1")])
            .await
            .expect("invalidate");

        assert_eq!(store.indexed_key_count(), 0);
        assert_eq!(store.indexed_entity_count(), 0);
    }

    #[tokio::test]
    async fn recovers_from_poisoned_lock() {
        let store = store();
        let key = key("{ me { id } }");

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = store.inner.write().expect("inner lock should be acquired");
            panic!("poison inner lock");
        }));

        store
            .set(key.clone(), response("a"), Ttl::Never, user_deps("1"))
            .await
            .expect("set");
        assert!(store.get(&key).await.expect("get").is_some());
    }
}
