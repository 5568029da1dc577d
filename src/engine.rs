//! Response cache engine.
//!
//! Sits between the transport layer and the GraphQL executor. Queries are
//! served from cache when possible; mutations run live and purge every
//! entry depending on the entities they touched. Store faults never fail a
//! request: the engine logs them and executes live.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tracing::{debug, info, warn};

use crate::config::CacheConfig;
use crate::extract::collect_facts;
use crate::keys::{EntityRef, SessionId, build_cache_key};
use crate::operation::{ExecutionResult, Operation, OperationKind};
use crate::store::{CacheStore, InMemoryStore};
use crate::telemetry::{
    METRIC_BYPASS_TOTAL, METRIC_HIT_TOTAL, METRIC_INVALIDATED_TOTAL, METRIC_LOOKUP_MS,
    METRIC_MISS_TOTAL,
};
use crate::ttl::resolve_ttl;

/// Derives the session discriminator from the host's request type.
/// Returning `None` places the response in the global (shared) partition.
pub type SessionFn<R> = Arc<dyn Fn(&R) -> Option<SessionId> + Send + Sync>;

/// Shared response cache, constructed once at startup and shared by
/// reference across concurrent request handlers.
///
/// `R` is the host's request type, consumed only by the optional session
/// hook; hosts without session partitioning can leave it as `()`.
pub struct ResponseCache<R = ()> {
    config: CacheConfig,
    store: Arc<dyn CacheStore>,
    session: Option<SessionFn<R>>,
}

impl<R> ResponseCache<R> {
    /// A cache with the default in-memory store and no session hook.
    pub fn new(config: CacheConfig) -> Self {
        ResponseCacheBuilder::new().config(config).build()
    }

    pub fn builder() -> ResponseCacheBuilder<R> {
        ResponseCacheBuilder::new()
    }

    /// The underlying store, for administrative access (manual clears,
    /// external invalidation plumbing).
    pub fn store(&self) -> Arc<dyn CacheStore> {
        Arc::clone(&self.store)
    }

    /// Execute an operation through the cache.
    ///
    /// `run` is the downstream executor and is only invoked when the cache
    /// cannot answer: misses, mutations, subscriptions, bypasses, and any
    /// degraded store fault.
    pub async fn execute<F, Fut>(&self, request: &R, operation: &Operation, run: F) -> ExecutionResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ExecutionResult>,
    {
        if !self.config.enabled {
            return run().await;
        }

        match operation.kind {
            OperationKind::Query => self.execute_query(request, operation, run).await,
            OperationKind::Mutation => self.execute_mutation(run).await,
            OperationKind::Subscription => run().await,
        }
    }

    /// Manually purge entries matching the given references. A matcher with
    /// an id purges only entries depending on that exact entity; a matcher
    /// without one purges every entry referencing the type.
    ///
    /// Returns the number of purged entries; store faults purge nothing.
    pub async fn invalidate(&self, matchers: &[EntityRef]) -> u64 {
        match self.store.invalidate(matchers).await {
            Ok(purged) => {
                counter!(METRIC_INVALIDATED_TOTAL).increment(purged);
                info!(purged, matchers = matchers.len(), "Manual cache invalidation");
                purged
            }
            Err(error) => {
                warn!(%error, "Manual cache invalidation failed");
                0
            }
        }
    }

    async fn execute_query<F, Fut>(&self, request: &R, operation: &Operation, run: F) -> ExecutionResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ExecutionResult>,
    {
        let session = self.session.as_ref().and_then(|derive| derive(request));
        let Some(key) = build_cache_key(operation, session.as_ref()) else {
            counter!(METRIC_BYPASS_TOTAL).increment(1);
            debug!(reason = "non_fingerprintable", "Cache bypass");
            return run().await;
        };

        let lookup_started = Instant::now();
        match self.store.get(&key).await {
            Ok(Some(cached)) => {
                histogram!(METRIC_LOOKUP_MS)
                    .record(lookup_started.elapsed().as_secs_f64() * 1000.0);
                counter!(METRIC_HIT_TOTAL).increment(1);
                debug!(cache_key = %key, outcome = "hit", "Serving cached response");
                return cached;
            }
            Ok(None) => {
                histogram!(METRIC_LOOKUP_MS)
                    .record(lookup_started.elapsed().as_secs_f64() * 1000.0);
                counter!(METRIC_MISS_TOTAL).increment(1);
                debug!(cache_key = %key, outcome = "miss", "Executing live");
            }
            Err(error) => {
                counter!(METRIC_BYPASS_TOTAL).increment(1);
                warn!(%error, "Cache store lookup failed, executing live");
                return run().await;
            }
        }

        let result = run().await;
        if result.has_errors() {
            debug!(cache_key = %key, "Result carries errors, not cached");
            return result;
        }

        let facts = collect_facts(
            &result.data,
            operation.kind.root_type_name(),
            &self.config.id_fields,
        );
        if facts
            .type_names()
            .iter()
            .any(|type_name| self.config.ignored_types.contains(*type_name))
        {
            counter!(METRIC_BYPASS_TOTAL).increment(1);
            debug!(cache_key = %key, reason = "ignored_type", "Cache bypass");
            return result;
        }

        let ttl = resolve_ttl(&self.config, &facts);
        if ttl.is_pass_through() {
            debug!(cache_key = %key, "Zero effective TTL, not cached");
            return result;
        }

        if let Err(error) = self
            .store
            .set(key, result.clone(), ttl, facts.entities)
            .await
        {
            warn!(%error, "Cache store write failed, response served uncached");
        }
        result
    }

    async fn execute_mutation<F, Fut>(&self, run: F) -> ExecutionResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ExecutionResult>,
    {
        let result = run().await;
        if !self.config.invalidate_via_mutation {
            return result;
        }
        if result.has_errors() {
            debug!("Mutation carries errors, skipping invalidation");
            return result;
        }

        let facts = collect_facts(
            &result.data,
            OperationKind::Mutation.root_type_name(),
            &self.config.id_fields,
        );
        if facts.entities.is_empty() {
            return result;
        }

        let matchers: Vec<EntityRef> = facts.entities.into_iter().collect();
        match self.store.invalidate(&matchers).await {
            Ok(purged) => {
                counter!(METRIC_INVALIDATED_TOTAL).increment(purged);
                info!(
                    purged,
                    entities = matchers.len(),
                    "Invalidated entries after mutation"
                );
            }
            Err(error) => warn!(%error, "Mutation-driven invalidation failed"),
        }
        result
    }
}

/// Builder for [`ResponseCache`].
pub struct ResponseCacheBuilder<R = ()> {
    config: CacheConfig,
    store: Option<Arc<dyn CacheStore>>,
    session: Option<SessionFn<R>>,
}

impl<R> ResponseCacheBuilder<R> {
    pub fn new() -> Self {
        Self {
            config: CacheConfig::default(),
            store: None,
            session: None,
        }
    }

    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Install a store other than the in-memory default.
    pub fn store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Install the session hook.
    pub fn session(
        mut self,
        derive: impl Fn(&R) -> Option<SessionId> + Send + Sync + 'static,
    ) -> Self {
        self.session = Some(Arc::new(derive));
        self
    }

    pub fn build(self) -> ResponseCache<R> {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryStore::new(&self.config)));
        ResponseCache {
            config: self.config,
            store,
            session: self.session,
        }
    }
}

impl<R> Default for ResponseCacheBuilder<R> {
    fn default() -> Self {
        Self::new()
    }
}
