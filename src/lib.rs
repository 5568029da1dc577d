//! Risposta, a GraphQL response cache with entity-based invalidation.
//!
//! Memoizes query execution results keyed by a fingerprint of the operation
//! document, its variables, and an optional per-request session. Each cached
//! response tracks the `(__typename, id)` entities it contains; mutations
//! (and a manual API) invalidate by entity, so only the affected entries are
//! purged.
//!
//! ## Usage
//!
//! ```no_run
//! use risposta::{CacheConfig, ExecutionResult, Operation, ResponseCache};
//! use serde_json::json;
//!
//! # async fn example() {
//! let cache: ResponseCache = ResponseCache::builder()
//!     .config(CacheConfig {
//!         ttl: Some(2_000),
//!         ..Default::default()
//!     })
//!     .build();
//!
//! let operation = Operation::query("{ me { __typename id name } }");
//! let response = cache
//!     .execute(&(), &operation, || async {
//!         // Hand the operation to the real GraphQL executor here.
//!         ExecutionResult::ok(json!({"me": {"__typename": "User", "id": "1"}}))
//!     })
//!     .await;
//! # let _ = response;
//! # }
//! ```
//!
//! The execution engine and the HTTP layer stay on the host's side of the
//! `execute` closure; the cache never parses or resolves GraphQL itself.

mod config;
mod engine;
mod extract;
mod keys;
mod lock;
mod operation;
mod registry;
mod store;
pub mod telemetry;
mod ttl;

pub use config::CacheConfig;
pub use engine::{ResponseCache, ResponseCacheBuilder, SessionFn};
pub use extract::{ResultFacts, collect_facts};
pub use keys::{CacheKey, EntityRef, SessionId, build_cache_key};
pub use operation::{ExecutionResult, Operation, OperationKind};
pub use store::{CacheStore, InMemoryStore, StoreError};
pub use ttl::{Ttl, resolve_ttl};
