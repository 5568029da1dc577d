//! Cache key definitions and operation fingerprinting.
//!
//! A `CacheKey` is a SHA-256 fingerprint of the raw document text, the
//! operation name, a canonical serialization of the variables, and the
//! session discriminator. An `EntityRef` identifies a piece of domain data
//! a cached response depends on.

use std::fmt;

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::operation::Operation;

/// Per-request session discriminator. Two requests with different sessions
/// never share a cache entry.
pub type SessionId = String;

/// Directives whose presence makes an operation non-deterministic from the
/// cache's point of view. The scan is over raw document text, so a match
/// inside a string literal also bypasses caching; that errs on the safe side.
const NONDETERMINISTIC_DIRECTIVES: [&str; 3] = ["@defer", "@stream", "@live"];

/// Fingerprint identifying one cacheable operation execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies an entity a cached response depends on, or an invalidation
/// matcher.
///
/// With `id: None` the reference covers the whole type: as a dependency it
/// marks "some entity of this type without a readable id", and as a matcher
/// it purges every entry that references the type regardless of id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub type_name: String,
    pub id: Option<String>,
}

impl EntityRef {
    pub fn new(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id: Some(id.into()),
        }
    }

    /// A type-level reference with no id.
    pub fn typed(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id: None,
        }
    }

    /// The type-level form of this reference.
    pub fn type_level(&self) -> EntityRef {
        EntityRef {
            type_name: self.type_name.clone(),
            id: None,
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}:{}", self.type_name, id),
            None => f.write_str(&self.type_name),
        }
    }
}

/// Build the cache key for an operation, or `None` when the operation
/// cannot be deterministically fingerprinted and must bypass the cache.
pub fn build_cache_key(operation: &Operation, session: Option<&SessionId>) -> Option<CacheKey> {
    if has_nondeterministic_directive(&operation.document) {
        return None;
    }

    let mut hasher = Sha256::new();

    // The document is hashed verbatim. Whitespace can be significant inside
    // string literals, so collapsing it would let two different operations
    // share a key; formatting variants of the same operation merely occupy
    // separate entries.
    hasher.update(operation.document.as_bytes());
    hasher.update([0u8]);

    if let Some(name) = &operation.operation_name {
        hasher.update(name.as_bytes());
    }
    hasher.update([0u8]);

    hasher.update(canonical_json(&operation.variables).as_bytes());
    hasher.update([0u8]);

    // The tag byte keeps `session: None` distinct from an empty session id.
    if let Some(session) = session {
        hasher.update([1u8]);
        hasher.update(session.as_bytes());
    }

    Some(CacheKey(hex::encode(hasher.finalize())))
}

fn has_nondeterministic_directive(document: &str) -> bool {
    NONDETERMINISTIC_DIRECTIVES
        .iter()
        .any(|directive| document.contains(directive))
}

/// Serialize a JSON value with object keys in sorted order so that
/// semantically equal variable sets hash identically.
fn canonical_json(value: &Value) -> String {
    fn sort(value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut entries: Vec<(&String, &Value)> = map.iter().collect();
                entries.sort_by_key(|(key, _)| key.as_str());
                Value::Object(
                    entries
                        .into_iter()
                        .map(|(key, child)| (key.clone(), sort(child)))
                        .collect(),
                )
            }
            Value::Array(items) => Value::Array(items.iter().map(sort).collect()),
            other => other.clone(),
        }
    }

    sort(value).to_string()
}
