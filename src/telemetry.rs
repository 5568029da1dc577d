//! Metric names and descriptions.
//!
//! The crate emits metrics through the `metrics` facade; the host decides
//! where they go. Call [`describe_metrics`] once at startup if the chosen
//! recorder surfaces descriptions.

use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};

pub const METRIC_HIT_TOTAL: &str = "risposta_cache_hit_total";
pub const METRIC_MISS_TOTAL: &str = "risposta_cache_miss_total";
pub const METRIC_BYPASS_TOTAL: &str = "risposta_cache_bypass_total";
pub const METRIC_EVICT_TOTAL: &str = "risposta_cache_evict_total";
pub const METRIC_EXPIRED_TOTAL: &str = "risposta_cache_expired_total";
pub const METRIC_INVALIDATED_TOTAL: &str = "risposta_cache_invalidated_entries_total";
pub const METRIC_LOOKUP_MS: &str = "risposta_cache_lookup_ms";

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Register descriptions for every metric the crate emits. Idempotent.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_HIT_TOTAL,
            Unit::Count,
            "Total number of responses served from cache."
        );
        describe_counter!(
            METRIC_MISS_TOTAL,
            Unit::Count,
            "Total number of cacheable operations executed live."
        );
        describe_counter!(
            METRIC_BYPASS_TOTAL,
            Unit::Count,
            "Total number of operations that bypassed the cache."
        );
        describe_counter!(
            METRIC_EVICT_TOTAL,
            Unit::Count,
            "Total number of entries evicted due to capacity."
        );
        describe_counter!(
            METRIC_EXPIRED_TOTAL,
            Unit::Count,
            "Total number of entries dropped at lookup after TTL expiry."
        );
        describe_counter!(
            METRIC_INVALIDATED_TOTAL,
            Unit::Count,
            "Total number of entries purged by entity invalidation."
        );
        describe_histogram!(
            METRIC_LOOKUP_MS,
            Unit::Milliseconds,
            "Cache lookup latency in milliseconds."
        );
    });
}
