//! Poison-tolerant guards for the store's `RwLock`.
//!
//! A panic while holding the lock poisons it. Everything the lock guards is
//! disposable cached data, so recovery takes the guard anyway and logs a
//! warning instead of propagating the panic; the worst case is a stale entry
//! that expiry or invalidation will remove.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

pub(crate) fn rw_read<'a, T>(
    lock: &'a RwLock<T>,
    source: &'static str,
    op: &'static str,
) -> RwLockReadGuard<'a, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(source, op, mode = "read", "Store lock poisoned, continuing with recovered guard");
            poisoned.into_inner()
        }
    }
}

pub(crate) fn rw_write<'a, T>(
    lock: &'a RwLock<T>,
    source: &'static str,
    op: &'static str,
) -> RwLockWriteGuard<'a, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(source, op, mode = "write", "Store lock poisoned, continuing with recovered guard");
            poisoned.into_inner()
        }
    }
}
