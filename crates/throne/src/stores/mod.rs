#![forbid(unsafe_code)]

mod apk_cache;
mod pending;
mod registry;

pub use apk_cache::{ApkPathCache, hash_apk_path};
pub use pending::{PendingRootCache, ProbeOutcome};
pub use registry::ManagerRegistry;

use std::sync::{Mutex, MutexGuard};

/// Lock the shared stores, recovering the guard from a poisoned mutex.
/// Every mutation completes before its guard drops, so the stores are
/// consistent even after a panic elsewhere.
pub fn lock_stores(stores: &Mutex<TrustStores>) -> MutexGuard<'_, TrustStores> {
    match stores.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// All mutable trust state, bundled so callers share one ownership
/// boundary (the daemon wraps it in a single mutex). Scan passes and
/// escalation calls never observe a partially updated view.
#[derive(Debug)]
pub struct TrustStores {
    pub registry: ManagerRegistry,
    pub apk_cache: ApkPathCache,
    pub pending: PendingRootCache,
}

impl TrustStores {
    pub fn new(pending_capacity: usize, pending_decay_threshold: u32) -> Self {
        Self {
            registry: ManagerRegistry::default(),
            apk_cache: ApkPathCache::default(),
            pending: PendingRootCache::new(pending_capacity, pending_decay_threshold),
        }
    }
}
