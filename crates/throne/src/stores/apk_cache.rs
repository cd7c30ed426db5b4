#![forbid(unsafe_code)]

use rustc_hash::{FxHashMap, FxHasher};
use std::hash::Hasher;
use std::path::Path;

/// Content-addressed hash of an install path, used to skip re-verifying
/// signatures of binaries already seen in a previous pass.
pub fn hash_apk_path(path: &Path) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(path.as_os_str().as_encoded_bytes());
    hasher.finish()
}

/// Previously-seen non-manager install paths. Entries carry a
/// seen-this-pass mark; anything unmarked at the end of a pass is
/// evicted (the file disappeared, so the cached verdict is stale).
#[derive(Debug, Default)]
pub struct ApkPathCache {
    entries: FxHashMap<u64, bool>,
}

impl ApkPathCache {
    /// Reset the seen marks at the start of a pass.
    pub fn begin_pass(&mut self) {
        for seen in self.entries.values_mut() {
            *seen = false;
        }
    }

    /// Mark `hash` present and report whether it was already cached.
    pub fn hit(&mut self, hash: u64) -> bool {
        match self.entries.get_mut(&hash) {
            Some(seen) => {
                *seen = true;
                true
            }
            None => false,
        }
    }

    pub fn insert(&mut self, hash: u64) {
        self.entries.insert(hash, true);
    }

    /// Drop everything. A confirmed primary manager makes further
    /// scanning of this cache unnecessary until it disappears.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Evict entries not observed this pass.
    pub fn evict_stale(&mut self) {
        self.entries.retain(|_, seen| *seen);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
