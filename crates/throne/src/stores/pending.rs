#![forbid(unsafe_code)]

use crate::domain::Uid;
use rustc_hash::FxHashMap;
use tracing::warn;

#[derive(Debug, Clone, Copy, Default)]
struct PendingEntry {
    use_count: u32,
    remove_calls: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// No temporary grant is tracked for this uid.
    Absent,
    /// Still pending; counters advanced.
    Pending,
    /// The decay threshold was reached on this call. The entry is gone
    /// and the caller must fire revocation exactly once.
    Expired,
}

/// Uids holding a temporary, decaying root grant. Decay is counted in
/// liveness probes, not wall-clock time: an entry whose `remove_calls`
/// reaches the threshold without a refresh is evicted.
#[derive(Debug)]
pub struct PendingRootCache {
    entries: FxHashMap<Uid, PendingEntry>,
    capacity: usize,
    decay_threshold: u32,
}

impl PendingRootCache {
    pub fn new(capacity: usize, decay_threshold: u32) -> Self {
        Self {
            entries: FxHashMap::default(),
            capacity,
            decay_threshold,
        }
    }

    /// Track a fresh grant, or reset the counters of an existing one.
    /// At capacity, the grant itself stands but its decay is no longer
    /// tracked; the rejection is logged and reported.
    pub fn grant(&mut self, uid: Uid) -> bool {
        if let Some(entry) = self.entries.get_mut(&uid) {
            *entry = PendingEntry::default();
            return true;
        }
        if self.entries.len() >= self.capacity {
            warn!(%uid, capacity = self.capacity, "pending-root cache full, grant not tracked");
            return false;
        }
        self.entries.insert(uid, PendingEntry::default());
        true
    }

    /// Liveness probe: advances both counters and answers membership,
    /// evicting the entry when the decay threshold is reached.
    pub fn probe(&mut self, uid: Uid) -> ProbeOutcome {
        let Some(entry) = self.entries.get_mut(&uid) else {
            return ProbeOutcome::Absent;
        };
        entry.use_count = entry.use_count.saturating_add(1);
        entry.remove_calls += 1;
        if entry.remove_calls >= self.decay_threshold {
            self.entries.remove(&uid);
            ProbeOutcome::Expired
        } else {
            ProbeOutcome::Pending
        }
    }

    /// Advance only the removal counter, evicting at the threshold.
    pub fn evict_if_expired(&mut self, uid: Uid) -> ProbeOutcome {
        let Some(entry) = self.entries.get_mut(&uid) else {
            return ProbeOutcome::Absent;
        };
        entry.remove_calls += 1;
        if entry.remove_calls >= self.decay_threshold {
            self.entries.remove(&uid);
            ProbeOutcome::Expired
        } else {
            ProbeOutcome::Pending
        }
    }

    pub fn contains(&self, uid: Uid) -> bool {
        self.entries.contains_key(&uid)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
