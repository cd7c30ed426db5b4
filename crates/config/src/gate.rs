use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Gate {
    /// Secret for the manual escalation fallback. When unset, every
    /// request that reaches the password check is denied, so hosts that
    /// rely purely on the allow-list can leave this empty.
    ///
    /// # Note
    ///
    /// The comparison is constant-time, but the secret itself is stored
    /// in the configuration file; protect the file accordingly.
    pub password: Option<String>,

    /// Capacity of the pending-root cache. Once full, new temporary
    /// grants still happen but their decay is no longer tracked.
    pub pending_capacity: usize,

    /// Number of liveness probes after which an unrefreshed temporary
    /// grant is evicted and revoked. Decay is counted in calls, not
    /// wall-clock time, so revocation is deterministic.
    pub pending_decay_threshold: u32,
}

impl Default for Gate {
    fn default() -> Self {
        Self {
            password: None,
            pending_capacity: 8,
            pending_decay_threshold: 3,
        }
    }
}
