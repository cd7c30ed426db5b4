#![forbid(unsafe_code)]

use crate::domain::{ManagerEvent, ManagerRole, SignatureIndex, Uid};
use tracing::info;

/// The crowned manager uids. Exactly one primary and at most one dynamic
/// uid are locked at any instant; crowning a different uid into a role
/// first revokes the old holder of that same role.
#[derive(Debug, Default)]
pub struct ManagerRegistry {
    primary: Option<Uid>,
    dynamic: Option<Uid>,
}

impl ManagerRegistry {
    /// Lock `uid` into the role its signature index denotes. Returns the
    /// mutations performed, in order; idempotent when the uid already
    /// holds the role.
    pub fn crown(&mut self, uid: Uid, signature: SignatureIndex) -> Vec<ManagerEvent> {
        let mut events = Vec::new();
        match signature.role() {
            ManagerRole::Dynamic => {
                if let Some(old) = self.dynamic
                    && old != uid
                {
                    info!(%old, "unlocking previous dynamic manager uid");
                    self.dynamic = None;
                    events.push(ManagerEvent::Revoked {
                        uid: old,
                        role: ManagerRole::Dynamic,
                    });
                }
                if self.dynamic != Some(uid) {
                    self.dynamic = Some(uid);
                    events.push(ManagerEvent::Crowned {
                        uid,
                        role: ManagerRole::Dynamic,
                    });
                }
                // Bootstrap rule: a dynamic manager self-elects as
                // primary when no primary is locked.
                if self.primary.is_none() {
                    self.primary = Some(uid);
                    events.push(ManagerEvent::Crowned {
                        uid,
                        role: ManagerRole::Primary,
                    });
                }
            }
            ManagerRole::Primary => {
                if let Some(old) = self.primary
                    && old != uid
                {
                    info!(%old, "unlocking previous manager uid");
                    self.primary = None;
                    events.push(ManagerEvent::Revoked {
                        uid: old,
                        role: ManagerRole::Primary,
                    });
                }
                if self.primary != Some(uid) {
                    self.primary = Some(uid);
                    events.push(ManagerEvent::Crowned {
                        uid,
                        role: ManagerRole::Primary,
                    });
                }
            }
        }
        if !events.is_empty() {
            info!(%uid, index = signature.raw(), role = ?signature.role(), "crowned manager");
        }
        events
    }

    pub fn uncrown_primary(&mut self) -> Option<ManagerEvent> {
        self.primary.take().map(|uid| ManagerEvent::Revoked {
            uid,
            role: ManagerRole::Primary,
        })
    }

    pub fn uncrown_dynamic(&mut self) -> Option<ManagerEvent> {
        self.dynamic.take().map(|uid| ManagerEvent::Revoked {
            uid,
            role: ManagerRole::Dynamic,
        })
    }

    pub fn is_primary_valid(&self) -> bool {
        self.primary.is_some()
    }

    pub fn current_primary(&self) -> Option<Uid> {
        self.primary
    }

    pub fn current_dynamic(&self) -> Option<Uid> {
        self.dynamic
    }

    pub fn is_manager(&self, uid: Uid) -> bool {
        self.primary == Some(uid) || self.dynamic == Some(uid)
    }
}
