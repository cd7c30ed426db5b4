#![forbid(unsafe_code)]

use crate::domain::Uid;

/// External allow-list collaborator. How the list is persisted is out of
/// scope here; the trust engine only asks membership questions and hands
/// over a pruning predicate at the end of a scan pass.
pub trait AllowList: Send + Sync {
    /// Whether `uid` may receive root without a password.
    fn is_allowed(&self, uid: Uid) -> bool;

    /// Remove entries for which `keep` returns false. The predicate
    /// closes over the uid universe of the pass that triggered pruning.
    fn prune(&self, keep: &dyn Fn(Uid, &str) -> bool);
}
