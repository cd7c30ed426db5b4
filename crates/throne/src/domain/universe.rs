#![forbid(unsafe_code)]

use crate::domain::{Uid, UidRecord};

/// The uid↔package universe of one scan pass. Owned by the pass that
/// built it and dropped at the end; nothing caches it across passes.
#[derive(Debug, Default, Clone)]
pub struct UidUniverse {
    records: Vec<UidRecord>,
}

impl UidUniverse {
    pub fn new(records: Vec<UidRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[UidRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn uid_for_package(&self, package: &str) -> Option<Uid> {
        self.records
            .iter()
            .find(|record| record.package == package)
            .map(|record| record.uid)
    }

    /// Membership by uid alone, normalized modulo the per-user offset.
    pub fn contains_uid(&self, uid: Uid) -> bool {
        let base = uid.normalize();
        self.records.iter().any(|record| record.uid == base)
    }

    /// Membership by uid and package, the allow-list pruning predicate.
    pub fn contains(&self, uid: Uid, package: &str) -> bool {
        let base = uid.normalize();
        self.records
            .iter()
            .any(|record| record.uid == base && record.package == package)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn universe() -> UidUniverse {
        UidUniverse::new(vec![
            UidRecord::new(Uid::new(10_001), "com.example.app"),
            UidRecord::new(Uid::new(10_002), "com.example.other"),
        ])
    }

    #[test]
    fn lookup_by_package() {
        assert_eq!(
            universe().uid_for_package("com.example.app"),
            Some(Uid::new(10_001))
        );
        assert_eq!(universe().uid_for_package("com.absent"), None);
    }

    #[test]
    fn membership_normalizes_multi_user_uids() {
        let universe = universe();
        assert!(universe.contains_uid(Uid::new(10_001)));
        assert!(universe.contains_uid(Uid::new(1_010_001)));
        assert!(!universe.contains_uid(Uid::new(10_003)));

        assert!(universe.contains(Uid::new(1_010_002), "com.example.other"));
        assert!(!universe.contains(Uid::new(1_010_002), "com.example.app"));
    }
}
