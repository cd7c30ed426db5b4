#![forbid(unsafe_code)]

pub mod allowlist;
pub mod coordinator;
pub mod domain;
pub mod error;
pub mod gate;
pub mod scan;
pub mod stores;
pub mod tracker;

pub use allowlist::AllowList;
pub use coordinator::{FileFlagStore, FlagStore, NoopFlagStore, ScanCoordinator};
pub use domain::{
    DYNAMIC_SIGN_INDEX, ManagerEvent, ManagerRole, SignatureIndex, Uid, UidRecord, UidUniverse,
};
pub use error::Error;
pub use gate::{
    CallerSession, ConfiguredSecret, Denial, EscalationGate, GrantPath, PasswordVerifier,
    RootGrants,
};
pub use scan::{ApkInspector, ApkScanner, FsIdentity, ScanSummary, StatfsIdentity};
pub use stores::{
    ApkPathCache, ManagerRegistry, PendingRootCache, ProbeOutcome, TrustStores, lock_stores,
};
pub use tracker::{
    ControlEvent, ManagerNotifier, PassReport, Services, ThroneTracker, UidSourceKind,
};
