//! Default collaborator implementations. Hosts integrate real signature
//! verification, an allow-list backend and a privilege backend; these
//! stand-ins keep the daemon runnable end to end without them.

use std::path::Path;
use throne::tracker::{ManagerNotifier, Services};
use throne::{AllowList, ApkInspector, ManagerRole, SignatureIndex, Uid};
use tracing::info;

/// Never classifies anything as a manager.
pub struct NoManagerInspector;

impl ApkInspector for NoManagerInspector {
    fn classify(&self, _apk: &Path) -> Option<SignatureIndex> {
        None
    }
}

/// Allow-list with no entries. Pruning is a no-op.
pub struct EmptyAllowList;

impl AllowList for EmptyAllowList {
    fn is_allowed(&self, _uid: Uid) -> bool {
        false
    }

    fn prune(&self, _keep: &dyn Fn(Uid, &str) -> bool) {}
}

/// Logs registry mutations instead of enforcing them.
pub struct LoggingNotifier;

impl ManagerNotifier for LoggingNotifier {
    fn crowned(&self, uid: Uid, role: ManagerRole) {
        info!(%uid, ?role, "manager crowned");
    }

    fn revoked(&self, uid: Uid, role: ManagerRole) {
        info!(%uid, ?role, "manager revoked");
    }
}

pub fn default_services() -> Services {
    Services {
        inspector: Box::new(NoManagerInspector),
        allowlist: std::sync::Arc::new(EmptyAllowList),
        notifier: Box::new(LoggingNotifier),
    }
}
