#![forbid(unsafe_code)]

mod apk_scanner;
mod uid_list;
mod user_data;

pub use apk_scanner::{ApkScanner, ScanSummary};
pub use uid_list::read_uid_list;
pub use user_data::scan_user_data;

use crate::domain::SignatureIndex;
use std::io;
use std::path::Path;

/// Signature classification of a candidate base binary. Cryptographic
/// verification itself is an external concern; the scanner only needs
/// the matched signature index, if any.
pub trait ApkInspector: Send + Sync {
    fn classify(&self, apk: &Path) -> Option<SignatureIndex>;
}

/// Filesystem identity of a directory. The install walk refuses to
/// cross into a filesystem different from the one it started on.
pub trait FsIdentity: Send + Sync {
    fn magic(&self, dir: &Path) -> io::Result<u64>;
}

/// `statfs`-backed identity, the production default.
pub struct StatfsIdentity;

impl FsIdentity for StatfsIdentity {
    fn magic(&self, dir: &Path) -> io::Result<u64> {
        let stats = nix::sys::statfs::statfs(dir)?;
        Ok(stats.filesystem_type().0 as u64)
    }
}
