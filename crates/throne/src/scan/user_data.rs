#![forbid(unsafe_code)]

use crate::domain::{Uid, UidRecord, valid_package_name};
use crate::error::Error;
use nix::sys::stat;
use std::path::Path;
use tracing::{debug, warn};

/// One-level, non-recursive walk of a per-user app-data directory. Each
/// immediate subdirectory is named after a package, and its owner uid
/// identifies the installed app. Individual entry failures are counted
/// and skipped; only an unopenable root fails the scan, which aborts
/// the whole pass upstream.
pub fn scan_user_data(root: &Path) -> Result<Vec<UidRecord>, Error> {
    let entries = std::fs::read_dir(root).map_err(|source| Error::UserDataUnscannable {
        root: root.to_owned(),
        source,
    })?;

    let mut records = Vec::new();
    let mut errors = 0usize;
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(%err, "failed to read directory entry");
                errors += 1;
                continue;
            }
        };
        let name = entry.file_name();
        let Some(package) = name.to_str() else {
            errors += 1;
            continue;
        };
        if !valid_package_name(package) {
            warn!(package, "package name too long");
            errors += 1;
            continue;
        }
        match entry.file_type() {
            Ok(file_type) if file_type.is_dir() => {}
            Ok(_) => continue,
            Err(err) => {
                warn!(package, %err, "failed to read entry type");
                errors += 1;
                continue;
            }
        }
        let st = match stat::stat(&entry.path()) {
            Ok(st) => st,
            Err(err) => {
                warn!(package, %err, "failed to stat package directory");
                errors += 1;
                continue;
            }
        };
        records.push(UidRecord::new(Uid::new(st.st_uid), package));
    }

    if errors > 0 {
        warn!(errors, root = %root.display(), "errors while scanning user data directory");
    }
    debug!(count = records.len(), root = %root.display(), "scanned user data root");
    Ok(records)
}
