#![forbid(unsafe_code)]

use crate::domain::{
    ManagerEvent, ManagerRole, SignatureIndex, UidUniverse, valid_package_name,
};
use crate::scan::{ApkInspector, FsIdentity, StatfsIdentity};
use crate::stores::{ApkPathCache, ManagerRegistry, hash_apk_path};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const BASE_APK: &str = "base.apk";
const STAGING_PREFIX: &str = "vmdl";
const STAGING_SUFFIX: &str = ".tmp";

/// What one manager search did, for logging and tests.
#[derive(Debug, Default, Clone)]
pub struct ScanSummary {
    pub directories_visited: usize,
    pub candidates_checked: usize,
    pub cache_hits: usize,
    pub events: Vec<ManagerEvent>,
}

/// Breadth-limited walker over the application install tree. Candidate
/// base binaries are classified by the inspector and matching packages
/// are crowned through the registry.
pub struct ApkScanner<'a> {
    inspector: &'a dyn ApkInspector,
    fs: &'a dyn FsIdentity,
}

impl<'a> ApkScanner<'a> {
    pub fn new(inspector: &'a dyn ApkInspector) -> Self {
        Self {
            inspector,
            fs: &StatfsIdentity,
        }
    }

    pub fn with_fs_identity(inspector: &'a dyn ApkInspector, fs: &'a dyn FsIdentity) -> Self {
        Self { inspector, fs }
    }

    pub fn scan(
        &self,
        root: &Path,
        depth: u32,
        universe: &UidUniverse,
        registry: &mut ManagerRegistry,
        cache: &mut ApkPathCache,
    ) -> ScanSummary {
        let mut summary = ScanSummary::default();
        cache.begin_pass();

        let mut queue: VecDeque<(PathBuf, u32)> = VecDeque::new();
        queue.push_back((root.to_owned(), depth));
        let mut fs_magic: Option<u64> = None;
        let mut stop = false;

        while let Some((dir, remaining)) = queue.pop_front() {
            if stop {
                break;
            }
            // The first directory pins the filesystem identity; a
            // different filesystem mounted over a subdirectory mid-scan
            // must not contribute candidates.
            match self.fs.magic(&dir) {
                Ok(magic) => match fs_magic {
                    None => {
                        debug!(dir = %dir.display(), magic, "captured filesystem magic");
                        fs_magic = Some(magic);
                    }
                    Some(expected) if magic != expected => {
                        info!(dir = %dir.display(), magic, expected, "filesystem magic mismatch, skipping");
                        continue;
                    }
                    Some(_) => {}
                },
                Err(err) => {
                    warn!(dir = %dir.display(), %err, "failed to identify filesystem, skipping directory");
                    continue;
                }
            }

            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(dir = %dir.display(), %err, "failed to open directory");
                    continue;
                }
            };
            summary.directories_visited += 1;

            for entry in entries {
                if stop {
                    break;
                }
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => {
                        warn!(dir = %dir.display(), %err, "failed to read directory entry");
                        continue;
                    }
                };
                let name = entry.file_name();
                let Some(name) = name.to_str() else {
                    continue;
                };
                let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);

                if is_dir {
                    if name.len() >= 8
                        && name.starts_with(STAGING_PREFIX)
                        && name.ends_with(STAGING_SUFFIX)
                    {
                        debug!(name, "skipping staging install");
                        continue;
                    }
                    if remaining > 0 {
                        queue.push_back((entry.path(), remaining - 1));
                    }
                    continue;
                }
                if name != BASE_APK {
                    continue;
                }

                let path = entry.path();
                let hash = hash_apk_path(&path);
                if cache.hit(hash) {
                    summary.cache_hits += 1;
                    continue;
                }
                summary.candidates_checked += 1;

                let Some(signature) = self.inspector.classify(&path) else {
                    cache.insert(hash);
                    continue;
                };
                info!(path = %path.display(), index = signature.raw(), "found candidate manager binary");

                let events = crown_from_path(&path, signature, universe, registry);
                summary.events.extend(events);
                match signature.role() {
                    ManagerRole::Dynamic => {
                        // Multiple dynamic managers may coexist; keep going.
                        cache.insert(hash);
                    }
                    ManagerRole::Primary => {
                        // The primary manager is singular and
                        // authoritative: stop searching and drop the
                        // cache, it is useless until the manager is gone.
                        stop = true;
                        cache.clear();
                    }
                }
            }
        }

        cache.evict_stale();
        summary
    }
}

fn crown_from_path(
    apk: &Path,
    signature: SignatureIndex,
    universe: &UidUniverse,
    registry: &mut ManagerRegistry,
) -> Vec<ManagerEvent> {
    let Some(package) = package_from_apk_path(apk) else {
        warn!(apk = %apk.display(), "failed to get package name from apk path");
        return Vec::new();
    };
    let Some(uid) = universe.uid_for_package(package) else {
        debug!(package, "manager package not present in uid universe");
        return Vec::new();
    };
    registry.crown(uid, signature)
}

/// Extract `<pkg>` from `.../<pkg>-<suffix>/base.apk`. The path needs at
/// least two separators and the parent component a hyphen; anything else
/// is malformed and rejected.
fn package_from_apk_path(apk: &Path) -> Option<&str> {
    let parent = apk.parent()?;
    parent.parent()?;
    let dir = parent.file_name()?.to_str()?;
    let (package, _suffix) = dir.split_once('-')?;
    if !valid_package_name(package) {
        return None;
    }
    Some(package)
}
