#![forbid(unsafe_code)]

use async_trait::async_trait;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Status line handed to the external scanner when it polls.
pub const STATUS_RESCAN: &[u8] = b"RESCAN\n";
pub const STATUS_OK: &[u8] = b"OK\n";

/// Commands at this length or beyond are rejected unread.
pub const MAX_COMMAND_LEN: usize = 16;

const CMD_UPDATED: &str = "UPDATED";

/// Durable home of the scanner-enabled flag.
#[async_trait]
pub trait FlagStore: Send + Sync {
    async fn load(&self) -> io::Result<Option<bool>>;
    async fn save(&self, enabled: bool) -> io::Result<()>;
}

/// Store that remembers nothing. Tests and hosts without persistent
/// storage run with the scanner disabled until told otherwise.
pub struct NoopFlagStore;

#[async_trait]
impl FlagStore for NoopFlagStore {
    async fn load(&self) -> io::Result<Option<bool>> {
        Ok(None)
    }

    async fn save(&self, _enabled: bool) -> io::Result<()> {
        Ok(())
    }
}

/// Single-byte file, `'1'` enabled and `'0'` disabled. Anything else is
/// treated as disabled so a corrupted file cannot enable the fast path.
pub struct FileFlagStore {
    path: PathBuf,
}

impl FileFlagStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl FlagStore for FileFlagStore {
    async fn load(&self) -> io::Result<Option<bool>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err),
        };
        match bytes.first() {
            Some(b'1') => Ok(Some(true)),
            Some(b'0') => Ok(Some(false)),
            other => {
                warn!(path = %self.path.display(), ?other, "unexpected scanner flag byte");
                Ok(Some(false))
            }
        }
    }

    async fn save(&self, enabled: bool) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let byte: &[u8] = if enabled { b"1" } else { b"0" };
        tokio::fs::write(&self.path, byte).await
    }
}

enum Job {
    LoadFlag,
    SaveFlag(bool),
}

/// Coordinates the daemon with the external uid scanner. The daemon
/// raises a rescan request; the scanner polls the status line, rescans
/// when it reads `RESCAN` and reports back with `UPDATED`. Flag writes
/// go through a worker task so callers never block on storage.
pub struct ScanCoordinator {
    needs_rescan: AtomicBool,
    scanner_enabled: Arc<AtomicBool>,
    jobs: mpsc::UnboundedSender<Job>,
}

impl ScanCoordinator {
    pub fn spawn(store: impl FlagStore + 'static) -> Arc<Self> {
        let scanner_enabled = Arc::new(AtomicBool::new(false));
        let (jobs, mut jobs_rx) = mpsc::unbounded_channel();

        let enabled = Arc::clone(&scanner_enabled);
        tokio::spawn(async move {
            while let Some(job) = jobs_rx.recv().await {
                match job {
                    Job::LoadFlag => match store.load().await {
                        Ok(Some(value)) => {
                            info!(enabled = value, "restored scanner flag");
                            enabled.store(value, Ordering::Release);
                        }
                        Ok(None) => debug!("no persisted scanner flag"),
                        Err(err) => warn!(%err, "failed to load scanner flag"),
                    },
                    Job::SaveFlag(value) => {
                        if let Err(err) = store.save(value).await {
                            warn!(%err, "failed to persist scanner flag");
                        }
                    }
                }
            }
        });

        let coordinator = Arc::new(Self {
            needs_rescan: AtomicBool::new(false),
            scanner_enabled,
            jobs,
        });
        let _ = coordinator.jobs.send(Job::LoadFlag);
        coordinator
    }

    /// Ask the external scanner for a fresh uid list on its next poll.
    pub fn request_rescan(&self) {
        self.needs_rescan.store(true, Ordering::Release);
        info!("rescan requested");
    }

    pub fn rescan_pending(&self) -> bool {
        self.needs_rescan.load(Ordering::Acquire)
    }

    /// Status line for a polling scanner. Reading the status does not
    /// clear the request; only `UPDATED` does.
    pub fn status(&self) -> &'static [u8] {
        if self.rescan_pending() {
            STATUS_RESCAN
        } else {
            STATUS_OK
        }
    }

    fn acknowledge_update(&self) {
        self.needs_rescan.store(false, Ordering::Release);
        info!("scanner reported an updated uid list");
    }

    /// Handle one command from the scanner. Returns whether the command
    /// was well-formed; unknown but well-formed commands are ignored so
    /// newer scanners keep working against an older daemon.
    pub fn handle_command(&self, raw: &[u8]) -> bool {
        if raw.len() >= MAX_COMMAND_LEN {
            warn!(len = raw.len(), "oversized scanner command rejected");
            return false;
        }
        let Ok(text) = std::str::from_utf8(raw) else {
            warn!("non-utf8 scanner command rejected");
            return false;
        };
        let command = text.trim_end_matches('\n');
        if command == CMD_UPDATED {
            self.acknowledge_update();
        } else {
            debug!(command, "ignoring unknown scanner command");
        }
        true
    }

    pub fn scanner_enabled(&self) -> bool {
        self.scanner_enabled.load(Ordering::Acquire)
    }

    /// Flip the trust in the external scanner and persist the choice.
    pub fn set_scanner_enabled(&self, enabled: bool) {
        self.scanner_enabled.store(enabled, Ordering::Release);
        let _ = self.jobs.send(Job::SaveFlag(enabled));
        info!(enabled, "scanner flag changed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn rescan_round_trip() {
        let coordinator = ScanCoordinator::spawn(NoopFlagStore);
        assert_eq!(coordinator.status(), STATUS_OK);

        coordinator.request_rescan();
        assert_eq!(coordinator.status(), STATUS_RESCAN);
        // Polling alone must not clear the request.
        assert_eq!(coordinator.status(), STATUS_RESCAN);

        assert!(coordinator.handle_command(b"UPDATED\n"));
        assert_eq!(coordinator.status(), STATUS_OK);
    }

    #[tokio::test]
    async fn command_validation() {
        let coordinator = ScanCoordinator::spawn(NoopFlagStore);
        coordinator.request_rescan();

        assert!(!coordinator.handle_command(b"UPDATED but far too long"));
        assert!(!coordinator.handle_command(&[0xff, 0xfe]));
        assert!(coordinator.handle_command(b"PING\n"));
        // None of the above acknowledged the rescan.
        assert_eq!(coordinator.status(), STATUS_RESCAN);

        assert!(coordinator.handle_command(b"UPDATED"));
        assert_eq!(coordinator.status(), STATUS_OK);
    }

    #[tokio::test]
    async fn flag_restores_from_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scanner_enabled");
        tokio::fs::write(&path, b"1").await.unwrap();

        let coordinator = ScanCoordinator::spawn(FileFlagStore::new(path));
        for _ in 0..100 {
            if coordinator.scanner_enabled() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert!(coordinator.scanner_enabled());
    }

    #[tokio::test]
    async fn flag_persists_through_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state").join("scanner_enabled");

        let coordinator = ScanCoordinator::spawn(FileFlagStore::new(path.clone()));
        coordinator.set_scanner_enabled(true);
        assert!(coordinator.scanner_enabled());

        for _ in 0..100 {
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"1");
    }

    #[tokio::test]
    async fn corrupt_flag_reads_as_disabled() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scanner_enabled");
        tokio::fs::write(&path, b"x").await.unwrap();

        let store = FileFlagStore::new(path);
        assert_eq!(store.load().await.unwrap(), Some(false));
    }

    #[tokio::test]
    async fn absent_flag_reads_as_unset() {
        let dir = tempdir().unwrap();
        let store = FileFlagStore::new(dir.path().join("missing"));
        assert_eq!(store.load().await.unwrap(), None);
    }
}
