#![forbid(unsafe_code)]

use crate::allowlist::AllowList;
use crate::coordinator::ScanCoordinator;
use crate::domain::{ManagerEvent, ManagerRole, Uid, UidUniverse};
use crate::error::Error;
use crate::scan::{ApkInspector, ApkScanner, read_uid_list, scan_user_data};
use crate::stores::{TrustStores, lock_stores};
use config::Config;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Receives registry mutations after each pass, outside the stores lock.
/// The daemon wires this to whatever enforces the manager decision.
pub trait ManagerNotifier: Send + Sync {
    fn crowned(&self, uid: Uid, role: ManagerRole);
    fn revoked(&self, uid: Uid, role: ManagerRole);
}

pub struct Services {
    pub inspector: Box<dyn ApkInspector>,
    pub allowlist: Arc<dyn AllowList>,
    pub notifier: Box<dyn ManagerNotifier>,
}

/// Where the uid universe of a pass came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UidSourceKind {
    /// Precomputed uid list written by the trusted external scanner.
    FastPath,
    /// Direct walk of the per-user app-data directories.
    FallbackScan,
}

#[derive(Debug, Clone)]
pub struct PassReport {
    pub pass_id: u64,
    pub source: UidSourceKind,
    pub records: usize,
    pub searched: bool,
    pub events: Vec<ManagerEvent>,
}

pub enum ControlEvent {
    /// Run a tracking pass now instead of waiting for the interval.
    TrackNow,
    /// Ask the external scanner for a fresh uid list.
    RequestRescan,
}

pub struct ThroneTracker {
    config: Config,
    services: Services,
    stores: Arc<Mutex<TrustStores>>,
    coordinator: Arc<ScanCoordinator>,
    pass_id: u64,
}

impl ThroneTracker {
    pub fn new(
        config: Config,
        services: Services,
        stores: Arc<Mutex<TrustStores>>,
        coordinator: Arc<ScanCoordinator>,
    ) -> Self {
        Self {
            config,
            services,
            stores,
            coordinator,
            pass_id: 0,
        }
    }

    /// Execute one full tracking pass: build the uid universe, validate
    /// the crowned managers against it, search for replacements if a
    /// role is vacant and prune the allow-list of uninstalled uids.
    /// The stores lock is held across validation and search only;
    /// pruning and notification run unlocked, so collaborators may
    /// re-enter the gate.
    pub fn track(&mut self) -> Result<PassReport, Error> {
        self.pass_id = self.pass_id.saturating_add(1);
        let (universe, source) = self.collect_universe()?;
        debug!(
            pass = self.pass_id,
            ?source,
            records = universe.len(),
            "collected uid universe"
        );

        let mut events = Vec::new();
        let searched;
        {
            let mut stores = lock_stores(&self.stores);

            if let Some(uid) = stores.registry.current_primary()
                && !universe.contains_uid(uid)
            {
                info!(%uid, "manager package uninstalled, unlocking uid");
                events.extend(stores.registry.uncrown_primary());
            }
            if self.config.scan.dynamic_manager
                && let Some(uid) = stores.registry.current_dynamic()
                && !universe.contains_uid(uid)
            {
                info!(%uid, "dynamic manager package uninstalled, unlocking uid");
                events.extend(stores.registry.uncrown_dynamic());
            }

            let need_search = !stores.registry.is_primary_valid()
                || (self.config.scan.dynamic_manager
                    && stores.registry.current_dynamic().is_none());
            searched = need_search;
            if need_search {
                let scanner = ApkScanner::new(self.services.inspector.as_ref());
                let TrustStores {
                    registry,
                    apk_cache,
                    ..
                } = &mut *stores;
                let summary = scanner.scan(
                    &self.config.scan.app_root,
                    self.config.scan.search_depth,
                    &universe,
                    registry,
                    apk_cache,
                );
                debug!(
                    pass = self.pass_id,
                    visited = summary.directories_visited,
                    checked = summary.candidates_checked,
                    cache_hits = summary.cache_hits,
                    "manager search finished"
                );
                events.extend(summary.events);
            }
        }

        // The pruning predicate closes over the pass-local universe;
        // neither it nor the notifier runs under the stores lock, so
        // either collaborator may call back into the gate.
        self.services
            .allowlist
            .prune(&|uid, package| universe.contains(uid, package));

        for event in &events {
            match *event {
                ManagerEvent::Crowned { uid, role } => self.services.notifier.crowned(uid, role),
                ManagerEvent::Revoked { uid, role } => self.services.notifier.revoked(uid, role),
            }
        }

        Ok(PassReport {
            pass_id: self.pass_id,
            source,
            records: universe.len(),
            searched,
            events,
        })
    }

    /// Uid list when the external scanner is trusted, falling back to a
    /// direct walk on any read failure. With the scanner disabled the
    /// walk is the only source and its failure aborts the pass: acting
    /// on a partial universe would uncrown installed managers.
    fn collect_universe(&self) -> Result<(UidUniverse, UidSourceKind), Error> {
        if self.coordinator.scanner_enabled() {
            match read_uid_list(&self.config.scan.uid_list) {
                Ok(records) => return Ok((UidUniverse::new(records), UidSourceKind::FastPath)),
                Err(err) => {
                    warn!(
                        path = %self.config.scan.uid_list.display(),
                        %err,
                        "uid list unusable, falling back to app-data scan"
                    );
                }
            }
        }

        let mut records = Vec::new();
        for root in &self.config.scan.user_data_roots {
            records.extend(scan_user_data(root)?);
        }
        Ok((UidUniverse::new(records), UidSourceKind::FallbackScan))
    }

    /// Run tracking passes until the cancellation token is triggered.
    pub async fn run_until(
        &mut self,
        cancel: CancellationToken,
        mut control_rx: mpsc::UnboundedReceiver<ControlEvent>,
    ) -> Result<(), Error> {
        let mut ticker = tokio::time::interval(self.config.scan.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("shutdown requested");
                    break;
                }
                Some(event) = control_rx.recv() => {
                    match event {
                        ControlEvent::TrackNow => self.run_pass(),
                        ControlEvent::RequestRescan => self.coordinator.request_rescan(),
                    }
                }
                _ = ticker.tick() => {
                    self.run_pass();
                }
            }
        }

        Ok(())
    }

    fn run_pass(&mut self) {
        match self.track() {
            Ok(report) => {
                info!(
                    pass = report.pass_id,
                    source = ?report.source,
                    records = report.records,
                    searched = report.searched,
                    events = report.events.len(),
                    "tracking pass done"
                );
            }
            Err(err) => {
                // Keep the previous trust state; a transient filesystem
                // error must not revoke anything.
                warn!(%err, "tracking pass failed");
            }
        }
    }
}
