#![forbid(unsafe_code)]

use crate::allowlist::AllowList;
use crate::domain::Uid;
use crate::stores::{ProbeOutcome, TrustStores, lock_stores};
use std::sync::{Arc, Mutex};
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{info, warn};

pub const MAX_PASSWORD_LEN: usize = 64;

/// Checks the escalation secret. Implementations must not leak the
/// secret length or contents through timing.
pub trait PasswordVerifier: Send + Sync {
    fn verify(&self, attempt: &[u8]) -> bool;
}

/// Secret taken from the configuration file. `None` denies everything.
pub struct ConfiguredSecret {
    secret: Option<Vec<u8>>,
}

impl ConfiguredSecret {
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.map(String::into_bytes),
        }
    }
}

impl PasswordVerifier for ConfiguredSecret {
    fn verify(&self, attempt: &[u8]) -> bool {
        match &self.secret {
            Some(secret) => secret.ct_eq(attempt).into(),
            None => false,
        }
    }
}

/// Applies and withdraws the actual privilege change.
pub trait RootGrants: Send + Sync {
    fn escalate(&self, uid: Uid, pid: i32);
    fn revoke(&self, uid: Uid);
}

/// Per-connection state. A session that authenticated once stays
/// trusted for its lifetime; the marker never outlives the connection.
#[derive(Debug, Default, Clone)]
pub struct CallerSession {
    verified: bool,
}

impl CallerSession {
    pub fn is_verified(&self) -> bool {
        self.verified
    }

    pub fn mark_verified(&mut self) {
        self.verified = true;
    }
}

/// Which rule let an escalation through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantPath {
    AlreadyVerified,
    RootCaller,
    Manager,
    AllowListed,
    Password,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Denial {
    #[error("caller is not trusted and no password was supplied")]
    PasswordRequired,
    #[error("wrong password")]
    WrongPassword,
    #[error("password exceeds {MAX_PASSWORD_LEN} bytes")]
    PasswordTooLong,
}

/// Decides escalation requests. Trust is checked cheapest-first; the
/// password is the last resort and the only path that can fail.
pub struct EscalationGate {
    verifier: Box<dyn PasswordVerifier>,
    grants: Box<dyn RootGrants>,
    allowlist: Arc<dyn AllowList>,
    stores: Arc<Mutex<TrustStores>>,
}

impl EscalationGate {
    pub fn new(
        verifier: Box<dyn PasswordVerifier>,
        grants: Box<dyn RootGrants>,
        allowlist: Arc<dyn AllowList>,
        stores: Arc<Mutex<TrustStores>>,
    ) -> Self {
        Self {
            verifier,
            grants,
            allowlist,
            stores,
        }
    }

    /// Escalate `target_pid` (running as `target_uid`) on behalf of
    /// `caller_uid`. Any path that establishes trust marks the session
    /// verified, so later requests on the same connection skip the
    /// checks entirely.
    pub fn escalate(
        &self,
        session: &mut CallerSession,
        caller_uid: Uid,
        target_uid: Uid,
        target_pid: i32,
        password: Option<&[u8]>,
    ) -> Result<GrantPath, Denial> {
        let path = self.decide(session, caller_uid, password)?;
        session.mark_verified();
        info!(%caller_uid, %target_uid, target_pid, ?path, "granting root");
        self.grants.escalate(target_uid, target_pid);

        let mut stores = lock_stores(&self.stores);
        if !stores.pending.grant(target_uid) {
            warn!(%target_uid, "pending-root cache full, grant will not decay");
        }
        Ok(path)
    }

    fn decide(
        &self,
        session: &CallerSession,
        caller_uid: Uid,
        password: Option<&[u8]>,
    ) -> Result<GrantPath, Denial> {
        if session.is_verified() {
            return Ok(GrantPath::AlreadyVerified);
        }
        if caller_uid.is_root() {
            return Ok(GrantPath::RootCaller);
        }
        {
            let stores = lock_stores(&self.stores);
            if stores.registry.is_manager(caller_uid) {
                return Ok(GrantPath::Manager);
            }
        }
        if self.allowlist.is_allowed(caller_uid) {
            return Ok(GrantPath::AllowListed);
        }

        let Some(attempt) = password else {
            return Err(Denial::PasswordRequired);
        };
        if attempt.len() >= MAX_PASSWORD_LEN {
            return Err(Denial::PasswordTooLong);
        }
        if !self.verifier.verify(attempt) {
            return Err(Denial::WrongPassword);
        }
        Ok(GrantPath::Password)
    }

    /// Liveness probe for a temporarily escalated uid. Returns whether
    /// the grant is still live; an expired grant is revoked here, once.
    pub fn probe_pending(&self, uid: Uid) -> bool {
        let outcome = {
            let mut stores = lock_stores(&self.stores);
            stores.pending.probe(uid)
        };
        self.finish_probe(uid, outcome)
    }

    /// Like [`probe_pending`](Self::probe_pending) but counts only
    /// toward eviction, for callers that observe rather than use the
    /// grant.
    pub fn evict_if_expired(&self, uid: Uid) -> bool {
        let outcome = {
            let mut stores = lock_stores(&self.stores);
            stores.pending.evict_if_expired(uid)
        };
        self.finish_probe(uid, outcome)
    }

    fn finish_probe(&self, uid: Uid, outcome: ProbeOutcome) -> bool {
        match outcome {
            ProbeOutcome::Pending => true,
            ProbeOutcome::Absent => false,
            ProbeOutcome::Expired => {
                info!(%uid, "temporary root grant decayed, revoking");
                self.grants.revoke(uid);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    struct RecordingGrants {
        escalated: StdMutex<Vec<(Uid, i32)>>,
        revoked: StdMutex<Vec<Uid>>,
    }

    impl RecordingGrants {
        fn new() -> Self {
            Self {
                escalated: StdMutex::new(Vec::new()),
                revoked: StdMutex::new(Vec::new()),
            }
        }
    }

    impl RootGrants for RecordingGrants {
        fn escalate(&self, uid: Uid, pid: i32) {
            self.escalated.lock().unwrap().push((uid, pid));
        }

        fn revoke(&self, uid: Uid) {
            self.revoked.lock().unwrap().push(uid);
        }
    }

    struct StaticAllowList(Vec<Uid>);

    impl AllowList for StaticAllowList {
        fn is_allowed(&self, uid: Uid) -> bool {
            self.0.contains(&uid)
        }

        fn prune(&self, _keep: &dyn Fn(Uid, &str) -> bool) {}
    }

    fn gate_with(
        password: Option<&str>,
        allowed: Vec<Uid>,
    ) -> (EscalationGate, Arc<RecordingGrants>, Arc<Mutex<TrustStores>>) {
        let grants = Arc::new(RecordingGrants::new());
        let stores = Arc::new(Mutex::new(TrustStores::new(8, 3)));
        let gate = EscalationGate::new(
            Box::new(ConfiguredSecret::new(password.map(str::to_owned))),
            Box::new(GrantsHandle(Arc::clone(&grants))),
            Arc::new(StaticAllowList(allowed)),
            Arc::clone(&stores),
        );
        (gate, grants, stores)
    }

    struct GrantsHandle(Arc<RecordingGrants>);

    impl RootGrants for GrantsHandle {
        fn escalate(&self, uid: Uid, pid: i32) {
            self.0.escalate(uid, pid);
        }

        fn revoke(&self, uid: Uid) {
            self.0.revoke(uid);
        }
    }

    #[test]
    fn root_caller_is_always_trusted() {
        let (gate, grants, _) = gate_with(None, Vec::new());
        let mut session = CallerSession::default();
        let path = gate.escalate(&mut session, Uid::ROOT, Uid::new(2000), 100, None);
        assert_eq!(path, Ok(GrantPath::RootCaller));
        assert!(session.is_verified());
        assert_eq!(grants.escalated.lock().unwrap().as_slice(), &[(Uid::new(2000), 100)]);
    }

    #[test]
    fn manager_uid_is_trusted() {
        let (gate, _, stores) = gate_with(None, Vec::new());
        stores
            .lock()
            .unwrap()
            .registry
            .crown(Uid::new(10_001), crate::domain::SignatureIndex::PRIMARY);

        let mut session = CallerSession::default();
        let path = gate.escalate(&mut session, Uid::new(10_001), Uid::new(0), 1, None);
        assert_eq!(path, Ok(GrantPath::Manager));
    }

    #[test]
    fn untrusted_caller_needs_the_password() {
        let (gate, grants, _) = gate_with(Some("hunter2"), Vec::new());
        let mut session = CallerSession::default();
        let caller = Uid::new(10_050);

        assert_eq!(
            gate.escalate(&mut session, caller, caller, 1, None),
            Err(Denial::PasswordRequired)
        );
        assert_eq!(
            gate.escalate(&mut session, caller, caller, 1, Some(b"wrong")),
            Err(Denial::WrongPassword)
        );
        assert!(!session.is_verified());
        assert!(grants.escalated.lock().unwrap().is_empty());

        assert_eq!(
            gate.escalate(&mut session, caller, caller, 1, Some(b"hunter2")),
            Ok(GrantPath::Password)
        );
        assert!(session.is_verified());

        // Verified sessions skip everything, including a now-wrong
        // password.
        assert_eq!(
            gate.escalate(&mut session, caller, caller, 1, Some(b"wrong")),
            Ok(GrantPath::AlreadyVerified)
        );
    }

    #[test]
    fn oversized_password_is_rejected_before_comparison() {
        let (gate, _, _) = gate_with(Some("hunter2"), Vec::new());
        let mut session = CallerSession::default();
        let long = vec![b'a'; MAX_PASSWORD_LEN];
        assert_eq!(
            gate.escalate(&mut session, Uid::new(10_050), Uid::new(10_050), 1, Some(&long)),
            Err(Denial::PasswordTooLong)
        );
    }

    #[test]
    fn unset_password_denies_the_fallback() {
        let (gate, _, _) = gate_with(None, Vec::new());
        let mut session = CallerSession::default();
        assert_eq!(
            gate.escalate(&mut session, Uid::new(10_050), Uid::new(10_050), 1, Some(b"anything")),
            Err(Denial::WrongPassword)
        );
    }

    #[test]
    fn allow_listed_caller_skips_the_password() {
        let allowed = Uid::new(10_070);
        let (gate, _, _) = gate_with(Some("hunter2"), vec![allowed]);
        let mut session = CallerSession::default();
        assert_eq!(
            gate.escalate(&mut session, allowed, allowed, 1, None),
            Ok(GrantPath::AllowListed)
        );
    }

    #[test]
    fn expired_grant_is_revoked_exactly_once() {
        let (gate, grants, _) = gate_with(None, Vec::new());
        let mut session = CallerSession::default();
        let target = Uid::new(10_090);
        gate.escalate(&mut session, Uid::ROOT, target, 7, None)
            .unwrap();

        assert!(gate.probe_pending(target));
        assert!(gate.probe_pending(target));
        assert!(!gate.probe_pending(target));
        assert_eq!(grants.revoked.lock().unwrap().as_slice(), &[target]);

        // A later probe on the evicted uid is a plain miss.
        assert!(!gate.probe_pending(target));
        assert_eq!(grants.revoked.lock().unwrap().len(), 1);
    }

    #[test]
    fn poisoned_stores_still_escalate() {
        let (gate, grants, stores) = gate_with(None, Vec::new());
        let poisoner = Arc::clone(&stores);
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("collaborator panic while holding the stores");
        }));
        assert!(stores.lock().is_err());

        let mut session = CallerSession::default();
        let target = Uid::new(2000);
        assert_eq!(
            gate.escalate(&mut session, Uid::ROOT, target, 9, None),
            Ok(GrantPath::RootCaller)
        );
        assert!(gate.probe_pending(target));
        assert_eq!(grants.escalated.lock().unwrap().len(), 1);
    }

    #[test]
    fn refreshed_grant_survives_probing() {
        let (gate, grants, _) = gate_with(None, Vec::new());
        let mut session = CallerSession::default();
        let target = Uid::new(10_090);
        gate.escalate(&mut session, Uid::ROOT, target, 7, None)
            .unwrap();

        assert!(gate.probe_pending(target));
        gate.escalate(&mut session, Uid::ROOT, target, 7, None)
            .unwrap();
        assert!(gate.probe_pending(target));
        assert!(gate.probe_pending(target));
        assert!(grants.revoked.lock().unwrap().is_empty());
    }
}
