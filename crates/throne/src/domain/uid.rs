#![forbid(unsafe_code)]

use std::fmt;

/// Android-style multi-user uids encode the user index in the high digits.
pub const PER_USER_RANGE: libc::uid_t = 100_000;

/// Upper bound on package name length, terminator included.
pub const MAX_PACKAGE_NAME: usize = 256;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uid(libc::uid_t);

impl Uid {
    pub const ROOT: Uid = Uid(0);

    pub fn new(raw: libc::uid_t) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> libc::uid_t {
        self.0
    }

    /// Strip the per-user offset, yielding the base (user 0) uid.
    pub fn normalize(self) -> Uid {
        Uid(self.0 % PER_USER_RANGE)
    }

    pub fn user_index(self) -> libc::uid_t {
        self.0 / PER_USER_RANGE
    }

    pub fn is_root(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Uid").field(&self.0).finish()
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Non-empty and within the fixed bound; anything else is an implausible
/// candidate, not an error.
pub fn valid_package_name(name: &str) -> bool {
    !name.is_empty() && name.len() < MAX_PACKAGE_NAME
}

/// One uid/package pair of the current scan generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UidRecord {
    pub uid: Uid,
    pub package: String,
}

impl UidRecord {
    pub fn new(uid: Uid, package: impl Into<String>) -> Self {
        Self {
            uid,
            package: package.into(),
        }
    }
}
