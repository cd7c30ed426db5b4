#![forbid(unsafe_code)]

use crate::domain::Uid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerRole {
    Primary,
    Dynamic,
}

/// Which signing criteria a candidate binary matched. Index 0 is the
/// traditional manager signature; the distinguished dynamic marker or
/// any index of 2 and above denotes a dynamic manager signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureIndex(u32);

pub const DYNAMIC_SIGN_INDEX: SignatureIndex = SignatureIndex(0x44);

impl SignatureIndex {
    pub const PRIMARY: SignatureIndex = SignatureIndex(0);

    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn role(self) -> ManagerRole {
        if self == DYNAMIC_SIGN_INDEX || self.0 >= 2 {
            ManagerRole::Dynamic
        } else {
            ManagerRole::Primary
        }
    }
}

/// Registry mutation, reported to the external notifier collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerEvent {
    Crowned { uid: Uid, role: ManagerRole },
    Revoked { uid: Uid, role: ManagerRole },
}
