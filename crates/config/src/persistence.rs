use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Persistence {
    /// Single-byte file recording whether the external uid scanner is
    /// trusted: `'1'` enabled, `'0'` disabled. Absent or unreadable
    /// means disabled.
    pub scanner_flag: PathBuf,

    /// Unix socket exposing the scanner coordination protocol.
    pub socket: PathBuf,
}

impl Default for Persistence {
    fn default() -> Self {
        Self {
            scanner_flag: PathBuf::from("/var/lib/throned/scanner_enabled"),
            socket: PathBuf::from("/run/throned/scanner.sock"),
        }
    }
}
