#![forbid(unsafe_code)]

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("System call failed: {0}")]
    Sys(#[from] nix::Error),

    #[error("Uid list {path:?} reports no data")]
    UidListEmpty { path: PathBuf },

    #[error("Uid list {path:?} contains no parsable entries")]
    UidListNoEntries { path: PathBuf },

    #[error("User data root {root:?} is not scannable: {source}")]
    UserDataUnscannable {
        root: PathBuf,
        source: std::io::Error,
    },
}
