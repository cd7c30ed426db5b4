use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::path::PathBuf;
use std::time::Duration;

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Scan {
    /// Root of the application install tree. Candidate manager packages
    /// are searched for below this directory.
    pub app_root: PathBuf,

    /// Directory depth bound for the manager search. Depth 2 visits the
    /// install root, the per-app directory and the per-split directory,
    /// which covers every layout Android's package installer produces.
    pub search_depth: u32,

    /// Per-user app-data directories used by the fallback uid scan. Each
    /// immediate subdirectory is a package whose owner uid identifies
    /// the installed app.
    pub user_data_roots: Vec<PathBuf>,

    /// Precomputed uid list maintained by the external scanner helper.
    /// Only consulted while the scanner is enabled; any read failure
    /// falls back to walking `user_data_roots`.
    pub uid_list: PathBuf,

    /// Whether secondary ("dynamic") manager signatures are honored.
    /// When enabled, every pass without a locked dynamic manager runs a
    /// search, since multiple dynamic managers may come and go.
    pub dynamic_manager: bool,

    /// How often a scan pass runs when the daemon is idle. **Measured in
    /// seconds.** Signals can trigger a pass at any time regardless.
    #[serde_as(as = "serde_with::DurationSeconds")]
    pub interval: Duration,
}

impl Default for Scan {
    fn default() -> Self {
        Self {
            app_root: PathBuf::from("/data/app"),
            search_depth: 2,
            user_data_roots: vec![PathBuf::from("/data/user_de/0")],
            uid_list: PathBuf::from("/data/misc/user_uid/uid_list"),
            dynamic_manager: false,
            interval: Duration::from_secs(60),
        }
    }
}
