use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};
use std::path::{Path, PathBuf};

/// throned: manager trust and root escalation daemon
///
/// throned keeps track of which installed application is the trusted
/// manager, gates manual root escalation behind it and coordinates with
/// an external uid scanner over a Unix socket.
#[derive(Debug, Parser, Clone)]
#[command(about, long_about, version)]
pub struct Cli {
    /// Path to configuration file.
    ///
    /// If not provided, the default locations are checked. They are
    /// `/etc/throned/config.toml` and `/etc/throned/config.d/*.toml`,
    /// where the latter being a glob pattern. If they don't exist, the
    /// default configuration is used.
    #[arg(short, long, value_parser = validate_file)]
    pub conffile: Option<PathBuf>,

    /// Unix socket for the scanner coordination protocol.
    ///
    /// Overrides `persistence.socket` from the configuration.
    #[arg(short, long)]
    pub socket: Option<PathBuf>,

    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,
}

/// Check if the file exists.
#[inline(always)]
fn validate_file(file: &str) -> Result<PathBuf, String> {
    let path = Path::new(file);
    if path.exists() {
        Ok(path.to_owned())
    } else {
        Err(format!("File not found: {:?}", path))
    }
}
