//! Diagnostic logging.
//!
//! The terminal belongs to the UI, so tracing output goes to a file. This is
//! separate from the in-console log timeline.

use crate::config::project_dirs;
use crate::Result;
use anyhow::{anyhow, Context};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const LOG_FILE_NAME: &str = "console.log";
const DEFAULT_FILTER: &str = "info";

/// Per-user data dir when available, else the system temp dir
pub fn default_log_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_local_dir().join(LOG_FILE_NAME))
        .unwrap_or_else(|| std::env::temp_dir().join("subjugation-protocol.log"))
}

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("console.log");
        // Another test may already own the global subscriber; the file is created either way.
        let _ = init(&path);
        assert!(path.exists());
    }

    #[test]
    fn default_path_names_a_log_file() {
        let path = default_log_path();
        assert!(path.extension().is_some_and(|ext| ext == "log"));
    }
}
