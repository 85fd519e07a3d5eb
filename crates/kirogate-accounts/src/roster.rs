//! Roster persistence: a plain JSON array on disk, loaded at start and
//! rewritten on every pool mutation by a background writer.

use std::path::{Path, PathBuf};

use tokio::sync::watch;
use tracing::warn;

use crate::account::Account;

#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid roster JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Read the roster file. A missing or empty file is an empty roster, not an
/// error.
pub fn load_roster(path: &Path) -> Result<Vec<Account>, RosterError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let data = std::fs::read_to_string(path)?;
    if data.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&data)?)
}

/// Background writer. The watch channel coalesces bursts of mutations; each
/// wake-up writes whatever snapshot is current, so the final file always
/// matches the last committed in-memory state.
pub async fn run_writer(path: PathBuf, mut rx: watch::Receiver<Vec<Account>>) {
    while rx.changed().await.is_ok() {
        let accounts = rx.borrow_and_update().clone();
        match serde_json::to_string_pretty(&accounts) {
            Ok(json) => {
                if let Some(parent) = path.parent() {
                    let _ = tokio::fs::create_dir_all(parent).await;
                }
                if let Err(e) = tokio::fs::write(&path, json).await {
                    warn!(path = %path.display(), error = %e, "failed to persist account roster");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize account roster"),
        }
    }
}
