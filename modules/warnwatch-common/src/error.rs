//! Typed errors for state persistence, configuration, and source collaborators.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchError {
    /// State file exists but does not parse. Never treated as empty state:
    /// doing so would re-alert every known notice.
    #[error("state file {path} is corrupt: {source}")]
    StateCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// State file exists but could not be read.
    #[error("failed to read state file {path}: {source}")]
    StateRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Updated state could not be written. Fatal for the run.
    #[error("failed to persist state to {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Another run holds `lock_path`. `holder` is the PID recorded in the
    /// lock file, when it could be read.
    #[error(
        "state file {path} is locked by another monitor run{}; remove {lock_path} if that run is gone",
        holder_hint(.holder)
    )]
    StateLocked {
        path: PathBuf,
        lock_path: PathBuf,
        holder: Option<u32>,
    },

    /// The run lock could not be created or written.
    #[error("failed to acquire run lock {path}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("no spreadsheet link found on {page_url}")]
    LinkNotFound { page_url: String },

    #[error("workbook error: {0}")]
    Workbook(String),
}

impl WatchError {
    pub fn persist(
        path: impl Into<PathBuf>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        WatchError::Persist {
            path: path.into(),
            source: Box::new(source),
        }
    }
}

fn holder_hint(holder: &Option<u32>) -> String {
    holder.map(|pid| format!(" (pid {pid})")).unwrap_or_default()
}

pub type WatchResult<T> = std::result::Result<T, WatchError>;
