//! Persisted novelty state: one JSON document per deployment.
//!
//! ```json
//! {
//!   "lastFileHash": "9f86d0…",
//!   "lastCheck": "2024-05-01T12:00:00Z",
//!   "seen_anthropic": ["2024-01-01|2024-03-01|Anthropic PBC"]
//! }
//! ```
//!
//! A missing file loads as empty state. A file that exists but doesn't parse
//! is an error; the operator decides what to do with it.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use warnwatch_common::{WatchError, WatchResult};

use crate::novelty::entity_state_key;

// ---------------------------------------------------------------------------
// NoveltyState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NoveltyState {
    #[serde(rename = "lastFileHash", default)]
    pub last_file_hash: Option<String>,
    #[serde(rename = "lastCheck", default)]
    pub last_check: Option<DateTime<Utc>>,
    /// Seen identity keys, keyed by `entity_state_key(entity)`.
    #[serde(flatten)]
    seen: BTreeMap<String, BTreeSet<String>>,
}

impl NoveltyState {
    /// Seen keys for an entity; empty if the entity has never been tracked.
    pub fn seen_for(&self, entity: &str) -> BTreeSet<String> {
        self.seen
            .get(&entity_state_key(entity))
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_seen(&mut self, entity: &str, keys: BTreeSet<String>) {
        self.seen.insert(entity_state_key(entity), keys);
    }

    /// All seen sets by persisted field name.
    pub fn seen_sets(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.seen
    }
}

// ---------------------------------------------------------------------------
// StateStore
// ---------------------------------------------------------------------------

pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> WatchResult<NoveltyState> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No prior state, starting fresh");
                return Ok(NoveltyState::default());
            }
            Err(source) => {
                return Err(WatchError::StateRead {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_str(&content).map_err(|source| WatchError::StateCorrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Replace the persisted state. Writes a sibling temp file, syncs it, then
    /// renames over the target so readers see either the old or the new file.
    pub fn save(&self, state: &NoveltyState) -> WatchResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| WatchError::persist(&self.path, e))?;

        let mut tmp =
            tempfile::NamedTempFile::new_in(&dir).map_err(|e| WatchError::persist(&self.path, e))?;
        serde_json::to_writer_pretty(&mut tmp, state)
            .map_err(|e| WatchError::persist(&self.path, e))?;
        tmp.write_all(b"\n")
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| WatchError::persist(&self.path, e))?;
        tmp.persist(&self.path)
            .map_err(|e| WatchError::persist(&self.path, e.error))?;

        info!(path = %self.path.display(), entities = state.seen.len(), "State saved");
        Ok(())
    }

    /// Take the advisory run lock (`<state_file>.lock`).
    pub fn lock(&self) -> WatchResult<RunLock> {
        RunLock::acquire(&self.path)
    }
}

// ---------------------------------------------------------------------------
// RunLock
// ---------------------------------------------------------------------------

/// Advisory lock file held for the duration of a run; removed on drop.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    fn acquire(state_path: &Path) -> WatchResult<Self> {
        let path = lock_path(state_path);
        let lock_err = |source| WatchError::Lock {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(lock_err)?;
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(WatchError::StateLocked {
                    path: state_path.to_path_buf(),
                    holder: read_holder(&path),
                    lock_path: path.clone(),
                })
            }
            Err(e) => return Err(lock_err(e)),
        };
        writeln!(file, "{}", std::process::id()).map_err(lock_err)?;

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn lock_path(state_path: &Path) -> PathBuf {
    let mut lock_path = state_path.as_os_str().to_owned();
    lock_path.push(".lock");
    PathBuf::from(lock_path)
}

/// PID written by the run holding the lock, if the file still says.
fn read_holder(lock_path: &Path) -> Option<u32> {
    std::fs::read_to_string(lock_path).ok()?.trim().parse().ok()
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to remove run lock");
        }
    }
}
