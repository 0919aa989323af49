use super::file_id::FileId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to create state directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write state file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Durable bookmark for one tailed stream: how far into which file we have
/// read, and when that was committed.
///
/// Invariant: every byte in `[0, offset)` of the file identified by
/// `identity` has been delivered to a parser in a previous run, and no byte
/// at or beyond `offset` has been.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionState {
    pub identity: FileId,
    pub offset: u64,
    pub saved_at: DateTime<Utc>,
}

/// Persists one `PositionState` per logical stream key as a JSON document in
/// a state directory. Saves are atomic (write to a scratch file, then rename
/// over the prior one), so a crash mid-save leaves the previous state intact.
pub struct PositionStore {
    dir: PathBuf,
}

impl PositionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load the stored position for a key. Returns `None` on first run for
    /// the key, and also when the record is unreadable or corrupt: a damaged
    /// state file must never fail a run, it just forces a fresh start.
    pub fn load(&self, key: &str) -> Option<PositionState> {
        let path = self.state_path(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "state file unreadable, starting fresh");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "state file corrupt, starting fresh");
                None
            }
        }
    }

    /// Atomically replace the stored position for a key.
    pub fn save(&self, key: &str, state: &PositionState) -> Result<(), StateError> {
        fs::create_dir_all(&self.dir).map_err(|source| StateError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.state_path(key);
        let tmp = path.with_extension(format!("tmp.{}", std::process::id()));

        let json = serde_json::to_vec_pretty(state)?;
        fs::write(&tmp, &json).map_err(|source| StateError::Write {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| StateError::Write { path, source })?;

        Ok(())
    }

    fn state_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

/// Derive the default stream key for a parser/path pair.
///
/// The key carries the log file's stem for operator readability plus a short
/// digest of the parser name and full path, so two parsers tailing the same
/// file, or two files with the same stem, never collide in the state
/// directory.
pub fn derive_key(parser: &str, path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(parser.as_bytes());
    hasher.update([0u8]);
    hasher.update(path.to_string_lossy().as_bytes());
    let digest = hasher.finalize();

    let mut short = String::with_capacity(16);
    for byte in &digest[..8] {
        let _ = write!(short, "{byte:02x}");
    }

    let stem: String = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "stream".to_string())
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '_' { c } else { '-' })
        .collect();

    format!("{stem}-{short}")
}
