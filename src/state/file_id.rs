use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::Metadata;

/// Identity of a file on disk, stable across renames and appends.
///
/// On Unix this is the device and inode number. Rotation replaces the file
/// behind a path with a new one, so comparing a stored identity against the
/// file currently at the same path detects replacement even when the path
/// never changed. The identity is used only for this comparison, never for
/// reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId {
    dev: u64,
    ino: u64,
}

impl FileId {
    /// Build a FileId from raw values, e.g. when loading persisted state.
    pub fn new(dev: u64, ino: u64) -> Self {
        Self { dev, ino }
    }

    #[cfg(unix)]
    pub fn from_metadata(metadata: &Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;
        Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        }
    }

    #[cfg(not(unix))]
    pub fn from_metadata(metadata: &Metadata) -> Self {
        // No inode available. Creation time is the most stable proxy: unlike
        // size or mtime it does not change as the file grows.
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        if let Ok(created) = metadata.created() {
            created.hash(&mut hasher);
        }
        Self {
            dev: 0,
            ino: hasher.finish(),
        }
    }

    pub fn dev(&self) -> u64 {
        self.dev
    }

    pub fn ino(&self) -> u64 {
        self.ino
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.dev, self.ino)
    }
}
