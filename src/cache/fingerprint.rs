//! Track identity from path, modification time and size

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use sha2::{Digest, Sha256};

use crate::error::AnalysisError;

/// Identity of one file version
///
/// Two fingerprints are equal iff absolute path, modification time and byte
/// size are all equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackFingerprint {
    path: PathBuf,
    mtime_nanos: i128,
    size: u64,
}

impl TrackFingerprint {
    /// Build a fingerprint from explicit parts
    pub fn new(path: impl Into<PathBuf>, mtime_nanos: i128, size: u64) -> Self {
        Self {
            path: path.into(),
            mtime_nanos,
            size,
        }
    }

    /// Fingerprint a file from its current metadata
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::Io` if the path cannot be resolved or stat'ed.
    pub fn from_path(path: &Path) -> Result<Self, AnalysisError> {
        let path = std::path::absolute(path)?;
        let metadata = std::fs::metadata(&path)?;
        let modified = metadata.modified()?;
        let mtime_nanos = match modified.duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_nanos() as i128,
            Err(e) => -(e.duration().as_nanos() as i128),
        };
        Ok(Self::new(path, mtime_nanos, metadata.len()))
    }

    /// Absolute path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Modification time in nanoseconds since the Unix epoch
    pub fn mtime_nanos(&self) -> i128 {
        self.mtime_nanos
    }

    /// Size in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Stable one-way storage key (hex SHA-256 of the three parts)
    pub fn storage_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.path.to_string_lossy().as_bytes());
        hasher.update(b"|");
        hasher.update(self.mtime_nanos.to_string().as_bytes());
        hasher.update(b"|");
        hasher.update(self.size.to_string().as_bytes());
        format!("{:x}", hasher.finalize())
    }
}
