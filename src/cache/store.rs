//! On-disk record store
//!
//! Records live at `<root>/<storage_key>.json`. A write goes to a temporary
//! sibling first and is renamed into place, so a reader sees either the old
//! record, the new one, or none.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::fingerprint::TrackFingerprint;
use crate::analysis::result::DescriptorBundle;
use crate::error::AnalysisError;

/// Handle to a cache directory
///
/// Cheap to clone; every clone addresses the same records.
#[derive(Debug, Clone)]
pub struct FingerprintCache {
    root: PathBuf,
}

impl FingerprintCache {
    /// Open (creating if needed) a cache rooted at `root`
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::Io` if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, AnalysisError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        log::debug!("Opened descriptor cache at {}", root.display());
        Ok(Self { root })
    }

    /// Cache directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the record for `fingerprint` lives
    pub fn record_path(&self, fingerprint: &TrackFingerprint) -> PathBuf {
        self.root.join(format!("{}.json", fingerprint.storage_key()))
    }

    /// Cached bundle for the current version of `path`
    ///
    /// Returns `None` on a miss, when the file itself cannot be stat'ed, or
    /// when the record is unreadable. An unparsable record is removed.
    pub fn get(&self, path: &Path) -> Option<DescriptorBundle> {
        let fingerprint = match TrackFingerprint::from_path(path) {
            Ok(fp) => fp,
            Err(e) => {
                log::debug!("Cannot fingerprint {}: {}", path.display(), e);
                return None;
            }
        };
        let record = self.record_path(&fingerprint);

        let bytes = match std::fs::read(&record) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                log::warn!("Cannot read cache record {}: {}", record.display(), e);
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(bundle) => Some(bundle),
            Err(e) => {
                log::warn!(
                    "Discarding corrupt cache record {} for {}: {}",
                    record.display(),
                    path.display(),
                    e
                );
                if let Err(e) = std::fs::remove_file(&record) {
                    log::debug!("Cannot remove {}: {}", record.display(), e);
                }
                None
            }
        }
    }

    /// Store `bundle` for the current version of `path`
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::Io` if the file cannot be stat'ed or the record
    /// cannot be written.
    pub fn put(&self, path: &Path, bundle: &DescriptorBundle) -> Result<(), AnalysisError> {
        let fingerprint = TrackFingerprint::from_path(path)?;
        self.put_fingerprint(&fingerprint, bundle)
    }

    /// Store `bundle` under a fingerprint taken earlier
    ///
    /// The record only matches while the file still has that fingerprint, so
    /// descriptors computed from an older version never answer for a newer one.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::Io` if the record cannot be written.
    pub fn put_fingerprint(
        &self,
        fingerprint: &TrackFingerprint,
        bundle: &DescriptorBundle,
    ) -> Result<(), AnalysisError> {
        let record = self.record_path(fingerprint);
        let bytes = serde_json::to_vec(bundle)?;

        let tmp = self.root.join(format!(
            ".{}.{}.tmp",
            fingerprint.storage_key(),
            std::process::id()
        ));
        std::fs::write(&tmp, &bytes)?;
        if let Err(e) = std::fs::rename(&tmp, &record) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }

        log::debug!(
            "Cached descriptors for {} at {}",
            fingerprint.path().display(),
            record.display()
        );
        Ok(())
    }

    /// True if a record exists for the current version of `path`
    ///
    /// Does not parse the record.
    pub fn contains(&self, path: &Path) -> bool {
        TrackFingerprint::from_path(path)
            .map(|fp| self.record_path(&fp).is_file())
            .unwrap_or(false)
    }
}
