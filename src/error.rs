//! Unified error handling for the carver
//!
//! Every fallible operation in the crate returns [`CarveResult`], so callers
//! see one taxonomy regardless of whether the failure came from node parsing,
//! geometry resolution, or the on-disk cache. Variants carry enough context
//! (paths, keys, reasons) to log without re-deriving it at the call site.

use std::io;
use std::path::Path;

/// Main error type for the carver.
#[derive(Debug, thiserror::Error)]
pub enum CarveError {
    /// A catalog record could not be turned into a typed node.
    #[error("Malformed record: {reason}")]
    MalformedRecord { reason: String },

    /// The geometry provider failed to produce bounds for a resource key.
    #[error("Resolution failed for {key}: {reason}")]
    ResolutionFailed { key: String, reason: String },

    /// A cache relocation was aborted; the source store is left untouched.
    #[error("Relocation failed: {reason} (source untouched)")]
    RelocationFailed { reason: String },

    /// The backing store cannot be opened, or was already disposed.
    #[error("Storage unavailable at {path}: {reason}")]
    StorageUnavailable { path: String, reason: String },

    /// The worker pool could not be constructed.
    #[error("Worker pool setup failed: {reason}")]
    WorkerPool { reason: String },

    /// An underlying filesystem operation failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    /// A persisted record could not be encoded or decoded.
    #[error("Record codec error: {0}")]
    Record(#[from] bincode::Error),
}

impl CarveError {
    /// Wrap an [`io::Error`] with the path it happened on.
    pub fn io(path: &Path, source: io::Error) -> Self {
        CarveError::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        CarveError::MalformedRecord {
            reason: reason.into(),
        }
    }

    pub fn resolution(key: impl Into<String>, reason: impl Into<String>) -> Self {
        CarveError::ResolutionFailed {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn storage(path: &Path, reason: impl Into<String>) -> Self {
        CarveError::StorageUnavailable {
            path: path.display().to_string(),
            reason: reason.into(),
        }
    }

    pub fn relocation(reason: impl Into<String>) -> Self {
        CarveError::RelocationFailed {
            reason: reason.into(),
        }
    }
}

/// Result type alias used throughout the carver.
pub type CarveResult<T> = Result<T, CarveError>;

/// Extension trait for attaching a path to bare [`io::Result`] values.
pub trait IoResultExt<T> {
    fn at_path(self, path: &Path) -> CarveResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn at_path(self, path: &Path) -> CarveResult<T> {
        self.map_err(|e| CarveError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CarveError::resolution("base/env/tower.mesh#s=...", "payload truncated");
        assert_eq!(
            err.to_string(),
            "Resolution failed for base/env/tower.mesh#s=...: payload truncated"
        );

        let err = CarveError::malformed("nodeType missing");
        assert_eq!(err.to_string(), "Malformed record: nodeType missing");
    }

    #[test]
    fn test_io_context() {
        let result: io::Result<()> = Err(io::Error::new(io::ErrorKind::NotFound, "gone"));
        let err = result.at_path(Path::new("/tmp/cache/vanilla.pcl")).unwrap_err();
        match err {
            CarveError::Io { path, .. } => assert!(path.ends_with("vanilla.pcl")),
            other => panic!("expected Io, got {other:?}"),
        }
    }

    #[test]
    fn test_relocation_mentions_source_safety() {
        let err = CarveError::relocation("destination occupied");
        assert!(err.to_string().contains("source untouched"));
    }
}
