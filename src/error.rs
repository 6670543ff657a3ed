use std::path::PathBuf;

use thiserror::Error;

/// The primary error type for all fatal operations in the `arcx` crate.
///
/// Only conditions that make continuing a run meaningless live here: broken
/// container structure, unwritable output, worker panics. File-scoped
/// problems (an unreadable input, a corrupt payload slice) are downgraded to
/// [`crate::report::Failure`] outcomes at the worker boundary and never
/// surface through this enum.
#[derive(Debug, Error)]
pub enum ArcxError {
    /// An I/O error occurred, typically while reading or writing a file.
    /// Includes the path where the error happened.
    #[error("I/O error on path '{}': {source}", .path.display())]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },

    /// The container header or manifest violates a structural invariant
    /// (bad magic, truncated manifest, out-of-bounds or overlapping payload
    /// ranges, unsafe entry path).
    #[error("malformed container: {0}")]
    Structure(String),

    /// The container declares a format version this tool does not speak.
    #[error("unsupported container format version {found} (this tool supports {supported})")]
    Version { found: u16, supported: u16 },

    /// Two descriptors resolved to the same relative archive path.
    #[error("duplicate archive path '{0}'")]
    DuplicateEntry(String),

    /// A requested compression level lies outside the codec's range.
    #[error("compression level {0} is outside the supported range {min}..={max}", min = crate::codec::MIN_LEVEL, max = crate::codec::MAX_LEVEL)]
    LevelOutOfRange(i32),

    /// A worker thread panicked; the run was aborted.
    #[error("a worker thread panicked")]
    WorkerPanicked,
}

// Generic IO error conversion that doesn't require a path
impl From<std::io::Error> for ArcxError {
    fn from(err: std::io::Error) -> Self {
        ArcxError::Io {
            source: err,
            path: PathBuf::new(),
        }
    }
}
