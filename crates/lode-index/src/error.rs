//! Error types for the index crate.

/// Errors that can occur while loading or persisting the index.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// I/O failure reading or writing the index file.
    #[error("index I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The index file could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The index file was written by an incompatible format version.
    #[error("unsupported index version {found} (expected {expected})")]
    UnsupportedVersion { expected: u32, found: u32 },
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;
