use lode_crypto::HasherError;
use lode_index::IndexError;

/// Errors from value store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The configured value extension is not one of the supported ones.
    #[error("unsupported value extension {0:?}")]
    UnsupportedExtension(String),

    /// The index lists the key but its value file is gone.
    #[error("index contains key {key:?}, value file not found")]
    MissingValueFile { key: String },

    /// Loading or persisting the index failed.
    #[error("index error: {0}")]
    Index(#[from] IndexError),

    /// Reading the input to hash it failed.
    #[error("hash error: {0}")]
    Hash(#[from] HasherError),

    /// I/O error from the underlying file system.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
