//! Error types for asset operations.

use thiserror::Error;

/// Errors that can occur while loading, mutating, or persisting assets.
#[derive(Debug, Error)]
pub enum ReduxError {
    /// The asset is not loaded in this coordinator.
    #[error("asset {0} is not loaded")]
    AssetNotLoaded(String),

    /// The asset blob could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Reading or writing the backing store failed.
    #[error("store error: {0}")]
    Store(#[from] lode_store::StoreError),
}

/// Convenience type alias for asset operations.
pub type ReduxResult<T> = std::result::Result<T, ReduxError>;
