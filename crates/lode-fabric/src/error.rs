use std::io;

/// Errors produced while loading or validating a fabric.
#[derive(Debug, thiserror::Error)]
pub enum FabricError {
    /// I/O error reading a fabric file.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The fabric file is not valid TOML or has the wrong shape.
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// A rule that can never apply sensibly.
    #[error("invalid rule for {asset}: {reason}")]
    InvalidRule { asset: String, reason: String },
}

/// Convenience alias used throughout the fabric crate.
pub type FabricResult<T> = std::result::Result<T, FabricError>;
