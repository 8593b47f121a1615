//! Foundation types for lode.
//!
//! This crate provides the small value types shared by every layer of the
//! store: how content is identified, how values are named on disk, and how
//! time is measured.
//!
//! # Key Types
//!
//! - [`ContentHash`] -- Hex-rendered BLAKE3 digest of a stored value
//! - [`ValueExt`] -- The closed set of value-file extensions a store accepts
//! - [`Timestamp`] -- Unix seconds, with `Option<Timestamp>` as the "absent" sentinel
//! - [`escape_key`] / [`unescape_key`] -- Key to file-name mapping

pub mod error;
pub mod ext;
pub mod hash;
pub mod key;
pub mod temporal;

pub use error::TypeError;
pub use ext::ValueExt;
pub use hash::ContentHash;
pub use key::{escape_key, unescape_key};
pub use temporal::{now, to_timestamp, Timestamp};
