//! Persistent key index for lode.
//!
//! Tracks, for every stored key, the content hash of its value and when the
//! key was first created and last modified. The whole index is persisted as
//! one file in the store directory and rewritten atomically on every change.
//!
//! # Key Types
//!
//! - [`Index`] -- The in-memory key map (BTreeMap-backed) with time-range queries
//! - [`IndexEntry`] -- Hash plus created/modified timestamps for one key

pub mod entry;
pub mod error;
pub mod index;

pub use entry::IndexEntry;
pub use error::{IndexError, IndexResult};
pub use index::{index_path, Index, INDEX_FILE_NAME};
