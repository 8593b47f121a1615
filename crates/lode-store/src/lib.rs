//! Directory-backed key/value storage for lode.
//!
//! Every value lives in its own file, named after its escaped key plus the
//! store's configured extension. A persistent index beside the values
//! records each key's content hash and timestamps, which gives the store
//! three properties on top of plain files:
//!
//! - Writing identical content again is free: the hash matches, nothing is
//!   written and no timestamp moves.
//! - Keys can be listed by creation or modification time without touching
//!   the value files.
//! - Long-lived handles can cheaply notice writes made by other handles
//!   (or processes) by comparing the index file's mod time against the time
//!   they last synchronized.
//!
//! # Storage Backends
//!
//! All backends implement the [`ValueStore`] trait:
//!
//! - [`DirValueStore`] -- one directory, one file per value, one index file
//!
//! # Design Rules
//!
//! 1. The index says a key exists iff its value file is expected on disk.
//!    External tampering can break this; [`DirValueStore::vet_index_only`]
//!    and [`DirValueStore::vet_index_missing`] detect and repair it.
//! 2. Reads are lenient: an indexed key whose file vanished reads as absent.
//! 3. Deletes are strict: the same situation on `cut` is an error.
//! 4. All I/O errors are propagated, never retried.

pub mod config;
pub mod error;
pub mod local;
pub mod progress;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use local::DirValueStore;
pub use progress::ProgressSink;
pub use traits::ValueStore;
