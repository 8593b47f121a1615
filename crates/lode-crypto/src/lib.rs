//! Content hashing for lode.
//!
//! Provides domain-separated BLAKE3 hashing of value bytes, either from a
//! slice or from a stream that is buffered in the same pass.
//!
//! Hashing wraps the `blake3` crate; there is no custom cryptography here.

pub mod hasher;

pub use hasher::{ContentHasher, HasherError};
