//! Multi-valued assets for lode.
//!
//! An [`Asset`] maps keys to sets of string values and is persisted as one
//! blob in a [`lode_store::ValueStore`]. A [`Redux`] owns several assets
//! that share a store, remembers when each was last loaded, and on
//! [`Redux::refresh`] reloads only the assets whose blobs changed since.

pub mod asset;
pub mod error;
pub mod redux;

pub use asset::Asset;
pub use error::{ReduxError, ReduxResult};
pub use redux::Redux;
