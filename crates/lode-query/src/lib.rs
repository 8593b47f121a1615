//! Query engine for lode.
//!
//! An [`AssetList`] is the main entry point for applications reading and
//! searching lode assets. It resolves the logical asset names a caller
//! declares into the physical assets behind them, following the policy in a
//! [`Fabric`], and answers reads and cross-asset term queries over them.

pub mod asset_list;
pub mod error;

pub use asset_list::AssetList;
pub use error::{QueryError, QueryResult};

// Re-export the types callers need to build queries.
pub use lode_fabric::{Fabric, Transition, TransitionFormat};
pub use lode_types::Timestamp;
