//! Query-shaping policy for lode assets.
//!
//! A [`Fabric`] bundles three independent lookup tables:
//!
//! - [`Aggregates`]: logical names that stand for a group of detail assets.
//! - [`Transitives`]: assets whose values are keys into another asset, and
//!   how a resolved value is rendered.
//! - [`Atomics`]: whether an asset's values are indivisible (query terms are
//!   alternatives) or composite (query terms are all required).
//!
//! Each table is usable on its own; an empty table is the identity policy.

pub mod error;
pub mod fabric;
pub mod rules;

pub use error::{FabricError, FabricResult};
pub use fabric::Fabric;
pub use rules::{Aggregates, Atomics, Transition, TransitionFormat, Transitives};
