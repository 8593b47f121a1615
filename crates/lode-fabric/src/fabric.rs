use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FabricError, FabricResult};
use crate::rules::{Aggregates, Atomics, Transition, Transitives};

/// The full query policy: aggregates, transitives, and atomics.
///
/// `Fabric::default()` has empty tables: no aggregates, no transitives, and
/// every asset composite.
///
/// ```toml
/// [aggregates]
/// credits = ["developers", "publishers"]
///
/// [transitives.developers]
/// target = "developer-names"
/// format = "target"
///
/// [atomics]
/// title = true
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Fabric {
    pub aggregates: Aggregates,
    pub transitives: Transitives,
    pub atomics: Atomics,
}

impl Fabric {
    /// An empty fabric.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: declare an aggregate.
    pub fn with_aggregate<I, S>(mut self, name: impl Into<String>, details: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aggregates.insert(name, details);
        self
    }

    /// Builder: declare a transitive asset.
    pub fn with_transitive(mut self, asset: impl Into<String>, transition: Transition) -> Self {
        self.transitives.insert(asset, transition);
        self
    }

    /// Builder: classify an asset.
    pub fn with_atomic(mut self, asset: impl Into<String>, atomic: bool) -> Self {
        self.atomics.insert(asset, atomic);
        self
    }

    /// Parse and validate a fabric from TOML.
    pub fn from_toml_str(s: &str) -> FabricResult<Self> {
        let fabric: Self = toml::from_str(s)?;
        fabric.validate()?;
        Ok(fabric)
    }

    /// Read, parse, and validate a fabric file.
    pub fn from_path(path: impl AsRef<Path>) -> FabricResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let fabric = Self::from_toml_str(&text)?;
        debug!(
            path = %path.display(),
            aggregates = fabric.aggregates.iter().count(),
            transitives = fabric.transitives.iter().count(),
            "fabric loaded"
        );
        Ok(fabric)
    }

    /// Reject rules that cannot apply.
    ///
    /// Aggregates expand one level only, so an aggregate must have details
    /// and none of them may be an aggregate itself. A transition may not
    /// target its own asset.
    pub fn validate(&self) -> FabricResult<()> {
        for (name, details) in self.aggregates.iter() {
            if details.is_empty() {
                return Err(invalid(name, "aggregate has no details"));
            }
            if let Some(nested) = details.iter().find(|d| self.aggregates.is_aggregate(d)) {
                return Err(invalid(name, &format!("detail {nested} is itself an aggregate")));
            }
        }
        for (asset, transition) in self.transitives.iter() {
            if transition.target == asset {
                return Err(invalid(asset, "transition targets itself"));
            }
        }
        Ok(())
    }
}

fn invalid(asset: &str, reason: &str) -> FabricError {
    FabricError::InvalidRule {
        asset: asset.to_string(),
        reason: reason.to_string(),
    }
}
