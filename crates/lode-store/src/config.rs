use std::path::PathBuf;

use lode_types::ValueExt;
use serde::{Deserialize, Serialize};

/// Where a store lives and how its value files are named.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Store directory; created on first write.
    pub dir: PathBuf,
    /// Extension appended to every value file name.
    pub ext: ValueExt,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            ext: ValueExt::Gob,
        }
    }
}
