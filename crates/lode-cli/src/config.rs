use std::path::{Path, PathBuf};

use anyhow::Context;
use lode_fabric::Fabric;
use lode_store::StoreConfig;
use serde::{Deserialize, Serialize};

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "lode.toml";

/// Contents of `lode.toml`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LodeConfig {
    pub store: StoreConfig,
    pub fabric: Fabric,
}

impl LodeConfig {
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(s).context("invalid configuration")?;
        config.fabric.validate()?;
        Ok(config)
    }

    /// Load `explicit` if given (it must exist), else `lode.toml` if it
    /// exists, else defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !path.exists() {
                    return Ok(Self::default());
                }
                path
            }
        };
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("loading {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lode_types::ValueExt;

    #[test]
    fn empty_file_is_default() {
        assert_eq!(LodeConfig::from_toml_str("").unwrap(), LodeConfig::default());
    }

    #[test]
    fn parses_store_and_fabric() {
        let config = LodeConfig::from_toml_str(
            r#"
[store]
dir = "data"
ext = ".json"

[fabric.aggregates]
credits = ["developers", "publishers"]

[fabric.atomics]
title = true
"#,
        )
        .unwrap();
        assert_eq!(config.store.dir, PathBuf::from("data"));
        assert_eq!(config.store.ext, ValueExt::Json);
        assert!(config.fabric.aggregates.is_aggregate("credits"));
        assert!(config.fabric.atomics.is_atomic("title"));
    }

    #[test]
    fn rejects_bad_extension_and_invalid_fabric() {
        assert!(LodeConfig::from_toml_str("[store]\next = \".txt\"\n").is_err());
        assert!(LodeConfig::from_toml_str("[fabric.aggregates]\nx = []\n").is_err());
    }

    #[test]
    fn explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        assert!(LodeConfig::load(Some(&dir.path().join("missing.toml"))).is_err());

        let path = dir.path().join("lode.toml");
        std::fs::write(&path, "[store]\ndir = \"vals\"\n").unwrap();
        let config = LodeConfig::load(Some(&path)).unwrap();
        assert_eq!(config.store.dir, PathBuf::from("vals"));
    }
}
