//! The [`Redux`] coordinator.
//!
//! A `Redux` loads assets from one shared value store and tracks, per
//! asset, the blob mod time observed at its last load. Refreshing costs one
//! stat per loaded asset plus one decode per asset that actually changed.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

use lode_store::{DirValueStore, ValueStore};
use lode_types::{Timestamp, ValueExt};
use tracing::debug;

use crate::asset::Asset;
use crate::error::{ReduxError, ReduxResult};

/// Owns a set of loaded assets backed by one value store.
pub struct Redux {
    store: Arc<dyn ValueStore>,
    assets: BTreeMap<String, Asset>,
    /// Blob mod time as of each asset's most recent load or write.
    loaded_at: BTreeMap<String, Option<Timestamp>>,
}

impl std::fmt::Debug for Redux {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Redux")
            .field("assets", &self.assets.keys().collect::<Vec<_>>())
            .field("loaded_at", &self.loaded_at)
            .finish()
    }
}

impl Redux {
    /// Open the store in `dir` and load `assets` from it.
    ///
    /// Asset blobs are stored with the `.gob` extension. Assets with no
    /// blob yet load empty.
    pub fn connect<I, S>(dir: impl Into<PathBuf>, assets: I) -> ReduxResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let store = DirValueStore::open(dir, ValueExt::Gob)?;
        Self::with_store(Arc::new(store), assets)
    }

    /// Load `assets` from an existing store.
    pub fn with_store<I, S>(store: Arc<dyn ValueStore>, assets: I) -> ReduxResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut redux = Self {
            store,
            assets: BTreeMap::new(),
            loaded_at: BTreeMap::new(),
        };
        for asset in assets {
            redux.load(asset.as_ref())?;
        }
        Ok(redux)
    }

    /// Read `asset`'s blob and (re)place it in memory.
    ///
    /// A blob on disk that this handle's index does not list yet was
    /// written by another handle; the index is reloaded before reading it.
    /// If the blob still cannot be read, no load time is recorded, so the
    /// next [`Redux::refresh`] tries again.
    pub fn load(&mut self, asset: &str) -> ReduxResult<()> {
        // Stat before reading: a write racing the read leaves an older
        // recorded time, so the next refresh picks it up.
        let mod_time = self.store.current_mod_time(asset)?;
        if mod_time.is_some() && !self.store.has(asset) {
            debug!(asset, "blob not in index, reloading index");
            self.store.index_reload()?;
        }

        let (loaded, loaded_at) = match self.store.get(asset)? {
            Some(data) => (Asset::from_bytes(&data)?, mod_time),
            None => (Asset::new(), None),
        };
        debug!(asset, keys = loaded.len(), ?loaded_at, "asset loaded");
        self.assets.insert(asset.to_string(), loaded);
        self.loaded_at.insert(asset.to_string(), loaded_at);
        Ok(())
    }

    /// The shared store.
    pub fn store(&self) -> &Arc<dyn ValueStore> {
        &self.store
    }

    /// Names of the loaded assets.
    pub fn assets(&self) -> impl Iterator<Item = &str> {
        self.assets.keys().map(String::as_str)
    }

    /// Returns `true` if `asset` is loaded.
    pub fn is_loaded(&self, asset: &str) -> bool {
        self.assets.contains_key(asset)
    }

    /// A loaded asset.
    pub fn asset(&self, asset: &str) -> Option<&Asset> {
        self.assets.get(asset)
    }

    /// Blob mod time recorded at `asset`'s last load or write.
    pub fn loaded_at(&self, asset: &str) -> Option<Timestamp> {
        self.loaded_at.get(asset).copied().flatten()
    }

    fn asset_mut(&mut self, asset: &str) -> ReduxResult<&mut Asset> {
        self.assets
            .get_mut(asset)
            .ok_or_else(|| ReduxError::AssetNotLoaded(asset.to_string()))
    }

    fn persist(&mut self, asset: &str) -> ReduxResult<()> {
        let data = self
            .assets
            .get(asset)
            .ok_or_else(|| ReduxError::AssetNotLoaded(asset.to_string()))?
            .to_bytes()?;
        self.store.set_bytes(asset, &data)?;
        let mod_time = self.store.current_mod_time(asset)?;
        self.loaded_at.insert(asset.to_string(), mod_time);
        Ok(())
    }

    // ---------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------

    /// Keys of a loaded asset.
    pub fn keys(&self, asset: &str) -> ReduxResult<Vec<String>> {
        self.assets
            .get(asset)
            .map(Asset::keys)
            .ok_or_else(|| ReduxError::AssetNotLoaded(asset.to_string()))
    }

    /// Keys of `asset` matching `terms`. See [`Asset::match_terms`].
    pub fn match_terms(
        &self,
        asset: &str,
        terms: &[String],
        scope: Option<&BTreeSet<String>>,
        any_case: bool,
        match_all: bool,
    ) -> ReduxResult<BTreeSet<String>> {
        self.assets
            .get(asset)
            .map(|a| a.match_terms(terms, scope, any_case, match_all))
            .ok_or_else(|| ReduxError::AssetNotLoaded(asset.to_string()))
    }

    // ---------------------------------------------------------------
    // Mutations (each rewrites the asset blob)
    // ---------------------------------------------------------------

    /// Add a value and persist the asset.
    pub fn add_val(&mut self, asset: &str, key: &str, val: &str) -> ReduxResult<()> {
        if self.asset_mut(asset)?.add_val(key, val) {
            self.persist(asset)?;
        }
        Ok(())
    }

    /// Replace a key's values and persist the asset.
    pub fn replace_values<V: Into<String>>(
        &mut self,
        asset: &str,
        key: &str,
        values: impl IntoIterator<Item = V>,
    ) -> ReduxResult<()> {
        self.asset_mut(asset)?.replace_values(key, values);
        self.persist(asset)
    }

    /// Replace values for many keys and persist the asset once.
    pub fn batch_replace_values(
        &mut self,
        asset: &str,
        key_values: impl IntoIterator<Item = (String, Vec<String>)>,
    ) -> ReduxResult<()> {
        self.asset_mut(asset)?.batch_replace_values(key_values);
        self.persist(asset)
    }

    /// Remove a value and persist the asset.
    pub fn cut_val(&mut self, asset: &str, key: &str, val: &str) -> ReduxResult<()> {
        if self.asset_mut(asset)?.cut_val(key, val) {
            self.persist(asset)?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Change detection
    // ---------------------------------------------------------------

    /// Latest blob mod time across loaded assets, `None` if no loaded asset
    /// has a blob. Does not reload anything.
    pub fn mod_time(&self) -> ReduxResult<Option<Timestamp>> {
        let mut latest = None;
        for asset in self.assets.keys() {
            latest = latest.max(self.store.current_mod_time(asset)?);
        }
        Ok(latest)
    }

    /// Reload every asset whose blob changed since it was last loaded.
    ///
    /// Unchanged assets stay in memory untouched.
    pub fn refresh(&mut self) -> ReduxResult<&mut Self> {
        self.store.index_refresh()?;

        let names: Vec<String> = self.assets.keys().cloned().collect();
        for asset in names {
            let current = self.store.current_mod_time(&asset)?;
            let loaded = self.loaded_at.get(&asset).copied().flatten();
            if loaded < current {
                debug!(asset = %asset, ?loaded, ?current, "asset changed on disk, reloading");
                self.load(&asset)?;
            }
        }
        Ok(self)
    }
}
