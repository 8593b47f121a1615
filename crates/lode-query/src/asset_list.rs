//! The [`AssetList`] query engine.
//!
//! Callers name logical assets; the list expands them through the fabric's
//! aggregates, loads transition targets alongside, and answers reads and
//! term queries across the result.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

use lode_fabric::Fabric;
use lode_redux::{Asset, Redux};
use lode_store::{DirValueStore, ValueStore};
use lode_types::{Timestamp, ValueExt};
use tracing::debug;

use crate::error::{QueryError, QueryResult};

/// Query surface over a declared set of assets.
///
/// The declared names (possibly aggregates) are the public surface; the
/// assets actually loaded are their details plus the targets of any
/// transitive details.
pub struct AssetList {
    declared: Vec<String>,
    redux: Redux,
    fabric: Fabric,
}

impl std::fmt::Debug for AssetList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetList")
            .field("declared", &self.declared)
            .field("redux", &self.redux)
            .finish()
    }
}

impl AssetList {
    /// Open the store in `dir` and load everything `assets` needs.
    pub fn connect<I, S>(dir: impl Into<PathBuf>, fabric: Fabric, assets: I) -> QueryResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = DirValueStore::open(dir, ValueExt::Gob).map_err(lode_redux::ReduxError::from)?;
        Self::with_store(Arc::new(store), fabric, assets)
    }

    /// Like [`AssetList::connect`] over an existing store.
    pub fn with_store<I, S>(
        store: Arc<dyn ValueStore>,
        fabric: Fabric,
        assets: I,
    ) -> QueryResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        fabric.validate()?;
        let declared: Vec<String> = assets.into_iter().map(Into::into).collect();

        let mut working = BTreeSet::new();
        for detail in fabric.aggregates.detail_all(&declared) {
            if let Some(target) = fabric.transitives.target(&detail) {
                working.insert(target.to_string());
            }
            working.insert(detail);
        }
        debug!(declared = ?declared, working = ?working, "resolved asset list");

        let redux = Redux::with_store(store, &working)?;
        Ok(Self {
            declared,
            redux,
            fabric,
        })
    }

    /// The names this list was connected with.
    pub fn declared_assets(&self) -> &[String] {
        &self.declared
    }

    /// The policy in effect.
    pub fn fabric(&self) -> &Fabric {
        &self.fabric
    }

    /// Fail on the first name not declared on this list.
    pub fn is_supported<I, S>(&self, assets: I) -> QueryResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for asset in assets {
            let asset = asset.as_ref();
            if !self.declared.iter().any(|d| d == asset) {
                return Err(QueryError::UnsupportedAsset(asset.to_string()));
            }
        }
        Ok(())
    }

    fn loaded(&self, asset: &str) -> Option<&Asset> {
        self.redux.asset(asset)
    }

    fn require_loaded(&self, asset: &str) -> QueryResult<()> {
        if self.redux.is_loaded(asset) {
            Ok(())
        } else {
            Err(QueryError::UnsupportedAsset(asset.to_string()))
        }
    }

    // ---- Reads ----

    /// Keys of a loaded asset; empty for unknown assets.
    pub fn keys(&self, asset: &str) -> Vec<String> {
        self.loaded(asset).map(Asset::keys).unwrap_or_default()
    }

    /// Returns `true` if `asset` is in the working set.
    pub fn has(&self, asset: &str) -> bool {
        self.redux.is_loaded(asset)
    }

    /// Returns `true` if `asset` is loaded and has `key`.
    pub fn has_key(&self, asset: &str, key: &str) -> bool {
        self.loaded(asset).is_some_and(|a| a.has(key))
    }

    /// Returns `true` if `val` is one of `key`'s stored values in `asset`.
    pub fn has_val(&self, asset: &str, key: &str, val: &str) -> bool {
        self.loaded(asset).is_some_and(|a| a.has_val(key, val))
    }

    /// Resolve one raw value of a transitive asset through its target.
    fn transition_value(&self, asset: &str, raw: &str) -> String {
        let resolved = self
            .fabric
            .transitives
            .target(asset)
            .and_then(|target| self.loaded(target))
            .and_then(|target| target.get_first_val(raw));
        match resolved {
            Some(target_val) => self.fabric.transitives.fmt(asset, raw, target_val),
            None => raw.to_string(),
        }
    }

    /// First value of `key`, resolved through transitions.
    pub fn get_first_val(&self, asset: &str, key: &str) -> Option<String> {
        let raw = self.loaded(asset)?.get_first_val(key)?;
        Some(self.transition_value(asset, raw))
    }

    /// All values of `key`, resolved through transitions.
    pub fn get_all_values(&self, asset: &str, key: &str) -> Option<Vec<String>> {
        let raw = self.get_all_unchanged_values(asset, key)?;
        Some(raw.iter().map(|v| self.transition_value(asset, v)).collect())
    }

    /// All values of `key` exactly as stored.
    pub fn get_all_unchanged_values(&self, asset: &str, key: &str) -> Option<&[String]> {
        self.loaded(asset)?.get_all_values(key)
    }

    // ---- Mutations ----
    //
    // Each one fails with `UnsupportedAsset` for assets outside the working
    // set and otherwise rewrites the asset blob.

    /// Add one value to `key`.
    pub fn add_val(&mut self, asset: &str, key: &str, val: &str) -> QueryResult<()> {
        self.require_loaded(asset)?;
        Ok(self.redux.add_val(asset, key, val)?)
    }

    /// Replace all of `key`'s values; an empty list removes the key.
    pub fn replace_values<V: Into<String>>(
        &mut self,
        asset: &str,
        key: &str,
        values: impl IntoIterator<Item = V>,
    ) -> QueryResult<()> {
        self.require_loaded(asset)?;
        Ok(self.redux.replace_values(asset, key, values)?)
    }

    /// Replace values for many keys with a single blob write.
    pub fn batch_replace_values(
        &mut self,
        asset: &str,
        key_values: impl IntoIterator<Item = (String, Vec<String>)>,
    ) -> QueryResult<()> {
        self.require_loaded(asset)?;
        Ok(self.redux.batch_replace_values(asset, key_values)?)
    }

    /// Remove one value from `key`.
    pub fn cut_val(&mut self, asset: &str, key: &str, val: &str) -> QueryResult<()> {
        self.require_loaded(asset)?;
        Ok(self.redux.cut_val(asset, key, val)?)
    }

    // ---- Matching ----

    /// `terms` plus every key of `asset`'s transition target whose value
    /// matches them, so callers can search by either side of a transition.
    fn with_reverse_transitions(
        &self,
        asset: &str,
        terms: &[String],
        any_case: bool,
    ) -> QueryResult<Vec<String>> {
        let mut expanded = terms.to_vec();
        if let Some(target) = self.fabric.transitives.target(asset) {
            let match_all = self.fabric.atomics.match_all(target);
            for key in self
                .redux
                .match_terms(target, terms, None, any_case, match_all)?
            {
                if !expanded.contains(&key) {
                    expanded.push(key);
                }
            }
        }
        Ok(expanded)
    }

    /// Keys satisfying every clause of `query` (asset name -> terms).
    ///
    /// Clauses intersect. An aggregate clause matches each of its details
    /// with the aggregate's atomic classification and unions the results.
    /// An empty query matches nothing.
    pub fn match_query(
        &self,
        query: &BTreeMap<String, Vec<String>>,
        any_case: bool,
    ) -> QueryResult<BTreeSet<String>> {
        self.is_supported(query.keys())?;

        let mut scope: Option<BTreeSet<String>> = None;
        for (asset, terms) in query {
            let match_all = self.fabric.atomics.match_all(asset);
            let mut matched = BTreeSet::new();
            for detail in self.fabric.aggregates.detail(asset) {
                let terms = self.with_reverse_transitions(&detail, terms, any_case)?;
                matched.extend(self.redux.match_terms(
                    &detail,
                    &terms,
                    scope.as_ref(),
                    any_case,
                    match_all,
                )?);
            }
            debug!(asset = %asset, matched = matched.len(), "query clause");
            scope = Some(matched);
        }
        Ok(scope.unwrap_or_default())
    }

    // ---- Change detection ----

    /// Latest blob mod time across the working set.
    pub fn mod_time(&self) -> QueryResult<Option<Timestamp>> {
        Ok(self.redux.mod_time()?)
    }

    /// Reload assets changed on disk.
    pub fn refresh(&mut self) -> QueryResult<&mut Self> {
        self.redux.refresh()?;
        Ok(self)
    }
}
