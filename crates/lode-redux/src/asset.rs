//! The [`Asset`] multi-valued map.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{ReduxError, ReduxResult};

/// A named multi-valued map: key -> set of values.
///
/// Values keep insertion order (so "first value" is stable) but are treated
/// as a set: adding a value already present does nothing. A key whose last
/// value is removed disappears.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    values: BTreeMap<String, Vec<String>>,
}

fn dedup(values: impl IntoIterator<Item = impl Into<String>>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for v in values {
        let v = v.into();
        if !out.contains(&v) {
            out.push(v);
        }
    }
    out
}

impl Asset {
    /// Create an empty asset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the asset has no keys.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// All keys, in key order.
    pub fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    /// Returns `true` if `key` has at least one value.
    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Returns `true` if `val` is one of `key`'s values.
    pub fn has_val(&self, key: &str, val: &str) -> bool {
        self.values
            .get(key)
            .is_some_and(|vs| vs.iter().any(|v| v == val))
    }

    /// Add `val` to `key`'s values. Returns `false` if it was already there.
    pub fn add_val(&mut self, key: &str, val: &str) -> bool {
        let values = self.values.entry(key.to_string()).or_default();
        if values.iter().any(|v| v == val) {
            return false;
        }
        values.push(val.to_string());
        true
    }

    /// Replace all of `key`'s values. An empty list removes the key.
    pub fn replace_values<I, V>(&mut self, key: &str, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let values = dedup(values);
        if values.is_empty() {
            self.values.remove(key);
        } else {
            self.values.insert(key.to_string(), values);
        }
    }

    /// [`Asset::replace_values`] for many keys at once.
    pub fn batch_replace_values<I>(&mut self, key_values: I)
    where
        I: IntoIterator<Item = (String, Vec<String>)>,
    {
        for (key, values) in key_values {
            self.replace_values(&key, values);
        }
    }

    /// Remove one value. Returns `false` if it was not there.
    pub fn cut_val(&mut self, key: &str, val: &str) -> bool {
        let Some(values) = self.values.get_mut(key) else {
            return false;
        };
        let before = values.len();
        values.retain(|v| v != val);
        let removed = values.len() != before;
        if values.is_empty() {
            self.values.remove(key);
        }
        removed
    }

    /// The first value of `key`.
    pub fn get_first_val(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .and_then(|vs| vs.first())
            .map(String::as_str)
    }

    /// All values of `key`.
    pub fn get_all_values(&self, key: &str) -> Option<&[String]> {
        self.values.get(key).map(Vec::as_slice)
    }

    /// Keys whose values satisfy `terms`.
    ///
    /// With `match_all`, every term must be one of the key's values (AND);
    /// otherwise any one term is enough (OR). Terms are compared against
    /// whole values, ignoring case when `any_case` is set. With a `scope`,
    /// only keys already in it are considered. No terms match nothing.
    pub fn match_terms(
        &self,
        terms: &[String],
        scope: Option<&BTreeSet<String>>,
        any_case: bool,
        match_all: bool,
    ) -> BTreeSet<String> {
        if terms.is_empty() {
            return BTreeSet::new();
        }
        let fold = |s: &str| if any_case { s.to_lowercase() } else { s.to_string() };
        let terms: Vec<String> = terms.iter().map(|t| fold(t.as_str())).collect();

        self.values
            .iter()
            .filter(|(key, _)| scope.map_or(true, |s| s.contains(key.as_str())))
            .filter(|(_, values)| {
                let values: Vec<String> = values.iter().map(|v| fold(v.as_str())).collect();
                let present = |t: &String| values.contains(t);
                if match_all {
                    terms.iter().all(present)
                } else {
                    terms.iter().any(present)
                }
            })
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Encode the whole asset as one blob.
    pub fn to_bytes(&self) -> ReduxResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| ReduxError::Serialization(e.to_string()))
    }

    /// Decode an asset blob.
    pub fn from_bytes(data: &[u8]) -> ReduxResult<Self> {
        bincode::deserialize(data).map_err(|e| ReduxError::Serialization(e.to_string()))
    }
}

impl FromIterator<(String, Vec<String>)> for Asset {
    fn from_iter<T: IntoIterator<Item = (String, Vec<String>)>>(iter: T) -> Self {
        let mut asset = Self::new();
        asset.batch_replace_values(iter);
        asset
    }
}
