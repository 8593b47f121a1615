//! The three policy tables.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

/// Logical asset names that expand to a list of detail assets.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Aggregates(BTreeMap<String, Vec<String>>);

impl Aggregates {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `name` as standing for `details`.
    pub fn insert<I, S>(&mut self, name: impl Into<String>, details: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0
            .insert(name.into(), details.into_iter().map(Into::into).collect());
    }

    /// Returns `true` if `asset` is an aggregate name.
    pub fn is_aggregate(&self, asset: &str) -> bool {
        self.0.contains_key(asset)
    }

    /// The detail assets behind `asset`; a plain asset is its own detail.
    pub fn detail(&self, asset: &str) -> Vec<String> {
        match self.0.get(asset) {
            Some(details) => details.clone(),
            None => vec![asset.to_string()],
        }
    }

    /// The union of [`Aggregates::detail`] over `assets`.
    pub fn detail_all<I, S>(&self, assets: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        assets
            .into_iter()
            .flat_map(|a| self.detail(a.as_ref()))
            .collect()
    }

    /// Iterate over `(name, details)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

// ---------------------------------------------------------------------------
// Transitives
// ---------------------------------------------------------------------------

/// How a transitive value is rendered once its target value is known.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionFormat {
    /// Keep the stored value.
    Raw,
    /// Replace it with the target's value.
    Target,
    /// `"{raw} ({target})"`.
    #[default]
    Annotated,
    /// A template with `{raw}` and `{target}` placeholders.
    Template(String),
}

impl TransitionFormat {
    /// Render `raw` given the target's value for it.
    pub fn apply(&self, raw: &str, target: &str) -> String {
        match self {
            Self::Raw => raw.to_string(),
            Self::Target => target.to_string(),
            Self::Annotated => format!("{raw} ({target})"),
            // Substitute both placeholders in one pass so values that
            // happen to contain a placeholder are left alone.
            Self::Template(template) => template
                .split("{raw}")
                .map(|part| part.replace("{target}", target))
                .collect::<Vec<_>>()
                .join(raw),
        }
    }
}

/// A single transitive rule: values are keys into `target`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub target: String,
    #[serde(default)]
    pub format: TransitionFormat,
}

impl Transition {
    /// A transition to `target` with the default format.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            format: TransitionFormat::default(),
        }
    }

    /// Override the format.
    pub fn with_format(mut self, format: TransitionFormat) -> Self {
        self.format = format;
        self
    }
}

/// Assets whose values are foreign keys into another asset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transitives(BTreeMap<String, Transition>);

impl Transitives {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `asset` as transitive.
    pub fn insert(&mut self, asset: impl Into<String>, transition: Transition) {
        self.0.insert(asset.into(), transition);
    }

    /// Returns `true` if `asset` has a transition.
    pub fn is_transitive(&self, asset: &str) -> bool {
        self.0.contains_key(asset)
    }

    /// The rule for `asset`.
    pub fn transition(&self, asset: &str) -> Option<&Transition> {
        self.0.get(asset)
    }

    /// The target asset for `asset`.
    pub fn target(&self, asset: &str) -> Option<&str> {
        self.0.get(asset).map(|t| t.target.as_str())
    }

    /// Render `raw` from `asset` using the target's value. Non-transitive
    /// assets return `raw` unchanged.
    pub fn fmt(&self, asset: &str, raw: &str, target: &str) -> String {
        match self.0.get(asset) {
            Some(t) => t.format.apply(raw, target),
            None => raw.to_string(),
        }
    }

    /// Iterate over `(asset, rule)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Transition)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

// ---------------------------------------------------------------------------
// Atomics
// ---------------------------------------------------------------------------

/// Per-asset atomic classification. Unlisted assets are not atomic.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Atomics(BTreeMap<String, bool>);

impl Atomics {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify `asset`.
    pub fn insert(&mut self, asset: impl Into<String>, atomic: bool) {
        self.0.insert(asset.into(), atomic);
    }

    /// Whether each query term for `asset` is a whole alternative value.
    pub fn is_atomic(&self, asset: &str) -> bool {
        self.0.get(asset).copied().unwrap_or(false)
    }

    /// `match_all` for a query against `asset`: atomic assets accept any
    /// term, composite assets require every term.
    pub fn match_all(&self, asset: &str) -> bool {
        !self.is_atomic(asset)
    }
}
