//! The in-memory index and its on-disk form.
//!
//! The [`Index`] is a `BTreeMap<String, IndexEntry>`. It is persisted as a
//! single bincode file, [`INDEX_FILE_NAME`], inside the store directory, and
//! always rewritten whole: the new contents go to a temporary file in the
//! same directory which is then renamed over the old one.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use lode_types::{ContentHash, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entry::IndexEntry;
use crate::error::{IndexError, IndexResult};

/// File name of the persisted index inside a store directory.
pub const INDEX_FILE_NAME: &str = "_index.bin";

const INDEX_VERSION: u32 = 1;

/// Path of the index file for a store directory.
pub fn index_path(dir: &Path) -> PathBuf {
    dir.join(INDEX_FILE_NAME)
}

#[derive(Serialize)]
struct IndexFileRef<'a> {
    version: u32,
    entries: &'a BTreeMap<String, IndexEntry>,
}

#[derive(Deserialize)]
struct IndexFile {
    version: u32,
    entries: BTreeMap<String, IndexEntry>,
}

/// Key index: key -> {hash, created, modified}.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Index {
    entries: BTreeMap<String, IndexEntry>,
}

impl Index {
    /// Create a new empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries in the index.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the index has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get an entry by key.
    pub fn get(&self, key: &str) -> Option<&IndexEntry> {
        self.entries.get(key)
    }

    /// Returns `true` if the key is indexed.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Current content hash of a key, if indexed.
    pub fn hash_of(&self, key: &str) -> Option<ContentHash> {
        self.entries.get(key).map(|e| e.hash)
    }

    /// All indexed keys, in key order.
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Insert an entry as-is, replacing any previous one.
    pub fn insert(&mut self, key: impl Into<String>, entry: IndexEntry) {
        self.entries.insert(key.into(), entry);
    }

    /// Record a write of `hash` under `key` at time `now`.
    ///
    /// A new key gets `created = modified = now`; an existing key keeps its
    /// `created` and moves `modified` to `now`.
    pub fn upsert(&mut self, key: &str, hash: ContentHash, now: Timestamp) -> IndexEntry {
        let entry = self
            .entries
            .entry(key.to_string())
            .and_modify(|e| {
                e.hash = hash;
                e.modified = now;
            })
            .or_insert_with(|| IndexEntry::new(hash, now));
        *entry
    }

    /// Remove a key. Returns the removed entry, if any.
    pub fn remove(&mut self, key: &str) -> Option<IndexEntry> {
        self.entries.remove(key)
    }

    // ---------------------------------------------------------------
    // Time-range queries
    // ---------------------------------------------------------------

    /// Keys created at or after `since` (inclusive).
    pub fn created_after(&self, since: Timestamp) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, e)| e.created >= since)
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Keys modified at or after `since` (inclusive).
    ///
    /// With `strict`, keys whose value never changed after creation are
    /// excluded.
    pub fn modified_after(&self, since: Timestamp, strict: bool) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, e)| e.modified >= since && (!strict || e.was_updated()))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Returns `true` if `key` was modified strictly after `since`.
    ///
    /// Unlike [`Index::modified_after`] the bound is exclusive. Unknown keys
    /// are never modified after anything.
    pub fn is_modified_after(&self, key: &str, since: Timestamp) -> bool {
        self.entries
            .get(key)
            .map(|e| e.modified > since)
            .unwrap_or(false)
    }

    // ---------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------

    /// Load the index persisted in `dir`. A missing file is an empty index.
    pub fn read(dir: &Path) -> IndexResult<Self> {
        let path = index_path(dir);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no index file, starting empty");
                return Ok(Self::new());
            }
            Err(e) => return Err(e.into()),
        };

        let file: IndexFile =
            bincode::deserialize(&data).map_err(|e| IndexError::Serialization(e.to_string()))?;
        if file.version != INDEX_VERSION {
            return Err(IndexError::UnsupportedVersion {
                expected: INDEX_VERSION,
                found: file.version,
            });
        }

        debug!(path = %path.display(), entries = file.entries.len(), "index loaded");
        Ok(Self {
            entries: file.entries,
        })
    }

    /// Persist the whole index into `dir`, replacing the previous file.
    pub fn write(&self, dir: &Path) -> IndexResult<()> {
        let data = bincode::serialize(&IndexFileRef {
            version: INDEX_VERSION,
            entries: &self.entries,
        })
        .map_err(|e| IndexError::Serialization(e.to_string()))?;

        fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&data)?;
        tmp.as_file().sync_all()?;
        let path = index_path(dir);
        tmp.persist(&path).map_err(|e| e.error)?;

        debug!(path = %path.display(), entries = self.entries.len(), "index persisted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(b: u8) -> ContentHash {
        ContentHash::from_digest([b; 32])
    }

    /// Three keys "1", "2", "3" created (and last modified) at 1, 2, 3.
    fn make_index() -> Index {
        let mut idx = Index::new();
        for t in 1..=3 {
            idx.insert(t.to_string(), IndexEntry::new(hash(t as u8), t));
        }
        idx
    }

    fn sorted(mut keys: Vec<String>) -> Vec<String> {
        keys.sort();
        keys
    }

    #[test]
    fn new_index_is_empty() {
        let idx = Index::new();
        assert!(idx.is_empty());
        assert_eq!(idx.len(), 0);
        assert!(idx.keys().is_empty());
    }

    #[test]
    fn upsert_new_key_sets_both_times() {
        let mut idx = Index::new();
        let entry = idx.upsert("k", hash(1), 10);
        assert_eq!(entry.created, 10);
        assert_eq!(entry.modified, 10);
        assert_eq!(idx.hash_of("k"), Some(hash(1)));
    }

    #[test]
    fn upsert_existing_key_preserves_created() {
        let mut idx = Index::new();
        idx.upsert("k", hash(1), 10);
        let entry = idx.upsert("k", hash(2), 20);
        assert_eq!(entry.created, 10);
        assert_eq!(entry.modified, 20);
        assert_eq!(entry.hash, hash(2));
    }

    #[test]
    fn remove_entry() {
        let mut idx = make_index();
        assert!(idx.remove("2").is_some());
        assert!(!idx.contains("2"));
        assert!(idx.remove("2").is_none());
    }

    #[test]
    fn created_after_is_inclusive() {
        let idx = make_index();
        let cases: [(Timestamp, &[&str]); 6] = [
            (-1, &["1", "2", "3"]),
            (0, &["1", "2", "3"]),
            (1, &["1", "2", "3"]),
            (2, &["2", "3"]),
            (3, &["3"]),
            (4, &[]),
        ];
        for (since, expected) in cases {
            assert_eq!(sorted(idx.created_after(since)), expected, "since {since}");
        }
    }

    #[test]
    fn modified_after_non_strict_matches_created_after() {
        let idx = make_index();
        for since in -1..=4 {
            assert_eq!(
                sorted(idx.modified_after(since, false)),
                sorted(idx.created_after(since)),
                "since {since}"
            );
        }
    }

    #[test]
    fn modified_after_strict_excludes_never_updated() {
        let idx = make_index();
        for since in -1..=4 {
            assert!(idx.modified_after(since, true).is_empty(), "since {since}");
        }
    }

    #[test]
    fn modified_after_strict_includes_updated() {
        let mut idx = make_index();
        idx.upsert("2", hash(9), 5);
        assert_eq!(idx.modified_after(5, true), vec!["2".to_string()]);
        assert!(idx.modified_after(6, true).is_empty());
    }

    #[test]
    fn is_modified_after_is_strict() {
        let mut idx = make_index();
        idx.upsert("2", hash(9), 2);
        let cases = [
            ("1", -1, true),
            ("1", 0, true),
            ("1", 1, false),
            ("1", 2, false),
            ("2", 0, true),
            ("2", 1, true),
            ("2", 2, false),
            ("missing", -1, false),
        ];
        for (key, since, expected) in cases {
            assert_eq!(idx.is_modified_after(key, since), expected, "{key} after {since}");
        }
    }

    #[test]
    fn read_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let idx = Index::read(dir.path()).unwrap();
        assert!(idx.is_empty());
    }

    #[test]
    fn write_then_read_restores_entries() {
        let dir = tempfile::tempdir().unwrap();
        let idx = make_index();
        idx.write(dir.path()).unwrap();
        assert!(index_path(dir.path()).exists());

        let loaded = Index::read(dir.path()).unwrap();
        assert_eq!(loaded, idx);
    }

    #[test]
    fn write_replaces_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        make_index().write(dir.path()).unwrap();

        let mut smaller = Index::new();
        smaller.upsert("only", hash(4), 7);
        smaller.write(dir.path()).unwrap();

        let loaded = Index::read(dir.path()).unwrap();
        assert_eq!(loaded.keys(), vec!["only".to_string()]);
        // no temp files left behind
        let files = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(files, 1);
    }

    #[test]
    fn read_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(index_path(dir.path()), b"\x01").unwrap();
        assert!(matches!(
            Index::read(dir.path()),
            Err(IndexError::Serialization(_))
        ));
    }

    #[test]
    fn read_rejects_unknown_version() {
        let dir = tempfile::tempdir().unwrap();
        let entries = BTreeMap::new();
        let data = bincode::serialize(&IndexFileRef {
            version: 99,
            entries: &entries,
        })
        .unwrap();
        fs::write(index_path(dir.path()), data).unwrap();
        assert!(matches!(
            Index::read(dir.path()),
            Err(IndexError::UnsupportedVersion { expected: 1, found: 99 })
        ));
    }
}
