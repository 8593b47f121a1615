use std::io::Read;

use lode_types::Timestamp;

use crate::error::StoreResult;

/// Key/value store with content-hash dedup and an index of timestamps.
///
/// All implementations must satisfy these invariants:
/// - Writing content identical to the key's current value is a no-op: no
///   write, no timestamp change.
/// - `created` is set once per key; `modified` advances on content changes.
/// - Reads of absent keys return `Ok(None)`, never an error.
/// - All I/O errors are propagated, never silently ignored.
pub trait ValueStore: Send + Sync {
    /// Check whether a key is indexed.
    fn has(&self, key: &str) -> bool;

    /// Read a value.
    ///
    /// Returns `Ok(None)` if the key is not indexed or its value file is
    /// missing.
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Store everything `reader` yields under `key`.
    fn set(&self, key: &str, reader: &mut dyn Read) -> StoreResult<()>;

    /// Store a byte slice under `key`.
    fn set_bytes(&self, key: &str, data: &[u8]) -> StoreResult<()> {
        let mut reader = data;
        self.set(key, &mut reader)
    }

    /// Delete a key. Returns `true` if the key was present.
    fn cut(&self, key: &str) -> StoreResult<bool>;

    /// All indexed keys.
    fn keys(&self) -> Vec<String>;

    /// Keys created at or after `since`.
    fn created_after(&self, since: Timestamp) -> Vec<String>;

    /// Keys modified at or after `since`; with `strict`, only keys that
    /// changed after their creation.
    fn modified_after(&self, since: Timestamp, strict: bool) -> Vec<String>;

    /// Whether `key` was modified strictly after `since`.
    fn is_modified_after(&self, key: &str, since: Timestamp) -> bool;

    /// Mod time of the persisted index, `None` if there is none yet.
    fn index_current_mod_time(&self) -> StoreResult<Option<Timestamp>>;

    /// Mod time of a key's value file, `None` if there is none.
    fn current_mod_time(&self, key: &str) -> StoreResult<Option<Timestamp>>;

    /// Reload the index if it changed on disk since this handle last
    /// synchronized with it.
    fn index_refresh(&self) -> StoreResult<()>;

    /// Reload the index from disk unconditionally.
    ///
    /// Mod times have one-second resolution, so [`ValueStore::index_refresh`]
    /// cannot see a write by another handle in the same second it last
    /// synchronized. Callers that find a value file the index does not list
    /// use this to catch up.
    fn index_reload(&self) -> StoreResult<()>;
}
