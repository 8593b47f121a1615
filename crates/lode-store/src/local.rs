use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use lode_crypto::ContentHasher;
use lode_index::{index_path, Index, IndexEntry};
use lode_types::{escape_key, now, to_timestamp, unescape_key, Timestamp, ValueExt};
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::progress::ProgressSink;
use crate::traits::ValueStore;

/// State guarded by the store's index lock.
#[derive(Debug)]
struct IndexState {
    index: Index,
    /// When this handle last synchronized `index` with the index file.
    conn_time: Timestamp,
}

/// Directory-backed value store.
///
/// One file per value plus one index file, all in `dir`. A single mutex
/// guards the in-memory index. Hashing and value file writes happen outside
/// that lock; only the dedup comparison and the index update are serialized.
/// Two concurrent writers of the same key may both write the value file
/// (last writer wins on disk) while the index itself stays consistent.
/// Callers that need one writer per key must serialize externally.
#[derive(Debug)]
pub struct DirValueStore {
    dir: PathBuf,
    ext: ValueExt,
    state: Mutex<IndexState>,
}

impl DirValueStore {
    /// Open the store in `dir`, naming value files with `ext`.
    ///
    /// `ext` must be one of `.json`, `.gob`, `.html`, `.xml`. The index is
    /// loaded from disk when present; the directory itself is created lazily
    /// on first write.
    pub fn connect(dir: impl Into<PathBuf>, ext: &str) -> StoreResult<Self> {
        let ext: ValueExt = ext
            .parse()
            .map_err(|_| StoreError::UnsupportedExtension(ext.to_string()))?;
        Self::open(dir, ext)
    }

    /// Open the store described by `config`.
    pub fn from_config(config: &StoreConfig) -> StoreResult<Self> {
        Self::open(config.dir.clone(), config.ext)
    }

    /// Open the store in `dir` with an already validated extension.
    pub fn open(dir: impl Into<PathBuf>, ext: ValueExt) -> StoreResult<Self> {
        let dir = dir.into();
        let index = Index::read(&dir)?;
        debug!(dir = %dir.display(), %ext, keys = index.len(), "store connected");
        Ok(Self {
            dir,
            ext,
            state: Mutex::new(IndexState {
                index,
                conn_time: now(),
            }),
        })
    }

    /// The store directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The value file extension.
    pub fn ext(&self) -> ValueExt {
        self.ext
    }

    /// Path of the value file for `key`.
    pub fn value_path(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}{}", escape_key(key), self.ext.as_str()))
    }

    /// Path of the index file.
    pub fn index_path(&self) -> PathBuf {
        index_path(&self.dir)
    }

    /// The index entry for `key`, if indexed.
    pub fn entry(&self, key: &str) -> Option<IndexEntry> {
        self.state().index.get(key).copied()
    }

    /// Open the value file for `key` for streaming reads.
    ///
    /// Same leniency as [`ValueStore::get`]: unindexed keys and missing
    /// files are `Ok(None)`.
    pub fn open_value(&self, key: &str) -> StoreResult<Option<File>> {
        if !self.has(key) {
            return Ok(None);
        }
        match File::open(self.value_path(key)) {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn state(&self) -> MutexGuard<'_, IndexState> {
        self.state.lock().expect("index lock poisoned")
    }

    fn write_value(&self, key: &str, data: &[u8]) -> StoreResult<()> {
        fs::create_dir_all(&self.dir)?;
        let mut file = File::create(self.value_path(key))?;
        file.write_all(data)?;
        file.flush()?;
        Ok(())
    }

    // ---------------------------------------------------------------
    // Consistency scans
    // ---------------------------------------------------------------

    /// Find indexed keys whose value file is missing.
    ///
    /// With `fix`, those keys are dropped from the index, which is then
    /// persisted once. Returns the orphaned keys either way.
    pub fn vet_index_only(
        &self,
        fix: bool,
        mut progress: Option<&mut dyn ProgressSink>,
    ) -> StoreResult<Vec<String>> {
        let keys = self.keys();
        if let Some(p) = progress.as_deref_mut() {
            p.total(keys.len() as u64);
        }

        let mut orphans = Vec::new();
        for key in keys {
            match fs::metadata(self.value_path(&key)) {
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    warn!(key = %key, "indexed key has no value file");
                    orphans.push(key);
                }
                Err(e) => return Err(e.into()),
            }
            if let Some(p) = progress.as_deref_mut() {
                p.increment();
            }
        }

        if fix && !orphans.is_empty() {
            let mut state = self.state();
            for key in &orphans {
                state.index.remove(key);
            }
            state.index.write(&self.dir)?;
        }

        info!(orphans = orphans.len(), fixed = fix, "vetted index against value files");
        Ok(orphans)
    }

    /// Find value files in the store directory that the index does not list.
    ///
    /// With `fix`, each such file is re-ingested through [`ValueStore::set`],
    /// which hashes it and adds it to the index. Files whose names do not
    /// unescape to a key are skipped with a warning. Returns the unindexed
    /// keys either way.
    pub fn vet_index_missing(
        &self,
        fix: bool,
        mut progress: Option<&mut dyn ProgressSink>,
    ) -> StoreResult<Vec<String>> {
        let files = self.value_files()?;
        if let Some(p) = progress.as_deref_mut() {
            p.total(files.len() as u64);
        }

        let mut unindexed = Vec::new();
        for (stem, path) in files {
            match unescape_key(&stem) {
                Ok(key) if !self.has(&key) => {
                    warn!(key = %key, "value file is not indexed");
                    if fix {
                        let mut file = File::open(&path)?;
                        self.set(&key, &mut file)?;
                    }
                    unindexed.push(key);
                }
                Ok(_) => {}
                Err(e) => warn!(file = %path.display(), error = %e, "skipping value file"),
            }
            if let Some(p) = progress.as_deref_mut() {
                p.increment();
            }
        }

        info!(unindexed = unindexed.len(), fixed = fix, "vetted value files against index");
        Ok(unindexed)
    }

    /// `(escaped key, path)` for every file in the store directory carrying
    /// this store's extension. A missing directory has no files.
    fn value_files(&self) -> StoreResult<Vec<(String, PathBuf)>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let ext = self.ext.as_str();
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(&self.dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            if let Some(stem) = name.strip_suffix(ext) {
                files.push((stem.to_string(), entry.path().to_path_buf()));
            }
        }
        Ok(files)
    }
}

fn file_mod_time(path: &Path) -> StoreResult<Option<Timestamp>> {
    match fs::metadata(path) {
        Ok(meta) => Ok(Some(to_timestamp(meta.modified()?))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl ValueStore for DirValueStore {
    fn has(&self, key: &str) -> bool {
        self.state().index.contains(key)
    }

    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let Some(mut file) = self.open_value(key)? else {
            return Ok(None);
        };
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Ok(Some(data))
    }

    fn set(&self, key: &str, reader: &mut dyn Read) -> StoreResult<()> {
        let (hash, data) = ContentHasher::VALUE.hash_reader(reader)?;

        if self.state().index.hash_of(key) == Some(hash) {
            debug!(key, hash = %hash.short_hex(), "value unchanged, skipping write");
            return Ok(());
        }

        self.write_value(key, &data)?;

        let mut state = self.state();
        state.index.upsert(key, hash, now());
        state.index.write(&self.dir)?;
        debug!(key, hash = %hash.short_hex(), bytes = data.len(), "value written");
        Ok(())
    }

    fn cut(&self, key: &str) -> StoreResult<bool> {
        if !self.has(key) {
            return Ok(false);
        }

        let path = self.value_path(key);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::MissingValueFile {
                    key: key.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        }

        let mut state = self.state();
        state.index.remove(key);
        state.index.write(&self.dir)?;
        debug!(key, "value removed");
        Ok(true)
    }

    fn keys(&self) -> Vec<String> {
        self.state().index.keys()
    }

    fn created_after(&self, since: Timestamp) -> Vec<String> {
        self.state().index.created_after(since)
    }

    fn modified_after(&self, since: Timestamp, strict: bool) -> Vec<String> {
        self.state().index.modified_after(since, strict)
    }

    fn is_modified_after(&self, key: &str, since: Timestamp) -> bool {
        self.state().index.is_modified_after(key, since)
    }

    fn index_current_mod_time(&self) -> StoreResult<Option<Timestamp>> {
        file_mod_time(&self.index_path())
    }

    fn current_mod_time(&self, key: &str) -> StoreResult<Option<Timestamp>> {
        file_mod_time(&self.value_path(key))
    }

    fn index_refresh(&self) -> StoreResult<()> {
        let Some(index_mod_time) = self.index_current_mod_time()? else {
            return Ok(());
        };

        let mut state = self.state();
        if state.conn_time < index_mod_time {
            state.index = Index::read(&self.dir)?;
            state.conn_time = index_mod_time;
            debug!(keys = state.index.len(), "index reloaded from disk");
        }
        Ok(())
    }

    fn index_reload(&self) -> StoreResult<()> {
        let index_mod_time = self.index_current_mod_time()?;
        let index = Index::read(&self.dir)?;

        let mut state = self.state();
        state.index = index;
        if let Some(mt) = index_mod_time {
            state.conn_time = state.conn_time.max(mt);
        }
        debug!(keys = state.index.len(), "index reloaded on demand");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use lode_types::ContentHash;

    use super::*;

    fn make_store(dir: &Path) -> DirValueStore {
        DirValueStore::connect(dir, ".gob").unwrap()
    }

    /// Index with keys "1", "2", "3" created and last modified at 1, 2, 3.
    fn seed_timed_index(store: &DirValueStore) {
        let mut state = store.state();
        for t in 1..=3 {
            state.index.insert(
                t.to_string(),
                IndexEntry::new(ContentHash::from_digest([t as u8; 32]), t),
            );
        }
    }

    fn sorted(mut keys: Vec<String>) -> Vec<String> {
        keys.sort();
        keys
    }

    #[derive(Default)]
    struct CountingProgress {
        total: u64,
        done: u64,
    }

    impl ProgressSink for CountingProgress {
        fn total(&mut self, total: u64) {
            self.total = total;
        }

        fn increment(&mut self) {
            self.done += 1;
        }
    }

    #[test]
    fn connect_accepts_supported_extensions() {
        let dir = tempfile::tempdir().unwrap();
        for ext in [".json", ".gob", ".html", ".xml"] {
            let store = DirValueStore::connect(dir.path(), ext).unwrap();
            assert_eq!(store.ext().as_str(), ext);
        }
    }

    #[test]
    fn connect_rejects_unsupported_extensions() {
        let dir = tempfile::tempdir().unwrap();
        for ext in ["", ".txt", "json", "gob"] {
            let err = DirValueStore::connect(dir.path(), ext).unwrap_err();
            assert!(matches!(err, StoreError::UnsupportedExtension(e) if e == ext));
        }
    }

    #[test]
    fn absent_key_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(dir.path());
        assert!(!store.has("nope"));
        assert!(store.get("nope").unwrap().is_none());
        assert!(store.entry("nope").is_none());
    }

    #[test]
    fn set_has_get_cut() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(dir.path());

        store.set_bytes("y1", b"y1").unwrap();
        store.set_bytes("y2", b"y2").unwrap();
        assert!(store.has("y1"));
        assert_eq!(store.get("y1").unwrap().unwrap(), b"y1");
        assert_eq!(store.get("y2").unwrap().unwrap(), b"y2");
        assert!(store.get("y3").unwrap().is_none());
        assert_eq!(sorted(store.keys()), vec!["y1", "y2"]);

        assert!(store.cut("y1").unwrap());
        assert!(!store.has("y1"));
        assert!(!store.value_path("y1").exists());
        assert!(!store.cut("y1").unwrap());

        // the removal was persisted
        let reopened = make_store(dir.path());
        assert_eq!(reopened.keys(), vec!["y2"]);
    }

    #[test]
    fn set_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = make_store(&nested);
        store.set_bytes("k", b"v").unwrap();
        assert!(store.value_path("k").exists());
        assert!(store.index_path().exists());
    }

    #[test]
    fn keys_with_separators_are_escaped_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(dir.path());
        store.set_bytes("a/b c", b"v").unwrap();
        assert_eq!(store.value_path("a/b c"), dir.path().join("a%2Fb%20c.gob"));
        assert_eq!(store.get("a/b c").unwrap().unwrap(), b"v");
    }

    #[test]
    fn identical_content_is_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(dir.path());
        store.set_bytes("k", b"content").unwrap();
        let first = store.entry("k").unwrap();

        // Tamper with the file: if the second set wrote, it would restore it.
        fs::write(store.value_path("k"), b"tampered").unwrap();
        store.set_bytes("k", b"content").unwrap();

        assert_eq!(fs::read(store.value_path("k")).unwrap(), b"tampered");
        assert_eq!(store.entry("k").unwrap(), first);
    }

    #[test]
    fn changed_content_updates_modified_and_keeps_created() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(dir.path());
        store.set_bytes("k", b"A").unwrap();
        {
            // pretend the first write happened long ago
            let mut state = store.state();
            let hash = state.index.hash_of("k").unwrap();
            state.index.insert("k", IndexEntry::new(hash, 1));
        }

        store.set_bytes("k", b"B").unwrap();
        let entry = store.entry("k").unwrap();
        assert_eq!(entry.created, 1);
        assert!(entry.modified > 1);
        assert_eq!(entry.hash, ContentHasher::VALUE.hash(b"B"));
        assert_eq!(store.get("k").unwrap().unwrap(), b"B");
    }

    #[test]
    fn get_with_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(dir.path());
        store.set_bytes("k", b"v").unwrap();
        fs::remove_file(store.value_path("k")).unwrap();

        assert!(store.has("k"));
        assert!(store.get("k").unwrap().is_none());
    }

    #[test]
    fn cut_with_missing_file_is_a_consistency_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(dir.path());
        store.set_bytes("k", b"v").unwrap();
        fs::remove_file(store.value_path("k")).unwrap();

        let err = store.cut("k").unwrap_err();
        assert!(matches!(err, StoreError::MissingValueFile { key } if key == "k"));
        assert!(store.has("k"));
    }

    #[test]
    fn created_after_is_inclusive() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(dir.path());
        seed_timed_index(&store);

        assert_eq!(sorted(store.created_after(-1)), vec!["1", "2", "3"]);
        assert_eq!(sorted(store.created_after(2)), vec!["2", "3"]);
        assert_eq!(store.created_after(3), vec!["3"]);
        assert!(store.created_after(4).is_empty());
    }

    #[test]
    fn modified_after_strict_and_lenient() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(dir.path());
        seed_timed_index(&store);

        for since in -1..=4 {
            assert!(store.modified_after(since, true).is_empty());
            assert_eq!(
                sorted(store.modified_after(since, false)),
                sorted(store.created_after(since))
            );
        }
    }

    #[test]
    fn is_modified_after_is_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(dir.path());
        seed_timed_index(&store);

        assert!(store.is_modified_after("1", -1));
        assert!(store.is_modified_after("1", 0));
        assert!(!store.is_modified_after("1", 1));
        assert!(!store.is_modified_after("1", 2));
        assert!(store.is_modified_after("2", 1));
        assert!(!store.is_modified_after("2", 2));
    }

    #[test]
    fn mod_times_are_absent_until_written() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(dir.path());
        let start = now();

        assert_eq!(store.index_current_mod_time().unwrap(), None);
        assert_eq!(store.current_mod_time("test").unwrap(), None);

        store.set_bytes("test", b"test").unwrap();
        assert!(store.index_current_mod_time().unwrap().unwrap() >= start);
        assert!(store.current_mod_time("test").unwrap().unwrap() >= start);
        assert_eq!(store.current_mod_time("other").unwrap(), None);
    }

    #[test]
    fn index_refresh_reloads_only_when_stale() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(dir.path());
        seed_timed_index(&store);
        store.state().index.write(dir.path()).unwrap();

        // Forget the index and the sync time: refresh must reload.
        {
            let mut state = store.state();
            state.index = Index::new();
            state.conn_time = 0;
        }
        store.index_refresh().unwrap();
        assert_eq!(store.keys().len(), 3);
        assert!(store.state().conn_time > 0);

        // Forget the index but keep the sync time: nothing to reload.
        store.state().index = Index::new();
        store.index_refresh().unwrap();
        assert!(store.keys().is_empty());
    }

    #[test]
    fn index_refresh_sees_writes_from_another_handle() {
        let dir = tempfile::tempdir().unwrap();
        let reader = make_store(dir.path());
        let writer = make_store(dir.path());

        writer.set_bytes("x", b"from writer").unwrap();
        assert!(!reader.has("x"));

        // Both handles may share a second; make the reader older.
        reader.state().conn_time = 0;
        reader.index_refresh().unwrap();
        assert!(reader.has("x"));
        assert_eq!(reader.get("x").unwrap().unwrap(), b"from writer");
    }

    #[test]
    fn index_reload_sees_same_second_writes_from_another_handle() {
        let dir = tempfile::tempdir().unwrap();
        let reader = make_store(dir.path());
        let writer = make_store(dir.path());

        writer.set_bytes("x", b"from writer").unwrap();
        reader.index_reload().unwrap();
        assert!(reader.has("x"));
        assert_eq!(reader.get("x").unwrap().unwrap(), b"from writer");
    }

    #[test]
    fn index_reload_without_index_file_empties_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(dir.path());
        store.state().index.upsert("ghost", ContentHasher::VALUE.hash(b"g"), 1);
        store.index_reload().unwrap();
        assert!(store.keys().is_empty());
    }

    #[test]
    fn index_refresh_without_index_file_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(dir.path());
        store.index_refresh().unwrap();
        assert!(store.keys().is_empty());
    }

    #[test]
    fn vet_index_only_reports_and_fixes_orphans() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(dir.path());
        store.set_bytes("k1", b"one").unwrap();
        store.set_bytes("k2", b"two").unwrap();
        fs::remove_file(store.value_path("k2")).unwrap();

        let mut progress = CountingProgress::default();
        let orphans = store.vet_index_only(false, Some(&mut progress)).unwrap();
        assert_eq!(orphans, vec!["k2"]);
        assert!(store.has("k2"));
        assert_eq!((progress.total, progress.done), (2, 2));

        let orphans = store.vet_index_only(true, None).unwrap();
        assert_eq!(orphans, vec!["k2"]);
        assert!(!store.has("k2"));
        assert!(store.has("k1"));

        let reopened = make_store(dir.path());
        assert_eq!(reopened.keys(), vec!["k1"]);
    }

    #[test]
    fn vet_index_missing_reports_and_backfills() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(dir.path());
        store.set_bytes("known", b"known").unwrap();
        fs::write(dir.path().join("extra.gob"), b"extra content").unwrap();
        fs::write(dir.path().join("a%2Fb.gob"), b"escaped").unwrap();
        fs::write(dir.path().join("ignored.json"), b"other ext").unwrap();

        let mut progress = CountingProgress::default();
        let missing = store.vet_index_missing(false, Some(&mut progress)).unwrap();
        assert_eq!(sorted(missing), vec!["a/b", "extra"]);
        assert!(!store.has("extra"));
        assert_eq!((progress.total, progress.done), (3, 3));

        let missing = store.vet_index_missing(true, None).unwrap();
        assert_eq!(sorted(missing), vec!["a/b", "extra"]);
        assert_eq!(
            store.entry("extra").unwrap().hash,
            ContentHasher::VALUE.hash(b"extra content")
        );
        assert_eq!(store.get("a/b").unwrap().unwrap(), b"escaped");

        assert!(store.vet_index_missing(false, None).unwrap().is_empty());
    }

    #[test]
    fn vet_index_missing_skips_undecodable_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(dir.path());
        fs::write(dir.path().join("bad%zz.gob"), b"x").unwrap();
        assert!(store.vet_index_missing(true, None).unwrap().is_empty());
    }

    #[test]
    fn vet_on_missing_directory_finds_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(&dir.path().join("never-created"));
        assert!(store.vet_index_only(true, None).unwrap().is_empty());
        assert!(store.vet_index_missing(true, None).unwrap().is_empty());
    }

    #[test]
    fn concurrent_writers_keep_index_consistent() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(make_store(dir.path()));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for j in 0..10 {
                        let key = format!("t{i}-{j}");
                        store.set_bytes(&key, key.as_bytes()).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.keys().len(), 80);
        assert_eq!(make_store(dir.path()).keys().len(), 80);
        assert!(store.vet_index_only(false, None).unwrap().is_empty());
    }
}
