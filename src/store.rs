//! Persistent Store (`spec.md` §4.7): the on-disk `.flyto-index/` layout and
//! its atomic write discipline. A reader never observes a half-written
//! file — every write goes to a `.tmp` sibling, is fsynced, then renamed
//! onto the target — and a missing or stale file is always a valid state
//! (falls back to "nothing indexed yet"), but a partially-written one never
//! is.

use crate::error::{IndexError, IndexResult};
use crate::file_record::{CallSite, FileRecord, RouteDecl};
use crate::graph::SymbolGraph;
use crate::manifest::Manifest;
use crate::project::{Project, ProjectSummary};
use crate::search::Bm25Index;
use crate::symbol::SymbolRecord;
use crate::types::SymbolId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

const MANIFEST_FILE: &str = "manifest.json";
const INDEX_FILE: &str = "index.json";
const CONTENT_FILE: &str = "content.jsonl";
const BM25_FILE: &str = "bm25.json";
const PROJECT_MAP_FILE: &str = "project_map.json";
const LOCK_FILE: &str = "index.lock";

/// One `content.jsonl` line: a symbol's raw source text, persisted
/// separately from `index.json` for lazy retrieval (`spec.md` §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolBody {
    pub id: SymbolId,
    pub body: String,
}

/// The persisted form of `index.json` (`spec.md` §6): every top-level key
/// the schema names — `projects`, `symbols`, `edges`/`reverse`/`unresolved`
/// (flattened in from [`SymbolGraph`]), `apis`, `calls`, `version` — plus
/// `file_records`, an additional key this crate relies on for `file_info`
/// and `apis()` lookups that old readers are free to ignore per the
/// schema's forward-compatibility rule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexDocument {
    pub projects: Vec<ProjectSummary>,
    pub symbols: IndexMap<SymbolId, SymbolRecord>,
    #[serde(flatten)]
    pub graph: SymbolGraph,
    pub apis: Vec<RouteDecl>,
    pub calls: Vec<CallSite>,
    pub version: String,
    pub file_records: IndexMap<String, FileRecord>,
}

/// `project → Project` as maintained by the external collaborator that owns
/// workspace/project discovery; the core only reads this file, it never
/// writes it (`spec.md` §4.7, ambient ownership note).
pub type ProjectMap = IndexMap<String, Project>;

/// Owns the `.flyto-index/` directory for one workspace root.
pub struct Store {
    root: PathBuf,
}

impl Store {
    pub fn new(index_dir: impl Into<PathBuf>) -> Self {
        Self { root: index_dir.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Acquires the run lock by atomically creating `index.lock`. Returns
    /// [`IndexError::LockContention`] if another process already holds it.
    /// The returned [`StoreLock`] removes the file on drop.
    pub fn lock(&self) -> IndexResult<StoreLock> {
        fs::create_dir_all(&self.root).map_err(|source| IndexError::IoWrite { path: self.root.clone(), source })?;
        let lock_path = self.root.join(LOCK_FILE);
        match File::options().write(true).create_new(true).open(&lock_path) {
            Ok(mut file) => {
                let _ = write!(file, "{}", std::process::id());
                Ok(StoreLock { path: lock_path })
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(IndexError::LockContention { index_dir: self.root.clone() })
            }
            Err(source) => Err(IndexError::IoWrite { path: lock_path, source }),
        }
    }

    pub fn load_manifest(&self) -> Manifest {
        self.read_json_tolerant(MANIFEST_FILE).unwrap_or_default()
    }

    pub fn save_manifest(&self, manifest: &Manifest) -> IndexResult<()> {
        self.write_json(MANIFEST_FILE, manifest)
    }

    pub fn load_index(&self) -> IndexDocument {
        self.read_json_tolerant(INDEX_FILE).unwrap_or_default()
    }

    pub fn save_index(&self, document: &IndexDocument) -> IndexResult<()> {
        self.write_json(INDEX_FILE, document)
    }

    pub fn load_bm25(&self) -> Bm25Index {
        self.read_json_tolerant(BM25_FILE).unwrap_or_default()
    }

    pub fn save_bm25(&self, index: &Bm25Index) -> IndexResult<()> {
        self.write_json(BM25_FILE, index)
    }

    /// `project_map.json` is owned by an external collaborator; the core
    /// only ever reads it, tolerating absence as "no project metadata yet".
    pub fn load_project_map(&self) -> ProjectMap {
        self.read_json_tolerant(PROJECT_MAP_FILE).unwrap_or_default()
    }

    /// Appends one [`SymbolBody`] per line to `content.jsonl`, keyed by
    /// [`SymbolId`] per `spec.md` §4.7's `{id, body}` schema. Incremental
    /// runs append; a full reindex calls [`Store::compact_symbol_bodies`]
    /// to drop stale/superseded entries.
    pub fn append_symbol_body(&self, id: &SymbolId, body: &str) -> IndexResult<()> {
        fs::create_dir_all(&self.root).map_err(|source| IndexError::IoWrite { path: self.root.clone(), source })?;
        let path = self.root.join(CONTENT_FILE);
        let mut file = File::options()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| IndexError::IoWrite { path: path.clone(), source })?;
        let line = serde_json::to_string(&SymbolBody { id: id.clone(), body: body.to_string() })?;
        writeln!(file, "{line}").map_err(|source| IndexError::IoWrite { path, source })?;
        Ok(())
    }

    /// Rewrites `content.jsonl` to contain exactly `bodies`, dropping
    /// entries for deleted symbols and superseded body revisions
    /// accumulated by incremental appends. Uses the same tmp+rename
    /// discipline as [`Store::write_json`].
    pub fn compact_symbol_bodies(&self, bodies: &IndexMap<SymbolId, String>) -> IndexResult<()> {
        let mut out = String::new();
        for (id, body) in bodies {
            out.push_str(&serde_json::to_string(&SymbolBody { id: id.clone(), body: body.clone() })?);
            out.push('\n');
        }
        self.write_atomic(CONTENT_FILE, out.as_bytes())
    }

    /// Reads `content.jsonl` into `id → body`, keeping the last occurrence
    /// of each symbol (later appends supersede earlier ones). Malformed
    /// trailing lines (e.g. from a crash mid-append) are skipped rather
    /// than failing the whole read — the file is append-only, so a partial
    /// last line never invalidates the records before it.
    pub fn load_symbol_bodies(&self) -> IndexMap<SymbolId, String> {
        let path = self.root.join(CONTENT_FILE);
        let Ok(text) = fs::read_to_string(&path) else { return IndexMap::new() };
        let mut out = IndexMap::new();
        for line in text.lines() {
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(entry) = serde_json::from_str::<SymbolBody>(line) {
                out.insert(entry.id, entry.body);
            }
        }
        out
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> IndexResult<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_atomic(name, &bytes)
    }

    fn write_atomic(&self, name: &str, bytes: &[u8]) -> IndexResult<()> {
        fs::create_dir_all(&self.root).map_err(|source| IndexError::IoWrite { path: self.root.clone(), source })?;
        let target = self.root.join(name);
        let tmp = self.root.join(format!("{name}.tmp"));
        let mut file = File::create(&tmp).map_err(|source| IndexError::IoWrite { path: tmp.clone(), source })?;
        file.write_all(bytes).map_err(|source| IndexError::IoWrite { path: tmp.clone(), source })?;
        file.sync_all().map_err(|source| IndexError::IoWrite { path: tmp.clone(), source })?;
        fs::rename(&tmp, &target).map_err(|source| IndexError::IoWrite { path: target, source })?;
        Ok(())
    }

    /// Reads and parses `name`, treating both "file absent" and "file
    /// fails to parse" as `None` rather than an error — a stale or missing
    /// cache is a valid state the caller falls back from, never a reason to
    /// abort (`spec.md` §4.7).
    fn read_json_tolerant<T: for<'de> Deserialize<'de>>(&self, name: &str) -> Option<T> {
        let bytes = fs::read(self.root.join(name)).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

/// RAII guard for the `index.lock` file; removed on drop so a crashed
/// process doesn't wedge every future run (the operator can also remove it
/// manually, per [`IndexError::recovery_suggestions`]).
pub struct StoreLock {
    path: PathBuf,
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Span, SymbolKind};
    use tempfile::TempDir;

    fn sample_record() -> SymbolRecord {
        let id = SymbolId::new("web", "a.py", SymbolKind::Function, "foo");
        SymbolRecord::new(id, SymbolKind::Function, Span::new(1, 2), 0)
    }

    #[test]
    fn manifest_round_trips_through_atomic_write() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path().join(".flyto-index"));
        let mut manifest = Manifest::new();
        manifest.record("a.py", 42, 0);
        store.save_manifest(&manifest).unwrap();

        let reloaded = store.load_manifest();
        assert_eq!(reloaded.files["a.py"].content_hash, 42);
    }

    #[test]
    fn missing_files_are_tolerated_as_empty_defaults() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path().join(".flyto-index"));
        assert!(store.load_manifest().files.is_empty());
        assert!(store.load_index().symbols.is_empty());
        assert!(store.load_project_map().is_empty());
    }

    #[test]
    fn corrupted_file_falls_back_to_default_rather_than_erroring() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path().join(".flyto-index"));
        fs::create_dir_all(store.path()).unwrap();
        fs::write(store.path().join(MANIFEST_FILE), b"not json").unwrap();
        assert!(store.load_manifest().files.is_empty());
    }

    #[test]
    fn lock_refuses_second_acquisition_until_dropped() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path().join(".flyto-index"));
        let guard = store.lock().unwrap();
        assert!(matches!(store.lock(), Err(IndexError::LockContention { .. })));
        drop(guard);
        assert!(store.lock().is_ok());
    }

    #[test]
    fn content_log_keeps_last_occurrence_per_symbol() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path().join(".flyto-index"));
        let id = sample_record().id;
        store.append_symbol_body(&id, "def foo():\n    pass").unwrap();
        store.append_symbol_body(&id, "def foo():\n    return 1").unwrap();

        let loaded = store.load_symbol_bodies();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[&id], "def foo():\n    return 1");
    }

    #[test]
    fn compact_rewrites_content_to_exactly_the_given_bodies() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path().join(".flyto-index"));
        let stale_id = SymbolId::new("web", "stale.py", SymbolKind::Function, "gone");
        store.append_symbol_body(&stale_id, "def gone(): pass").unwrap();

        let id = sample_record().id;
        let mut fresh = IndexMap::new();
        fresh.insert(id.clone(), "def foo():\n    pass".to_string());
        store.compact_symbol_bodies(&fresh).unwrap();

        let loaded = store.load_symbol_bodies();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains_key(&id));
    }

    #[test]
    fn index_document_round_trips_every_top_level_schema_key() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path().join(".flyto-index"));
        let document = IndexDocument {
            projects: vec![ProjectSummary { name: "web".to_string(), root: PathBuf::from("/tmp/web"), language_counts: Default::default() }],
            symbols: IndexMap::new(),
            graph: SymbolGraph::new(),
            apis: Vec::new(),
            calls: Vec::new(),
            version: "0.1.0".to_string(),
            file_records: IndexMap::new(),
        };
        store.save_index(&document).unwrap();

        let raw = fs::read_to_string(store.path().join(INDEX_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        for key in ["projects", "symbols", "edges", "reverse", "unresolved", "apis", "calls", "version"] {
            assert!(value.get(key).is_some(), "index.json missing top-level key `{key}`");
        }

        let reloaded = store.load_index();
        assert_eq!(reloaded.version, "0.1.0");
        assert_eq!(reloaded.projects.len(), 1);
    }
}
