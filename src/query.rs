//! External query surface (`spec.md` §6): the only methods an MCP/HTTP
//! layer or CLI driver built outside this crate is expected to call.
//! `FlytoIndex` owns one workspace's live index generation and exposes
//! read-only queries plus `reindex()`; this crate never calls
//! `std::process::exit` itself, only defines the [`ExitCode`] an external
//! driver maps onto it.

use crate::config::Settings;
use crate::error::{IndexError, IndexResult};
use crate::file_record::{CallSite, FileRecord, ParseFlag, RouteDecl};
use crate::graph::SymbolGraph;
use crate::pipeline::run_scan;
use crate::project::ProjectSummary;
use crate::search::{Bm25Index, SearchHit};
use crate::session::SessionTracker;
use crate::store::{IndexDocument, Store};
use crate::symbol::SymbolRecord;
use crate::types::{Confidence, SymbolId};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Maps 1:1 onto `spec.md` §6's exit code table; this crate only
/// constructs values, an external driver converts them to a process exit
/// status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    UsageError = 1,
    IndexLocked = 2,
    PartialParse = 3,
    IoFailure = 4,
    InvariantFailure = 5,
}

impl From<&IndexError> for ExitCode {
    fn from(err: &IndexError) -> Self {
        match err {
            IndexError::LockContention { .. } => ExitCode::IndexLocked,
            IndexError::InvariantViolation { .. } => ExitCode::InvariantFailure,
            IndexError::Io { .. } | IndexError::IoWrite { .. } | IndexError::Corrupted { .. } => ExitCode::IoFailure,
            IndexError::Serialization(_) | IndexError::MalformedSymbolId(_) | IndexError::Config(_) => ExitCode::UsageError,
            IndexError::Search { .. } | IndexError::SymbolNotFound(_) => ExitCode::UsageError,
        }
    }
}

/// `impact`/`references` results attach a confidence to each hop so a
/// caller can distinguish an `Exact` reverse edge from a `Heuristic` one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpactNode {
    pub symbol: SymbolId,
    pub depth: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceHit {
    pub from: SymbolId,
    pub kind: crate::types::EdgeKind,
    pub confidence: Confidence,
}

#[derive(Debug, Clone)]
pub struct ApiSummary {
    pub route: RouteDecl,
    pub callers: Vec<CallSite>,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReindexSummary {
    pub added: usize,
    pub modified: usize,
    pub deleted: usize,
    pub duration_ms: u64,
    /// Files this scan recorded with a non-`Ok` [`ParseFlag`] (non-UTF-8 or
    /// timed-out parse). A non-zero count is the aggregate signal an
    /// external driver maps onto [`ExitCode::PartialParse`] (`spec.md`
    /// §6's exit code 3) — `reindex()` itself never returns an `Err` for
    /// this, since per-file parse failure is data, not a run-aborting
    /// error (`spec.md` §7).
    pub partial_parses: usize,
}

struct Generation {
    symbols: IndexMap<SymbolId, SymbolRecord>,
    graph: SymbolGraph,
    bm25: Bm25Index,
    file_records: IndexMap<String, FileRecord>,
}

/// One workspace's live index handle. Query methods read an `Arc`-cloned
/// snapshot of the current generation under a read lock, so a concurrent
/// `reindex()` never blocks a reader and never mutates the structure a
/// reader is iterating (`spec.md` §5).
pub struct FlytoIndex {
    settings: Settings,
    project: String,
    root: PathBuf,
    store: Store,
    generation: RwLock<Arc<Generation>>,
    session: SessionTracker,
    cancel: Arc<AtomicBool>,
}

impl FlytoIndex {
    /// Opens (or creates) the index for `root`, loading whatever
    /// `.flyto-index/` state already exists — a fresh workspace starts
    /// from empty defaults rather than failing.
    pub fn open(settings: Settings, project: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let store = Store::new(root.join(&settings.index_dir));
        let document: IndexDocument = store.load_index();
        let bm25 = store.load_bm25();
        let session = SessionTracker::load(&store.path().join("session.json"), settings.session.capacity);

        Self {
            project: project.into(),
            root,
            store,
            generation: RwLock::new(Arc::new(Generation {
                symbols: document.symbols,
                graph: document.graph,
                bm25,
                file_records: document.file_records,
            })),
            session,
            cancel: Arc::new(AtomicBool::new(false)),
            settings,
        }
    }

    /// Cooperative cancellation: the next checked point in the running
    /// scan (file emission, parse start, or reduce start) observes this
    /// and stops without writing a partial result.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    pub fn session(&self) -> &SessionTracker {
        &self.session
    }

    /// Reverse-closure of `symbol_id` up to `depth` hops (default 2),
    /// grouped by traversal order found (`spec.md` §6).
    pub fn impact(&self, symbol_id: &SymbolId, depth: Option<usize>) -> Vec<ImpactNode> {
        let generation = self.generation.read().clone();
        generation
            .graph
            .impact(symbol_id, depth.unwrap_or(2))
            .into_iter()
            .map(|(symbol, depth)| ImpactNode { symbol, depth })
            .collect()
    }

    /// Every reverse edge into `symbol_id`, with `(file, line,
    /// containing_symbol, confidence)` available via the caller's own
    /// `file_info` lookup on `from.path` (`spec.md` §6).
    pub fn references(&self, symbol_id: &SymbolId) -> Vec<ReferenceHit> {
        let generation = self.generation.read().clone();
        generation
            .graph
            .references(symbol_id)
            .into_iter()
            .map(|edge| ReferenceHit { from: edge.from.clone(), kind: edge.kind, confidence: edge.confidence })
            .collect()
    }

    /// Ranked BM25 + session-boosted hits for `query`, capped at `max`.
    pub fn search(&self, query: &str, max: usize) -> Vec<SearchHit> {
        let generation = self.generation.read().clone();
        self.session.record_searched(query);
        let path_by_symbol: IndexMap<SymbolId, String> =
            generation.symbols.keys().map(|id| (id.clone(), id.path.clone())).collect();
        generation.bm25.search(query, max, Some((&self.session, &path_by_symbol)))
    }

    pub fn file_info(&self, path: &str) -> Option<FileRecord> {
        let generation = self.generation.read().clone();
        generation.file_records.get(path).cloned()
    }

    /// Every known route with its joined callers (`spec.md` §6).
    pub fn apis(&self) -> Vec<ApiSummary> {
        let generation = self.generation.read().clone();
        let routes: Vec<RouteDecl> = generation.file_records.values().flat_map(|r| r.defined_routes.clone()).collect();
        let calls: Vec<CallSite> = generation.file_records.values().flat_map(|r| r.outbound_calls.clone()).collect();
        let (joins, _) = crate::api_resolver::resolve_apis(&routes, &calls);
        joins.into_iter().map(|j| ApiSummary { route: j.route, callers: j.callers, confidence: j.confidence }).collect()
    }

    /// Runs a scan (full or incremental depending on the manifest diff),
    /// swaps in the new generation, persists every on-disk artifact
    /// atomically, and returns a summary (`spec.md` §6). Acquires the
    /// store's run lock for the duration; returns
    /// [`IndexError::LockContention`] if another process holds it.
    pub fn reindex(&self) -> IndexResult<ReindexSummary> {
        let start = std::time::Instant::now();
        let _lock = self.store.lock()?;

        let previous_manifest = self.store.load_manifest();
        let previous_generation = self.generation.read().clone();
        let previous_bodies = self.store.load_symbol_bodies();

        let output = run_scan(
            &self.settings,
            &self.project,
            &self.root,
            &previous_manifest,
            &previous_generation.file_records,
            &previous_bodies,
            previous_generation.symbols.clone(),
            previous_generation.graph.clone(),
            previous_generation.bm25.clone(),
            self.cancel.clone(),
        );

        if output.cancelled {
            return Ok(ReindexSummary { duration_ms: start.elapsed().as_millis() as u64, ..Default::default() });
        }

        let added = output.manifest.files.keys().filter(|p| !previous_manifest.files.contains_key(p.as_str())).count();
        let deleted = previous_manifest
            .files
            .keys()
            .filter(|p| !output.manifest.files.contains_key(p.as_str()))
            .count();
        let modified = output
            .manifest
            .files
            .iter()
            .filter(|(path, entry)| {
                previous_manifest.files.get(path.as_str()).is_some_and(|prev| prev.content_hash != entry.content_hash)
            })
            .count();

        let mut language_counts: HashMap<String, usize> = HashMap::new();
        for record in output.file_records.values() {
            *language_counts.entry(record.language.clone()).or_insert(0) += 1;
        }
        let projects = vec![ProjectSummary { name: self.project.clone(), root: self.root.clone(), language_counts }];
        let partial_parses = output.file_records.values().filter(|r| r.parse_flag != ParseFlag::Ok).count();

        self.store.save_manifest(&output.manifest)?;
        self.store.save_index(&IndexDocument {
            projects,
            symbols: output.symbols.clone(),
            graph: output.graph.clone(),
            apis: output.apis.clone(),
            calls: output.calls.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            file_records: output.file_records.clone(),
        })?;
        self.store.save_bm25(&output.bm25)?;
        self.store.compact_symbol_bodies(&output.symbol_bodies)?;

        *self.generation.write() = Arc::new(Generation {
            symbols: output.symbols,
            graph: output.graph,
            bm25: output.bm25,
            file_records: output.file_records,
        });

        Ok(ReindexSummary { added, modified, deleted, duration_ms: start.elapsed().as_millis() as u64, partial_parses })
    }

    pub fn flush_session_if_due(&self) -> std::io::Result<()> {
        if self.session.should_flush() {
            self.session.flush(&self.store.path().join("session.json"))?;
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn settings() -> Settings {
        let mut s = Settings::default();
        s.indexing.parallel_threads = 2;
        s
    }

    #[test]
    fn reindex_then_impact_finds_caller() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.py"), "def g():\n    pass\n\ndef f():\n    g()\n").unwrap();

        let index = FlytoIndex::open(settings(), "web", dir.path());
        let summary = index.reindex().unwrap();
        assert_eq!(summary.added, 1);

        let g_id = SymbolId::new("web", "a.py", crate::types::SymbolKind::Function, "g");
        let impact = index.impact(&g_id, Some(2));
        assert!(impact.iter().any(|n| n.symbol.name == "f"));
    }

    #[test]
    fn second_reindex_with_no_changes_reports_zero_added_modified_deleted() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.py"), "def f(): pass").unwrap();

        let index = FlytoIndex::open(settings(), "web", dir.path());
        index.reindex().unwrap();
        let second = index.reindex().unwrap();

        assert_eq!(second.added, 0);
        assert_eq!(second.modified, 0);
        assert_eq!(second.deleted, 0);
    }

    #[test]
    fn search_after_reindex_finds_matching_symbol() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("auth.py"), "def authenticate_user():\n    pass\n").unwrap();

        let index = FlytoIndex::open(settings(), "web", dir.path());
        index.reindex().unwrap();

        let hits = index.search("auth", 5);
        assert!(hits.iter().any(|h| h.symbol.name == "authenticate_user"));
    }

    #[test]
    fn exit_code_maps_lock_contention() {
        let err = IndexError::LockContention { index_dir: PathBuf::from(".flyto-index") };
        assert_eq!(ExitCode::from(&err), ExitCode::IndexLocked);
    }
}
