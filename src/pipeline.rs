//! Concurrency pipeline (`spec.md` §4.2, §5): a `rayon` worker pool parses
//! files in parallel, a single reducer thread folds results into the
//! [`SymbolGraph`]/[`Bm25Index`] in workspace-lexicographic order so output
//! is deterministic regardless of which worker finishes first, and every
//! stage checks `cancel` cooperatively before starting its next unit of
//! work.

use crate::config::Settings;
use crate::file_record::{CallSite, FileRecord, ParseFlag, RouteDecl};
use crate::graph::SymbolGraph;
use crate::hashing::hash_content;
use crate::manifest::{FileStatus, Manifest};
use crate::parsing::{Language, ParsedFile};
use crate::resolver::NameResolver;
use crate::search::Bm25Index;
use crate::symbol::SymbolRecord;
use crate::types::SymbolId;
use crate::walker::{FileWalker, WalkedFile};
use indexmap::{IndexMap, IndexSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One file's parse result, still attached to its identity — what crosses
/// the worker → reducer boundary. `bodies` holds the raw source text of
/// every symbol this unit parsed, for the `content.jsonl` lazy-body store
/// (`spec.md` §4.7); empty when the file was skipped (unchanged, cancelled,
/// non-UTF-8, or timed out) because nothing was re-parsed to extract from.
struct ParsedUnit {
    path: String,
    language: Language,
    content_hash: u64,
    parsed: ParsedFile,
    parse_flag: ParseFlag,
    bodies: Vec<(SymbolId, String)>,
}

/// Everything a completed scan produces, ready for [`crate::store::Store`]
/// to persist.
pub struct ScanOutput {
    pub manifest: Manifest,
    pub symbols: IndexMap<SymbolId, SymbolRecord>,
    pub graph: SymbolGraph,
    pub bm25: Bm25Index,
    pub file_records: IndexMap<String, FileRecord>,
    /// Every currently-live route declaration, already joined once here so
    /// [`crate::store::IndexDocument`] and [`crate::query::FlytoIndex::apis`]
    /// don't each recompute it from `file_records` independently.
    pub apis: Vec<RouteDecl>,
    pub calls: Vec<CallSite>,
    /// `id → source text` for the lazy-body store, carried forward from
    /// `previous_bodies` for files this scan didn't re-parse.
    pub symbol_bodies: IndexMap<SymbolId, String>,
    pub cancelled: bool,
}

/// Runs a full or incremental scan of `root` for `project`, reusing
/// `previous_manifest`/`previous_symbols`/`previous_graph`/`previous_bm25`
/// for files the manifest diff classifies as unchanged (`spec.md` §4.2).
#[allow(clippy::too_many_arguments)]
pub fn run_scan(
    settings: &Settings,
    project: &str,
    root: &Path,
    previous_manifest: &Manifest,
    previous_records: &IndexMap<String, FileRecord>,
    previous_bodies: &IndexMap<SymbolId, String>,
    mut symbols: IndexMap<SymbolId, SymbolRecord>,
    mut graph: SymbolGraph,
    mut bm25: Bm25Index,
    cancel: Arc<AtomicBool>,
) -> ScanOutput {
    let walker = FileWalker::new(Arc::new(settings.clone()));
    let walked = walker.walk(root, &cancel);

    if cancel.load(Ordering::Relaxed) {
        let (apis, calls) = routes_and_calls(previous_records);
        return ScanOutput {
            manifest: previous_manifest.clone(),
            symbols,
            graph,
            bm25,
            file_records: previous_records.clone(),
            apis,
            calls,
            symbol_bodies: previous_bodies.clone(),
            cancelled: true,
        };
    }

    let seen: IndexSet<String> = walked.iter().map(|w| relative_key(root, &w.path)).collect();
    let timeout = Duration::from_secs(settings.indexing.parse_timeout_secs);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(settings.indexing.parallel_threads.max(1))
        .build()
        .unwrap_or_else(|_| rayon::ThreadPoolBuilder::new().build().expect("fallback rayon pool"));

    // rayon's `par_iter().map().collect()` preserves input order, and
    // `walked` is already lexicographically sorted by the walker, so the
    // reducer below applies results deterministically without re-sorting.
    let units: Vec<Option<ParsedUnit>> = pool.install(|| {
        use rayon::prelude::*;
        walked
            .par_iter()
            .map(|file| {
                if cancel.load(Ordering::Relaxed) {
                    return None;
                }
                Some(parse_one(root, file, previous_manifest, timeout, &cancel))
            })
            .collect()
    });

    if cancel.load(Ordering::Relaxed) {
        let (apis, calls) = routes_and_calls(previous_records);
        return ScanOutput {
            manifest: previous_manifest.clone(),
            symbols,
            graph,
            bm25,
            file_records: previous_records.clone(),
            apis,
            calls,
            symbol_bodies: previous_bodies.clone(),
            cancelled: true,
        };
    }

    let mut resolver = NameResolver::new();
    let known_files: Vec<String> = seen.iter().cloned().collect();
    resolver.set_known_files(known_files.clone());

    let mut manifest = Manifest::new();
    let mut file_records: IndexMap<String, FileRecord> = IndexMap::new();
    let mut symbol_bodies = previous_bodies.clone();

    // Pass 1: reduce unchanged files from the previous run, then apply
    // fresh parse units, populating symbol/import indices before any
    // cross-file reference resolution runs.
    for unit in units.iter().flatten() {
        if let Some(previous) = previous_records.get(&unit.path) {
            if previous.content_hash == unit.content_hash {
                reuse_previous_file(previous, &symbols, &mut resolver);
                manifest.record(unit.path.clone(), unit.content_hash, 0);
                file_records.insert(unit.path.clone(), previous.clone());
                continue;
            }
        }

        let mut record = FileRecord::new(unit.path.clone(), project, unit.language.config_key(), unit.content_hash);
        record.parse_flag = unit.parse_flag;
        record.imports = unit.parsed.imports.clone();
        record.defined_routes = unit.parsed.routes.clone();
        record.outbound_calls = unit.parsed.calls.clone();
        record.unhandled_constructs = unit.parsed.unhandled_constructs.clone();

        for symbol in &unit.parsed.symbols {
            let body_unchanged = symbols.get(&symbol.id).is_some_and(|previous| previous.body_hash == symbol.body_hash);
            if !body_unchanged {
                if symbols.contains_key(&symbol.id) {
                    bm25.remove_symbol(&symbol.id);
                    graph.remove_edges_from(&symbol.id);
                }
                bm25.index_symbol(symbol);
                symbols.insert(symbol.id.clone(), symbol.clone());
            }
            // Always re-index into the resolver: it's rebuilt fresh every
            // scan, so even a symbol whose body didn't change still needs
            // its name registered for this run's reference resolution.
            resolver.index_symbol(&symbol.id, symbol.kind, symbol.exports);
            record.symbols.push(symbol.id.clone());
        }
        for (symbol_id, body) in &unit.bodies {
            symbol_bodies.insert(symbol_id.clone(), body.clone());
        }
        resolver.set_imports(unit.path.clone(), unit.parsed.imports.clone());
        manifest.record(unit.path.clone(), unit.content_hash, 0);
        file_records.insert(unit.path.clone(), record);
    }

    // Deleted files: purge their symbols from every index before resolving
    // references, so a renamed symbol's old id never wins a tie-break.
    for deleted in previous_manifest.deleted_paths(&seen) {
        if let Some(record) = previous_records.get(deleted) {
            for symbol_id in &record.symbols {
                symbols.shift_remove(symbol_id);
                graph.remove_symbol(symbol_id);
                bm25.remove_symbol(symbol_id);
                resolver.deindex_symbol(symbol_id);
                symbol_bodies.shift_remove(symbol_id);
            }
        }
        resolver.remove_file(deleted);
    }

    // Pass 2: resolve every symbol's refs_out now that the full symbol
    // table for this scan is known. Walked over every file still present
    // this scan (not just freshly-parsed ones) so a rename in one file
    // still invalidates a caller's edge in an unchanged file.
    for record in file_records.values() {
        for symbol_id in &record.symbols {
            let Some(symbol) = symbols.get(symbol_id) else { continue };
            let refs_out = symbol.refs_out.clone();
            graph.remove_edges_from(symbol_id);
            resolver.resolve_refs(&mut graph, symbol_id, &refs_out);
        }
    }

    let (routes, calls) = routes_and_calls(&file_records);
    let (_, api_edges) = crate::api_resolver::resolve_apis(&routes, &calls);
    for edge in api_edges {
        graph.add_edge(edge);
    }

    ScanOutput { manifest, symbols, graph, bm25, file_records, apis: routes, calls, symbol_bodies, cancelled: false }
}

fn reuse_previous_file(previous: &FileRecord, symbols: &IndexMap<SymbolId, SymbolRecord>, resolver: &mut NameResolver) {
    resolver.set_imports(previous.path.clone(), previous.imports.clone());
    for symbol_id in &previous.symbols {
        if let Some(symbol) = symbols.get(symbol_id) {
            resolver.index_symbol(symbol_id, symbol.kind, symbol.exports);
        }
    }
}

/// Every currently-live route declaration and call site, flattened out of
/// `records` — the one place both the API-edge derivation and the
/// persisted `index.json` `apis`/`calls` arrays source their data from.
fn routes_and_calls(records: &IndexMap<String, FileRecord>) -> (Vec<RouteDecl>, Vec<CallSite>) {
    let routes = records.values().flat_map(|r| r.defined_routes.clone()).collect();
    let calls = records.values().flat_map(|r| r.outbound_calls.clone()).collect();
    (routes, calls)
}

fn relative_key(root: &Path, path: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).to_string_lossy().replace('\\', "/")
}

/// Parses one file with a hard wall-clock timeout. The parse runs on a
/// detached worker thread so a pathological input (e.g. a tree-sitter
/// parser stuck on adversarial input) can't block the reducer forever; if
/// the timeout elapses the detached thread is abandoned and its eventual
/// result discarded; the unit is recorded with [`ParseFlag::Timeout`].
fn parse_one(root: &Path, file: &WalkedFile, previous_manifest: &Manifest, timeout: Duration, cancel: &Arc<AtomicBool>) -> ParsedUnit {
    let path_key = relative_key(root, &file.path);

    if cancel.load(Ordering::Relaxed) {
        return ParsedUnit {
            path: path_key,
            language: file.language,
            content_hash: 0,
            parsed: ParsedFile::default(),
            parse_flag: ParseFlag::Ok,
            bodies: Vec::new(),
        };
    }

    let bytes = match std::fs::read(&file.path) {
        Ok(b) => b,
        Err(_) => {
            return ParsedUnit {
                path: path_key,
                language: file.language,
                content_hash: 0,
                parsed: ParsedFile::default(),
                parse_flag: ParseFlag::NonUtf8,
                bodies: Vec::new(),
            }
        }
    };
    let content_hash = hash_content(&bytes);

    if let Some(entry) = previous_manifest.files.get(&path_key) {
        if entry.content_hash == content_hash {
            // Unchanged by hash: caller's reuse path in `run_scan` still
            // needs the hash and flag, but skips re-parsing entirely.
            return ParsedUnit {
                path: path_key,
                language: file.language,
                content_hash,
                parsed: ParsedFile::default(),
                parse_flag: ParseFlag::Ok,
                bodies: Vec::new(),
            };
        }
    }

    let source = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(_) => {
            return ParsedUnit {
                path: path_key,
                language: file.language,
                content_hash,
                parsed: ParsedFile::default(),
                parse_flag: ParseFlag::NonUtf8,
                bodies: Vec::new(),
            }
        }
    };

    let source_for_bodies = source.clone();
    let (parsed, parse_flag) = parse_with_timeout(file.language, path_key.clone(), source, timeout);
    let bodies = parsed.symbols.iter().map(|s| (s.id.clone(), extract_body(&source_for_bodies, s.span))).collect();
    ParsedUnit { path: path_key, language: file.language, content_hash, parsed, parse_flag, bodies }
}

/// Slices `source`'s 1-based, inclusive `span` out as a `String` — the raw
/// body text persisted to `content.jsonl` for lazy retrieval (`spec.md`
/// §4.7). Out-of-range lines (shouldn't happen; a parser-produced span is
/// always within the source it was derived from) yield an empty string
/// rather than panicking.
fn extract_body(source: &str, span: crate::types::Span) -> String {
    let start = span.start_line.saturating_sub(1) as usize;
    let end = span.end_line as usize;
    source.lines().skip(start).take(end.saturating_sub(start)).collect::<Vec<_>>().join("\n")
}

fn parse_with_timeout(language: Language, path: String, source: String, timeout: Duration) -> (ParsedFile, ParseFlag) {
    let (tx, rx) = crossbeam_channel::bounded(1);
    std::thread::spawn(move || {
        let mut parser = language.new_parser();
        let result = parser.parse("", &path, &source);
        let _ = tx.send(result);
    });

    match rx.recv_timeout(timeout) {
        Ok(parsed) => (parsed, ParseFlag::Ok),
        Err(_) => (ParsedFile::default(), ParseFlag::Timeout),
    }
}

impl Manifest {
    /// Classifies `path` against `fresh_hash` using the status classes a
    /// caller outside this module (e.g. a CLI progress reporter) cares
    /// about, without exposing manifest internals.
    pub fn status_of(&self, path: &str, fresh_hash: u64) -> FileStatus {
        self.classify(path, fresh_hash)
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
    fn fresh_scan_indexes_every_symbol() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.py"), "def handler():\n    pass\n").unwrap();

        let output = run_scan(
            &settings(),
            "web",
            dir.path(),
            &Manifest::new(),
            &IndexMap::new(),
            &IndexMap::new(),
            IndexMap::new(),
            SymbolGraph::new(),
            Bm25Index::new(),
            Arc::new(AtomicBool::new(false)),
        );

        assert!(!output.cancelled);
        assert_eq!(output.manifest.files.len(), 1);
        assert!(output.symbols.values().any(|s| s.id.name == "handler"));
        let handler_id = output.symbols.values().find(|s| s.id.name == "handler").unwrap().id.clone();
        assert_eq!(output.symbol_bodies.get(&handler_id).map(String::as_str), Some("def handler():\n    pass"));
    }

    #[test]
    fn unchanged_file_is_not_reparsed_on_second_scan() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.py"), "def handler():\n    pass\n").unwrap();

        let first = run_scan(
            &settings(),
            "web",
            dir.path(),
            &Manifest::new(),
            &IndexMap::new(),
            &IndexMap::new(),
            IndexMap::new(),
            SymbolGraph::new(),
            Bm25Index::new(),
            Arc::new(AtomicBool::new(false)),
        );

        let second = run_scan(
            &settings(),
            "web",
            dir.path(),
            &first.manifest,
            &first.file_records,
            &first.symbol_bodies,
            first.symbols,
            first.graph,
            first.bm25,
            Arc::new(AtomicBool::new(false)),
        );

        assert_eq!(second.manifest.files["a.py"].content_hash, first.manifest.files["a.py"].content_hash);
        assert_eq!(second.symbols.len(), 1);
        assert_eq!(second.symbol_bodies.len(), 1, "unchanged file's body should be carried forward, not dropped");
    }

    #[test]
    fn cancelled_before_start_returns_previous_state_untouched() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.py"), "def f(): pass").unwrap();
        let cancel = Arc::new(AtomicBool::new(true));

        let output = run_scan(
            &settings(),
            "web",
            dir.path(),
            &Manifest::new(),
            &IndexMap::new(),
            &IndexMap::new(),
            IndexMap::new(),
            SymbolGraph::new(),
            Bm25Index::new(),
            cancel,
        );

        assert!(output.cancelled);
        assert!(output.manifest.files.is_empty());
    }

    #[test]
    fn deleted_file_purges_its_symbols() {
        let dir = TempDir::new().unwrap();
        let file_path = dir.path().join("a.py");
        fs::write(&file_path, "def handler():\n    pass\n").unwrap();

        let first = run_scan(
            &settings(),
            "web",
            dir.path(),
            &Manifest::new(),
            &IndexMap::new(),
            &IndexMap::new(),
            IndexMap::new(),
            SymbolGraph::new(),
            Bm25Index::new(),
            Arc::new(AtomicBool::new(false)),
        );
        assert_eq!(first.symbols.len(), 1);

        fs::remove_file(&file_path).unwrap();
        let second = run_scan(
            &settings(),
            "web",
            dir.path(),
            &first.manifest,
            &first.file_records,
            &first.symbol_bodies,
            first.symbols,
            first.graph,
            first.bm25,
            Arc::new(AtomicBool::new(false)),
        );

        assert!(second.symbols.is_empty());
        assert!(second.manifest.files.is_empty());
        assert!(second.symbol_bodies.is_empty(), "deleted file's symbol bodies must be purged too");
    }
}
