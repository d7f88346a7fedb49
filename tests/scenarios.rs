//! End-to-end scenario tests spanning multiple modules, placed here rather
//! than as `#[cfg(test)]` units because each one exercises the walker,
//! parsers, resolver, graph, and store together.

use flyto_index::config::Settings;
use flyto_index::query::FlytoIndex;
use flyto_index::types::{SymbolId, SymbolKind};
use std::fs;
use std::sync::atomic::Ordering;
use tempfile::TempDir;

fn settings() -> Settings {
    let mut s = Settings::default();
    s.indexing.parallel_threads = 2;
    s
}

#[test]
fn rename_detection_removes_edge_and_purges_reverse_index() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("backend")).unwrap();
    fs::write(dir.path().join("backend/a.py"), "def foo():\n    pass\n").unwrap();
    fs::write(dir.path().join("backend/b.py"), "from a import foo\n\ndef main():\n    foo()\n").unwrap();

    let index = FlytoIndex::open(settings(), "backend", dir.path());
    index.reindex().unwrap();

    let foo_id = SymbolId::new("backend", "backend/a.py", SymbolKind::Function, "foo");
    let impact_before = index.impact(&foo_id, Some(1));
    assert!(impact_before.iter().any(|n| n.symbol.name == "main"), "foo should have a caller before rename");

    fs::write(dir.path().join("backend/a.py"), "def bar():\n    pass\n").unwrap();
    index.reindex().unwrap();

    let impact_after = index.impact(&foo_id, Some(1));
    assert!(impact_after.is_empty(), "renamed symbol's old id must have no incoming edges");
}

#[test]
fn cross_language_api_join_surfaces_heuristic_confidence() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("backend")).unwrap();
    fs::create_dir_all(dir.path().join("frontend")).unwrap();
    fs::write(
        dir.path().join("backend/routes.py"),
        "@app.get(\"/api/users/{id}\")\ndef get_user(id):\n    pass\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("frontend/api.ts"),
        "function loadUser() {\n  return fetch(\"/api/users/42\");\n}\n",
    )
    .unwrap();

    let index = FlytoIndex::open(settings(), "web", dir.path());
    index.reindex().unwrap();

    let apis = index.apis();
    assert_eq!(apis.len(), 1);
    assert_eq!(apis[0].route.path_pattern, "/api/users/{id}");
    assert_eq!(apis[0].confidence, flyto_index::Confidence::Heuristic);
    assert_eq!(apis[0].callers.len(), 1);
}

#[test]
fn impact_depth_chain_across_three_files() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("f.py"), "from g import g\ndef f():\n    g()\n").unwrap();
    fs::write(dir.path().join("g.py"), "from h import h\ndef g():\n    h()\n").unwrap();
    fs::write(dir.path().join("h.py"), "def h():\n    pass\n").unwrap();

    let index = FlytoIndex::open(settings(), "chain", dir.path());
    index.reindex().unwrap();

    let h_id = SymbolId::new("chain", "h.py", SymbolKind::Function, "h");
    let depth1: Vec<String> = index.impact(&h_id, Some(1)).into_iter().map(|n| n.symbol.name).collect();
    assert_eq!(depth1, vec!["g".to_string()]);

    let depth2: Vec<String> = index.impact(&h_id, Some(2)).into_iter().map(|n| n.symbol.name).collect();
    assert_eq!(depth2, vec!["g".to_string(), "f".to_string()]);
}

#[test]
fn incremental_scan_only_changes_the_touched_files_manifest_hash() {
    let dir = TempDir::new().unwrap();
    for i in 0..20 {
        fs::write(dir.path().join(format!("m{i}.py")), format!("def f{i}(): pass")).unwrap();
    }

    let index = FlytoIndex::open(settings(), "bulk", dir.path());
    let first = index.reindex().unwrap();
    assert_eq!(first.added, 20);

    fs::write(dir.path().join("m5.py"), "def f5():\n    pass  # touched\n").unwrap();
    let second = index.reindex().unwrap();

    assert_eq!(second.added, 0);
    assert_eq!(second.deleted, 0);
    assert_eq!(second.modified, 1, "exactly one file's content hash should differ");
}

#[test]
fn search_boost_prefers_recently_opened_file_on_a_bm25_tie() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("auth_a.py"), "def check_auth():\n    pass\n").unwrap();
    fs::write(dir.path().join("auth_b.py"), "def check_auth():\n    pass\n").unwrap();

    let index = FlytoIndex::open(settings(), "web", dir.path());
    index.reindex().unwrap();

    index.session().record_opened("auth_b.py");

    let hits = index.search("auth", 5);
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].symbol.path, "auth_b.py");
}

#[test]
fn cancelled_scan_leaves_on_disk_index_untouched() {
    let dir = TempDir::new().unwrap();
    for i in 0..50 {
        fs::write(dir.path().join(format!("c{i}.py")), format!("def f{i}(): pass")).unwrap();
    }

    let index = FlytoIndex::open(settings(), "web", dir.path());
    index.reindex().unwrap();

    let index_path = dir.path().join(".flyto-index").join("index.json");
    let before = fs::read(&index_path).unwrap();

    index.cancel_handle().store(true, Ordering::Relaxed);
    let summary = index.reindex().unwrap();
    assert_eq!(summary.added, 0);
    assert_eq!(summary.modified, 0);

    let after = fs::read(&index_path).unwrap();
    assert_eq!(before, after, "cancelled scan must not alter the persisted index");

    let tmp_files: Vec<_> = fs::read_dir(dir.path().join(".flyto-index"))
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("tmp"))
        .collect();
    assert!(tmp_files.is_empty(), "no .tmp file should remain after a cancelled scan");
}
