//! Name Resolver (`spec.md` §4.4): resolves unqualified references to
//! symbol IDs with a confidence tier — intra-file, then import-qualified,
//! then a workspace-wide fallback for globally-unique names. Ambiguous
//! names never contribute an edge; they are recorded in
//! [`crate::graph::SymbolGraph::unresolved`] for UI disclosure.

use crate::file_record::ImportDecl;
use crate::graph::SymbolGraph;
use crate::types::{Confidence, Edge, EdgeKind, SymbolId, SymbolKind};
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct CandidateMeta {
    id: SymbolId,
    kind: SymbolKind,
    exported: bool,
}

/// Maintains the indices the resolver needs and re-derives edges for one
/// symbol at a time, so a `body_hash` change only pays for re-resolving
/// that symbol's `refs_out` (`spec.md` §3 invariant).
#[derive(Debug, Default)]
pub struct NameResolver {
    by_bare_name: HashMap<String, Vec<CandidateMeta>>,
    local_by_file: HashMap<String, HashMap<String, Vec<CandidateMeta>>>,
    imports_by_file: HashMap<String, Vec<ImportDecl>>,
    known_files: Vec<String>,
}

impl NameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index_symbol(&mut self, id: &SymbolId, kind: SymbolKind, exported: bool) {
        let meta = CandidateMeta { id: id.clone(), kind, exported };
        let bare = bare_name(&id.name);
        self.by_bare_name.entry(bare.clone()).or_default().push(meta.clone());
        self.local_by_file.entry(id.path.clone()).or_default().entry(bare).or_default().push(meta);
    }

    pub fn deindex_symbol(&mut self, id: &SymbolId) {
        let bare = bare_name(&id.name);
        if let Some(v) = self.by_bare_name.get_mut(&bare) {
            v.retain(|c| &c.id != id);
        }
        if let Some(per_file) = self.local_by_file.get_mut(&id.path) {
            if let Some(v) = per_file.get_mut(&bare) {
                v.retain(|c| &c.id != id);
            }
        }
    }

    pub fn set_imports(&mut self, path: impl Into<String>, imports: Vec<ImportDecl>) {
        self.imports_by_file.insert(path.into(), imports);
    }

    pub fn remove_file(&mut self, path: &str) {
        self.imports_by_file.remove(path);
        self.local_by_file.remove(path);
    }

    pub fn set_known_files(&mut self, files: Vec<String>) {
        self.known_files = files;
    }

    /// Resolves `refs_out` emitted by `from` and writes every confident
    /// edge into `graph`; records ambiguous names in `graph.unresolved`.
    pub fn resolve_refs(&self, graph: &mut SymbolGraph, from: &SymbolId, refs_out: &[String]) {
        for reference in refs_out {
            let bare = bare_name(reference);

            if let Some(candidates) = self.intra_file_candidates(from, &bare) {
                if let Some(chosen) = tie_break(&candidates, &from.project) {
                    self.emit(graph, from, chosen, Confidence::Exact);
                    continue;
                }
            }

            if let Some(candidates) = self.import_qualified_candidates(from, reference, &bare) {
                if let Some(chosen) = tie_break(&candidates, &from.project) {
                    self.emit(graph, from, chosen, Confidence::Likely);
                    continue;
                }
            }

            self.workspace_fallback(graph, from, reference, &bare);
        }
    }

    fn intra_file_candidates(&self, from: &SymbolId, bare: &str) -> Option<Vec<CandidateMeta>> {
        let per_file = self.local_by_file.get(&from.path)?;
        let candidates: Vec<_> = per_file.get(bare)?.iter().filter(|c| &c.id != from).cloned().collect();
        if candidates.is_empty() {
            None
        } else {
            Some(candidates)
        }
    }

    fn import_qualified_candidates(&self, from: &SymbolId, reference: &str, bare: &str) -> Option<Vec<CandidateMeta>> {
        let (prefix, _) = reference.split_once('.')?;
        let imports = self.imports_by_file.get(&from.path)?;
        let matching_import = imports
            .iter()
            .find(|imp| imp.alias.as_deref() == Some(prefix) || module_leaf(&imp.module) == prefix)?;
        let leaf = module_leaf(&matching_import.module);
        let mut candidates = Vec::new();
        for file in self.known_files.iter().filter(|f| file_stem(f) == leaf) {
            if let Some(per_file) = self.local_by_file.get(file) {
                if let Some(found) = per_file.get(bare) {
                    candidates.extend(found.iter().cloned());
                }
            }
        }
        if candidates.is_empty() {
            None
        } else {
            Some(candidates)
        }
    }

    fn workspace_fallback(&self, graph: &mut SymbolGraph, from: &SymbolId, reference: &str, bare: &str) {
        let Some(all) = self.by_bare_name.get(bare) else { return };
        let candidates: Vec<_> = all.iter().filter(|c| &c.id != from).cloned().collect();
        match candidates.len() {
            0 => {}
            1 => self.emit(graph, from, candidates.into_iter().next().unwrap(), Confidence::Heuristic),
            _ => {
                graph
                    .unresolved
                    .insert(reference.to_string(), candidates.into_iter().map(|c| c.id).collect());
            }
        }
    }

    fn emit(&self, graph: &mut SymbolGraph, from: &SymbolId, to: CandidateMeta, confidence: Confidence) {
        let kind = match to.kind {
            SymbolKind::Function | SymbolKind::Method => EdgeKind::Calls,
            _ => EdgeKind::References,
        };
        graph.add_edge(Edge::new(from.clone(), to.id, kind, confidence));
    }
}

/// Tie-break for same-confidence multi-candidate sets (`spec.md` §4.4):
/// same-project over cross-project, then exported over non-exported, then
/// lexicographically-least `SymbolId` — purely to keep output deterministic.
fn tie_break(candidates: &[CandidateMeta], from_project: &str) -> Option<CandidateMeta> {
    candidates
        .iter()
        .min_by(|a, b| {
            let a_same = a.id.project == from_project;
            let b_same = b.id.project == from_project;
            b_same
                .cmp(&a_same)
                .then_with(|| b.exported.cmp(&a.exported))
                .then_with(|| a.id.cmp(&b.id))
        })
        .cloned()
}

/// The last segment of a dotted reference, or the reference itself.
fn bare_name(reference: &str) -> String {
    reference.rsplit('.').next().unwrap_or(reference).to_string()
}

fn module_leaf(module: &str) -> &str {
    module.rsplit(['.', '/', ':']).find(|s| !s.is_empty() && *s != "*").unwrap_or(module)
}

fn file_stem(path: &str) -> &str {
    std::path::Path::new(path).file_stem().and_then(|s| s.to_str()).unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(project: &str, path: &str, kind: SymbolKind, name: &str) -> SymbolId {
        SymbolId::new(project, path, kind, name)
    }

    #[test]
    fn intra_file_binds_exact() {
        let mut resolver = NameResolver::new();
        let foo = id("web", "a.py", SymbolKind::Function, "foo");
        let bar = id("web", "a.py", SymbolKind::Function, "bar");
        resolver.index_symbol(&foo, SymbolKind::Function, true);
        resolver.index_symbol(&bar, SymbolKind::Function, true);

        let mut graph = SymbolGraph::new();
        resolver.resolve_refs(&mut graph, &bar, &["foo".to_string()]);

        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].confidence, Confidence::Exact);
        assert_eq!(graph.edges[0].kind, EdgeKind::Calls);
    }

    #[test]
    fn import_qualified_binds_likely() {
        let mut resolver = NameResolver::new();
        let foo = id("web", "a.py", SymbolKind::Function, "foo");
        let main = id("web", "b.py", SymbolKind::Function, "main");
        resolver.index_symbol(&foo, SymbolKind::Function, true);
        resolver.index_symbol(&main, SymbolKind::Function, true);
        resolver.set_imports("b.py", vec![ImportDecl { module: "a".to_string(), alias: None }]);
        resolver.set_known_files(vec!["a.py".to_string(), "b.py".to_string()]);

        let mut graph = SymbolGraph::new();
        resolver.resolve_refs(&mut graph, &main, &["a.foo".to_string()]);

        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].confidence, Confidence::Likely);
        assert_eq!(graph.edges[0].to, foo);
    }

    #[test]
    fn globally_unique_name_binds_heuristic() {
        let mut resolver = NameResolver::new();
        let unique_fn = id("web", "z.py", SymbolKind::Function, "very_unique_name");
        let caller = id("web", "y.py", SymbolKind::Function, "caller");
        resolver.index_symbol(&unique_fn, SymbolKind::Function, true);
        resolver.index_symbol(&caller, SymbolKind::Function, true);

        let mut graph = SymbolGraph::new();
        resolver.resolve_refs(&mut graph, &caller, &["very_unique_name".to_string()]);

        assert_eq!(graph.edges[0].confidence, Confidence::Heuristic);
    }

    #[test]
    fn ambiguous_name_yields_no_edge_but_is_recorded() {
        let mut resolver = NameResolver::new();
        let a = id("web", "a.py", SymbolKind::Function, "handle");
        let b = id("web", "b.py", SymbolKind::Function, "handle");
        let caller = id("web", "c.py", SymbolKind::Function, "caller");
        resolver.index_symbol(&a, SymbolKind::Function, true);
        resolver.index_symbol(&b, SymbolKind::Function, true);
        resolver.index_symbol(&caller, SymbolKind::Function, true);

        let mut graph = SymbolGraph::new();
        resolver.resolve_refs(&mut graph, &caller, &["handle".to_string()]);

        assert!(graph.edges.is_empty());
        assert_eq!(graph.unresolved["handle"].len(), 2);
    }

    #[test]
    fn rename_removes_edge_and_purges_unresolved() {
        let mut resolver = NameResolver::new();
        let foo = id("web", "a.py", SymbolKind::Function, "foo");
        let main = id("web", "b.py", SymbolKind::Function, "main");
        resolver.index_symbol(&foo, SymbolKind::Function, true);
        resolver.index_symbol(&main, SymbolKind::Function, true);
        resolver.set_imports("b.py", vec![ImportDecl { module: "a".to_string(), alias: None }]);
        resolver.set_known_files(vec!["a.py".to_string(), "b.py".to_string()]);

        let mut graph = SymbolGraph::new();
        resolver.resolve_refs(&mut graph, &main, &["foo".to_string()]);
        assert_eq!(graph.edges.len(), 1);

        // Rename foo -> bar: deindex the old symbol, the old edge must be
        // explicitly retracted by the caller (the graph builder), then a
        // fresh resolve over the same refs_out produces nothing.
        resolver.deindex_symbol(&foo);
        graph.remove_symbol(&foo);
        let mut graph2 = SymbolGraph::new();
        resolver.resolve_refs(&mut graph2, &main, &["foo".to_string()]);
        assert!(graph2.edges.is_empty());
    }
}
