//! [`SymbolGraph`]: the in-memory arena of symbols plus forward edges and
//! the [`ReverseIndex`] (`spec.md` §3, §4.4). The reverse index is
//! maintained in lock-step with forward edges — there is no code path that
//! can add or remove one without the other, which is the invariant tested
//! in `spec.md` §8.

use crate::types::{Edge, SymbolId};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// The full symbol graph: every known symbol, the forward edges between
/// them, the reverse index, and the unresolved-name bucket from the name
/// resolver (`spec.md` §4.4, point 3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SymbolGraph {
    pub edges: Vec<Edge>,
    pub reverse: IndexMap<SymbolId, IndexSet<SymbolId>>,
    /// `{name → [candidate_ids]}` for ambiguous references — surfaced for
    /// UI disclosure, never contributing an edge (`spec.md` §4.4 point 3).
    pub unresolved: IndexMap<String, Vec<SymbolId>>,
}

impl SymbolGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a forward edge and its reverse entry together. This is the
    /// only way an edge enters the graph, so the two structures can never
    /// drift apart.
    pub fn add_edge(&mut self, edge: Edge) {
        self.reverse.entry(edge.to.clone()).or_default().insert(edge.from.clone());
        self.edges.push(edge);
    }

    /// Removes every edge outbound from `symbol` (called when a file is
    /// deleted or a symbol's `body_hash` changes and its edges must be
    /// re-derived). Reverse-index entries pointing at `symbol` itself are
    /// left untouched here — to remove all edges *to* `symbol` as well
    /// (full deletion), call [`SymbolGraph::remove_symbol`].
    pub fn remove_edges_from(&mut self, symbol: &SymbolId) {
        let removed: Vec<Edge> = {
            let mut kept = Vec::with_capacity(self.edges.len());
            let mut removed = Vec::new();
            for edge in self.edges.drain(..) {
                if &edge.from == symbol {
                    removed.push(edge);
                } else {
                    kept.push(edge);
                }
            }
            self.edges = kept;
            removed
        };
        for edge in removed {
            if let Some(set) = self.reverse.get_mut(&edge.to) {
                set.shift_remove(&edge.from);
                if set.is_empty() {
                    self.reverse.shift_remove(&edge.to);
                }
            }
        }
    }

    /// Removes `symbol` entirely: edges outbound from it are dropped, and
    /// edges *to* it become unresolved names rather than dangling IDs
    /// (`spec.md` §3 invariants).
    pub fn remove_symbol(&mut self, symbol: &SymbolId) {
        self.remove_edges_from(symbol);
        if let Some(incoming) = self.reverse.shift_remove(symbol) {
            for from in incoming {
                self.edges.retain(|e| !(e.from == from && e.to == *symbol));
                self.unresolved.entry(symbol.name.clone()).or_default();
            }
        }
    }

    /// Reverse-closure of `symbol` up to `depth` hops, grouped by the
    /// traversal order found (`impact(symbol_id)`, `spec.md` §6).
    pub fn impact(&self, symbol: &SymbolId, depth: usize) -> Vec<(SymbolId, usize)> {
        let mut visited = IndexSet::new();
        let mut frontier = vec![symbol.clone()];
        let mut result = Vec::new();
        for level in 1..=depth {
            let mut next = Vec::new();
            for node in &frontier {
                if let Some(callers) = self.reverse.get(node) {
                    for caller in callers {
                        if visited.insert(caller.clone()) {
                            result.push((caller.clone(), level));
                            next.push(caller.clone());
                        }
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }
        result
    }

    /// Every reverse edge into `symbol`, for `references(symbol_id)`.
    pub fn references(&self, symbol: &SymbolId) -> Vec<&Edge> {
        self.edges.iter().filter(|e| &e.to == symbol).collect()
    }

    #[cfg(test)]
    pub fn invariant_holds(&self) -> bool {
        for edge in &self.edges {
            match self.reverse.get(&edge.to) {
                Some(set) if set.contains(&edge.from) => {}
                _ => return false,
            }
        }
        for (to, froms) in &self.reverse {
            for from in froms {
                if !self.edges.iter().any(|e| &e.from == from && &e.to == to) {
                    return false;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Confidence, EdgeKind, SymbolKind};

    fn id(name: &str) -> SymbolId {
        SymbolId::new("proj", "a.py", SymbolKind::Function, name)
    }

    #[test]
    fn add_edge_keeps_forward_and_reverse_in_sync() {
        let mut graph = SymbolGraph::new();
        graph.add_edge(Edge::new(id("a"), id("b"), EdgeKind::Calls, Confidence::Exact));
        assert!(graph.invariant_holds());
        assert!(graph.reverse[&id("b")].contains(&id("a")));
    }

    #[test]
    fn remove_symbol_purges_reverse_index() {
        let mut graph = SymbolGraph::new();
        graph.add_edge(Edge::new(id("a"), id("b"), EdgeKind::Calls, Confidence::Exact));
        graph.remove_symbol(&id("a"));
        assert!(graph.invariant_holds());
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn impact_depth_chain() {
        let mut graph = SymbolGraph::new();
        graph.add_edge(Edge::new(id("f"), id("g"), EdgeKind::Calls, Confidence::Exact));
        graph.add_edge(Edge::new(id("g"), id("h"), EdgeKind::Calls, Confidence::Exact));
        let depth1: Vec<_> = graph.impact(&id("h"), 1).into_iter().map(|(s, _)| s).collect();
        assert_eq!(depth1, vec![id("g")]);
        let depth2: Vec<_> = graph.impact(&id("h"), 2).into_iter().map(|(s, _)| s).collect();
        assert_eq!(depth2, vec![id("g"), id("f")]);
    }

    #[test]
    fn references_returns_matching_edges() {
        let mut graph = SymbolGraph::new();
        graph.add_edge(Edge::new(id("a"), id("b"), EdgeKind::Calls, Confidence::Exact));
        graph.add_edge(Edge::new(id("c"), id("b"), EdgeKind::References, Confidence::Likely));
        assert_eq!(graph.references(&id("b")).len(), 2);
    }
}
