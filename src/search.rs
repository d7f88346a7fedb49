//! Symbol search (`spec.md` §4.6): a hand-rolled BM25 postings index over
//! symbol names, kinds, path components, docs, and decorators, plus a
//! session-boost pass over the top hits.
//!
//! A tantivy-backed implementation was the original plan, but tantivy's
//! segment storage has no way to emit the flat `term → postings` JSON the
//! on-disk `bm25.json` schema requires (`spec.md` §4.7); this module
//! implements BM25 directly instead. See `DESIGN.md` for the tradeoff.

use crate::parsing::split_identifier;
use crate::session::SessionTracker;
use crate::symbol::SymbolRecord;
use crate::types::SymbolId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

const K1: f32 = 1.5;
const B: f32 = 0.75;
/// Session boost never exceeds this fraction of the top unboosted score
/// (`spec.md` §4.6).
const SESSION_BOOST_ALPHA: f32 = 0.20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Posting {
    pub symbol: SymbolId,
    pub term_frequency: u32,
}

/// On-disk and in-memory form of the index: `term → postings` plus each
/// document's token length for the BM25 length-normalization term.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Bm25Index {
    postings: IndexMap<String, Vec<Posting>>,
    doc_lengths: IndexMap<SymbolId, u32>,
    total_docs: u32,
    total_length: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub symbol: SymbolId,
    /// Final score after the session boost is applied.
    pub score: f32,
    /// BM25 score before the session boost, so a caller can see the
    /// breakdown `spec.md` §6 calls for.
    pub base_score: f32,
    /// `score - base_score`; zero when no session boost applied.
    pub boost: f32,
}

impl Bm25Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes every posting for `symbol`, if present, so re-indexing a
    /// changed symbol never leaves stale terms behind.
    pub fn remove_symbol(&mut self, symbol: &SymbolId) {
        if let Some(length) = self.doc_lengths.shift_remove(symbol) {
            self.total_docs = self.total_docs.saturating_sub(1);
            self.total_length = self.total_length.saturating_sub(length as u64);
        }
        self.postings.retain(|_, postings| {
            postings.retain(|p| &p.symbol != symbol);
            !postings.is_empty()
        });
    }

    /// Tokenizes `record` and inserts its postings. Callers must call
    /// [`Bm25Index::remove_symbol`] first when re-indexing an existing
    /// symbol (the graph builder does this on every `body_hash` change).
    pub fn index_symbol(&mut self, record: &SymbolRecord) {
        let terms = document_terms(record);
        let length = terms.len() as u32;
        self.doc_lengths.insert(record.id.clone(), length);
        self.total_docs += 1;
        self.total_length += length as u64;

        let mut counts: IndexMap<String, u32> = IndexMap::new();
        for term in terms {
            *counts.entry(term).or_insert(0) += 1;
        }
        for (term, term_frequency) in counts {
            let postings = self.postings.entry(term).or_default();
            if let Some(existing) = postings.iter_mut().find(|p| p.symbol == record.id) {
                existing.term_frequency = term_frequency;
            } else {
                postings.push(Posting { symbol: record.id.clone(), term_frequency });
            }
        }
    }

    fn avg_doc_length(&self) -> f32 {
        if self.total_docs == 0 {
            0.0
        } else {
            self.total_length as f32 / self.total_docs as f32
        }
    }

    /// Scores every symbol matching any query term with BM25 (`k1 = 1.5`,
    /// `b = 0.75`), summing per-term contributions, and returns the top
    /// `limit` hits. With `session` supplied, applies an additive recency
    /// boost over the entire unboosted candidate set before re-sorting and
    /// taking the final cut (`spec.md` §4.6); each [`SearchHit`] carries
    /// both the pre-boost `base_score` and the post-boost `score` so a
    /// caller can see the breakdown.
    pub fn search(&self, query: &str, limit: usize, session: Option<(&SessionTracker, &IndexMap<SymbolId, String>)>) -> Vec<SearchHit> {
        let query_terms: Vec<String> = query_tokens(query);
        if query_terms.is_empty() || self.total_docs == 0 {
            return Vec::new();
        }

        let avg_len = self.avg_doc_length();
        let mut scores: IndexMap<SymbolId, f32> = IndexMap::new();

        for term in &query_terms {
            let Some(postings) = self.postings.get(term) else { continue };
            let doc_freq = postings.len() as f32;
            let idf = idf(self.total_docs as f32, doc_freq);
            for posting in postings {
                let Some(&doc_len) = self.doc_lengths.get(&posting.symbol) else { continue };
                let tf = posting.term_frequency as f32;
                let denom = tf + K1 * (1.0 - B + B * (doc_len as f32 / avg_len.max(1.0)));
                let score = idf * (tf * (K1 + 1.0)) / denom.max(f32::EPSILON);
                *scores.entry(posting.symbol.clone()).or_insert(0.0) += score;
            }
        }

        let mut hits: Vec<SearchHit> = scores
            .into_iter()
            .map(|(symbol, score)| SearchHit { symbol, score, base_score: score, boost: 0.0 })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.symbol.cmp(&b.symbol)));

        if let Some((tracker, path_by_symbol)) = session {
            apply_session_boost(&mut hits, tracker, path_by_symbol);
        }

        hits.truncate(limit);
        hits
    }
}

fn idf(total_docs: f32, doc_freq: f32) -> f32 {
    (((total_docs - doc_freq + 0.5) / (doc_freq + 0.5)) + 1.0).ln()
}

/// Every indexed term for a symbol: the name (whole and word-split), kind,
/// path components, decorators, and doc text, lowercased.
fn document_terms(record: &SymbolRecord) -> Vec<String> {
    let mut terms = Vec::new();
    terms.push(record.id.name.to_lowercase());
    terms.extend(split_identifier(&record.id.name));
    terms.push(format!("{:?}", record.kind).to_lowercase());
    for component in record.id.path.split(['/', '\\']) {
        if !component.is_empty() {
            terms.push(component.to_lowercase());
        }
    }
    for decorator in &record.decorators {
        terms.extend(split_identifier(decorator.trim_start_matches('@')));
    }
    if let Some(doc) = &record.doc {
        terms.extend(doc.split_whitespace().map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase()).filter(|w| !w.is_empty()));
    }
    terms
}

fn query_tokens(query: &str) -> Vec<String> {
    query.split_whitespace().flat_map(split_identifier).filter(|t| !t.is_empty()).collect()
}

/// Boosts hits whose backing file appears in the session tracker's recent
/// buffer, bounded to `SESSION_BOOST_ALPHA` of the top unboosted score, then
/// re-sorts. Only reorders within the candidate set passed in; callers widen
/// the pre-boost candidate pool so a session-favored lower-ranked hit can
/// still surface (`spec.md` §4.6, §8 scenario 5).
fn apply_session_boost(hits: &mut [SearchHit], tracker: &SessionTracker, path_by_symbol: &IndexMap<SymbolId, String>) {
    let Some(top_score) = hits.iter().map(|h| h.score).fold(None, |acc, s| Some(acc.map_or(s, |a: f32| a.max(s)))) else {
        return;
    };
    if top_score <= 0.0 {
        return;
    }
    let max_boost = top_score * SESSION_BOOST_ALPHA;
    for hit in hits.iter_mut() {
        let Some(path) = path_by_symbol.get(&hit.symbol) else { continue };
        let weight = tracker.recency_weight(path);
        if weight > 0.0 {
            hit.boost = max_boost * weight;
            hit.score = hit.base_score + hit.boost;
        }
    }
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.symbol.cmp(&b.symbol)));
}
