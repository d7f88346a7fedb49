//! [`SymbolRecord`]: the unit of extraction every language parser emits.

use crate::types::{SymbolId, SymbolKind, Span};
use serde::{Deserialize, Serialize};

/// Safely truncate a UTF-8 string at a character boundary, never splitting a
/// multi-byte codepoint. Used when storing `signature`/`doc` so long lines
/// don't blow up the persisted index and don't panic on emoji/CJK boundaries.
pub fn safe_truncate(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut boundary = max_bytes;
    while boundary > 0 && !s.is_char_boundary(boundary) {
        boundary -= 1;
    }
    &s[..boundary]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub id: SymbolId,
    pub kind: SymbolKind,
    pub span: Span,
    /// Normalized parameter/return text; language-specific, stored opaque.
    pub signature: Option<String>,
    /// Leading comment/docstring, if present.
    pub doc: Option<String>,
    /// Ordered list of decorator/annotation names.
    pub decorators: Vec<String>,
    pub exports: bool,
    /// Unresolved textual references this symbol's body emits (names only).
    pub refs_out: Vec<String>,
    /// Stable hash of the body text, for change detection below file granularity.
    pub body_hash: u64,
}

const MAX_SIGNATURE_BYTES: usize = 512;
const MAX_DOC_BYTES: usize = 2048;

impl SymbolRecord {
    pub fn new(id: SymbolId, kind: SymbolKind, span: Span, body_hash: u64) -> Self {
        Self {
            id,
            kind,
            span,
            signature: None,
            doc: None,
            decorators: Vec::new(),
            exports: false,
            refs_out: Vec::new(),
            body_hash,
        }
    }

    pub fn with_signature(mut self, signature: impl AsRef<str>) -> Self {
        self.signature = Some(safe_truncate(signature.as_ref(), MAX_SIGNATURE_BYTES).to_string());
        self
    }

    pub fn with_doc(mut self, doc: impl AsRef<str>) -> Self {
        let doc = doc.as_ref().trim();
        if !doc.is_empty() {
            self.doc = Some(safe_truncate(doc, MAX_DOC_BYTES).to_string());
        }
        self
    }

    pub fn with_decorators(mut self, decorators: Vec<String>) -> Self {
        self.decorators = decorators;
        self
    }

    pub fn exported(mut self, exports: bool) -> Self {
        self.exports = exports;
        self
    }

    pub fn with_refs_out(mut self, refs_out: Vec<String>) -> Self {
        self.refs_out = refs_out;
        self
    }
}
