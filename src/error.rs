//! Error taxonomy for the indexing engine.
//!
//! Mirrors the kinds (not type names) laid out in the error handling design:
//! per-file errors are absorbed and recorded on the affected file; I/O, lock
//! contention, and invariant violations abort the run.

use crate::types::SymbolId;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error for whole-run failures (I/O, locking, invariants).
/// Per-file parse/input problems are *not* represented here — they are
/// recorded on the [`crate::file_record::FileRecord`] itself and never abort
/// a run, per the propagation policy in the error handling design.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write '{path}': {source}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("another writer holds the lock on '{index_dir}'")]
    LockContention { index_dir: PathBuf },

    #[error("reverse index disagrees with forward edges for {symbol}: {detail}")]
    InvariantViolation { symbol: SymbolId, detail: String },

    #[error("index at '{path}' is corrupted: {reason}")]
    Corrupted { path: PathBuf, reason: String },

    #[error("failed to (de)serialize index data: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("search index operation failed during {operation}: {cause}")]
    Search { operation: String, cause: String },

    #[error("symbol '{0}' not found in the index")]
    SymbolNotFound(SymbolId),

    #[error("malformed symbol id '{0}'")]
    MalformedSymbolId(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl IndexError {
    /// Human-readable next steps, intended for a CLI collaborator to print.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            IndexError::LockContention { .. } => vec![
                "another process is already indexing this workspace",
                "wait for it to finish, or remove the stale lock file if it crashed",
            ],
            IndexError::Corrupted { .. } => vec![
                "delete the .flyto-index directory and reindex from scratch",
            ],
            IndexError::InvariantViolation { .. } => vec![
                "this is a bug: please file a report with the symbol id involved",
            ],
            IndexError::Search { .. } => vec![
                "the search index may need to be rebuilt with a full reindex",
            ],
            _ => vec![],
        }
    }
}

/// Error recorded on a single file when a construct could not be parsed.
/// This is data, not a propagated error — see [`crate::file_record::ParseFlag`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("parser for {language} failed to initialize: {reason}")]
    Init { language: String, reason: String },

    #[error("syntax error at line {line}: {reason}")]
    Syntax { line: u32, reason: String },

    #[error("file is not valid UTF-8")]
    InvalidUtf8,

    #[error("parse timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
}

pub type IndexResult<T> = Result<T, IndexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_contention_has_suggestions() {
        let err = IndexError::LockContention { index_dir: PathBuf::from(".flyto-index") };
        assert!(!err.recovery_suggestions().is_empty());
    }
}
