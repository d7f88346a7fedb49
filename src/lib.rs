//! flyto-index: a local, language-agnostic code intelligence engine.
//!
//! Walks a workspace, extracts symbols across six languages behind one
//! uniform parser contract, builds an incrementally-updatable symbol graph
//! with reverse-dependency queries, joins backend routes against frontend
//! call sites, and serves BM25 symbol search with session-aware boosting.
//! This crate exposes a query surface ([`query::FlytoIndex`]) for an
//! external CLI/MCP/HTTP layer to call; it does not itself listen on a
//! socket, parse CLI arguments, or call `std::process::exit`.

pub mod api_resolver;
pub mod config;
pub mod error;
pub mod file_record;
pub mod graph;
pub mod hashing;
pub mod logging;
pub mod manifest;
pub mod parsing;
pub mod pipeline;
pub mod project;
pub mod query;
pub mod resolver;
pub mod search;
pub mod session;
pub mod store;
pub mod symbol;
pub mod types;
pub mod walker;

pub use config::Settings;
pub use error::{IndexError, IndexResult, ParseError};
pub use query::{ExitCode, FlytoIndex, ReindexSummary};
pub use types::{Confidence, Edge, EdgeKind, SymbolId, SymbolKind};
