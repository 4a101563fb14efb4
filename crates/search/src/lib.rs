//! # Auditgraph Search
//!
//! Index builders and read-only queries over a profile's package root.
//!
//! - [`Bm25Index`]: inverted index over entity names, written to `indexes/bm25/index.json`
//! - [`keyword_search`]: case-folded lookup ranked by `(-score, tie_break)`
//! - [`node_view`]: compact view of one entity
//! - [`diff_runs`]: added, removed and changed paths between two ingest runs

mod bm25;
mod diff;
mod error;
mod indexes;
mod keyword;
mod node_view;
mod ranking;

pub use bm25::{tokenize, Bm25Index, BM25_INDEX_TYPE};
pub use diff::{diff_runs, DiffStatus, RunDiff};
pub use error::{Result, SearchError};
pub use indexes::{write_decision_index, write_vectors_index};
pub use keyword::{keyword_search, search_index};
pub use node_view::{node_view, NodeView};
pub use ranking::{apply_ranking, round_score, Explanation, SearchResult, DEFAULT_SCORE_ROUNDING};
