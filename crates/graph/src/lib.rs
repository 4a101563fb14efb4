//! # Auditgraph Graph
//!
//! Derives evidence-bearing links between entities and answers traversal queries.
//!
//! ## Architecture
//!
//! ```text
//! Entity[]
//!     │
//!     ├──> Linking (source co-occurrence)
//!     │      └─ symmetric `relates_to` links, ids from rule_id:from_id:to_id
//!     │
//!     ├──> Adjacency
//!     │      └─ from_id -> edges sorted by (type, rule_id, to_id)
//!     │
//!     ├──> Traversal
//!     │      ├─ neighbors: bounded BFS with a global seen set
//!     │      └─ why_connected: single hop
//!     │
//!     └──> Export records
//!            ├─ redacted node/relationship records, upsert batches
//!            └─ DOT rendering (petgraph)
//! ```

mod dot;
mod error;
mod linking;
mod records;
mod traversal;

pub use dot::EntityGraph;
pub use error::{GraphError, Result};
pub use linking::{build_adjacency, source_cooccurrence_links, RELATES_TO};
pub use records::{
    batches, graph_nodes, graph_relationships, label_for_type, GraphNodeRecord,
    GraphRelationshipRecord, Keyed, SyncOp, DEFAULT_BATCH_SIZE,
};
pub use traversal::{neighbors, why_connected, ConnectionPath, Neighborhood};
