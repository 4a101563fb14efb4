//! # Auditgraph Store
//!
//! Filesystem persistence for one profile's package root.
//!
//! All writes go through [`ArtifactWriter`], which redacts the payload, canonicalizes
//! key order and replaces the target atomically. Entities, claims and links are
//! content addressed and sharded by the two characters after their id prefix, so
//! writing the same artifact twice yields the same bytes at the same path.

mod error;
mod graph_store;
mod io;
mod layout;
mod lock;
mod manifests;
mod provenance;
mod writer;

pub use error::{Result, StoreError};
pub use graph_store::GraphStore;
pub use io::{directory_size, read_json, read_json_opt, write_bytes_atomic, write_json_value};
pub use layout::{validate_profile_name, ProfileLayout, PKG_DIR_NAME, PROFILES_DIR_NAME};
pub use lock::ProfileLock;
pub use manifests::{
    load_ingest_manifest, load_ingest_manifest_value, load_replay_log, load_run_index,
    load_stage_manifest, resolve_run, runs_with_manifest, RunIndex, RunSelection,
};
pub use provenance::load_provenance;
pub use writer::ArtifactWriter;
