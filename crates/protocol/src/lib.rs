//! # Auditgraph Protocol
//!
//! Shared artifact records, content hashing and identifier derivation used by
//! every auditgraph crate.
//!
//! ## Identity
//!
//! ```text
//! canonical_key ──sha256──> ent_<hex>   entities/<hex[0..2]>/ent_<hex>.json
//! claim text    ──sha256──> clm_<hex>   claims/<hex[0..2]>/clm_<hex>.json
//! rule:from:to  ──sha256──> lnk_<hex>   links/<hex[0..2]>/lnk_<hex>.json
//! ```
//!
//! Everything that is hashed goes through [`canonical_json`] first, so map key
//! order never leaks into a digest.

mod error;
mod hashing;
mod model;
mod paths;
mod validate;

pub use error::{ProtocolError, Result};
pub use hashing::{
    canonical_json, canonical_key, canonical_value, claim_id, deterministic_run_id, entity_id,
    inputs_hash, link_id, normalize_key, records_outputs_hash, sha256_bytes, sha256_file,
    sha256_json, sha256_text, shard_for, HASH_CHUNK_BYTES,
};
pub use model::{
    Adjacency, AdjacencyEdge, Authority, Claim, ClaimProvenance, Entity, EntityProvenance,
    Evidence, IngestManifest, IngestRecord, LineRange, Link, ParseStatus, ProvenanceRecord,
    ReplayLogEntry, SourceRef, Stage, StageManifest, StageResult, StageStatus, ValidityWindow,
};
pub use paths::{relative_posix, to_posix};
pub use validate::{validate_claim, validate_entity};

/// Version stamped into every ingest manifest; a mismatch blocks new ingests.
pub const ARTIFACT_SCHEMA_VERSION: &str = "v1";

/// Version of the manifest envelope itself.
pub const MANIFEST_VERSION: &str = "v1";

pub const DEFAULT_PIPELINE_VERSION: &str = "v0.1.0";

/// Manifests are content-stable: wall clock time never enters them.
pub const EPOCH_TIMESTAMP: &str = "1970-01-01T00:00:00Z";

pub const INGEST_MANIFEST_NAME: &str = "ingest-manifest.json";
pub const CONFIG_SNAPSHOT_NAME: &str = "config-snapshot.json";
pub const REPLAY_LOG_NAME: &str = "replay-log.jsonl";

pub const RULE_INGEST_SOURCE: &str = "ingest.source.v1";
pub const RULE_SOURCE_COOCCURRENCE: &str = "link.source_cooccurrence.v1";
