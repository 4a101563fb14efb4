//! # Auditgraph Pipeline
//!
//! Configuration, source discovery and the staged run that turns a workspace into a
//! deterministic, redacted knowledge graph.
//!
//! ## Stages
//!
//! ```text
//! ingest ──> normalize ──> extract ──> link ──> index
//!   │            │             │          │         │
//!   │            │             │          │         └─ indexes/bm25, indexes/vectors
//!   │            │             │          └─ links/, indexes/graph/adjacency.json
//!   │            │             └─ entities/, claims/, indexes/decisions
//!   │            └─ hash pass-through
//!   └─ sources/<hash>.json, runs/<run_id>/ingest-manifest.json
//! ```
//!
//! Each stage writes `runs/<run_id>/<stage>-manifest.json` whose `inputs_hash` is the
//! previous stage's `outputs_hash`, plus one line in the run's replay log. The run id
//! is derived from the source hashes and the sanitized configuration, so re-running
//! over unchanged inputs reproduces the same ids and hashes.
//!
//! ## Guards
//!
//! - Compatibility: an ingest refuses to run over artifacts of another schema version.
//! - Budget: an ingest or export that would push the package past its footprint
//!   limit is refused before anything is written.
//! - Path policy: import targets and export outputs must stay inside their base.

mod budget;
mod compat;
mod config;
mod error;
mod export;
mod paths;
mod policy;
mod recorder;
mod runner;
mod scanner;
mod workspace;

pub use budget::{
    evaluate_budget, evaluate_pkg_budget, latest_source_bytes, BudgetReport, BudgetSettings,
    BudgetStatus, MIN_SOURCE_BYTES,
};
pub use compat::{ensure_latest_manifest_compatibility, CompatibilityReport};
pub use config::{
    default_config_value, Config, ProfileConfig, DEFAULT_CONFIG_RELATIVE_PATH, DEFAULT_PROFILE,
};
pub use error::{PipelineError, Result};
pub use export::{
    export_dot, export_graph, export_json, ExportMetadata, ExportReport, GraphExport,
    DEFAULT_EXPORT_STEM, EXPORTS_DIR,
};
pub use paths::{ensure_within_base, resolve_path};
pub use policy::{IngestionPolicy, SKIP_REASON_READ_ERROR, SKIP_REASON_UNSUPPORTED};
pub use recorder::{record_source, RecordedSource};
pub use runner::{run_stage, PipelineRunner};
pub use scanner::SourceScanner;
pub use workspace::{init_workspace, profile_layout, profile_redactor, InitReport};
