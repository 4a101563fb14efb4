use crate::budget::{evaluate_pkg_budget, latest_source_bytes, BudgetReport};
use crate::config::Config;
use crate::error::Result;
use crate::paths::{ensure_within_base, resolve_path};
use crate::workspace::{profile_layout, profile_redactor};
use auditgraph_graph::{
    batches, graph_nodes, graph_relationships, EntityGraph, GraphNodeRecord,
    GraphRelationshipRecord, SyncOp,
};
use auditgraph_protocol::{canonical_value, sha256_text, to_posix, Stage};
use auditgraph_redact::{RedactionSummary, Redactor};
use auditgraph_store::{resolve_run, write_bytes_atomic, GraphStore, ProfileLayout};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

pub const EXPORTS_DIR: &str = "exports";
pub const DEFAULT_EXPORT_STEM: &str = "exports/subgraphs/export";

/// Provenance of an export file: which workspace and policy produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportMetadata {
    pub profile: String,
    /// SHA-256 of the resolved workspace root path.
    pub root_id: String,
    pub redaction_policy_id: String,
    pub redaction_policy_version: String,
    pub redaction_summary: RedactionSummary,
    pub clean_room: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportReport {
    pub output: String,
    pub entities: usize,
    pub links: usize,
    pub budget: BudgetReport,
}

/// Read-only view of the profile's graph as sorted upsert batches.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphExport {
    pub nodes: Vec<Vec<SyncOp<GraphNodeRecord>>>,
    pub relationships: Vec<Vec<SyncOp<GraphRelationshipRecord>>>,
    pub skipped_relationships: usize,
    pub redaction_summary: RedactionSummary,
}

struct ExportTarget {
    root: PathBuf,
    output: PathBuf,
    layout: ProfileLayout,
    redactor: Redactor,
}

fn prepare(root: &Path, config: &Config, output: &Path) -> Result<ExportTarget> {
    let root = resolve_path(root)?;
    let candidate = if output.is_absolute() {
        output.to_path_buf()
    } else {
        root.join(output)
    };
    let output = ensure_within_base(&candidate, &root.join(EXPORTS_DIR), "export output path")?;
    let layout = profile_layout(&root, config)?;
    let redactor = profile_redactor(&layout, &config.profile().redaction)?;
    Ok(ExportTarget {
        root,
        output,
        layout,
        redactor,
    })
}

fn write_within_budget(target: &ExportTarget, config: &Config, bytes: &[u8]) -> Result<BudgetReport> {
    let source_bytes = latest_source_bytes(&target.layout, config.run_selection())?;
    let budget = evaluate_pkg_budget(
        &target.layout,
        source_bytes,
        bytes.len() as u64,
        &config.profile().budget,
    )?
    .enforce()?;
    write_bytes_atomic(&target.output, bytes)?;
    log::info!("Exported {} bytes to {}", bytes.len(), target.output.display());
    Ok(budget)
}

/// Writes `{entities, links, export_metadata}` to `output`, which must stay inside
/// `<root>/exports`. Relative outputs are resolved against the workspace root.
pub fn export_json(root: &Path, config: &Config, output: &Path) -> Result<ExportReport> {
    let target = prepare(root, config, output)?;
    let store = GraphStore::new(target.layout.clone());
    let entities = store.load_entities()?;
    let links = store.load_links()?;

    let redacted = target
        .redactor
        .redact_serializable(&json!({ "entities": entities, "links": links }))?;
    let policy = target.redactor.policy();
    let metadata = ExportMetadata {
        profile: config.active_profile().to_string(),
        root_id: sha256_text(&to_posix(&target.root)),
        redaction_policy_id: policy.policy_id.clone(),
        redaction_policy_version: policy.policy_version.clone(),
        redaction_summary: redacted.summary,
        clean_room: policy.enabled,
    };
    let mut payload = redacted.value;
    payload["export_metadata"] = serde_json::to_value(&metadata)?;
    let bytes = serde_json::to_vec_pretty(&canonical_value(payload))?;

    let budget = write_within_budget(&target, config, &bytes)?;
    Ok(ExportReport {
        output: to_posix(&target.output),
        entities: entities.len(),
        links: links.len(),
        budget,
    })
}

/// Graphviz rendering of the stored entities and links.
pub fn export_dot(root: &Path, config: &Config, output: &Path) -> Result<ExportReport> {
    let target = prepare(root, config, output)?;
    let store = GraphStore::new(target.layout.clone());
    let entities = store.load_entities()?;
    let links = store.load_links()?;
    let graph = EntityGraph::build(&entities, &links);
    let dot = graph.to_dot(&target.redactor);

    let budget = write_within_budget(&target, config, dot.as_bytes())?;
    Ok(ExportReport {
        output: to_posix(&target.output),
        entities: graph.node_count(),
        links: graph.edge_count(),
        budget,
    })
}

/// Node and relationship records of the active profile, redacted and batched for an
/// idempotent merge-by-id into an external graph store. Relationships whose endpoints
/// are not exported are skipped and counted.
pub fn export_graph(root: &Path, config: &Config, batch_size: usize) -> Result<GraphExport> {
    let root = resolve_path(root)?;
    let layout = profile_layout(&root, config)?;
    let redactor = profile_redactor(&layout, &config.profile().redaction)?;
    let store = GraphStore::new(layout.clone());
    let run_id = resolve_run(&layout, None, Stage::Link, config.run_selection())?;

    let mut summary = RedactionSummary::default();
    let nodes = graph_nodes(
        &store.load_entities()?,
        config.active_profile(),
        run_id.as_deref(),
        &redactor,
        &mut summary,
    )?;
    let node_ids: BTreeSet<String> = nodes.iter().map(|node| node.id.clone()).collect();
    let (relationships, skipped_relationships) =
        graph_relationships(&store.load_links()?, Some(&node_ids), &redactor, &mut summary)?;
    if skipped_relationships > 0 {
        log::warn!("Skipped {skipped_relationships} relationships with unknown endpoints");
    }

    Ok(GraphExport {
        nodes: batches(&nodes, batch_size)?,
        relationships: batches(&relationships, batch_size)?,
        skipped_relationships,
        redaction_summary: summary,
    })
}
