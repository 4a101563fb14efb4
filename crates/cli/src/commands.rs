use crate::flags::ExportFormat;
use anyhow::{Context, Result};
use auditgraph_graph::{neighbors, why_connected};
use auditgraph_pipeline::{
    export_dot, export_graph, export_json, init_workspace, profile_layout, Config,
    PipelineRunner, DEFAULT_CONFIG_RELATIVE_PATH, DEFAULT_EXPORT_STEM,
};
use auditgraph_protocol::{
    Claim, Entity, IngestManifest, Link, ProvenanceRecord, ReplayLogEntry, StageManifest,
    StageResult, ARTIFACT_SCHEMA_VERSION,
};
use auditgraph_search::{diff_runs, keyword_search, node_view};
use auditgraph_store::{GraphStore, ProfileLayout};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

/// Workspace root plus the configuration every command runs under.
pub(crate) struct Session {
    root: PathBuf,
    config: Config,
}

impl Session {
    /// An explicit `--config` wins; otherwise `<root>/config/auditgraph.json` is used when
    /// present, and the built-in defaults when not.
    pub(crate) fn open(root: &Path, config: Option<&Path>, profile: Option<&str>) -> Result<Self> {
        let path = match config {
            Some(path) => Some(path.to_path_buf()),
            None => Some(root.join(DEFAULT_CONFIG_RELATIVE_PATH)).filter(|path| path.is_file()),
        };
        let mut config = Config::load(path.as_deref()).context("Failed to load configuration")?;
        if let Some(profile) = profile {
            config = config.with_active_profile(profile)?;
        }
        log::debug!(
            "Workspace {} with profile {}",
            root.display(),
            config.active_profile()
        );
        Ok(Self {
            root: root.to_path_buf(),
            config,
        })
    }

    fn runner(&self) -> PipelineRunner<'_> {
        PipelineRunner::new(&self.root, &self.config)
    }

    fn layout(&self) -> Result<ProfileLayout> {
        Ok(profile_layout(&self.root, &self.config)?)
    }

    fn graph_store(&self) -> Result<GraphStore> {
        Ok(GraphStore::new(self.layout()?))
    }

    pub(crate) fn ingest(&self) -> Result<Value> {
        stage_output(self.runner().ingest().context("Ingest failed")?)
    }

    pub(crate) fn import(&self, targets: &[String]) -> Result<Value> {
        stage_output(self.runner().import(targets).context("Import failed")?)
    }

    pub(crate) fn stage(&self, stage: &str, run_id: Option<&str>) -> Result<Value> {
        let result = self
            .runner()
            .run_stage(stage, run_id)
            .with_context(|| format!("Stage {stage} failed"))?;
        stage_output(result)
    }

    pub(crate) fn rebuild(&self) -> Result<Value> {
        stage_output(self.runner().rebuild().context("Rebuild failed")?)
    }

    pub(crate) fn query(&self, query: &str) -> Result<Value> {
        let layout = self.layout()?;
        let results = keyword_search(&layout, query, self.config.profile().score_rounding)?;
        Ok(json!({ "query": query, "results": results }))
    }

    pub(crate) fn node(&self, id: &str) -> Result<Value> {
        to_json(&node_view(&self.graph_store()?, id)?)
    }

    pub(crate) fn neighbors(&self, id: &str, depth: usize) -> Result<Value> {
        let adjacency = self.graph_store()?.load_adjacency()?;
        to_json(&neighbors(&adjacency, id, depth))
    }

    pub(crate) fn why_connected(&self, from_id: &str, to_id: &str) -> Result<Value> {
        let adjacency = self.graph_store()?.load_adjacency()?;
        to_json(&why_connected(&adjacency, from_id, to_id))
    }

    pub(crate) fn diff(&self, run_a: &str, run_b: &str) -> Result<Value> {
        to_json(&diff_runs(&self.layout()?, run_a, run_b)?)
    }

    pub(crate) fn export(
        &self,
        format: ExportFormat,
        output: Option<&Path>,
        batch_size: usize,
    ) -> Result<Value> {
        let output = || {
            output.map(Path::to_path_buf).unwrap_or_else(|| {
                PathBuf::from(format!("{DEFAULT_EXPORT_STEM}.{}", format.extension()))
            })
        };
        match format {
            ExportFormat::Json => to_json(
                &export_json(&self.root, &self.config, &output()).context("JSON export failed")?,
            ),
            ExportFormat::Dot => to_json(
                &export_dot(&self.root, &self.config, &output()).context("DOT export failed")?,
            ),
            ExportFormat::Records => to_json(
                &export_graph(&self.root, &self.config, batch_size)
                    .context("Graph export failed")?,
            ),
        }
    }
}

pub(crate) fn version() -> Value {
    json!({
        "version": env!("CARGO_PKG_VERSION"),
        "schema_version": ARTIFACT_SCHEMA_VERSION,
    })
}

pub(crate) fn init(root: &Path) -> Result<Value> {
    to_json(&init_workspace(root).context("Failed to initialize workspace")?)
}

pub(crate) fn schema() -> Result<Value> {
    Ok(json!({
        "entity": schemars::schema_for!(Entity),
        "claim": schemars::schema_for!(Claim),
        "link": schemars::schema_for!(Link),
        "ingest_manifest": schemars::schema_for!(IngestManifest),
        "stage_manifest": schemars::schema_for!(StageManifest),
        "provenance_record": schemars::schema_for!(ProvenanceRecord),
        "replay_log_entry": schemars::schema_for!(ReplayLogEntry),
        "stage_result": schemars::schema_for!(StageResult),
    }))
}

fn stage_output(result: StageResult) -> Result<Value> {
    log::info!("Stage {} finished: {:?}", result.stage, result.status);
    to_json(&result)
}

fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).context("Failed to serialize command output")
}
