use crate::io::{read_json, read_json_opt};
use crate::{ArtifactWriter, ProfileLayout, Result};
use auditgraph_protocol::{canonical_json, IngestManifest, ReplayLogEntry, Stage, StageManifest};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;

/// How "the latest run" is chosen when a stage is invoked without a run id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunSelection {
    /// Greatest run directory name. Run ids are hashes, so this is not time order.
    #[default]
    Lexicographic,
    /// Last run appended to `runs/index.json` by an ingest.
    Recorded,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIndex {
    #[serde(default)]
    pub runs: Vec<String>,
}

impl ArtifactWriter<'_> {
    pub fn write_ingest_manifest(&mut self, manifest: &IngestManifest) -> Result<String> {
        let path = self.layout().manifest_path(&manifest.run_id, Stage::Ingest);
        self.write_json(&path, manifest)
    }

    pub fn write_stage_manifest(&mut self, stage: Stage, manifest: &StageManifest) -> Result<String> {
        let path = self.layout().manifest_path(&manifest.run_id, stage);
        self.write_json(&path, manifest)
    }

    pub fn write_config_snapshot(&mut self, run_id: &str, snapshot: &Value) -> Result<String> {
        let path = self.layout().config_snapshot_path(run_id);
        self.write_json(&path, snapshot)
    }

    /// Keeps one line per stage in pipeline order, replacing a previous line for the
    /// same stage, so re-running a stage does not grow the log.
    pub fn upsert_replay_entry(&mut self, entry: &ReplayLogEntry) -> Result<String> {
        let path = self.layout().replay_log_path(&entry.run_id);
        let mut entries: Vec<ReplayLogEntry> = load_replay_log(self.layout(), &entry.run_id)?
            .into_iter()
            .filter(|existing| existing.stage != entry.stage)
            .collect();
        entries.push(self.redact_record(entry)?);
        entries.sort_by_key(|e| stage_rank(&e.stage));

        let mut text = String::new();
        for entry in &entries {
            text.push_str(&canonical_json(entry)?);
            text.push('\n');
        }
        self.write_text(&path, &text)
    }

    /// Moves `run_id` to the end of `runs/index.json`.
    pub fn record_run(&mut self, run_id: &str) -> Result<()> {
        let path = self.layout().run_index_path();
        let mut index: RunIndex = read_json_opt(&path)?.unwrap_or_default();
        if index.runs.last().map(String::as_str) == Some(run_id) {
            return Ok(());
        }
        index.runs.retain(|existing| existing != run_id);
        index.runs.push(run_id.to_string());
        self.write_json(&path, &index)?;
        Ok(())
    }
}

fn stage_rank(stage: &str) -> usize {
    match stage.parse::<Stage>() {
        Ok(Stage::Import) => 0,
        Ok(stage) => Stage::PIPELINE
            .iter()
            .position(|s| *s == stage)
            .unwrap_or(Stage::PIPELINE.len()),
        Err(_) => Stage::PIPELINE.len(),
    }
}

pub fn load_ingest_manifest(layout: &ProfileLayout, run_id: &str) -> Result<Option<IngestManifest>> {
    read_json_opt(&layout.manifest_path(run_id, Stage::Ingest))
}

/// Untyped view, for callers that must inspect manifests written by other versions.
pub fn load_ingest_manifest_value(layout: &ProfileLayout, run_id: &str) -> Result<Option<Value>> {
    read_json_opt(&layout.manifest_path(run_id, Stage::Ingest))
}

pub fn load_stage_manifest(
    layout: &ProfileLayout,
    run_id: &str,
    stage: Stage,
) -> Result<Option<StageManifest>> {
    read_json_opt(&layout.manifest_path(run_id, stage))
}

pub fn load_replay_log(layout: &ProfileLayout, run_id: &str) -> Result<Vec<ReplayLogEntry>> {
    let path = layout.replay_log_path(run_id);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let text = fs::read_to_string(&path)?;
    let mut entries = Vec::new();
    for line in text.lines().filter(|line| !line.trim().is_empty()) {
        entries.push(serde_json::from_str(line)?);
    }
    Ok(entries)
}

pub fn load_run_index(layout: &ProfileLayout) -> Result<RunIndex> {
    let path = layout.run_index_path();
    if !path.exists() {
        return Ok(RunIndex::default());
    }
    read_json(&path)
}

/// Run ids whose directory holds the manifest of `stage`, sorted ascending.
pub fn runs_with_manifest(layout: &ProfileLayout, stage: Stage) -> Result<Vec<String>> {
    let runs_dir = layout.runs_dir();
    if !runs_dir.exists() {
        return Ok(Vec::new());
    }
    let mut runs = Vec::new();
    for entry in fs::read_dir(&runs_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let run_id = entry.file_name().to_string_lossy().into_owned();
        if layout.manifest_path(&run_id, stage).exists() {
            runs.push(run_id);
        }
    }
    runs.sort();
    Ok(runs)
}

/// Picks the run a stage should operate on. An explicit id always wins; otherwise
/// the latest run holding the `required` manifest is chosen by `selection`.
pub fn resolve_run(
    layout: &ProfileLayout,
    requested: Option<&str>,
    required: Stage,
    selection: RunSelection,
) -> Result<Option<String>> {
    if let Some(run_id) = requested.filter(|id| !id.is_empty()) {
        return Ok(Some(run_id.to_string()));
    }
    let candidates = runs_with_manifest(layout, required)?;
    match selection {
        RunSelection::Lexicographic => Ok(candidates.last().cloned()),
        RunSelection::Recorded => {
            let index = load_run_index(layout)?;
            let recorded = index
                .runs
                .iter()
                .rev()
                .find(|run_id| candidates.contains(run_id))
                .cloned();
            if recorded.is_none() && !candidates.is_empty() {
                log::debug!("Run index has no usable entry; falling back to lexicographic selection");
                return Ok(candidates.last().cloned());
            }
            Ok(recorded)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auditgraph_redact::Redactor;
    use pretty_assertions::assert_eq;

    fn stage_manifest(run_id: &str, stage: Stage) -> StageManifest {
        StageManifest {
            version: "v1".into(),
            stage: stage.as_str().into(),
            run_id: run_id.into(),
            inputs_hash: "in".into(),
            outputs_hash: "out".into(),
            config_hash: "cfg".into(),
            pipeline_version: "v0.1.0".into(),
            status: "ok".into(),
            started_at: "1970-01-01T00:00:00Z".into(),
            finished_at: "1970-01-01T00:00:00Z".into(),
            artifacts: vec![],
        }
    }

    fn replay(run_id: &str, stage: &str, outputs: &str) -> ReplayLogEntry {
        ReplayLogEntry {
            stage: stage.into(),
            run_id: run_id.into(),
            inputs_hash: "in".into(),
            outputs_hash: outputs.into(),
            config_hash: "cfg".into(),
            inputs: None,
            pipeline_version: None,
        }
    }

    #[test]
    fn replay_log_keeps_one_line_per_stage_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ProfileLayout::at(dir.path());
        let redactor = Redactor::disabled();
        let mut writer = ArtifactWriter::new(layout.clone(), &redactor);

        writer.upsert_replay_entry(&replay("run_1", "extract", "a")).unwrap();
        writer.upsert_replay_entry(&replay("run_1", "ingest", "b")).unwrap();
        writer.upsert_replay_entry(&replay("run_1", "extract", "c")).unwrap();

        let entries = load_replay_log(&layout, "run_1").unwrap();
        let stages: Vec<(&str, &str)> = entries
            .iter()
            .map(|e| (e.stage.as_str(), e.outputs_hash.as_str()))
            .collect();
        assert_eq!(stages, vec![("ingest", "b"), ("extract", "c")]);

        let raw = fs::read_to_string(layout.replay_log_path("run_1")).unwrap();
        assert_eq!(raw.lines().count(), 2);
        assert!(raw.lines().all(|line| line.starts_with("{\"config_hash\"")));
    }

    #[test]
    fn lexicographic_selection_requires_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ProfileLayout::at(dir.path());
        let redactor = Redactor::disabled();
        let mut writer = ArtifactWriter::new(layout.clone(), &redactor);

        writer
            .write_stage_manifest(Stage::Extract, &stage_manifest("run_a", Stage::Extract))
            .unwrap();
        fs::create_dir_all(layout.run_dir("run_z")).unwrap();

        let resolved =
            resolve_run(&layout, None, Stage::Extract, RunSelection::Lexicographic).unwrap();
        assert_eq!(resolved.as_deref(), Some("run_a"));
        assert_eq!(
            resolve_run(&layout, None, Stage::Link, RunSelection::Lexicographic).unwrap(),
            None
        );
        assert_eq!(
            resolve_run(&layout, Some("run_q"), Stage::Link, RunSelection::Lexicographic)
                .unwrap()
                .as_deref(),
            Some("run_q")
        );
    }

    #[test]
    fn recorded_selection_follows_run_index() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ProfileLayout::at(dir.path());
        let redactor = Redactor::disabled();
        let mut writer = ArtifactWriter::new(layout.clone(), &redactor);

        for run in ["run_b", "run_a"] {
            writer
                .write_stage_manifest(Stage::Link, &stage_manifest(run, Stage::Link))
                .unwrap();
            writer.record_run(run).unwrap();
        }

        assert_eq!(
            resolve_run(&layout, None, Stage::Link, RunSelection::Recorded)
                .unwrap()
                .as_deref(),
            Some("run_a")
        );
        assert_eq!(
            resolve_run(&layout, None, Stage::Link, RunSelection::Lexicographic)
                .unwrap()
                .as_deref(),
            Some("run_b")
        );

        writer.record_run("run_b").unwrap();
        assert_eq!(load_run_index(&layout).unwrap().runs, vec!["run_a", "run_b"]);
    }
}
