use crate::budget::{evaluate_pkg_budget, latest_source_bytes};
use crate::compat::ensure_latest_manifest_compatibility;
use crate::config::Config;
use crate::error::Result;
use crate::paths::{ensure_within_base, resolve_path};
use crate::policy::IngestionPolicy;
use crate::recorder::{record_source, RecordedSource};
use crate::scanner::SourceScanner;
use crate::workspace::{profile_layout, profile_redactor};
use auditgraph_extract::{Extraction, Extractor, Frontmatter, SourceDocument};
use auditgraph_graph::{build_adjacency, source_cooccurrence_links};
use auditgraph_protocol::{
    deterministic_run_id, inputs_hash, records_outputs_hash, sha256_bytes, sha256_json,
    IngestManifest, IngestRecord, ProvenanceRecord, ReplayLogEntry, Stage, StageManifest,
    StageResult, ARTIFACT_SCHEMA_VERSION, EPOCH_TIMESTAMP, MANIFEST_VERSION, RULE_INGEST_SOURCE,
};
use auditgraph_redact::Redactor;
use auditgraph_search::{write_decision_index, write_vectors_index, Bm25Index};
use auditgraph_store::{
    load_ingest_manifest, load_stage_manifest, read_json_opt, resolve_run, ArtifactWriter,
    GraphStore, ProfileLayout, ProfileLock,
};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Runs one stage by name. Unknown names, and `import` (which needs targets), report
/// `not_implemented` instead of failing.
pub fn run_stage(
    stage: &str,
    root: &Path,
    config: &Config,
    run_id: Option<&str>,
) -> Result<StageResult> {
    PipelineRunner::new(root, config).run_stage(stage, run_id)
}

/// State shared by every stage of one invocation. Holding it holds the profile lock.
struct RunContext {
    root: PathBuf,
    layout: ProfileLayout,
    redactor: Redactor,
    _lock: ProfileLock,
}

impl RunContext {
    fn writer(&self) -> ArtifactWriter<'_> {
        ArtifactWriter::new(self.layout.clone(), &self.redactor)
    }
}

/// Drives the manifest chain `ingest -> normalize -> extract -> link -> index` for
/// one workspace root and configuration.
pub struct PipelineRunner<'c> {
    root: PathBuf,
    config: &'c Config,
}

impl<'c> PipelineRunner<'c> {
    pub fn new(root: impl Into<PathBuf>, config: &'c Config) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    pub fn run_stage(&self, stage: &str, run_id: Option<&str>) -> Result<StageResult> {
        let Ok(parsed) = stage.parse::<Stage>() else {
            return Ok(StageResult::not_implemented(stage));
        };
        match parsed {
            Stage::Ingest => self.ingest(),
            Stage::Rebuild => self.rebuild(),
            Stage::Import => Ok(StageResult::not_implemented(stage)),
            other => {
                let ctx = self.open()?;
                self.run_in(&ctx, other, run_id)
            }
        }
    }

    pub fn ingest(&self) -> Result<StageResult> {
        let ctx = self.open()?;
        let files = self.discover(&ctx)?;
        Ok(self.ingest_in(&ctx, Stage::Ingest, files, true)?.1)
    }

    /// Ingests explicit files or directories. Every target must resolve inside the
    /// workspace root.
    pub fn import(&self, targets: &[String]) -> Result<StageResult> {
        let ctx = self.open()?;
        let mut resolved = Vec::with_capacity(targets.len());
        for target in targets {
            resolved.push(ensure_within_base(Path::new(target), &ctx.root, "import target")?);
        }
        let scanner = SourceScanner::new(&ctx.root, &self.config.profile().exclude_globs)?;
        let files = scanner.collect(&resolved);
        Ok(self.ingest_in(&ctx, Stage::Import, files, true)?.1)
    }

    pub fn normalize(&self, run_id: Option<&str>) -> Result<StageResult> {
        let ctx = self.open()?;
        self.normalize_in(&ctx, run_id)
    }

    pub fn extract(&self, run_id: Option<&str>) -> Result<StageResult> {
        let ctx = self.open()?;
        self.extract_in(&ctx, run_id)
    }

    pub fn link(&self, run_id: Option<&str>) -> Result<StageResult> {
        let ctx = self.open()?;
        self.link_in(&ctx, run_id)
    }

    pub fn index(&self, run_id: Option<&str>) -> Result<StageResult> {
        let ctx = self.open()?;
        self.index_in(&ctx, run_id)
    }

    /// Ingest (without the compatibility check) followed by every later stage on the
    /// new run, under a single lock. Stops at the first stage that is not `ok`.
    pub fn rebuild(&self) -> Result<StageResult> {
        let ctx = self.open()?;
        let files = self.discover(&ctx)?;
        let (run_id, ingest) = self.ingest_in(&ctx, Stage::Ingest, files, false)?;
        let mut manifest = ingest.detail.get("manifest").cloned().unwrap_or(Value::Null);
        for stage in &Stage::PIPELINE[1..] {
            let result = self.run_in(&ctx, *stage, Some(&run_id))?;
            if !result.is_ok() {
                log::warn!("Rebuild stopped at {stage}: {:?}", result.status);
                return Ok(result);
            }
            manifest = result.detail.get("manifest").cloned().unwrap_or(Value::Null);
        }
        log::info!("Rebuild finished for {run_id}");
        Ok(StageResult::ok(
            Stage::Rebuild,
            json!({ "run_id": run_id, "manifest": manifest }),
        ))
    }

    fn open(&self) -> Result<RunContext> {
        let root = resolve_path(&self.root)?;
        let layout = profile_layout(&root, self.config)?;
        let lock = ProfileLock::acquire(&layout)?;
        let redactor = profile_redactor(&layout, &self.config.profile().redaction)?;
        Ok(RunContext {
            root,
            layout,
            redactor,
            _lock: lock,
        })
    }

    fn run_in(&self, ctx: &RunContext, stage: Stage, run_id: Option<&str>) -> Result<StageResult> {
        match stage {
            Stage::Normalize => self.normalize_in(ctx, run_id),
            Stage::Extract => self.extract_in(ctx, run_id),
            Stage::Link => self.link_in(ctx, run_id),
            Stage::Index => self.index_in(ctx, run_id),
            other => Ok(StageResult::not_implemented(other.as_str())),
        }
    }

    fn discover(&self, ctx: &RunContext) -> Result<Vec<PathBuf>> {
        let profile = self.config.profile();
        let scanner = SourceScanner::new(&ctx.root, &profile.exclude_globs)?;
        Ok(scanner.discover(&profile.include_paths))
    }

    fn ingest_in(
        &self,
        ctx: &RunContext,
        stage: Stage,
        files: Vec<PathBuf>,
        check_compatibility: bool,
    ) -> Result<(String, StageResult)> {
        let profile = self.config.profile();
        let selection = self.config.run_selection();
        log::info!("Starting {stage} of {} files for profile {}", files.len(), profile.name);

        if check_compatibility {
            let report =
                ensure_latest_manifest_compatibility(&ctx.layout, ARTIFACT_SCHEMA_VERSION, selection)?;
            log::debug!("Compatibility: {}", report.message);
        }

        let policy = IngestionPolicy::from_profile(profile);
        let file_count = files.len();
        let (allowed, skipped) = policy.split(files);
        let recorded: Vec<RecordedSource> = allowed
            .iter()
            .chain(&skipped)
            .map(|path| record_source(path, &ctx.root, &policy))
            .collect();

        let records: Vec<IngestRecord> = recorded.iter().map(|source| source.record.clone()).collect();
        let run_source_bytes: u64 = records
            .iter()
            .filter(|record| record.is_ok())
            .map(|record| record.size)
            .sum();
        let source_bytes = run_source_bytes.max(latest_source_bytes(&ctx.layout, selection)?);
        let written_bytes = estimated_ingest_bytes(&recorded, &records, &self.config.snapshot())?;
        let budget =
            evaluate_pkg_budget(&ctx.layout, source_bytes, written_bytes, &profile.budget)?
                .enforce()?;

        let inputs_hash = inputs_hash(records.iter().map(|record| record.source_hash.as_str()));
        let config_hash = self.config.config_hash()?;
        let run_id = deterministic_run_id(&inputs_hash, &config_hash);

        let mut writer = ctx.writer();
        let mut artifacts = BTreeSet::new();
        for source in &recorded {
            let Some(metadata) = &source.metadata else {
                continue;
            };
            let path = ctx.layout.source_metadata_path(&source.record.source_hash);
            if artifacts.contains(&ctx.layout.relative(&path)) {
                continue;
            }
            artifacts.insert(writer.write_json(&path, metadata)?);
        }
        writer.write_config_snapshot(&run_id, &self.config.snapshot())?;

        let outputs_hash = records_outputs_hash(&records)?;
        let ingested_count = records.iter().filter(|record| record.is_ok()).count();
        let skipped_count = records.len() - ingested_count;
        let manifest = IngestManifest {
            version: MANIFEST_VERSION.to_string(),
            schema_version: ARTIFACT_SCHEMA_VERSION.to_string(),
            stage: stage.as_str().to_string(),
            run_id: run_id.clone(),
            started_at: EPOCH_TIMESTAMP.to_string(),
            finished_at: EPOCH_TIMESTAMP.to_string(),
            pipeline_version: self.config.pipeline_version().to_string(),
            config_hash: config_hash.clone(),
            inputs_hash: inputs_hash.clone(),
            outputs_hash: outputs_hash.clone(),
            status: "ok".to_string(),
            artifacts: artifacts.into_iter().collect(),
            records,
            ingested_count,
            skipped_count,
        };
        let manifest_path = writer.write_ingest_manifest(&manifest)?;
        writer.upsert_replay_entry(&ReplayLogEntry {
            stage: stage.as_str().to_string(),
            run_id: run_id.clone(),
            inputs_hash,
            outputs_hash,
            config_hash,
            inputs: Some(manifest.records.len()),
            pipeline_version: Some(manifest.pipeline_version.clone()),
        })?;
        writer.record_run(&run_id)?;

        let provenance = manifest
            .records
            .iter()
            .filter(|record| record.is_ok())
            .map(|record| ProvenanceRecord {
                artifact_id: record.source_hash.clone(),
                source_path: record.path.clone(),
                source_hash: record.source_hash.clone(),
                rule_id: RULE_INGEST_SOURCE.to_string(),
                input_hash: record.source_hash.clone(),
                run_id: run_id.clone(),
            })
            .collect();
        writer.append_provenance(&run_id, provenance)?;

        log::info!(
            "{stage} {run_id}: {ingested_count} ingested, {skipped_count} skipped ({})",
            budget.message
        );
        let mut detail = self.detail(&run_id, &manifest_path);
        detail["files"] = json!(file_count);
        detail["ingested_count"] = json!(ingested_count);
        detail["skipped_count"] = json!(skipped_count);
        detail["budget"] = serde_json::to_value(&budget)?;
        Ok((run_id, StageResult::ok(stage, detail)))
    }

    fn normalize_in(&self, ctx: &RunContext, run_id: Option<&str>) -> Result<StageResult> {
        let Some(run_id) = resolve_run(&ctx.layout, run_id, Stage::Ingest, self.config.run_selection())?
        else {
            return Ok(StageResult::missing_manifest(Stage::Normalize, None));
        };
        let Some(ingest) = load_ingest_manifest(&ctx.layout, &run_id)? else {
            return Ok(StageResult::missing_manifest(Stage::Normalize, Some(&run_id)));
        };

        let mut writer = ctx.writer();
        let manifest = self.stage_manifest(
            Stage::Normalize,
            &run_id,
            ingest.outputs_hash.clone(),
            ingest.outputs_hash,
            ingest.config_hash,
            ingest.artifacts,
        );
        let path = self.finish_stage(&mut writer, manifest)?;
        Ok(StageResult::ok(Stage::Normalize, self.detail(&run_id, &path)))
    }

    fn extract_in(&self, ctx: &RunContext, run_id: Option<&str>) -> Result<StageResult> {
        let Some(run_id) = resolve_run(&ctx.layout, run_id, Stage::Ingest, self.config.run_selection())?
        else {
            return Ok(StageResult::missing_manifest(Stage::Extract, None));
        };
        let Some(ingest) = load_ingest_manifest(&ctx.layout, &run_id)? else {
            return Ok(StageResult::missing_manifest(Stage::Extract, Some(&run_id)));
        };
        log::info!("Starting extract for {run_id}");

        let extractor = Extractor::new(self.config.pipeline_version())?;
        let mut extraction = Extraction::new();
        for record in ingest.records.iter().filter(|record| record.is_ok()) {
            if let Some(doc) = load_document(ctx, record)? {
                extractor.extract(&doc, &mut extraction);
            }
        }

        let mut writer = ctx.writer();
        let mut artifacts = Vec::new();
        let mut provenance = Vec::new();
        for entity in extraction.entities() {
            artifacts.push(writer.write_entity(entity)?);
            for source_ref in &entity.refs {
                provenance.push(ProvenanceRecord {
                    artifact_id: entity.id.clone(),
                    source_path: source_ref.source_path.clone(),
                    source_hash: source_ref.source_hash.clone(),
                    rule_id: entity.provenance.created_by_rule.clone(),
                    input_hash: source_ref.source_hash.clone(),
                    run_id: run_id.clone(),
                });
            }
        }
        for claim in extraction.claims() {
            artifacts.push(writer.write_claim(claim)?);
            provenance.push(ProvenanceRecord {
                artifact_id: claim.id.clone(),
                source_path: claim.provenance.source_file.clone(),
                source_hash: claim.provenance.source_hash.clone(),
                rule_id: claim.provenance.extractor_rule_id.clone(),
                input_hash: claim.id.clone(),
                run_id: run_id.clone(),
            });
        }
        if extraction.has_decisions() {
            artifacts.push(write_decision_index(&mut writer, &extraction.decision_index())?);
        }
        writer.append_provenance(&run_id, provenance)?;

        let manifest = self.stage_manifest(
            Stage::Extract,
            &run_id,
            ingest.outputs_hash,
            extraction.outputs_hash()?,
            ingest.config_hash,
            artifacts,
        );
        let path = self.finish_stage(&mut writer, manifest)?;
        log::info!(
            "Extracted {} entities and {} claims for {run_id}",
            extraction.entity_count(),
            extraction.claim_count()
        );
        let mut detail = self.detail(&run_id, &path);
        detail["entities"] = json!(extraction.entity_count());
        detail["claims"] = json!(extraction.claim_count());
        Ok(StageResult::ok(Stage::Extract, detail))
    }

    fn link_in(&self, ctx: &RunContext, run_id: Option<&str>) -> Result<StageResult> {
        let Some(run_id) = resolve_run(&ctx.layout, run_id, Stage::Extract, self.config.run_selection())?
        else {
            return Ok(StageResult::missing_manifest(Stage::Link, None));
        };
        let Some(upstream) = load_stage_manifest(&ctx.layout, &run_id, Stage::Extract)? else {
            return Ok(StageResult::missing_manifest(Stage::Link, Some(&run_id)));
        };

        let entities = GraphStore::new(ctx.layout.clone()).load_entities()?;
        let links = source_cooccurrence_links(&entities);
        let adjacency = build_adjacency(&links);

        let mut writer = ctx.writer();
        let mut artifacts = Vec::with_capacity(links.len() + 1);
        let mut provenance = Vec::with_capacity(links.len());
        for link in &links {
            artifacts.push(writer.write_link(link)?);
            if let Some(evidence) = link.evidence.first() {
                provenance.push(ProvenanceRecord {
                    artifact_id: link.id.clone(),
                    source_path: evidence.source_path.clone(),
                    source_hash: evidence.source_hash.clone(),
                    rule_id: link.rule_id.clone(),
                    input_hash: evidence.source_hash.clone(),
                    run_id: run_id.clone(),
                });
            }
        }
        artifacts.push(writer.write_adjacency(&adjacency)?);
        writer.append_provenance(&run_id, provenance)?;

        let outputs_hash = sha256_json(&json!({
            "links": links.iter().map(|link| link.id.as_str()).collect::<Vec<_>>(),
            "adjacency": adjacency.keys().collect::<Vec<_>>(),
        }))?;
        let manifest = self.stage_manifest(
            Stage::Link,
            &run_id,
            upstream.outputs_hash,
            outputs_hash,
            upstream.config_hash,
            artifacts,
        );
        let path = self.finish_stage(&mut writer, manifest)?;
        log::info!("Linked {} entities with {} links for {run_id}", entities.len(), links.len());
        let mut detail = self.detail(&run_id, &path);
        detail["links"] = json!(links.len());
        Ok(StageResult::ok(Stage::Link, detail))
    }

    fn index_in(&self, ctx: &RunContext, run_id: Option<&str>) -> Result<StageResult> {
        let Some(run_id) = resolve_run(&ctx.layout, run_id, Stage::Link, self.config.run_selection())?
        else {
            return Ok(StageResult::missing_manifest(Stage::Index, None));
        };
        let Some(upstream) = load_stage_manifest(&ctx.layout, &run_id, Stage::Link)? else {
            return Ok(StageResult::missing_manifest(Stage::Index, Some(&run_id)));
        };

        let entities = GraphStore::new(ctx.layout.clone()).load_entities()?;
        let mut writer = ctx.writer();
        let bm25_path = Bm25Index::build(&entities).write(&mut writer)?;
        let vectors_path = if self.config.profile().semantic_enabled {
            Some(write_vectors_index(&mut writer)?)
        } else {
            None
        };
        let outputs_hash = sha256_json(&json!({ "bm25": bm25_path, "semantic": vectors_path }))?;

        let mut artifacts = vec![bm25_path];
        artifacts.extend(vectors_path);
        let manifest = self.stage_manifest(
            Stage::Index,
            &run_id,
            upstream.outputs_hash,
            outputs_hash,
            upstream.config_hash,
            artifacts,
        );
        let path = self.finish_stage(&mut writer, manifest)?;
        log::info!("Indexed {} entities for {run_id}", entities.len());
        Ok(StageResult::ok(Stage::Index, self.detail(&run_id, &path)))
    }

    fn stage_manifest(
        &self,
        stage: Stage,
        run_id: &str,
        inputs_hash: String,
        outputs_hash: String,
        config_hash: String,
        mut artifacts: Vec<String>,
    ) -> StageManifest {
        artifacts.sort();
        artifacts.dedup();
        StageManifest {
            version: MANIFEST_VERSION.to_string(),
            stage: stage.as_str().to_string(),
            run_id: run_id.to_string(),
            inputs_hash,
            outputs_hash,
            config_hash,
            pipeline_version: self.config.pipeline_version().to_string(),
            status: "ok".to_string(),
            started_at: EPOCH_TIMESTAMP.to_string(),
            finished_at: EPOCH_TIMESTAMP.to_string(),
            artifacts,
        }
    }

    /// Writes the stage manifest and its replay-log line; returns the manifest path.
    fn finish_stage(&self, writer: &mut ArtifactWriter<'_>, manifest: StageManifest) -> Result<String> {
        let stage: Stage = manifest.stage.parse()?;
        let path = writer.write_stage_manifest(stage, &manifest)?;
        writer.upsert_replay_entry(&ReplayLogEntry {
            stage: manifest.stage,
            run_id: manifest.run_id,
            inputs_hash: manifest.inputs_hash,
            outputs_hash: manifest.outputs_hash,
            config_hash: manifest.config_hash,
            inputs: None,
            pipeline_version: Some(manifest.pipeline_version),
        })?;
        Ok(path)
    }

    fn detail(&self, run_id: &str, manifest_path: &str) -> Value {
        json!({
            "manifest": manifest_path,
            "profile": self.config.active_profile(),
            "run_id": run_id,
        })
    }
}

/// Bytes an ingest is about to write: one metadata file per unique hash, the manifest
/// records and the config snapshot.
fn estimated_ingest_bytes(
    recorded: &[RecordedSource],
    records: &[IngestRecord],
    snapshot: &Value,
) -> Result<u64> {
    let mut seen = BTreeSet::new();
    let mut total = 0u64;
    for source in recorded {
        let Some(metadata) = &source.metadata else {
            continue;
        };
        if seen.insert(source.record.source_hash.as_str()) {
            total += serde_json::to_vec(metadata)?.len() as u64;
        }
    }
    total += serde_json::to_vec(records)?.len() as u64;
    total += serde_json::to_vec(snapshot)?.len() as u64;
    Ok(total)
}

/// Re-reads a recorded source for extraction. Files that vanished or changed since
/// ingest are skipped with a warning; recorded front matter replaces the parsed block.
fn load_document(ctx: &RunContext, record: &IngestRecord) -> Result<Option<SourceDocument>> {
    let path = ctx.root.join(&record.path);
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(err) => {
            log::warn!("Skipping {}: {err}", record.path);
            return Ok(None);
        }
    };
    if sha256_bytes(&bytes) != record.source_hash {
        log::warn!("Skipping {}: content changed since ingest", record.path);
        return Ok(None);
    }

    let text = String::from_utf8_lossy(&bytes).into_owned();
    let mut doc = SourceDocument::new(record.path.clone(), record.source_hash.clone(), text);
    let metadata: Option<Value> = read_json_opt(&ctx.layout.source_metadata_path(&record.source_hash))?;
    if let Some(frontmatter) = metadata
        .and_then(|mut metadata| metadata.get_mut("frontmatter").map(Value::take))
        .and_then(|value| serde_json::from_value::<Frontmatter>(value).ok())
    {
        doc = doc.with_frontmatter(frontmatter);
    }
    Ok(Some(doc))
}
