use auditgraph_pipeline::{run_stage, Config, PipelineRunner};
use auditgraph_protocol::{canonical_key, entity_id, sha256_file, Stage, StageStatus};
use auditgraph_search::diff_runs;
use auditgraph_store::{
    load_ingest_manifest, load_provenance, load_replay_log, load_stage_manifest, GraphStore,
    ProfileLayout,
};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().expect("parent")).expect("create dirs");
    fs::write(path, text).expect("write file");
}

fn layout(root: &Path) -> ProfileLayout {
    ProfileLayout::for_profile(&root.canonicalize().expect("canonical root"), "default")
        .expect("layout")
}

fn run_id(detail: &serde_json::Value) -> String {
    detail["run_id"].as_str().expect("run_id").to_string()
}

#[test]
fn smoke_note_is_ingested() {
    let temp = TempDir::new().expect("tempdir");
    write(temp.path(), "notes/smoke.md", "---\ntitle: Smoke Note\n---\nBody\n");
    let config = Config::default();

    let result = PipelineRunner::new(temp.path(), &config).ingest().expect("ingest");
    assert_eq!(result.status, StageStatus::Ok);
    assert_eq!(result.detail["ingested_count"], 1);
    assert_eq!(result.detail["skipped_count"], 0);
    assert_eq!(result.detail["profile"], "default");

    let hash = sha256_file(&temp.path().join("notes/smoke.md")).expect("hash");
    let layout = layout(temp.path());
    assert!(layout.source_metadata_path(&hash).exists());

    let manifest = load_ingest_manifest(&layout, &run_id(&result.detail))
        .expect("load")
        .expect("manifest");
    assert_eq!(manifest.schema_version, "v1");
    assert_eq!(manifest.started_at, "1970-01-01T00:00:00Z");
    assert_eq!(manifest.artifacts, vec![format!("sources/{hash}.json")]);
}

#[test]
fn repeated_ingest_is_deterministic() {
    let temp = TempDir::new().expect("tempdir");
    write(temp.path(), "notes/a.md", "# A\n");
    write(temp.path(), "notes/b.md", "# B\n");
    write(temp.path(), "repos/tool/run.py", "def main():\n    pass\n");
    let config = Config::default();
    let runner = PipelineRunner::new(temp.path(), &config);

    let first = runner.ingest().expect("first ingest");
    let second = runner.ingest().expect("second ingest");
    assert_eq!(run_id(&first.detail), run_id(&second.detail));

    let layout = layout(temp.path());
    let manifest = load_ingest_manifest(&layout, &run_id(&first.detail))
        .expect("load")
        .expect("manifest");
    assert_eq!(manifest.ingested_count, 3);
    let paths: Vec<&str> = manifest.records.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(paths, vec!["notes/a.md", "notes/b.md", "repos/tool/run.py"]);
    assert_eq!(load_replay_log(&layout, &manifest.run_id).expect("replay").len(), 1);
}

#[test]
fn diff_reports_added_file() {
    let temp = TempDir::new().expect("tempdir");
    write(temp.path(), "notes/a.md", "# A\n");
    write(temp.path(), "notes/b.md", "# B\n");
    let config = Config::default();
    let runner = PipelineRunner::new(temp.path(), &config);

    let before = run_id(&runner.ingest().expect("ingest").detail);
    write(temp.path(), "notes/c.md", "# C\n");
    let after = run_id(&runner.ingest().expect("ingest").detail);
    assert_ne!(before, after);

    let diff = diff_runs(&layout(temp.path()), &before, &after).expect("diff");
    assert_eq!(diff.added, Some(vec!["notes/c.md".to_string()]));
    assert_eq!(diff.removed, Some(vec![]));
}

#[test]
fn unsupported_files_are_recorded_as_skipped() {
    let temp = TempDir::new().expect("tempdir");
    write(temp.path(), "notes/a.md", "# A\n");
    write(temp.path(), "notes/blob.bin", "\u{0}\u{1}");
    let config = Config::default();

    let result = PipelineRunner::new(temp.path(), &config).ingest().expect("ingest");
    assert_eq!(result.detail["files"], 2);
    assert_eq!(result.detail["ingested_count"], 1);
    assert_eq!(result.detail["skipped_count"], 1);

    let manifest = load_ingest_manifest(&layout(temp.path()), &run_id(&result.detail))
        .expect("load")
        .expect("manifest");
    let skipped = manifest
        .records
        .iter()
        .find(|r| r.path == "notes/blob.bin")
        .expect("skipped record");
    assert_eq!(skipped.skip_reason.as_deref(), Some("unsupported_extension"));
    assert_eq!(skipped.parser_id, "text/unknown");
}

#[test]
fn stages_without_upstream_report_missing_manifest() {
    let temp = TempDir::new().expect("tempdir");
    let config = Config::default();
    for stage in ["normalize", "extract", "link", "index"] {
        let result = run_stage(stage, temp.path(), &config, None).expect("run stage");
        assert_eq!(result.status, StageStatus::MissingManifest, "{stage}");
        assert_eq!(result.stage, stage);
    }
    let unknown = run_stage("publish", temp.path(), &config, None).expect("run stage");
    assert_eq!(unknown.status, StageStatus::NotImplemented);
}

#[test]
fn rebuild_runs_every_stage_and_chains_hashes() {
    let temp = TempDir::new().expect("tempdir");
    write(
        temp.path(),
        "notes/alpha.md",
        "---\ntitle: Alpha\ntags: [ops, infra]\n---\nAlpha body\n",
    );
    write(temp.path(), "notes/adr-001.md", "# Use Postgres\n\nWe decided.\n");
    write(temp.path(), "notes/run.log", "ok\nERROR disk full\n");
    let config = Config::default();

    let result = PipelineRunner::new(temp.path(), &config).rebuild().expect("rebuild");
    assert_eq!(result.stage, "rebuild");
    assert_eq!(result.status, StageStatus::Ok);
    let run = run_id(&result.detail);
    assert_eq!(
        result.detail["manifest"],
        format!("runs/{run}/index-manifest.json")
    );

    let layout = layout(temp.path());
    let ingest = load_ingest_manifest(&layout, &run).expect("load").expect("ingest");
    let normalize = load_stage_manifest(&layout, &run, Stage::Normalize)
        .expect("load")
        .expect("normalize");
    let extract = load_stage_manifest(&layout, &run, Stage::Extract)
        .expect("load")
        .expect("extract");
    let link = load_stage_manifest(&layout, &run, Stage::Link).expect("load").expect("link");
    let index = load_stage_manifest(&layout, &run, Stage::Index).expect("load").expect("index");

    assert_eq!(normalize.inputs_hash, ingest.outputs_hash);
    assert_eq!(normalize.outputs_hash, ingest.outputs_hash);
    assert_eq!(normalize.artifacts, ingest.artifacts);
    assert_eq!(extract.inputs_hash, ingest.outputs_hash);
    assert_eq!(link.inputs_hash, extract.outputs_hash);
    assert_eq!(index.inputs_hash, link.outputs_hash);
    assert_eq!(index.config_hash, ingest.config_hash);
    assert!(layout.bm25_index_path().exists());
    assert!(layout.decisions_index_path().exists());
    assert!(!layout.vectors_index_path().exists());

    let stages: Vec<String> = load_replay_log(&layout, &run)
        .expect("replay")
        .into_iter()
        .map(|entry| entry.stage)
        .collect();
    assert_eq!(stages, vec!["ingest", "normalize", "extract", "link", "index"]);

    let provenance = load_provenance(&layout, &run).expect("provenance");
    assert!(provenance.iter().any(|p| p.rule_id == "ingest.source.v1"));
    assert!(provenance.iter().any(|p| p.rule_id == "extract.note.v1"));
    assert!(provenance.iter().any(|p| p.rule_id == "link.source_cooccurrence.v1"));

    let store = GraphStore::new(layout.clone());
    let claims = store.load_claims().expect("claims");
    assert!(claims.iter().any(|c| c.claim_type == "decision"));
    assert!(claims.iter().any(|c| c.claim_type == "error_signature"));
}

#[test]
fn note_and_tags_are_linked_symmetrically() {
    let temp = TempDir::new().expect("tempdir");
    write(
        temp.path(),
        "notes/alpha.md",
        "---\ntitle: Alpha\ntags: [ops]\n---\n",
    );
    let config = Config::default();
    let result = PipelineRunner::new(temp.path(), &config).rebuild().expect("rebuild");
    assert!(result.is_ok());

    let note = entity_id(&canonical_key("note", "Alpha"));
    let tag = entity_id(&canonical_key("tag", "ops"));
    let adjacency = GraphStore::new(layout(temp.path()))
        .load_adjacency()
        .expect("adjacency");

    let from_note: Vec<&str> = adjacency[&note].iter().map(|e| e.to_id.as_str()).collect();
    let from_tag: Vec<&str> = adjacency[&tag].iter().map(|e| e.to_id.as_str()).collect();
    assert_eq!(from_note, vec![tag.as_str()]);
    assert_eq!(from_tag, vec![note.as_str()]);
}

#[test]
fn rebuild_twice_reproduces_every_hash() {
    let temp = TempDir::new().expect("tempdir");
    write(temp.path(), "notes/alpha.md", "---\ntitle: Alpha\ntags: [ops]\n---\n");
    write(temp.path(), "repos/app/main.js", "function start() {}\nclass App {}\n");
    let config = Config::default();
    let runner = PipelineRunner::new(temp.path(), &config);

    let first = run_id(&runner.rebuild().expect("rebuild").detail);
    let layout = layout(temp.path());
    let before = load_replay_log(&layout, &first).expect("replay");
    let second = run_id(&runner.rebuild().expect("rebuild").detail);
    let after = load_replay_log(&layout, &second).expect("replay");

    assert_eq!(first, second);
    assert_eq!(before, after);
}
