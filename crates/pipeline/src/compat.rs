use crate::error::{PipelineError, Result};
use auditgraph_protocol::Stage;
use auditgraph_store::{load_ingest_manifest_value, resolve_run, ProfileLayout, RunSelection};
use serde::Serialize;

pub const NO_PRIOR_MANIFESTS: &str = "No prior manifests found";
pub const MISSING_SCHEMA_VERSION: &str = "Missing schema_version in manifest; rebuild required";
pub const INCOMPATIBLE_SCHEMA_VERSION: &str = "Incompatible schema_version detected; rebuild required";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompatibilityReport {
    pub current: String,
    pub existing: Option<String>,
    pub message: String,
}

/// Checks the latest ingest manifest against `current`. A missing or different
/// `schema_version` is a [`PipelineError::Compatibility`]; no manifest at all is fine.
pub fn ensure_latest_manifest_compatibility(
    layout: &ProfileLayout,
    current: &str,
    selection: RunSelection,
) -> Result<CompatibilityReport> {
    let report = |existing: Option<String>, message: &str| CompatibilityReport {
        current: current.to_string(),
        existing,
        message: message.to_string(),
    };

    let Some(run_id) = resolve_run(layout, None, Stage::Ingest, selection)? else {
        return Ok(report(None, NO_PRIOR_MANIFESTS));
    };
    let Some(manifest) = load_ingest_manifest_value(layout, &run_id)? else {
        return Ok(report(None, NO_PRIOR_MANIFESTS));
    };

    let existing = manifest
        .get("schema_version")
        .and_then(|value| value.as_str())
        .map(str::to_string);
    let message = match existing.as_deref() {
        None => MISSING_SCHEMA_VERSION,
        Some(version) if version != current => INCOMPATIBLE_SCHEMA_VERSION,
        Some(_) => return Ok(report(existing, "Compatible")),
    };
    Err(PipelineError::Compatibility {
        message: message.to_string(),
        current: current.to_string(),
        existing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use auditgraph_store::write_json_value;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn layout_with_manifest(manifest: serde_json::Value) -> (tempfile::TempDir, ProfileLayout) {
        let dir = tempfile::tempdir().unwrap();
        let layout = ProfileLayout::at(dir.path());
        write_json_value(&layout.manifest_path("run_1", Stage::Ingest), manifest).unwrap();
        (dir, layout)
    }

    #[test]
    fn empty_profile_is_compatible() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ProfileLayout::at(dir.path());
        let report =
            ensure_latest_manifest_compatibility(&layout, "v1", RunSelection::Lexicographic).unwrap();
        assert_eq!(report.message, NO_PRIOR_MANIFESTS);
    }

    #[test]
    fn matching_version_passes() {
        let (_dir, layout) = layout_with_manifest(json!({"schema_version": "v1"}));
        let report =
            ensure_latest_manifest_compatibility(&layout, "v1", RunSelection::Lexicographic).unwrap();
        assert_eq!(report.existing.as_deref(), Some("v1"));
    }

    #[test]
    fn different_version_requires_rebuild() {
        let (_dir, layout) = layout_with_manifest(json!({"schema_version": "v0"}));
        let err = ensure_latest_manifest_compatibility(&layout, "v1", RunSelection::Lexicographic)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Incompatible schema_version detected; rebuild required. Current=v1, Existing=v0. \
             Run 'auditgraph rebuild' to regenerate artifacts."
        );
    }

    #[test]
    fn missing_version_requires_rebuild() {
        let (_dir, layout) = layout_with_manifest(json!({"run_id": "run_1"}));
        let err = ensure_latest_manifest_compatibility(&layout, "v1", RunSelection::Lexicographic)
            .unwrap_err();
        assert!(err.to_string().contains("Existing=unknown"));
    }
}
