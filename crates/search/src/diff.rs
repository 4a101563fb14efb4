use crate::error::Result;
use auditgraph_store::{load_ingest_manifest_value, ProfileLayout};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffStatus {
    Ok,
    MissingManifest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunDiff {
    pub status: DiffStatus,
    pub run_a: String,
    pub run_b: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed: Option<Vec<String>>,
}

/// Compares the ingest records of two runs by path. `changed` lists paths whose full
/// record differs, modification time included.
pub fn diff_runs(layout: &ProfileLayout, run_a: &str, run_b: &str) -> Result<RunDiff> {
    let (Some(manifest_a), Some(manifest_b)) = (
        load_ingest_manifest_value(layout, run_a)?,
        load_ingest_manifest_value(layout, run_b)?,
    ) else {
        return Ok(RunDiff {
            status: DiffStatus::MissingManifest,
            run_a: run_a.to_string(),
            run_b: run_b.to_string(),
            added: None,
            removed: None,
            changed: None,
        });
    };

    let records_a = records_by_path(&manifest_a);
    let records_b = records_by_path(&manifest_b);

    let added = records_b
        .keys()
        .filter(|path| !records_a.contains_key(*path))
        .map(|path| path.to_string())
        .collect();
    let removed = records_a
        .keys()
        .filter(|path| !records_b.contains_key(*path))
        .map(|path| path.to_string())
        .collect();
    let changed = records_a
        .iter()
        .filter(|(path, record)| {
            records_b
                .get(**path)
                .is_some_and(|other| **other != ***record)
        })
        .map(|(path, _)| path.to_string())
        .collect();

    Ok(RunDiff {
        status: DiffStatus::Ok,
        run_a: run_a.to_string(),
        run_b: run_b.to_string(),
        added: Some(added),
        removed: Some(removed),
        changed: Some(changed),
    })
}

fn records_by_path(manifest: &Value) -> BTreeMap<&str, &Value> {
    manifest
        .get("records")
        .and_then(Value::as_array)
        .map(|records| {
            records
                .iter()
                .filter_map(|record| Some((record.get("path")?.as_str()?, record)))
                .collect()
        })
        .unwrap_or_default()
}
