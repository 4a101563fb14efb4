use crate::error::{PipelineError, Result};
use auditgraph_store::{directory_size, load_ingest_manifest_value, resolve_run, ProfileLayout, RunSelection};
use auditgraph_protocol::Stage;
use serde::{Deserialize, Serialize};

/// Sources smaller than this are budgeted as if they were this large.
pub const MIN_SOURCE_BYTES: u64 = 1024 * 1024;

/// `storage.footprint_budget` as it appears in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetSettings {
    pub multiplier: f64,
    pub warn_threshold: f64,
    pub block_threshold: f64,
}

impl Default for BudgetSettings {
    fn default() -> Self {
        Self {
            multiplier: 3.0,
            warn_threshold: 0.8,
            block_threshold: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    Ok,
    Warn,
    Block,
}

impl BudgetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warn => "warn",
            Self::Block => "block",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetReport {
    pub status: BudgetStatus,
    pub usage_ratio: f64,
    pub limit_bytes: u64,
    pub projected_bytes: u64,
    pub warn_threshold: f64,
    pub block_threshold: f64,
    pub message: String,
}

impl BudgetReport {
    /// Passes `ok` and `warn` through (logging the warning); a block becomes an error.
    pub fn enforce(self) -> Result<Self> {
        match self.status {
            BudgetStatus::Block => Err(PipelineError::Budget(self)),
            BudgetStatus::Warn => {
                log::warn!("{}", self.message);
                Ok(self)
            }
            BudgetStatus::Ok => Ok(self),
        }
    }
}

/// `limit = max(source_bytes, 1 MiB) * multiplier`, `ratio = (artifact + additional) / limit`.
pub fn evaluate_budget(
    source_bytes: u64,
    artifact_bytes: u64,
    additional_bytes: u64,
    settings: &BudgetSettings,
) -> BudgetReport {
    let base = source_bytes.max(MIN_SOURCE_BYTES);
    let limit_bytes = (base as f64 * settings.multiplier) as u64;
    let projected_bytes = artifact_bytes + additional_bytes;
    let usage_ratio = if limit_bytes == 0 {
        0.0
    } else {
        projected_bytes as f64 / limit_bytes as f64
    };
    let status = if usage_ratio >= settings.block_threshold {
        BudgetStatus::Block
    } else if usage_ratio >= settings.warn_threshold {
        BudgetStatus::Warn
    } else {
        BudgetStatus::Ok
    };
    let message = format!(
        "Budget {}: projected={projected_bytes}B limit={limit_bytes}B ratio={usage_ratio:.2}",
        status.as_str()
    );
    BudgetReport {
        status,
        usage_ratio,
        limit_bytes,
        projected_bytes,
        warn_threshold: settings.warn_threshold,
        block_threshold: settings.block_threshold,
        message,
    }
}

/// Budget against the current size of the profile's package root.
pub fn evaluate_pkg_budget(
    layout: &ProfileLayout,
    source_bytes: u64,
    additional_bytes: u64,
    settings: &BudgetSettings,
) -> Result<BudgetReport> {
    let artifact_bytes = directory_size(layout.pkg_root())?;
    Ok(evaluate_budget(source_bytes, artifact_bytes, additional_bytes, settings))
}

/// Sum of record sizes in the latest ingest manifest; zero before the first ingest.
/// Read untyped so that manifests of older schema versions still count.
pub fn latest_source_bytes(layout: &ProfileLayout, selection: RunSelection) -> Result<u64> {
    let Some(run_id) = resolve_run(layout, None, Stage::Ingest, selection)? else {
        return Ok(0);
    };
    let Some(manifest) = load_ingest_manifest_value(layout, &run_id)? else {
        return Ok(0);
    };
    Ok(manifest
        .get("records")
        .and_then(|records| records.as_array())
        .map(|records| {
            records
                .iter()
                .filter_map(|record| record.get("size").and_then(|size| size.as_u64()))
                .sum()
        })
        .unwrap_or(0))
}
