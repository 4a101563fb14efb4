use crate::hashing::{claim_id, entity_id, link_id};
use crate::ProtocolError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Inclusive, 1-based line span inside a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
pub struct LineRange {
    pub start_line: u32,
    pub end_line: u32,
}

impl LineRange {
    pub fn line(line: u32) -> Self {
        Self {
            start_line: line,
            end_line: line,
        }
    }
}

/// Where an entity was observed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
pub struct SourceRef {
    pub source_path: String,
    pub source_hash: String,
    pub range: LineRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EntityProvenance {
    pub created_by_rule: String,
    pub input_hash: String,
    pub pipeline_version: String,
}

/// A typed node of the knowledge graph. The id is a pure function of `canonical_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Entity {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub name: String,
    pub canonical_key: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub provenance: EntityProvenance,
    #[serde(default)]
    pub refs: Vec<SourceRef>,
}

impl Entity {
    pub fn new(
        entity_type: impl Into<String>,
        name: impl Into<String>,
        canonical_key: impl Into<String>,
        provenance: EntityProvenance,
        refs: Vec<SourceRef>,
    ) -> Self {
        let canonical_key = canonical_key.into();
        let mut entity = Self {
            id: entity_id(&canonical_key),
            entity_type: entity_type.into(),
            name: name.into(),
            canonical_key,
            aliases: Vec::new(),
            provenance,
            refs,
        };
        entity.refs.sort();
        entity.refs.dedup();
        entity
    }

    /// Folds another observation of the same entity into this one. The observation with
    /// the smallest first ref keeps its name and provenance, so the merged entity does not
    /// depend on arrival order.
    pub fn absorb(&mut self, mut other: Entity) {
        debug_assert_eq!(self.id, other.id);
        if other.observation_key() < self.observation_key() {
            std::mem::swap(self, &mut other);
        }
        self.refs.extend(other.refs);
        self.refs.sort();
        self.refs.dedup();
        self.aliases.extend(other.aliases);
        self.aliases.push(other.name);
        self.aliases.retain(|alias| *alias != self.name);
        self.aliases.sort();
        self.aliases.dedup();
    }

    fn observation_key(&self) -> (Option<&SourceRef>, &str, &str) {
        (self.refs.first(), &self.provenance.input_hash, &self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ClaimProvenance {
    pub source_file: String,
    #[serde(default)]
    pub source_hash: String,
    pub extractor_rule_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValidityWindow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

/// An observation extracted from a source. Claims are never edited in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Claim {
    pub id: String,
    #[serde(rename = "type")]
    pub claim_type: String,
    #[serde(default)]
    pub subject_id: Option<String>,
    pub predicate: String,
    pub object: Value,
    pub provenance: ClaimProvenance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validity_window: Option<ValidityWindow>,
    #[serde(default)]
    pub contradiction: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contradiction_reason: Option<String>,
}

impl Claim {
    pub fn new(
        claim_type: impl Into<String>,
        claim_text: &str,
        predicate: impl Into<String>,
        object: Value,
        provenance: ClaimProvenance,
    ) -> Self {
        Self {
            id: claim_id(claim_text),
            claim_type: claim_type.into(),
            subject_id: None,
            predicate: predicate.into(),
            object,
            provenance,
            confidence: None,
            validity_window: None,
            contradiction: false,
            contradiction_reason: None,
        }
    }

    /// Returns a flagged copy; the original record stays untouched.
    #[must_use]
    pub fn flag_contradiction(&self, reason: impl Into<String>) -> Self {
        let mut flagged = self.clone();
        flagged.contradiction = true;
        flagged.contradiction_reason = Some(reason.into());
        flagged
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Authority {
    Authoritative,
    Inferred,
}

impl Authority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authoritative => "authoritative",
            Self::Inferred => "inferred",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Evidence {
    pub source_path: String,
    pub source_hash: String,
}

/// A directed, evidence-bearing edge. Undirected relations are stored as two links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Link {
    pub id: String,
    pub from_id: String,
    pub to_id: String,
    #[serde(rename = "type")]
    pub link_type: String,
    pub rule_id: String,
    pub confidence: f64,
    pub authority: Authority,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
}

impl Link {
    pub fn new(
        rule_id: impl Into<String>,
        from_id: impl Into<String>,
        to_id: impl Into<String>,
        link_type: impl Into<String>,
        confidence: f64,
        authority: Authority,
        evidence: Vec<Evidence>,
    ) -> Self {
        let rule_id = rule_id.into();
        let from_id = from_id.into();
        let to_id = to_id.into();
        Self {
            id: link_id(&rule_id, &from_id, &to_id),
            from_id,
            to_id,
            link_type: link_type.into(),
            rule_id,
            confidence,
            authority,
            evidence,
        }
    }
}

/// Outgoing edge as materialized in `indexes/graph/adjacency.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AdjacencyEdge {
    pub to_id: String,
    #[serde(rename = "type")]
    pub edge_type: String,
    pub rule_id: String,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
    pub authority: Authority,
}

impl AdjacencyEdge {
    pub fn sort_key(&self) -> (&str, &str, &str) {
        (&self.edge_type, &self.rule_id, &self.to_id)
    }
}

impl From<&Link> for AdjacencyEdge {
    fn from(link: &Link) -> Self {
        Self {
            to_id: link.to_id.clone(),
            edge_type: link.link_type.clone(),
            rule_id: link.rule_id.clone(),
            evidence: link.evidence.clone(),
            authority: link.authority,
        }
    }
}

/// `from_id -> outgoing edges`, each list sorted by `(type, rule_id, to_id)`.
pub type Adjacency = BTreeMap<String, Vec<AdjacencyEdge>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ParseStatus {
    Ok,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IngestRecord {
    pub path: String,
    pub source_hash: String,
    pub size: u64,
    pub mtime: f64,
    pub parser_id: String,
    pub parse_status: ParseStatus,
    #[serde(default)]
    pub skip_reason: Option<String>,
}

impl IngestRecord {
    pub fn is_ok(&self) -> bool {
        self.parse_status == ParseStatus::Ok
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IngestManifest {
    pub version: String,
    pub schema_version: String,
    pub stage: String,
    pub run_id: String,
    pub started_at: String,
    pub finished_at: String,
    pub pipeline_version: String,
    pub config_hash: String,
    pub inputs_hash: String,
    pub outputs_hash: String,
    pub status: String,
    #[serde(default)]
    pub artifacts: Vec<String>,
    #[serde(default)]
    pub records: Vec<IngestRecord>,
    pub ingested_count: usize,
    pub skipped_count: usize,
}

impl IngestManifest {
    pub fn source_bytes(&self) -> u64 {
        self.records.iter().map(|record| record.size).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StageManifest {
    pub version: String,
    pub stage: String,
    pub run_id: String,
    pub inputs_hash: String,
    pub outputs_hash: String,
    pub config_hash: String,
    #[serde(default)]
    pub pipeline_version: String,
    pub status: String,
    pub started_at: String,
    pub finished_at: String,
    #[serde(default)]
    pub artifacts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct ProvenanceRecord {
    pub artifact_id: String,
    pub source_path: String,
    pub source_hash: String,
    pub rule_id: String,
    pub input_hash: String,
    pub run_id: String,
}

/// One line of `replay-log.jsonl`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ReplayLogEntry {
    pub stage: String,
    pub run_id: String,
    pub inputs_hash: String,
    pub outputs_hash: String,
    pub config_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_version: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Ingest,
    Normalize,
    Extract,
    Link,
    Index,
    Rebuild,
    Import,
}

impl Stage {
    /// The linear order `rebuild` walks through.
    pub const PIPELINE: [Stage; 5] = [
        Stage::Ingest,
        Stage::Normalize,
        Stage::Extract,
        Stage::Link,
        Stage::Index,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ingest => "ingest",
            Self::Normalize => "normalize",
            Self::Extract => "extract",
            Self::Link => "link",
            Self::Index => "index",
            Self::Rebuild => "rebuild",
            Self::Import => "import",
        }
    }

    /// Manifest that must exist before this stage can run.
    pub fn upstream(&self) -> Option<Stage> {
        match self {
            Self::Normalize | Self::Extract => Some(Self::Ingest),
            Self::Link => Some(Self::Extract),
            Self::Index => Some(Self::Link),
            Self::Ingest | Self::Rebuild | Self::Import => None,
        }
    }

    pub fn manifest_file_name(&self) -> String {
        format!("{}-manifest.json", self.as_str())
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ingest" => Ok(Self::Ingest),
            "normalize" => Ok(Self::Normalize),
            "extract" => Ok(Self::Extract),
            "link" => Ok(Self::Link),
            "index" => Ok(Self::Index),
            "rebuild" => Ok(Self::Rebuild),
            "import" => Ok(Self::Import),
            other => Err(ProtocolError::UnknownStage(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Ok,
    MissingManifest,
    NotImplemented,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StageResult {
    pub stage: String,
    pub status: StageStatus,
    pub detail: Value,
}

impl StageResult {
    pub fn ok(stage: Stage, detail: Value) -> Self {
        Self {
            stage: stage.as_str().to_string(),
            status: StageStatus::Ok,
            detail,
        }
    }

    pub fn missing_manifest(stage: Stage, run_id: Option<&str>) -> Self {
        Self {
            stage: stage.as_str().to_string(),
            status: StageStatus::MissingManifest,
            detail: serde_json::json!({ "run_id": run_id }),
        }
    }

    pub fn not_implemented(stage: &str) -> Self {
        Self {
            stage: stage.to_string(),
            status: StageStatus::NotImplemented,
            detail: serde_json::json!({}),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == StageStatus::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn provenance() -> EntityProvenance {
        EntityProvenance {
            created_by_rule: "extract.note.v1".to_string(),
            input_hash: "h".to_string(),
            pipeline_version: "v0.1.0".to_string(),
        }
    }

    fn source_ref(path: &str, line: u32) -> SourceRef {
        SourceRef {
            source_path: path.to_string(),
            source_hash: "h".to_string(),
            range: LineRange::line(line),
        }
    }

    #[test]
    fn entity_serializes_type_field() {
        let entity = Entity::new("note", "Smoke", "note:smoke", provenance(), vec![]);
        let value = serde_json::to_value(&entity).unwrap();
        assert_eq!(value["type"], "note");
        assert_eq!(value["id"], entity.id);
        assert!(entity.id.starts_with("ent_"));
    }

    #[test]
    fn absorb_merges_refs_sorted_without_duplicates() {
        let mut a = Entity::new("tag", "ops", "tag:ops", provenance(), vec![source_ref("b.md", 1)]);
        let b = Entity::new(
            "tag",
            "Ops",
            "tag:ops",
            provenance(),
            vec![source_ref("a.md", 1), source_ref("b.md", 1)],
        );
        a.absorb(b);
        assert_eq!(a.refs, vec![source_ref("a.md", 1), source_ref("b.md", 1)]);
        assert_eq!(a.name, "Ops");
        assert_eq!(a.aliases, vec!["ops".to_string()]);
    }

    #[test]
    fn absorb_is_independent_of_arrival_order() {
        let observe = |name: &str, path: &str, input_hash: &str| {
            let mut provenance = provenance();
            provenance.input_hash = input_hash.to_string();
            Entity::new("tag", name, "tag:ops", provenance, vec![source_ref(path, 1)])
        };
        let observations = [
            observe("ops", "notes/smoke.md", "h-smoke"),
            observe("OPS", "notes/other.md", "h-other"),
            observe("Ops", "notes/zeta.md", "h-zeta"),
        ];

        let merge = |order: &[usize]| {
            let mut merged = observations[order[0]].clone();
            for &i in &order[1..] {
                merged.absorb(observations[i].clone());
            }
            merged
        };
        let forward = merge(&[0, 1, 2]);
        assert_eq!(forward, merge(&[2, 1, 0]));
        assert_eq!(forward, merge(&[1, 2, 0]));
        assert_eq!(forward.provenance.input_hash, "h-other");
        assert_eq!(forward.name, "OPS");
        assert_eq!(forward.aliases, vec!["Ops".to_string(), "ops".to_string()]);
        assert_eq!(forward.refs.len(), 3);
    }

    #[test]
    fn contradiction_produces_new_record() {
        let claim = Claim::new(
            "decision",
            "decision:Use JSON",
            "decided",
            serde_json::json!({"decision": "Use JSON"}),
            ClaimProvenance {
                source_file: "docs/adr-1.md".to_string(),
                source_hash: String::new(),
                extractor_rule_id: "md.adr.v1".to_string(),
            },
        );
        let flagged = claim.flag_contradiction("superseded");
        assert!(!claim.contradiction);
        assert!(flagged.contradiction);
        assert_eq!(flagged.contradiction_reason.as_deref(), Some("superseded"));
        assert_eq!(flagged.id, claim.id);
    }

    #[test]
    fn stage_round_trips_through_names() {
        for stage in Stage::PIPELINE {
            assert_eq!(stage.as_str().parse::<Stage>().unwrap(), stage);
        }
        assert!("publish".parse::<Stage>().is_err());
        assert_eq!(Stage::Index.upstream(), Some(Stage::Link));
        assert_eq!(Stage::Link.manifest_file_name(), "link-manifest.json");
    }

    #[test]
    fn stage_status_uses_snake_case() {
        let result = StageResult::missing_manifest(Stage::Extract, None);
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["status"], "missing_manifest");
        assert_eq!(value["detail"]["run_id"], Value::Null);
    }
}
