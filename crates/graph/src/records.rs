use crate::error::{GraphError, Result};
use auditgraph_protocol::{Entity, Evidence, Link};
use auditgraph_redact::{RedactionSummary, Redactor};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeSet;

pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Node record handed to graph-database sync and exports. Redaction is already applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNodeRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub label: String,
    pub name: String,
    pub canonical_key: String,
    pub profile: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphRelationshipRecord {
    pub id: String,
    pub from_id: String,
    pub to_id: String,
    #[serde(rename = "type")]
    pub relationship_type: String,
    pub rule_id: String,
    pub confidence: f64,
    pub authority: String,
    pub evidence: Vec<Evidence>,
}

/// Records addressable by a stable id.
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for GraphNodeRecord {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for GraphRelationshipRecord {
    fn key(&self) -> &str {
        &self.id
    }
}

/// An idempotent merge-by-key operation. Applying the same batch twice is a no-op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SyncOp<T> {
    Upsert { key: String, record: T },
}

/// `:Auditgraph` followed by the PascalCase form of the entity type.
pub fn label_for_type(entity_type: &str) -> String {
    let pascal: String = entity_type
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();
    if pascal.is_empty() {
        ":AuditgraphEntity".to_string()
    } else {
        format!(":Auditgraph{pascal}")
    }
}

/// Redacted node records sorted by id. Entities without a name are skipped.
pub fn graph_nodes<'a>(
    entities: impl IntoIterator<Item = &'a Entity>,
    profile: &str,
    run_id: Option<&str>,
    redactor: &Redactor,
    summary: &mut RedactionSummary,
) -> Result<Vec<GraphNodeRecord>> {
    let mut records = Vec::new();
    for entity in entities {
        let entity: Entity = redact_into(entity, redactor, summary)?;
        if entity.id.is_empty() || entity.name.is_empty() {
            continue;
        }
        let first = entity.refs.first();
        records.push(GraphNodeRecord {
            label: label_for_type(&entity.entity_type),
            source_path: first.map(|r| r.source_path.clone()),
            source_hash: first.map(|r| r.source_hash.clone()),
            id: entity.id,
            node_type: entity.entity_type,
            name: entity.name,
            canonical_key: entity.canonical_key,
            profile: profile.to_string(),
            run_id: run_id.map(str::to_string),
        });
    }
    records.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(records)
}

/// Redacted relationship records sorted by `(from_id, to_id, id)`.
///
/// When `node_ids` is given, links touching an unknown node are skipped and counted.
pub fn graph_relationships<'a>(
    links: impl IntoIterator<Item = &'a Link>,
    node_ids: Option<&BTreeSet<String>>,
    redactor: &Redactor,
    summary: &mut RedactionSummary,
) -> Result<(Vec<GraphRelationshipRecord>, usize)> {
    let mut records = Vec::new();
    let mut skipped = 0;
    for link in links {
        if let Some(known) = node_ids {
            if !known.contains(&link.from_id) || !known.contains(&link.to_id) {
                skipped += 1;
                continue;
            }
        }
        let link: Link = redact_into(link, redactor, summary)?;
        records.push(GraphRelationshipRecord {
            id: link.id,
            from_id: link.from_id,
            to_id: link.to_id,
            relationship_type: link.link_type,
            rule_id: link.rule_id,
            confidence: link.confidence,
            authority: link.authority.as_str().to_string(),
            evidence: link.evidence,
        });
    }
    records.sort_by(|a, b| {
        (&a.from_id, &a.to_id, &a.id).cmp(&(&b.from_id, &b.to_id, &b.id))
    });
    Ok((records, skipped))
}

/// Splits records into upsert batches of at most `batch_size` items.
pub fn batches<T: Keyed + Clone>(records: &[T], batch_size: usize) -> Result<Vec<Vec<SyncOp<T>>>> {
    if batch_size == 0 {
        return Err(GraphError::InvalidBatchSize);
    }
    Ok(records
        .chunks(batch_size)
        .map(|chunk| {
            chunk
                .iter()
                .map(|record| SyncOp::Upsert {
                    key: record.key().to_string(),
                    record: record.clone(),
                })
                .collect()
        })
        .collect())
}

fn redact_into<T: Serialize + DeserializeOwned>(
    record: &T,
    redactor: &Redactor,
    summary: &mut RedactionSummary,
) -> Result<T> {
    let redacted = redactor.redact_serializable(record)?;
    summary.merge(&redacted.summary);
    Ok(serde_json::from_value(redacted.value)?)
}
