use crate::model::IngestRecord;
use crate::Result;
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Files are hashed in fixed chunks so memory stays bounded for large sources.
pub const HASH_CHUNK_BYTES: usize = 1024 * 1024;

pub fn sha256_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

pub fn sha256_text(text: &str) -> String {
    sha256_bytes(text.as_bytes())
}

/// Streaming SHA-256 of a file's contents.
pub fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_CHUNK_BYTES];
    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Rebuilds every object with lexicographically ordered keys.
pub fn canonical_value(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (key, value) in entries {
                sorted.insert(key, canonical_value(value));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonical_value).collect()),
        other => other,
    }
}

/// Compact JSON with sorted keys; the only encoding that is ever hashed.
pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let value = canonical_value(serde_json::to_value(value)?);
    Ok(serde_json::to_string(&value)?)
}

pub fn sha256_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(sha256_text(&canonical_json(value)?))
}

/// Hash over the sorted source hashes of a run. Discovery order does not matter.
pub fn inputs_hash<'a>(source_hashes: impl IntoIterator<Item = &'a str>) -> String {
    let mut hashes: Vec<&str> = source_hashes.into_iter().collect();
    hashes.sort_unstable();
    sha256_text(&hashes.join("\n"))
}

/// Hash over ingest records, keyed by path. Modification times are excluded so that
/// touching a file without changing it keeps the hash stable.
pub fn records_outputs_hash(records: &[IngestRecord]) -> Result<String> {
    let mut sorted: Vec<&IngestRecord> = records.iter().collect();
    sorted.sort_by(|a, b| a.path.cmp(&b.path));
    let rows: Vec<Value> = sorted
        .into_iter()
        .map(|record| {
            serde_json::json!({
                "path": record.path,
                "source_hash": record.source_hash,
                "size": record.size,
                "parser_id": record.parser_id,
                "parse_status": record.parse_status,
                "skip_reason": record.skip_reason,
            })
        })
        .collect();
    sha256_json(&rows)
}

pub fn deterministic_run_id(inputs_hash: &str, config_hash: &str) -> String {
    format!("run_{}", sha256_text(&format!("{inputs_hash}:{config_hash}")))
}

/// Lower-cases and collapses internal whitespace.
pub fn normalize_key(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub fn canonical_key(kind: &str, value: &str) -> String {
    format!("{kind}:{}", normalize_key(value))
}

pub fn entity_id(canonical_key: &str) -> String {
    format!("ent_{}", sha256_text(canonical_key))
}

pub fn claim_id(claim_text: &str) -> String {
    format!("clm_{}", sha256_text(claim_text))
}

pub fn link_id(rule_id: &str, from_id: &str, to_id: &str) -> String {
    format!("lnk_{}", sha256_text(&format!("{rule_id}:{from_id}:{to_id}")))
}

/// Two characters following the type prefix: `ent_ab12..` lives in shard `ab`.
pub fn shard_for(id: &str) -> &str {
    let token = id.split_once('_').map_or(id, |(_, rest)| rest);
    let token = if token.is_empty() { id } else { token };
    let end = token
        .char_indices()
        .nth(2)
        .map_or(token.len(), |(idx, _)| idx);
    &token[..end]
}
