use auditgraph_store::ArtifactWriter;
use serde_json::{json, Value};

use crate::error::Result;

/// Writes `indexes/decisions/index.json` from an already assembled `{decisions: [...]}` payload.
pub fn write_decision_index(writer: &mut ArtifactWriter<'_>, index: &Value) -> Result<String> {
    let path = writer.layout().decisions_index_path();
    Ok(writer.write_json(&path, index)?)
}

/// Placeholder semantic index; vectors are not computed yet.
pub fn write_vectors_index(writer: &mut ArtifactWriter<'_>) -> Result<String> {
    let path = writer.layout().vectors_index_path();
    Ok(writer.write_json(&path, &json!({ "type": "vectors", "vectors": [] }))?)
}
