use serde_json::Value;

const REQUIRED_ENTITY_FIELDS: &[&str] = &["id", "type", "name", "canonical_key", "provenance"];
const REQUIRED_CLAIM_FIELDS: &[&str] = &["id", "subject_id", "predicate", "object", "provenance"];

fn missing_fields(payload: &Value, required: &[&str]) -> Vec<String> {
    let Value::Object(map) = payload else {
        return required.iter().map(|field| field.to_string()).collect();
    };
    let mut missing: Vec<String> = required
        .iter()
        .filter(|field| !map.contains_key(**field))
        .map(|field| field.to_string())
        .collect();
    missing.sort();
    missing
}

/// Sorted names of required entity fields absent from `payload`.
#[must_use]
pub fn validate_entity(payload: &Value) -> Vec<String> {
    missing_fields(payload, REQUIRED_ENTITY_FIELDS)
}

/// Sorted names of required claim fields absent from `payload`.
#[must_use]
pub fn validate_claim(payload: &Value) -> Vec<String> {
    missing_fields(payload, REQUIRED_CLAIM_FIELDS)
}
