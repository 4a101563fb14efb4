use crate::document::SourceDocument;
use auditgraph_protocol::{Claim, ClaimProvenance};
use serde_json::json;

pub const RULE_LOG_SIGNATURE: &str = "log.signature.v1";

/// Trimmed lines mentioning `error` in any case.
pub fn error_signatures(text: &str) -> Vec<&str> {
    text.lines()
        .filter(|line| line.to_lowercase().contains("error"))
        .map(str::trim)
        .collect()
}

pub fn signature_claims(doc: &SourceDocument) -> Vec<Claim> {
    if !doc.kind.carries_log_lines() {
        return Vec::new();
    }
    error_signatures(&doc.text)
        .into_iter()
        .map(|signature| {
            Claim::new(
                "error_signature",
                signature,
                "observed",
                json!({ "signature": signature }),
                ClaimProvenance {
                    source_file: doc.path.clone(),
                    source_hash: doc.source_hash.clone(),
                    extractor_rule_id: RULE_LOG_SIGNATURE.to_string(),
                },
            )
        })
        .collect()
}
