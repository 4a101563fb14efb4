use crate::document::SourceDocument;
use crate::language::SourceKind;
use auditgraph_protocol::{Claim, ClaimProvenance};
use serde_json::json;

pub const RULE_ADR: &str = "md.adr.v1";

/// Markdown files whose name mentions `adr` are architecture decision records.
pub fn is_decision_record(doc: &SourceDocument) -> bool {
    doc.kind == SourceKind::Markdown && doc.file_name().to_lowercase().contains("adr")
}

/// First non-empty body line with heading marks stripped, else the file name.
pub fn decision_title(doc: &SourceDocument) -> String {
    doc.body()
        .lines()
        .map(|line| line.trim_start_matches(['#', ' ']).trim())
        .find(|line| !line.is_empty())
        .unwrap_or_else(|| doc.file_name())
        .to_string()
}

pub fn decision_claim(doc: &SourceDocument) -> Option<Claim> {
    if !is_decision_record(doc) {
        return None;
    }
    let title = decision_title(doc);
    let claim = Claim::new(
        "decision",
        &format!("decision:{title}"),
        "decided",
        json!({
            "decision": title,
            "context": "",
            "consequences": [],
        }),
        ClaimProvenance {
            source_file: doc.path.clone(),
            source_hash: doc.source_hash.clone(),
            extractor_rule_id: RULE_ADR.to_string(),
        },
    );
    Some(claim)
}
