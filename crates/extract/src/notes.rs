use crate::document::SourceDocument;
use auditgraph_protocol::{canonical_key, Entity, EntityProvenance, LineRange, SourceRef};

pub const RULE_NOTE: &str = "extract.note.v1";
pub const RULE_NOTE_TAGS: &str = "extract.note_tags.v1";

/// A markdown note entity, titled from front matter or the file stem.
pub fn note_entity(doc: &SourceDocument, pipeline_version: &str) -> Entity {
    let title = doc
        .frontmatter
        .title
        .as_deref()
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| doc.file_stem());
    Entity::new(
        "note",
        title,
        canonical_key("note", title),
        provenance(RULE_NOTE, doc, pipeline_version),
        vec![document_ref(doc, LineRange::line(1))],
    )
}

/// One `tag` entity per front-matter tag. Tags shared across notes share an id.
pub fn tag_entities(doc: &SourceDocument, pipeline_version: &str) -> Vec<Entity> {
    doc.frontmatter
        .tags()
        .iter()
        .map(|tag| {
            Entity::new(
                "tag",
                tag.as_str(),
                canonical_key("tag", tag),
                provenance(RULE_NOTE_TAGS, doc, pipeline_version),
                vec![document_ref(doc, LineRange::line(1))],
            )
        })
        .collect()
}

pub(crate) fn provenance(rule: &str, doc: &SourceDocument, pipeline_version: &str) -> EntityProvenance {
    EntityProvenance {
        created_by_rule: rule.to_string(),
        input_hash: doc.source_hash.clone(),
        pipeline_version: pipeline_version.to_string(),
    }
}

pub(crate) fn document_ref(doc: &SourceDocument, range: LineRange) -> SourceRef {
    SourceRef {
        source_path: doc.path.clone(),
        source_hash: doc.source_hash.clone(),
        range,
    }
}
