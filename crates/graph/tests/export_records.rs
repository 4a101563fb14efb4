use auditgraph_graph::{
    batches, build_adjacency, graph_nodes, graph_relationships, neighbors,
    source_cooccurrence_links, SyncOp,
};
use auditgraph_protocol::{Entity, EntityProvenance, LineRange, SourceRef};
use auditgraph_redact::{RedactionKey, RedactionPolicy, RedactionSummary, Redactor};
use std::collections::BTreeSet;

const SENTINEL: &str = "S011_SECRET_SENTINEL";

fn entity(kind: &str, name: &str, path: &str) -> Entity {
    Entity::new(
        kind,
        name,
        format!("{kind}:{name}"),
        EntityProvenance {
            created_by_rule: "test".into(),
            input_hash: "h".into(),
            pipeline_version: "v0.1.0".into(),
        },
        vec![SourceRef {
            source_path: path.into(),
            source_hash: format!("hash-{path}"),
            range: LineRange::line(1),
        }],
    )
}

fn redactor() -> Redactor {
    Redactor::new(
        RedactionPolicy::standard().unwrap(),
        Some(RedactionKey::from_bytes([7u8; 32])),
    )
    .unwrap()
}

#[test]
fn node_records_are_redacted_and_sorted() {
    let entities = vec![
        entity("note", &format!("token={SENTINEL}"), "notes/a.md"),
        entity("tag", "ops", "notes/a.md"),
    ];
    let mut summary = RedactionSummary::default();
    let nodes = graph_nodes(&entities, "default", Some("run_x"), &redactor(), &mut summary).unwrap();

    assert_eq!(nodes.len(), 2);
    assert!(nodes.windows(2).all(|pair| pair[0].id < pair[1].id));
    let rendered = serde_json::to_string(&nodes).unwrap();
    assert!(!rendered.contains(SENTINEL));
    assert!(summary.total_matches >= 1);
    assert!(nodes.iter().any(|n| n.label == ":AuditgraphTag"));
    assert!(nodes.iter().all(|n| n.profile == "default"));
}

#[test]
fn relationships_skip_unknown_nodes_and_batch_as_upserts() {
    let entities = vec![
        entity("note", "a", "notes/x.md"),
        entity("note", "b", "notes/x.md"),
        entity("note", "c", "notes/x.md"),
    ];
    let links = source_cooccurrence_links(&entities);
    assert_eq!(links.len(), 6);

    let known: BTreeSet<String> = entities[..2].iter().map(|e| e.id.clone()).collect();
    let mut summary = RedactionSummary::default();
    let (records, skipped) =
        graph_relationships(&links, Some(&known), &Redactor::disabled(), &mut summary).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(skipped, 4);

    let batched = batches(&records, 1000).unwrap();
    assert_eq!(batched.len(), 1);
    let SyncOp::Upsert { key, record } = &batched[0][0];
    assert_eq!(key, &record.id);
}

#[test]
fn linked_graph_supports_traversal() {
    let entities = vec![
        entity("note", "a", "notes/x.md"),
        entity("note", "b", "notes/x.md"),
        entity("note", "c", "notes/y.md"),
    ];
    let links = source_cooccurrence_links(&entities);
    let adjacency = build_adjacency(&links);
    let result = neighbors(&adjacency, &entities[0].id, 3);
    assert_eq!(result.neighbors.len(), 2);
    assert!(neighbors(&adjacency, &entities[2].id, 3).neighbors.is_empty());
}
