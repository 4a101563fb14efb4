use auditgraph_protocol::{
    Adjacency, AdjacencyEdge, Authority, Entity, Evidence, Link, RULE_SOURCE_COOCCURRENCE,
};
use std::collections::BTreeMap;

pub const RELATES_TO: &str = "relates_to";

/// Links every pair of entities cited by the same source file, in both directions.
///
/// Entities are grouped by the `source_path` of their refs; within a group ids are sorted,
/// so the output never depends on the order entities arrive in. A pair that co-occurs in
/// several files yields one link per direction carrying evidence from each file.
pub fn source_cooccurrence_links<'a>(entities: impl IntoIterator<Item = &'a Entity>) -> Vec<Link> {
    let mut by_source: BTreeMap<&str, Vec<(&str, &str)>> = BTreeMap::new();
    for entity in entities {
        for source_ref in &entity.refs {
            if source_ref.source_path.is_empty() {
                continue;
            }
            by_source
                .entry(source_ref.source_path.as_str())
                .or_default()
                .push((entity.id.as_str(), source_ref.source_hash.as_str()));
        }
    }

    let mut links: BTreeMap<String, Link> = BTreeMap::new();
    for (source_path, mut entries) in by_source {
        entries.sort();
        entries.dedup_by(|a, b| a.0 == b.0);
        let source_hash = entries.first().map(|entry| entry.1).unwrap_or_default();
        let evidence = Evidence {
            source_path: source_path.to_string(),
            source_hash: source_hash.to_string(),
        };
        for (i, (left, _)) in entries.iter().enumerate() {
            for (right, _) in &entries[i + 1..] {
                for (from_id, to_id) in [(*left, *right), (*right, *left)] {
                    let link = Link::new(
                        RULE_SOURCE_COOCCURRENCE,
                        from_id,
                        to_id,
                        RELATES_TO,
                        1.0,
                        Authority::Authoritative,
                        vec![evidence.clone()],
                    );
                    links
                        .entry(link.id.clone())
                        .and_modify(|existing| {
                            existing.evidence.push(evidence.clone());
                            existing.evidence.sort();
                            existing.evidence.dedup();
                        })
                        .or_insert(link);
                }
            }
        }
    }
    log::debug!("Derived {} co-occurrence links", links.len());
    links.into_values().collect()
}

/// Groups links by `from_id`; each group is sorted by `(type, rule_id, to_id)`.
pub fn build_adjacency<'a>(links: impl IntoIterator<Item = &'a Link>) -> Adjacency {
    let mut adjacency = Adjacency::new();
    for link in links {
        adjacency
            .entry(link.from_id.clone())
            .or_default()
            .push(AdjacencyEdge::from(link));
    }
    for edges in adjacency.values_mut() {
        edges.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    }
    adjacency
}

#[cfg(test)]
mod tests {
    use super::*;
    use auditgraph_protocol::{EntityProvenance, LineRange, SourceRef};
    use pretty_assertions::assert_eq;

    fn entity(key: &str, paths: &[&str]) -> Entity {
        let refs = paths
            .iter()
            .map(|path| SourceRef {
                source_path: path.to_string(),
                source_hash: format!("h-{path}"),
                range: LineRange::line(1),
            })
            .collect();
        Entity::new(
            "note",
            key,
            format!("note:{key}"),
            EntityProvenance {
                created_by_rule: "test".into(),
                input_hash: "h".into(),
                pipeline_version: "v0.1.0".into(),
            },
            refs,
        )
    }

    #[test]
    fn pairs_are_symmetric() {
        let a = entity("a", &["x.md"]);
        let b = entity("b", &["x.md"]);
        let c = entity("c", &["y.md"]);
        let links = source_cooccurrence_links([&a, &b, &c]);
        assert_eq!(links.len(), 2);
        let pairs: Vec<(&str, &str)> = links
            .iter()
            .map(|l| (l.from_id.as_str(), l.to_id.as_str()))
            .collect();
        assert!(pairs.contains(&(a.id.as_str(), b.id.as_str())));
        assert!(pairs.contains(&(b.id.as_str(), a.id.as_str())));
        assert!(links.iter().all(|l| l.confidence == 1.0 && l.link_type == RELATES_TO));
        assert_eq!(links[0].evidence[0].source_path, "x.md");
    }

    #[test]
    fn arrival_order_does_not_matter() {
        let a = entity("a", &["x.md"]);
        let b = entity("b", &["x.md", "z.md"]);
        let c = entity("c", &["x.md", "z.md"]);
        let forward = source_cooccurrence_links([&a, &b, &c]);
        let backward = source_cooccurrence_links([&c, &b, &a]);
        assert_eq!(forward, backward);
        let bc = forward
            .iter()
            .find(|l| l.from_id == b.id && l.to_id == c.id)
            .unwrap();
        assert_eq!(bc.evidence.len(), 2);
    }

    #[test]
    fn adjacency_edges_are_sorted() {
        let a = entity("a", &["x.md"]);
        let b = entity("b", &["x.md"]);
        let c = entity("c", &["x.md"]);
        let links = source_cooccurrence_links([&a, &b, &c]);
        let adjacency = build_adjacency(links.iter().rev());
        for edges in adjacency.values() {
            let keys: Vec<_> = edges.iter().map(AdjacencyEdge::sort_key).collect();
            let mut sorted = keys.clone();
            sorted.sort();
            assert_eq!(keys, sorted);
            assert_eq!(edges.len(), 2);
        }
    }
}
