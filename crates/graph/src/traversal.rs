use auditgraph_protocol::{Adjacency, AdjacencyEdge};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighborhood {
    pub center_id: String,
    /// Edges in traversal order; an edge back to an already seen id is still reported.
    pub neighbors: Vec<AdjacencyEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionPath {
    pub path: Vec<AdjacencyEdge>,
}

/// Breadth-first expansion up to `depth` levels. Each level only expands ids that were
/// never seen before, so cycles terminate.
pub fn neighbors(adjacency: &Adjacency, center_id: &str, depth: usize) -> Neighborhood {
    let mut seen: BTreeSet<&str> = BTreeSet::from([center_id]);
    let mut frontier: Vec<&str> = vec![center_id];
    let mut edges = Vec::new();

    for _ in 0..depth {
        let mut next = Vec::new();
        for node_id in frontier {
            for edge in adjacency.get(node_id).map(Vec::as_slice).unwrap_or_default() {
                edges.push(edge.clone());
                if seen.insert(edge.to_id.as_str()) {
                    next.push(edge.to_id.as_str());
                }
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }

    Neighborhood {
        center_id: center_id.to_string(),
        neighbors: edges,
    }
}

/// Single-hop explanation: the direct edge `from_id -> to_id`, if any.
pub fn why_connected(adjacency: &Adjacency, from_id: &str, to_id: &str) -> ConnectionPath {
    let path = adjacency
        .get(from_id)
        .and_then(|edges| edges.iter().find(|edge| edge.to_id == to_id))
        .cloned()
        .into_iter()
        .collect();
    ConnectionPath { path }
}
