use auditgraph_protocol::{Entity, Link};
use auditgraph_redact::Redactor;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

/// Entities and links loaded into a petgraph digraph, keyed by entity id.
pub struct EntityGraph {
    graph: DiGraph<Entity, Link>,
    index: HashMap<String, NodeIndex>,
}

impl EntityGraph {
    /// Links whose endpoints are unknown are dropped. Node order follows entity id order.
    pub fn build(entities: &[Entity], links: &[Link]) -> Self {
        let mut sorted: Vec<&Entity> = entities.iter().collect();
        sorted.sort_by(|a, b| a.id.cmp(&b.id));
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();
        for entity in sorted {
            let idx = graph.add_node(entity.clone());
            index.insert(entity.id.clone(), idx);
        }
        let mut sorted_links: Vec<&Link> = links.iter().collect();
        sorted_links.sort_by(|a, b| a.id.cmp(&b.id));
        for link in sorted_links {
            if let (Some(&from), Some(&to)) = (index.get(&link.from_id), index.get(&link.to_id)) {
                graph.add_edge(from, to, link.clone());
            }
        }
        Self { graph, index }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Graphviz rendering. Node labels pass through the redactor.
    pub fn to_dot(&self, redactor: &Redactor) -> String {
        let mut lines = vec!["digraph auditgraph {".to_string()];
        for idx in self.graph.node_indices() {
            let entity = &self.graph[idx];
            let label = redactor.redact_text(&entity.name).value;
            lines.push(format!(
                "  \"{}\" [label=\"{}\"];",
                entity.id,
                escape(&label)
            ));
        }
        for edge in self.graph.edge_references() {
            let from = &self.graph[edge.source()];
            let to = &self.graph[edge.target()];
            lines.push(format!(
                "  \"{}\" -> \"{}\" [label=\"{}\"];",
                from.id,
                to.id,
                escape(&edge.weight().link_type)
            ));
        }
        lines.push("}".to_string());
        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
