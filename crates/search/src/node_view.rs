use crate::error::Result;
use auditgraph_protocol::SourceRef;
use auditgraph_store::GraphStore;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeView {
    Found {
        id: String,
        #[serde(rename = "type")]
        node_type: String,
        name: String,
        refs: Vec<SourceRef>,
    },
    Missing {
        status: String,
        id: String,
    },
}

pub fn node_view(store: &GraphStore, id: &str) -> Result<NodeView> {
    Ok(match store.load_entity(id)? {
        Some(entity) => NodeView::Found {
            id: entity.id,
            node_type: entity.entity_type,
            name: entity.name,
            refs: entity.refs,
        },
        None => NodeView::Missing {
            status: "missing".to_string(),
            id: id.to_string(),
        },
    })
}
