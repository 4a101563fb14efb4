use crate::io::read_json_opt;
use crate::{ArtifactWriter, ProfileLayout, Result};
use auditgraph_protocol::{Adjacency, Claim, Entity, Link};
use serde::de::DeserializeOwned;
use std::path::Path;
use walkdir::WalkDir;

impl ArtifactWriter<'_> {
    pub fn write_entity(&mut self, entity: &Entity) -> Result<String> {
        let path = self.layout().entity_path(&entity.id);
        self.write_json(&path, entity)
    }

    pub fn write_claim(&mut self, claim: &Claim) -> Result<String> {
        let path = self.layout().claim_path(&claim.id);
        self.write_json(&path, claim)
    }

    pub fn write_link(&mut self, link: &Link) -> Result<String> {
        let path = self.layout().link_path(&link.id);
        self.write_json(&path, link)
    }

    pub fn write_adjacency(&mut self, adjacency: &Adjacency) -> Result<String> {
        let path = self.layout().adjacency_path();
        self.write_json(&path, adjacency)
    }
}

/// Read side of the sharded entity/claim/link tree.
#[derive(Debug, Clone)]
pub struct GraphStore {
    layout: ProfileLayout,
}

impl GraphStore {
    pub fn new(layout: ProfileLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &ProfileLayout {
        &self.layout
    }

    pub fn load_entity(&self, id: &str) -> Result<Option<Entity>> {
        read_json_opt(&self.layout.entity_path(id))
    }

    /// All stored entities ordered by id.
    pub fn load_entities(&self) -> Result<Vec<Entity>> {
        let mut entities: Vec<Entity> = load_sharded(&self.layout.entities_dir())?;
        entities.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(entities)
    }

    pub fn load_claims(&self) -> Result<Vec<Claim>> {
        let mut claims: Vec<Claim> = load_sharded(&self.layout.claims_dir())?;
        claims.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(claims)
    }

    pub fn load_links(&self) -> Result<Vec<Link>> {
        let mut links: Vec<Link> = load_sharded(&self.layout.links_dir())?;
        links.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(links)
    }

    /// Empty when the link stage has not run yet.
    pub fn load_adjacency(&self) -> Result<Adjacency> {
        Ok(read_json_opt(&self.layout.adjacency_path())?.unwrap_or_default())
    }
}

fn load_sharded<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut items = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let bytes = std::fs::read(path)?;
        items.push(serde_json::from_slice(&bytes)?);
    }
    Ok(items)
}
