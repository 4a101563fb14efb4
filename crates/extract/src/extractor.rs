use crate::adr::decision_claim;
use crate::code::{file_entity, symbol_entities, SymbolPatterns};
use crate::document::SourceDocument;
use crate::error::Result;
use crate::language::SourceKind;
use crate::logs::signature_claims;
use crate::notes::{note_entity, tag_entities};
use auditgraph_protocol::{sha256_json, Claim, Entity};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Entities and claims gathered across every document of a run, keyed by id.
#[derive(Debug, Default, Clone)]
pub struct Extraction {
    entities: BTreeMap<String, Entity>,
    claims: BTreeMap<String, Claim>,
}

impl Extraction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entities observed twice merge their refs and aliases.
    pub fn add_entity(&mut self, entity: Entity) {
        match self.entities.get_mut(&entity.id) {
            Some(existing) => existing.absorb(entity),
            None => {
                self.entities.insert(entity.id.clone(), entity);
            }
        }
    }

    /// Claims sharing an id keep the one from the smallest source path, whatever order
    /// they arrive in. A kept claim is never edited.
    pub fn add_claim(&mut self, claim: Claim) {
        match self.claims.get_mut(&claim.id) {
            Some(existing) if claim_origin(&claim) < claim_origin(existing) => *existing = claim,
            Some(_) => {}
            None => {
                self.claims.insert(claim.id.clone(), claim);
            }
        }
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn claims(&self) -> impl Iterator<Item = &Claim> {
        self.claims.values()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn claim_count(&self) -> usize {
        self.claims.len()
    }

    pub fn decisions(&self) -> impl Iterator<Item = &Claim> {
        self.claims().filter(|claim| claim.claim_type == "decision")
    }

    pub fn has_decisions(&self) -> bool {
        self.decisions().next().is_some()
    }

    /// Payload of `indexes/decisions/index.json`.
    pub fn decision_index(&self) -> Value {
        json!({ "decisions": self.decisions().collect::<Vec<_>>() })
    }

    pub fn outputs_hash(&self) -> auditgraph_protocol::Result<String> {
        sha256_json(&json!({
            "entities": self.entities.keys().collect::<Vec<_>>(),
            "claims": self.claims.keys().collect::<Vec<_>>(),
        }))
    }
}

fn claim_origin(claim: &Claim) -> (&str, &str) {
    (&claim.provenance.source_file, &claim.provenance.source_hash)
}

/// Runs every extraction rule that applies to a document.
pub struct Extractor {
    pipeline_version: String,
    symbols: SymbolPatterns,
}

impl Extractor {
    pub fn new(pipeline_version: impl Into<String>) -> Result<Self> {
        Ok(Self {
            pipeline_version: pipeline_version.into(),
            symbols: SymbolPatterns::new()?,
        })
    }

    pub fn extract(&self, doc: &SourceDocument, out: &mut Extraction) {
        let version = self.pipeline_version.as_str();
        if doc.kind == SourceKind::Markdown {
            out.add_entity(note_entity(doc, version));
            for tag in tag_entities(doc, version) {
                out.add_entity(tag);
            }
            if let Some(claim) = decision_claim(doc) {
                out.add_claim(claim);
            }
        }
        if doc.kind.is_code() {
            out.add_entity(file_entity(doc, version));
            for symbol in symbol_entities(&self.symbols, doc, version) {
                out.add_entity(symbol);
            }
        }
        for claim in signature_claims(doc) {
            out.add_claim(claim);
        }
        log::debug!(
            "Extracted {} ({:?}): {} entities, {} claims so far",
            doc.path,
            doc.kind,
            out.entity_count(),
            out.claim_count()
        );
    }
}
