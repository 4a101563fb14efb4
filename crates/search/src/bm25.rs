use auditgraph_protocol::Entity;
use auditgraph_store::{read_json_opt, ArtifactWriter, ProfileLayout};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::Result;

pub const BM25_INDEX_TYPE: &str = "bm25";

/// Inverted index from lower-cased name tokens to sorted, unique entity ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bm25Index {
    #[serde(rename = "type")]
    pub index_type: String,
    pub entries: BTreeMap<String, Vec<String>>,
}

impl Default for Bm25Index {
    fn default() -> Self {
        Self {
            index_type: BM25_INDEX_TYPE.to_string(),
            entries: BTreeMap::new(),
        }
    }
}

impl Bm25Index {
    pub fn build<'a>(entities: impl IntoIterator<Item = &'a Entity>) -> Self {
        let mut inverted: BTreeMap<String, BTreeSet<&str>> = BTreeMap::new();
        for entity in entities {
            for token in tokenize(&entity.name) {
                inverted.entry(token).or_default().insert(entity.id.as_str());
            }
        }
        Self {
            index_type: BM25_INDEX_TYPE.to_string(),
            entries: inverted
                .into_iter()
                .map(|(token, ids)| (token, ids.into_iter().map(str::to_string).collect()))
                .collect(),
        }
    }

    pub fn lookup(&self, token: &str) -> &[String] {
        self.entries
            .get(&token.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn load(layout: &ProfileLayout) -> Result<Option<Self>> {
        Ok(read_json_opt(&layout.bm25_index_path())?)
    }

    pub fn write(&self, writer: &mut ArtifactWriter<'_>) -> Result<String> {
        let path = writer.layout().bm25_index_path();
        Ok(writer.write_json(&path, self)?)
    }
}

/// Whitespace tokens of the lower-cased text, plus their alphanumeric pieces:
/// `"auth-service v2"` yields `auth-service`, `auth`, `service`, `v2`.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    let mut tokens = BTreeSet::new();
    for word in text.to_lowercase().split_whitespace() {
        tokens.insert(word.to_string());
        for piece in word.split(|c: char| !c.is_alphanumeric()) {
            if !piece.is_empty() {
                tokens.insert(piece.to_string());
            }
        }
    }
    tokens
}
