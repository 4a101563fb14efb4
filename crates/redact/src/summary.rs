use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Audit trail of what a redaction pass replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionSummary {
    pub counts_by_category: BTreeMap<String, u64>,
    pub total_matches: u64,
}

impl RedactionSummary {
    pub fn add(&mut self, category: &str, count: u64) {
        *self
            .counts_by_category
            .entry(category.to_string())
            .or_default() += count;
        self.total_matches += count;
    }

    pub fn merge(&mut self, other: &RedactionSummary) {
        for (category, count) in &other.counts_by_category {
            self.add(category, *count);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_matches == 0
    }
}
