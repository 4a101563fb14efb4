use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Default granularity scores are rounded to before ranking.
pub const DEFAULT_SCORE_ROUNDING: f64 = 0.000_001;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub matched_terms: Vec<String>,
    pub bm25_score: f64,
    pub semantic_score: f64,
    pub graph_boost: f64,
    #[serde(default)]
    pub tie_break: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub score: f64,
    pub explanation: Explanation,
}

impl SearchResult {
    /// The explicit tie-break list, or the id alone.
    pub fn tie_break_key(&self) -> Vec<&str> {
        if self.explanation.tie_break.is_empty() {
            vec![self.id.as_str()]
        } else {
            self.explanation.tie_break.iter().map(String::as_str).collect()
        }
    }
}

/// `round(score / granularity) * granularity`; a non-positive granularity disables rounding.
pub fn round_score(score: f64, granularity: f64) -> f64 {
    if granularity <= 0.0 {
        return score;
    }
    (score / granularity).round() * granularity
}

/// Rounds every score, then orders by descending score and ascending tie-break key.
pub fn apply_ranking(results: Vec<SearchResult>, granularity: f64) -> Vec<SearchResult> {
    let mut ranked: Vec<SearchResult> = results
        .into_iter()
        .map(|mut result| {
            result.score = round_score(result.score, granularity);
            result
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.tie_break_key().cmp(&b.tie_break_key()))
    });
    ranked
}
