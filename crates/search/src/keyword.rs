use crate::bm25::Bm25Index;
use crate::error::{Result, SearchError};
use crate::ranking::{apply_ranking, Explanation, SearchResult};
use auditgraph_store::ProfileLayout;

/// Case-folded lookup of the whole query as one index token. Every hit scores 1.0 and
/// reports the query as given. A missing index yields no results.
pub fn keyword_search(layout: &ProfileLayout, query: &str, granularity: f64) -> Result<Vec<SearchResult>> {
    match Bm25Index::load(layout)? {
        Some(index) => search_index(&index, query, granularity),
        None => {
            log::debug!("No bm25 index under {}", layout.pkg_root().display());
            Ok(Vec::new())
        }
    }
}

pub fn search_index(index: &Bm25Index, query: &str, granularity: f64) -> Result<Vec<SearchResult>> {
    if query.trim().is_empty() {
        return Err(SearchError::EmptyQuery);
    }

    let results = index
        .lookup(&query.to_lowercase())
        .iter()
        .map(|id| SearchResult {
            id: id.clone(),
            score: 1.0,
            explanation: Explanation {
                matched_terms: vec![query.to_string()],
                bm25_score: 1.0,
                semantic_score: 0.0,
                graph_boost: 0.0,
                tie_break: vec![id.clone()],
            },
        })
        .collect();
    Ok(apply_ranking(results, granularity))
}
