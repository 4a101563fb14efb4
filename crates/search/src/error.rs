use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Store error: {0}")]
    StoreError(#[from] auditgraph_store::StoreError),

    #[error("Empty query")]
    EmptyQuery,
}
