use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("batch_size must be greater than zero")]
    InvalidBatchSize,

    #[error("Redaction error: {0}")]
    RedactionError(#[from] auditgraph_redact::RedactionError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
