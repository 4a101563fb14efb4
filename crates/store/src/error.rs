use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Protocol error: {0}")]
    ProtocolError(#[from] auditgraph_protocol::ProtocolError),

    #[error("Redaction error: {0}")]
    RedactionError(#[from] auditgraph_redact::RedactionError),

    #[error("Invalid profile name {name:?}: {reason}")]
    InvalidProfile { name: String, reason: String },

    #[error("Invalid artifact path: {0}")]
    InvalidPath(String),

    #[error("Profile lock {path}: {message}")]
    LockError { path: String, message: String },

    #[error("Walk error: {0}")]
    WalkError(#[from] walkdir::Error),
}
