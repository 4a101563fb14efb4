use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RedactionError>;

#[derive(Error, Debug)]
pub enum RedactionError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Redaction key at {path} is unusable: {reason}")]
    InvalidKey { path: PathBuf, reason: String },

    #[error("Redaction is enabled but no key was provided")]
    MissingKey,

    #[error("Invalid detector pattern for {name}: {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },
}
