use crate::budget::BudgetReport;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid configuration {path}: {message}")]
    Config { path: String, message: String },

    #[error("Security policy violation: {message}")]
    SecurityPolicy { message: String },

    #[error("{label} must remain within {base} (got {path})")]
    PathPolicy {
        label: String,
        path: String,
        base: String,
    },

    #[error("{}", .0.message)]
    Budget(BudgetReport),

    #[error(
        "{message}. Current={current}, Existing={}. Run 'auditgraph rebuild' to regenerate artifacts.",
        .existing.as_deref().unwrap_or("unknown")
    )]
    Compatibility {
        message: String,
        current: String,
        existing: Option<String>,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Protocol error: {0}")]
    ProtocolError(#[from] auditgraph_protocol::ProtocolError),

    #[error("Store error: {0}")]
    StoreError(#[from] auditgraph_store::StoreError),

    #[error("Redaction error: {0}")]
    RedactionError(#[from] auditgraph_redact::RedactionError),

    #[error("Extraction error: {0}")]
    ExtractError(#[from] auditgraph_extract::ExtractError),

    #[error("Graph error: {0}")]
    GraphError(#[from] auditgraph_graph::GraphError),

    #[error("Search error: {0}")]
    SearchError(#[from] auditgraph_search::SearchError),

    #[error("Walk error: {0}")]
    WalkError(#[from] walkdir::Error),
}

impl PipelineError {
    pub fn config(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn security(message: impl Into<String>) -> Self {
        Self::SecurityPolicy {
            message: message.into(),
        }
    }

    /// Stable machine-readable code, used by the CLI error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config_error",
            Self::SecurityPolicy { .. } => "security_policy_error",
            Self::PathPolicy { .. } => "path_policy_error",
            Self::Budget(_) => "budget_error",
            Self::Compatibility { .. } => "compatibility_error",
            Self::IoError(_) | Self::WalkError(_) => "io_error",
            Self::SerializationError(_) => "serialization_error",
            Self::ProtocolError(_)
            | Self::StoreError(_)
            | Self::RedactionError(_)
            | Self::ExtractError(_)
            | Self::GraphError(_)
            | Self::SearchError(_) => "internal_error",
        }
    }

    /// Structured detail for the error envelope.
    pub fn details(&self) -> serde_json::Value {
        match self {
            Self::Config { path, .. } => serde_json::json!({ "path": path }),
            Self::PathPolicy { label, path, base } => {
                serde_json::json!({ "label": label, "path": path, "base": base })
            }
            Self::Budget(report) => serde_json::to_value(report).unwrap_or_default(),
            Self::Compatibility {
                current, existing, ..
            } => serde_json::json!({ "current": current, "existing": existing }),
            _ => serde_json::json!({}),
        }
    }
}
