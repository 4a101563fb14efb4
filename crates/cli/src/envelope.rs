use auditgraph_pipeline::PipelineError;
use auditgraph_search::SearchError;
use auditgraph_store::StoreError;
use serde::Serialize;
use serde_json::Value;

/// Error shape printed on stdout when a command fails.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct ErrorEnvelope {
    pub code: String,
    pub message: String,
    pub details: Value,
}

impl ErrorEnvelope {
    pub(crate) fn from_error(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");
        for cause in err.chain() {
            if let Some(pipeline) = cause.downcast_ref::<PipelineError>() {
                return Self {
                    code: pipeline.code().to_string(),
                    message,
                    details: pipeline.details(),
                };
            }
            if cause.downcast_ref::<SearchError>().is_some() {
                return Self::plain("search_error", message);
            }
            if cause.downcast_ref::<StoreError>().is_some() {
                return Self::plain("store_error", message);
            }
        }
        Self::plain("error", message)
    }

    fn plain(code: &str, message: String) -> Self {
        Self {
            code: code.to_string(),
            message,
            details: serde_json::json!({}),
        }
    }
}
