use crate::config::ProfileConfig;
use auditgraph_extract::SourceKind;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

pub const SKIP_REASON_UNSUPPORTED: &str = "unsupported_extension";
pub const SKIP_REASON_READ_ERROR: &str = "read_error";

/// Extension allow-list deciding which discovered files are parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionPolicy {
    allowed_extensions: BTreeSet<String>,
}

impl IngestionPolicy {
    pub fn new(allowed_extensions: BTreeSet<String>) -> Self {
        Self { allowed_extensions }
    }

    pub fn from_profile(profile: &ProfileConfig) -> Self {
        Self::new(profile.allowed_extensions.clone())
    }

    pub fn allowed_extensions(&self) -> &BTreeSet<String> {
        &self.allowed_extensions
    }

    pub fn is_allowed(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.allowed_extensions
                    .contains(&format!(".{}", ext.to_ascii_lowercase()))
            })
            .unwrap_or(false)
    }

    pub fn parser_id(&self, path: &Path) -> &'static str {
        SourceKind::from_path(path).parser_id()
    }

    /// Splits into `(allowed, skipped)`, preserving order.
    pub fn split(&self, files: Vec<PathBuf>) -> (Vec<PathBuf>, Vec<PathBuf>) {
        files.into_iter().partition(|path| self.is_allowed(path))
    }
}
