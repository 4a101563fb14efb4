use crate::io::{write_bytes_atomic, write_json_value};
use crate::{ProfileLayout, Result};
use auditgraph_redact::{RedactionSummary, Redactor};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// The single way artifacts reach disk: every payload passes through the profile's
/// redactor first, and the per-category counts are accumulated for the run.
pub struct ArtifactWriter<'r> {
    layout: ProfileLayout,
    redactor: &'r Redactor,
    summary: RedactionSummary,
}

impl<'r> ArtifactWriter<'r> {
    pub fn new(layout: ProfileLayout, redactor: &'r Redactor) -> Self {
        Self {
            layout,
            redactor,
            summary: RedactionSummary::default(),
        }
    }

    pub fn layout(&self) -> &ProfileLayout {
        &self.layout
    }

    pub fn redactor(&self) -> &Redactor {
        self.redactor
    }

    /// Everything redacted by this writer so far.
    pub fn summary(&self) -> &RedactionSummary {
        &self.summary
    }

    /// Returns the path relative to the package root.
    pub fn write_json<T: Serialize + ?Sized>(&mut self, path: &Path, payload: &T) -> Result<String> {
        let redacted = self.redactor.redact_serializable(payload)?;
        self.summary.merge(&redacted.summary);
        write_json_value(path, redacted.value)?;
        Ok(self.layout.relative(path))
    }

    /// Redacts a record in memory, yielding the form it would have on disk.
    pub(crate) fn redact_record<T: Serialize + DeserializeOwned>(&mut self, record: &T) -> Result<T> {
        let redacted = self.redactor.redact_serializable(record)?;
        self.summary.merge(&redacted.summary);
        Ok(serde_json::from_value(redacted.value)?)
    }

    pub fn write_text(&mut self, path: &Path, text: &str) -> Result<String> {
        let redacted = self.redactor.redact_text(text);
        self.summary.merge(&redacted.summary);
        write_bytes_atomic(path, redacted.value.as_bytes())?;
        Ok(self.layout.relative(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auditgraph_redact::{RedactionKey, RedactionPolicy};
    use serde_json::json;

    #[test]
    fn persisted_bytes_never_hold_the_secret() {
        let dir = tempfile::tempdir().unwrap();
        let redactor = Redactor::new(
            RedactionPolicy::standard().unwrap(),
            Some(RedactionKey::from_bytes([9; 32])),
        )
        .unwrap();
        let layout = ProfileLayout::at(dir.path());
        let mut writer = ArtifactWriter::new(layout.clone(), &redactor);

        let rel = writer
            .write_json(
                &layout.source_metadata_path("abc"),
                &json!({"frontmatter": {"title": "password=S011_SECRET_SENTINEL"}}),
            )
            .unwrap();
        writer
            .write_text(&dir.path().join("log.txt"), "token=S011_SECRET_SENTINEL\n")
            .unwrap();

        assert_eq!(rel, "sources/abc.json");
        let json = std::fs::read_to_string(layout.source_metadata_path("abc")).unwrap();
        let text = std::fs::read_to_string(dir.path().join("log.txt")).unwrap();
        assert!(!json.contains("S011_SECRET_SENTINEL"));
        assert!(!text.contains("S011_SECRET_SENTINEL"));
        assert!(text.ends_with('\n'));
        assert_eq!(writer.summary().total_matches, 2);
    }
}
