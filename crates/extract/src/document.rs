use crate::frontmatter::Frontmatter;
use crate::language::SourceKind;
use std::path::Path;

/// A recorded source, re-read and ready for extraction.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Workspace-relative posix path.
    pub path: String,
    pub source_hash: String,
    pub kind: SourceKind,
    pub text: String,
    pub frontmatter: Frontmatter,
}

impl SourceDocument {
    /// Builds a document, parsing front matter for markdown sources.
    pub fn new(path: impl Into<String>, source_hash: impl Into<String>, text: impl Into<String>) -> Self {
        let path = path.into();
        let text = text.into();
        let kind = SourceKind::from_path(&path);
        let frontmatter = if kind == SourceKind::Markdown {
            Frontmatter::parse(&text)
        } else {
            Frontmatter::default()
        };
        Self {
            path,
            source_hash: source_hash.into(),
            kind,
            text,
            frontmatter,
        }
    }

    /// Replaces the parsed front matter with the block recorded at ingest.
    #[must_use]
    pub fn with_frontmatter(mut self, frontmatter: Frontmatter) -> Self {
        self.frontmatter = frontmatter;
        self
    }

    pub fn file_name(&self) -> &str {
        Path::new(&self.path)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&self.path)
    }

    pub fn file_stem(&self) -> &str {
        Path::new(&self.path)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(&self.path)
    }

    /// Body text with a leading front-matter block removed.
    pub fn body(&self) -> &str {
        let Some(rest) = self
            .text
            .strip_prefix("---\n")
            .or_else(|| self.text.strip_prefix("---\r\n"))
        else {
            return &self.text;
        };
        let mut offset = 0;
        for line in rest.split_inclusive('\n') {
            offset += line.len();
            if line.trim() == "---" {
                return &rest[offset..];
            }
        }
        &self.text
    }
}
