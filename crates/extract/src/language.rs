use std::path::Path;

pub const PARSER_MARKDOWN: &str = "text/markdown";
pub const PARSER_PLAIN: &str = "text/plain";
pub const PARSER_CODE: &str = "text/code";
pub const PARSER_UNKNOWN: &str = "text/unknown";

/// Kind of source file, detected from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Markdown,
    PlainText,
    Log,
    Python,
    JavaScript,
    TypeScript,
    Unknown,
}

impl SourceKind {
    pub fn from_extension(ext: &str) -> Self {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "md" | "markdown" => SourceKind::Markdown,
            "txt" => SourceKind::PlainText,
            "log" => SourceKind::Log,
            "py" => SourceKind::Python,
            "js" | "jsx" => SourceKind::JavaScript,
            "ts" | "tsx" => SourceKind::TypeScript,
            _ => SourceKind::Unknown,
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(SourceKind::Unknown)
    }

    /// Parser identifier recorded on ingest records.
    pub fn parser_id(self) -> &'static str {
        match self {
            SourceKind::Markdown => PARSER_MARKDOWN,
            SourceKind::PlainText | SourceKind::Log => PARSER_PLAIN,
            SourceKind::Python | SourceKind::JavaScript | SourceKind::TypeScript => PARSER_CODE,
            SourceKind::Unknown => PARSER_UNKNOWN,
        }
    }

    pub fn is_code(self) -> bool {
        matches!(
            self,
            SourceKind::Python | SourceKind::JavaScript | SourceKind::TypeScript
        )
    }

    /// Files scanned line by line for error signatures.
    pub fn carries_log_lines(self) -> bool {
        matches!(self, SourceKind::PlainText | SourceKind::Log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_kinds_case_insensitively() {
        assert_eq!(SourceKind::from_path("notes/A.MD"), SourceKind::Markdown);
        assert_eq!(SourceKind::from_path("app.tsx"), SourceKind::TypeScript);
        assert_eq!(SourceKind::from_extension(".log"), SourceKind::Log);
        assert_eq!(SourceKind::from_path("Makefile"), SourceKind::Unknown);
    }

    #[test]
    fn parser_ids() {
        assert_eq!(SourceKind::Markdown.parser_id(), "text/markdown");
        assert_eq!(SourceKind::Log.parser_id(), "text/plain");
        assert_eq!(SourceKind::Python.parser_id(), "text/code");
        assert_eq!(SourceKind::Unknown.parser_id(), "text/unknown");
    }
}
