use crate::document::SourceDocument;
use crate::error::Result;
use crate::language::SourceKind;
use crate::notes::{document_ref, provenance};
use auditgraph_protocol::{canonical_key, Entity, LineRange};
use regex::Regex;

pub const RULE_CODE_SYMBOLS: &str = "extract.code_symbols.v1";

const PYTHON_SYMBOL: &str = r"^(?:async\s+)?(?:def|class)\s+([A-Za-z_][A-Za-z0-9_]*)";
const SCRIPT_SYMBOL: &str = r"^(?:export\s+)?(?:default\s+)?(?:async\s+)?(?:abstract\s+)?(?:function\*?|class)\s+([A-Za-z_$][A-Za-z0-9_$]*)";
const SCRIPT_ARROW: &str = r"^(?:export\s+)?(?:const|let|var)\s+([A-Za-z_$][A-Za-z0-9_$]*)\s*(?::[^=]+)?=\s*(?:async\s+)?(?:\([^)]*\)|[A-Za-z_$][A-Za-z0-9_$]*)\s*(?::[^=]+)?=>";

/// Line-oriented patterns for top-level definitions. Indented lines never match.
pub struct SymbolPatterns {
    python: Regex,
    script: Vec<Regex>,
}

impl SymbolPatterns {
    pub fn new() -> Result<Self> {
        Ok(Self {
            python: Regex::new(PYTHON_SYMBOL)?,
            script: vec![Regex::new(SCRIPT_SYMBOL)?, Regex::new(SCRIPT_ARROW)?],
        })
    }

    /// `(line, name)` pairs in source order.
    pub fn symbols(&self, kind: SourceKind, text: &str) -> Vec<(u32, String)> {
        let patterns: Vec<&Regex> = match kind {
            SourceKind::Python => vec![&self.python],
            SourceKind::JavaScript | SourceKind::TypeScript => self.script.iter().collect(),
            _ => return Vec::new(),
        };
        let mut found = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            let line_no = u32::try_from(idx + 1).unwrap_or(u32::MAX);
            if let Some(name) = patterns
                .iter()
                .find_map(|re| re.captures(line).and_then(|caps| caps.get(1)))
            {
                found.push((line_no, name.as_str().to_string()));
            }
        }
        found
    }
}

/// The `file` entity every code source yields.
pub fn file_entity(doc: &SourceDocument, pipeline_version: &str) -> Entity {
    Entity::new(
        "file",
        doc.file_name(),
        canonical_key("file", &doc.path),
        provenance(RULE_CODE_SYMBOLS, doc, pipeline_version),
        vec![document_ref(doc, LineRange::line(1))],
    )
}

pub fn symbol_entities(
    patterns: &SymbolPatterns,
    doc: &SourceDocument,
    pipeline_version: &str,
) -> Vec<Entity> {
    patterns
        .symbols(doc.kind, &doc.text)
        .into_iter()
        .map(|(line, name)| {
            let key = canonical_key("symbol", &format!("{}#{name}", doc.path));
            Entity::new(
                "symbol",
                name,
                key,
                provenance(RULE_CODE_SYMBOLS, doc, pipeline_version),
                vec![document_ref(doc, LineRange::line(line))],
            )
        })
        .collect()
}
