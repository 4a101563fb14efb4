//! # Auditgraph Extract
//!
//! Turns recorded sources into graph entities and claims.
//!
//! ## Rules
//!
//! ```text
//! SourceDocument
//!     │
//!     ├──> Markdown ──> note entity, tag entities, ADR decision claim
//!     ├──> Code     ──> file entity, top-level symbol entities
//!     └──> Text/Log ──> error signature claims
//! ```
//!
//! Every identifier is derived from content (canonical keys and claim text), so running
//! the same documents through [`Extractor`] twice yields identical [`Extraction`]s.
//!
//! ## Example
//!
//! ```rust
//! use auditgraph_extract::{Extraction, Extractor, SourceDocument};
//!
//! let extractor = Extractor::new("v0.1.0").unwrap();
//! let mut out = Extraction::new();
//! let doc = SourceDocument::new("notes/smoke.md", "abc123", "---\ntitle: Smoke Note\n---\n");
//! extractor.extract(&doc, &mut out);
//! assert_eq!(out.entities().next().unwrap().name, "Smoke Note");
//! ```

mod adr;
mod code;
mod document;
mod error;
mod extractor;
mod frontmatter;
mod language;
mod logs;
mod notes;

pub use adr::{decision_claim, decision_title, is_decision_record, RULE_ADR};
pub use code::{file_entity, symbol_entities, SymbolPatterns, RULE_CODE_SYMBOLS};
pub use document::SourceDocument;
pub use error::{ExtractError, Result};
pub use extractor::{Extraction, Extractor};
pub use frontmatter::Frontmatter;
pub use language::{SourceKind, PARSER_CODE, PARSER_MARKDOWN, PARSER_PLAIN, PARSER_UNKNOWN};
pub use logs::{error_signatures, signature_claims, RULE_LOG_SIGNATURE};
pub use notes::{note_entity, tag_entities, RULE_NOTE, RULE_NOTE_TAGS};
