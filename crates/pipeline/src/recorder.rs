use crate::policy::{IngestionPolicy, SKIP_REASON_READ_ERROR, SKIP_REASON_UNSUPPORTED};
use auditgraph_extract::{Frontmatter, SourceKind, PARSER_MARKDOWN, PARSER_UNKNOWN};
use auditgraph_protocol::{relative_posix, sha256_file, to_posix, IngestRecord, ParseStatus};
use serde_json::Value;
use std::fs;
use std::io;
use std::path::Path;
use std::time::UNIX_EPOCH;

/// An ingest record plus the metadata document stored at `sources/<hash>.json`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedSource {
    pub record: IngestRecord,
    /// `None` when the file could not be read; nothing is written for it.
    pub metadata: Option<Value>,
}

/// Hashes and describes one discovered file. Files outside the allow-list are recorded
/// as skipped; files that vanish or cannot be read become `read_error` records.
pub fn record_source(path: &Path, root: &Path, policy: &IngestionPolicy) -> RecordedSource {
    let relative = relative_posix(path, root).unwrap_or_else(|_| to_posix(path));
    let allowed = policy.is_allowed(path);
    match describe(path, allowed) {
        Ok(described) => {
            let (parse_status, skip_reason) = if allowed {
                (ParseStatus::Ok, None)
            } else {
                log::debug!("Skipping {relative}: {SKIP_REASON_UNSUPPORTED}");
                (ParseStatus::Skipped, Some(SKIP_REASON_UNSUPPORTED.to_string()))
            };
            let record = IngestRecord {
                path: relative,
                source_hash: described.source_hash,
                size: described.size,
                mtime: described.mtime,
                parser_id: described.parser_id.to_string(),
                parse_status,
                skip_reason,
            };
            let mut metadata = serde_json::to_value(&record).unwrap_or_default();
            if let (Some(frontmatter), Value::Object(map)) = (described.frontmatter, &mut metadata) {
                map.insert(
                    "frontmatter".to_string(),
                    serde_json::to_value(frontmatter).unwrap_or_default(),
                );
            }
            RecordedSource {
                record,
                metadata: Some(metadata),
            }
        }
        Err(err) => {
            log::warn!("Failed to read {relative}: {err}");
            RecordedSource {
                record: IngestRecord {
                    path: relative,
                    source_hash: String::new(),
                    size: 0,
                    mtime: 0.0,
                    parser_id: if allowed {
                        policy.parser_id(path).to_string()
                    } else {
                        PARSER_UNKNOWN.to_string()
                    },
                    parse_status: ParseStatus::Skipped,
                    skip_reason: Some(SKIP_REASON_READ_ERROR.to_string()),
                },
                metadata: None,
            }
        }
    }
}

struct Described {
    source_hash: String,
    size: u64,
    mtime: f64,
    parser_id: &'static str,
    frontmatter: Option<Frontmatter>,
}

fn describe(path: &Path, allowed: bool) -> io::Result<Described> {
    let stat = fs::metadata(path)?;
    let source_hash = sha256_file(path)?;
    let mtime = stat
        .modified()
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or(0.0);

    let parser_id = if allowed {
        SourceKind::from_path(path).parser_id()
    } else {
        PARSER_UNKNOWN
    };
    let frontmatter = if parser_id == PARSER_MARKDOWN {
        let bytes = fs::read(path)?;
        Some(Frontmatter::parse(&String::from_utf8_lossy(&bytes)))
    } else {
        None
    };
    Ok(Described {
        source_hash,
        size: stat.len(),
        mtime,
        parser_id,
        frontmatter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn policy() -> IngestionPolicy {
        IngestionPolicy::new([".md", ".txt"].iter().map(|e| e.to_string()).collect())
    }

    #[test]
    fn markdown_metadata_carries_frontmatter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes/smoke.md");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "---\ntitle: Smoke Note\ntags: [a, b]\n---\nbody\n").unwrap();

        let recorded = record_source(&path, dir.path(), &policy());
        assert_eq!(recorded.record.path, "notes/smoke.md");
        assert_eq!(recorded.record.parser_id, "text/markdown");
        assert!(recorded.record.is_ok());
        assert_eq!(recorded.record.source_hash, sha256_file(&path).unwrap());

        let metadata = recorded.metadata.unwrap();
        assert_eq!(metadata["frontmatter"], json!({"title": "Smoke Note", "tags": ["a", "b"]}));
        assert_eq!(metadata["path"], json!("notes/smoke.md"));
        assert_eq!(metadata["skip_reason"], Value::Null);
    }

    #[test]
    fn unsupported_files_are_hashed_but_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.png");
        fs::write(&path, [1u8, 2, 3]).unwrap();

        let recorded = record_source(&path, dir.path(), &policy());
        assert_eq!(recorded.record.parse_status, ParseStatus::Skipped);
        assert_eq!(recorded.record.skip_reason.as_deref(), Some("unsupported_extension"));
        assert_eq!(recorded.record.parser_id, "text/unknown");
        assert_eq!(recorded.record.size, 3);
        assert!(recorded.metadata.unwrap().get("frontmatter").is_none());
    }

    #[test]
    fn vanished_files_become_read_errors() {
        let dir = tempfile::tempdir().unwrap();
        let recorded = record_source(&dir.path().join("gone.md"), dir.path(), &policy());
        assert_eq!(recorded.record.skip_reason.as_deref(), Some("read_error"));
        assert_eq!(recorded.record.source_hash, "");
        assert!(recorded.metadata.is_none());
    }
}
