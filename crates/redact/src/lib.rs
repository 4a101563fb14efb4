//! # Auditgraph Redaction
//!
//! Masks secrets in text and JSON payloads before anything reaches disk.
//!
//! A secret is replaced by `<<redacted:{category}:{digest12}>>`, where `digest12`
//! is the first 12 hex characters of `HMAC-SHA256(profile_key, secret)`. The same
//! secret under the same key always yields the same marker; a different profile key
//! yields an unrelated one.
//!
//! ```no_run
//! use auditgraph_redact::{RedactionKey, RedactionPolicy, Redactor};
//!
//! # fn main() -> auditgraph_redact::Result<()> {
//! let key = RedactionKey::load_or_create(std::path::Path::new(".pkg/profiles/default/secrets"))?;
//! let redactor = Redactor::new(RedactionPolicy::standard()?, Some(key))?;
//! let out = redactor.redact_text("password=hunter2");
//! assert!(!out.value.contains("hunter2"));
//! # Ok(())
//! # }
//! ```

mod detector;
mod error;
mod key;
mod policy;
mod redactor;
mod summary;

pub use detector::{Detector, BUILTIN_DETECTORS};
pub use error::{RedactionError, Result};
pub use key::{RedactionKey, REDACTION_KEY_FILE_NAME};
pub use policy::{RedactionPolicy, RedactionSettings};
pub use redactor::{Redacted, Redactor};
pub use summary::RedactionSummary;
