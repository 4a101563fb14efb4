use crate::detector::Detector;
use crate::{RedactionError, RedactionKey, RedactionPolicy, RedactionSummary, Result};
use hmac::{Hmac, Mac};
use serde::Serialize;
use serde_json::Value;
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

const MARKER_OPEN: &str = "<<redacted:";
const MARKER_CLOSE: &str = ">>";
const DIGEST_CHARS: usize = 12;

/// A redacted value together with what was replaced to produce it.
#[derive(Debug, Clone, PartialEq)]
pub struct Redacted<T> {
    pub value: T,
    pub summary: RedactionSummary,
}

pub struct Redactor {
    policy: RedactionPolicy,
    mac: Option<HmacSha256>,
}

impl fmt::Debug for Redactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Redactor")
            .field("policy", &self.policy)
            .field("keyed", &self.mac.is_some())
            .finish()
    }
}

impl Redactor {
    /// An enabled policy requires a key; a disabled one ignores it.
    pub fn new(policy: RedactionPolicy, key: Option<RedactionKey>) -> Result<Self> {
        if !policy.enabled {
            return Ok(Self { policy, mac: None });
        }
        let key = key.ok_or(RedactionError::MissingKey)?;
        let mac = <HmacSha256 as Mac>::new_from_slice(key.as_bytes()).map_err(|err| {
            RedactionError::InvalidKey {
                path: Default::default(),
                reason: err.to_string(),
            }
        })?;
        Ok(Self {
            policy,
            mac: Some(mac),
        })
    }

    pub fn disabled() -> Self {
        Self {
            policy: RedactionPolicy::disabled(),
            mac: None,
        }
    }

    pub fn policy(&self) -> &RedactionPolicy {
        &self.policy
    }

    pub fn is_enabled(&self) -> bool {
        self.policy.enabled && self.mac.is_some()
    }

    pub fn redact_text(&self, text: &str) -> Redacted<String> {
        let mut summary = RedactionSummary::default();
        let value = self.redact_str(text, &mut summary);
        Redacted { value, summary }
    }

    /// Walks the payload: strings are redacted, containers recursed, other scalars
    /// returned unchanged. Object keys are never rewritten.
    pub fn redact_value(&self, value: Value) -> Redacted<Value> {
        let mut summary = RedactionSummary::default();
        let value = self.visit(value, &mut summary);
        Redacted { value, summary }
    }

    pub fn redact_serializable<T: Serialize + ?Sized>(&self, payload: &T) -> Result<Redacted<Value>> {
        Ok(self.redact_value(serde_json::to_value(payload)?))
    }

    fn visit(&self, value: Value, summary: &mut RedactionSummary) -> Value {
        match value {
            Value::String(text) => Value::String(self.redact_str(&text, summary)),
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| self.visit(item, summary))
                    .collect(),
            ),
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, item)| (key, self.visit(item, summary)))
                    .collect(),
            ),
            scalar @ (Value::Null | Value::Bool(_) | Value::Number(_)) => scalar,
        }
    }

    fn redact_str(&self, text: &str, summary: &mut RedactionSummary) -> String {
        let Some(mac) = self.mac.as_ref().filter(|_| self.policy.enabled) else {
            return text.to_string();
        };
        let mut current = text.to_string();
        for detector in &self.policy.detectors {
            if let Some(next) = apply_detector(&current, detector, mac, summary) {
                current = next;
            }
        }
        current
    }
}

fn marker(category: &str, secret: &str, mac: &HmacSha256) -> String {
    let digest = mac.clone().chain_update(secret.as_bytes()).finalize().into_bytes();
    let digest = hex::encode(digest);
    format!("{MARKER_OPEN}{category}:{}{MARKER_CLOSE}", &digest[..DIGEST_CHARS])
}

/// Byte spans of markers already present, so a later detector never rewrites one.
fn marker_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut cursor = 0;
    while let Some(open) = text[cursor..].find(MARKER_OPEN) {
        let start = cursor + open;
        let Some(close) = text[start..].find(MARKER_CLOSE) else {
            break;
        };
        let end = start + close + MARKER_CLOSE.len();
        spans.push((start, end));
        cursor = end;
    }
    spans
}

/// Left-to-right scan replacing only the secret group of each match. Matches that
/// start before the cursor are skipped. Returns `None` when nothing was replaced.
fn apply_detector(
    text: &str,
    detector: &Detector,
    mac: &HmacSha256,
    summary: &mut RedactionSummary,
) -> Option<String> {
    if text.is_empty() {
        return None;
    }
    let protected = marker_spans(text);
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut replaced = false;

    for caps in detector.pattern().captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let secret = caps.get(detector.group()).unwrap_or(whole);
        if secret.start() < last || secret.as_str().is_empty() {
            continue;
        }
        if protected
            .iter()
            .any(|(start, end)| secret.start() < *end && *start < secret.end())
        {
            continue;
        }
        out.push_str(&text[last..secret.start()]);
        out.push_str(&marker(detector.category(), secret.as_str(), mac));
        out.push_str(&text[secret.end()..whole.end()]);
        last = whole.end();
        summary.add(detector.category(), 1);
        replaced = true;
    }

    if !replaced {
        return None;
    }
    out.push_str(&text[last..]);
    Some(out)
}
