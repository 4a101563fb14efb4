use serde::{Deserialize, Serialize};

const DELIMITER: &str = "---";

/// The small set of front-matter keys auditgraph keeps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frontmatter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Frontmatter {
    /// Parses `key: value` lines between a leading `---` line and the next one.
    /// Text without a leading delimiter yields an empty block.
    pub fn parse(text: &str) -> Self {
        let mut lines = text.lines();
        let mut block = Self::default();
        if lines.next().map(str::trim) != Some(DELIMITER) {
            return block;
        }
        for line in lines {
            if line.trim() == DELIMITER {
                break;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim().to_string();
            match key.trim() {
                "title" => block.title = Some(value),
                "tags" => block.tags = Some(parse_tags(&value)),
                "project" => block.project = Some(value),
                "status" => block.status = Some(value),
                _ => {}
            }
        }
        block
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn tags(&self) -> &[String] {
        self.tags.as_deref().unwrap_or_default()
    }
}

fn parse_tags(value: &str) -> Vec<String> {
    value
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_known_keys() {
        let text = "---\ntitle: Smoke Note\ntags: [ops, infra , ]\nowner: me\nstatus: draft\n---\n# Body\ntitle: ignored";
        let block = Frontmatter::parse(text);
        assert_eq!(
            block,
            Frontmatter {
                title: Some("Smoke Note".into()),
                tags: Some(vec!["ops".into(), "infra".into()]),
                project: None,
                status: Some("draft".into()),
            }
        );
    }

    #[test]
    fn requires_leading_delimiter() {
        assert!(Frontmatter::parse("# Title\n---\ntitle: x\n---").is_empty());
        assert!(Frontmatter::parse("").is_empty());
    }

    #[test]
    fn value_may_contain_colons() {
        let block = Frontmatter::parse("---\ntitle: ADR: use JSON\n---");
        assert_eq!(block.title.as_deref(), Some("ADR: use JSON"));
    }

    #[test]
    fn empty_fields_are_omitted_when_serialized() {
        let block = Frontmatter::parse("---\ntitle: A\n---");
        assert_eq!(serde_json::to_value(&block).unwrap(), serde_json::json!({"title": "A"}));
    }
}
