use crate::budget::BudgetSettings;
use crate::error::{PipelineError, Result};
use auditgraph_protocol::{sha256_json, DEFAULT_PIPELINE_VERSION};
use auditgraph_redact::RedactionSettings;
use auditgraph_search::DEFAULT_SCORE_ROUNDING;
use auditgraph_store::{validate_profile_name, RunSelection};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_PROFILE: &str = "default";
pub const DEFAULT_CONFIG_RELATIVE_PATH: &str = "config/auditgraph.json";

/// Used when a profile lists no allowed extensions at all.
pub const FALLBACK_ALLOWED_EXTENSIONS: &[&str] = &[".md", ".markdown", ".txt", ".log"];

const SNAPSHOT_REDACTION_KEYS: &[&str] = &["key", "key_path", "secret", "secret_key", "key_material"];
const SNAPSHOT_TOP_LEVEL_KEYS: &[&str] = &["redaction_key", "secret", "secret_key"];

/// The configuration written by `auditgraph init` and used when no file is given.
pub fn default_config_value() -> Value {
    json!({
        "active_profile": DEFAULT_PROFILE,
        "run_metadata": { "pipeline_version": DEFAULT_PIPELINE_VERSION },
        "pipeline": { "run_selection": "lexicographic" },
        "security": {
            "redaction": serde_json::to_value(RedactionSettings::default()).unwrap_or_default()
        },
        "storage": {
            "footprint_budget": serde_json::to_value(BudgetSettings::default()).unwrap_or_default()
        },
        "profiles": {
            DEFAULT_PROFILE: {
                "include_paths": ["notes", "repos"],
                "exclude_globs": ["**/node_modules/**", "**/.git/**"],
                "ingestion": {
                    "allowed_extensions": [
                        ".md", ".markdown", ".txt", ".log", ".py", ".js", ".ts", ".tsx", ".jsx"
                    ]
                },
                "search": {
                    "semantic": { "enabled": false },
                    "ranking": { "score_rounding": DEFAULT_SCORE_ROUNDING }
                }
            }
        }
    })
}

// Deserialization mirrors of the on-disk shape. Missing sections fall back to
// `Default`, never to the values of `default_config_value`.

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    active_profile: Option<String>,
    run_metadata: RawRunMetadata,
    pipeline: RawPipeline,
    security: RawSecurity,
    storage: RawStorage,
    profiles: BTreeMap<String, RawProfile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRunMetadata {
    pipeline_version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPipeline {
    run_selection: RunSelection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSecurity {
    redaction: Option<RedactionSettings>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawStorage {
    footprint_budget: Option<BudgetSettings>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawProfile {
    include_paths: Vec<String>,
    exclude_globs: Vec<String>,
    ingestion: RawIngestion,
    search: RawSearch,
    security: RawSecurity,
    storage: RawStorage,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawIngestion {
    allowed_extensions: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSearch {
    semantic: RawSemantic,
    ranking: RawRanking,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSemantic {
    enabled: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRanking {
    score_rounding: Option<f64>,
}

/// Settings of the active profile, with top-level security and storage folded in.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileConfig {
    pub name: String,
    pub include_paths: Vec<String>,
    pub exclude_globs: Vec<String>,
    /// Lower-cased, dot-prefixed.
    pub allowed_extensions: BTreeSet<String>,
    pub semantic_enabled: bool,
    pub score_rounding: f64,
    pub redaction: RedactionSettings,
    pub budget: BudgetSettings,
}

#[derive(Debug, Clone)]
pub struct Config {
    raw: Value,
    source: Option<PathBuf>,
    active_profile: String,
    pipeline_version: String,
    run_selection: RunSelection,
    profile: ProfileConfig,
}

impl Default for Config {
    fn default() -> Self {
        let raw = default_config_value();
        let parsed: RawConfig = serde_json::from_value(raw.clone()).unwrap_or_default();
        let profile = resolve_profile(&parsed, DEFAULT_PROFILE);
        Self {
            raw,
            source: None,
            active_profile: DEFAULT_PROFILE.to_string(),
            pipeline_version: DEFAULT_PIPELINE_VERSION.to_string(),
            run_selection: RunSelection::default(),
            profile,
        }
    }
}

impl Config {
    /// Loads `path`, picking the format by extension (`.json`, `.toml`, otherwise YAML).
    /// No path, or a path that does not exist, yields the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            log::debug!("Config {} not found; using defaults", path.display());
            return Ok(Self::default());
        }
        let display = path.display().to_string();
        let text = fs::read_to_string(path)
            .map_err(|err| PipelineError::config(&display, err.to_string()))?;
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let raw: Value = match ext.as_str() {
            "json" => serde_json::from_str(&text)
                .map_err(|err| PipelineError::config(&display, err.to_string()))?,
            "toml" => toml::from_str(&text)
                .map_err(|err| PipelineError::config(&display, err.to_string()))?,
            _ => serde_yaml::from_str(&text)
                .map_err(|err| PipelineError::config(&display, err.to_string()))?,
        };
        Self::from_raw(raw, Some(path.to_path_buf()))
    }

    /// Validates a raw document and builds the typed views over it.
    pub fn from_raw(raw: Value, source: Option<PathBuf>) -> Result<Self> {
        let origin = source
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "<defaults>".to_string());
        if !raw.is_object() {
            return Err(PipelineError::config(origin, "Config root must be a mapping"));
        }
        let parsed: RawConfig = serde_json::from_value(raw.clone())
            .map_err(|err| PipelineError::config(&origin, err.to_string()))?;

        let active_profile = parsed
            .active_profile
            .clone()
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string());
        validate_profile_name(&active_profile)
            .map_err(|err| PipelineError::security(err.to_string()))?;

        let profile = resolve_profile(&parsed, &active_profile);
        Ok(Self {
            raw,
            source,
            active_profile,
            pipeline_version: parsed
                .run_metadata
                .pipeline_version
                .unwrap_or_else(|| DEFAULT_PIPELINE_VERSION.to_string()),
            run_selection: parsed.pipeline.run_selection,
            profile,
        })
    }

    /// Same document with `active_profile` replaced, so the config hash follows the switch.
    pub fn with_active_profile(&self, name: &str) -> Result<Self> {
        let mut raw = self.raw.clone();
        if let Some(map) = raw.as_object_mut() {
            map.insert("active_profile".to_string(), Value::String(name.to_string()));
        }
        Self::from_raw(raw, self.source.clone())
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn active_profile(&self) -> &str {
        &self.active_profile
    }

    pub fn profile(&self) -> &ProfileConfig {
        &self.profile
    }

    pub fn pipeline_version(&self) -> &str {
        &self.pipeline_version
    }

    pub fn run_selection(&self) -> RunSelection {
        self.run_selection
    }

    /// The raw document with key material removed.
    pub fn snapshot(&self) -> Value {
        let mut snapshot = self.raw.clone();
        if let Some(root) = snapshot.as_object_mut() {
            for key in SNAPSHOT_TOP_LEVEL_KEYS {
                root.remove(*key);
            }
            strip_redaction_secrets(root);
            if let Some(Value::Object(profiles)) = root.get_mut("profiles") {
                for profile in profiles.values_mut() {
                    if let Some(profile) = profile.as_object_mut() {
                        strip_redaction_secrets(profile);
                    }
                }
            }
        }
        snapshot
    }

    pub fn config_hash(&self) -> Result<String> {
        Ok(sha256_json(&self.snapshot())?)
    }
}

fn strip_redaction_secrets(section: &mut Map<String, Value>) {
    let Some(Value::Object(security)) = section.get_mut("security") else {
        return;
    };
    let Some(Value::Object(redaction)) = security.get_mut("redaction") else {
        return;
    };
    for key in SNAPSHOT_REDACTION_KEYS {
        redaction.remove(*key);
    }
}

fn resolve_profile(parsed: &RawConfig, active: &str) -> ProfileConfig {
    let fallback = RawProfile::default();
    let raw = parsed
        .profiles
        .get(active)
        .or_else(|| {
            log::debug!("Profile {active} not configured; using {DEFAULT_PROFILE} settings");
            parsed.profiles.get(DEFAULT_PROFILE)
        })
        .unwrap_or(&fallback);

    let mut allowed_extensions: BTreeSet<String> = raw
        .ingestion
        .allowed_extensions
        .iter()
        .map(|ext| normalize_extension(ext))
        .filter(|ext| ext.len() > 1)
        .collect();
    if allowed_extensions.is_empty() {
        allowed_extensions = FALLBACK_ALLOWED_EXTENSIONS
            .iter()
            .map(|ext| ext.to_string())
            .collect();
    }

    ProfileConfig {
        name: active.to_string(),
        include_paths: raw.include_paths.clone(),
        exclude_globs: raw.exclude_globs.clone(),
        allowed_extensions,
        semantic_enabled: raw.search.semantic.enabled,
        score_rounding: raw
            .search
            .ranking
            .score_rounding
            .unwrap_or(DEFAULT_SCORE_ROUNDING),
        redaction: raw
            .security
            .redaction
            .clone()
            .or_else(|| parsed.security.redaction.clone())
            .unwrap_or_default(),
        budget: raw
            .storage
            .footprint_budget
            .or(parsed.storage.footprint_budget)
            .unwrap_or_default(),
    }
}

fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_ascii_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_describe_the_default_profile() {
        let config = Config::default();
        assert_eq!(config.active_profile(), "default");
        assert_eq!(config.pipeline_version(), "v0.1.0");
        assert_eq!(config.run_selection(), RunSelection::Lexicographic);

        let profile = config.profile();
        assert_eq!(profile.include_paths, vec!["notes", "repos"]);
        assert!(profile.allowed_extensions.contains(".py"));
        assert!(!profile.semantic_enabled);
        assert!(profile.redaction.enabled);
        assert_eq!(profile.redaction.detectors.len(), 6);
        assert_eq!(profile.budget, BudgetSettings::default());
    }

    #[test]
    fn profile_settings_override_top_level() {
        let raw = json!({
            "storage": {"footprint_budget": {"multiplier": 2.0}},
            "security": {"redaction": {"enabled": false}},
            "profiles": {
                "default": {
                    "include_paths": ["docs"],
                    "storage": {"footprint_budget": {"multiplier": 1.0, "warn_threshold": 0.5}},
                    "ingestion": {"allowed_extensions": ["MD", ".Txt"]}
                }
            }
        });
        let config = Config::from_raw(raw, None).unwrap();
        let profile = config.profile();
        assert_eq!(profile.budget.multiplier, 1.0);
        assert_eq!(profile.budget.warn_threshold, 0.5);
        assert_eq!(profile.budget.block_threshold, 1.0);
        assert!(!profile.redaction.enabled);
        assert_eq!(
            profile.allowed_extensions.iter().cloned().collect::<Vec<_>>(),
            vec![".md", ".txt"]
        );
    }

    #[test]
    fn unknown_profile_falls_back_to_default() {
        let config = Config::default().with_active_profile("team").unwrap();
        assert_eq!(config.active_profile(), "team");
        assert_eq!(config.profile().name, "team");
        assert_eq!(config.profile().include_paths, vec!["notes", "repos"]);
    }

    #[test]
    fn empty_extension_list_uses_text_fallback() {
        let config = Config::from_raw(json!({"profiles": {"default": {}}}), None).unwrap();
        assert_eq!(config.profile().allowed_extensions.len(), 4);
        assert!(config.profile().include_paths.is_empty());
    }

    #[test]
    fn traversal_profile_names_are_rejected() {
        let err = Config::default().with_active_profile("../evil").unwrap_err();
        assert!(matches!(err, PipelineError::SecurityPolicy { .. }));
    }

    #[test]
    fn non_mapping_root_is_a_config_error() {
        let err = Config::from_raw(json!(["a"]), None).unwrap_err();
        assert!(matches!(err, PipelineError::Config { .. }));
        assert!(err.to_string().contains("Config root must be a mapping"));
    }

    #[test]
    fn snapshot_strips_key_material_and_hash_ignores_it() {
        let mut raw = default_config_value();
        raw["redaction_key"] = json!("top");
        raw["security"]["redaction"]["key"] = json!("abc");
        let config = Config::from_raw(raw, None).unwrap();

        let snapshot = config.snapshot();
        assert!(snapshot.get("redaction_key").is_none());
        assert!(snapshot["security"]["redaction"].get("key").is_none());
        assert_eq!(config.config_hash().unwrap(), Config::default().config_hash().unwrap());

        let mut raw = default_config_value();
        raw["profiles"]["default"]["security"] = json!({"redaction": {"secret": "x", "enabled": true}});
        let snapshot = Config::from_raw(raw, None).unwrap().snapshot();
        assert_eq!(
            snapshot["profiles"]["default"]["security"]["redaction"],
            json!({"enabled": true})
        );
    }

    #[test]
    fn loads_yaml_toml_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("c.yaml");
        fs::write(&yaml, "active_profile: work\nprofiles:\n  work:\n    include_paths: [a]\n").unwrap();
        let toml_path = dir.path().join("c.toml");
        fs::write(&toml_path, "active_profile = \"work\"\n[profiles.work]\ninclude_paths = [\"b\"]\n").unwrap();
        let json_path = dir.path().join("c.json");
        fs::write(&json_path, r#"{"profiles": {"default": {"include_paths": ["c"]}}}"#).unwrap();

        assert_eq!(Config::load(Some(&yaml)).unwrap().profile().include_paths, vec!["a"]);
        assert_eq!(Config::load(Some(&toml_path)).unwrap().profile().include_paths, vec!["b"]);
        assert_eq!(Config::load(Some(&json_path)).unwrap().profile().include_paths, vec!["c"]);
        assert_eq!(
            Config::load(Some(&dir.path().join("missing.yaml"))).unwrap().active_profile(),
            "default"
        );
    }
}
