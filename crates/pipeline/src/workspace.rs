use crate::config::{default_config_value, Config, DEFAULT_CONFIG_RELATIVE_PATH};
use crate::error::{PipelineError, Result};
use auditgraph_redact::{RedactionKey, RedactionPolicy, RedactionSettings, Redactor};
use auditgraph_store::{write_json_value, ProfileLayout, StoreError};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Package root of the configured active profile.
pub fn profile_layout(root: &Path, config: &Config) -> Result<ProfileLayout> {
    ProfileLayout::for_profile(root, config.active_profile()).map_err(|err| match err {
        StoreError::InvalidProfile { .. } => PipelineError::security(err.to_string()),
        other => other.into(),
    })
}

/// Redactor for one run. An enabled policy loads (or creates) the profile key; a key
/// that exists but cannot be used fails closed.
pub fn profile_redactor(layout: &ProfileLayout, settings: &RedactionSettings) -> Result<Redactor> {
    let policy = RedactionPolicy::from_settings(settings)?;
    if !policy.enabled {
        log::debug!("Redaction disabled for {}", layout.pkg_root().display());
        return Ok(Redactor::new(policy, None)?);
    }
    let key = RedactionKey::load_or_create(&layout.secrets_dir())
        .map_err(|err| PipelineError::security(err.to_string()))?;
    Ok(Redactor::new(policy, Some(key))?)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitReport {
    pub config_path: String,
    /// Paths created by this call, relative to the workspace root.
    pub created: Vec<String>,
}

/// Writes the default configuration and the default include directories, leaving
/// anything that already exists untouched.
pub fn init_workspace(root: &Path) -> Result<InitReport> {
    let mut created = Vec::new();
    let config_path = root.join(DEFAULT_CONFIG_RELATIVE_PATH);
    if !config_path.exists() {
        write_json_value(&config_path, default_config_value())?;
        created.push(DEFAULT_CONFIG_RELATIVE_PATH.to_string());
    }
    for dir in ["notes", "repos"] {
        let path = root.join(dir);
        if !path.exists() {
            fs::create_dir_all(&path)?;
            created.push(dir.to_string());
        }
    }
    log::info!("Initialized workspace at {}", root.display());
    Ok(InitReport {
        config_path: DEFAULT_CONFIG_RELATIVE_PATH.to_string(),
        created,
    })
}
