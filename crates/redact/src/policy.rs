use crate::detector::{Detector, BUILTIN_DETECTORS};
use crate::Result;
use serde::{Deserialize, Serialize};

pub const DEFAULT_POLICY_ID: &str = "redaction.policy.v1";
pub const DEFAULT_POLICY_VERSION: &str = "v1";

/// `security.redaction` as it appears in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedactionSettings {
    pub enabled: bool,
    pub policy_id: String,
    pub policy_version: String,
    pub detectors: Vec<String>,
}

impl Default for RedactionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            policy_id: DEFAULT_POLICY_ID.to_string(),
            policy_version: DEFAULT_POLICY_VERSION.to_string(),
            detectors: BUILTIN_DETECTORS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RedactionPolicy {
    pub policy_id: String,
    pub policy_version: String,
    pub enabled: bool,
    pub detectors: Vec<Detector>,
}

impl RedactionPolicy {
    /// Builds the policy, keeping the configured detector order. Unknown detector
    /// names are dropped with a warning.
    pub fn from_settings(settings: &RedactionSettings) -> Result<Self> {
        let mut detectors = Vec::with_capacity(settings.detectors.len());
        for name in &settings.detectors {
            match Detector::builtin(name)? {
                Some(detector) => detectors.push(detector),
                None => log::warn!("Ignoring unknown redaction detector {name}"),
            }
        }
        Ok(Self {
            policy_id: settings.policy_id.clone(),
            policy_version: settings.policy_version.clone(),
            enabled: settings.enabled,
            detectors,
        })
    }

    pub fn standard() -> Result<Self> {
        Self::from_settings(&RedactionSettings::default())
    }

    pub fn disabled() -> Self {
        Self {
            policy_id: DEFAULT_POLICY_ID.to_string(),
            policy_version: DEFAULT_POLICY_VERSION.to_string(),
            enabled: false,
            detectors: Vec::new(),
        }
    }

    pub fn detector_names(&self) -> Vec<&str> {
        self.detectors.iter().map(Detector::name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_enable_all_builtins() {
        let policy = RedactionPolicy::standard().unwrap();
        assert!(policy.enabled);
        assert_eq!(policy.policy_id, "redaction.policy.v1");
        assert_eq!(policy.detector_names(), BUILTIN_DETECTORS.to_vec());
    }

    #[test]
    fn configured_order_is_kept_and_unknowns_dropped() {
        let settings = RedactionSettings {
            detectors: vec!["vendor_token".into(), "nope".into(), "jwt".into()],
            ..RedactionSettings::default()
        };
        let policy = RedactionPolicy::from_settings(&settings).unwrap();
        assert_eq!(policy.detector_names(), vec!["vendor_token", "jwt"]);
    }

    #[test]
    fn partial_settings_fill_defaults() {
        let settings: RedactionSettings =
            serde_json::from_value(serde_json::json!({"enabled": false})).unwrap();
        assert!(!settings.enabled);
        assert_eq!(settings.detectors.len(), BUILTIN_DETECTORS.len());
    }
}
