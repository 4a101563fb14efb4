use crate::{Result, StoreError};
use auditgraph_protocol::{
    shard_for, to_posix, Stage, CONFIG_SNAPSHOT_NAME, INGEST_MANIFEST_NAME, REPLAY_LOG_NAME,
};
use auditgraph_redact::REDACTION_KEY_FILE_NAME;
use std::path::{Path, PathBuf};

pub const PKG_DIR_NAME: &str = ".pkg";
pub const PROFILES_DIR_NAME: &str = "profiles";
pub const LOCK_FILE_NAME: &str = ".lock";
pub const RUN_INDEX_FILE_NAME: &str = "index.json";

/// Rejects names that could escape `<root>/.pkg/profiles/`.
pub fn validate_profile_name(name: &str) -> Result<&str> {
    let invalid = |reason: &str| StoreError::InvalidProfile {
        name: name.to_string(),
        reason: reason.to_string(),
    };
    if name.trim().is_empty() {
        return Err(invalid("profile name must not be empty"));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(invalid("profile name must not contain path separators"));
    }
    if name.contains("..") {
        return Err(invalid("profile name must not contain '..'"));
    }
    Ok(name)
}

/// Directory layout of one profile's package root.
///
/// ```text
/// <root>/.pkg/profiles/<profile>/
///   sources/<hash>.json
///   entities|claims|links/<shard>/<id>.json
///   indexes/{bm25,graph,decisions,vectors}/...
///   runs/<run_id>/{ingest,<stage>}-manifest.json, config-snapshot.json, replay-log.jsonl
///   provenance/<run_id>.json
///   secrets/redaction.key
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileLayout {
    pkg_root: PathBuf,
}

impl ProfileLayout {
    pub fn for_profile(workspace_root: &Path, profile: &str) -> Result<Self> {
        let profile = validate_profile_name(profile)?;
        Ok(Self {
            pkg_root: workspace_root
                .join(PKG_DIR_NAME)
                .join(PROFILES_DIR_NAME)
                .join(profile),
        })
    }

    /// Wraps an already resolved package root.
    pub fn at(pkg_root: impl Into<PathBuf>) -> Self {
        Self {
            pkg_root: pkg_root.into(),
        }
    }

    pub fn pkg_root(&self) -> &Path {
        &self.pkg_root
    }

    pub fn sources_dir(&self) -> PathBuf {
        self.pkg_root.join("sources")
    }

    pub fn source_metadata_path(&self, source_hash: &str) -> PathBuf {
        self.sources_dir().join(format!("{source_hash}.json"))
    }

    pub fn entities_dir(&self) -> PathBuf {
        self.pkg_root.join("entities")
    }

    pub fn claims_dir(&self) -> PathBuf {
        self.pkg_root.join("claims")
    }

    pub fn links_dir(&self) -> PathBuf {
        self.pkg_root.join("links")
    }

    pub fn entity_path(&self, id: &str) -> PathBuf {
        sharded(&self.entities_dir(), id)
    }

    pub fn claim_path(&self, id: &str) -> PathBuf {
        sharded(&self.claims_dir(), id)
    }

    pub fn link_path(&self, id: &str) -> PathBuf {
        sharded(&self.links_dir(), id)
    }

    pub fn indexes_dir(&self) -> PathBuf {
        self.pkg_root.join("indexes")
    }

    pub fn bm25_index_path(&self) -> PathBuf {
        self.indexes_dir().join("bm25").join("index.json")
    }

    pub fn adjacency_path(&self) -> PathBuf {
        self.indexes_dir().join("graph").join("adjacency.json")
    }

    pub fn decisions_index_path(&self) -> PathBuf {
        self.indexes_dir().join("decisions").join("index.json")
    }

    pub fn vectors_index_path(&self) -> PathBuf {
        self.indexes_dir().join("vectors").join("index.json")
    }

    pub fn runs_dir(&self) -> PathBuf {
        self.pkg_root.join("runs")
    }

    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.runs_dir().join(run_id)
    }

    pub fn run_index_path(&self) -> PathBuf {
        self.runs_dir().join(RUN_INDEX_FILE_NAME)
    }

    pub fn manifest_path(&self, run_id: &str, stage: Stage) -> PathBuf {
        match stage {
            Stage::Ingest | Stage::Import => self.run_dir(run_id).join(INGEST_MANIFEST_NAME),
            other => self.run_dir(run_id).join(other.manifest_file_name()),
        }
    }

    pub fn config_snapshot_path(&self, run_id: &str) -> PathBuf {
        self.run_dir(run_id).join(CONFIG_SNAPSHOT_NAME)
    }

    pub fn replay_log_path(&self, run_id: &str) -> PathBuf {
        self.run_dir(run_id).join(REPLAY_LOG_NAME)
    }

    pub fn provenance_path(&self, run_id: &str) -> PathBuf {
        self.pkg_root.join("provenance").join(format!("{run_id}.json"))
    }

    pub fn secrets_dir(&self) -> PathBuf {
        self.pkg_root.join("secrets")
    }

    pub fn redaction_key_path(&self) -> PathBuf {
        self.secrets_dir().join(REDACTION_KEY_FILE_NAME)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.pkg_root.join(LOCK_FILE_NAME)
    }

    /// POSIX path relative to the package root, as recorded in manifests.
    pub fn relative(&self, path: &Path) -> String {
        match path.strip_prefix(&self.pkg_root) {
            Ok(rel) => to_posix(rel),
            Err(_) => to_posix(path),
        }
    }

    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.pkg_root.join(relative)
    }
}

fn sharded(base: &Path, id: &str) -> PathBuf {
    base.join(shard_for(id)).join(format!("{id}.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn profile_root_is_namespaced() {
        let layout = ProfileLayout::for_profile(Path::new("/ws"), "default").unwrap();
        assert_eq!(layout.pkg_root(), Path::new("/ws/.pkg/profiles/default"));
    }

    #[test]
    fn rejects_escaping_profile_names() {
        for bad in ["", "../evil", "a/b", "a\\b", "..", "  "] {
            assert!(
                ProfileLayout::for_profile(Path::new("/ws"), bad).is_err(),
                "{bad:?} accepted"
            );
        }
    }

    #[test]
    fn artifacts_are_sharded_after_prefix() {
        let layout = ProfileLayout::at("/pkg");
        assert_eq!(
            layout.entity_path("ent_ab12"),
            PathBuf::from("/pkg/entities/ab/ent_ab12.json")
        );
        assert_eq!(
            layout.relative(&layout.link_path("lnk_9fee")),
            "links/9f/lnk_9fee.json"
        );
    }

    #[test]
    fn ingest_manifest_has_fixed_name() {
        let layout = ProfileLayout::at("/pkg");
        assert_eq!(
            layout.relative(&layout.manifest_path("run_1", Stage::Ingest)),
            "runs/run_1/ingest-manifest.json"
        );
        assert_eq!(
            layout.relative(&layout.manifest_path("run_1", Stage::Link)),
            "runs/run_1/link-manifest.json"
        );
    }
}
