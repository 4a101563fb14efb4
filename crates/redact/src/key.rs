use crate::{RedactionError, Result};
use rand_core::{OsRng, RngCore};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

pub const REDACTION_KEY_FILE_NAME: &str = "redaction.key";

const KEY_BYTES: usize = 32;

/// Profile-scoped HMAC key. Stored as a hex string under `secrets/`.
#[derive(Clone, PartialEq, Eq)]
pub struct RedactionKey([u8; KEY_BYTES]);

impl fmt::Debug for RedactionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RedactionKey(..)")
    }
}

impl RedactionKey {
    pub fn from_bytes(bytes: [u8; KEY_BYTES]) -> Self {
        Self(bytes)
    }

    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Reads `secrets_dir/redaction.key`, generating it on first use. A key file that
    /// exists but does not hold exactly 32 hex-encoded bytes is an error, never a
    /// reason to skip redaction.
    pub fn load_or_create(secrets_dir: &Path) -> Result<Self> {
        let path = secrets_dir.join(REDACTION_KEY_FILE_NAME);
        if path.exists() {
            return Self::load(&path);
        }

        fs::create_dir_all(secrets_dir)?;
        let key = Self::generate();
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)?;
        restrict_permissions(&file)?;
        file.write_all(hex::encode(key.0).as_bytes())?;
        file.sync_all()?;
        log::info!("Generated redaction key at {}", path.display());
        Ok(key)
    }

    fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let raw = raw.trim();
        let invalid = |reason: &str| RedactionError::InvalidKey {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };
        if raw.is_empty() {
            return Err(invalid("key file is empty"));
        }
        let bytes = hex::decode(raw).map_err(|err| invalid(&format!("not hex: {err}")))?;
        let bytes: [u8; KEY_BYTES] = bytes
            .try_into()
            .map_err(|bytes: Vec<u8>| invalid(&format!("expected 32 bytes, found {}", bytes.len())))?;
        Ok(Self(bytes))
    }
}

#[cfg(unix)]
fn restrict_permissions(file: &fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &fs::File) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_then_reloads_same_key() {
        let dir = tempfile::tempdir().unwrap();
        let secrets = dir.path().join("secrets");
        let first = RedactionKey::load_or_create(&secrets).unwrap();
        let second = RedactionKey::load_or_create(&secrets).unwrap();
        assert_eq!(first, second);

        let stored = fs::read_to_string(secrets.join(REDACTION_KEY_FILE_NAME)).unwrap();
        assert_eq!(stored.len(), 64);
    }

    #[test]
    fn empty_key_fails_closed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(REDACTION_KEY_FILE_NAME), "  \n").unwrap();
        let err = RedactionKey::load_or_create(dir.path()).unwrap_err();
        assert!(matches!(err, RedactionError::InvalidKey { .. }));
    }

    #[test]
    fn malformed_key_fails_closed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(REDACTION_KEY_FILE_NAME), "zz-not-hex").unwrap();
        assert!(RedactionKey::load_or_create(dir.path()).is_err());

        fs::write(dir.path().join(REDACTION_KEY_FILE_NAME), "abcd").unwrap();
        let err = RedactionKey::load_or_create(dir.path()).unwrap_err();
        assert!(err.to_string().contains("expected 32 bytes"));
    }

    #[test]
    fn debug_does_not_print_material() {
        let key = RedactionKey::from_bytes([7u8; 32]);
        assert_eq!(format!("{key:?}"), "RedactionKey(..)");
    }
}
