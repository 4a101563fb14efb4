use crate::{ProfileLayout, Result, StoreError};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::time::Instant;

/// Advisory exclusive lock on `<pkg_root>/.lock`, held for the life of the guard.
/// Serializes run-id allocation and artifact writes between processes sharing a profile.
#[derive(Debug)]
pub struct ProfileLock {
    file: File,
}

impl Drop for ProfileLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

impl ProfileLock {
    /// Blocks until the lock is available.
    pub fn acquire(layout: &ProfileLayout) -> Result<Self> {
        let path = layout.lock_path();
        fs::create_dir_all(layout.pkg_root())?;
        let lock_error = |action: &str, err: std::io::Error| StoreError::LockError {
            path: path.display().to_string(),
            message: format!("{action}: {err}"),
        };

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|err| lock_error("open", err))?;

        let start = Instant::now();
        file.lock_exclusive()
            .map_err(|err| lock_error("acquire", err))?;
        log::debug!(
            "Acquired profile lock {} after {}ms",
            path.display(),
            start.elapsed().as_millis()
        );
        Ok(Self { file })
    }

    /// Fails immediately with [`StoreError::LockError`] if another holder exists.
    pub fn try_acquire(layout: &ProfileLayout) -> Result<Self> {
        let path = layout.lock_path();
        fs::create_dir_all(layout.pkg_root())?;
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)?;
        file.try_lock_exclusive()
            .map_err(|err| StoreError::LockError {
                path: path.display().to_string(),
                message: format!("busy: {err}"),
            })?;
        Ok(Self { file })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_holder_is_refused_until_release() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ProfileLayout::at(dir.path().join("profile"));

        let guard = ProfileLock::acquire(&layout).unwrap();
        assert!(ProfileLock::try_acquire(&layout).is_err());
        drop(guard);
        assert!(ProfileLock::try_acquire(&layout).is_ok());
    }
}
