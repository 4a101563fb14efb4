use crate::{ProtocolError, Result};
use std::path::{Component, Path};

/// Joins path components with `/` regardless of the host separator.
pub fn to_posix(path: &Path) -> String {
    let parts: Vec<String> = path
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().replace('\\', "/")),
            Component::ParentDir => Some("..".to_string()),
            Component::RootDir | Component::Prefix(_) | Component::CurDir => None,
        })
        .collect();
    let joined = parts.join("/");
    if path.has_root() {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Root-relative POSIX form of `path`.
pub fn relative_posix(path: &Path, root: &Path) -> Result<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Ok(to_posix(rel));
    }
    let canonical_path = path.canonicalize()?;
    let canonical_root = root.canonicalize()?;
    canonical_path
        .strip_prefix(&canonical_root)
        .map(to_posix)
        .map_err(|_| {
            ProtocolError::InvalidPath(format!(
                "{} is not under {}",
                path.display(),
                root.display()
            ))
        })
}
