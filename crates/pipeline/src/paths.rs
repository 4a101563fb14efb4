use crate::error::{PipelineError, Result};
use std::env;
use std::path::{Component, Path, PathBuf};

/// Absolute form of `path` with symlinks resolved for the part that exists and
/// `.`/`..` folded lexically for the part that does not.
pub fn resolve_path(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()?.join(path)
    };

    let mut existing = absolute.as_path();
    let mut pending = Vec::new();
    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                pending.push(name.to_os_string());
                existing = parent;
            }
            _ => break,
        }
    }

    let mut resolved = if existing.exists() {
        existing.canonicalize()?
    } else {
        PathBuf::new()
    };
    for name in pending.into_iter().rev() {
        resolved.push(name);
    }
    Ok(normalize_lexically(&resolved))
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Resolves `path` (relative paths against `base`) and rejects it unless it stays
/// inside `base`. Returns the resolved path.
pub fn ensure_within_base(path: &Path, base: &Path, label: &str) -> Result<PathBuf> {
    let base = resolve_path(base)?;
    let candidate = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };
    let resolved = resolve_path(&candidate)?;
    if !resolved.starts_with(&base) {
        return Err(PipelineError::PathPolicy {
            label: label.to_string(),
            path: resolved.display().to_string(),
            base: base.display().to_string(),
        });
    }
    Ok(resolved)
}
