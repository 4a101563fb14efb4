use crate::error::{PipelineError, Result};
use auditgraph_protocol::{relative_posix, to_posix};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Enumerates source files below a workspace root.
pub struct SourceScanner {
    root: PathBuf,
    excludes: GlobSet,
}

impl SourceScanner {
    /// Exclude patterns are matched against the root-relative POSIX path.
    pub fn new(root: impl AsRef<Path>, exclude_globs: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in exclude_globs {
            let glob = Glob::new(pattern).map_err(|err| {
                PipelineError::config("exclude_globs", format!("{pattern}: {err}"))
            })?;
            builder.add(glob);
        }
        let excludes = builder
            .build()
            .map_err(|err| PipelineError::config("exclude_globs", err.to_string()))?;
        Ok(Self {
            root: root.as_ref().to_path_buf(),
            excludes,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Files below each include path (relative to the root unless absolute), sorted
    /// and deduplicated. Include paths that do not exist are ignored.
    pub fn discover(&self, include_paths: &[String]) -> Vec<PathBuf> {
        let targets: Vec<PathBuf> = include_paths
            .iter()
            .map(|include| {
                let include = Path::new(include);
                if include.is_absolute() {
                    include.to_path_buf()
                } else {
                    self.root.join(include)
                }
            })
            .collect();
        let files = self.collect(&targets);
        log::info!("Discovered {} files under {}", files.len(), self.root.display());
        files
    }

    /// Files named directly plus everything below named directories, minus excludes.
    pub fn collect(&self, targets: &[PathBuf]) -> Vec<PathBuf> {
        let mut files = BTreeSet::new();
        for target in targets {
            if !target.exists() {
                log::debug!("Skipping missing path {}", target.display());
                continue;
            }
            for entry in WalkDir::new(target).follow_links(false).sort_by_file_name() {
                match entry {
                    Ok(entry) => {
                        if !entry.file_type().is_file() {
                            continue;
                        }
                        let path = entry.path();
                        if self.is_excluded(path) {
                            log::debug!("Excluded {}", path.display());
                            continue;
                        }
                        files.insert(path.to_path_buf());
                    }
                    Err(err) => log::warn!("Failed to read entry: {err}"),
                }
            }
        }
        files.into_iter().collect()
    }

    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.excludes.is_empty() {
            return false;
        }
        let relative = relative_posix(path, &self.root).unwrap_or_else(|_| to_posix(path));
        self.excludes.is_match(relative.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x").unwrap();
    }

    fn relative(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|p| relative_posix(p, root).unwrap())
            .collect()
    }

    #[test]
    fn discovers_sorted_files_and_honors_excludes() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "notes/b.md");
        touch(dir.path(), "notes/a.md");
        touch(dir.path(), "notes/node_modules/pkg/readme.md");
        touch(dir.path(), "repos/x/.git/config");
        touch(dir.path(), "repos/x/main.py");

        let scanner = SourceScanner::new(
            dir.path(),
            &["**/node_modules/**".to_string(), "**/.git/**".to_string()],
        )
        .unwrap();
        let files = scanner.discover(&["repos".to_string(), "notes".to_string(), "missing".to_string()]);
        assert_eq!(
            relative(dir.path(), &files),
            vec!["notes/a.md", "notes/b.md", "repos/x/main.py"]
        );
    }

    #[test]
    fn overlapping_includes_are_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "notes/sub/a.md");
        let scanner = SourceScanner::new(dir.path(), &[]).unwrap();
        let files = scanner.discover(&["notes".to_string(), "notes/sub".to_string()]);
        assert_eq!(relative(dir.path(), &files), vec!["notes/sub/a.md"]);
    }

    #[test]
    fn invalid_glob_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SourceScanner::new(dir.path(), &["a/[".to_string()]).err().unwrap();
        assert!(matches!(err, PipelineError::Config { .. }));
    }
}
