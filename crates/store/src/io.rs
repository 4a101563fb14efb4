use crate::Result;
use auditgraph_protocol::canonical_value;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Writes through a sibling temp file and renames it into place.
pub fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!("{file_name}.tmp"));
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Pretty JSON with sorted keys, so identical content always produces identical bytes.
pub fn write_json_value(path: &Path, value: Value) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(&canonical_value(value))?;
    write_bytes_atomic(path, &bytes)
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

pub fn read_json_opt<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    read_json(path).map(Some)
}

/// Total size in bytes of regular files below `dir`; zero if it does not exist.
pub fn directory_size(dir: &Path) -> Result<u64> {
    if !dir.exists() {
        return Ok(0);
    }
    let mut total = 0u64;
    for entry in WalkDir::new(dir) {
        let entry = entry?;
        if entry.file_type().is_file() {
            total += entry.metadata()?.len();
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn json_bytes_do_not_depend_on_key_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.json");
        let b = dir.path().join("b.json");
        write_json_value(&a, json!({"z": 1, "a": {"y": 2, "b": 3}})).unwrap();
        write_json_value(&b, json!({"a": {"b": 3, "y": 2}, "z": 1})).unwrap();
        assert_eq!(fs::read(&a).unwrap(), fs::read(&b).unwrap());
        assert!(!dir.path().join("a.json.tmp").exists());
    }

    #[test]
    fn missing_json_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let value: Option<Value> = read_json_opt(&dir.path().join("nope.json")).unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn directory_size_sums_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("x/y")).unwrap();
        fs::write(dir.path().join("x/a"), [0u8; 10]).unwrap();
        fs::write(dir.path().join("x/y/b"), [0u8; 5]).unwrap();
        assert_eq!(directory_size(dir.path()).unwrap(), 15);
        assert_eq!(directory_size(&dir.path().join("missing")).unwrap(), 0);
    }
}
