use std::fs;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{ResolveError, Result};

/// Load a keyed record collection. A missing file is an empty
/// collection; an existing file that fails to parse is corrupt.
pub(crate) fn load_collection<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let bytes = fs::read(path).map_err(|e| ResolveError::io(e, path))?;
    serde_json::from_slice(&bytes).map_err(|e| ResolveError::CorruptCache {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

pub(crate) fn save_collection<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(items)?;
    write_atomic(path, &bytes)
}

/// Load a single-record cache file (schema cache). Missing file is a
/// miss, not an error.
pub(crate) fn load_record<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = fs::read(path).map_err(|e| ResolveError::io(e, path))?;
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| ResolveError::CorruptCache {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

pub(crate) fn save_record<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(record)?;
    write_atomic(path, &bytes)
}

// Write to a sibling and rename so a concurrent reader never observes a
// half-written file. Single-writer only; the last writer wins.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ResolveError::io(e, parent))?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).map_err(|e| ResolveError::io(e, &tmp))?;
    fs::rename(&tmp, path).map_err(|e| ResolveError::io(e, path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::types::CrosswalkEntry;

    fn temp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("trophyvault_test");
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(format!("cache_{}_{name}", std::process::id()))
    }

    fn entry(foreign: &str, canonical: &str) -> CrosswalkEntry {
        CrosswalkEntry {
            foreign_id: foreign.to_string(),
            canonical_id: canonical.to_string(),
        }
    }

    #[test]
    fn test_load_absent_collection_is_empty() {
        let path = temp_path("absent.json");
        let _ = std::fs::remove_file(&path);
        let entries: Vec<CrosswalkEntry> = load_collection(&path).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_collection_roundtrip() {
        let path = temp_path("roundtrip.json");
        let _ = std::fs::remove_file(&path);
        let entries = vec![entry("g1", "100"), entry("g2", "220")];
        save_collection(&path, &entries).unwrap();
        let loaded: Vec<CrosswalkEntry> = load_collection(&path).unwrap();
        assert_eq!(loaded, entries);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_corrupt_collection_is_reported() {
        let path = temp_path("corrupt.json");
        std::fs::write(&path, b"not json {{{").unwrap();
        let err = load_collection::<CrosswalkEntry>(&path).unwrap_err();
        assert!(matches!(err, ResolveError::CorruptCache { .. }));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_absent_record_is_none() {
        let path = temp_path("absent_record.json");
        let _ = std::fs::remove_file(&path);
        let record: Option<CrosswalkEntry> = load_record(&path).unwrap();
        assert!(record.is_none());
    }

    #[test]
    fn test_record_roundtrip_creates_parents() {
        let path = temp_path("nested").join("deeper").join("record.json");
        let _ = std::fs::remove_dir_all(temp_path("nested"));
        save_record(&path, &entry("g9", "999")).unwrap();
        let loaded: Option<CrosswalkEntry> = load_record(&path).unwrap();
        assert_eq!(loaded, Some(entry("g9", "999")));
        std::fs::remove_dir_all(temp_path("nested")).ok();
    }
}
