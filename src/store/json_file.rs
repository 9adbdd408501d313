//! One `<key>.json` file per blob, written atomically.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::Store;

/// File-backed store rooted at the data directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Store for JsonFileStore {
    fn load_raw(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        if raw.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(raw))
    }

    fn save_raw(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        // Write-then-rename so a crash mid-write never truncates the blob.
        let tmp = path.with_extension(format!(
            "tmp.{}.{}",
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        std::fs::write(&tmp, value)
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("failed to replace {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{load_json, save_json};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, JsonFileStore) {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn missing_key_loads_none() {
        let (_dir, store) = temp_store();
        assert_eq!(store.load_raw("nothing").unwrap(), None);
    }

    #[test]
    fn save_then_load_round_trips() {
        let (_dir, store) = temp_store();
        store.save_raw("history", "{\"primary\":[]}").unwrap();
        assert_eq!(
            store.load_raw("history").unwrap().as_deref(),
            Some("{\"primary\":[]}")
        );
    }

    #[test]
    fn save_replaces_the_whole_blob() {
        let (_dir, store) = temp_store();
        store.save_raw("endpoints", "first").unwrap();
        store.save_raw("endpoints", "second").unwrap();
        assert_eq!(store.load_raw("endpoints").unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn empty_file_loads_none() {
        let (dir, store) = temp_store();
        std::fs::write(dir.path().join("traces.json"), "  \n").unwrap();
        assert_eq!(store.load_raw("traces").unwrap(), None);
    }

    #[test]
    fn no_tmp_files_left_behind() {
        let (dir, store) = temp_store();
        store.save_raw("history", "{}").unwrap();
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["history.json".to_string()]);
    }

    #[test]
    fn typed_helpers_round_trip() {
        let (_dir, store) = temp_store();
        let value = BTreeMap::from([("k".to_string(), 1u32)]);
        save_json(&store, "traces", &value).unwrap();
        let loaded: BTreeMap<String, u32> = load_json(&store, "traces").unwrap().unwrap();
        assert_eq!(loaded, value);
    }

    #[test]
    fn corrupt_blob_is_an_error_not_a_default() {
        let (dir, store) = temp_store();
        std::fs::write(dir.path().join("history.json"), "not json").unwrap();
        let loaded: anyhow::Result<Option<BTreeMap<String, u32>>> = load_json(&store, "history");
        assert!(loaded.is_err());
    }
}
