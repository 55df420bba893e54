//! The on-disk instance cache: context name → ordered instance records.
//!
//! Loaded once at the start of an operation, mutated in memory, written
//! back whole at the end. Writers never leave a truncated file visible —
//! the save goes through a temporary file in the destination directory and
//! an atomic rename.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::application::ports::{CacheMap, InstanceCache};
use crate::domain::instance::sort_by_id;
use crate::domain::InstanceRecord;

/// File-backed cache store, by default at `~/.fleet/instances.json`.
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(Self::with_path(home.join(".fleet").join("instances.json")))
    }

    /// Explicit path, used in tests.
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }
}

impl InstanceCache for CacheStore {
    fn load(&self) -> Result<CacheMap> {
        if !self.path.exists() {
            return Ok(CacheMap::new());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading cache file {}", self.path.display()))?;
        let mut contexts: CacheMap = serde_json::from_str(&content)
            .with_context(|| format!("parsing cache file {}", self.path.display()))?;
        for list in contexts.values_mut() {
            sort_by_id(list);
        }
        Ok(contexts)
    }

    fn save(&self, contexts: &CacheMap) -> Result<()> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("cache path has no parent directory"))?;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;

        let mut sorted = contexts.clone();
        for list in sorted.values_mut() {
            sort_by_id(list);
        }
        let content =
            serde_json::to_string_pretty(&sorted).context("serializing instance cache")?;

        // Temp file in the same directory so the rename cannot cross
        // filesystems.
        let tmp = tempfile::NamedTempFile::new_in(parent)
            .with_context(|| format!("creating temp file in {}", parent.display()))?;
        std::fs::write(tmp.path(), &content)
            .with_context(|| format!("writing cache to {}", tmp.path().display()))?;
        tmp.persist(&self.path)
            .with_context(|| format!("replacing cache file {}", self.path.display()))?;
        Ok(())
    }
}

/// Remove exactly the given list positions, computed against the snapshot
/// the caller selected from. Processed in descending order so earlier
/// removals never shift later indices.
pub fn remove_indices(list: &mut Vec<InstanceRecord>, indices: &[usize]) {
    let mut descending: Vec<usize> = indices.to_vec();
    descending.sort_unstable_by(|a, b| b.cmp(a));
    descending.dedup();
    for i in descending {
        if i < list.len() {
            list.remove(i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LifecycleState;
    use tempfile::TempDir;

    fn inst(id: &str) -> InstanceRecord {
        let mut rec = InstanceRecord::from_observed(
            id.to_string(),
            "t2.micro".to_string(),
            "us-east-1a".to_string(),
            Some("10.0.0.1".to_string()),
            Some("3.80.0.1".to_string()),
            Some(format!("{id}.example")),
            LifecycleState::Running,
        );
        rec.access_user = "ubuntu".to_string();
        rec.access_key_path = "~/.ssh/virginia.pem".to_string();
        rec
    }

    fn store(dir: &TempDir) -> CacheStore {
        CacheStore::with_path(dir.path().join(".fleet").join("instances.json"))
    }

    #[test]
    fn missing_file_loads_as_empty_mapping() {
        let dir = TempDir::new().expect("tempdir");
        let contexts = store(&dir).load().expect("load");
        assert!(contexts.is_empty());
    }

    #[test]
    fn save_then_load_round_trips_and_sorts() {
        let dir = TempDir::new().expect("tempdir");
        let cache = store(&dir);
        let mut contexts = CacheMap::new();
        contexts.insert("train".to_string(), vec![inst("i-0c"), inst("i-0a")]);
        cache.save(&contexts).expect("save");

        let loaded = cache.load().expect("load");
        let ids: Vec<&str> = loaded["train"].iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["i-0a", "i-0c"]);
        assert_eq!(loaded["train"][0].access_user, "ubuntu");
    }

    #[test]
    fn save_of_loaded_mapping_is_byte_identical() {
        let dir = TempDir::new().expect("tempdir");
        let cache = store(&dir);
        let mut contexts = CacheMap::new();
        contexts.insert("train".to_string(), vec![inst("i-0b"), inst("i-0a")]);
        contexts.insert("eval".to_string(), vec![inst("i-0z")]);
        cache.save(&contexts).expect("first save");
        let first = std::fs::read(dir.path().join(".fleet").join("instances.json"))
            .expect("read first");

        let loaded = cache.load().expect("load");
        cache.save(&loaded).expect("second save");
        let second = std::fs::read(dir.path().join(".fleet").join("instances.json"))
            .expect("read second");
        assert_eq!(first, second);
    }

    #[test]
    fn save_leaves_no_temp_litter() {
        let dir = TempDir::new().expect("tempdir");
        let cache = store(&dir);
        cache.save(&CacheMap::new()).expect("save");
        let entries: Vec<_> = std::fs::read_dir(dir.path().join(".fleet"))
            .expect("read dir")
            .map(|e| e.expect("entry").file_name())
            .collect();
        assert_eq!(entries, ["instances.json"]);
    }

    #[test]
    fn remove_indices_descending_keeps_survivors_in_order() {
        let mut list = vec![
            inst("i-00"),
            inst("i-01"),
            inst("i-02"),
            inst("i-03"),
            inst("i-04"),
        ];
        remove_indices(&mut list, &[0, 2, 4]);
        let ids: Vec<&str> = list.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["i-01", "i-03"]);
    }

    #[test]
    fn remove_indices_ignores_duplicates_and_out_of_range() {
        let mut list = vec![inst("i-00"), inst("i-01")];
        remove_indices(&mut list, &[1, 1, 9]);
        let ids: Vec<&str> = list.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["i-00"]);
    }
}
