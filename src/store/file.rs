use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

use super::KeyValueStore;
use crate::config::schema::{StorageConfig, expand_home};

/// Characters that are not safe in a file name on every platform.
static UNSAFE_KEY_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_.-]").expect("valid regex"));

/// Directory-backed store: one `<key>.json` file per slot.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-write leaves the previous value intact.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Build a store rooted at the configured `[storage] dir`.
    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(expand_home(&config.dir))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`. Unsafe characters are replaced with `_`.
    pub fn slot_path(&self, key: &str) -> PathBuf {
        let name = UNSAFE_KEY_CHARS.replace_all(key, "_");
        self.dir.join(format!("{name}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.slot_path(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    fn write(&self, key: &str, raw: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;

        let path = self.slot_path(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, raw).with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("failed to move {} into place", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_slot_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(store.read("energyPredictionLog").unwrap().is_none());
    }

    #[test]
    fn write_creates_directory_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("store"));
        store.write("faultPredictionLog", "[]").unwrap();
        assert_eq!(
            store.read("faultPredictionLog").unwrap().as_deref(),
            Some("[]")
        );
        assert!(dir.path().join("store/faultPredictionLog.json").exists());
    }

    #[test]
    fn keys_are_sanitized_into_file_names() {
        let store = FileStore::new("/tmp/gs");
        assert_eq!(
            store.slot_path("../etc/passwd"),
            PathBuf::from("/tmp/gs/.._etc_passwd.json")
        );
        assert_eq!(
            store.slot_path("energy log"),
            PathBuf::from("/tmp/gs/energy_log.json")
        );
    }

    #[test]
    fn write_leaves_no_temporary_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.write("k", "1").unwrap();
        store.write("k", "2").unwrap();
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["k.json".to_string()]);
    }
}
