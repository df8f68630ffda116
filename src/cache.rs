use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

pub const CONFIG_FILE: &str = "config.json";
pub const GRC_PATH_KEY: &str = "grc_path";
pub const EXPERIMENTS_DIR_KEY: &str = "experiments_dir";

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// In-process cache of the two resolved locations. Shared by the UI thread
/// and launch workers; writes are last-write-wins.
#[derive(Debug, Default)]
pub struct LocationCache {
    executable: Mutex<Option<PathBuf>>,
    experiments_dir: Mutex<Option<PathBuf>>,
}

impl LocationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn executable(&self) -> Option<PathBuf> {
        lock(&self.executable).clone()
    }

    pub fn set_executable(&self, path: &Path) {
        *lock(&self.executable) = Some(path.to_path_buf());
    }

    pub fn experiments_dir(&self) -> Option<PathBuf> {
        lock(&self.experiments_dir).clone()
    }

    pub fn set_experiments_dir(&self, path: &Path) {
        *lock(&self.experiments_dir) = Some(path.to_path_buf());
    }
}

/// Small JSON key/value file that remembers resolved locations across runs.
///
/// Reads never fail: a missing, unreadable or malformed file behaves as an
/// empty store. Values are only trusted after the caller re-validates them.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl ConfigStore {
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = std::fs::read_to_string(&path)
            .ok()
            .and_then(|s| match serde_json::from_str::<BTreeMap<String, String>>(&s) {
                Ok(map) => Some(map),
                Err(e) => {
                    tracing::warn!("ignoring malformed config store {}: {e}", path.display());
                    None
                }
            })
            .unwrap_or_default();
        Self {
            path,
            values: Mutex::new(values),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<String> {
        lock(&self.values).get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        lock(&self.values).contains_key(key)
    }

    /// Store `value` under `key` and persist. Unchanged values are not
    /// rewritten.
    pub fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut values = lock(&self.values);
        if values.get(key).map(String::as_str) == Some(value) {
            return Ok(());
        }
        values.insert(key.to_string(), value.to_string());
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&*values)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    /// Like [`ConfigStore::set`] but only logs write failures.
    pub fn remember(&self, key: &str, path: &Path) {
        if let Err(e) = self.set(key, &path.to_string_lossy()) {
            tracing::warn!("failed to persist {key} to {}: {e}", self.path.display());
        }
    }
}
