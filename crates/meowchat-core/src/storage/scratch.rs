//! Tab-scoped scratch storage
//!
//! A JSON map under the system temp directory, one file per tab id. It
//! plays the role of browser session storage: it survives reloads of the
//! same terminal session but not a reboot or a new tab id.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

use super::kv::KeyValueStore;
use crate::paths;

pub struct ScratchStore {
    path: PathBuf,
    // Serializes read-modify-write cycles
    lock: Mutex<()>,
}

impl ScratchStore {
    /// Store for the given tab id
    pub fn for_tab(tab: &str) -> Self {
        let name: String = tab
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        Self::at(paths::scratch_dir().join(format!("{}.json", name)))
    }

    /// Store backed by an explicit file
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        match serde_json::from_str(&contents) {
            Ok(map) => Ok(map),
            Err(e) => {
                warn!("Discarding corrupt scratch file {:?}: {}", self.path, e);
                Ok(BTreeMap::new())
            }
        }
    }

    /// Write to a temp file then rename over the original
    fn save(&self, map: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, serde_json::to_string(map)?)?;
        fs::rename(&temp_path, &self.path)?;
        debug!("Scratch store saved to {:?}", self.path);
        Ok(())
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|_| anyhow::anyhow!("scratch store lock poisoned"))
    }
}

impl KeyValueStore for ScratchStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.guard()?;
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.guard()?;
        let mut map = self.load()?;
        map.insert(key.to_string(), value.to_string());
        self.save(&map)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.guard()?;
        let mut map = self.load()?;
        if map.remove(key).is_some() {
            self.save(&map)?;
        }
        Ok(())
    }
}
