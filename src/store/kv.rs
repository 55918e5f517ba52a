use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use super::{Result, TrainingRepository};
use crate::history::SessionHistory;
use crate::preset::Preset;

pub const PRESETS_KEY: &str = "accrue.presets";
pub const HISTORIES_KEY: &str = "accrue.session_histories";

/// Byte values under fixed string keys
pub trait KeyValueStore {
    fn get(&self, key: &str) -> io::Result<Option<Vec<u8>>>;
    fn set(&mut self, key: &str, value: &[u8]) -> io::Result<()>;
}

/// One `<key>.json` file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set(&mut self, key: &str, value: &[u8]) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    entries: HashMap<String, Vec<u8>>,
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &[u8]) -> io::Result<()> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

/// Presets and histories as two JSON arrays in a key-value store
#[derive(Debug)]
pub struct KvRepository<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> KvRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Unreadable data decodes to an empty collection
    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        let Some(bytes) = self.store.get(key)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_slice(&bytes) {
            Ok(items) => Ok(items),
            Err(e) => {
                warn!("could not decode '{key}', starting empty: {e}");
                Ok(Vec::new())
            }
        }
    }

    fn persist<T: Serialize>(&mut self, key: &str, items: &[T]) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(items)?;
        self.store.set(key, &bytes)?;
        debug!("wrote {} records to '{key}'", items.len());
        Ok(())
    }
}

impl<S: KeyValueStore> TrainingRepository for KvRepository<S> {
    fn presets(&self) -> Result<Vec<Preset>> {
        self.load(PRESETS_KEY)
    }

    fn save_preset(&mut self, preset: &Preset) -> Result<()> {
        let mut presets: Vec<Preset> = self.load(PRESETS_KEY)?;
        match presets.iter_mut().find(|p| p.id == preset.id) {
            Some(existing) => *existing = preset.clone(),
            None => presets.push(preset.clone()),
        }
        self.persist(PRESETS_KEY, &presets)
    }

    fn delete_preset(&mut self, id: Uuid) -> Result<()> {
        let mut presets: Vec<Preset> = self.load(PRESETS_KEY)?;
        presets.retain(|p| p.id != id);
        let mut histories: Vec<SessionHistory> = self.load(HISTORIES_KEY)?;
        histories.retain(|h| h.preset_id != id);

        self.persist(PRESETS_KEY, &presets)?;
        self.persist(HISTORIES_KEY, &histories)
    }

    fn save_history(&mut self, history: &SessionHistory) -> Result<()> {
        let mut histories: Vec<SessionHistory> = self.load(HISTORIES_KEY)?;
        histories.push(history.clone());
        self.persist(HISTORIES_KEY, &histories)
    }

    fn histories(&self, preset_id: Uuid) -> Result<Vec<SessionHistory>> {
        let histories: Vec<SessionHistory> = self.load(HISTORIES_KEY)?;
        Ok(histories
            .into_iter()
            .filter(|h| h.preset_id == preset_id)
            .sorted_by(|a, b| b.date.cmp(&a.date))
            .collect())
    }

    fn all_histories(&self) -> Result<Vec<SessionHistory>> {
        self.load(HISTORIES_KEY)
    }

    fn delete_history(&mut self, id: Uuid) -> Result<()> {
        let mut histories: Vec<SessionHistory> = self.load(HISTORIES_KEY)?;
        histories.retain(|h| h.id != id);
        self.persist(HISTORIES_KEY, &histories)
    }
}
