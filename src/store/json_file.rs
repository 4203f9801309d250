use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{KvStore, StoreError};

const STORE_FILE: &str = "store.json";

/// File-backed store: one flat JSON object per data directory.
///
/// Writes go through a temp file and rename so a crash mid-write never
/// leaves a half-written store behind. There is no cross-process locking;
/// concurrent writers are last-write-wins.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Creates a store rooted at `data_dir`. The file itself appears on the
    /// first write.
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(STORE_FILE),
        }
    }

    /// True while no store file exists, i.e. before anything was ever
    /// written. The shell uses this to detect a fresh install.
    pub fn is_fresh(&self) -> bool {
        !self.path.exists()
    }

    fn load(&self) -> Result<Map<String, Value>, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(StoreError::Read(e)),
        };
        serde_json::from_str(&contents).map_err(StoreError::Parse)
    }

    fn persist(&self, map: &Map<String, Value>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(StoreError::Write)?;
        }
        let contents = serde_json::to_string_pretty(map).map_err(StoreError::Encode)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents).map_err(StoreError::Write)?;
        fs::rename(&tmp, &self.path).map_err(StoreError::Write)
    }
}

#[async_trait]
impl KvStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.load()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut map = match self.load() {
            Ok(map) => map,
            Err(StoreError::Parse(e)) => {
                log::warn!("store file was unreadable ({e}); rewriting it");
                Map::new()
            }
            Err(e) => return Err(e),
        };
        map.insert(key.to_string(), value);
        self.persist(&map)
    }
}
