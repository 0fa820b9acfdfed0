// src/storage.rs
use path_absolutize::Absolutize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::RouterError;

/// 永続化に使うキー・バリューストア (ブラウザの localStorage 相当)
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> Result<(), RouterError>;
    fn remove(&mut self, key: &str) -> Result<(), RouterError>;
}

/// メモリ上だけで保持するストア
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.items.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), RouterError> {
        self.items.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), RouterError> {
        self.items.remove(key);
        Ok(())
    }
}

/// 1 つの JSON ファイル (`{ "key": "value", ... }`) に書き出すストア。
/// 書き込みのたびにファイル全体を保存する。
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    items: BTreeMap<String, String>,
}

impl FileStorage {
    /// ファイルを開く。存在しなければ空のストアとして扱う
    pub fn open(path: &Path) -> Result<Self, RouterError> {
        // まだ存在しないファイルもあるので canonicalize ではなく absolutize
        let path = path.absolutize()?.to_path_buf();
        let items = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw)?
            }
        } else {
            tracing::debug!("ストレージファイルが無いので空で開始: {:?}", path);
            BTreeMap::new()
        };
        Ok(FileStorage { path, items })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), RouterError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.items)?;
        fs::write(&self.path, json).map_err(|e| RouterError::Storage(format!("{:?}: {e}", self.path)))
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.items.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), RouterError> {
        self.items.insert(key.to_string(), value);
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), RouterError> {
        if self.items.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}
