use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::Value;

use crate::error::StoreError;

/// The persisted key/value substrate the cache sits on.
///
/// Implementations only need to round-trip JSON values; versioning and TTL
/// are layered on top by [`Cache`](crate::Cache).
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `Ok(None)` when the key was never written.
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Remove every entry, returning how many were removed.
    fn clear(&self) -> Result<usize, StoreError>;
}

/// Process-local store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries
            .lock()
            .map(|e| e.contains_key(key))
            .unwrap_or(false)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn clear(&self) -> Result<usize, StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        let removed = entries.len();
        entries.clear();
        Ok(removed)
    }
}

/// Store persisted as one JSON file per key under a directory.
///
/// Each `set` rewrites only its own key's file, through a temp file and
/// rename so a crash never leaves a half-written entry. Nothing is held in
/// memory; every `get` reads from disk.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    /// Serializes writers so two sets of one key never share a temp file.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open the store rooted at `dir`. The directory is created on the
    /// first write.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        if dir.is_file() {
            return Err(StoreError::other(format!(
                "{} is a file, expected a directory",
                dir.display()
            )));
        }
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    /// Open the store at its default location, `<cache dir>/keyshelf/store/`.
    pub fn open_default() -> Result<Self, StoreError> {
        Self::open(default_store_path()?)
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// File holding `key`.
    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(key)))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let path = self.entry_path(key);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&contents) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                log::warn!("Ignoring unreadable cache entry {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let serialized = serde_json::to_string(&value)?;
        let path = self.entry_path(key);
        let tmp = path.with_extension("json.tmp");

        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        fs::create_dir_all(&self.dir)?;
        fs::write(&tmp, serialized)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn clear(&self) -> Result<usize, StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        for entry in entries {
            let path = entry?.path();
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            if name.ends_with(".json") {
                fs::remove_file(&path)?;
                removed += 1;
            } else if name.ends_with(".json.tmp") {
                fs::remove_file(&path)?;
            }
        }
        Ok(removed)
    }
}

/// Map a key to a file stem. ASCII alphanumerics, `_` and `-` pass through;
/// every other byte is written as `%XX`, so distinct keys never collide.
fn file_stem(key: &str) -> String {
    let mut stem = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("%{byte:02X}"));
        }
    }
    stem
}

/// Default on-disk location of the persisted store.
pub fn default_store_path() -> Result<PathBuf, StoreError> {
    let base = dirs::cache_dir()
        .ok_or_else(|| StoreError::other("Could not determine cache directory"))?;
    Ok(base.join("keyshelf").join("store"))
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
