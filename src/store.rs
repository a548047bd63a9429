use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::PlanError;
use crate::types::{Order, RawMaterialRoll};

pub const ROLLS_KEY: &str = "nbps.raw_rolls.v1";
pub const ORDERS_KEY: &str = "nbps.orders.v1";
pub const THEME_KEY: &str = "nbps.theme.v1";

/// Raw string storage keyed by fixed identifiers. Implementations report
/// I/O failures; `Storage` decides what to do with them.
pub trait KeyValueStore: Send + Sync {
    fn read(&self, key: &str) -> io::Result<Option<String>>;
    /// Replaces the whole value; readers never see a partial write.
    fn write(&self, key: &str, value: &str) -> io::Result<()>;
    fn delete(&self, key: &str) -> io::Result<()>;
    fn delete_all(&self) -> io::Result<()>;
}

/// One `<key>.json` file per key.
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

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for JsonFileStore {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&self, key: &str, value: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, self.path(key))
    }

    fn delete(&self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.path(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    fn delete_all(&self) -> io::Result<()> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

fn poisoned<T>(_: T) -> io::Error {
    io::Error::other("memory store lock poisoned")
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.entries.read().map_err(poisoned)?.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> io::Result<()> {
        self.entries
            .write()
            .map_err(poisoned)?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> io::Result<()> {
        self.entries.write().map_err(poisoned)?.remove(key);
        Ok(())
    }

    fn delete_all(&self) -> io::Result<()> {
        self.entries.write().map_err(poisoned)?.clear();
        Ok(())
    }
}

/// Best-effort typed access over a `KeyValueStore`.
///
/// Reads fall back to the caller's default on any failure. `remove` and
/// `clear` only log. `set` logs too, and returns the failure so the owner of
/// the in-memory copy can tell the operator it may not survive a reload.
#[derive(Clone)]
pub struct Storage {
    backend: Arc<dyn KeyValueStore>,
}

impl Storage {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::default()))
    }

    pub fn json_dir(dir: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(JsonFileStore::new(dir)))
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let raw = match self.backend.read(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return default,
            Err(e) => {
                warn!(key, error = %e, "storage read failed");
                return default;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "stored value unreadable, using default");
                default
            }
        }
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), PlanError> {
        let failure = |reason: String| {
            warn!(key, error = %reason, "storage write failed");
            PlanError::PersistenceFailure {
                key: key.to_string(),
                reason,
            }
        };
        let raw = serde_json::to_string_pretty(value).map_err(|e| failure(e.to_string()))?;
        self.backend
            .write(key, &raw)
            .map_err(|e| failure(e.to_string()))?;
        debug!(key, bytes = raw.len(), "stored");
        Ok(())
    }

    pub fn remove(&self, key: &str) {
        if let Err(e) = self.backend.delete(key) {
            warn!(key, error = %e, "storage remove failed");
        }
    }

    pub fn clear(&self) {
        if let Err(e) = self.backend.delete_all() {
            warn!(error = %e, "storage clear failed");
        }
    }
}

/// Roll records, persisted as one collection.
#[derive(Clone)]
pub struct Inventory {
    storage: Storage,
}

impl Inventory {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub fn list(&self) -> Vec<RawMaterialRoll> {
        self.storage.get(ROLLS_KEY, Vec::new())
    }

    pub fn replace_all(&self, rolls: &[RawMaterialRoll]) -> Result<(), PlanError> {
        self.storage.set(ROLLS_KEY, rolls)
    }
}

/// Order records, persisted as one collection.
#[derive(Clone)]
pub struct OrderBook {
    storage: Storage,
}

impl OrderBook {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub fn list(&self) -> Vec<Order> {
        self.storage.get(ORDERS_KEY, Vec::new())
    }

    pub fn replace_all(&self, orders: &[Order]) -> Result<(), PlanError> {
        self.storage.set(ORDERS_KEY, orders)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

impl ThemeMode {
    pub fn toggled(self) -> Self {
        match self {
            ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::Light,
        }
    }
}

impl std::fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThemeMode::Light => write!(f, "light"),
            ThemeMode::Dark => write!(f, "dark"),
        }
    }
}

pub fn load_theme(storage: &Storage) -> ThemeMode {
    storage.get(THEME_KEY, ThemeMode::default())
}

pub fn save_theme(storage: &Storage, theme: ThemeMode) -> Result<(), PlanError> {
    storage.set(THEME_KEY, &theme)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed;
    use tempfile::TempDir;

    /// Backend whose every call fails.
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn read(&self, _: &str) -> io::Result<Option<String>> {
            Err(io::Error::other("disk gone"))
        }
        fn write(&self, _: &str, _: &str) -> io::Result<()> {
            Err(io::Error::other("disk gone"))
        }
        fn delete(&self, _: &str) -> io::Result<()> {
            Err(io::Error::other("disk gone"))
        }
        fn delete_all(&self) -> io::Result<()> {
            Err(io::Error::other("disk gone"))
        }
    }

    #[test]
    fn test_memory_round_trip() {
        let storage = Storage::in_memory();
        let inventory = Inventory::new(storage.clone());
        assert!(inventory.list().is_empty());

        inventory.replace_all(&seed::inventory()).unwrap();
        assert_eq!(inventory.list(), seed::inventory());

        storage.remove(ROLLS_KEY);
        assert!(inventory.list().is_empty());
    }

    #[test]
    fn test_json_dir_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let orders = OrderBook::new(Storage::json_dir(dir.path()));
        orders.replace_all(&seed::orders()).unwrap();
        assert!(dir.path().join("nbps.orders.v1.json").exists());

        let reopened = OrderBook::new(Storage::json_dir(dir.path()));
        assert_eq!(reopened.list(), seed::orders());
    }

    #[test]
    fn test_clear_removes_every_key() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::json_dir(dir.path());
        Inventory::new(storage.clone())
            .replace_all(&seed::inventory())
            .unwrap();
        save_theme(&storage, ThemeMode::Dark).unwrap();

        storage.clear();
        assert!(Inventory::new(storage.clone()).list().is_empty());
        assert_eq!(load_theme(&storage), ThemeMode::Light);
    }

    #[test]
    fn test_corrupt_value_falls_back_to_default() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("nbps.raw_rolls.v1.json"), "{not json").unwrap();
        let inventory = Inventory::new(Storage::json_dir(dir.path()));
        assert!(inventory.list().is_empty());
    }

    #[test]
    fn test_failures_are_swallowed() {
        let storage = Storage::new(Arc::new(BrokenStore));
        assert_eq!(storage.get(THEME_KEY, ThemeMode::Dark), ThemeMode::Dark);
        storage.remove(THEME_KEY);
        storage.clear();

        let err = Inventory::new(storage).replace_all(&[]).unwrap_err();
        assert!(matches!(err, PlanError::PersistenceFailure { ref key, .. } if key == ROLLS_KEY));
    }

    #[test]
    fn test_theme_toggle_persists() {
        let storage = Storage::in_memory();
        assert_eq!(load_theme(&storage), ThemeMode::Light);
        save_theme(&storage, load_theme(&storage).toggled()).unwrap();
        assert_eq!(load_theme(&storage), ThemeMode::Dark);
    }
}
