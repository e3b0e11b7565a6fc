//! Durable key-value store backed by a JSON document on disk.
//!
//! Every `set` rewrites the whole document synchronously, so a value returned
//! by `set` is already on disk. Clones share one in-memory document; a window
//! handler holding a clone observes writes made through any other clone.

use crate::error::StoreError;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const KEY_WINDOW_POSITIONS: &str = "windowPositions";
pub const KEY_IS_VISIBLE: &str = "isVisible";
pub const KEY_SELECTED_HERO: &str = "selectedHero";
pub const KEY_USERNAME: &str = "username";

pub const DEFAULT_HERO: &str = "Dva";

struct Inner {
    path: PathBuf,
    doc: Map<String, Value>,
}

#[derive(Clone)]
pub struct DurableStore {
    inner: Arc<Mutex<Inner>>,
}

impl DurableStore {
    /// Open the store at `path`. A missing, empty or unreadable document is
    /// an empty store; the next `set` replaces it.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let doc = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => Map::new(),
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(doc) => doc,
                Err(e) => {
                    tracing::warn!("Ignoring malformed store {}: {}", path.display(), e);
                    Map::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!("Opened store {} with {} keys", path.display(), doc.len());
        Ok(DurableStore {
            inner: Arc::new(Mutex::new(Inner { path, doc })),
        })
    }

    pub fn path(&self) -> PathBuf {
        self.inner.lock().path.clone()
    }

    /// Read `key`, or `None` if it was never set or holds another shape
    pub fn get_opt<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.inner.lock().doc.get(key).cloned()?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("Store key `{}` has unexpected shape: {}", key, e);
                None
            }
        }
    }

    /// Read `key`, falling back to the caller-supplied default
    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get_opt(key).unwrap_or(default)
    }

    /// Write `key` and flush the document before returning
    pub fn set<T: Serialize>(&self, key: &str, value: T) -> Result<(), StoreError> {
        let value = serde_json::to_value(value)?;
        let mut inner = self.inner.lock();
        inner.doc.insert(key.to_string(), value);
        write_document(&inner.path, &inner.doc)
    }
}

/// Write next to the target and rename over it, so the document on disk is
/// always either the old or the new version
fn write_document(path: &Path, doc: &Map<String, Value>) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(doc)?;
    let tmp = temp_path(path);
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{GeometryMap, Rect, WindowId};

    #[test]
    fn test_get_before_set_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = DurableStore::open(dir.path().join("store.json")).unwrap();

        assert_eq!(store.get(KEY_SELECTED_HERO, DEFAULT_HERO.to_string()), "Dva");
        assert!(!store.get(KEY_IS_VISIBLE, false));
        assert_eq!(store.get_opt::<String>(KEY_USERNAME), None);
        assert!(!store.path().exists());
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = DurableStore::open(&path).unwrap();
        store.set(KEY_USERNAME, "Foo#1234").unwrap();
        store.set(KEY_IS_VISIBLE, true).unwrap();
        let mut positions = GeometryMap::new();
        positions.insert(WindowId::Tank, Rect::new(5, 6, 200, 100));
        store.set(KEY_WINDOW_POSITIONS, &positions).unwrap();
        drop(store);

        let reopened = DurableStore::open(&path).unwrap();
        assert_eq!(reopened.get_opt::<String>(KEY_USERNAME).as_deref(), Some("Foo#1234"));
        assert!(reopened.get(KEY_IS_VISIBLE, false));
        assert_eq!(reopened.get(KEY_WINDOW_POSITIONS, GeometryMap::new()), positions);
    }

    #[test]
    fn test_last_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = DurableStore::open(dir.path().join("store.json")).unwrap();
        store.set(KEY_SELECTED_HERO, "Orisa").unwrap();
        store.set(KEY_SELECTED_HERO, "Sigma").unwrap();
        assert_eq!(store.get(KEY_SELECTED_HERO, String::new()), "Sigma");
    }

    #[test]
    fn test_clones_share_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = DurableStore::open(dir.path().join("store.json")).unwrap();
        let other = store.clone();
        store.set(KEY_SELECTED_HERO, "Winston").unwrap();
        assert_eq!(other.get(KEY_SELECTED_HERO, String::new()), "Winston");
    }

    #[test]
    fn test_wrong_shape_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = DurableStore::open(dir.path().join("store.json")).unwrap();
        store.set(KEY_IS_VISIBLE, "yes").unwrap();
        assert!(!store.get(KEY_IS_VISIBLE, false));
    }

    #[test]
    fn test_truncated_file_recovers_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = DurableStore::open(&path).unwrap();
        store.set(KEY_SELECTED_HERO, "Reinhardt").unwrap();
        drop(store);

        let contents = fs::read(&path).unwrap();
        fs::write(&path, &contents[..contents.len() / 2]).unwrap();

        let reopened = DurableStore::open(&path).unwrap();
        assert_eq!(reopened.get_opt::<String>(KEY_SELECTED_HERO), None);

        reopened.set(KEY_SELECTED_HERO, "Sigma").unwrap();
        let again = DurableStore::open(&path).unwrap();
        assert_eq!(again.get(KEY_SELECTED_HERO, String::new()), "Sigma");
    }

    #[test]
    fn test_set_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = DurableStore::open(&path).unwrap();
        store.set(KEY_IS_VISIBLE, true).unwrap();
        store.set(KEY_IS_VISIBLE, false).unwrap();

        assert!(path.exists());
        assert!(!temp_path(&path).exists());
        assert_eq!(temp_path(&path).file_name().unwrap(), "store.json.tmp");
    }
}
