//! Settings persistence boundary.
//!
//! [`SettingsStore`] is the host editor's settings API reduced to three
//! primitives: scoped read, targeted async write, and a plain listener
//! registry over key changes. Two implementations ship here —
//! [`MemorySettings`] for tests and embedding hosts, and
//! [`JsonFileSettings`] persisting a single JSON document on disk.

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use easel_collab::NormalizedUri;

use crate::error::ConfigError;

/// Where a written value lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingTarget {
    Global,
    Document(NormalizedUri),
}

/// Notification that one settings key changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingChange {
    pub key: String,
    pub target: SettingTarget,
}

type Listener = Box<dyn Fn(&SettingChange) + Send + Sync>;
type ListenerMap = Mutex<HashMap<u64, Listener>>;

/// RAII subscription: dropping it unregisters the listener.
pub struct ListenerHandle {
    registry: Weak<ListenerMap>,
    id: u64,
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.lock().unwrap().remove(&self.id);
        }
    }
}

/// Shared listener registry used by both store implementations.
#[derive(Default)]
struct ListenerRegistry {
    listeners: Arc<ListenerMap>,
    next_id: AtomicU64,
}

impl ListenerRegistry {
    fn add(&self, listener: Listener) -> ListenerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().unwrap().insert(id, listener);
        ListenerHandle {
            registry: Arc::downgrade(&self.listeners),
            id,
        }
    }

    fn notify(&self, change: &SettingChange) {
        for listener in self.listeners.lock().unwrap().values() {
            listener(change);
        }
    }
}

/// Host settings API, dependency-passed to every consumer.
pub trait SettingsStore: Send + Sync {
    /// Read one key. A document scope falls back to the global table;
    /// defaulting is the caller's concern.
    fn read(&self, key: &str, scope: Option<&NormalizedUri>) -> Option<Value>;

    /// Write one key to the given target. The returned future completes
    /// when the value is durably persisted (the settings round-trip).
    fn write(
        &self,
        key: &str,
        value: Value,
        target: SettingTarget,
    ) -> BoxFuture<'static, Result<(), ConfigError>>;

    /// Register a change listener; the registration lives as long as
    /// the returned handle.
    fn subscribe(&self, listener: Listener) -> ListenerHandle;
}

/// Global + per-document value tables.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Tables {
    #[serde(default)]
    global: BTreeMap<String, Value>,
    #[serde(default)]
    documents: BTreeMap<NormalizedUri, BTreeMap<String, Value>>,
}

impl Tables {
    fn read(&self, key: &str, scope: Option<&NormalizedUri>) -> Option<Value> {
        if let Some(uri) = scope {
            if let Some(value) = self.documents.get(uri).and_then(|table| table.get(key)) {
                return Some(value.clone());
            }
        }
        self.global.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: Value, target: &SettingTarget) {
        match target {
            SettingTarget::Global => {
                self.global.insert(key.to_string(), value);
            }
            SettingTarget::Document(uri) => {
                self.documents
                    .entry(uri.clone())
                    .or_default()
                    .insert(key.to_string(), value);
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────────
// In-memory store
// ───────────────────────────────────────────────────────────────────

/// Volatile store for tests and hosts that persist elsewhere.
#[derive(Default)]
pub struct MemorySettings {
    tables: Mutex<Tables>,
    registry: ListenerRegistry,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a global value without going through the async write path.
    pub fn seed(&self, key: &str, value: Value) {
        self.tables.lock().unwrap().write(key, value, &SettingTarget::Global);
    }

    /// Seed a document-scoped value.
    pub fn seed_document(&self, uri: &NormalizedUri, key: &str, value: Value) {
        self.tables
            .lock()
            .unwrap()
            .write(key, value, &SettingTarget::Document(uri.clone()));
    }
}

impl SettingsStore for MemorySettings {
    fn read(&self, key: &str, scope: Option<&NormalizedUri>) -> Option<Value> {
        self.tables.lock().unwrap().read(key, scope)
    }

    fn write(
        &self,
        key: &str,
        value: Value,
        target: SettingTarget,
    ) -> BoxFuture<'static, Result<(), ConfigError>> {
        self.tables.lock().unwrap().write(key, value, &target);
        self.registry.notify(&SettingChange { key: key.to_string(), target });
        Box::pin(async { Ok(()) })
    }

    fn subscribe(&self, listener: Listener) -> ListenerHandle {
        self.registry.add(listener)
    }
}

// ───────────────────────────────────────────────────────────────────
// JSON-file store
// ───────────────────────────────────────────────────────────────────

/// Store persisting both tables as one pretty-printed JSON file.
///
/// Unparseable content falls back to defaults with a logged warning —
/// the extension must come up even with a damaged settings file.
pub struct JsonFileSettings {
    path: PathBuf,
    tables: Arc<Mutex<Tables>>,
    registry: ListenerRegistry,
}

impl JsonFileSettings {
    /// Load the file at `path`, or start from defaults.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let tables = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(tables) => tables,
                Err(err) => {
                    log::warn!(
                        "unparseable settings file {}: {err}; using defaults",
                        path.display()
                    );
                    Tables::default()
                }
            },
            Err(_) => Tables::default(), // absent file is the first-run case
        };
        Self {
            path,
            tables: Arc::new(Mutex::new(tables)),
            registry: ListenerRegistry::default(),
        }
    }

    /// Conventional location under the user's config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("easel").join("settings.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileSettings {
    fn read(&self, key: &str, scope: Option<&NormalizedUri>) -> Option<Value> {
        self.tables.lock().unwrap().read(key, scope)
    }

    fn write(
        &self,
        key: &str,
        value: Value,
        target: SettingTarget,
    ) -> BoxFuture<'static, Result<(), ConfigError>> {
        let snapshot = {
            let mut tables = self.tables.lock().unwrap();
            tables.write(key, value, &target);
            tables.clone()
        };
        self.registry.notify(&SettingChange { key: key.to_string(), target });

        let path = self.path.clone();
        Box::pin(async move {
            let json = serde_json::to_string_pretty(&snapshot)?;
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, json).await?;
            Ok(())
        })
    }

    fn subscribe(&self, listener: Listener) -> ListenerHandle {
        self.registry.add(listener)
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn uri(s: &str) -> NormalizedUri {
        NormalizedUri::new(s)
    }

    // ── Scoped reads ─────────────────────────────────────────────

    #[tokio::test]
    async fn test_document_scope_shadows_global() {
        let store = MemorySettings::new();
        store.seed("easel.theme", json!("dark"));
        store.seed_document(&uri("file:///a"), "easel.theme", json!("Kennedy"));

        assert_eq!(store.read("easel.theme", None), Some(json!("dark")));
        assert_eq!(
            store.read("easel.theme", Some(&uri("file:///a"))),
            Some(json!("Kennedy"))
        );
        // Unknown document falls back to global.
        assert_eq!(
            store.read("easel.theme", Some(&uri("file:///b"))),
            Some(json!("dark"))
        );
    }

    #[tokio::test]
    async fn test_write_targets_are_independent() {
        let store = MemorySettings::new();
        store
            .write("k", json!(1), SettingTarget::Document(uri("file:///a")))
            .await
            .unwrap();

        assert_eq!(store.read("k", None), None);
        assert_eq!(store.read("k", Some(&uri("file:///a"))), Some(json!(1)));
    }

    // ── Listeners ────────────────────────────────────────────────

    #[tokio::test]
    async fn test_listener_fires_and_handle_unsubscribes() {
        let store = MemorySettings::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let handle = store.subscribe(Box::new({
            let seen = seen.clone();
            move |change| {
                assert_eq!(change.key, "k");
                seen.fetch_add(1, Ordering::SeqCst);
            }
        }));

        store.write("k", json!(1), SettingTarget::Global).await.unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        drop(handle);
        store.write("k", json!(2), SettingTarget::Global).await.unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1, "dropped handle must not fire");
    }

    // ── JSON-file store ──────────────────────────────────────────

    #[tokio::test]
    async fn test_json_file_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let store = JsonFileSettings::open(&path);
        store
            .write("easel.offline", json!(false), SettingTarget::Global)
            .await
            .unwrap();
        store
            .write(
                "easel.theme",
                json!("min"),
                SettingTarget::Document(uri("file:///a")),
            )
            .await
            .unwrap();

        let reopened = JsonFileSettings::open(&path);
        assert_eq!(reopened.read("easel.offline", None), Some(json!(false)));
        assert_eq!(
            reopened.read("easel.theme", Some(&uri("file:///a"))),
            Some(json!("min"))
        );
    }

    #[test]
    fn test_damaged_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = JsonFileSettings::open(&path);
        assert_eq!(store.read("anything", None), None);
    }
}
