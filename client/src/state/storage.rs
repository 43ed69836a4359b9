//! Durable key-value storage shared by every execution context.
//!
//! SYSTEM CONTEXT
//! ==============
//! The session store persists exactly one record through this trait. Each
//! backend announces changes on a broadcast channel so other contexts reading
//! the same storage can re-hydrate. Delivery is asynchronous: a writer never
//! waits for observers, and observers only see changes eventually.
//!
//! BACKENDS
//! ========
//! - `MemoryStorage`: shared map for tests and for several in-process
//!   contexts ("tabs") pointed at one `Arc`.
//! - `FileStorage`: one JSON file per key. Writes replace the file atomically;
//!   `watch` follows the directory with a debounced `notify` watcher so
//!   writes made by other processes are announced too.

#[cfg(test)]
#[path = "storage_test.rs"]
mod storage_test;

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

const EVENT_CHANNEL_CAPACITY: usize = 64;
const RECORD_EXTENSION: &str = "json";

// =============================================================================
// TYPES
// =============================================================================

/// Errors raised by a durable backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),
    #[error("storage watcher failed: {0}")]
    Watch(#[from] notify::Error),
}

/// Change notification for one storage key.
///
/// `new_value` is `None` when the key was removed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub new_value: Option<String>,
}

/// Per-origin persistent key-value storage.
///
/// Each write is a single atomic replace-or-delete of one key; readers
/// tolerate eventual consistency, so no locking is exposed.
pub trait DurableStorage: Send + Sync {
    /// Current raw value for `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Replace the value for `key` and announce the change.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] when the backend cannot persist the value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key` and announce the change. Removing an absent key is a no-op.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] when the backend cannot delete the value.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Subscribe to change notifications.
    fn subscribe(&self) -> broadcast::Receiver<StorageEvent>;
}

// =============================================================================
// MEMORY BACKEND
// =============================================================================

/// In-process storage. Clone the surrounding `Arc` to share it between contexts.
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
    events: broadcast::Sender<StorageEvent>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { entries: Mutex::new(HashMap::new()), events }
    }

    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Seed a raw value without announcing it, e.g. to simulate a record left
    /// behind by an earlier run.
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.lock().insert(key.to_owned(), value.to_owned());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn announce(&self, key: &str, new_value: Option<String>) {
        // No receivers is fine: nobody is watching yet.
        let _ = self.events.send(StorageEvent { key: key.to_owned(), new_value });
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl DurableStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock().insert(key.to_owned(), value.to_owned());
        self.announce(key, Some(value.to_owned()));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let existed = self.lock().remove(key).is_some();
        if existed {
            self.announce(key, None);
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.events.subscribe()
    }
}

// =============================================================================
// FILE BACKEND
// =============================================================================

/// Directory-backed storage: key `k` lives in `<dir>/k.json`.
pub struct FileStorage {
    dir: PathBuf,
    events: broadcast::Sender<StorageEvent>,
}

impl FileStorage {
    /// Open (and create if needed) the storage directory.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self { dir, events })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key != "."
            && key != ".."
            && !key.contains(['/', '\\'])
            && !key.starts_with('.');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_owned()));
        }
        Ok(self.dir.join(format!("{key}.{RECORD_EXTENSION}")))
    }

    /// Watch the directory and announce every debounced change to a record
    /// file, including writes made by other processes. Watching stops when
    /// the returned handle is dropped or the storage itself is dropped.
    ///
    /// Events arrive on a background thread owned by the watcher; no async
    /// runtime is needed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Watch`] when the platform watcher cannot be
    /// created or cannot watch the directory.
    pub fn watch(self: &Arc<Self>, debounce: Duration) -> Result<DirectoryWatcher, StorageError> {
        let weak = Arc::downgrade(self);
        let mut debouncer = new_debouncer(debounce, move |result: DebounceEventResult| {
            let Some(storage) = weak.upgrade() else {
                return;
            };
            match result {
                Ok(events) => {
                    for event in events {
                        storage.announce_external(&event.path);
                    }
                }
                Err(e) => warn!(error = ?e, dir = %storage.dir.display(), "storage watcher error"),
            }
        })?;
        debouncer.watcher().watch(&self.dir, RecursiveMode::NonRecursive)?;
        debug!(dir = %self.dir.display(), "watching storage directory");
        Ok(DirectoryWatcher { _debouncer: debouncer })
    }

    /// Re-read a changed file and publish its current value.
    fn announce_external(&self, path: &Path) {
        let Some(key) = record_key(path) else {
            return;
        };
        let new_value = self.get(&key);
        debug!(%key, removed = new_value.is_none(), "storage change detected on disk");
        let _ = self.events.send(StorageEvent { key, new_value });
    }
}

/// Keeps a [`FileStorage::watch`] subscription alive.
pub struct DirectoryWatcher {
    _debouncer: Debouncer<RecommendedWatcher>,
}

/// Storage key for a record file path. Temp files and other names are ignored.
fn record_key(path: &Path) -> Option<String> {
    if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXTENSION) {
        return None;
    }
    let key = path.file_stem()?.to_str()?;
    if key.is_empty() || key.starts_with('.') {
        return None;
    }
    Some(key.to_owned())
}

impl DurableStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.path_for(key).ok()?;
        match std::fs::read_to_string(&path) {
            Ok(value) => Some(value),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(error = %e, path = %path.display(), "storage read failed");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        // Hidden temp names are skipped by the directory scan.
        let tmp = self.dir.join(format!(".{key}.{}.tmp", Uuid::new_v4()));
        std::fs::write(&tmp, value)?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        let _ = self.events.send(StorageEvent { key: key.to_owned(), new_value: Some(value.to_owned()) });
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                let _ = self.events.send(StorageEvent { key: key.to_owned(), new_value: None });
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.events.subscribe()
    }
}
