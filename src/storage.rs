//! Key-value blob storage and change notification.
//!
//! One serialized JSON blob per logical key. Reads and writes fail soft:
//! errors are logged and the caller keeps working with a default or
//! in-memory value, so a persistence failure degrades to session-only state
//! instead of propagating.
//!
//! Every successful write is broadcast as a [`ChangeNotice`] tagged with the
//! writing tab, so other open sessions over the same backend can replace
//! their in-memory collections (see [`crate::sync`]).

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;

use crate::model::id;

pub const USERS_KEY: &str = "users";
pub const EVENTS_KEY: &str = "events";
pub const REQUESTS_KEY: &str = "requests";
pub const SESSION_KEY: &str = "currentUserId";
pub const BANNED_KEY: &str = "bannedData";
pub const MAINTENANCE_KEY: &str = "isMaintenanceMode";

const CHANNEL_CAPACITY: usize = 64;

type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A write performed by some tab, as observed on the notification bus.
#[derive(Debug, Clone)]
pub struct ChangeNotice {
    /// Tab that performed the write.
    pub origin: String,
    /// Logical key, one of the `*_KEY` constants.
    pub key: String,
    /// New serialized value for the whole key.
    pub value: String,
}

/// Raw blob persistence.
pub trait Backend: Send + Sync {
    /// Read the blob stored under `key`, `None` when absent.
    fn read(&self, key: &str) -> Result<Option<String>>;
    /// Replace the blob stored under `key`.
    fn write(&self, key: &str, value: &str) -> Result<()>;
}

/// One JSON file per key under a directory.
pub struct JsonFile {
    dir: PathBuf,
}

impl JsonFile {
    /// Create a new [`JsonFile`] backend rooted at `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
        })
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Backend for JsonFile {
    fn read(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.blob_path(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        fs::write(self.blob_path(key), value)?;
        Ok(())
    }
}

/// Volatile backend for tests and ephemeral sessions.
#[derive(Default)]
pub struct Memory {
    blobs: Mutex<HashMap<String, String>>,
}

impl Backend for Memory {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let blobs =
            self.blobs.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(blobs.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let mut blobs =
            self.blobs.lock().unwrap_or_else(PoisonError::into_inner);
        blobs.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// Handle on the shared blob store, bound to one tab.
///
/// Writes through this handle are broadcast to every other handle attached
/// to the same backend; a handle never observes its own writes.
#[derive(Clone)]
pub struct Storage {
    backend: Arc<dyn Backend>,
    changes: broadcast::Sender<ChangeNotice>,
    tab: String,
}

impl Storage {
    /// Create a new [`Storage`] with a fresh notification bus.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let (changes, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            backend,
            changes,
            tab: id::generate("tab"),
        }
    }

    /// Open another tab over the same backend and notification bus.
    pub fn attach(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            changes: self.changes.clone(),
            tab: id::generate("tab"),
        }
    }

    /// Identifier of the tab owning this handle.
    pub fn tab(&self) -> &str {
        &self.tab
    }

    /// Subscribe to writes performed by any tab.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeNotice> {
        self.changes.subscribe()
    }

    /// Read a typed blob, falling back to `default` on absence, read
    /// failure or corrupt data.
    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.backend.read(key) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => value,
                Err(err) => {
                    tracing::error!(%err, key, "stored blob is corrupt");
                    default
                },
            },
            Ok(None) => default,
            Err(err) => {
                tracing::error!(%err, key, "failed to read storage");
                default
            },
        }
    }

    /// Persist a typed blob and notify other tabs.
    ///
    /// A failed write is logged and not broadcast: the local state keeps the
    /// new value, other tabs never see it.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::error!(%err, key, "failed to encode blob");
                return;
            },
        };

        if let Err(err) = self.backend.write(key, &raw) {
            tracing::error!(%err, key, "failed to write storage");
            return;
        }

        let _ = self.changes.send(ChangeNotice {
            origin: self.tab.clone(),
            key: key.to_owned(),
            value: raw,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage =
            Storage::new(Arc::new(JsonFile::new(dir.path()).unwrap()));

        storage.set(EVENTS_KEY, &vec!["e1".to_owned(), "e2".to_owned()]);
        let events: Vec<String> = storage.get(EVENTS_KEY, Vec::new());

        assert_eq!(events, vec!["e1", "e2"]);
        assert!(dir.path().join("events.json").is_file());
    }

    #[test]
    fn test_get_defaults_on_absent_key() {
        let storage = Storage::new(Arc::new(Memory::default()));
        assert!(!storage.get(MAINTENANCE_KEY, false));
        assert_eq!(storage.get(SESSION_KEY, None::<String>), None);
    }

    #[test]
    fn test_get_defaults_on_corrupt_blob() {
        let backend = Arc::new(Memory::default());
        backend.write(MAINTENANCE_KEY, "{not json").unwrap();

        let storage = Storage::new(backend);
        assert!(!storage.get(MAINTENANCE_KEY, false));
    }

    #[test]
    fn test_write_is_broadcast_with_origin() {
        let storage = Storage::new(Arc::new(Memory::default()));
        let mut changes = storage.subscribe();

        storage.set(MAINTENANCE_KEY, &true);

        let notice = changes.try_recv().unwrap();
        assert_eq!(notice.origin, storage.tab());
        assert_eq!(notice.key, MAINTENANCE_KEY);
        assert_eq!(notice.value, "true");
    }

    #[test]
    fn test_attached_tabs_share_backend() {
        let first = Storage::new(Arc::new(Memory::default()));
        let second = first.attach();

        first.set(SESSION_KEY, &Some("user_1".to_owned()));

        assert_ne!(first.tab(), second.tab());
        assert_eq!(
            second.get(SESSION_KEY, None::<String>),
            Some("user_1".to_owned())
        );
    }
}
