use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use shared::{
    domain::{Normalization, Record},
    error::StoreError,
    persisted::PersistedRecord,
};
use tracing::{debug, info, warn};

/// Key the sheet has always been stored under.
pub const STORAGE_KEY: &str = "gig-ss-data-v1";

/// Opaque string store: the only thing the state store needs from its
/// persistence medium.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// In-process store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: impl Into<String>) -> Self {
        let store = Self::default();
        store
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.into());
        store
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key under a root directory. The directory is
/// created on first write.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.root.join(format!("{key}.json")))
    }
}

fn validate_key(key: &str) -> Result<(), StoreError> {
    let reason = if key.is_empty() {
        "key is empty"
    } else if key.starts_with('.') {
        "key must not start with '.'"
    } else if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        "key may only contain ASCII letters, digits, '-', '_' and '.'"
    } else {
        return Ok(());
    };
    Err(StoreError::InvalidKey {
        key: key.to_string(),
        reason,
    })
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let write_err = |source| StoreError::Write {
            key: key.to_string(),
            source,
        };
        fs::create_dir_all(&self.root).map_err(write_err)?;
        // Write beside the target and rename so a reader never sees half a blob.
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, value).map_err(write_err)?;
        fs::rename(&staging, &path).map_err(write_err)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Remove {
                key: key.to_string(),
                source,
            }),
        }
    }
}

/// Why a load produced the record it did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The stored record was current and is used as-is.
    Restored,
    /// Nothing stored under the key.
    Missing,
    /// The backend could not be read.
    Unreadable(String),
    /// The stored text is not a record.
    Corrupt(String),
    /// The stored record predates the current schema and was discarded.
    Outdated { found: Option<i64> },
}

impl LoadOutcome {
    pub fn used_defaults(&self) -> bool {
        !matches!(self, Self::Restored)
    }
}

#[derive(Debug, Clone)]
pub struct Loaded {
    pub record: Record,
    pub outcome: LoadOutcome,
    pub normalization: Normalization,
}

/// Loads, saves and resets the single record kept under one key.
#[derive(Debug, Clone)]
pub struct StateStore<S> {
    backend: S,
    key: String,
}

impl<S: KeyValueStore> StateStore<S> {
    pub fn new(backend: S) -> Self {
        Self::with_key(backend, STORAGE_KEY)
    }

    pub fn with_key(backend: S, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn load(&self) -> Record {
        self.load_with_outcome().record
    }

    /// Never fails: every read, parse or version problem falls back to the
    /// default record. An outdated record is also removed from the backend.
    pub fn load_with_outcome(&self) -> Loaded {
        let (mut record, outcome) = match self.backend.get(&self.key) {
            Ok(None) => (Record::default(), LoadOutcome::Missing),
            Err(err) => {
                warn!(key = %self.key, error = %err, "stored record unreadable; using defaults");
                (Record::default(), LoadOutcome::Unreadable(err.to_string()))
            }
            Ok(Some(raw)) => match serde_json::from_str::<PersistedRecord>(&raw) {
                Err(err) => {
                    warn!(key = %self.key, error = %err, "stored record corrupt; using defaults");
                    (Record::default(), LoadOutcome::Corrupt(err.to_string()))
                }
                Ok(persisted) if persisted.is_outdated() => {
                    let found = persisted.version;
                    info!(key = %self.key, ?found, "stored record outdated; resetting to defaults");
                    if let Err(err) = self.backend.remove(&self.key) {
                        warn!(key = %self.key, error = %err, "failed to clear outdated record");
                    }
                    (Record::default(), LoadOutcome::Outdated { found })
                }
                Ok(persisted) => (Record::from(persisted), LoadOutcome::Restored),
            },
        };

        let normalization = record.normalize();
        if normalization.changed() {
            info!(
                companies_restored = normalization.companies_restored,
                roster_restored = normalization.roster_restored,
                "restored default sections of loaded record"
            );
        }
        debug!(key = %self.key, ?outcome, workers = record.worker_count(), "record loaded");

        Loaded {
            record,
            outcome,
            normalization,
        }
    }

    pub fn save(&self, record: &Record) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(&PersistedRecord::from(record))?;
        self.backend.set(&self.key, &encoded)
    }

    /// Replaces whatever is stored with the default record and returns it.
    /// A failed write is logged; the defaults are returned regardless.
    pub fn reset(&self) -> Record {
        let record = Record::default();
        match self.save(&record) {
            Ok(()) => info!(key = %self.key, "record reset to defaults"),
            Err(err) => warn!(key = %self.key, error = %err, "failed to persist reset record"),
        }
        record
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
