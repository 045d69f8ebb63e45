use std::sync::{Arc, Mutex, MutexGuard};

use super::database::Database;
use crate::errors::CoreError;

/// The durable medium underneath a [`Store`](super::store::Store).
///
/// A backend moves whole databases: `persist` must not return `Ok` until
/// the new state is durable, and a failed `persist` must leave the
/// previously persisted state readable.
pub trait StorageBackend: Send {
    /// Human-readable location (for logs/errors).
    fn describe(&self) -> String;

    /// Read the persisted database, or `None` for a fresh medium.
    fn load(&mut self) -> Result<Option<Database>, CoreError>;

    /// Durably replace the persisted database.
    fn persist(&mut self, db: &Database) -> Result<(), CoreError>;
}

/// An in-process medium. Clones share the same storage, so a test can keep
/// a handle, reopen a store over it, or inject failures.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    medium: Arc<Mutex<MemoryMedium>>,
}

#[derive(Debug, Default)]
struct MemoryMedium {
    db: Option<Database>,
    fail_writes: bool,
    unavailable: bool,
    writes: usize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A medium that already holds `db` (e.g., data written by an older
    /// schema version).
    pub fn with_database(db: Database) -> Self {
        let backend = Self::default();
        backend.medium().db = Some(db);
        backend
    }

    /// Make every subsequent `persist` fail, as a full disk would.
    pub fn set_fail_writes(&self, fail: bool) {
        self.medium().fail_writes = fail;
    }

    /// Make every subsequent `load` fail, as a disabled medium would.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.medium().unavailable = unavailable;
    }

    /// What is currently persisted.
    pub fn persisted(&self) -> Option<Database> {
        self.medium().db.clone()
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.medium().writes
    }

    fn medium(&self) -> MutexGuard<'_, MemoryMedium> {
        self.medium.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl StorageBackend for MemoryBackend {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    fn load(&mut self) -> Result<Option<Database>, CoreError> {
        let medium = self.medium();
        if medium.unavailable {
            return Err(CoreError::StorageUnavailable(
                "in-memory medium is disabled".into(),
            ));
        }
        Ok(medium.db.clone())
    }

    fn persist(&mut self, db: &Database) -> Result<(), CoreError> {
        let mut medium = self.medium();
        if medium.fail_writes {
            return Err(CoreError::StorageUnavailable(
                "in-memory medium rejected the write".into(),
            ));
        }
        medium.db = Some(db.clone());
        medium.writes += 1;
        Ok(())
    }
}
