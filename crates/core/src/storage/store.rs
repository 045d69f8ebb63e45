use super::backend::StorageBackend;
use super::database::{Database, TableRecord, ASSETS_TABLE, MONTHLY_TABLE};
use super::migration::{self, SCHEMA_VERSION};
use crate::errors::CoreError;

/// Versioned table store over a [`StorageBackend`].
///
/// Opening runs the migration pipeline to completion before any table can
/// be read. Every write goes through [`Store::write`]: changes are made on a
/// working copy, persisted by the backend, and only then become the
/// committed state. A failed closure or a failed persist leaves the
/// committed state exactly as it was.
pub struct Store {
    backend: Box<dyn StorageBackend>,
    db: Database,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("location", &self.backend.describe())
            .field("version", &self.db.version)
            .field("assets", &self.db.count(ASSETS_TABLE))
            .field("months", &self.db.count(MONTHLY_TABLE))
            .finish()
    }
}

impl Store {
    /// Open the medium, initializing it when fresh and upgrading it when its
    /// schema is behind. Each transition is persisted on its own, so the
    /// medium always holds a whole version.
    pub fn open(mut backend: Box<dyn StorageBackend>) -> Result<Self, CoreError> {
        let location = backend.describe();

        let mut db = match backend.load()? {
            Some(db) => db,
            None => {
                let mut db = Database::new(SCHEMA_VERSION);
                db.create_table(ASSETS_TABLE);
                db.create_table(MONTHLY_TABLE);
                backend.persist(&db)?;
                log::info!("Initialized empty ledger store at {location} (schema v{SCHEMA_VERSION})");
                db
            }
        };

        while migration::needs_upgrade(&db)? {
            let from = db.version;
            let upgraded = migration::step(db)?;
            backend.persist(&upgraded).map_err(|e| CoreError::MigrationFailed {
                from,
                to: upgraded.version,
                reason: format!("could not persist upgraded store: {e}"),
            })?;
            db = upgraded;
        }

        log::info!(
            "Opened ledger store at {location}: {} assets, {} months",
            db.count(ASSETS_TABLE),
            db.count(MONTHLY_TABLE)
        );

        Ok(Self { backend, db })
    }

    /// Schema version of the committed state.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.db.version
    }

    // ── Reads ───────────────────────────────────────────────────────

    pub fn get<T: TableRecord>(&self, key: &str) -> Result<Option<T>, CoreError> {
        self.db.get(key)
    }

    pub fn to_array<T: TableRecord>(&self) -> Result<Vec<T>, CoreError> {
        self.db.to_array()
    }

    // ── Writes ──────────────────────────────────────────────────────

    /// Run `f` against a working copy and commit it durably.
    ///
    /// Nothing is persisted when `f` fails or leaves the data unchanged.
    pub fn write<R, F>(&mut self, f: F) -> Result<R, CoreError>
    where
        F: FnOnce(&mut Transaction) -> Result<R, CoreError>,
    {
        let mut tx = Transaction {
            db: self.db.clone(),
        };
        let out = f(&mut tx)?;
        if tx.db == self.db {
            return Ok(out);
        }
        self.backend.persist(&tx.db)?;
        self.db = tx.db;
        Ok(out)
    }

    /// Upsert one record.
    pub fn put<T: TableRecord>(&mut self, record: &T) -> Result<(), CoreError> {
        self.write(|tx| tx.put(record))
    }

    /// Upsert many records in one commit.
    pub fn bulk_put<T: TableRecord>(&mut self, records: &[T]) -> Result<(), CoreError> {
        self.write(|tx| tx.bulk_put(records))
    }

    /// Delete by key; returns whether a record existed.
    pub fn delete<T: TableRecord>(&mut self, key: &str) -> Result<bool, CoreError> {
        self.write(|tx| Ok(tx.delete::<T>(key)))
    }

    /// Remove every record of `T`'s table.
    pub fn clear<T: TableRecord>(&mut self) -> Result<(), CoreError> {
        self.write(|tx| {
            tx.clear::<T>();
            Ok(())
        })
    }
}

/// Working copy handed to [`Store::write`].
#[derive(Debug)]
pub struct Transaction {
    db: Database,
}

impl Transaction {
    pub fn get<T: TableRecord>(&self, key: &str) -> Result<Option<T>, CoreError> {
        self.db.get(key)
    }

    pub fn to_array<T: TableRecord>(&self) -> Result<Vec<T>, CoreError> {
        self.db.to_array()
    }

    pub fn put<T: TableRecord>(&mut self, record: &T) -> Result<(), CoreError> {
        self.db.put(record)
    }

    pub fn bulk_put<T: TableRecord>(&mut self, records: &[T]) -> Result<(), CoreError> {
        records.iter().try_for_each(|r| self.db.put(r))
    }

    /// Insert records whose keys must not exist yet.
    pub fn bulk_add<T: TableRecord>(&mut self, records: &[T]) -> Result<(), CoreError> {
        for record in records {
            let key = record.key();
            if self.db.get_raw(T::TABLE, &key).is_some() {
                return Err(CoreError::ValidationError(format!(
                    "Key '{key}' already exists in {}",
                    T::TABLE
                )));
            }
            self.db.put(record)?;
        }
        Ok(())
    }

    pub fn delete<T: TableRecord>(&mut self, key: &str) -> bool {
        self.db.delete_raw(T::TABLE, key)
    }

    pub fn clear<T: TableRecord>(&mut self) {
        self.db.clear(T::TABLE);
    }
}
