use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::CoreError;

/// Table of asset definitions (current schema: keyed by `code`).
pub const ASSETS_TABLE: &str = "assets";

/// Table of monthly snapshots, keyed by `yearMonth`.
pub const MONTHLY_TABLE: &str = "monthlyData";

/// A record that lives in a named table under a stable key.
pub trait TableRecord: Serialize + DeserializeOwned {
    /// Name of the table the record lives in.
    const TABLE: &'static str;

    /// Primary key within the table.
    fn key(&self) -> String;
}

/// The whole durable state: a schema version and a set of named tables,
/// each mapping a primary key to a JSON document.
///
/// Documents stay untyped at this level so every schema version can define
/// its own record shapes and the migration pipeline can rewrite them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Database {
    pub version: u32,
    tables: BTreeMap<String, BTreeMap<String, String>>,
}

impl Database {
    /// An empty database at the given schema version.
    pub fn new(version: u32) -> Self {
        Self {
            version,
            tables: BTreeMap::new(),
        }
    }

    /// Names of all tables that hold at least one record or were created.
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    /// Number of records in a table (0 if it does not exist).
    pub fn count(&self, table: &str) -> usize {
        self.tables.get(table).map_or(0, BTreeMap::len)
    }

    /// Create the table if missing.
    pub fn create_table(&mut self, table: &str) {
        self.tables.entry(table.to_string()).or_default();
    }

    /// Remove a table and everything in it.
    pub fn drop_table(&mut self, table: &str) -> usize {
        self.tables.remove(table).map_or(0, |rows| rows.len())
    }

    pub fn get_raw(&self, table: &str, key: &str) -> Option<&str> {
        self.tables.get(table)?.get(key).map(String::as_str)
    }

    /// Upsert a raw document.
    pub fn put_raw(&mut self, table: &str, key: impl Into<String>, document: impl Into<String>) {
        self.tables
            .entry(table.to_string())
            .or_default()
            .insert(key.into(), document.into());
    }

    pub fn delete_raw(&mut self, table: &str, key: &str) -> bool {
        self.tables
            .get_mut(table)
            .is_some_and(|rows| rows.remove(key).is_some())
    }

    /// Empty a table, keeping it in place.
    pub fn clear(&mut self, table: &str) {
        if let Some(rows) = self.tables.get_mut(table) {
            rows.clear();
        }
    }

    /// All `(key, document)` pairs of a table in key order.
    pub fn rows(&self, table: &str) -> impl Iterator<Item = (&str, &str)> {
        self.tables
            .get(table)
            .into_iter()
            .flat_map(|rows| rows.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    // ── Typed access ────────────────────────────────────────────────

    pub fn get<T: TableRecord>(&self, key: &str) -> Result<Option<T>, CoreError> {
        self.get_raw(T::TABLE, key)
            .map(|doc| decode::<T>(key, doc))
            .transpose()
    }

    pub fn to_array<T: TableRecord>(&self) -> Result<Vec<T>, CoreError> {
        self.rows(T::TABLE)
            .map(|(key, doc)| decode::<T>(key, doc))
            .collect()
    }

    pub fn put<T: TableRecord>(&mut self, record: &T) -> Result<(), CoreError> {
        let document = serde_json::to_string(record).map_err(|e| {
            CoreError::Serialization(format!("Failed to encode {} record: {e}", T::TABLE))
        })?;
        self.put_raw(T::TABLE, record.key(), document);
        Ok(())
    }
}

fn decode<T: TableRecord>(key: &str, document: &str) -> Result<T, CoreError> {
    serde_json::from_str(document).map_err(|e| {
        CoreError::Deserialization(format!("Unreadable {} record '{key}': {e}", T::TABLE))
    })
}

// ── Current-schema records ──────────────────────────────────────────

impl TableRecord for crate::models::asset::Asset {
    const TABLE: &'static str = ASSETS_TABLE;

    fn key(&self) -> String {
        self.code.clone()
    }
}

impl TableRecord for crate::models::snapshot::MonthlyRecord {
    const TABLE: &'static str = MONTHLY_TABLE;

    fn key(&self) -> String {
        self.year_month.to_string()
    }
}
