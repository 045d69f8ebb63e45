use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashSet;

use crate::errors::CoreError;
use crate::models::asset::Asset;
use crate::models::backup::{BackupDocument, BackupMonth};
use crate::models::snapshot::MonthlyRecord;

/// Top-level keys every backup document must carry.
const REQUIRED_KEYS: [&str; 2] = ["assets", "monthlyData"];

/// A backup that parsed and validated, waiting for the user to confirm the
/// overwrite. Only [`crate::Ledger::apply_import`] consumes it.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingImport {
    pub(crate) assets: Vec<Asset>,
    pub(crate) months: Vec<MonthlyRecord>,
}

impl PendingImport {
    #[must_use]
    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    #[must_use]
    pub fn month_count(&self) -> usize {
        self.months.len()
    }
}

/// Converts between the store's tables and the portable backup document.
pub struct BackupService;

impl BackupService {
    pub fn new() -> Self {
        Self
    }

    /// Assemble a backup from stored records.
    pub fn export(
        &self,
        assets: Vec<Asset>,
        months: Vec<MonthlyRecord>,
        export_date: DateTime<Utc>,
    ) -> BackupDocument {
        BackupDocument {
            assets,
            monthly_data: months.into_iter().map(BackupMonth::from).collect(),
            export_date: Some(export_date),
        }
    }

    /// Pretty-printed JSON of a backup.
    pub fn to_json(&self, document: &BackupDocument) -> Result<String, CoreError> {
        serde_json::to_string_pretty(document)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize backup: {e}")))
    }

    /// Suggested download name for a backup taken on `date`.
    #[must_use]
    pub fn file_name(&self, date: NaiveDate) -> String {
        format!("asset-ledger-backup-{}.json", date.format("%Y-%m-%d"))
    }

    /// Size gate for collaborators that want to enforce a ceiling before
    /// reading a document.
    pub fn check_size(&self, len: usize, max: usize) -> Result<(), CoreError> {
        if len > max {
            return Err(CoreError::InvalidFormat(format!(
                "Backup is {len} bytes, larger than the {max} byte limit"
            )));
        }
        Ok(())
    }

    /// Parse and validate a backup without touching the store.
    ///
    /// Everything that could make the import fail half-way is checked here:
    /// both top-level keys, every record's shape, key uniqueness and the
    /// embedded asset lists. Snapshot totals are recomputed.
    pub fn parse(&self, json: &str) -> Result<PendingImport, CoreError> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| CoreError::InvalidFormat(format!("Backup is not well-formed JSON: {e}")))?;

        let object = value
            .as_object()
            .ok_or_else(|| CoreError::InvalidFormat("Backup must be a JSON object".into()))?;
        for key in REQUIRED_KEYS {
            if !object.contains_key(key) {
                return Err(CoreError::InvalidFormat(format!("Missing top-level key '{key}'")));
            }
        }

        let document: BackupDocument = serde_json::from_value(value)
            .map_err(|e| CoreError::InvalidFormat(format!("Unexpected backup contents: {e}")))?;

        let mut codes = HashSet::new();
        let mut assets = Vec::with_capacity(document.assets.len());
        for asset in &document.assets {
            check_code(&asset.code, "assets")?;
            if !codes.insert(asset.code.as_str()) {
                return Err(CoreError::InvalidFormat(format!(
                    "Duplicate asset code '{}'",
                    asset.code
                )));
            }
            assets.push(asset.rounded());
        }

        let mut seen_months = HashSet::new();
        let mut months = Vec::with_capacity(document.monthly_data.len());
        for month in &document.monthly_data {
            if !seen_months.insert(month.year_month) {
                return Err(CoreError::InvalidFormat(format!(
                    "Duplicate month '{}'",
                    month.year_month
                )));
            }
            let snapshot = month.to_snapshot()?;
            for entry in &snapshot.assets {
                check_code(&entry.code, &format!("monthlyData[{}]", month.year_month))?;
            }
            months.push(
                snapshot
                    .encode()
                    .map_err(|e| CoreError::InvalidFormat(e.to_string()))?,
            );
        }

        log::info!(
            "Backup validated: {} assets, {} months",
            assets.len(),
            months.len()
        );

        Ok(PendingImport { assets, months })
    }
}

impl Default for BackupService {
    fn default() -> Self {
        Self::new()
    }
}

fn check_code(code: &str, location: &str) -> Result<(), CoreError> {
    if code.trim().is_empty() {
        return Err(CoreError::InvalidFormat(format!(
            "{location} contains an asset without a code"
        )));
    }
    Ok(())
}
