use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::asset::Asset;
use super::snapshot::{MonthlyRecord, MonthlySnapshot};
use super::year_month::YearMonth;
use crate::errors::CoreError;

/// The portable document holding the whole ledger.
///
/// Shape: `{ assets: [...], monthlyData: [...], exportDate }`. Documents
/// produced by earlier versions of the app (embedded asset lists stored as
/// JSON strings) and hand-edited ones (inline arrays) are both accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument {
    pub assets: Vec<Asset>,

    pub monthly_data: Vec<BackupMonth>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_date: Option<DateTime<Utc>>,
}

/// One month inside a backup document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupMonth {
    pub year_month: YearMonth,

    #[serde(default)]
    pub total_amount: f64,

    #[serde(default)]
    pub income: f64,

    pub assets: EmbeddedAssets,
}

/// The asset list of a month, either still encoded (as stored) or inline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmbeddedAssets {
    Encoded(String),
    Inline(Vec<Asset>),
}

impl BackupMonth {
    /// Decode into a snapshot with a freshly computed total.
    pub fn to_snapshot(&self) -> Result<MonthlySnapshot, CoreError> {
        let assets = match &self.assets {
            EmbeddedAssets::Inline(list) => list.clone(),
            EmbeddedAssets::Encoded(doc) => serde_json::from_str(doc).map_err(|e| {
                CoreError::InvalidFormat(format!(
                    "monthlyData[{}].assets is not a valid asset list: {e}",
                    self.year_month
                ))
            })?,
        };
        Ok(MonthlySnapshot::new(self.year_month, self.income, assets))
    }
}

impl From<MonthlyRecord> for BackupMonth {
    fn from(record: MonthlyRecord) -> Self {
        Self {
            year_month: record.year_month,
            total_amount: record.total_amount,
            income: record.income,
            assets: EmbeddedAssets::Encoded(record.assets),
        }
    }
}
