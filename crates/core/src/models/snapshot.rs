use serde::{Deserialize, Serialize};

use super::asset::Asset;
use super::year_month::YearMonth;
use crate::errors::CoreError;
use crate::money::{round2, sum2};

/// A monthly snapshot exactly as stored in the `monthlyData` table.
///
/// `assets` is an embedded JSON document: a denormalized value-at-time list,
/// not a relation into the asset table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRecord {
    pub year_month: YearMonth,
    #[serde(default)]
    pub total_amount: f64,
    #[serde(default)]
    pub income: f64,
    pub assets: String,
}

impl MonthlyRecord {
    /// Decode the embedded asset list.
    pub fn decode(&self) -> Result<MonthlySnapshot, CoreError> {
        let assets: Vec<Asset> = serde_json::from_str(&self.assets).map_err(|e| {
            CoreError::Deserialization(format!(
                "Asset list of {} is unreadable: {e}",
                self.year_month
            ))
        })?;
        Ok(MonthlySnapshot {
            year_month: self.year_month,
            total_amount: self.total_amount,
            income: self.income,
            assets,
        })
    }
}

/// The decoded form of a month: income plus the frozen asset values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySnapshot {
    pub year_month: YearMonth,

    /// Cached `round2(sum(assets[].amount))`
    pub total_amount: f64,

    /// New money added during the month
    pub income: f64,

    pub assets: Vec<Asset>,
}

impl MonthlySnapshot {
    /// Build a snapshot, rounding every amount and computing the total.
    pub fn new(year_month: YearMonth, income: f64, assets: Vec<Asset>) -> Self {
        let assets: Vec<Asset> = assets.iter().map(Asset::rounded).collect();
        Self {
            year_month,
            total_amount: sum2(assets.iter().map(|a| a.amount)),
            income: round2(income),
            assets,
        }
    }

    /// Live sum of the asset amounts (the profit calculator never trusts
    /// the cached total).
    #[must_use]
    pub fn asset_sum(&self) -> f64 {
        self.assets.iter().map(|a| a.amount).sum()
    }

    /// Recompute the cached total from the asset list.
    pub fn recompute_total(&mut self) {
        self.total_amount = sum2(self.assets.iter().map(|a| a.amount));
    }

    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.assets.iter().any(|a| a.code == code)
    }

    /// Encode into the stored form.
    pub fn encode(&self) -> Result<MonthlyRecord, CoreError> {
        let assets = serde_json::to_string(&self.assets).map_err(|e| {
            CoreError::Serialization(format!(
                "Failed to encode asset list of {}: {e}",
                self.year_month
            ))
        })?;
        Ok(MonthlyRecord {
            year_month: self.year_month,
            total_amount: self.total_amount,
            income: self.income,
            assets,
        })
    }
}

/// One month of the trailing-year series used for charts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthSummary {
    pub year_month: YearMonth,
    pub total_amount: f64,
    pub income: f64,
    pub assets: Vec<Asset>,
    /// `false` when the month has no stored snapshot and is shown as empty
    pub recorded: bool,
}
