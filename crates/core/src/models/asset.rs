use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::money::round2;

/// Prefix of every generated or migrated asset code.
pub const ASSET_CODE_PREFIX: &str = "ASSET_";

/// A tracked holding (bank account, fund, brokerage position, ...).
///
/// The same shape is used for the canonical asset table and for the
/// value-at-time copies frozen inside each monthly snapshot. A snapshot
/// copy is never a reference into the table: editing one month never
/// changes another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    /// Stable identity, unique across the table, immutable once assigned.
    pub code: String,

    /// Display label
    pub name: String,

    /// Monetary value, 2-decimal semantics
    #[serde(default)]
    pub amount: f64,

    /// Intended share of the whole portfolio, 0–100. Ratios across assets
    /// are not required to sum to 100.
    #[serde(default)]
    pub target_ratio: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Asset {
    /// Create a table record stamped with `now`.
    pub fn new(input: &AssetInput, now: DateTime<Utc>) -> Self {
        Self {
            code: input.code.clone(),
            name: input.name.clone(),
            amount: round2(input.amount),
            target_ratio: input.target_ratio,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    /// The same asset with its amount set to zero (carry-forward into a
    /// month that holds nothing yet).
    #[must_use]
    pub fn zeroed(&self) -> Self {
        Self {
            amount: 0.0,
            ..self.clone()
        }
    }

    /// The same asset with its amount normalized to 2 decimals.
    #[must_use]
    pub fn rounded(&self) -> Self {
        Self {
            amount: round2(self.amount),
            ..self.clone()
        }
    }
}

/// What a collaborator submits when entering or editing an asset for a month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetInput {
    pub code: String,
    pub name: String,
    pub amount: f64,
    pub target_ratio: f64,
}

impl AssetInput {
    /// Input for a brand-new asset; a fresh code is generated.
    pub fn new(name: impl Into<String>, amount: f64, target_ratio: f64) -> Self {
        Self {
            code: generate_code(),
            name: name.into(),
            amount,
            target_ratio,
        }
    }

    /// Input for an asset whose code is already known.
    pub fn with_code(
        code: impl Into<String>,
        name: impl Into<String>,
        amount: f64,
        target_ratio: f64,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            amount,
            target_ratio,
        }
    }

    /// Reject inputs that would corrupt a snapshot.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.code.trim().is_empty() {
            return Err(CoreError::ValidationError("Asset code must not be empty".into()));
        }
        if self.name.trim().is_empty() {
            return Err(CoreError::ValidationError(format!(
                "Asset '{}' must have a name",
                self.code
            )));
        }
        if !self.amount.is_finite() {
            return Err(CoreError::ValidationError(format!(
                "Amount for '{}' must be a finite number",
                self.code
            )));
        }
        if !self.target_ratio.is_finite() || !(0.0..=100.0).contains(&self.target_ratio) {
            return Err(CoreError::ValidationError(format!(
                "Target ratio for '{}' must be between 0 and 100, got {}",
                self.code, self.target_ratio
            )));
        }
        Ok(())
    }

    /// Apply this input on top of an existing entry: creation time is
    /// kept, `updatedAt` becomes `now`.
    #[must_use]
    pub fn apply_to(&self, existing: Option<&Asset>, now: DateTime<Utc>) -> Asset {
        Asset {
            code: self.code.clone(),
            name: self.name.clone(),
            amount: round2(self.amount),
            target_ratio: self.target_ratio,
            created_at: existing.and_then(|a| a.created_at).or(Some(now)),
            updated_at: Some(now),
        }
    }
}

/// Generate a fresh, unique asset code.
#[must_use]
pub fn generate_code() -> String {
    format!("{ASSET_CODE_PREFIX}{}", uuid::Uuid::new_v4().simple())
}

/// The code an asset keyed by a legacy numeric id is re-keyed to.
#[must_use]
pub fn legacy_code(id: u64) -> String {
    format!("{ASSET_CODE_PREFIX}{id}")
}

/// One row of the current month's asset list, enriched with the deviation
/// from its target allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetView {
    #[serde(flatten)]
    pub asset: Asset,

    /// `total * targetRatio / 100`, rounded
    pub target_amount: f64,

    /// `amount - targetAmount`, rounded
    pub difference: f64,
}
