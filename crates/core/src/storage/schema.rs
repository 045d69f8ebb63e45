//! Record shapes of every schema version the store has ever written.
//!
//! Each shape names the fields its migration step needs and keeps
//! everything else in a flattened remainder map, so a transition rewrites
//! exactly what it has to and carries every other field through untouched.
//! The current version (v3) is the crate's own model types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::asset::legacy_code;

/// Schema v1: assets keyed by an auto-incrementing numeric id.
pub mod v1 {
    use super::*;

    pub const ASSETS_TABLE: &str = "assets";
    pub const MONTHLY_TABLE: &str = "monthlyData";

    /// An asset, both as a table row and as an entry of a month's list.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Asset {
        pub id: u64,
        #[serde(flatten)]
        pub rest: Map<String, Value>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct MonthlyRecord {
        #[serde(rename = "yearMonth")]
        pub year_month: String,
        /// Embedded JSON list of [`Asset`]
        pub assets: String,
        #[serde(flatten)]
        pub rest: Map<String, Value>,
    }

    impl Asset {
        pub fn into_v2(self) -> v2::Asset {
            let mut rest = self.rest;
            rest.remove("code");
            v2::Asset {
                id: self.id,
                code: legacy_code(self.id),
                rest,
            }
        }
    }

    impl MonthlyRecord {
        /// Re-key every embedded asset with its derived code.
        pub fn into_v2(self) -> Result<v2::MonthlyRecord, String> {
            let embedded: Vec<Asset> = serde_json::from_str(&self.assets).map_err(|e| {
                format!("monthlyData '{}' has an unreadable asset list: {e}", self.year_month)
            })?;
            let assets: Vec<v2::Asset> = embedded.into_iter().map(Asset::into_v2).collect();
            let assets = serde_json::to_string(&assets)
                .map_err(|e| format!("monthlyData '{}': failed to re-encode assets: {e}", self.year_month))?;
            Ok(v2::MonthlyRecord {
                year_month: self.year_month,
                assets,
                rest: self.rest,
            })
        }
    }
}

/// Schema v2: the holding area between v1 and v3. Same records as v1 plus
/// a derived `code`, parked in temporary tables.
pub mod v2 {
    use super::*;

    pub const ASSETS_TABLE: &str = "_migration_assets";
    pub const MONTHLY_TABLE: &str = "_migration_monthlyData";

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Asset {
        pub id: u64,
        pub code: String,
        #[serde(flatten)]
        pub rest: Map<String, Value>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct MonthlyRecord {
        #[serde(rename = "yearMonth")]
        pub year_month: String,
        /// Embedded JSON list of [`Asset`]
        pub assets: String,
        #[serde(flatten)]
        pub rest: Map<String, Value>,
    }
}
