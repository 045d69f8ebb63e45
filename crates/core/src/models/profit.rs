use serde::{Deserialize, Serialize};

use super::year_month::YearMonth;

/// Profit over a period: change in holdings net of new income.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profit {
    /// Absolute profit in the ledger's currency, rounded to 2 decimals
    pub profit_amount: f64,

    /// Profit as a percentage of the period's starting total, rounded to 2 decimals
    pub profit_rate: f64,
}

impl Profit {
    /// The defined result for months with no measurable return.
    pub const ZERO: Profit = Profit {
        profit_amount: 0.0,
        profit_rate: 0.0,
    };
}

/// One point of the monthly profit trend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub year_month: YearMonth,
    pub profit_amount: f64,
}
