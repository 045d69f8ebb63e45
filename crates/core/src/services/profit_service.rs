use std::collections::BTreeMap;

use crate::models::profit::{Profit, TrendPoint};
use crate::models::snapshot::MonthlySnapshot;
use crate::models::year_month::YearMonth;
use crate::money::round2;

/// Months in the trailing-year window.
pub const YEAR_WINDOW: usize = 12;

/// Derives profit figures from the snapshot sequence.
///
/// Profit is the change in total holdings minus the income added over the
/// period. Pure functions: every missing, sparse or zero-basis case resolves
/// to [`Profit::ZERO`] instead of failing. Totals are always summed from the
/// asset lists, never read from the cached `totalAmount`.
pub struct ProfitService;

impl ProfitService {
    pub fn new() -> Self {
        Self
    }

    /// Profit of `year_month` against the preceding calendar month.
    pub fn monthly_profit(
        &self,
        snapshots: &BTreeMap<YearMonth, MonthlySnapshot>,
        year_month: YearMonth,
    ) -> Profit {
        let previous = year_month.checked_pred().and_then(|ym| snapshots.get(&ym));
        match (snapshots.get(&year_month), previous) {
            (Some(current), Some(previous)) => month_over_month(current, previous),
            _ => Profit::ZERO,
        }
    }

    /// Profit across the latest 12 months at or before `now`.
    ///
    /// The base is the oldest month of the window with a nonzero total
    /// (negative holdings such as a tracked debt count); income is summed
    /// from the base month through the latest month.
    pub fn yearly_profit(
        &self,
        snapshots: &BTreeMap<YearMonth, MonthlySnapshot>,
        now: YearMonth,
    ) -> Profit {
        // Newest first
        let window: Vec<&MonthlySnapshot> = snapshots
            .range(..=now)
            .rev()
            .take(YEAR_WINDOW)
            .map(|(_, s)| s)
            .collect();

        if window.len() < 2 {
            return Profit::ZERO;
        }

        let Some(base_idx) = window.iter().rposition(|s| round2(s.asset_sum()) != 0.0) else {
            return Profit::ZERO;
        };

        let latest_total = window[0].asset_sum();
        let base_total = window[base_idx].asset_sum();
        let total_income: f64 = window[..=base_idx].iter().map(|s| s.income).sum();

        let profit_amount = round2(latest_total - base_total - total_income);
        Profit {
            profit_amount,
            profit_rate: round2(profit_amount / base_total * 100.0),
        }
    }

    /// Month-over-month profit for up to the 12 latest months at or before
    /// `now`, oldest first.
    ///
    /// Pairs consecutive stored months; a pair whose older month is not the
    /// preceding calendar month counts as a missing neighbor and yields 0.
    pub fn monthly_profit_trend(
        &self,
        snapshots: &BTreeMap<YearMonth, MonthlySnapshot>,
        now: YearMonth,
    ) -> Vec<TrendPoint> {
        let window: Vec<&MonthlySnapshot> = snapshots
            .range(..=now)
            .rev()
            .take(YEAR_WINDOW + 1)
            .map(|(_, s)| s)
            .collect();

        let mut points: Vec<TrendPoint> = window
            .windows(2)
            .map(|pair| {
                let (current, previous) = (pair[0], pair[1]);
                let profit_amount = if current.year_month.checked_pred() == Some(previous.year_month) {
                    month_over_month(current, previous).profit_amount
                } else {
                    0.0
                };
                TrendPoint {
                    year_month: current.year_month,
                    profit_amount,
                }
            })
            .collect();

        points.reverse();
        points
    }

    /// `YYYY.MM-YYYY.MM` label of the trailing-year window ending at `now`.
    #[must_use]
    pub fn date_range_label(&self, now: YearMonth) -> String {
        let start = now.months_back((YEAR_WINDOW - 1) as u32);
        format!("{}-{}", start.dotted(), now.dotted())
    }
}

impl Default for ProfitService {
    fn default() -> Self {
        Self::new()
    }
}

fn month_over_month(current: &MonthlySnapshot, previous: &MonthlySnapshot) -> Profit {
    let previous_total = previous.asset_sum();
    // A zero basis has no measurable return.
    if round2(previous_total) == 0.0 {
        return Profit::ZERO;
    }
    let profit_amount = round2(current.asset_sum() - previous_total - current.income);
    Profit {
        profit_amount,
        profit_rate: round2(profit_amount / previous_total * 100.0),
    }
}
