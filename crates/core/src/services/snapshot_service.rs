use std::collections::BTreeMap;

use crate::errors::CoreError;
use crate::models::asset::Asset;
use crate::models::snapshot::{MonthSummary, MonthlySnapshot};
use crate::models::year_month::YearMonth;
use crate::money::sum2;

/// How amounts are carried into a month that has no snapshot yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarryForward {
    /// Same values as the latest valid month (the real current month).
    KeepAmounts,
    /// Same assets, every amount zero (a past month that was never recorded).
    Zeroed,
}

/// Month-resolution rules of the ledger: which snapshot a month starts
/// from, how assets are carried forward, and how an edit lands in a list.
///
/// Pure business logic, no I/O. The ledger persists whatever this returns.
pub struct SnapshotService;

impl SnapshotService {
    pub fn new() -> Self {
        Self
    }

    /// Reject any mutation of a month that hasn't started yet.
    pub fn ensure_not_future(&self, target: YearMonth, now: YearMonth) -> Result<(), CoreError> {
        if target > now {
            log::warn!("Rejected change to future month {target} (current month is {now})");
            return Err(CoreError::FutureMonth {
                requested: target.to_string(),
                current: now.to_string(),
            });
        }
        Ok(())
    }

    /// The most recent stored snapshot not after `now`.
    pub fn latest_valid<'a>(
        &self,
        snapshots: &'a BTreeMap<YearMonth, MonthlySnapshot>,
        now: YearMonth,
    ) -> Option<&'a MonthlySnapshot> {
        snapshots.range(..=now).next_back().map(|(_, s)| s)
    }

    /// Asset list for a month being started from scratch: the latest valid
    /// month's assets, or the asset table when no month was ever recorded.
    /// The asset table never contributes amounts.
    pub fn carry_forward(
        &self,
        snapshots: &BTreeMap<YearMonth, MonthlySnapshot>,
        asset_table: &BTreeMap<String, Asset>,
        now: YearMonth,
        mode: CarryForward,
    ) -> Vec<Asset> {
        match self.latest_valid(snapshots, now) {
            Some(latest) => latest
                .assets
                .iter()
                .map(|a| match mode {
                    CarryForward::KeepAmounts => a.rounded(),
                    CarryForward::Zeroed => a.zeroed(),
                })
                .collect(),
            None => asset_table.values().map(Asset::zeroed).collect(),
        }
    }

    /// Carry-forward mode for a month with no snapshot.
    #[must_use]
    pub fn mode_for(&self, target: YearMonth, now: YearMonth) -> CarryForward {
        if target == now {
            CarryForward::KeepAmounts
        } else {
            CarryForward::Zeroed
        }
    }

    /// The working snapshot of `target`: a copy of the stored one, or a new
    /// one carried forward (with income 0).
    pub fn resolve_month(
        &self,
        snapshots: &BTreeMap<YearMonth, MonthlySnapshot>,
        asset_table: &BTreeMap<String, Asset>,
        target: YearMonth,
        now: YearMonth,
        mode: CarryForward,
    ) -> MonthlySnapshot {
        match snapshots.get(&target) {
            Some(existing) => existing.clone(),
            None => {
                let assets = self.carry_forward(snapshots, asset_table, now, mode);
                MonthlySnapshot::new(target, 0.0, assets)
            }
        }
    }

    /// Replace the entry with the same code, or append; then recompute the
    /// total.
    pub fn upsert_asset(&self, snapshot: &mut MonthlySnapshot, asset: Asset) {
        match snapshot.assets.iter_mut().find(|a| a.code == asset.code) {
            Some(slot) => *slot = asset,
            None => snapshot.assets.push(asset),
        }
        snapshot.recompute_total();
    }

    /// Remove every entry with `code`, recomputing the total. Returns
    /// whether anything was removed.
    pub fn strip_asset(&self, snapshot: &mut MonthlySnapshot, code: &str) -> bool {
        let before = snapshot.assets.len();
        snapshot.assets.retain(|a| a.code != code);
        let removed = snapshot.assets.len() != before;
        if removed {
            snapshot.recompute_total();
        }
        removed
    }

    /// The 12 months ending at `now`, oldest first. Months without a
    /// snapshot appear empty, listing `active_assets` at zero.
    pub fn recent_year(
        &self,
        snapshots: &BTreeMap<YearMonth, MonthlySnapshot>,
        active_assets: &[Asset],
        now: YearMonth,
    ) -> Vec<MonthSummary> {
        (0..12)
            .rev()
            .map(|back| {
                let year_month = now.months_back(back);
                match snapshots.get(&year_month) {
                    Some(s) => {
                        let assets: Vec<Asset> = s.assets.iter().map(Asset::rounded).collect();
                        MonthSummary {
                            year_month,
                            total_amount: sum2(assets.iter().map(|a| a.amount)),
                            income: s.income,
                            assets,
                            recorded: true,
                        }
                    }
                    None => MonthSummary {
                        year_month,
                        total_amount: 0.0,
                        income: 0.0,
                        assets: active_assets.iter().map(Asset::zeroed).collect(),
                        recorded: false,
                    },
                }
            })
            .collect()
    }
}

impl Default for SnapshotService {
    fn default() -> Self {
        Self::new()
    }
}
