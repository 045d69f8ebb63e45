pub mod clock;
pub mod config;
pub mod errors;
pub mod models;
pub mod money;
pub mod services;
pub mod storage;

use std::collections::BTreeMap;

use clock::Clock;
use config::LedgerConfig;
use errors::CoreError;
use models::{
    asset::{Asset, AssetInput, AssetView},
    backup::BackupDocument,
    profit::{Profit, TrendPoint},
    snapshot::{MonthSummary, MonthlyRecord, MonthlySnapshot},
    year_month::YearMonth,
};
use money::{round2, sum2};
use services::{
    backup_service::{BackupService, PendingImport},
    profit_service::ProfitService,
    snapshot_service::{CarryForward, SnapshotService},
};
use storage::backend::StorageBackend;
use storage::store::Store;

/// Main entry point for the asset ledger core library.
///
/// Holds the in-memory ledger state (the month being viewed, its assets and
/// income, every stored snapshot and the asset table) on top of a
/// [`Store`]. The in-memory state is a cache of the store: it is rebuilt
/// wholesale by [`Ledger::initialize`] and only changes after the store has
/// durably accepted the corresponding write.
#[must_use]
pub struct Ledger {
    store: Store,
    clock: Box<dyn Clock>,
    snapshot_service: SnapshotService,
    profit_service: ProfitService,
    backup_service: BackupService,
    max_import_bytes: usize,

    asset_table: BTreeMap<String, Asset>,
    snapshots: BTreeMap<YearMonth, MonthlySnapshot>,
    current_year_month: YearMonth,
    assets: Vec<Asset>,
    income: f64,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("store", &self.store)
            .field("current_year_month", &self.current_year_month)
            .field("assets", &self.assets.len())
            .field("income", &self.income)
            .field("months", &self.snapshots.len())
            .finish()
    }
}

impl Ledger {
    /// Open (or create) the encrypted ledger file described by `config`,
    /// upgrading its schema if needed, and initialize from it.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn open(config: &LedgerConfig, passphrase: &str) -> Result<Self, CoreError> {
        let backend = storage::file_backend::FileBackend::open(&config.path, passphrase, config.kdf_params)?;
        let mut ledger = Self::with_backend(backend, clock::SystemClock)?;
        ledger.max_import_bytes = config.max_import_bytes;
        Ok(ledger)
    }

    /// Open a ledger over any backend with an explicit clock.
    pub fn with_backend(
        backend: impl StorageBackend + 'static,
        clock: impl Clock + 'static,
    ) -> Result<Self, CoreError> {
        let store = Store::open(Box::new(backend))?;
        let current_year_month = clock.current_month();
        let mut ledger = Self {
            store,
            clock: Box::new(clock),
            snapshot_service: SnapshotService::new(),
            profit_service: ProfitService::new(),
            backup_service: BackupService::new(),
            max_import_bytes: config::DEFAULT_MAX_IMPORT_BYTES,
            asset_table: BTreeMap::new(),
            snapshots: BTreeMap::new(),
            current_year_month,
            assets: Vec::new(),
            income: 0.0,
        };
        ledger.initialize()?;
        Ok(ledger)
    }

    /// Rebuild the in-memory state from the store and jump to the current
    /// real month.
    ///
    /// If the current month has a snapshot, its assets and income are
    /// adopted. Otherwise the latest valid month's assets are shown at zero;
    /// nothing is persisted until the month is touched.
    pub fn initialize(&mut self) -> Result<(), CoreError> {
        let asset_table: BTreeMap<String, Asset> = self
            .store
            .to_array::<Asset>()?
            .into_iter()
            .map(|a| (a.code.clone(), a))
            .collect();

        let mut snapshots = BTreeMap::new();
        for record in self.store.to_array::<MonthlyRecord>()? {
            let snapshot = record.decode()?;
            snapshots.insert(snapshot.year_month, snapshot);
        }

        let now = self.clock.current_month();
        let (assets, income) = match snapshots.get(&now) {
            Some(current) => (current.assets.clone(), current.income),
            None => (
                self.snapshot_service
                    .carry_forward(&snapshots, &asset_table, now, CarryForward::Zeroed),
                0.0,
            ),
        };

        log::info!(
            "Ledger initialized at {now}: {} assets in table, {} months recorded",
            asset_table.len(),
            snapshots.len()
        );

        self.asset_table = asset_table;
        self.snapshots = snapshots;
        self.current_year_month = now;
        self.assets = assets;
        self.income = income;
        Ok(())
    }

    // ── Month navigation & editing ──────────────────────────────────

    /// Switch the active month. A month seen for the first time is carried
    /// forward and stored right away.
    pub fn set_current_year_month(&mut self, year_month: YearMonth) -> Result<(), CoreError> {
        let now = self.clock.current_month();
        self.snapshot_service.ensure_not_future(year_month, now)?;

        if let Some(existing) = self.snapshots.get(&year_month) {
            self.current_year_month = year_month;
            self.assets = existing.assets.clone();
            self.income = existing.income;
            return Ok(());
        }

        let mode = self.snapshot_service.mode_for(year_month, now);
        let snapshot =
            self.snapshot_service
                .resolve_month(&self.snapshots, &self.asset_table, year_month, now, mode);
        self.store.put(&snapshot.encode()?)?;
        log::debug!("Created snapshot for {year_month} with {} assets", snapshot.assets.len());

        self.current_year_month = year_month;
        self.assets = snapshot.assets.clone();
        self.income = snapshot.income;
        self.snapshots.insert(year_month, snapshot);
        Ok(())
    }

    /// Set an asset's value for a month (insert or replace by code).
    ///
    /// The asset-table record of the same code follows the edit: name and
    /// target ratio always, amount when `year_month` is the latest recorded
    /// month.
    pub fn update_monthly_asset(&mut self, year_month: YearMonth, input: AssetInput) -> Result<(), CoreError> {
        input.validate()?;
        self.edit_month_asset(year_month, &input, None)
    }

    /// Register a brand-new asset and record its value for `year_month`,
    /// in a single commit.
    pub fn add_asset(&mut self, year_month: YearMonth, input: AssetInput) -> Result<Asset, CoreError> {
        input.validate()?;
        if self.asset_table.contains_key(&input.code) {
            return Err(CoreError::ValidationError(format!(
                "Asset code '{}' already exists",
                input.code
            )));
        }
        let asset = Asset::new(&input, self.clock.now());
        self.edit_month_asset(year_month, &input, Some(asset.clone()))?;
        log::info!("Added asset {} ('{}')", asset.code, asset.name);
        Ok(asset)
    }

    /// Record the income of a month, leaving its assets untouched.
    pub fn update_monthly_income(&mut self, year_month: YearMonth, income: f64) -> Result<(), CoreError> {
        if !income.is_finite() {
            return Err(CoreError::ValidationError(format!(
                "Income for {year_month} must be a finite number"
            )));
        }
        let now = self.clock.current_month();
        self.snapshot_service.ensure_not_future(year_month, now)?;

        let mut snapshot = self.snapshot_service.resolve_month(
            &self.snapshots,
            &self.asset_table,
            year_month,
            now,
            CarryForward::Zeroed,
        );
        snapshot.income = round2(income);
        self.store.put(&snapshot.encode()?)?;
        log::debug!("Income of {year_month} set to {}", snapshot.income);

        if year_month == self.current_year_month {
            self.income = snapshot.income;
        }
        self.snapshots.insert(year_month, snapshot);
        Ok(())
    }

    /// Delete an asset from the table and from every stored month.
    ///
    /// Each month that listed the asset has its total recomputed, so every
    /// stored total keeps matching its asset list. The caller is responsible
    /// for having obtained the user's confirmation.
    pub fn delete_asset(&mut self, code: &str) -> Result<(), CoreError> {
        let in_table = self.asset_table.contains_key(code);

        let mut touched: Vec<MonthlySnapshot> = Vec::new();
        for snapshot in self.snapshots.values() {
            let mut updated = snapshot.clone();
            if self.snapshot_service.strip_asset(&mut updated, code) {
                touched.push(updated);
            }
        }

        if !in_table && touched.is_empty() {
            return Err(CoreError::AssetNotFound(code.to_string()));
        }

        let records = touched
            .iter()
            .map(MonthlySnapshot::encode)
            .collect::<Result<Vec<_>, _>>()?;
        self.store.write(|tx| {
            tx.delete::<Asset>(code);
            tx.bulk_put(&records)
        })?;

        log::info!("Deleted asset {code} from the table and {} months", touched.len());

        self.asset_table.remove(code);
        for snapshot in touched {
            self.snapshots.insert(snapshot.year_month, snapshot);
        }
        self.assets.retain(|a| a.code != code);
        Ok(())
    }

    // ── Import / Export ─────────────────────────────────────────────

    /// The full store as a backup document, stamped with the export time.
    pub fn export_document(&self) -> Result<BackupDocument, CoreError> {
        let assets = self.store.to_array::<Asset>()?;
        let months = self.store.to_array::<MonthlyRecord>()?;
        Ok(self.backup_service.export(assets, months, self.clock.now()))
    }

    /// The full store as pretty-printed JSON.
    pub fn export_to_json(&self) -> Result<String, CoreError> {
        let document = self.export_document()?;
        let json = self.backup_service.to_json(&document)?;
        log::info!(
            "Exported {} assets and {} months",
            document.assets.len(),
            document.monthly_data.len()
        );
        Ok(json)
    }

    /// Suggested file name for a backup taken today.
    #[must_use]
    pub fn export_file_name(&self) -> String {
        self.backup_service.file_name(self.clock.today())
    }

    /// Validate a backup document. Nothing is changed until the returned
    /// import is applied, which should happen only after the user has
    /// confirmed the overwrite.
    pub fn prepare_import(&self, json: &str) -> Result<PendingImport, CoreError> {
        self.backup_service.check_size(json.len(), self.max_import_bytes)?;
        self.backup_service.parse(json)
    }

    /// Replace the whole store with a validated backup and re-initialize.
    ///
    /// Clearing and loading both tables happen in one commit: either the
    /// backup is fully in place or the previous data is untouched.
    pub fn apply_import(&mut self, pending: PendingImport) -> Result<(), CoreError> {
        let PendingImport { assets, months } = pending;
        self.store.write(|tx| {
            tx.clear::<Asset>();
            tx.clear::<MonthlyRecord>();
            tx.bulk_add(&assets)?;
            tx.bulk_add(&months)
        })?;
        log::info!("Imported {} assets and {} months", assets.len(), months.len());
        self.initialize()
    }

    // ── Read surface ────────────────────────────────────────────────

    #[must_use]
    pub fn current_year_month(&self) -> YearMonth {
        self.current_year_month
    }

    /// Assets of the active month.
    #[must_use]
    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    /// Income of the active month.
    #[must_use]
    pub fn income(&self) -> f64 {
        self.income
    }

    /// Total of the active month.
    #[must_use]
    pub fn total_amount(&self) -> f64 {
        sum2(self.assets.iter().map(|a| a.amount))
    }

    /// Total of the most recent stored month.
    #[must_use]
    pub fn latest_total_amount(&self) -> f64 {
        self.snapshots
            .values()
            .next_back()
            .map_or(0.0, |s| sum2(s.assets.iter().map(|a| a.amount)))
    }

    /// Active month's assets with their target amount and deviation.
    #[must_use]
    pub fn asset_list(&self) -> Vec<AssetView> {
        let total: f64 = self.assets.iter().map(|a| a.amount).sum();
        self.assets
            .iter()
            .map(|asset| {
                let target_amount = round2(total * asset.target_ratio / 100.0);
                AssetView {
                    asset: asset.rounded(),
                    target_amount,
                    difference: round2(asset.amount - target_amount),
                }
            })
            .collect()
    }

    #[must_use]
    pub fn snapshot(&self, year_month: YearMonth) -> Option<&MonthlySnapshot> {
        self.snapshots.get(&year_month)
    }

    /// Every stored month, oldest first.
    pub fn snapshots(&self) -> impl Iterator<Item = &MonthlySnapshot> {
        self.snapshots.values()
    }

    /// The canonical asset table, ordered by code.
    pub fn asset_table(&self) -> impl Iterator<Item = &Asset> {
        self.asset_table.values()
    }

    /// The most recent stored month not after the current real month.
    #[must_use]
    pub fn latest_valid_month(&self) -> Option<YearMonth> {
        self.snapshot_service
            .latest_valid(&self.snapshots, self.clock.current_month())
            .map(|s| s.year_month)
    }

    /// The 12 months ending at the current real month, oldest first.
    #[must_use]
    pub fn recent_year_data(&self) -> Vec<MonthSummary> {
        self.snapshot_service
            .recent_year(&self.snapshots, &self.assets, self.clock.current_month())
    }

    // ── Profit ──────────────────────────────────────────────────────

    #[must_use]
    pub fn monthly_profit(&self, year_month: YearMonth) -> Profit {
        self.profit_service.monthly_profit(&self.snapshots, year_month)
    }

    /// Profit of the active month.
    #[must_use]
    pub fn current_month_profit(&self) -> Profit {
        self.monthly_profit(self.current_year_month)
    }

    #[must_use]
    pub fn yearly_profit(&self) -> Profit {
        self.profit_service
            .yearly_profit(&self.snapshots, self.clock.current_month())
    }

    #[must_use]
    pub fn monthly_profit_trend(&self) -> Vec<TrendPoint> {
        self.profit_service
            .monthly_profit_trend(&self.snapshots, self.clock.current_month())
    }

    /// Label of the trailing-year window, e.g. `2023.06-2024.05`.
    #[must_use]
    pub fn profit_date_range(&self) -> String {
        self.profit_service
            .date_range_label(self.clock.current_month())
    }

    // ── Store inspection ────────────────────────────────────────────

    /// Schema version of the underlying store.
    #[must_use]
    pub fn schema_version(&self) -> u32 {
        self.store.version()
    }

    // ── Internal ────────────────────────────────────────────────────

    /// Shared path of `update_monthly_asset` and `add_asset`.
    /// `new_record` is the asset-table row to insert, if any.
    fn edit_month_asset(
        &mut self,
        year_month: YearMonth,
        input: &AssetInput,
        new_record: Option<Asset>,
    ) -> Result<(), CoreError> {
        let now = self.clock.current_month();
        self.snapshot_service.ensure_not_future(year_month, now)?;

        let mode = self.snapshot_service.mode_for(year_month, now);
        let mut snapshot =
            self.snapshot_service
                .resolve_month(&self.snapshots, &self.asset_table, year_month, now, mode);

        let timestamp = self.clock.now();
        let entry = {
            let previous = snapshot
                .assets
                .iter()
                .find(|a| a.code == input.code)
                .or(new_record.as_ref())
                .or_else(|| self.asset_table.get(&input.code));
            input.apply_to(previous, timestamp)
        };
        self.snapshot_service.upsert_asset(&mut snapshot, entry.clone());

        let is_latest = self
            .snapshots
            .keys()
            .next_back()
            .map_or(true, |latest| year_month >= *latest);
        let table_record = match new_record {
            Some(record) => Some(record),
            None => self.asset_table.get(&input.code).map(|existing| Asset {
                name: entry.name.clone(),
                target_ratio: entry.target_ratio,
                amount: if is_latest { entry.amount } else { existing.amount },
                updated_at: Some(timestamp),
                ..existing.clone()
            }),
        };

        let record = snapshot.encode()?;
        self.store.write(|tx| {
            tx.put(&record)?;
            if let Some(asset) = &table_record {
                tx.put(asset)?;
            }
            Ok(())
        })?;
        log::debug!(
            "Recorded {} = {} for {year_month} (total {})",
            entry.code,
            entry.amount,
            snapshot.total_amount
        );

        if let Some(asset) = table_record {
            self.asset_table.insert(asset.code.clone(), asset);
        }
        if year_month == self.current_year_month {
            self.assets = snapshot.assets.clone();
        }
        self.snapshots.insert(year_month, snapshot);
        Ok(())
    }
}
