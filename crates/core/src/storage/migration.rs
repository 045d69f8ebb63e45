use serde::de::DeserializeOwned;
use serde::Serialize;

use super::database::{Database, ASSETS_TABLE, MONTHLY_TABLE};
use super::schema::{v1, v2};
use crate::errors::CoreError;
use crate::models::asset::Asset;
use crate::models::snapshot::MonthlyRecord;
use crate::models::year_month::YearMonth;

/// Schema version written by this build.
pub const SCHEMA_VERSION: u32 = 3;

/// One transition `v → v + 1`. Pure: the input database is consumed and
/// the upgraded one returned; no I/O.
type Step = fn(Database) -> Result<Database, String>;

/// Every transition, in order. Index `i` upgrades from version `i + 1`.
const STEPS: [Step; 2] = [v1_to_v2, v2_to_v3];

/// Whether `db` is behind the running schema. A version this build doesn't
/// know is an error, not a no-op.
pub fn needs_upgrade(db: &Database) -> Result<bool, CoreError> {
    match db.version {
        0 => Err(CoreError::MigrationFailed {
            from: 0,
            to: 1,
            reason: "stored schema version 0 is not a valid version".into(),
        }),
        v if v > SCHEMA_VERSION => Err(CoreError::UnsupportedVersion(v)),
        v => Ok(v < SCHEMA_VERSION),
    }
}

/// Apply exactly one transition from `db.version` to `db.version + 1`.
pub fn step(db: Database) -> Result<Database, CoreError> {
    if !needs_upgrade(&db)? {
        return Ok(db);
    }
    let from = db.version;
    let to = from + 1;
    let transition = STEPS[(from - 1) as usize];

    match transition(db) {
        Ok(mut upgraded) => {
            upgraded.version = to;
            log::info!(
                "Migrated schema v{from} → v{to} ({} tables)",
                upgraded.table_names().len()
            );
            Ok(upgraded)
        }
        Err(reason) => {
            log::error!("Schema migration v{from} → v{to} failed: {reason}");
            Err(CoreError::MigrationFailed { from, to, reason })
        }
    }
}

/// Apply every pending transition in memory. A database already at
/// [`SCHEMA_VERSION`] comes back unchanged.
pub fn upgrade(mut db: Database) -> Result<Database, CoreError> {
    while needs_upgrade(&db)? {
        db = step(db)?;
    }
    Ok(db)
}

// ── Transitions ─────────────────────────────────────────────────────

/// Derive `ASSET_<id>` codes for every asset and every embedded snapshot
/// entry, parking the results in the holding tables.
fn v1_to_v2(mut db: Database) -> Result<Database, String> {
    let assets: Vec<v1::Asset> = read_table(&db, v1::ASSETS_TABLE)?;
    let months: Vec<v1::MonthlyRecord> = read_table(&db, v1::MONTHLY_TABLE)?;

    db.drop_table(v2::ASSETS_TABLE);
    db.drop_table(v2::MONTHLY_TABLE);
    db.create_table(v2::ASSETS_TABLE);
    db.create_table(v2::MONTHLY_TABLE);

    let asset_count = assets.len();
    for asset in assets {
        let asset = asset.into_v2();
        insert_new(&mut db, v2::ASSETS_TABLE, asset.code.clone(), &asset)?;
    }

    let month_count = months.len();
    for month in months {
        let month = month.into_v2()?;
        insert_new(&mut db, v2::MONTHLY_TABLE, month.year_month.clone(), &month)?;
    }

    db.drop_table(v1::ASSETS_TABLE);
    db.drop_table(v1::MONTHLY_TABLE);

    log::debug!("v1 → v2: re-keyed {asset_count} assets across {month_count} months");
    Ok(db)
}

/// Move the holding tables into the final `code`/`yearMonth`-keyed tables.
///
/// Every record is rewritten in the current model's shape: the legacy `id`
/// and any field the model does not define are dropped here, so the
/// stored documents equal what any later write would produce.
fn v2_to_v3(mut db: Database) -> Result<Database, String> {
    let assets: Vec<(String, String)> = raw_rows(&db, v2::ASSETS_TABLE);
    let months: Vec<(String, String)> = raw_rows(&db, v2::MONTHLY_TABLE);

    db.create_table(ASSETS_TABLE);
    db.create_table(MONTHLY_TABLE);

    for (key, document) in &assets {
        let _: v2::Asset = parse(v2::ASSETS_TABLE, key, document)?;
        let asset: Asset = parse(ASSETS_TABLE, key, document)?;
        if db.get_raw(ASSETS_TABLE, &asset.code).is_some() {
            return Err(format!("duplicate asset code '{}'", asset.code));
        }
        db.put(&asset)
            .map_err(|e| format!("asset '{}': {e}", asset.code))?;
    }

    for (key, document) in &months {
        let held: v2::MonthlyRecord = parse(v2::MONTHLY_TABLE, key, document)?;
        held.year_month
            .parse::<YearMonth>()
            .map_err(|_| format!("monthlyData has an invalid yearMonth '{}'", held.year_month))?;
        let record: MonthlyRecord = parse(MONTHLY_TABLE, key, document)?;
        let normalized = record
            .decode()
            .and_then(|snapshot| snapshot.encode())
            .map_err(|e| format!("monthlyData '{}': {e}", held.year_month))?;
        db.put(&normalized)
            .map_err(|e| format!("monthlyData '{}': {e}", held.year_month))?;
    }

    db.drop_table(v2::ASSETS_TABLE);
    db.drop_table(v2::MONTHLY_TABLE);

    log::debug!(
        "v2 → v3: moved {} assets and {} months out of the holding tables",
        assets.len(),
        months.len()
    );
    Ok(db)
}

// ── Helpers ─────────────────────────────────────────────────────────

fn read_table<T: DeserializeOwned>(db: &Database, table: &str) -> Result<Vec<T>, String> {
    db.rows(table)
        .map(|(key, document)| parse(table, key, document))
        .collect()
}

fn raw_rows(db: &Database, table: &str) -> Vec<(String, String)> {
    db.rows(table)
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn parse<T: DeserializeOwned>(table: &str, key: &str, document: &str) -> Result<T, String> {
    serde_json::from_str(document).map_err(|e| format!("unexpected shape of {table} record '{key}': {e}"))
}

fn insert_new<T: Serialize>(db: &mut Database, table: &str, key: String, record: &T) -> Result<(), String> {
    if db.get_raw(table, &key).is_some() {
        return Err(format!("duplicate key '{key}' in {table}"));
    }
    let document =
        serde_json::to_string(record).map_err(|e| format!("failed to encode {table} record '{key}': {e}"))?;
    db.put_raw(table, key, document);
    Ok(())
}
