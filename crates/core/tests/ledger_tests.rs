// ═══════════════════════════════════════════════════════════════════
// Ledger Tests: month navigation, editing, deletion, persistence
// ═══════════════════════════════════════════════════════════════════

use asset_ledger_core::clock::FixedClock;
use asset_ledger_core::config::LedgerConfig;
use asset_ledger_core::errors::CoreError;
use asset_ledger_core::models::asset::AssetInput;
use asset_ledger_core::models::snapshot::MonthlyRecord;
use asset_ledger_core::models::year_month::YearMonth;
use asset_ledger_core::money::sum2;
use asset_ledger_core::storage::backend::MemoryBackend;
use asset_ledger_core::storage::encryption::KdfParams;
use asset_ledger_core::Ledger;

fn ym(s: &str) -> YearMonth {
    s.parse().unwrap()
}

/// A ledger over `backend` whose real-world month is `month`.
fn ledger_at(backend: &MemoryBackend, month: &str) -> Ledger {
    Ledger::with_backend(backend.clone(), FixedClock::in_month(ym(month))).unwrap()
}

fn assert_totals_consistent(ledger: &Ledger) {
    for snapshot in ledger.snapshots() {
        let sum = sum2(snapshot.assets.iter().map(|a| a.amount));
        assert_eq!(snapshot.total_amount, sum, "{}", snapshot.year_month);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Initialization
// ═══════════════════════════════════════════════════════════════════

mod initialize {
    use super::*;

    #[test]
    fn fresh_ledger_is_empty_at_current_month() {
        let backend = MemoryBackend::new();
        let ledger = ledger_at(&backend, "2024-06");
        assert_eq!(ledger.current_year_month(), ym("2024-06"));
        assert!(ledger.assets().is_empty());
        assert_eq!(ledger.income(), 0.0);
        assert_eq!(ledger.total_amount(), 0.0);
        assert_eq!(ledger.snapshots().count(), 0);
        assert_eq!(ledger.schema_version(), 3);
        assert_eq!(backend.write_count(), 1);
    }

    #[test]
    fn adopts_current_month_snapshot() {
        let backend = MemoryBackend::new();
        let mut ledger = ledger_at(&backend, "2024-06");
        ledger
            .add_asset(ym("2024-06"), AssetInput::new("Savings", 1000.0, 100.0))
            .unwrap();
        ledger.update_monthly_income(ym("2024-06"), 25.0).unwrap();

        let reopened = ledger_at(&backend, "2024-06");
        assert_eq!(reopened.assets().len(), 1);
        assert_eq!(reopened.assets()[0].amount, 1000.0);
        assert_eq!(reopened.income(), 25.0);
    }

    #[test]
    fn new_month_shows_previous_assets_at_zero_without_writing() {
        let backend = MemoryBackend::new();
        let mut ledger = ledger_at(&backend, "2024-01");
        ledger
            .add_asset(ym("2024-01"), AssetInput::new("Savings", 1000.0, 100.0))
            .unwrap();
        let writes = backend.write_count();

        let ledger = ledger_at(&backend, "2024-02");
        assert_eq!(ledger.current_year_month(), ym("2024-02"));
        assert_eq!(ledger.assets().len(), 1);
        assert_eq!(ledger.assets()[0].amount, 0.0);
        assert_eq!(ledger.income(), 0.0);
        assert!(ledger.snapshot(ym("2024-02")).is_none());
        assert_eq!(backend.write_count(), writes);
    }

    #[test]
    fn open_file_ledger_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = LedgerConfig::new(dir.path().join("ledger.aldb"))
            .with_kdf_params(KdfParams::INSECURE_FAST);

        let code = {
            let mut ledger = Ledger::open(&config, "secret").unwrap();
            let now = ledger.current_year_month();
            ledger
                .add_asset(now, AssetInput::new("Cash", 42.0, 10.0))
                .unwrap()
                .code
        };

        let ledger = Ledger::open(&config, "secret").unwrap();
        assert!(ledger.asset_table().any(|a| a.code == code));
        assert_eq!(ledger.total_amount(), 42.0);

        assert!(matches!(
            Ledger::open(&config, "wrong"),
            Err(CoreError::Decryption)
        ));
    }

    #[test]
    fn unavailable_medium_is_fatal() {
        let backend = MemoryBackend::new();
        backend.set_unavailable(true);
        let result = Ledger::with_backend(backend, FixedClock::in_month(ym("2024-06")));
        assert!(matches!(result, Err(CoreError::StorageUnavailable(_))));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Future months
// ═══════════════════════════════════════════════════════════════════

mod future_months {
    use super::*;

    #[test]
    fn cannot_navigate_to_future() {
        let backend = MemoryBackend::new();
        let mut ledger = ledger_at(&backend, "2024-06");
        let before = backend.persisted().unwrap();
        let writes = backend.write_count();

        let err = ledger.set_current_year_month(ym("2024-07")).unwrap_err();
        assert!(matches!(err, CoreError::FutureMonth { .. }));
        assert_eq!(ledger.current_year_month(), ym("2024-06"));
        assert!(ledger.snapshot(ym("2024-07")).is_none());
        assert_eq!(backend.write_count(), writes);
        assert_eq!(backend.persisted().unwrap(), before);
    }

    #[test]
    fn cannot_edit_future() {
        let backend = MemoryBackend::new();
        let mut ledger = ledger_at(&backend, "2024-06");
        let writes = backend.write_count();

        let input = AssetInput::new("Savings", 1.0, 0.0);
        assert!(matches!(
            ledger.update_monthly_asset(ym("2025-01"), input.clone()),
            Err(CoreError::FutureMonth { .. })
        ));
        assert!(matches!(
            ledger.add_asset(ym("2024-07"), input),
            Err(CoreError::FutureMonth { .. })
        ));
        assert!(matches!(
            ledger.update_monthly_income(ym("2024-07"), 5.0),
            Err(CoreError::FutureMonth { .. })
        ));
        assert_eq!(backend.write_count(), writes);
        assert!(ledger.asset_table().next().is_none());
    }
}

// ═══════════════════════════════════════════════════════════════════
// Carry-forward
// ═══════════════════════════════════════════════════════════════════

mod carry_forward {
    use super::*;

    #[test]
    fn current_month_keeps_amounts() {
        let backend = MemoryBackend::new();
        let mut jan = ledger_at(&backend, "2024-01");
        jan.add_asset(ym("2024-01"), AssetInput::new("Savings", 1000.0, 60.0))
            .unwrap();
        jan.add_asset(ym("2024-01"), AssetInput::new("Fund", 500.5, 40.0))
            .unwrap();

        let mut feb = ledger_at(&backend, "2024-02");
        feb.set_current_year_month(ym("2024-02")).unwrap();

        let stored = feb.snapshot(ym("2024-02")).unwrap();
        assert_eq!(stored.total_amount, 1500.5);
        assert_eq!(stored.income, 0.0);
        assert_eq!(feb.total_amount(), 1500.5);
    }

    #[test]
    fn past_month_is_zeroed() {
        let backend = MemoryBackend::new();
        let mut ledger = ledger_at(&backend, "2024-06");
        ledger
            .add_asset(ym("2024-06"), AssetInput::new("Savings", 1000.0, 100.0))
            .unwrap();

        ledger.set_current_year_month(ym("2024-03")).unwrap();
        assert_eq!(ledger.current_year_month(), ym("2024-03"));
        assert_eq!(ledger.assets().len(), 1);
        assert_eq!(ledger.assets()[0].amount, 0.0);

        let stored = ledger.snapshot(ym("2024-03")).unwrap();
        assert_eq!(stored.total_amount, 0.0);
        let persisted = backend.persisted().unwrap();
        assert!(persisted.get::<MonthlyRecord>("2024-03").unwrap().is_some());
    }

    #[test]
    fn existing_month_is_adopted_as_is() {
        let backend = MemoryBackend::new();
        let mut ledger = ledger_at(&backend, "2024-06");
        let savings = ledger
            .add_asset(ym("2024-05"), AssetInput::new("Savings", 300.0, 100.0))
            .unwrap();
        ledger
            .update_monthly_asset(
                ym("2024-06"),
                AssetInput::with_code(&savings.code, "Savings", 350.0, 100.0),
            )
            .unwrap();

        ledger.set_current_year_month(ym("2024-05")).unwrap();
        assert_eq!(ledger.assets()[0].amount, 300.0);
        ledger.set_current_year_month(ym("2024-06")).unwrap();
        assert_eq!(ledger.assets()[0].amount, 350.0);
    }

    #[test]
    fn first_month_starts_from_asset_table() {
        let backend = MemoryBackend::new();
        let mut ledger = ledger_at(&backend, "2024-06");
        ledger
            .add_asset(ym("2024-06"), AssetInput::new("Savings", 10.0, 100.0))
            .unwrap();
        // Wipe the months but keep the table
        let pending = ledger
            .prepare_import(
                &serde_json::json!({
                    "assets": [{"code": "ASSET_T", "name": "Table only", "amount": 99, "targetRatio": 0}],
                    "monthlyData": []
                })
                .to_string(),
            )
            .unwrap();
        ledger.apply_import(pending).unwrap();

        assert_eq!(ledger.assets().len(), 1);
        assert_eq!(ledger.assets()[0].code, "ASSET_T");
        assert_eq!(ledger.assets()[0].amount, 0.0);
    }

    #[test]
    fn resolving_a_missing_month_carries_forward_with_no_income() {
        use asset_ledger_core::services::snapshot_service::{CarryForward, SnapshotService};
        use std::collections::BTreeMap;

        let backend = MemoryBackend::new();
        let mut ledger = ledger_at(&backend, "2024-02");
        ledger
            .add_asset(ym("2024-01"), AssetInput::new("Savings", 80.0, 100.0))
            .unwrap();
        ledger.update_monthly_income(ym("2024-01"), 20.0).unwrap();
        let snapshots: BTreeMap<_, _> =
            ledger.snapshots().map(|s| (s.year_month, s.clone())).collect();
        let table: BTreeMap<_, _> =
            ledger.asset_table().map(|a| (a.code.clone(), a.clone())).collect();

        let service = SnapshotService::new();
        let now = ym("2024-02");
        let kept = service.resolve_month(&snapshots, &table, now, now, CarryForward::KeepAmounts);
        assert_eq!(kept.year_month, now);
        assert_eq!(kept.income, 0.0);
        assert_eq!(kept.total_amount, 80.0);

        let zeroed = service.resolve_month(&snapshots, &table, now, now, CarryForward::Zeroed);
        assert_eq!(zeroed.total_amount, 0.0);
        assert_eq!(zeroed.assets.len(), 1);

        let stored = service.resolve_month(&snapshots, &table, ym("2024-01"), now, CarryForward::Zeroed);
        assert_eq!(stored, snapshots[&ym("2024-01")]);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Editing
// ═══════════════════════════════════════════════════════════════════

mod editing {
    use super::*;

    #[test]
    fn add_asset_records_table_and_month() {
        let backend = MemoryBackend::new();
        let mut ledger = ledger_at(&backend, "2024-06");
        let asset = ledger
            .add_asset(ym("2024-06"), AssetInput::new("Savings", 1234.567, 50.0))
            .unwrap();

        assert!(asset.created_at.is_some());
        assert_eq!(ledger.asset_table().count(), 1);
        assert_eq!(ledger.assets()[0].amount, 1234.57);
        assert_eq!(ledger.snapshot(ym("2024-06")).unwrap().total_amount, 1234.57);
    }

    #[test]
    fn add_asset_rejects_existing_code() {
        let backend = MemoryBackend::new();
        let mut ledger = ledger_at(&backend, "2024-06");
        let asset = ledger
            .add_asset(ym("2024-06"), AssetInput::new("Savings", 1.0, 0.0))
            .unwrap();
        let err = ledger
            .add_asset(
                ym("2024-06"),
                AssetInput::with_code(&asset.code, "Again", 2.0, 0.0),
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));
    }

    #[test]
    fn update_replaces_by_code() {
        let backend = MemoryBackend::new();
        let mut ledger = ledger_at(&backend, "2024-06");
        let asset = ledger
            .add_asset(ym("2024-06"), AssetInput::new("Savings", 100.0, 50.0))
            .unwrap();
        ledger
            .update_monthly_asset(
                ym("2024-06"),
                AssetInput::with_code(&asset.code, "Savings+", 150.0, 70.0),
            )
            .unwrap();

        assert_eq!(ledger.assets().len(), 1);
        let entry = &ledger.assets()[0];
        assert_eq!(entry.amount, 150.0);
        assert_eq!(entry.name, "Savings+");
        assert_eq!(entry.created_at, asset.created_at);

        let record = ledger.asset_table().next().unwrap();
        assert_eq!(record.name, "Savings+");
        assert_eq!(record.target_ratio, 70.0);
        assert_eq!(record.amount, 150.0);
    }

    #[test]
    fn first_edit_of_current_month_keeps_other_assets() {
        let backend = MemoryBackend::new();
        let (a, b) = {
            let mut january = ledger_at(&backend, "2024-01");
            let a = january
                .add_asset(ym("2024-01"), AssetInput::new("A", 100.0, 50.0))
                .unwrap();
            let b = january
                .add_asset(ym("2024-01"), AssetInput::new("B", 200.0, 50.0))
                .unwrap();
            (a, b)
        };

        let mut ledger = ledger_at(&backend, "2024-02");
        assert!(ledger.snapshot(ym("2024-02")).is_none());
        ledger
            .update_monthly_asset(
                ym("2024-02"),
                AssetInput::with_code(&a.code, "A", 150.0, 50.0),
            )
            .unwrap();

        let feb = ledger.snapshot(ym("2024-02")).unwrap();
        assert_eq!(feb.total_amount, 350.0);
        assert_eq!(feb.income, 0.0);
        let amount_of = |code: &str| feb.assets.iter().find(|x| x.code == code).unwrap().amount;
        assert_eq!(amount_of(&a.code), 150.0);
        assert_eq!(amount_of(&b.code), 200.0);
        assert_eq!(ledger.total_amount(), 350.0);
        assert_eq!(ledger.snapshot(ym("2024-01")).unwrap().total_amount, 300.0);
    }

    #[test]
    fn editing_an_older_month_keeps_table_amount() {
        let backend = MemoryBackend::new();
        let mut ledger = ledger_at(&backend, "2024-06");
        let asset = ledger
            .add_asset(ym("2024-06"), AssetInput::new("Savings", 600.0, 50.0))
            .unwrap();
        ledger
            .update_monthly_asset(
                ym("2024-04"),
                AssetInput::with_code(&asset.code, "Savings", 400.0, 50.0),
            )
            .unwrap();

        assert_eq!(ledger.snapshot(ym("2024-04")).unwrap().total_amount, 400.0);
        assert_eq!(ledger.snapshot(ym("2024-06")).unwrap().total_amount, 600.0);
        assert_eq!(ledger.asset_table().next().unwrap().amount, 600.0);
        // The active month is still June
        assert_eq!(ledger.total_amount(), 600.0);
    }

    #[test]
    fn invalid_input_is_rejected() {
        let backend = MemoryBackend::new();
        let mut ledger = ledger_at(&backend, "2024-06");
        let err = ledger
            .update_monthly_asset(ym("2024-06"), AssetInput::new("Bad", f64::INFINITY, 0.0))
            .unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));
        let err = ledger
            .update_monthly_income(ym("2024-06"), f64::NAN)
            .unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));
    }

    #[test]
    fn income_of_unrecorded_month_creates_zeroed_snapshot() {
        let backend = MemoryBackend::new();
        let mut ledger = ledger_at(&backend, "2024-06");
        ledger
            .add_asset(ym("2024-06"), AssetInput::new("Savings", 600.0, 50.0))
            .unwrap();
        ledger.update_monthly_income(ym("2024-05"), 99.999).unwrap();

        let may = ledger.snapshot(ym("2024-05")).unwrap();
        assert_eq!(may.income, 100.0);
        assert_eq!(may.total_amount, 0.0);
        assert_eq!(may.assets.len(), 1);
        // Active month untouched
        assert_eq!(ledger.income(), 0.0);
    }

    #[test]
    fn asset_list_reports_target_deviation() {
        let backend = MemoryBackend::new();
        let mut ledger = ledger_at(&backend, "2024-06");
        ledger
            .add_asset(ym("2024-06"), AssetInput::new("Savings", 600.0, 50.0))
            .unwrap();
        ledger
            .add_asset(ym("2024-06"), AssetInput::new("Fund", 400.0, 50.0))
            .unwrap();

        let views = ledger.asset_list();
        assert_eq!(views.len(), 2);
        for view in &views {
            assert_eq!(view.target_amount, 500.0);
        }
        assert_eq!(views[0].difference, 100.0);
        assert_eq!(views[1].difference, -100.0);
    }

    #[test]
    fn totals_stay_consistent() {
        let backend = MemoryBackend::new();
        let mut ledger = ledger_at(&backend, "2024-06");
        let a = ledger
            .add_asset(ym("2024-06"), AssetInput::new("A", 0.1, 0.0))
            .unwrap();
        ledger
            .add_asset(ym("2024-06"), AssetInput::new("B", 0.2, 0.0))
            .unwrap();
        ledger.set_current_year_month(ym("2024-02")).unwrap();
        ledger
            .update_monthly_asset(ym("2024-02"), AssetInput::with_code(&a.code, "A", 3.333, 0.0))
            .unwrap();
        ledger.update_monthly_income(ym("2024-03"), 10.0).unwrap();

        assert_totals_consistent(&ledger);
        assert_eq!(ledger.latest_total_amount(), 0.3);
        assert_eq!(ledger.latest_valid_month(), Some(ym("2024-06")));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Deletion
// ═══════════════════════════════════════════════════════════════════

mod deletion {
    use super::*;

    #[test]
    fn delete_removes_from_table_and_every_month() {
        let backend = MemoryBackend::new();
        let mut ledger = ledger_at(&backend, "2024-06");
        let keep = ledger
            .add_asset(ym("2024-05"), AssetInput::new("Keep", 100.0, 50.0))
            .unwrap();
        let gone = ledger
            .add_asset(ym("2024-05"), AssetInput::new("Gone", 50.0, 50.0))
            .unwrap();
        ledger.set_current_year_month(ym("2024-06")).unwrap();
        assert_eq!(ledger.total_amount(), 150.0);

        ledger.delete_asset(&gone.code).unwrap();

        assert!(ledger.asset_table().all(|a| a.code == keep.code));
        for month in ["2024-05", "2024-06"] {
            let snapshot = ledger.snapshot(ym(month)).unwrap();
            assert!(!snapshot.contains(&gone.code));
            assert_eq!(snapshot.total_amount, 100.0);
        }
        assert_eq!(ledger.total_amount(), 100.0);

        let reopened = ledger_at(&backend, "2024-06");
        assert_eq!(reopened.asset_table().count(), 1);
        assert_totals_consistent(&reopened);
    }

    #[test]
    fn unknown_code_is_not_found() {
        let backend = MemoryBackend::new();
        let mut ledger = ledger_at(&backend, "2024-06");
        assert!(matches!(
            ledger.delete_asset("ASSET_missing"),
            Err(CoreError::AssetNotFound(code)) if code == "ASSET_missing"
        ));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Write failures
// ═══════════════════════════════════════════════════════════════════

mod write_failures {
    use super::*;

    #[test]
    fn failed_add_leaves_state_unchanged() {
        let backend = MemoryBackend::new();
        let mut ledger = ledger_at(&backend, "2024-06");
        backend.set_fail_writes(true);

        let err = ledger
            .add_asset(ym("2024-06"), AssetInput::new("Savings", 10.0, 0.0))
            .unwrap_err();
        assert!(matches!(err, CoreError::StorageUnavailable(_)));
        assert!(ledger.assets().is_empty());
        assert!(ledger.asset_table().next().is_none());
        assert!(ledger.snapshot(ym("2024-06")).is_none());
    }

    #[test]
    fn failed_navigation_keeps_active_month() {
        let backend = MemoryBackend::new();
        let mut ledger = ledger_at(&backend, "2024-06");
        ledger
            .add_asset(ym("2024-06"), AssetInput::new("Savings", 10.0, 0.0))
            .unwrap();
        backend.set_fail_writes(true);

        assert!(ledger.set_current_year_month(ym("2024-01")).is_err());
        assert_eq!(ledger.current_year_month(), ym("2024-06"));
        assert!(ledger.snapshot(ym("2024-01")).is_none());
    }

    #[test]
    fn failed_delete_keeps_asset() {
        let backend = MemoryBackend::new();
        let mut ledger = ledger_at(&backend, "2024-06");
        let asset = ledger
            .add_asset(ym("2024-06"), AssetInput::new("Savings", 10.0, 0.0))
            .unwrap();
        backend.set_fail_writes(true);

        assert!(ledger.delete_asset(&asset.code).is_err());
        assert_eq!(ledger.asset_table().count(), 1);
        assert_eq!(ledger.total_amount(), 10.0);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Recent year
// ═══════════════════════════════════════════════════════════════════

mod recent_year {
    use super::*;

    #[test]
    fn twelve_months_oldest_first() {
        let backend = MemoryBackend::new();
        let mut ledger = ledger_at(&backend, "2024-06");
        ledger
            .add_asset(ym("2024-06"), AssetInput::new("Savings", 10.0, 0.0))
            .unwrap();
        ledger.update_monthly_income(ym("2024-01"), 5.0).unwrap();

        let year = ledger.recent_year_data();
        assert_eq!(year.len(), 12);
        assert_eq!(year[0].year_month, ym("2023-07"));
        assert_eq!(year[11].year_month, ym("2024-06"));
        assert!(year[11].recorded);
        assert_eq!(year[11].total_amount, 10.0);

        let jan = &year[6];
        assert_eq!(jan.year_month, ym("2024-01"));
        assert!(jan.recorded);
        assert_eq!(jan.income, 5.0);

        let unrecorded = &year[0];
        assert!(!unrecorded.recorded);
        assert_eq!(unrecorded.assets.len(), 1);
        assert_eq!(unrecorded.assets[0].amount, 0.0);
    }
}
