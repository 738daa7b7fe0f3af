//! Configuration and reading-store wiring into the engine.

mod common;

use std::fs;

use bimestre::billing::engine::BillingEngine;
use bimestre::billing::ledger::LedgerMode;
use bimestre::config::BillingConfig;
use bimestre::io::export::{write_projection_csv, write_results_csv};
use bimestre::reading::NewReading;
use bimestre::store::{CsvReadingStore, MemoryReadingStore, ReadingStore, StoreError};

use common::{date, year_of_readings, year_today};

#[test]
fn presets_differ_only_in_ledger_outcomes() {
    let readings = year_of_readings();
    let energy = BillingEngine::from_config(&BillingConfig::cfe_1()).recompute(&readings, year_today());
    let cash =
        BillingEngine::from_config(&BillingConfig::cfe_1_cash()).recompute(&readings, year_today());

    assert_eq!(energy.periods, cash.periods);
    assert_eq!(energy.results[0].estimated_cost, cash.results[0].estimated_cost);
    assert_eq!(energy.carried.cash, 0.0);
    assert!(energy.results.iter().all(|r| r.cash_applied == 0.0));
    // Partial offset bills less than forfeiting the same 10 kWh.
    assert!(energy.results[2].estimated_cost < cash.results[2].estimated_cost);
}

#[test]
fn custom_toml_changes_cycle_and_tariff() {
    let toml = r#"
[tariff]
fixed_charge = 50.0
tax_rate = 0.0
tiers = [{ rate = 1.0 }]

[ledger]
mode = "energy"

[projection]
cycle_days = 30
"#;
    let config = BillingConfig::from_toml_str(toml).expect("valid config");
    assert!(config.validate().is_empty());
    assert_eq!(config.ledger.mode, LedgerMode::Energy);

    let out = BillingEngine::from_config(&config).recompute(&year_of_readings(), year_today());
    let open = out.active_result().unwrap();
    assert_eq!(open.extrapolation_factor, Some(3.0));
    assert!((open.net_consumption_kwh - 150.0).abs() < 1e-9);
    assert!((open.estimated_cost - 150.0).abs() < 1e-9);

    let surplus = out.result(0).unwrap();
    assert_eq!(surplus.estimated_cost, 50.0);
}

#[test]
fn invalid_toml_values_are_reported_per_field() {
    let toml = r#"
[tariff]
tax_rate = -0.1
tiers = [{ up_to_kwh = 100.0, rate = 1.0 }]

[projection]
cycle_days = 0
"#;
    let config = BillingConfig::from_toml_str(toml).expect("parses");
    let fields: Vec<String> = config.validate().into_iter().map(|e| e.field).collect();
    assert!(fields.contains(&"tariff.tax_rate".to_string()));
    assert!(fields.contains(&"tariff.tiers[0].up_to_kwh".to_string()));
    assert!(fields.contains(&"projection.cycle_days".to_string()));
}

#[test]
fn unknown_toml_keys_are_rejected() {
    assert!(BillingConfig::from_toml_str("[tariff]\nsurcharge = 3.0\n").is_err());
}

#[test]
fn memory_store_feeds_the_engine() {
    let store = MemoryReadingStore::with_readings(year_of_readings()).unwrap();
    let fetched = store.fetch().unwrap();
    let out = BillingEngine::default().recompute(&fetched, year_today());
    assert_eq!(out, BillingEngine::default().recompute(&year_of_readings(), year_today()));
}

#[test]
fn empty_store_yields_no_data() {
    let store = MemoryReadingStore::default();
    let out = BillingEngine::default().recompute(&store.fetch().unwrap(), year_today());
    assert!(!out.has_data());
    assert!(out.results.is_empty());
}

#[test]
fn csv_store_round_trip_through_engine() {
    let path = std::env::temp_dir().join(format!("bimestre-it-{}.csv", std::process::id()));
    let _ = fs::remove_file(&path);

    let mut store = CsvReadingStore::new(&path);
    for r in year_of_readings() {
        store
            .append(NewReading {
                date: r.date,
                energy_drawn: r.energy_drawn,
                energy_injected: r.energy_injected,
                is_cut_marker: r.is_cut_marker,
                note: r.note,
            })
            .unwrap();
    }

    let backdated = store.append(NewReading {
        date: date(6, 1),
        energy_drawn: 0.0,
        energy_injected: 0.0,
        is_cut_marker: false,
        note: None,
    });
    assert!(matches!(backdated, Err(StoreError::OutOfOrder { .. })));

    let fetched = store.fetch().unwrap();
    let _ = fs::remove_file(&path);

    assert_eq!(fetched, year_of_readings());
    let out = BillingEngine::default().recompute(&fetched, year_today());
    assert_eq!(out.results.len(), 4);
}

#[test]
fn exports_have_one_row_per_item() {
    let out = BillingEngine::default().recompute(&year_of_readings(), year_today());

    let mut buf = Vec::new();
    write_results_csv(&out.results, &mut buf).unwrap();
    let text = String::from_utf8(buf).unwrap();
    assert_eq!(text.lines().count(), out.results.len() + 1);
    assert!(text.lines().next().unwrap().starts_with("index,label,is_open"));

    let mut buf = Vec::new();
    write_projection_csv(&out.projection, &mut buf).unwrap();
    let text = String::from_utf8(buf).unwrap();
    assert_eq!(text.lines().count(), out.projection.len() + 1);
    assert!(text.lines().last().unwrap().ends_with(",projected"));
}
