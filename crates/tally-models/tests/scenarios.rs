//! Scenario files driving the example models end to end.

use std::fs;
use std::path::PathBuf;

use approx::assert_abs_diff_eq;
use tally_engine::ConfigError;
use tally_models::prelude::*;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn toml_scenario_overrides_some_fields() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "growth.toml",
        r#"
start_date = "2021-03-31"
revenue_growth = 0.2
"#,
    );

    let assumptions: SimpleAssumptions = load_assumptions(&path).unwrap();
    assert_eq!(assumptions.revenue_growth, 0.2);
    assert_eq!(assumptions.principal, SimpleAssumptions::default().principal);

    let report = ModelKind::Simple.build(Some(&path)).unwrap().report(2).unwrap();
    assert_eq!(report.dates[0].to_string(), "2021-06-30");
    let revenue = &report.row("Revenue").unwrap().values;
    assert_abs_diff_eq!(revenue[0], 1000.0, epsilon = 1e-9);
    assert_abs_diff_eq!(revenue[1], 1050.0, epsilon = 1e-9);
}

#[test]
fn json_scenario_drives_three_statement_model() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "stress.json", r#"{ "capex": 500.0, "min_cash": 50.0 }"#);

    let report = ModelKind::ThreeStatement
        .build(Some(&path))
        .unwrap()
        .report(8)
        .unwrap();

    let draws = report.row("Net revolver draws").unwrap();
    assert!(draws.values[0] > 0.0);
    for cash in &report.row("Cash").unwrap().values {
        assert!(*cash >= 50.0 - 1e-6);
    }
    for check in &report.row("Balance check").unwrap().values {
        assert_abs_diff_eq!(*check, 0.0, epsilon = 1e-6);
    }
}

#[test]
fn invalid_scenario_is_rejected_with_field_name() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "bad.toml", "tax_rate = 2.0\n");

    let err = ModelKind::ThreeStatement.build(Some(&path)).unwrap_err();
    match err {
        ModelError::Config(ConfigError::Validation { field, .. }) => assert_eq!(field, "tax_rate"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn malformed_scenario_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "broken.json", "{ \"revenue_growth\": ");
    let err = ModelKind::Simple.build(Some(&path)).unwrap_err();
    assert!(matches!(err, ModelError::Config(ConfigError::Deserialization(_))));
}

#[test]
fn missing_scenario_reports_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");
    let err = ModelKind::RentRoll.build(Some(&path)).unwrap_err();
    assert!(matches!(err, ModelError::Io { .. }));
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn rent_roll_units_from_toml() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "one_unit.toml",
        r#"
start_date = "2025-01-01"
vacancy_rate = 0.0
credit_loss_pct = 0.0
other_income_pct = 0.0

[[units]]
unit = "unit_301"
unit_type = "studio"
renews = true

[units.initial_lease]
start = "2025-01-01"
end = "2026-01-01"
monthly_rent = 900.0
"#,
    );

    let report = ModelKind::RentRoll.build(Some(&path)).unwrap().report(4).unwrap();
    let egi = report.row("Effective gross income").unwrap();
    assert_abs_diff_eq!(egi.total(), 10800.0, epsilon = 1e-6);
}

#[test]
fn described_tree_lists_financing_loop() {
    let built = ModelKind::ThreeStatement.build(None).unwrap();
    let text = built.model.describe(built.model.root()).pretty(2);
    assert!(text.starts_with("three_statement (group)"));
    assert!(text.contains("net_revolver_draws"));
    assert!(text.contains("interest_expense"));
}
