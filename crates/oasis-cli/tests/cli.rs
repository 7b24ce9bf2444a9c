use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

#[test]
fn validate_accepts_well_formed_scenario() {
    Command::cargo_bin("oasis")
        .unwrap()
        .args(["validate", fixture("basic_scenario.toml").to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("OK"));
}

#[test]
fn validate_rejects_missing_scenario_file() {
    Command::cargo_bin("oasis")
        .unwrap()
        .args(["validate", "does_not_exist.toml"])
        .assert()
        .failure();
}

#[test]
fn schedule_depletes_tank_over_two_days() {
    Command::cargo_bin("oasis")
        .unwrap()
        .args([
            "schedule",
            fixture("basic_scenario.toml").to_str().unwrap(),
            "--format",
            "json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"day\": 1"))
        .stdout(predicate::str::contains("\"day\": 2"));
}

#[test]
fn refine_reports_margin_totals() {
    Command::cargo_bin("oasis")
        .unwrap()
        .args([
            "refine",
            fixture("basic_scenario.toml").to_str().unwrap(),
            "--objective",
            "margin",
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains("refined total margin"));
}

#[test]
fn vessels_deploys_within_fleet_cap() {
    Command::cargo_bin("oasis")
        .unwrap()
        .args([
            "vessels",
            fixture("vessel_scenario.toml").to_str().unwrap(),
            "--format",
            "json",
        ])
        .assert()
        .success();
}

#[test]
fn completions_generate_without_error() {
    Command::cargo_bin("oasis")
        .unwrap()
        .args(["completions", "bash"])
        .assert()
        .success();
}
