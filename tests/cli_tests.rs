//! Binary-level tests for the command-line interface.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

const VALID_CONFIG: &str = r#"
[engine]
oracle = "oracle"
admin = "admin"
treasury = "treasury"
collateral_decimals = 6

[fees]
trade_bps = 100
claim_bps = 400

[logging]
level = "warn"
format = "pretty"
"#;

#[test]
fn check_config_accepts_defaults() {
    Command::cargo_bin("matchbook")
        .unwrap()
        .arg("check-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("config ok"));
}

#[test]
fn check_config_reads_a_file() {
    let file = write_config(VALID_CONFIG);
    Command::cargo_bin("matchbook")
        .unwrap()
        .args(["check-config", "--config"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("100bps"));
}

#[test]
fn check_config_rejects_excessive_fees() {
    let file = write_config(&VALID_CONFIG.replace("claim_bps = 400", "claim_bps = 2000"));
    Command::cargo_bin("matchbook")
        .unwrap()
        .args(["check-config", "--config"])
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("claim_bps"));
}

#[test]
fn check_config_rejects_unknown_log_format() {
    let file = write_config(&VALID_CONFIG.replace("format = \"pretty\"", "format = \"xml\""));
    Command::cargo_bin("matchbook")
        .unwrap()
        .args(["check-config", "--config"])
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("logging.format"));
}

#[test]
fn demo_json_emits_trade_audit_records() {
    Command::cargo_bin("matchbook")
        .unwrap()
        .args(["demo", "--json"])
        .env("RUST_LOG", "error")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"mode\": \"JitMint\"")
                .and(predicate::str::contains("\"mode\": \"TokenSwap\""))
                .and(predicate::str::contains("\"buyer_fee\"")),
        );
}

#[test]
fn demo_runs_a_full_session() {
    Command::cargo_bin("matchbook")
        .unwrap()
        .arg("demo")
        .env("RUST_LOG", "error")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("alice")
                .and(predicate::str::contains("treasury"))
                .and(predicate::str::contains("JitMint"))
                .and(predicate::str::contains("TokenSwap")),
        );
}
