//! CLI Integration Tests
//!
//! Tests the command-line interface end-to-end. Nothing here talks to a node:
//! runs use `--dry-run`.

use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;

/// Get the binary to test.
fn kira_scenario() -> Command {
    let mut cmd = Command::cargo_bin("kira-scenario").unwrap();
    cmd.env_remove("KIRA_SCENARIO_CONFIG");
    cmd
}

const TRANSFER: &str = r#"
name: transfer
description: Move funds between two test keys
variables:
  amount: 100ukex
steps:
  - name: send
    module: bank
    action: send
    params:
      from: alice
      to: bob
      amount: "{{ amount }}"
    output: tx1
  - name: check
    module: bank
    action: balances
    params:
      address: "{{ tx1.tx_hash }}"
"#;

// ============================================================================
// Help & Version Tests
// ============================================================================

#[test]
fn test_help_flag() {
    kira_scenario()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Scenario automation"));
}

#[test]
fn test_version_flag() {
    kira_scenario()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_missing_subcommand_fails() {
    kira_scenario().assert().failure();
}

// ============================================================================
// Validate Command Tests
// ============================================================================

#[test]
fn test_validate_good_playbook() {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("transfer.yaml");
    file.write_str(TRANSFER).unwrap();

    kira_scenario()
        .arg("validate")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("ok (transfer, 2 steps)"));
}

#[test]
fn test_validate_rejects_unknown_field() {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("typo.yaml");
    file.write_str("name: typo\nstep:\n  - name: a\n    module: bank\n    action: send\n").unwrap();

    kira_scenario()
        .arg("validate")
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown field"));
}

#[test]
fn test_validate_rejects_bad_broadcast_mode() {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("mode.yaml");
    file.write_str(
        "name: mode\nsteps:\n  - name: a\n    module: bank\n    action: send\n    tx_options:\n      broadcast_mode: eventually\n",
    )
    .unwrap();

    kira_scenario()
        .arg("validate")
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid broadcast mode 'eventually'"));
}

#[test]
fn test_validate_missing_file() {
    kira_scenario()
        .args(["validate", "does-not-exist.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}

// ============================================================================
// Run Command Tests
// ============================================================================

#[test]
fn test_dry_run_text_output() {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("transfer.yaml");
    file.write_str(TRANSFER).unwrap();

    kira_scenario()
        .arg("--dry-run")
        .arg("run")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("[SKIP] send (bank send)"))
        .stdout(predicate::str::contains("0 passed, 0 failed, 2 skipped"));
}

#[test]
fn test_dry_run_json_output() {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("transfer.yaml");
    file.write_str(TRANSFER).unwrap();

    let output = kira_scenario()
        .args(["--dry-run", "run", "--format", "json", "--var", "amount=5ukex"])
        .arg(file.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["scenario"], "transfer");
    assert_eq!(result["success"], true);
    assert_eq!(result["dry_run"], true);
    assert_eq!(result["steps"][0]["skipped"], true);
    assert_eq!(result["steps"][0]["params"]["amount"], "5ukex");
    assert_eq!(result["steps"][1]["params"]["address"], "{{ tx1.tx_hash }}");
}

#[test]
fn test_run_rejects_malformed_var() {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("transfer.yaml");
    file.write_str(TRANSFER).unwrap();

    kira_scenario()
        .args(["--dry-run", "run", "--var", "amount"])
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected KEY=VALUE"));
}

#[test]
fn test_run_rejects_bad_duration() {
    kira_scenario()
        .args(["run", "x.yaml", "--wait-timeout", "soon"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--wait-timeout"));
}

// ============================================================================
// List & Modules Tests
// ============================================================================

#[test]
fn test_list_discovers_scenarios() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("scenarios/transfer.yaml").write_str(TRANSFER).unwrap();
    temp.child("scenarios/broken.yaml").write_str("name: broken\n").unwrap();
    temp.child("scenarios/notes.txt").write_str("not a playbook").unwrap();

    kira_scenario()
        .arg("list")
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("transfer"))
        .stdout(predicate::str::contains("Move funds"))
        .stdout(predicate::str::contains("broken").not());
}

#[test]
fn test_list_empty_dir() {
    let temp = assert_fs::TempDir::new().unwrap();

    kira_scenario()
        .arg("list")
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No scenarios found"));
}

#[test]
fn test_modules_lists_routed_actions() {
    kira_scenario()
        .arg("modules")
        .assert()
        .success()
        .stdout(predicate::str::contains("bank: balances, send, total"))
        .stdout(predicate::str::contains("status: show"));
}

// ============================================================================
// Config & Completions Tests
// ============================================================================

#[test]
fn test_config_from_explicit_file() {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("config.toml");
    file.write_str("[node]\nchain_id = \"testnet-9\"\n").unwrap();

    kira_scenario()
        .arg("--config")
        .arg(file.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("testnet-9"))
        .stdout(predicate::str::contains("wait_timeout"));
}

#[test]
fn test_completions_bash() {
    kira_scenario()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("kira-scenario"));
}
