//! Command-line behaviour that needs no server.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

/// `catalyst` with an isolated state dir and an unreachable server.
fn catalyst(state: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("catalyst");
    cmd.env("CATALYST_STATE_DIR", state.path())
        .env("CATALYST_BASE_URL", "http://127.0.0.1:9")
        .env_remove("CATALYST_TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

// =============================================================================
// Basics
// =============================================================================

#[test]
fn help_lists_commands() {
    let state = TempDir::new().unwrap();
    catalyst(&state)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ticket").and(predicate::str::contains("caql")));
}

#[test]
fn version_prints() {
    let state = TempDir::new().unwrap();
    catalyst(&state).arg("--version").assert().success();
}

// =============================================================================
// caql
// =============================================================================

#[test]
fn caql_validate_accepts_good_query() {
    let state = TempDir::new().unwrap();
    catalyst(&state)
        .args(["caql", "validate", "name == \"db-01\" AND open"])
        .assert()
        .success()
        .stdout("ok\n");
}

#[test]
fn caql_validate_reports_position_as_toast() {
    let state = TempDir::new().unwrap();
    catalyst(&state)
        .args(["caql", "validate", "a =="])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("Query failed: "))
        .stderr(predicate::str::contains("line 1:4"));
}

#[test]
fn caql_format_prints_canonical_form() {
    let state = TempDir::new().unwrap();
    catalyst(&state)
        .args(["caql", "format", "name LIKE 'inc%' && open"])
        .assert()
        .success()
        .stdout("name LIKE \"inc%\" AND open\n");
}

#[test]
fn caql_eval_against_document() {
    let state = TempDir::new().unwrap();
    catalyst(&state)
        .args(["caql", "eval", "score > 2", "--doc", r#"{"score": 3}"#])
        .assert()
        .success()
        .stdout("true\n");
}

#[test]
fn caql_eval_reads_document_from_stdin() {
    let state = TempDir::new().unwrap();
    catalyst(&state)
        .args(["caql", "eval", "name", "--doc", "-"])
        .write_stdin(r#"{"name": "incident-7"}"#)
        .assert()
        .success()
        .stdout("\"incident-7\"\n");
}

// =============================================================================
// Session without a server
// =============================================================================

#[test]
fn whoami_without_token_is_not_signed_in() {
    let state = TempDir::new().unwrap();
    catalyst(&state)
        .arg("whoami")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not signed in"));
}

#[test]
fn protected_route_redirects_to_login() {
    let state = TempDir::new().unwrap();
    catalyst(&state)
        .args(["route", "/tickets/incident"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""redirect": "/login""#));
}

#[test]
fn root_route_redirects_to_dashboard() {
    let state = TempDir::new().unwrap();
    catalyst(&state)
        .args(["route", "/"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""redirect": "/dashboard""#));
}

#[test]
fn record_commands_need_a_session() {
    let state = TempDir::new().unwrap();
    catalyst(&state)
        .args(["comment", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("Comment request failed: not signed in"));
}

#[test]
fn unreachable_server_fails_with_toast() {
    let state = TempDir::new().unwrap();
    catalyst(&state)
        .args(["--token", "tok", "ticket", "get", "t-1"])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("Ticket request failed: "));
}

#[test]
fn mutation_stops_when_app_config_is_unavailable() {
    let state = TempDir::new().unwrap();
    catalyst(&state)
        .args(["--token", "tok", "comment", "delete", "c-1"])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with(
            "Comment request failed: could not load app config, refusing to modify data",
        ));
}

#[test]
fn sidebar_toggle_persists() {
    let state = TempDir::new().unwrap();
    catalyst(&state)
        .args(["ui", "toggle-sidebar"])
        .assert()
        .success()
        .stdout(predicate::str::contains("true"));
    catalyst(&state)
        .args(["ui", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("true"));
    assert!(state.path().join("storage.json").exists());
}

#[test]
fn logout_clears_saved_token() {
    let state = TempDir::new().unwrap();
    std::fs::write(state.path().join("storage.json"), r#"{"token": "tok-1"}"#).unwrap();
    catalyst(&state)
        .arg("logout")
        .assert()
        .success()
        .stderr("Signed out\n");
    let saved = std::fs::read_to_string(state.path().join("storage.json")).unwrap();
    assert!(!saved.contains("tok-1"));
}
