//! End-to-end tests for the `confiture` binary that don't need a live
//! PostgreSQL connection: schema-tree builds, migration validation, and
//! usage-error surfaces.

use assert_cmd::assert::OutputAssertExt;
use assert_cmd::cargo::cargo_bin;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn confiture() -> Command {
    Command::new(cargo_bin("confiture"))
}

#[test]
fn build_from_schema_tree_prints_fingerprint() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("users.sql"),
        "CREATE TABLE users (id integer PRIMARY KEY, email text NOT NULL);",
    )
    .unwrap();

    confiture()
        .current_dir(temp.path())
        .args(["build", "--from", temp.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("fingerprint"));
}

#[test]
fn build_rejects_an_unreadable_directory() {
    let temp = TempDir::new().unwrap();
    confiture()
        .current_dir(temp.path())
        .args(["build", "--from", "does-not-exist"])
        .assert()
        .failure();
}

#[test]
fn migrate_validate_flags_a_non_idempotent_drop() {
    let temp = TempDir::new().unwrap();
    let migrations_dir = temp.path().join("migrations");
    fs::create_dir_all(&migrations_dir).unwrap();
    fs::write(migrations_dir.join("001_drop_users.up.sql"), "DROP TABLE users;").unwrap();
    fs::write(migrations_dir.join("001_drop_users.down.sql"), "-- irreversible").unwrap();

    fs::write(
        temp.path().join("confiture.toml"),
        format!("[migrate]\ndir = \"{}\"\n", migrations_dir.to_string_lossy().replace('\\', "\\\\")),
    )
    .unwrap();

    confiture()
        .current_dir(temp.path())
        .args(["migrate", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("idempotent").or(predicate::str::contains("finding")));
}

#[test]
fn sync_without_a_policy_file_is_a_usage_error() {
    let temp = TempDir::new().unwrap();
    confiture()
        .current_dir(temp.path())
        .args(["sync"])
        .assert()
        .failure();
}

#[test]
fn coordinate_check_rejects_a_malformed_object_reference() {
    let temp = TempDir::new().unwrap();
    confiture()
        .current_dir(temp.path())
        .args([
            "coordinate",
            "check",
            "--agent-id",
            "agent-a",
            "--object",
            "not-a-valid-ref",
            "--operation",
            "read",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid object reference"));
}
