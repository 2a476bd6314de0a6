// ABOUTME: Integration tests for the shipyard CLI commands.
// ABOUTME: Validates --help output, init, config printing, and argument errors.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn shipyard_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("shipyard"))
}

/// A project directory with a freshly initialized config.
fn initialized_project() -> tempfile::TempDir {
    let temp_dir = tempfile::tempdir().unwrap();
    shipyard_cmd()
        .current_dir(temp_dir.path())
        .args(["init", "--application", "shop"])
        .assert()
        .success();
    temp_dir
}

#[test]
fn help_shows_commands() {
    shipyard_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("rollback"))
        .stdout(predicate::str::contains("cleanup"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn init_creates_config_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("shipyard.yml");

    shipyard_cmd()
        .current_dir(temp_dir.path())
        .arg("init")
        .assert()
        .success();

    assert!(config_path.exists(), "shipyard.yml should be created");
    let content = fs::read_to_string(&config_path).unwrap();
    assert!(
        content.contains("application:"),
        "Config should have application field"
    );
}

#[test]
fn init_refuses_to_overwrite_existing_config() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("shipyard.yml");

    fs::write(&config_path, "existing: config").unwrap();

    shipyard_cmd()
        .current_dir(temp_dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn init_rejects_invalid_application_name() {
    let temp_dir = tempfile::tempdir().unwrap();

    shipyard_cmd()
        .current_dir(temp_dir.path())
        .args(["init", "--application", "Not Valid"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid configuration"));
}

#[test]
fn config_prints_resolved_yaml() {
    let project = initialized_project();

    shipyard_cmd()
        .current_dir(project.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("application: shop"))
        .stdout(predicate::str::contains("keep_releases: 5"));
}

#[test]
fn config_with_unknown_destination_fails() {
    let project = initialized_project();

    shipyard_cmd()
        .current_dir(project.path())
        .args(["config", "-d", "nowhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown destination"));
}

#[test]
fn missing_config_is_reported() {
    let temp_dir = tempfile::tempdir().unwrap();

    shipyard_cmd()
        .current_dir(temp_dir.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration file not found"));
}

#[test]
fn invoke_without_command_fails() {
    let project = initialized_project();

    shipyard_cmd()
        .current_dir(project.path())
        .arg("invoke")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no command given"));
}

#[test]
fn upload_without_files_fails() {
    let project = initialized_project();

    shipyard_cmd()
        .current_dir(project.path())
        .arg("upload")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no files given"));
}

#[test]
fn upload_rejects_absolute_paths() {
    let project = initialized_project();

    shipyard_cmd()
        .current_dir(project.path())
        .args(["upload", "/etc/hosts"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be relative"));
}

#[test]
fn quiet_and_json_conflict() {
    shipyard_cmd()
        .args(["--quiet", "--json", "status"])
        .assert()
        .failure();
}
