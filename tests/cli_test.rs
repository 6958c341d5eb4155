// tests/cli_test.rs
mod common;

use common::{commit_file, create_branch, init_repo};
use std::process::Command;

fn binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_roadnik-release"))
}

#[test]
fn test_help_lists_profiles() {
    let output = binary().arg("--help").output().expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("roadnik-release"));
    assert!(stdout.contains("client"));
    assert!(stdout.contains("server"));
    assert!(stdout.contains("image"));
    assert!(stdout.contains("--dry-run"));
}

#[test]
fn test_server_help_has_platform() {
    let output = binary()
        .args(["server", "--help"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("--platform"));
}

#[test]
fn test_missing_profile_is_usage_error() {
    let output = binary().output().expect("Failed to execute command");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_outside_repository_exits_with_one() {
    let dir = tempfile::TempDir::new().unwrap();
    let missing = dir.path().join("missing");
    let output = binary()
        .args(["--root", missing.to_str().unwrap(), "server"])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERROR"));
}

#[test]
fn test_dry_run_prints_plan_and_changes_nothing() {
    let (dir, repo) = init_repo();
    commit_file(&repo, "a.txt", "a", "first");
    create_branch(&repo, "1.2");

    let output = binary()
        .args(["--root", dir.path().to_str().unwrap(), "--dry-run", "server"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("Version: 1.2.1"), "{}", stdout);
    assert!(stdout.contains("server-win-x64.zip"));
    assert!(!dir.path().join("output").exists());
    assert!(repo.tag_names(None).unwrap().is_empty());
}
