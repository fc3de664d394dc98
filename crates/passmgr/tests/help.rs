//! Tests for the passmgr help functionality

mod common;
use common::passmgr;

#[test]
fn test_no_args_shows_help() {
    let output = passmgr().output().expect("Failed to execute passmgr command");

    assert!(output.status.success(), "Command should exit successfully");

    let stdout = String::from_utf8_lossy(&output.stdout);

    for expected in ["Usage:", "Commands:", "Options:", "open", "unlock"] {
        assert!(
            stdout.contains(expected),
            "Output should contain '{}': {}",
            expected,
            stdout
        );
    }
}

#[test]
fn test_get_help_lists_properties() {
    let output = passmgr()
        .args(["get", "--help"])
        .output()
        .expect("Failed to execute passmgr command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--stdout"), "{}", stdout);
    assert!(stdout.contains("username, password or totp"), "{}", stdout);
}
