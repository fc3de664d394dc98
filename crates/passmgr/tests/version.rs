//! Tests for the passmgr version flags

mod common;
use common::passmgr;

/// Helper function to test version output
fn assert_version_output(args: &[&str]) {
    let output = passmgr()
        .args(args)
        .output()
        .expect("Failed to execute passmgr command");

    assert!(output.status.success(), "Command should exit successfully");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(
        stdout.contains("passmgr"),
        "Output should contain 'passmgr': {}",
        stdout
    );

    assert!(
        stdout.contains(env!("CARGO_PKG_VERSION")),
        "Output should contain version '{}': {}",
        env!("CARGO_PKG_VERSION"),
        stdout
    );
}

#[test]
fn test_version_flag() {
    assert_version_output(&["--version"]);
}

#[test]
fn test_version_flag_short() {
    assert_version_output(&["-v"]);
}
