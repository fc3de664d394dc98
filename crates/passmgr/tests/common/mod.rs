#![allow(dead_code)]

use std::{path::PathBuf, process::Command};

use tempfile::TempDir;

pub const TOKEN: &str = "tok123";

/// Create a new passmgr command, isolated from the user's session and settings
pub fn passmgr() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_passmgr"));
    command
        .env_remove("BW_SESSION")
        .env_remove("PASSMGR_SETTINGS")
        .env_remove("RUST_LOG")
        .args(["--color", "no"]);
    command
}

const STUB: &str = r##"#!/bin/sh
if [ "$1" = "unlock" ]; then
  if [ "$BW_PASSWORD" = "hunter2" ]; then
    printf 'tok123\n'
    exit 0
  fi
  echo "Invalid master password." >&2
  exit 1
fi

if [ -z "$3" ]; then
  echo "Vault is locked." >&2
  exit 1
fi
if [ "$3" != "tok123" ]; then
  echo "Invalid session key." >&2
  exit 1
fi
if [ "$6" = "plain.example" ]; then
  printf 's3cr3t'
  exit 0
fi
if [ "$6" != "example.com" ]; then
  echo "Not found." >&2
  exit 1
fi

case "$5" in
  username) printf 'alice\n' ;;
  password) printf 's3cr3t\n' ;;
  totp) printf '123456\n' ;;
esac
"##;

/// Scratch directory holding a settings file that points at a stand-in `bw`.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create workspace");
        Self { dir }
    }

    /// Install the stand-in `bw` and point the settings at it.
    #[cfg(unix)]
    pub fn with_stub() -> Self {
        use std::os::unix::fs::PermissionsExt;

        let workspace = Self::new();
        let binary = workspace.path("bw");
        std::fs::write(&binary, STUB).expect("write stub");
        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755))
            .expect("make stub executable");

        let settings = format!(
            r#"{{ "bitwardenBinary": "{}", "bitwardenExecTimeout": 5000 }}"#,
            binary.display()
        );
        std::fs::write(workspace.settings(), settings).expect("write settings");
        workspace
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn settings(&self) -> PathBuf {
        self.path("settings.json")
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, contents).expect("write file");
        path
    }

    /// A passmgr command using this workspace's settings file
    pub fn passmgr(&self) -> Command {
        let mut command = passmgr();
        command.arg("--settings").arg(self.settings());
        command
    }
}

pub fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
