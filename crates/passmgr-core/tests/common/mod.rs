//! Stand-in for the Bitwarden CLI used by the integration tests.
//!
//! One shell script per test binary, installed once before any test spawns it. Behaviour is
//! selected by the requested source:
//!
//! - `slow*` writes its pid to `<dir>/<source>.pid` and sleeps for 15 seconds
//! - `record*` writes its argument vector to `<dir>/<source>.args`
//! - `silent-failure*` exits 3 without a diagnostic
//! - `binary*` prints invalid UTF-8
//! - `empty*` succeeds with no output
//! - `forks*` leaves a background process holding stdout open and exits 0
//! - `example.com` returns credentials when the session key is [`TOKEN`]
//!
//! Anything else behaves like the real CLI for an unknown entry.

#![allow(dead_code)]

use std::{
    path::{Path, PathBuf},
    sync::OnceLock,
    time::Duration,
};

use passmgr_core::{Property, RetrievalRequest, Settings, SessionToken};
use tempfile::TempDir;

pub const TOKEN: &str = "tok123";
pub const MASTER_PASSWORD: &str = "hunter2";

const SCRIPT: &str = r##"#!/bin/sh
dir='@DIR@'

if [ "$1" = "unlock" ]; then
  if [ "$BW_PASSWORD" = "hunter2" ]; then
    printf 'tok123\n'
    exit 0
  fi
  echo "Invalid master password." >&2
  exit 1
fi

if [ "$#" -ne 6 ] || [ "$1" != "--raw" ] || [ "$2" != "--session" ] || [ "$4" != "get" ]; then
  echo "unexpected arguments: $*" >&2
  exit 2
fi

token="$3"
property="$5"
entry="$6"

case "$entry" in
  slow*)
    echo $$ > "$dir/$entry.pid"
    exec sleep 15
    ;;
  record*)
    printf '%s\n' "$@" > "$dir/$entry.args"
    printf 'recorded'
    exit 0
    ;;
  silent-failure*)
    exit 3
    ;;
  binary*)
    printf '\377\376'
    exit 0
    ;;
  empty*)
    exit 0
    ;;
  forks*)
    sleep 3 &
    printf 'forked'
    exit 0
    ;;
esac

if [ -z "$token" ]; then
  echo "Vault is locked." >&2
  exit 1
fi

if [ "$token" != "tok123" ]; then
  echo "Invalid session key." >&2
  exit 1
fi

if [ "$entry" != "example.com" ]; then
  echo "Not found." >&2
  exit 1
fi

case "$property" in
  username) printf 'alice\n' ;;
  password) printf 's3cr3t\n' ;;
  totp) printf '123456\n' ;;
  *)
    echo "Unknown property." >&2
    exit 1
    ;;
esac
"##;

pub struct StubCli {
    dir: TempDir,
    binary: PathBuf,
}

static STUB: OnceLock<StubCli> = OnceLock::new();

/// The stub for this test binary. Call this before spawning anything.
pub fn stub() -> &'static StubCli {
    STUB.get_or_init(StubCli::install)
}

impl StubCli {
    fn install() -> Self {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::Builder::new()
            .prefix("passmgr-stub-")
            .tempdir()
            .expect("create stub dir");
        let binary = dir.path().join("bw");
        let script = SCRIPT.replace("@DIR@", &dir.path().display().to_string());

        std::fs::write(&binary, script).expect("write stub");
        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755))
            .expect("make stub executable");

        Self { dir, binary }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn request(&self, property: Property, source: &str, token: &str) -> RetrievalRequest {
        RetrievalRequest {
            property,
            source: source.to_owned(),
            session_token: SessionToken::from(token),
            binary_path: self.binary.clone(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn settings(&self) -> Settings {
        Settings {
            bitwarden_binary: self.binary.clone(),
            ..Default::default()
        }
    }

    pub fn recorded_args(&self, source: &str) -> Vec<String> {
        std::fs::read_to_string(self.dir.path().join(format!("{source}.args")))
            .expect("stub recorded its arguments")
            .lines()
            .map(str::to_owned)
            .collect()
    }

    pub fn pid(&self, source: &str) -> u32 {
        std::fs::read_to_string(self.dir.path().join(format!("{source}.pid")))
            .expect("stub recorded its pid")
            .trim()
            .parse()
            .expect("pid is a number")
    }
}

/// Whether a process with `pid` still exists.
pub fn process_exists(pid: u32) -> bool {
    std::process::Command::new("kill")
        .args(["-0", &pid.to_string()])
        .stderr(std::process::Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
