//! Subprocess calls into the password manager CLI.
//!
//! Every call spawns exactly one child, races it against a deadline and folds whatever happens
//! (spawn failure, non-zero exit, timeout, garbage on stdout) into a [`FetchError`]. Nothing here
//! panics on a subprocess outcome and nothing is written to disk.

use std::{
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
    time::Duration,
};

use thiserror::Error;
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::Command,
    time::Instant,
};
use tracing::{debug, warn};
use zeroize::{Zeroize, Zeroizing};

use crate::{Property, Secret, SessionToken};

/// Environment variable the master password is handed over in during unlock.
pub const PASSWORD_ENV: &str = "BW_PASSWORD";

/// Failure reasons longer than this are cut for display.
const MAX_REASON_CHARS: usize = 200;

/// How long output left in the pipes is read after the child has exited.
const PIPE_DRAIN_GRACE: Duration = Duration::from_millis(200);

/// One retrieval from the password manager.
#[derive(Debug, Clone)]
pub struct RetrievalRequest {
    #[allow(missing_docs)]
    pub property: Property,
    /// Vault entry identifier or search term. Passed through untouched.
    pub source: String,
    /// Snapshot of the session key at request time.
    pub session_token: SessionToken,
    /// Path to the password manager executable.
    pub binary_path: PathBuf,
    /// Hard limit for the child process. Must be non-zero.
    pub timeout: Duration,
}

impl RetrievalRequest {
    /// Argument vector passed to the password manager:
    /// `--raw --session <token> get <property> <source>`.
    pub fn args(&self) -> [&str; 6] {
        [
            "--raw",
            "--session",
            self.session_token.as_str(),
            "get",
            self.property.as_arg(),
            self.source.as_str(),
        ]
    }
}

/// Why a call into the password manager did not produce a value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The child did not exit in time and was killed.
    #[error("timeout")]
    Timeout {
        #[allow(missing_docs)]
        after: Duration,
    },
    /// The child could not be started or exited unsuccessfully. `reason` is the sanitized
    /// diagnostic output, shown to the user as is.
    #[error("{reason}")]
    Process {
        #[allow(missing_docs)]
        reason: String,
        /// `None` when the process never ran or was ended by a signal.
        exit_code: Option<i32>,
    },
    /// The child exited successfully but stdout was not valid UTF-8.
    #[error("Password manager returned output that is not valid UTF-8")]
    MalformedOutput,
}

/// Retrieve one property of one vault entry.
///
/// The session key is passed on the command line, which makes it visible in process listings
/// to other local users for the lifetime of the child. This mirrors how the `bw` CLI is
/// documented to be used; hiding it would require a different CLI contract.
///
/// A locked session (empty key) is not rejected here. The CLI refuses it and that refusal comes
/// back as [`FetchError::Process`].
pub async fn fetch(request: &RetrievalRequest) -> Result<Secret, FetchError> {
    let started = Instant::now();

    let mut command = Command::new(&request.binary_path);
    command.args(request.args());

    let result = run(command, request.timeout)
        .await
        .and_then(decode_stdout)
        .map(Secret::new);

    match &result {
        Ok(_) => debug!(
            property = %request.property,
            source = %request.source,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Retrieved secret"
        ),
        Err(e) => warn!(
            property = %request.property,
            source = %request.source,
            elapsed_ms = started.elapsed().as_millis() as u64,
            reason = %e,
            "Retrieval failed"
        ),
    }

    result
}

/// Exchange a master password for a session key with `<binary> unlock --raw`.
///
/// The password travels in the child's environment ([`PASSWORD_ENV`]), never on the command
/// line.
pub async fn unlock_with_password(
    binary_path: &Path,
    password: &str,
    timeout: Duration,
) -> Result<SessionToken, FetchError> {
    let mut command = Command::new(binary_path);
    command
        .args(["unlock", "--raw", "--passwordenv", PASSWORD_ENV])
        .env(PASSWORD_ENV, password);

    let stdout = Zeroizing::new(decode_stdout(run(command, timeout).await?)?);
    let token = SessionToken::from(stdout.trim());
    debug!(empty = token.is_empty(), "Unlock finished");
    Ok(token)
}

/// Spawn the command, wait for it under `timeout` and return its stdout on a zero exit.
///
/// The deadline covers the child's exit only. Output is drained while waiting; once the child
/// has exited, whatever is left in the pipes is read for at most [`PIPE_DRAIN_GRACE`], so a
/// descendant that inherited the pipes can't hold a finished call open.
async fn run(mut command: Command, timeout: Duration) -> Result<Vec<u8>, FetchError> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|e| FetchError::Process {
        reason: sanitize_reason(&format!("Failed to start password manager: {e}")),
        exit_code: None,
    })?;

    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();
    let mut out = Vec::new();
    let mut err = Vec::new();

    let (waited, drained) = {
        let pipes = async {
            tokio::join!(
                drain(stdout.as_mut(), &mut out),
                drain(stderr.as_mut(), &mut err)
            )
        };
        tokio::pin!(pipes);
        let mut drained = None;

        let waited = {
            let wait = child.wait();
            tokio::pin!(wait);
            tokio::time::timeout(timeout, async {
                loop {
                    tokio::select! {
                        status = &mut wait => break status,
                        result = &mut pipes, if drained.is_none() => drained = Some(result),
                    }
                }
            })
            .await
        };

        if waited.is_ok() && drained.is_none() {
            if let Ok(result) = tokio::time::timeout(PIPE_DRAIN_GRACE, &mut pipes).await {
                drained = Some(result);
            }
        }
        (waited, drained)
    };

    let Ok(status) = waited else {
        // `kill` also reaps the child, so it is gone by the time we return.
        if let Err(e) = child.kill().await {
            warn!(error = %e, "Failed to kill timed out password manager process");
        }
        out.zeroize();
        return Err(FetchError::Timeout { after: timeout });
    };

    let status = status.map_err(|e| FetchError::Process {
        reason: sanitize_reason(&format!("Failed to wait for password manager: {e}")),
        exit_code: None,
    })?;

    if !status.success() {
        out.zeroize();
        return Err(FetchError::Process {
            reason: failure_reason(&err, status),
            exit_code: status.code(),
        });
    }

    if let Some((Err(e), _)) = drained {
        out.zeroize();
        return Err(FetchError::Process {
            reason: sanitize_reason(&format!("Failed to read password manager output: {e}")),
            exit_code: status.code(),
        });
    }

    Ok(out)
}

/// Append everything read from `stream` to `buf` until end of file. Bytes read before the
/// future is dropped stay in `buf`.
async fn drain<R: AsyncRead + Unpin>(
    stream: Option<&mut R>,
    buf: &mut Vec<u8>,
) -> std::io::Result<()> {
    let Some(stream) = stream else {
        return Ok(());
    };
    let mut chunk = Zeroizing::new([0u8; 4096]);
    loop {
        let n = stream.read(&mut chunk[..]).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

fn decode_stdout(bytes: Vec<u8>) -> Result<String, FetchError> {
    String::from_utf8(bytes).map_err(|e| {
        e.into_bytes().zeroize();
        FetchError::MalformedOutput
    })
}

fn failure_reason(stderr: &[u8], status: ExitStatus) -> String {
    let reason = sanitize_reason(&String::from_utf8_lossy(stderr));
    if reason.is_empty() {
        format!("Password manager failed with {status}")
    } else {
        reason
    }
}

/// Collapse whitespace, drop control characters and cut to [`MAX_REASON_CHARS`].
pub(crate) fn sanitize_reason(text: &str) -> String {
    let collapsed = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>();

    if collapsed.chars().count() <= MAX_REASON_CHARS {
        return collapsed;
    }

    let mut truncated: String = collapsed.chars().take(MAX_REASON_CHARS).collect();
    truncated.push('…');
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_carry_token_as_argument() {
        let request = RetrievalRequest {
            property: Property::Password,
            source: "example.com".to_owned(),
            session_token: "tok123".into(),
            binary_path: PathBuf::from("/usr/bin/bw"),
            timeout: Duration::from_secs(10),
        };

        assert_eq!(
            request.args(),
            ["--raw", "--session", "tok123", "get", "password", "example.com"]
        );
    }

    #[test]
    fn locked_session_still_passes_empty_token() {
        let request = RetrievalRequest {
            property: Property::Totp,
            source: "my bank".to_owned(),
            session_token: SessionToken::empty(),
            binary_path: PathBuf::from("bw"),
            timeout: Duration::from_secs(1),
        };

        assert_eq!(
            request.args(),
            ["--raw", "--session", "", "get", "totp", "my bank"]
        );
    }

    #[test]
    fn sanitize_keeps_plain_messages() {
        assert_eq!(sanitize_reason("Vault is locked.\n"), "Vault is locked.");
    }

    #[test]
    fn sanitize_collapses_lines_and_strips_control_chars() {
        assert_eq!(
            sanitize_reason("  Not found.\r\n\tTry again\u{7}  "),
            "Not found. Try again"
        );
    }

    #[test]
    fn sanitize_truncates_long_reasons() {
        let long = "x".repeat(MAX_REASON_CHARS + 50);
        let reason = sanitize_reason(&long);
        assert_eq!(reason.chars().count(), MAX_REASON_CHARS + 1);
        assert!(reason.ends_with('…'));
    }

    #[test]
    fn timeout_displays_as_timeout() {
        let err = FetchError::Timeout {
            after: Duration::from_secs(10),
        };
        assert_eq!(err.to_string(), "timeout");
    }

    #[test]
    fn invalid_utf8_is_malformed() {
        assert_eq!(
            decode_stdout(vec![0xff, 0xfe]),
            Err(FetchError::MalformedOutput)
        );
    }
}
