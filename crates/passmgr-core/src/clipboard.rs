//! Delivery of retrieved secrets.
//!
//! The clipboard is reached through the platform's clipboard program (`pbcopy`, `wl-copy`, ...)
//! which receives the secret on stdin.

use std::{path::PathBuf, process::Stdio, time::Duration};

use async_trait::async_trait;
use thiserror::Error;
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    process::Command,
};
use tracing::debug;

use crate::{Secret, Settings};

/// Limit for the clipboard program to take the secret and exit.
const CLIPBOARD_TIMEOUT: Duration = Duration::from_secs(5);

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("No clipboard program found, set `clipboardCommand` in the settings")]
    NoClipboard,
    #[error("Clipboard program `{program}` failed: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Clipboard program `{program}` exited with {status}")]
    Exit { program: String, status: String },
    #[error("Clipboard program `{program}` did not finish in time")]
    Timeout { program: String },
}

/// Somewhere a secret can be handed to.
#[async_trait]
pub trait SecretSink: Send + Sync {
    #[allow(missing_docs)]
    async fn deliver(&self, secret: &Secret) -> Result<(), DeliveryError>;
}

/// Copies secrets by piping them into a clipboard program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandClipboard {
    program: String,
    args: Vec<String>,
}

impl CommandClipboard {
    #[allow(missing_docs)]
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Parse a whitespace separated command line. Quoting is not supported.
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_owned);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }

    /// Use the configured clipboard command, or detect one.
    pub fn from_settings(settings: &Settings) -> Result<Self, DeliveryError> {
        match settings.clipboard_command.as_deref() {
            Some(command) => Self::from_command_line(command).ok_or(DeliveryError::NoClipboard),
            None => Self::detect(),
        }
    }

    /// Pick the clipboard program for the current platform and display server.
    pub fn detect() -> Result<Self, DeliveryError> {
        candidates()
            .into_iter()
            .find(|candidate| find_in_path(&candidate.program).is_some())
            .ok_or(DeliveryError::NoClipboard)
    }

    #[allow(missing_docs)]
    pub fn program(&self) -> &str {
        &self.program
    }

    fn io_error(&self, source: std::io::Error) -> DeliveryError {
        DeliveryError::Io {
            program: self.program.clone(),
            source,
        }
    }
}

#[async_trait]
impl SecretSink for CommandClipboard {
    async fn deliver(&self, secret: &Secret) -> Result<(), DeliveryError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.io_error(e))?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(secret.expose().as_bytes()).await {
                // The program exited early; its status says why.
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                result => result.map_err(|e| self.io_error(e))?,
            }
            // Closing stdin tells the program the input is complete.
            drop(stdin);
        }

        let status = match tokio::time::timeout(CLIPBOARD_TIMEOUT, child.wait()).await {
            Ok(status) => status.map_err(|e| self.io_error(e))?,
            Err(_) => {
                let _ = child.kill().await;
                return Err(DeliveryError::Timeout {
                    program: self.program.clone(),
                });
            }
        };

        if !status.success() {
            return Err(DeliveryError::Exit {
                program: self.program.clone(),
                status: status.to_string(),
            });
        }

        debug!(program = %self.program, "Secret copied to clipboard");
        Ok(())
    }
}

/// Writes secrets verbatim to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

#[async_trait]
impl SecretSink for StdoutSink {
    async fn deliver(&self, secret: &Secret) -> Result<(), DeliveryError> {
        write_secret(&mut tokio::io::stdout(), secret)
            .await
            .map_err(|source| DeliveryError::Io {
                program: "stdout".to_owned(),
                source,
            })
    }
}

async fn write_secret<W: AsyncWrite + Unpin>(out: &mut W, secret: &Secret) -> std::io::Result<()> {
    out.write_all(secret.expose().as_bytes()).await?;
    out.flush().await
}

fn candidates() -> Vec<CommandClipboard> {
    let xclip = || {
        CommandClipboard::new(
            "xclip",
            vec!["-selection".to_owned(), "clipboard".to_owned()],
        )
    };

    if cfg!(target_os = "macos") {
        vec![CommandClipboard::new("pbcopy", Vec::new())]
    } else if cfg!(target_os = "windows") {
        vec![CommandClipboard::new("clip", Vec::new())]
    } else if std::env::var_os("WAYLAND_DISPLAY").is_some() {
        vec![CommandClipboard::new("wl-copy", Vec::new()), xclip()]
    } else if std::env::var_os("DISPLAY").is_some() {
        vec![xclip()]
    } else {
        Vec::new()
    }
}

fn find_in_path(program: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}
