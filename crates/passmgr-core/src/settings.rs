//! Persisted settings.
//!
//! Settings are a small JSON document stored in the user's config directory:
//!
//! - `~/.config/passmgr/settings.json` (Unix)
//! - `%APPDATA%\passmgr\settings.json` (Windows)
//!
//! Keys that are missing from the file take their defaults, so a partially written or older
//! file keeps working. The session key is never part of the settings.

use std::{
    ops::RangeInclusive,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::PasswordManager;

/// Default location of the Bitwarden CLI.
pub const DEFAULT_BITWARDEN_BINARY: &str = "/usr/bin/bw";
/// Default limit for one call into the password manager, in milliseconds.
pub const DEFAULT_EXEC_TIMEOUT_MS: u64 = 10_000;
/// Accepted exec timeouts, in milliseconds.
pub const EXEC_TIMEOUT_RANGE_MS: RangeInclusive<u64> = 5_000..=25_000;
/// Granularity of the exec timeout, in milliseconds.
pub const EXEC_TIMEOUT_STEP_MS: u64 = 1_000;

const SETTINGS_FILE: &str = "settings.json";

/// Errors that can occur while loading, saving or editing settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Config directory not found (HOME or APPDATA not set).
    #[error("Config directory not found (HOME or APPDATA environment variable not set)")]
    ConfigDirNotFound,

    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The settings file is not valid JSON or has values of the wrong type.
    #[error("Invalid settings file: {0}")]
    Json(#[from] serde_json::Error),

    #[allow(missing_docs)]
    #[error(
        "Exec timeout must be between {} and {} ms in steps of {} ms, got {}",
        EXEC_TIMEOUT_RANGE_MS.start(),
        EXEC_TIMEOUT_RANGE_MS.end(),
        EXEC_TIMEOUT_STEP_MS,
        .0
    )]
    TimeoutOutOfRange(u64),

    #[allow(missing_docs)]
    #[error("Unknown setting `{0}`")]
    UnknownKey(String),

    #[allow(missing_docs)]
    #[error("Invalid value `{value}` for setting `{key}`")]
    InvalidValue { key: String, value: String },
}

/// User settings.
///
/// Defaults to
///
/// ```
/// # use passmgr_core::{PasswordManager, Settings};
/// let settings = Settings {
///     password_manager: PasswordManager::Bitwarden,
///     bitwarden_binary: "/usr/bin/bw".into(),
///     bitwarden_exec_timeout: 10_000,
///     clipboard_command: None,
/// };
/// assert_eq!(settings, Settings::default());
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Which password manager is integrated.
    pub password_manager: PasswordManager,
    /// Path to the `bw` executable.
    pub bitwarden_binary: PathBuf,
    /// Limit for one call into `bw`, in milliseconds.
    pub bitwarden_exec_timeout: u64,
    /// Program (and whitespace separated arguments) that receives secrets on stdin. Detected
    /// from the platform when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clipboard_command: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            password_manager: PasswordManager::Bitwarden,
            bitwarden_binary: DEFAULT_BITWARDEN_BINARY.into(),
            bitwarden_exec_timeout: DEFAULT_EXEC_TIMEOUT_MS,
            clipboard_command: None,
        }
    }
}

impl Settings {
    /// Read settings from `path`. A missing or empty file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(?path, "No settings file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        let mut settings = serde_json::from_str::<Option<Settings>>(&contents)?
            .unwrap_or_default();
        settings.clamp_exec_timeout();
        debug!(?path, "Settings loaded");
        Ok(settings)
    }

    /// Write settings to `path`, creating the parent directory if needed.
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_dir(parent)?;
        }

        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        std::fs::write(path, json)?;

        debug!(?path, "Settings saved");
        Ok(())
    }

    /// The exec timeout as a [`Duration`], clamped into [`EXEC_TIMEOUT_RANGE_MS`].
    pub fn exec_timeout(&self) -> Duration {
        Duration::from_millis(clamp_timeout(self.bitwarden_exec_timeout))
    }

    /// Set the exec timeout. Values outside the range or off the step are rejected.
    pub fn set_exec_timeout(&mut self, millis: u64) -> Result<(), SettingsError> {
        if !EXEC_TIMEOUT_RANGE_MS.contains(&millis) || millis % EXEC_TIMEOUT_STEP_MS != 0 {
            return Err(SettingsError::TimeoutOutOfRange(millis));
        }
        self.bitwarden_exec_timeout = millis;
        Ok(())
    }

    /// Set a value by its key as it appears in the settings file.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        let invalid = || SettingsError::InvalidValue {
            key: key.to_owned(),
            value: value.to_owned(),
        };

        match key {
            "passwordManager" => {
                self.password_manager = value.parse().map_err(|_| invalid())?;
            }
            "bitwardenBinary" => {
                if value.trim().is_empty() {
                    return Err(invalid());
                }
                self.bitwarden_binary = PathBuf::from(value);
            }
            "bitwardenExecTimeout" => {
                let millis = value.trim().parse().map_err(|_| invalid())?;
                self.set_exec_timeout(millis)?;
            }
            "clipboardCommand" => {
                let value = value.trim();
                self.clipboard_command = (!value.is_empty()).then(|| value.to_owned());
            }
            other => return Err(SettingsError::UnknownKey(other.to_owned())),
        }
        Ok(())
    }

    fn clamp_exec_timeout(&mut self) {
        let clamped = clamp_timeout(self.bitwarden_exec_timeout);
        if clamped != self.bitwarden_exec_timeout {
            warn!(
                configured = self.bitwarden_exec_timeout,
                clamped, "Exec timeout out of range, clamping"
            );
            self.bitwarden_exec_timeout = clamped;
        }
    }
}

fn clamp_timeout(millis: u64) -> u64 {
    millis.clamp(*EXEC_TIMEOUT_RANGE_MS.start(), *EXEC_TIMEOUT_RANGE_MS.end())
}

/// Default settings file location.
pub fn default_settings_path() -> Result<PathBuf, SettingsError> {
    Ok(config_dir()?.join(SETTINGS_FILE))
}

fn config_dir() -> Result<PathBuf, SettingsError> {
    #[cfg(target_os = "windows")]
    {
        let appdata = std::env::var("APPDATA").map_err(|_| SettingsError::ConfigDirNotFound)?;
        Ok(PathBuf::from(appdata).join("passmgr"))
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").map_err(|_| SettingsError::ConfigDirNotFound)?;
        Ok(PathBuf::from(home).join(".config").join("passmgr"))
    }
}

/// Create the directory if missing. New directories are private to the user on Unix.
fn ensure_dir(dir: &Path) -> Result<(), SettingsError> {
    if dir.is_dir() {
        return Ok(());
    }
    std::fs::create_dir_all(dir)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o700);
        std::fs::set_permissions(dir, perms)?;
    }

    Ok(())
}
