//! Password manager providers.
//!
//! [`PasswordManager`] is the persisted choice, [`Provider`] the configured instance. Both are
//! closed enums; supporting another password manager means adding a variant to each and
//! implementing [`VaultProvider`] for it.

use std::{fmt, path::PathBuf, str::FromStr, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::{
    fetcher::{self, FetchError, RetrievalRequest},
    Property, Secret, SessionToken, Settings,
};

/// Supported password managers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PasswordManager {
    /// Bitwarden, through the `bw` CLI.
    #[default]
    Bitwarden,
}

impl PasswordManager {
    #[allow(missing_docs)]
    pub const ALL: [PasswordManager; 1] = [PasswordManager::Bitwarden];

    #[allow(missing_docs)]
    pub fn name(self) -> &'static str {
        match self {
            PasswordManager::Bitwarden => "Bitwarden",
        }
    }
}

impl fmt::Display for PasswordManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PasswordManager {
    type Err = UnknownPasswordManagerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PasswordManager::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownPasswordManagerError(s.to_owned()))
    }
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
#[error("Unknown password manager `{0}`")]
pub struct UnknownPasswordManagerError(pub String);

/// How the user unlocks the vault.
#[derive(Clone)]
pub enum UnlockMethod {
    /// A session key the user already obtained, stored as given.
    SessionKey(SessionToken),
    /// A master password the provider exchanges for a session key.
    MasterPassword(Zeroizing<String>),
}

impl fmt::Debug for UnlockMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnlockMethod::SessionKey(_) => f.write_str("SessionKey(<redacted>)"),
            UnlockMethod::MasterPassword(_) => f.write_str("MasterPassword(<redacted>)"),
        }
    }
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum UnlockError {
    #[error("Master password is empty")]
    EmptyPassword,
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// What a password manager has to support.
#[async_trait]
pub trait VaultProvider: Send + Sync {
    /// Obtain a session key.
    async fn unlock(&self, method: UnlockMethod) -> Result<SessionToken, UnlockError>;

    /// Called after the session key has been forgotten.
    async fn lock(&self, token: &SessionToken);

    /// Retrieve one property of one vault entry.
    async fn fetch(
        &self,
        property: Property,
        source: &str,
        token: &SessionToken,
    ) -> Result<Secret, FetchError>;
}

/// Bitwarden through the `bw` CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitwardenProvider {
    binary_path: PathBuf,
    timeout: Duration,
}

impl BitwardenProvider {
    #[allow(missing_docs)]
    pub fn new(binary_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary_path: binary_path.into(),
            timeout,
        }
    }

    #[allow(missing_docs)]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.bitwarden_binary.clone(), settings.exec_timeout())
    }

    /// Build the request [`fetcher::fetch`] runs for this provider.
    pub fn request(
        &self,
        property: Property,
        source: &str,
        token: &SessionToken,
    ) -> RetrievalRequest {
        RetrievalRequest {
            property,
            source: source.to_owned(),
            session_token: token.clone(),
            binary_path: self.binary_path.clone(),
            timeout: self.timeout,
        }
    }
}

#[async_trait]
impl VaultProvider for BitwardenProvider {
    async fn unlock(&self, method: UnlockMethod) -> Result<SessionToken, UnlockError> {
        match method {
            UnlockMethod::SessionKey(token) => Ok(token),
            UnlockMethod::MasterPassword(password) => {
                if password.is_empty() {
                    return Err(UnlockError::EmptyPassword);
                }
                let token =
                    fetcher::unlock_with_password(&self.binary_path, &password, self.timeout)
                        .await?;
                Ok(token)
            }
        }
    }

    async fn lock(&self, _token: &SessionToken) {
        // Bitwarden session keys are held client side, forgetting one is enough.
    }

    async fn fetch(
        &self,
        property: Property,
        source: &str,
        token: &SessionToken,
    ) -> Result<Secret, FetchError> {
        fetcher::fetch(&self.request(property, source, token)).await
    }
}

/// A configured password manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    #[allow(missing_docs)]
    Bitwarden(BitwardenProvider),
}

impl Provider {
    /// Build the provider selected in `settings`.
    pub fn from_settings(settings: &Settings) -> Self {
        match settings.password_manager {
            PasswordManager::Bitwarden => {
                Provider::Bitwarden(BitwardenProvider::from_settings(settings))
            }
        }
    }

    #[allow(missing_docs)]
    pub fn kind(&self) -> PasswordManager {
        match self {
            Provider::Bitwarden(_) => PasswordManager::Bitwarden,
        }
    }

    fn inner(&self) -> &dyn VaultProvider {
        match self {
            Provider::Bitwarden(provider) => provider,
        }
    }
}

#[async_trait]
impl VaultProvider for Provider {
    async fn unlock(&self, method: UnlockMethod) -> Result<SessionToken, UnlockError> {
        self.inner().unlock(method).await
    }

    async fn lock(&self, token: &SessionToken) {
        self.inner().lock(token).await
    }

    async fn fetch(
        &self,
        property: Property,
        source: &str,
        token: &SessionToken,
    ) -> Result<Secret, FetchError> {
        self.inner().fetch(property, source, token).await
    }
}
