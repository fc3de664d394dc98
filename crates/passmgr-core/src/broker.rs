use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::{
    fetcher::FetchError, Property, Provider, RetrievalTrigger, Secret, Session, SessionStatus,
    Settings, UnlockError, UnlockMethod, VaultProvider,
};

/// Error from a retrieval started through a trigger.
#[derive(Debug, Error)]
pub enum RetrieveError {
    /// The trigger already has a retrieval in flight. Nothing was spawned.
    #[error("A retrieval from `{0}` is already in progress")]
    Busy(String),
    #[allow(missing_docs)]
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Process-wide owner of the session and the configured provider.
///
/// Retrievals only read the session. Unlock and lock are the only writers.
#[derive(Debug)]
pub struct Broker {
    session: Arc<Session>,
    provider: Provider,
}

impl Broker {
    /// Create a broker with a fresh, locked session.
    pub fn new(settings: &Settings) -> Self {
        Self::with_session(settings, Arc::new(Session::new()))
    }

    /// Create a broker around an existing session.
    pub fn with_session(settings: &Settings, session: Arc<Session>) -> Self {
        Self {
            session,
            provider: Provider::from_settings(settings),
        }
    }

    #[allow(missing_docs)]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    #[allow(missing_docs)]
    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    #[allow(missing_docs)]
    pub fn status(&self) -> SessionStatus {
        self.session.status()
    }

    /// Rebuild the provider from new settings. The session is kept.
    pub fn reconfigure(&mut self, settings: &Settings) {
        self.provider = Provider::from_settings(settings);
    }

    /// Obtain a session key from the provider and hold it. The session is left untouched when
    /// the provider fails.
    pub async fn unlock(&self, method: UnlockMethod) -> Result<SessionStatus, UnlockError> {
        let token = self.provider.unlock(method).await?;
        self.session.unlock(token);
        let status = self.session.status();
        info!(provider = %self.provider.kind(), ?status, "Unlocked password manager");
        Ok(status)
    }

    /// Forget the session key.
    pub async fn lock(&self) {
        let token = self.session.current_token();
        self.session.lock();
        self.provider.lock(&token).await;
        info!(provider = %self.provider.kind(), "Locked password manager");
    }

    /// Retrieve a property with the current session key. A locked session is not pre-checked;
    /// the password manager's refusal is returned instead.
    pub async fn retrieve(&self, property: Property, source: &str) -> Result<Secret, FetchError> {
        let token = self.session.current_token();
        self.provider.fetch(property, source, &token).await
    }

    /// Like [`Broker::retrieve`], with `trigger` disabled for the duration of the call.
    pub async fn retrieve_guarded(
        &self,
        trigger: &Arc<RetrievalTrigger>,
        property: Property,
        source: &str,
    ) -> Result<Secret, RetrieveError> {
        let Some(_guard) = trigger.try_begin() else {
            return Err(RetrieveError::Busy(trigger.label().to_owned()));
        };
        Ok(self.retrieve(property, source).await?)
    }
}
