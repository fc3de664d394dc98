//! In-memory unlock state.
//!
//! The [`Session`] holds the single secret this crate keeps around: the session key handed out by
//! the password manager after an unlock. It lives in volatile memory only. There is no
//! serialization for it and its `Debug` output is redacted.

use std::{
    fmt,
    sync::{PoisonError, RwLock},
};

use tracing::debug;
use zeroize::Zeroizing;

/// Opaque session key. An empty key means the vault is locked.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SessionToken(Zeroizing<String>);

impl SessionToken {
    /// The locked sentinel.
    pub fn empty() -> Self {
        Self::default()
    }

    #[allow(missing_docs)]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for SessionToken {
    fn from(value: String) -> Self {
        Self(Zeroizing::new(value))
    }
}

impl From<&str> for SessionToken {
    fn from(value: &str) -> Self {
        Self::from(value.to_owned())
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("SessionToken(<empty>)")
        } else {
            f.write_str("SessionToken(<redacted>)")
        }
    }
}

/// Logical state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// No session key is held.
    Locked,
    /// A non-empty session key is held. It may still be rejected by the password manager.
    Unlocked,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionStatus::Locked => "Locked",
            SessionStatus::Unlocked => "Unlocked",
        })
    }
}

/// Holds the current session key for the life of the process.
///
/// Reads take a snapshot, so an in-flight retrieval keeps the key it started with even if the
/// session is locked while it runs.
#[derive(Default)]
pub struct Session {
    token: RwLock<SessionToken>,
}

impl Session {
    /// Create a locked session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the held key unconditionally. No validation is done here; an invalid key is only
    /// discovered when the password manager rejects it.
    pub fn unlock(&self, token: impl Into<SessionToken>) {
        let token = token.into();
        let mut guard = self.token.write().unwrap_or_else(PoisonError::into_inner);
        *guard = token;
        debug!(status = ?status_of(&guard), "Session key replaced");
    }

    /// Forget the held key. Idempotent.
    pub fn lock(&self) {
        let mut guard = self.token.write().unwrap_or_else(PoisonError::into_inner);
        *guard = SessionToken::empty();
        debug!("Session locked");
    }

    /// Snapshot of the held key, possibly empty.
    pub fn current_token(&self) -> SessionToken {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[allow(missing_docs)]
    pub fn status(&self) -> SessionStatus {
        status_of(&self.token.read().unwrap_or_else(PoisonError::into_inner))
    }

    #[allow(missing_docs)]
    pub fn is_locked(&self) -> bool {
        self.status() == SessionStatus::Locked
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("status", &self.status())
            .finish()
    }
}

fn status_of(token: &SessionToken) -> SessionStatus {
    if token.is_empty() {
        SessionStatus::Locked
    } else {
        SessionStatus::Unlocked
    }
}
