use std::fmt;

use zeroize::Zeroizing;

/// A value retrieved from the vault.
///
/// Kept exactly as the password manager printed it, including any trailing newline. An empty
/// value is a valid secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(Zeroizing<String>);

impl Secret {
    #[allow(missing_docs)]
    pub fn new(value: String) -> Self {
        Self(Zeroizing::new(value))
    }

    /// Borrow the plaintext. Callers must not log it.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(<{} bytes>)", self.0.len())
    }
}
