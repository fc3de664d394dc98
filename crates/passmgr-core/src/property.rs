use std::{fmt, str::FromStr};

use thiserror::Error;

/// Which field of a vault entry to retrieve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    #[allow(missing_docs)]
    Username,
    #[allow(missing_docs)]
    Password,
    /// The current one-time code.
    Totp,
}

impl Property {
    /// All properties in display order.
    pub const ALL: [Property; 3] = [Property::Username, Property::Password, Property::Totp];

    /// Name understood by the password manager CLI.
    pub fn as_arg(self) -> &'static str {
        match self {
            Property::Username => "username",
            Property::Password => "password",
            Property::Totp => "totp",
        }
    }

    /// Human label for triggers and notices.
    pub fn label(self) -> &'static str {
        match self {
            Property::Username => "Username",
            Property::Password => "Password",
            Property::Totp => "TOTP",
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_arg())
    }
}

#[allow(missing_docs)]
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown property `{0}`, expected one of: username, password, totp")]
pub struct UnknownPropertyError(pub String);

impl FromStr for Property {
    type Err = UnknownPropertyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Property::ALL
            .into_iter()
            .find(|p| p.as_arg().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownPropertyError(s.to_owned()))
    }
}
