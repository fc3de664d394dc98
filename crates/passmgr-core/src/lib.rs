#![doc = include_str!("../README.md")]

mod blocks;
mod broker;
pub mod clipboard;
pub mod fetcher;
mod property;
mod provider;
mod secret;
mod session;
pub mod settings;
mod trigger;

pub use blocks::{parse_blocks, VaultBlock, BLOCK_LANGUAGE};
pub use broker::{Broker, RetrieveError};
pub use fetcher::{fetch, FetchError, RetrievalRequest};
pub use property::{Property, UnknownPropertyError};
pub use provider::{
    BitwardenProvider, PasswordManager, Provider, UnknownPasswordManagerError, UnlockError,
    UnlockMethod, VaultProvider,
};
pub use secret::Secret;
pub use session::{Session, SessionStatus, SessionToken};
pub use settings::{Settings, SettingsError};
pub use trigger::{BlockTriggers, RetrievalTrigger, TriggerGuard};
