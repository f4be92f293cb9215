//! Configuration loading and validation.
//!
//! Split into one submodule per concern:
//! - [`types`]: the top-level `Config` struct and its directly-nested blocks.
//! - [`classes`]: connection class limits.
//! - [`listen`]: listener addresses.
//! - [`links`]: server-to-server uplinks.
//! - [`oper`]: operator blocks.
//! - [`security`]: kill-line / host-mask rejection.
//! - [`validation`]: post-load sanity checks.

mod classes;
mod defaults;
mod links;
mod listen;
mod oper;
mod security;
mod types;
mod validation;

pub use classes::ClassBlock;
pub use links::LinkBlock;
pub use listen::{ListenConfig, TlsListenConfig};
pub use oper::OperBlock;
pub use security::SecurityConfig;
pub use types::{Config, LimitsConfig, LoggingConfig, ServerConfig};
pub use validation::validate;

use crate::error::ConfigError;
use std::path::Path;

pub fn load(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let text = std::fs::read_to_string(path.as_ref())
        .map_err(|e| ConfigError::Io(path.as_ref().display().to_string(), e.to_string()))?;
    let config: Config = toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
    validate(&config)?;
    Ok(config)
}

/// REHASH's entry point: re-reads and re-validates the same file the
/// running config was originally loaded from.
pub fn reload(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    load(path)
}
