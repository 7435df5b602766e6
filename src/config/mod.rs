//! Configuration file handling.

#[expect(clippy::module_inception, reason = "the module holds the configuration type itself")]
mod config;

pub use config::{Config, DEFAULT_CONFIG_TOML};
