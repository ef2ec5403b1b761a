//! Configuration loading for longboard.
//!
//! Uses figment for layered configuration: built-in defaults, then an
//! optional YAML file, then `LONGBOARD_`-prefixed environment variables.

pub mod schema;

pub use schema::{AccountingConfig, Config, HttpDebugConfig, LogConfig, MarketplaceConfig};
