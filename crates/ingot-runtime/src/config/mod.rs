//! Configuration for an Ingot instance.
//!
//! Settings are layered by figment: built-in defaults, then a TOML or YAML
//! file, then `INGOT_*` environment variables. The result is checked by
//! [`validate_config`] before the instance starts.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile};
pub use schema::{
    IngotConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, SpanEventConfig,
};
pub use validation::validate_config;
