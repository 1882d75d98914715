//! Configuration for Skillet skills.
//!
//! Settings are layered with figment from built-in defaults, `skillet.toml`
//! or `skillet.yaml` files and `SKILLET_*` environment variables.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, SkilletConfig, SpanEventConfig,
};
pub use validation::validate_config;
