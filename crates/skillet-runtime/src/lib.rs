//! Skillet Runtime - configuration, logging and the request entry point.
//!
//! This crate provides:
//! - Layered configuration (`skillet.toml` / `skillet.yaml`, `SKILLET_*`
//!   environment variables) via [`ConfigLoader`]
//! - Subscriber setup for `tracing` via [`LoggingBuilder`]
//! - [`SkillRuntime`], which builds a [`SkillMediator`] from configuration
//!   and answers JSON request bodies
//!
//! ```ignore
//! use skillet_runtime::SkillRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = SkillRuntime::builder().registry(registry).build()?;
//!     let reply = runtime.handle_json(&body, &CancellationToken::new()).await?;
//!     println!("{reply}");
//!     Ok(())
//! }
//! ```
//!
//! [`SkillMediator`]: skillet_framework::SkillMediator

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{ConfigError, ConfigLoader, ConfigResult, LoggingConfig, SkilletConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{RuntimeBuilder, SkillRuntime};

// Re-export tracing for use by skills
pub use tracing;
pub use tracing_subscriber;

/// Logging macros and span helpers.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
