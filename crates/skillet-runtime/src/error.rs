//! Runtime error types.

use skillet_core::SkillError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while building or driving a [`SkillRuntime`].
///
/// [`SkillRuntime`]: crate::SkillRuntime
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The builder was finished without a handler registry.
    #[error("No handler registry configured")]
    MissingRegistry,

    /// The request body is not a valid skill request, or the response could
    /// not be encoded.
    #[error("Malformed request or response JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Dispatch failed and no exception handler recovered.
    #[error(transparent)]
    Dispatch(#[from] SkillError),
}

impl RuntimeError {
    /// Returns the dispatch error, if this is one.
    pub fn as_skill_error(&self) -> Option<&SkillError> {
        match self {
            Self::Dispatch(error) => Some(error),
            _ => None,
        }
    }
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
