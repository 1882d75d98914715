//! Error types for skill dispatch.
//!
//! Every failure that can surface from a dispatch is folded into
//! [`SkillError`]. The sub-enums keep the categories apart so that
//! exception handlers can match on them:
//!
//! - [`AdmissionError`]: the request was rejected before any dispatch.
//! - [`RegistrationError`]: the handler registry could not supply a contract.
//! - [`AttributesError`]: attribute storage was used in an unsupported way.
//!
//! Failures raised by user handlers are preserved as [`SkillError::Handler`]
//! and can be recovered with [`SkillError::downcast_ref`].

use thiserror::Error;

/// Boxed error for opaque failures raised by handlers and collaborators.
///
/// This is the same type as `tower::BoxError`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Rejection of a request before any dispatch takes place.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    /// No skill id is configured, or it is blank.
    #[error("Skill id is not configured")]
    SkillIdNotConfigured,

    /// The request's application id does not equal the configured skill id.
    #[error("Skill id verification failed: expected '{expected}', got {actual:?}")]
    ApplicationIdMismatch {
        /// The configured skill id.
        expected: String,
        /// The application id carried by the request, if any.
        actual: Option<String>,
    },
}

/// Failure to obtain instances of a contract from the handler registry.
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// The registry raised an error while constructing instances.
    #[error(
        "Error constructing instances of '{contract}'. Register your handlers with the service registry"
    )]
    ResolutionFailed {
        /// Name of the contract being resolved.
        contract: &'static str,
        /// The registry's own error.
        #[source]
        source: BoxError,
    },

    /// The registry returned nothing for the contract.
    #[error("No instances of '{contract}' were found. Register your handlers with the service registry")]
    NotRegistered {
        /// Name of the contract being resolved.
        contract: &'static str,
    },

    /// A registered instance was not of the contract's type.
    #[error("Registered instance of '{contract}' has an unexpected type")]
    TypeMismatch {
        /// Name of the contract being resolved.
        contract: &'static str,
    },
}

impl RegistrationError {
    /// Returns the name of the contract that failed to resolve.
    pub fn contract(&self) -> &'static str {
        match self {
            Self::ResolutionFailed { contract, .. }
            | Self::NotRegistered { contract }
            | Self::TypeMismatch { contract } => contract,
        }
    }
}

/// Misuse of the attributes manager.
#[derive(Error, Debug)]
pub enum AttributesError {
    /// Session attributes were requested but the request carries no session.
    #[error("Request does not carry a session")]
    MissingSession,

    /// Persistent attributes were used without a persistence adapter.
    #[error("No persistence adapter is configured")]
    MissingPersistenceAdapter,

    /// The persistence adapter failed.
    #[error("Persistence adapter failed: {0}")]
    Persistence(#[source] BoxError),
}

/// The umbrella error for a single dispatch.
#[derive(Error, Debug)]
pub enum SkillError {
    /// The request failed the admission check.
    #[error(transparent)]
    Admission(#[from] AdmissionError),

    /// A contract could not be resolved from the registry.
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// Neither a typed handler nor the default handler accepted the request.
    #[error(
        "Handler was not found for request of type '{contract}'. Register your handlers with the service registry"
    )]
    HandlerNotFound {
        /// Name of the typed handler contract that was searched.
        contract: &'static str,
    },

    /// No dispatcher can be built for the request's payload type.
    #[error("No dispatcher is available for payload type '{payload}'")]
    UnsupportedPayload {
        /// Name of the payload type.
        payload: &'static str,
    },

    /// The cancellation token fired before a handler was selected.
    #[error("Request was cancelled")]
    Cancelled,

    /// Attribute storage failed.
    #[error(transparent)]
    Attributes(#[from] AttributesError),

    /// A handler or collaborator raised its own error.
    #[error(transparent)]
    Handler(#[from] BoxError),
}

impl SkillError {
    /// Wraps any error raised by user code.
    pub fn handler(err: impl Into<BoxError>) -> Self {
        Self::Handler(err.into())
    }

    /// Returns the handler-raised error as `E`, if that is what this is.
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Handler(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// Returns `true` if this is a handler-raised error of type `E`.
    pub fn is<E: std::error::Error + 'static>(&self) -> bool {
        self.downcast_ref::<E>().is_some()
    }
}

/// Result type for dispatch operations.
pub type SkillResult<T> = Result<T, SkillError>;
