//! # Skillet Core
//!
//! Request model and dispatch contracts for the Skillet skill framework.
//!
//! This crate holds everything a handler author and a dispatcher need to agree
//! on, without any dispatch logic of its own:
//!
//! - **Request model**: the [`SkillRequest`] envelope and runtime-typed
//!   payloads ([`RequestPayload`], [`IntentRequest`], ...)
//! - **Response model**: [`SkillResponse`] and its parts
//! - **Handler context**: [`HandlerInput`] and its collaborators
//!   ([`AttributesManager`], [`PersistenceAdapter`], [`ResponseBuilder`])
//! - **Registry capability**: [`HandlerRegistry`], which maps a contract type
//!   to registered instances
//! - **Errors**: [`SkillError`] and its categories
//!
//! ## Request Flow
//!
//! ```text
//! ┌──────────────┐     ┌──────────┐     ┌──────────────────┐     ┌─────────┐
//! │ SkillRequest │────▶│ Mediator │────▶│ HandlerDispatcher│────▶│ Handler │
//! │  (payload P) │     │ (admit)  │     │  <P> (pipeline)  │     │         │
//! └──────────────┘     └──────────┘     └──────────────────┘     └─────────┘
//!                                                │
//!                                                ▼
//!                                        HandlerRegistry
//! ```
//!
//! The mediator and dispatcher live in `skillet-framework`.

pub mod error;
pub mod input;
pub mod registry;
pub mod request;
pub mod response;

pub use error::{
    AdmissionError, AttributesError, BoxError, RegistrationError, SkillError, SkillResult,
};
pub use input::{
    Attributes, AttributesManager, HandlerInput, HandlerInputFactory, PersistenceAdapter,
    ResponseBuilder,
};
pub use registry::{Contract, HandlerRegistry, RegistryExt, ServiceArc, erase};
pub use request::{
    Application, ConfirmationStatus, Device, DialogState, Intent, IntentRequest, LaunchRequest,
    RequestCommon, RequestContext, RequestPayload, Session, SessionEndedError,
    SessionEndedReason, SessionEndedRequest, SkillRequest, Slot, SystemContext, User,
};
pub use response::{Card, CardImage, OutputSpeech, Reprompt, ResponseBody, SkillResponse};

// Re-exports used by handler implementations.
pub use async_trait::async_trait;
pub use tokio_util::sync::CancellationToken;
