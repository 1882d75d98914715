//! # Skillet
//!
//! Type-routed request dispatch for voice assistant skills.
//!
//! ## Overview
//!
//! A skill receives requests whose payload type is only known at runtime
//! (launch, intent, session ended, or your own). Skillet routes each request
//! to the handlers registered for that payload type, wraps the call in a
//! pipeline of behaviors, and returns the response the handler built.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌─────────────────────────────┐
//! │ SkillRuntime │────▶│ SkillMediator│────▶│ HandlerDispatcher<P>        │
//! │ (config, log)│     │ (admission)  │     │  behaviors ─▶ handler for P │
//! └──────────────┘     └──────────────┘     └─────────────────────────────┘
//!                             │                           │
//!                             ▼                           ▼
//!                      DispatcherCache             HandlerRegistry
//! ```
//!
//! - **Runtime**: loads configuration, installs logging, decodes JSON
//! - **Mediator**: rejects requests for other skills, picks the dispatcher
//! - **Dispatcher**: runs behaviors around the first eligible handler, falling
//!   back to the default handler
//! - **Registry**: supplies handlers, behaviors and collaborators by contract
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use skillet::prelude::*;
//!
//! struct Hello;
//!
//! #[async_trait]
//! impl RequestHandler<LaunchRequest> for Hello {
//!     async fn handle(&self, input: &HandlerInput, cancel: &CancellationToken)
//!         -> SkillResult<SkillResponse>
//!     {
//!         input.response_builder().tell("Hello!", cancel).await
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let registry = ServiceRegistry::builder()
//!         .handler::<LaunchRequest, _>(Hello)
//!         .build();
//!     let runtime = SkillRuntime::builder().registry(registry).build()?;
//!     println!("{}", runtime.handle_json(BODY, &CancellationToken::new()).await?);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: read `skillet.toml` (default)
//! - `yaml-config`: read `skillet.yaml`
//! - `json-log`: JSON log output

pub use skillet_core as core;
pub use skillet_framework as framework;
pub use skillet_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use skillet::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use skillet_runtime::{SkillRuntime, SkilletConfig};

    // Dispatch
    pub use skillet_framework::{
        DefaultRequestHandler, Mediator, RequestHandler, ServiceRegistry, SkillMediator,
        SkillOptions,
    };

    // Pipeline extension points
    pub use skillet_framework::{
        ExceptionBehavior, ExceptionHandler, Next, PipelineBehavior, RequestInterceptor,
        RequestInterceptorBehavior, ResponseInterceptor, ResponseInterceptorBehavior,
    };

    // Request and response model
    pub use skillet_core::{
        HandlerInput, Intent, IntentRequest, LaunchRequest, RequestPayload, SessionEndedRequest,
        SkillError, SkillRequest, SkillResponse, SkillResult, request_payload,
    };

    pub use skillet_core::{CancellationToken, async_trait};
}
