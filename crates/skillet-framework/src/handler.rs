//! Request handler traits.
//!
//! A [`RequestHandler<P>`] answers requests whose payload is a `P`. Several
//! can be registered for the same payload type; the first one (in
//! registration order) whose [`can_handle`](RequestHandler::can_handle)
//! returns `true` produces the response. When none accepts, the single
//! [`DefaultRequestHandler`], if one is registered, gets a chance.
//!
//! ```rust,ignore
//! struct HelloHandler;
//!
//! #[async_trait]
//! impl RequestHandler<IntentRequest> for HelloHandler {
//!     async fn can_handle(&self, input: &HandlerInput, _: &CancellationToken) -> SkillResult<bool> {
//!         Ok(input.request().intent_name().as_deref() == Some("HelloIntent"))
//!     }
//!
//!     async fn handle(&self, input: &HandlerInput, cancel: &CancellationToken) -> SkillResult<SkillResponse> {
//!         input.response_builder().tell("Hello!", cancel).await
//!     }
//! }
//! ```

use async_trait::async_trait;
use skillet_core::{HandlerInput, RequestPayload, SkillResponse, SkillResult};
use tokio_util::sync::CancellationToken;

/// Handles requests carrying a `P` payload.
#[async_trait]
pub trait RequestHandler<P: RequestPayload>: Send + Sync {
    /// Returns whether this handler accepts the request. Defaults to `true`.
    async fn can_handle(&self, _input: &HandlerInput, _cancel: &CancellationToken) -> SkillResult<bool> {
        Ok(true)
    }

    async fn handle(&self, input: &HandlerInput, cancel: &CancellationToken) -> SkillResult<SkillResponse>;
}

/// Fallback handler consulted when no typed handler accepts a request.
///
/// Registered against a single payload-independent contract; at most one
/// instance is used.
#[async_trait]
pub trait DefaultRequestHandler: Send + Sync {
    /// Returns whether this handler accepts the request. Defaults to `true`.
    async fn can_handle(&self, _input: &HandlerInput, _cancel: &CancellationToken) -> SkillResult<bool> {
        Ok(true)
    }

    async fn handle(&self, input: &HandlerInput, cancel: &CancellationToken) -> SkillResult<SkillResponse>;
}
