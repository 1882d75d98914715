//! Pipeline behaviors around handler selection.
//!
//! A [`PipelineBehavior`] wraps the rest of the dispatch. It receives the
//! [`HandlerInput`], the cancellation token and a [`Next`] continuation; it
//! may run code before and after calling `next`, transform the result, or
//! short-circuit by never calling it.
//!
//! Behaviors are resolved from the registry and composed so that the first
//! registered one is the outermost:
//!
//! ```text
//! behavior[0] ─▶ behavior[1] ─▶ ... ─▶ behavior[N-1] ─▶ handler selection
//! ```
//!
//! Three behaviors ship with the framework:
//!
//! - [`ExceptionBehavior`]: recovers failures through registered
//!   [`ExceptionHandler`]s
//! - [`RequestInterceptorBehavior`]: runs [`RequestInterceptor`]s first
//! - [`ResponseInterceptorBehavior`]: runs [`ResponseInterceptor`]s last
//!
//! None of them is active unless registered.

mod exception;
mod interceptor;

pub use exception::{ExceptionBehavior, ExceptionHandler};
pub use interceptor::{
    RequestInterceptor, RequestInterceptorBehavior, ResponseInterceptor,
    ResponseInterceptorBehavior,
};

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use skillet_core::{HandlerInput, SkillResponse, SkillResult};
use tokio_util::sync::CancellationToken;

/// The deferred remainder of the pipeline.
///
/// Calling it runs every inner behavior and then handler selection. It can be
/// called at most once.
pub type Next<'a> = Box<dyn FnOnce() -> BoxFuture<'a, SkillResult<SkillResponse>> + Send + 'a>;

/// Cross-cutting middleware around handler selection.
#[async_trait]
pub trait PipelineBehavior: Send + Sync {
    async fn handle(
        &self,
        input: &HandlerInput,
        cancel: &CancellationToken,
        next: Next<'_>,
    ) -> SkillResult<SkillResponse>;
}

/// Wraps `terminal` in `behaviors`, first behavior outermost.
///
/// With no behaviors the terminal is returned as is.
pub fn compose<'a>(
    behaviors: &'a [Arc<dyn PipelineBehavior>],
    input: &'a HandlerInput,
    cancel: &'a CancellationToken,
    terminal: Next<'a>,
) -> Next<'a> {
    behaviors.iter().rev().fold(terminal, |next, behavior| {
        let layer: Next<'a> = Box::new(move || behavior.handle(input, cancel, next));
        layer
    })
}
