use async_trait::async_trait;
use skillet_core::{HandlerInput, RegistryExt, SkillError, SkillResponse, SkillResult};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::{Next, PipelineBehavior};

/// Turns a failed dispatch into a response.
#[async_trait]
pub trait ExceptionHandler: Send + Sync {
    /// Returns whether this handler recovers from `error`.
    async fn can_handle(
        &self,
        input: &HandlerInput,
        error: &SkillError,
        cancel: &CancellationToken,
    ) -> SkillResult<bool>;

    async fn handle(
        &self,
        input: &HandlerInput,
        error: &SkillError,
        cancel: &CancellationToken,
    ) -> SkillResult<SkillResponse>;
}

/// Recovers failures of the inner pipeline through registered
/// [`ExceptionHandler`]s.
///
/// Handlers are resolved only after a failure. The first one (in registration
/// order) that accepts the error produces the result; if none does, the
/// original error is returned unchanged. Only failures raised inside this
/// behavior's position in the pipeline are seen.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExceptionBehavior;

impl ExceptionBehavior {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PipelineBehavior for ExceptionBehavior {
    async fn handle(
        &self,
        input: &HandlerInput,
        cancel: &CancellationToken,
        next: Next<'_>,
    ) -> SkillResult<SkillResponse> {
        let error = match next().await {
            Ok(response) => return Ok(response),
            Err(error) => error,
        };

        let handlers = input.services().instances::<dyn ExceptionHandler>()?;
        for (index, handler) in handlers.iter().enumerate() {
            if handler.can_handle(input, &error, cancel).await? {
                debug!(handler_index = index, error = %error, "Exception handler recovering");
                return handler.handle(input, &error, cancel).await;
            }
        }

        trace!(
            candidates = handlers.len(),
            error = %error,
            "No exception handler accepted the error"
        );
        Err(error)
    }
}
