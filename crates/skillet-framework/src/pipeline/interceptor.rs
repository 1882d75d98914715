use async_trait::async_trait;
use skillet_core::{HandlerInput, RegistryExt, SkillResponse, SkillResult};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::{Next, PipelineBehavior};

/// Runs before the handler with access to the request.
#[async_trait]
pub trait RequestInterceptor: Send + Sync {
    async fn process(&self, input: &HandlerInput, cancel: &CancellationToken) -> SkillResult<()>;
}

/// Runs after the handler with access to the produced response.
#[async_trait]
pub trait ResponseInterceptor: Send + Sync {
    async fn process(
        &self,
        input: &HandlerInput,
        response: &mut SkillResponse,
        cancel: &CancellationToken,
    ) -> SkillResult<()>;
}

/// Runs every registered [`RequestInterceptor`] in order, then the rest of
/// the pipeline.
///
/// Each interceptor sees the mutations made by the ones before it. A failing
/// interceptor aborts the dispatch.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestInterceptorBehavior;

#[async_trait]
impl PipelineBehavior for RequestInterceptorBehavior {
    async fn handle(
        &self,
        input: &HandlerInput,
        cancel: &CancellationToken,
        next: Next<'_>,
    ) -> SkillResult<SkillResponse> {
        let interceptors = input.services().instances::<dyn RequestInterceptor>()?;
        trace!(count = interceptors.len(), "Running request interceptors");
        for interceptor in &interceptors {
            interceptor.process(input, cancel).await?;
        }
        next().await
    }
}

/// Runs the rest of the pipeline, then every registered
/// [`ResponseInterceptor`] in order on its response.
///
/// Interceptors are skipped when the inner pipeline fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseInterceptorBehavior;

#[async_trait]
impl PipelineBehavior for ResponseInterceptorBehavior {
    async fn handle(
        &self,
        input: &HandlerInput,
        cancel: &CancellationToken,
        next: Next<'_>,
    ) -> SkillResult<SkillResponse> {
        let mut response = next().await?;
        let interceptors = input.services().instances::<dyn ResponseInterceptor>()?;
        trace!(count = interceptors.len(), "Running response interceptors");
        for interceptor in &interceptors {
            interceptor.process(input, &mut response, cancel).await?;
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::compose;
    use crate::registry::ServiceRegistry;
    use crate::testing::{err_terminal, input_with, terminal};
    use parking_lot::Mutex;
    use skillet_core::SkillError;
    use std::sync::Arc;

    struct SetLocale(&'static str);

    #[async_trait]
    impl RequestInterceptor for SetLocale {
        async fn process(&self, input: &HandlerInput, _cancel: &CancellationToken) -> SkillResult<()> {
            input.request().set_locale(self.0);
            Ok(())
        }
    }

    struct Observe(Arc<Mutex<Vec<Option<String>>>>);

    #[async_trait]
    impl ResponseInterceptor for Observe {
        async fn process(
            &self,
            _input: &HandlerInput,
            response: &mut SkillResponse,
            _cancel: &CancellationToken,
        ) -> SkillResult<()> {
            self.0.lock().push(response.speech_text().map(str::to_owned));
            Ok(())
        }
    }

    #[tokio::test]
    async fn later_interceptors_see_earlier_mutations() {
        let registry = ServiceRegistry::builder()
            .request_interceptor(SetLocale("de-de"))
            .request_interceptor(SetLocale("fr-fr"))
            .build();
        let input = input_with(registry);
        let cancel = CancellationToken::new();
        let behaviors: Vec<Arc<dyn PipelineBehavior>> = vec![Arc::new(RequestInterceptorBehavior)];

        let terminal = terminal(|| Ok(SkillResponse::tell(input.request().locale().unwrap_or_default())));
        let response = compose(&behaviors, &input, &cancel, terminal)().await.unwrap();

        assert_eq!(response.speech_text(), Some("fr-fr"));
    }

    #[tokio::test]
    async fn response_interceptors_observe_result() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let registry = ServiceRegistry::builder()
            .response_interceptor(Observe(seen.clone()))
            .response_interceptor(Observe(seen.clone()))
            .build();
        let input = input_with(registry);
        let cancel = CancellationToken::new();
        let behaviors: Vec<Arc<dyn PipelineBehavior>> = vec![Arc::new(ResponseInterceptorBehavior)];

        let terminal = terminal(|| Ok(SkillResponse::tell("done")));
        let response = compose(&behaviors, &input, &cancel, terminal)().await.unwrap();

        assert_eq!(response, SkillResponse::tell("done"));
        assert_eq!(*seen.lock(), vec![Some("done".to_string()); 2]);
    }

    #[tokio::test]
    async fn response_interceptors_skipped_on_failure() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let registry = ServiceRegistry::builder()
            .response_interceptor(Observe(seen.clone()))
            .build();
        let input = input_with(registry);
        let cancel = CancellationToken::new();
        let behaviors: Vec<Arc<dyn PipelineBehavior>> = vec![Arc::new(ResponseInterceptorBehavior)];

        let terminal = err_terminal(|| SkillError::Cancelled);
        let error = compose(&behaviors, &input, &cancel, terminal)().await.unwrap_err();

        assert!(matches!(error, SkillError::Cancelled));
        assert!(seen.lock().is_empty());
    }
}
