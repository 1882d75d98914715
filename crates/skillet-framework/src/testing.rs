//! Shared fixtures for unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::FutureExt;
use skillet_core::{
    BoxError, Contract, HandlerInput, HandlerInputFactory, HandlerRegistry, LaunchRequest,
    ServiceArc, SkillError, SkillRequest, SkillResponse, SkillResult,
};

use crate::input::DefaultHandlerInputFactory;
use crate::pipeline::Next;
use crate::registry::ServiceRegistry;

/// A registry whose every lookup fails.
pub(crate) struct FailingRegistry;

impl HandlerRegistry for FailingRegistry {
    fn resolve_many(&self, contract: Contract) -> Result<Option<Vec<ServiceArc>>, BoxError> {
        Err(format!("cannot construct {contract}").into())
    }

    fn resolve_one(&self, contract: Contract) -> Result<Option<ServiceArc>, BoxError> {
        Err(format!("cannot construct {contract}").into())
    }
}

pub(crate) fn launch() -> Arc<SkillRequest> {
    Arc::new(SkillRequest::new(LaunchRequest::default()))
}

pub(crate) fn input_with(registry: impl HandlerRegistry + 'static) -> HandlerInput {
    DefaultHandlerInputFactory::new()
        .create(launch(), Arc::new(registry))
        .expect("default factory never fails")
}

pub(crate) fn empty_input() -> HandlerInput {
    input_with(ServiceRegistry::builder().build())
}

/// A terminal stage computing its result with `f`.
pub(crate) fn terminal<'a>(
    f: impl FnOnce() -> SkillResult<SkillResponse> + Send + 'a,
) -> Next<'a> {
    Box::new(move || async move { f() }.boxed())
}

/// A terminal stage that succeeds and counts its calls.
pub(crate) fn ok_terminal<'a>() -> (Next<'a>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let next = terminal(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(SkillResponse::empty())
    });
    (next, calls)
}

/// A terminal stage failing with the error built by `f`.
pub(crate) fn err_terminal<'a>(f: impl FnOnce() -> SkillError + Send + 'a) -> Next<'a> {
    terminal(move || Err(f()))
}

pub(crate) mod spy {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use skillet_core::RequestPayload;
    use tokio_util::sync::CancellationToken;

    use crate::handler::RequestHandler;

    /// A handler for any payload that records how often it was consulted.
    pub(crate) struct SpyHandler {
        eligible: bool,
        speech: &'static str,
        log: Option<Arc<Mutex<Vec<String>>>>,
        pub checked: AtomicUsize,
        pub handled: AtomicUsize,
    }

    impl SpyHandler {
        pub(crate) fn new(eligible: bool, speech: &'static str) -> Arc<Self> {
            Arc::new(Self {
                eligible,
                speech,
                log: None,
                checked: AtomicUsize::new(0),
                handled: AtomicUsize::new(0),
            })
        }

        /// An eligible handler that appends "handler" to `log` when run.
        pub(crate) fn logging(log: Arc<Mutex<Vec<String>>>) -> Arc<Self> {
            Arc::new(Self {
                eligible: true,
                speech: "logged",
                log: Some(log),
                checked: AtomicUsize::new(0),
                handled: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl<P: RequestPayload> RequestHandler<P> for SpyHandler {
        async fn can_handle(&self, _: &HandlerInput, _: &CancellationToken) -> SkillResult<bool> {
            self.checked.fetch_add(1, Ordering::SeqCst);
            Ok(self.eligible)
        }

        async fn handle(
            &self,
            input: &HandlerInput,
            cancel: &CancellationToken,
        ) -> SkillResult<SkillResponse> {
            self.handled.fetch_add(1, Ordering::SeqCst);
            if let Some(log) = &self.log {
                log.lock().push("handler".to_string());
            }
            input.response_builder().tell(self.speech, cancel).await
        }
    }
}
