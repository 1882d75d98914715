//! The mediator: single entry point for skill requests.
//!
//! [`SkillMediator::send`] runs in three steps:
//!
//! 1. **Admission**: the configured skill id must be present, non-blank and
//!    equal to the request's application id. Rejected requests never reach a
//!    handler.
//! 2. **Routing**: the payload's runtime type selects a dispatcher, built on
//!    first use through the [`PayloadCatalog`] and kept in the
//!    [`DispatcherCache`]. Types missing from this mediator's catalog are
//!    rejected even when a shared cache already holds a dispatcher for them.
//! 3. **Dispatch**: the dispatcher runs the pipeline and handler selection.
//!
//! ```rust,ignore
//! let mediator = SkillMediator::new(registry, SkillOptions::new("amzn1.ask.skill.demo"));
//! let response = mediator.send(request, &CancellationToken::new()).await?;
//! ```
//!
//! `SkillMediator` is also a [`tower::Service`] so it can be mounted behind
//! tower layers by a transport.

use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use skillet_core::{
    AdmissionError, HandlerRegistry, SkillError, SkillRequest, SkillResponse, SkillResult,
};
use tokio_util::sync::CancellationToken;
use tower::Service;
use tracing::{Instrument, debug_span, trace, warn};

use crate::cache::DispatcherCache;
use crate::dispatcher::PayloadCatalog;

/// Admission settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillOptions {
    /// The application id every request must be addressed to.
    #[serde(default)]
    pub skill_id: Option<String>,
}

impl SkillOptions {
    pub fn new(skill_id: impl Into<String>) -> Self {
        Self {
            skill_id: Some(skill_id.into()),
        }
    }

    /// Checks that `request` is addressed to the configured skill.
    ///
    /// The comparison is exact; only the configured id is checked for
    /// blankness.
    pub fn verify(&self, request: &SkillRequest) -> Result<(), AdmissionError> {
        let skill_id = self
            .skill_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or(AdmissionError::SkillIdNotConfigured)?;

        match request.application_id() {
            Some(actual) if actual == skill_id => Ok(()),
            actual => Err(AdmissionError::ApplicationIdMismatch {
                expected: skill_id.to_string(),
                actual: actual.map(str::to_string),
            }),
        }
    }
}

/// Entry point for dispatching skill requests.
#[async_trait]
pub trait Mediator: Send + Sync {
    async fn send(
        &self,
        request: SkillRequest,
        cancel: &CancellationToken,
    ) -> SkillResult<SkillResponse>;
}

/// The default [`Mediator`].
///
/// Cloning is cheap; clones share the registry, catalog and cache.
#[derive(Clone)]
pub struct SkillMediator {
    registry: Arc<dyn HandlerRegistry>,
    options: SkillOptions,
    catalog: Arc<PayloadCatalog>,
    cache: Arc<DispatcherCache>,
}

impl SkillMediator {
    /// Creates a mediator using the built-in payload catalog and the
    /// process-wide dispatcher cache.
    pub fn new(registry: impl HandlerRegistry + 'static, options: SkillOptions) -> Self {
        Self::from_shared(Arc::new(registry), options)
    }

    pub fn from_shared(registry: Arc<dyn HandlerRegistry>, options: SkillOptions) -> Self {
        Self {
            registry,
            options,
            catalog: Arc::new(PayloadCatalog::default()),
            cache: DispatcherCache::global(),
        }
    }

    /// Replaces the payload catalog.
    pub fn with_catalog(mut self, catalog: PayloadCatalog) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    /// Uses `cache` instead of the process-wide cache.
    pub fn with_cache(mut self, cache: Arc<DispatcherCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn options(&self) -> &SkillOptions {
        &self.options
    }

    pub fn registry(&self) -> &Arc<dyn HandlerRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<DispatcherCache> {
        &self.cache
    }
}

#[async_trait]
impl Mediator for SkillMediator {
    async fn send(
        &self,
        request: SkillRequest,
        cancel: &CancellationToken,
    ) -> SkillResult<SkillResponse> {
        if let Err(error) = self.options.verify(&request) {
            warn!(error = %error, "Rejecting request");
            return Err(error.into());
        }

        let payload_type = request.payload_type();
        let payload_name = request.payload_name();
        if !self.catalog.contains(payload_type) {
            warn!(payload = payload_name, "Payload type is not in the catalog");
            return Err(SkillError::UnsupportedPayload {
                payload: payload_name,
            });
        }
        let dispatcher = self
            .cache
            .get_or_create(payload_type, || {
                self.catalog.create(payload_type, payload_name)
            })
            .await?;

        let span = debug_span!(
            "dispatch",
            payload = payload_name,
            request_id = %request.request_id()
        );
        async {
            trace!("Dispatching request");
            dispatcher
                .handle(Arc::new(request), cancel, Arc::clone(&self.registry))
                .await
        }
        .instrument(span)
        .await
    }
}

impl Service<SkillRequest> for SkillMediator {
    type Response = SkillResponse;
    type Error = SkillError;
    type Future = BoxFuture<'static, SkillResult<SkillResponse>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    /// Dispatches with a fresh, never-cancelled token.
    fn call(&mut self, request: SkillRequest) -> Self::Future {
        let mediator = self.clone();
        Box::pin(async move {
            let cancel = CancellationToken::new();
            mediator.send(request, &cancel).await
        })
    }
}

impl fmt::Debug for SkillMediator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkillMediator")
            .field("options", &self.options)
            .field("catalog", &self.catalog)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::RequestHandler;
    use crate::pipeline::{
        ExceptionBehavior, ExceptionHandler, RequestInterceptor, RequestInterceptorBehavior,
    };
    use crate::registry::ServiceRegistry;
    use crate::testing::spy::SpyHandler;
    use skillet_core::{
        HandlerInput, IntentRequest, LaunchRequest, RequestCommon, RequestPayload,
    };
    use std::any::TypeId;
    use std::sync::atomic::Ordering;
    use thiserror::Error;
    use tokio_test::{assert_err, assert_ok};
    use tower::ServiceExt;

    const SKILL_ID: &str = "amzn1.ask.skill.test";

    fn mediator(registry: ServiceRegistry) -> SkillMediator {
        SkillMediator::new(registry, SkillOptions::new(SKILL_ID))
            .with_cache(Arc::new(DispatcherCache::new()))
    }

    fn intent(name: &str) -> SkillRequest {
        SkillRequest::new(IntentRequest::new(name)).with_application_id(SKILL_ID)
    }

    // ─── Admission ──────────────────────────────────────────────────────────

    fn admission(skill_id: Option<&str>, application_id: Option<&str>) -> Result<(), AdmissionError> {
        let options = SkillOptions {
            skill_id: skill_id.map(str::to_string),
        };
        let mut request = SkillRequest::new(LaunchRequest::default());
        if let Some(id) = application_id {
            request = request.with_application_id(id);
        }
        options.verify(&request)
    }

    #[test]
    fn admission_rejects_unconfigured_skill_id() {
        for skill_id in [Some(""), Some("  "), None] {
            assert_eq!(
                admission(skill_id, Some("0")),
                Err(AdmissionError::SkillIdNotConfigured),
                "skill id {skill_id:?}"
            );
        }
    }

    #[test]
    fn admission_rejects_mismatched_application_id() {
        for application_id in [Some("1"), Some(""), Some("  "), None] {
            assert!(
                matches!(
                    admission(Some("0"), application_id),
                    Err(AdmissionError::ApplicationIdMismatch { .. })
                ),
                "application id {application_id:?}"
            );
        }
    }

    #[test]
    fn admission_accepts_exact_match() {
        assert_eq!(admission(Some("0"), Some("0")), Ok(()));
        assert!(admission(Some("0"), Some(" 0")).is_err());
    }

    #[tokio::test]
    async fn rejected_requests_reach_no_handler() {
        let handler = SpyHandler::new(true, "handled");
        let registry = ServiceRegistry::builder()
            .add::<dyn RequestHandler<IntentRequest>>(handler.clone())
            .build();
        let mediator = mediator(registry);
        let request = SkillRequest::new(IntentRequest::new("Any")).with_application_id("other");

        let error = assert_err!(mediator.send(request, &CancellationToken::new()).await);

        assert!(matches!(error, SkillError::Admission(_)));
        assert_eq!(handler.checked.load(Ordering::SeqCst), 0);
        assert!(mediator.cache().is_empty());
    }

    // ─── Routing ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn routes_by_payload_type() {
        let launch = SpyHandler::new(true, "welcome");
        let intent = SpyHandler::new(true, "intent");
        let registry = ServiceRegistry::builder()
            .add::<dyn RequestHandler<LaunchRequest>>(launch.clone())
            .add::<dyn RequestHandler<IntentRequest>>(intent.clone())
            .build();
        let mediator = mediator(registry);
        let cancel = CancellationToken::new();

        let response = assert_ok!(mediator.send(intent_request(), &cancel).await);
        assert_eq!(response.speech_text(), Some("intent"));

        let launch_request = SkillRequest::new(LaunchRequest::default()).with_application_id(SKILL_ID);
        let response = assert_ok!(mediator.send(launch_request, &cancel).await);
        assert_eq!(response.speech_text(), Some("welcome"));

        assert_eq!(launch.handled.load(Ordering::SeqCst), 1);
        assert_eq!(intent.handled.load(Ordering::SeqCst), 1);
        assert_eq!(mediator.cache().len(), 2);
    }

    fn intent_request() -> SkillRequest {
        intent("HelloIntent")
    }

    #[derive(Debug, Default)]
    struct CustomPayload {
        common: RequestCommon,
    }

    skillet_core::request_payload!(CustomPayload, "CustomPayload");

    #[tokio::test]
    async fn unknown_payload_is_unsupported_until_registered() {
        let handler = SpyHandler::new(true, "custom");
        let registry = ServiceRegistry::builder()
            .add::<dyn RequestHandler<CustomPayload>>(handler.clone())
            .build();
        let cancel = CancellationToken::new();
        let custom = || SkillRequest::new(CustomPayload::default()).with_application_id(SKILL_ID);

        let plain = mediator(registry.clone());
        let error = assert_err!(plain.send(custom(), &cancel).await);
        assert!(matches!(
            error,
            SkillError::UnsupportedPayload { payload: "CustomPayload" }
        ));
        assert!(!plain.cache().contains(TypeId::of::<CustomPayload>()));

        let extended = mediator(registry).with_catalog(PayloadCatalog::default().with::<CustomPayload>());
        let response = assert_ok!(extended.send(custom(), &cancel).await);
        assert_eq!(response.speech_text(), Some("custom"));
        assert_eq!(CustomPayload::default().payload_name(), "CustomPayload");
    }

    #[derive(Debug, Default)]
    struct SharedCachePayload {
        common: RequestCommon,
    }

    skillet_core::request_payload!(SharedCachePayload, "SharedCachePayload");

    #[tokio::test]
    async fn shared_cache_does_not_widen_the_catalog() {
        let registry = ServiceRegistry::builder()
            .add::<dyn RequestHandler<SharedCachePayload>>(SpyHandler::new(true, "shared"))
            .build();
        let cancel = CancellationToken::new();
        let shared = || SkillRequest::new(SharedCachePayload::default()).with_application_id(SKILL_ID);

        let extended = SkillMediator::new(registry.clone(), SkillOptions::new(SKILL_ID))
            .with_catalog(PayloadCatalog::default().with::<SharedCachePayload>());
        let plain = SkillMediator::new(registry, SkillOptions::new(SKILL_ID));
        assert!(Arc::ptr_eq(extended.cache(), plain.cache()));

        let response = assert_ok!(extended.send(shared(), &cancel).await);
        assert_eq!(response.speech_text(), Some("shared"));
        assert!(plain.cache().contains(TypeId::of::<SharedCachePayload>()));

        let error = assert_err!(plain.send(shared(), &cancel).await);
        assert!(matches!(
            error,
            SkillError::UnsupportedPayload { payload: "SharedCachePayload" }
        ));
    }

    // ─── End to end scenarios ───────────────────────────────────────────────

    /// Answers with the request's locale.
    struct TellLocale;

    #[async_trait]
    impl RequestHandler<IntentRequest> for TellLocale {
        async fn handle(
            &self,
            input: &HandlerInput,
            cancel: &CancellationToken,
        ) -> SkillResult<SkillResponse> {
            let locale = input.request().locale().unwrap_or_default();
            input.response_builder().tell(&locale, cancel).await
        }
    }

    struct FrenchInterceptor;

    #[async_trait]
    impl RequestInterceptor for FrenchInterceptor {
        async fn process(&self, input: &HandlerInput, _cancel: &CancellationToken) -> SkillResult<()> {
            input.request().set_locale("fr-fr");
            Ok(())
        }
    }

    #[tokio::test]
    async fn request_interceptor_changes_locale_seen_by_handler() {
        let registry = ServiceRegistry::builder()
            .behavior(RequestInterceptorBehavior)
            .request_interceptor(FrenchInterceptor)
            .handler::<IntentRequest, _>(TellLocale)
            .build();

        let response = assert_ok!(mediator(registry).send(intent_request(), &CancellationToken::new()).await);

        assert_eq!(response.speech_text(), Some("fr-fr"));
    }

    #[derive(Debug, Error)]
    #[error("invalid operation")]
    struct InvalidOperation;

    #[derive(Debug, Error)]
    #[error("argument out of range")]
    struct BadArgument;

    /// Fails with `InvalidOperation` for the "Invalid" intent and with
    /// `BadArgument` otherwise.
    struct Failing;

    #[async_trait]
    impl RequestHandler<IntentRequest> for Failing {
        async fn handle(&self, input: &HandlerInput, _: &CancellationToken) -> SkillResult<SkillResponse> {
            match input.request().intent_name().as_deref() {
                Some("Invalid") => Err(SkillError::handler(InvalidOperation)),
                _ => Err(SkillError::handler(BadArgument)),
            }
        }
    }

    struct RecoverInvalid;

    #[async_trait]
    impl ExceptionHandler for RecoverInvalid {
        async fn can_handle(&self, _: &HandlerInput, error: &SkillError, _: &CancellationToken) -> SkillResult<bool> {
            Ok(error.is::<InvalidOperation>())
        }

        async fn handle(
            &self,
            input: &HandlerInput,
            _error: &SkillError,
            cancel: &CancellationToken,
        ) -> SkillResult<SkillResponse> {
            input.response_builder().empty(cancel).await
        }
    }

    fn failing_registry() -> ServiceRegistry {
        ServiceRegistry::builder()
            .behavior(ExceptionBehavior)
            .exception_handler(RecoverInvalid)
            .handler::<IntentRequest, _>(Failing)
            .build()
    }

    #[tokio::test]
    async fn exception_handler_recovers_matching_error() {
        let response = assert_ok!(
            mediator(failing_registry())
                .send(intent("Invalid"), &CancellationToken::new())
                .await
        );
        assert_eq!(response, SkillResponse::empty());
    }

    #[tokio::test]
    async fn unmatched_error_keeps_its_type() {
        let error = assert_err!(
            mediator(failing_registry())
                .send(intent(""), &CancellationToken::new())
                .await
        );
        assert!(error.is::<BadArgument>());
    }

    #[tokio::test]
    async fn works_as_tower_service() {
        let registry = ServiceRegistry::builder()
            .add::<dyn RequestHandler<IntentRequest>>(SpyHandler::new(true, "tower"))
            .build();

        let response = assert_ok!(mediator(registry).oneshot(intent_request()).await);

        assert_eq!(response.speech_text(), Some("tower"));
    }
}
