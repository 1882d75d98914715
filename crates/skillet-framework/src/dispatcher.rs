//! Per-payload request dispatchers.
//!
//! A [`HandlerDispatcher<P>`] knows how to answer requests whose payload is a
//! `P`. For each request it:
//!
//! 1. Builds the [`HandlerInput`] once, using the registry's
//!    [`HandlerInputFactory`]
//! 2. Resolves the [`PipelineBehavior`]s and wraps handler selection in them
//! 3. Runs the pipeline; at its core the first eligible
//!    [`RequestHandler<P>`] answers, or else the [`DefaultRequestHandler`]
//!
//! ```text
//! behavior[0] ─▶ ... ─▶ behavior[N-1] ─▶ RequestHandler<P> #1 (can_handle?)
//!                                        RequestHandler<P> #2 (can_handle?)
//!                                        ...
//!                                        DefaultRequestHandler (can_handle?)
//!                                        HandlerNotFound
//! ```
//!
//! Dispatchers hold no per-request state. The mediator looks them up by
//! payload [`TypeId`] through a [`PayloadCatalog`] and caches one instance per
//! type.

use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use skillet_core::{
    HandlerInput, HandlerInputFactory, HandlerRegistry, IntentRequest, LaunchRequest,
    RegistrationError, RegistryExt, RequestPayload, SessionEndedRequest, SkillError,
    SkillRequest, SkillResponse, SkillResult,
};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, debug_span, trace};

use crate::handler::{DefaultRequestHandler, RequestHandler};
use crate::pipeline::{self, Next, PipelineBehavior};

/// Type-erased dispatcher for one payload type.
#[async_trait]
pub trait RequestDispatcher: Send + Sync {
    /// Returns the name of the payload type this dispatcher serves.
    fn payload_name(&self) -> &'static str;

    async fn handle(
        &self,
        request: Arc<SkillRequest>,
        cancel: &CancellationToken,
        registry: Arc<dyn HandlerRegistry>,
    ) -> SkillResult<SkillResponse>;
}

/// Dispatcher for requests carrying a `P` payload.
pub struct HandlerDispatcher<P> {
    _payload: PhantomData<fn() -> P>,
}

impl<P: RequestPayload> HandlerDispatcher<P> {
    pub fn new() -> Self {
        Self {
            _payload: PhantomData,
        }
    }

    /// The terminal stage of the pipeline: picks and runs one handler.
    async fn select_and_run(
        &self,
        input: &HandlerInput,
        cancel: &CancellationToken,
    ) -> SkillResult<SkillResponse> {
        if cancel.is_cancelled() {
            return Err(SkillError::Cancelled);
        }

        let registry = input.services();
        let handlers = registry.instances::<dyn RequestHandler<P>>()?;
        for (index, handler) in handlers.iter().enumerate() {
            if handler.can_handle(input, cancel).await? {
                debug!(handler_index = index, "Handler selected");
                return handler.handle(input, cancel).await;
            }
        }

        if let Some(default) = registry.instance::<dyn DefaultRequestHandler>()?
            && default.can_handle(input, cancel).await?
        {
            debug!(candidates = handlers.len(), "Falling back to default handler");
            return default.handle(input, cancel).await;
        }

        Err(SkillError::HandlerNotFound {
            contract: type_name::<dyn RequestHandler<P>>(),
        })
    }
}

impl<P: RequestPayload> Default for HandlerDispatcher<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> fmt::Debug for HandlerDispatcher<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDispatcher")
            .field("payload", &type_name::<P>())
            .finish()
    }
}

#[async_trait]
impl<P: RequestPayload> RequestDispatcher for HandlerDispatcher<P> {
    fn payload_name(&self) -> &'static str {
        type_name::<P>()
    }

    async fn handle(
        &self,
        request: Arc<SkillRequest>,
        cancel: &CancellationToken,
        registry: Arc<dyn HandlerRegistry>,
    ) -> SkillResult<SkillResponse> {
        let factory = registry.instance::<dyn HandlerInputFactory>()?.ok_or(
            RegistrationError::NotRegistered {
                contract: type_name::<dyn HandlerInputFactory>(),
            },
        )?;
        let input = factory.create(request, Arc::clone(&registry))?;

        let behaviors = registry.instances::<dyn PipelineBehavior>()?;
        trace!(behaviors = behaviors.len(), "Composing pipeline");

        let terminal: Next<'_> = Box::new(|| self.select_and_run(&input, cancel).boxed());
        pipeline::compose(&behaviors, &input, cancel, terminal)()
            .instrument(debug_span!("pipeline", payload = type_name::<P>()))
            .await
    }
}

// =============================================================================
// Payload catalog
// =============================================================================

/// Constructs the dispatcher for one payload type.
pub type DispatcherFactory = fn() -> Arc<dyn RequestDispatcher>;

fn dispatcher_for<P: RequestPayload>() -> Arc<dyn RequestDispatcher> {
    Arc::new(HandlerDispatcher::<P>::new())
}

/// Maps payload types to dispatcher factories.
///
/// The default catalog knows the built-in payloads. Custom payload types must
/// be registered before the mediator can route them.
#[derive(Clone)]
pub struct PayloadCatalog {
    factories: HashMap<TypeId, DispatcherFactory>,
}

impl Default for PayloadCatalog {
    fn default() -> Self {
        Self::empty()
            .with::<LaunchRequest>()
            .with::<IntentRequest>()
            .with::<SessionEndedRequest>()
    }
}

impl PayloadCatalog {
    /// Creates a catalog that knows no payload types.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Adds payload type `P`.
    pub fn with<P: RequestPayload>(mut self) -> Self {
        self.register::<P>();
        self
    }

    /// Adds payload type `P`.
    pub fn register<P: RequestPayload>(&mut self) {
        self.factories
            .insert(TypeId::of::<P>(), dispatcher_for::<P>);
    }

    pub fn contains(&self, payload_type: TypeId) -> bool {
        self.factories.contains_key(&payload_type)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Builds the dispatcher for a payload type.
    pub fn create(
        &self,
        payload_type: TypeId,
        payload_name: &'static str,
    ) -> SkillResult<Arc<dyn RequestDispatcher>> {
        self.factories
            .get(&payload_type)
            .map(|factory| factory())
            .ok_or(SkillError::UnsupportedPayload {
                payload: payload_name,
            })
    }
}

impl fmt::Debug for PayloadCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadCatalog")
            .field("payload_types", &self.factories.len())
            .finish()
    }
}
