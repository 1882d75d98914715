//! Per-request handler context and its collaborators.
//!
//! [`HandlerInput`] is built once per dispatch by a [`HandlerInputFactory`]
//! and handed by reference to every pipeline stage and handler. It bundles:
//!
//! - the request envelope,
//! - the handler registry, so stages can resolve further collaborators,
//! - an [`AttributesManager`] for request, session and persistent attributes,
//! - a [`ResponseBuilder`] for assembling the reply.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::{AttributesError, BoxError, SkillResult};
use crate::registry::HandlerRegistry;
use crate::request::{Session, SkillRequest};
use crate::response::SkillResponse;

/// Attribute bag keyed by name.
pub type Attributes = HashMap<String, Value>;

// =============================================================================
// HandlerInput
// =============================================================================

/// Context passed to every stage of a dispatch.
#[derive(Clone)]
pub struct HandlerInput {
    request: Arc<SkillRequest>,
    services: Arc<dyn HandlerRegistry>,
    attributes: Arc<dyn AttributesManager>,
    responses: Arc<dyn ResponseBuilder>,
}

impl HandlerInput {
    pub fn new(
        request: Arc<SkillRequest>,
        services: Arc<dyn HandlerRegistry>,
        attributes: Arc<dyn AttributesManager>,
        responses: Arc<dyn ResponseBuilder>,
    ) -> Self {
        Self {
            request,
            services,
            attributes,
            responses,
        }
    }

    /// Returns the request envelope.
    pub fn request(&self) -> &SkillRequest {
        &self.request
    }

    /// Returns a shared handle to the request envelope.
    pub fn request_arc(&self) -> &Arc<SkillRequest> {
        &self.request
    }

    /// Returns the registry the dispatch was started with.
    pub fn services(&self) -> &Arc<dyn HandlerRegistry> {
        &self.services
    }

    pub fn attributes_manager(&self) -> &dyn AttributesManager {
        self.attributes.as_ref()
    }

    pub fn response_builder(&self) -> &dyn ResponseBuilder {
        self.responses.as_ref()
    }
}

impl fmt::Debug for HandlerInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerInput")
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

/// Builds the [`HandlerInput`] for a request.
///
/// The dispatcher resolves exactly one factory from the registry per request.
pub trait HandlerInputFactory: Send + Sync {
    fn create(
        &self,
        request: Arc<SkillRequest>,
        services: Arc<dyn HandlerRegistry>,
    ) -> SkillResult<HandlerInput>;
}

// =============================================================================
// Attributes
// =============================================================================

/// Access to request, session and persistent attributes.
///
/// Request attributes live for one dispatch. Session attributes exist only
/// when the request carries a session and are echoed back in the response.
/// Persistent attributes are loaded from and saved to a
/// [`PersistenceAdapter`], loaded lazily on first access.
#[async_trait]
pub trait AttributesManager: Send + Sync {
    fn request_attributes(&self) -> Attributes;

    fn set_request_attributes(&self, attributes: Attributes);

    fn session_attributes(&self) -> Result<Attributes, AttributesError>;

    fn set_session_attributes(&self, attributes: Attributes) -> Result<(), AttributesError>;

    /// Returns the request's session with the current session attributes.
    fn session(&self) -> Option<Session>;

    async fn persistent_attributes(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Attributes, AttributesError>;

    async fn set_persistent_attributes(&self, attributes: Attributes)
    -> Result<(), AttributesError>;

    async fn save_persistent_attributes(
        &self,
        cancel: &CancellationToken,
    ) -> Result<(), AttributesError>;
}

/// Storage backend for persistent attributes.
#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    async fn get_attributes(
        &self,
        request: &SkillRequest,
        cancel: &CancellationToken,
    ) -> Result<Attributes, BoxError>;

    async fn save_attributes(
        &self,
        request: &SkillRequest,
        attributes: &Attributes,
        cancel: &CancellationToken,
    ) -> Result<(), BoxError>;
}

// =============================================================================
// Responses
// =============================================================================

/// Fluent response assembly.
///
/// The builder methods record state and return the builder so calls can be
/// chained; [`get_response`](Self::get_response) takes the accumulated state.
/// [`tell`](Self::tell), [`ask`](Self::ask) and [`empty`](Self::empty) build
/// complete responses directly.
#[async_trait]
pub trait ResponseBuilder: Send + Sync {
    /// Sets the output speech as SSML.
    fn speak(&self, speech: &str) -> &dyn ResponseBuilder;

    /// Sets the reprompt as SSML.
    fn reprompt(&self, speech: &str) -> &dyn ResponseBuilder;

    fn with_simple_card(&self, title: &str, content: &str) -> &dyn ResponseBuilder;

    fn with_standard_card(
        &self,
        title: &str,
        text: &str,
        small_image_url: Option<&str>,
        large_image_url: Option<&str>,
    ) -> &dyn ResponseBuilder;

    fn with_link_account_card(&self) -> &dyn ResponseBuilder;

    fn with_ask_for_permissions_consent_card(&self, permissions: Vec<String>)
    -> &dyn ResponseBuilder;

    fn add_directive(&self, directive: Value) -> &dyn ResponseBuilder;

    fn with_should_end_session(&self, should_end_session: bool) -> &dyn ResponseBuilder;

    /// Returns the accumulated response and resets the builder.
    async fn get_response(&self, cancel: &CancellationToken) -> SkillResult<SkillResponse>;

    async fn tell(&self, speech: &str, cancel: &CancellationToken) -> SkillResult<SkillResponse>;

    async fn ask(
        &self,
        speech: &str,
        reprompt: &str,
        cancel: &CancellationToken,
    ) -> SkillResult<SkillResponse>;

    async fn empty(&self, cancel: &CancellationToken) -> SkillResult<SkillResponse>;
}
