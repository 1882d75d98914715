//! Default [`HandlerInputFactory`].

use std::sync::Arc;

use skillet_core::{
    AttributesManager, HandlerInput, HandlerInputFactory, HandlerRegistry, PersistenceAdapter,
    ResponseBuilder, SkillRequest, SkillResult,
};

use crate::attributes::DefaultAttributesManager;
use crate::response::DefaultResponseBuilder;

/// Builds a [`HandlerInput`] backed by [`DefaultAttributesManager`] and
/// [`DefaultResponseBuilder`].
#[derive(Clone, Default)]
pub struct DefaultHandlerInputFactory {
    persistence: Option<Arc<dyn PersistenceAdapter>>,
}

impl DefaultHandlerInputFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backs persistent attributes with `adapter`.
    pub fn with_persistence(mut self, adapter: impl PersistenceAdapter + 'static) -> Self {
        self.persistence = Some(Arc::new(adapter));
        self
    }
}

impl HandlerInputFactory for DefaultHandlerInputFactory {
    fn create(
        &self,
        request: Arc<SkillRequest>,
        services: Arc<dyn HandlerRegistry>,
    ) -> SkillResult<HandlerInput> {
        let attributes: Arc<dyn AttributesManager> = Arc::new(DefaultAttributesManager::new(
            Arc::clone(&request),
            self.persistence.clone(),
        ));
        let responses: Arc<dyn ResponseBuilder> =
            Arc::new(DefaultResponseBuilder::new(Arc::clone(&attributes)));

        Ok(HandlerInput::new(request, services, attributes, responses))
    }
}

impl std::fmt::Debug for DefaultHandlerInputFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultHandlerInputFactory")
            .field("persistence", &self.persistence.is_some())
            .finish()
    }
}
