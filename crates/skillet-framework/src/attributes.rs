//! Default [`AttributesManager`].

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use skillet_core::{
    Attributes, AttributesError, AttributesManager, PersistenceAdapter, Session, SkillRequest,
};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Keeps request and session attributes in memory and delegates persistent
/// attributes to an optional [`PersistenceAdapter`].
///
/// Session attributes start from the request's session. Persistent
/// attributes are loaded from the adapter on first access and only written
/// back by [`save_persistent_attributes`](AttributesManager::save_persistent_attributes).
pub struct DefaultAttributesManager {
    request: Arc<SkillRequest>,
    persistence: Option<Arc<dyn PersistenceAdapter>>,
    request_attributes: Mutex<Attributes>,
    session_attributes: Mutex<Option<Attributes>>,
    persistent_attributes: tokio::sync::Mutex<Option<Attributes>>,
}

impl DefaultAttributesManager {
    pub fn new(request: Arc<SkillRequest>, persistence: Option<Arc<dyn PersistenceAdapter>>) -> Self {
        let session_attributes = request
            .session
            .as_ref()
            .map(|session| session.attributes.clone());

        Self {
            request,
            persistence,
            request_attributes: Mutex::new(Attributes::new()),
            session_attributes: Mutex::new(session_attributes),
            persistent_attributes: tokio::sync::Mutex::new(None),
        }
    }

    fn adapter(&self) -> Result<&Arc<dyn PersistenceAdapter>, AttributesError> {
        self.persistence
            .as_ref()
            .ok_or(AttributesError::MissingPersistenceAdapter)
    }
}

#[async_trait]
impl AttributesManager for DefaultAttributesManager {
    fn request_attributes(&self) -> Attributes {
        self.request_attributes.lock().clone()
    }

    fn set_request_attributes(&self, attributes: Attributes) {
        *self.request_attributes.lock() = attributes;
    }

    fn session_attributes(&self) -> Result<Attributes, AttributesError> {
        self.session_attributes
            .lock()
            .clone()
            .ok_or(AttributesError::MissingSession)
    }

    fn set_session_attributes(&self, attributes: Attributes) -> Result<(), AttributesError> {
        let mut session = self.session_attributes.lock();
        match session.as_mut() {
            Some(current) => {
                *current = attributes;
                Ok(())
            }
            None => Err(AttributesError::MissingSession),
        }
    }

    fn session(&self) -> Option<Session> {
        let attributes = self.session_attributes.lock().clone()?;
        let mut session = self.request.session.clone()?;
        session.attributes = attributes;
        Some(session)
    }

    async fn persistent_attributes(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Attributes, AttributesError> {
        let adapter = self.adapter()?;
        let mut cached = self.persistent_attributes.lock().await;
        if let Some(attributes) = cached.as_ref() {
            return Ok(attributes.clone());
        }

        trace!("Loading persistent attributes");
        let attributes = adapter
            .get_attributes(&self.request, cancel)
            .await
            .map_err(AttributesError::Persistence)?;
        *cached = Some(attributes.clone());
        Ok(attributes)
    }

    async fn set_persistent_attributes(
        &self,
        attributes: Attributes,
    ) -> Result<(), AttributesError> {
        self.adapter()?;
        *self.persistent_attributes.lock().await = Some(attributes);
        Ok(())
    }

    async fn save_persistent_attributes(
        &self,
        cancel: &CancellationToken,
    ) -> Result<(), AttributesError> {
        let adapter = self.adapter()?;
        let cached = self.persistent_attributes.lock().await;
        let Some(attributes) = cached.as_ref() else {
            trace!("No persistent attributes to save");
            return Ok(());
        };

        adapter
            .save_attributes(&self.request, attributes, cancel)
            .await
            .map_err(AttributesError::Persistence)
    }
}

impl std::fmt::Debug for DefaultAttributesManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultAttributesManager")
            .field("has_session", &self.session_attributes.lock().is_some())
            .field("has_persistence", &self.persistence.is_some())
            .finish_non_exhaustive()
    }
}
