//! Entry point tying configuration, logging and the mediator together.
//!
//! ```rust,ignore
//! use skillet_runtime::SkillRuntime;
//!
//! let runtime = SkillRuntime::builder()
//!     .config_file("skillet.toml")
//!     .registry(registry)
//!     .build()?;
//!
//! let body = runtime.handle_json(&request_body, &CancellationToken::new()).await?;
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use skillet_core::{CancellationToken, HandlerRegistry, SkillRequest, SkillResponse};
use skillet_framework::{DispatcherCache, Mediator, PayloadCatalog, SkillMediator};
use tracing::{debug, info};

use crate::config::{ConfigLoader, SkilletConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

/// A configured skill ready to answer requests.
pub struct SkillRuntime {
    config: SkilletConfig,
    mediator: SkillMediator,
}

impl SkillRuntime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Builds a runtime from an already loaded configuration.
    ///
    /// Logging is left untouched; use the builder to install it.
    pub fn from_config(
        config: SkilletConfig,
        registry: impl HandlerRegistry + 'static,
    ) -> RuntimeResult<Self> {
        Self::builder()
            .config(config)
            .registry(registry)
            .init_logging(false)
            .build()
    }

    pub fn config(&self) -> &SkilletConfig {
        &self.config
    }

    pub fn mediator(&self) -> &SkillMediator {
        &self.mediator
    }

    /// Dispatches one request.
    pub async fn handle(
        &self,
        request: SkillRequest,
        cancel: &CancellationToken,
    ) -> RuntimeResult<SkillResponse> {
        Ok(self.mediator.send(request, cancel).await?)
    }

    /// Decodes a JSON request body, dispatches it and encodes the response.
    pub async fn handle_json(&self, body: &str, cancel: &CancellationToken) -> RuntimeResult<String> {
        let request: SkillRequest = serde_json::from_str(body)?;
        debug!(
            payload = request.payload_name(),
            request_id = %request.request_id(),
            "Decoded request"
        );
        let response = self.handle(request, cancel).await?;
        Ok(serde_json::to_string(&response)?)
    }
}

impl std::fmt::Debug for SkillRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkillRuntime")
            .field("config", &self.config)
            .field("mediator", &self.mediator)
            .finish()
    }
}

/// Builder for [`SkillRuntime`].
///
/// Without an explicit [`config`](Self::config), configuration is loaded
/// through [`ConfigLoader`] from the given file or the default search paths.
pub struct RuntimeBuilder {
    config: Option<SkilletConfig>,
    config_file: Option<PathBuf>,
    profile: Option<String>,
    registry: Option<Arc<dyn HandlerRegistry>>,
    catalog: Option<PayloadCatalog>,
    cache: Option<Arc<DispatcherCache>>,
    init_logging: bool,
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            config_file: None,
            profile: None,
            registry: None,
            catalog: None,
            cache: None,
            init_logging: true,
        }
    }

    /// Uses `config` as is instead of loading one.
    pub fn config(mut self, config: SkilletConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn registry(mut self, registry: impl HandlerRegistry + 'static) -> Self {
        self.registry = Some(Arc::new(registry));
        self
    }

    pub fn shared_registry(mut self, registry: Arc<dyn HandlerRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Replaces the default payload catalog, e.g. to route custom payloads.
    pub fn catalog(mut self, catalog: PayloadCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Uses a private dispatcher cache instead of the process-wide one.
    pub fn cache(mut self, cache: Arc<DispatcherCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Whether `build` installs the global subscriber (default: true).
    pub fn init_logging(mut self, enabled: bool) -> Self {
        self.init_logging = enabled;
        self
    }

    pub fn build(self) -> RuntimeResult<SkillRuntime> {
        let config = match self.config {
            Some(config) => config,
            None => {
                let mut loader = ConfigLoader::new();
                if let Some(profile) = &self.profile {
                    loader = loader.profile(profile);
                }
                if let Some(path) = &self.config_file {
                    loader = loader.file(path);
                }
                loader.load()?
            }
        };
        validate_config(&config)?;

        let registry = self.registry.ok_or(RuntimeError::MissingRegistry)?;

        if self.init_logging {
            logging::init_from_config(&config.logging);
        }

        let mut mediator = SkillMediator::from_shared(registry, config.skill.clone());
        if let Some(catalog) = self.catalog {
            mediator = mediator.with_catalog(catalog);
        }
        if let Some(cache) = self.cache {
            mediator = mediator.with_cache(cache);
        }

        info!(
            skill_id = ?config.skill.skill_id,
            log_level = %config.logging.level,
            "Skill runtime initialized"
        );

        Ok(SkillRuntime { config, mediator })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use skillet_core::{AdmissionError, HandlerInput, LaunchRequest, SkillError, SkillResult};
    use skillet_framework::{RequestHandler, ServiceRegistry, SkillOptions};
    use tokio_test::assert_err;

    const SKILL_ID: &str = "amzn1.ask.skill.runtime";

    struct Welcome;

    #[async_trait]
    impl RequestHandler<LaunchRequest> for Welcome {
        async fn handle(
            &self,
            input: &HandlerInput,
            cancel: &CancellationToken,
        ) -> SkillResult<SkillResponse> {
            input.response_builder().ask("Welcome!", "Say hello.", cancel).await
        }
    }

    fn runtime() -> SkillRuntime {
        let mut config = SkilletConfig::default();
        config.skill = SkillOptions::new(SKILL_ID);
        let registry = ServiceRegistry::builder()
            .handler::<LaunchRequest, _>(Welcome)
            .build();
        SkillRuntime::builder()
            .config(config)
            .registry(registry)
            .cache(Arc::new(DispatcherCache::new()))
            .init_logging(false)
            .build()
            .unwrap()
    }

    fn launch_body(application_id: &str) -> String {
        json!({
            "version": "1.0",
            "context": { "System": { "application": { "applicationId": application_id } } },
            "request": {
                "type": "LaunchRequest",
                "requestId": "req-1",
                "timestamp": "2026-01-01T00:00:00Z",
                "locale": "en-US"
            }
        })
        .to_string()
    }

    #[tokio::test]
    async fn json_request_round_trip() {
        let body = runtime()
            .handle_json(&launch_body(SKILL_ID), &CancellationToken::new())
            .await
            .unwrap();

        let response: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(response["response"]["outputSpeech"]["text"], "Welcome!");
        assert_eq!(response["response"]["shouldEndSession"], false);
    }

    #[tokio::test]
    async fn foreign_application_is_rejected() {
        let error = assert_err!(
            runtime()
                .handle_json(&launch_body("amzn1.ask.skill.other"), &CancellationToken::new())
                .await
        );

        assert!(matches!(
            error.as_skill_error(),
            Some(SkillError::Admission(AdmissionError::ApplicationIdMismatch { .. }))
        ));
    }

    #[tokio::test]
    async fn malformed_body_is_a_json_error() {
        let error = assert_err!(
            runtime()
                .handle_json("{\"request\": {}}", &CancellationToken::new())
                .await
        );

        assert!(matches!(error, RuntimeError::Json(_)));
    }

    #[test]
    fn build_requires_registry() {
        let result = SkillRuntime::builder()
            .config(SkilletConfig::default())
            .init_logging(false)
            .build();

        assert!(matches!(result, Err(RuntimeError::MissingRegistry)));
    }

    #[test]
    fn build_rejects_blank_skill_id() {
        let mut config = SkilletConfig::default();
        config.skill = SkillOptions::new("  ");

        let result = SkillRuntime::from_config(config, ServiceRegistry::builder().build());

        assert!(matches!(result, Err(RuntimeError::Config(_))));
    }
}
