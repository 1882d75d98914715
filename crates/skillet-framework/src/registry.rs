//! In-memory handler registry.
//!
//! [`ServiceRegistry`] is a small, immutable service container implementing
//! [`HandlerRegistry`]. Instances are registered per contract through
//! [`ServiceRegistryBuilder`] and returned in registration order.
//!
//! # Example
//!
//! ```rust,ignore
//! let registry = ServiceRegistry::builder()
//!     .handler::<IntentRequest, _>(HelloHandler)
//!     .handler::<LaunchRequest, _>(WelcomeHandler)
//!     .default_handler(FallbackHandler)
//!     .behavior(ExceptionBehavior)
//!     .behavior(RequestInterceptorBehavior)
//!     .exception_handler(SorryHandler)
//!     .request_interceptor(LocaleInterceptor)
//!     .build();
//! ```
//!
//! Registrations are singletons by default. Use
//! [`add_factory`](ServiceRegistryBuilder::add_factory) for a fresh instance
//! per resolution.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use skillet_core::{
    BoxError, Contract, HandlerInputFactory, HandlerRegistry, RequestPayload, ServiceArc, erase,
};
use tracing::trace;

use crate::handler::{DefaultRequestHandler, RequestHandler};
use crate::input::DefaultHandlerInputFactory;
use crate::pipeline::{ExceptionHandler, PipelineBehavior, RequestInterceptor, ResponseInterceptor};

type Factory = Arc<dyn Fn() -> Result<ServiceArc, BoxError> + Send + Sync>;

struct Registration {
    name: &'static str,
    factories: Vec<Factory>,
}

/// Immutable, cheaply cloneable service container.
///
/// Unregistered contracts resolve to an empty list, and to `None` for
/// single-instance lookups. When several instances are registered for a
/// contract, single-instance lookups return the last one.
#[derive(Clone)]
pub struct ServiceRegistry {
    services: Arc<HashMap<TypeId, Registration>>,
}

impl ServiceRegistry {
    pub fn builder() -> ServiceRegistryBuilder {
        ServiceRegistryBuilder::new()
    }

    /// Returns the number of instances registered for `contract`.
    pub fn count(&self, contract: Contract) -> usize {
        self.services
            .get(&contract.id())
            .map_or(0, |registration| registration.factories.len())
    }
}

impl HandlerRegistry for ServiceRegistry {
    fn resolve_many(&self, contract: Contract) -> Result<Option<Vec<ServiceArc>>, BoxError> {
        let Some(registration) = self.services.get(&contract.id()) else {
            trace!(contract = contract.name(), "No registrations");
            return Ok(Some(Vec::new()));
        };

        registration
            .factories
            .iter()
            .map(|factory| factory())
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    fn resolve_one(&self, contract: Contract) -> Result<Option<ServiceArc>, BoxError> {
        self.services
            .get(&contract.id())
            .and_then(|registration| registration.factories.last())
            .map(|factory| factory())
            .transpose()
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for registration in self.services.values() {
            map.entry(&registration.name, &registration.factories.len());
        }
        map.finish()
    }
}

/// Builder for [`ServiceRegistry`].
pub struct ServiceRegistryBuilder {
    services: HashMap<TypeId, Registration>,
    default_input_factory: bool,
}

impl Default for ServiceRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceRegistryBuilder {
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
            default_input_factory: true,
        }
    }

    /// Registers a shared instance for contract `T`.
    pub fn add<T: ?Sized + Send + Sync + 'static>(self, instance: Arc<T>) -> Self {
        self.try_add_factory::<T, _>(move || Ok(Arc::clone(&instance)))
    }

    /// Registers a factory producing a fresh instance of `T` per resolution.
    pub fn add_factory<T, F>(self, factory: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn() -> Arc<T> + Send + Sync + 'static,
    {
        self.try_add_factory::<T, _>(move || Ok(factory()))
    }

    /// Registers a factory that may fail.
    ///
    /// A failure surfaces as a resolution failure for the whole contract.
    pub fn try_add_factory<T, F>(mut self, factory: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn() -> Result<Arc<T>, BoxError> + Send + Sync + 'static,
    {
        let contract = Contract::of::<T>();
        let factory: Factory = Arc::new(move || factory().map(erase));
        self.services
            .entry(contract.id())
            .or_insert_with(|| Registration {
                name: contract.name(),
                factories: Vec::new(),
            })
            .factories
            .push(factory);
        self
    }

    /// Registers a handler for payload `P`.
    pub fn handler<P, H>(self, handler: H) -> Self
    where
        P: RequestPayload,
        H: RequestHandler<P> + 'static,
    {
        self.add::<dyn RequestHandler<P>>(Arc::new(handler))
    }

    /// Registers the fallback handler.
    pub fn default_handler(self, handler: impl DefaultRequestHandler + 'static) -> Self {
        self.add::<dyn DefaultRequestHandler>(Arc::new(handler))
    }

    /// Appends a pipeline behavior. The first one added is the outermost.
    pub fn behavior(self, behavior: impl PipelineBehavior + 'static) -> Self {
        self.add::<dyn PipelineBehavior>(Arc::new(behavior))
    }

    pub fn exception_handler(self, handler: impl ExceptionHandler + 'static) -> Self {
        self.add::<dyn ExceptionHandler>(Arc::new(handler))
    }

    pub fn request_interceptor(self, interceptor: impl RequestInterceptor + 'static) -> Self {
        self.add::<dyn RequestInterceptor>(Arc::new(interceptor))
    }

    pub fn response_interceptor(self, interceptor: impl ResponseInterceptor + 'static) -> Self {
        self.add::<dyn ResponseInterceptor>(Arc::new(interceptor))
    }

    /// Replaces the factory that builds each request's handler input.
    pub fn handler_input_factory(mut self, factory: impl HandlerInputFactory + 'static) -> Self {
        self.services.remove(&TypeId::of::<dyn HandlerInputFactory>());
        self.add::<dyn HandlerInputFactory>(Arc::new(factory))
    }

    /// Skips registering [`DefaultHandlerInputFactory`] on build.
    pub fn without_default_input_factory(mut self) -> Self {
        self.default_input_factory = false;
        self
    }

    /// Finishes the registry.
    ///
    /// Registers a [`DefaultHandlerInputFactory`] unless a factory was
    /// supplied or [`without_default_input_factory`](Self::without_default_input_factory)
    /// was called.
    pub fn build(self) -> ServiceRegistry {
        let needs_factory = self.default_input_factory
            && !self
                .services
                .contains_key(&TypeId::of::<dyn HandlerInputFactory>());
        let builder = if needs_factory {
            self.add::<dyn HandlerInputFactory>(Arc::new(DefaultHandlerInputFactory::new()))
        } else {
            self
        };

        ServiceRegistry {
            services: Arc::new(builder.services),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillet_core::RegistryExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    trait Named: Send + Sync {
        fn name(&self) -> &str;
    }

    struct Fixed(&'static str);

    impl Named for Fixed {
        fn name(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn preserves_registration_order() {
        let registry = ServiceRegistry::builder()
            .add::<dyn Named>(Arc::new(Fixed("first")))
            .add::<dyn Named>(Arc::new(Fixed("second")))
            .build();

        let names: Vec<String> = registry
            .instances::<dyn Named>()
            .unwrap()
            .iter()
            .map(|named| named.name().to_string())
            .collect();
        assert_eq!(names, ["first", "second"]);

        let last = registry.instance::<dyn Named>().unwrap().unwrap();
        assert_eq!(last.name(), "second");
    }

    #[test]
    fn unregistered_contract_is_empty() {
        let registry = ServiceRegistry::builder().build();
        assert!(registry.instances::<dyn Named>().unwrap().is_empty());
        assert!(registry.instance::<dyn Named>().unwrap().is_none());
    }

    #[test]
    fn factories_run_per_resolution() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        let registry = ServiceRegistry::builder()
            .add_factory::<dyn Named, _>(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Arc::new(Fixed("fresh"))
            })
            .build();

        registry.instances::<dyn Named>().unwrap();
        registry.instances::<dyn Named>().unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failing_factory_fails_resolution() {
        let registry = ServiceRegistry::builder()
            .try_add_factory::<dyn Named, _>(|| Err("database offline".into()))
            .build();

        let err = registry.instances::<dyn Named>().err().unwrap();
        assert!(matches!(
            err,
            skillet_core::RegistrationError::ResolutionFailed { .. }
        ));
    }

    #[test]
    fn registers_default_input_factory() {
        let registry = ServiceRegistry::builder().build();
        assert_eq!(registry.count(Contract::of::<dyn HandlerInputFactory>()), 1);

        let bare = ServiceRegistry::builder()
            .without_default_input_factory()
            .build();
        assert_eq!(bare.count(Contract::of::<dyn HandlerInputFactory>()), 0);
    }
}
