//! # Skillet Framework
//!
//! Type-routed request dispatch for voice skills.
//!
//! This layer provides:
//! - [`SkillMediator`]: admission check and routing by payload type
//! - [`HandlerDispatcher`]: per-payload handler selection wrapped in a
//!   pipeline of [`PipelineBehavior`]s
//! - [`DispatcherCache`]: one lazily built dispatcher per payload type
//! - Built-in behaviors for exception handling and request/response
//!   interception
//! - [`ServiceRegistry`]: a small in-memory [`HandlerRegistry`]
//! - Default collaborators: [`DefaultHandlerInputFactory`],
//!   [`DefaultAttributesManager`] and [`DefaultResponseBuilder`]
//!
//! [`HandlerRegistry`]: skillet_core::HandlerRegistry

pub mod attributes;
pub mod cache;
pub mod dispatcher;
pub mod handler;
pub mod input;
pub mod mediator;
pub mod pipeline;
pub mod registry;
pub mod response;

#[cfg(test)]
pub(crate) mod testing;

pub use attributes::DefaultAttributesManager;
pub use cache::DispatcherCache;
pub use dispatcher::{DispatcherFactory, HandlerDispatcher, PayloadCatalog, RequestDispatcher};
pub use handler::{DefaultRequestHandler, RequestHandler};
pub use input::DefaultHandlerInputFactory;
pub use mediator::{Mediator, SkillMediator, SkillOptions};
pub use pipeline::{
    ExceptionBehavior, ExceptionHandler, Next, PipelineBehavior, RequestInterceptor,
    RequestInterceptorBehavior, ResponseInterceptor, ResponseInterceptorBehavior,
};
pub use registry::{ServiceRegistry, ServiceRegistryBuilder};
pub use response::{DefaultResponseBuilder, normalize_ssml};
