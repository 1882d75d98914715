//! Handler registry capability.
//!
//! The dispatch core never constructs handlers itself. It asks a
//! [`HandlerRegistry`] for instances of a *contract*: a trait-object type
//! such as `dyn RequestHandler<IntentRequest>`. Instances travel type-erased
//! as [`ServiceArc`], an `Arc<dyn Any>` wrapping an `Arc<dyn Contract>`, and
//! are recovered with the typed helpers on [`RegistryExt`].
//!
//! ```rust,ignore
//! let handlers = registry.instances::<dyn RequestHandler<IntentRequest>>()?;
//! let fallback = registry.instance::<dyn DefaultRequestHandler>()?;
//! ```

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::sync::Arc;

use crate::error::{BoxError, RegistrationError};

/// A type-erased registered instance.
///
/// The inner value is always an `Arc<T>` where `T` is the contract type.
pub type ServiceArc = Arc<dyn Any + Send + Sync>;

/// Stable identifier of a contract type.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Contract {
    id: TypeId,
    name: &'static str,
}

impl Contract {
    /// Returns the contract identifier of `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Contract").field(&self.name).finish()
    }
}

impl fmt::Display for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Resolves contract types to registered instances.
///
/// Both operations may fail. `Ok(None)` means the registry has no answer for
/// the contract at all, which callers treat differently from a failure.
pub trait HandlerRegistry: Send + Sync {
    /// Returns every instance registered for `contract`, in registration order.
    fn resolve_many(&self, contract: Contract) -> Result<Option<Vec<ServiceArc>>, BoxError>;

    /// Returns the single instance registered for `contract`, if any.
    fn resolve_one(&self, contract: Contract) -> Result<Option<ServiceArc>, BoxError>;
}

/// Typed helpers over [`HandlerRegistry`].
pub trait RegistryExt {
    /// Resolves all instances of `T`.
    ///
    /// Fails with [`RegistrationError::NotRegistered`] if the registry returns
    /// nothing at all; an empty list is a valid answer.
    fn instances<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Vec<Arc<T>>, RegistrationError>;

    /// Resolves the single instance of `T`, if one is registered.
    fn instance<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Option<Arc<T>>, RegistrationError>;
}

impl<R: HandlerRegistry + ?Sized> RegistryExt for R {
    fn instances<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Vec<Arc<T>>, RegistrationError> {
        let contract = Contract::of::<T>();
        let services = self
            .resolve_many(contract)
            .map_err(|source| RegistrationError::ResolutionFailed {
                contract: contract.name(),
                source,
            })?
            .ok_or(RegistrationError::NotRegistered {
                contract: contract.name(),
            })?;

        services.iter().map(|service| downcast::<T>(service, contract)).collect()
    }

    fn instance<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Option<Arc<T>>, RegistrationError> {
        let contract = Contract::of::<T>();
        let service = self
            .resolve_one(contract)
            .map_err(|source| RegistrationError::ResolutionFailed {
                contract: contract.name(),
                source,
            })?;

        service.as_ref().map(|service| downcast::<T>(service, contract)).transpose()
    }
}

/// Wraps an instance for storage in a registry.
pub fn erase<T: ?Sized + Send + Sync + 'static>(instance: Arc<T>) -> ServiceArc {
    Arc::new(instance)
}

fn downcast<T: ?Sized + Send + Sync + 'static>(
    service: &ServiceArc,
    contract: Contract,
) -> Result<Arc<T>, RegistrationError> {
    service
        .downcast_ref::<Arc<T>>()
        .cloned()
        .ok_or(RegistrationError::TypeMismatch {
            contract: contract.name(),
        })
}
