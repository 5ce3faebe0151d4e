//! Shared service registry: capability-keyed service registrations.
//!
//! Registrations are keyed by capability contract. A later registration for
//! the same contract shadows the earlier one, matching container semantics
//! where the most recent registration is the one resolved.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::capability::CapabilityId;
use crate::unit::{BoxedService, ServiceFactory};

/// Lifetime of a registered service. `Scoped` resolves like `Transient`
/// in this single-container host; it is kept distinct so registrations
/// carry the declared intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    Transient,
    Scoped,
    Singleton,
}

/// How a registration produces its service value.
pub enum Provider {
    /// A shared instance, handed out as-is.
    Instance(Arc<dyn Any + Send + Sync>),
    /// A factory invoked per resolution.
    Factory(ServiceFactory),
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Instance(_) => f.write_str("Provider::Instance"),
            Provider::Factory(_) => f.write_str("Provider::Factory"),
        }
    }
}

#[derive(Debug)]
pub struct ServiceRegistration {
    pub impl_type: &'static str,
    pub lifetime: Lifetime,
    pub provider: Provider,
}

/// Capability-keyed service registrations, populated during bootstrap and
/// frozen behind an `Arc` once the host reaches ready.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    entries: HashMap<CapabilityId, ServiceRegistration>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under a capability contract. An existing
    /// registration for the same contract is shadowed.
    pub fn register_factory(
        &mut self,
        cap: CapabilityId,
        impl_type: &'static str,
        lifetime: Lifetime,
        factory: ServiceFactory,
    ) {
        if let Some(previous) = self.entries.get(&cap) {
            tracing::debug!(
                capability = %cap,
                previous = previous.impl_type,
                replacement = impl_type,
                "service registration shadowed"
            );
        }
        self.entries.insert(
            cap,
            ServiceRegistration {
                impl_type,
                lifetime,
                provider: Provider::Factory(factory),
            },
        );
    }

    /// Register a shared instance under a capability contract.
    pub fn register_instance<T: Any + Send + Sync>(&mut self, cap: CapabilityId, instance: Arc<T>) {
        if let Some(previous) = self.entries.get(&cap) {
            tracing::debug!(
                capability = %cap,
                previous = previous.impl_type,
                replacement = type_name::<T>(),
                "service registration shadowed"
            );
        }
        self.entries.insert(
            cap,
            ServiceRegistration {
                impl_type: type_name::<T>(),
                lifetime: Lifetime::Singleton,
                provider: Provider::Instance(instance),
            },
        );
    }

    /// Resolve the service registered under `cap` as `T`. For instance
    /// registrations `T` is the registered `Arc<T>`'s inner type cloned out;
    /// for factory registrations `T` is the erased value the factory
    /// produces for this contract, typically an `Arc<dyn Contract>`.
    pub fn resolve<T: Any + Send + Sync + Clone>(&self, cap: CapabilityId) -> Option<T> {
        match &self.entries.get(&cap)?.provider {
            Provider::Instance(instance) => instance.downcast_ref::<T>().cloned(),
            Provider::Factory(factory) => {
                let boxed: BoxedService = factory(cap)?;
                boxed.downcast::<T>().ok().map(|b| *b)
            }
        }
    }

    pub fn registration(&self, cap: CapabilityId) -> Option<&ServiceRegistration> {
        self.entries.get(&cap)
    }

    pub fn contains(&self, cap: CapabilityId) -> bool {
        self.entries.contains_key(&cap)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
