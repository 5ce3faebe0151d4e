//! Core module contracts and the recognized root markers.

use axum::http::{request::Parts, StatusCode};

use crate::capability::CapabilityId;
use crate::services::ServiceRegistry;

/// Module startup contract: a module's single entry point into the shared
/// service registry. Implementers are plain types with a factory in their
/// unit manifest, discovered by capability rather than by explicit listing.
pub trait ModuleStartup: Send + Sync {
    fn configure_services(&self, services: &mut ServiceRegistry) -> anyhow::Result<()>;
}

/// Request filter contract, applied in registration order before routing.
/// The first rejection short-circuits the request.
pub trait RequestFilter: Send + Sync {
    fn name(&self) -> &'static str;
    fn on_request(&self, parts: &Parts) -> Result<(), StatusCode>;
}

/// Capability of types implementing [`ModuleStartup`].
pub const MODULE_STARTUP: CapabilityId = CapabilityId::new("quay.module_startup");

/// Root marker for service-core participation. Memberless; concrete
/// capability contracts derive from it and the registrar never registers
/// anything under the root itself.
pub const SERVICE_CORE: CapabilityId = CapabilityId::new("quay.service_core");

// Intrinsic singletons registered by the bootstrap sequencer.
pub const HOST_CONFIG: CapabilityId = CapabilityId::new("quay.host_config");
pub const I18N: CapabilityId = CapabilityId::new("quay.i18n");
pub const MAPPER: CapabilityId = CapabilityId::new("quay.mapper");
pub const API_DOCS: CapabilityId = CapabilityId::new("quay.api_docs");
