//! # Quay Kit - Capability-Driven Host Composition
//!
//! A unified crate for composing a host out of binary units with declarative
//! capability contracts.
//!
//! ## Features
//!
//! - **Declarative**: Units ship static [`UnitManifest`] descriptors
//! - **Auto-discovery**: Manifests are discovered via inventory
//! - **Capability-based**: Types are found by contract, never by name
//! - **Phase-based bootstrap**: config → i18n → logging → paths → init →
//!   imports → services → pipeline → ready
//!
//! ## Basic Unit Example
//!
//! ```rust,ignore
//! use quay_kit::{
//!     CapabilityDecl, CapabilityId, TypeDecl, TypeKind, UnitManifest,
//!     UnitRegistration, SERVICE_CORE,
//! };
//!
//! pub const TOKEN_ISSUER: CapabilityId = CapabilityId::new("auth.token_issuer");
//!
//! pub static UNIT: UnitManifest = UnitManifest {
//!     name: "token_auth",
//!     artifact: "token_auth.bin",
//!     capabilities: &[CapabilityDecl::derives(TOKEN_ISSUER, SERVICE_CORE)],
//!     types: &[TypeDecl {
//!         type_name: "BearerTokens",
//!         kind: TypeKind::Concrete,
//!         capabilities: &[TOKEN_ISSUER],
//!         startup: None,
//!         provider: Some(bearer_provider),
//!     }],
//! };
//!
//! inventory::submit!(UnitRegistration(&UNIT));
//! ```

pub use anyhow::Result;

// Re-export inventory for unit manifests
pub use inventory;

pub mod capability;
pub mod classifier;
pub mod contracts;
pub mod loader;
pub mod pipeline;
pub mod registrar;
pub mod runtime;
pub mod services;
pub mod tracker;
pub mod unit;

pub use capability::{CapabilityDecl, CapabilityId, CapabilityIndex};
pub use classifier::{classify, ClassifiedType};
pub use contracts::{
    ModuleStartup, RequestFilter, API_DOCS, HOST_CONFIG, I18N, MAPPER, MODULE_STARTUP,
    SERVICE_CORE,
};
pub use loader::{LoadError, UnitLoader};
pub use pipeline::{ApiDocs, CorsMode, MapperRegistry, RequestLogFilter};
pub use registrar::{ModuleError, RegistrarReport};
pub use runtime::{BootstrapCtx, Host, HostBootstrap, HostError, Phase};
pub use services::{Lifetime, Provider, ServiceRegistration, ServiceRegistry};
pub use tracker::ImportTracker;
pub use unit::{
    BoxedService, ModuleFactory, ServiceFactory, TypeDecl, TypeKind, UnitCatalog, UnitHandle,
    UnitId, UnitManifest, UnitRegistration, UnitSource,
};
