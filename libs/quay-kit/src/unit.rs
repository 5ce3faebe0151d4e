//! Binary unit manifests and the process-wide unit catalog.
//!
//! A binary unit ships as a static [`UnitManifest`]: the unit's name, the
//! artifact it resolves from on disk, its capability contract declarations
//! and its concrete types with their factories. Manifests self-register
//! into the catalog via `inventory` (statically linked units) or are handed
//! to the bootstrap explicitly.

use std::any::Any;

use crate::capability::{CapabilityDecl, CapabilityId};
use crate::contracts::ModuleStartup;

/// Type-erased service value produced by a provider factory. Holds the
/// implementation upcast to the capability contract it was resolved under,
/// e.g. `Box::new(issuer as Arc<dyn TokenIssuer>)`.
pub type BoxedService = Box<dyn Any + Send + Sync>;

/// Factory for module-startup types. Construction failures are per-type
/// error values, never panics.
pub type ModuleFactory = fn() -> anyhow::Result<Box<dyn ModuleStartup>>;

/// Factory for service-core types. Receives the capability being resolved
/// so one concrete type can be produced under each contract it declares;
/// returns `None` for contracts it does not recognize.
pub type ServiceFactory = fn(CapabilityId) -> Option<BoxedService>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// Instantiable type; eligible for classification.
    Concrete,
    /// A contract/marker declaration, never classified as instantiable.
    Contract,
}

/// One type declared by a unit, in the unit's native declaration order.
#[derive(Debug)]
pub struct TypeDecl {
    pub type_name: &'static str,
    pub kind: TypeKind,
    /// Capability contracts this type declares, in declaration order.
    pub capabilities: &'static [CapabilityId],
    pub startup: Option<ModuleFactory>,
    pub provider: Option<ServiceFactory>,
}

/// Static descriptor of a binary unit.
#[derive(Debug)]
pub struct UnitManifest {
    pub name: &'static str,
    /// File name the unit ships as; what the loader resolves against the
    /// search paths.
    pub artifact: &'static str,
    pub capabilities: &'static [CapabilityDecl],
    pub types: &'static [TypeDecl],
}

pub type UnitHandle = &'static UnitManifest;

/// Identity of a loaded unit: the manifest's address, not any path string,
/// so one unit imported under different logical names collapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitId(usize);

impl UnitManifest {
    pub fn id(&'static self) -> UnitId {
        UnitId(self as *const UnitManifest as usize)
    }
}

/// Implemented by a unit's types to support import-by-type.
pub trait UnitSource {
    fn unit() -> UnitHandle;
}

/// Submitted by units via `inventory::submit!` for catalog discovery.
pub struct UnitRegistration(pub UnitHandle);

inventory::collect!(UnitRegistration);

/// All unit manifests known to the process.
#[derive(Debug, Default)]
pub struct UnitCatalog {
    units: Vec<UnitHandle>,
}

impl UnitCatalog {
    /// Collect every manifest submitted through `inventory`.
    pub fn discover() -> Self {
        let mut catalog = Self::default();
        for reg in inventory::iter::<UnitRegistration> {
            catalog.insert(reg.0);
        }
        catalog
    }

    pub fn with_units(units: impl IntoIterator<Item = UnitHandle>) -> Self {
        let mut catalog = Self::default();
        for unit in units {
            catalog.insert(unit);
        }
        catalog
    }

    /// Add a manifest; duplicates (by identity) are ignored.
    pub fn insert(&mut self, unit: UnitHandle) {
        if self.units.iter().any(|u| u.id() == unit.id()) {
            return;
        }
        self.units.push(unit);
    }

    pub fn by_artifact(&self, artifact: &str) -> Option<UnitHandle> {
        self.units.iter().copied().find(|u| u.artifact == artifact)
    }

    pub fn by_name(&self, name: &str) -> Option<UnitHandle> {
        self.units.iter().copied().find(|u| u.name == name)
    }

    pub fn units(&self) -> &[UnitHandle] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
