//! Type classification: which declared types participate, and how.
//!
//! A concrete type participates when it declares at least one capability
//! contract. Its registrable contract set is the declared set minus the
//! service-core root marker, preserved in declaration order.

use crate::capability::{CapabilityId, CapabilityIndex};
use crate::contracts::SERVICE_CORE;
use crate::unit::{TypeDecl, TypeKind, UnitHandle, UnitId};

/// One classified concrete type from an imported unit.
#[derive(Debug)]
pub struct ClassifiedType {
    pub unit: UnitId,
    pub decl: &'static TypeDecl,
    /// Declared contracts excluding the service-core root, in declaration
    /// order.
    pub capabilities: Vec<CapabilityId>,
    /// Whether any declared contract derives from the service-core root.
    pub service_core: bool,
}

/// Classify one unit's types. Contract declarations and capability-less
/// types are skipped; the rest come back in declaration order.
pub fn classify(unit: UnitHandle, index: &CapabilityIndex) -> Vec<ClassifiedType> {
    let mut classified = Vec::new();
    for decl in unit.types {
        if decl.kind == TypeKind::Contract {
            continue;
        }
        if decl.capabilities.is_empty() {
            continue;
        }
        let capabilities: Vec<CapabilityId> = decl
            .capabilities
            .iter()
            .copied()
            .filter(|cap| *cap != SERVICE_CORE)
            .collect();
        let service_core = decl
            .capabilities
            .iter()
            .any(|cap| index.is_service_core(*cap));
        classified.push(ClassifiedType {
            unit: unit.id(),
            decl,
            capabilities,
            service_core,
        });
    }
    classified
}
