//! Capability identifiers and the capability index.
//!
//! A capability contract is a pure marker: types are discovered by which
//! contracts they declare, never by name. Contracts may derive from the
//! service-core root marker; the index records that parentage across all
//! imported units so the classifier can resolve participation.

use std::collections::HashMap;
use std::fmt;

use crate::contracts::SERVICE_CORE;
use crate::unit::UnitManifest;

/// Identifier of a capability contract. Compared by name, so two units can
/// reference the same contract without sharing a type.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CapabilityId(&'static str);

impl CapabilityId {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub const fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl fmt::Debug for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CapabilityId({})", self.0)
    }
}

/// Declaration of a capability contract inside a unit manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityDecl {
    pub id: CapabilityId,
    /// Contract this one derives from, usually [`SERVICE_CORE`].
    pub parent: Option<CapabilityId>,
}

impl CapabilityDecl {
    pub const fn new(id: CapabilityId) -> Self {
        Self { id, parent: None }
    }

    pub const fn derives(id: CapabilityId, parent: CapabilityId) -> Self {
        Self {
            id,
            parent: Some(parent),
        }
    }
}

/// Parentage of every capability contract declared by the imported units.
#[derive(Debug, Default)]
pub struct CapabilityIndex {
    parents: HashMap<CapabilityId, Option<CapabilityId>>,
}

impl CapabilityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the contract declarations of one unit. A re-declaration of a
    /// known contract with a different parent is kept first-writer-wins and
    /// logged; contract identity is global.
    pub fn absorb(&mut self, unit: &UnitManifest) {
        for decl in unit.capabilities {
            match self.parents.get(&decl.id) {
                Some(existing) if *existing != decl.parent => {
                    tracing::warn!(
                        capability = %decl.id,
                        unit = unit.name,
                        "conflicting capability parent declaration ignored"
                    );
                }
                Some(_) => {}
                None => {
                    self.parents.insert(decl.id, decl.parent);
                }
            }
        }
    }

    /// Whether `cap` is the service-core root marker or derives from it
    /// through its declared parent chain.
    pub fn is_service_core(&self, cap: CapabilityId) -> bool {
        if cap == SERVICE_CORE {
            return true;
        }
        let mut current = cap;
        // Parent chains are declared data; cap the walk to stay total even
        // if a manifest declares a cycle.
        for _ in 0..16 {
            match self.parents.get(&current) {
                Some(Some(parent)) => {
                    if *parent == SERVICE_CORE {
                        return true;
                    }
                    current = *parent;
                }
                _ => return false,
            }
        }
        false
    }

    pub fn contains(&self, cap: CapabilityId) -> bool {
        self.parents.contains_key(&cap)
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}
