//! Import tracker: which binary units are already loaded.

use std::collections::HashSet;

use crate::unit::{UnitHandle, UnitId};

/// Insertion-ordered set of imported units, keyed by unit identity.
/// Mutated only during bootstrap; grows for the life of the host.
#[derive(Debug, Default)]
pub struct ImportTracker {
    order: Vec<UnitHandle>,
    seen: HashSet<UnitId>,
}

impl ImportTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a unit as imported. Returns true when newly added, false when
    /// the unit was already tracked (a no-op re-import).
    pub fn track(&mut self, unit: UnitHandle) -> bool {
        if !self.seen.insert(unit.id()) {
            return false;
        }
        self.order.push(unit);
        true
    }

    pub fn contains(&self, unit: UnitHandle) -> bool {
        self.seen.contains(&unit.id())
    }

    /// Units in import order.
    pub fn iter(&self) -> impl Iterator<Item = UnitHandle> + '_ {
        self.order.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
