//! Ownership index
//!
//! Each connection that created Owned variables has one index: a packed list
//! of store locations, bounded by the per-connection owned cap. Entries are
//! appended on creation and removed (shifting later entries down) on
//! deletion, so the list always starts at index 0 without holes.

use std::fmt;

/// Identifier of a client connection (the owner id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnId(pub u32);

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// Position of a variable in the store: group slot + variable slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarLocation {
    pub group: usize,
    pub slot: usize,
}

/// Fixed-capacity list of locations owned by one connection
#[derive(Debug)]
pub struct OwnershipIndex {
    links: Vec<VarLocation>,
    limit: usize,
}

impl OwnershipIndex {
    pub fn new(limit: usize) -> Self {
        Self {
            links: Vec::with_capacity(limit),
            limit,
        }
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.links.len() >= self.limit
    }

    /// Record a newly created owned variable. Returns false when full.
    pub fn push(&mut self, location: VarLocation) -> bool {
        if self.is_full() {
            return false;
        }
        self.links.push(location);
        true
    }

    /// Drop the entry for `location`, keeping the list packed
    pub fn remove(&mut self, location: VarLocation) -> bool {
        match self.links.iter().position(|link| *link == location) {
            Some(pos) => {
                self.links.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn locations(&self) -> &[VarLocation] {
        &self.links
    }

    pub(crate) fn into_locations(self) -> Vec<VarLocation> {
        self.links
    }
}
