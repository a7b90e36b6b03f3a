//! Variable groups
//!
//! A group is a named bucket of variable slots. Slots grow in chunks of
//! [`SLOT_CHUNK`]; a freed slot is reused before the array grows.

use super::variable::Variable;

/// Allocation chunk for both the group table and per-group slot arrays
pub const SLOT_CHUNK: usize = 10;

/// A named bucket of variables
#[derive(Debug)]
pub struct VarGroup {
    name: String,
    slots: Vec<Option<Variable>>,
    live: usize,
}

impl VarGroup {
    /// Create an empty group with one chunk of slots
    pub(crate) fn new(name: &str) -> Self {
        let mut slots = Vec::with_capacity(SLOT_CHUNK);
        slots.resize_with(SLOT_CHUNK, || None);
        Self {
            name: name.to_string(),
            slots,
            live: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of live variables
    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Number of allocated slots (counted against the slot cap)
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Occupied slots in index order. Stops as soon as every live variable
    /// has been seen.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Variable)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|var| (index, var)))
            .take(self.live)
    }

    /// Case-insensitive lookup of a variable slot
    pub fn position(&self, name: &str) -> Option<usize> {
        self.iter()
            .find(|(_, var)| var.name.eq_ignore_ascii_case(name))
            .map(|(index, _)| index)
    }

    pub fn get(&self, slot: usize) -> Option<&Variable> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub(crate) fn get_mut(&mut self, slot: usize) -> Option<&mut Variable> {
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }

    /// Slots that `insert` would add to the capacity (0 or one chunk)
    pub(crate) fn growth_needed(&self) -> usize {
        if self.live == self.slots.len() {
            SLOT_CHUNK
        } else {
            0
        }
    }

    /// Place a variable in the first free slot, growing by one chunk when
    /// the array is full. Returns the slot index.
    pub(crate) fn insert(&mut self, var: Variable) -> usize {
        let index = match self.slots.iter().position(Option::is_none) {
            Some(index) => index,
            None => {
                let index = self.slots.len();
                self.slots.resize_with(index + SLOT_CHUNK, || None);
                index
            }
        };
        self.slots[index] = Some(var);
        self.live += 1;
        index
    }

    /// Empty a slot and return its variable
    pub(crate) fn take(&mut self, slot: usize) -> Option<Variable> {
        let var = self.slots.get_mut(slot)?.take()?;
        self.live -= 1;
        Some(var)
    }
}
