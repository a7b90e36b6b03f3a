//! Store state
//!
//! Everything in here runs with the global store lock held: the group table,
//! quota counters, ownership indices and the cache registry are plain fields
//! of one struct guarded by a single mutex in [`super::VarStore`].

use std::collections::HashMap;

use crate::cache::CacheRegistry;
use crate::error::{Result, VarError};
use super::group::{VarGroup, SLOT_CHUNK};
use super::ownership::{ConnId, OwnershipIndex, VarLocation};
use super::variable::{Value, VarFlags, VarId, Variable};

/// Quota limits, fixed after startup
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub max_vars: usize,
    pub max_var_bytes: usize,
    pub max_owned: usize,
}

/// Result of a group + variable lookup
#[derive(Debug, Clone, Copy)]
pub(crate) struct Found {
    pub group: Option<usize>,
    pub location: Option<VarLocation>,
}

#[derive(Debug)]
pub(crate) struct StoreState {
    groups: Vec<Option<VarGroup>>,
    live_groups: usize,
    /// Allocated (not live) variable slots across all groups
    slot_capacity: usize,
    /// Summed length of live String/Array values
    payload_bytes: usize,
    owners: HashMap<ConnId, OwnershipIndex>,
    pub(crate) caches: CacheRegistry,
    next_var: u64,
    pub(crate) limits: Limits,
}

impl StoreState {
    pub(crate) fn new(limits: Limits) -> Self {
        Self {
            groups: Vec::new(),
            live_groups: 0,
            slot_capacity: 0,
            payload_bytes: 0,
            owners: HashMap::new(),
            caches: CacheRegistry::default(),
            next_var: 1,
            limits,
        }
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Live groups in table order, stopping once all have been seen
    pub(crate) fn live_groups(&self) -> impl Iterator<Item = (usize, &VarGroup)> {
        self.groups
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|group| (index, group)))
            .take(self.live_groups)
    }

    /// Case-insensitive lookup of a group and, when `name` is given, a
    /// variable inside it
    pub(crate) fn find(&self, group: &str, name: Option<&str>) -> Found {
        let group_index = self
            .live_groups()
            .find(|(_, g)| g.name().eq_ignore_ascii_case(group))
            .map(|(index, _)| index);

        let location = match (group_index, name) {
            (Some(index), Some(name)) => self
                .group(index)
                .and_then(|g| g.position(name))
                .map(|slot| VarLocation { group: index, slot }),
            _ => None,
        };

        Found {
            group: group_index,
            location,
        }
    }

    pub(crate) fn group(&self, index: usize) -> Option<&VarGroup> {
        self.groups.get(index).and_then(Option::as_ref)
    }

    pub(crate) fn var(&self, location: VarLocation) -> Option<&Variable> {
        self.group(location.group)?.get(location.slot)
    }

    pub(crate) fn var_mut(&mut self, location: VarLocation) -> Option<&mut Variable> {
        self.groups
            .get_mut(location.group)
            .and_then(Option::as_mut)?
            .get_mut(location.slot)
    }

    // =========================================================================
    // Quotas
    // =========================================================================

    /// Slot cap and, for owned variables, the per-connection cap
    pub(crate) fn check_create(&self, conn: ConnId, flags: VarFlags) -> Result<()> {
        if self.slot_capacity >= self.limits.max_vars {
            return Err(VarError::QuotaExceeded(format!(
                "slot cap of {} reached",
                self.limits.max_vars
            )));
        }
        if flags.owned && self.owned_count(conn) >= self.limits.max_owned {
            return Err(VarError::QuotaExceeded(format!(
                "{} already owns {} variables",
                conn, self.limits.max_owned
            )));
        }
        Ok(())
    }

    /// Byte cap for replacing a payload of `old_len` bytes by `new_len` bytes
    pub(crate) fn check_payload(&self, old_len: usize, new_len: usize) -> Result<()> {
        let max = self.limits.max_var_bytes;
        if new_len > max / 4 {
            return Err(VarError::QuotaExceeded(format!(
                "value of {} bytes exceeds single-value limit of {}",
                new_len,
                max / 4
            )));
        }
        if self.payload_bytes - old_len + new_len > max {
            return Err(VarError::QuotaExceeded(format!(
                "byte cap of {} reached",
                max
            )));
        }
        Ok(())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Create a variable, creating its group first when `group` is None.
    /// All checks run before anything is touched.
    pub(crate) fn create(
        &mut self,
        conn: ConnId,
        group: Option<usize>,
        group_name: &str,
        name: &str,
        flags: VarFlags,
        value: Value,
    ) -> Result<VarLocation> {
        self.check_create(conn, flags)?;
        self.check_payload(0, value.payload_len())?;

        let group_index = match group {
            Some(index) if self.group(index).is_some() => index,
            Some(_) => return Err(VarError::NotFound),
            None => self.insert_group(group_name),
        };

        let id = VarId(self.next_var);
        self.next_var += 1;
        let payload_len = value.payload_len();

        let group = self.groups[group_index]
            .as_mut()
            .ok_or(VarError::NotFound)?;
        self.slot_capacity += group.growth_needed();
        let slot = group.insert(Variable::new(id, name, flags, conn, value));
        self.payload_bytes += payload_len;

        let location = VarLocation {
            group: group_index,
            slot,
        };
        if flags.owned {
            let limit = self.limits.max_owned;
            let recorded = self
                .owners
                .entry(conn)
                .or_insert_with(|| OwnershipIndex::new(limit))
                .push(location);
            // check_create refused the create when the index was full
            debug_assert!(recorded, "ownership index of {} overflowed", conn);
        }

        tracing::trace!(group = group_name, var = name, ?location, owned = flags.owned, "variable created");
        Ok(location)
    }

    /// Claim a group table slot: first free slot, else grow the table
    fn insert_group(&mut self, name: &str) -> usize {
        let index = match self.groups.iter().position(Option::is_none) {
            Some(index) => index,
            None => {
                let index = self.groups.len();
                self.groups.resize_with(index + SLOT_CHUNK, || None);
                index
            }
        };
        let group = VarGroup::new(name);
        self.slot_capacity += group.capacity();
        self.groups[index] = Some(group);
        self.live_groups += 1;

        tracing::debug!(group = name, index, "group created");
        index
    }

    /// Replace a variable's value, keeping the byte counter exact
    pub(crate) fn assign(&mut self, location: VarLocation, value: Value) {
        let new_len = value.payload_len();
        if let Some(var) = self.var_mut(location) {
            let old_len = var.value.payload_len();
            var.assign(value);
            self.payload_bytes = self.payload_bytes - old_len + new_len;
        }
    }

    /// Delete one variable. Destroys its group when it was the last member.
    pub(crate) fn delete(&mut self, location: VarLocation) -> bool {
        let Some(group) = self.groups.get_mut(location.group).and_then(Option::as_mut) else {
            return false;
        };
        let Some(var) = group.take(location.slot) else {
            return false;
        };
        let emptied = group.live_count() == 0;
        let capacity = group.capacity();

        self.payload_bytes -= var.value.payload_len();
        self.caches.invalidate(var.id);

        if let Some(owner) = var.owner {
            if let Some(index) = self.owners.get_mut(&owner) {
                index.remove(location);
                if index.is_empty() {
                    self.owners.remove(&owner);
                }
            }
        }

        if emptied {
            if let Some(group) = self.groups[location.group].take() {
                tracing::debug!(group = group.name(), index = location.group, "group destroyed");
            }
            self.slot_capacity -= capacity;
            self.live_groups -= 1;
        }
        true
    }

    /// Delete every variable of a group in slot order. The group itself is
    /// gone once this returns.
    pub(crate) fn delete_group(&mut self, group: usize) -> usize {
        let slots: Vec<usize> = match self.group(group) {
            Some(g) => g.iter().map(|(slot, _)| slot).collect(),
            None => return 0,
        };
        slots
            .into_iter()
            .filter(|&slot| self.delete(VarLocation { group, slot }))
            .count()
    }

    /// Delete everything `conn` owns and discard its ownership index
    pub(crate) fn release(&mut self, conn: ConnId) -> usize {
        let Some(index) = self.owners.remove(&conn) else {
            return 0;
        };
        index
            .into_locations()
            .into_iter()
            .filter(|&location| {
                self.var(location)
                    .is_some_and(|var| var.owner == Some(conn))
                    && self.delete(location)
            })
            .count()
    }

    /// Tear down every group and free the table
    pub(crate) fn clear(&mut self) {
        let groups: Vec<usize> = self.live_groups().map(|(index, _)| index).collect();
        for group in groups {
            self.delete_group(group);
        }
        self.groups = Vec::new();
        self.owners.clear();
        self.caches.clear_all();
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub(crate) fn owned_count(&self, conn: ConnId) -> usize {
        self.owners.get(&conn).map_or(0, OwnershipIndex::len)
    }

    pub(crate) fn owned_locations(&self, conn: ConnId) -> Vec<VarLocation> {
        self.owners
            .get(&conn)
            .map(|index| index.locations().to_vec())
            .unwrap_or_default()
    }

    pub(crate) fn live_group_count(&self) -> usize {
        self.live_groups
    }

    pub(crate) fn slot_capacity(&self) -> usize {
        self.slot_capacity
    }

    pub(crate) fn payload_bytes(&self) -> usize {
        self.payload_bytes
    }
}
