//! Store Module
//!
//! The process-wide shared-variable store.
//!
//! ## Responsibilities
//! - Group table and per-group variable slots (chunked, slot reuse first)
//! - Slot cap, byte cap and per-connection owned cap
//! - Read/write access control for Owned variables
//! - Ownership index per connection, released on disconnect
//! - Last-value cache refresh and invalidation
//!
//! ## Concurrency Model: one global lock
//!
//! A single [`parking_lot::Mutex`] guards the whole [`StoreState`]: group
//! table, slot arrays, variables, ownership indices, quota counters and the
//! cache registry. Every public operation is one critical section, so all
//! operations are linearizable. No I/O happens while the lock is held.

mod group;
mod ownership;
mod state;
mod variable;

use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use crate::cache::WorkerCache;
use crate::config::Config;
use crate::error::{Result, VarError};

pub use group::{VarGroup, SLOT_CHUNK};
pub use ownership::{ConnId, OwnershipIndex, VarLocation};
pub use state::Limits;
pub use variable::{Value, VarFlags, VarId, VarType, Variable};

use state::StoreState;

/// Number of bytes of an Array value shown in a LIST preview
pub const ARRAY_PREVIEW_LEN: usize = 5;

/// The requesting side of an operation: its connection and its worker cache
#[derive(Debug, Clone, Copy)]
pub struct Caller<'a> {
    pub conn: ConnId,
    pub cache: &'a WorkerCache,
}

impl<'a> Caller<'a> {
    pub fn new(conn: ConnId, cache: &'a WorkerCache) -> Self {
        Self { conn, cache }
    }
}

/// Outcome of a successful SET
#[derive(Debug, Clone, PartialEq)]
pub struct SetOutcome {
    /// The variable did not exist before this SET
    pub created: bool,
    /// Value before the write; only filled when requested and the variable
    /// already existed
    pub previous: Option<Value>,
}

/// One variable in a value listing
#[derive(Debug, Clone, PartialEq)]
pub struct ListEntry {
    pub name: String,
    pub var_type: VarType,
    /// At most `max_value_len` bytes of the value text
    pub preview: Vec<u8>,
}

/// Snapshot of the store counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub groups: usize,
    pub variables: usize,
    pub slot_capacity: usize,
    pub payload_bytes: usize,
}

/// Shared-variable store
pub struct VarStore {
    state: Mutex<StoreState>,
    next_conn: AtomicU32,
}

impl VarStore {
    /// Create an empty store with the quotas from `config`
    pub fn new(config: &Config) -> Self {
        Self::with_limits(Limits {
            max_vars: config.max_vars,
            max_var_bytes: config.max_var_bytes,
            max_owned: config.max_owned_per_connection,
        })
    }

    pub fn with_limits(limits: Limits) -> Self {
        Self {
            state: Mutex::new(StoreState::new(limits)),
            next_conn: AtomicU32::new(1),
        }
    }

    /// Set the slot and byte caps. Startup only: `&mut self` guarantees no
    /// other thread can reach the store yet.
    pub fn init_quotas(&mut self, max_vars: usize, max_var_bytes: usize) {
        let limits = &mut self.state.get_mut().limits;
        limits.max_vars = max_vars;
        limits.max_var_bytes = max_var_bytes;
    }

    /// Current quota limits
    pub fn limits(&self) -> Limits {
        self.state.lock().limits
    }

    // =========================================================================
    // Connections and Workers
    // =========================================================================

    /// Hand out a fresh owner id for a new connection
    pub fn open_connection(&self) -> ConnId {
        let conn = ConnId(self.next_conn.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(%conn, "connection opened");
        conn
    }

    /// Create a worker cache that store deletions can invalidate
    pub fn register_worker(&self) -> WorkerCache {
        let cache = WorkerCache::new();
        self.state.lock().caches.register(&cache);
        cache
    }

    /// Delete every Owned variable of `conn` and drop its ownership index.
    /// Returns the number of variables deleted.
    pub fn release_connection(&self, conn: ConnId) -> usize {
        let released = self.state.lock().release(conn);
        if released > 0 {
            tracing::debug!(%conn, released, "released owned variables");
        }
        released
    }

    /// Tear down every group. The store stays usable (and empty) afterwards.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        let groups = state.live_group_count();
        state.clear();
        tracing::info!(groups, "variable store shut down");
    }

    // =========================================================================
    // Variable Operations
    // =========================================================================

    /// Write a value, creating the variable (and its group) when absent and
    /// `flags.create_if_missing` is set.
    ///
    /// Check order: existence/create permission, slot cap, type stability,
    /// write access, byte cap. A failure leaves the store untouched.
    pub fn set(
        &self,
        caller: Caller<'_>,
        group: &str,
        name: &str,
        value: Value,
        flags: VarFlags,
        return_previous: bool,
    ) -> Result<SetOutcome> {
        check_names(group, Some(name))?;

        let mut state = self.state.lock();
        let found = state.find(group, Some(name));

        let (location, outcome) = match found.location {
            Some(location) => {
                let var = state.var(location).ok_or(VarError::NotFound)?;
                if var.value.var_type() != value.var_type() {
                    return Err(VarError::TypeMismatch);
                }
                if var.write_denied(caller.conn) {
                    return Err(VarError::WriteDenied);
                }
                let old_len = var.value.payload_len();
                let previous = return_previous.then(|| var.value.clone());

                state.check_payload(old_len, value.payload_len())?;
                state.assign(location, value);
                (
                    location,
                    SetOutcome {
                        created: false,
                        previous,
                    },
                )
            }
            None => {
                if !flags.create_if_missing {
                    return Err(VarError::NotFound);
                }
                let location = state.create(caller.conn, found.group, group, name, flags, value)?;
                (
                    location,
                    SetOutcome {
                        created: true,
                        previous: None,
                    },
                )
            }
        };

        if let Some(var) = state.var(location) {
            caller.cache.replace(var.id, var.value.clone());
        }
        Ok(outcome)
    }

    /// Read a value
    pub fn get(&self, conn: ConnId, group: &str, name: &str) -> Result<Value> {
        check_names(group, Some(name))?;

        let state = self.state.lock();
        let location = state
            .find(group, Some(name))
            .location
            .ok_or(VarError::NotFound)?;
        let var = state.var(location).ok_or(VarError::NotFound)?;
        if var.read_denied(conn) {
            return Err(VarError::ReadDenied);
        }
        Ok(var.value.clone())
    }

    /// Add one to an integer variable. Returns the previous value when
    /// `return_previous` is set, the new value otherwise.
    pub fn increment(
        &self,
        caller: Caller<'_>,
        group: &str,
        name: &str,
        flags: VarFlags,
        return_previous: bool,
    ) -> Result<Value> {
        self.step(caller, group, name, 1, flags, return_previous)
    }

    /// Subtract one from an integer variable, see [`VarStore::increment`]
    pub fn decrement(
        &self,
        caller: Caller<'_>,
        group: &str,
        name: &str,
        flags: VarFlags,
        return_previous: bool,
    ) -> Result<Value> {
        self.step(caller, group, name, -1, flags, return_previous)
    }

    fn step(
        &self,
        caller: Caller<'_>,
        group: &str,
        name: &str,
        delta: i64,
        flags: VarFlags,
        return_previous: bool,
    ) -> Result<Value> {
        check_names(group, Some(name))?;

        let mut state = self.state.lock();
        let found = state.find(group, Some(name));

        let location = match found.location {
            Some(location) => location,
            None if flags.create_if_missing => {
                state.create(caller.conn, found.group, group, name, flags, Value::Integer(0))?
            }
            None => return Err(VarError::NotFound),
        };

        let var = state.var_mut(location).ok_or(VarError::NotFound)?;
        // Float is Numeric too, but only integers step
        let current = match var.value {
            Value::Integer(n) => n,
            _ => return Err(VarError::TypeMismatch),
        };
        if var.write_denied(caller.conn) {
            return Err(VarError::WriteDenied);
        }

        let next = current.wrapping_add(delta);
        var.value = Value::Integer(next);
        caller.cache.replace(var.id, var.value.clone());

        Ok(Value::Integer(if return_previous { current } else { next }))
    }

    /// Delete one variable
    pub fn delete(&self, group: &str, name: &str) -> Result<()> {
        check_names(group, Some(name))?;

        let mut state = self.state.lock();
        let location = state
            .find(group, Some(name))
            .location
            .ok_or(VarError::NotFound)?;
        state.delete(location);
        Ok(())
    }

    /// Delete a whole group. Returns the number of variables deleted.
    pub fn delete_group(&self, group: &str) -> Result<usize> {
        check_names(group, None)?;

        let mut state = self.state.lock();
        let index = state.find(group, None).group.ok_or(VarError::NotFound)?;
        let deleted = state.delete_group(index);
        tracing::debug!(group, deleted, "group deleted");
        Ok(deleted)
    }

    // =========================================================================
    // Listings
    // =========================================================================

    /// Names of all live groups in table order
    pub fn list_groups(&self) -> Vec<String> {
        self.state
            .lock()
            .live_groups()
            .map(|(_, group)| group.name().to_string())
            .collect()
    }

    /// Names of every variable in a group. Discloses no values, so no
    /// access filtering applies.
    pub fn list_names(&self, group: &str) -> Result<Vec<String>> {
        check_names(group, None)?;

        let state = self.state.lock();
        let index = state.find(group, None).group.ok_or(VarError::NotFound)?;
        let group = state.group(index).ok_or(VarError::NotFound)?;
        Ok(group.iter().map(|(_, var)| var.name.clone()).collect())
    }

    /// Readable variables of a group with up to `max_value_len` bytes of
    /// each value. Array values show at most [`ARRAY_PREVIEW_LEN`] bytes.
    pub fn list_values(&self, conn: ConnId, group: &str, max_value_len: usize) -> Result<Vec<ListEntry>> {
        check_names(group, None)?;

        let state = self.state.lock();
        let index = state.find(group, None).group.ok_or(VarError::NotFound)?;
        let group = state.group(index).ok_or(VarError::NotFound)?;

        Ok(group
            .iter()
            .filter(|(_, var)| !var.read_denied(conn))
            .map(|(_, var)| {
                let var_type = var.value.var_type();
                let limit = match var_type {
                    VarType::Array => max_value_len.min(ARRAY_PREVIEW_LEN),
                    _ => max_value_len,
                };
                let text = var.value.text();
                ListEntry {
                    name: var.name.clone(),
                    var_type,
                    preview: text[..text.len().min(limit)].to_vec(),
                }
            })
            .collect())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Snapshot of the counters
    pub fn stats(&self) -> StoreStats {
        let state = self.state.lock();
        StoreStats {
            groups: state.live_group_count(),
            variables: state.live_groups().map(|(_, g)| g.live_count()).sum(),
            slot_capacity: state.slot_capacity(),
            payload_bytes: state.payload_bytes(),
        }
    }

    /// Number of Owned variables currently held by `conn`
    pub fn owned_count(&self, conn: ConnId) -> usize {
        self.state.lock().owned_count(conn)
    }

    /// Ownership index entries of `conn`, in creation order
    pub fn owned_locations(&self, conn: ConnId) -> Vec<VarLocation> {
        self.state.lock().owned_locations(conn)
    }

    /// Summed length of live String/Array values, recomputed from scratch
    pub fn recount_payload_bytes(&self) -> usize {
        self.state
            .lock()
            .live_groups()
            .flat_map(|(_, group)| group.iter().map(|(_, var)| var.value.payload_len()))
            .sum()
    }
}

impl Default for VarStore {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

fn check_names(group: &str, name: Option<&str>) -> Result<()> {
    if group.is_empty() {
        return Err(VarError::malformed("empty group name"));
    }
    if name.is_some_and(str::is_empty) {
        return Err(VarError::malformed("empty variable name"));
    }
    Ok(())
}
