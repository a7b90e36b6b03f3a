//! Last-value cache
//!
//! Every worker owns one [`WorkerCache`] holding the value of the variable it
//! most recently wrote through SET/INC/DEC. The store keeps weak handles to
//! all worker caches so that deleting a variable (from any worker, under the
//! global store lock) clears every cache entry that still refers to it.
//!
//! Lock order is always store lock → cache cell. The owning worker reads its
//! cell without touching the store lock.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::store::{Value, VarId};

#[derive(Debug)]
pub(crate) struct CachedValue {
    var: VarId,
    value: Value,
}

type CacheCell = Mutex<Option<CachedValue>>;

/// One-slot cache of the last value written on a worker
#[derive(Debug)]
pub struct WorkerCache {
    cell: Arc<CacheCell>,
}

impl WorkerCache {
    pub(crate) fn new() -> Self {
        Self {
            cell: Arc::new(Mutex::new(None)),
        }
    }

    /// The last value this worker wrote, unless that variable was deleted since
    pub fn last_value(&self) -> Option<Value> {
        self.cell.lock().as_ref().map(|cached| cached.value.clone())
    }

    pub(crate) fn replace(&self, var: VarId, value: Value) {
        *self.cell.lock() = Some(CachedValue { var, value });
    }

    fn downgrade(&self) -> Weak<CacheCell> {
        Arc::downgrade(&self.cell)
    }
}

/// Weak handles to every live worker cache
#[derive(Debug, Default)]
pub(crate) struct CacheRegistry {
    cells: Vec<Weak<CacheCell>>,
}

impl CacheRegistry {
    pub(crate) fn register(&mut self, cache: &WorkerCache) {
        self.cells.retain(|cell| cell.strong_count() > 0);
        self.cells.push(cache.downgrade());
    }

    /// Clear every cache entry referring to `var`
    pub(crate) fn invalidate(&mut self, var: VarId) {
        self.cells.retain(|weak| match weak.upgrade() {
            Some(cell) => {
                let mut slot = cell.lock();
                if slot.as_ref().is_some_and(|cached| cached.var == var) {
                    *slot = None;
                }
                true
            }
            None => false,
        });
    }

    pub(crate) fn clear_all(&mut self) {
        for cell in self.cells.iter().filter_map(Weak::upgrade) {
            *cell.lock() = None;
        }
    }
}
