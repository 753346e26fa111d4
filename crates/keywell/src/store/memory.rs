use crate::{CounterStore, CounterTxn, StoreError};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

/// An embedded, in-process counter store.
///
/// Backs the counter table with a shared `HashMap`; clones share the same
/// table, so cloning a store and handing the clones to several allocators
/// models independent writers against one database.
///
/// Statements lock the table only for their own duration, which means two
/// open transactions interleave, and genuinely conflict, exactly like
/// independent connections to a shared database. Useful for tests, doctests,
/// and single-process deployments that do not need durability.
#[derive(Clone, Debug, Default)]
pub struct MemoryCounterStore {
    rows: Arc<Mutex<HashMap<String, u64>>>,
}

impl MemoryCounterStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored value for `key`, if the row exists.
    ///
    /// Inspection only; allocators read through a transaction.
    pub fn value_of(&self, key: &str) -> Option<u64> {
        lock(&self.rows).ok()?.get(key).copied()
    }
}

impl CounterStore for MemoryCounterStore {
    type Txn = MemoryTxn;

    fn begin(&self) -> Result<MemoryTxn, StoreError> {
        Ok(MemoryTxn {
            rows: Arc::clone(&self.rows),
            undo: Vec::new(),
            committed: false,
        })
    }
}

/// A transaction over [`MemoryCounterStore`].
///
/// Writes apply to the shared table immediately under a short per-statement
/// lock; an undo log reverses them if the transaction is dropped without
/// [`commit`](CounterTxn::commit).
#[derive(Debug)]
pub struct MemoryTxn {
    rows: Arc<Mutex<HashMap<String, u64>>>,
    undo: Vec<Undo>,
    committed: bool,
}

#[derive(Debug)]
enum Undo {
    Insert { key: String, value: u64 },
    Update { key: String, prev: u64, next: u64 },
}

impl CounterTxn for MemoryTxn {
    fn select(&mut self, key: &str) -> Result<Option<u64>, StoreError> {
        Ok(lock(&self.rows)?.get(key).copied())
    }

    fn insert(&mut self, key: &str, value: u64) -> Result<bool, StoreError> {
        let mut rows = lock(&self.rows)?;
        if rows.contains_key(key) {
            return Ok(false);
        }
        rows.insert(key.to_owned(), value);
        self.undo.push(Undo::Insert {
            key: key.to_owned(),
            value,
        });
        Ok(true)
    }

    fn update_if(&mut self, key: &str, next: u64, prev: u64) -> Result<bool, StoreError> {
        let mut rows = lock(&self.rows)?;
        match rows.get_mut(key) {
            Some(value) if *value == prev => {
                *value = next;
                self.undo.push(Undo::Update {
                    key: key.to_owned(),
                    prev,
                    next,
                });
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn commit(mut self) -> Result<(), StoreError> {
        self.committed = true;
        self.undo.clear();
        Ok(())
    }
}

impl Drop for MemoryTxn {
    fn drop(&mut self) {
        if self.committed || self.undo.is_empty() {
            return;
        }
        let Ok(mut rows) = self.rows.lock() else {
            return;
        };
        // Counter values only ever grow, so an undo entry applies only while
        // the row still holds the value this transaction wrote; anything newer
        // belongs to a transaction that committed after us.
        for op in self.undo.drain(..).rev() {
            match op {
                Undo::Insert { key, value } => {
                    if rows.get(&key) == Some(&value) {
                        rows.remove(&key);
                    }
                }
                Undo::Update { key, prev, next } => {
                    if rows.get(&key) == Some(&next) {
                        rows.insert(key, prev);
                    }
                }
            }
        }
    }
}

fn lock(
    rows: &Mutex<HashMap<String, u64>>,
) -> Result<MutexGuard<'_, HashMap<String, u64>>, StoreError> {
    rows.lock()
        .map_err(|_| StoreError::message("counter table mutex poisoned"))
}
