use crate::StoreError;

/// A transactional handle to the shared counter table.
///
/// This is the seam between the allocator and whatever durable store the
/// deployment shares: one row per counter name, holding the next unissued
/// value. The allocator drives it with exactly one read–compare–write
/// sequence per transaction and never holds a transaction across backoff
/// sleeps, so implementations need no locking beyond ordinary statement
/// atomicity.
///
/// Two implementations ship with the crate: [`MemoryCounterStore`] for tests
/// and single-process embedding, and the statement text in [`sql`] for
/// drivers backed by a relational database.
///
/// # Example
/// ```
/// use keywell::{CounterStore, CounterTxn, MemoryCounterStore};
///
/// let store = MemoryCounterStore::new();
/// let mut txn = store.begin().unwrap();
/// assert!(txn.insert("order_id", 1).unwrap());
/// assert!(txn.update_if("order_id", 11, 1).unwrap());
/// txn.commit().unwrap();
/// assert_eq!(store.value_of("order_id"), Some(11));
/// ```
///
/// [`MemoryCounterStore`]: crate::MemoryCounterStore
/// [`sql`]: crate::sql
pub trait CounterStore {
    /// The transaction handle handed to the acquisition protocol.
    type Txn: CounterTxn;

    /// Opens a transaction scoped to one read–compare–write sequence.
    fn begin(&self) -> Result<Self::Txn, StoreError>;
}

/// One in-flight transaction against the counter table.
///
/// Dropping a transaction without [`commit`] discards it; a failed
/// conditional update must leave no trace in the store.
///
/// [`commit`]: CounterTxn::commit
pub trait CounterTxn {
    /// Reads the current value for `key`, or `None` if the row does not
    /// exist yet.
    fn select(&mut self, key: &str) -> Result<Option<u64>, StoreError>;

    /// Creates the row for `key` with the given initial value.
    ///
    /// Returns `false` when the row already exists (another allocator won the
    /// first-use race); that is an outcome, not an error.
    fn insert(&mut self, key: &str, value: u64) -> Result<bool, StoreError>;

    /// The conditional update: sets `key`'s value to `next` only if it still
    /// holds `prev`.
    ///
    /// Returns `true` iff exactly one row was affected. `false` means another
    /// writer moved the counter between this transaction's read and write.
    fn update_if(&mut self, key: &str, next: u64, prev: u64) -> Result<bool, StoreError>;

    /// Makes the transaction's writes durable.
    fn commit(self) -> Result<(), StoreError>;
}
