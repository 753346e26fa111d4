use crate::StoreError;
use std::sync::{MutexGuard, PoisonError};

/// A result type defaulting to the crate-wide [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All error variants that `keywell` can emit.
///
/// Transient conditions (a conditional update losing a race, or a first-use
/// insert conflicting with another allocator) are recovered internally and
/// never appear here. What does appear is terminal: callers must abort the
/// operation that requested the key rather than retry the allocator.
///
/// [`Error::Exhausted`] is deliberately distinguishable from
/// [`Error::Store`]: the former signals a contention storm (tune the pool
/// size or backoff), the latter a store outage (fix the database).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Every bounded acquisition attempt lost the conditional update race.
    #[error("identifier allocation exhausted for `{key}` after {attempts} attempts")]
    Exhausted { key: String, attempts: u32 },

    /// The counter row was still absent after first-use insert recovery.
    ///
    /// A row that cannot be read back after an insert was attempted means the
    /// store is dropping rows; retrying would loop forever.
    #[error("counter row for `{key}` is missing after first-use recovery")]
    StoreCorrupted { key: String },

    /// Reserving another range would overflow the 64-bit counter.
    #[error("counter for `{key}` cannot reserve another range without overflowing")]
    CounterOverflow { key: String },

    /// The backing counter store failed. Propagated unchanged and never
    /// retried here; any outer retry policy belongs to the caller.
    #[error("counter store failure: {0}")]
    Store(#[from] StoreError),

    /// The operation failed because the pool lock was **poisoned**.
    ///
    /// This occurs when a thread panics while holding the allocator's lock.
    #[error("allocator pool lock poisoned")]
    LockPoisoned,
}

// Convert all poisoned lock errors to a simplified `LockPoisoned`
impl<T> From<PoisonError<MutexGuard<'_, T>>> for Error {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}
