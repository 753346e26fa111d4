use crate::Result;

/// A minimal interface for surrogate-key sources.
///
/// The persistence layer calls [`next_key`] exactly once per newly created
/// object that needs an identity; which strategy sits behind the call is a
/// per-class configuration decision, never hard-coded. Implementations must
/// be callable concurrently through `&self`.
///
/// Two strategies ship with the crate:
///
/// - [`PooledKeyAllocator`]: dense `u64` keys drawn from ranges reserved in a
///   shared counter store. May block on store I/O when its local pool runs
///   dry.
/// - [`RandomKeyAllocator`]: wide random `u128` keys, no I/O and no shared
///   state, trading exact coordination for a negligible collision
///   probability.
///
/// # Example
/// ```
/// use keywell::{KeySource, MemoryCounterStore, PooledKeyAllocator};
///
/// fn persist<K: KeySource<Key = u64>>(keys: &K) -> keywell::Result<u64> {
///     // ...assign the key to the new object...
///     keys.next_key()
/// }
///
/// let ids = PooledKeyAllocator::new("person_id", 10, MemoryCounterStore::new());
/// assert_eq!(persist(&ids).unwrap(), 1);
/// assert_eq!(persist(&ids).unwrap(), 2);
/// ```
///
/// [`next_key`]: KeySource::next_key
/// [`PooledKeyAllocator`]: crate::PooledKeyAllocator
/// [`RandomKeyAllocator`]: crate::RandomKeyAllocator
pub trait KeySource {
    /// The key representation handed to callers.
    type Key;

    /// Returns a key never issued before within this source's identity space.
    ///
    /// A returned key belongs to the caller permanently; it is never reissued
    /// by this or any other source drawing on the same named counter, and it
    /// is never reclaimed, not even if the transaction that persisted the
    /// object later rolls back.
    fn next_key(&self) -> Result<Self::Key>;
}
