use crate::{KeySource, RandSource, Result, ThreadRandom};
#[cfg(feature = "tracing")]
use tracing::instrument;

/// A stateless key source returning 128-bit random identifiers.
///
/// Each call draws fresh random bits and returns immediately: no counter
/// row, no transactions, no coordination of any kind. Uniqueness is
/// probabilistic (with 128 bits the collision probability is negligible for
/// any realistic object count), which is the trade this strategy makes to
/// satisfy the same contract as the pooled allocator without a shared store.
///
/// ## Features
///
/// - ✅ Thread-safe
/// - ✅ Never blocks, never touches a store
/// - ✅ Probabilistically unique (no coordination required)
///
/// ## See Also
/// - [`PooledKeyAllocator`]
///
/// # Example
/// ```
/// use keywell::RandomKeyAllocator;
///
/// let ids = RandomKeyAllocator::default();
/// let a = ids.next_key().unwrap();
/// let b = ids.next_key().unwrap();
/// assert_ne!(a, b);
/// ```
///
/// [`PooledKeyAllocator`]: crate::PooledKeyAllocator
pub struct RandomKeyAllocator<R = ThreadRandom>
where
    R: RandSource<u128>,
{
    rng: R,
}

impl Default for RandomKeyAllocator<ThreadRandom> {
    fn default() -> Self {
        Self::new(ThreadRandom)
    }
}

impl<R> RandomKeyAllocator<R>
where
    R: RandSource<u128>,
{
    /// Creates an allocator drawing key material from `rng`.
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Returns a fresh random 128-bit key.
    ///
    /// Infallible in practice; the `Result` keeps this strategy on the same
    /// contract as the store-backed one.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn next_key(&self) -> Result<u128> {
        Ok(self.rng.rand())
    }
}

impl<R> KeySource for RandomKeyAllocator<R>
where
    R: RandSource<u128>,
{
    type Key = u128;

    fn next_key(&self) -> Result<u128> {
        self.next_key()
    }
}
