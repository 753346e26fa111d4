use super::acquire::acquire_range;
use crate::{
    Backoff, CounterStore, KeyRange, KeySource, PoolConfig, RandSource, Result, ThreadRandom,
};
use std::sync::Mutex;
#[cfg(feature = "tracing")]
use tracing::instrument;

/// A pooled surrogate-key allocator backed by a shared counter store.
///
/// The allocator owns a local pool `[current, max)` of pre-reserved
/// identifiers and serves sequential values from it without touching the
/// store. When the pool runs dry it reserves the next range through the
/// optimistic acquisition protocol, under the same lock that guards the fast
/// path, so within one process exactly one thread refills an exhausted pool
/// while the rest block on the lock rather than racing it.
///
/// Across processes there is no lock at all: disjointness of ranges is
/// guaranteed entirely by the conditional update at the store, which makes
/// the allocator immune to deadlock and lock-leak failure modes at the cost
/// of occasional contention-driven retries.
///
/// ## Features
///
/// - ✅ Thread-safe: share one instance behind an `Arc`
/// - ✅ Safe across processes sharing the same counter row
/// - ✅ One store round trip per `pool_size` keys
///
/// ## Key lifecycle
///
/// Issued keys are permanent. An unused pool remainder is abandoned when the
/// owning process exits, and keys handed to a transaction that later rolls
/// back are not returned. Gaps in the identifier sequence are expected; the
/// guarantee is uniqueness, not density.
///
/// ## See Also
/// - [`RandomKeyAllocator`]
///
/// # Example
/// ```
/// use keywell::{MemoryCounterStore, PooledKeyAllocator};
///
/// let store = MemoryCounterStore::new();
/// let ids = PooledKeyAllocator::new("person_id", 10, store.clone());
///
/// assert_eq!(ids.next_key().unwrap(), 1);
/// assert_eq!(ids.next_key().unwrap(), 2);
/// // The first refill reserved [1, 11); the store already points past it.
/// assert_eq!(store.value_of("person_id"), Some(11));
/// ```
///
/// [`RandomKeyAllocator`]: crate::RandomKeyAllocator
pub struct PooledKeyAllocator<S, R = ThreadRandom>
where
    S: CounterStore,
    R: RandSource<u64>,
{
    key_name: String,
    config: PoolConfig,
    backoff: Backoff<R>,
    store: S,
    pool: Mutex<Pool>,
}

/// Locally reserved pool state. `current == max` means empty; the allocator
/// starts empty and refills on first use.
#[derive(Debug)]
struct Pool {
    current: u64,
    max: u64,
}

impl<S> PooledKeyAllocator<S, ThreadRandom>
where
    S: CounterStore,
{
    /// Creates an allocator for the counter named `key_name`, reserving
    /// `pool_size` keys per store round trip, with the default retry bound
    /// and backoff schedule.
    ///
    /// # Example
    /// ```
    /// use keywell::{MemoryCounterStore, PooledKeyAllocator};
    ///
    /// let ids = PooledKeyAllocator::new("order_id", 100, MemoryCounterStore::new());
    /// assert_eq!(ids.next_key().unwrap(), 1);
    /// ```
    pub fn new(key_name: impl Into<String>, pool_size: u64, store: S) -> Self {
        Self::with_config(key_name, store, PoolConfig::new(pool_size), Backoff::default())
    }
}

impl<S, R> PooledKeyAllocator<S, R>
where
    S: CounterStore,
    R: RandSource<u64>,
{
    /// Creates an allocator with explicit tuning and an explicit backoff
    /// policy.
    ///
    /// The backoff policy is owned by this instance; seed it independently
    /// per allocator rather than sharing one through global state.
    pub fn with_config(
        key_name: impl Into<String>,
        store: S,
        config: PoolConfig,
        backoff: Backoff<R>,
    ) -> Self {
        let config = PoolConfig {
            pool_size: config.pool_size.max(1),
            ..config
        };
        Self {
            key_name: key_name.into(),
            config,
            backoff,
            store,
            pool: Mutex::new(Pool { current: 0, max: 0 }),
        }
    }

    /// The counter name this allocator draws on.
    pub fn key_name(&self) -> &str {
        &self.key_name
    }

    /// The tuning this allocator runs with.
    pub fn config(&self) -> PoolConfig {
        self.config
    }

    /// Returns the next unissued key.
    ///
    /// The fast path serves from the local pool and performs no I/O. When the
    /// pool is exhausted, the call blocks while a new range is negotiated
    /// with the store; that blocking is bounded by the retry schedule.
    ///
    /// # Errors
    /// - [`Error::Exhausted`] when every bounded acquisition attempt lost the
    ///   conditional-update race. Terminal: abort the operation that needed
    ///   the key.
    /// - [`Error::Store`] when the backing store fails; propagated unchanged.
    /// - [`Error::StoreCorrupted`], [`Error::CounterOverflow`],
    ///   [`Error::LockPoisoned`] as described on [`Error`].
    ///
    /// [`Error`]: crate::Error
    /// [`Error::Exhausted`]: crate::Error::Exhausted
    /// [`Error::Store`]: crate::Error::Store
    /// [`Error::StoreCorrupted`]: crate::Error::StoreCorrupted
    /// [`Error::CounterOverflow`]: crate::Error::CounterOverflow
    /// [`Error::LockPoisoned`]: crate::Error::LockPoisoned
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn next_key(&self) -> Result<u64> {
        let mut pool = self.pool.lock()?;
        if pool.current == pool.max {
            let range = acquire_range(
                &self.store,
                &self.key_name,
                self.config.pool_size,
                self.config.max_attempts,
                &self.backoff,
            )?;
            pool.current = range.start();
            pool.max = range.end();
        }
        let key = pool.current;
        pool.current += 1;
        Ok(key)
    }

    /// Reserves a whole range in one protocol round, bypassing the local
    /// pool.
    ///
    /// Intended for bulk loaders that assign many identities at once. The
    /// local pool is untouched: its remainder stays valid, and the returned
    /// range is disjoint from it and from every other reservation.
    pub fn reserve_range(&self) -> Result<KeyRange> {
        acquire_range(
            &self.store,
            &self.key_name,
            self.config.pool_size,
            self.config.max_attempts,
            &self.backoff,
        )
    }
}

impl<S, R> KeySource for PooledKeyAllocator<S, R>
where
    S: CounterStore,
    R: RandSource<u64>,
{
    type Key = u64;

    fn next_key(&self) -> Result<u64> {
        self.next_key()
    }
}
