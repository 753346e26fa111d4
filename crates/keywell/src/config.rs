/// Default number of keys reserved per store round trip.
pub const DEFAULT_POOL_SIZE: u64 = 20;

/// Default bound on acquisition attempts before a refill gives up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Tuning knobs for a pooled allocator.
///
/// `pool_size` trades store traffic against identifier density: a wider pool
/// amortizes the round trip over more keys, and any unused remainder is
/// abandoned when the owning process exits. `max_attempts` bounds how long a
/// refill may fight contention before surfacing
/// [`Error::Exhausted`](crate::Error::Exhausted).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoolConfig {
    /// Width of each reserved range. Clamped to at least 1 on use.
    pub pool_size: u64,
    /// Acquisition attempts per refill before giving up.
    pub max_attempts: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl PoolConfig {
    /// A config with the given pool width and default retry bound.
    pub fn new(pool_size: u64) -> Self {
        Self {
            pool_size: pool_size.max(1),
            ..Self::default()
        }
    }
}
