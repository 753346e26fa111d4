/// A trait for random sources that return random integers.
///
/// This abstraction allows you to plug in a real random source or a mocked
/// random source in tests. `keywell` draws on it in two places: retry jitter
/// for the range-acquisition backoff (`u64`) and key material for the
/// stateless allocation strategy (`u128`).
///
/// The random type `T` is generic (typically `u64` or `u128`)
///
/// # Example
/// ```
/// use keywell::RandSource;
///
/// struct FixedRand;
/// impl RandSource<u64> for FixedRand {
///     fn rand(&self) -> u64 {
///         1234
///     }
/// }
///
/// let rng = FixedRand;
/// assert_eq!(rng.rand(), 1234);
/// ```
pub trait RandSource<T> {
    /// Returns a random integer.
    fn rand(&self) -> T;
}
