use crate::{RandSource, ThreadRandom};
use core::time::Duration;

/// Default width of the first retry window.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(20);

/// Default cap on the retry window. The window stops widening here.
pub const DEFAULT_BACKOFF_CAP: Duration = Duration::from_millis(640);

/// Randomized exponential backoff between failed acquisition attempts.
///
/// Each failed conditional update widens the wait window, doubling from
/// `base` up to `cap`. The actual delay is drawn uniformly from the current
/// window, so colliding allocators spread out instead of re-colliding in
/// lockstep.
///
/// The jitter source is owned by the policy and seeded per instance; two
/// allocators never share randomness state through a process-wide static.
///
/// # Example
/// ```
/// use keywell::Backoff;
///
/// let backoff = Backoff::default();
/// let delay = backoff.delay(2);
/// assert!(delay.as_millis() < 80); // third window: [0, 80ms)
/// ```
#[derive(Clone, Debug)]
pub struct Backoff<R = ThreadRandom>
where
    R: RandSource<u64>,
{
    base: Duration,
    cap: Duration,
    jitter: R,
}

impl Default for Backoff<ThreadRandom> {
    /// A thread-local-jittered policy with the default window schedule.
    fn default() -> Self {
        Self::new(DEFAULT_BACKOFF_BASE, DEFAULT_BACKOFF_CAP, ThreadRandom)
    }
}

impl Backoff<ThreadRandom> {
    /// A policy that never waits. Retries run back to back.
    ///
    /// Useful in tests and in callers that prefer hot retry over politeness.
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO, ThreadRandom)
    }
}

impl<R> Backoff<R>
where
    R: RandSource<u64>,
{
    /// Creates a policy widening from `base` to `cap`, jittered by `jitter`.
    pub fn new(base: Duration, cap: Duration, jitter: R) -> Self {
        Self { base, cap, jitter }
    }

    /// Returns the delay to sleep after the failed attempt number `attempt`
    /// (zero-based), drawn uniformly from `[0, window)`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let window = self.window(attempt);
        let millis = window.as_millis() as u64;
        if millis == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(self.jitter.rand() % millis)
    }

    /// The wait window for `attempt`: `min(base << attempt, cap)`.
    fn window(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(31);
        self.base.saturating_mul(factor).min(self.cap)
    }
}
