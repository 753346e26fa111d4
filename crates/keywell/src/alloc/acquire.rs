use crate::{Backoff, CounterStore, CounterTxn, Error, KeyRange, RandSource, Result};
#[cfg(feature = "tracing")]
use tracing::instrument;

/// First-use rows start here; the first key ever issued for a counter is 1.
const FIRST_VALUE: u64 = 1;

/// Reserves the next `pool_size`-wide range for `key` from the shared store.
///
/// This is the optimistic loop every cross-process guarantee rests on: read
/// the counter, then advance it with an update conditioned on the value just
/// read. Zero affected rows means another allocator moved the counter in
/// between: the attempt is discarded, nothing having been committed, and the
/// loop retries after a jittered, widening wait. A missing row is created at
/// [`FIRST_VALUE`] inside the same transaction; losing *that* race to another
/// allocator's insert is handled by re-reading, and a row that is still
/// absent afterwards is corruption, not contention.
///
/// Store failures propagate immediately; only conditional-update conflicts
/// are retried, and only `max_attempts` times.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(store, backoff), err)
)]
pub(crate) fn acquire_range<S, R>(
    store: &S,
    key: &str,
    pool_size: u64,
    max_attempts: u32,
    backoff: &Backoff<R>,
) -> Result<KeyRange>
where
    S: CounterStore,
    R: RandSource<u64>,
{
    let mut insert_attempted = false;

    for attempt in 0..max_attempts {
        let mut txn = store.begin()?;

        let value = match txn.select(key)? {
            Some(value) => value,
            None if insert_attempted => {
                return Err(Error::StoreCorrupted {
                    key: key.to_owned(),
                });
            }
            None => {
                insert_attempted = true;
                if txn.insert(key, FIRST_VALUE)? {
                    FIRST_VALUE
                } else {
                    // Lost the first-use race; the row exists now. Discard
                    // and re-read it on the next pass.
                    drop(txn);
                    continue;
                }
            }
        };

        let next = value
            .checked_add(pool_size)
            .ok_or_else(|| Error::CounterOverflow {
                key: key.to_owned(),
            })?;

        if txn.update_if(key, next, value)? {
            txn.commit()?;
            return Ok(KeyRange::new(value, next));
        }

        // Another allocator advanced the counter between our read and write.
        // Nothing was committed; widen the jittered wait and go again.
        #[cfg(feature = "tracing")]
        tracing::debug!(key, attempt, "conditional update lost the race");
        drop(txn);
        if attempt + 1 < max_attempts {
            let delay = backoff.delay(attempt);
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
        }
    }

    #[cfg(feature = "tracing")]
    tracing::warn!(key, max_attempts, "identifier allocation exhausted");
    Err(Error::Exhausted {
        key: key.to_owned(),
        attempts: max_attempts,
    })
}
