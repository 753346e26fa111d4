use super::acquire::acquire_range;
use crate::{
    Backoff, CounterStore, CounterTxn, Error, KeyRange, KeySource, MemoryCounterStore, MemoryTxn,
    PoolConfig, PooledKeyAllocator, RandSource, RandomKeyAllocator, StoreError,
};
use std::{
    collections::HashSet,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU32, Ordering},
    },
    thread::scope,
};

const KEY: &str = "unit_test_key";

fn allocator<S: CounterStore>(store: S, pool_size: u64) -> PooledKeyAllocator<S> {
    PooledKeyAllocator::with_config(
        KEY,
        store,
        PoolConfig {
            pool_size,
            max_attempts: 10,
        },
        Backoff::none(),
    )
}

fn drain<K: KeySource>(source: &K, n: usize) -> Vec<K::Key> {
    (0..n)
        .map(|_| source.next_key().expect("allocation failed"))
        .collect()
}

fn seed(store: &MemoryCounterStore, value: u64) {
    let mut txn = store.begin().unwrap();
    assert!(txn.insert(KEY, value).unwrap());
    txn.commit().unwrap();
}

/// Counts transactions opened against the wrapped store.
struct CountingStore {
    inner: MemoryCounterStore,
    begins: Arc<AtomicU32>,
}

impl CountingStore {
    fn new(inner: MemoryCounterStore) -> Self {
        Self {
            inner,
            begins: Arc::new(AtomicU32::new(0)),
        }
    }

    fn begins(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.begins)
    }
}

impl CounterStore for CountingStore {
    type Txn = MemoryTxn;

    fn begin(&self) -> Result<MemoryTxn, StoreError> {
        self.begins.fetch_add(1, Ordering::SeqCst);
        self.inner.begin()
    }
}

/// Serves one stale read, then behaves like the wrapped store. Models a
/// reader whose snapshot went stale before its conditional update landed.
struct StaleOnceStore {
    inner: MemoryCounterStore,
    stale: Arc<Mutex<Option<u64>>>,
}

struct StaleOnceTxn {
    inner: MemoryTxn,
    stale: Arc<Mutex<Option<u64>>>,
}

impl CounterStore for StaleOnceStore {
    type Txn = StaleOnceTxn;

    fn begin(&self) -> Result<StaleOnceTxn, StoreError> {
        Ok(StaleOnceTxn {
            inner: self.inner.begin()?,
            stale: Arc::clone(&self.stale),
        })
    }
}

impl CounterTxn for StaleOnceTxn {
    fn select(&mut self, key: &str) -> Result<Option<u64>, StoreError> {
        if let Some(stale) = self.stale.lock().unwrap().take() {
            return Ok(Some(stale));
        }
        self.inner.select(key)
    }

    fn insert(&mut self, key: &str, value: u64) -> Result<bool, StoreError> {
        self.inner.insert(key, value)
    }

    fn update_if(&mut self, key: &str, next: u64, prev: u64) -> Result<bool, StoreError> {
        self.inner.update_if(key, next, prev)
    }

    fn commit(self) -> Result<(), StoreError> {
        self.inner.commit()
    }
}

/// Every conditional update loses: the counter always moves between this
/// store's reads and writes.
struct ContestedStore {
    inner: MemoryCounterStore,
    cas_attempts: Arc<AtomicU32>,
}

struct ContestedTxn {
    inner: MemoryTxn,
    cas_attempts: Arc<AtomicU32>,
}

impl CounterStore for ContestedStore {
    type Txn = ContestedTxn;

    fn begin(&self) -> Result<ContestedTxn, StoreError> {
        Ok(ContestedTxn {
            inner: self.inner.begin()?,
            cas_attempts: Arc::clone(&self.cas_attempts),
        })
    }
}

impl CounterTxn for ContestedTxn {
    fn select(&mut self, key: &str) -> Result<Option<u64>, StoreError> {
        self.inner.select(key)
    }

    fn insert(&mut self, key: &str, value: u64) -> Result<bool, StoreError> {
        self.inner.insert(key, value)
    }

    fn update_if(&mut self, _key: &str, _next: u64, _prev: u64) -> Result<bool, StoreError> {
        self.cas_attempts.fetch_add(1, Ordering::SeqCst);
        Ok(false)
    }

    fn commit(self) -> Result<(), StoreError> {
        self.inner.commit()
    }
}

/// Pretends the counter row is missing exactly once, so the allocator runs
/// its first-use insert against a row that already exists.
struct GhostRowStore {
    inner: MemoryCounterStore,
    ghost: Arc<Mutex<bool>>,
}

struct GhostRowTxn {
    inner: MemoryTxn,
    ghost: Arc<Mutex<bool>>,
}

impl CounterStore for GhostRowStore {
    type Txn = GhostRowTxn;

    fn begin(&self) -> Result<GhostRowTxn, StoreError> {
        Ok(GhostRowTxn {
            inner: self.inner.begin()?,
            ghost: Arc::clone(&self.ghost),
        })
    }
}

impl CounterTxn for GhostRowTxn {
    fn select(&mut self, key: &str) -> Result<Option<u64>, StoreError> {
        let mut ghost = self.ghost.lock().unwrap();
        if *ghost {
            *ghost = false;
            return Ok(None);
        }
        drop(ghost);
        self.inner.select(key)
    }

    fn insert(&mut self, key: &str, value: u64) -> Result<bool, StoreError> {
        self.inner.insert(key, value)
    }

    fn update_if(&mut self, key: &str, next: u64, prev: u64) -> Result<bool, StoreError> {
        self.inner.update_if(key, next, prev)
    }

    fn commit(self) -> Result<(), StoreError> {
        self.inner.commit()
    }
}

/// Rows neither read back nor insert: a store that drops writes.
struct VanishingStore;

struct VanishingTxn;

impl CounterStore for VanishingStore {
    type Txn = VanishingTxn;

    fn begin(&self) -> Result<VanishingTxn, StoreError> {
        Ok(VanishingTxn)
    }
}

impl CounterTxn for VanishingTxn {
    fn select(&mut self, _key: &str) -> Result<Option<u64>, StoreError> {
        Ok(None)
    }

    fn insert(&mut self, _key: &str, _value: u64) -> Result<bool, StoreError> {
        Ok(false)
    }

    fn update_if(&mut self, _key: &str, _next: u64, _prev: u64) -> Result<bool, StoreError> {
        Ok(false)
    }

    fn commit(self) -> Result<(), StoreError> {
        Ok(())
    }
}

struct UnreachableStore {
    begins: Arc<AtomicU32>,
}

impl CounterStore for UnreachableStore {
    type Txn = VanishingTxn;

    fn begin(&self) -> Result<VanishingTxn, StoreError> {
        self.begins.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::message("connection refused"))
    }
}

struct FixedWide(u128);

impl RandSource<u128> for FixedWide {
    fn rand(&self) -> u128 {
        self.0
    }
}

#[test]
fn first_use_creates_row_then_serves_from_pool() {
    let store = MemoryCounterStore::new();
    let counting = CountingStore::new(store.clone());
    let begins = counting.begins();
    let ids = allocator(counting, 10);

    assert_eq!(ids.next_key().unwrap(), 1);
    assert_eq!(store.value_of(KEY), Some(11));
    assert_eq!(begins.load(Ordering::SeqCst), 1);

    assert_eq!(drain(&ids, 9), (2..=10).collect::<Vec<u64>>());
    // Calls 2..=10 were served locally, without a store round trip.
    assert_eq!(begins.load(Ordering::SeqCst), 1);
    assert_eq!(store.value_of(KEY), Some(11));

    assert_eq!(ids.next_key().unwrap(), 11);
    assert_eq!(begins.load(Ordering::SeqCst), 2);
    assert_eq!(store.value_of(KEY), Some(21));
}

#[test]
fn keys_are_dense_across_refills_for_a_single_allocator() {
    let store = MemoryCounterStore::new();
    let ids = allocator(store.clone(), 3);

    assert_eq!(drain(&ids, 10), (1..=10).collect::<Vec<u64>>());
    assert_eq!(store.value_of(KEY), Some(13));
}

#[test]
fn conflict_loser_rereads_and_takes_the_next_range() {
    let store = MemoryCounterStore::new();
    seed(&store, 21); // the winner already holds [11, 21)
    let racing = StaleOnceStore {
        inner: store.clone(),
        stale: Arc::new(Mutex::new(Some(11))),
    };
    let ids = allocator(racing, 10);

    // The first attempt reads the stale 11 and loses the conditional
    // update; the retry re-reads 21 and reserves [21, 31).
    assert_eq!(ids.next_key().unwrap(), 21);
    assert_eq!(store.value_of(KEY), Some(31));
    assert_eq!(drain(&ids, 2), vec![22, 23]);
}

#[test]
fn perpetual_conflict_exhausts_after_the_retry_bound() {
    let store = MemoryCounterStore::new();
    seed(&store, 11);
    let cas_attempts = Arc::new(AtomicU32::new(0));
    let contested = ContestedStore {
        inner: store.clone(),
        cas_attempts: Arc::clone(&cas_attempts),
    };
    let ids = allocator(contested, 10);

    let err = ids.next_key().unwrap_err();
    assert!(matches!(
        err,
        Error::Exhausted { ref key, attempts: 10 } if key == KEY
    ));
    assert_eq!(cas_attempts.load(Ordering::SeqCst), 10);
    // The failed attempts never advanced the stored counter.
    assert_eq!(store.value_of(KEY), Some(11));
}

#[test]
fn first_use_race_recovers_by_rereading() {
    let store = MemoryCounterStore::new();
    seed(&store, 11); // another allocator created the row and holds [1, 11)
    let ghost = GhostRowStore {
        inner: store.clone(),
        ghost: Arc::new(Mutex::new(true)),
    };
    let ids = allocator(ghost, 10);

    // Attempt 1 sees no row and loses the first-use insert; attempt 2
    // re-reads the existing row and reserves normally.
    assert_eq!(ids.next_key().unwrap(), 11);
    assert_eq!(store.value_of(KEY), Some(21));
}

#[test]
fn row_still_missing_after_insert_recovery_is_corruption() {
    let ids = allocator(VanishingStore, 10);

    let err = ids.next_key().unwrap_err();
    assert!(matches!(err, Error::StoreCorrupted { ref key } if key == KEY));
}

#[test]
fn store_failure_propagates_without_retry() {
    let begins = Arc::new(AtomicU32::new(0));
    let ids = allocator(
        UnreachableStore {
            begins: Arc::clone(&begins),
        },
        10,
    );

    let err = ids.next_key().unwrap_err();
    assert!(matches!(err, Error::Store(_)));
    assert_eq!(begins.load(Ordering::SeqCst), 1);
}

#[test]
fn counter_near_u64_max_overflows_fatally() {
    let store = MemoryCounterStore::new();
    seed(&store, u64::MAX - 5);
    let ids = allocator(store, 10);

    let err = ids.next_key().unwrap_err();
    assert!(matches!(err, Error::CounterOverflow { ref key } if key == KEY));
}

#[test]
fn interleaved_reservations_never_overlap() {
    let store = MemoryCounterStore::new();
    let a = allocator(store.clone(), 10);
    let b = allocator(store.clone(), 10);

    let mut ranges = vec![
        a.reserve_range().unwrap(),
        b.reserve_range().unwrap(),
        a.reserve_range().unwrap(),
        b.reserve_range().unwrap(),
    ];
    ranges.sort_by_key(KeyRange::start);
    for pair in ranges.windows(2) {
        assert!(pair[0].end() <= pair[1].start());
    }
    assert_eq!(store.value_of(KEY), Some(ranges.last().unwrap().end()));
}

#[test]
fn stored_counter_never_decreases() {
    let store = MemoryCounterStore::new();
    let backoff = Backoff::none();

    let mut last = 0;
    for _ in 0..5 {
        let range = acquire_range(&store, KEY, 7, 10, &backoff).unwrap();
        let stored = store.value_of(KEY).unwrap();
        assert!(stored >= last);
        assert_eq!(stored, range.end());
        last = stored;
    }
}

#[test]
fn concurrent_allocators_never_issue_duplicates() {
    const ALLOCATORS: usize = 4;
    const THREADS_PER_ALLOCATOR: usize = 2;
    const KEYS_PER_THREAD: usize = 250;
    const TOTAL: usize = ALLOCATORS * THREADS_PER_ALLOCATOR * KEYS_PER_THREAD;

    let store = MemoryCounterStore::new();
    let seen = Arc::new(Mutex::new(HashSet::with_capacity(TOTAL)));

    scope(|s| {
        for _ in 0..ALLOCATORS {
            let ids = Arc::new(PooledKeyAllocator::with_config(
                KEY,
                store.clone(),
                PoolConfig {
                    pool_size: 7,
                    max_attempts: 64,
                },
                Backoff::none(),
            ));
            for _ in 0..THREADS_PER_ALLOCATOR {
                let ids = Arc::clone(&ids);
                let seen = Arc::clone(&seen);
                s.spawn(move || {
                    for _ in 0..KEYS_PER_THREAD {
                        let key = ids.next_key().expect("allocation failed");
                        assert!(seen.lock().unwrap().insert(key), "duplicate key {key}");
                    }
                });
            }
        }
    });

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), TOTAL);
    // Abandoned pool remainders leave gaps, but the stored counter has
    // moved past everything ever issued.
    assert!(store.value_of(KEY).unwrap() > TOTAL as u64);
}

#[test]
fn zero_pool_size_behaves_as_one() {
    let store = MemoryCounterStore::new();
    let counting = CountingStore::new(store.clone());
    let begins = counting.begins();
    let ids = allocator(counting, 0);

    assert_eq!(ids.next_key().unwrap(), 1);
    assert_eq!(ids.next_key().unwrap(), 2);
    assert_eq!(begins.load(Ordering::SeqCst), 2);
    assert_eq!(store.value_of(KEY), Some(3));
}

#[test]
fn random_strategy_draws_from_its_source() {
    let ids = RandomKeyAllocator::new(FixedWide(0xCAFE));
    assert_eq!(ids.next_key().unwrap(), 0xCAFE);
}

#[test]
fn random_strategy_returns_distinct_wide_keys() {
    let ids = RandomKeyAllocator::default();
    let keys = drain(&ids, 64);
    let unique: HashSet<u128> = keys.iter().copied().collect();
    assert_eq!(unique.len(), keys.len());
}
