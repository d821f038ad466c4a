//! Bounded cache of expensive per-item derived values.
//!
//! Values are keyed by item identity and validated against a [`Fingerprint`]
//! of the fields the computation reads. A stored value is only returned while
//! the fingerprint still matches; otherwise it is recomputed and overwritten.
//! Capacity is bounded and the least recently used entry is evicted first.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::hash::Hash;

use memolist_core::collections::map::HashMap;
use memolist_core::{Fingerprint, ItemDescriptor};

use crate::error::{ComputationFailed, ComputeError};

/// Default number of derived values kept alive.
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Counters describing cache behavior since creation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from a stored value.
    pub hits: u64,

    /// Lookups with no stored value for the identity.
    pub misses: u64,

    /// Lookups whose stored value had a different fingerprint.
    pub stale: u64,

    /// Entries dropped to stay within capacity.
    pub evictions: u64,

    /// Successful compute invocations.
    pub computations: u64,

    /// Failed compute invocations.
    pub failures: u64,
}

impl CacheStats {
    /// Counter increments between `earlier` and `self`.
    pub fn since(&self, earlier: &CacheStats) -> CacheStats {
        CacheStats {
            hits: self.hits.saturating_sub(earlier.hits),
            misses: self.misses.saturating_sub(earlier.misses),
            stale: self.stale.saturating_sub(earlier.stale),
            evictions: self.evictions.saturating_sub(earlier.evictions),
            computations: self.computations.saturating_sub(earlier.computations),
            failures: self.failures.saturating_sub(earlier.failures),
        }
    }

    /// Fraction of lookups served without computing, in `[0, 1]`.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses + self.stale;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

#[derive(Debug)]
struct CacheEntry<V> {
    fingerprint: Fingerprint,
    value: V,
    last_accessed_seq: u64,
}

/// LRU cache mapping item identity to a memoized derived value.
///
/// Values are returned by clone; wrap large values in `Rc`/`Arc` to keep hits
/// cheap.
///
/// # Example
///
/// ```
/// use memolist_core::Fingerprint;
/// use memolist_foundation::lazy::DerivedValueCache;
///
/// let mut cache = DerivedValueCache::<u64, u64>::new(2);
/// let fp = Fingerprint::of(&(120u32, 3u32));
///
/// let total = cache.get_with(&1, fp, || Ok::<_, &str>(360)).unwrap();
/// assert_eq!(total, 360);
///
/// // Same identity and fingerprint: served from the cache.
/// let again = cache.get_with(&1, fp, || -> Result<u64, &str> { unreachable!() }).unwrap();
/// assert_eq!(again, 360);
/// ```
#[derive(Debug)]
pub struct DerivedValueCache<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    /// Recency index: access sequence -> identity. First entry is the LRU.
    recency: BTreeMap<u64, K>,
    next_seq: u64,
    capacity: usize,
    stats: CacheStats,
}

impl<K, V> Default for DerivedValueCache<K, V>
where
    K: Clone + Eq + Hash + Debug,
    V: Clone,
{
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl<K, V> DerivedValueCache<K, V> {
    /// Creates a cache holding at most `capacity` values (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::default(),
            recency: BTreeMap::new(),
            next_seq: 0,
            capacity: capacity.max(1),
            stats: CacheStats::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
    }

    /// Identities from least to most recently used.
    pub fn keys_by_recency(&self) -> impl Iterator<Item = &K> + '_ {
        self.recency.values()
    }
}

impl<K, V> DerivedValueCache<K, V>
where
    K: Eq + Hash,
{
    /// Returns a valid value without touching recency or counters.
    pub fn peek(&self, key: &K, fingerprint: Fingerprint) -> Option<&V> {
        self.entries
            .get(key)
            .filter(|entry| entry.fingerprint == fingerprint)
            .map(|entry| &entry.value)
    }

    pub fn contains(&self, key: &K, fingerprint: Fingerprint) -> bool {
        self.peek(key, fingerprint).is_some()
    }
}

impl<K, V> DerivedValueCache<K, V>
where
    K: Clone + Eq + Hash + Debug,
    V: Clone,
{
    /// Returns the value for `key`, computing it on a miss.
    ///
    /// A stored value is reused only when its fingerprint equals
    /// `fingerprint`. On a stale entry the value is recomputed and overwritten.
    ///
    /// # Errors
    /// When `compute` fails nothing is stored for `key` (a stale entry is
    /// dropped as well) and [`ComputationFailed`] is returned. The next call
    /// retries.
    pub fn get_with<F, E>(
        &mut self,
        key: &K,
        fingerprint: Fingerprint,
        compute: F,
    ) -> Result<V, ComputationFailed<K>>
    where
        F: FnOnce() -> Result<V, E>,
        E: Into<ComputeError>,
    {
        if let Some(value) = self.lookup(key, fingerprint) {
            return Ok(value);
        }

        match compute() {
            Ok(value) => {
                self.stats.computations += 1;
                self.insert(key.clone(), fingerprint, value.clone());
                Ok(value)
            }
            Err(cause) => {
                self.stats.failures += 1;
                self.remove(key);
                let cause = cause.into();
                log::debug!("derived value for {:?} failed: {}", key, cause);
                Err(ComputationFailed {
                    key: key.clone(),
                    cause,
                })
            }
        }
    }

    /// Returns the value for `item`, keyed and fingerprinted by `descriptor`.
    pub fn get<T, D, F, E>(
        &mut self,
        descriptor: &D,
        item: &T,
        compute: F,
    ) -> Result<V, ComputationFailed<K>>
    where
        D: ItemDescriptor<T, Key = K>,
        F: FnOnce(&T) -> Result<V, E>,
        E: Into<ComputeError>,
    {
        let key = descriptor.key(item);
        let fingerprint = descriptor.fingerprint(item);
        self.get_with(&key, fingerprint, || compute(item))
    }

    /// Looks up a valid value without computing, refreshing its recency on a
    /// hit. Counts as a hit, miss or stale lookup.
    pub fn lookup(&mut self, key: &K, fingerprint: Fingerprint) -> Option<V> {
        let seq = self.bump_seq();
        match self.entries.get_mut(key) {
            Some(entry) if entry.fingerprint == fingerprint => {
                self.recency.remove(&entry.last_accessed_seq);
                entry.last_accessed_seq = seq;
                self.recency.insert(seq, key.clone());
                self.stats.hits += 1;
                log::trace!("derived value hit for {:?}", key);
                Some(entry.value.clone())
            }
            Some(_) => {
                self.stats.stale += 1;
                log::trace!("derived value for {:?} is stale", key);
                None
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Stores a value computed elsewhere, e.g. by an offload worker.
    ///
    /// `fingerprint` is the one the value was computed for and `current` the
    /// item's fingerprint now. A stale value is rejected and the stored entry
    /// is left alone. Otherwise the value replaces whatever is stored for
    /// `key` and becomes most recently used. Returns whether it was stored.
    pub fn insert_computed(
        &mut self,
        key: K,
        fingerprint: Fingerprint,
        current: Fingerprint,
        value: V,
    ) -> bool {
        if fingerprint != current {
            log::trace!("rejected stale derived value for {:?}", key);
            return false;
        }
        self.stats.computations += 1;
        self.insert(key, fingerprint, value);
        true
    }

    /// Drops the value stored for `key`. Returns whether one was present.
    pub fn invalidate(&mut self, key: &K) -> bool {
        self.remove(key)
    }

    /// Changes the capacity, evicting least recently used entries if the
    /// cache no longer fits.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.entries.len() > self.capacity {
            if !self.evict_lru() {
                break;
            }
        }
    }

    fn insert(&mut self, key: K, fingerprint: Fingerprint, value: V) {
        let seq = self.bump_seq();
        if let Some(entry) = self.entries.get_mut(&key) {
            self.recency.remove(&entry.last_accessed_seq);
            entry.fingerprint = fingerprint;
            entry.value = value;
            entry.last_accessed_seq = seq;
            self.recency.insert(seq, key);
            return;
        }

        while self.entries.len() >= self.capacity {
            if !self.evict_lru() {
                break;
            }
        }

        self.recency.insert(seq, key.clone());
        self.entries.insert(
            key,
            CacheEntry {
                fingerprint,
                value,
                last_accessed_seq: seq,
            },
        );
    }

    fn remove(&mut self, key: &K) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.recency.remove(&entry.last_accessed_seq);
                true
            }
            None => false,
        }
    }

    fn evict_lru(&mut self) -> bool {
        match self.recency.pop_first() {
            Some((_, key)) => {
                self.entries.remove(&key);
                self.stats.evictions += 1;
                log::debug!("evicted derived value for {:?}", key);
                true
            }
            None => false,
        }
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn fp(price: u32, quantity: u32) -> Fingerprint {
        Fingerprint::builder().field(&price).field(&quantity).finish()
    }

    #[test]
    fn test_hit_does_not_recompute() {
        let mut cache = DerivedValueCache::<&str, u32>::new(4);
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            Ok::<_, ComputeError>(30)
        };

        assert_eq!(cache.get_with(&"a", fp(10, 3), compute).unwrap(), 30);
        assert_eq!(cache.get_with(&"a", fp(10, 3), compute).unwrap(), 30);
        assert_eq!(calls.get(), 1);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.computations, 1);
    }

    #[test]
    fn test_fingerprint_change_recomputes_and_overwrites() {
        let mut cache = DerivedValueCache::<&str, u32>::new(4);

        assert_eq!(cache.get_with(&"a", fp(10, 3), || Ok::<_, ComputeError>(30)).unwrap(), 30);
        assert_eq!(cache.get_with(&"a", fp(10, 4), || Ok::<_, ComputeError>(40)).unwrap(), 40);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.peek(&"a", fp(10, 4)), Some(&40));
        assert_eq!(cache.peek(&"a", fp(10, 3)), None);
        assert_eq!(cache.stats().stale, 1);
    }

    #[test]
    fn test_lru_eviction_order() {
        let mut cache = DerivedValueCache::<&str, u32>::new(2);
        let f = Fingerprint::EMPTY;

        cache.get_with(&"a", f, || Ok::<_, ComputeError>(1)).unwrap();
        cache.get_with(&"b", f, || Ok::<_, ComputeError>(2)).unwrap();
        // Touch "a" so "b" becomes the LRU entry.
        cache.get_with(&"a", f, || Ok::<_, ComputeError>(1)).unwrap();
        cache.get_with(&"c", f, || Ok::<_, ComputeError>(3)).unwrap();

        assert!(cache.contains(&"a", f));
        assert!(!cache.contains(&"b", f));
        assert!(cache.contains(&"c", f));
        assert_eq!(cache.keys_by_recency().copied().collect::<Vec<_>>(), vec!["a", "c"]);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_failure_stores_nothing_and_retries() {
        let mut cache = DerivedValueCache::<u64, u32>::new(4);
        let f = fp(1, 1);

        cache.get_with(&1, fp(0, 0), || Ok::<_, ComputeError>(5)).unwrap();
        let err = cache
            .get_with(&1, f, || Err::<u32, _>("overflow"))
            .unwrap_err();
        assert_eq!(err.key, 1);
        assert_eq!(err.cause.message(), "overflow");
        assert!(cache.is_empty());

        assert_eq!(cache.get_with(&1, f, || Ok::<_, ComputeError>(9)).unwrap(), 9);
        assert_eq!(cache.stats().failures, 1);
    }

    #[test]
    fn test_shrinking_capacity_evicts() {
        let mut cache = DerivedValueCache::<u64, u64>::new(8);
        for key in 0..8u64 {
            cache.get_with(&key, Fingerprint::EMPTY, || Ok::<_, ComputeError>(key)).unwrap();
        }
        cache.set_capacity(3);
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.keys_by_recency().copied().collect::<Vec<_>>(), vec![5, 6, 7]);
    }

    #[test]
    fn test_insert_computed_replaces_entry() {
        let mut cache = DerivedValueCache::<u64, u64>::new(2);
        assert!(cache.insert_computed(1, fp(1, 1), fp(1, 1), 10));
        assert!(cache.insert_computed(1, fp(1, 2), fp(1, 2), 20));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.lookup(&1, fp(1, 2)), Some(20));
    }

    #[test]
    fn test_insert_computed_rejects_stale_fingerprint() {
        let mut cache = DerivedValueCache::<u64, u64>::new(2);
        assert!(cache.insert_computed(1, fp(1, 2), fp(1, 2), 20));

        // Computed for the old inputs after the item changed.
        assert!(!cache.insert_computed(1, fp(1, 1), fp(1, 2), 10));
        assert_eq!(cache.peek(&1, fp(1, 2)), Some(&20));
        assert_eq!(cache.peek(&1, fp(1, 1)), None);
        assert_eq!(cache.stats().computations, 1);
    }

    #[test]
    fn test_read_accessors_need_no_clone() {
        struct Opaque;
        let cache = DerivedValueCache::<u64, Opaque>::new(3);
        assert!(cache.is_empty());
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.capacity(), 3);
        assert!(cache.peek(&1, Fingerprint::EMPTY).is_none());
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut cache = DerivedValueCache::<u64, u64>::new(0);
        assert_eq!(cache.capacity(), 1);
        let f = Fingerprint::EMPTY;
        cache.insert_computed(1, f, f, 1);
        cache.insert_computed(2, f, f, 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&2, Fingerprint::EMPTY));
    }

    #[test]
    fn test_stats_since_and_hit_rate() {
        let mut cache = DerivedValueCache::<u64, u64>::new(4);
        cache.get_with(&1, Fingerprint::EMPTY, || Ok::<_, ComputeError>(1)).unwrap();
        let before = cache.stats();
        cache.get_with(&1, Fingerprint::EMPTY, || Ok::<_, ComputeError>(1)).unwrap();
        let delta = cache.stats().since(&before);
        assert_eq!(delta.hits, 1);
        assert_eq!(delta.misses, 0);
        assert_eq!(cache.stats().hit_rate(), 0.5);
    }
}
