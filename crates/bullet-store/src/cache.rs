//! A fixed-capacity LRU cache keyed by access order.
//!
//! Ordering is purely access-based: `get` and `put` both promote the
//! touched key to most-recently-used. The cache itself never serialises
//! evicted entries; callers that need write-back on eviction (the
//! [`NodeAllocator`](crate::allocator) impl) wrap `put`'s returned
//! `(evicted_k, evicted_v)` pair.

use lru::LruCache;
use std::hash::BuildHasher;
use std::num::NonZeroUsize;

/// An LRU cache of bounded capacity, generic over the hasher so the
/// `NodeId`-keyed allocator cache can use the trie's FNV hasher instead
/// of the default `RandomState`.
pub struct LruCacheMap<K, V, S = std::collections::hash_map::RandomState> {
    inner: LruCache<K, V, S>,
}

impl<K, V> LruCacheMap<K, V, std::collections::hash_map::RandomState>
where
    K: std::hash::Hash + Eq + Clone,
{
    /// Builds a cache holding at most `cap` entries. `cap == 0` is coerced
    /// to 1, since `lru::LruCache` requires a nonzero capacity.
    pub fn new(cap: usize) -> Self {
        let cap = NonZeroUsize::new(cap).unwrap_or(NonZeroUsize::new(1).unwrap());
        LruCacheMap {
            inner: LruCache::new(cap),
        }
    }
}

impl<K, V, S> LruCacheMap<K, V, S>
where
    K: std::hash::Hash + Eq + Clone,
    S: BuildHasher + Default,
{
    /// Builds a cache using a specific hasher, e.g. the trie's FNV
    /// hasher for `NodeId` keys.
    pub fn with_hasher(cap: usize) -> Self {
        let cap = NonZeroUsize::new(cap).unwrap_or(NonZeroUsize::new(1).unwrap());
        LruCacheMap {
            inner: LruCache::with_hasher(cap, S::default()),
        }
    }

    /// Looks up `k`, promoting it to MRU on a hit.
    pub fn get(&mut self, k: &K) -> Option<&V> {
        self.inner.get(k)
    }

    /// Inserts or replaces `k`, promoting it to MRU. Returns the evicted
    /// entry if the cache was over capacity, provided it wasn't `k` itself.
    pub fn put(&mut self, k: K, v: V) -> Option<(K, V)> {
        self.inner.put(k.clone(), v);
        if self.inner.len() > self.inner.cap().get() {
            self.inner.pop_lru()
        } else {
            None
        }
    }

    /// Removes `k`, returning its value if present.
    pub fn remove(&mut self, k: &K) -> Option<V> {
        self.inner.pop(k)
    }

    /// `true` iff `k` is currently cached (does not affect ordering).
    pub fn contains(&self, k: &K) -> bool {
        self.inner.contains(k)
    }

    /// Number of entries currently cached.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// `true` iff the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_evicts_lru_when_over_capacity() {
        let mut cache: LruCacheMap<u32, &str> = LruCacheMap::new(2);
        assert_eq!(cache.put(1, "a"), None);
        assert_eq!(cache.put(2, "b"), None);
        let evicted = cache.put(3, "c");
        assert_eq!(evicted, Some((1, "a")));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn get_promotes_to_mru() {
        let mut cache: LruCacheMap<u32, &str> = LruCacheMap::new(2);
        cache.put(1, "a");
        cache.put(2, "b");
        assert_eq!(cache.get(&1), Some(&"a"));
        let evicted = cache.put(3, "c");
        assert_eq!(evicted, Some((2, "b")));
    }

    #[test]
    fn remove_returns_value() {
        let mut cache: LruCacheMap<u32, &str> = LruCacheMap::new(2);
        cache.put(1, "a");
        assert_eq!(cache.remove(&1), Some("a"));
        assert!(!cache.contains(&1));
    }
}
