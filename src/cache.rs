use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};

/// Storage for a `Loader`'s memoized load futures.
///
/// The loader keys entries by normalized cache key and only ever talks to its store through this
/// trait, so alternate eviction policies (size bounds, TTLs) can be plugged in with
/// [`LoaderBuilder::cache_map`](crate::LoaderBuilder::cache_map). An entry that a store evicts on
/// its own is simply reloaded the next time it is requested.
pub trait Cache {
    type K;
    type V;

    /// Returns the value associated with the key. Takes `&mut self` so that stores tracking
    /// recency can record the hit.
    fn get(&mut self, key: &Self::K) -> Option<&Self::V>;

    fn insert(&mut self, key: Self::K, value: Self::V);

    fn remove(&mut self, key: &Self::K);

    fn remove_many(&mut self, keys: &[Self::K]) {
        for key in keys.iter() {
            self.remove(key);
        }
    }

    fn flush(&mut self);
}

impl<K, V, S: BuildHasher> Cache for HashMap<K, V, S>
where
    K: Eq + Hash,
{
    type K = K;
    type V = V;

    fn get(&mut self, key: &Self::K) -> Option<&Self::V> {
        HashMap::get(self, key)
    }

    fn insert(&mut self, key: Self::K, value: Self::V) {
        HashMap::insert(self, key, value);
    }

    fn remove(&mut self, key: &Self::K) {
        HashMap::remove(self, key);
    }

    fn flush(&mut self) {
        self.clear();
    }
}

#[cfg(feature = "lru")]
impl<K, V, S: BuildHasher> Cache for lru::LruCache<K, V, S>
where
    K: Eq + Hash,
{
    type K = K;
    type V = V;

    fn get(&mut self, key: &Self::K) -> Option<&Self::V> {
        lru::LruCache::get(self, key)
    }

    fn insert(&mut self, key: Self::K, value: Self::V) {
        self.put(key, value);
    }

    fn remove(&mut self, key: &Self::K) {
        self.pop(key);
    }

    fn flush(&mut self) {
        self.clear();
    }
}
