/// Maps a caller supplied key onto the key used for cache identity.
///
/// Two keys that normalize to the same value share one cache entry, and therefore one slot in a
/// batch. Normalizers must be pure and deterministic: the loader invokes them once per request,
/// and again on `clear` and `prime`, and expects the same answer every time.
pub type CacheKeyFn<K, C> = Box<dyn Fn(&K) -> C + Send + Sync>;

/// The default normalizer: a key is its own cache key.
pub(crate) fn identity<K: Clone + 'static>() -> CacheKeyFn<K, K> {
    Box::new(K::clone)
}
