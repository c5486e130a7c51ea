use async_trait::async_trait;

/// Outcome of one `BatchFunction` invocation.
///
/// The outer `Err` reports that the call as a whole failed. Otherwise the vector holds exactly one
/// entry per requested key, in the order the keys were provided, each either the loaded value or
/// the error for that key alone.
pub type BatchResult<V, E> = Result<Vec<Result<V, E>>, E>;

/// A `BatchFunction` defines the method through which some `Loader` may fetch
/// batched data from some resource. The `BatchFunction` receives a slice of keys
/// that have been requested during the `Loader`'s most recent execution frame, and some user
/// defined context struct.
///
/// The returned vector must line up 1:1 with `keys`. A result of any other length is treated as a
/// contract violation and every requester in the batch receives
/// [`LoadError::ShapeMismatch`](crate::LoadError::ShapeMismatch). Keys may repeat when the loader
/// runs with caching disabled; each occurrence needs its own entry.
///
/// Multiple `BatchFunctions` (and therefore loaders) can share the same context (likely through an
/// `Arc`).
#[async_trait]
pub trait BatchFunction<K, V> {
    type Context;
    type Error;
    async fn load(keys: &[K], context: &Self::Context) -> BatchResult<V, Self::Error>;
}
