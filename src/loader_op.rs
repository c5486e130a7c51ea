use std::slice;

use futures::future::{self, BoxFuture, FutureExt, Shared};
use tokio::sync::oneshot;

use crate::error::{LoadError, LoadResult};

/// A memoized, single-assignment load outcome.
///
/// Every clone of a `LoadFuture` resolves to the same value or error, so handing out clones of a
/// cached entry is how concurrent requesters of one key share a single load.
pub type LoadFuture<V, E> = Shared<BoxFuture<'static, LoadResult<V, E>>>;

/// Creates an unresolved `LoadFuture` together with the sender that will eventually resolve it.
///
/// If the sender is dropped without sending (e.g. the worker was aborted before dispatch) the
/// future resolves to [`LoadError::Canceled`].
pub(crate) fn pending_future<V, E>() -> (oneshot::Sender<LoadResult<V, E>>, LoadFuture<V, E>)
where
    V: 'static + Send + Sync + Clone,
    E: 'static + Send + Sync,
{
    let (tx, rx) = oneshot::channel();
    let future = rx.map(|received| received.unwrap_or(Err(LoadError::Canceled))).boxed().shared();
    (tx, future)
}

pub(crate) fn resolved_future<V, E>(result: LoadResult<V, E>) -> LoadFuture<V, E>
where
    V: 'static + Send + Sync + Clone,
    E: 'static + Send + Sync,
{
    future::ready(result).boxed().shared()
}

/// Set of possible requests that can be sent to the `LoaderWorker`.
///
/// The three categories of commands are Load, Prime, and Clear; each of which has a single and
/// many variant for convenience.
pub enum LoaderOp<K, V, E> {
    /// Fetch data from the resource wrapped by this data loader (or the cache).
    Load(LoadRequest<K, V, E>),
    /// Add an already known outcome to the cache. Existing entries are kept unless `overwrite`.
    Prime { key: K, value: Result<V, E>, overwrite: bool },
    PrimeMany(Vec<(K, V)>),
    /// Remove values from the cache so that they will be reloaded when they are next requested.
    Clear(K),
    ClearMany(Vec<K>),
    ClearAll,
}

pub enum LoadRequest<K, V, E> {
    One(K, oneshot::Sender<LoadFuture<V, E>>),
    Many(Vec<K>, oneshot::Sender<Vec<LoadFuture<V, E>>>),
}

impl<K, V, E> LoadRequest<K, V, E> {
    pub fn keys(&self) -> &[K] {
        match self {
            LoadRequest::One(ref key, _) => slice::from_ref(key),
            LoadRequest::Many(ref keys, _) => keys,
        }
    }

    /// Hands the futures for this request's keys, in key order, back to the requester.
    pub fn send_response(self, futures: Vec<LoadFuture<V, E>>) {
        let delivered = match self {
            LoadRequest::One(_, response_tx) => match futures.into_iter().next() {
                Some(future) => response_tx.send(future).is_ok(),
                None => false,
            },
            LoadRequest::Many(_, response_tx) => response_tx.send(futures).is_ok(),
        };
        if !delivered {
            tracing::trace!("receiver dropped");
        }
    }
}

/// A key admitted to the pending batch, paired with the sender that settles its `LoadFuture`.
pub(crate) struct PendingLoad<K, V, E> {
    pub key: K,
    pub response_tx: oneshot::Sender<LoadResult<V, E>>,
}

impl<K, V, E> PendingLoad<K, V, E> {
    pub fn resolve(self, result: LoadResult<V, E>) {
        if self.response_tx.send(result).is_err() {
            tracing::trace!("load future dropped before resolution");
        }
    }
}
