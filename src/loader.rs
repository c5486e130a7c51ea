use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::marker::PhantomData;
use std::num::NonZeroUsize;
use std::ops::Drop;
use std::time::Duration;

use futures::future;
use tokio::sync::{mpsc, oneshot};
use tracing::{span, Level};
use tracing_futures::Instrument;

use crate::{
    batch_function::BatchFunction,
    cache::Cache,
    cache_key::{self, CacheKeyFn},
    error::{LoadError, LoadResult},
    loader_op::{LoadFuture, LoadRequest, LoaderOp},
    loader_worker::LoaderWorker,
    options::LoaderOptions,
};

/// Batch loads values from some expensive resource, primarily intended for mitigating GraphQL's
/// N+1 problem.
///
/// Users can call [`Loader::load`] and [`Loader::load_many`] to fetch values from the underlying
/// resource or cache. Every key requested during one execution frame is handed to the
/// `BatchFunction` in a single call, and each key's outcome is memoized until it is removed with
/// [`Loader::clear`], [`Loader::clear_many`] or [`Loader::clear_all`]. Values can be added to the
/// cache out-of-band through the use of [`Loader::prime`] and [`Loader::prime_many`].
///
/// The `Loader` struct acts as an intermediary between the async domain in which `load` calls are
/// invoked and the pseudo-single-threaded domain of the `LoaderWorker`. Callers can invoke the
/// `Loader` from multiple parallel tasks, and the loader will enqueue the requested operations on
/// the request queue for processing by its `LoaderWorker`. The worker processes the requests
/// sequentially, so a `clear` or `prime` is always observed by every `load` issued after it.
pub struct Loader<K, V, E>
where
    K: 'static + Send,
    V: 'static + Send + Sync + Clone,
    E: 'static + Send + Sync,
{
    request_tx: mpsc::UnboundedSender<LoaderOp<K, V, E>>,
    load_task_handle: tokio::task::JoinHandle<()>,
}

impl<K, V, E> Drop for Loader<K, V, E>
where
    K: 'static + Send,
    V: 'static + Send + Sync + Clone,
    E: 'static + Send + Sync,
{
    fn drop(&mut self) {
        self.load_task_handle.abort();
    }
}

impl<K, V, E> Loader<K, V, E>
where
    K: 'static + Eq + Debug + Clone + Hash + Send + Sync,
    V: 'static + Send + Sync + Clone,
    E: 'static + Send + Sync,
{
    /// Creates a new Loader for the provided BatchFunction and Context type, with batching and
    /// caching enabled. Keys are their own cache keys, hence the `Eq + Hash` bounds; loaders over
    /// other key types go through [`Loader::builder`] and [`LoaderBuilder::cache_key_fn`].
    ///
    /// Note: the batch function is passed in as a marker for type inference.
    pub fn new<F>(batch_fn: F, context: F::Context) -> Self
    where
        F: 'static + BatchFunction<K, V, Error = E> + Send,
        F::Context: Send + Sync + 'static,
    {
        Self::builder(batch_fn, context).build()
    }
}

impl<K, V, E> Loader<K, V, E>
where
    K: 'static + Debug + Clone + Send + Sync,
    V: 'static + Send + Sync + Clone,
    E: 'static + Send + Sync,
{
    /// Starts configuring a Loader. See [`LoaderBuilder`] for the available options.
    pub fn builder<F>(
        _: F,
        context: F::Context,
    ) -> LoaderBuilder<K, V, F, K, HashMap<K, LoadFuture<V, E>>>
    where
        F: BatchFunction<K, V, Error = E>,
    {
        LoaderBuilder {
            context,
            options: LoaderOptions::new(std::any::type_name::<(K, V)>()),
            cache_key_fn: cache_key::identity(),
            cache: HashMap::new(),
            phantom: PhantomData,
        }
    }
}

impl<K, V, E> Loader<K, V, E>
where
    K: 'static + Send,
    V: 'static + Send + Sync + Clone,
    E: 'static + Send + Sync,
{
    /// Loads a value from the underlying resource.
    ///
    /// The request is queued when this method is called, not when the returned future is first
    /// polled, so requests are batched in call order. If the key is already cached, the cached
    /// outcome (value or error) is returned. Otherwise the key is enqueued for batch loading in
    /// the current loader execution frame.
    pub fn load(&self, key: K) -> impl Future<Output = LoadResult<V, E>> + Send + 'static {
        let (response_tx, response_rx) = oneshot::channel();
        self.send(LoaderOp::Load(LoadRequest::One(key, response_tx)));
        async move {
            match response_rx.await {
                Ok(future) => future.await,
                Err(_) => Err(LoadError::Canceled),
            }
        }
    }

    /// Loads many values at once.
    ///
    /// The returned vector lines up with `keys`. A key that fails to load occupies its position
    /// with its error; the call as a whole never fails.
    pub fn load_many(
        &self,
        keys: Vec<K>,
    ) -> impl Future<Output = Vec<LoadResult<V, E>>> + Send + 'static {
        let requested = keys.len();
        let (response_tx, response_rx) = oneshot::channel();
        self.send(LoaderOp::Load(LoadRequest::Many(keys, response_tx)));
        async move {
            match response_rx.await {
                Ok(futures) => future::join_all(futures).await,
                Err(_) => (0..requested).map(|_| Err(LoadError::Canceled)).collect(),
            }
        }
    }

    /// Adds a value to the cache, unless the key is already cached.
    pub fn prime(&self, key: K, value: V) -> &Self {
        self.send(LoaderOp::Prime { key, value: Ok(value), overwrite: false })
    }

    /// Caches a failure for the key, unless the key is already cached. Later loads of the key
    /// reject with [`LoadError::Rejected`] until it is cleared.
    pub fn prime_error(&self, key: K, error: E) -> &Self {
        self.send(LoaderOp::Prime { key, value: Err(error), overwrite: false })
    }

    /// Adds many values to the cache at once. Keys that are already cached keep their entry.
    pub fn prime_many(&self, key_vals: Vec<(K, V)>) -> &Self {
        self.send(LoaderOp::PrimeMany(key_vals))
    }

    /// Replaces whatever is cached for the key with the given outcome.
    pub fn overwrite(&self, key: K, value: Result<V, E>) -> &Self {
        self.send(LoaderOp::Prime { key, value, overwrite: true })
    }

    /// Removes a value from the cache.
    ///
    /// This key will be reloaded when it is next requested. Requests already waiting on an
    /// in-flight batch still receive that batch's outcome.
    pub fn clear(&self, key: K) -> &Self {
        self.send(LoaderOp::Clear(key))
    }

    /// Removes multiple values from the cache at once.
    ///
    /// These keys will be reloaded when requested.
    pub fn clear_many(&self, keys: Vec<K>) -> &Self {
        self.send(LoaderOp::ClearMany(keys))
    }

    /// Empties the cache.
    pub fn clear_all(&self) -> &Self {
        self.send(LoaderOp::ClearAll)
    }

    fn send(&self, op: LoaderOp<K, V, E>) -> &Self {
        if self.request_tx.send(op).is_err() {
            tracing::warn!("LoaderWorker terminated; dropping request");
        }
        self
    }
}

/// Configures and spawns a [`Loader`].
///
/// ```ignore
/// let loader = Loader::builder(UserBatchFn, pool)
///     .max_batch_size(100)
///     .cache_key_fn(|email: &String| email.to_lowercase())
///     .build();
/// ```
pub struct LoaderBuilder<K, V, F, C, CacheT>
where
    F: BatchFunction<K, V>,
{
    context: F::Context,
    options: LoaderOptions,
    cache_key_fn: CacheKeyFn<K, C>,
    cache: CacheT,
    phantom: PhantomData<fn() -> (V, F)>,
}

impl<K, V, F, C, CacheT> LoaderBuilder<K, V, F, C, CacheT>
where
    F: BatchFunction<K, V>,
{
    /// Enables or disables batching. Without batching every request is loaded on its own.
    pub fn batch(mut self, enabled: bool) -> Self {
        self.options.batch = enabled;
        self
    }

    /// Enables or disables memoization. Without it, every request (including repeats of a key
    /// within the same frame) gets its own slot in the batch.
    pub fn cache(mut self, enabled: bool) -> Self {
        self.options.cache = enabled;
        self
    }

    /// Caps the number of keys per batch function call; larger frames are split into several
    /// consecutive calls. Zero is treated as one.
    pub fn max_batch_size(mut self, max: usize) -> Self {
        self.options.max_batch_size = NonZeroUsize::new(max.max(1));
        self
    }

    /// Keeps each batch open for `delay` after the scheduler settles, so requests made within
    /// that window share a batch.
    pub fn batch_delay(mut self, delay: Duration) -> Self {
        self.options.batch_delay = Some(delay);
        self
    }

    /// Sets the name recorded on the loader's tracing spans.
    pub fn name(mut self, name: &'static str) -> Self {
        self.options.name = name;
        self
    }

    /// Sets the function mapping keys to cache keys.
    ///
    /// Changing the cache key type resets the cache store to a `HashMap`, so call this before
    /// [`LoaderBuilder::cache_map`].
    pub fn cache_key_fn<C2, N>(
        self,
        normalizer: N,
    ) -> LoaderBuilder<K, V, F, C2, HashMap<C2, LoadFuture<V, F::Error>>>
    where
        N: Fn(&K) -> C2 + Send + Sync + 'static,
    {
        LoaderBuilder {
            context: self.context,
            options: self.options,
            cache_key_fn: Box::new(normalizer),
            cache: HashMap::new(),
            phantom: PhantomData,
        }
    }

    /// Replaces the default `HashMap` cache store.
    pub fn cache_map<S>(self, cache: S) -> LoaderBuilder<K, V, F, C, S>
    where
        S: Cache<K = C, V = LoadFuture<V, F::Error>>,
    {
        LoaderBuilder {
            context: self.context,
            options: self.options,
            cache_key_fn: self.cache_key_fn,
            cache,
            phantom: PhantomData,
        }
    }

    /// Spawns the loader's worker onto the current tokio runtime.
    pub fn build(self) -> Loader<K, V, F::Error>
    where
        K: 'static + Debug + Clone + Send + Sync,
        V: 'static + Send + Sync + Clone,
        F: 'static + Send,
        F::Context: Send + Sync + 'static,
        F::Error: Send + Sync + 'static,
        C: Send + 'static,
        CacheT: Cache<K = C, V = LoadFuture<V, F::Error>> + Send + 'static,
    {
        let span = span!(Level::TRACE, "LoaderWorker", loader = self.options.name);
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = LoaderWorker::<K, V, F, C, CacheT>::new(
            self.cache,
            self.cache_key_fn,
            self.options,
            rx,
            self.context,
        );
        Loader {
            request_tx: tx,
            load_task_handle: tokio::task::spawn(worker.start().instrument(span)),
        }
    }
}
