use std::fmt::Debug;
use std::marker::PhantomData;
use std::mem;
use std::sync::Arc;
use std::task::Poll;

use futures::future::{self, FutureExt};
use tokio::sync::mpsc;
use tracing::{span, Level};
use tracing_futures::Instrument;

use crate::{
    batch_executor,
    batch_function::BatchFunction,
    cache::Cache,
    cache_key::CacheKeyFn,
    error::LoadError,
    loader_op::{pending_future, resolved_future, LoadFuture, LoaderOp, PendingLoad},
    options::LoaderOptions,
};
#[cfg(feature = "stats")]
use crate::worker_stats::WorkerStats;

/// Returns `Pending` once after waking the current task, so the task is requeued behind the tasks
/// that are already runnable. Unlike `tokio::task::yield_now`, the wake is not deferred until
/// after the runtime has polled its driver, so timers that expired meanwhile fire afterwards.
async fn yield_to_runnable() {
    let mut yielded = false;
    future::poll_fn(|cx| {
        if yielded {
            Poll::Ready(())
        } else {
            yielded = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    })
    .await
}

/// A `LoaderWorker` is the "single-thread" worker task that owns a loader's cache and pending
/// batch.
///
/// Once started, it runs in a loop until the parent Loader aborts it's `JoinHandle` or drops the
/// request queue tx channel.
///
/// The worker can be in one of three states during its lifetime:
///
/// 1. Waiting for requests
/// 2. Admitting requests into the cache and the pending batch.
/// 3. Settling: yielding to the scheduler until no runnable task has more requests to add.
///
/// One cycle through this loop may be called an "execution frame".
///
/// In state (1), the worker awaits any messages on the request queue channel, idling until work arrives.
///
/// In state (2), Prime and Clear requests are resolved immediately against the cache. For every
/// key of a Load request the worker either hands out the cached `LoadFuture` or creates a new
/// unresolved one, caches it, and appends the key to the pending batch.
///
/// In state (3), the worker repeatedly drains the request queue and yields by waking itself, which
/// puts it behind every task that is already runnable without letting the runtime poll its timer
/// or I/O driver in between. Requests those tasks send during the frame land in the same batch;
/// requests issued by expired timers do not. Once a yield brings in nothing new
/// (and after the optional `batch_delay`), the pending batch is moved out, split by
/// `max_batch_size`, and every chunk is handed to its own executor task. The worker does not wait
/// for the batch function, so requests keep being admitted while batches are in flight.
pub struct LoaderWorker<K, V, F, C, CacheT>
where
    K: 'static + Debug + Clone + Send + Sync,
    V: 'static + Send + Sync + Clone,
    F: 'static + BatchFunction<K, V> + Send,
    F::Context: Send + Sync + 'static,
    F::Error: Send + Sync + 'static,
    CacheT: Cache<K = C, V = LoadFuture<V, F::Error>>,
{
    cache: CacheT,
    cache_key_fn: CacheKeyFn<K, C>,
    options: LoaderOptions,
    request_rx: mpsc::UnboundedReceiver<LoaderOp<K, V, F::Error>>,
    pending: Vec<PendingLoad<K, V, F::Error>>,
    context: Arc<F::Context>,
    phantom_batch_function: PhantomData<F>,
    #[cfg(feature = "stats")]
    stats: WorkerStats,
}

impl<K, V, F, C, CacheT> LoaderWorker<K, V, F, C, CacheT>
where
    K: 'static + Debug + Clone + Send + Sync,
    V: 'static + Send + Sync + Clone,
    F: 'static + BatchFunction<K, V> + Send,
    F::Context: Send + Sync + 'static,
    F::Error: Send + Sync + 'static,
    CacheT: Cache<K = C, V = LoadFuture<V, F::Error>>,
{
    pub fn new(
        cache: CacheT,
        cache_key_fn: CacheKeyFn<K, C>,
        options: LoaderOptions,
        request_rx: mpsc::UnboundedReceiver<LoaderOp<K, V, F::Error>>,
        context: F::Context,
    ) -> Self {
        Self {
            #[cfg(feature = "stats")]
            stats: WorkerStats::new(options.name),
            cache,
            cache_key_fn,
            options,
            request_rx,
            pending: Vec::new(),
            context: Arc::new(context),
            phantom_batch_function: PhantomData,
        }
    }

    pub async fn start(mut self) {
        loop {
            // Async await until we receive the first op.
            match self.request_rx.recv().await {
                None => {
                    tracing::info!("Tx channel closed. Terminating LoaderWorker.");
                    return;
                }
                Some(op) => self.mux_op(op),
            }
            if self.pending.is_empty() {
                continue;
            }
            self.settle().await;
            if let Some(delay) = self.options.batch_delay {
                tokio::time::sleep(delay).await;
                self.settle().await;
            }
            self.dispatch();
        }
    }

    /// Admits queued ops until a yield to the scheduler produces no new ones.
    async fn settle(&mut self) {
        loop {
            while let Some(Some(op)) = self.request_rx.recv().now_or_never() {
                self.mux_op(op);
            }
            yield_to_runnable().await;
            match self.request_rx.recv().now_or_never() {
                Some(Some(op)) => self.mux_op(op),
                _ => return,
            }
        }
    }

    fn mux_op(&mut self, op: LoaderOp<K, V, F::Error>) {
        match op {
            LoaderOp::Load(request) => {
                #[cfg(feature = "stats")]
                self.stats.record_load_request(request.keys().len());
                let futures = request.keys().iter().map(|key| self.admit(key)).collect::<Vec<_>>();
                request.send_response(futures);
            }
            LoaderOp::Prime { key, value, overwrite } => self.prime(&key, value, overwrite),
            LoaderOp::PrimeMany(key_vals) => {
                for (key, value) in key_vals {
                    self.prime(&key, Ok(value), false);
                }
            }
            LoaderOp::Clear(key) => {
                if self.options.cache {
                    let cache_key = (self.cache_key_fn)(&key);
                    self.cache.remove(&cache_key);
                }
            }
            LoaderOp::ClearMany(keys) => {
                if self.options.cache {
                    let cache_keys = keys.iter().map(|key| (self.cache_key_fn)(key)).collect::<Vec<_>>();
                    self.cache.remove_many(&cache_keys);
                }
            }
            LoaderOp::ClearAll => self.cache.flush(),
        }
    }

    /// Returns the future that will carry `key`'s outcome, admitting the key to the pending batch
    /// unless the cache already holds one.
    fn admit(&mut self, key: &K) -> LoadFuture<V, F::Error> {
        let cache_key = if self.options.cache {
            let cache_key = (self.cache_key_fn)(key);
            if let Some(cached) = self.cache.get(&cache_key).cloned() {
                #[cfg(feature = "stats")]
                self.stats.record_cache_hit();
                return cached;
            }
            Some(cache_key)
        } else {
            None
        };

        let (response_tx, future) = pending_future();
        if let Some(cache_key) = cache_key {
            self.cache.insert(cache_key, future.clone());
        }
        self.pending.push(PendingLoad { key: key.clone(), response_tx });
        if !self.options.batch {
            self.dispatch();
        }
        future
    }

    fn prime(&mut self, key: &K, value: Result<V, F::Error>, overwrite: bool) {
        if !self.options.cache {
            return;
        }
        let cache_key = (self.cache_key_fn)(key);
        if !overwrite && self.cache.get(&cache_key).is_some() {
            return;
        }
        let result = value.map_err(|e| LoadError::Rejected(Arc::new(e)));
        self.cache.insert(cache_key, resolved_future(result));
    }

    #[tracing::instrument(skip(self), fields(pending = self.pending.len()))]
    fn dispatch(&mut self) {
        let mut pending = mem::take(&mut self.pending);
        while !pending.is_empty() {
            let rest = pending.split_off(self.options.chunk_len(pending.len()));
            let batch = mem::replace(&mut pending, rest);
            self.execute(batch);
        }
    }

    fn execute(&mut self, batch: Vec<PendingLoad<K, V, F::Error>>) {
        #[cfg(feature = "stats")]
        self.stats.record_load_exec(batch.len());
        let span = span!(Level::DEBUG, "batch", size = batch.len());
        tokio::task::spawn(
            batch_executor::execute::<K, V, F>(batch, Arc::clone(&self.context)).instrument(span),
        );
    }
}
