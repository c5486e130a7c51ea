use std::num::NonZeroUsize;
use std::time::Duration;

/// Per-loader configuration. Built through [`LoaderBuilder`](crate::LoaderBuilder).
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Coalesce requests into batches. When disabled, every request is dispatched on its own as
    /// soon as the worker sees it.
    pub batch: bool,
    /// Memoize load futures by normalized key.
    pub cache: bool,
    /// Upper bound on keys handed to one batch function call. `None` is unbounded.
    pub max_batch_size: Option<NonZeroUsize>,
    /// Extra time to keep a batch open after the scheduler has settled.
    pub batch_delay: Option<Duration>,
    /// Name recorded on the worker's tracing span.
    pub name: &'static str,
}

impl LoaderOptions {
    pub(crate) fn new(name: &'static str) -> Self {
        Self { batch: true, cache: true, max_batch_size: None, batch_delay: None, name }
    }

    /// Number of pending keys that go into the next dispatched chunk.
    pub(crate) fn chunk_len(&self, pending: usize) -> usize {
        self.max_batch_size.map_or(pending, |max| max.get().min(pending))
    }
}
