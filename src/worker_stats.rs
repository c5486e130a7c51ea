/// Batching counters for one loader, reported through `tracing` when its worker shuts down.
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Loader name the report is tagged with.
    tag: &'static str,
    /// `load` and `load_many` calls seen by the worker.
    load_requests: u64,
    /// Keys across all of those calls, repeats included.
    items_requested: u64,
    /// Keys answered by an existing cache entry.
    cache_hits: u64,
    /// Batch function invocations.
    loads: u64,
    average_batch_size: f64,
    max_batch_size: u64,
    min_batch_size: u64,
}

impl WorkerStats {
    pub fn new(tag: &'static str) -> Self {
        Self { tag, min_batch_size: u64::MAX, ..Default::default() }
    }

    pub fn record_load_request(&mut self, keys: usize) {
        self.load_requests += 1;
        self.items_requested += keys as u64;
    }

    pub fn record_cache_hit(&mut self) {
        self.cache_hits += 1;
    }

    /// Folds one dispatched batch into the running size statistics.
    pub fn record_load_exec(&mut self, batch_size: usize) {
        let size = batch_size as u64;
        let total = self.average_batch_size * self.loads as f64 + size as f64;
        self.loads += 1;
        self.average_batch_size = total / self.loads as f64;
        self.max_batch_size = self.max_batch_size.max(size);
        self.min_batch_size = self.min_batch_size.min(size);
    }
}

impl Drop for WorkerStats {
    fn drop(&mut self) {
        tracing::debug!(worker_stats = ?self);
    }
}
