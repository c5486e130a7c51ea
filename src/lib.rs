mod batch_executor;
mod batch_function;
mod cache;
mod cache_key;
mod error;
mod loader;
mod loader_op;
mod loader_worker;
mod options;
#[cfg(feature = "stats")]
mod worker_stats;

pub use batch_function::{BatchFunction, BatchResult};
pub use cache::Cache;
pub use error::{LoadError, LoadResult};
pub use loader::{Loader, LoaderBuilder};
pub use loader_op::LoadFuture;
