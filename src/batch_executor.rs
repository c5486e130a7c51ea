use std::fmt::Debug;
use std::sync::Arc;

use crate::{
    batch_function::BatchFunction,
    error::LoadError,
    loader_op::PendingLoad,
};

/// Runs the batch function for one dispatched batch and settles every future in it.
///
/// A failure of the call itself rejects the whole batch with one shared error, and so does a
/// result of the wrong length. Otherwise outcomes are matched to requesters by position and only
/// the keys the batch function marked as failed are rejected.
pub(crate) async fn execute<K, V, F>(
    batch: Vec<PendingLoad<K, V, F::Error>>,
    context: Arc<F::Context>,
) where
    K: 'static + Debug + Clone + Send + Sync,
    V: 'static + Send,
    F: BatchFunction<K, V>,
    F::Context: Send + Sync,
    F::Error: Send + Sync,
{
    let keys = batch.iter().map(|pending| pending.key.clone()).collect::<Vec<_>>();
    tracing::debug!(?keys, "executing batch");

    match F::load(&keys, &context).await {
        Err(error) => {
            tracing::debug!(batch_size = keys.len(), "batch function failed");
            let error = Arc::new(error);
            for pending in batch {
                pending.resolve(Err(LoadError::BatchFailed(Arc::clone(&error))));
            }
        }
        Ok(values) if values.len() != keys.len() => {
            let (expected, actual) = (keys.len(), values.len());
            tracing::error!(expected, actual, "batch function result does not match requested keys");
            for pending in batch {
                pending.resolve(Err(LoadError::ShapeMismatch { expected, actual }));
            }
        }
        Ok(values) => {
            for (pending, value) in batch.into_iter().zip(values) {
                pending.resolve(value.map_err(|e| LoadError::Rejected(Arc::new(e))));
            }
        }
    }
}
