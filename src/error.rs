use std::sync::Arc;

use thiserror::Error;

/// Result delivered to every caller of [`Loader::load`](crate::Loader::load).
pub type LoadResult<V, E> = Result<V, LoadError<E>>;

/// Reasons a load request can fail.
///
/// Errors produced by the batch function are wrapped in an `Arc` so that every requester sharing a
/// cached future, or a failed batch, observes the very same error value.
#[derive(Error, Debug, PartialEq)]
pub enum LoadError<E> {
    /// The batch function reported an error for this key only.
    #[error("{0}")]
    Rejected(Arc<E>),

    /// The batch function call failed as a whole. All keys of the batch share this error.
    #[error("batch function failed: {0}")]
    BatchFailed(Arc<E>),

    /// The batch function returned a result set whose length does not match the requested keys.
    #[error("batch function returned {actual} values for {expected} keys")]
    ShapeMismatch { expected: usize, actual: usize },

    /// The loader was dropped before the request could be resolved.
    #[error("loader shut down before the request resolved")]
    Canceled,
}

impl<E> LoadError<E> {
    /// The error produced by the batch function, if this failure originated there.
    pub fn inner(&self) -> Option<&Arc<E>> {
        match self {
            LoadError::Rejected(e) | LoadError::BatchFailed(e) => Some(e),
            LoadError::ShapeMismatch { .. } | LoadError::Canceled => None,
        }
    }
}

// Derived `Clone` would require `E: Clone`; only the `Arc` is cloned here.
impl<E> Clone for LoadError<E> {
    fn clone(&self) -> Self {
        match self {
            LoadError::Rejected(e) => LoadError::Rejected(Arc::clone(e)),
            LoadError::BatchFailed(e) => LoadError::BatchFailed(Arc::clone(e)),
            LoadError::ShapeMismatch { expected, actual } => {
                LoadError::ShapeMismatch { expected: *expected, actual: *actual }
            }
            LoadError::Canceled => LoadError::Canceled,
        }
    }
}
