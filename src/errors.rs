//! Error types for resource managers.
//!
//! All failures are returned synchronously to the caller of the failing
//! operation; the managers never log or swallow an error themselves. Callback
//! failures from [`ResourceLifecycle`](crate::ResourceLifecycle) are carried
//! as boxed sources so any user error type flows through unchanged.

use std::time::Duration;

use thiserror::Error;

/// Boxed error type used for user-supplied lifecycle callback failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result alias for manager operations.
pub type ResourceResult<T> = Result<T, ResourceError>;

/// Errors produced by resource managers.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The manager has been closed and no longer issues handles.
    #[error("manager closed")]
    Closed,

    /// The wait for capacity exceeded the caller's deadline.
    #[error("timed out after {timeout:?} while waiting for capacity")]
    AcquireTimedOut {
        /// The deadline that was exceeded.
        timeout: Duration,
    },

    /// A pool was configured with an unusable capacity.
    #[error("capacity must be 1 or greater, got {0}")]
    InvalidCapacity(usize),

    /// The create callback failed; no resource was allocated and no capacity
    /// was consumed.
    #[error("failed to allocate new resource")]
    Create(#[source] BoxError),

    /// The destroy callback failed. The manager's bookkeeping (map entry,
    /// capacity token) was still cleaned up.
    #[error("failed to destroy resource")]
    Destroy(#[source] BoxError),

    /// One or more resources failed to destroy while closing the manager.
    /// Every remaining resource was still drained and its capacity freed.
    #[error("{} resource(s) failed to destroy during close", .0.len())]
    Close(Vec<ResourceError>),
}
