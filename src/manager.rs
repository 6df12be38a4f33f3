//! The polymorphic manager contract and its lifecycle collaborator.

use std::time::Duration;

use async_trait::async_trait;

use crate::errors::{BoxError, ResourceError, ResourceResult};
use crate::handle::Handle;

/// User-supplied construction and teardown for a managed resource type.
///
/// The managers never inspect the resource itself; they only call these two
/// hooks and track availability. Both hooks may fail. `create` may block
/// (e.g. dialing a connection); if it can run for a long time it should
/// implement its own internal cancellation, because the manager does not
/// interrupt it once the capacity wait has completed. `destroy` should not
/// block indefinitely, and its failure never prevents the manager from
/// cleaning up its own bookkeeping.
#[async_trait]
pub trait ResourceLifecycle: Send + Sync + 'static {
    /// The resource type being managed.
    type Resource: Send + Sync + 'static;

    /// Allocate a new resource instance.
    async fn create(&self) -> Result<Self::Resource, BoxError>;

    /// Tear down a resource instance.
    async fn destroy(&self, resource: &Self::Resource) -> Result<(), BoxError>;
}

/// A manager issues, reclaims, and disposes of [`Handle`]s for resources of
/// type `T`.
///
/// Implemented by [`Pool`](crate::Pool) (up to N exclusive instances) and
/// [`Shareable`](crate::Shareable) (one shared instance). Callers hold the
/// manager behind `Arc<dyn Manager<T>>` or a concrete `Arc` and stay
/// agnostic to the variant.
#[async_trait]
pub trait Manager<T>: Send + Sync {
    /// Acquire a managed resource, suspending until capacity is available.
    ///
    /// The wait is cancel-safe: dropping the returned future before it
    /// completes consumes no capacity and touches no resource. Fails with
    /// [`ResourceError::Closed`] once the manager has been closed, or with
    /// [`ResourceError::Create`] if a new resource had to be allocated and
    /// the create callback failed.
    async fn acquire(&self) -> ResourceResult<Handle<T>>;

    /// Like [`acquire`](Manager::acquire), but gives up with
    /// [`ResourceError::AcquireTimedOut`] if no capacity becomes available
    /// within `timeout`.
    async fn acquire_timeout(&self, timeout: Duration) -> ResourceResult<Handle<T>> {
        tokio::time::timeout(timeout, self.acquire())
            .await
            .map_err(|_| ResourceError::AcquireTimedOut { timeout })?
    }

    /// Return a resource so other callers can acquire it.
    ///
    /// Silently ignores a handle whose resource has already been destroyed;
    /// callers commonly defer a release and then destroy on an error path.
    async fn release(&self, handle: &Handle<T>);

    /// Tear down a resource, usually because it is broken, freeing its
    /// capacity for a fresh instance.
    ///
    /// Idempotent: destroying a handle that is already gone is a successful
    /// no-op. A destroy-callback error is returned, but the manager's
    /// bookkeeping is cleaned up regardless.
    async fn destroy(&self, handle: &Handle<T>) -> ResourceResult<()>;

    /// Stop issuing handles and destroy every remaining resource.
    ///
    /// Idempotent. Any acquirers still waiting for capacity are woken and
    /// observe [`ResourceError::Closed`]. Destroy-callback failures are
    /// aggregated into [`ResourceError::Close`]; cleanup always runs to
    /// completion.
    async fn close(&self) -> ResourceResult<()>;
}
