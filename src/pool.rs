//! The capacity-limited manager.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::{debug, trace};

use crate::errors::{ResourceError, ResourceResult};
use crate::handle::Handle;
use crate::manager::{Manager, ResourceLifecycle};
use crate::store::SharedMap;

/// A [`Manager`] that maintains up to a fixed number of instances of the
/// managed resource, each loaned out exclusively.
///
/// Admission is gated by a counting semaphore initialized to the capacity.
/// Every checked-out entry corresponds to exactly one held permit; idle
/// entries hold none. A new resource is only allocated while holding both a
/// permit and the table lock with zero idle entries in sight, which is what
/// keeps the number of live instances at or below capacity.
pub struct Pool<L: ResourceLifecycle> {
    items: SharedMap<Handle<L::Resource>, bool>,
    semaphore: Semaphore,
    closed: AtomicBool,
    lifecycle: L,
    weak_self: Weak<Self>,
}

impl<L: ResourceLifecycle> Pool<L> {
    /// Create a pool that will maintain up to `capacity` resource instances.
    ///
    /// Fails with [`ResourceError::InvalidCapacity`] if `capacity` is zero.
    pub fn new(lifecycle: L, capacity: usize) -> ResourceResult<Arc<Self>> {
        if capacity < 1 {
            return Err(ResourceError::InvalidCapacity(capacity));
        }
        Ok(Arc::new_cyclic(|weak_self| Self {
            items: SharedMap::with_capacity(capacity),
            semaphore: Semaphore::new(capacity),
            closed: AtomicBool::new(false),
            lifecycle,
            weak_self: weak_self.clone(),
        }))
    }

    fn as_manager(&self) -> Weak<dyn Manager<L::Resource>> {
        self.weak_self.clone()
    }
}

#[async_trait]
impl<L: ResourceLifecycle> Manager<L::Resource> for Pool<L> {
    async fn acquire(&self) -> ResourceResult<Handle<L::Resource>> {
        // The semaphore is never closed, so this only resolves with a permit.
        // Dropping the future here is side-effect free.
        let permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| ResourceError::Closed)?;

        let mut items = self.items.lock().await;
        if self.closed.load(Ordering::SeqCst) {
            // Closed between the permit grant and the table lock. The permit
            // drops with this return, so no capacity is leaked.
            return Err(ResourceError::Closed);
        }

        // Prefer an idle instance.
        for (existing, available) in items.iter_mut() {
            if *available {
                *available = false;
                let handle = existing.clone();
                permit.forget();
                trace!(id = %handle.id(), "reusing idle resource");
                return Ok(handle);
            }
        }

        // Nothing idle, so allocate. The table stays locked for the duration,
        // keeping the scan-or-create sequence atomic against other acquirers.
        let resource = self
            .lifecycle
            .create()
            .await
            .map_err(ResourceError::Create)?;
        let handle = Handle::new(resource, self.as_manager());
        items.insert(handle.clone(), false);
        // The permit is now carried by the checked-out entry; it comes back
        // through release, destroy, or close.
        permit.forget();
        debug!(id = %handle.id(), "allocated new pooled resource");
        Ok(handle)
    }

    async fn release(&self, handle: &Handle<L::Resource>) {
        if !self.items.compare_and_update(handle, &false, true).await {
            // Either already destroyed (the caller likely deferred a release
            // before hitting an error that warranted destroying the
            // resource) or already idle from an earlier release. Neither
            // holds a permit, so returning one would mint capacity.
            return;
        }
        // Marked idle before the permit returns, so whoever wins the freed
        // permit finds this entry instead of allocating past capacity.
        self.semaphore.add_permits(1);
        trace!(id = %handle.id(), "resource returned to pool");
    }

    async fn destroy(&self, handle: &Handle<L::Resource>) -> ResourceResult<()> {
        let Some(available) = self.items.remove(handle).await else {
            // Already destroyed, most likely because the pool was closed.
            return Ok(());
        };
        let result = self
            .lifecycle
            .destroy(handle.resource())
            .await
            .map_err(ResourceError::Destroy);
        if !available {
            // The entry was checked out; free its capacity for a fresh
            // instance. Idle entries hold no permit.
            self.semaphore.add_permits(1);
        }
        debug!(id = %handle.id(), "destroyed pooled resource");
        result
    }

    async fn close(&self) -> ResourceResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let mut failures = Vec::new();
        let mut items = self.items.lock().await;
        for (handle, available) in items.drain() {
            if let Err(source) = self.lifecycle.destroy(handle.resource()).await {
                failures.push(ResourceError::Destroy(source));
            }
            if !available {
                // Wake acquirers still blocked on capacity; they observe the
                // closed flag and fail instead of hanging forever.
                self.semaphore.add_permits(1);
            }
        }
        drop(items);
        debug!("pool closed");
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ResourceError::Close(failures))
        }
    }
}
