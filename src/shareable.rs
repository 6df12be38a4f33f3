//! The single-instance shared manager.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::errors::{ResourceError, ResourceResult};
use crate::handle::Handle;
use crate::manager::{Manager, ResourceLifecycle};

/// A [`Manager`] for a shareable resource: it maintains a single instance and
/// hands the same handle to every caller.
///
/// There is no checkout accounting and no capacity wait. `release` is a
/// no-op; the instance lives until someone destroys it (forcing the next
/// acquire to allocate a fresh one) or the manager is closed.
pub struct Shareable<L: ResourceLifecycle> {
    slot: Mutex<Option<Handle<L::Resource>>>,
    closed: AtomicBool,
    lifecycle: L,
    weak_self: Weak<Self>,
}

impl<L: ResourceLifecycle> Shareable<L> {
    /// Create a manager for one shared resource instance.
    pub fn new(lifecycle: L) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            slot: Mutex::new(None),
            closed: AtomicBool::new(false),
            lifecycle,
            weak_self: weak_self.clone(),
        })
    }

    fn as_manager(&self) -> Weak<dyn Manager<L::Resource>> {
        self.weak_self.clone()
    }
}

#[async_trait]
impl<L: ResourceLifecycle> Manager<L::Resource> for Shareable<L> {
    async fn acquire(&self) -> ResourceResult<Handle<L::Resource>> {
        let mut slot = self.slot.lock().await;
        if self.closed.load(Ordering::SeqCst) {
            return Err(ResourceError::Closed);
        }
        if let Some(handle) = slot.as_ref() {
            return Ok(handle.clone());
        }
        let resource = self
            .lifecycle
            .create()
            .await
            .map_err(ResourceError::Create)?;
        let handle = Handle::new(resource, self.as_manager());
        *slot = Some(handle.clone());
        debug!(id = %handle.id(), "allocated shared resource");
        Ok(handle)
    }

    async fn release(&self, _handle: &Handle<L::Resource>) {
        // Shared resources are never checked in or out, only created and
        // destroyed.
    }

    async fn destroy(&self, handle: &Handle<L::Resource>) -> ResourceResult<()> {
        let mut slot = self.slot.lock().await;
        match slot.as_ref() {
            Some(current) if current == handle => {}
            // The slot is empty or holds a newer instance; a stale destroy is
            // fairly likely with a shared resource.
            _ => return Ok(()),
        }
        let result = self
            .lifecycle
            .destroy(handle.resource())
            .await
            .map_err(ResourceError::Destroy);
        *slot = None;
        debug!(id = %handle.id(), "destroyed shared resource");
        result
    }

    async fn close(&self) -> ResourceResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        let current = self.slot.lock().await.clone();
        match current {
            Some(handle) => self.destroy(&handle).await,
            None => Ok(()),
        }
    }
}
