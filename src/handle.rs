//! The capability token loaned to callers of a manager.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

use uuid::Uuid;

use crate::errors::ResourceResult;
use crate::manager::Manager;

/// A loan of one managed resource.
///
/// Handles are cheap to clone and compare by identity, not by resource
/// content: every allocation gets a fresh UUIDv7, and two handles are equal
/// only if they refer to the same allocation. The issuing manager owns the
/// resource's lifecycle; the handle only borrows it and delegates
/// [`release`](Handle::release) and [`destroy`](Handle::destroy) back to the
/// manager that issued it.
pub struct Handle<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    id: Uuid,
    resource: T,
    manager: Weak<dyn Manager<T>>,
}

impl<T> Handle<T> {
    pub(crate) fn new(resource: T, manager: Weak<dyn Manager<T>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: Uuid::now_v7(),
                resource,
                manager,
            }),
        }
    }

    /// The identity of this allocation.
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Borrow the managed resource.
    pub fn resource(&self) -> &T {
        &self.inner.resource
    }

    /// Return the resource to the issuing manager for reuse by others.
    pub async fn release(&self) {
        if let Some(manager) = self.inner.manager.upgrade() {
            manager.release(self).await;
        }
    }

    /// Ask the issuing manager to tear the resource down.
    ///
    /// A no-op returning `Ok(())` if the resource is already gone or the
    /// manager has been dropped.
    pub async fn destroy(&self) -> ResourceResult<()> {
        match self.inner.manager.upgrade() {
            Some(manager) => manager.destroy(self).await,
            None => Ok(()),
        }
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.inner.id)
            .finish_non_exhaustive()
    }
}
