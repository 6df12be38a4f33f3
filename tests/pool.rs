//! Integration tests for the capacity-limited pool manager.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use handle_pool::{BoxError, Manager, Pool, ResourceError, ResourceLifecycle};
use tokio_test::{assert_pending, task};
use uuid::Uuid;

/// Allocates unique tokens and counts callback invocations.
#[derive(Clone, Default)]
struct TokenLifecycle {
    created: Arc<AtomicUsize>,
    destroyed: Arc<AtomicUsize>,
    fail_create: Arc<AtomicBool>,
    fail_destroy: Arc<AtomicBool>,
}

#[async_trait]
impl ResourceLifecycle for TokenLifecycle {
    type Resource = Uuid;

    async fn create(&self) -> Result<Uuid, BoxError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err("creation refused".into());
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Uuid::now_v7())
    }

    async fn destroy(&self, _resource: &Uuid) -> Result<(), BoxError> {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
        if self.fail_destroy.load(Ordering::SeqCst) {
            return Err("teardown failed".into());
        }
        Ok(())
    }
}

#[tokio::test]
async fn rejects_zero_capacity() {
    let result = Pool::new(TokenLifecycle::default(), 0);
    assert!(matches!(result, Err(ResourceError::InvalidCapacity(0))));
}

#[tokio::test]
async fn acquire_allocates_new_resources_when_none_idle() {
    let lifecycle = TokenLifecycle::default();
    let pool = Pool::new(lifecycle.clone(), 2).expect("valid capacity");

    let h1 = pool.acquire().await.expect("first acquire");
    let h2 = pool.acquire().await.expect("second acquire");
    assert_ne!(h1.resource(), h2.resource());
    assert_ne!(h1, h2);
    assert_eq!(lifecycle.created.load(Ordering::SeqCst), 2);

    h1.release().await;
    h2.release().await;
}

#[tokio::test]
async fn acquire_times_out_when_all_checked_out() {
    let pool = Pool::new(TokenLifecycle::default(), 2).expect("valid capacity");

    let h1 = pool.acquire().await.expect("first acquire");
    let h2 = pool.acquire().await.expect("second acquire");

    let result = pool.acquire_timeout(Duration::from_millis(100)).await;
    assert!(matches!(
        result,
        Err(ResourceError::AcquireTimedOut { .. })
    ));

    h1.release().await;
    h2.release().await;
}

#[tokio::test]
async fn released_resource_is_the_one_reacquired() {
    let lifecycle = TokenLifecycle::default();
    let pool = Pool::new(lifecycle.clone(), 2).expect("valid capacity");

    let h1 = pool.acquire().await.expect("first acquire");
    let h2 = pool.acquire().await.expect("second acquire");
    let first = *h1.resource();

    h1.release().await;
    let h3 = pool.acquire().await.expect("reacquire");
    assert_eq!(*h3.resource(), first);
    assert_eq!(h3, h1);
    assert_eq!(lifecycle.created.load(Ordering::SeqCst), 2);

    h2.release().await;
    h3.release().await;
}

#[tokio::test]
async fn destroyed_resource_is_replaced_with_new() {
    let lifecycle = TokenLifecycle::default();
    let pool = Pool::new(lifecycle.clone(), 2).expect("valid capacity");

    let h1 = pool.acquire().await.expect("first acquire");
    let h2 = pool.acquire().await.expect("second acquire");
    let first = *h1.resource();

    h1.destroy().await.expect("destroy");
    assert_eq!(lifecycle.destroyed.load(Ordering::SeqCst), 1);

    let h3 = pool.acquire().await.expect("reacquire");
    assert_ne!(*h3.resource(), first);
    assert_ne!(h3.resource(), h2.resource());
    assert_eq!(lifecycle.created.load(Ordering::SeqCst), 3);

    h2.release().await;
    h3.release().await;
}

#[tokio::test]
async fn destroy_is_idempotent() {
    let lifecycle = TokenLifecycle::default();
    let pool = Pool::new(lifecycle.clone(), 1).expect("valid capacity");

    let h = pool.acquire().await.expect("acquire");
    h.destroy().await.expect("first destroy");
    h.destroy().await.expect("second destroy is a no-op");
    assert_eq!(lifecycle.destroyed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn release_is_idempotent() {
    let lifecycle = TokenLifecycle::default();
    let pool = Pool::new(lifecycle.clone(), 1).expect("valid capacity");

    let h = pool.acquire().await.expect("acquire");
    h.release().await;
    // A second release of an already-idle entry must not mint capacity.
    h.release().await;

    let h2 = pool.acquire().await.expect("reacquire");
    let result = pool.acquire_timeout(Duration::from_millis(100)).await;
    assert!(matches!(
        result,
        Err(ResourceError::AcquireTimedOut { .. })
    ));
    // The idle instance was reused; nothing new was created.
    assert_eq!(lifecycle.created.load(Ordering::SeqCst), 1);

    h2.release().await;
}

#[tokio::test]
async fn release_after_destroy_does_not_leak_capacity() {
    let lifecycle = TokenLifecycle::default();
    let pool = Pool::new(lifecycle.clone(), 1).expect("valid capacity");

    let h = pool.acquire().await.expect("acquire");
    h.destroy().await.expect("destroy");
    // The deferred-release-then-destroy pattern: this must not return a
    // second capacity token for the same slot.
    h.release().await;

    let h2 = pool.acquire().await.expect("capacity is free again");
    let result = pool.acquire_timeout(Duration::from_millis(100)).await;
    assert!(matches!(
        result,
        Err(ResourceError::AcquireTimedOut { .. })
    ));

    h2.release().await;
}

#[tokio::test]
async fn blocked_acquire_proceeds_after_release() {
    let lifecycle = TokenLifecycle::default();
    let pool = Pool::new(lifecycle.clone(), 1).expect("valid capacity");

    let h1 = pool.acquire().await.expect("acquire");
    let first = *h1.resource();

    let waiter = tokio::spawn({
        let pool = Arc::clone(&pool);
        async move { pool.acquire().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!waiter.is_finished());

    h1.release().await;
    let h2 = waiter
        .await
        .expect("waiter task")
        .expect("acquire after release");
    assert_eq!(*h2.resource(), first);

    h2.release().await;
}

#[tokio::test]
async fn cancelled_wait_consumes_no_capacity() {
    let lifecycle = TokenLifecycle::default();
    let pool = Pool::new(lifecycle.clone(), 1).expect("valid capacity");

    let h1 = pool.acquire().await.expect("acquire");

    let mut waiter = task::spawn(pool.acquire());
    assert_pending!(waiter.poll());
    drop(waiter);

    h1.release().await;
    let h2 = pool.acquire().await.expect("capacity intact after cancel");
    assert_eq!(lifecycle.created.load(Ordering::SeqCst), 1);

    h2.release().await;
}

#[tokio::test]
async fn failed_create_releases_capacity() {
    let lifecycle = TokenLifecycle::default();
    let pool = Pool::new(lifecycle.clone(), 1).expect("valid capacity");

    lifecycle.fail_create.store(true, Ordering::SeqCst);
    let result = pool.acquire().await;
    assert!(matches!(result, Err(ResourceError::Create(_))));

    lifecycle.fail_create.store(false, Ordering::SeqCst);
    let h = pool.acquire().await.expect("capacity was not leaked");
    h.release().await;
}

#[tokio::test]
async fn failed_destroy_still_frees_the_slot() {
    let lifecycle = TokenLifecycle::default();
    let pool = Pool::new(lifecycle.clone(), 1).expect("valid capacity");

    let h = pool.acquire().await.expect("acquire");
    let first = *h.resource();

    lifecycle.fail_destroy.store(true, Ordering::SeqCst);
    let result = h.destroy().await;
    assert!(matches!(result, Err(ResourceError::Destroy(_))));

    lifecycle.fail_destroy.store(false, Ordering::SeqCst);
    let h2 = pool.acquire().await.expect("slot was reclaimed");
    assert_ne!(*h2.resource(), first);

    h2.release().await;
}

#[tokio::test]
async fn close_blocks_acquire_and_destroys_everything() {
    let lifecycle = TokenLifecycle::default();
    let pool = Pool::new(lifecycle.clone(), 2).expect("valid capacity");

    let held = pool.acquire().await.expect("acquire");
    let idle = pool.acquire().await.expect("acquire");
    idle.release().await;

    pool.close().await.expect("close");
    assert_eq!(lifecycle.destroyed.load(Ordering::SeqCst), 2);

    let result = pool.acquire().await;
    assert!(matches!(result, Err(ResourceError::Closed)));

    // A second close is a no-op.
    pool.close().await.expect("close is idempotent");
    assert_eq!(lifecycle.destroyed.load(Ordering::SeqCst), 2);

    // A handle acquired before close can still be destroyed safely, and its
    // callback does not run a second time.
    held.destroy().await.expect("destroy after close");
    assert_eq!(lifecycle.destroyed.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn close_unblocks_waiters() {
    let lifecycle = TokenLifecycle::default();
    let pool = Pool::new(lifecycle.clone(), 1).expect("valid capacity");

    let _held = pool.acquire().await.expect("acquire");

    let waiter = tokio::spawn({
        let pool = Arc::clone(&pool);
        async move { pool.acquire().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!waiter.is_finished());

    pool.close().await.expect("close");
    let result = waiter.await.expect("waiter task");
    assert!(matches!(result, Err(ResourceError::Closed)));
}

#[tokio::test]
async fn close_aggregates_destroy_failures() {
    let lifecycle = TokenLifecycle::default();
    let pool = Pool::new(lifecycle.clone(), 2).expect("valid capacity");

    let h1 = pool.acquire().await.expect("acquire");
    let _h2 = pool.acquire().await.expect("acquire");
    h1.release().await;

    lifecycle.fail_destroy.store(true, Ordering::SeqCst);
    let result = pool.close().await;
    match result {
        Err(ResourceError::Close(failures)) => assert_eq!(failures.len(), 2),
        other => panic!("expected aggregated close error, got {other:?}"),
    }
    // Both callbacks ran despite both failing.
    assert_eq!(lifecycle.destroyed.load(Ordering::SeqCst), 2);
}
