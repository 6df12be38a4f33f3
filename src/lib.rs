//! Bounded pooling of expensive-to-create resources.
//!
//! This crate manages exclusive access to a limited set of resources (database
//! connections, device handles, worker slots) shared by concurrent callers. A
//! caller asks a [`Manager`] for a resource, waits for capacity if necessary,
//! receives a [`Handle`], uses the resource, and then either releases it back
//! for reuse or destroys it because it is broken.
//!
//! Two manager variants are provided:
//!
//! - [`Pool`] maintains up to a fixed number of resource instances, handing
//!   each one out exclusively. Admission is gated by a counting semaphore, so
//!   `acquire` suspends until capacity frees up or the caller gives up.
//! - [`Shareable`] maintains a single instance that every caller shares
//!   concurrently. There is no checkout accounting; the resource lives until
//!   it is explicitly destroyed or the manager is closed.
//!
//! Resource construction and teardown are supplied through the
//! [`ResourceLifecycle`] trait, and both variants expose the same [`Manager`]
//! contract, so callers do not need to know which one backs them.
//!
//! # Example
//!
//! ```
//! use handle_pool::{BoxError, Manager, Pool, ResourceLifecycle};
//!
//! struct Connections;
//!
//! #[async_trait::async_trait]
//! impl ResourceLifecycle for Connections {
//!     type Resource = String;
//!
//!     async fn create(&self) -> Result<String, BoxError> {
//!         Ok("connection".to_owned())
//!     }
//!
//!     async fn destroy(&self, _resource: &String) -> Result<(), BoxError> {
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), handle_pool::ResourceError> {
//! let pool = Pool::new(Connections, 4)?;
//!
//! let handle = pool.acquire().await?;
//! assert_eq!(handle.resource(), "connection");
//! handle.release().await;
//!
//! pool.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Cancellation
//!
//! `acquire` suspends only while waiting for capacity, and that wait is
//! cancel-safe: dropping the future before a permit is granted leaves the
//! manager untouched and consumes no capacity. [`Manager::acquire_timeout`]
//! wraps the wait in a deadline for callers that prefer an error over
//! dropping the future themselves.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod errors;
pub mod handle;
pub mod manager;
pub mod pool;
pub mod shareable;
pub mod store;

pub use errors::{BoxError, ResourceError, ResourceResult};
pub use handle::Handle;
pub use manager::{Manager, ResourceLifecycle};
pub use pool::Pool;
pub use shareable::Shareable;
pub use store::SharedMap;
