//! # drainpool
//!
//! A bounded-concurrency work pool: execute any number of submitted work
//! items under a strict cap on how many run at once, and drain the
//! results as a lazy, consumable sequence.
//!
//! ## Overview
//!
//! Fanning a large input out over an unstructured task set overwhelms
//! whatever bounded resource the work leans on: sockets, disks, CPU
//! cores, a rate-limited service. `drainpool` guarantees a user-chosen
//! upper bound `K` on in-flight work regardless of how much is submitted:
//!
//! - [`WorkPool`]: the async front. Submit futures from any number of
//!   tasks, close intake when done, consume results as a
//!   [`ResultStream`].
//! - [`BlockingWorkPool`]: the synchronous front. Run a collection of
//!   closures on a fixed set of OS threads and iterate the results.
//! - [`map_bounded`] / [`for_each_bounded`] / [`map_stream_bounded`]:
//!   one-call conveniences for fully known inputs.
//!
//! Results arrive either as work finishes or in submission order
//! ([`ResultOrder`]); execution order itself is never guaranteed. The
//! first failing work item (or an explicit [`cancel`](WorkPool::cancel))
//! moves the pool into a terminal failed state that every consumer
//! observes as the same [`PoolError`].
//!
//! ## Feature Flags
//!
//! - `async` (default): the tokio-backed [`WorkPool`], [`ResultStream`],
//!   and the convenience helpers.
//! - `blocking` (default): the thread-backed [`BlockingWorkPool`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use drainpool::{ResultOrder, WorkPool};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), drainpool::PoolError<reqwest::Error>> {
//!     let pool = WorkPool::new(8, ResultOrder::Completion);
//!     for url in urls {
//!         pool.submit(async move { fetch(url).await })?;
//!     }
//!     pool.close_intake();
//!
//!     let mut results = pool.results();
//!     while let Some(body) = results.next().await {
//!         println!("{} bytes", body?.len());
//!     }
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Prelude module for convenient imports.
///
/// Re-exports commonly used types.
///
/// # Usage
///
/// ```rust
/// use drainpool::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::PoolError;
    pub use crate::order::ResultOrder;

    #[cfg(feature = "async")]
    pub use crate::pool::WorkPool;

    #[cfg(feature = "async")]
    pub use crate::stream::ResultStream;

    #[cfg(feature = "blocking")]
    pub use crate::blocking::{BlockingResults, BlockingWorkPool};
}

pub mod error;
pub mod order;

mod slot;
mod state;

#[cfg(feature = "async")]
pub mod pool;

#[cfg(feature = "async")]
pub mod stream;

#[cfg(feature = "async")]
mod ext;

#[cfg(feature = "blocking")]
pub mod blocking;

pub use error::PoolError;
pub use order::ResultOrder;

#[cfg(feature = "async")]
pub use ext::{for_each_bounded, map_bounded, map_stream_bounded};

#[cfg(feature = "async")]
pub use pool::WorkPool;

#[cfg(feature = "async")]
pub use stream::ResultStream;

#[cfg(feature = "blocking")]
pub use blocking::{BlockingResults, BlockingWorkPool};
