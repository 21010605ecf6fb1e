//! The async work pool.
//!
//! [`WorkPool`] runs submitted futures on a tokio runtime under a strict
//! concurrency cap. Submission enqueues the work and spawns *drainer*
//! tasks; each drainer asks the core for one item at a time, awaits it,
//! records the outcome, and loops. A drainer therefore holds at most one
//! unit of capacity, and freed capacity is picked up by whichever drainer
//! finishes first. At most `max_concurrent` work items are ever executing,
//! no matter how many are submitted.
//!
//! Results are consumed through [`ResultStream`] (see
//! [`results`](WorkPool::results)), or all at once with
//! [`collect`](WorkPool::collect) / [`wait`](WorkPool::wait).

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::runtime::Handle;

use crate::error::PoolError;
use crate::order::ResultOrder;
use crate::state::{Capacity, NextWork, PoolCore};
use crate::stream::ResultStream;

/// Boxed work as the async driver stores it: a future producing the work
/// item's result.
pub(crate) type BoxedWork<T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send>>;

/// The shared core, concretised to the async driver's work representation.
pub(crate) type PoolState<T, E> = PoolCore<BoxedWork<T, E>, T, E>;

// =============================================================================
// WorkPool
// =============================================================================

/// A bounded-concurrency pool over async work items.
///
/// # Type Parameters
///
/// - `T`: The success value of each work item.
/// - `E`: The error type of each work item. The first failing item moves
///   the whole pool into a terminal failed state.
///
/// # Concurrency bound
///
/// At most `max_concurrent` submitted futures are awaited simultaneously.
/// Execution order is unspecified; the *result* order is chosen at
/// construction via [`ResultOrder`].
///
/// # Sharing
///
/// `WorkPool` is a cheap handle: clone it to submit from several tasks or
/// to consume results from several places. All clones drive the same pool.
///
/// # Examples
///
/// ```rust,ignore
/// use drainpool::{ResultOrder, WorkPool};
///
/// #[tokio::main]
/// async fn main() -> Result<(), drainpool::PoolError<std::io::Error>> {
///     let pool = WorkPool::new(8, ResultOrder::Completion);
///     for url in urls {
///         pool.submit(async move { fetch(url).await })?;
///     }
///     pool.close_intake();
///
///     let bodies = pool.collect().await?;
///     Ok(())
/// }
/// ```
pub struct WorkPool<T, E> {
    core: Arc<PoolState<T, E>>,
    max_concurrent: usize,
    runtime: Handle,
}

impl<T, E> WorkPool<T, E>
where
    T: Send + 'static,
    E: Send + Sync + 'static,
{
    /// Creates a pool that runs at most `max_concurrent` work items at
    /// once and delivers results in the given order.
    ///
    /// # Panics
    ///
    /// Panics if `max_concurrent` is 0 (use [`try_new`](WorkPool::try_new)
    /// for a non-panicking version), or when called outside a tokio
    /// runtime.
    #[must_use]
    pub fn new(max_concurrent: usize, order: ResultOrder) -> Self {
        Self::try_new(max_concurrent, order)
            .expect("WorkPool concurrency limit must be greater than 0")
    }

    /// Tries to create a pool with the given concurrency limit and result
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidCapacity`] if `max_concurrent` is 0.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime; the pool captures the
    /// ambient runtime handle at construction and spawns its drainer tasks
    /// on it.
    pub fn try_new(max_concurrent: usize, order: ResultOrder) -> Result<Self, PoolError<E>> {
        if max_concurrent == 0 {
            return Err(PoolError::InvalidCapacity);
        }
        Ok(Self {
            core: Arc::new(PoolCore::new(Capacity::Bounded(max_concurrent), order)),
            max_concurrent,
            runtime: Handle::current(),
        })
    }

    /// Builds a pool over a whole input collection and closes intake.
    ///
    /// Every item is mapped through `process` and submitted; results are
    /// delivered in completion order. Equivalent to constructing a dynamic
    /// pool, calling [`submit_many`](WorkPool::submit_many) once, and then
    /// [`close_intake`](WorkPool::close_intake).
    ///
    /// # Panics
    ///
    /// Panics if `max_concurrent` is 0 or when called outside a tokio
    /// runtime.
    pub fn from_items<I, F, Fut>(items: I, max_concurrent: usize, process: F) -> Self
    where
        I: IntoIterator,
        F: FnMut(I::Item) -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let pool = Self::new(max_concurrent, ResultOrder::Completion);
        pool.submit_many(items.into_iter().map(process))
            .expect("intake of a freshly constructed pool is open");
        pool.close_intake();
        pool
    }

    /// Submits one work item.
    ///
    /// The item is queued and executed as soon as a unit of capacity is
    /// free. Submitting to a cancelled or failed pool quietly discards the
    /// item.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::IntakeClosed`] if
    /// [`close_intake`](WorkPool::close_intake) has been called.
    pub fn submit<F>(&self, work: F) -> Result<(), PoolError<E>>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        let work: BoxedWork<T, E> = Box::pin(work);
        let accepted = self.core.submit_many(std::iter::once(work))?;
        self.spawn_drainers(accepted);
        Ok(())
    }

    /// Submits a batch of work items.
    ///
    /// Spawns up to `max_concurrent` drainer tasks so a large batch
    /// saturates the pool's capacity immediately.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::IntakeClosed`] if intake has been closed; the
    /// whole batch is rejected. On a cancelled or failed pool the batch is
    /// quietly discarded.
    pub fn submit_many<I, F>(&self, works: I) -> Result<(), PoolError<E>>
    where
        I: IntoIterator<Item = F>,
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        let accepted = self.core.submit_many(
            works
                .into_iter()
                .map(|work| -> BoxedWork<T, E> { Box::pin(work) }),
        )?;
        self.spawn_drainers(accepted.min(self.max_concurrent));
        Ok(())
    }

    /// Closes intake: no further submissions are accepted, and once the
    /// queue drains the result sequence ends.
    ///
    /// Idempotent. A no-op on a cancelled or failed pool.
    pub fn close_intake(&self) {
        self.core.close();
    }

    /// Cancels the pool.
    ///
    /// Queued work is discarded and every outstanding and future await
    /// resolves to [`PoolError::Cancelled`]. Work items already executing
    /// run to completion but their outcomes are discarded.
    pub fn cancel(&self) {
        self.core.fail(PoolError::Cancelled);
    }

    fn spawn_drainers(&self, count: usize) {
        for _ in 0..count {
            let core = Arc::clone(&self.core);
            self.runtime.spawn(drain(core));
        }
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// The concurrency limit this pool was built with.
    #[must_use]
    pub const fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// The result ordering this pool was built with.
    #[must_use]
    pub fn result_order(&self) -> ResultOrder {
        self.core.order()
    }

    /// Number of submitted work items not yet started.
    #[must_use]
    pub fn queued_len(&self) -> usize {
        self.core.queued_len()
    }

    /// Number of work items currently executing.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.core.in_flight()
    }

    /// Returns `true` once [`close_intake`](WorkPool::close_intake) has
    /// been called.
    #[must_use]
    pub fn is_intake_closed(&self) -> bool {
        self.core.is_closed()
    }

    /// Returns `true` once the pool has been cancelled or a work item has
    /// failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.core.is_failed()
    }
}

impl<T, E> WorkPool<T, E>
where
    T: Clone + Send + 'static,
    E: Send + Sync + 'static,
{
    /// Returns a lazy stream of results.
    ///
    /// May be called any number of times; each stream holds its own cursor
    /// and every stream observes the same results.
    #[must_use]
    pub fn results(&self) -> ResultStream<T, E> {
        ResultStream::new(Arc::clone(&self.core))
    }

    /// Awaits every result and collects the values.
    ///
    /// # Errors
    ///
    /// Returns the pool's terminal error if it is cancelled or a work item
    /// fails. Values delivered before the failure are dropped.
    pub async fn collect(&self) -> Result<Vec<T>, PoolError<E>> {
        let mut results = self.results();
        let mut values = Vec::new();
        while let Some(outcome) = results.next().await {
            values.push(outcome?);
        }
        Ok(values)
    }

    /// Awaits completion of every result, discarding the values.
    ///
    /// # Errors
    ///
    /// Returns the pool's terminal error if it is cancelled or a work item
    /// fails.
    pub async fn wait(&self) -> Result<(), PoolError<E>> {
        let mut results = self.results();
        while let Some(outcome) = results.next().await {
            outcome?;
        }
        Ok(())
    }
}

/// One drainer: holds at most one unit of capacity at a time.
///
/// Loops until the pool has nothing for it: either the cap is taken by
/// other drainers or the queue is empty. A work-item error becomes the
/// pool's terminal failure and the drainer stops.
async fn drain<T, E>(core: Arc<PoolState<T, E>>)
where
    T: Send + 'static,
    E: Send + Sync + 'static,
{
    loop {
        match core.next_work() {
            NextWork::Ready {
                work,
                execution_index,
            } => match work.await {
                Ok(value) => core.complete(execution_index, value),
                Err(error) => {
                    core.fail(PoolError::task(error));
                    return;
                }
            },
            NextWork::AtCapacity | NextWork::Exhausted => return,
        }
    }
}

impl<T, E> Clone for WorkPool<T, E> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            max_concurrent: self.max_concurrent,
            runtime: self.runtime.clone(),
        }
    }
}

impl<T, E> fmt::Debug for WorkPool<T, E> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("WorkPool")
            .field("max_concurrent", &self.max_concurrent)
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    // =========================================================================
    // Construction Tests
    // =========================================================================

    #[rstest]
    #[tokio::test]
    async fn new_creates_pool_with_limit() {
        let pool: WorkPool<u32, String> = WorkPool::new(16, ResultOrder::Completion);
        assert_eq!(pool.max_concurrent(), 16);
        assert_eq!(pool.result_order(), ResultOrder::Completion);
        assert!(!pool.is_intake_closed());
        assert!(!pool.is_failed());
    }

    #[rstest]
    #[tokio::test]
    #[should_panic(expected = "WorkPool concurrency limit must be greater than 0")]
    async fn new_panics_on_zero_limit() {
        let _: WorkPool<u32, String> = WorkPool::new(0, ResultOrder::Completion);
    }

    #[rstest]
    #[tokio::test]
    async fn try_new_rejects_zero_limit() {
        let result: Result<WorkPool<u32, String>, _> =
            WorkPool::try_new(0, ResultOrder::Completion);
        assert_eq!(result.unwrap_err(), PoolError::InvalidCapacity);
    }

    // =========================================================================
    // Submission Tests
    // =========================================================================

    #[rstest]
    #[tokio::test]
    async fn submit_after_close_intake_errors() {
        let pool: WorkPool<u32, String> = WorkPool::new(2, ResultOrder::Completion);
        pool.close_intake();
        let result = pool.submit(async { Ok(1) });
        assert_eq!(result.unwrap_err(), PoolError::IntakeClosed);
    }

    #[rstest]
    #[tokio::test]
    async fn submit_after_cancel_quietly_drops() {
        let pool: WorkPool<u32, String> = WorkPool::new(2, ResultOrder::Completion);
        pool.cancel();
        assert!(pool.submit(async { Ok(1) }).is_ok());
        assert_eq!(pool.queued_len(), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn close_intake_is_idempotent() {
        let pool: WorkPool<u32, String> = WorkPool::new(2, ResultOrder::Completion);
        pool.close_intake();
        pool.close_intake();
        assert!(pool.is_intake_closed());
    }

    // =========================================================================
    // Drain Tests
    // =========================================================================

    #[rstest]
    #[tokio::test]
    async fn collect_returns_every_value() {
        let pool: WorkPool<u32, String> = WorkPool::new(4, ResultOrder::Completion);
        pool.submit_many((0..32u32).map(|i| async move { Ok(i) }))
            .unwrap();
        pool.close_intake();

        let mut values = pool.collect().await.unwrap();
        values.sort_unstable();
        assert_eq!(values, (0..32).collect::<Vec<_>>());
    }

    #[rstest]
    #[tokio::test]
    async fn collect_on_empty_closed_pool_is_empty() {
        let pool: WorkPool<u32, String> = WorkPool::new(4, ResultOrder::Completion);
        pool.close_intake();
        assert_eq!(pool.collect().await.unwrap(), Vec::<u32>::new());
    }

    #[rstest]
    #[tokio::test]
    async fn wait_discards_values() {
        let pool: WorkPool<u32, String> = WorkPool::new(4, ResultOrder::Completion);
        pool.submit_many((0..8u32).map(|i| async move { Ok(i) }))
            .unwrap();
        pool.close_intake();
        pool.wait().await.unwrap();
    }

    #[rstest]
    #[tokio::test]
    async fn from_items_submits_everything_and_closes() {
        let pool = WorkPool::<u32, String>::from_items(0..10u32, 3, |i| async move { Ok(i * 2) });
        assert!(pool.is_intake_closed());

        let mut values = pool.collect().await.unwrap();
        values.sort_unstable();
        assert_eq!(values, (0..10).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[rstest]
    #[tokio::test]
    async fn failing_item_fails_the_pool() {
        let pool: WorkPool<u32, String> = WorkPool::new(2, ResultOrder::Completion);
        pool.submit_many((0..4u32).map(|i| async move {
            if i == 2 {
                Err(format!("item {i} broke"))
            } else {
                Ok(i)
            }
        }))
        .unwrap();
        pool.close_intake();

        let error = pool.collect().await.unwrap_err();
        assert_eq!(error.as_task().map(String::as_str), Some("item 2 broke"));
        assert!(pool.is_failed());
    }

    // =========================================================================
    // Clone Tests
    // =========================================================================

    #[rstest]
    #[tokio::test]
    async fn clones_drive_the_same_pool() {
        let pool: WorkPool<u32, String> = WorkPool::new(2, ResultOrder::Completion);
        let producer = pool.clone();
        producer.submit(async { Ok(5) }).unwrap();
        producer.close_intake();

        assert_eq!(pool.collect().await.unwrap(), vec![5]);
    }
}
