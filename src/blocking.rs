//! The synchronous thread-pool driver.
//!
//! [`BlockingWorkPool`] runs a whole input collection through a fixed set
//! of OS worker threads. The thread count is the concurrency bound, so the
//! shared core runs with an unbounded cap policy; the cap lives in how
//! many threads exist, not in the dispatch check. Intake is closed at
//! construction: this is the static front, built for "process this
//! collection on `W` threads and hand me the results as they finish".
//!
//! Consumers read results with the blocking [`BlockingResults`] iterator
//! (or [`collect`](BlockingWorkPool::collect)); each worker loops asking
//! the core for work, runs it, and records the outcome, exiting when the
//! queue is drained. A failing work item moves the pool to its terminal
//! failed state, and the remaining queue is discarded.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::error::PoolError;
use crate::order::ResultOrder;
use crate::slot::Outcome;
use crate::state::{Capacity, NextWork, PoolCore};

/// Boxed work as the blocking driver stores it: a closure producing the
/// work item's result.
pub(crate) type BoxedJob<T, E> = Box<dyn FnOnce() -> Result<T, E> + Send>;

type JobState<T, E> = PoolCore<BoxedJob<T, E>, T, E>;

// =============================================================================
// BlockingWorkPool
// =============================================================================

/// A fixed-thread-count pool over synchronous work items.
///
/// # Examples
///
/// ```rust,ignore
/// use drainpool::BlockingWorkPool;
///
/// let pool = BlockingWorkPool::new(4, paths, |path| read_and_hash(&path))?;
/// for digest in pool.results() {
///     println!("{}", digest?);
/// }
/// ```
pub struct BlockingWorkPool<T, E> {
    core: Arc<JobState<T, E>>,
    workers: Vec<JoinHandle<()>>,
    worker_threads: usize,
}

impl<T, E> BlockingWorkPool<T, E>
where
    T: Send + 'static,
    E: Send + Sync + 'static,
{
    /// Processes `items` on `worker_threads` OS threads.
    ///
    /// Every item is submitted up front and intake is closed before the
    /// workers start; results are delivered in completion order.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidCapacity`] if `worker_threads` is 0.
    ///
    /// # Panics
    ///
    /// Panics if the operating system refuses to spawn a worker thread.
    pub fn new<I, F>(worker_threads: usize, items: I, process: F) -> Result<Self, PoolError<E>>
    where
        I: IntoIterator,
        I::Item: Send + 'static,
        F: Fn(I::Item) -> Result<T, E> + Send + Sync + 'static,
    {
        if worker_threads == 0 {
            return Err(PoolError::InvalidCapacity);
        }

        let core: Arc<JobState<T, E>> = Arc::new(PoolCore::new(
            Capacity::Unbounded,
            ResultOrder::Completion,
        ));

        let process = Arc::new(process);
        core.submit_many(items.into_iter().map(|item| {
            let process = Arc::clone(&process);
            Box::new(move || process(item)) as BoxedJob<T, E>
        }))
        .expect("intake of a freshly constructed pool is open");
        core.close();

        let workers = (0..worker_threads)
            .map(|index| {
                let core = Arc::clone(&core);
                thread::Builder::new()
                    .name(format!("drainpool-worker-{index}"))
                    .spawn(move || run_worker(&core))
                    .expect("failed to spawn pool worker thread")
            })
            .collect();

        Ok(Self {
            core,
            workers,
            worker_threads,
        })
    }

    /// Like [`new`](BlockingWorkPool::new), with one worker per available
    /// CPU.
    ///
    /// # Errors
    ///
    /// Never returns [`PoolError::InvalidCapacity`]; the signature matches
    /// [`new`](BlockingWorkPool::new) for uniformity.
    pub fn with_default_threads<I, F>(items: I, process: F) -> Result<Self, PoolError<E>>
    where
        I: IntoIterator,
        I::Item: Send + 'static,
        F: Fn(I::Item) -> Result<T, E> + Send + Sync + 'static,
    {
        Self::new(num_cpus::get(), items, process)
    }

    /// Blocks until every worker thread has exited.
    ///
    /// Workers exit once the queue is drained (or the pool has failed), so
    /// after `join` returns every result slot is resolved.
    ///
    /// # Panics
    ///
    /// Re-raises a panic from a work item on the joining thread.
    pub fn join(mut self) {
        for worker in self.workers.drain(..) {
            if let Err(panic) = worker.join() {
                std::panic::resume_unwind(panic);
            }
        }
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// The number of worker threads this pool runs.
    #[must_use]
    pub const fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    /// Number of submitted work items not yet started.
    #[must_use]
    pub fn queued_len(&self) -> usize {
        self.core.queued_len()
    }

    /// Total number of work items accepted at construction.
    #[must_use]
    pub fn len(&self) -> usize {
        self.core.submitted()
    }

    /// Returns `true` if the pool was built over an empty collection.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` once a work item has failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.core.is_failed()
    }
}

impl<T, E> BlockingWorkPool<T, E>
where
    T: Clone + Send + 'static,
    E: Send + Sync + 'static,
{
    /// Returns a blocking iterator over the results.
    ///
    /// May be called any number of times; each iterator holds its own
    /// cursor and every iterator observes the same results.
    #[must_use]
    pub fn results(&self) -> BlockingResults<T, E> {
        BlockingResults {
            core: Arc::clone(&self.core),
            cursor: 0,
            finished: false,
        }
    }

    /// Blocks until every result is in and collects the values.
    ///
    /// # Errors
    ///
    /// Returns the pool's terminal error if a work item failed.
    pub fn collect(&self) -> Result<Vec<T>, PoolError<E>> {
        self.results().collect()
    }
}

fn run_worker<T, E>(core: &JobState<T, E>) {
    loop {
        match core.next_work() {
            NextWork::Ready {
                work,
                execution_index,
            } => match work() {
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

impl<T, E> fmt::Debug for BlockingWorkPool<T, E> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("BlockingWorkPool")
            .field("worker_threads", &self.worker_threads)
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// BlockingResults
// =============================================================================

/// A blocking iterator over a [`BlockingWorkPool`]'s results.
///
/// Yields `Ok(value)` per finished work item in completion order, blocks
/// while the next result is still being computed, and terminates after the
/// end of results, or after yielding the pool's terminal error once.
pub struct BlockingResults<T, E> {
    core: Arc<JobState<T, E>>,
    cursor: usize,
    finished: bool,
}

impl<T, E> Iterator for BlockingResults<T, E>
where
    T: Clone,
{
    type Item = Result<T, PoolError<E>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let value = self.core.slot(self.cursor).wait_value();
        self.cursor += 1;
        match value {
            Ok(Outcome::Item(item)) => Some(Ok(item)),
            Ok(Outcome::Done) => {
                self.finished = true;
                None
            }
            Err(error) => {
                self.finished = true;
                Some(Err(error))
            }
        }
    }
}

impl<T, E> fmt::Debug for BlockingResults<T, E> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("BlockingResults")
            .field("cursor", &self.cursor)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
