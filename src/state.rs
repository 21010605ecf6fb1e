//! The pool core: one state machine shared by every front-end.
//!
//! [`PoolCore`] coordinates three concurrent populations (submitters
//! appending work, workers executing it, consumers reading results)
//! under a single mutex. It owns the pending work queue, the in-flight
//! accounting, the result [`Slot`]s, and the intake phase:
//!
//! - **Accepting**: submissions append work and grow the slot vector.
//! - **Closed**: intake is done; the trailing sentinel slot has been
//!   resolved so consumers know where the results end.
//! - **Failed**: terminal. The queue is purged and every pending slot is
//!   rejected with the stored error; all later observations see it too.
//!
//! No operation here ever suspends or blocks on work: each one takes the
//! lock, mutates, and hands any slot that must be fulfilled back to the
//! calling thread, which performs the fulfilment *after* the lock is
//! released. A woken consumer is therefore always free to call straight
//! back into the pool.
//!
//! The slot vector always keeps exactly one pending cell past the accepted
//! work items; closing intake resolves that cell to the end-of-results
//! marker, and later submissions (in the accepting phase) push the marker
//! outward.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::PoolError;
use crate::order::{OrderPolicy, ResultOrder};
use crate::slot::{Outcome, Slot, SlotValue};

// =============================================================================
// Capacity
// =============================================================================

/// How many work items may execute at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Capacity {
    /// At most this many items in flight.
    Bounded(usize),

    /// No cap; something outside the pool (e.g. a fixed set of worker
    /// threads) bounds concurrency instead.
    Unbounded,
}

impl Capacity {
    fn admits(self, in_flight: usize) -> bool {
        match self {
            Self::Bounded(limit) => in_flight < limit,
            Self::Unbounded => true,
        }
    }
}

// =============================================================================
// NextWork
// =============================================================================

/// The answer a worker gets when it asks for something to run.
#[derive(Debug)]
pub(crate) enum NextWork<W> {
    /// Run this, then report back with the execution index.
    Ready { work: W, execution_index: usize },

    /// The concurrency cap is saturated; capacity will be picked up by the
    /// workers that currently hold it.
    AtCapacity,

    /// Nothing to hand out: the queue is empty or the pool is failed.
    Exhausted,
}

// =============================================================================
// PoolCore
// =============================================================================

enum Phase<E> {
    Accepting,
    Closed { end: usize },
    Failed(PoolError<E>),
}

struct Inner<W, T, E> {
    phase: Phase<E>,
    queue: VecDeque<W>,
    capacity: Capacity,
    policy: OrderPolicy,
    slots: Vec<Arc<Slot<SlotValue<T, E>>>>,
    submitted: usize,
}

impl<W, T, E> Inner<W, T, E> {
    /// Grows the slot vector so `slots[index]` exists.
    fn ensure_slot(&mut self, index: usize) {
        while self.slots.len() <= index {
            self.slots.push(Slot::pending());
        }
    }
}

/// The shared state machine behind every pool front-end.
///
/// Generic over the work representation `W` (boxed futures for the async
/// driver, boxed closures for the blocking one), the success value `T`,
/// and the work-item error `E`.
pub(crate) struct PoolCore<W, T, E> {
    inner: Mutex<Inner<W, T, E>>,
}

impl<W, T, E> PoolCore<W, T, E> {
    pub(crate) fn new(capacity: Capacity, order: ResultOrder) -> Self {
        Self {
            inner: Mutex::new(Inner {
                phase: Phase::Accepting,
                queue: VecDeque::new(),
                capacity,
                policy: OrderPolicy::new(order),
                // The trailing sentinel: resolved when intake closes.
                slots: vec![Slot::pending()],
                submitted: 0,
            }),
        }
    }

    /// Appends work items, allocating one pending result slot per item.
    ///
    /// Returns the number of items accepted. Submitting to a closed pool
    /// is an error; submitting to a failed pool silently accepts nothing.
    pub(crate) fn submit_many<I>(&self, works: I) -> Result<usize, PoolError<E>>
    where
        I: IntoIterator<Item = W>,
    {
        let mut inner = self.inner.lock();
        match inner.phase {
            Phase::Failed(_) => Ok(0),
            Phase::Closed { .. } => Err(PoolError::IntakeClosed),
            Phase::Accepting => {
                let mut accepted = 0;
                for work in works {
                    inner.queue.push_back(work);
                    inner.submitted += 1;
                    accepted += 1;
                }
                let submitted = inner.submitted;
                inner.ensure_slot(submitted);
                Ok(accepted)
            }
        }
    }

    /// Hands out the next work item if the cap allows, assigning it an
    /// execution index and counting it in flight.
    pub(crate) fn next_work(&self) -> NextWork<W> {
        let mut inner = self.inner.lock();
        if matches!(inner.phase, Phase::Failed(_)) {
            return NextWork::Exhausted;
        }
        if !inner.capacity.admits(inner.policy.in_flight()) {
            return NextWork::AtCapacity;
        }
        match inner.queue.pop_front() {
            Some(work) => NextWork::Ready {
                work,
                execution_index: inner.policy.begin(),
            },
            None => NextWork::Exhausted,
        }
    }

    /// Records a successful outcome for the item started at
    /// `execution_index`, releasing its unit of capacity.
    ///
    /// The slot position is chosen by the ordering policy; the slot is
    /// fulfilled after the pool lock is released. Outcomes reported after
    /// the pool failed are discarded.
    pub(crate) fn complete(&self, execution_index: usize, value: T) {
        let slot = {
            let mut inner = self.inner.lock();
            if matches!(inner.phase, Phase::Failed(_)) {
                return;
            }
            let position = inner.policy.finish(execution_index);
            Arc::clone(&inner.slots[position])
        };
        slot.fulfil(Ok(Outcome::Item(value)));
    }

    /// Closes intake and resolves the sentinel slot to the end marker.
    ///
    /// Idempotent after the first call; a no-op on a failed pool.
    pub(crate) fn close(&self) {
        let sentinel = {
            let mut inner = self.inner.lock();
            if !matches!(inner.phase, Phase::Accepting) {
                return;
            }
            let end = inner.submitted;
            inner.phase = Phase::Closed { end };
            Arc::clone(&inner.slots[end])
        };
        sentinel.fulfil(Ok(Outcome::Done));
    }

    /// Moves the pool to its terminal failed state.
    ///
    /// The first failure wins. Queued work is discarded, the slot vector is
    /// drained, and every still-pending slot is rejected with the error
    /// after the pool lock is released. Slots that already carry a value
    /// keep it.
    pub(crate) fn fail(&self, error: PoolError<E>) {
        let cells = {
            let mut inner = self.inner.lock();
            if matches!(inner.phase, Phase::Failed(_)) {
                return;
            }
            inner.phase = Phase::Failed(error.clone());
            inner.queue.clear();
            inner.slots.drain(..).collect::<Vec<_>>()
        };
        for cell in cells {
            cell.fulfil(Err(error.clone()));
        }
    }

    /// Returns the slot at `index`, minting an already-resolved cell when
    /// the answer is known without one: every index on a failed pool, and
    /// indices past the sentinel on a closed pool.
    pub(crate) fn slot(&self, index: usize) -> Arc<Slot<SlotValue<T, E>>> {
        let mut inner = self.inner.lock();
        match &inner.phase {
            Phase::Failed(error) => return Slot::ready(Err(error.clone())),
            Phase::Closed { end } if index > *end => return Slot::ready(Ok(Outcome::Done)),
            _ => {}
        }
        inner.ensure_slot(index);
        Arc::clone(&inner.slots[index])
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Number of submitted items not yet handed to a worker.
    pub(crate) fn queued_len(&self) -> usize {
        self.inner.lock().queue.len()
    }

    /// Number of items currently executing.
    pub(crate) fn in_flight(&self) -> usize {
        self.inner.lock().policy.in_flight()
    }

    /// Total number of work items ever accepted.
    pub(crate) fn submitted(&self) -> usize {
        self.inner.lock().submitted
    }

    pub(crate) fn order(&self) -> ResultOrder {
        self.inner.lock().policy.order()
    }

    pub(crate) fn is_closed(&self) -> bool {
        matches!(self.inner.lock().phase, Phase::Closed { .. })
    }

    pub(crate) fn is_failed(&self) -> bool {
        matches!(self.inner.lock().phase, Phase::Failed(_))
    }
}

impl<W, T, E> fmt::Debug for PoolCore<W, T, E> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        formatter
            .debug_struct("PoolCore")
            .field("capacity", &inner.capacity)
            .field("queued", &inner.queue.len())
            .field("in_flight", &inner.policy.in_flight())
            .field("submitted", &inner.submitted)
            .field("closed", &matches!(inner.phase, Phase::Closed { .. }))
            .field("failed", &matches!(inner.phase, Phase::Failed(_)))
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
