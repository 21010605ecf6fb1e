//! Result slots: single-set, multi-reader outcome cells.
//!
//! Every work item a pool accepts is assigned one [`Slot`], and one extra
//! trailing slot carries the end-of-results signal. A slot starts pending,
//! is written exactly once (first write wins), and can be observed by any
//! number of readers: concurrently, before or after the write, from async
//! tasks ([`SlotFuture`]) or blocking threads ([`Slot::wait_value`]).
//!
//! # Waiter bookkeeping
//!
//! Pending async waiters are kept in a map from a monotonic key to a
//! [`Waker`]. Keys are handed out at first poll, so iterating the map
//! visits waiters in registration order; fulfilment drains the map under
//! the slot lock but wakes everyone *after* releasing it, which keeps a
//! woken task free to re-enter the pool without deadlocking. Dropping a
//! [`SlotFuture`] before the value arrives removes exactly its own entry;
//! other waiters on the same slot are untouched.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use parking_lot::{Condvar, Mutex};

use crate::error::PoolError;

// =============================================================================
// Outcome
// =============================================================================

/// The payload a slot delivers on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Outcome<T> {
    /// The value produced by one work item.
    Item(T),

    /// The trailing sentinel: no further results will appear.
    Done,
}

/// What a reader observes in a slot: an outcome, or the pool's terminal
/// failure.
pub(crate) type SlotValue<T, E> = Result<Outcome<T>, PoolError<E>>;

// =============================================================================
// Slot
// =============================================================================

enum SlotState<V> {
    /// No value yet. `next_key` grows monotonically so the map iterates
    /// waiters in registration order.
    Pending {
        waiters: BTreeMap<u64, Waker>,
        next_key: u64,
    },
    Ready(V),
}

/// A single-set, multi-reader cell.
///
/// Writers call [`fulfil`](Slot::fulfil) once; readers await the value any
/// number of times. Readers receive clones, so `V: Clone` is required at
/// the observation sites.
pub(crate) struct Slot<V> {
    state: Mutex<SlotState<V>>,
    ready: Condvar,
}

impl<V> Slot<V> {
    /// Creates a pending slot.
    pub(crate) fn pending() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SlotState::Pending {
                waiters: BTreeMap::new(),
                next_key: 0,
            }),
            ready: Condvar::new(),
        })
    }

    /// Creates an already-resolved slot, for fast paths where the answer is
    /// known at hand-out time.
    pub(crate) fn ready(value: V) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SlotState::Ready(value)),
            ready: Condvar::new(),
        })
    }

    /// Writes the slot's value. First write wins.
    ///
    /// Returns `false` (and drops `value`) if the slot was already ready.
    /// All pending waiters are collected under the lock and woken after it
    /// is released, in registration order.
    pub(crate) fn fulfil(&self, value: V) -> bool {
        let waiters = {
            let mut state = self.state.lock();
            match &mut *state {
                SlotState::Ready(_) => return false,
                SlotState::Pending { waiters, .. } => {
                    let taken = std::mem::take(waiters);
                    *state = SlotState::Ready(value);
                    taken
                }
            }
        };

        self.ready.notify_all();
        for (_, waker) in waiters {
            waker.wake();
        }
        true
    }

    /// Returns `true` if the slot has been written.
    pub(crate) fn is_ready(&self) -> bool {
        matches!(&*self.state.lock(), SlotState::Ready(_))
    }
}

impl<V: Clone> Slot<V> {
    /// Returns an awaitable handle on this slot.
    #[cfg(feature = "async")]
    pub(crate) fn watch(self: &Arc<Self>) -> SlotFuture<V> {
        SlotFuture {
            slot: Arc::clone(self),
            key: None,
        }
    }

    /// Blocks the calling thread until the slot is written, then returns a
    /// clone of the value.
    #[cfg(feature = "blocking")]
    pub(crate) fn wait_value(&self) -> V {
        let mut state = self.state.lock();
        loop {
            if let SlotState::Ready(value) = &*state {
                return value.clone();
            }
            self.ready.wait(&mut state);
        }
    }
}

impl<V> std::fmt::Debug for Slot<V> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Slot")
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// SlotFuture
// =============================================================================

/// An awaitable handle on one [`Slot`].
///
/// Many `SlotFuture`s may await the same slot; each resolves independently
/// to a clone of the value. Dropping one before the value arrives detaches
/// only that waiter.
#[cfg(feature = "async")]
pub(crate) struct SlotFuture<V> {
    slot: Arc<Slot<V>>,
    key: Option<u64>,
}

#[cfg(feature = "async")]
impl<V: Clone> Future for SlotFuture<V> {
    type Output = V;

    fn poll(self: Pin<&mut Self>, context: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let mut state = this.slot.state.lock();
        match &mut *state {
            SlotState::Ready(value) => Poll::Ready(value.clone()),
            SlotState::Pending { waiters, next_key } => {
                let key = *this.key.get_or_insert_with(|| {
                    let key = *next_key;
                    *next_key += 1;
                    key
                });
                waiters.insert(key, context.waker().clone());
                Poll::Pending
            }
        }
    }
}

#[cfg(feature = "async")]
impl<V> Drop for SlotFuture<V> {
    fn drop(&mut self) {
        if let Some(key) = self.key {
            if let SlotState::Pending { waiters, .. } = &mut *self.slot.state.lock() {
                waiters.remove(&key);
            }
        }
    }
}

#[cfg(feature = "async")]
impl<V> std::fmt::Debug for SlotFuture<V> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SlotFuture")
            .field("registered", &self.key.is_some())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
