//! Error type shared by every pool front-end.
//!
//! The crate surfaces a single tagged error, [`PoolError`], across the
//! async pool, the blocking pool, and the convenience helpers. A pool has
//! exactly one terminal failure: the first work-item error (or an explicit
//! cancellation) wins, and every consumer that touches the pool afterwards
//! observes that same value. To make one failure deliverable to any number
//! of consumers without demanding `E: Clone` from callers, the work-item
//! error is stored behind an [`Arc`].

use std::error::Error;
use std::fmt;
use std::sync::Arc;

// =============================================================================
// PoolError
// =============================================================================

/// Errors produced by a work pool.
///
/// # Type Parameters
///
/// - `E`: The error type of the user-supplied work items.
///
/// # Cloning
///
/// `PoolError<E>` is always `Clone`, regardless of `E`: the `Task` variant
/// shares the underlying work-item error through an [`Arc`]. This is what
/// lets a single terminal failure fan out to every iterator and every
/// pending await on the pool.
pub enum PoolError<E> {
    /// The pool was constructed with a concurrency limit of zero.
    ///
    /// A pool must be allowed to run at least one work item at a time.
    InvalidCapacity,

    /// A work item was submitted after intake was closed.
    ///
    /// Once `close_intake` has been called the pool only drains; further
    /// submissions are rejected with this error.
    IntakeClosed,

    /// The pool was cancelled.
    ///
    /// Cancellation is terminal: queued work is discarded and every
    /// outstanding and future await resolves to this error.
    Cancelled,

    /// A work item failed with the contained error.
    ///
    /// The first work-item failure becomes the pool's terminal state; all
    /// consumers observe the same shared error value.
    Task(Arc<E>),
}

impl<E> PoolError<E> {
    /// Wraps a work-item error as the pool's terminal failure.
    pub fn task(error: E) -> Self {
        Self::Task(Arc::new(error))
    }

    /// Returns `true` if this error is [`PoolError::Cancelled`].
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns the underlying work-item error, if this is a task failure.
    #[must_use]
    pub fn as_task(&self) -> Option<&E> {
        match self {
            Self::Task(error) => Some(error),
            _ => None,
        }
    }
}

// Manual impl: avoids the `E: Debug` bound a derive would insist on,
// matching the `Clone` impl below.
impl<E> fmt::Debug for PoolError<E> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCapacity => formatter.write_str("InvalidCapacity"),
            Self::IntakeClosed => formatter.write_str("IntakeClosed"),
            Self::Cancelled => formatter.write_str("Cancelled"),
            Self::Task(_) => formatter.write_str("Task(..)"),
        }
    }
}

// Manual impl: `Arc` makes every variant cloneable without an `E: Clone`
// bound, which a derive would insist on.
impl<E> Clone for PoolError<E> {
    fn clone(&self) -> Self {
        match self {
            Self::InvalidCapacity => Self::InvalidCapacity,
            Self::IntakeClosed => Self::IntakeClosed,
            Self::Cancelled => Self::Cancelled,
            Self::Task(error) => Self::Task(Arc::clone(error)),
        }
    }
}

impl<E: PartialEq> PartialEq for PoolError<E> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidCapacity, Self::InvalidCapacity)
            | (Self::IntakeClosed, Self::IntakeClosed)
            | (Self::Cancelled, Self::Cancelled) => true,
            (Self::Task(left), Self::Task(right)) => left == right,
            _ => false,
        }
    }
}

impl<E: Eq> Eq for PoolError<E> {}

impl<E: fmt::Display> fmt::Display for PoolError<E> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCapacity => {
                write!(formatter, "pool concurrency limit must be greater than 0")
            }
            Self::IntakeClosed => {
                write!(formatter, "intake is closed: the pool no longer accepts work")
            }
            Self::Cancelled => {
                write!(formatter, "the pool was cancelled")
            }
            Self::Task(error) => {
                write!(formatter, "a work item failed: {error}")
            }
        }
    }
}

impl<E: Error + 'static> Error for PoolError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Task(error) => Some(error.as_ref()),
            _ => None,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
