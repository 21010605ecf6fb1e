//! The lazy result sequence over an async pool.
//!
//! [`ResultStream`] is a stateful cursor over the pool's result slots: it
//! fetches slot `i`, awaits it, then moves to `i + 1`. Several streams may
//! iterate the same pool concurrently; each holds an independent cursor
//! and all of them observe the same slot contents.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;

use crate::error::PoolError;
use crate::pool::PoolState;
use crate::slot::{Outcome, SlotFuture, SlotValue};

// =============================================================================
// ResultStream
// =============================================================================

/// A lazy, consumable sequence of pool results.
///
/// Yields `Ok(value)` for each finished work item, in the pool's
/// [`ResultOrder`](crate::ResultOrder). Terminates after the end-of-results
/// marker, or after yielding the pool's terminal error exactly once; either
/// way the stream is fused and keeps returning `None`.
///
/// # Examples
///
/// ```rust,ignore
/// use futures::StreamExt;
///
/// let mut results = pool.results();
/// while let Some(outcome) = results.next().await {
///     println!("finished: {}", outcome?);
/// }
/// ```
pub struct ResultStream<T, E> {
    core: Arc<PoolState<T, E>>,
    cursor: usize,
    in_flight: Option<SlotFuture<SlotValue<T, E>>>,
    finished: bool,
}

impl<T, E> ResultStream<T, E> {
    pub(crate) fn new(core: Arc<PoolState<T, E>>) -> Self {
        Self {
            core,
            cursor: 0,
            in_flight: None,
            finished: false,
        }
    }

    /// The slot position this stream will observe next.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.cursor
    }
}

impl<T, E> ResultStream<T, E>
where
    T: Clone,
{
    /// Awaits the next result.
    ///
    /// Convenience for `futures::StreamExt::next` without the import.
    pub async fn next(&mut self) -> Option<Result<T, PoolError<E>>> {
        futures::StreamExt::next(self).await
    }
}

impl<T, E> Stream for ResultStream<T, E>
where
    T: Clone,
{
    type Item = Result<T, PoolError<E>>;

    fn poll_next(self: Pin<&mut Self>, context: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        // Hold on to the slot future across polls so a pending wait keeps
        // its waiter registration instead of re-fetching the slot.
        let core = &this.core;
        let cursor = &mut this.cursor;
        let waiting = this.in_flight.get_or_insert_with(|| {
            let slot = core.slot(*cursor);
            *cursor += 1;
            slot.watch()
        });

        match Pin::new(waiting).poll(context) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(value) => {
                this.in_flight = None;
                match value {
                    Ok(Outcome::Item(item)) => Poll::Ready(Some(Ok(item))),
                    Ok(Outcome::Done) => {
                        this.finished = true;
                        Poll::Ready(None)
                    }
                    Err(error) => {
                        this.finished = true;
                        Poll::Ready(Some(Err(error)))
                    }
                }
            }
        }
    }
}

impl<T, E> fmt::Debug for ResultStream<T, E> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ResultStream")
            .field("cursor", &self.cursor)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
