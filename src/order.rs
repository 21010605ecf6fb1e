//! Result ordering policies.
//!
//! A pool records each finished work item into an indexed result slot. The
//! ordering policy decides *which* slot: either results appear in the order
//! work items finish ([`ResultOrder::Completion`]) or in the order they
//! were submitted ([`ResultOrder::Submission`]).
//!
//! Both policies map an *execution index* (the monotonic rank at which a
//! worker dequeued an item) to a slot position, and both derive the
//! in-flight count from their own bookkeeping:
//!
//! - **Completion** keeps a sliding window `lo..hi` of allocated,
//!   still-pending slot positions. Starting an item allocates `hi`;
//!   finishing *any* item fills `lo`. In-flight is `hi - lo`.
//! - **Submission** hands out consecutive indices and remembers which are
//!   executing. Finishing an item fills exactly its own index. In-flight is
//!   the size of the executing set.
//!
//! Two variants do not justify trait objects; the policy is a closed enum
//! dispatched in two methods.

use std::collections::HashSet;

// =============================================================================
// ResultOrder
// =============================================================================

/// The order in which a pool delivers results.
///
/// # Examples
///
/// ```rust,ignore
/// use drainpool::{ResultOrder, WorkPool};
///
/// // Results arrive as work finishes (the default):
/// let pool: WorkPool<u32, String> = WorkPool::new(8, ResultOrder::Completion);
///
/// // Results arrive in submission order, even when items finish out of order:
/// let pool: WorkPool<u32, String> = WorkPool::new(8, ResultOrder::Submission);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultOrder {
    /// Results are delivered in the order work items complete.
    #[default]
    Completion,

    /// Results are delivered in the order work items were submitted.
    Submission,
}

// =============================================================================
// OrderPolicy
// =============================================================================

/// Internal bookkeeping for a [`ResultOrder`].
#[derive(Debug)]
pub(crate) enum OrderPolicy {
    /// Sliding window of allocated, still-pending slot positions.
    Completion { lo: usize, hi: usize },

    /// Next unused index plus the set of indices currently executing.
    Submission {
        next: usize,
        executing: HashSet<usize>,
    },
}

impl OrderPolicy {
    pub(crate) fn new(order: ResultOrder) -> Self {
        match order {
            ResultOrder::Completion => Self::Completion { lo: 0, hi: 0 },
            ResultOrder::Submission => Self::Submission {
                next: 0,
                executing: HashSet::new(),
            },
        }
    }

    /// The [`ResultOrder`] this policy was built from.
    pub(crate) const fn order(&self) -> ResultOrder {
        match self {
            Self::Completion { .. } => ResultOrder::Completion,
            Self::Submission { .. } => ResultOrder::Submission,
        }
    }

    /// Records that a worker is starting the next dequeued item and returns
    /// its execution index.
    pub(crate) fn begin(&mut self) -> usize {
        match self {
            Self::Completion { hi, .. } => {
                let index = *hi;
                *hi += 1;
                index
            }
            Self::Submission { next, executing } => {
                let index = *next;
                *next += 1;
                executing.insert(index);
                index
            }
        }
    }

    /// Records that the item started at `execution_index` has finished and
    /// returns the slot position its outcome belongs in.
    ///
    /// # Panics
    ///
    /// Panics if `execution_index` was never handed out by [`begin`], or was
    /// already finished.
    ///
    /// [`begin`]: OrderPolicy::begin
    pub(crate) fn finish(&mut self, execution_index: usize) -> usize {
        match self {
            Self::Completion { lo, hi } => {
                assert!(*lo < *hi, "finish called with no execution in flight");
                let position = *lo;
                *lo += 1;
                position
            }
            Self::Submission { executing, .. } => {
                assert!(
                    executing.remove(&execution_index),
                    "execution index {execution_index} is not in flight"
                );
                execution_index
            }
        }
    }

    /// The number of items currently executing.
    pub(crate) fn in_flight(&self) -> usize {
        match self {
            Self::Completion { lo, hi } => *hi - *lo,
            Self::Submission { executing, .. } => executing.len(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
