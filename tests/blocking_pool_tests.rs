#![cfg(feature = "blocking")]
//! Integration tests for `BlockingWorkPool` - the synchronous thread-pool
//! front.
//!
//! The blocking pool submits a whole collection up front, closes intake at
//! construction, and bounds concurrency with its worker thread count.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use rstest::rstest;

use drainpool::BlockingWorkPool;

// =============================================================================
// End-to-End Draining
// =============================================================================

#[rstest]
fn every_value_is_delivered_once() {
    let pool = BlockingWorkPool::<u32, String>::new(4, 0..512u32, |index| {
        thread::sleep(Duration::from_micros(u64::from(index % 50)));
        Ok(index)
    })
    .unwrap();

    let collected: BTreeSet<u32> = pool.collect().unwrap().into_iter().collect();
    assert_eq!(collected, (0..512).collect::<BTreeSet<_>>());
}

#[rstest]
fn thread_count_bounds_concurrency() {
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let pool = {
        let running = Arc::clone(&running);
        let peak = Arc::clone(&peak);
        BlockingWorkPool::<u32, String>::new(3, 0..48u32, move |index| {
            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(2));
            running.fetch_sub(1, Ordering::SeqCst);
            Ok(index)
        })
        .unwrap()
    };

    pool.collect().unwrap();
    let peak = peak.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak concurrency was {peak}");
}

#[rstest]
fn results_arrive_while_later_items_still_run() {
    // One slow item must not hold back the results of fast ones.
    let pool = BlockingWorkPool::<u32, String>::new(2, 0..8u32, |index| {
        if index == 0 {
            thread::sleep(Duration::from_millis(100));
        }
        Ok(index)
    })
    .unwrap();

    let mut results = pool.results();
    let first = results.next().expect("a result").unwrap();
    // Completion order: the first delivered value is some fast item, not
    // the sleeper.
    assert_ne!(first, 0);

    let rest: Vec<u32> = results.map(Result::unwrap).collect();
    assert_eq!(rest.len(), 7);
}

// =============================================================================
// Failure Propagation
// =============================================================================

#[rstest]
fn a_failing_item_poisons_the_remaining_results() {
    let pool = BlockingWorkPool::<u32, String>::new(2, 0..64u32, |index| {
        thread::sleep(Duration::from_micros(200));
        if index == 20 {
            Err("twenty".to_owned())
        } else {
            Ok(index)
        }
    })
    .unwrap();

    let error = pool.collect().unwrap_err();
    assert_eq!(error.as_task().map(String::as_str), Some("twenty"));
    assert!(pool.is_failed());
    assert_eq!(pool.queued_len(), 0);
}

#[rstest]
fn every_iterator_observes_the_failure() {
    let pool = BlockingWorkPool::<u32, String>::new(2, 0..16u32, |index| {
        if index == 1 {
            Err("early".to_owned())
        } else {
            thread::sleep(Duration::from_millis(1));
            Ok(index)
        }
    })
    .unwrap();

    let first_error = pool.results().find_map(Result::err);
    let second_error = pool.results().find_map(Result::err);
    assert!(first_error.is_some());
    assert_eq!(first_error, second_error);
}

// =============================================================================
// Shared Observation
// =============================================================================

#[rstest]
fn independent_iterators_see_identical_sequences() {
    let pool = BlockingWorkPool::<u32, String>::new(4, 0..32u32, |index| {
        thread::sleep(Duration::from_micros(u64::from(index % 100)));
        Ok(index * 7)
    })
    .unwrap();

    let first: Vec<u32> = pool.results().map(Result::unwrap).collect();
    let second: Vec<u32> = pool.results().map(Result::unwrap).collect();
    assert_eq!(first, second);
}

#[rstest]
fn join_then_iterate_sees_all_results_ready() {
    let pool = BlockingWorkPool::<u32, String>::new(2, 0..16u32, |index| Ok(index)).unwrap();
    let results = pool.results();
    pool.join();

    let collected: BTreeSet<u32> = results.map(Result::unwrap).collect();
    assert_eq!(collected, (0..16).collect::<BTreeSet<_>>());
}
