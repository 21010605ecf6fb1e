//! Convenience helpers over [`WorkPool`].
//!
//! Each helper builds a pool, feeds it from an input sequence, closes
//! intake, and drains the results: the whole submit/close/collect dance
//! in one call. Use these when the input is fully known up front; drive a
//! [`WorkPool`] directly when producers and consumers overlap.

use std::future::Future;
use std::pin::pin;

use futures::{Stream, StreamExt};

use crate::error::PoolError;
use crate::order::ResultOrder;
use crate::pool::WorkPool;

/// Maps every item through `process` with at most `max_concurrent` items
/// in flight, preserving input order in the output.
///
/// # Errors
///
/// Returns [`PoolError::InvalidCapacity`] if `max_concurrent` is 0, or the
/// first work-item error.
///
/// # Examples
///
/// ```rust,ignore
/// let bodies = drainpool::map_bounded(urls, 8, |url| async move {
///     fetch(url).await
/// })
/// .await?;
/// ```
pub async fn map_bounded<I, T, E, F, Fut>(
    items: I,
    max_concurrent: usize,
    process: F,
) -> Result<Vec<T>, PoolError<E>>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Clone + Send + 'static,
    E: Send + Sync + 'static,
{
    let pool = WorkPool::try_new(max_concurrent, ResultOrder::Submission)?;
    pool.submit_many(items.into_iter().map(process))?;
    pool.close_intake();
    pool.collect().await
}

/// Runs `process` over every item with at most `max_concurrent` items in
/// flight, discarding the results.
///
/// # Errors
///
/// Returns [`PoolError::InvalidCapacity`] if `max_concurrent` is 0, or the
/// first work-item error.
pub async fn for_each_bounded<I, E, F, Fut>(
    items: I,
    max_concurrent: usize,
    process: F,
) -> Result<(), PoolError<E>>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Send + Sync + 'static,
{
    let pool: WorkPool<(), E> = WorkPool::try_new(max_concurrent, ResultOrder::Completion)?;
    pool.submit_many(items.into_iter().map(process))?;
    pool.close_intake();
    pool.wait().await
}

/// Maps every item of an async input through `process` with at most
/// `max_concurrent` items in flight, preserving input order in the output.
///
/// Work starts as soon as each item arrives from the stream; the input is
/// drained to its end before results are awaited.
///
/// # Errors
///
/// Returns [`PoolError::InvalidCapacity`] if `max_concurrent` is 0, or the
/// first work-item error.
pub async fn map_stream_bounded<S, T, E, F, Fut>(
    items: S,
    max_concurrent: usize,
    mut process: F,
) -> Result<Vec<T>, PoolError<E>>
where
    S: Stream,
    F: FnMut(S::Item) -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Clone + Send + 'static,
    E: Send + Sync + 'static,
{
    let pool = WorkPool::try_new(max_concurrent, ResultOrder::Submission)?;
    {
        let mut items = pin!(items);
        while let Some(item) = items.next().await {
            pool.submit(process(item))?;
        }
    }
    pool.close_intake();
    pool.collect().await
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::time::Duration;

    // =========================================================================
    // map_bounded Tests
    // =========================================================================

    #[rstest]
    #[tokio::test]
    async fn map_bounded_preserves_input_order() {
        let values = map_bounded(0..16u32, 4, |i| async move {
            // Later items finish earlier; order must still hold.
            tokio::time::sleep(Duration::from_millis(u64::from(16 - i))).await;
            Ok::<_, String>(i * 3)
        })
        .await
        .unwrap();

        assert_eq!(values, (0..16).map(|i| i * 3).collect::<Vec<_>>());
    }

    #[rstest]
    #[tokio::test]
    async fn map_bounded_rejects_zero_limit() {
        let result = map_bounded(0..4u32, 0, |i| async move { Ok::<_, String>(i) }).await;
        assert_eq!(result.unwrap_err(), PoolError::InvalidCapacity);
    }

    #[rstest]
    #[tokio::test]
    async fn map_bounded_surfaces_the_first_error() {
        let result = map_bounded(0..4u32, 2, |i| async move {
            if i == 1 { Err("nope".to_owned()) } else { Ok(i) }
        })
        .await;

        assert_eq!(result.unwrap_err().as_task().map(String::as_str), Some("nope"));
    }

    // =========================================================================
    // for_each_bounded Tests
    // =========================================================================

    #[rstest]
    #[tokio::test]
    async fn for_each_bounded_visits_every_item() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let visited = Arc::new(AtomicUsize::new(0));
        for_each_bounded(0..32u32, 8, |_| {
            let visited = Arc::clone(&visited);
            async move {
                visited.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(())
            }
        })
        .await
        .unwrap();

        assert_eq!(visited.load(Ordering::SeqCst), 32);
    }

    // =========================================================================
    // map_stream_bounded Tests
    // =========================================================================

    #[rstest]
    #[tokio::test]
    async fn map_stream_bounded_preserves_input_order() {
        let input = futures::stream::iter(0..8u32);
        let values = map_stream_bounded(input, 3, |i| async move { Ok::<_, String>(i + 100) })
            .await
            .unwrap();

        assert_eq!(values, (100..108).collect::<Vec<_>>());
    }
}
