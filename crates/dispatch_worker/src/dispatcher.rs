use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use spanfan_domain::Outcome;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

/// Executes `tasks` with at most `max_in_flight` running concurrently and
/// returns their outcomes in input order.
///
/// A single counting semaphore carries the whole concurrency budget: every
/// task future is spawned eagerly but only begins work once it holds a
/// permit, so the backend never sees more than `max_in_flight` queries at
/// once. Tasks are infallible at the type level (query failures arrive as
/// `Outcome::Failure`), and a fault that escapes anyway, such as a panic, is
/// converted into a positional `Outcome::Failure` here rather than aborting
/// the run.
///
/// Cancelling `cancel` stops admission of tasks that have not yet acquired a
/// permit and lets in-flight ones finish; outcomes gathered by then are
/// returned, still in input order.
pub async fn dispatch_bounded<F>(
    tasks: Vec<F>,
    max_in_flight: usize,
    cancel: CancellationToken,
) -> Vec<Outcome>
where
    F: Future<Output = Outcome> + Send + 'static,
{
    let task_count = tasks.len();
    let semaphore = Arc::new(Semaphore::new(max_in_flight.max(1)));
    let mut join_set = JoinSet::new();
    let mut index_by_task: HashMap<tokio::task::Id, usize> = HashMap::with_capacity(task_count);

    for (index, task) in tasks.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let cancel = cancel.clone();
        let handle = join_set.spawn(async move {
            let _permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => return (index, None),
                permit = semaphore.acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return (index, None),
                },
            };
            // Admission gate: a permit may have been granted in the same
            // instant the token fired.
            if cancel.is_cancelled() {
                return (index, None);
            }
            (index, Some(task.await))
        });
        index_by_task.insert(handle.id(), index);
    }

    let mut slots: Vec<Option<Outcome>> = (0..task_count).map(|_| None).collect();
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((index, Some(outcome))) => slots[index] = Some(outcome),
            Ok((_, None)) => {
                // Task abandoned before starting; leaves no outcome.
            }
            Err(join_error) => {
                error!("dispatch task fault: {join_error}");
                if let Some(&index) = index_by_task.get(&join_error.id()) {
                    slots[index] =
                        Some(Outcome::failure(None, 0.0, format!("task fault: {join_error}")));
                }
            }
        }
    }

    if cancel.is_cancelled() {
        let gathered = slots.iter().filter(|slot| slot.is_some()).count();
        warn!(
            gathered,
            total = task_count,
            "dispatch cancelled; returning outcomes gathered so far"
        );
    }

    slots.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Tasks tag their outcome with their input index via row_count.
    fn indexed_task(index: usize, delay_ms: u64) -> impl Future<Output = Outcome> + Send {
        async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            Outcome::success(None, index as u64, delay_ms as f64)
        }
    }

    #[tokio::test]
    async fn test_outcomes_preserve_input_order() {
        // Later tasks finish first; collection order must still be input order.
        let tasks: Vec<_> = (0..6).map(|i| indexed_task(i, 60 - i as u64 * 10)).collect();
        let outcomes = dispatch_bounded(tasks, 6, CancellationToken::new()).await;

        assert_eq!(outcomes.len(), 6);
        for (i, outcome) in outcomes.iter().enumerate() {
            assert_eq!(outcome.row_count(), i as u64);
        }
    }

    #[tokio::test]
    async fn test_concurrency_never_exceeds_ceiling() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let high_water = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..12)
            .map(|i| {
                let in_flight = Arc::clone(&in_flight);
                let high_water = Arc::clone(&high_water);
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    high_water.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Outcome::success(None, i, 20.0)
                }
            })
            .collect();

        let outcomes = dispatch_bounded(tasks, 3, CancellationToken::new()).await;

        assert_eq!(outcomes.len(), 12);
        assert!(high_water.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_panicking_task_becomes_positional_failure() {
        let tasks: Vec<_> = (0..3)
            .map(|i| {
                let fut: std::pin::Pin<Box<dyn Future<Output = Outcome> + Send>> = if i == 1 {
                    Box::pin(async { panic!("boom") })
                } else {
                    Box::pin(indexed_task(i, 5))
                };
                fut
            })
            .collect();

        let outcomes = dispatch_bounded(tasks, 3, CancellationToken::new()).await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_success());
        assert!(!outcomes[1].is_success());
        assert!(outcomes[1].error().unwrap().contains("task fault"));
        assert!(outcomes[2].is_success());
    }

    #[tokio::test]
    async fn test_pre_cancelled_run_produces_no_outcomes() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let tasks: Vec<_> = (0..4).map(|i| indexed_task(i, 5)).collect();
        let outcomes = dispatch_bounded(tasks, 2, cancel).await;

        assert!(outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_keeps_outcomes_gathered_so_far() {
        let cancel = CancellationToken::new();

        // With a ceiling of 1 the first task runs alone; it cancels the run
        // before releasing its permit, so the rest are never admitted.
        let first = {
            let cancel = cancel.clone();
            async move {
                cancel.cancel();
                Outcome::success(None, 0, 1.0)
            }
        };
        let mut tasks: Vec<std::pin::Pin<Box<dyn Future<Output = Outcome> + Send>>> =
            vec![Box::pin(first)];
        for i in 1..5 {
            tasks.push(Box::pin(indexed_task(i, 5)));
        }

        let outcomes = dispatch_bounded(tasks, 1, cancel).await;

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].row_count(), 0);
    }
}
