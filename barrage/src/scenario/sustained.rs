use super::joined_outcome;
use barrage_core::{Outcome, OutcomeSet, PerformanceResult};
use governor::DefaultDirectRateLimiter;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{sleep_until, timeout_at, Instant};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Keep up to `pool_size` requests in flight until `duration` has elapsed, then drain.
///
/// Completed requests are reclaimed as soon as the join set reports them and their slot is
/// refilled on the next pass. Nothing is spawned once the deadline is reached; requests still
/// in flight at that point are awaited and counted, so the wall duration is never shorter
/// than `duration`.
pub(crate) async fn run_sustained<T, F>(
    issue: T,
    name: &str,
    pool_size: usize,
    duration: Duration,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
) -> PerformanceResult
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = Outcome> + Send + 'static,
{
    info!(
        "Running sustained load for {} ({pool_size} requests in flight)",
        humantime::format_duration(duration)
    );

    let start = Instant::now();
    let deadline = start + duration;

    let mut in_flight = JoinSet::new();
    let mut outcomes = OutcomeSet::new();
    let mut spawned: u64 = 0;

    // NOTE: Outcomes are only ever folded in by this task, via `join_next`, which hands out each
    // completed request exactly once.
    'live: loop {
        while in_flight.len() < pool_size && Instant::now() < deadline {
            if let Some(limiter) = &limiter {
                if timeout_at(deadline, limiter.until_ready()).await.is_err() {
                    break 'live;
                }
                if Instant::now() >= deadline {
                    break 'live;
                }
            }
            in_flight.spawn(issue());
            spawned += 1;
        }

        tokio::select! {
            biased;
            _ = sleep_until(deadline) => break 'live,
            Some(joined) = in_flight.join_next() => outcomes.push(joined_outcome(joined)),
        }
    }

    debug!(
        "Deadline reached after {spawned} requests, draining {} in flight",
        in_flight.len()
    );
    while let Some(joined) = in_flight.join_next().await {
        outcomes.push(joined_outcome(joined));
    }
    let elapsed = start.elapsed();

    trace!("Sustained run reclaimed {} of {spawned}", outcomes.total());
    outcomes.finish(name, elapsed)
}
