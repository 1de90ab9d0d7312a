use super::joined_outcome;
use crate::gate::Gate;
use barrage_core::{Outcome, OutcomeSet, PerformanceResult};
use governor::DefaultDirectRateLimiter;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Issue `concurrency * requests_per_user` requests with at most `concurrency` in flight.
///
/// Every request is spawned up front and waits on the gate; the run ends when the last one
/// completes.
pub(crate) async fn run_batch<T, F>(
    issue: T,
    name: &str,
    concurrency: usize,
    requests_per_user: usize,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
) -> PerformanceResult
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = Outcome> + Send + 'static,
{
    let total = concurrency.saturating_mul(requests_per_user);
    info!(
        "Running {total} requests ({concurrency} concurrent users, {requests_per_user} requests each)"
    );

    let gate = Gate::new(concurrency);
    let start = Instant::now();

    let mut tasks = JoinSet::new();
    for _ in 0..total {
        let gate = gate.clone();
        let issue = issue.clone();
        let limiter = limiter.clone();
        tasks.spawn(async move {
            let admitted = gate
                .run(async {
                    if let Some(limiter) = &limiter {
                        limiter.until_ready().await;
                    }
                    issue().await
                })
                .await;

            admitted.unwrap_or_else(|err| Outcome::failure(Duration::ZERO, err.to_string()))
        });
    }
    trace!("Spawned {total} requests");

    let mut outcomes = OutcomeSet::with_capacity(total);
    while let Some(joined) = tasks.join_next().await {
        outcomes.push(joined_outcome(joined));
    }
    let elapsed = start.elapsed();

    debug!(
        "Batch finished in {:?}, peak concurrency {}/{}",
        elapsed,
        gate.peak(),
        gate.capacity()
    );

    outcomes.finish(name, elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::rate_limiter;
    use rand_distr::{Distribution, Normal};
    use std::num::NonZeroU32;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts concurrently running calls and remembers the highest count seen.
    #[derive(Default)]
    struct InFlight {
        current: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    impl InFlight {
        fn enter(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
        }

        fn exit(&self) {
            self.current.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn mock_issue(
        counter: Arc<InFlight>,
        latency: Duration,
        succeed: fn(usize) -> bool,
    ) -> impl Fn() -> std::pin::Pin<Box<dyn Future<Output = Outcome> + Send>> + Clone + Send + Sync
    {
        move || {
            let counter = counter.clone();
            Box::pin(async move {
                counter.enter();
                let call = counter.calls.load(Ordering::SeqCst);
                tokio::time::sleep(latency).await;
                counter.exit();
                if succeed(call) {
                    Outcome::success(latency)
                } else {
                    Outcome::failure(latency, format!("connection reset #{call}"))
                }
            })
        }
    }

    #[tracing_test::traced_test]
    #[tokio::test(start_paused = true)]
    async fn total_is_users_times_requests() {
        let counter = Arc::new(InFlight::default());
        let issue = mock_issue(counter.clone(), Duration::from_millis(10), |_| true);

        let result = run_batch(issue, "GET /health", 8, 5, None).await;

        assert_eq!(result.test_name, "GET /health");
        assert_eq!(result.total_requests, 40);
        assert_eq!(result.successful_requests, 40);
        assert_eq!(result.failed_requests, 0);
        assert_eq!(counter.calls.load(Ordering::SeqCst), 40);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrency_is_bounded() {
        let counter = Arc::new(InFlight::default());
        let issue = mock_issue(counter.clone(), Duration::from_millis(25), |_| true);

        let result = run_batch(issue, "bounded", 6, 10, None).await;

        assert_eq!(result.total_requests, 60);
        assert_eq!(counter.peak.load(Ordering::SeqCst), 6);
        assert_eq!(counter.current.load(Ordering::SeqCst), 0);
        // 10 waves of 25ms
        assert!(result.wall_duration >= Duration::from_millis(250));
        assert!(result.requests_per_second > 0.);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_users_is_an_empty_result() {
        let counter = Arc::new(InFlight::default());
        let issue = mock_issue(counter.clone(), Duration::from_millis(10), |_| true);

        let result = run_batch(issue, "GET /health", 0, 10, None).await;

        assert_eq!(result.total_requests, 0);
        assert_eq!(result.successful_requests, 0);
        assert_eq!(result.failed_requests, 0);
        assert_eq!(result.avg_latency, Duration::ZERO);
        assert_eq!(result.p99_latency, Duration::ZERO);
        assert_eq!(result.requests_per_second, 0.);
        assert_eq!(counter.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn every_request_failing() {
        let counter = Arc::new(InFlight::default());
        let issue = mock_issue(counter.clone(), Duration::from_millis(3), |_| false);

        let result = run_batch(issue, "POST /api/v1/analyze/pda", 5, 5, None).await;

        assert_eq!(result.successful_requests, 0);
        assert_eq!(result.failed_requests, 25);
        assert_eq!(result.errors.len(), 10);
        assert_eq!(result.min_latency, Duration::from_millis(3));
        assert_eq!(result.avg_latency, Duration::from_millis(3));
        assert_eq!(result.max_latency, Duration::from_millis(3));
    }

    #[tokio::test(start_paused = true)]
    async fn mixed_outcomes() {
        // NOTE: The outcome is decided at spawn time, so the split does not depend on
        // completion order.
        let counter = Arc::new(AtomicUsize::new(0));
        let issue = {
            let counter = counter.clone();
            move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 15 {
                        Outcome::success(Duration::from_millis(2))
                    } else {
                        Outcome::failure(Duration::from_millis(2), "HTTP 500 Internal Server Error")
                    }
                }
            }
        };
        let result = run_batch(issue, "GET /flaky", 4, 5, None).await;

        assert_eq!(result.total_requests, 20);
        assert_eq!(result.successful_requests, 15);
        assert_eq!(result.failed_requests, 5);
        assert_eq!(result.success_rate(), 75.0);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_request_counts_as_failure() {
        let counter = Arc::new(AtomicUsize::new(0));
        let issue = {
            let counter = counter.clone();
            move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        panic!("issuer bug");
                    }
                    Outcome::success(Duration::from_millis(1))
                }
            }
        };

        let result = run_batch(issue, "GET /health", 2, 3, None).await;

        assert_eq!(result.total_requests, 6);
        assert_eq!(result.failed_requests, 1);
        assert!(result.errors[0].starts_with("task error"));
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    #[ntest::timeout(10_000)]
    async fn noisy_latencies_keep_statistics_ordered() {
        let issue = || async {
            let normal = Normal::<f64>::new(5., 2.).unwrap();
            let ms: f64 = normal.sample(&mut rand::thread_rng()).max(0.5);
            let latency = Duration::from_secs_f64(ms / 1_000.);
            tokio::time::sleep(latency).await;
            Outcome::success(latency)
        };

        let result = run_batch(issue, "noisy", 20, 10, None).await;

        assert_eq!(result.total_requests, 200);
        assert!(result.min_latency <= result.avg_latency);
        assert!(result.avg_latency <= result.max_latency);
        assert!(result.p95_latency <= result.p99_latency);
        let expected_rps = 200. / result.wall_duration.as_secs_f64();
        assert!((result.requests_per_second - expected_rps).abs() < 1e-9);
    }

    #[tokio::test]
    #[ntest::timeout(10_000)]
    async fn tps_limit_spaces_requests() {
        let issue = || async { Outcome::success(Duration::from_micros(10)) };
        let limiter = Arc::new(rate_limiter(NonZeroU32::new(50).unwrap()));

        let result = run_batch(issue, "limited", 5, 4, Some(limiter)).await;

        assert_eq!(result.total_requests, 20);
        // 50 TPS with a burst of one: the 20th request starts no earlier than ~380ms in.
        assert!(result.wall_duration >= Duration::from_millis(350));
    }
}
