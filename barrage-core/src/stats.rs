use crate::{Outcome, OutcomeSet};
#[cfg(feature = "rt")]
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
#[cfg(feature = "rt")]
use serde_with::{serde_as, DurationSecondsWithFrac};
use std::fmt;
use std::time::Duration;

/// Statistics for a single load test run.
///
/// Built once when the run finishes. `successful_requests + failed_requests` always equals
/// `total_requests`, and every latency field is zero when no request was observed.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "rt", cfg_eval::cfg_eval, serde_as)]
#[cfg_attr(feature = "rt", derive(Serialize, Deserialize))]
pub struct PerformanceResult {
    pub test_name: String,
    pub total_requests: u64,
    #[cfg_attr(feature = "rt", serde_as(as = "DurationSecondsWithFrac<f64>"))]
    pub wall_duration: Duration,
    pub successful_requests: u64,
    pub failed_requests: u64,
    #[cfg_attr(feature = "rt", serde_as(as = "DurationSecondsWithFrac<f64>"))]
    pub avg_latency: Duration,
    #[cfg_attr(feature = "rt", serde_as(as = "DurationSecondsWithFrac<f64>"))]
    pub min_latency: Duration,
    #[cfg_attr(feature = "rt", serde_as(as = "DurationSecondsWithFrac<f64>"))]
    pub max_latency: Duration,
    #[cfg_attr(feature = "rt", serde_as(as = "DurationSecondsWithFrac<f64>"))]
    pub p95_latency: Duration,
    #[cfg_attr(feature = "rt", serde_as(as = "DurationSecondsWithFrac<f64>"))]
    pub p99_latency: Duration,
    pub requests_per_second: f64,
    pub errors: Vec<String>,
}

impl PerformanceResult {
    pub(crate) fn from_parts(
        test_name: &str,
        successful_requests: u64,
        failed_requests: u64,
        mut latencies: Vec<Duration>,
        errors: Vec<String>,
        wall_duration: Duration,
    ) -> Self {
        let total_requests = successful_requests + failed_requests;
        latencies.sort_unstable();

        let (avg_latency, min_latency, max_latency, p95_latency, p99_latency) =
            match (latencies.first(), latencies.last()) {
                (Some(min), Some(max)) => (
                    mean(&latencies),
                    *min,
                    *max,
                    percentile(&latencies, 95.),
                    percentile(&latencies, 99.),
                ),
                _ => Default::default(),
            };

        Self {
            test_name: test_name.to_string(),
            total_requests,
            wall_duration,
            successful_requests,
            failed_requests,
            avg_latency,
            min_latency,
            max_latency,
            p95_latency,
            p99_latency,
            requests_per_second: rate(total_requests, wall_duration),
            errors,
        }
    }

    /// Percentage of successful requests, `0.` for a run without requests.
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.
        } else {
            self.successful_requests as f64 / self.total_requests as f64 * 100.
        }
    }

    /// Fraction of failed requests, `0.` for a run without requests.
    pub fn error_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.
        } else {
            self.failed_requests as f64 / self.total_requests as f64
        }
    }
}

impl fmt::Display for PerformanceResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: Requests={}, Success={:.1}%, RPS={:.2}, avg={:?}, p95={:?}, p99={:?}",
            self.test_name,
            self.total_requests,
            self.success_rate(),
            self.requests_per_second,
            self.avg_latency,
            self.p95_latency,
            self.p99_latency,
        )
    }
}

/// Reduce a collection of outcomes and the wall time they took into a [`PerformanceResult`].
pub fn aggregate<I>(test_name: &str, outcomes: I, wall_duration: Duration) -> PerformanceResult
where
    I: IntoIterator<Item = Outcome>,
{
    outcomes
        .into_iter()
        .collect::<OutcomeSet>()
        .finish(test_name, wall_duration)
}

/// Linearly interpolated percentile of an ascending slice.
///
/// The rank is `percentile / 100 * (n - 1)`; the result lies between the two order statistics
/// surrounding the rank, rounded to the nearest nanosecond.
pub fn percentile(sorted: &[Duration], percentile: f64) -> Duration {
    let Some(last) = sorted.len().checked_sub(1) else {
        return Duration::ZERO;
    };

    let rank = (percentile / 100.).clamp(0., 1.) * last as f64;
    let lower = rank.floor() as usize;
    let upper = (rank.ceil() as usize).min(last);

    let low = sorted[lower].as_nanos() as f64;
    let high = sorted[upper].as_nanos() as f64;
    let nanos = low + (high - low) * (rank - lower as f64);

    Duration::from_nanos(nanos.round() as u64)
}

fn mean(latencies: &[Duration]) -> Duration {
    if latencies.is_empty() {
        return Duration::ZERO;
    }
    let total: u128 = latencies.iter().map(Duration::as_nanos).sum();
    let nanos = total / latencies.len() as u128;
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

fn rate(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0. {
        count as f64 / secs
    } else {
        0.
    }
}
