use crate::PerformanceResult;
#[cfg(feature = "rt")]
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
#[cfg(feature = "rt")]
use serde_with::{serde_as, DurationSecondsWithFrac};
use std::fmt;
use std::time::Duration;

/// Success rate (percent) at or above which a run is rated [`Rating::Excellent`]
pub const EXCELLENT_SUCCESS_RATE: f64 = 99.;
/// Success rate (percent) at or above which a run is rated [`Rating::Good`]
pub const GOOD_SUCCESS_RATE: f64 = 95.;

pub const EXCELLENT_AVG_LATENCY: Duration = Duration::from_millis(100);
pub const GOOD_AVG_LATENCY: Duration = Duration::from_millis(500);

/// Requests per second
pub const EXCELLENT_THROUGHPUT: f64 = 100.;
/// Requests per second
pub const GOOD_THROUGHPUT: f64 = 50.;

pub const GOOD_P99_LATENCY: Duration = Duration::from_millis(1_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "rt", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "rt", serde(rename_all = "snake_case"))]
pub enum Rating {
    Excellent,
    Good,
    Poor,
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Rating::Excellent => "excellent",
            Rating::Good => "good",
            Rating::Poor => "poor",
        };
        f.write_str(label)
    }
}

/// Qualitative labels for a single [`PerformanceResult`].
///
/// The p99 latency is only ever rated `Good` or `Poor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "rt", derive(Serialize, Deserialize))]
pub struct Assessment {
    pub success_rate: Rating,
    pub avg_latency: Rating,
    pub throughput: Rating,
    pub p99_latency: Rating,
}

impl Assessment {
    pub fn of(result: &PerformanceResult) -> Self {
        Self {
            success_rate: rate_success(result.success_rate()),
            avg_latency: rate_avg_latency(result.avg_latency),
            throughput: rate_throughput(result.requests_per_second),
            p99_latency: rate_p99_latency(result.p99_latency),
        }
    }
}

pub fn rate_success(success_rate: f64) -> Rating {
    match success_rate {
        x if x >= EXCELLENT_SUCCESS_RATE => Rating::Excellent,
        x if x >= GOOD_SUCCESS_RATE => Rating::Good,
        _ => Rating::Poor,
    }
}

pub fn rate_avg_latency(latency: Duration) -> Rating {
    match latency {
        x if x <= EXCELLENT_AVG_LATENCY => Rating::Excellent,
        x if x <= GOOD_AVG_LATENCY => Rating::Good,
        _ => Rating::Poor,
    }
}

pub fn rate_throughput(requests_per_second: f64) -> Rating {
    match requests_per_second {
        x if x >= EXCELLENT_THROUGHPUT => Rating::Excellent,
        x if x >= GOOD_THROUGHPUT => Rating::Good,
        _ => Rating::Poor,
    }
}

pub fn rate_p99_latency(latency: Duration) -> Rating {
    if latency <= GOOD_P99_LATENCY {
        Rating::Good
    } else {
        Rating::Poor
    }
}

/// Totals across every run of a session, and the pass/fail verdict derived from them.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "rt", cfg_eval::cfg_eval, serde_as)]
#[cfg_attr(feature = "rt", derive(Serialize, Deserialize))]
pub struct SessionSummary {
    pub total_tests: usize,
    pub total_requests: u64,
    pub total_successful: u64,
    /// Percent of successful requests across all runs
    pub success_rate: f64,
    /// Mean of each run's requests per second
    pub avg_requests_per_second: f64,
    /// Mean of each run's average latency
    #[cfg_attr(feature = "rt", serde_as(as = "DurationSecondsWithFrac<f64>"))]
    pub avg_latency: Duration,
}

impl SessionSummary {
    pub fn new(results: &[PerformanceResult]) -> Self {
        let total_requests: u64 = results.iter().map(|r| r.total_requests).sum();
        let total_successful: u64 = results.iter().map(|r| r.successful_requests).sum();

        let success_rate = if total_requests > 0 {
            total_successful as f64 / total_requests as f64 * 100.
        } else {
            0.
        };

        let (avg_requests_per_second, avg_latency) = if results.is_empty() {
            (0., Duration::ZERO)
        } else {
            let count = results.len();
            let rps = results.iter().map(|r| r.requests_per_second).sum::<f64>() / count as f64;
            let nanos = results
                .iter()
                .map(|r| r.avg_latency.as_nanos())
                .sum::<u128>()
                / count as u128;
            (
                rps,
                Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX)),
            )
        };

        Self {
            total_tests: results.len(),
            total_requests,
            total_successful,
            success_rate,
            avg_requests_per_second,
            avg_latency,
        }
    }

    /// A session passes when at least 95% of requests succeeded and the mean average latency
    /// stayed within 500ms.
    pub fn passed(&self) -> bool {
        self.success_rate >= GOOD_SUCCESS_RATE && self.avg_latency <= GOOD_AVG_LATENCY
    }
}
