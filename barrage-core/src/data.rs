use crate::{PerformanceResult, MAX_RECORDED_ERRORS};
use std::time::Duration;

/// Result of a single request attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub success: bool,
    pub latency: Duration,
    pub error: Option<String>,
}

impl Outcome {
    pub fn success(latency: Duration) -> Self {
        Self {
            success: true,
            latency,
            error: None,
        }
    }

    pub fn failure(latency: Duration, error: impl Into<String>) -> Self {
        Self {
            success: false,
            latency,
            error: Some(error.into()),
        }
    }
}

/// Running accumulator of [`Outcome`]s.
///
/// Outcomes are folded in one at a time, in whatever order they complete. Only the first
/// [`MAX_RECORDED_ERRORS`] non-empty error strings are retained.
#[derive(Debug, Clone, Default)]
pub struct OutcomeSet {
    success_count: u64,
    error_count: u64,
    latencies: Vec<Duration>,
    errors: Vec<String>,
}

impl OutcomeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            latencies: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    pub fn push(&mut self, outcome: Outcome) {
        if outcome.success {
            self.success_count += 1;
        } else {
            self.error_count += 1;
        }

        self.latencies.push(outcome.latency);

        if let Some(error) = outcome.error {
            if !error.is_empty() && self.errors.len() < MAX_RECORDED_ERRORS {
                self.errors.push(error);
            }
        }
    }

    pub fn success_count(&self) -> u64 {
        self.success_count
    }

    pub fn error_count(&self) -> u64 {
        self.error_count
    }

    pub fn total(&self) -> u64 {
        self.success_count + self.error_count
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Reduce the accumulated outcomes into the final result of a run.
    pub fn finish(self, test_name: &str, wall_duration: Duration) -> PerformanceResult {
        PerformanceResult::from_parts(
            test_name,
            self.success_count,
            self.error_count,
            self.latencies,
            self.errors,
            wall_duration,
        )
    }
}

impl Extend<Outcome> for OutcomeSet {
    fn extend<I: IntoIterator<Item = Outcome>>(&mut self, iter: I) {
        for outcome in iter {
            self.push(outcome);
        }
    }
}

impl FromIterator<Outcome> for OutcomeSet {
    fn from_iter<I: IntoIterator<Item = Outcome>>(iter: I) -> Self {
        let mut set = OutcomeSet::new();
        set.extend(iter);
        set
    }
}
