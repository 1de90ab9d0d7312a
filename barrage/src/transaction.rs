use barrage_core::Outcome;
use std::sync::Arc;

pub(crate) const LATENCY_METRIC: &str = "barrage_request_latency_seconds";
pub(crate) const SUCCESS_METRIC: &str = "barrage_request_success_total";
pub(crate) const ERROR_METRIC: &str = "barrage_request_error_total";

#[cfg(feature = "metrics")]
pub(crate) fn describe() {
    metrics::describe_histogram!(
        LATENCY_METRIC,
        metrics::Unit::Seconds,
        "Latency of each request, body drain included"
    );
    metrics::describe_counter!(SUCCESS_METRIC, "Requests answered with a status below 400");
    metrics::describe_counter!(ERROR_METRIC, "Requests that failed or returned 400 and above");
}

#[cfg(not(feature = "metrics"))]
pub(crate) fn describe() {}

/// Report a finished request to the metrics recorder, labelled with the run it belongs to.
#[cfg(feature = "metrics")]
pub(crate) fn record(run: &Arc<str>, outcome: &Outcome) {
    metrics::histogram!(LATENCY_METRIC, "run" => Arc::clone(run))
        .record(outcome.latency.as_secs_f64());

    if outcome.success {
        metrics::counter!(SUCCESS_METRIC, "run" => Arc::clone(run)).increment(1);
    } else {
        metrics::counter!(ERROR_METRIC, "run" => Arc::clone(run)).increment(1);
    }
}

#[cfg(not(feature = "metrics"))]
pub(crate) fn record(_run: &Arc<str>, _outcome: &Outcome) {}
