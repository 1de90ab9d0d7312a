//! Load test configuration and dispatch
use crate::issuer::{RequestIssuer, RequestTemplate};
use crate::transaction;
use barrage_core::{LoadMode, Outcome, PerformanceResult, RunConfig};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::{
    future::Future,
    num::NonZeroU32,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn, Instrument};

mod batch;
mod sustained;

pub(crate) use batch::run_batch;
pub(crate) use sustained::run_sustained;

/// Load test against a single endpoint
///
/// Created with [`RequestIssuer::load`]. Configure it through [`ConfigurableLoadTest`] and
/// `.await` it to run; the output is the [`PerformanceResult`] of the run.
pub struct LoadTest {
    issuer: RequestIssuer,
    template: RequestTemplate,
    name: Option<String>,
    config: RunConfig,
    runner_fut: Option<Pin<Box<dyn Future<Output = PerformanceResult> + Send>>>,
}

impl LoadTest {
    pub(crate) fn new(issuer: RequestIssuer, template: RequestTemplate) -> Self {
        let config = RunConfig::new(&template.label());
        Self {
            issuer,
            template,
            name: None,
            config,
            runner_fut: None,
        }
    }

    #[doc(hidden)]
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    fn resolved_config(&self) -> RunConfig {
        let mut config = self.config.clone();
        config.name = match (&self.name, &config.mode) {
            (Some(name), _) => name.clone(),
            (None, LoadMode::Batch { .. }) => self.template.label(),
            (None, LoadMode::Sustained { duration }) => {
                format!("Sustained Load ({})", humantime::format_duration(*duration))
            }
        };
        config
    }
}

impl Future for LoadTest {
    type Output = PerformanceResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.runner_fut.is_none() {
            let issuer = self.issuer.clone();
            let template = self.template.clone();
            let config = self.resolved_config();
            self.runner_fut = Some(Box::pin(async move {
                run_load_test(issuer, template, config).await
            }));
        }

        match &mut self.runner_fut {
            Some(runner) => runner.as_mut().poll(cx),
            None => Poll::Pending,
        }
    }
}

pub trait ConfigurableLoadTest<T: Send>: Future<Output = T> + Sized + Send {
    fn concurrency(self, concurrency: usize) -> Self;
    fn requests_per_user(self, requests_per_user: usize) -> Self;
    fn duration(self, duration: Duration) -> Self;
    fn tps(self, tps: NonZeroU32) -> Self;
    fn name(self, name: &str) -> Self;
}

impl ConfigurableLoadTest<PerformanceResult> for LoadTest {
    /// Number of concurrent users.
    ///
    /// For batch runs this is the capacity of the concurrency gate; for sustained runs it is the
    /// number of requests kept in flight.
    ///
    /// # Example
    /// ```no_run
    /// use barrage::prelude::*;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let issuer = RequestIssuer::new("http://localhost:8080").unwrap();
    ///     let result = issuer
    ///         .load(RequestTemplate::get("/health"))
    ///         .concurrency(20)
    ///         .requests_per_user(5)
    ///         .await;
    ///     assert_eq!(result.total_requests, 100);
    /// }
    /// ```
    fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    /// Run in batch mode: every user issues `requests_per_user` requests.
    ///
    /// Replaces a previously set `.duration()`.
    fn requests_per_user(mut self, requests_per_user: usize) -> Self {
        self.config.mode = LoadMode::Batch { requests_per_user };
        self
    }

    /// Run in sustained mode for `duration`, then wait for the requests still in flight.
    ///
    /// Replaces a previously set `.requests_per_user()`.
    ///
    /// # Example
    /// ```no_run
    /// use barrage::prelude::*;
    /// use std::time::Duration;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let issuer = RequestIssuer::new("http://localhost:8080").unwrap();
    ///     let result = issuer
    ///         .load(RequestTemplate::get("/health"))
    ///         .duration(Duration::from_secs(60))
    ///         .await;
    ///     assert!(result.wall_duration >= Duration::from_secs(60));
    /// }
    /// ```
    fn duration(mut self, duration: Duration) -> Self {
        self.config.mode = LoadMode::Sustained { duration };
        self
    }

    /// Cap the rate at which requests are started.
    fn tps(mut self, tps: NonZeroU32) -> Self {
        self.config.tps_limit = Some(tps);
        self
    }

    /// Override the `test_name` reported on the result.
    fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }
}

#[instrument(name = "load_test", skip_all, fields(name = %config.name))]
pub(crate) async fn run_load_test(
    issuer: RequestIssuer,
    template: RequestTemplate,
    config: RunConfig,
) -> PerformanceResult {
    info!("Running {} with config {:?}", config.name, &config);
    transaction::describe();

    let issuer = Arc::new(issuer);
    let template = Arc::new(template);
    let run: Arc<str> = Arc::from(config.name.as_str());
    let issue = move || {
        let issuer = issuer.clone();
        let template = template.clone();
        let run = run.clone();
        async move {
            let outcome = issuer.issue(&template).await;
            transaction::record(&run, &outcome);
            outcome
        }
    };

    let limiter = config.tps_limit.map(|tps| Arc::new(rate_limiter(tps)));

    let result = match config.mode {
        LoadMode::Batch { requests_per_user } => {
            run_batch(
                issue,
                &config.name,
                config.concurrency,
                requests_per_user,
                limiter,
            )
            .await
        }
        LoadMode::Sustained { duration } => {
            run_sustained(issue, &config.name, config.concurrency, duration, limiter).await
        }
    };

    info!("Load test complete: {result}");
    result
}

pub(crate) fn rate_limiter(tps_limit: NonZeroU32) -> DefaultDirectRateLimiter {
    RateLimiter::direct(Quota::per_second(tps_limit).allow_burst(NonZeroU32::MIN))
}

/// Convert a finished task into an outcome; a panicked task counts as a failed request.
pub(crate) fn joined_outcome(joined: Result<Outcome, tokio::task::JoinError>) -> Outcome {
    joined.unwrap_or_else(|err| {
        error!("Request task failed: {err}");
        Outcome::failure(Duration::ZERO, format!("task error: {err}"))
    })
}
