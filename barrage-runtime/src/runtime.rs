//! Default barrage runtime
//!
//! Checks that the target answers, runs the selected suite one load test at a time and reports
//! the results.
use crate::{
    error::RuntimeError,
    report::{Session, TextReport},
    suite::Suite,
};
use barrage::core::{DEFAULT_CONCURRENCY, DEFAULT_REQUESTS_PER_USER, DEFAULT_REQUEST_TIMEOUT};
use barrage::prelude::*;
use clap::{builder::FalseyValueParser, Parser};
use std::process::ExitCode;
use std::time::Duration;
#[allow(unused)]
use tracing::{debug, error, info, instrument, warn};

const DEFAULT_URL: &str = "http://localhost:8080";
const HEALTH_PATH: &str = "/health";

#[derive(Parser, Debug)]
#[command(version, about = "HTTP load generator")]
struct BarrageCli {
    /// Base URL of the service under test
    #[arg(short, long, env = "API_URL", default_value = DEFAULT_URL)]
    url: String,

    /// Run the reduced suite (health check and PDA analysis only). Any `QUICK_TEST` value other
    /// than an explicit false (`0`, `false`, `no`, `off`, empty) turns it on.
    #[arg(
        short,
        long,
        env = "QUICK_TEST",
        value_parser = FalseyValueParser::new()
    )]
    quick: bool,

    /// Run a sustained health check load for this long instead of the suite, in seconds or as a
    /// human readable duration (e.g. `60`, `30s`, `2m`)
    #[arg(short, long, env = "SUSTAINED_DURATION", value_parser = parse_duration)]
    sustained: Option<Duration>,

    /// Concurrent users for the full suite
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    users: usize,

    /// Requests per user for the full suite
    #[arg(long, default_value_t = DEFAULT_REQUESTS_PER_USER)]
    requests: usize,

    /// Timeout applied to every request
    #[arg(long, value_parser = parse_duration, default_value = "30s")]
    timeout: Duration,

    /// Cap on requests started per second
    #[arg(long)]
    tps: Option<NonZeroU32>,

    /// Print a JSON document instead of the text report
    #[arg(long)]
    json: bool,
}

/// A bare number is taken as whole seconds, anything else goes through `humantime`.
fn parse_duration(arg: &str) -> Result<Duration, humantime::DurationError> {
    match arg.trim().parse::<u64>() {
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(_) => humantime::parse_duration(arg),
    }
}

/// Default barrage runtime.
///
/// # Example
///
/// ```no_run
/// use barrage_runtime::BarrageRuntime;
///
/// #[tokio::main]
/// async fn main() -> std::process::ExitCode {
///     BarrageRuntime::new().with_args().run().await
/// }
/// ```
#[derive(Debug, Clone)]
pub struct BarrageRuntime {
    url: String,
    quick: bool,
    sustained: Option<Duration>,
    users: usize,
    requests: usize,
    timeout: Duration,
    tps: Option<NonZeroU32>,
    json: bool,
}

impl Default for BarrageRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl BarrageRuntime {
    pub fn new() -> Self {
        BarrageRuntime {
            url: DEFAULT_URL.to_string(),
            quick: false,
            sustained: None,
            users: DEFAULT_CONCURRENCY,
            requests: DEFAULT_REQUESTS_PER_USER,
            timeout: DEFAULT_REQUEST_TIMEOUT,
            tps: None,
            json: false,
        }
    }

    /// Use the default CLI arguments for barrage.
    ///
    /// `-u`, `--url` base URL of the target (env `API_URL`, default `http://localhost:8080`)
    ///
    /// `-q`, `--quick` run the reduced suite (env `QUICK_TEST`)
    ///
    /// `-s`, `--sustained` run a sustained load for the given duration (env `SUSTAINED_DURATION`)
    ///
    /// `--users`, `--requests`, `--timeout`, `--tps` and `--json` tune the run and the output.
    ///
    /// # Example
    /// ```ignore
    /// $ barrage --url http://127.0.0.1:8080 --quick
    /// $ SUSTAINED_DURATION=2m barrage --json
    /// ```
    pub fn with_args(self) -> Self {
        self.apply(BarrageCli::parse())
    }

    fn apply(mut self, args: BarrageCli) -> Self {
        self.url = args.url;
        self.quick = args.quick;
        self.sustained = args.sustained;
        self.users = args.users;
        self.requests = args.requests;
        self.timeout = args.timeout;
        self.tps = args.tps;
        self.json = args.json;
        self
    }

    pub fn url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    pub fn quick(mut self, quick: bool) -> Self {
        self.quick = quick;
        self
    }

    pub fn sustained(mut self, duration: Duration) -> Self {
        self.sustained = Some(duration);
        self
    }

    pub fn users(mut self, users: usize) -> Self {
        self.users = users;
        self
    }

    pub fn requests(mut self, requests: usize) -> Self {
        self.requests = requests;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn tps(mut self, tps: NonZeroU32) -> Self {
        self.tps = Some(tps);
        self
    }

    pub fn json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// The suite this runtime will execute. A sustained duration takes precedence over `quick`.
    pub fn suite(&self) -> Suite {
        match (self.sustained, self.quick) {
            (Some(duration), _) => Suite::Sustained { duration },
            (None, true) => Suite::Quick,
            (None, false) => Suite::Full {
                users: self.users,
                requests: self.requests,
            },
        }
    }

    /// Run the pre-flight check and the selected suite.
    #[instrument(name = "barrage", skip_all, fields(url = %self.url))]
    pub async fn session(&self) -> Result<Session, RuntimeError> {
        let config = IssuerConfig {
            timeout: self.timeout,
            ..IssuerConfig::default()
        };
        let issuer = RequestIssuer::with_config(&self.url, config).map_err(RuntimeError::Setup)?;

        info!("Checking connectivity to {}", issuer.base_url());
        issuer
            .probe(HEALTH_PATH)
            .await
            .map_err(RuntimeError::Connectivity)?;
        info!("Server is accessible");

        let suite = self.suite();
        debug!("Running suite {suite:?}");

        let mut results = Vec::new();
        for scenario in suite.scenarios() {
            let result = scenario.load(&issuer, self.tps).await;
            results.push(result);
        }

        Ok(Session::new(results))
    }

    /// Run the session, print the report to stdout and map the verdict to an exit code.
    pub async fn run(self) -> ExitCode {
        let session = match self.session().await {
            Ok(session) => session,
            Err(err) => {
                error!("{err}");
                return ExitCode::FAILURE;
            }
        };

        if self.json {
            match session.to_json() {
                Ok(json) => println!("{json}"),
                Err(err) => {
                    error!("{err}");
                    return ExitCode::FAILURE;
                }
            }
        } else {
            print!("{}", TextReport(&session));
        }

        if session.passed() {
            ExitCode::SUCCESS
        } else {
            warn!("Performance thresholds not met");
            ExitCode::FAILURE
        }
    }
}
