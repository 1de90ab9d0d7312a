//! Single-request execution
use crate::error::Error;
use crate::scenario::LoadTest;
use barrage_core::{Outcome, DEFAULT_POOL_IDLE_PER_HOST, DEFAULT_REQUEST_TIMEOUT};
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client, Method, StatusCode,
};
use serde_json::Value;
use std::time::{Duration, Instant};
use url::Url;
#[allow(unused_imports)]
use tracing::{debug, error, info, trace, warn};

/// Description of the request a load test issues over and over.
#[derive(Debug, Clone)]
pub struct RequestTemplate {
    pub method: Method,
    /// Path relative to the issuer's base URL, optionally with a query string.
    pub path: String,
    pub body: Option<Value>,
    pub headers: HeaderMap,
}

impl RequestTemplate {
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            body: None,
            headers: HeaderMap::new(),
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    /// Send `body` as JSON. The request carries `Content-Type: application/json`.
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// `"<METHOD> <path>"`, used as the default name of batch runs.
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

#[derive(Debug, Clone)]
pub struct IssuerConfig {
    /// Deadline for a whole request, body included.
    pub timeout: Duration,
    pub pool_idle_per_host: usize,
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_REQUEST_TIMEOUT,
            pool_idle_per_host: DEFAULT_POOL_IDLE_PER_HOST,
        }
    }
}

/// Issues requests against a single target service.
///
/// Cloning is cheap; every clone shares the same connection pool.
#[derive(Debug, Clone)]
pub struct RequestIssuer {
    client: Client,
    base_url: String,
}

impl RequestIssuer {
    pub fn new(base_url: &str) -> Result<Self, Error> {
        Self::with_config(base_url, IssuerConfig::default())
    }

    pub fn with_config(base_url: &str, config: IssuerConfig) -> Result<Self, Error> {
        let parsed = Url::parse(base_url).map_err(|source| Error::InvalidUrl {
            url: base_url.to_string(),
            source,
        })?;
        if parsed.cannot_be_a_base() {
            return Err(Error::NotABase(base_url.to_string()));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(config.pool_idle_per_host)
            .build()
            .map_err(Error::Client)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Build a load test which repeatedly issues `template`.
    pub fn load(&self, template: RequestTemplate) -> LoadTest {
        LoadTest::new(self.clone(), template)
    }

    /// Perform one request and drain its body.
    ///
    /// Never fails: transport errors, body errors and statuses `>= 400` all come back as a
    /// failed [`Outcome`] carrying the latency up to the point of failure.
    pub async fn issue(&self, template: &RequestTemplate) -> Outcome {
        let start = Instant::now();

        let mut request = self
            .client
            .request(template.method.clone(), self.url(&template.path))
            .headers(template.headers.clone());
        if let Some(body) = &template.body {
            request = request.json(body);
        }

        let outcome = match request.send().await {
            Ok(response) => {
                let status = response.status();
                match response.bytes().await {
                    Ok(_) if is_success(status) => Outcome::success(start.elapsed()),
                    Ok(_) => Outcome::failure(start.elapsed(), format!("HTTP {status}")),
                    Err(err) => Outcome::failure(start.elapsed(), err.to_string()),
                }
            }
            Err(err) => Outcome::failure(start.elapsed(), err.to_string()),
        };

        trace!(
            "{} {} -> success={} latency={:?}",
            template.method,
            template.path,
            outcome.success,
            outcome.latency
        );
        outcome
    }

    /// Connectivity check: `GET path` must answer `200 OK`.
    pub async fn probe(&self, path: &str) -> Result<StatusCode, Error> {
        let url = self.url(path);
        debug!("Probing {url}");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| Error::Unreachable {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        // Drain so the connection goes back to the pool.
        let _ = response.bytes().await;

        if status == StatusCode::OK {
            Ok(status)
        } else {
            Err(Error::UnexpectedStatus { url, status })
        }
    }
}

fn is_success(status: StatusCode) -> bool {
    status.as_u16() < 400
}
