use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid base URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Base URL {0} cannot have a path appended to it")]
    NotABase(String),

    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Cannot connect to server at {url}: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Server not accessible at {url}: HTTP {status}")]
    UnexpectedStatus { url: String, status: StatusCode },

    #[error("Concurrency gate closed")]
    GateClosed(#[from] tokio::sync::AcquireError),
}
