use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Pre-flight check failed: {0}")]
    Connectivity(#[source] barrage::Error),

    #[error("Invalid configuration: {0}")]
    Setup(#[source] barrage::Error),

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}
