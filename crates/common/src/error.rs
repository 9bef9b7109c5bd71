use thiserror::Error;

/// Common error types used across the worker.
///
/// None of these are fatal: callers log them and degrade to
/// "no notification this cycle".
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed status response: {0}")]
    MalformedStatus(String),

    #[error("Host error: {0}")]
    Host(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Short classification used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Store(_) | AppError::Redis(_) | AppError::StoreUnavailable(_) => {
                "store_unavailable"
            }
            AppError::Transport(_) => "transport_failure",
            AppError::MalformedStatus(_) => "malformed_status_response",
            AppError::Host(_) => "host_failure",
            AppError::Config(_) => "config",
        }
    }
}
