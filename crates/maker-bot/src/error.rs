//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Registry error: {0}")]
    Registry(#[from] maker_registry::RegistryError),

    #[error("Feed error: {0}")]
    Feed(#[from] maker_feed::FeedError),

    #[error("Execution error: {0}")]
    Exec(#[from] maker_exec::ExecError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] maker_telemetry::TelemetryError),

    #[error("Preflight error: {0}")]
    Preflight(String),

    #[error("Self-test failure: {0}")]
    Selftest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
