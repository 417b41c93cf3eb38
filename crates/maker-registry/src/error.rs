//! Registry error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("No endpoint available")]
    NoEndpointAvailable,

    #[error("Unknown endpoint: {0}")]
    UnknownEndpoint(String),
}

pub type RegistryResult<T> = Result<T, RegistryError>;
