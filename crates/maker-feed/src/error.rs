//! Feed error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Registry error: {0}")]
    Registry(#[from] maker_registry::RegistryError),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Request timed out")]
    Timeout,

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Malformed response: {0}")]
    Parse(String),
}

pub type FeedResult<T> = Result<T, FeedError>;
