//! Execution error taxonomy.
//!
//! Errors split into retryable transport faults and terminal venue
//! rejections. Retry logic keys off [`ExecError::is_retryable`];
//! rejections are surfaced immediately so the engine can count them
//! and leave the side unquoted.

use crate::signer::KeyError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Order rejected ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Rate limited by venue")]
    RateLimited,

    #[error("Request timed out")]
    Timeout,

    #[error("Key error: {0}")]
    Key(#[from] KeyError),
}

impl ExecError {
    /// Whether another attempt could plausibly succeed. Rejections and
    /// signing faults are terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Timeout | Self::RateLimited
        )
    }
}

pub type ExecResult<T> = Result<T, ExecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ExecError::Transport("reset".to_string()).is_retryable());
        assert!(ExecError::Timeout.is_retryable());
        assert!(ExecError::RateLimited.is_retryable());

        assert!(!ExecError::Signing("bad key".to_string()).is_retryable());
        assert!(!ExecError::Rejected {
            status: 422,
            body: "post-only would cross".to_string(),
        }
        .is_retryable());
    }
}
