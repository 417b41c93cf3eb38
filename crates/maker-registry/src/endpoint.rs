//! Endpoint configuration and health state.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Static configuration for one read endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub name: String,
    pub url: String,
    /// Lower value is preferred.
    #[serde(default = "default_priority")]
    pub priority: u32,
    /// Requests allowed per sliding one-second window.
    #[serde(default = "default_max_rps")]
    pub max_rps: usize,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Parking time after a rate-limit response without a Retry-After hint.
    #[serde(default = "default_retry_after_ms")]
    pub retry_after_ms: u64,
}

impl EndpointConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_priority() -> u32 {
    0
}

fn default_max_rps() -> usize {
    10
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_retry_after_ms() -> u64 {
    1_000
}

/// Health status of one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointStatus {
    /// Recent success, preferred for selection.
    Healthy,
    /// Recent failures below the trip threshold; still selectable.
    Degraded,
    /// Tripped on consecutive failures; excluded until a probe succeeds.
    Failed,
    /// Parked until the rate-limit reset deadline.
    RateLimited,
}

impl std::fmt::Display for EndpointStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
            Self::Failed => write!(f, "failed"),
            Self::RateLimited => write!(f, "rate_limited"),
        }
    }
}

/// Failure classification reported back after a request.
#[derive(Debug, Clone, Copy)]
pub enum FailureKind {
    /// HTTP 429 or equivalent; `retry_after` comes from the response
    /// header when present.
    RateLimited { retry_after: Option<Duration> },
    /// Timeout, connect error, 5xx, or a bad payload.
    Transport,
}

/// Connection details handed to a caller after selection.
///
/// Owned strings so no registry lock is held across the request.
#[derive(Debug, Clone)]
pub struct SelectedEndpoint {
    pub name: String,
    pub url: String,
    pub timeout: Duration,
}
