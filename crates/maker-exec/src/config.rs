//! Execution gateway configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::signer::KeySource;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Base URL of the order submission endpoint.
    #[serde(default = "default_submit_url")]
    pub submit_url: String,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// After retries are exhausted on a transient fault, acknowledge the
    /// placement with a synthetic order id instead of failing the tick.
    /// Synthetic ids cannot be cancelled at the venue.
    #[serde(default)]
    pub allow_degraded: bool,

    /// Submit quotes post-only so they never take liquidity.
    #[serde(default = "default_true")]
    pub post_only: bool,

    /// Where to load the signing key from. `None` means no live key is
    /// available and only dry runs can start.
    #[serde(default)]
    pub key: Option<KeySource>,

    /// Expected authority address. Startup fails when the loaded key
    /// derives a different address.
    #[serde(default)]
    pub authority: Option<String>,
}

impl ExecutionConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            submit_url: default_submit_url(),
            request_timeout_ms: default_request_timeout_ms(),
            allow_degraded: false,
            post_only: default_true(),
            key: None,
            authority: None,
        }
    }
}

fn default_submit_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_request_timeout_ms() -> u64 {
    3000
}

fn default_true() -> bool {
    true
}
