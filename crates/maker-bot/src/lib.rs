//! Perp maker quoting engine.
//!
//! Main application that wires all components:
//! - Endpoint registry with failover and background probing
//! - Price feed with TTL cache and staleness fallback
//! - Quoting pipeline: imbalance signal, dynamic spread, inventory skew
//! - Risk circuit breaker over order rate and realized loss
//! - Signed order gateway (or a recording mock in dry-run mode)
//! - Telemetry server with health and Prometheus endpoints

pub mod app;
pub mod config;
pub mod engine;
pub mod error;
pub mod selftest;

pub use app::Application;
pub use config::AppConfig;
pub use engine::{QuotingEngine, SkipReason, TickOutcome};
pub use error::{AppError, AppResult};
