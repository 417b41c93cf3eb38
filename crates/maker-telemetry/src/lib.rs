//! Metrics and structured logging for the maker engine.
//!
//! - Prometheus counters and gauges behind a swappable sink
//! - Structured JSON logging via tracing
//! - Health endpoint with loop liveness detection
//! - Tick duration tracking

pub mod error;
pub mod health;
pub mod logging;
pub mod metrics;
pub mod perf;
pub mod server;

pub use error::{TelemetryError, TelemetryResult};
pub use health::{HealthReport, HealthState};
pub use logging::init_logging;
pub use metrics::{DynMetricsSink, Metrics, MetricsSink, NoopSink, PrometheusSink};
pub use perf::PerfTracker;
pub use server::run_server;
