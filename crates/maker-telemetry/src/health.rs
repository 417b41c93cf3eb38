//! Liveness state reported over HTTP.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// No tick for this long marks the engine stale.
const STALE_AFTER: Duration = Duration::from_secs(10);

/// Snapshot served from `/healthz`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub position: f64,
    pub active_orders: usize,
    pub last_tick: Option<DateTime<Utc>>,
    pub avg_tick_ms: f64,
}

#[derive(Default)]
struct HealthInner {
    last_tick_at: Option<Instant>,
    last_tick_wall: Option<DateTime<Utc>>,
    position: f64,
    active_orders: usize,
    avg_tick_ms: f64,
}

/// Shared engine liveness state.
///
/// The engine records after every tick; the HTTP server reads.
#[derive(Clone, Default)]
pub struct HealthState {
    inner: Arc<Mutex<HealthInner>>,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed tick.
    pub fn record_tick(&self, position: f64, active_orders: usize, avg_tick_ms: f64) {
        let mut inner = self.inner.lock();
        inner.last_tick_at = Some(Instant::now());
        inner.last_tick_wall = Some(Utc::now());
        inner.position = position;
        inner.active_orders = active_orders;
        inner.avg_tick_ms = avg_tick_ms;
    }

    pub fn report(&self) -> HealthReport {
        self.report_at(Instant::now())
    }

    /// Build a report as of `now`.
    pub fn report_at(&self, now: Instant) -> HealthReport {
        let inner = self.inner.lock();
        let status = match inner.last_tick_at {
            Some(at) if now.duration_since(at) > STALE_AFTER => "stale",
            Some(_) => "ok",
            None => "starting",
        };
        HealthReport {
            status: status.to_string(),
            timestamp: Utc::now(),
            position: inner.position,
            active_orders: inner.active_orders,
            last_tick: inner.last_tick_wall,
            avg_tick_ms: inner.avg_tick_ms,
        }
    }
}
