//! Prometheus metrics for the quoting engine.
//!
//! Metrics are registered lazily against the default registry and
//! accessed through the [`Metrics`] facade. Components never touch the
//! statics directly; they hold a [`DynMetricsSink`] so a run with
//! metrics disabled swaps in the no-op sink.
//!
//! # Panics
//!
//! Registration inside the `Lazy` statics can only fail on a duplicate
//! metric name, which is a programming error, so the unwraps here are
//! intentional.

use crate::error::TelemetryError;
use once_cell::sync::Lazy;
use prometheus::{
    register_gauge, register_histogram, register_int_counter, register_int_counter_vec, Encoder,
    Gauge, Histogram, IntCounter, IntCounterVec, TextEncoder,
};
use std::sync::Arc;

static TICKS_TOTAL: Lazy<IntCounter> =
    Lazy::new(|| register_int_counter!("mm_ticks_total", "Engine ticks started").unwrap());

static SKIPS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!("mm_skips_total", "Ticks skipped, by reason", &["reason"]).unwrap()
});

static QUOTES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!("mm_quotes_total", "Orders placed, by side", &["side"]).unwrap()
});

static CANCELS_TOTAL: Lazy<IntCounter> =
    Lazy::new(|| register_int_counter!("mm_cancel_total", "Orders cancelled").unwrap());

static ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!("mm_errors_total", "Errors, by type", &["type"]).unwrap()
});

static DEGRADED_ACKS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "mm_degraded_acks_total",
        "Placements acknowledged with a synthetic id"
    )
    .unwrap()
});

static SPREAD_BPS: Lazy<Gauge> =
    Lazy::new(|| register_gauge!("mm_spread_bps", "Current quoted spread in bps").unwrap());

static MID_PRICE: Lazy<Gauge> =
    Lazy::new(|| register_gauge!("mm_mid_price", "Last observed mid price").unwrap());

static TICK_DURATION_MS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "mm_tick_duration_ms",
        "Tick wall time in milliseconds",
        vec![1.0, 2.5, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0]
    )
    .unwrap()
});

/// Facade over the registered metrics.
pub struct Metrics;

impl Metrics {
    pub fn inc_tick() {
        TICKS_TOTAL.inc();
    }

    pub fn inc_skip(reason: &str) {
        SKIPS_TOTAL.with_label_values(&[reason]).inc();
    }

    pub fn inc_quote(side: &str) {
        QUOTES_TOTAL.with_label_values(&[side]).inc();
    }

    pub fn inc_cancel() {
        CANCELS_TOTAL.inc();
    }

    pub fn inc_error(kind: &str) {
        ERRORS_TOTAL.with_label_values(&[kind]).inc();
    }

    pub fn inc_degraded_ack() {
        DEGRADED_ACKS_TOTAL.inc();
    }

    pub fn set_spread_bps(bps: f64) {
        SPREAD_BPS.set(bps);
    }

    pub fn set_mid_price(mid: f64) {
        MID_PRICE.set(mid);
    }

    pub fn observe_tick_ms(ms: f64) {
        TICK_DURATION_MS.observe(ms);
    }

    /// Render the default registry in text exposition format.
    pub fn render() -> Result<String, TelemetryError> {
        let metric_families = prometheus::gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}

/// Metric emission capability.
///
/// Components take this instead of calling [`Metrics`] directly so a
/// run without an exporter pays nothing.
pub trait MetricsSink: Send + Sync {
    fn inc_tick(&self);
    fn inc_skip(&self, reason: &str);
    fn inc_quote(&self, side: &str);
    fn inc_cancel(&self);
    fn inc_error(&self, kind: &str);
    fn inc_degraded_ack(&self);
    fn set_spread_bps(&self, bps: f64);
    fn set_mid_price(&self, mid: f64);
    fn observe_tick_ms(&self, ms: f64);
}

pub type DynMetricsSink = Arc<dyn MetricsSink>;

/// Sink backed by the Prometheus default registry.
pub struct PrometheusSink;

impl MetricsSink for PrometheusSink {
    fn inc_tick(&self) {
        Metrics::inc_tick();
    }

    fn inc_skip(&self, reason: &str) {
        Metrics::inc_skip(reason);
    }

    fn inc_quote(&self, side: &str) {
        Metrics::inc_quote(side);
    }

    fn inc_cancel(&self) {
        Metrics::inc_cancel();
    }

    fn inc_error(&self, kind: &str) {
        Metrics::inc_error(kind);
    }

    fn inc_degraded_ack(&self) {
        Metrics::inc_degraded_ack();
    }

    fn set_spread_bps(&self, bps: f64) {
        Metrics::set_spread_bps(bps);
    }

    fn set_mid_price(&self, mid: f64) {
        Metrics::set_mid_price(mid);
    }

    fn observe_tick_ms(&self, ms: f64) {
        Metrics::observe_tick_ms(ms);
    }
}

/// Sink that drops every observation.
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn inc_tick(&self) {}
    fn inc_skip(&self, _reason: &str) {}
    fn inc_quote(&self, _side: &str) {}
    fn inc_cancel(&self) {}
    fn inc_error(&self, _kind: &str) {}
    fn inc_degraded_ack(&self) {}
    fn set_spread_bps(&self, _bps: f64) {}
    fn set_mid_price(&self, _mid: f64) {}
    fn observe_tick_ms(&self, _ms: f64) {}
}
