//! Shared engine harness for integration tests.
//!
//! Wires the quoting engine to a fixture book source, a flat position
//! source, a recording gateway, and a noop metrics sink.

use std::sync::Arc;

use maker_bot::{AppConfig, QuotingEngine};
use maker_core::{epoch_ms, BookLevel, OrderBookSnapshot, Price, Size};
use maker_exec::MockGateway;
use maker_feed::{FeedConfig, MockBookSource, MockPositionSource, PriceFeed};
use maker_telemetry::{DynMetricsSink, HealthState, NoopSink};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub struct EngineHarness {
    pub engine: QuotingEngine,
    pub gateway: Arc<MockGateway>,
    pub book: Arc<MockBookSource>,
    pub position: Arc<MockPositionSource>,
}

pub fn level(price: Decimal, size: Decimal) -> BookLevel {
    BookLevel::new(Price::new(price), Size::new(size))
}

/// Two-level book around a 100.1 mid, lightly ask-heavy.
pub fn fixture_book() -> OrderBookSnapshot {
    OrderBookSnapshot::new(
        vec![level(dec!(100.0), dec!(2.0)), level(dec!(99.9), dec!(1.0))],
        vec![level(dec!(100.2), dec!(3.0)), level(dec!(100.3), dec!(1.0))],
        epoch_ms(),
    )
}

pub fn harness(config: AppConfig) -> EngineHarness {
    let book = Arc::new(MockBookSource::fixed(fixture_book()));
    let position = Arc::new(MockPositionSource::flat());
    let gateway = Arc::new(MockGateway::new());
    let metrics: DynMetricsSink = Arc::new(NoopSink);

    let feed = PriceFeed::new(book.clone(), FeedConfig::default(), metrics.clone());
    let engine = QuotingEngine::new(
        config,
        feed,
        position.clone(),
        gateway.clone(),
        metrics,
        HealthState::new(),
    );

    EngineHarness {
        engine,
        gateway,
        book,
        position,
    }
}
