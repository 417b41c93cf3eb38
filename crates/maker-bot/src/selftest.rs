//! Offline self-test suite.
//!
//! Exercises the quoting pipeline without network, keys, or TLS:
//! signal math on a fixture book, spread clamping, the feed cache, a
//! full tick against a recording gateway, and the shutdown drain. Run
//! with `--selftest`; the first failure aborts with a nonzero exit.

use std::sync::Arc;
use std::time::{Duration, Instant};

use maker_core::{
    epoch_ms, BookLevel, ClientOrderId, LiveOrder, OrderBookSnapshot, OrderSide, Price, Size,
};
use maker_exec::MockGateway;
use maker_feed::{FeedConfig, MockBookSource, MockPositionSource, PriceFeed};
use maker_mm::{ImbalancePricer, SpreadConfig, SpreadController};
use maker_telemetry::{DynMetricsSink, HealthState, MetricsSink, NoopSink};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::AppConfig;
use crate::engine::{QuotingEngine, TickOutcome};
use crate::error::{AppError, AppResult};

/// Run every check in order. The suite is deterministic and finishes
/// in well under a second.
pub async fn run() -> AppResult<()> {
    check_metrics_sink();
    check_signal_sanity()?;
    check_spread_clamp()?;
    check_feed_cache().await?;
    check_tick_places_orders().await?;
    check_shutdown_drain().await?;
    check_cancel_interrupts_pause().await?;
    Ok(())
}

fn fail(check: &str, detail: String) -> AppError {
    AppError::Selftest(format!("{check}: {detail}"))
}

fn fixture_book() -> OrderBookSnapshot {
    OrderBookSnapshot::new(
        vec![
            BookLevel::new(Price::new(dec!(100.0)), Size::new(dec!(2.0))),
            BookLevel::new(Price::new(dec!(99.9)), Size::new(dec!(1.0))),
        ],
        vec![
            BookLevel::new(Price::new(dec!(100.2)), Size::new(dec!(3.0))),
            BookLevel::new(Price::new(dec!(100.3)), Size::new(dec!(1.0))),
        ],
        epoch_ms(),
    )
}

fn offline_engine() -> (QuotingEngine, Arc<MockGateway>) {
    let book = Arc::new(MockBookSource::fixed(fixture_book()));
    let position = Arc::new(MockPositionSource::flat());
    let gateway = Arc::new(MockGateway::new());
    let metrics: DynMetricsSink = Arc::new(NoopSink);

    let feed = PriceFeed::new(book, FeedConfig::default(), metrics.clone());
    let engine = QuotingEngine::new(
        AppConfig::default(),
        feed,
        position,
        gateway.clone(),
        metrics,
        HealthState::new(),
    );
    (engine, gateway)
}

/// The noop sink must accept the full emission surface without panicking.
fn check_metrics_sink() {
    let sink = NoopSink;
    sink.inc_tick();
    sink.inc_skip("selftest");
    sink.inc_quote("buy");
    sink.inc_cancel();
    sink.inc_error("selftest");
    sink.inc_degraded_ack();
    sink.set_spread_bps(8.0);
    sink.set_mid_price(100.0);
    sink.observe_tick_ms(1.0);
    info!(check = "metrics_sink", "ok");
}

fn check_signal_sanity() -> AppResult<()> {
    let signal = ImbalancePricer::new(10).compute(&fixture_book());

    if signal.imbalance.abs() > Decimal::ONE {
        return Err(fail(
            "signal_sanity",
            format!("imbalance out of bounds: {}", signal.imbalance),
        ));
    }
    if !signal.is_live() || signal.confidence <= Decimal::ZERO {
        return Err(fail(
            "signal_sanity",
            format!(
                "microprice {} / confidence {} should be positive",
                signal.microprice, signal.confidence
            ),
        ));
    }
    if signal.microprice < dec!(100.0) || signal.microprice > dec!(100.2) {
        return Err(fail(
            "signal_sanity",
            format!("microprice {} outside the touch", signal.microprice),
        ));
    }
    info!(check = "signal_sanity", "ok");
    Ok(())
}

fn check_spread_clamp() -> AppResult<()> {
    let mut spread = SpreadController::new(SpreadConfig::default());
    let extremes = [
        (dec!(0.5), dec!(0.5), dec!(0.5), dec!(0.5)),
        (dec!(10), Decimal::ONE, Decimal::ZERO, dec!(0.99)),
        (Decimal::ZERO, Decimal::ZERO, Decimal::ONE, Decimal::ZERO),
    ];
    for (volatility, skew, confidence, imbalance) in extremes {
        let bps = spread.compute_bps(volatility, skew, confidence, imbalance);
        if bps < dec!(4) || bps > dec!(25) {
            return Err(fail("spread_clamp", format!("{bps} bps escaped [4, 25]")));
        }
    }
    info!(check = "spread_clamp", "ok");
    Ok(())
}

/// Two reads inside the TTL must come from the same upstream fetch.
async fn check_feed_cache() -> AppResult<()> {
    let source = Arc::new(MockBookSource::fixed(fixture_book()));
    let metrics: DynMetricsSink = Arc::new(NoopSink);
    let feed = PriceFeed::new(source.clone(), FeedConfig::default(), metrics);

    let now = Instant::now();
    let first = feed.get_snapshot_at(now).await;
    let second = feed.get_snapshot_at(now + Duration::from_millis(50)).await;

    if source.fetch_count() != 1 {
        return Err(fail(
            "feed_cache",
            format!("expected 1 upstream fetch, saw {}", source.fetch_count()),
        ));
    }
    if first.captured_at_ms != second.captured_at_ms {
        return Err(fail("feed_cache", "reads inside the TTL diverged".to_string()));
    }
    info!(check = "feed_cache", "ok");
    Ok(())
}

async fn check_tick_places_orders() -> AppResult<()> {
    let (mut engine, gateway) = offline_engine();

    let outcome = engine
        .tick(Instant::now())
        .await
        .map_err(|e| fail("tick", e.to_string()))?;
    if outcome != TickOutcome::Quoted {
        return Err(fail("tick", format!("expected a quote, got {outcome:?}")));
    }

    let placed = gateway.placed_count();
    if !(1..=2).contains(&placed) {
        return Err(fail("tick", format!("expected 1-2 placements, saw {placed}")));
    }
    info!(check = "tick", placed, "ok");
    Ok(())
}

async fn check_shutdown_drain() -> AppResult<()> {
    let (mut engine, gateway) = offline_engine();
    for (id, side, price) in [
        ("oid-1", OrderSide::Buy, dec!(100.0)),
        ("oid-2", OrderSide::Sell, dec!(100.2)),
    ] {
        engine.seed_live_order(LiveOrder {
            id: id.to_string(),
            client_id: ClientOrderId::new(),
            side,
            price: Price::new(price),
            size: Size::new(dec!(0.1)),
            placed_at_ms: epoch_ms(),
            degraded: false,
        });
    }

    engine.shutdown().await;

    let cancelled = gateway.cancelled();
    for id in ["oid-1", "oid-2"] {
        if !cancelled.iter().any(|c| c == id) {
            return Err(fail("shutdown_drain", format!("{id} was not cancelled")));
        }
    }
    if engine.live_orders() != 0 {
        return Err(fail(
            "shutdown_drain",
            format!("{} orders left in the table", engine.live_orders()),
        ));
    }
    info!(check = "shutdown_drain", "ok");
    Ok(())
}

/// Cancellation during a sleep must resolve promptly instead of
/// letting the sleep run out.
async fn check_cancel_interrupts_pause() -> AppResult<()> {
    let token = CancellationToken::new();
    let waiter = {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => true,
                _ = tokio::time::sleep(Duration::from_secs(5)) => false,
            }
        })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    token.cancel();

    match tokio::time::timeout(Duration::from_secs(1), waiter).await {
        Ok(Ok(true)) => {
            info!(check = "cancel_interrupts_pause", "ok");
            Ok(())
        }
        _ => Err(fail(
            "cancel_interrupts_pause",
            "cancellation did not interrupt the pause".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_suite_passes_offline() {
        assert!(run().await.is_ok());
    }

    #[tokio::test]
    async fn test_fixture_book_is_valid() {
        let book = fixture_book();
        assert_eq!(book.state(), maker_core::BookState::Valid);
        assert_eq!(book.mid().unwrap().inner(), dec!(100.1));
    }
}
