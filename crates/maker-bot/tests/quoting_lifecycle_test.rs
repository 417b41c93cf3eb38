//! Quoting engine lifecycle integration tests.
//!
//! Drives the engine through full ticks against recording mocks:
//! - Two-sided quoting on a healthy book
//! - Cancel-replace after a price move
//! - Run-loop drain on cancellation
//! - Degraded acknowledgements during shutdown
//! - Feed outage and risk gating behavior

mod integration;
use integration::common::harness::{harness, level};

use std::time::{Duration, Instant};

use maker_bot::{AppConfig, SkipReason, TickOutcome};
use maker_core::{epoch_ms, OrderBookSnapshot, OrderSide};
use maker_exec::Placement;
use maker_feed::{FeedError, PositionSnapshot};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// A healthy two-level book must produce exactly one bid and one ask,
/// tick-aligned and inside the configured spread band.
#[tokio::test]
async fn test_tick_quotes_both_sides_inside_spread_band() {
    let mut h = harness(AppConfig::default());

    let outcome = h.engine.tick(Instant::now()).await.unwrap();
    assert_eq!(outcome, TickOutcome::Quoted);

    let placed = h.gateway.placed();
    assert_eq!(placed.len(), 2);
    let buy = placed.iter().find(|i| i.side == OrderSide::Buy).unwrap();
    let sell = placed.iter().find(|i| i.side == OrderSide::Sell).unwrap();

    assert!(buy.price < sell.price);
    assert!(buy.size.is_positive() && sell.size.is_positive());
    assert!(buy.post_only && sell.post_only);

    assert!((buy.price.inner() % dec!(0.001)).is_zero());
    assert!((sell.price.inner() % dec!(0.001)).is_zero());

    // Width around the 100.1 mid stays inside the configured band,
    // with a tick of rounding slack per side.
    let width_bps = (sell.price.inner() - buy.price.inner()) / dec!(100.1) * dec!(10000);
    assert!(width_bps >= dec!(3.8), "width {width_bps} bps too tight");
    assert!(width_bps <= dec!(25.2), "width {width_bps} bps too wide");

    assert_eq!(h.engine.live_orders(), 2);
}

/// Once the interval has elapsed, a large book move cancels both
/// resting orders and requotes at the new level.
#[tokio::test]
async fn test_cancel_replace_after_price_move() {
    let mut h = harness(AppConfig::default());
    h.engine.tick(Instant::now()).await.unwrap();
    assert_eq!(h.gateway.placed_count(), 2);

    h.book.set_steady(OrderBookSnapshot::new(
        vec![level(dec!(105.0), dec!(2.0)), level(dec!(104.9), dec!(1.0))],
        vec![level(dec!(105.2), dec!(3.0)), level(dec!(105.3), dec!(1.0))],
        epoch_ms(),
    ));

    tokio::time::sleep(Duration::from_millis(950)).await;
    h.engine.tick(Instant::now()).await.unwrap();

    assert_eq!(h.gateway.cancelled_count(), 2);
    assert_eq!(h.gateway.placed_count(), 4);
    let placed = h.gateway.placed();
    for intent in &placed[2..] {
        assert!(intent.price.inner() > dec!(104.0));
    }
}

/// A position at the cap halts quoting until it unwinds.
#[tokio::test]
async fn test_position_cap_halts_quoting() {
    let mut h = harness(AppConfig::default());
    h.position.set(PositionSnapshot {
        base_position: dec!(120),
        realized_pnl: Decimal::ZERO,
    });

    let outcome = h.engine.tick(Instant::now()).await.unwrap();

    assert_eq!(outcome, TickOutcome::Skipped(SkipReason::PositionLimit));
    assert_eq!(h.gateway.placed_count(), 0);
}

/// The run loop quotes on its first pass and drains every resting
/// order when the token is cancelled.
#[tokio::test]
async fn test_run_loop_quotes_then_drains_on_cancel() {
    let h = harness(AppConfig::default());
    let gateway = h.gateway.clone();
    let mut engine = h.engine;

    let token = CancellationToken::new();
    let run_token = token.clone();
    let handle = tokio::spawn(async move {
        engine.run(run_token).await;
    });

    tokio::time::sleep(Duration::from_millis(600)).await;
    token.cancel();
    timeout(Duration::from_secs(2), handle)
        .await
        .expect("run loop should stop after cancellation")
        .unwrap();

    // One placement per side on the first pass, both drained on stop.
    assert_eq!(gateway.placed_count(), 2);
    assert_eq!(gateway.cancelled_count(), 2);
}

/// Synthetic ids from degraded acknowledgements never reach the venue
/// cancel path; the genuinely acked side does.
#[tokio::test]
async fn test_degraded_ack_skips_network_cancel_on_drain() {
    let mut h = harness(AppConfig::default());
    h.gateway
        .push_response(Ok(Placement::Degraded("mock-000042".to_string())));

    h.engine.tick(Instant::now()).await.unwrap();
    assert_eq!(h.engine.live_orders(), 2);

    h.engine.shutdown().await;

    assert_eq!(h.engine.live_orders(), 0);
    assert_eq!(h.gateway.cancelled_count(), 1);
    assert!(h.gateway.cancelled().iter().all(|id| !id.starts_with("mock-")));
}

/// A transient fetch failure falls back to the cached book and the
/// pipeline keeps running.
#[tokio::test]
async fn test_feed_outage_keeps_engine_quoting() {
    let mut h = harness(AppConfig::default());
    h.engine.tick(Instant::now()).await.unwrap();

    h.book.push(Err(FeedError::Timeout));
    tokio::time::sleep(Duration::from_millis(300)).await;

    let outcome = h.engine.tick(Instant::now()).await.unwrap();
    assert_eq!(outcome, TickOutcome::Quoted);
}

/// Exceeding the order budget trips the governor; quoting resumes once
/// the window slides past the burst.
#[tokio::test]
async fn test_order_budget_gates_following_ticks() {
    let mut config = AppConfig::default();
    config.risk.max_orders_per_minute = 1;
    let mut h = harness(config);

    let t0 = Instant::now();
    assert_eq!(h.engine.tick(t0).await.unwrap(), TickOutcome::Quoted);

    let gated = h.engine.tick(t0 + Duration::from_millis(300)).await.unwrap();
    assert_eq!(gated, TickOutcome::RiskGated);

    let later = h.engine.tick(t0 + Duration::from_secs(91)).await.unwrap();
    assert_eq!(later, TickOutcome::Quoted);
}
