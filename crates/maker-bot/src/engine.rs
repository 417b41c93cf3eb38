//! Quoting engine: the per-tick pipeline and live-order lifecycle.
//!
//! One tick = position refresh, stale-order sweep, risk gate, book
//! snapshot, signal computation, quote construction, cancel-replace.
//! The engine owns the live-order table (at most one order per side)
//! and is the only writer to it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use maker_core::{epoch_ms, BookState, ClientOrderId, LiveOrder, OrderSide, Price, Quote, Size};
use maker_exec::{DynExecutionClient, ExecError, OrderIntent};
use maker_feed::{DynPositionSource, PriceFeed};
use maker_mm::{ImbalancePricer, InventoryController, SpreadController, VolatilityTracker};
use maker_risk::{RiskGovernor, Verdict};
use maker_telemetry::{DynMetricsSink, HealthState, PerfTracker};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::error::AppResult;

/// Tick cadence.
const TICK_INTERVAL: Duration = Duration::from_millis(250);
/// Minimum spacing between position polls.
const POSITION_REFRESH_INTERVAL: Duration = Duration::from_secs(5);
/// Resting orders older than this are assumed filled.
const STALE_ORDER_MS: i64 = 30_000;
/// Consecutive tick errors tolerated before recovery mode.
const MAX_CONSECUTIVE_ERRORS: u32 = 10;
/// Pause after a failed tick.
const ERROR_BACKOFF: Duration = Duration::from_millis(500);
/// Pause after entering recovery mode.
const RECOVERY_PAUSE: Duration = Duration::from_secs(10);
/// Pause while the risk governor holds the loop in cooldown.
const RISK_GATE_PAUSE: Duration = Duration::from_secs(1);
/// Budget for the recovery cancel-all.
const RECOVERY_CANCEL_BUDGET: Duration = Duration::from_secs(2);

/// Why a tick placed nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoBook,
    Crossed,
    MidNotPositive,
    Toxic,
    PositionLimit,
    InvalidQuote,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoBook => "no_book",
            Self::Crossed => "crossed",
            Self::MidNotPositive => "mid_not_positive",
            Self::Toxic => "toxic",
            Self::PositionLimit => "position_limit",
            Self::InvalidQuote => "invalid_quote",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Quote computed and cancel-replace ran.
    Quoted,
    /// Tick ended early; the reason counter was incremented.
    Skipped(SkipReason),
    /// Risk governor cooldown is active.
    RiskGated,
}

pub struct QuotingEngine {
    config: AppConfig,
    feed: PriceFeed,
    position_source: DynPositionSource,
    exec: DynExecutionClient,
    metrics: DynMetricsSink,
    health: HealthState,

    pricer: ImbalancePricer,
    spread: SpreadController,
    inventory: InventoryController,
    volatility: VolatilityTracker,
    governor: RiskGovernor,
    perf: PerfTracker,

    live: HashMap<OrderSide, LiveOrder>,
    position: Decimal,
    last_realized_pnl: Option<Decimal>,
    last_position_refresh: Option<Instant>,
    last_cancel_replace_ms: i64,
    consecutive_errors: u32,
}

impl QuotingEngine {
    pub fn new(
        config: AppConfig,
        feed: PriceFeed,
        position_source: DynPositionSource,
        exec: DynExecutionClient,
        metrics: DynMetricsSink,
        health: HealthState,
    ) -> Self {
        let pricer = ImbalancePricer::new(config.obi.levels);
        let spread = SpreadController::new(config.spread.clone());
        let inventory = InventoryController::new(config.inventory.clone());
        let governor = RiskGovernor::new(config.risk.clone());

        Self {
            config,
            feed,
            position_source,
            exec,
            metrics,
            health,
            pricer,
            spread,
            inventory,
            volatility: VolatilityTracker::default(),
            governor,
            perf: PerfTracker::new(),
            live: HashMap::new(),
            position: Decimal::ZERO,
            last_realized_pnl: None,
            last_position_refresh: None,
            last_cancel_replace_ms: 0,
            consecutive_errors: 0,
        }
    }

    /// Number of orders the engine believes are resting.
    pub fn live_orders(&self) -> usize {
        self.live.len()
    }

    /// Insert a resting order directly, bypassing placement. Used by
    /// the offline self-test to stage shutdown scenarios.
    pub(crate) fn seed_live_order(&mut self, order: LiveOrder) {
        self.live.insert(order.side, order);
    }

    /// Run the tick loop until the token is cancelled, then drain.
    pub async fn run(&mut self, token: CancellationToken) {
        info!(
            symbol = %self.config.symbol,
            tick_interval_ms = TICK_INTERVAL.as_millis() as u64,
            "Entering quoting loop"
        );

        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    let started = Instant::now();
                    match self.tick(started).await {
                        Ok(TickOutcome::RiskGated) => {
                            self.consecutive_errors = 0;
                            pause(&token, RISK_GATE_PAUSE).await;
                        }
                        Ok(_) => {
                            self.consecutive_errors = 0;
                        }
                        Err(e) => {
                            self.handle_tick_error(&e.to_string(), &token).await;
                        }
                    }
                    self.health.record_tick(
                        self.position.to_f64().unwrap_or(0.0),
                        self.live.len(),
                        self.perf.avg_ms(),
                    );
                }
            }
        }

        info!("Quoting loop stopped");
        self.shutdown().await;
    }

    /// One pass of the quoting pipeline.
    pub async fn tick(&mut self, now: Instant) -> AppResult<TickOutcome> {
        self.metrics.inc_tick();

        self.refresh_position(now).await;
        self.sweep_stale_orders();

        if let Verdict::Cooldown { reason, .. } = self.governor.check(now) {
            info!(reason = %reason, "Risk governor cooldown, not quoting");
            return Ok(TickOutcome::RiskGated);
        }

        let snapshot = self.feed.get_snapshot().await;
        match snapshot.state() {
            BookState::Empty => return self.skip(SkipReason::NoBook),
            BookState::Crossed => return self.skip(SkipReason::Crossed),
            BookState::NonPositive => return self.skip(SkipReason::MidNotPositive),
            BookState::Valid => {}
        }
        let Some(mid) = snapshot.mid() else {
            return self.skip(SkipReason::MidNotPositive);
        };

        let signal = self.pricer.compute(&snapshot);
        if self.config.toxicity_guard.enabled && signal.imbalance.abs() > dec!(0.95) {
            return self.skip(SkipReason::Toxic);
        }

        if !self.inventory.tradable(self.position) {
            warn!(position = %self.position, "Position at cap, not quoting");
            return self.skip(SkipReason::PositionLimit);
        }

        self.metrics.set_mid_price(mid.inner().to_f64().unwrap_or(0.0));

        self.volatility.record_mid(mid.inner());
        let volatility = self.volatility.current();
        let inventory_skew = self.inventory.skew(self.position);

        let spread_bps =
            self.spread
                .compute_bps(volatility, inventory_skew, signal.confidence, signal.imbalance);
        self.metrics.set_spread_bps(spread_bps.to_f64().unwrap_or(0.0));

        let half = spread_bps / Decimal::TWO / dec!(10000);
        let mut bid_px = mid.inner() * (Decimal::ONE - half);
        let mut ask_px = mid.inner() * (Decimal::ONE + half);

        // Microprice weighting shifts both prices the same way: toward
        // the side the flow leans on, not symmetrically apart.
        if self.config.obi.use_microprice && signal.is_live() {
            let shift = signal.skew_adjust * mid.inner() * dec!(0.001);
            bid_px += shift;
            ask_px += shift;
        }

        if bid_px <= Decimal::ZERO || ask_px <= Decimal::ZERO || bid_px >= ask_px {
            return self.skip(SkipReason::InvalidQuote);
        }

        let bid_px = Price::new(bid_px).floor_to_tick(self.config.tick_size);
        let ask_px = Price::new(ask_px).ceil_to_tick(self.config.tick_size);

        let (bid_sz, ask_sz) =
            self.inventory
                .sizes(self.config.base_order_size, volatility, inventory_skew);

        let quote = Quote::new(bid_px, bid_sz, ask_px, ask_sz);
        if let Err(e) = quote.validate() {
            debug!(error = %e, "Quote failed validation");
            return self.skip(SkipReason::InvalidQuote);
        }

        self.cancel_replace(&quote, now).await?;

        let elapsed_ms = now.elapsed().as_secs_f64() * 1_000.0;
        self.perf.record_ms(elapsed_ms);
        self.metrics.observe_tick_ms(elapsed_ms);

        Ok(TickOutcome::Quoted)
    }

    /// Cancel all live orders and clear the table. Degraded orders are
    /// dropped locally; there is nothing to cancel remotely for them.
    pub async fn shutdown(&mut self) {
        if self.live.is_empty() {
            return;
        }
        let total = self.live.len();

        if !self.config.shutdown.cancel_on_shutdown {
            warn!(total, "Leaving live orders resting per config");
            self.live.clear();
            return;
        }

        let ids: Vec<String> = self
            .live
            .values()
            .filter(|order| !order.degraded)
            .map(|order| order.id.clone())
            .collect();

        if !ids.is_empty() {
            let budget = Duration::from_millis(self.config.shutdown.cancel_timeout_ms);
            let per_req = (budget / ids.len() as u32)
                .clamp(Duration::from_millis(100), Duration::from_millis(500));

            match tokio::time::timeout(budget, self.exec.cancel_many(ids, per_req)).await {
                Ok(ok) if ok < total => warn!(ok, total, "Shutdown drain left orders uncancelled"),
                Ok(ok) => info!(ok, total, "Shutdown drain complete"),
                Err(_) => warn!(total, "Shutdown drain hit its overall deadline"),
            }
        }

        self.live.clear();
    }

    async fn refresh_position(&mut self, now: Instant) {
        if let Some(last) = self.last_position_refresh {
            if now.duration_since(last) < POSITION_REFRESH_INTERVAL {
                return;
            }
        }
        self.last_position_refresh = Some(now);

        match self.position_source.fetch_position().await {
            Ok(snapshot) => {
                self.position = snapshot.base_position;
                if let Some(prev) = self.last_realized_pnl {
                    let delta = snapshot.realized_pnl - prev;
                    if !delta.is_zero() {
                        self.governor.record_pnl(delta, now);
                    }
                }
                self.last_realized_pnl = Some(snapshot.realized_pnl);
            }
            Err(e) => {
                warn!(error = %e, "Failed to refresh position");
                self.metrics.inc_error("position");
            }
        }
    }

    /// An order resting past the fill timeout is assumed filled and
    /// folded into the position.
    fn sweep_stale_orders(&mut self) {
        let now_ms = epoch_ms();
        let stale: Vec<OrderSide> = self
            .live
            .iter()
            .filter(|(_, order)| order.age_ms(now_ms) > STALE_ORDER_MS)
            .map(|(side, _)| *side)
            .collect();

        for side in stale {
            if let Some(order) = self.live.remove(&side) {
                self.position += order.size.inner() * Decimal::from(order.side.sign());
                info!(
                    side = %order.side,
                    order_id = %order.id,
                    age_ms = order.age_ms(now_ms),
                    position = %self.position,
                    "Order past fill timeout, assuming filled"
                );
            }
        }
    }

    async fn cancel_replace(&mut self, quote: &Quote, now: Instant) -> AppResult<()> {
        if !self.config.cancel_replace.enabled {
            return Ok(());
        }
        let now_ms = epoch_ms();
        if now_ms - self.last_cancel_replace_ms < self.config.cancel_replace.interval_ms as i64 {
            return Ok(());
        }

        let min_move =
            self.config.tick_size * Decimal::from(self.config.cancel_replace.min_ticks);

        for side in [OrderSide::Buy, OrderSide::Sell] {
            let moved = match self.live.get(&side) {
                Some(order) => order.price.distance(quote.price(side)) >= min_move,
                None => false,
            };
            if moved {
                self.cancel_order(side).await;
            }
        }

        for side in [OrderSide::Buy, OrderSide::Sell] {
            if self.live.contains_key(&side) {
                continue;
            }
            let size = quote.size(side);
            if size.is_zero() {
                continue;
            }
            self.place_order(side, quote.price(side), size, now).await?;
        }

        self.last_cancel_replace_ms = now_ms;
        Ok(())
    }

    /// Remove and cancel one side. Best-effort: a failed network cancel
    /// still drops the order locally so the side can be re-quoted.
    async fn cancel_order(&mut self, side: OrderSide) {
        let Some(order) = self.live.remove(&side) else {
            return;
        };
        if order.degraded {
            debug!(order_id = %order.id, "Dropping degraded order, no network cancel");
            return;
        }
        if let Err(e) = self.exec.cancel(&order.id).await {
            warn!(order_id = %order.id, error = %e, "Cancel failed, dropping order anyway");
            self.metrics.inc_error("cancel");
        }
    }

    async fn place_order(
        &mut self,
        side: OrderSide,
        price: Price,
        size: Size,
        now: Instant,
    ) -> AppResult<()> {
        let client_id = ClientOrderId::new();
        let intent = OrderIntent {
            market_id: self.config.market_id,
            side,
            price,
            size,
            post_only: self.config.execution.post_only,
            client_id: client_id.as_str().to_string(),
        };

        match self.exec.place_limit(intent).await {
            Ok(placement) => {
                let degraded = placement.is_degraded();
                debug!(
                    side = %side,
                    price = %price,
                    size = %size,
                    order_id = placement.order_id(),
                    degraded,
                    "Order placed"
                );
                self.live.insert(
                    side,
                    LiveOrder {
                        id: placement.order_id().to_string(),
                        client_id,
                        side,
                        price,
                        size,
                        placed_at_ms: epoch_ms(),
                        degraded,
                    },
                );
                self.governor.record_order(now);
                Ok(())
            }
            Err(ExecError::Rejected { status, body }) => {
                warn!(status, body = %body, side = %side, "Order rejected");
                self.metrics.inc_error("reject");
                Ok(())
            }
            Err(e) => {
                self.metrics.inc_error("submit");
                Err(e.into())
            }
        }
    }

    async fn handle_tick_error(&mut self, error: &str, token: &CancellationToken) {
        self.consecutive_errors += 1;

        if self.consecutive_errors > MAX_CONSECUTIVE_ERRORS {
            error!(
                error,
                consecutive = self.consecutive_errors,
                "Too many consecutive tick errors, entering recovery"
            );
            self.recovery_cancel_all().await;
            pause(token, RECOVERY_PAUSE).await;
            self.consecutive_errors = 0;
        } else {
            warn!(error, consecutive = self.consecutive_errors, "Tick failed");
            self.metrics.inc_error("tick");
            pause(token, ERROR_BACKOFF).await;
        }
    }

    async fn recovery_cancel_all(&mut self) {
        let ids: Vec<String> = self
            .live
            .values()
            .filter(|order| !order.degraded)
            .map(|order| order.id.clone())
            .collect();
        if !ids.is_empty() {
            let per_req = (RECOVERY_CANCEL_BUDGET / ids.len() as u32)
                .clamp(Duration::from_millis(100), Duration::from_millis(500));
            let _ = tokio::time::timeout(
                RECOVERY_CANCEL_BUDGET,
                self.exec.cancel_many(ids, per_req),
            )
            .await;
        }
        self.live.clear();
    }

    fn skip(&self, reason: SkipReason) -> AppResult<TickOutcome> {
        debug!(reason = %reason, "Skipping tick");
        self.metrics.inc_skip(reason.as_str());
        Ok(TickOutcome::Skipped(reason))
    }
}

/// Sleep that yields early on cancellation.
async fn pause(token: &CancellationToken, duration: Duration) {
    tokio::select! {
        _ = token.cancelled() => {}
        _ = tokio::time::sleep(duration) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maker_core::{BookLevel, OrderBookSnapshot};
    use maker_exec::{MockGateway, Placement};
    use maker_feed::{FeedConfig, MockBookSource, MockPositionSource, PositionSnapshot};
    use maker_telemetry::NoopSink;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn level(price: Decimal, size: Decimal) -> BookLevel {
        BookLevel::new(Price::new(price), Size::new(size))
    }

    fn balanced_book() -> OrderBookSnapshot {
        OrderBookSnapshot::new(
            vec![level(dec!(100.0), dec!(2.0)), level(dec!(99.9), dec!(1.0))],
            vec![level(dec!(100.2), dec!(3.0)), level(dec!(100.3), dec!(1.0))],
            epoch_ms(),
        )
    }

    struct Harness {
        engine: QuotingEngine,
        gateway: Arc<MockGateway>,
        book: Arc<MockBookSource>,
        position: Arc<MockPositionSource>,
    }

    fn harness(config: AppConfig) -> Harness {
        let book = Arc::new(MockBookSource::fixed(balanced_book()));
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

        Harness {
            engine,
            gateway,
            book,
            position,
        }
    }

    fn live_order(side: OrderSide, price: Decimal, size: Decimal, placed_at_ms: i64) -> LiveOrder {
        LiveOrder {
            id: format!("ord-{side}"),
            client_id: ClientOrderId::new(),
            side,
            price: Price::new(price),
            size: Size::new(size),
            placed_at_ms,
            degraded: false,
        }
    }

    #[tokio::test]
    async fn test_tick_places_both_sides() {
        let mut h = harness(AppConfig::default());

        let outcome = h.engine.tick(Instant::now()).await.unwrap();

        assert_eq!(outcome, TickOutcome::Quoted);
        let placed = h.gateway.placed();
        assert_eq!(placed.len(), 2);

        let buy = placed.iter().find(|i| i.side == OrderSide::Buy).unwrap();
        let sell = placed.iter().find(|i| i.side == OrderSide::Sell).unwrap();
        assert!(buy.price < sell.price);
        assert!(buy.size.is_positive());
        assert!(sell.size.is_positive());
        assert_eq!(h.engine.live_orders(), 2);
    }

    #[tokio::test]
    async fn test_quotes_are_tick_aligned() {
        let mut h = harness(AppConfig::default());
        h.engine.tick(Instant::now()).await.unwrap();

        for intent in h.gateway.placed() {
            let remainder = intent.price.inner() % dec!(0.001);
            assert!(remainder.is_zero(), "price {} off-grid", intent.price);
        }
    }

    #[tokio::test]
    async fn test_empty_book_skips_without_placing() {
        let mut h = harness(AppConfig::default());
        h.book.set_steady(OrderBookSnapshot::empty(epoch_ms()));

        let outcome = h.engine.tick(Instant::now()).await.unwrap();

        assert_eq!(outcome, TickOutcome::Skipped(SkipReason::NoBook));
        assert_eq!(h.gateway.placed_count(), 0);
    }

    #[tokio::test]
    async fn test_crossed_book_skips() {
        let mut h = harness(AppConfig::default());
        h.book.set_steady(OrderBookSnapshot::new(
            vec![level(dec!(100.5), dec!(1.0))],
            vec![level(dec!(100.0), dec!(1.0))],
            epoch_ms(),
        ));

        let outcome = h.engine.tick(Instant::now()).await.unwrap();
        assert_eq!(outcome, TickOutcome::Skipped(SkipReason::Crossed));
    }

    #[tokio::test]
    async fn test_toxic_book_skips_when_guard_enabled() {
        let mut h = harness(AppConfig::default());
        // Heavily one-sided: imbalance = (100 - 0.1) / 100.1 > 0.95
        h.book.set_steady(OrderBookSnapshot::new(
            vec![level(dec!(100.0), dec!(100.0))],
            vec![level(dec!(100.2), dec!(0.1))],
            epoch_ms(),
        ));

        let outcome = h.engine.tick(Instant::now()).await.unwrap();
        assert_eq!(outcome, TickOutcome::Skipped(SkipReason::Toxic));
    }

    #[tokio::test]
    async fn test_toxic_book_quotes_when_guard_disabled() {
        let mut config = AppConfig::default();
        config.toxicity_guard.enabled = false;
        let mut h = harness(config);
        h.book.set_steady(OrderBookSnapshot::new(
            vec![level(dec!(100.0), dec!(100.0))],
            vec![level(dec!(100.2), dec!(0.1))],
            epoch_ms(),
        ));

        let outcome = h.engine.tick(Instant::now()).await.unwrap();
        assert_eq!(outcome, TickOutcome::Quoted);
    }

    #[tokio::test]
    async fn test_position_at_cap_stops_quoting() {
        let mut h = harness(AppConfig::default());
        h.position.set(PositionSnapshot {
            base_position: dec!(120),
            realized_pnl: Decimal::ZERO,
        });

        let outcome = h.engine.tick(Instant::now()).await.unwrap();

        assert_eq!(outcome, TickOutcome::Skipped(SkipReason::PositionLimit));
        assert_eq!(h.gateway.placed_count(), 0);
    }

    #[tokio::test]
    async fn test_risk_gate_pauses_quoting() {
        let mut config = AppConfig::default();
        config.risk.max_orders_per_minute = 1;
        let mut h = harness(config);

        let t0 = Instant::now();
        assert_eq!(h.engine.tick(t0).await.unwrap(), TickOutcome::Quoted);
        assert_eq!(h.gateway.placed_count(), 2);

        // Two recorded orders exceed the limit of one.
        let outcome = h.engine.tick(t0 + Duration::from_millis(300)).await.unwrap();
        assert_eq!(outcome, TickOutcome::RiskGated);
        assert_eq!(h.gateway.placed_count(), 2);
    }

    #[tokio::test]
    async fn test_stale_order_assumed_filled() {
        let mut h = harness(AppConfig::default());
        let placed_at = epoch_ms() - 31_000;
        h.engine
            .live
            .insert(OrderSide::Buy, live_order(OrderSide::Buy, dec!(100), dec!(0.5), placed_at));

        h.engine.sweep_stale_orders();

        assert_eq!(h.engine.live_orders(), 0);
        assert_eq!(h.engine.position, dec!(0.5));
    }

    #[tokio::test]
    async fn test_stale_sell_reduces_position() {
        let mut h = harness(AppConfig::default());
        let placed_at = epoch_ms() - 31_000;
        h.engine
            .live
            .insert(OrderSide::Sell, live_order(OrderSide::Sell, dec!(100), dec!(0.3), placed_at));

        h.engine.sweep_stale_orders();
        assert_eq!(h.engine.position, dec!(-0.3));
    }

    #[tokio::test]
    async fn test_fresh_order_not_swept() {
        let mut h = harness(AppConfig::default());
        h.engine
            .live
            .insert(OrderSide::Buy, live_order(OrderSide::Buy, dec!(100), dec!(0.5), epoch_ms()));

        h.engine.sweep_stale_orders();
        assert_eq!(h.engine.live_orders(), 1);
        assert!(h.engine.position.is_zero());
    }

    #[tokio::test]
    async fn test_position_refresh_is_rate_limited() {
        let mut h = harness(AppConfig::default());
        h.position.set(PositionSnapshot {
            base_position: dec!(3),
            realized_pnl: Decimal::ZERO,
        });

        let t0 = Instant::now();
        h.engine.refresh_position(t0).await;
        assert_eq!(h.engine.position, dec!(3));

        // Within the refresh interval the poll is skipped.
        h.position.set(PositionSnapshot {
            base_position: dec!(7),
            realized_pnl: Decimal::ZERO,
        });
        h.engine.refresh_position(t0 + Duration::from_secs(2)).await;
        assert_eq!(h.engine.position, dec!(3));

        h.engine.refresh_position(t0 + Duration::from_secs(6)).await;
        assert_eq!(h.engine.position, dec!(7));
    }

    #[tokio::test]
    async fn test_position_refresh_failure_keeps_last_value() {
        let mut h = harness(AppConfig::default());
        h.position.set(PositionSnapshot {
            base_position: dec!(2),
            realized_pnl: Decimal::ZERO,
        });

        let t0 = Instant::now();
        h.engine.refresh_position(t0).await;
        assert_eq!(h.engine.position, dec!(2));

        h.position.set_fail(true);
        h.engine.refresh_position(t0 + Duration::from_secs(6)).await;
        assert_eq!(h.engine.position, dec!(2));
    }

    #[tokio::test]
    async fn test_realized_loss_feeds_governor() {
        let mut config = AppConfig::default();
        config.risk.max_loss_per_minute = dec!(50);
        let mut h = harness(config);

        let t0 = Instant::now();
        h.position.set(PositionSnapshot {
            base_position: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
        });
        h.engine.refresh_position(t0).await;

        // Loss beyond the window limit between two polls.
        h.position.set(PositionSnapshot {
            base_position: Decimal::ZERO,
            realized_pnl: dec!(-80),
        });
        h.engine.refresh_position(t0 + Duration::from_secs(6)).await;

        let outcome = h.engine.tick(t0 + Duration::from_secs(7)).await.unwrap();
        assert_eq!(outcome, TickOutcome::RiskGated);
    }

    #[tokio::test]
    async fn test_cancel_replace_holds_inside_interval() {
        let mut h = harness(AppConfig::default());

        let t0 = Instant::now();
        h.engine.tick(t0).await.unwrap();
        assert_eq!(h.gateway.placed_count(), 2);

        // Book moves, but the interval has not elapsed.
        h.book.set_steady(OrderBookSnapshot::new(
            vec![level(dec!(101.0), dec!(2.0))],
            vec![level(dec!(101.2), dec!(3.0))],
            epoch_ms(),
        ));
        h.engine.tick(t0 + Duration::from_millis(250)).await.unwrap();

        assert_eq!(h.gateway.placed_count(), 2);
        assert_eq!(h.gateway.cancelled_count(), 0);
    }

    #[tokio::test]
    async fn test_small_move_keeps_orders() {
        let mut h = harness(AppConfig::default());
        h.engine.tick(Instant::now()).await.unwrap();
        let first = h.engine.live.get(&OrderSide::Buy).unwrap().id.clone();

        // Force the next pass to run by rewinding the interval clock.
        h.engine.last_cancel_replace_ms = 0;
        h.engine.tick(Instant::now()).await.unwrap();

        assert_eq!(h.gateway.cancelled_count(), 0);
        assert_eq!(h.engine.live.get(&OrderSide::Buy).unwrap().id, first);
    }

    #[tokio::test]
    async fn test_large_move_replaces_orders() {
        let mut h = harness(AppConfig::default());
        h.engine.tick(Instant::now()).await.unwrap();
        assert_eq!(h.gateway.placed_count(), 2);

        h.book.set_steady(OrderBookSnapshot::new(
            vec![level(dec!(105.0), dec!(2.0)), level(dec!(104.9), dec!(1.0))],
            vec![level(dec!(105.2), dec!(3.0)), level(dec!(105.3), dec!(1.0))],
            epoch_ms(),
        ));
        h.engine.last_cancel_replace_ms = 0;
        h.engine.tick(Instant::now()).await.unwrap();

        assert_eq!(h.gateway.cancelled_count(), 2);
        assert_eq!(h.gateway.placed_count(), 4);
        assert_eq!(h.engine.live_orders(), 2);
    }

    #[tokio::test]
    async fn test_rejected_side_stays_unquoted() {
        let mut h = harness(AppConfig::default());
        h.gateway.push_response(Err(ExecError::Rejected {
            status: 422,
            body: "post-only would cross".to_string(),
        }));

        let outcome = h.engine.tick(Instant::now()).await.unwrap();

        // The rejected side is skipped, the other side still quotes.
        assert_eq!(outcome, TickOutcome::Quoted);
        assert_eq!(h.engine.live_orders(), 1);
    }

    #[tokio::test]
    async fn test_transport_error_fails_tick() {
        let mut h = harness(AppConfig::default());
        h.gateway
            .push_response(Err(ExecError::Transport("connection reset".to_string())));

        let result = h.engine.tick(Instant::now()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_degraded_placement_tracked_and_dropped_locally() {
        let mut h = harness(AppConfig::default());
        h.gateway
            .push_response(Ok(Placement::Degraded("mock-000123".to_string())));

        h.engine.tick(Instant::now()).await.unwrap();
        assert_eq!(h.engine.live_orders(), 2);

        // Shutdown must not try to cancel the synthetic id.
        h.engine.shutdown().await;
        assert_eq!(h.engine.live_orders(), 0);
        assert_eq!(h.gateway.cancelled_count(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_drains_all_orders() {
        let mut h = harness(AppConfig::default());
        h.engine.tick(Instant::now()).await.unwrap();
        assert_eq!(h.engine.live_orders(), 2);

        h.engine.shutdown().await;

        assert_eq!(h.engine.live_orders(), 0);
        assert_eq!(h.gateway.cancelled_count(), 2);

        // Second drain is a no-op.
        h.engine.shutdown().await;
        assert_eq!(h.gateway.cancelled_count(), 2);
    }

    #[tokio::test]
    async fn test_shutdown_without_cancel_clears_table() {
        let mut config = AppConfig::default();
        config.shutdown.cancel_on_shutdown = false;
        let mut h = harness(config);
        h.engine.tick(Instant::now()).await.unwrap();

        h.engine.shutdown().await;

        assert_eq!(h.engine.live_orders(), 0);
        assert_eq!(h.gateway.cancelled_count(), 0);
    }

    #[tokio::test]
    async fn test_run_exits_on_pre_cancelled_token() {
        let mut h = harness(AppConfig::default());
        let token = CancellationToken::new();
        token.cancel();

        h.engine.run(token).await;
        assert_eq!(h.engine.live_orders(), 0);
    }
}
