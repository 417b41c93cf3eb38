//! Sliding-window risk limits.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Sliding window length for both limits.
const WINDOW: Duration = Duration::from_secs(60);
/// Pause after an order-rate trip.
const ORDER_RATE_COOLDOWN: Duration = Duration::from_secs(30);
/// Pause after a loss trip.
const LOSS_COOLDOWN: Duration = Duration::from_secs(60);

/// Risk limit configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernorConfig {
    /// Orders allowed per sliding minute before the breaker trips.
    #[serde(default = "default_max_orders_per_minute")]
    pub max_orders_per_minute: usize,

    /// Realized loss per sliding minute (a positive number) before the
    /// breaker trips.
    #[serde(default = "default_max_loss_per_minute")]
    pub max_loss_per_minute: Decimal,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            max_orders_per_minute: default_max_orders_per_minute(),
            max_loss_per_minute: default_max_loss_per_minute(),
        }
    }
}

fn default_max_orders_per_minute() -> usize {
    120
}
fn default_max_loss_per_minute() -> Decimal {
    Decimal::new(100, 0) // $100
}

/// Why quoting is paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownReason {
    OrderRate,
    Loss,
}

impl std::fmt::Display for CooldownReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OrderRate => write!(f, "order_rate"),
            Self::Loss => write!(f, "loss"),
        }
    }
}

/// Gate decision for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Cooldown {
        until: Instant,
        reason: CooldownReason,
    },
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// Tracks recent order placements and realized pnl, trips a cooldown
/// when a limit is crossed, and resumes once it expires.
pub struct RiskGovernor {
    config: GovernorConfig,
    orders: VecDeque<Instant>,
    pnl: VecDeque<(Instant, Decimal)>,
    cooldown: Option<(Instant, CooldownReason)>,
}

impl RiskGovernor {
    pub fn new(config: GovernorConfig) -> Self {
        Self {
            config,
            orders: VecDeque::new(),
            pnl: VecDeque::new(),
            cooldown: None,
        }
    }

    /// Record one order placement.
    pub fn record_order(&mut self, now: Instant) {
        self.orders.push_back(now);
    }

    /// Record a realized pnl delta. Losses are negative.
    pub fn record_pnl(&mut self, delta: Decimal, now: Instant) {
        self.pnl.push_back((now, delta));
    }

    /// Gate one tick.
    ///
    /// An active cooldown short-circuits. Otherwise both windows are
    /// pruned and the limits evaluated; order rate is checked first.
    pub fn check(&mut self, now: Instant) -> Verdict {
        if let Some((until, reason)) = self.cooldown {
            if now < until {
                return Verdict::Cooldown { until, reason };
            }
            self.cooldown = None;
            info!(%reason, "Risk cooldown expired, resuming");
        }

        while let Some(t) = self.orders.front() {
            if now.duration_since(*t) >= WINDOW {
                self.orders.pop_front();
            } else {
                break;
            }
        }
        while let Some((t, _)) = self.pnl.front() {
            if now.duration_since(*t) >= WINDOW {
                self.pnl.pop_front();
            } else {
                break;
            }
        }

        if self.orders.len() > self.config.max_orders_per_minute {
            warn!(
                orders = self.orders.len(),
                limit = self.config.max_orders_per_minute,
                "Circuit breaker: order rate limit hit"
            );
            return self.trip(now, ORDER_RATE_COOLDOWN, CooldownReason::OrderRate);
        }

        if !self.pnl.is_empty() {
            let recent: Decimal = self.pnl.iter().map(|(_, p)| *p).sum();
            if recent < -self.config.max_loss_per_minute {
                warn!(pnl = %recent, "Circuit breaker: loss limit hit");
                return self.trip(now, LOSS_COOLDOWN, CooldownReason::Loss);
            }
        }

        Verdict::Pass
    }

    fn trip(&mut self, now: Instant, pause: Duration, reason: CooldownReason) -> Verdict {
        let until = now + pause;
        self.cooldown = Some((until, reason));
        Verdict::Cooldown { until, reason }
    }
}
