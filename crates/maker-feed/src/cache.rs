//! TTL-cached order book feed with staleness fallback.
//!
//! `get_snapshot` never fails. Resolution order:
//! 1. cached snapshot younger than the TTL
//! 2. a fresh fetch through the registry
//! 3. the cached snapshot while younger than the staleness bound
//! 4. a one-level synthetic book around the last known mid

use crate::error::FeedError;
use crate::source::DynBookSource;
use maker_core::{epoch_ms, BookLevel, OrderBookSnapshot, Price, Size};
use maker_telemetry::DynMetricsSink;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Feed cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Cache freshness bound. Within it no fetch is issued.
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,
    /// Maximum cache age served when a fetch fails.
    #[serde(default = "default_max_stale_ms")]
    pub max_stale_ms: u64,
}

fn default_ttl_ms() -> u64 {
    250
}

fn default_max_stale_ms() -> u64 {
    2_000
}

impl FeedConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    pub fn max_stale(&self) -> Duration {
        Duration::from_millis(self.max_stale_ms)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            ttl_ms: default_ttl_ms(),
            max_stale_ms: default_max_stale_ms(),
        }
    }
}

struct CachedBook {
    snapshot: OrderBookSnapshot,
    fetched_at: Instant,
}

/// Infallible snapshot provider for the tick loop.
pub struct PriceFeed {
    source: DynBookSource,
    config: FeedConfig,
    metrics: DynMetricsSink,
    cache: Mutex<Option<CachedBook>>,
    last_mid: Mutex<Option<Price>>,
}

impl PriceFeed {
    pub fn new(source: DynBookSource, config: FeedConfig, metrics: DynMetricsSink) -> Self {
        Self {
            source,
            config,
            metrics,
            cache: Mutex::new(None),
            last_mid: Mutex::new(None),
        }
    }

    pub async fn get_snapshot(&self) -> OrderBookSnapshot {
        self.get_snapshot_at(Instant::now()).await
    }

    /// Snapshot resolution with an injected clock, for tests.
    pub async fn get_snapshot_at(&self, now: Instant) -> OrderBookSnapshot {
        if let Some(snapshot) = self.cached_within(now, self.config.ttl()) {
            return snapshot;
        }

        match self.source.fetch().await {
            Ok(snapshot) => {
                if let Some(mid) = snapshot.mid() {
                    *self.last_mid.lock() = Some(mid);
                }
                *self.cache.lock() = Some(CachedBook {
                    snapshot: snapshot.clone(),
                    fetched_at: now,
                });
                snapshot
            }
            Err(err) => {
                self.metrics.inc_error("orderbook");
                if let Some(snapshot) = self.cached_within(now, self.config.max_stale()) {
                    info!(error = %err, "book fetch failed, serving cached snapshot");
                    return snapshot;
                }
                warn!(error = %err, "book fetch failed beyond staleness bound, synthesizing book");
                self.synthetic_book()
            }
        }
    }

    /// Mid price of the last successfully fetched book.
    pub fn last_mid(&self) -> Option<Price> {
        *self.last_mid.lock()
    }

    fn cached_within(&self, now: Instant, bound: Duration) -> Option<OrderBookSnapshot> {
        let cache = self.cache.lock();
        let cached = cache.as_ref()?;
        if now.duration_since(cached.fetched_at) <= bound {
            Some(cached.snapshot.clone())
        } else {
            None
        }
    }

    /// One conservative level per side around the last known mid, or an
    /// empty book when no mid has ever been observed (the engine skips
    /// empty books).
    fn synthetic_book(&self) -> OrderBookSnapshot {
        let now_ms = epoch_ms();
        match *self.last_mid.lock() {
            Some(mid) => {
                let offset = Decimal::new(1, 1);
                let size = Size::new(Decimal::new(5, 1));
                OrderBookSnapshot::new(
                    vec![BookLevel::new(Price::new(mid.inner() - offset), size)],
                    vec![BookLevel::new(Price::new(mid.inner() + offset), size)],
                    now_ms,
                )
            }
            None => OrderBookSnapshot::empty(now_ms),
        }
    }
}
