//! Capability traits for ledger reads, with recording test doubles.
//!
//! The traits are object safe (boxed futures) so the engine and the
//! execution gateway can hold `Arc<dyn _>` and tests can inject
//! deterministic implementations.

use crate::error::FeedError;
use maker_core::{BoxFuture, OrderBookSnapshot};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Source of order book snapshots.
pub trait BookSource: Send + Sync {
    fn fetch(&self) -> BoxFuture<'_, Result<OrderBookSnapshot, FeedError>>;
}

pub type DynBookSource = Arc<dyn BookSource>;

/// Source of the current ledger slot.
pub trait SlotSource: Send + Sync {
    fn fetch_slot(&self) -> BoxFuture<'_, Result<u64, FeedError>>;
}

pub type DynSlotSource = Arc<dyn SlotSource>;

/// Position as reported by the ledger, with realized PnL so the risk
/// governor can watch the loss window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PositionSnapshot {
    pub base_position: Decimal,
    pub realized_pnl: Decimal,
}

/// Source of the account's position on the quoted market.
pub trait PositionSource: Send + Sync {
    fn fetch_position(&self) -> BoxFuture<'_, Result<PositionSnapshot, FeedError>>;
}

pub type DynPositionSource = Arc<dyn PositionSource>;

/// Scriptable book source for tests and the self-test.
///
/// Scripted responses are served first, in order; once the script is
/// exhausted the steady snapshot (if any) repeats.
#[derive(Default)]
pub struct MockBookSource {
    script: Mutex<VecDeque<Result<OrderBookSnapshot, FeedError>>>,
    steady: Mutex<Option<OrderBookSnapshot>>,
    fetch_count: AtomicUsize,
}

impl MockBookSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source that always serves the same snapshot.
    pub fn fixed(snapshot: OrderBookSnapshot) -> Self {
        let source = Self::default();
        *source.steady.lock() = Some(snapshot);
        source
    }

    pub fn push(&self, response: Result<OrderBookSnapshot, FeedError>) {
        self.script.lock().push_back(response);
    }

    pub fn set_steady(&self, snapshot: OrderBookSnapshot) {
        *self.steady.lock() = Some(snapshot);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::Relaxed)
    }
}

impl BookSource for MockBookSource {
    fn fetch(&self) -> BoxFuture<'_, Result<OrderBookSnapshot, FeedError>> {
        Box::pin(async move {
            self.fetch_count.fetch_add(1, Ordering::Relaxed);
            if let Some(scripted) = self.script.lock().pop_front() {
                return scripted;
            }
            match self.steady.lock().clone() {
                Some(snapshot) => Ok(snapshot),
                None => Err(FeedError::Http("mock book source exhausted".to_string())),
            }
        })
    }
}

/// Settable position source for tests and the self-test.
pub struct MockPositionSource {
    snapshot: Mutex<PositionSnapshot>,
    fail: AtomicBool,
}

impl MockPositionSource {
    pub fn new(initial: PositionSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(initial),
            fail: AtomicBool::new(false),
        }
    }

    pub fn flat() -> Self {
        Self::new(PositionSnapshot::default())
    }

    pub fn set(&self, snapshot: PositionSnapshot) {
        *self.snapshot.lock() = snapshot;
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::Relaxed);
    }
}

impl PositionSource for MockPositionSource {
    fn fetch_position(&self) -> BoxFuture<'_, Result<PositionSnapshot, FeedError>> {
        Box::pin(async move {
            if self.fail.load(Ordering::Relaxed) {
                return Err(FeedError::Http("injected position failure".to_string()));
            }
            Ok(*self.snapshot.lock())
        })
    }
}

/// Fixed slot source for tests and the self-test.
pub struct MockSlotSource {
    slot: u64,
    fail: AtomicBool,
}

impl MockSlotSource {
    pub fn new(slot: u64) -> Self {
        Self {
            slot,
            fail: AtomicBool::new(false),
        }
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::Relaxed);
    }
}

impl SlotSource for MockSlotSource {
    fn fetch_slot(&self) -> BoxFuture<'_, Result<u64, FeedError>> {
        Box::pin(async move {
            if self.fail.load(Ordering::Relaxed) {
                return Err(FeedError::Http("injected slot failure".to_string()));
            }
            Ok(self.slot)
        })
    }
}
