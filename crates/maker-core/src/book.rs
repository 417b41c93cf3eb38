//! Order book snapshot types.
//!
//! A snapshot is a point-in-time two-sided ladder, best price first on
//! each side. Degraded books (missing side, crossed, non-positive mid)
//! are classified rather than rejected so the engine can skip a tick
//! with a precise reason.

use crate::decimal::{Price, Size};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One price level of the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Price,
    pub size: Size,
}

impl BookLevel {
    pub fn new(price: Price, size: Size) -> Self {
        Self { price, size }
    }
}

/// Book state classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookState {
    /// Both sides present, bid below ask, positive mid.
    Valid,
    /// One or both sides have no levels.
    Empty,
    /// Best bid at or above best ask.
    Crossed,
    /// Mid price is zero or negative.
    NonPositive,
}

impl BookState {
    pub fn is_quotable(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

impl std::fmt::Display for BookState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Valid => write!(f, "VALID"),
            Self::Empty => write!(f, "EMPTY"),
            Self::Crossed => write!(f, "CROSSED"),
            Self::NonPositive => write!(f, "NON_POSITIVE"),
        }
    }
}

/// Point-in-time order book snapshot, best price first per side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
    /// Wall-clock capture time in epoch milliseconds.
    pub captured_at_ms: i64,
}

impl OrderBookSnapshot {
    pub fn new(bids: Vec<BookLevel>, asks: Vec<BookLevel>, captured_at_ms: i64) -> Self {
        Self {
            bids,
            asks,
            captured_at_ms,
        }
    }

    /// Snapshot with no levels on either side.
    pub fn empty(captured_at_ms: i64) -> Self {
        Self::new(Vec::new(), Vec::new(), captured_at_ms)
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.bids.first().map(|l| l.price)
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first().map(|l| l.price)
    }

    /// Mid price: (best bid + best ask) / 2.
    ///
    /// Returns None when either side is missing.
    pub fn mid(&self) -> Option<Price> {
        let bid = self.best_bid()?;
        let ask = self.best_ask()?;
        Some(Price::new((bid.inner() + ask.inner()) / Decimal::TWO))
    }

    /// Classify the snapshot for quoting decisions.
    pub fn state(&self) -> BookState {
        let (bid, ask) = match (self.best_bid(), self.best_ask()) {
            (Some(b), Some(a)) => (b, a),
            _ => return BookState::Empty,
        };
        if bid >= ask {
            return BookState::Crossed;
        }
        // Both sides exist and are uncrossed here, so mid is defined.
        let mid = (bid.inner() + ask.inner()) / Decimal::TWO;
        if mid <= Decimal::ZERO {
            return BookState::NonPositive;
        }
        BookState::Valid
    }

    /// Sum of level sizes over the top `levels` entries of one side.
    pub fn depth(side: &[BookLevel], levels: usize) -> Decimal {
        side.iter()
            .take(levels)
            .map(|l| l.size.inner())
            .sum::<Decimal>()
    }
}
