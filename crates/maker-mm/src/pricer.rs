//! Order book imbalance pricing.
//!
//! Sums resting volume over the top N levels per side and derives a
//! depth-weighted microprice. Heavier bid volume pulls the microprice
//! toward the ask (that side is about to be consumed) and vice versa.

use maker_core::OrderBookSnapshot;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Pricing signal for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObiSignal {
    /// Depth-weighted fair price.
    pub microprice: Decimal,
    /// (bidVol - askVol) / (bidVol + askVol), in [-1, 1].
    pub imbalance: Decimal,
    /// Quote shift factor, half the imbalance.
    pub skew_adjust: Decimal,
    /// Trust score in [0, 1], saturating at the reference volume.
    pub confidence: Decimal,
}

impl ObiSignal {
    /// Zero signal, returned when the book carries no usable volume.
    pub const NONE: Self = Self {
        microprice: Decimal::ZERO,
        imbalance: Decimal::ZERO,
        skew_adjust: Decimal::ZERO,
        confidence: Decimal::ZERO,
    };

    /// Whether the signal carries information.
    pub fn is_live(&self) -> bool {
        self.microprice > Decimal::ZERO
    }
}

/// Computes [`ObiSignal`] from book snapshots.
#[derive(Debug, Clone)]
pub struct ImbalancePricer {
    levels: usize,
}

impl ImbalancePricer {
    pub fn new(levels: usize) -> Self {
        Self { levels }
    }

    /// Compute the signal over the top configured levels.
    ///
    /// Returns [`ObiSignal::NONE`] when either side is missing or total
    /// volume is dust.
    pub fn compute(&self, snapshot: &OrderBookSnapshot) -> ObiSignal {
        let (best_bid, best_ask) = match (snapshot.best_bid(), snapshot.best_ask()) {
            (Some(b), Some(a)) => (b.inner(), a.inner()),
            _ => return ObiSignal::NONE,
        };

        let bid_vol = OrderBookSnapshot::depth(&snapshot.bids, self.levels);
        let ask_vol = OrderBookSnapshot::depth(&snapshot.asks, self.levels);
        let total = bid_vol + ask_vol;
        if total <= dec!(0.000000000001) {
            return ObiSignal::NONE;
        }

        let microprice = (bid_vol * best_ask + ask_vol * best_bid) / total;
        let imbalance = (bid_vol - ask_vol) / total;
        ObiSignal {
            microprice,
            imbalance,
            skew_adjust: dec!(0.5) * imbalance,
            confidence: Decimal::ONE.min(total / Decimal::ONE_HUNDRED),
        }
    }
}
