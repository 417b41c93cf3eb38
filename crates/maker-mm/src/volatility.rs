//! Rolling mid-price volatility estimate.
//!
//! Mean absolute one-tick mid return over a bounded window. Reports a
//! small warm-up constant until enough samples exist so the spread and
//! sizing math never sees a zero-history artifact.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::VecDeque;

pub struct VolatilityTracker {
    window: usize,
    min_samples: usize,
    returns: VecDeque<Decimal>,
    last_mid: Option<Decimal>,
}

impl Default for VolatilityTracker {
    fn default() -> Self {
        Self::new(60, 10)
    }
}

impl VolatilityTracker {
    pub fn new(window: usize, min_samples: usize) -> Self {
        Self {
            window,
            min_samples,
            returns: VecDeque::with_capacity(window),
            last_mid: None,
        }
    }

    /// Record this tick's mid. Non-positive mids are ignored.
    pub fn record_mid(&mut self, mid: Decimal) {
        if mid <= Decimal::ZERO {
            return;
        }
        if let Some(prev) = self.last_mid {
            self.returns.push_back(((mid - prev) / prev).abs());
            if self.returns.len() > self.window {
                self.returns.pop_front();
            }
        }
        self.last_mid = Some(mid);
    }

    /// Current estimate, warm-up constant before `min_samples` returns.
    pub fn current(&self) -> Decimal {
        if self.returns.len() < self.min_samples {
            return dec!(0.001);
        }
        self.returns.iter().sum::<Decimal>() / Decimal::from(self.returns.len() as u64)
    }

    pub fn sample_count(&self) -> usize {
        self.returns.len()
    }
}
