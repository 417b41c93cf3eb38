//! Dynamic spread control.
//!
//! The base spread is widened by volatility and inventory skew,
//! discounted by signal confidence, and widened hard when the book is
//! one-sided. The raw value is blended 70/30 with an EMA of recent
//! history to damp tick-to-tick jitter, then clamped.

use crate::config::SpreadConfig;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::VecDeque;
use tracing::debug;

const MAX_HISTORY: usize = 100;
/// Raw values required before smoothing kicks in. The EMA walks the
/// window minus the newest entry.
const EMA_WINDOW: usize = 10;

pub struct SpreadController {
    config: SpreadConfig,
    history: VecDeque<Decimal>,
}

impl SpreadController {
    pub fn new(config: SpreadConfig) -> Self {
        Self {
            config,
            history: VecDeque::with_capacity(MAX_HISTORY),
        }
    }

    /// Compute this tick's spread in basis points.
    pub fn compute_bps(
        &mut self,
        volatility: Decimal,
        inventory_skew: Decimal,
        confidence: Decimal,
        imbalance: Decimal,
    ) -> Decimal {
        let mut s = self.config.base;
        s *= Decimal::ONE + Decimal::TWO.min(volatility * dec!(0.5));
        s *= Decimal::ONE + inventory_skew.abs() * dec!(0.5);
        s *= Decimal::ONE - confidence * dec!(0.2);
        if imbalance.abs() > dec!(0.7) {
            debug!(imbalance = %imbalance, "One-sided book, widening spread");
            s *= dec!(1.5);
        }

        self.history.push_back(s);
        if self.history.len() > MAX_HISTORY {
            self.history.pop_front();
        }
        if self.history.len() >= EMA_WINDOW {
            s = dec!(0.7) * s + dec!(0.3) * self.recent_ema();
        }

        s.clamp(self.config.min, self.config.max)
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// EMA seeded from the newest raw value, folding in the nine
    /// entries before it, newest first.
    fn recent_ema(&self) -> Decimal {
        let n = self.history.len();
        let weight = dec!(0.2);
        let mut ema = self.history[n - 1];
        for i in (n - EMA_WINDOW..n - 1).rev() {
            ema = weight * self.history[i] + (Decimal::ONE - weight) * ema;
        }
        ema
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> SpreadController {
        SpreadController::new(SpreadConfig::default())
    }

    #[test]
    fn test_quiet_book_stays_at_base() {
        let mut ctrl = controller();
        let s = ctrl.compute_bps(Decimal::ZERO, Decimal::ZERO, Decimal::ZERO, Decimal::ZERO);
        assert_eq!(s, dec!(8));
    }

    #[test]
    fn test_clamped_to_max_under_extreme_volatility() {
        let mut ctrl = controller();
        let s = ctrl.compute_bps(dec!(100), dec!(1), Decimal::ZERO, Decimal::ZERO);
        assert_eq!(s, dec!(25));
    }

    #[test]
    fn test_clamped_to_min_under_full_confidence() {
        let mut ctrl = SpreadController::new(SpreadConfig {
            base: dec!(5),
            min: dec!(4.5),
            max: dec!(25),
        });
        // 5 * 0.8 = 4.0, below the floor.
        let s = ctrl.compute_bps(Decimal::ZERO, Decimal::ZERO, Decimal::ONE, Decimal::ZERO);
        assert_eq!(s, dec!(4.5));
    }

    #[test]
    fn test_one_sided_book_widens() {
        let mut quiet = controller();
        let mut toxic = controller();
        let base = quiet.compute_bps(Decimal::ZERO, Decimal::ZERO, Decimal::ZERO, Decimal::ZERO);
        let widened = toxic.compute_bps(Decimal::ZERO, Decimal::ZERO, Decimal::ZERO, dec!(0.8));
        assert_eq!(widened, base * dec!(1.5));
    }

    #[test]
    fn test_confidence_discount_narrows() {
        let mut trusted = controller();
        let mut blind = controller();
        let narrow = trusted.compute_bps(Decimal::ZERO, Decimal::ZERO, Decimal::ONE, Decimal::ZERO);
        let wide = blind.compute_bps(Decimal::ZERO, Decimal::ZERO, Decimal::ZERO, Decimal::ZERO);
        assert!(narrow < wide);
    }

    #[test]
    fn test_smoothing_is_identity_on_constant_input() {
        let mut ctrl = controller();
        let mut last = Decimal::ZERO;
        for _ in 0..30 {
            last = ctrl.compute_bps(dec!(0.5), dec!(0.2), dec!(0.3), Decimal::ZERO);
        }
        // Constant raw values make the EMA equal the raw value, so the
        // blend changes nothing.
        let again = ctrl.compute_bps(dec!(0.5), dec!(0.2), dec!(0.3), Decimal::ZERO);
        assert_eq!(last, again);
    }

    #[test]
    fn test_history_bounded() {
        let mut ctrl = controller();
        for _ in 0..150 {
            ctrl.compute_bps(dec!(0.1), Decimal::ZERO, Decimal::ZERO, Decimal::ZERO);
        }
        assert_eq!(ctrl.history_len(), 100);
    }

    #[test]
    fn test_smoothing_damps_a_spike() {
        let mut ctrl = SpreadController::new(SpreadConfig {
            base: dec!(8),
            min: dec!(1),
            max: dec!(500),
        });
        for _ in 0..20 {
            ctrl.compute_bps(Decimal::ZERO, Decimal::ZERO, Decimal::ZERO, Decimal::ZERO);
        }
        // A sudden volatility spike lands below its unsmoothed value.
        let spiked = ctrl.compute_bps(dec!(4), Decimal::ZERO, Decimal::ZERO, Decimal::ZERO);
        let raw = dec!(8) * (Decimal::ONE + Decimal::TWO);
        assert!(spiked < raw);
        assert!(spiked > dec!(8));
    }
}
