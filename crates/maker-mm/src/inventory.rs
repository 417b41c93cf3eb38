//! Position-driven quote skew and size laddering.

use crate::config::InventoryConfig;
use maker_core::Size;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub struct InventoryController {
    config: InventoryConfig,
}

impl InventoryController {
    pub fn new(config: InventoryConfig) -> Self {
        Self { config }
    }

    /// Skew factor in [-1, 1]. Positive when long of target.
    ///
    /// Saturates to zero once |position| reaches the cap: the position
    /// is no longer tradable in that direction, so no further
    /// directional bias is applied.
    pub fn skew(&self, position: Decimal) -> Decimal {
        if position.abs() >= self.config.max_abs {
            return Decimal::ZERO;
        }
        ((position - self.config.target) / self.config.max_abs).clamp(dec!(-1), dec!(1))
    }

    /// Whether more exposure may be added.
    pub fn tradable(&self, position: Decimal) -> bool {
        position.abs() < self.config.max_abs
    }

    /// Bid and ask sizes for this tick.
    ///
    /// The configured base is damped by volatility and shrunk as skew
    /// grows, then the ladder biases toward the side that reduces
    /// inventory.
    pub fn sizes(&self, base_size: Decimal, volatility: Decimal, skew: Decimal) -> (Size, Size) {
        let vol_mult = (Decimal::ONE / (Decimal::ONE + volatility)).clamp(dec!(0.5), dec!(1.5));
        let base = base_size * vol_mult;

        let mult = Decimal::ONE - dec!(0.5) * skew.abs();
        let mut bid = (base * mult).max(Decimal::ZERO);
        let mut ask = (base * mult).max(Decimal::ZERO);

        if skew > dec!(0.3) {
            ask *= dec!(1.5);
            bid *= dec!(0.5);
        } else if skew < dec!(-0.3) {
            bid *= dec!(1.5);
            ask *= dec!(0.5);
        } else if skew > dec!(0.1) {
            ask *= dec!(1.2);
        } else if skew < dec!(-0.1) {
            bid *= dec!(1.2);
        }

        (Size::new(bid), Size::new(ask))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> InventoryController {
        InventoryController::new(InventoryConfig::default())
    }

    #[test]
    fn test_flat_position_no_skew() {
        assert_eq!(controller().skew(Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_skew_linear_in_position() {
        let ctrl = controller();
        assert_eq!(ctrl.skew(dec!(60)), dec!(0.5));
        assert_eq!(ctrl.skew(dec!(-30)), dec!(-0.25));
    }

    #[test]
    fn test_skew_saturates_to_zero_at_cap() {
        let ctrl = controller();
        assert_eq!(ctrl.skew(dec!(120)), Decimal::ZERO);
        assert_eq!(ctrl.skew(dec!(-150)), Decimal::ZERO);
    }

    #[test]
    fn test_target_shifts_neutral_point() {
        let ctrl = InventoryController::new(InventoryConfig {
            target: dec!(24),
            max_abs: dec!(120),
        });
        assert_eq!(ctrl.skew(dec!(24)), Decimal::ZERO);
        assert_eq!(ctrl.skew(dec!(84)), dec!(0.5));
    }

    #[test]
    fn test_tradable_boundary() {
        let ctrl = controller();
        assert!(ctrl.tradable(dec!(119.99)));
        assert!(!ctrl.tradable(dec!(120)));
        assert!(!ctrl.tradable(dec!(-121)));
    }

    #[test]
    fn test_flat_sizes_symmetric() {
        let (bid, ask) = controller().sizes(dec!(0.05), Decimal::ZERO, Decimal::ZERO);
        assert_eq!(bid, ask);
        assert_eq!(bid.inner(), dec!(0.05));
    }

    #[test]
    fn test_long_skew_favors_ask() {
        let (bid, ask) = controller().sizes(dec!(0.05), Decimal::ZERO, dec!(0.5));
        assert!(ask.inner() > bid.inner());
        // mult = 0.75, then ask 1.5x / bid 0.5x
        assert_eq!(ask.inner(), dec!(0.05) * dec!(0.75) * dec!(1.5));
        assert_eq!(bid.inner(), dec!(0.05) * dec!(0.75) * dec!(0.5));
    }

    #[test]
    fn test_short_skew_favors_bid() {
        let (bid, ask) = controller().sizes(dec!(0.05), Decimal::ZERO, dec!(-0.5));
        assert!(bid.inner() > ask.inner());
    }

    #[test]
    fn test_mild_skew_bumps_reducing_side_only() {
        let (bid, ask) = controller().sizes(dec!(0.05), Decimal::ZERO, dec!(0.2));
        let damped = dec!(0.05) * dec!(0.9);
        assert_eq!(ask.inner(), damped * dec!(1.2));
        assert_eq!(bid.inner(), damped);
    }

    #[test]
    fn test_volatility_damps_size() {
        let ctrl = controller();
        let (calm_bid, _) = ctrl.sizes(dec!(0.05), Decimal::ZERO, Decimal::ZERO);
        let (rough_bid, _) = ctrl.sizes(dec!(0.05), dec!(1), Decimal::ZERO);
        assert!(rough_bid.inner() < calm_bid.inner());
        // 1/(1+1) = 0.5 sits exactly at the floor.
        assert_eq!(rough_bid.inner(), dec!(0.025));
    }
}
