//! Strategy configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Spread controller configuration. All values are basis points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpreadConfig {
    /// Base spread before volatility and inventory adjustments.
    #[serde(default = "default_spread_base")]
    pub base: Decimal,

    /// Lower clamp on the computed spread.
    #[serde(default = "default_spread_min")]
    pub min: Decimal,

    /// Upper clamp on the computed spread.
    #[serde(default = "default_spread_max")]
    pub max: Decimal,
}

impl Default for SpreadConfig {
    fn default() -> Self {
        Self {
            base: default_spread_base(),
            min: default_spread_min(),
            max: default_spread_max(),
        }
    }
}

/// Order book imbalance configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObiConfig {
    /// Number of book levels per side summed into the signal.
    #[serde(default = "default_obi_levels")]
    pub levels: usize,

    /// Shift quotes toward the microprice when the signal is live.
    #[serde(default = "default_true")]
    pub use_microprice: bool,
}

impl Default for ObiConfig {
    fn default() -> Self {
        Self {
            levels: default_obi_levels(),
            use_microprice: true,
        }
    }
}

/// Inventory controller configuration. Values are base units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryConfig {
    /// Position the skew steers toward.
    #[serde(default)]
    pub target: Decimal,

    /// Hard cap on absolute position. Quoting in the growing direction
    /// stops at this level.
    #[serde(default = "default_max_abs")]
    pub max_abs: Decimal,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            target: Decimal::ZERO,
            max_abs: default_max_abs(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_spread_base() -> Decimal {
    Decimal::new(8, 0) // 8 bps
}
fn default_spread_min() -> Decimal {
    Decimal::new(4, 0) // 4 bps
}
fn default_spread_max() -> Decimal {
    Decimal::new(25, 0) // 25 bps
}
fn default_obi_levels() -> usize {
    10
}
fn default_max_abs() -> Decimal {
    Decimal::new(120, 0) // 120 base units
}
