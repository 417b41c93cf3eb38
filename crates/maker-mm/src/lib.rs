//! Quoting strategy components.
//!
//! Pure per-tick signal math, no IO:
//! - Order book imbalance pricing (microprice, skew, confidence)
//! - Dynamic spread control with history smoothing
//! - Inventory skew and size laddering
//! - Rolling mid-price volatility estimate

pub mod config;
pub mod inventory;
pub mod pricer;
pub mod spread;
pub mod volatility;

pub use config::{InventoryConfig, ObiConfig, SpreadConfig};
pub use inventory::InventoryController;
pub use pricer::{ImbalancePricer, ObiSignal};
pub use spread::SpreadController;
pub use volatility::VolatilityTracker;
