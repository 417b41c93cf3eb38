//! Core domain types for the perp maker engine.
//!
//! Shared by every other crate in the workspace:
//! - Precision-safe `Price` and `Size` decimals
//! - Order book snapshots with degraded-state classification
//! - Quotes, live orders, and client order identifiers

pub mod book;
pub mod decimal;
pub mod error;
pub mod order;
pub mod types;

pub use book::{BookLevel, BookState, OrderBookSnapshot};
pub use decimal::{Price, Size};
pub use error::{CoreError, Result};
pub use order::{ClientOrderId, LiveOrder, OrderSide, Quote};
pub use types::{epoch_ms, BoxFuture};
