//! Order-related types: side, quotes, live orders, client identifiers.

use crate::decimal::{Price, Size};
use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Order side: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// Returns 1 for buy, -1 for sell (for position calculations).
    pub fn sign(&self) -> i8 {
        match self {
            Self::Buy => 1,
            Self::Sell => -1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A two-sided quote: the engine's desired resting orders for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub bid_px: Price,
    pub bid_sz: Size,
    pub ask_px: Price,
    pub ask_sz: Size,
}

impl Quote {
    pub fn new(bid_px: Price, bid_sz: Size, ask_px: Price, ask_sz: Size) -> Self {
        Self {
            bid_px,
            bid_sz,
            ask_px,
            ask_sz,
        }
    }

    /// Price for one side.
    pub fn price(&self, side: OrderSide) -> Price {
        match side {
            OrderSide::Buy => self.bid_px,
            OrderSide::Sell => self.ask_px,
        }
    }

    /// Size for one side.
    pub fn size(&self, side: OrderSide) -> Size {
        match side {
            OrderSide::Buy => self.bid_sz,
            OrderSide::Sell => self.ask_sz,
        }
    }

    /// Check quote sanity: positive prices, bid strictly below ask,
    /// non-negative sizes.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !self.bid_px.is_positive() || !self.ask_px.is_positive() {
            return Err(CoreError::InvalidQuote(format!(
                "non-positive price: bid={} ask={}",
                self.bid_px, self.ask_px
            )));
        }
        if self.bid_px >= self.ask_px {
            return Err(CoreError::InvalidQuote(format!(
                "bid {} not below ask {}",
                self.bid_px, self.ask_px
            )));
        }
        if self.bid_sz.inner().is_sign_negative() || self.ask_sz.inner().is_sign_negative() {
            return Err(CoreError::InvalidQuote(format!(
                "negative size: bid={} ask={}",
                self.bid_sz, self.ask_sz
            )));
        }
        Ok(())
    }
}

/// An order the engine believes is resting on the exchange.
///
/// Owned exclusively by the quoting engine, at most one per side.
/// `degraded` marks an order whose submission was never acknowledged;
/// there is nothing to cancel remotely for those.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveOrder {
    /// Exchange-assigned (or synthetic) order id.
    pub id: String,
    pub client_id: ClientOrderId,
    pub side: OrderSide,
    pub price: Price,
    pub size: Size,
    /// Placement time in epoch milliseconds.
    pub placed_at_ms: i64,
    pub degraded: bool,
}

impl LiveOrder {
    /// Age of this order relative to `now_ms`.
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms - self.placed_at_ms
    }
}

/// Client order ID for idempotency.
///
/// Every submission carries a unique cloid so a retried request cannot
/// be double-booked by the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientOrderId(String);

impl ClientOrderId {
    /// Create a new unique client order ID.
    ///
    /// Format: `mkr_{timestamp_ms}_{uuid_short}`
    pub fn new() -> Self {
        let ts = chrono::Utc::now().timestamp_millis();
        let uuid_short = &Uuid::new_v4().to_string()[..8];
        Self(format!("mkr_{ts}_{uuid_short}"))
    }

    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ClientOrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ClientOrderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_side_opposite_and_sign() {
        assert_eq!(OrderSide::Buy.opposite(), OrderSide::Sell);
        assert_eq!(OrderSide::Sell.opposite(), OrderSide::Buy);
        assert_eq!(OrderSide::Buy.sign(), 1);
        assert_eq!(OrderSide::Sell.sign(), -1);
    }

    #[test]
    fn test_quote_validate_ok() {
        let q = Quote::new(
            Price::new(dec!(99.9)),
            Size::new(dec!(0.05)),
            Price::new(dec!(100.1)),
            Size::new(dec!(0.05)),
        );
        assert!(q.validate().is_ok());
    }

    #[test]
    fn test_quote_validate_rejects_inverted() {
        let q = Quote::new(
            Price::new(dec!(100.1)),
            Size::new(dec!(0.05)),
            Price::new(dec!(99.9)),
            Size::new(dec!(0.05)),
        );
        assert!(q.validate().is_err());
    }

    #[test]
    fn test_quote_validate_rejects_non_positive_price() {
        let q = Quote::new(
            Price::ZERO,
            Size::new(dec!(0.05)),
            Price::new(dec!(100.1)),
            Size::new(dec!(0.05)),
        );
        assert!(q.validate().is_err());
    }

    #[test]
    fn test_quote_side_accessors() {
        let q = Quote::new(
            Price::new(dec!(99.9)),
            Size::new(dec!(0.04)),
            Price::new(dec!(100.1)),
            Size::new(dec!(0.06)),
        );
        assert_eq!(q.price(OrderSide::Buy).inner(), dec!(99.9));
        assert_eq!(q.size(OrderSide::Sell).inner(), dec!(0.06));
    }

    #[test]
    fn test_client_order_id_unique_and_formatted() {
        let id1 = ClientOrderId::new();
        let id2 = ClientOrderId::new();
        assert_ne!(id1, id2);
        assert!(id1.as_str().starts_with("mkr_"));
    }

    #[test]
    fn test_live_order_age() {
        let order = LiveOrder {
            id: "abc".to_string(),
            client_id: ClientOrderId::new(),
            side: OrderSide::Buy,
            price: Price::new(dec!(100)),
            size: Size::new(dec!(0.05)),
            placed_at_ms: 1_000,
            degraded: false,
        };
        assert_eq!(order.age_ms(31_500), 30_500);
    }
}
