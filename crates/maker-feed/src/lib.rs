//! Market data feed and ledger read client.
//!
//! The feed hands the engine an order book snapshot every tick without
//! ever failing: fresh data when the fetch works, a cached snapshot
//! while it is young enough, and a minimal synthetic book past that.
//! All reads route through the endpoint registry for failover.

pub mod cache;
pub mod error;
pub mod http;
pub mod ledger;
pub mod source;

pub use cache::{FeedConfig, PriceFeed};
pub use error::{FeedError, FeedResult};
pub use http::HttpBookSource;
pub use ledger::LedgerClient;
pub use source::{
    BookSource, DynBookSource, DynPositionSource, DynSlotSource, MockBookSource,
    MockPositionSource, MockSlotSource, PositionSnapshot, PositionSource, SlotSource,
};
