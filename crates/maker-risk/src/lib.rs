//! Circuit breaker for the quoting loop.
//!
//! Trips on order-rate or realized-loss limits over a sliding minute
//! and pauses quoting for a bounded cooldown. Resumes automatically.

pub mod governor;

pub use governor::{CooldownReason, GovernorConfig, RiskGovernor, Verdict};
