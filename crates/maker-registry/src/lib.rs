//! Read-endpoint health registry.
//!
//! Tracks a fixed set of ledger read endpoints with per-endpoint health
//! status, consecutive-failure counting, rate-limit parking, and a
//! sliding one-second request budget. Selection is sticky: the engine
//! keeps using the same endpoint until it becomes unavailable, then
//! fails over to the highest-priority healthy alternative.

pub mod endpoint;
pub mod error;
pub mod registry;

pub use endpoint::{EndpointConfig, EndpointStatus, FailureKind, SelectedEndpoint};
pub use error::{RegistryError, RegistryResult};
pub use registry::EndpointRegistry;
