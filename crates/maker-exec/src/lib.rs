//! Order execution gateway for the perp maker engine.
//!
//! - Signed order envelopes over an HTTP submission endpoint
//! - Bounded retry with backoff for transient faults
//! - Optional degraded acknowledgement with synthetic order ids
//! - Concurrent bulk cancel with per-request timeout for shutdown

pub mod config;
pub mod envelope;
pub mod error;
pub mod gateway;
pub mod retry;
pub mod signer;

pub use config::ExecutionConfig;
pub use envelope::{build_envelope, OrderIntent, SignedEnvelope};
pub use error::{ExecError, ExecResult};
pub use gateway::{DynExecutionClient, ExecutionClient, HttpGateway, MockGateway, Placement};
pub use retry::with_retry;
pub use signer::{DynSigner, EnvelopeSigner, KeyError, KeySource, NoopSigner, WalletSigner};
