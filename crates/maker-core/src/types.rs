//! Small shared helpers used across the workspace.

use std::future::Future;
use std::pin::Pin;

/// Boxed future alias for dyn-compatible async traits.
///
/// Capability traits (book source, position source, execution client)
/// return this so implementations can be swapped behind `Arc<dyn _>`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Current wall-clock time in epoch milliseconds.
pub fn epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
