//! HTTP order gateway.
//!
//! Submits signed envelopes to the venue and cancels resting orders.
//! Transient faults are retried with backoff; once retries run out the
//! gateway either propagates the error or, when degraded mode is
//! enabled, acknowledges with a synthetic order id so the caller's
//! order table stays consistent. Synthetic acknowledgements are logged
//! and counted separately and are never cancelled over the network.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use maker_core::{epoch_ms, BoxFuture};
use maker_feed::DynSlotSource;
use maker_telemetry::DynMetricsSink;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::ExecutionConfig;
use crate::envelope::{build_envelope, OrderIntent};
use crate::error::{ExecError, ExecResult};
use crate::retry::with_retry;
use crate::signer::DynSigner;

const SUBMIT_ATTEMPTS: u32 = 3;
const CANCEL_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(100);

/// Outcome of a placement request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Venue acknowledged with a real order id.
    Acked(String),
    /// Submission kept failing but degraded mode granted a synthetic
    /// id. The order may or may not exist at the venue and cannot be
    /// cancelled remotely.
    Degraded(String),
}

impl Placement {
    pub fn order_id(&self) -> &str {
        match self {
            Self::Acked(id) | Self::Degraded(id) => id,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }
}

/// Order placement and cancellation capability.
pub trait ExecutionClient: Send + Sync {
    fn place_limit(&self, intent: OrderIntent) -> BoxFuture<'_, ExecResult<Placement>>;

    /// Best-effort cancel of one resting order.
    fn cancel<'a>(&'a self, order_id: &'a str) -> BoxFuture<'a, ExecResult<()>>;

    /// Cancel a batch concurrently, each request bounded by
    /// `per_req_timeout`. Returns how many succeeded.
    fn cancel_many(
        &self,
        order_ids: Vec<String>,
        per_req_timeout: Duration,
    ) -> BoxFuture<'_, usize>;
}

pub type DynExecutionClient = Arc<dyn ExecutionClient>;

/// Gateway backed by the venue's HTTP submission endpoint.
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    slot_source: DynSlotSource,
    signer: DynSigner,
    metrics: DynMetricsSink,
    allow_degraded: bool,
    request_timeout: Duration,
}

impl HttpGateway {
    pub fn new(
        config: &ExecutionConfig,
        slot_source: DynSlotSource,
        signer: DynSigner,
        metrics: DynMetricsSink,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.submit_url.trim_end_matches('/').to_string(),
            slot_source,
            signer,
            metrics,
            allow_degraded: config.allow_degraded,
            request_timeout: config.request_timeout(),
        }
    }

    /// Synthetic id handed out for degraded acknowledgements.
    fn mock_order_id() -> String {
        format!("mock-{:06}", epoch_ms() % 1_000_000)
    }

    async fn submit(&self, intent: &OrderIntent) -> ExecResult<String> {
        // A missing slot downgrades the envelope, it does not block it.
        // The venue treats slot 0 as "price at receipt".
        let slot = match self.slot_source.fetch_slot().await {
            Ok(slot) => slot,
            Err(e) => {
                warn!(error = %e, "Failed to fetch slot, using default");
                self.metrics.inc_error("slot");
                0
            }
        };

        let envelope = build_envelope(intent, slot, self.signer.as_ref())?;

        let response = self
            .client
            .post(format!("{}/orders", self.base_url))
            .timeout(self.request_timeout)
            .json(&envelope)
            .send()
            .await
            .map_err(map_send_error)?;
        let response = check_status(response).await?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| ExecError::Transport(e.to_string()))?;
        Ok(extract_order_id(&body))
    }
}

impl ExecutionClient for HttpGateway {
    fn place_limit(&self, intent: OrderIntent) -> BoxFuture<'_, ExecResult<Placement>> {
        Box::pin(async move {
            let result =
                with_retry(SUBMIT_ATTEMPTS, RETRY_BASE_DELAY, || self.submit(&intent)).await;
            match result {
                Ok(order_id) => {
                    self.metrics.inc_quote(intent.side.as_str());
                    Ok(Placement::Acked(order_id))
                }
                Err(e) if e.is_retryable() && self.allow_degraded => {
                    let order_id = Self::mock_order_id();
                    warn!(
                        error = %e,
                        side = %intent.side,
                        order_id = %order_id,
                        "Submission failed after retries, acknowledging degraded"
                    );
                    self.metrics.inc_degraded_ack();
                    Ok(Placement::Degraded(order_id))
                }
                Err(e) => Err(e),
            }
        })
    }

    fn cancel<'a>(&'a self, order_id: &'a str) -> BoxFuture<'a, ExecResult<()>> {
        Box::pin(async move {
            with_retry(CANCEL_ATTEMPTS, RETRY_BASE_DELAY, || async {
                let response = self
                    .client
                    .post(format!("{}/orders/{}/cancel", self.base_url, order_id))
                    .timeout(self.request_timeout)
                    .send()
                    .await
                    .map_err(map_send_error)?;
                check_status(response).await?;
                Ok(())
            })
            .await?;

            self.metrics.inc_cancel();
            Ok(())
        })
    }

    fn cancel_many(
        &self,
        order_ids: Vec<String>,
        per_req_timeout: Duration,
    ) -> BoxFuture<'_, usize> {
        Box::pin(async move {
            if order_ids.is_empty() {
                return 0;
            }
            let total = order_ids.len();
            let outcomes = join_all(order_ids.iter().map(|order_id| async move {
                match tokio::time::timeout(per_req_timeout, self.cancel(order_id)).await {
                    Ok(Ok(())) => true,
                    Ok(Err(e)) => {
                        warn!(order_id = %order_id, error = %e, "Cancel failed");
                        false
                    }
                    Err(_) => {
                        warn!(order_id = %order_id, "Cancel timed out");
                        false
                    }
                }
            }))
            .await;

            let ok = outcomes.into_iter().filter(|success| *success).count();
            info!(ok, total, "Bulk cancel finished");
            ok
        })
    }
}

fn map_send_error(e: reqwest::Error) -> ExecError {
    if e.is_timeout() {
        ExecError::Timeout
    } else {
        ExecError::Transport(e.to_string())
    }
}

async fn check_status(response: reqwest::Response) -> ExecResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if status.as_u16() == 429 {
        return Err(ExecError::RateLimited);
    }
    if status.is_client_error() {
        return Err(ExecError::Rejected {
            status: status.as_u16(),
            body,
        });
    }
    Err(ExecError::Transport(format!("{status}: {body}")))
}

/// The venue answers with one of several id field spellings.
fn extract_order_id(body: &Value) -> String {
    for key in ["id", "order_id", "uuid"] {
        match body.get(key) {
            Some(Value::String(s)) => return s.clone(),
            Some(Value::Number(n)) => return n.to_string(),
            _ => {}
        }
    }
    "unknown".to_string()
}

/// Recording gateway for tests and the self-test. Acknowledges every
/// placement with a sequential id unless a scripted response is queued.
#[derive(Default)]
pub struct MockGateway {
    placed: Mutex<Vec<OrderIntent>>,
    cancelled: Mutex<Vec<String>>,
    script: Mutex<VecDeque<ExecResult<Placement>>>,
    seq: AtomicU64,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response served before the sequential default.
    pub fn push_response(&self, response: ExecResult<Placement>) {
        self.script.lock().push_back(response);
    }

    pub fn placed(&self) -> Vec<OrderIntent> {
        self.placed.lock().clone()
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.cancelled.lock().clone()
    }

    pub fn placed_count(&self) -> usize {
        self.placed.lock().len()
    }

    pub fn cancelled_count(&self) -> usize {
        self.cancelled.lock().len()
    }
}

impl ExecutionClient for MockGateway {
    fn place_limit(&self, intent: OrderIntent) -> BoxFuture<'_, ExecResult<Placement>> {
        Box::pin(async move {
            self.placed.lock().push(intent);
            if let Some(scripted) = self.script.lock().pop_front() {
                return scripted;
            }
            let n = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
            Ok(Placement::Acked(format!("ord-{n:04}")))
        })
    }

    fn cancel<'a>(&'a self, order_id: &'a str) -> BoxFuture<'a, ExecResult<()>> {
        Box::pin(async move {
            self.cancelled.lock().push(order_id.to_string());
            Ok(())
        })
    }

    fn cancel_many(
        &self,
        order_ids: Vec<String>,
        _per_req_timeout: Duration,
    ) -> BoxFuture<'_, usize> {
        Box::pin(async move {
            let total = order_ids.len();
            for order_id in order_ids {
                self.cancelled.lock().push(order_id);
            }
            total
        })
    }
}
