//! JSON-RPC transport over the endpoint registry.
//!
//! Every read (order book, slot, position) is a POST of a JSON-RPC
//! request to the currently selected endpoint. Outcomes are reported
//! back to the registry so failover and rate-limit parking work.

use crate::error::FeedError;
use crate::source::BookSource;
use maker_core::{epoch_ms, BookLevel, BoxFuture, OrderBookSnapshot, Price, Size};
use maker_registry::{EndpointRegistry, FailureKind, RegistryError};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Serialize)]
struct RpcRequest<'a, P: Serialize> {
    jsonrpc: &'static str,
    id: u32,
    method: &'a str,
    params: P,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// One registry-routed RPC round trip.
pub(crate) async fn rpc_call<P: Serialize, T: DeserializeOwned>(
    client: &reqwest::Client,
    registry: &EndpointRegistry,
    method: &str,
    params: P,
) -> Result<T, FeedError> {
    let endpoint = registry
        .select_best(Instant::now())
        .ok_or(RegistryError::NoEndpointAvailable)?;

    let request = RpcRequest {
        jsonrpc: "2.0",
        id: 1,
        method,
        params,
    };

    let started = Instant::now();
    let response = client
        .post(&endpoint.url)
        .timeout(endpoint.timeout)
        .json(&request)
        .send()
        .await;

    let response = match response {
        Ok(r) => r,
        Err(err) => {
            registry.report_failure(&endpoint.name, FailureKind::Transport);
            return if err.is_timeout() {
                Err(FeedError::Timeout)
            } else {
                Err(FeedError::Http(err.to_string()))
            };
        }
    };

    let status = response.status();
    if status.as_u16() == 429 {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs);
        registry.report_failure(&endpoint.name, FailureKind::RateLimited { retry_after });
        return Err(FeedError::Http(format!(
            "rate limited by {}",
            endpoint.name
        )));
    }
    if !status.is_success() {
        registry.report_failure(&endpoint.name, FailureKind::Transport);
        let body = response.text().await.unwrap_or_default();
        return Err(FeedError::Http(format!("status {status}: {body}")));
    }

    let parsed: RpcResponse<T> = match response.json().await {
        Ok(p) => p,
        Err(err) => {
            registry.report_failure(&endpoint.name, FailureKind::Transport);
            return Err(FeedError::Parse(err.to_string()));
        }
    };

    if let Some(err) = parsed.error {
        registry.report_failure(&endpoint.name, FailureKind::Transport);
        return Err(FeedError::Rpc(format!("{} (code {})", err.message, err.code)));
    }
    match parsed.result {
        Some(value) => {
            registry.report_success(&endpoint.name, started.elapsed());
            Ok(value)
        }
        None => {
            registry.report_failure(&endpoint.name, FailureKind::Transport);
            Err(FeedError::Parse("response carried no result".to_string()))
        }
    }
}

#[derive(Debug, Serialize)]
struct BookParams<'a> {
    symbol: &'a str,
}

/// Wire shape of one book level. Prices and sizes arrive as strings.
#[derive(Debug, Deserialize)]
struct RawLevel {
    px: Decimal,
    sz: Decimal,
}

#[derive(Debug, Deserialize)]
struct BookResult {
    bids: Vec<RawLevel>,
    asks: Vec<RawLevel>,
}

/// Book source backed by the `getL2Book` read method.
pub struct HttpBookSource {
    client: reqwest::Client,
    registry: Arc<EndpointRegistry>,
    symbol: String,
}

impl HttpBookSource {
    pub fn new(client: reqwest::Client, registry: Arc<EndpointRegistry>, symbol: String) -> Self {
        Self {
            client,
            registry,
            symbol,
        }
    }
}

impl BookSource for HttpBookSource {
    fn fetch(&self) -> BoxFuture<'_, Result<OrderBookSnapshot, FeedError>> {
        Box::pin(async move {
            let result: BookResult = rpc_call(
                &self.client,
                &self.registry,
                "getL2Book",
                BookParams {
                    symbol: &self.symbol,
                },
            )
            .await?;

            let to_levels = |raw: Vec<RawLevel>| {
                raw.into_iter()
                    .map(|l| BookLevel::new(Price::new(l.px), Size::new(l.sz)))
                    .collect()
            };
            Ok(OrderBookSnapshot::new(
                to_levels(result.bids),
                to_levels(result.asks),
                epoch_ms(),
            ))
        })
    }
}
