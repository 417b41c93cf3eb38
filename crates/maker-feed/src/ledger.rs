//! Ledger read client: current slot and account position.

use crate::error::FeedError;
use crate::http::rpc_call;
use crate::source::{PositionSnapshot, PositionSource, SlotSource};
use maker_core::BoxFuture;
use maker_registry::EndpointRegistry;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize)]
struct PositionParams<'a> {
    account: &'a str,
    market_id: u32,
}

#[derive(Debug, Deserialize)]
struct PositionResult {
    base_position: Decimal,
    realized_pnl: Decimal,
}

/// Registry-routed ledger reads for one account and market.
pub struct LedgerClient {
    client: reqwest::Client,
    registry: Arc<EndpointRegistry>,
    account: String,
    market_id: u32,
}

impl LedgerClient {
    pub fn new(
        client: reqwest::Client,
        registry: Arc<EndpointRegistry>,
        account: String,
        market_id: u32,
    ) -> Self {
        Self {
            client,
            registry,
            account,
            market_id,
        }
    }
}

impl SlotSource for LedgerClient {
    fn fetch_slot(&self) -> BoxFuture<'_, Result<u64, FeedError>> {
        Box::pin(async move { rpc_call(&self.client, &self.registry, "getSlot", ()).await })
    }
}

impl PositionSource for LedgerClient {
    fn fetch_position(&self) -> BoxFuture<'_, Result<PositionSnapshot, FeedError>> {
        Box::pin(async move {
            let result: PositionResult = rpc_call(
                &self.client,
                &self.registry,
                "getPosition",
                PositionParams {
                    account: &self.account,
                    market_id: self.market_id,
                },
            )
            .await?;
            Ok(PositionSnapshot {
                base_position: result.base_position,
                realized_pnl: result.realized_pnl,
            })
        })
    }
}
