//! Signed order envelope construction.

use maker_core::{OrderSide, Price, Size};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{ExecError, ExecResult};
use crate::signer::EnvelopeSigner;

/// One order as the strategy wants it resting on the book.
#[derive(Debug, Clone, Serialize)]
pub struct OrderIntent {
    pub market_id: u32,
    pub side: OrderSide,
    pub price: Price,
    pub size: Size,
    pub post_only: bool,
    pub client_id: String,
}

/// Wire payload POSTed to the submission endpoint.
///
/// `message` is the hex-encoded serialized intent and `signature` the
/// hex-encoded 65-byte recoverable signature over those exact bytes.
/// The venue re-derives the signer from the pair and checks it against
/// `authority`.
#[derive(Debug, Clone, Serialize)]
pub struct SignedEnvelope {
    pub market_type: String,
    pub market_id: u32,
    pub slot: u64,
    pub order_uuid: String,
    pub message: String,
    pub signature: String,
    pub authority: String,
}

/// Serialize, sign, and wrap an intent for submission at `slot`.
pub fn build_envelope(
    intent: &OrderIntent,
    slot: u64,
    signer: &dyn EnvelopeSigner,
) -> ExecResult<SignedEnvelope> {
    let message = serde_json::to_vec(intent).map_err(|e| ExecError::Signing(e.to_string()))?;
    let signature = signer.sign(&message)?;

    let mut order_uuid = Uuid::new_v4().simple().to_string();
    order_uuid.truncate(8);

    Ok(SignedEnvelope {
        market_type: "perp".to_string(),
        market_id: intent.market_id,
        slot,
        order_uuid,
        message: hex::encode(&message),
        signature: hex::encode(&signature),
        authority: signer.authority(),
    })
}
