// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Payload envelopes for transaction intents.
//!
//! Each intent type has its own wire envelope, matching what the deployed
//! hub contracts decode: swaps use a compact binary route encoding,
//! bridge transfers a JSON-in-bytes payload, and collateral/loan
//! operations an RLP envelope carrying connection identifiers. The
//! dispatch is uniform; only the envelope differs per type.

use crate::error::{XCallError, XCallResult};
use crate::types::{TransactionIntent, XTransactionType};
use ethers::utils::rlp::RlpStream;
use serde_json::json;

/// Envelope method tags understood by the hub router.
const METHOD_SWAP: u8 = 0x01;

/// Source/destination connection identifiers required by the loans and
/// collateral flows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Connections {
    pub sources: Vec<String>,
    pub destinations: Vec<String>,
}

/// Encode the chain-agnostic payload for an intent. The caller is
/// responsible for having validated the intent first; missing fields here
/// surface as `InvalidIntent`.
pub fn encode_intent_payload(
    intent: &TransactionIntent,
    connections: &Connections,
) -> XCallResult<Vec<u8>> {
    match intent.intent_type {
        XTransactionType::Swap => encode_swap(intent),
        XTransactionType::Bridge => encode_bridge(intent),
        XTransactionType::Deposit
        | XTransactionType::Withdraw
        | XTransactionType::Borrow
        | XTransactionType::Repay => encode_collateral_op(intent, connections),
    }
}

/// Swap route, serialized to a compact binary envelope:
///
/// ```text
/// u8   method tag (0x01)
/// u8   hop count
/// per hop: u16 BE path-segment length, utf8 bytes
/// u128 BE minimum receive
/// u16  BE receiver length, utf8 bytes
/// ```
pub fn encode_swap(intent: &TransactionIntent) -> XCallResult<Vec<u8>> {
    let trade = intent
        .execution_trade
        .as_ref()
        .ok_or_else(|| XCallError::InvalidIntent("SWAP requires an execution trade".into()))?;
    if trade.path.len() > u8::MAX as usize {
        return Err(XCallError::InvalidIntent(format!(
            "swap route too long: {} hops",
            trade.path.len()
        )));
    }

    let receiver = intent.receiver_address();
    let mut out = Vec::with_capacity(64);
    out.push(METHOD_SWAP);
    out.push(trade.path.len() as u8);
    for segment in &trade.path {
        push_str(&mut out, segment)?;
    }
    out.extend_from_slice(&trade.minimum_receive.0.to_be_bytes());
    push_str(&mut out, &receiver)?;
    Ok(out)
}

fn push_str(out: &mut Vec<u8>, s: &str) -> XCallResult<()> {
    let len: u16 = s
        .len()
        .try_into()
        .map_err(|_| XCallError::InvalidIntent(format!("string field too long: {} bytes", s.len())))?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(s.as_bytes());
    Ok(())
}

/// Bridge transfer: JSON-in-bytes, as the asset manager contracts expect.
pub fn encode_bridge(intent: &TransactionIntent) -> XCallResult<Vec<u8>> {
    let receiver = intent.receiver_address();
    let payload = json!({
        "method": "_bridge",
        "params": {
            "token": intent.token,
            "amount": intent.input_amount,
            "receiver": receiver,
        },
    });
    serde_json::to_vec(&payload).map_err(|e| XCallError::SerializationError(e.to_string()))
}

/// Collateral/loan operations: RLP envelope
/// `[method, collateral, amount, receiver, sources, destinations]`.
pub fn encode_collateral_op(
    intent: &TransactionIntent,
    connections: &Connections,
) -> XCallResult<Vec<u8>> {
    let collateral = intent
        .used_collateral
        .as_deref()
        .ok_or_else(|| XCallError::InvalidIntent("collateral op requires a collateral".into()))?;
    let method = match intent.intent_type {
        XTransactionType::Deposit => "xDeposit",
        XTransactionType::Withdraw => "xWithdraw",
        XTransactionType::Borrow => "xBorrow",
        XTransactionType::Repay => "xRepay",
        other => {
            return Err(XCallError::InvalidIntent(format!(
                "{other} is not a collateral operation"
            )))
        }
    };

    let mut stream = RlpStream::new_list(6);
    stream.append(&method);
    stream.append(&collateral);
    stream.append(&amount_bytes(intent.input_amount.0));
    stream.append(&intent.receiver_address().as_str());
    stream.begin_list(connections.sources.len());
    for source in &connections.sources {
        stream.append(&source.as_str());
    }
    stream.begin_list(connections.destinations.len());
    for destination in &connections.destinations {
        stream.append(&destination.as_str());
    }
    Ok(stream.out().to_vec())
}

// Minimal big-endian representation; RLP integers carry no leading zeros.
fn amount_bytes(value: u128) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
    bytes[start..].to_vec()
}
