// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Adapter for Goloop chains (ICON, Havah).
//!
//! Plain HTTP JSON-RPC against the `icx_*` API. Goloop has no ranged log
//! query, so event retrieval walks blocks and transaction results; the
//! per-tick range limit keeps that walk bounded.

use crate::client::{
    fetch_receipt_with_retry, is_transient_transport_error, keep_known_events, map_transport_err,
    shared_http_client, PublicClient, RawBlock, RawReceipt, SigningRequest, TransactionSigner,
    WalletClient, NATIVE_TOKEN,
};
use crate::config::ChainConfig;
use crate::encoding::{self, Connections};
use crate::error::{XCallError, XCallResult};
use crate::events::{self, ChainEvent};
use crate::metrics::XCallMetrics;
use crate::types::{Amount, ChainId, TransactionIntent, TxStatus};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

// Goloop codes for a transaction that exists but has no result yet
const RPC_TX_PENDING: i64 = -31002;
const RPC_TX_EXECUTING: i64 = -31003;
const RPC_TX_NOT_FOUND: i64 = -31004;

#[derive(Debug, Serialize)]
struct JsonRpcRequest {
    jsonrpc: &'static str,
    method: String,
    params: Value,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Shared JSON-RPC plumbing for the public and wallet sides.
#[derive(Clone)]
struct GoloopRpc {
    http_client: reqwest::Client,
    rpc_url: String,
    request_id: Arc<AtomicU64>,
    xcall_address: String,
}

impl GoloopRpc {
    fn new(config: &ChainConfig) -> Self {
        Self {
            http_client: shared_http_client(),
            rpc_url: config.rpc_url.clone(),
            request_id: Arc::new(AtomicU64::new(1)),
            xcall_address: config.xcall_address.clone(),
        }
    }

    async fn call(&self, method: &str, params: Value) -> XCallResult<Value> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method: method.to_string(),
            params,
            id: self.request_id.fetch_add(1, Ordering::SeqCst),
        };

        let max_attempts: usize = 3;
        for attempt in 0..max_attempts {
            let response = match self
                .http_client
                .post(&self.rpc_url)
                .json(&request)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(err) => {
                    let transient = is_transient_transport_error(&err);
                    if !transient || attempt + 1 == max_attempts {
                        return Err(map_transport_err(err));
                    }
                    warn!(
                        "[RPC] transport error calling {} (attempt {}/{}), retrying",
                        method,
                        attempt + 1,
                        max_attempts
                    );
                    tokio::time::sleep(Duration::from_millis(50 * (attempt as u64 + 1)))
                        .await;
                    continue;
                }
            };

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(XCallError::ProviderError(format!(
                    "HTTP error {status}: {body}"
                )));
            }

            let rpc_response: JsonRpcResponse = response
                .json()
                .await
                .map_err(|e| XCallError::InvalidResponse(e.to_string()))?;

            if let Some(error) = rpc_response.error {
                return Err(match error.code {
                    RPC_TX_PENDING | RPC_TX_EXECUTING | RPC_TX_NOT_FOUND => {
                        XCallError::TxNotFound(format!("{method}: {}", error.message))
                    }
                    _ => XCallError::ProviderError(format!(
                        "RPC error {}: {}",
                        error.code, error.message
                    )),
                });
            }
            return Ok(rpc_response.result.unwrap_or(Value::Null));
        }
        Err(XCallError::TransientProviderError(
            "RPC call failed after retries".to_string(),
        ))
    }

    /// Read-only contract call via `icx_call`.
    async fn icx_call(&self, to: &str, method: &str, params: Value) -> XCallResult<Value> {
        self.call(
            "icx_call",
            json!({
                "to": to,
                "dataType": "call",
                "data": { "method": method, "params": params },
            }),
        )
        .await
    }

    async fn transaction_result(&self, tx_hash: &str) -> XCallResult<Value> {
        self.call("icx_getTransactionResult", json!({ "txHash": tx_hash }))
            .await
    }
}

fn parse_hex_u128(raw: &str) -> XCallResult<u128> {
    let parsed = match raw.strip_prefix("0x") {
        Some(hex) => u128::from_str_radix(hex, 16),
        None => raw.parse::<u128>(),
    };
    parsed.map_err(|e| XCallError::InvalidResponse(format!("bad integer {raw:?}: {e}")))
}

fn parse_hex_u64(raw: &str) -> XCallResult<u64> {
    Ok(parse_hex_u128(raw)? as u64)
}

fn value_as_str(value: &Value, field: &str) -> XCallResult<String> {
    value
        .get(field)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| XCallError::InvalidResponse(format!("missing field {field:?}")))
}

pub struct GoloopPublicClient {
    chain: ChainId,
    rpc: GoloopRpc,
    scan_block_count: u64,
    receipt_attempts: u32,
    receipt_interval: Duration,
    metrics: Option<Arc<XCallMetrics>>,
}

impl GoloopPublicClient {
    pub fn new(config: &ChainConfig, metrics: Option<Arc<XCallMetrics>>) -> Self {
        Self {
            chain: config.chain_id,
            rpc: GoloopRpc::new(config),
            scan_block_count: config.scan_block_count,
            receipt_attempts: config.receipt_attempts,
            receipt_interval: config.receipt_interval(),
            metrics,
        }
    }

    /// Event logs emitted by the cross-call contract in one block. Walks
    /// every confirmed transaction's result; O(txs) RPC calls per block.
    async fn block_event_logs(
        &self,
        height: u64,
    ) -> XCallResult<Vec<events::goloop::GoloopEventLog>> {
        let block = self.get_block(height).await?;
        let txs = block
            .raw
            .get("confirmed_transaction_list")
            .and_then(|t| t.as_array())
            .cloned()
            .unwrap_or_default();

        let mut logs = Vec::new();
        for tx in &txs {
            let tx_hash = match tx.get("txHash").and_then(|h| h.as_str()) {
                Some(h) => h.to_string(),
                None => continue,
            };
            let result = match self.rpc.transaction_result(&tx_hash).await {
                Ok(r) => r,
                // A result can lag block availability by a moment
                Err(e) if e.is_recoverable() => {
                    warn!("[{}] no result yet for {tx_hash}: {e}", self.chain);
                    continue;
                }
                Err(e) => return Err(e),
            };
            let raw_logs = result
                .get("eventLogs")
                .and_then(|l| l.as_array())
                .cloned()
                .unwrap_or_default();
            for raw in raw_logs {
                let mut log: events::goloop::GoloopEventLog = serde_json::from_value(raw)
                    .map_err(|e| XCallError::InvalidResponse(e.to_string()))?;
                if log.score_address != self.rpc.xcall_address {
                    continue;
                }
                log.tx_hash = tx_hash.clone();
                log.block_number = height;
                logs.push(log);
            }
        }
        Ok(logs)
    }
}

#[async_trait]
impl PublicClient for GoloopPublicClient {
    fn chain_id(&self) -> ChainId {
        self.chain
    }

    fn scan_block_count(&self) -> u64 {
        self.scan_block_count
    }

    async fn get_balance(&self, address: &str, token: &str) -> XCallResult<Amount> {
        if token == NATIVE_TOKEN {
            let result = self
                .rpc
                .call("icx_getBalance", json!({ "address": address }))
                .await?;
            let raw = result
                .as_str()
                .ok_or_else(|| XCallError::InvalidResponse("non-string balance".to_string()))?;
            return Ok(Amount(parse_hex_u128(raw)?));
        }
        let result = self
            .rpc
            .icx_call(token, "balanceOf", json!({ "_owner": address }))
            .await?;
        let raw = result
            .as_str()
            .ok_or_else(|| XCallError::BalanceNotFound(token.to_string()))?;
        Ok(Amount(parse_hex_u128(raw)?))
    }

    async fn get_xcall_fee(
        &self,
        destination: ChainId,
        rollback: bool,
        sources: &[String],
    ) -> XCallResult<Amount> {
        let mut params = json!({
            "_net": destination.network_id(),
            "_rollback": if rollback { "0x1" } else { "0x0" },
        });
        if !sources.is_empty() {
            params["_sources"] = json!(sources);
        }
        let result = self
            .rpc
            .icx_call(&self.rpc.xcall_address, "getFee", params)
            .await?;
        let raw = result
            .as_str()
            .ok_or_else(|| XCallError::InvalidResponse("non-string fee".to_string()))?;
        Ok(Amount(parse_hex_u128(raw)?))
    }

    async fn get_block_height(&self) -> XCallResult<u64> {
        let result = self.rpc.call("icx_getLastBlock", json!([])).await?;
        match result.get("height") {
            Some(Value::Number(n)) => n
                .as_u64()
                .ok_or_else(|| XCallError::InvalidResponse("negative height".to_string())),
            Some(Value::String(s)) => parse_hex_u64(s),
            _ => Err(XCallError::InvalidResponse(
                "missing block height".to_string(),
            )),
        }
    }

    async fn get_block(&self, height: u64) -> XCallResult<RawBlock> {
        let raw = self
            .rpc
            .call(
                "icx_getBlockByHeight",
                json!({ "height": format!("{height:#x}") }),
            )
            .await?;
        let hash = value_as_str(&raw, "block_hash")?;
        Ok(RawBlock {
            number: height,
            hash,
            raw,
        })
    }

    async fn get_event_logs(
        &self,
        start_block: u64,
        end_block: u64,
    ) -> XCallResult<Vec<ChainEvent>> {
        let mut events_out = Vec::new();
        for height in start_block..=end_block {
            let logs = self.block_event_logs(height).await?;
            let parsed = logs
                .iter()
                .map(|log| events::goloop::parse_event_log(self.chain, log));
            events_out.extend(keep_known_events(self.chain, parsed, self.metrics.as_deref()));
        }
        if let Some(m) = &self.metrics {
            m.events_received
                .with_label_values(&[&self.chain.to_string()])
                .inc_by(events_out.len() as u64);
        }
        Ok(events_out)
    }

    async fn get_tx_receipt(&self, tx_hash: &str) -> XCallResult<RawReceipt> {
        fetch_receipt_with_retry(
            tx_hash,
            self.receipt_attempts,
            self.receipt_interval,
            self.metrics.as_deref(),
            || async {
                let result = self.rpc.transaction_result(tx_hash).await?;
                if result.is_null() {
                    return Ok(None);
                }
                let block_number = parse_hex_u64(&value_as_str(&result, "blockHeight")?)?;
                Ok(Some(RawReceipt {
                    tx_hash: tx_hash.to_string(),
                    block_number,
                    raw: result,
                }))
            },
        )
        .await
    }

    fn derive_tx_status(&self, receipt: &RawReceipt) -> TxStatus {
        match receipt.raw.get("status").and_then(|s| s.as_str()) {
            Some("0x1") => TxStatus::Success,
            Some("0x0") => TxStatus::Failure,
            _ => TxStatus::Pending,
        }
    }
}

pub struct GoloopWalletClient {
    chain: ChainId,
    rpc: GoloopRpc,
    signer: Arc<dyn TransactionSigner>,
    connections: Connections,
}

impl GoloopWalletClient {
    pub fn new(
        config: &ChainConfig,
        signer: Arc<dyn TransactionSigner>,
        connections: Connections,
    ) -> Self {
        Self {
            chain: config.chain_id,
            rpc: GoloopRpc::new(config),
            signer,
            connections,
        }
    }
}

#[async_trait]
impl WalletClient for GoloopWalletClient {
    fn chain_id(&self) -> ChainId {
        self.chain
    }

    // Goloop contracts pull funds on behalf of the caller; there is no
    // allowance step
    async fn approve(
        &self,
        _token: &str,
        _spender: &str,
        _amount: Amount,
    ) -> XCallResult<Option<String>> {
        Ok(None)
    }

    async fn execute_transaction(&self, intent: &TransactionIntent) -> XCallResult<String> {
        intent.validate()?;
        let payload = encoding::encode_intent_payload(intent, &self.connections)?;
        let fee = intent.xcall_fee.for_intent(intent.intent_type);

        let balance_raw = self
            .rpc
            .call("icx_getBalance", json!({ "address": self.signer.address() }))
            .await?;
        let balance = balance_raw
            .as_str()
            .map(parse_hex_u128)
            .transpose()?
            .unwrap_or(0);
        if balance < fee.value() {
            return Err(XCallError::InsufficientFunds(format!(
                "native balance {balance} below fee {}",
                fee.value()
            )));
        }

        let request = SigningRequest {
            chain: self.chain,
            from: self.signer.address(),
            to: self.rpc.xcall_address.clone(),
            value: fee,
            data: payload,
            method: Some("sendCallMessage".to_string()),
        };
        self.signer.sign_and_submit(&request).await
    }
}
