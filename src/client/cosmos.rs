// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Adapter for Cosmos chains (Archway, Injective).
//!
//! Talks to the LCD REST API. Events come back attached to transaction
//! search results rather than a log query; CosmWasm contract events carry
//! a `wasm-` prefix and a `_contract_address` attribute that pins them to
//! the cross-call contract.

use crate::client::{
    fetch_receipt_with_retry, keep_known_events, map_transport_err, shared_http_client,
    PublicClient, RawBlock, RawReceipt, SigningRequest, TransactionSigner, WalletClient,
    NATIVE_TOKEN,
};
use crate::config::ChainConfig;
use crate::encoding::{self, Connections};
use crate::error::{XCallError, XCallResult};
use crate::events::{self, cosmos::CosmosEvent, ChainEvent};
use crate::metrics::XCallMetrics;
use crate::types::{Amount, ChainId, TransactionIntent, TxStatus};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Prefix marking a token identifier as a CW20 contract address rather
/// than a bank denom.
pub const CW20_PREFIX: &str = "cw20:";

pub struct CosmosPublicClient {
    chain: ChainId,
    http_client: reqwest::Client,
    rpc_url: String,
    xcall_address: String,
    scan_block_count: u64,
    receipt_attempts: u32,
    receipt_interval: Duration,
    metrics: Option<Arc<XCallMetrics>>,
}

impl CosmosPublicClient {
    pub fn new(config: &ChainConfig, metrics: Option<Arc<XCallMetrics>>) -> Self {
        Self {
            chain: config.chain_id,
            http_client: shared_http_client(),
            rpc_url: config.rpc_url.trim_end_matches('/').to_string(),
            xcall_address: config.xcall_address.clone(),
            scan_block_count: config.scan_block_count,
            receipt_attempts: config.receipt_attempts,
            receipt_interval: config.receipt_interval(),
            metrics,
        }
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> XCallResult<Value> {
        let url = format!("{}{}", self.rpc_url, path);
        let response = self
            .http_client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(map_transport_err)?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| XCallError::InvalidResponse(e.to_string()))?;
        if !status.is_success() {
            return Err(XCallError::ProviderError(format!(
                "HTTP error {status}: {body}"
            )));
        }
        Ok(body)
    }

    /// CosmWasm smart query, request JSON encoded as base64 in the path.
    async fn smart_query(&self, contract: &str, request: &Value) -> XCallResult<Value> {
        let encoded = BASE64.encode(request.to_string());
        let path = format!("/cosmwasm/wasm/v1/contract/{contract}/smart/{encoded}");
        let body = self.get_json(&path, &[]).await?;
        body.get("data")
            .cloned()
            .ok_or_else(|| XCallError::InvalidResponse("smart query without data".to_string()))
    }
}

fn parse_amount_str(raw: &str) -> XCallResult<Amount> {
    raw.parse::<u128>()
        .map(Amount)
        .map_err(|e| XCallError::InvalidResponse(format!("bad amount {raw:?}: {e}")))
}

fn field_str(value: &Value, field: &str) -> XCallResult<String> {
    value
        .get(field)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| XCallError::InvalidResponse(format!("missing field {field:?}")))
}

fn field_u64(value: &Value, field: &str) -> XCallResult<u64> {
    let raw = field_str(value, field)?;
    raw.parse::<u64>()
        .map_err(|e| XCallError::InvalidResponse(format!("bad integer {raw:?}: {e}")))
}

/// Extract the cross-call contract's `wasm-*` events from one tx search
/// result.
fn contract_events(tx_response: &Value, xcall_address: &str) -> Vec<CosmosEvent> {
    let tx_hash = tx_response
        .get("txhash")
        .and_then(|h| h.as_str())
        .unwrap_or_default()
        .to_string();
    let height = tx_response
        .get("height")
        .and_then(|h| h.as_str())
        .and_then(|h| h.parse::<u64>().ok())
        .unwrap_or_default();

    let mut out = Vec::new();
    let raw_events = tx_response
        .get("events")
        .and_then(|e| e.as_array())
        .cloned()
        .unwrap_or_default();
    for raw in raw_events {
        let event_type = raw
            .get("type")
            .and_then(|t| t.as_str())
            .unwrap_or_default()
            .to_string();
        if !event_type.starts_with("wasm-") {
            continue;
        }
        let attributes: Vec<(String, String)> = raw
            .get("attributes")
            .and_then(|a| a.as_array())
            .map(|attrs| {
                attrs
                    .iter()
                    .filter_map(|attr| {
                        let key = attr.get("key")?.as_str()?.to_string();
                        let value = attr.get("value")?.as_str()?.to_string();
                        Some((key, value))
                    })
                    .collect()
            })
            .unwrap_or_default();
        let from_xcall = attributes
            .iter()
            .any(|(k, v)| k == "_contract_address" && v == xcall_address);
        if !from_xcall {
            continue;
        }
        out.push(CosmosEvent {
            event_type,
            attributes,
            tx_hash: tx_hash.clone(),
            block_number: height,
        });
    }
    out
}

#[async_trait]
impl PublicClient for CosmosPublicClient {
    fn chain_id(&self) -> ChainId {
        self.chain
    }

    fn scan_block_count(&self) -> u64 {
        self.scan_block_count
    }

    async fn get_balance(&self, address: &str, token: &str) -> XCallResult<Amount> {
        if let Some(contract) = token.strip_prefix(CW20_PREFIX) {
            let data = self
                .smart_query(contract, &json!({ "balance": { "address": address } }))
                .await?;
            return parse_amount_str(&field_str(&data, "balance")?);
        }
        if token == NATIVE_TOKEN {
            return Err(XCallError::InvalidIntent(
                "cosmos balances are denom-addressed, pass the denom".to_string(),
            ));
        }
        let path = format!("/cosmos/bank/v1beta1/balances/{address}/by_denom");
        let body = self.get_json(&path, &[("denom", token.to_string())]).await?;
        let balance = body
            .get("balance")
            .ok_or_else(|| XCallError::BalanceNotFound(token.to_string()))?;
        parse_amount_str(&field_str(balance, "amount")?)
    }

    async fn get_xcall_fee(
        &self,
        destination: ChainId,
        rollback: bool,
        sources: &[String],
    ) -> XCallResult<Amount> {
        let data = self
            .smart_query(
                &self.xcall_address,
                &json!({
                    "get_fee": {
                        "nid": destination.network_id(),
                        "rollback": rollback,
                        "sources": sources,
                    }
                }),
            )
            .await?;
        match &data {
            Value::String(raw) => parse_amount_str(raw),
            Value::Number(n) => n
                .as_u64()
                .map(|v| Amount(v as u128))
                .ok_or_else(|| XCallError::InvalidResponse("negative fee".to_string())),
            other => Err(XCallError::InvalidResponse(format!(
                "unexpected fee shape: {other}"
            ))),
        }
    }

    async fn get_block_height(&self) -> XCallResult<u64> {
        let body = self
            .get_json("/cosmos/base/tendermint/v1beta1/blocks/latest", &[])
            .await?;
        let header = body
            .get("block")
            .and_then(|b| b.get("header"))
            .ok_or_else(|| XCallError::InvalidResponse("missing block header".to_string()))?;
        field_u64(header, "height")
    }

    async fn get_block(&self, height: u64) -> XCallResult<RawBlock> {
        let path = format!("/cosmos/base/tendermint/v1beta1/blocks/{height}");
        let raw = self.get_json(&path, &[]).await?;
        let hash = raw
            .pointer("/block_id/hash")
            .and_then(|h| h.as_str())
            .unwrap_or_default()
            .to_string();
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
        let query = [
            (
                "events",
                format!("wasm._contract_address='{}'", self.xcall_address),
            ),
            ("events", format!("tx.height>={start_block}")),
            ("events", format!("tx.height<={end_block}")),
        ];
        let body = self.get_json("/cosmos/tx/v1beta1/txs", &query).await?;
        let tx_responses = body
            .get("tx_responses")
            .and_then(|t| t.as_array())
            .cloned()
            .unwrap_or_default();

        let mut events_out = Vec::new();
        for tx_response in &tx_responses {
            let logs = contract_events(tx_response, &self.xcall_address);
            let parsed = logs
                .iter()
                .map(|log| events::cosmos::parse_event_log(self.chain, log));
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
                let path = format!("/cosmos/tx/v1beta1/txs/{tx_hash}");
                let body = match self.get_json(&path, &[]).await {
                    Ok(body) => body,
                    // LCD answers 404/NotFound until the tx is indexed
                    Err(XCallError::ProviderError(msg)) if msg.contains("404") => {
                        return Ok(None)
                    }
                    Err(e) => return Err(e),
                };
                let tx_response = match body.get("tx_response") {
                    Some(r) if !r.is_null() => r.clone(),
                    _ => return Ok(None),
                };
                let block_number = field_u64(&tx_response, "height")?;
                Ok(Some(RawReceipt {
                    tx_hash: tx_hash.to_string(),
                    block_number,
                    raw: tx_response,
                }))
            },
        )
        .await
    }

    fn derive_tx_status(&self, receipt: &RawReceipt) -> TxStatus {
        match receipt.raw.get("code").and_then(|c| c.as_u64()) {
            Some(0) => TxStatus::Success,
            Some(_) => TxStatus::Failure,
            None => TxStatus::Pending,
        }
    }
}

pub struct CosmosWalletClient {
    chain: ChainId,
    xcall_address: String,
    signer: Arc<dyn TransactionSigner>,
    connections: Connections,
}

impl CosmosWalletClient {
    pub fn new(
        config: &ChainConfig,
        signer: Arc<dyn TransactionSigner>,
        connections: Connections,
    ) -> Self {
        Self {
            chain: config.chain_id,
            xcall_address: config.xcall_address.clone(),
            signer,
            connections,
        }
    }
}

#[async_trait]
impl WalletClient for CosmosWalletClient {
    fn chain_id(&self) -> ChainId {
        self.chain
    }

    async fn approve(
        &self,
        token: &str,
        spender: &str,
        amount: Amount,
    ) -> XCallResult<Option<String>> {
        // Bank denoms move with the transaction's funds; only CW20 tokens
        // need an allowance
        let Some(contract) = token.strip_prefix(CW20_PREFIX) else {
            return Ok(None);
        };
        let msg = json!({
            "increase_allowance": {
                "spender": spender,
                "amount": amount.value().to_string(),
            }
        });
        let request = SigningRequest {
            chain: self.chain,
            from: self.signer.address(),
            to: contract.to_string(),
            value: Amount::ZERO,
            data: msg.to_string().into_bytes(),
            method: Some("execute".to_string()),
        };
        Ok(Some(self.signer.sign_and_submit(&request).await?))
    }

    async fn execute_transaction(&self, intent: &TransactionIntent) -> XCallResult<String> {
        intent.validate()?;
        let payload = encoding::encode_intent_payload(intent, &self.connections)?;
        let fee = intent.xcall_fee.for_intent(intent.intent_type);
        let msg = json!({
            "send_call_message": {
                "to": intent.receiver_address(),
                "data": payload,
            }
        });
        let request = SigningRequest {
            chain: self.chain,
            from: self.signer.address(),
            to: self.xcall_address.clone(),
            value: fee,
            data: msg.to_string().into_bytes(),
            method: Some("execute".to_string()),
        };
        self.signer.sign_and_submit(&request).await
    }
}
