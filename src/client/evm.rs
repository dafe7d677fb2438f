// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Adapter for EVM chains (Arbitrum, Avalanche, Base, BSC, Optimism).
//!
//! Logs are fetched with a ranged `eth_getLogs` filter pinned to the
//! cross-call contract address. Contract reads go through `eth_call` with
//! hand-rolled selectors; the contract surface we touch is small enough
//! that generated bindings would be overkill.

use crate::client::{
    fetch_receipt_with_retry, keep_known_events, PublicClient, RawBlock, RawReceipt,
    SigningRequest, TransactionSigner, WalletClient, NATIVE_TOKEN,
};
use crate::config::ChainConfig;
use crate::encoding::{self, Connections};
use crate::error::{XCallError, XCallResult};
use crate::events::{self, ChainEvent};
use crate::metrics::XCallMetrics;
use crate::types::{Amount, ChainId, TransactionIntent, TxStatus, XTransactionType};
use async_trait::async_trait;
use ethers::abi::{self, ParamType, Token};
use ethers::providers::{Http, Middleware, Provider, ProviderError};
use ethers::types::{Address, BlockNumber, Filter, TransactionRequest, H256, U256};
use ethers::utils::id;
use futures::future::try_join_all;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tap::TapFallible;
use tracing::debug;

pub struct EvmPublicClient {
    chain: ChainId,
    provider: Provider<Http>,
    xcall_address: Address,
    scan_block_count: u64,
    receipt_attempts: u32,
    receipt_interval: Duration,
    metrics: Option<Arc<XCallMetrics>>,
}

impl EvmPublicClient {
    pub fn new(config: &ChainConfig, metrics: Option<Arc<XCallMetrics>>) -> anyhow::Result<Self> {
        let provider = Provider::<Http>::try_from(config.rpc_url.as_str())?;
        let xcall_address = Address::from_str(&config.xcall_address)?;
        Ok(Self {
            chain: config.chain_id,
            provider,
            xcall_address,
            scan_block_count: config.scan_block_count,
            receipt_attempts: config.receipt_attempts,
            receipt_interval: config.receipt_interval(),
            metrics,
        })
    }

    async fn eth_call(&self, to: Address, data: Vec<u8>) -> XCallResult<Vec<u8>> {
        let tx = TransactionRequest::new().to(to).data(data);
        let bytes = self
            .provider
            .call(&tx.into(), None)
            .await
            .map_err(map_provider_err)?;
        Ok(bytes.to_vec())
    }
}

pub(crate) fn map_provider_err(e: ProviderError) -> XCallError {
    let msg = e.to_string();
    match e {
        ProviderError::JsonRpcClientError(_)
            if msg.contains("timed out")
                || msg.contains("connect")
                || msg.contains("dns error") =>
        {
            XCallError::TransientProviderError(msg)
        }
        _ => XCallError::ProviderError(msg),
    }
}

fn u256_to_amount(value: U256) -> XCallResult<Amount> {
    if value > U256::from(u128::MAX) {
        return Err(XCallError::InvalidResponse(format!(
            "amount {value} exceeds u128"
        )));
    }
    Ok(Amount(value.as_u128()))
}

fn decode_uint(output: &[u8]) -> XCallResult<U256> {
    let tokens = abi::decode(&[ParamType::Uint(256)], output)
        .map_err(|e| XCallError::InvalidResponse(format!("bad uint256 return: {e}")))?;
    match tokens.first() {
        Some(Token::Uint(v)) => Ok(*v),
        _ => Err(XCallError::InvalidResponse(
            "empty uint256 return".to_string(),
        )),
    }
}

fn parse_address(raw: &str) -> XCallResult<Address> {
    Address::from_str(raw)
        .map_err(|e| XCallError::InvalidIntent(format!("bad evm address {raw:?}: {e}")))
}

#[async_trait]
impl PublicClient for EvmPublicClient {
    fn chain_id(&self) -> ChainId {
        self.chain
    }

    fn scan_block_count(&self) -> u64 {
        self.scan_block_count
    }

    async fn get_balance(&self, address: &str, token: &str) -> XCallResult<Amount> {
        let owner = parse_address(address)?;
        if token == NATIVE_TOKEN {
            let balance = self
                .provider
                .get_balance(owner, None)
                .await
                .map_err(map_provider_err)?;
            return u256_to_amount(balance);
        }
        let data = [
            id("balanceOf(address)").to_vec(),
            abi::encode(&[Token::Address(owner)]),
        ]
        .concat();
        let output = self.eth_call(parse_address(token)?, data).await?;
        u256_to_amount(decode_uint(&output)?)
    }

    async fn get_balances(
        &self,
        address: &str,
        tokens: &[String],
    ) -> XCallResult<HashMap<String, Amount>> {
        let balances = try_join_all(
            tokens
                .iter()
                .map(|token| async move { self.get_balance(address, token).await }),
        )
        .await?;
        Ok(tokens.iter().cloned().zip(balances).collect())
    }

    async fn get_xcall_fee(
        &self,
        destination: ChainId,
        rollback: bool,
        sources: &[String],
    ) -> XCallResult<Amount> {
        let data = [
            id("getFee(string,bool,string[])").to_vec(),
            abi::encode(&[
                Token::String(destination.network_id().to_string()),
                Token::Bool(rollback),
                Token::Array(sources.iter().cloned().map(Token::String).collect()),
            ]),
        ]
        .concat();
        let output = self.eth_call(self.xcall_address, data).await?;
        u256_to_amount(decode_uint(&output)?)
    }

    async fn get_block_height(&self) -> XCallResult<u64> {
        let height = self
            .provider
            .get_block_number()
            .await
            .map_err(map_provider_err)?;
        Ok(height.as_u64())
    }

    async fn get_block(&self, height: u64) -> XCallResult<RawBlock> {
        let block = self
            .provider
            .get_block(height)
            .await
            .map_err(map_provider_err)?
            .ok_or_else(|| XCallError::InvalidResponse(format!("no block at height {height}")))?;
        let hash = block.hash.map(|h| format!("{h:#x}")).unwrap_or_default();
        let raw = serde_json::to_value(&block)
            .map_err(|e| XCallError::SerializationError(e.to_string()))?;
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
        let filter = Filter::new()
            .address(self.xcall_address)
            .from_block(BlockNumber::Number(start_block.into()))
            .to_block(BlockNumber::Number(end_block.into()));
        let logs = self
            .provider
            .get_logs(&filter)
            .await
            .map_err(map_provider_err)
            .tap_err(|e| debug!("[{}] get_logs failed: {e}", self.chain))?;
        let parsed = logs
            .iter()
            .map(|log| events::evm::parse_event_log(self.chain, log));
        let kept = keep_known_events(self.chain, parsed, self.metrics.as_deref());
        if let Some(m) = &self.metrics {
            m.events_received
                .with_label_values(&[&self.chain.to_string()])
                .inc_by(kept.len() as u64);
        }
        Ok(kept)
    }

    async fn get_tx_receipt(&self, tx_hash: &str) -> XCallResult<RawReceipt> {
        let hash = H256::from_str(tx_hash)
            .map_err(|e| XCallError::InvalidIntent(format!("bad tx hash {tx_hash:?}: {e}")))?;
        fetch_receipt_with_retry(
            tx_hash,
            self.receipt_attempts,
            self.receipt_interval,
            self.metrics.as_deref(),
            || async {
                let receipt = self
                    .provider
                    .get_transaction_receipt(hash)
                    .await
                    .map_err(map_provider_err)?;
                match receipt {
                    // A receipt without a block number is still pending
                    Some(r) if r.block_number.is_some() => Ok(Some(RawReceipt {
                        tx_hash: format!("{:?}", r.transaction_hash),
                        block_number: r.block_number.map(|n| n.as_u64()).unwrap_or_default(),
                        raw: serde_json::to_value(&r)
                            .map_err(|e| XCallError::SerializationError(e.to_string()))?,
                    })),
                    _ => Ok(None),
                }
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

pub struct EvmWalletClient {
    chain: ChainId,
    provider: Provider<Http>,
    xcall_address: Address,
    signer: Arc<dyn TransactionSigner>,
    connections: Connections,
}

impl EvmWalletClient {
    pub fn new(
        config: &ChainConfig,
        signer: Arc<dyn TransactionSigner>,
        connections: Connections,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            chain: config.chain_id,
            provider: Provider::<Http>::try_from(config.rpc_url.as_str())?,
            xcall_address: Address::from_str(&config.xcall_address)?,
            signer,
            connections,
        })
    }
}

#[async_trait]
impl WalletClient for EvmWalletClient {
    fn chain_id(&self) -> ChainId {
        self.chain
    }

    async fn approve(
        &self,
        token: &str,
        spender: &str,
        amount: Amount,
    ) -> XCallResult<Option<String>> {
        if token == NATIVE_TOKEN {
            return Ok(None);
        }
        let data = [
            id("approve(address,uint256)").to_vec(),
            abi::encode(&[
                Token::Address(parse_address(spender)?),
                Token::Uint(U256::from(amount.value())),
            ]),
        ]
        .concat();
        let request = SigningRequest {
            chain: self.chain,
            from: self.signer.address(),
            to: token.to_string(),
            value: Amount::ZERO,
            data,
            method: Some("approve".to_string()),
        };
        Ok(Some(self.signer.sign_and_submit(&request).await?))
    }

    async fn execute_transaction(&self, intent: &TransactionIntent) -> XCallResult<String> {
        intent.validate()?;
        let payload = encoding::encode_intent_payload(intent, &self.connections)?;
        let fee = intent.xcall_fee.for_intent(intent.intent_type);
        // Bridge transfers are fire-and-forget; everything else carries the
        // payload again as rollback data
        let rollback = if intent.intent_type == XTransactionType::Bridge {
            Vec::new()
        } else {
            payload.clone()
        };
        let calldata = [
            id("sendCallMessage(string,bytes,bytes)").to_vec(),
            abi::encode(&[
                Token::String(intent.receiver_address()),
                Token::Bytes(payload),
                Token::Bytes(rollback),
            ]),
        ]
        .concat();

        let from = parse_address(&self.signer.address())?;
        let balance = self
            .provider
            .get_balance(from, None)
            .await
            .map_err(map_provider_err)?;
        if balance < U256::from(fee.value()) {
            return Err(XCallError::InsufficientFunds(format!(
                "native balance {balance} below fee {}",
                fee.value()
            )));
        }

        let preflight = TransactionRequest::new()
            .from(from)
            .to(self.xcall_address)
            .value(U256::from(fee.value()))
            .data(calldata.clone());
        self.provider
            .call(&preflight.into(), None)
            .await
            .map_err(|e| XCallError::SimulationFailed(e.to_string()))?;

        let request = SigningRequest {
            chain: self.chain,
            from: self.signer.address(),
            to: format!("{:?}", self.xcall_address),
            value: fee,
            data: calldata,
            method: Some("sendCallMessage".to_string()),
        };
        self.signer.sign_and_submit(&request).await
    }
}
