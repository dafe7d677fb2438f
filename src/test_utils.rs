// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Shared fixtures: an intent factory and scriptable chain clients.

use crate::client::{
    fetch_receipt_with_retry, PublicClient, RawBlock, RawReceipt, SigningRequest,
    TransactionSigner, WalletClient,
};
use crate::error::{XCallError, XCallResult};
use crate::events::{ChainEvent, XCallEvent};
use crate::types::{
    Amount, ChainId, Direction, TradeRoute, TransactionIntent, TxStatus, XCallFee,
    XTransactionType,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .with_test_writer()
        .try_init();
}

/// A valid intent of the given type, Icon -> Arbitrum.
pub fn test_intent(intent_type: XTransactionType) -> TransactionIntent {
    let mut intent = TransactionIntent {
        intent_type,
        direction: Direction {
            from: ChainId::Icon,
            to: ChainId::Arbitrum,
        },
        token: "bnUSD".to_string(),
        input_amount: Amount(1_500_000_000_000_000_000),
        execution_trade: None,
        slippage_tolerance: None,
        recipient: None,
        account: "hx9f2bad34ad37e2bad34ad37e2bad34ad37e2bad".to_string(),
        xcall_fee: XCallFee {
            rollback: Amount(20_000_000_000_000_000),
            no_rollback: Amount(10_000_000_000_000_000),
        },
        used_collateral: None,
    };
    match intent_type {
        XTransactionType::Swap => {
            intent.execution_trade = Some(TradeRoute {
                path: vec![
                    "bnUSD".to_string(),
                    "sICX".to_string(),
                    "ETH".to_string(),
                ],
                minimum_receive: Amount(990_000_000_000_000_000),
            });
            intent.slippage_tolerance = Some(50);
        }
        XTransactionType::Bridge => {
            intent.recipient = Some("0x44afc9b34ad37e2bad34ad37e2bad34ad37e2bad".to_string());
        }
        XTransactionType::Deposit
        | XTransactionType::Withdraw
        | XTransactionType::Borrow
        | XTransactionType::Repay => {
            intent.used_collateral = Some("sICX".to_string());
        }
    }
    intent
}

/// Scriptable read side of one chain. Heights, events, fees, balances and
/// receipt responses are all seeded by the test.
pub struct MockPublicClient {
    chain: ChainId,
    height: Mutex<u64>,
    events_by_block: Mutex<BTreeMap<u64, Vec<ChainEvent>>>,
    fees: Mutex<HashMap<bool, Amount>>,
    balances: Mutex<HashMap<(String, String), Amount>>,
    receipts: Mutex<VecDeque<XCallResult<Option<RawReceipt>>>>,
    scan_block_count: u64,
    receipt_attempts: u32,
}

impl MockPublicClient {
    pub fn new(chain: ChainId) -> Self {
        Self {
            chain,
            height: Mutex::new(0),
            events_by_block: Mutex::new(BTreeMap::new()),
            fees: Mutex::new(HashMap::new()),
            balances: Mutex::new(HashMap::new()),
            receipts: Mutex::new(VecDeque::new()),
            scan_block_count: 100,
            receipt_attempts: 10,
        }
    }

    pub fn with_fee(self, rollback: bool, amount: Amount) -> Self {
        self.fees.lock().unwrap().insert(rollback, amount);
        self
    }

    pub fn with_balance(self, address: &str, token: &str, amount: Amount) -> Self {
        self.balances
            .lock()
            .unwrap()
            .insert((address.to_string(), token.to_string()), amount);
        self
    }

    pub fn with_scan_block_count(mut self, count: u64) -> Self {
        self.scan_block_count = count;
        self
    }

    pub fn set_height(&self, height: u64) {
        *self.height.lock().unwrap() = height;
    }

    /// Queue an event at a block; also raises the head to cover it.
    pub fn push_event(&self, block: u64, event: XCallEvent, tx_hash: &str) {
        self.events_by_block
            .lock()
            .unwrap()
            .entry(block)
            .or_default()
            .push(ChainEvent {
                chain: self.chain,
                tx_hash: tx_hash.to_string(),
                block_number: block,
                event,
            });
        let mut height = self.height.lock().unwrap();
        if *height < block {
            *height = block;
        }
    }

    pub fn push_receipt(&self, response: XCallResult<Option<RawReceipt>>) {
        self.receipts.lock().unwrap().push_back(response);
    }

    pub fn push_success_receipt(&self, tx_hash: &str, block_number: u64) {
        self.push_receipt(Ok(Some(RawReceipt {
            tx_hash: tx_hash.to_string(),
            block_number,
            raw: serde_json::json!({ "status": "0x1" }),
        })));
    }

    pub fn push_failure_receipt(&self, tx_hash: &str, block_number: u64) {
        self.push_receipt(Ok(Some(RawReceipt {
            tx_hash: tx_hash.to_string(),
            block_number,
            raw: serde_json::json!({ "status": "0x0" }),
        })));
    }
}

#[async_trait]
impl PublicClient for MockPublicClient {
    fn chain_id(&self) -> ChainId {
        self.chain
    }

    fn scan_block_count(&self) -> u64 {
        self.scan_block_count
    }

    async fn get_balance(&self, address: &str, token: &str) -> XCallResult<Amount> {
        self.balances
            .lock()
            .unwrap()
            .get(&(address.to_string(), token.to_string()))
            .copied()
            .ok_or_else(|| XCallError::BalanceNotFound(token.to_string()))
    }

    async fn get_xcall_fee(
        &self,
        _destination: ChainId,
        rollback: bool,
        _sources: &[String],
    ) -> XCallResult<Amount> {
        self.fees
            .lock()
            .unwrap()
            .get(&rollback)
            .copied()
            .ok_or_else(|| XCallError::ProviderError("fee not scripted".to_string()))
    }

    async fn get_block_height(&self) -> XCallResult<u64> {
        Ok(*self.height.lock().unwrap())
    }

    async fn get_block(&self, height: u64) -> XCallResult<RawBlock> {
        if height > *self.height.lock().unwrap() {
            return Err(XCallError::InvalidResponse(format!(
                "no block at height {height}"
            )));
        }
        Ok(RawBlock {
            number: height,
            hash: format!("0x{height:064x}"),
            raw: serde_json::Value::Null,
        })
    }

    async fn get_event_logs(
        &self,
        start_block: u64,
        end_block: u64,
    ) -> XCallResult<Vec<ChainEvent>> {
        let events = self.events_by_block.lock().unwrap();
        Ok(events
            .range(start_block..=end_block)
            .flat_map(|(_, block_events)| block_events.iter().cloned())
            .collect())
    }

    async fn get_tx_receipt(&self, tx_hash: &str) -> XCallResult<RawReceipt> {
        fetch_receipt_with_retry(
            tx_hash,
            self.receipt_attempts,
            Duration::from_millis(1),
            None,
            || {
                let next = self.receipts.lock().unwrap().pop_front();
                std::future::ready(next.unwrap_or(Ok(None)))
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

/// Scriptable wallet side: submissions succeed with a fixed hash or fail
/// with a queued error.
pub struct MockWalletClient {
    chain: ChainId,
    submissions: Mutex<VecDeque<XCallResult<String>>>,
    pub executed: Mutex<Vec<TransactionIntent>>,
}

impl MockWalletClient {
    pub fn new(chain: ChainId) -> Self {
        Self {
            chain,
            submissions: Mutex::new(VecDeque::new()),
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn push_submission(&self, result: XCallResult<String>) {
        self.submissions.lock().unwrap().push_back(result);
    }
}

#[async_trait]
impl WalletClient for MockWalletClient {
    fn chain_id(&self) -> ChainId {
        self.chain
    }

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
        self.executed.lock().unwrap().push(intent.clone());
        self.submissions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(XCallError::SubmissionFailed("nothing scripted".to_string())))
    }
}

/// Signer that records every request and returns a fixed hash.
pub struct MockSigner {
    address: String,
    pub requests: Mutex<Vec<SigningRequest>>,
    tx_hash: String,
}

impl MockSigner {
    pub fn new(address: &str, tx_hash: &str) -> Self {
        Self {
            address: address.to_string(),
            requests: Mutex::new(Vec::new()),
            tx_hash: tx_hash.to_string(),
        }
    }
}

#[async_trait]
impl TransactionSigner for MockSigner {
    fn address(&self) -> String {
        self.address.clone()
    }

    async fn sign_and_submit(&self, request: &SigningRequest) -> XCallResult<String> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.tx_hash.clone())
    }
}
