// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Cross-chain message lifecycle tracker.
//!
//! Submits intents through the wallet layer, then advances each
//! transaction's messages by polling the chains they touch. One cursor
//! per chain marks the last scanned block; each tick fetches the next
//! slice of logs, in block order, and correlates them against in-flight
//! messages by tx hash, `sn` and `reqId`. Correlation never assumes
//! cross-chain ordering; a rollback observed before the failure it
//! compensates still lands correctly.

use super::store::XTransactionStore;
use super::types::{SourceTransaction, XMessage, XMessageStatus, XTransaction};
use crate::client::ChainRegistry;
use crate::error::{XCallError, XCallResult};
use crate::events::{ChainEvent, XCallEvent, CODE_SUCCESS};
use crate::metrics::XCallMetrics;
use crate::types::{ChainId, TransactionIntent, TxStatus};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What an observed event means for the matched message.
#[derive(Debug, Clone, Copy)]
enum MessageUpdate {
    Sent { sn: u64 },
    Delivered { req_id: u64 },
    Executed { success: bool },
    Failed,
    RollbackExecuted,
}

pub struct MessageTracker {
    registry: Arc<ChainRegistry>,
    store: Arc<XTransactionStore>,
    /// Last scanned block per chain
    cursors: RwLock<HashMap<ChainId, u64>>,
    metrics: Option<Arc<XCallMetrics>>,
}

impl MessageTracker {
    pub fn new(
        registry: Arc<ChainRegistry>,
        store: Arc<XTransactionStore>,
        metrics: Option<Arc<XCallMetrics>>,
    ) -> Self {
        Self {
            registry,
            store,
            cursors: RwLock::new(HashMap::new()),
            metrics,
        }
    }

    pub fn store(&self) -> &Arc<XTransactionStore> {
        &self.store
    }

    /// Submit an intent on its source chain and start tracking it. A
    /// submission failure surfaces here and nothing is recorded.
    pub async fn submit(&self, intent: &TransactionIntent) -> XCallResult<XTransaction> {
        let wallet = self.registry.wallet(intent.direction.from)?;
        let tx_hash = wallet.execute_transaction(intent).await?;
        let now_ms = unix_time_ms();
        let transaction = new_transaction(intent, &tx_hash, now_ms);
        self.track(transaction.clone()).await?;
        info!(
            "[{}] submitted {} as {}",
            intent.direction.from, intent.intent_type, transaction.id
        );
        Ok(transaction)
    }

    /// Start tracking an already-submitted transaction. The record lands
    /// in the store first; cursor initialization for the touched chains
    /// is best effort, `tick_chain` re-initializes on demand. A cursor
    /// failure must never drop a transaction that already hit the chain.
    pub async fn track(&self, transaction: XTransaction) -> XCallResult<()> {
        let chains = [transaction.source_chain, transaction.destination_chain];
        self.store.add(transaction).await?;
        for chain in chains {
            if let Err(e) = self.init_cursor(chain).await {
                warn!("[{chain}] cursor init deferred: {e}");
            }
        }
        Ok(())
    }

    /// Pins a fresh cursor just before the current head so the emission
    /// itself is still in scan range.
    async fn init_cursor(&self, chain: ChainId) -> XCallResult<()> {
        if self.cursors.read().await.contains_key(&chain) {
            return Ok(());
        }
        let head = self.registry.public(chain)?.get_block_height().await?;
        let mut cursors = self.cursors.write().await;
        cursors.entry(chain).or_insert(head.saturating_sub(1));
        Ok(())
    }

    /// Check the primary submission's receipt. A reverted submission
    /// fails the transaction; a receipt that never materializes within
    /// the retry budget surfaces as `ReceiptTimeout`.
    pub async fn confirm_submission(&self, transaction_id: &str) -> XCallResult<TxStatus> {
        let transaction = self
            .store
            .get(transaction_id)
            .await
            .ok_or_else(|| XCallError::TransactionNotInStore(transaction_id.to_string()))?;
        let primary_hash = transaction
            .primary()
            .map(|m| m.source_transaction.hash.clone())
            .ok_or_else(|| XCallError::TransactionNotInStore(transaction_id.to_string()))?;

        let client = self.registry.public(transaction.source_chain)?;
        let receipt = client.get_tx_receipt(&primary_hash).await?;
        let status = client.derive_tx_status(&receipt);
        if status == TxStatus::Failure {
            warn!(
                "[{}] submission {} reverted",
                transaction.source_chain, primary_hash
            );
            let update = self
                .store
                .with_transaction_mut(transaction_id, |tx| {
                    for m in &mut tx.messages {
                        if m.is_primary {
                            m.advance(XMessageStatus::Failed);
                        }
                    }
                })
                .await?;
            self.note_finalized(update.finalized());
        }
        Ok(status)
    }

    /// Advance whichever in-flight message this observation belongs to.
    /// Returns whether a message changed state. Events for transactions
    /// we do not track are ignored; the contracts are shared.
    pub async fn apply_event(&self, observed: &ChainEvent) -> XCallResult<bool> {
        let chain = observed.chain;
        let located = match &observed.event {
            XCallEvent::CallMessageSent { sn, .. } => {
                let sn = *sn;
                let tx_hash = observed.tx_hash.to_lowercase();
                self.find_message(|m| {
                    m.source_chain == chain
                        && m.source_transaction.hash.to_lowercase() == tx_hash
                        && (m.sn.is_none() || m.sn == Some(sn))
                })
                .await
                .map(|loc| (loc, MessageUpdate::Sent { sn }))
            }
            XCallEvent::CallMessage { sn, req_id, .. } => {
                let (sn, req_id) = (*sn, *req_id);
                self.find_message(|m| m.destination_chain == chain && m.sn == Some(sn))
                    .await
                    .map(|loc| (loc, MessageUpdate::Delivered { req_id }))
            }
            XCallEvent::CallExecuted { req_id, code, .. } => {
                let (req_id, code) = (*req_id, *code);
                self.find_message(|m| m.destination_chain == chain && m.req_id == Some(req_id))
                    .await
                    .map(|loc| {
                        (
                            loc,
                            MessageUpdate::Executed {
                                success: code == CODE_SUCCESS,
                            },
                        )
                    })
            }
            XCallEvent::ResponseMessage { sn, code } => {
                if *code == CODE_SUCCESS {
                    // Positive acknowledgement; the destination-side
                    // CallExecuted already carries the state change
                    return Ok(false);
                }
                let sn = *sn;
                self.find_message(|m| m.source_chain == chain && m.sn == Some(sn))
                    .await
                    .map(|loc| (loc, MessageUpdate::Failed))
            }
            XCallEvent::RollbackMessage { sn } => {
                let sn = *sn;
                self.find_message(|m| m.source_chain == chain && m.sn == Some(sn))
                    .await
                    .map(|loc| (loc, MessageUpdate::RollbackExecuted))
            }
        };

        let Some(((transaction_id, message_id), update)) = located else {
            debug!(
                "[{chain}] {:?} in {} matches no tracked message",
                observed.event.event_type(),
                observed.tx_hash
            );
            return Ok(false);
        };

        let mut changed = false;
        let status_update = self
            .store
            .with_transaction_mut(&transaction_id, |tx| {
                let Some(m) = tx.messages.iter_mut().find(|m| m.id == message_id) else {
                    return;
                };
                changed = match update {
                    MessageUpdate::Sent { sn } => {
                        if m.sn.is_none() {
                            m.sn = Some(sn);
                        }
                        m.advance(XMessageStatus::Sent)
                    }
                    MessageUpdate::Delivered { req_id } => {
                        if m.req_id.is_none() {
                            m.req_id = Some(req_id);
                        }
                        m.advance(XMessageStatus::Delivered)
                    }
                    MessageUpdate::Executed { success: true } => {
                        m.advance(XMessageStatus::Executed)
                    }
                    MessageUpdate::Executed { success: false } | MessageUpdate::Failed => {
                        m.advance(XMessageStatus::Failed)
                    }
                    MessageUpdate::RollbackExecuted => {
                        // The failure this compensates may not have been
                        // observed yet
                        m.advance(XMessageStatus::Failed);
                        m.advance(XMessageStatus::RollbackExecuted)
                    }
                };
                if changed {
                    debug!("message {} now {} ({update:?})", m.id, m.status);
                }
            })
            .await?;
        self.note_finalized(status_update.finalized());
        Ok(changed)
    }

    async fn find_message<F>(&self, matches: F) -> Option<(String, String)>
    where
        F: Fn(&XMessage) -> bool,
    {
        for tx in self.store.get_tracking_transactions().await {
            if let Some(m) = tx.messages.iter().find(|m| matches(m)) {
                return Some((tx.id.clone(), m.id.clone()));
            }
        }
        None
    }

    fn note_finalized(&self, finalized: Option<TxStatus>) {
        let Some(status) = finalized else { return };
        if let Some(m) = &self.metrics {
            m.transactions_finalized
                .with_label_values(&[&status.to_string()])
                .inc();
        }
    }

    /// One polling step for one chain: scan the next block slice and
    /// apply whatever it contains. Returns the number of messages
    /// advanced. A failed scan leaves the cursor unmoved; the next tick
    /// re-reads the same range.
    pub async fn tick_chain(&self, chain: ChainId) -> XCallResult<u64> {
        if !self.store.chain_has_inflight(chain).await {
            return Ok(0);
        }
        let client = self.registry.public(chain)?;
        self.init_cursor(chain).await?;
        let head = client.get_block_height().await?;
        let cursor = self
            .cursors
            .read()
            .await
            .get(&chain)
            .copied()
            .unwrap_or(head.saturating_sub(1));
        if head <= cursor {
            return Ok(0);
        }
        let end = head.min(cursor + client.scan_block_count());

        let events = client.get_event_logs(cursor + 1, end).await?;
        let mut advanced = 0;
        for event in &events {
            if self.apply_event(event).await? {
                advanced += 1;
            }
        }

        self.cursors.write().await.insert(chain, end);
        if let Some(m) = &self.metrics {
            m.last_scanned_block
                .with_label_values(&[&chain.to_string()])
                .set(end as i64);
            m.messages_in_flight
                .set(self.in_flight_count().await as i64);
        }
        Ok(advanced)
    }

    async fn in_flight_count(&self) -> usize {
        self.store
            .get_tracking_transactions()
            .await
            .iter()
            .map(|tx| {
                tx.messages
                    .iter()
                    .filter(|m| !m.status.is_terminal())
                    .count()
            })
            .sum()
    }

    /// Age of the oldest in-flight transaction. There is no systemic
    /// delivery timeout; callers that want alerting watch this instead.
    pub async fn oldest_in_flight_ms(&self, now_ms: u64) -> Option<u64> {
        self.store
            .get_tracking_transactions()
            .await
            .iter()
            .map(|tx| now_ms.saturating_sub(tx.created_at_ms))
            .max()
    }

    /// Spawn one polling loop per configured chain. Loops stop on
    /// cancellation; a tick error is logged and retried at the next
    /// interval with the cursor unmoved.
    pub fn run(self: &Arc<Self>, cancel: CancellationToken) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();
        for chain in self.registry.configured_chains() {
            let tracker = self.clone();
            let cancel = cancel.clone();
            let poll_interval = tracker
                .registry
                .config(chain)
                .map(|c| c.poll_interval())
                .unwrap_or(std::time::Duration::from_secs(2));
            handles.push(tokio::spawn(async move {
                let mut interval = tokio::time::interval(poll_interval);
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            info!("[{chain}] poller stopped");
                            return;
                        }
                        _ = interval.tick() => {
                            if let Err(e) = tracker.tick_chain(chain).await {
                                warn!("[{chain}] tick failed: {e}");
                                if let Some(m) = &tracker.metrics {
                                    m.rpc_errors
                                        .with_label_values(&[&chain.to_string(), e.error_type()])
                                        .inc();
                                }
                            }
                        }
                    }
                }
            }));
        }
        handles
    }
}

fn unix_time_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Build the tracking record for a fresh submission: one primary message
/// in `Requested`, sn and reqId unknown until emission is observed.
pub fn new_transaction(intent: &TransactionIntent, tx_hash: &str, now_ms: u64) -> XTransaction {
    let id = XTransaction::make_id(intent.direction.from, tx_hash);
    let primary = XMessage {
        id: format!("{id}/0"),
        transaction_id: id.clone(),
        source_chain: intent.direction.from,
        destination_chain: intent.direction.to,
        source_transaction: SourceTransaction {
            hash: tx_hash.to_string(),
            timestamp_ms: now_ms,
        },
        sn: None,
        req_id: None,
        status: XMessageStatus::Requested,
        is_primary: true,
    };
    XTransaction {
        id: id.clone(),
        intent_type: intent.intent_type,
        source_chain: intent.direction.from,
        destination_chain: intent.direction.to,
        input_amount: intent.input_amount,
        status: TxStatus::Pending,
        created_at_ms: now_ms,
        messages: vec![primary],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{init_test_logging, test_intent, MockPublicClient, MockWalletClient};
    use crate::tracker::store::MemoryStorage;
    use crate::types::XTransactionType;

    struct Harness {
        tracker: Arc<MessageTracker>,
        icon: Arc<MockPublicClient>,
        arbitrum: Arc<MockPublicClient>,
        wallet: Arc<MockWalletClient>,
    }

    fn harness() -> Harness {
        harness_with(MockPublicClient::new(ChainId::Icon))
    }

    fn harness_with(icon: MockPublicClient) -> Harness {
        init_test_logging();
        let icon = Arc::new(icon);
        let arbitrum = Arc::new(MockPublicClient::new(ChainId::Arbitrum));
        let wallet = Arc::new(MockWalletClient::new(ChainId::Icon));
        icon.set_height(100);
        arbitrum.set_height(200);

        let mut registry = ChainRegistry::new();
        registry.register_public(icon.clone());
        registry.register_public(arbitrum.clone());
        registry.register_wallet(wallet.clone());

        let store = Arc::new(
            XTransactionStore::new(Box::new(MemoryStorage::new())).unwrap(),
        );
        let tracker = Arc::new(MessageTracker::new(Arc::new(registry), store, None));
        Harness {
            tracker,
            icon,
            arbitrum,
            wallet,
        }
    }

    async fn submit(h: &Harness, intent_type: XTransactionType) -> XTransaction {
        h.wallet.push_submission(Ok("0xsub".to_string()));
        h.tracker.submit(&test_intent(intent_type)).await.unwrap()
    }

    #[tokio::test]
    async fn test_swap_full_lifecycle_success() {
        let h = harness();
        let tx = submit(&h, XTransactionType::Swap).await;
        assert_eq!(tx.status, TxStatus::Pending);

        h.icon.push_event(
            101,
            XCallEvent::CallMessageSent {
                sn: 7,
                from: "cx1".to_string(),
                to: "0xa4b1.arbitrum/0x2".to_string(),
            },
            "0xsub",
        );
        assert_eq!(h.tracker.tick_chain(ChainId::Icon).await.unwrap(), 1);
        let current = h.tracker.store().get(&tx.id).await.unwrap();
        assert_eq!(current.primary().unwrap().status, XMessageStatus::Sent);
        assert_eq!(current.primary().unwrap().sn, Some(7));
        assert_eq!(current.status, TxStatus::Pending);

        h.arbitrum.push_event(
            201,
            XCallEvent::CallMessage {
                sn: 7,
                req_id: 3,
                from: "0x1.icon/cx1".to_string(),
                to: "0x2".to_string(),
                data: vec![1, 2, 3],
            },
            "0xd1",
        );
        assert_eq!(h.tracker.tick_chain(ChainId::Arbitrum).await.unwrap(), 1);
        let current = h.tracker.store().get(&tx.id).await.unwrap();
        assert_eq!(current.primary().unwrap().status, XMessageStatus::Delivered);
        assert_eq!(current.primary().unwrap().req_id, Some(3));

        h.arbitrum.push_event(
            202,
            XCallEvent::CallExecuted {
                req_id: 3,
                code: CODE_SUCCESS,
                msg: String::new(),
            },
            "0xd2",
        );
        assert_eq!(h.tracker.tick_chain(ChainId::Arbitrum).await.unwrap(), 1);
        let current = h.tracker.store().get(&tx.id).await.unwrap();
        assert_eq!(current.primary().unwrap().status, XMessageStatus::Executed);
        assert_eq!(current.status, TxStatus::Success);
    }

    #[tokio::test]
    async fn test_bridge_execution_failure() {
        let h = harness();
        let tx = submit(&h, XTransactionType::Bridge).await;

        h.icon.push_event(
            101,
            XCallEvent::CallMessageSent {
                sn: 9,
                from: "cx1".to_string(),
                to: "0xa4b1.arbitrum/0x2".to_string(),
            },
            "0xsub",
        );
        h.tracker.tick_chain(ChainId::Icon).await.unwrap();

        h.arbitrum.push_event(
            201,
            XCallEvent::CallMessage {
                sn: 9,
                req_id: 4,
                from: "0x1.icon/cx1".to_string(),
                to: "0x2".to_string(),
                data: vec![],
            },
            "0xd1",
        );
        h.arbitrum.push_event(
            202,
            XCallEvent::CallExecuted {
                req_id: 4,
                code: 1,
                msg: "reverted".to_string(),
            },
            "0xd2",
        );
        assert_eq!(h.tracker.tick_chain(ChainId::Arbitrum).await.unwrap(), 2);

        let current = h.tracker.store().get(&tx.id).await.unwrap();
        assert_eq!(current.primary().unwrap().status, XMessageStatus::Failed);
        assert_eq!(current.status, TxStatus::Failure);
    }

    #[tokio::test]
    async fn test_rollback_after_failure() {
        let h = harness();
        let tx = submit(&h, XTransactionType::Swap).await;

        h.icon.push_event(
            101,
            XCallEvent::CallMessageSent {
                sn: 5,
                from: "cx1".to_string(),
                to: "0xa4b1.arbitrum/0x2".to_string(),
            },
            "0xsub",
        );
        h.tracker.tick_chain(ChainId::Icon).await.unwrap();

        // Rollback observed on the source without ever seeing the
        // destination-side failure; interleaving must not matter
        h.icon.push_event(102, XCallEvent::RollbackMessage { sn: 5 }, "0xr1");
        assert_eq!(h.tracker.tick_chain(ChainId::Icon).await.unwrap(), 1);

        let current = h.tracker.store().get(&tx.id).await.unwrap();
        assert_eq!(
            current.primary().unwrap().status,
            XMessageStatus::RollbackExecuted
        );
        assert_eq!(current.status, TxStatus::Failure);
    }

    #[tokio::test]
    async fn test_negative_response_fails_message() {
        let h = harness();
        let tx = submit(&h, XTransactionType::Swap).await;

        h.icon.push_event(
            101,
            XCallEvent::CallMessageSent {
                sn: 2,
                from: "cx1".to_string(),
                to: "0xa4b1.arbitrum/0x2".to_string(),
            },
            "0xsub",
        );
        h.icon
            .push_event(102, XCallEvent::ResponseMessage { sn: 2, code: -1 }, "0xr");
        assert_eq!(h.tracker.tick_chain(ChainId::Icon).await.unwrap(), 2);
        let current = h.tracker.store().get(&tx.id).await.unwrap();
        assert_eq!(current.status, TxStatus::Failure);
    }

    #[tokio::test]
    async fn test_duplicate_event_is_noop() {
        let h = harness();
        let tx = submit(&h, XTransactionType::Swap).await;

        let sent = ChainEvent {
            chain: ChainId::Icon,
            tx_hash: "0xsub".to_string(),
            block_number: 101,
            event: XCallEvent::CallMessageSent {
                sn: 7,
                from: "cx1".to_string(),
                to: "0xa4b1.arbitrum/0x2".to_string(),
            },
        };
        assert!(h.tracker.apply_event(&sent).await.unwrap());
        assert!(!h.tracker.apply_event(&sent).await.unwrap());
        let current = h.tracker.store().get(&tx.id).await.unwrap();
        assert_eq!(current.primary().unwrap().status, XMessageStatus::Sent);
    }

    #[tokio::test]
    async fn test_duplicate_executed_event_is_noop() {
        let h = harness();
        let tx = submit(&h, XTransactionType::Swap).await;

        h.icon.push_event(
            101,
            XCallEvent::CallMessageSent {
                sn: 7,
                from: "cx1".to_string(),
                to: "0xa4b1.arbitrum/0x2".to_string(),
            },
            "0xsub",
        );
        h.tracker.tick_chain(ChainId::Icon).await.unwrap();
        h.arbitrum.push_event(
            201,
            XCallEvent::CallMessage {
                sn: 7,
                req_id: 3,
                from: "0x1.icon/cx1".to_string(),
                to: "0x2".to_string(),
                data: vec![],
            },
            "0xd1",
        );
        h.tracker.tick_chain(ChainId::Arbitrum).await.unwrap();

        // Overlapping scan ranges can surface the same execution twice
        let executed = ChainEvent {
            chain: ChainId::Arbitrum,
            tx_hash: "0xd2".to_string(),
            block_number: 202,
            event: XCallEvent::CallExecuted {
                req_id: 3,
                code: CODE_SUCCESS,
                msg: String::new(),
            },
        };
        assert!(h.tracker.apply_event(&executed).await.unwrap());
        assert!(!h.tracker.apply_event(&executed).await.unwrap());
        let current = h.tracker.store().get(&tx.id).await.unwrap();
        assert_eq!(current.primary().unwrap().status, XMessageStatus::Executed);
        assert_eq!(current.status, TxStatus::Success);
    }

    #[tokio::test]
    async fn test_unmatched_event_ignored() {
        let h = harness();
        submit(&h, XTransactionType::Swap).await;

        // Someone else's message on the shared contract
        let other = ChainEvent {
            chain: ChainId::Icon,
            tx_hash: "0xother".to_string(),
            block_number: 101,
            event: XCallEvent::CallMessageSent {
                sn: 99,
                from: "cx1".to_string(),
                to: "0xa4b1.arbitrum/0x9".to_string(),
            },
        };
        assert!(!h.tracker.apply_event(&other).await.unwrap());
    }

    #[tokio::test]
    async fn test_submission_error_records_nothing() {
        let h = harness();
        h.wallet
            .push_submission(Err(XCallError::SimulationFailed("revert".to_string())));
        let err = h.tracker.submit(&test_intent(XTransactionType::Swap)).await;
        assert!(matches!(err, Err(XCallError::SimulationFailed(_))));
        assert_eq!(h.tracker.store().count().await, 0);
    }

    #[tokio::test]
    async fn test_submission_recorded_when_destination_unreachable() {
        init_test_logging();
        let icon = Arc::new(MockPublicClient::new(ChainId::Icon));
        icon.set_height(100);
        let wallet = Arc::new(MockWalletClient::new(ChainId::Icon));
        let mut registry = ChainRegistry::new();
        registry.register_public(icon);
        registry.register_wallet(wallet.clone());
        let store = Arc::new(
            XTransactionStore::new(Box::new(MemoryStorage::new())).unwrap(),
        );
        let tracker = MessageTracker::new(Arc::new(registry), store, None);

        // No client registered for the destination chain: cursor init for
        // Arbitrum fails, but the submitted transaction must be recorded
        wallet.push_submission(Ok("0xsub".to_string()));
        let tx = tracker
            .submit(&test_intent(XTransactionType::Swap))
            .await
            .unwrap();
        assert_eq!(wallet.executed.lock().unwrap().len(), 1);
        assert_eq!(tracker.store().count().await, 1);
        assert!(tracker.store().get(&tx.id).await.is_some());
    }

    #[tokio::test]
    async fn test_confirm_submission_revert_fails_transaction() {
        let h = harness();
        let tx = submit(&h, XTransactionType::Bridge).await;
        h.icon.push_failure_receipt("0xsub", 101);

        let status = h.tracker.confirm_submission(&tx.id).await.unwrap();
        assert_eq!(status, TxStatus::Failure);
        let current = h.tracker.store().get(&tx.id).await.unwrap();
        assert_eq!(current.status, TxStatus::Failure);
        assert_eq!(current.primary().unwrap().status, XMessageStatus::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirm_submission_receipt_timeout() {
        let h = harness();
        let tx = submit(&h, XTransactionType::Bridge).await;
        // Receipt queue left empty: every attempt comes back not-found
        let err = h.tracker.confirm_submission(&tx.id).await.unwrap_err();
        assert_eq!(err, XCallError::ReceiptTimeout("0xsub".to_string()));
    }

    #[tokio::test]
    async fn test_tick_skips_chain_without_inflight() {
        let h = harness();
        // Nothing tracked touches Havah; no client is even registered
        assert_eq!(h.tracker.tick_chain(ChainId::Havah).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_scan_range_is_limited() {
        let h = harness_with(MockPublicClient::new(ChainId::Icon).with_scan_block_count(10));
        let tx = submit(&h, XTransactionType::Swap).await;

        // Emission lands well past the first slice
        h.icon.push_event(
            150,
            XCallEvent::CallMessageSent {
                sn: 7,
                from: "cx1".to_string(),
                to: "0xa4b1.arbitrum/0x2".to_string(),
            },
            "0xsub",
        );
        // First tick covers [100, 109] only
        assert_eq!(h.tracker.tick_chain(ChainId::Icon).await.unwrap(), 0);
        for _ in 0..4 {
            h.tracker.tick_chain(ChainId::Icon).await.unwrap();
        }
        assert_eq!(h.tracker.tick_chain(ChainId::Icon).await.unwrap(), 1);
        let current = h.tracker.store().get(&tx.id).await.unwrap();
        assert_eq!(current.primary().unwrap().status, XMessageStatus::Sent);
    }

    #[tokio::test]
    async fn test_terminal_transaction_stops_polling() {
        let h = harness();
        let tx = submit(&h, XTransactionType::Bridge).await;
        h.tracker.store().fail(&tx.id).await.unwrap();
        // No in-flight work left on either chain
        assert_eq!(h.tracker.tick_chain(ChainId::Icon).await.unwrap(), 0);
        assert_eq!(h.tracker.tick_chain(ChainId::Arbitrum).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_oldest_in_flight_age() {
        let h = harness();
        assert_eq!(h.tracker.oldest_in_flight_ms(u64::MAX).await, None);
        let tx = submit(&h, XTransactionType::Swap).await;
        let age = h
            .tracker
            .oldest_in_flight_ms(tx.created_at_ms + 5_000)
            .await;
        assert_eq!(age, Some(5_000));
    }
}
