// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Chain adapter contracts.
//!
//! `PublicClient` is the read-only capability set (balances, blocks,
//! event logs, fees, receipts); `WalletClient` constructs and submits the
//! chain-native transaction behind a uniform intent. The tracker and
//! store depend only on these traits. Concrete adapters exist per chain
//! family and are owned by [`ChainRegistry`], constructed once at startup
//! and passed by handle to consumers.

use crate::config::{ChainConfig, XCallConfig};
use crate::error::{XCallError, XCallResult};
use crate::events::ChainEvent;
use crate::metrics::XCallMetrics;
use crate::types::{Amount, ChainFamily, ChainId, TransactionIntent, TxStatus};
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub mod cosmos;
pub mod evm;
pub mod goloop;

pub use cosmos::{CosmosPublicClient, CosmosWalletClient};
pub use evm::{EvmPublicClient, EvmWalletClient};
pub use goloop::{GoloopPublicClient, GoloopWalletClient};

/// Token identifier for a chain's native asset in balance and approval
/// calls.
pub const NATIVE_TOKEN: &str = "native";

/// A chain's transaction receipt before any status interpretation. The
/// success discriminant lives in `derive_tx_status`, which knows each
/// chain's shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReceipt {
    pub tx_hash: String,
    pub block_number: u64,
    pub raw: serde_json::Value,
}

/// One block, header-level only. `raw` keeps the chain's native body for
/// callers that need more than the height and hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock {
    pub number: u64,
    pub hash: String,
    pub raw: serde_json::Value,
}

#[async_trait]
pub trait PublicClient: Send + Sync {
    fn chain_id(&self) -> ChainId;

    /// Upper bound on the block range one polling tick may scan.
    fn scan_block_count(&self) -> u64;

    async fn get_balance(&self, address: &str, token: &str) -> XCallResult<Amount>;

    /// Sequential by default; adapters batch where the chain supports it.
    async fn get_balances(
        &self,
        address: &str,
        tokens: &[String],
    ) -> XCallResult<HashMap<String, Amount>> {
        let mut balances = HashMap::with_capacity(tokens.len());
        for token in tokens {
            balances.insert(token.clone(), self.get_balance(address, token).await?);
        }
        Ok(balances)
    }

    /// Query the deployed cross-call contract's fee view function.
    async fn get_xcall_fee(
        &self,
        destination: ChainId,
        rollback: bool,
        sources: &[String],
    ) -> XCallResult<Amount>;

    async fn get_block_height(&self) -> XCallResult<u64>;

    /// Fetch one block by height.
    async fn get_block(&self, height: u64) -> XCallResult<RawBlock>;

    /// Fetch raw logs in `[start_block, end_block]` (inclusive) from the
    /// cross-call contract and normalize them. Logs that are unknown or
    /// unparseable are skipped with a logged marker; they never abort the
    /// rest of the batch.
    async fn get_event_logs(
        &self,
        start_block: u64,
        end_block: u64,
    ) -> XCallResult<Vec<ChainEvent>>;

    /// Fetch a receipt with the chain's bounded retry budget. Exhausting
    /// the budget is a `ReceiptTimeout`, never silently success/failure.
    async fn get_tx_receipt(&self, tx_hash: &str) -> XCallResult<RawReceipt>;

    fn derive_tx_status(&self, receipt: &RawReceipt) -> TxStatus;
}

/// Everything a signer needs to produce and broadcast one chain-native
/// transaction. Threaded explicitly from submit to signing; there is no
/// ambient signing state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningRequest {
    pub chain: ChainId,
    pub from: String,
    /// Contract address receiving the call
    pub to: String,
    /// Native value attached (the cross-call fee)
    pub value: Amount,
    /// Call data / payload envelope
    pub data: Vec<u8>,
    /// Contract method name, for chains where calls are method-addressed
    pub method: Option<String>,
}

#[async_trait]
pub trait TransactionSigner: Send + Sync {
    fn address(&self) -> String;

    /// Sign and broadcast; returns the transaction hash. A wallet
    /// rejection or RPC submission failure is a `SubmissionFailed`.
    async fn sign_and_submit(&self, request: &SigningRequest) -> XCallResult<String>;
}

#[async_trait]
pub trait WalletClient: Send + Sync {
    fn chain_id(&self) -> ChainId;

    /// Token allowance grant. `Ok(None)` on chains without an allowance
    /// model.
    async fn approve(
        &self,
        token: &str,
        spender: &str,
        amount: Amount,
    ) -> XCallResult<Option<String>>;

    /// Validate, encode, pre-flight and submit an intent. Returns the
    /// source-chain transaction hash; finality is the tracker's job.
    async fn execute_transaction(&self, intent: &TransactionIntent) -> XCallResult<String>;
}

/// Per-chain client handles, created once and shared read-only across all
/// pollers for that chain.
#[derive(Default)]
pub struct ChainRegistry {
    public: HashMap<ChainId, Arc<dyn PublicClient>>,
    wallet: HashMap<ChainId, Arc<dyn WalletClient>>,
    configs: HashMap<ChainId, ChainConfig>,
}

impl ChainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(
        config: &XCallConfig,
        metrics: Option<Arc<XCallMetrics>>,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let mut registry = Self::new();
        for chain_config in &config.chains {
            let client: Arc<dyn PublicClient> = match chain_config.chain_id.family() {
                ChainFamily::Evm => {
                    Arc::new(EvmPublicClient::new(chain_config, metrics.clone())?)
                }
                ChainFamily::Goloop => {
                    Arc::new(GoloopPublicClient::new(chain_config, metrics.clone()))
                }
                ChainFamily::Cosmos => {
                    Arc::new(CosmosPublicClient::new(chain_config, metrics.clone()))
                }
                // validate() rejects these up front
                other => anyhow::bail!("no adapter wired for chain family {other}"),
            };
            registry.configs.insert(chain_config.chain_id, chain_config.clone());
            registry.public.insert(chain_config.chain_id, client);
        }
        Ok(registry)
    }

    pub fn register_public(&mut self, client: Arc<dyn PublicClient>) {
        self.public.insert(client.chain_id(), client);
    }

    pub fn register_wallet(&mut self, client: Arc<dyn WalletClient>) {
        self.wallet.insert(client.chain_id(), client);
    }

    pub fn register_config(&mut self, config: ChainConfig) {
        self.configs.insert(config.chain_id, config);
    }

    pub fn public(&self, chain: ChainId) -> XCallResult<Arc<dyn PublicClient>> {
        self.public
            .get(&chain)
            .cloned()
            .ok_or(XCallError::UnsupportedChain(chain))
    }

    pub fn wallet(&self, chain: ChainId) -> XCallResult<Arc<dyn WalletClient>> {
        self.wallet
            .get(&chain)
            .cloned()
            .ok_or(XCallError::UnsupportedChain(chain))
    }

    pub fn config(&self, chain: ChainId) -> Option<&ChainConfig> {
        self.configs.get(&chain)
    }

    pub fn configured_chains(&self) -> Vec<ChainId> {
        let mut chains: Vec<ChainId> = self.public.keys().copied().collect();
        chains.sort();
        chains
    }
}

/// Process-wide HTTP client shared by the JSON-RPC and REST adapters.
/// Pooling stays enabled but is tuned for many concurrent pollers.
pub(crate) fn shared_http_client() -> reqwest::Client {
    static CLIENT: once_cell::sync::OnceCell<reqwest::Client> = once_cell::sync::OnceCell::new();
    CLIENT
        .get_or_init(|| {
            reqwest::Client::builder()
                .pool_max_idle_per_host(64)
                .tcp_keepalive(Some(Duration::from_secs(30)))
                .connect_timeout(Duration::from_secs(2))
                .timeout(Duration::from_secs(30))
                .build()
                .expect("failed to build reqwest client")
        })
        .clone()
}

/// Transport failures only retry when they are transient; everything else
/// is a hard provider error.
pub(crate) fn map_transport_err(err: reqwest::Error) -> XCallError {
    if is_transient_transport_error(&err) {
        XCallError::TransientProviderError(err.to_string())
    } else {
        XCallError::ProviderError(err.to_string())
    }
}

pub(crate) fn is_transient_transport_error(err: &reqwest::Error) -> bool {
    if err.is_connect() || err.is_timeout() {
        return true;
    }
    let msg = err.to_string().to_lowercase();
    msg.contains("connection closed")
        || msg.contains("connection reset")
        || msg.contains("broken pipe")
        || msg.contains("unexpected eof")
        || msg.contains("incomplete")
}

/// Bounded receipt fetch. `fetch` returning `Ok(None)` means the receipt
/// is not yet available; recoverable errors are retried against the same
/// budget. Budget exhaustion surfaces as `ReceiptTimeout`.
pub async fn fetch_receipt_with_retry<F, Fut>(
    tx_hash: &str,
    attempts: u32,
    interval: Duration,
    metrics: Option<&XCallMetrics>,
    mut fetch: F,
) -> XCallResult<RawReceipt>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = XCallResult<Option<RawReceipt>>>,
{
    for attempt in 0..attempts {
        if attempt > 0 {
            tokio::time::sleep(interval).await;
            if let Some(m) = metrics {
                m.receipt_fetch_retries.inc();
            }
        }
        match fetch().await {
            Ok(Some(receipt)) => return Ok(receipt),
            Ok(None) => {
                debug!(
                    "receipt for {} not yet available (attempt {}/{})",
                    tx_hash,
                    attempt + 1,
                    attempts
                );
            }
            Err(e) if e.is_recoverable() => {
                debug!(
                    "transient error fetching receipt for {} (attempt {}/{}): {e}",
                    tx_hash,
                    attempt + 1,
                    attempts
                );
            }
            Err(e) => return Err(e),
        }
    }
    if let Some(m) = metrics {
        m.receipt_timeouts.inc();
    }
    Err(XCallError::ReceiptTimeout(tx_hash.to_string()))
}

/// Keep successfully parsed events; unknown or malformed logs are skipped
/// with a logged marker so one bad log never aborts the batch.
pub(crate) fn keep_known_events(
    chain: ChainId,
    parsed: impl IntoIterator<Item = XCallResult<ChainEvent>>,
    metrics: Option<&XCallMetrics>,
) -> Vec<ChainEvent> {
    let mut events = Vec::new();
    for result in parsed {
        match result {
            Ok(event) => events.push(event),
            Err(e) => {
                warn!("[{chain}] skipping event log: {e}");
                if let Some(m) = metrics {
                    m.unrecognized_events
                        .with_label_values(&[&chain.to_string()])
                        .inc();
                }
            }
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::XCallEvent;

    fn dummy_receipt(hash: &str) -> RawReceipt {
        RawReceipt {
            tx_hash: hash.to_string(),
            block_number: 1,
            raw: serde_json::json!({"status": "0x1"}),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_receipt_retry_succeeds_within_budget() {
        // 9 consecutive misses followed by a success on the 10th attempt
        let mut responses: Vec<XCallResult<Option<RawReceipt>>> = Vec::new();
        for _ in 0..9 {
            responses.push(Ok(None));
        }
        responses.push(Ok(Some(dummy_receipt("0xabc"))));
        let mut responses = responses.into_iter();

        let receipt = fetch_receipt_with_retry(
            "0xabc",
            10,
            Duration::from_secs(1),
            None,
            || std::future::ready(responses.next().unwrap()),
        )
        .await
        .unwrap();
        assert_eq!(receipt.tx_hash, "0xabc");
    }

    #[tokio::test(start_paused = true)]
    async fn test_receipt_retry_exhausts_budget() {
        // More failures than the budget allows: the 11th response is never
        // consulted, the budget of 10 yields a ReceiptTimeout
        let mut responses: Vec<XCallResult<Option<RawReceipt>>> = Vec::new();
        for _ in 0..11 {
            responses.push(Err(XCallError::TransientProviderError("timeout".into())));
        }
        let mut responses = responses.into_iter();

        let err = fetch_receipt_with_retry(
            "0xdef",
            10,
            Duration::from_secs(1),
            None,
            || std::future::ready(responses.next().unwrap()),
        )
        .await
        .unwrap_err();
        assert_eq!(err, XCallError::ReceiptTimeout("0xdef".to_string()));
        // One response left unconsumed
        assert_eq!(responses.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_receipt_retry_fatal_error_propagates() {
        let err = fetch_receipt_with_retry(
            "0x1",
            10,
            Duration::from_secs(1),
            None,
            || std::future::ready(Err(XCallError::ProviderError("bad rpc".into()))),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_type(), "provider_error");
    }

    #[test]
    fn test_keep_known_events_skips_unknown() {
        let ok = ChainEvent {
            chain: ChainId::Icon,
            tx_hash: "0x1".into(),
            block_number: 1,
            event: XCallEvent::RollbackMessage { sn: 1 },
        };
        let parsed = vec![
            Ok(ok.clone()),
            Err(XCallError::UnknownEventType("Transfer(int)".into())),
            Err(XCallError::InvalidResponse("truncated".into())),
        ];
        let kept = keep_known_events(ChainId::Icon, parsed, None);
        assert_eq!(kept, vec![ok]);
    }

    #[test]
    fn test_transport_error_classification() {
        // A builder error is neither a connect nor a timeout failure
        let err = reqwest::Client::new().get("http://[invalid").build().err().unwrap();
        assert!(!is_transient_transport_error(&err));
        let mapped = map_transport_err(err);
        assert!(!mapped.is_recoverable());
        assert_eq!(mapped.error_type(), "provider_error");
    }

    #[tokio::test]
    async fn test_block_lookup_through_registry() {
        let client = Arc::new(crate::test_utils::MockPublicClient::new(ChainId::Icon));
        client.set_height(50);
        let mut registry = ChainRegistry::new();
        registry.register_public(client);
        let public = registry.public(ChainId::Icon).unwrap();
        let block = public.get_block(42).await.unwrap();
        assert_eq!(block.number, 42);
        assert!(public.get_block(51).await.is_err());
    }

    #[test]
    fn test_registry_unconfigured_chain() {
        let registry = ChainRegistry::new();
        // the Ok side is a trait object, so take the error out explicitly
        let err = registry.public(ChainId::Sui).err().unwrap();
        assert_eq!(err, XCallError::UnsupportedChain(ChainId::Sui));
    }
}
