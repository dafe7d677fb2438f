// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Persistent transaction store.
//!
//! Holds every tracked transaction in memory behind a single lock and
//! writes the whole set through to a `Storage` backend after each
//! mutation. The store is the only serialization point for transaction
//! state; the tracker and any UI read through it.

use super::types::{XTransaction, XTransactionStatusUpdate};
use crate::error::{XCallError, XCallResult};
use crate::types::{ChainId, TxStatus};
use crate::{STORE_KEY, STORE_VERSION};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Key-value persistence backend. Implementations must be cheap to call
/// from async context; payloads are one JSON document per key.
pub trait Storage: Send + Sync {
    fn load(&self, key: &str) -> XCallResult<Option<String>>;
    fn save(&self, key: &str, value: &str) -> XCallResult<()>;
    fn remove(&self, key: &str) -> XCallResult<()>;
}

/// Volatile backend for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn load(&self, key: &str) -> XCallResult<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| XCallError::StorageError(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> XCallResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| XCallError::StorageError(e.to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> XCallResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| XCallError::StorageError(e.to_string()))?;
        entries.remove(key);
        Ok(())
    }
}

/// One file per key under a base directory.
pub struct FileStorage {
    base_dir: PathBuf,
}

impl FileStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> XCallResult<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)
            .map_err(|e| XCallError::StorageError(e.to_string()))?;
        Ok(Self { base_dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{key}.json"))
    }
}

impl Storage for FileStorage {
    fn load(&self, key: &str) -> XCallResult<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(XCallError::StorageError(e.to_string())),
        }
    }

    fn save(&self, key: &str, value: &str) -> XCallResult<()> {
        std::fs::write(self.path_for(key), value)
            .map_err(|e| XCallError::StorageError(e.to_string()))
    }

    fn remove(&self, key: &str) -> XCallResult<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(XCallError::StorageError(e.to_string())),
        }
    }
}

/// On-disk envelope. A version bump resets the store; accepted data loss,
/// the chains remain the source of truth.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStore {
    version: u32,
    transactions: Vec<XTransaction>,
}

/// In-memory transaction set with write-through persistence.
pub struct XTransactionStore {
    storage: Box<dyn Storage>,
    transactions: RwLock<HashMap<String, XTransaction>>,
}

impl XTransactionStore {
    /// Load the persisted set, or start empty when nothing (or nothing
    /// usable) was persisted.
    pub fn new(storage: Box<dyn Storage>) -> XCallResult<Self> {
        let mut transactions = HashMap::new();
        if let Some(raw) = storage.load(STORE_KEY)? {
            match serde_json::from_str::<PersistedStore>(&raw) {
                Ok(persisted) if persisted.version == STORE_VERSION => {
                    for tx in persisted.transactions {
                        transactions.insert(tx.id.clone(), tx);
                    }
                }
                Ok(persisted) => {
                    warn!(
                        "store version {} != {}, resetting",
                        persisted.version, STORE_VERSION
                    );
                }
                Err(e) => {
                    warn!("unreadable store, resetting: {e}");
                }
            }
        }
        Ok(Self {
            storage,
            transactions: RwLock::new(transactions),
        })
    }

    async fn persist(&self, transactions: &HashMap<String, XTransaction>) -> XCallResult<()> {
        let mut sorted: Vec<XTransaction> = transactions.values().cloned().collect();
        sorted.sort_by(|a, b| a.id.cmp(&b.id));
        let persisted = PersistedStore {
            version: STORE_VERSION,
            transactions: sorted,
        };
        let raw = serde_json::to_string(&persisted)
            .map_err(|e| XCallError::SerializationError(e.to_string()))?;
        self.storage.save(STORE_KEY, &raw)
    }

    /// Insert a new transaction. Re-adding an existing id is a no-op.
    pub async fn add(&self, transaction: XTransaction) -> XCallResult<()> {
        let mut transactions = self.transactions.write().await;
        if transactions.contains_key(&transaction.id) {
            debug!("transaction {} already tracked", transaction.id);
            return Ok(());
        }
        transactions.insert(transaction.id.clone(), transaction);
        self.persist(&transactions).await
    }

    pub async fn get(&self, id: &str) -> Option<XTransaction> {
        self.transactions.read().await.get(id).cloned()
    }

    pub async fn get_all(&self) -> Vec<XTransaction> {
        let mut all: Vec<XTransaction> =
            self.transactions.read().await.values().cloned().collect();
        all.sort_by(|a, b| b.sort_timestamp_ms().cmp(&a.sort_timestamp_ms()));
        all
    }

    pub async fn count(&self) -> usize {
        self.transactions.read().await.len()
    }

    /// Mark a transaction successful. Terminal statuses are final; the
    /// call is then a no-op.
    pub async fn success(&self, id: &str) -> XCallResult<()> {
        self.set_status(id, TxStatus::Success).await
    }

    /// Mark a transaction failed. Terminal statuses are final.
    pub async fn fail(&self, id: &str) -> XCallResult<()> {
        self.set_status(id, TxStatus::Failure).await
    }

    async fn set_status(&self, id: &str, status: TxStatus) -> XCallResult<()> {
        let mut transactions = self.transactions.write().await;
        let tx = transactions
            .get_mut(id)
            .ok_or_else(|| XCallError::TransactionNotInStore(id.to_string()))?;
        if tx.status.is_terminal() {
            debug!("transaction {id} already {}, ignoring {status}", tx.status);
            return Ok(());
        }
        tx.status = status;
        self.persist(&transactions).await
    }

    pub async fn remove(&self, id: &str) -> XCallResult<()> {
        let mut transactions = self.transactions.write().await;
        if transactions.remove(id).is_none() {
            return Ok(());
        }
        self.persist(&transactions).await
    }

    /// Mutate a transaction's messages and re-derive its status. A
    /// terminal status is never overwritten by derivation. Returns the
    /// statuses before and after so callers can act on the edge.
    pub async fn with_transaction_mut<F>(
        &self,
        id: &str,
        mutate: F,
    ) -> XCallResult<XTransactionStatusUpdate>
    where
        F: FnOnce(&mut XTransaction),
    {
        let mut transactions = self.transactions.write().await;
        let tx = transactions
            .get_mut(id)
            .ok_or_else(|| XCallError::TransactionNotInStore(id.to_string()))?;
        let before = tx.status;
        mutate(tx);
        if !before.is_terminal() {
            tx.status = tx.derive_status();
        }
        let after = tx.status;
        self.persist(&transactions).await?;
        Ok(XTransactionStatusUpdate { before, after })
    }

    /// Transactions still worth polling: everything not yet terminal.
    pub async fn get_tracking_transactions(&self) -> Vec<XTransaction> {
        self.transactions
            .read()
            .await
            .values()
            .filter(|tx| tx.status == TxStatus::Pending)
            .cloned()
            .collect()
    }

    /// The user-facing pending view: everything that has not succeeded,
    /// restricted to chains the user holds a signed wallet for, newest
    /// first by primary source timestamp.
    pub async fn get_pending_transactions(&self, signed_chains: &[ChainId]) -> Vec<XTransaction> {
        let mut pending: Vec<XTransaction> = self
            .transactions
            .read()
            .await
            .values()
            .filter(|tx| {
                tx.status != TxStatus::Success && signed_chains.contains(&tx.source_chain)
            })
            .cloned()
            .collect();
        pending.sort_by(|a, b| b.sort_timestamp_ms().cmp(&a.sort_timestamp_ms()));
        pending
    }

    /// Whether any in-flight message references `chain`. Pollers skip
    /// chains nothing is waiting on.
    pub async fn chain_has_inflight(&self, chain: ChainId) -> bool {
        self.transactions
            .read()
            .await
            .values()
            .any(|tx| tx.status == TxStatus::Pending && tx.touches_chain(chain))
    }
}
