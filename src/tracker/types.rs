// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Message and transaction lifecycle records.

use crate::types::{Amount, ChainId, TxStatus, XTransactionType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The on-chain transaction that produced a message, as observed on its
/// source chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTransaction {
    pub hash: String,
    pub timestamp_ms: u64,
}

/// Lifecycle states of one cross-chain message.
///
/// `Executed` and `RollbackExecuted` are absorbing. `Failed` admits one
/// further hop, to `RollbackExecuted`, once compensation lands on the
/// source chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum XMessageStatus {
    /// Submitted on the source chain, no emission observed yet
    Requested,
    /// CallMessageSent observed on the source chain
    Sent,
    /// CallMessage observed on the destination chain
    Delivered,
    /// CallExecuted observed with a success code
    Executed,
    /// Compensation for a failed message landed on the source chain
    RollbackExecuted,
    /// Execution or delivery failed
    Failed,
}

impl fmt::Display for XMessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            XMessageStatus::Requested => "requested",
            XMessageStatus::Sent => "sent",
            XMessageStatus::Delivered => "delivered",
            XMessageStatus::Executed => "executed",
            XMessageStatus::RollbackExecuted => "rollback-executed",
            XMessageStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl XMessageStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            XMessageStatus::Executed | XMessageStatus::RollbackExecuted
        )
    }

    /// Legal forward edges. Everything not listed is a repeat or
    /// out-of-order observation and must be ignored, never applied.
    pub fn can_transition(self, next: XMessageStatus) -> bool {
        use XMessageStatus::*;
        matches!(
            (self, next),
            (Requested, Sent)
                | (Requested, Failed)
                | (Sent, Delivered)
                | (Sent, Failed)
                | (Delivered, Executed)
                | (Delivered, Failed)
                | (Failed, RollbackExecuted)
        )
    }
}

/// One cross-chain message. A transaction owns one primary message and
/// any number of secondary messages spawned by downstream hops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XMessage {
    pub id: String,
    pub transaction_id: String,
    pub source_chain: ChainId,
    pub destination_chain: ChainId,
    pub source_transaction: SourceTransaction,
    /// Serial number assigned at emission; unknown until CallMessageSent
    pub sn: Option<u64>,
    /// Request id assigned at delivery; unknown until CallMessage
    pub req_id: Option<u64>,
    pub status: XMessageStatus,
    pub is_primary: bool,
}

impl XMessage {
    /// Apply a status observation. Returns whether anything changed;
    /// repeats and out-of-order arrivals are no-ops.
    pub fn advance(&mut self, next: XMessageStatus) -> bool {
        if !self.status.can_transition(next) {
            return false;
        }
        self.status = next;
        true
    }
}

/// Status edge produced by a store mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XTransactionStatusUpdate {
    pub before: TxStatus,
    pub after: TxStatus,
}

impl XTransactionStatusUpdate {
    /// True exactly when this mutation settled the transaction.
    pub fn finalized(&self) -> Option<TxStatus> {
        (!self.before.is_terminal() && self.after.is_terminal()).then_some(self.after)
    }
}

/// One user-facing cross-chain transaction and the messages that carry
/// it. `status` is always derivable from the messages; it is stored so
/// persisted records keep their terminal verdicts across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XTransaction {
    pub id: String,
    pub intent_type: XTransactionType,
    pub source_chain: ChainId,
    pub destination_chain: ChainId,
    pub input_amount: Amount,
    pub status: TxStatus,
    pub created_at_ms: u64,
    pub messages: Vec<XMessage>,
}

impl XTransaction {
    /// Transaction id for a source chain submission.
    pub fn make_id(chain: ChainId, tx_hash: &str) -> String {
        format!("{chain}/{tx_hash}")
    }

    pub fn primary(&self) -> Option<&XMessage> {
        self.messages.iter().find(|m| m.is_primary)
    }

    /// Derive the transaction verdict from its messages.
    ///
    /// Any failed or rolled-back message is a failure. Success requires
    /// the primary message and every secondary to have executed.
    /// Everything else is still pending.
    pub fn derive_status(&self) -> TxStatus {
        let failed = self.messages.iter().any(|m| {
            matches!(
                m.status,
                XMessageStatus::Failed | XMessageStatus::RollbackExecuted
            )
        });
        if failed {
            return TxStatus::Failure;
        }
        match self.primary() {
            Some(primary)
                if primary.status == XMessageStatus::Executed
                    && self
                        .messages
                        .iter()
                        .all(|m| m.status == XMessageStatus::Executed) =>
            {
                TxStatus::Success
            }
            _ => TxStatus::Pending,
        }
    }

    /// Timestamp used for ordering in pending views: the primary
    /// message's source transaction, falling back to creation time.
    pub fn sort_timestamp_ms(&self) -> u64 {
        self.primary()
            .map(|m| m.source_transaction.timestamp_ms)
            .unwrap_or(self.created_at_ms)
    }

    /// Whether any message still references `chain` in a non-absorbed
    /// state.
    pub fn touches_chain(&self, chain: ChainId) -> bool {
        self.messages.iter().any(|m| {
            !m.status.is_terminal()
                && (m.source_chain == chain || m.destination_chain == chain)
        })
    }
}
