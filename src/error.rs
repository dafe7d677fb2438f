// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::types::ChainId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum XCallError {
    // Caller built an intent missing a required field. Never retried.
    #[error("invalid transaction intent: {0}")]
    InvalidIntent(String),
    // A log from the cross-call contract did not match any known signature.
    // Indicates a missing adapter feature, not a transient condition.
    #[error("unknown event type: {0}")]
    UnknownEventType(String),
    // Receipt not available after the bounded retry budget
    #[error("receipt for tx {0} not found after retry budget")]
    ReceiptTimeout(String),
    // The referenced transaction does not exist
    #[error("transaction not found: {0}")]
    TxNotFound(String),
    #[error("no balance for {0}")]
    BalanceNotFound(String),
    // Pre-flight simulation rejected the transaction
    #[error("simulation failed: {0}")]
    SimulationFailed(String),
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),
    // Wallet rejected the signature or the RPC rejected the submission
    #[error("submission failed: {0}")]
    SubmissionFailed(String),
    // No adapter registered for this chain
    #[error("chain {0} is not configured")]
    UnsupportedChain(ChainId),
    // Transient RPC/transport error, safe to retry
    #[error("transient provider error: {0}")]
    TransientProviderError(String),
    #[error("provider error: {0}")]
    ProviderError(String),
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
    #[error("storage error: {0}")]
    StorageError(String),
    #[error("serialization error: {0}")]
    SerializationError(String),
    #[error("transaction {0} not in store")]
    TransactionNotInStore(String),
    #[error("{0}")]
    Generic(String),
}

impl XCallError {
    /// Returns a short string identifying the error type for metrics labels
    pub fn error_type(&self) -> &'static str {
        match self {
            XCallError::InvalidIntent(_) => "invalid_intent",
            XCallError::UnknownEventType(_) => "unknown_event_type",
            XCallError::ReceiptTimeout(_) => "receipt_timeout",
            XCallError::TxNotFound(_) => "tx_not_found",
            XCallError::BalanceNotFound(_) => "balance_not_found",
            XCallError::SimulationFailed(_) => "simulation_failed",
            XCallError::InsufficientFunds(_) => "insufficient_funds",
            XCallError::SubmissionFailed(_) => "submission_failed",
            XCallError::UnsupportedChain(_) => "unsupported_chain",
            XCallError::TransientProviderError(_) => "transient_provider_error",
            XCallError::ProviderError(_) => "provider_error",
            XCallError::InvalidResponse(_) => "invalid_response",
            XCallError::StorageError(_) => "storage_error",
            XCallError::SerializationError(_) => "serialization_error",
            XCallError::TransactionNotInStore(_) => "transaction_not_in_store",
            XCallError::Generic(_) => "generic",
        }
    }

    /// Whether this error is recoverable (should retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            XCallError::TransientProviderError(_) | XCallError::TxNotFound(_)
        )
    }
}

pub type XCallResult<T> = Result<T, XCallError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_type_valid_prometheus_labels() {
        let errors_to_test = vec![
            XCallError::InvalidIntent("test".to_string()),
            XCallError::UnknownEventType("test".to_string()),
            XCallError::ReceiptTimeout("0xabc".to_string()),
            XCallError::UnsupportedChain(ChainId::Solana),
            XCallError::TransientProviderError("test".to_string()),
            XCallError::TransactionNotInStore("icon/0x1".to_string()),
            XCallError::Generic("test".to_string()),
        ];

        for error in errors_to_test {
            let error_type = error.error_type();
            assert!(!error_type.is_empty(), "error_type should not be empty");
            for c in error_type.chars() {
                assert!(
                    c.is_ascii_lowercase() || c == '_',
                    "error_type '{}' contains invalid character '{}' for Prometheus label",
                    error_type,
                    c
                );
            }
            assert!(!error_type.starts_with('_'));
            assert!(!error_type.ends_with('_'));
        }
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(XCallError::TransientProviderError("timeout".into()).is_recoverable());
        assert!(XCallError::TxNotFound("0xabc".into()).is_recoverable());
        assert!(!XCallError::InvalidIntent("missing trade".into()).is_recoverable());
        assert!(!XCallError::UnknownEventType("Foo(int)".into()).is_recoverable());
        assert!(!XCallError::ReceiptTimeout("0xabc".into()).is_recoverable());
    }
}
