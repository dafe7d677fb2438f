// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use prometheus::{
    register_int_counter_vec_with_registry, register_int_counter_with_registry,
    register_int_gauge_vec_with_registry, register_int_gauge_with_registry, IntCounter,
    IntCounterVec, IntGauge, IntGaugeVec, Registry,
};

#[derive(Clone, Debug)]
pub struct XCallMetrics {
    pub(crate) events_received: IntCounterVec,
    pub(crate) unrecognized_events: IntCounterVec,
    pub(crate) rpc_errors: IntCounterVec,
    pub(crate) receipt_fetch_retries: IntCounter,
    pub(crate) receipt_timeouts: IntCounter,
    pub(crate) messages_in_flight: IntGauge,
    pub(crate) last_scanned_block: IntGaugeVec,
    pub(crate) transactions_finalized: IntCounterVec,
}

impl XCallMetrics {
    pub fn new(registry: &Registry) -> Self {
        Self {
            events_received: register_int_counter_vec_with_registry!(
                "xcall_events_received",
                "Total number of normalized cross-call events observed, by chain",
                &["chain"],
                registry,
            )
            .unwrap(),
            unrecognized_events: register_int_counter_vec_with_registry!(
                "xcall_unrecognized_events",
                "Logs from the cross-call contract that matched no known signature, by chain",
                &["chain"],
                registry,
            )
            .unwrap(),
            rpc_errors: register_int_counter_vec_with_registry!(
                "xcall_rpc_errors",
                "RPC errors by chain and error type",
                &["chain", "type"],
                registry,
            )
            .unwrap(),
            receipt_fetch_retries: register_int_counter_with_registry!(
                "xcall_receipt_fetch_retries",
                "Receipt fetch attempts beyond the first",
                registry,
            )
            .unwrap(),
            receipt_timeouts: register_int_counter_with_registry!(
                "xcall_receipt_timeouts",
                "Receipt fetches that exhausted the retry budget",
                registry,
            )
            .unwrap(),
            messages_in_flight: register_int_gauge_with_registry!(
                "xcall_messages_in_flight",
                "Cross-call messages currently being tracked",
                registry,
            )
            .unwrap(),
            last_scanned_block: register_int_gauge_vec_with_registry!(
                "xcall_last_scanned_block",
                "Last block height scanned for events, by chain",
                &["chain"],
                registry,
            )
            .unwrap(),
            transactions_finalized: register_int_counter_vec_with_registry!(
                "xcall_transactions_finalized",
                "Transactions that reached a terminal status, by status",
                &["status"],
                registry,
            )
            .unwrap(),
        }
    }

    pub fn new_for_testing() -> Self {
        let registry = Registry::new();
        Self::new(&registry)
    }
}
