// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Cross-call fee quoting.
//!
//! Fees are paid on the source chain and depend on whether the message
//! carries rollback data. A quote asks the source chain's contract twice,
//! once per variant, so callers can price any intent type from one quote.

use crate::client::ChainRegistry;
use crate::error::XCallResult;
use crate::retry_with_max_elapsed_time;
use crate::types::{ChainId, XCallFee};
use std::sync::Arc;
use std::time::Duration;

pub struct FeeEstimator {
    registry: Arc<ChainRegistry>,
}

impl FeeEstimator {
    pub fn new(registry: Arc<ChainRegistry>) -> Self {
        Self { registry }
    }

    /// Quote both fee variants for a source/destination pair. `sources`
    /// names the connections the message will travel through; empty means
    /// the contract's defaults.
    pub async fn quote(
        &self,
        from: ChainId,
        to: ChainId,
        sources: &[String],
    ) -> XCallResult<XCallFee> {
        let client = self.registry.public(from)?;
        let rollback = client.get_xcall_fee(to, true, sources).await?;
        let no_rollback = client.get_xcall_fee(to, false, sources).await?;
        Ok(XCallFee {
            rollback,
            no_rollback,
        })
    }

    /// Quote with exponential backoff. Intended for startup paths where
    /// the endpoint may still be warming up; interactive callers should
    /// use `quote` and surface the error.
    pub async fn quote_with_retry(
        &self,
        from: ChainId,
        to: ChainId,
        sources: &[String],
        max_elapsed_time: Duration,
    ) -> XCallResult<XCallFee> {
        match retry_with_max_elapsed_time!(self.quote(from, to, sources), max_elapsed_time) {
            Ok(fee) => fee,
            Err(e) => Err(e),
        }
    }
}
