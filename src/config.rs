// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::types::{ChainFamily, ChainId};
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::collections::HashSet;
use std::time::Duration;

fn default_scan_block_count() -> u64 {
    100
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_receipt_attempts() -> u32 {
    10
}

fn default_receipt_interval_ms() -> u64 {
    1000
}

#[serde_as]
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ChainConfig {
    pub chain_id: ChainId,
    // Rpc url for the chain fullnode, used for query stuff.
    pub rpc_url: String,
    // The deployed cross-call contract on this chain.
    pub xcall_address: String,
    // The asset manager contract handling deposits, where the chain has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_manager_address: Option<String>,
    // Upper bound on the block range scanned per polling tick.
    #[serde(default = "default_scan_block_count")]
    pub scan_block_count: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    // Receipt fetch retry budget. Goloop chains need the full budget
    // because receipts are not available immediately after submission.
    #[serde(default = "default_receipt_attempts")]
    pub receipt_attempts: u32,
    #[serde(default = "default_receipt_interval_ms")]
    pub receipt_interval_ms: u64,
}

impl ChainConfig {
    pub fn new(chain_id: ChainId, rpc_url: &str, xcall_address: &str) -> Self {
        Self {
            chain_id,
            rpc_url: rpc_url.to_string(),
            xcall_address: xcall_address.to_string(),
            asset_manager_address: None,
            scan_block_count: default_scan_block_count(),
            poll_interval_ms: default_poll_interval_ms(),
            receipt_attempts: default_receipt_attempts(),
            receipt_interval_ms: default_receipt_interval_ms(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn receipt_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_interval_ms)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        url::Url::parse(&self.rpc_url)
            .map_err(|e| anyhow!("invalid rpc url for {}: {e}", self.chain_id))?;
        if self.xcall_address.is_empty() {
            return Err(anyhow!("missing xcall address for {}", self.chain_id));
        }
        if self.scan_block_count == 0 {
            return Err(anyhow!("scan-block-count must be positive"));
        }
        if self.receipt_attempts == 0 {
            return Err(anyhow!("receipt-attempts must be positive"));
        }
        if matches!(
            self.chain_id.family(),
            ChainFamily::Solana | ChainFamily::Sui | ChainFamily::Stellar
        ) {
            return Err(anyhow!(
                "no adapter is wired for {} yet; register a client by hand",
                self.chain_id
            ));
        }
        Ok(())
    }
}

#[serde_as]
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct XCallConfig {
    pub chains: Vec<ChainConfig>,
}

impl XCallConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut seen = HashSet::new();
        for chain in &self.chains {
            chain.validate()?;
            if !seen.insert(chain.chain_id) {
                return Err(anyhow!("duplicate chain config for {}", chain.chain_id));
            }
        }
        Ok(())
    }

    pub fn chain(&self, chain_id: ChainId) -> Option<&ChainConfig> {
        self.chains.iter().find(|c| c.chain_id == chain_id)
    }
}
