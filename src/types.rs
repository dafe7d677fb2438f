// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::error::{XCallError, XCallResult};
use once_cell::sync::Lazy;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use strum_macros::Display;

/// Every network the orchestration layer knows about. Adapters exist per
/// chain family; the tracker and store only ever see this identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ChainId {
    Icon,
    Havah,
    Arbitrum,
    Avalanche,
    Base,
    Bsc,
    Optimism,
    Archway,
    Injective,
    Solana,
    Stellar,
    Sui,
}

/// Chain families group networks that share an RPC shape and event format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ChainFamily {
    Evm,
    Goloop,
    Cosmos,
    Solana,
    Stellar,
    Sui,
}

impl ChainId {
    pub fn family(&self) -> ChainFamily {
        match self {
            ChainId::Icon | ChainId::Havah => ChainFamily::Goloop,
            ChainId::Arbitrum
            | ChainId::Avalanche
            | ChainId::Base
            | ChainId::Bsc
            | ChainId::Optimism => ChainFamily::Evm,
            ChainId::Archway | ChainId::Injective => ChainFamily::Cosmos,
            ChainId::Solana => ChainFamily::Solana,
            ChainId::Stellar => ChainFamily::Stellar,
            ChainId::Sui => ChainFamily::Sui,
        }
    }

    /// Network identifier used in xCall network addresses, e.g. the
    /// `0x1.icon` in `0x1.icon/hx1234...`.
    pub fn network_id(&self) -> &'static str {
        match self {
            ChainId::Icon => "0x1.icon",
            ChainId::Havah => "0x100.icon",
            ChainId::Arbitrum => "0xa4b1.arbitrum",
            ChainId::Avalanche => "0xa86a.avax",
            ChainId::Base => "0x2105.base",
            ChainId::Bsc => "0x38.bsc",
            ChainId::Optimism => "0xa.optimism",
            ChainId::Archway => "archway-1",
            ChainId::Injective => "injective-1",
            ChainId::Solana => "solana",
            ChainId::Stellar => "stellar",
            ChainId::Sui => "sui",
        }
    }

    /// Resolve the chain a network address refers to. `addr` is either a
    /// bare network id or a full `<network>/<account>` address.
    pub fn from_network_address(addr: &str) -> Option<ChainId> {
        let net = addr.split('/').next()?;
        ALL_CHAINS.iter().copied().find(|c| c.network_id() == net)
    }
}

pub const ALL_CHAINS: [ChainId; 12] = [
    ChainId::Icon,
    ChainId::Havah,
    ChainId::Arbitrum,
    ChainId::Avalanche,
    ChainId::Base,
    ChainId::Bsc,
    ChainId::Optimism,
    ChainId::Archway,
    ChainId::Injective,
    ChainId::Solana,
    ChainId::Stellar,
    ChainId::Sui,
];

/// Full xCall network address: `<network id>/<account>`.
pub fn network_address(chain: ChainId, account: &str) -> String {
    format!("{}/{}", chain.network_id(), account)
}

/// 128-bit token amount.
///
/// Serialized as a tagged decimal string (`bigint:...`) so the persisted
/// form survives storage backends that cannot represent integers above
/// 2^53 losslessly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(pub u128);

const AMOUNT_TAG: &str = "bigint:";

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn value(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl From<u128> for Amount {
    fn from(v: u128) -> Self {
        Amount(v)
    }
}

impl From<u64> for Amount {
    fn from(v: u64) -> Self {
        Amount(v as u128)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = XCallError;

    fn from_str(s: &str) -> XCallResult<Self> {
        let digits = s.strip_prefix(AMOUNT_TAG).unwrap_or(s);
        digits
            .parse::<u128>()
            .map(Amount)
            .map_err(|e| XCallError::SerializationError(format!("bad amount {s:?}: {e}")))
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{AMOUNT_TAG}{}", self.0))
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let digits = s
            .strip_prefix(AMOUNT_TAG)
            .ok_or_else(|| D::Error::custom(format!("amount missing {AMOUNT_TAG:?} tag: {s}")))?;
        digits
            .parse::<u128>()
            .map(Amount)
            .map_err(|e| D::Error::custom(format!("bad amount {s:?}: {e}")))
    }
}

/// Transaction status as seen by UI observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Success,
    Failure,
}

impl TxStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TxStatus::Pending)
    }
}

/// Cross-call fee quote for one direction. Never persisted; recomputed per
/// query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct XCallFee {
    pub rollback: Amount,
    pub no_rollback: Amount,
}

impl XCallFee {
    /// The fee that applies to the given intent type. Actions with
    /// compensating logic on the source chain pay the rollback fee.
    pub fn for_intent(&self, intent_type: XTransactionType) -> Amount {
        match intent_type {
            XTransactionType::Bridge => self.no_rollback,
            _ => self.rollback,
        }
    }
}

/// The logical action a user requested, before chain-specific encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum XTransactionType {
    Swap,
    Bridge,
    Deposit,
    Withdraw,
    Borrow,
    Repay,
}

/// Source and destination chains of one logical action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Direction {
    pub from: ChainId,
    pub to: ChainId,
}

/// Execution route for a swap: the pool path to traverse on the hub chain
/// and the minimum amount the trade may settle at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRoute {
    pub path: Vec<String>,
    pub minimum_receive: Amount,
}

/// A user-requested cross-chain action. Construction is cheap; `validate`
/// enforces the per-type field requirements before anything touches a
/// chain. A missing required field is a caller error, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionIntent {
    pub intent_type: XTransactionType,
    pub direction: Direction,
    pub token: String,
    pub input_amount: Amount,
    pub execution_trade: Option<TradeRoute>,
    /// Basis points
    pub slippage_tolerance: Option<u16>,
    pub recipient: Option<String>,
    /// Account submitting on the source chain
    pub account: String,
    pub xcall_fee: XCallFee,
    pub used_collateral: Option<String>,
}

impl TransactionIntent {
    pub fn validate(&self) -> XCallResult<()> {
        if self.account.is_empty() {
            return Err(XCallError::InvalidIntent("account is empty".to_string()));
        }
        if self.input_amount.is_zero() {
            return Err(XCallError::InvalidIntent(
                "input amount is zero".to_string(),
            ));
        }
        match self.intent_type {
            XTransactionType::Swap => {
                if self.execution_trade.is_none() {
                    return Err(XCallError::InvalidIntent(
                        "SWAP requires an execution trade".to_string(),
                    ));
                }
                if self.slippage_tolerance.is_none() {
                    return Err(XCallError::InvalidIntent(
                        "SWAP requires a slippage tolerance".to_string(),
                    ));
                }
            }
            XTransactionType::Bridge => {
                if self.recipient.as_deref().unwrap_or("").is_empty() {
                    return Err(XCallError::InvalidIntent(
                        "BRIDGE requires a recipient".to_string(),
                    ));
                }
            }
            XTransactionType::Deposit
            | XTransactionType::Withdraw
            | XTransactionType::Borrow
            | XTransactionType::Repay => {
                if self.used_collateral.as_deref().unwrap_or("").is_empty() {
                    return Err(XCallError::InvalidIntent(format!(
                        "{} requires a collateral type",
                        self.intent_type
                    )));
                }
            }
        }
        Ok(())
    }

    /// Recipient network address on the destination chain, defaulting to
    /// the submitting account.
    pub fn receiver_address(&self) -> String {
        let account = self.recipient.as_deref().unwrap_or(&self.account);
        network_address(self.direction.to, account)
    }
}

// Known on-chain pair names whose off-chain display form is reversed.
// Data-quality shim for the external contract layer; never consulted by
// the tracker or store.
static PAIR_NAME_OVERRIDES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("BTCB/sICX", "sICX/BTCB"),
        ("ETH/sICX", "sICX/ETH"),
        ("AVAX/sICX", "sICX/AVAX"),
        ("BNB/sICX", "sICX/BNB"),
    ])
});

/// Normalize an on-chain pair name to its display form.
pub fn normalize_pair(name: &str) -> &str {
    PAIR_NAME_OVERRIDES.get(name).copied().unwrap_or(name)
}
