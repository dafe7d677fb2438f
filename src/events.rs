// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Normalized cross-call events and the per-chain signature tables that
//! map them to concrete log formats.
//!
//! Every chain adapter's parser produces only the variants in
//! [`XCallEvent`]; this is the seam that keeps the message tracker
//! chain-agnostic. Numeric fields (`sn`, `req_id`, `code`) are decoded
//! from each chain's native integer encoding into plain 64-bit values so
//! downstream logic can compare sequence numbers across chains uniformly.
//! A log from the cross-call contract that matches none of the known
//! signatures is an `UnknownEventType` error, not something to retry.

use crate::error::{XCallError, XCallResult};
use crate::types::ChainId;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Execution result code signalling success in `CallExecuted` /
/// `ResponseMessage`. Any other code is a destination-side failure.
pub const CODE_SUCCESS: i64 = 0;

/// The five abstract cross-call event kinds every adapter must map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum XCallEventType {
    CallMessageSent,
    CallMessage,
    CallExecuted,
    ResponseMessage,
    RollbackMessage,
}

pub const XCALL_EVENT_TYPES: [XCallEventType; 5] = [
    XCallEventType::CallMessageSent,
    XCallEventType::CallMessage,
    XCallEventType::CallExecuted,
    XCallEventType::ResponseMessage,
    XCallEventType::RollbackMessage,
];

/// Normalized form of a chain's raw log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum XCallEvent {
    /// Observed on the source chain when the call contract accepts a message.
    CallMessageSent { sn: u64, from: String, to: String },
    /// Observed on the destination chain on delivery.
    CallMessage {
        sn: u64,
        req_id: u64,
        from: String,
        to: String,
        data: Vec<u8>,
    },
    /// Observed on the destination chain after execution.
    CallExecuted { req_id: u64, code: i64, msg: String },
    /// Observed on the source chain reporting the destination result.
    ResponseMessage { sn: u64, code: i64 },
    /// Observed on the source chain when a rollback becomes executable.
    RollbackMessage { sn: u64 },
}

impl XCallEvent {
    pub fn event_type(&self) -> XCallEventType {
        match self {
            XCallEvent::CallMessageSent { .. } => XCallEventType::CallMessageSent,
            XCallEvent::CallMessage { .. } => XCallEventType::CallMessage,
            XCallEvent::CallExecuted { .. } => XCallEventType::CallExecuted,
            XCallEvent::ResponseMessage { .. } => XCallEventType::ResponseMessage,
            XCallEvent::RollbackMessage { .. } => XCallEventType::RollbackMessage,
        }
    }

    pub fn sn(&self) -> Option<u64> {
        match self {
            XCallEvent::CallMessageSent { sn, .. }
            | XCallEvent::CallMessage { sn, .. }
            | XCallEvent::ResponseMessage { sn, .. }
            | XCallEvent::RollbackMessage { sn } => Some(*sn),
            XCallEvent::CallExecuted { .. } => None,
        }
    }

    pub fn req_id(&self) -> Option<u64> {
        match self {
            XCallEvent::CallMessage { req_id, .. } | XCallEvent::CallExecuted { req_id, .. } => {
                Some(*req_id)
            }
            _ => None,
        }
    }
}

/// An [`XCallEvent`] together with where it was observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEvent {
    pub chain: ChainId,
    pub tx_hash: String,
    pub block_number: u64,
    pub event: XCallEvent,
}

fn parse_prefixed_u64(raw: &str) -> XCallResult<u64> {
    let parsed = match raw.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => raw.parse::<u64>(),
    };
    parsed.map_err(|e| XCallError::InvalidResponse(format!("bad integer {raw:?}: {e}")))
}

fn parse_prefixed_i64(raw: &str) -> XCallResult<i64> {
    if let Some(hex) = raw.strip_prefix("-0x") {
        return i64::from_str_radix(hex, 16)
            .map(|v| -v)
            .map_err(|e| XCallError::InvalidResponse(format!("bad integer {raw:?}: {e}")));
    }
    let parsed = match raw.strip_prefix("0x") {
        Some(hex) => i64::from_str_radix(hex, 16),
        None => raw.parse::<i64>(),
    };
    parsed.map_err(|e| XCallError::InvalidResponse(format!("bad integer {raw:?}: {e}")))
}

/// EVM chains: events are identified by the keccak hash of their canonical
/// signature and decoded from topics + ABI-encoded data.
pub mod evm {
    use super::*;
    use ethers::abi::{decode, ParamType, Token};
    use ethers::types::{Log, H256, U256};
    use ethers::utils::keccak256;
    use once_cell::sync::Lazy;
    use std::collections::HashMap;

    /// Canonical Solidity signatures of the cross-call contract events.
    const SIGNATURE_STRINGS: [(&str, XCallEventType); 5] = [
        (
            "CallMessageSent(address,string,uint256)",
            XCallEventType::CallMessageSent,
        ),
        (
            "CallMessage(string,string,uint256,uint256,bytes)",
            XCallEventType::CallMessage,
        ),
        (
            "CallExecuted(uint256,int256,string)",
            XCallEventType::CallExecuted,
        ),
        (
            "ResponseMessage(uint256,int256)",
            XCallEventType::ResponseMessage,
        ),
        ("RollbackMessage(uint256)", XCallEventType::RollbackMessage),
    ];

    pub static SIGNATURES: Lazy<HashMap<H256, XCallEventType>> = Lazy::new(|| {
        SIGNATURE_STRINGS
            .iter()
            .map(|(sig, ty)| (H256::from(keccak256(sig.as_bytes())), *ty))
            .collect()
    });

    pub fn signature(event_type: XCallEventType) -> H256 {
        let sig = SIGNATURE_STRINGS
            .iter()
            .find(|(_, ty)| *ty == event_type)
            .map(|(sig, _)| *sig)
            .expect("every event type has a signature");
        H256::from(keccak256(sig.as_bytes()))
    }

    pub fn filter_event_logs(logs: &[Log], event_type: XCallEventType) -> Vec<Log> {
        let topic0 = signature(event_type);
        logs.iter()
            .filter(|log| log.topics.first() == Some(&topic0))
            .cloned()
            .collect()
    }

    fn topic_u64(log: &Log, index: usize) -> XCallResult<u64> {
        let topic = log
            .topics
            .get(index)
            .ok_or_else(|| XCallError::InvalidResponse(format!("missing topic {index}")))?;
        let value = U256::from_big_endian(topic.as_bytes());
        if value > U256::from(u64::MAX) {
            return Err(XCallError::InvalidResponse(format!(
                "topic {index} out of u64 range: {value}"
            )));
        }
        Ok(value.as_u64())
    }

    fn int_token_to_i64(token: &Token) -> XCallResult<i64> {
        match token {
            // int256 with two's-complement low word; cross-call codes are
            // tiny so the low word carries the whole value
            Token::Int(v) | Token::Uint(v) => Ok(v.low_u64() as i64),
            other => Err(XCallError::InvalidResponse(format!(
                "expected int token, got {other:?}"
            ))),
        }
    }

    pub fn parse_event_logs(chain: ChainId, logs: &[Log]) -> XCallResult<Vec<ChainEvent>> {
        logs.iter().map(|log| parse_event_log(chain, log)).collect()
    }

    pub fn parse_event_log(chain: ChainId, log: &Log) -> XCallResult<ChainEvent> {
        let topic0 = log
            .topics
            .first()
            .ok_or_else(|| XCallError::InvalidResponse("log without topics".to_string()))?;
        let event_type = SIGNATURES
            .get(topic0)
            .copied()
            .ok_or_else(|| XCallError::UnknownEventType(format!("{topic0:#x}")))?;

        let tx_hash = log
            .transaction_hash
            .map(|h| format!("{h:#x}"))
            .unwrap_or_default();
        let block_number = log.block_number.map(|b| b.as_u64()).unwrap_or_default();

        let event = match event_type {
            XCallEventType::CallMessageSent => XCallEvent::CallMessageSent {
                // topics: [sig, from address, keccak(to), sn]
                from: log
                    .topics
                    .get(1)
                    .map(|t| format!("0x{}", hex::encode(&t.as_bytes()[12..])))
                    .unwrap_or_default(),
                to: log
                    .topics
                    .get(2)
                    .map(|t| format!("{t:#x}"))
                    .unwrap_or_default(),
                sn: topic_u64(log, 3)?,
            },
            XCallEventType::CallMessage => {
                // topics: [sig, keccak(from), keccak(to), sn]; data: (reqId, data)
                let tokens = decode(&[ParamType::Uint(256), ParamType::Bytes], &log.data)
                    .map_err(|e| XCallError::InvalidResponse(format!("CallMessage data: {e}")))?;
                let req_id = match &tokens[0] {
                    Token::Uint(v) => v.as_u64(),
                    _ => unreachable!("decode enforces token types"),
                };
                let data = match &tokens[1] {
                    Token::Bytes(b) => b.clone(),
                    _ => unreachable!("decode enforces token types"),
                };
                XCallEvent::CallMessage {
                    from: log
                        .topics
                        .get(1)
                        .map(|t| format!("{t:#x}"))
                        .unwrap_or_default(),
                    to: log
                        .topics
                        .get(2)
                        .map(|t| format!("{t:#x}"))
                        .unwrap_or_default(),
                    sn: topic_u64(log, 3)?,
                    req_id,
                    data,
                }
            }
            XCallEventType::CallExecuted => {
                // topics: [sig, reqId]; data: (code, msg)
                let tokens = decode(&[ParamType::Int(256), ParamType::String], &log.data)
                    .map_err(|e| XCallError::InvalidResponse(format!("CallExecuted data: {e}")))?;
                let msg = match &tokens[1] {
                    Token::String(s) => s.clone(),
                    _ => unreachable!("decode enforces token types"),
                };
                XCallEvent::CallExecuted {
                    req_id: topic_u64(log, 1)?,
                    code: int_token_to_i64(&tokens[0])?,
                    msg,
                }
            }
            XCallEventType::ResponseMessage => {
                // topics: [sig, sn]; data: (code)
                let tokens = decode(&[ParamType::Int(256)], &log.data).map_err(|e| {
                    XCallError::InvalidResponse(format!("ResponseMessage data: {e}"))
                })?;
                XCallEvent::ResponseMessage {
                    sn: topic_u64(log, 1)?,
                    code: int_token_to_i64(&tokens[0])?,
                }
            }
            XCallEventType::RollbackMessage => XCallEvent::RollbackMessage {
                sn: topic_u64(log, 1)?,
            },
        };

        Ok(ChainEvent {
            chain,
            tx_hash,
            block_number,
            event,
        })
    }
}

/// Goloop chains (ICON, Havah): events are identified by a string
/// signature in the first indexed slot and integers are hex strings.
pub mod goloop {
    use super::*;
    use once_cell::sync::Lazy;
    use std::collections::HashMap;

    /// Raw event log as returned in a Goloop transaction result.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GoloopEventLog {
        pub score_address: String,
        pub indexed: Vec<String>,
        pub data: Vec<String>,
        #[serde(default)]
        pub tx_hash: String,
        #[serde(default)]
        pub block_number: u64,
    }

    pub static SIGNATURES: Lazy<HashMap<&'static str, XCallEventType>> = Lazy::new(|| {
        HashMap::from([
            (
                "CallMessageSent(Address,str,int)",
                XCallEventType::CallMessageSent,
            ),
            (
                "CallMessage(str,str,int,int,bytes)",
                XCallEventType::CallMessage,
            ),
            ("CallExecuted(int,int,str)", XCallEventType::CallExecuted),
            ("ResponseMessage(int,int)", XCallEventType::ResponseMessage),
            ("RollbackMessage(int)", XCallEventType::RollbackMessage),
        ])
    });

    pub fn signature(event_type: XCallEventType) -> &'static str {
        SIGNATURES
            .iter()
            .find(|(_, ty)| **ty == event_type)
            .map(|(sig, _)| *sig)
            .expect("every event type has a signature")
    }

    pub fn filter_event_logs(
        logs: &[GoloopEventLog],
        event_type: XCallEventType,
    ) -> Vec<GoloopEventLog> {
        let sig = signature(event_type);
        logs.iter()
            .filter(|log| log.indexed.first().map(String::as_str) == Some(sig))
            .cloned()
            .collect()
    }

    pub fn parse_event_logs(
        chain: ChainId,
        logs: &[GoloopEventLog],
    ) -> XCallResult<Vec<ChainEvent>> {
        logs.iter().map(|log| parse_event_log(chain, log)).collect()
    }

    pub fn parse_event_log(chain: ChainId, log: &GoloopEventLog) -> XCallResult<ChainEvent> {
        let sig = log
            .indexed
            .first()
            .ok_or_else(|| XCallError::InvalidResponse("event log without signature".into()))?;
        let event_type = SIGNATURES
            .get(sig.as_str())
            .copied()
            .ok_or_else(|| XCallError::UnknownEventType(sig.clone()))?;

        let indexed = |i: usize| -> XCallResult<&str> {
            log.indexed
                .get(i)
                .map(String::as_str)
                .ok_or_else(|| XCallError::InvalidResponse(format!("{sig}: missing indexed {i}")))
        };
        let data = |i: usize| -> XCallResult<&str> {
            log.data
                .get(i)
                .map(String::as_str)
                .ok_or_else(|| XCallError::InvalidResponse(format!("{sig}: missing data {i}")))
        };

        let event = match event_type {
            XCallEventType::CallMessageSent => XCallEvent::CallMessageSent {
                from: indexed(1)?.to_string(),
                to: indexed(2)?.to_string(),
                sn: parse_prefixed_u64(indexed(3)?)?,
            },
            XCallEventType::CallMessage => XCallEvent::CallMessage {
                from: indexed(1)?.to_string(),
                to: indexed(2)?.to_string(),
                sn: parse_prefixed_u64(indexed(3)?)?,
                req_id: parse_prefixed_u64(data(0)?)?,
                data: {
                    let raw = data(1)?;
                    hex::decode(raw.strip_prefix("0x").unwrap_or(raw))
                        .map_err(|e| XCallError::InvalidResponse(format!("{sig} bytes: {e}")))?
                },
            },
            XCallEventType::CallExecuted => XCallEvent::CallExecuted {
                req_id: parse_prefixed_u64(indexed(1)?)?,
                code: parse_prefixed_i64(data(0)?)?,
                msg: data(1).unwrap_or("").to_string(),
            },
            XCallEventType::ResponseMessage => XCallEvent::ResponseMessage {
                sn: parse_prefixed_u64(indexed(1)?)?,
                code: parse_prefixed_i64(data(0)?)?,
            },
            XCallEventType::RollbackMessage => XCallEvent::RollbackMessage {
                sn: parse_prefixed_u64(indexed(1)?)?,
            },
        };

        Ok(ChainEvent {
            chain,
            tx_hash: log.tx_hash.clone(),
            block_number: log.block_number,
            event,
        })
    }
}

/// CosmWasm chains (Archway, Injective): events arrive as typed attribute
/// lists on a tx response, prefixed with `wasm-`.
pub mod cosmos {
    use super::*;
    use once_cell::sync::Lazy;
    use std::collections::HashMap;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct CosmosEvent {
        #[serde(rename = "type")]
        pub event_type: String,
        pub attributes: Vec<(String, String)>,
        #[serde(default)]
        pub tx_hash: String,
        #[serde(default)]
        pub block_number: u64,
    }

    pub static SIGNATURES: Lazy<HashMap<&'static str, XCallEventType>> = Lazy::new(|| {
        HashMap::from([
            ("wasm-CallMessageSent", XCallEventType::CallMessageSent),
            ("wasm-CallMessage", XCallEventType::CallMessage),
            ("wasm-CallExecuted", XCallEventType::CallExecuted),
            ("wasm-ResponseMessage", XCallEventType::ResponseMessage),
            ("wasm-RollbackMessage", XCallEventType::RollbackMessage),
        ])
    });

    pub fn signature(event_type: XCallEventType) -> &'static str {
        SIGNATURES
            .iter()
            .find(|(_, ty)| **ty == event_type)
            .map(|(sig, _)| *sig)
            .expect("every event type has a signature")
    }

    pub fn filter_event_logs(logs: &[CosmosEvent], event_type: XCallEventType) -> Vec<CosmosEvent> {
        let sig = signature(event_type);
        logs.iter()
            .filter(|log| log.event_type == sig)
            .cloned()
            .collect()
    }

    pub fn parse_event_logs(chain: ChainId, logs: &[CosmosEvent]) -> XCallResult<Vec<ChainEvent>> {
        logs.iter().map(|log| parse_event_log(chain, log)).collect()
    }

    pub fn parse_event_log(chain: ChainId, log: &CosmosEvent) -> XCallResult<ChainEvent> {
        let event_type = SIGNATURES
            .get(log.event_type.as_str())
            .copied()
            .ok_or_else(|| XCallError::UnknownEventType(log.event_type.clone()))?;

        let attr = |key: &str| -> XCallResult<&str> {
            log.attributes
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
                .ok_or_else(|| {
                    XCallError::InvalidResponse(format!("{}: missing {key}", log.event_type))
                })
        };

        let event = match event_type {
            XCallEventType::CallMessageSent => XCallEvent::CallMessageSent {
                from: attr("from")?.to_string(),
                to: attr("to")?.to_string(),
                sn: parse_prefixed_u64(attr("sn")?)?,
            },
            XCallEventType::CallMessage => XCallEvent::CallMessage {
                from: attr("from")?.to_string(),
                to: attr("to")?.to_string(),
                sn: parse_prefixed_u64(attr("sn")?)?,
                req_id: parse_prefixed_u64(attr("reqId")?)?,
                data: {
                    let raw = attr("data").unwrap_or("");
                    hex::decode(raw.strip_prefix("0x").unwrap_or(raw))
                        .map_err(|e| XCallError::InvalidResponse(format!("bad data attr: {e}")))?
                },
            },
            XCallEventType::CallExecuted => XCallEvent::CallExecuted {
                req_id: parse_prefixed_u64(attr("reqId")?)?,
                code: parse_prefixed_i64(attr("code")?)?,
                msg: attr("msg").unwrap_or("").to_string(),
            },
            XCallEventType::ResponseMessage => XCallEvent::ResponseMessage {
                sn: parse_prefixed_u64(attr("sn")?)?,
                code: parse_prefixed_i64(attr("code")?)?,
            },
            XCallEventType::RollbackMessage => XCallEvent::RollbackMessage {
                sn: parse_prefixed_u64(attr("sn")?)?,
            },
        };

        Ok(ChainEvent {
            chain,
            tx_hash: log.tx_hash.clone(),
            block_number: log.block_number,
            event,
        })
    }
}

/// Stellar (Soroban): events carry symbol topics; the first topic is the
/// event name and numeric values are decimal strings.
pub mod stellar {
    use super::*;
    use once_cell::sync::Lazy;
    use std::collections::HashMap;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct StellarEvent {
        pub topics: Vec<String>,
        pub values: Vec<String>,
        #[serde(default)]
        pub tx_hash: String,
        #[serde(default)]
        pub block_number: u64,
    }

    pub static SIGNATURES: Lazy<HashMap<&'static str, XCallEventType>> = Lazy::new(|| {
        HashMap::from([
            ("CallMessageSent", XCallEventType::CallMessageSent),
            ("CallMessage", XCallEventType::CallMessage),
            ("CallExecuted", XCallEventType::CallExecuted),
            ("ResponseMessage", XCallEventType::ResponseMessage),
            ("RollbackMessage", XCallEventType::RollbackMessage),
        ])
    });

    pub fn parse_event_logs(chain: ChainId, logs: &[StellarEvent]) -> XCallResult<Vec<ChainEvent>> {
        logs.iter().map(|log| parse_event_log(chain, log)).collect()
    }

    pub fn parse_event_log(chain: ChainId, log: &StellarEvent) -> XCallResult<ChainEvent> {
        let name = log
            .topics
            .first()
            .ok_or_else(|| XCallError::InvalidResponse("event without topics".into()))?;
        let event_type = SIGNATURES
            .get(name.as_str())
            .copied()
            .ok_or_else(|| XCallError::UnknownEventType(name.clone()))?;

        let topic = |i: usize| log.topics.get(i).cloned().unwrap_or_default();
        let value = |i: usize| -> XCallResult<&str> {
            log.values.get(i).map(String::as_str).ok_or_else(|| {
                XCallError::InvalidResponse(format!("{name}: missing value {i}"))
            })
        };

        let event = match event_type {
            XCallEventType::CallMessageSent => XCallEvent::CallMessageSent {
                from: topic(1),
                to: topic(2),
                sn: parse_prefixed_u64(value(0)?)?,
            },
            XCallEventType::CallMessage => XCallEvent::CallMessage {
                from: topic(1),
                to: topic(2),
                sn: parse_prefixed_u64(value(0)?)?,
                req_id: parse_prefixed_u64(value(1)?)?,
                data: {
                    let raw = value(2).unwrap_or("");
                    hex::decode(raw.strip_prefix("0x").unwrap_or(raw))
                        .map_err(|e| XCallError::InvalidResponse(format!("bad data value: {e}")))?
                },
            },
            XCallEventType::CallExecuted => XCallEvent::CallExecuted {
                req_id: parse_prefixed_u64(value(0)?)?,
                code: parse_prefixed_i64(value(1)?)?,
                msg: value(2).unwrap_or("").to_string(),
            },
            XCallEventType::ResponseMessage => XCallEvent::ResponseMessage {
                sn: parse_prefixed_u64(value(0)?)?,
                code: parse_prefixed_i64(value(1)?)?,
            },
            XCallEventType::RollbackMessage => XCallEvent::RollbackMessage {
                sn: parse_prefixed_u64(value(0)?)?,
            },
        };

        Ok(ChainEvent {
            chain,
            tx_hash: log.tx_hash.clone(),
            block_number: log.block_number,
            event,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::abi::{encode, Token};
    use ethers::types::{Bytes, Log, H160, H256, U256, U64};
    use ethers::utils::keccak256;

    fn evm_log(topics: Vec<H256>, data: Vec<u8>) -> Log {
        Log {
            address: H160::repeat_byte(0xcc),
            topics,
            data: Bytes::from(data),
            block_number: Some(U64::from(120)),
            transaction_hash: Some(H256::repeat_byte(0xab)),
            ..Default::default()
        }
    }

    fn u64_topic(v: u64) -> H256 {
        let mut buf = [0u8; 32];
        U256::from(v).to_big_endian(&mut buf);
        H256::from(buf)
    }

    #[test]
    fn test_evm_signature_table_is_total() {
        for ty in XCALL_EVENT_TYPES {
            let sig = evm::signature(ty);
            assert_eq!(evm::SIGNATURES.get(&sig), Some(&ty));
        }
        assert_eq!(evm::SIGNATURES.len(), 5);
    }

    #[test]
    fn test_evm_parse_call_message_sent() {
        let topics = vec![
            evm::signature(XCallEventType::CallMessageSent),
            H256::from(H160::repeat_byte(0x11)),
            H256::from(keccak256(b"0x1.icon/hx99")),
            u64_topic(7),
        ];
        let parsed = evm::parse_event_log(ChainId::Base, &evm_log(topics, vec![])).unwrap();
        assert_eq!(parsed.chain, ChainId::Base);
        assert_eq!(parsed.block_number, 120);
        match parsed.event {
            XCallEvent::CallMessageSent { sn, ref from, .. } => {
                assert_eq!(sn, 7);
                assert_eq!(from, &format!("0x{}", "11".repeat(20)));
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn test_evm_parse_call_message() {
        let data = encode(&[
            Token::Uint(U256::from(42u64)),
            Token::Bytes(vec![0xde, 0xad]),
        ]);
        let topics = vec![
            evm::signature(XCallEventType::CallMessage),
            H256::from(keccak256(b"0x1.icon/hx99")),
            H256::from(keccak256(b"0xa4b1.arbitrum/0xabc")),
            u64_topic(7),
        ];
        let parsed = evm::parse_event_log(ChainId::Arbitrum, &evm_log(topics, data)).unwrap();
        match parsed.event {
            XCallEvent::CallMessage {
                sn, req_id, data, ..
            } => {
                assert_eq!(sn, 7);
                assert_eq!(req_id, 42);
                assert_eq!(data, vec![0xde, 0xad]);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn test_evm_parse_call_executed() {
        let data = encode(&[Token::Int(U256::from(1u64)), Token::String("reverted".into())]);
        let topics = vec![evm::signature(XCallEventType::CallExecuted), u64_topic(42)];
        let parsed = evm::parse_event_log(ChainId::Avalanche, &evm_log(topics, data)).unwrap();
        assert_eq!(
            parsed.event,
            XCallEvent::CallExecuted {
                req_id: 42,
                code: 1,
                msg: "reverted".to_string()
            }
        );
    }

    #[test]
    fn test_evm_unknown_event_fails_fast() {
        let topics = vec![H256::from(keccak256(b"Transfer(address,address,uint256)"))];
        let err = evm::parse_event_log(ChainId::Base, &evm_log(topics, vec![])).unwrap_err();
        assert_eq!(err.error_type(), "unknown_event_type");
    }

    #[test]
    fn test_evm_filter_event_logs() {
        let sent = evm_log(
            vec![
                evm::signature(XCallEventType::CallMessageSent),
                H256::from(H160::repeat_byte(0x11)),
                H256::zero(),
                u64_topic(1),
            ],
            vec![],
        );
        let rollback = evm_log(
            vec![evm::signature(XCallEventType::RollbackMessage), u64_topic(1)],
            encode(&[]),
        );
        let logs = vec![sent, rollback];
        assert_eq!(
            evm::filter_event_logs(&logs, XCallEventType::CallMessageSent).len(),
            1
        );
        assert_eq!(
            evm::filter_event_logs(&logs, XCallEventType::CallExecuted).len(),
            0
        );
    }

    fn goloop_log(indexed: Vec<&str>, data: Vec<&str>) -> goloop::GoloopEventLog {
        goloop::GoloopEventLog {
            score_address: "cx17cb94b05d0ed4cd01d8a7717b7471ab8b4d5d9f".to_string(),
            indexed: indexed.into_iter().map(String::from).collect(),
            data: data.into_iter().map(String::from).collect(),
            tx_hash: "0xbeef".to_string(),
            block_number: 88,
        }
    }

    #[test]
    fn test_goloop_parse_call_message_sent() {
        let log = goloop_log(
            vec![
                "CallMessageSent(Address,str,int)",
                "hx52c32d0b82f46596f697f8ae2b0c0f391fcf7969",
                "0xa4b1.arbitrum/0xabc",
                "0x2a",
            ],
            vec![],
        );
        let parsed = goloop::parse_event_log(ChainId::Icon, &log).unwrap();
        assert_eq!(
            parsed.event,
            XCallEvent::CallMessageSent {
                from: "hx52c32d0b82f46596f697f8ae2b0c0f391fcf7969".to_string(),
                to: "0xa4b1.arbitrum/0xabc".to_string(),
                sn: 42,
            }
        );
    }

    #[test]
    fn test_goloop_parse_call_message_and_executed() {
        let log = goloop_log(
            vec![
                "CallMessage(str,str,int,int,bytes)",
                "0xa4b1.arbitrum/0xabc",
                "0x1.icon/hx99",
                "0x2a",
            ],
            vec!["0x7", "0xdead"],
        );
        let parsed = goloop::parse_event_log(ChainId::Icon, &log).unwrap();
        match parsed.event {
            XCallEvent::CallMessage {
                sn, req_id, data, ..
            } => {
                assert_eq!((sn, req_id), (42, 7));
                assert_eq!(data, vec![0xde, 0xad]);
            }
            other => panic!("wrong variant: {other:?}"),
        }

        let log = goloop_log(vec!["CallExecuted(int,int,str)", "0x7"], vec!["0x0", ""]);
        let parsed = goloop::parse_event_log(ChainId::Havah, &log).unwrap();
        assert_eq!(
            parsed.event,
            XCallEvent::CallExecuted {
                req_id: 7,
                code: CODE_SUCCESS,
                msg: String::new()
            }
        );
    }

    #[test]
    fn test_goloop_unknown_event_fails_fast() {
        let log = goloop_log(vec!["Transfer(Address,Address,int)", "hx1", "hx2"], vec![]);
        let err = goloop::parse_event_log(ChainId::Icon, &log).unwrap_err();
        assert_eq!(err.error_type(), "unknown_event_type");
    }

    #[test]
    fn test_goloop_negative_code() {
        let log = goloop_log(vec!["ResponseMessage(int,int)", "0x2a"], vec!["-0x1"]);
        let parsed = goloop::parse_event_log(ChainId::Icon, &log).unwrap();
        assert_eq!(
            parsed.event,
            XCallEvent::ResponseMessage { sn: 42, code: -1 }
        );
    }

    #[test]
    fn test_cosmos_parse_and_unknown() {
        let event = cosmos::CosmosEvent {
            event_type: "wasm-CallMessageSent".to_string(),
            attributes: vec![
                ("from".to_string(), "archway1sender".to_string()),
                ("to".to_string(), "0x1.icon/hx99".to_string()),
                ("sn".to_string(), "42".to_string()),
            ],
            tx_hash: "ABCD".to_string(),
            block_number: 10,
        };
        let parsed = cosmos::parse_event_log(ChainId::Archway, &event).unwrap();
        assert_eq!(parsed.event.sn(), Some(42));

        let unknown = cosmos::CosmosEvent {
            event_type: "transfer".to_string(),
            attributes: vec![],
            tx_hash: String::new(),
            block_number: 0,
        };
        let err = cosmos::parse_event_log(ChainId::Archway, &unknown).unwrap_err();
        assert_eq!(err.error_type(), "unknown_event_type");
    }

    #[test]
    fn test_stellar_parse() {
        let event = stellar::StellarEvent {
            topics: vec!["CallExecuted".to_string()],
            values: vec!["7".to_string(), "0".to_string(), "ok".to_string()],
            tx_hash: "txhash".to_string(),
            block_number: 5,
        };
        let parsed = stellar::parse_event_log(ChainId::Stellar, &event).unwrap();
        assert_eq!(
            parsed.event,
            XCallEvent::CallExecuted {
                req_id: 7,
                code: 0,
                msg: "ok".to_string()
            }
        );
    }

    #[test]
    fn test_event_accessors() {
        let sent = XCallEvent::CallMessageSent {
            sn: 1,
            from: String::new(),
            to: String::new(),
        };
        assert_eq!(sent.event_type(), XCallEventType::CallMessageSent);
        assert_eq!(sent.sn(), Some(1));
        assert_eq!(sent.req_id(), None);

        let executed = XCallEvent::CallExecuted {
            req_id: 9,
            code: 0,
            msg: String::new(),
        };
        assert_eq!(executed.sn(), None);
        assert_eq!(executed.req_id(), Some(9));
    }
}
