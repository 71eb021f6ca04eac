//! # Block Envelopes
//!
//! The upstream input: a parsed block header with raw transaction bytes,
//! execution results and events, as produced by the block fetcher. Byte
//! fields are hex in JSON.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::ValidatorUpdates;
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockEnvelope {
    pub height: u64,
    #[serde(with = "hex::serde")]
    pub hash: Vec<u8>,
    pub time: DateTime<Utc>,
    pub chain_id: String,
    #[serde(default)]
    pub txs: Vec<TxEnvelope>,
    /// Begin/end block events.
    #[serde(default)]
    pub events: Vec<EventEnvelope>,
    #[serde(default, with = "shared_types::decimal")]
    pub supply_change: BigDecimal,
    #[serde(default)]
    pub validators: ValidatorUpdates,
    /// Only present on the genesis block.
    #[serde(default)]
    pub genesis_accounts: Vec<GenesisAccountEnvelope>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TxEnvelope {
    #[serde(with = "hex::serde")]
    pub hash: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub raw: Vec<u8>,
    pub gas_wanted: u64,
    pub gas_used: u64,
    /// Execution result code, 0 on success.
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub codespace: String,
    #[serde(default)]
    pub log: String,
    #[serde(default)]
    pub events: Vec<EventEnvelope>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenesisAccountEnvelope {
    /// Bech32 account address.
    pub address: String,
    #[serde(with = "shared_types::decimal")]
    pub balance: BigDecimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_from_json_line() {
        let line = r#"{"height":1000,"hash":"abcd","time":"2023-10-31T12:00:00Z","chain_id":"celestia","txs":[{"hash":"01","raw":"0a00","gas_wanted":100,"gas_used":80,"events":[{"type":"message","attributes":{"action":"send"}}]}],"supply_change":"1500"}"#;

        let envelope: BlockEnvelope = serde_json::from_str(line).unwrap();

        assert_eq!(envelope.height, 1000);
        assert_eq!(envelope.hash, vec![0xab, 0xcd]);
        assert_eq!(envelope.txs[0].raw, vec![0x0a, 0x00]);
        assert_eq!(envelope.txs[0].code, 0);
        assert_eq!(envelope.txs[0].events[0].attributes["action"], "send");
        assert_eq!(envelope.supply_change, BigDecimal::from(1500));
        assert!(envelope.validators.is_empty());
        assert!(envelope.genesis_accounts.is_empty());
    }
}
