//! # Decoding Service
//!
//! Assembles a typed [`Block`] from an upstream [`BlockEnvelope`].

use crate::domain::{
    decode_address, decode_tx, type_message, BlockEnvelope, DecodeError, EventEnvelope,
    TxEnvelope,
};
use crate::ports::BlockDecoder;
use chrono::{DateTime, Utc};
use shared_types::{
    Block, BlockStats, Event, GenesisAccount, Message, MessageRefs, Tx, TxStatus,
};
use tracing::debug;

/// Chain-specific decoding parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Native fee denomination.
    pub fee_denom: String,
    /// Account address prefix.
    pub address_prefix: String,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            fee_denom: "utia".to_string(),
            address_prefix: "celestia".to_string(),
        }
    }
}

pub struct DecodingService {
    config: DecoderConfig,
}

impl DecodingService {
    pub fn new(config: DecoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    fn decode_one(
        &self,
        envelope: TxEnvelope,
        height: u64,
        time: DateTime<Utc>,
        position: usize,
    ) -> Result<Tx, DecodeError> {
        let decoded = decode_tx(&envelope.raw, &self.config.fee_denom)?;

        let messages = decoded
            .messages
            .iter()
            .enumerate()
            .map(|(i, raw)| {
                Ok(Message {
                    id: 0,
                    height,
                    time,
                    position: i as u64,
                    tx_id: 0,
                    kind: type_message(raw, &self.config.address_prefix, &self.config.fee_denom)?,
                })
            })
            .collect::<Result<Vec<_>, DecodeError>>()?;

        let events = to_events(envelope.events, height, time);
        let failed = envelope.code != 0;

        Ok(Tx {
            id: 0,
            height,
            time,
            position: position as u64,
            hash: envelope.hash,
            gas_wanted: envelope.gas_wanted,
            gas_used: envelope.gas_used,
            timeout_height: decoded.timeout_height,
            events_count: events.len() as u64,
            messages_count: messages.len() as u64,
            status: if failed { TxStatus::Failed } else { TxStatus::Success },
            error: if failed { envelope.log } else { String::new() },
            codespace: envelope.codespace,
            fee: decoded.fee,
            memo: decoded.memo,
            messages,
            events,
        })
    }
}

impl BlockDecoder for DecodingService {
    fn decode_block(&self, envelope: BlockEnvelope) -> Result<Block, DecodeError> {
        let BlockEnvelope {
            height,
            hash,
            time,
            chain_id,
            txs,
            events,
            supply_change,
            validators,
            genesis_accounts,
        } = envelope;

        let events = to_events(events, height, time);
        let mut stats = BlockStats {
            height,
            time,
            events_count: events.len() as u64,
            supply_change,
            ..Default::default()
        };

        let mut decoded = Vec::with_capacity(txs.len());
        for (position, tx) in txs.into_iter().enumerate() {
            let tx = self
                .decode_one(tx, height, time, position)
                .map_err(|e| e.in_tx(height, position))?;

            stats.tx_count += 1;
            stats.events_count += tx.events_count;
            stats.fee += tx.fee.clone();
            for blob in tx.messages.iter().flat_map(|m| m.kind.namespaces()) {
                stats.blobs_size += blob.size;
                stats.blobs_count += 1;
            }
            decoded.push(tx);
        }

        let genesis_accounts = genesis_accounts
            .into_iter()
            .map(|account| {
                Ok(GenesisAccount {
                    hash: decode_address(&account.address, &self.config.address_prefix)?,
                    balance: account.balance,
                })
            })
            .collect::<Result<Vec<_>, DecodeError>>()?;

        debug!(
            height,
            txs = stats.tx_count,
            blobs_size = stats.blobs_size,
            "[idx-01] block decoded"
        );

        Ok(Block {
            height,
            hash,
            time,
            chain_id,
            stats,
            txs: decoded,
            events,
            validators,
            genesis_accounts,
        })
    }
}

fn to_events(events: Vec<EventEnvelope>, height: u64, time: DateTime<Utc>) -> Vec<Event> {
    events
        .into_iter()
        .enumerate()
        .map(|(position, e)| Event {
            id: 0,
            height,
            time,
            position: position as u64,
            tx_id: None,
            event_type: e.event_type,
            data: e.attributes,
        })
        .collect()
}
