//! # Persistence Coordinator
//!
//! Commits one block's derived entity graph in a single storage transaction.
//!
//! ## Write Order
//!
//! Later writes depend on identities assigned by earlier ones:
//!
//! 1. Height check against the state row
//! 2. Partitions for the block time
//! 3. Block, then its stats
//! 4. Transactions
//! 5. Addresses, then namespaces
//! 6. Messages and events
//! 7. `NamespaceMessage` and `TxAddress` junction rows
//! 8. Validator lifecycle (jails, slashing, upserts, delegations)
//! 9. State row
//! 10. Flush, then apply pending validator index entries
//!
//! Any failure before the flush drops the whole transaction.

use crate::domain::{PartitionPeriod, PersistenceError};
use crate::ports::KeyValueStore;
use crate::reader::StorageReader;
use crate::transaction::{Record, StorageTransaction, Transactable};
use idx_02_entity_graph::{link_transactions, BlockGraph, PersistedCounts};
use idx_03_validator_lifecycle::{
    stake_changes, LifecycleOutcome, SlashingConfig, ValidatorIndex, ValidatorLifecycle,
};
use shared_types::{Block, State};
use std::time::Instant;
use tracing::{error, info};

/// Coordinator settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorConfig {
    /// Key of the state row.
    pub indexer_name: String,
    pub partition_period: PartitionPeriod,
    pub slashing: SlashingConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            indexer_name: "celestia_indexer".to_string(),
            partition_period: PartitionPeriod::Monthly,
            slashing: SlashingConfig::default(),
        }
    }
}

/// Outcome of a committed block.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitReport {
    pub height: u64,
    /// State row as written with the block.
    pub state: State,
    pub new_addresses: u64,
    pub new_namespaces: u64,
    pub validators_written: usize,
    /// Keys written by the flush.
    pub rows_written: usize,
    pub elapsed_ms: u64,
}

/// Everything staged for one block, before flush.
struct Staged {
    state: State,
    counts: PersistedCounts,
    outcome: LifecycleOutcome,
}

pub struct PersistenceCoordinator<K: KeyValueStore> {
    kv: K,
    config: CoordinatorConfig,
    lifecycle: ValidatorLifecycle,
    index: ValidatorIndex,
}

impl<K: KeyValueStore> PersistenceCoordinator<K> {
    /// Wraps `kv`, rebuilding the validator index from committed rows.
    pub fn new(kv: K, config: CoordinatorConfig) -> Result<Self, PersistenceError> {
        let validators = StorageReader::new(&kv).validators()?;
        let index = ValidatorIndex::rebuild(&validators);
        info!(validators = index.len(), "[idx-04] validator index rebuilt");

        Ok(Self {
            lifecycle: ValidatorLifecycle::new(config.slashing.clone()),
            kv,
            config,
            index,
        })
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn index(&self) -> &ValidatorIndex {
        &self.index
    }

    pub fn reader(&self) -> StorageReader<'_, K> {
        StorageReader::new(&self.kv)
    }

    /// Height of the last committed block, if any.
    pub fn last_height(&self) -> Result<Option<u64>, PersistenceError> {
        let state = self.reader().state(&self.config.indexer_name)?;
        Ok(state.map(|s| s.last_height))
    }

    pub fn into_inner(self) -> K {
        self.kv
    }

    /// Commits `block` atomically.
    ///
    /// `block` is not modified, so a failed commit can be retried with the
    /// same value.
    pub async fn commit(&mut self, block: &Block) -> Result<CommitReport, PersistenceError> {
        let started = Instant::now();
        let mut block = block.clone();
        let mut graph = BlockGraph::collect(&block)?;

        let mut tx = self.kv.begin().with_period(self.config.partition_period);
        let written = write_block(
            &mut tx,
            &self.lifecycle,
            &self.index,
            &self.config.indexer_name,
            &mut block,
            &mut graph,
        )
        .await;

        let staged = match written {
            Ok(staged) => staged,
            Err(err) => {
                let discarded = tx.rollback();
                error!(
                    height = block.height,
                    discarded,
                    error = %err,
                    "[idx-04] block rolled back"
                );
                return Err(err);
            }
        };

        let rows_written = tx.flush().map_err(|err| {
            error!(height = block.height, error = %err, "[idx-04] block flush failed");
            PersistenceError::from(err)
        })?;
        self.index.apply(staged.outcome.pending);

        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            height = block.height,
            block_ns_size = block.stats.blobs_size,
            block_fee = %block.stats.fee,
            ms = elapsed_ms,
            "[idx-04] block saved"
        );

        Ok(CommitReport {
            height: block.height,
            state: staged.state,
            new_addresses: staged.counts.new_addresses,
            new_namespaces: staged.counts.new_namespaces,
            validators_written: staged.outcome.written,
            rows_written,
            elapsed_ms,
        })
    }
}

async fn write_block<K: KeyValueStore>(
    tx: &mut StorageTransaction<'_, K>,
    lifecycle: &ValidatorLifecycle,
    index: &ValidatorIndex,
    indexer_name: &str,
    block: &mut Block,
    graph: &mut BlockGraph,
) -> Result<Staged, PersistenceError> {
    let previous = tx.state(indexer_name)?;
    if let Some(state) = &previous {
        let expected = state.last_height + 1;
        if block.height != expected {
            return Err(PersistenceError::HeightGap {
                expected,
                got: block.height,
            });
        }
    }

    tx.ensure_partitions(block.time)?;
    tx.add_block(block)?;
    tx.add_block_stats(&block.stats)?;
    tx.save_transactions(&mut block.txs)?;
    link_transactions(block)?;

    let counts = graph.persist_entities(tx).await?;

    let mut records: Vec<Record<'_>> = block.events.iter_mut().map(Record::Event).collect();
    for t in block.txs.iter_mut() {
        records.extend(t.messages.iter_mut().map(Record::Message));
        records.extend(t.events.iter_mut().map(Record::Event));
    }
    tx.bulk_save(records)?;

    let (namespace_messages, tx_addresses) = graph.junctions(block)?;
    tx.save_namespace_messages(&namespace_messages)?;
    tx.save_tx_addresses(&tx_addresses)?;

    let changes = stake_changes(block);
    let outcome = lifecycle
        .apply(
            tx,
            index,
            &mut block.validators,
            &changes,
            &graph.address_ids(),
        )
        .await?;

    let state = next_state(previous, indexer_name, block, counts);
    tx.save_state(&state)?;

    Ok(Staged {
        state,
        counts,
        outcome,
    })
}

fn next_state(
    previous: Option<State>,
    indexer_name: &str,
    block: &Block,
    counts: PersistedCounts,
) -> State {
    let mut state = previous.unwrap_or_else(|| State {
        id: 1,
        name: indexer_name.to_string(),
        ..Default::default()
    });
    state.last_height = block.height;
    state.last_hash = block.hash.clone();
    state.last_time = block.time;
    state.chain_id = block.chain_id.clone();
    state.total_tx += block.stats.tx_count;
    state.total_accounts += counts.new_addresses;
    state.total_namespaces += counts.new_namespaces;
    state.total_blobs_size += block.stats.blobs_size;
    state.total_supply += block.stats.supply_change.clone();
    state.total_fee += block.stats.fee.clone();
    state
}
