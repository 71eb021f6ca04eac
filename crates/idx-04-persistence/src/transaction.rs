//! # Storage Transaction
//!
//! A unit of work scoped to one block. Writes are staged in memory over a
//! read-through view of the key-value store; reads see staged writes first.
//!
//! ```text
//! begin() ──→ stage writes ──→ flush()    : one KeyValueStore::commit
//!                          └─→ rollback() : staged set dropped
//! ```
//!
//! The transaction holds the store mutably, so at most one is active per
//! store at any time.

use crate::codec::{decode, decode_id, encode, encode_id};
use crate::domain::keys::{self, KeyRange, Table};
use crate::domain::{PartitionPeriod, PARTITIONED_TABLES};
use crate::ports::{ChangeSet, KeyValueStore, ScanResult};
use async_trait::async_trait;
use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use idx_02_entity_graph::EntityStore;
use idx_03_validator_lifecycle::ValidatorStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types::{
    Address, BalanceUpdate, Block, BlockStats, Delegation, Event, Jail, Message, Namespace,
    NamespaceMessage, State, StoreError, Tx, TxAddress, Validator,
};
use std::collections::BTreeMap;
use tracing::debug;

/// Opens storage transactions.
pub trait Transactable {
    type Store: KeyValueStore;

    fn begin(&mut self) -> StorageTransaction<'_, Self::Store>;
}

impl<K: KeyValueStore> Transactable for K {
    type Store = K;

    fn begin(&mut self) -> StorageTransaction<'_, K> {
        StorageTransaction::new(self)
    }
}

/// One row of a heterogeneous bulk insert.
#[derive(Debug)]
pub enum Record<'r> {
    Message(&'r mut Message),
    Event(&'r mut Event),
}

pub struct StorageTransaction<'a, K: KeyValueStore> {
    kv: &'a mut K,
    staged: ChangeSet,
    period: PartitionPeriod,
}

impl<'a, K: KeyValueStore> StorageTransaction<'a, K> {
    pub fn new(kv: &'a mut K) -> Self {
        Self {
            kv,
            staged: ChangeSet::new(),
            period: PartitionPeriod::default(),
        }
    }

    pub fn with_period(mut self, period: PartitionPeriod) -> Self {
        self.period = period;
        self
    }

    /// Number of staged writes.
    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    // ---------------------------------------------------------------------
    // Read-through view
    // ---------------------------------------------------------------------

    fn read(&self, op: &'static str, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        match self.staged.get(key) {
            Some(value) => Ok(value.clone()),
            None => self.kv.get(key).map_err(|e| e.during(op)),
        }
    }

    fn contains(&self, op: &'static str, key: &[u8]) -> Result<bool, StoreError> {
        match self.staged.get(key) {
            Some(value) => Ok(value.is_some()),
            None => self.kv.contains(key).map_err(|e| e.during(op)),
        }
    }

    fn load<T: DeserializeOwned>(
        &self,
        op: &'static str,
        key: &[u8],
    ) -> Result<Option<T>, StoreError> {
        self.read(op, key)?
            .map(|bytes| decode(op, &bytes))
            .transpose()
    }

    fn load_id(&self, op: &'static str, key: &[u8]) -> Result<Option<u64>, StoreError> {
        self.read(op, key)?
            .map(|bytes| decode_id(op, &bytes))
            .transpose()
    }

    fn require<T: DeserializeOwned>(
        &self,
        op: &'static str,
        table: Table,
        id: u64,
    ) -> Result<T, StoreError> {
        self.load(op, &table.row_key(id))?
            .ok_or_else(|| StoreError::new(op, format!("{} {} not found", table.as_str(), id)))
    }

    /// Committed rows inside `range` merged with staged writes.
    fn scan(&self, op: &'static str, range: &KeyRange) -> Result<ScanResult, StoreError> {
        let mut rows: BTreeMap<Vec<u8>, Vec<u8>> = self
            .kv
            .scan(range)
            .map_err(|e| e.during(op))?
            .into_iter()
            .collect();

        for (key, value) in self.staged.range::<[u8], _>(range.bounds()) {
            match value {
                Some(value) => {
                    rows.insert(key.clone(), value.clone());
                }
                None => {
                    rows.remove(key);
                }
            }
        }
        Ok(rows.into_iter().collect())
    }

    fn stage<T: Serialize + ?Sized>(
        &mut self,
        op: &'static str,
        key: Vec<u8>,
        value: &T,
    ) -> Result<(), StoreError> {
        let bytes = encode(op, value)?;
        self.staged.insert(key, Some(bytes));
        Ok(())
    }

    /// Inserts a row that must not exist yet.
    fn insert_new<T: Serialize + ?Sized>(
        &mut self,
        op: &'static str,
        key: Vec<u8>,
        value: &T,
    ) -> Result<(), StoreError> {
        if self.contains(op, &key)? {
            return Err(StoreError::new(op, "duplicate key"));
        }
        self.stage(op, key, value)
    }

    fn next_id(&mut self, op: &'static str, table: Table) -> Result<u64, StoreError> {
        let key = keys::sequence_key(table);
        let id = self.load_id(op, &key)?.unwrap_or(0) + 1;
        self.staged.insert(key, Some(encode_id(id)));
        Ok(id)
    }

    // ---------------------------------------------------------------------
    // Partitions
    // ---------------------------------------------------------------------

    /// Registers the partitions covering `time`; existing ones are left alone.
    ///
    /// Returns how many were created.
    pub fn ensure_partitions(&mut self, time: DateTime<Utc>) -> Result<usize, StoreError> {
        const OP: &str = "ensure_partitions";
        let mut created = 0;
        for table in PARTITIONED_TABLES {
            let partition = self.period.partition(table, time);
            let key = keys::partition_registry_key(&partition.name);
            if self.contains(OP, &key)? {
                continue;
            }
            debug!(partition = %partition.name, "[idx-04] partition created");
            self.stage(OP, key, &partition)?;
            created += 1;
        }
        Ok(created)
    }

    fn partition_for(
        &self,
        op: &'static str,
        table: Table,
        time: DateTime<Utc>,
    ) -> Result<String, StoreError> {
        let name = self.period.name(table, time);
        if !self.contains(op, &keys::partition_registry_key(&name))? {
            return Err(StoreError::new(op, format!("partition {} does not exist", name)));
        }
        Ok(name)
    }

    // ---------------------------------------------------------------------
    // Block rows
    // ---------------------------------------------------------------------

    pub fn add_block(&mut self, block: &Block) -> Result<(), StoreError> {
        self.insert_new("add_block", keys::block_key(block.height), block)
    }

    pub fn add_block_stats(&mut self, stats: &BlockStats) -> Result<(), StoreError> {
        self.insert_new("add_block_stats", keys::block_stats_key(stats.height), stats)
    }

    /// Inserts transactions into their partitions, assigning identities.
    pub fn save_transactions(&mut self, txs: &mut [Tx]) -> Result<(), StoreError> {
        const OP: &str = "save_transactions";
        for tx in txs.iter_mut() {
            let partition = self.partition_for(OP, Table::Tx, tx.time)?;
            tx.id = self.next_id(OP, Table::Tx)?;
            self.stage(OP, keys::partitioned_key(&partition, tx.id), &*tx)?;
        }
        Ok(())
    }

    /// Inserts messages and events in one pass, assigning identities.
    pub fn bulk_save(&mut self, records: Vec<Record<'_>>) -> Result<(), StoreError> {
        const OP: &str = "bulk_save";
        for record in records {
            match record {
                Record::Message(message) => {
                    let partition = self.partition_for(OP, Table::Message, message.time)?;
                    message.id = self.next_id(OP, Table::Message)?;
                    self.stage(OP, keys::partitioned_key(&partition, message.id), &*message)?;
                }
                Record::Event(event) => {
                    let partition = self.partition_for(OP, Table::Event, event.time)?;
                    event.id = self.next_id(OP, Table::Event)?;
                    self.stage(OP, keys::partitioned_key(&partition, event.id), &*event)?;
                }
            }
        }
        Ok(())
    }

    pub fn save_namespace_messages(&mut self, rows: &[NamespaceMessage]) -> Result<(), StoreError> {
        for row in rows {
            let key = keys::namespace_message_key(row.namespace_id, row.msg_id);
            self.insert_new("save_namespace_messages", key, row)?;
        }
        Ok(())
    }

    pub fn save_tx_addresses(&mut self, rows: &[TxAddress]) -> Result<(), StoreError> {
        for row in rows {
            let key = keys::tx_address_key(row.address_id, row.tx_id, row.role);
            self.insert_new("save_tx_addresses", key, row)?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Indexer state
    // ---------------------------------------------------------------------

    pub fn state(&self, name: &str) -> Result<Option<State>, StoreError> {
        self.load("state", &keys::state_key(name))
    }

    pub fn save_state(&mut self, state: &State) -> Result<(), StoreError> {
        self.stage("save_state", keys::state_key(&state.name), state)
    }

    // ---------------------------------------------------------------------
    // Completion
    // ---------------------------------------------------------------------

    /// Writes every staged change in one atomic batch.
    ///
    /// Returns the number of keys written.
    pub fn flush(self) -> Result<usize, StoreError> {
        let count = self.staged.len();
        self.kv
            .commit(self.staged)
            .map_err(|e| e.during("flush"))?;
        Ok(count)
    }

    /// Discards every staged change; returns how many were dropped.
    pub fn rollback(self) -> usize {
        self.staged.len()
    }
}

#[async_trait]
impl<'a, K: KeyValueStore> EntityStore for StorageTransaction<'a, K> {
    async fn save_addresses(&mut self, addresses: &mut [Address]) -> Result<u64, StoreError> {
        const OP: &str = "save_addresses";
        let mut created = 0;
        for address in addresses.iter_mut() {
            let index_key = keys::address_hash_key(&address.hash);
            match self.load_id(OP, &index_key)? {
                Some(id) => {
                    let mut row: Address = self.require(OP, Table::Address, id)?;
                    row.last_height = row.last_height.max(address.last_height);
                    row.balance.spendable += address.balance.spendable.clone();
                    row.balance.delegated += address.balance.delegated.clone();
                    self.stage(OP, Table::Address.row_key(id), &row)?;
                    address.id = id;
                    address.height = row.height;
                }
                None => {
                    address.id = self.next_id(OP, Table::Address)?;
                    self.stage(OP, Table::Address.row_key(address.id), &*address)?;
                    self.staged.insert(index_key, Some(encode_id(address.id)));
                    created += 1;
                }
            }
        }
        Ok(created)
    }

    async fn save_namespaces(&mut self, namespaces: &mut [Namespace]) -> Result<u64, StoreError> {
        const OP: &str = "save_namespaces";
        let mut created = 0;
        for namespace in namespaces.iter_mut() {
            let index_key = keys::namespace_key_index(&namespace.key);
            match self.load_id(OP, &index_key)? {
                Some(id) => {
                    let mut row: Namespace = self.require(OP, Table::Namespace, id)?;
                    row.size += namespace.size;
                    row.pfb_count += namespace.pfb_count;
                    row.last_height = namespace.last_height;
                    row.last_message_time = namespace.last_message_time;
                    self.stage(OP, Table::Namespace.row_key(id), &row)?;
                    namespace.id = id;
                }
                None => {
                    namespace.id = self.next_id(OP, Table::Namespace)?;
                    self.stage(OP, Table::Namespace.row_key(namespace.id), &*namespace)?;
                    self.staged.insert(index_key, Some(encode_id(namespace.id)));
                    created += 1;
                }
            }
        }
        Ok(created)
    }
}

#[async_trait]
impl<'a, K: KeyValueStore> ValidatorStore for StorageTransaction<'a, K> {
    async fn save_validators(&mut self, validators: &mut [Validator]) -> Result<usize, StoreError> {
        const OP: &str = "save_validators";
        let mut written = 0;
        for validator in validators.iter_mut() {
            let index_key = keys::validator_address_key(&validator.address);
            match self.load_id(OP, &index_key)? {
                Some(id) => {
                    let existing: Validator = self.require(OP, Table::Validator, id)?;
                    let mut merged = existing.clone();
                    if !validator.cons_address.is_empty() {
                        merged.cons_address = validator.cons_address.clone();
                    }
                    if !validator.moniker.is_empty() {
                        merged.moniker = validator.moniker.clone();
                    }
                    merged.rate = validator.rate.clone();
                    if merged != existing {
                        self.stage(OP, Table::Validator.row_key(id), &merged)?;
                        written += 1;
                    }
                    *validator = merged;
                }
                None => {
                    validator.id = self.next_id(OP, Table::Validator)?;
                    self.stage(OP, Table::Validator.row_key(validator.id), &*validator)?;
                    self.staged.insert(index_key, Some(encode_id(validator.id)));
                    written += 1;
                }
            }
        }
        Ok(written)
    }

    async fn jail(&mut self, validators: &[Validator]) -> Result<(), StoreError> {
        const OP: &str = "jail";
        for validator in validators {
            let mut row: Validator = self.require(OP, Table::Validator, validator.id)?;
            row.jailed = true;
            self.stage(OP, Table::Validator.row_key(validator.id), &row)?;
        }
        Ok(())
    }

    async fn save_jails(&mut self, jails: &mut [Jail]) -> Result<(), StoreError> {
        const OP: &str = "save_jails";
        for jail in jails.iter_mut() {
            jail.id = self.next_id(OP, Table::Jail)?;
            self.stage(OP, Table::Jail.row_key(jail.id), &*jail)?;
        }
        Ok(())
    }

    async fn update_slashed_delegations(
        &mut self,
        validator_id: u64,
        fraction: &BigDecimal,
    ) -> Result<Vec<BalanceUpdate>, StoreError> {
        const OP: &str = "update_slashed_delegations";
        let delegators: Vec<u64> = self
            .scan(OP, &KeyRange::delegations_to(validator_id))?
            .iter()
            .filter_map(|(key, _)| keys::delegator_from_index_key(key))
            .collect();

        let mut updates = Vec::with_capacity(delegators.len());
        let mut total = BigDecimal::zero();
        for address_id in delegators {
            let key = keys::delegation_key(address_id, validator_id);
            let Some(mut delegation) = self.load::<Delegation>(OP, &key)? else {
                continue;
            };
            let cut = &delegation.amount * fraction;
            if cut.is_zero() {
                continue;
            }
            delegation.amount -= cut.clone();
            self.stage(OP, key, &delegation)?;
            total += cut.clone();
            updates.push(BalanceUpdate {
                address_id,
                spendable: BigDecimal::zero(),
                delegated: -cut,
            });
        }

        if !total.is_zero() {
            let mut validator: Validator = self.require(OP, Table::Validator, validator_id)?;
            validator.stake -= total;
            self.stage(OP, Table::Validator.row_key(validator_id), &validator)?;
        }
        Ok(updates)
    }

    async fn save_balances(&mut self, updates: &[BalanceUpdate]) -> Result<(), StoreError> {
        const OP: &str = "save_balances";
        for update in updates {
            let mut row: Address = self.require(OP, Table::Address, update.address_id)?;
            row.balance.spendable += update.spendable.clone();
            row.balance.delegated += update.delegated.clone();
            self.stage(OP, Table::Address.row_key(update.address_id), &row)?;
        }
        Ok(())
    }

    async fn save_delegation_changes(&mut self, changes: &[Delegation]) -> Result<(), StoreError> {
        const OP: &str = "save_delegation_changes";
        for change in changes {
            let key = keys::delegation_key(change.address_id, change.validator_id);
            let delegation = match self.load::<Delegation>(OP, &key)? {
                Some(mut existing) => {
                    existing.amount += change.amount.clone();
                    existing
                }
                None => {
                    let index_key =
                        keys::delegation_by_validator_key(change.validator_id, change.address_id);
                    self.staged.insert(index_key, Some(Vec::new()));
                    change.clone()
                }
            };
            self.stage(OP, key, &delegation)?;

            let mut validator: Validator =
                self.require(OP, Table::Validator, change.validator_id)?;
            validator.stake += change.amount.clone();
            self.stage(OP, Table::Validator.row_key(change.validator_id), &validator)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryKVStore;
    use std::str::FromStr;

    // ===== TEST HELPERS =====

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn make_tx(time: DateTime<Utc>) -> Tx {
        Tx {
            height: 1000,
            time,
            ..Default::default()
        }
    }

    // ===== PARTITIONS =====

    #[test]
    fn test_ensure_partitions_is_idempotent() {
        let mut kv = InMemoryKVStore::new();
        let time = at("2023-11-30T10:00:00Z");

        let mut tx = kv.begin();
        assert_eq!(tx.ensure_partitions(time).unwrap(), 3);
        assert_eq!(tx.ensure_partitions(time).unwrap(), 0);
        tx.flush().unwrap();

        let mut tx = kv.begin();
        assert_eq!(tx.ensure_partitions(time).unwrap(), 0);
        assert!(kv.contains(&keys::partition_registry_key("tx_2023_11")).unwrap());
    }

    #[test]
    fn test_row_without_partition_is_rejected() {
        let mut kv = InMemoryKVStore::new();
        let mut tx = kv.begin();

        let err = tx
            .save_transactions(&mut [make_tx(at("2023-11-30T10:00:00Z"))])
            .unwrap_err();

        assert_eq!(err.operation, "save_transactions");
        assert!(err.message.contains("tx_2023_11"));
    }

    // ===== UNIT OF WORK =====

    #[test]
    fn test_rollback_leaves_store_untouched() {
        let mut kv = InMemoryKVStore::new();
        let time = at("2023-11-30T10:00:00Z");

        let mut tx = kv.begin();
        tx.ensure_partitions(time).unwrap();
        tx.save_transactions(&mut [make_tx(time)]).unwrap();
        assert!(tx.rollback() > 0);

        assert!(kv.is_empty());
    }

    #[test]
    fn test_identities_continue_across_transactions() {
        let mut kv = InMemoryKVStore::new();
        let time = at("2023-11-30T10:00:00Z");

        let mut first = [make_tx(time), make_tx(time)];
        let mut tx = kv.begin();
        tx.ensure_partitions(time).unwrap();
        tx.save_transactions(&mut first).unwrap();
        tx.flush().unwrap();

        let mut second = [make_tx(time)];
        let mut tx = kv.begin();
        tx.save_transactions(&mut second).unwrap();

        assert_eq!((first[0].id, first[1].id), (1, 2));
        assert_eq!(second[0].id, 3);
    }

    #[test]
    fn test_duplicate_block_rejected() {
        let mut kv = InMemoryKVStore::new();
        let block = Block {
            height: 5,
            ..Default::default()
        };

        let mut tx = kv.begin();
        tx.add_block(&block).unwrap();
        let err = tx.add_block(&block).unwrap_err();

        assert_eq!(err.operation, "add_block");
    }

    // ===== ENTITY UPSERTS =====

    #[tokio::test]
    async fn test_address_upsert_keeps_identity_and_first_height() {
        let mut kv = InMemoryKVStore::new();
        let mut tx = kv.begin();
        let mut first = [Address::new(vec![1; 20], 10)];
        assert_eq!(tx.save_addresses(&mut first).await.unwrap(), 1);
        tx.flush().unwrap();

        let mut tx = kv.begin();
        let mut again = [Address::new(vec![1; 20], 20)];
        let created = tx.save_addresses(&mut again).await.unwrap();
        tx.flush().unwrap();

        assert_eq!(created, 0);
        assert_eq!(again[0].id, first[0].id);
        let bytes = kv.get(&Table::Address.row_key(first[0].id)).unwrap().unwrap();
        let stored: Address = decode("test", &bytes).unwrap();
        assert_eq!((stored.height, stored.last_height), (10, 20));
    }

    #[tokio::test]
    async fn test_validator_upsert_counts_only_changes() {
        let mut kv = InMemoryKVStore::new();
        let validator = Validator {
            address: "valoper1".into(),
            cons_address: "CC01".into(),
            moniker: "alpha".into(),
            ..Default::default()
        };

        let mut tx = kv.begin();
        assert_eq!(tx.save_validators(&mut [validator.clone()]).await.unwrap(), 1);
        assert_eq!(tx.save_validators(&mut [validator.clone()]).await.unwrap(), 0);

        let mut renamed = [Validator {
            moniker: "beta".into(),
            ..validator
        }];
        assert_eq!(tx.save_validators(&mut renamed).await.unwrap(), 1);
        assert_eq!(renamed[0].id, 1);
    }

    // ===== DELEGATIONS =====

    #[tokio::test]
    async fn test_slashing_scans_staged_delegations() {
        let mut kv = InMemoryKVStore::new();
        let mut tx = kv.begin();
        let mut addresses = [Address::new(vec![1; 20], 1), Address::new(vec![2; 20], 1)];
        tx.save_addresses(&mut addresses).await.unwrap();
        let mut validators = [Validator {
            address: "valoper1".into(),
            ..Default::default()
        }];
        tx.save_validators(&mut validators).await.unwrap();
        tx.save_delegation_changes(&[
            Delegation {
                address_id: 1,
                validator_id: 1,
                amount: dec("1000"),
            },
            Delegation {
                address_id: 2,
                validator_id: 1,
                amount: dec("400"),
            },
        ])
        .await
        .unwrap();

        let updates = tx.update_slashed_delegations(1, &dec("0.05")).await.unwrap();

        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].delegated, dec("-50"));
        assert_eq!(updates[1].delegated, dec("-20"));
        let validator: Validator = tx.require("test", Table::Validator, 1).unwrap();
        assert_eq!(validator.stake, dec("1330"));
    }

    #[tokio::test]
    async fn test_slashing_merges_committed_delegations_of_one_validator() {
        // Arrange
        let mut kv = InMemoryKVStore::new();
        let mut tx = kv.begin();
        let mut addresses = [Address::new(vec![1; 20], 1), Address::new(vec![2; 20], 1)];
        tx.save_addresses(&mut addresses).await.unwrap();
        let mut validators = [
            Validator {
                address: "valoper1".into(),
                ..Default::default()
            },
            Validator {
                address: "valoper2".into(),
                ..Default::default()
            },
        ];
        tx.save_validators(&mut validators).await.unwrap();
        tx.save_delegation_changes(&[
            Delegation {
                address_id: 1,
                validator_id: 1,
                amount: dec("1000"),
            },
            Delegation {
                address_id: 1,
                validator_id: 2,
                amount: dec("700"),
            },
        ])
        .await
        .unwrap();
        tx.flush().unwrap();

        let mut tx = kv.begin();
        tx.save_delegation_changes(&[Delegation {
            address_id: 2,
            validator_id: 1,
            amount: dec("400"),
        }])
        .await
        .unwrap();

        // Act
        let updates = tx.update_slashed_delegations(1, &dec("0.5")).await.unwrap();

        // Assert
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].address_id, 1);
        assert_eq!(updates[0].delegated, dec("-500"));
        assert_eq!(updates[1].delegated, dec("-200"));
        let untouched: Delegation = tx
            .load("test", &keys::delegation_key(1, 2))
            .unwrap()
            .unwrap();
        assert_eq!(untouched.amount, dec("700"));
    }
}
