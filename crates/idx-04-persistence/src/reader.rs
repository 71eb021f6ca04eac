//! # Storage Reader
//!
//! Read access to committed rows. Used on start (index rebuild, resume
//! height) and by tests; nothing staged in an open transaction is visible.

use crate::codec::{decode, decode_id};
use crate::domain::keys::{self, KeyRange, Table};
use crate::domain::{Partition, PARTITIONED_TABLES};
use crate::ports::KeyValueStore;
use serde::de::DeserializeOwned;
use shared_types::{
    Address, Block, BlockStats, Delegation, Event, Jail, Message, Namespace, NamespaceKey,
    NamespaceMessage, State, StoreError, Tx, TxAddress, Validator,
};

pub struct StorageReader<'a, K: KeyValueStore> {
    kv: &'a K,
}

impl<'a, K: KeyValueStore> StorageReader<'a, K> {
    pub fn new(kv: &'a K) -> Self {
        Self { kv }
    }

    fn load<T: DeserializeOwned>(
        &self,
        op: &'static str,
        key: &[u8],
    ) -> Result<Option<T>, StoreError> {
        self.kv
            .get(key)
            .map_err(|e| e.during(op))?
            .map(|bytes| decode(op, &bytes))
            .transpose()
    }

    fn load_by_index<T: DeserializeOwned>(
        &self,
        op: &'static str,
        table: Table,
        index_key: &[u8],
    ) -> Result<Option<T>, StoreError> {
        let Some(bytes) = self.kv.get(index_key).map_err(|e| e.during(op))? else {
            return Ok(None);
        };
        let id = decode_id(op, &bytes)?;
        self.load(op, &table.row_key(id))
    }

    fn rows<T: DeserializeOwned>(
        &self,
        op: &'static str,
        range: &KeyRange,
    ) -> Result<Vec<T>, StoreError> {
        self.kv
            .scan(range)
            .map_err(|e| e.during(op))?
            .iter()
            .map(|(_, value)| decode(op, value))
            .collect()
    }

    fn partitioned_rows<T: DeserializeOwned>(
        &self,
        op: &'static str,
        table: Table,
    ) -> Result<Vec<T>, StoreError> {
        let mut rows = Vec::new();
        for partition in self.partitions()? {
            if partition.table == table.as_str() {
                rows.extend(self.rows::<T>(op, &KeyRange::partition(&partition.name))?);
            }
        }
        Ok(rows)
    }

    pub fn state(&self, name: &str) -> Result<Option<State>, StoreError> {
        self.load("read_state", &keys::state_key(name))
    }

    pub fn block(&self, height: u64) -> Result<Option<Block>, StoreError> {
        self.load("read_block", &keys::block_key(height))
    }

    pub fn block_stats(&self, height: u64) -> Result<Option<BlockStats>, StoreError> {
        self.load("read_block_stats", &keys::block_stats_key(height))
    }

    pub fn address(&self, hash: &[u8]) -> Result<Option<Address>, StoreError> {
        self.load_by_index("read_address", Table::Address, &keys::address_hash_key(hash))
    }

    pub fn namespace(&self, key: &NamespaceKey) -> Result<Option<Namespace>, StoreError> {
        self.load_by_index("read_namespace", Table::Namespace, &keys::namespace_key_index(key))
    }

    pub fn validator(&self, operator: &str) -> Result<Option<Validator>, StoreError> {
        let index_key = keys::validator_address_key(operator);
        self.load_by_index("read_validator", Table::Validator, &index_key)
    }

    pub fn validators(&self) -> Result<Vec<Validator>, StoreError> {
        self.rows("read_validators", &KeyRange::table(Table::Validator))
    }

    pub fn jails(&self) -> Result<Vec<Jail>, StoreError> {
        self.rows("read_jails", &KeyRange::table(Table::Jail))
    }

    pub fn delegations(&self) -> Result<Vec<Delegation>, StoreError> {
        self.rows("read_delegations", &KeyRange::table(Table::Delegation))
    }

    pub fn namespace_messages(&self) -> Result<Vec<NamespaceMessage>, StoreError> {
        self.rows("read_namespace_messages", &KeyRange::table(Table::NamespaceMessage))
    }

    pub fn tx_addresses(&self) -> Result<Vec<TxAddress>, StoreError> {
        self.rows("read_tx_addresses", &KeyRange::table(Table::TxAddress))
    }

    pub fn partitions(&self) -> Result<Vec<Partition>, StoreError> {
        self.rows("read_partitions", &KeyRange::partitions())
    }

    pub fn transactions(&self) -> Result<Vec<Tx>, StoreError> {
        self.partitioned_rows("read_transactions", Table::Tx)
    }

    pub fn messages(&self) -> Result<Vec<Message>, StoreError> {
        self.partitioned_rows("read_messages", Table::Message)
    }

    pub fn events(&self) -> Result<Vec<Event>, StoreError> {
        self.partitioned_rows("read_events", Table::Event)
    }

    /// Number of rows in `table`, across partitions where it has them.
    pub fn count(&self, table: Table) -> Result<usize, StoreError> {
        const OP: &str = "count";
        if !PARTITIONED_TABLES.contains(&table) {
            return self
                .kv
                .count(&KeyRange::table(table))
                .map_err(|e| e.during(OP));
        }
        let mut total = 0;
        for partition in self.partitions()? {
            if partition.table == table.as_str() {
                total += self
                    .kv
                    .count(&KeyRange::partition(&partition.name))
                    .map_err(|e| e.during(OP))?;
            }
        }
        Ok(total)
    }
}
