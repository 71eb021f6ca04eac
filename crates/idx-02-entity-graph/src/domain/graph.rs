//! # Block Graph
//!
//! Per-block dedup of addresses and namespaces and construction of the
//! junction rows that reference them.
//!
//! ## Lifecycle
//!
//! ```text
//! collect(block) ─→ [txs saved] ─→ link_transactions ─→ persist_entities(store)
//!                                                            │
//!                    [messages saved] ─→ junctions(block) ←──┘
//! ```

use super::arena::Arena;
use super::errors::GraphError;
use crate::ports::EntityStore;
use chrono::{DateTime, Utc};
use shared_types::{
    Address, AddressHash, Block, MessageRefs, Namespace, NamespaceKey, NamespaceMessage,
    TxAddress, TxAddressType,
};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// A namespace touched by one message.
#[derive(Debug, Clone, Copy)]
struct NamespaceRef {
    tx: usize,
    message: usize,
    slot: usize,
    /// Only the first toucher in the block resolves to the namespace identity.
    first: bool,
}

/// An address referenced by one transaction.
#[derive(Debug, Clone, Copy)]
struct AddressRef {
    tx: usize,
    slot: usize,
    role: TxAddressType,
}

/// Rows created by [`BlockGraph::persist_entities`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistedCounts {
    pub new_addresses: u64,
    pub new_namespaces: u64,
}

/// Deduplicated entities of one block.
#[derive(Debug)]
pub struct BlockGraph {
    height: u64,
    addresses: Arena<AddressHash, Address>,
    namespaces: Arena<NamespaceKey, Namespace>,
    namespace_refs: Vec<NamespaceRef>,
    address_refs: Vec<AddressRef>,
    persisted: bool,
}

impl BlockGraph {
    /// Walks transactions, messages and namespace references in block order
    /// and interns every address and namespace on first sight.
    pub fn collect(block: &Block) -> Result<Self, GraphError> {
        let mut graph = Self {
            height: block.height,
            addresses: Arena::new(),
            namespaces: Arena::new(),
            namespace_refs: Vec::new(),
            address_refs: Vec::new(),
            persisted: false,
        };

        for account in &block.genesis_accounts {
            let slot = graph.intern_address(&account.hash);
            if let Some(address) = graph.addresses.get_mut(slot) {
                address.balance.spendable += account.balance.clone();
            }
        }

        for (ti, tx) in block.txs.iter().enumerate() {
            for (mi, message) in tx.messages.iter().enumerate() {
                for (role, hash) in message.kind.addresses() {
                    if hash.is_empty() {
                        return Err(GraphError::EmptyAddress {
                            tx: tx.position,
                            message: message.position,
                            role: role.as_str(),
                        });
                    }
                    let slot = graph.intern_address(hash);
                    graph.address_refs.push(AddressRef { tx: ti, slot, role });
                }

                for blob in message.kind.namespaces() {
                    let (slot, first) =
                        graph.intern_namespace(&blob.namespace, blob.size, message.time);
                    graph.namespace_refs.push(NamespaceRef {
                        tx: ti,
                        message: mi,
                        slot,
                        first,
                    });
                }
            }
        }

        debug!(
            height = block.height,
            addresses = graph.addresses.len(),
            namespaces = graph.namespaces.len(),
            "[idx-02] block graph collected"
        );
        Ok(graph)
    }

    fn intern_address(&mut self, hash: &[u8]) -> usize {
        let height = self.height;
        let (slot, _) = self
            .addresses
            .get_or_insert_with(hash.to_vec(), || Address::new(hash.to_vec(), height));
        slot
    }

    fn intern_namespace(
        &mut self,
        key: &NamespaceKey,
        size: u64,
        time: DateTime<Utc>,
    ) -> (usize, bool) {
        let height = self.height;
        let (slot, first) = self
            .namespaces
            .get_or_insert_with(key.clone(), || Namespace::new(key.clone(), height, time));
        if first {
            if let Some(namespace) = self.namespaces.get_mut(slot) {
                namespace.pfb_count = 1;
                namespace.size = size;
            }
        }
        (slot, first)
    }

    /// Bulk-saves addresses, then namespaces, so both carry durable
    /// identities before junction rows are built.
    pub async fn persist_entities<S>(
        &mut self,
        store: &mut S,
    ) -> Result<PersistedCounts, GraphError>
    where
        S: EntityStore + ?Sized,
    {
        let mut counts = PersistedCounts::default();

        if !self.addresses.is_empty() {
            counts.new_addresses = store.save_addresses(self.addresses.items_mut()).await?;
        }
        if !self.namespaces.is_empty() {
            counts.new_namespaces = store.save_namespaces(self.namespaces.items_mut()).await?;
        }

        if let Some(address) = self.addresses.items().iter().find(|a| a.id == 0) {
            return Err(GraphError::MissingIdentity {
                entity: "address",
                key: hex::encode(&address.hash),
            });
        }
        if let Some(namespace) = self.namespaces.items().iter().find(|n| n.id == 0) {
            return Err(GraphError::MissingIdentity {
                entity: "namespace",
                key: namespace.key.to_string(),
            });
        }

        self.persisted = true;
        Ok(counts)
    }

    /// Identity a namespace reference resolves to; zero for batch-local
    /// duplicates.
    fn resolved_namespace_id(&self, r: &NamespaceRef) -> u64 {
        if !r.first {
            return 0;
        }
        self.namespaces.get(r.slot).map(|n| n.id).unwrap_or(0)
    }

    /// Builds `NamespaceMessage` and `TxAddress` rows.
    ///
    /// Requires persisted entities and saved transactions and messages.
    /// `TxAddress` rows are unique per `(tx, address, role)`.
    pub fn junctions(
        &self,
        block: &Block,
    ) -> Result<(Vec<NamespaceMessage>, Vec<TxAddress>), GraphError> {
        if !self.persisted {
            return Err(GraphError::NotPersisted);
        }

        let mut namespace_messages = Vec::with_capacity(self.namespace_refs.len());
        for r in &self.namespace_refs {
            let namespace_id = self.resolved_namespace_id(r);
            if namespace_id == 0 {
                continue;
            }
            let Some(message) = block.txs.get(r.tx).and_then(|tx| tx.messages.get(r.message)) else {
                continue;
            };
            if message.id == 0 {
                return Err(GraphError::UnsavedMessage {
                    tx_id: message.tx_id,
                    position: message.position,
                });
            }
            namespace_messages.push(NamespaceMessage {
                namespace_id,
                msg_id: message.id,
                tx_id: message.tx_id,
                height: message.height,
                time: message.time,
            });
        }

        let mut seen = HashSet::new();
        let mut tx_addresses = Vec::with_capacity(self.address_refs.len());
        for r in &self.address_refs {
            let Some(tx) = block.txs.get(r.tx) else {
                continue;
            };
            if tx.id == 0 {
                return Err(GraphError::UnsavedTransaction { position: tx.position });
            }
            let address_id = self.addresses.get(r.slot).map(|a| a.id).unwrap_or(0);
            let row = TxAddress {
                tx_id: tx.id,
                address_id,
                role: r.role,
            };
            if seen.insert(row.clone()) {
                tx_addresses.push(row);
            }
        }

        Ok((namespace_messages, tx_addresses))
    }

    /// Hash → identity of every address in the block, after persisting.
    pub fn address_ids(&self) -> HashMap<AddressHash, u64> {
        self.addresses
            .items()
            .iter()
            .map(|a| (a.hash.clone(), a.id))
            .collect()
    }

    pub fn addresses(&self) -> &[Address] {
        self.addresses.items()
    }

    pub fn namespaces(&self) -> &[Namespace] {
        self.namespaces.items()
    }

    pub fn height(&self) -> u64 {
        self.height
    }
}

/// Stamps every message and transaction event with its transaction identity.
pub fn link_transactions(block: &mut Block) -> Result<(), GraphError> {
    for tx in &mut block.txs {
        if tx.id == 0 {
            return Err(GraphError::UnsavedTransaction { position: tx.position });
        }
        for message in &mut tx.messages {
            message.tx_id = tx.id;
        }
        for event in &mut tx.events {
            event.tx_id = Some(tx.id);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bigdecimal::BigDecimal;
    use shared_types::{
        BlobRef, GenesisAccount, Message, MsgKind, MsgPayForBlobs, MsgSend, StoreError, Tx,
        NAMESPACE_ID_SIZE,
    };

    // ===== TEST HELPERS =====

    /// Hands out identities like a fresh database would.
    #[derive(Default)]
    struct MockEntityStore {
        addresses: HashMap<AddressHash, u64>,
        namespaces: HashMap<NamespaceKey, u64>,
        next_id: u64,
        fail: bool,
    }

    #[async_trait]
    impl EntityStore for MockEntityStore {
        async fn save_addresses(&mut self, addresses: &mut [Address]) -> Result<u64, StoreError> {
            if self.fail {
                return Err(StoreError::new("save_addresses", "connection reset"));
            }
            let mut created = 0;
            for address in addresses.iter_mut() {
                let next = self.next_id + 1;
                let id = *self.addresses.entry(address.hash.clone()).or_insert_with(|| {
                    created += 1;
                    next
                });
                self.next_id = self.next_id.max(id);
                address.id = id;
            }
            Ok(created)
        }

        async fn save_namespaces(
            &mut self,
            namespaces: &mut [Namespace],
        ) -> Result<u64, StoreError> {
            let mut created = 0;
            for namespace in namespaces.iter_mut() {
                let next = self.next_id + 1;
                let id = *self.namespaces.entry(namespace.key.clone()).or_insert_with(|| {
                    created += 1;
                    next
                });
                self.next_id = self.next_id.max(id);
                namespace.id = id;
            }
            Ok(created)
        }
    }

    fn ns(last: u8) -> NamespaceKey {
        let mut id = vec![0u8; NAMESPACE_ID_SIZE];
        id[NAMESPACE_ID_SIZE - 1] = last;
        NamespaceKey::new(0, id)
    }

    fn message(position: u64, kind: MsgKind) -> Message {
        Message {
            id: 0,
            height: 1000,
            time: Utc::now(),
            position,
            tx_id: 0,
            kind,
        }
    }

    fn pfb(position: u64, signer: u8, namespaces: &[(u8, u64)]) -> Message {
        message(
            position,
            MsgKind::PayForBlobs(MsgPayForBlobs {
                signer: vec![signer; 20],
                blobs: namespaces
                    .iter()
                    .map(|(last, size)| BlobRef {
                        namespace: ns(*last),
                        size: *size,
                    })
                    .collect(),
            }),
        )
    }

    fn send(position: u64, from: u8, to: u8) -> Message {
        message(
            position,
            MsgKind::Send(MsgSend {
                from_address: vec![from; 20],
                to_address: vec![to; 20],
                amount: BigDecimal::from(1),
            }),
        )
    }

    fn make_block(txs: Vec<Vec<Message>>) -> Block {
        Block {
            height: 1000,
            txs: txs
                .into_iter()
                .enumerate()
                .map(|(i, messages)| Tx {
                    position: i as u64,
                    height: 1000,
                    messages,
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    /// Simulates the transaction and message bulk inserts.
    fn assign_tx_and_message_ids(block: &mut Block) {
        let mut next = 100;
        for tx in &mut block.txs {
            next += 1;
            tx.id = next;
        }
        link_transactions(block).unwrap();
        for tx in &mut block.txs {
            for message in &mut tx.messages {
                next += 1;
                message.id = next;
            }
        }
    }

    // ===== ADDRESS DEDUP =====

    #[tokio::test]
    async fn test_same_address_in_three_messages_persists_once() {
        // Arrange: address 7 appears in three messages across two txs
        let mut block = make_block(vec![
            vec![send(0, 7, 1), pfb(1, 7, &[(1, 10)])],
            vec![send(0, 2, 7)],
        ]);
        let mut graph = BlockGraph::collect(&block).unwrap();
        let mut store = MockEntityStore::default();

        // Act
        assign_tx_and_message_ids(&mut block);
        let counts = graph.persist_entities(&mut store).await.unwrap();
        let (_, tx_addresses) = graph.junctions(&block).unwrap();

        // Assert
        assert_eq!(graph.addresses().len(), 3);
        assert_eq!(counts.new_addresses, 3);
        let id = graph.address_ids()[&vec![7u8; 20]];
        let refs: Vec<_> = tx_addresses
            .iter()
            .filter(|r| r.address_id == id)
            .collect();
        assert_eq!(refs.len(), 3);
    }

    // ===== NAMESPACE DEDUP =====

    #[tokio::test]
    async fn test_two_messages_same_namespace_one_junction_row() {
        let mut block = make_block(vec![vec![
            pfb(0, 1, &[(0x7a, 100)]),
            pfb(1, 1, &[(0x7a, 40)]),
        ]]);
        let mut graph = BlockGraph::collect(&block).unwrap();
        let mut store = MockEntityStore::default();

        assign_tx_and_message_ids(&mut block);
        graph.persist_entities(&mut store).await.unwrap();
        let (namespace_messages, _) = graph.junctions(&block).unwrap();

        assert_eq!(graph.namespaces().len(), 1);
        assert_eq!(graph.namespaces()[0].pfb_count, 1);
        assert_eq!(graph.namespaces()[0].size, 100);
        assert_eq!(namespace_messages.len(), 1);
        assert_eq!(namespace_messages[0].msg_id, block.txs[0].messages[0].id);
    }

    #[tokio::test]
    async fn test_distinct_namespaces_in_one_message() {
        let mut block = make_block(vec![vec![pfb(0, 1, &[(1, 10), (2, 20), (1, 30)])]]);
        let mut graph = BlockGraph::collect(&block).unwrap();

        assign_tx_and_message_ids(&mut block);
        graph
            .persist_entities(&mut MockEntityStore::default())
            .await
            .unwrap();
        let (namespace_messages, _) = graph.junctions(&block).unwrap();

        assert_eq!(graph.namespaces().len(), 2);
        assert_eq!(namespace_messages.len(), 2);
    }

    // ===== ORDERING =====

    #[test]
    fn test_junctions_before_persist_rejected() {
        let block = make_block(vec![vec![pfb(0, 1, &[(1, 10)])]]);
        let graph = BlockGraph::collect(&block).unwrap();
        assert_eq!(graph.junctions(&block).unwrap_err(), GraphError::NotPersisted);
    }

    #[test]
    fn test_link_requires_saved_transactions() {
        let mut block = make_block(vec![vec![send(0, 1, 2)]]);
        assert!(matches!(
            link_transactions(&mut block),
            Err(GraphError::UnsavedTransaction { position: 0 })
        ));
    }

    #[test]
    fn test_link_stamps_messages_and_tx_events() {
        let mut block = make_block(vec![vec![send(0, 1, 2)]]);
        block.txs[0].id = 42;
        block.txs[0].events.push(Default::default());
        block.events.push(Default::default());

        link_transactions(&mut block).unwrap();

        assert_eq!(block.txs[0].messages[0].tx_id, 42);
        assert_eq!(block.txs[0].events[0].tx_id, Some(42));
        assert_eq!(block.events[0].tx_id, None);
    }

    // ===== INTEGRITY =====

    #[test]
    fn test_empty_address_aborts_block() {
        let block = make_block(vec![vec![send(0, 1, 2), message(1, MsgKind::Send(MsgSend {
            from_address: vec![],
            to_address: vec![3; 20],
            amount: BigDecimal::from(1),
        }))]]);

        let err = BlockGraph::collect(&block).unwrap_err();

        assert_eq!(
            err,
            GraphError::EmptyAddress {
                tx: 0,
                message: 1,
                role: "fromAddress"
            }
        );
    }

    #[tokio::test]
    async fn test_store_failure_is_retryable() {
        use shared_types::Classify;

        let block = make_block(vec![vec![send(0, 1, 2)]]);
        let mut graph = BlockGraph::collect(&block).unwrap();
        let mut store = MockEntityStore {
            fail: true,
            ..Default::default()
        };

        let err = graph.persist_entities(&mut store).await.unwrap_err();

        assert!(matches!(err, GraphError::Store(_)));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn test_genesis_accounts_carry_balance() {
        let mut block = make_block(vec![]);
        block.genesis_accounts = vec![
            GenesisAccount {
                hash: vec![9; 20],
                balance: BigDecimal::from(500),
            },
            GenesisAccount {
                hash: vec![9; 20],
                balance: BigDecimal::from(250),
            },
        ];

        let mut graph = BlockGraph::collect(&block).unwrap();
        graph
            .persist_entities(&mut MockEntityStore::default())
            .await
            .unwrap();

        assert_eq!(graph.addresses().len(), 1);
        assert_eq!(graph.addresses()[0].balance.spendable, BigDecimal::from(750));
    }
}
