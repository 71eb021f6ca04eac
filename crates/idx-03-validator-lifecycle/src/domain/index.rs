//! # Validator Address Index
//!
//! Consensus address → identity and operator address → identity. Owned by
//! the persistence coordinator, rebuilt from storage on start, and extended
//! only with entries whose upsert has been committed.

use shared_types::Validator;
use std::collections::HashMap;

/// An index entry waiting for its transaction to commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub cons_address: String,
    pub operator: String,
    pub id: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ValidatorIndex {
    by_cons: HashMap<String, u64>,
    by_operator: HashMap<String, u64>,
}

impl ValidatorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the index from committed validators.
    pub fn rebuild<'a>(validators: impl IntoIterator<Item = &'a Validator>) -> Self {
        let mut index = Self::new();
        index.apply(validators.into_iter().filter_map(IndexEntry::for_validator));
        index
    }

    pub fn by_cons(&self, cons_address: &str) -> Option<u64> {
        self.by_cons.get(cons_address).copied()
    }

    pub fn by_operator(&self, operator: &str) -> Option<u64> {
        self.by_operator.get(operator).copied()
    }

    /// Adds committed entries.
    pub fn apply(&mut self, entries: impl IntoIterator<Item = IndexEntry>) {
        for entry in entries {
            self.by_cons.insert(entry.cons_address, entry.id);
            self.by_operator.insert(entry.operator, entry.id);
        }
    }

    pub fn len(&self) -> usize {
        self.by_cons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_cons.is_empty()
    }
}

impl IndexEntry {
    /// Entry for a persisted validator; `None` without a consensus address.
    pub fn for_validator(validator: &Validator) -> Option<Self> {
        if validator.cons_address.is_empty() || validator.id == 0 {
            return None;
        }
        Some(Self {
            cons_address: validator.cons_address.clone(),
            operator: validator.address.clone(),
            id: validator.id,
        })
    }
}
