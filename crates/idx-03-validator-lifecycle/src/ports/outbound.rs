//! # Outbound Ports (Driven Ports)
//!
//! Transactional storage the lifecycle writes through. Implemented by the
//! persistence subsystem's storage transaction; nothing is visible to readers
//! before the surrounding transaction commits.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use shared_types::{BalanceUpdate, Delegation, Jail, StoreError, Validator};

#[async_trait]
pub trait ValidatorStore: Send {
    /// Upsert by operator address, writing identities back.
    ///
    /// Returns the number of rows inserted or changed; unchanged rows do not
    /// count.
    async fn save_validators(&mut self, validators: &mut [Validator]) -> Result<usize, StoreError>;

    /// Marks the given validators (identified by `id`) as jailed.
    async fn jail(&mut self, validators: &[Validator]) -> Result<(), StoreError>;

    /// Inserts jail records, assigning identities.
    async fn save_jails(&mut self, jails: &mut [Jail]) -> Result<(), StoreError>;

    /// Reduces every delegation to `validator_id` by `fraction` of its
    /// amount and returns the matching (negative) balance updates.
    async fn update_slashed_delegations(
        &mut self,
        validator_id: u64,
        fraction: &BigDecimal,
    ) -> Result<Vec<BalanceUpdate>, StoreError>;

    /// Applies signed balance deltas to addresses.
    async fn save_balances(&mut self, updates: &[BalanceUpdate]) -> Result<(), StoreError>;

    /// Applies signed delegation deltas, creating missing delegation rows.
    async fn save_delegation_changes(&mut self, changes: &[Delegation]) -> Result<(), StoreError>;
}
