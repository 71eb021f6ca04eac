//! # Validator Lifecycle Service

use crate::domain::{IndexEntry, LifecycleError, SlashingConfig, ValidatorIndex};
use crate::ports::ValidatorStore;
use bigdecimal::{BigDecimal, Signed};
use shared_types::{
    AddressHash, BalanceUpdate, Block, Delegation, MessageRefs, StakeChange, TxStatus,
    ValidatorUpdates,
};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// Result of applying one block's validator updates.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LifecycleOutcome {
    /// Validator rows actually written by the upsert.
    pub written: usize,
    /// Index entries to apply once the transaction commits.
    pub pending: Vec<IndexEntry>,
    pub jailed: usize,
    pub slashed: usize,
}

pub struct ValidatorLifecycle {
    slashing: SlashingConfig,
}

impl ValidatorLifecycle {
    pub fn new(slashing: SlashingConfig) -> Self {
        Self { slashing }
    }

    pub fn slashing(&self) -> &SlashingConfig {
        &self.slashing
    }

    /// Applies jailing, slashing, validator upserts and stake changes
    /// through `store`.
    ///
    /// `index` is read only; entries for validators written here are
    /// returned in [`LifecycleOutcome::pending`].
    pub async fn apply<S>(
        &self,
        store: &mut S,
        index: &ValidatorIndex,
        updates: &mut ValidatorUpdates,
        changes: &[StakeChange],
        address_ids: &HashMap<AddressHash, u64>,
    ) -> Result<LifecycleOutcome, LifecycleError>
    where
        S: ValidatorStore + ?Sized,
    {
        let mut outcome = LifecycleOutcome::default();

        if !updates.jailed.is_empty() {
            let mut jailed = Vec::with_capacity(updates.jailed.len());
            for (cons_address, validator) in &updates.jailed {
                let id = index.by_cons(cons_address).ok_or_else(|| {
                    LifecycleError::UnknownJailedValidator {
                        cons_address: cons_address.clone(),
                    }
                })?;
                let mut validator = validator.clone();
                validator.id = id;
                validator.jailed = true;
                jailed.push(validator);
            }
            store.jail(&jailed).await?;
            outcome.jailed = jailed.len();
        }

        if !updates.jails.is_empty() {
            for jail in updates.jails.iter_mut() {
                jail.validator_id = index.by_cons(&jail.cons_address).ok_or_else(|| {
                    LifecycleError::UnknownJailedValidator {
                        cons_address: jail.cons_address.clone(),
                    }
                })?;

                let fraction = self.slashing.fraction_for(&jail.reason);
                if !fraction.is_positive() {
                    continue;
                }

                let balance_updates = store
                    .update_slashed_delegations(jail.validator_id, &fraction)
                    .await?;
                jail.burned = -balance_updates
                    .iter()
                    .map(|u| u.delegated.clone())
                    .sum::<BigDecimal>();
                store.save_balances(&balance_updates).await?;
                outcome.slashed += 1;
            }

            store.save_jails(&mut updates.jails).await?;
        }

        if !updates.validators.is_empty() {
            let count = store.save_validators(&mut updates.validators).await?;
            if count > 0 {
                outcome.written = count;
                outcome.pending = updates
                    .validators
                    .iter()
                    .filter_map(IndexEntry::for_validator)
                    .collect();
            }
        }

        if !changes.is_empty() {
            self.apply_stake_changes(store, index, updates, changes, address_ids)
                .await?;
        }

        if outcome.jailed > 0 || outcome.slashed > 0 {
            info!(
                jailed = outcome.jailed,
                slashed = outcome.slashed,
                "[idx-03] validators jailed"
            );
        }
        debug!(
            written = outcome.written,
            pending = outcome.pending.len(),
            stake_changes = changes.len(),
            "[idx-03] validator updates applied"
        );
        Ok(outcome)
    }

    async fn apply_stake_changes<S>(
        &self,
        store: &mut S,
        index: &ValidatorIndex,
        updates: &ValidatorUpdates,
        changes: &[StakeChange],
        address_ids: &HashMap<AddressHash, u64>,
    ) -> Result<(), LifecycleError>
    where
        S: ValidatorStore + ?Sized,
    {
        // Validators upserted in this block are not in the index yet.
        let staged: HashMap<&str, u64> = updates
            .validators
            .iter()
            .filter(|v| v.id != 0)
            .map(|v| (v.address.as_str(), v.id))
            .collect();

        let mut deltas: BTreeMap<(u64, u64), BigDecimal> = BTreeMap::new();
        for change in changes {
            let validator_id = staged
                .get(change.validator.as_str())
                .copied()
                .or_else(|| index.by_operator(&change.validator))
                .ok_or_else(|| LifecycleError::UnknownValidator {
                    operator: change.validator.clone(),
                })?;
            let address_id = address_ids.get(&change.delegator).copied().ok_or_else(|| {
                LifecycleError::UnknownDelegator {
                    address: hex::encode(&change.delegator),
                }
            })?;

            *deltas
                .entry((address_id, validator_id))
                .or_insert_with(|| BigDecimal::from(0)) += change.amount.clone();
        }

        let delegations: Vec<Delegation> = deltas
            .into_iter()
            .map(|((address_id, validator_id), amount)| Delegation {
                address_id,
                validator_id,
                amount,
            })
            .collect();

        let mut balances: BTreeMap<u64, BigDecimal> = BTreeMap::new();
        for delegation in &delegations {
            *balances
                .entry(delegation.address_id)
                .or_insert_with(|| BigDecimal::from(0)) += delegation.amount.clone();
        }
        let balance_updates: Vec<BalanceUpdate> = balances
            .into_iter()
            .map(|(address_id, delegated)| BalanceUpdate {
                address_id,
                spendable: -delegated.clone(),
                delegated,
            })
            .collect();

        store.save_delegation_changes(&delegations).await?;
        store.save_balances(&balance_updates).await?;
        Ok(())
    }
}

/// Stake changes of all successful transactions, in block order.
pub fn stake_changes(block: &Block) -> Vec<StakeChange> {
    block
        .txs
        .iter()
        .filter(|tx| tx.status == TxStatus::Success)
        .flat_map(|tx| tx.messages.iter())
        .flat_map(|m| m.kind.stake_changes())
        .collect()
}
