//! # Validator Lifecycle Subsystem (idx-03)
//!
//! Applies the validator side effects of one block inside the block's
//! storage transaction: jailing, slashing of delegations, validator upserts
//! and delegation changes.
//!
//! ## Processing Order
//!
//! ```text
//! jailed map ──→ jail events ──→ validator upserts ──→ stake changes
//!  (mark)        (slash, save)    (count rows)          (delegations, balances)
//! ```
//!
//! ## Invariants
//!
//! | Invariant | Enforcement | Location |
//! |-----------|-------------|----------|
//! | Unknown jailed validator is an error | `LifecycleError::UnknownJailedValidator` | service.rs |
//! | Slashing only for a positive fraction | `SlashingConfig::fraction_for` | domain/slashing.rs |
//! | Jail recorded even without slashing | `save_jails` always called | service.rs |
//! | Index updated only after commit | `LifecycleOutcome::pending` | domain/index.rs |
//!
//! ## Hexagonal Architecture
//!
//! - **Domain Layer** (`domain/`): address index, slashing parameters, errors
//! - **Ports Layer** (`ports/`): [`ValidatorStore`], the transactional SPI
//! - **Service** (`service.rs`): [`ValidatorLifecycle`]

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{
    IndexEntry, LifecycleError, SlashingConfig, ValidatorIndex, JAIL_REASON_DOUBLE_SIGN,
    JAIL_REASON_MISSING_SIGNATURE,
};
pub use ports::ValidatorStore;
pub use service::{stake_changes, LifecycleOutcome, ValidatorLifecycle};
