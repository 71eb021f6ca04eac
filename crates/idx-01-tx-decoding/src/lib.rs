//! # Transaction Decoding Subsystem (idx-01)
//!
//! Turns a raw block envelope into a fully typed [`Block`]: every transaction
//! is decoded from its protobuf bytes, its fee priced in the native
//! denomination, and every message typed into the closed [`MsgKind`] set.
//!
//! ## Pipeline Position
//!
//! ```text
//! BlockSource ──envelope──→ Tx Decoding (1) ──Block──→ Entity Graph (2)
//! ```
//!
//! ## Decoding Rules
//!
//! | Rule | Enforcement | Location |
//! |------|-------------|----------|
//! | Blob envelopes are unwrapped before decoding | `unwrap_blob_tx` | domain/decoder.rs |
//! | Fee resolves to exactly one currency | `fee_amount` | domain/decoder.rs |
//! | Fee is an exact integer decimal | `parse_amount` | domain/decoder.rs |
//! | Unknown message types are kept, not rejected | `type_message` | domain/typing.rs |
//! | Missing identifying fields abort the block | `DecodeError::MissingField` | domain/typing.rs |
//!
//! Every [`DecodeError`] is fatal for the containing block.
//!
//! ## Hexagonal Architecture
//!
//! - **Domain Layer** (`domain/`): wire structures and pure decoding functions
//! - **Ports Layer** (`ports/`): the [`BlockDecoder`] inbound API
//! - **Service** (`service.rs`): [`DecodingService`], the envelope → block assembly
//!
//! [`Block`]: shared_types::Block
//! [`MsgKind`]: shared_types::MsgKind

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{
    decode_tx, type_message, BlockEnvelope, DecodeError, DecodedTx, EventEnvelope,
    GenesisAccountEnvelope, RawMessage, TxEnvelope,
};
pub use ports::BlockDecoder;
pub use service::{DecoderConfig, DecodingService};
