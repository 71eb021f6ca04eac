//! Domain layer for transaction decoding.

pub mod decoder;
pub mod envelope;
pub mod errors;
pub mod proto;
pub mod typing;

pub use decoder::{decode_tx, DecodedTx, RawMessage};
pub use envelope::{BlockEnvelope, EventEnvelope, GenesisAccountEnvelope, TxEnvelope};
pub use errors::DecodeError;
pub use typing::{decode_address, type_message};
