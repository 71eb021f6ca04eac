//! # Inbound Ports (Driving Side)
//!
//! API exposed to the pipeline's decode stage.

use crate::domain::{BlockEnvelope, DecodeError};
use shared_types::Block;

/// Turns an upstream envelope into a typed block.
pub trait BlockDecoder: Send + Sync {
    /// Decodes every transaction, types every message and computes the
    /// block aggregates.
    ///
    /// # Errors
    ///
    /// Any [`DecodeError`] rejects the whole block.
    fn decode_block(&self, envelope: BlockEnvelope) -> Result<Block, DecodeError>;
}
