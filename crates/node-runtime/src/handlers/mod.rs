//! # Pipeline Stages
//!
//! One module per step of block ingestion, plus the stopper.
//!
//! ```text
//! SourceStage ──envelopes──→ DecodeStage ──blocks──→ StorageStage ──committed──→ NotifyStage
//!                                 │                       │
//!                                 └──────halt─────────────┴──→ Stopper ──→ shutdown
//! ```

pub mod decode;
pub mod notify;
pub mod source;
pub mod stopper;
pub mod storage;

pub use decode::DecodeStage;
pub use notify::NotifyStage;
pub use source::SourceStage;
pub use stopper::Stopper;
pub use storage::StorageStage;
