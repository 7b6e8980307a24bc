//! Item discovery and transfer
//!
//! Drains a source folder into a target folder in bounded steps. Failed copy
//! batches are split in half and retried on later steps; a single item that
//! still fails is recorded and left behind.

pub mod engine;
pub mod types;

pub use engine::{classify, ItemCopier, DEFAULT_BATCH_SIZE, DEFAULT_MAX_DISCOVERY_RETRIES};
pub use types::*;
