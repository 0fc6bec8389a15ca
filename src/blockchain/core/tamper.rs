//! Integrity-bypass writes for manufacturing broken chains in tests.
//!
//! Only compiled for this crate's tests or with the `tamper` feature.

use crate::error::ChainError;
use tracing::debug;

use super::chain::{Block, Blockchain};

pub trait Tamper {
    /// Overwrite the payload stored at `height` with `block` as-is, skipping
    /// linkage, timestamping and hashing.
    fn modify_block(&self, height: u64, block: &Block) -> Result<(), ChainError>;
}

impl Tamper for Blockchain {
    fn modify_block(&self, height: u64, block: &Block) -> Result<(), ChainError> {
        let result = block
            .to_json()
            .and_then(|payload| self.store.put(height, &payload));
        if let Err(e) = &result {
            debug!(height, "Failed to modify block: {}", e);
        }
        result
    }
}
