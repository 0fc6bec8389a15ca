use crate::error::ChainError;
use crate::persistence::{Database, InMemoryPersistence, LedgerStore, EMPTY_HEIGHT};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{debug, info};

/// Body of the block synthesized when the chain is first opened on an empty store.
pub const GENESIS_BODY: &str = "this is the genesis block";

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub height: u64,
    pub body: Value,
    /// Seconds since the Unix epoch, stamped at append time.
    pub time: u64,
    /// Empty for the genesis block.
    pub previous_block_hash: String,
    pub hash: String,
}

impl Block {
    /// Unlinked candidate carrying only `body`. Everything else is filled in by
    /// [`Blockchain::add_block`].
    pub fn new(body: impl Into<Value>) -> Self {
        Block {
            height: 0,
            body: body.into(),
            time: 0,
            previous_block_hash: String::new(),
            hash: String::new(),
        }
    }

    /// Hex SHA-256 of the block's JSON encoding with `hash` blanked.
    pub fn calculate_hash(&self) -> Result<String, ChainError> {
        let unhashed = Block {
            hash: String::new(),
            ..self.clone()
        };
        let bytes = serde_json::to_vec(&unhashed)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }

    pub fn has_valid_hash(&self) -> Result<bool, ChainError> {
        Ok(self.calculate_hash()? == self.hash)
    }

    pub(crate) fn to_json(&self) -> Result<String, ChainError> {
        Ok(serde_json::to_string(self)?)
    }

    pub(crate) fn from_json(payload: &str) -> Result<Self, ChainError> {
        serde_json::from_str(payload).map_err(|e| {
            ChainError::SerializationError(format!("Failed to decode stored block: {}", e))
        })
    }
}

/// Chain manager over a [`LedgerStore`].
///
/// Holds no chain state of its own: every answer is derived from what the
/// store currently contains, so reopening an existing store is always safe.
pub struct Blockchain {
    pub(crate) store: Box<dyn LedgerStore>,
}

impl Blockchain {
    /// Create a new `Blockchain` using an in-memory persistence backend.
    pub fn new() -> Result<Self, ChainError> {
        Self::new_with_persistence(Box::new(InMemoryPersistence::new()))
    }

    /// Open (or create) a SQLite-backed chain at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ChainError> {
        Self::new_with_persistence(Box::new(Database::open(path)?))
    }

    /// Create a new `Blockchain` with the provided persistence backend,
    /// writing the genesis block only if the store is empty.
    pub fn new_with_persistence(store: Box<dyn LedgerStore>) -> Result<Self, ChainError> {
        let mut blockchain = Blockchain { store };
        blockchain.generate_genesis_block()?;
        Ok(blockchain)
    }

    fn generate_genesis_block(&mut self) -> Result<(), ChainError> {
        if self.height()? == EMPTY_HEIGHT {
            self.add_block(Block::new(GENESIS_BODY))?;
            info!("Created genesis block");
        }
        Ok(())
    }

    /// Height of the tip block, or `-1` for an empty store.
    pub fn height(&self) -> Result<i64, ChainError> {
        self.store.count()
    }

    /// Link `block` onto the tip, stamp and hash it, then persist it.
    /// Returns the height it was stored at.
    pub fn add_block(&mut self, mut block: Block) -> Result<u64, ChainError> {
        let tip = self.height()?;

        if tip > EMPTY_HEIGHT {
            let tip = tip as u64;
            let previous = self.get_block(tip)?.ok_or(ChainError::BlockNotFound(tip))?;
            block.previous_block_hash = previous.hash;
            block.height = tip + 1;
        }

        block.time = chrono::Utc::now().timestamp() as u64;
        // Hash the body exactly as a reader will decode it from the store.
        block.body = serde_json::from_str(&serde_json::to_string(&block.body)?)?;
        block.hash = block.calculate_hash()?;

        self.store.put(block.height, &block.to_json()?)?;
        info!(height = block.height, hash = %block.hash, "Appended block");

        Ok(block.height)
    }

    pub fn get_block(&self, height: u64) -> Result<Option<Block>, ChainError> {
        match self.store.get(height)? {
            Some(payload) => Block::from_json(&payload).map(Some),
            None => {
                debug!(height, "No block stored at height");
                Ok(None)
            }
        }
    }

    /// Recompute the hash of the block at `height` and compare it with the
    /// stored one. A missing block is an error, not an invalid block.
    pub fn validate_block(&self, height: u64) -> Result<bool, ChainError> {
        let block = self.get_block(height)?.ok_or(ChainError::BlockNotFound(height))?;
        block.has_valid_hash()
    }

    /// True iff every block hashes correctly and every adjacent pair links.
    pub fn validate_chain(&self) -> Result<bool, ChainError> {
        Ok(self.audit_chain()?.is_valid())
    }
}
