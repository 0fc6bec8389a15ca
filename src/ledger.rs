//! Shared handle that serializes writers around a single [`Blockchain`].
//!
//! `append` holds the write lock across the whole read-height, link, persist
//! sequence so two writers can never compute the same next height. Reads share
//! the read lock and never observe a half-finished append.

use crate::blockchain::{Block, Blockchain, ChainReport};
use crate::error::ChainError;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct SharedLedger {
    inner: Arc<RwLock<Blockchain>>,
}

impl SharedLedger {
    pub fn new(blockchain: Blockchain) -> Self {
        Self {
            inner: Arc::new(RwLock::new(blockchain)),
        }
    }

    pub async fn append(&self, block: Block) -> Result<u64, ChainError> {
        self.inner.write().await.add_block(block)
    }

    pub async fn height(&self) -> Result<i64, ChainError> {
        self.inner.read().await.height()
    }

    pub async fn get_block(&self, height: u64) -> Result<Option<Block>, ChainError> {
        self.inner.read().await.get_block(height)
    }

    pub async fn validate_block(&self, height: u64) -> Result<bool, ChainError> {
        self.inner.read().await.validate_block(height)
    }

    pub async fn validate_chain(&self) -> Result<bool, ChainError> {
        self.inner.read().await.validate_chain()
    }

    pub async fn audit_chain(&self) -> Result<ChainReport, ChainError> {
        self.inner.read().await.audit_chain()
    }
}
