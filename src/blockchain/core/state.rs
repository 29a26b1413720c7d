use crate::error::Result;
use crate::miner::ProofOfWork;
use crate::transaction::Transaction;
use serde_json::Number;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard};

use super::chain::{Block, Ledger};

/// Cloneable handle to a ledger shared between request handlers.
///
/// Every mutation goes through one write lock, so a transaction racing a
/// seal lands in exactly one block. The index of the last sealed block is
/// also published through an atomic counter that can be polled without
/// taking the lock, which is how an in-flight proof-of-work search notices
/// that it has gone stale.
#[derive(Clone)]
pub struct SharedLedger {
    inner: Arc<RwLock<Ledger>>,
    sealed_height: Arc<AtomicU64>,
}

impl Default for SharedLedger {
    fn default() -> Self {
        Self::new(Ledger::new())
    }
}

impl SharedLedger {
    pub fn new(ledger: Ledger) -> Self {
        let height = ledger.last_block().index;
        Self {
            inner: Arc::new(RwLock::new(ledger)),
            sealed_height: Arc::new(AtomicU64::new(height)),
        }
    }

    /// Index of the last sealed block.
    pub fn height(&self) -> u64 {
        self.sealed_height.load(Ordering::Acquire)
    }

    /// Read access for callers that need a consistent view across several
    /// reads.
    pub async fn read(&self) -> RwLockReadGuard<'_, Ledger> {
        self.inner.read().await
    }

    pub async fn new_transaction(
        &self,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: impl Into<Number>,
    ) -> u64 {
        self.add_transaction(Transaction::new(sender, recipient, amount))
            .await
    }

    pub async fn add_transaction(&self, tx: Transaction) -> u64 {
        self.inner.write().await.add_transaction(tx)
    }

    pub async fn seal_block(&self, proof: u64, previous_hash: Option<String>) -> Block {
        let mut ledger = self.inner.write().await;
        let block = ledger.seal_block(proof, previous_hash);
        self.sealed_height.store(block.index, Ordering::Release);
        block
    }

    /// Queue `reward` and seal a block on top of `tip`, in one critical
    /// section.
    ///
    /// Returns `None`, leaving the ledger untouched, if another block was
    /// sealed after `tip`.
    pub async fn seal_on_tip(&self, tip: &Block, proof: u64, reward: Transaction) -> Option<Block> {
        let mut ledger = self.inner.write().await;
        if ledger.last_block().index != tip.index {
            return None;
        }

        ledger.add_transaction(reward);
        let block = ledger.seal_block(proof, Some(tip.hash()));
        self.sealed_height.store(block.index, Ordering::Release);
        Some(block)
    }

    pub async fn last_block(&self) -> Block {
        self.inner.read().await.last_block().clone()
    }

    pub async fn full_chain(&self) -> Vec<Block> {
        self.inner.read().await.full_chain()
    }

    pub async fn pending(&self) -> Vec<Transaction> {
        self.inner.read().await.pending().to_vec()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn validate(&self, pow: &ProofOfWork) -> Result<()> {
        self.inner.read().await.validate(pow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_height_tracks_seals() {
        let ledger = SharedLedger::default();
        assert_eq!(ledger.height(), 1);

        ledger.new_transaction("A", "B", 1).await;
        let block = ledger.seal_block(9, None).await;
        assert_eq!(block.index, 2);
        assert_eq!(ledger.height(), 2);
        assert_eq!(ledger.len().await, 2);
        assert!(ledger.pending().await.is_empty());
    }

    #[tokio::test]
    async fn test_seal_on_tip_includes_reward() {
        let ledger = SharedLedger::default();
        ledger.new_transaction("A", "B", 10).await;
        let tip = ledger.last_block().await;

        let block = ledger
            .seal_on_tip(&tip, 35293, Transaction::coinbase("miner", 1))
            .await
            .unwrap();
        assert_eq!(block.previous_hash, tip.hash());
        assert_eq!(
            block.transactions,
            vec![Transaction::new("A", "B", 10), Transaction::coinbase("miner", 1)]
        );
    }

    #[tokio::test]
    async fn test_seal_on_stale_tip_is_rejected() {
        let ledger = SharedLedger::default();
        let stale = ledger.last_block().await;
        ledger.seal_block(1, None).await;
        ledger.new_transaction("A", "B", 10).await;

        let result = ledger
            .seal_on_tip(&stale, 35293, Transaction::coinbase("miner", 1))
            .await;
        assert!(result.is_none());
        assert_eq!(ledger.len().await, 2);
        assert_eq!(ledger.pending().await, vec![Transaction::new("A", "B", 10)]);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let ledger = SharedLedger::default();
        let handle = ledger.clone();
        handle.new_transaction("A", "B", 3).await;
        assert_eq!(ledger.pending().await.len(), 1);
        handle.seal_block(1, None).await;
        assert_eq!(ledger.height(), 2);
    }
}
