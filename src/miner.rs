//! Proof-of-work search and the mining protocol
//!
//! A proof `p` is valid against the previous block's proof `q` when the
//! SHA-256 hex digest of the decimal text `"{q}{p}"` starts with
//! `difficulty` zero characters. Solving is a plain linear search from 0.

use crate::blockchain::{Block, Ledger, SharedLedger};
use crate::crypto::{has_leading_hex_zeros, sha256_hex};
use crate::error::{ChainError, Result};
use crate::transaction::Transaction;
use serde_json::Number;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Leading hex zeros required by default (about 1 in 65536 candidates).
pub const DEFAULT_DIFFICULTY: usize = 4;
/// Amount paid to the miner for each sealed block.
pub const MINING_REWARD: u64 = 1;

/// How many candidates are tried between polls of the cancel predicate.
const CANCEL_CHECK_INTERVAL: u64 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofOfWork {
    difficulty: usize,
}

impl Default for ProofOfWork {
    fn default() -> Self {
        Self::new(DEFAULT_DIFFICULTY)
    }
}

impl ProofOfWork {
    pub fn new(difficulty: usize) -> Self {
        Self { difficulty }
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    pub fn is_valid(&self, last_proof: u64, proof: u64) -> bool {
        let guess = format!("{}{}", last_proof, proof);
        has_leading_hex_zeros(&sha256_hex(guess.as_bytes()), self.difficulty)
    }

    /// Smallest proof that is valid against `last_proof`.
    pub fn solve(&self, last_proof: u64) -> u64 {
        let mut proof = 0;
        while !self.is_valid(last_proof, proof) {
            proof += 1;
        }
        proof
    }

    /// Same search as [`solve`](Self::solve), giving up with `None` once
    /// `cancelled` returns true. The predicate is polled every few thousand
    /// candidates.
    pub fn solve_until<F>(&self, last_proof: u64, cancelled: F) -> Option<u64>
    where
        F: Fn() -> bool,
    {
        let mut proof = 0u64;
        loop {
            if self.is_valid(last_proof, proof) {
                return Some(proof);
            }
            proof += 1;
            if proof % CANCEL_CHECK_INTERVAL == 0 && cancelled() {
                return None;
            }
        }
    }
}

/// Solve against `last_proof` at the default difficulty.
pub fn proof_of_work(last_proof: u64) -> u64 {
    ProofOfWork::default().solve(last_proof)
}

/// Check a proof at the default difficulty.
pub fn valid_proof(last_proof: u64, proof: u64) -> bool {
    ProofOfWork::default().is_valid(last_proof, proof)
}

/// Raised when the future driving [`Miner::mine`] goes away, so the blocking
/// search stops at its next poll.
#[derive(Default)]
struct AbandonOnDrop {
    abandoned: Arc<AtomicBool>,
}

impl AbandonOnDrop {
    fn flag(&self) -> Arc<AtomicBool> {
        self.abandoned.clone()
    }
}

impl Drop for AbandonOnDrop {
    fn drop(&mut self) {
        self.abandoned.store(true, Ordering::Relaxed);
    }
}

/// Runs the mining protocol: solve against the last block's proof, pay the
/// reward to `address`, seal.
#[derive(Debug, Clone)]
pub struct Miner {
    pow: ProofOfWork,
    address: String,
    reward: Number,
}

impl Miner {
    pub fn new(pow: ProofOfWork, address: impl Into<String>) -> Self {
        Self {
            pow,
            address: address.into(),
            reward: MINING_REWARD.into(),
        }
    }

    pub fn with_reward(mut self, reward: impl Into<Number>) -> Self {
        self.reward = reward.into();
        self
    }

    pub fn pow(&self) -> &ProofOfWork {
        &self.pow
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn reward(&self) -> &Number {
        &self.reward
    }

    fn reward_transaction(&self) -> Transaction {
        Transaction::coinbase(self.address.clone(), self.reward.clone())
    }

    /// Mine one block directly on an owned ledger.
    pub fn mine_ledger(&self, ledger: &mut Ledger) -> Block {
        let last_block = ledger.last_block().clone();
        let proof = self.pow.solve(last_block.proof);

        ledger.add_transaction(self.reward_transaction());
        ledger.seal_block(proof, Some(last_block.hash()))
    }

    /// Mine one block on a shared ledger.
    ///
    /// The search runs on a blocking worker without holding the ledger lock.
    /// If another block is sealed while searching, the search is abandoned
    /// and restarted from the new tip, so the returned block always carries
    /// a proof valid against its predecessor. Dropping the returned future
    /// stops the search as well.
    pub async fn mine(&self, ledger: &SharedLedger) -> Result<Block> {
        let guard = AbandonOnDrop::default();
        loop {
            let tip = ledger.last_block().await;
            let pow = self.pow;
            let watch = ledger.clone();
            let abandoned = guard.flag();
            let tip_index = tip.index;
            let last_proof = tip.proof;
            let started = Instant::now();

            let proof = tokio::task::spawn_blocking(move || {
                pow.solve_until(last_proof, || {
                    abandoned.load(Ordering::Relaxed) || watch.height() != tip_index
                })
            })
            .await
            .map_err(|e| ChainError::InternalError(format!("proof-of-work task failed: {}", e)))?;

            let Some(proof) = proof else {
                debug!(tip = tip_index, "tip moved during search, restarting");
                continue;
            };
            debug!(
                last_proof,
                proof,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "proof found"
            );

            match ledger.seal_on_tip(&tip, proof, self.reward_transaction()).await {
                Some(block) => {
                    info!(index = block.index, proof = block.proof, miner = %self.address, "block mined");
                    return Ok(block);
                }
                None => debug!(tip = tip_index, "competing block sealed first, restarting"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::time::Duration;

    #[test]
    fn test_solve_known_values() {
        let pow = ProofOfWork::default();
        assert_eq!(pow.solve(100), 35293);
        assert_eq!(pow.solve(35293), 35089);
        assert_eq!(proof_of_work(100), 35293);
    }

    #[test]
    fn test_is_valid_matches_digest_prefix() {
        assert!(valid_proof(100, 35293));
        assert!(sha256_hex(b"10035293").starts_with("0000"));
        assert!(!valid_proof(100, 35292));
        assert!(!valid_proof(35293, 100));
    }

    #[test]
    fn test_solve_returns_smallest() {
        let pow = ProofOfWork::new(2);
        let proof = pow.solve(100);
        assert_eq!(proof, 226);
        assert!((0..proof).all(|p| !pow.is_valid(100, p)));
    }

    #[test]
    fn test_difficulty_is_tunable() {
        assert_eq!(ProofOfWork::new(1).solve(7), 19);
        assert_eq!(ProofOfWork::new(0).solve(7), 0);
        assert_eq!(ProofOfWork::default().difficulty(), DEFAULT_DIFFICULTY);
    }

    #[test]
    fn test_solve_until_agrees_with_solve() {
        let pow = ProofOfWork::default();
        assert_eq!(pow.solve_until(100, || false), Some(35293));
    }

    #[test]
    fn test_solve_until_cancels() {
        let polls = Cell::new(0);
        let result = ProofOfWork::default().solve_until(100, || {
            polls.set(polls.get() + 1);
            true
        });
        assert_eq!(result, None);
        assert_eq!(polls.get(), 1);
    }

    #[test]
    fn test_mine_ledger_appends_reward() {
        let miner = Miner::new(ProofOfWork::new(2), "node-a");
        let mut ledger = Ledger::new();
        ledger.new_transaction("A", "B", 10);

        let block = miner.mine_ledger(&mut ledger);
        assert_eq!(block.index, 2);
        assert_eq!(
            block.transactions,
            vec![Transaction::new("A", "B", 10), Transaction::coinbase("node-a", 1)]
        );
        assert!(ledger.validate(miner.pow()).is_ok());
    }

    #[tokio::test]
    async fn test_mine_shared_ledger() {
        let miner = Miner::new(ProofOfWork::default(), "node-a").with_reward(5);
        let ledger = SharedLedger::default();

        let block = miner.mine(&ledger).await.unwrap();
        assert_eq!(block.proof, 35293);
        assert_eq!(block.transactions, vec![Transaction::coinbase("node-a", 5)]);
        assert_eq!(ledger.height(), 2);
        assert!(ledger.validate(miner.pow()).await.is_ok());
    }

    #[test]
    fn test_dropped_mine_stops_search() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_time()
            .build()
            .unwrap();
        // No proof exists at this difficulty, so only cancellation ends the search.
        let miner = Miner::new(ProofOfWork::new(64), "node-a");
        let ledger = SharedLedger::default();

        let outcome = rt.block_on(async {
            tokio::time::timeout(Duration::from_millis(50), miner.mine(&ledger)).await
        });
        assert!(outcome.is_err());

        let started = Instant::now();
        rt.shutdown_timeout(Duration::from_secs(10));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(ledger.height(), 1);
    }
}
