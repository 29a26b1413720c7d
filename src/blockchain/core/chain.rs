use crate::canonical::to_canonical_bytes;
use crate::crypto::sha256_hex;
use crate::error::Result;
use crate::miner::ProofOfWork;
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use serde_json::{json, Number, Value};
use tracing::{debug, info};

use super::validation::validate_chain;

/// `previous_hash` carried by the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "1";
/// Proof carried by the genesis block.
pub const GENESIS_PROOF: u64 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    /// Seconds since the Unix epoch, with sub-second precision.
    pub timestamp: f64,
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    pub previous_hash: String,
}

impl Block {
    pub fn new(
        index: u64,
        previous_hash: String,
        proof: u64,
        transactions: Vec<Transaction>,
    ) -> Self {
        Block {
            index,
            timestamp: current_timestamp(),
            transactions,
            proof,
            previous_hash,
        }
    }

    pub fn to_value(&self) -> Value {
        let transactions: Vec<Value> = self.transactions.iter().map(Transaction::to_value).collect();
        json!({
            "index": self.index,
            "timestamp": self.timestamp,
            "transactions": transactions,
            "proof": self.proof,
            "previous_hash": self.previous_hash,
        })
    }

    /// SHA-256 over the canonical (sorted-key) JSON text of the block, as 64
    /// lowercase hex characters.
    pub fn hash(&self) -> String {
        sha256_hex(&to_canonical_bytes(&self.to_value()))
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 1
    }
}

fn current_timestamp() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// The chain of sealed blocks plus the pool of transactions waiting for the
/// next one.
///
/// `chain` is append-only and always starts with the genesis block.
/// `pending` is drained in full each time a block is sealed.
#[derive(Debug, Clone)]
pub struct Ledger {
    chain: Vec<Block>,
    pending: Vec<Transaction>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    /// Create a ledger holding only the genesis block.
    pub fn new() -> Self {
        let mut ledger = Ledger {
            chain: Vec::new(),
            pending: Vec::new(),
        };
        ledger.seal_block(GENESIS_PROOF, Some(GENESIS_PREVIOUS_HASH.to_string()));
        ledger
    }

    /// Queue a transaction for the next block.
    ///
    /// Returns the index of the block that will hold it.
    pub fn new_transaction(
        &mut self,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: impl Into<Number>,
    ) -> u64 {
        self.add_transaction(Transaction::new(sender, recipient, amount))
    }

    pub fn add_transaction(&mut self, tx: Transaction) -> u64 {
        debug!(sender = %tx.sender, recipient = %tx.recipient, amount = %tx.amount, "transaction queued");
        self.pending.push(tx);
        self.last_block().index + 1
    }

    /// Seal every pending transaction into a new block and append it.
    ///
    /// `previous_hash` defaults to the hash of the current last block.
    pub fn seal_block(&mut self, proof: u64, previous_hash: Option<String>) -> Block {
        let previous_hash = previous_hash.unwrap_or_else(|| self.last_block().hash());
        let transactions = std::mem::take(&mut self.pending);
        let block = Block::new(self.chain.len() as u64 + 1, previous_hash, proof, transactions);

        info!(
            index = block.index,
            proof = block.proof,
            transactions = block.transactions.len(),
            "block sealed"
        );

        self.chain.push(block.clone());
        block
    }

    pub fn last_block(&self) -> &Block {
        self.chain
            .last()
            .expect("ledger always holds the genesis block")
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn full_chain(&self) -> Vec<Block> {
        self.chain.clone()
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Check linkage, indices and proofs across the whole chain.
    pub fn validate(&self, pow: &ProofOfWork) -> Result<()> {
        validate_chain(&self.chain, pow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_block() -> Block {
        Block {
            index: 2,
            timestamp: 1506057200.5,
            transactions: vec![Transaction::new("A", "B", 10)],
            proof: 35293,
            previous_hash: "abc".to_string(),
        }
    }

    #[test]
    fn test_genesis_block() {
        let ledger = Ledger::new();
        assert_eq!(ledger.len(), 1);
        let genesis = ledger.last_block();
        assert_eq!(genesis.index, 1);
        assert_eq!(genesis.previous_hash, GENESIS_PREVIOUS_HASH);
        assert_eq!(genesis.proof, GENESIS_PROOF);
        assert!(genesis.transactions.is_empty());
        assert!(genesis.is_genesis());
        assert!(ledger.pending().is_empty());
    }

    #[test]
    fn test_known_digests() {
        let genesis = Block {
            index: 1,
            timestamp: 1506057125.900785,
            transactions: vec![],
            proof: 100,
            previous_hash: "1".to_string(),
        };
        assert_eq!(
            genesis.hash(),
            "9bd58252bbed62b0af795f7c177c9b115bbb161f41df0ac728443cfb2b9e2067"
        );
        assert_eq!(
            fixed_block().hash(),
            "2930621f831fe25d7adeea7a91245c4cc7f448ff27c897d31f6fd11983811c2a"
        );
    }

    #[test]
    fn test_hash_ignores_field_order() {
        let block = fixed_block();
        let shuffled = r#"{"previous_hash":"abc","proof":35293,
            "transactions":[{"amount":10,"recipient":"B","sender":"A"}],
            "timestamp":1506057200.5,"index":2}"#;
        let parsed: Block = serde_json::from_str(shuffled).unwrap();
        assert_eq!(parsed, block);
        assert_eq!(parsed.hash(), block.hash());
    }

    #[test]
    fn test_amount_beyond_u64_stays_integer() {
        let text = r#"{"index":2,"timestamp":1506057125.900785,"proof":35293,"previous_hash":"abc",
            "transactions":[{"sender":"A","recipient":"B","amount":100000000000000000000}]}"#;
        let block: Block = serde_json::from_str(text).unwrap();

        assert!(serde_json::to_string(&block)
            .unwrap()
            .contains(r#""amount":100000000000000000000"#));
        assert!(crate::canonical::to_canonical_json(&block.to_value())
            .contains(r#""amount": 100000000000000000000"#));
        assert_eq!(
            block.hash(),
            "e7c687f0b7b88e810ad93e5d9924008cc4ab53b32232fb87ea0c055859ad88b4"
        );
    }

    #[test]
    fn test_hash_sensitive_to_values() {
        let block = fixed_block();
        let base = block.hash();

        let mut changed = block.clone();
        changed.proof += 1;
        assert_ne!(changed.hash(), base);

        let mut changed = block.clone();
        changed.timestamp += 0.000001;
        assert_ne!(changed.hash(), base);

        let mut changed = block.clone();
        changed.transactions[0].amount = Number::from_f64(10.0).unwrap();
        assert_ne!(changed.hash(), base);

        let mut changed = block;
        changed.previous_hash.push('0');
        assert_ne!(changed.hash(), base);
    }

    #[test]
    fn test_json_round_trip_preserves_hash() {
        let mut ledger = Ledger::new();
        ledger.new_transaction("alice", "bob", Number::from_f64(0.1).unwrap());
        ledger.new_transaction("bob", "carol", -3);
        let block = ledger.seal_block(35293, None);

        let text = serde_json::to_string(&block).unwrap();
        let parsed: Block = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, block);
        assert_eq!(parsed.hash(), block.hash());
    }

    #[test]
    fn test_new_transaction_targets_next_block() {
        let mut ledger = Ledger::new();
        assert_eq!(ledger.new_transaction("A", "B", 10), 2);
        assert_eq!(ledger.new_transaction("B", "C", 5), 2);
        assert_eq!(ledger.pending().len(), 2);
        assert_eq!(ledger.len(), 1);

        ledger.seal_block(1, None);
        assert_eq!(ledger.new_transaction("C", "D", 1), 3);
    }

    #[test]
    fn test_seal_moves_pending_into_block() {
        let mut ledger = Ledger::new();
        ledger.new_transaction("A", "B", 10);
        let genesis_hash = ledger.last_block().hash();

        let block = ledger.seal_block(35293, None);
        assert_eq!(block.index, 2);
        assert_eq!(block.transactions, vec![Transaction::new("A", "B", 10)]);
        assert_eq!(block.previous_hash, genesis_hash);
        assert!(ledger.pending().is_empty());
        assert_eq!(ledger.last_block(), &block);
    }

    #[test]
    fn test_seal_uses_explicit_previous_hash() {
        let mut ledger = Ledger::new();
        let block = ledger.seal_block(7, Some("feed".to_string()));
        assert_eq!(block.previous_hash, "feed");
        assert_eq!(ledger.chain()[1].previous_hash, "feed");
    }

    #[test]
    fn test_empty_seal_produces_empty_block() {
        let mut ledger = Ledger::new();
        let block = ledger.seal_block(1, None);
        assert!(block.transactions.is_empty());
        assert_eq!(ledger.full_chain().len(), 2);
    }
}
