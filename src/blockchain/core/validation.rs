use crate::error::{ChainError, Result};
use crate::miner::ProofOfWork;

use super::chain::{Block, GENESIS_PREVIOUS_HASH};

/// Check that `block` correctly extends `previous`.
pub fn validate_block(previous: &Block, block: &Block, pow: &ProofOfWork) -> Result<()> {
    if block.index != previous.index + 1 {
        return Err(ChainError::InvalidBlock(format!(
            "Invalid block index. Expected {}, but got {}.",
            previous.index + 1,
            block.index
        )));
    }

    let expected = previous.hash();
    if block.previous_hash != expected {
        return Err(ChainError::InvalidBlockLinkage {
            index: block.index,
            expected,
            actual: block.previous_hash.clone(),
        });
    }

    if !pow.is_valid(previous.proof, block.proof) {
        return Err(ChainError::InvalidProofOfWork {
            index: block.index,
            last_proof: previous.proof,
            proof: block.proof,
        });
    }

    Ok(())
}

/// Validate an entire chain, genesis first. Reports the first violation.
pub fn validate_chain(blocks: &[Block], pow: &ProofOfWork) -> Result<()> {
    let genesis = blocks
        .first()
        .ok_or_else(|| ChainError::InvalidBlock("Chain is empty.".to_string()))?;

    if genesis.index != 1 {
        return Err(ChainError::InvalidBlock(format!(
            "Genesis block must have index 1, but got {}.",
            genesis.index
        )));
    }
    if genesis.previous_hash != GENESIS_PREVIOUS_HASH {
        return Err(ChainError::InvalidBlock(format!(
            "Genesis block must carry previous hash {:?}, but got {:?}.",
            GENESIS_PREVIOUS_HASH, genesis.previous_hash
        )));
    }

    for pair in blocks.windows(2) {
        validate_block(&pair[0], &pair[1], pow)?;
    }
    Ok(())
}
