//! Error types for forgechain

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ChainError {
    #[error("Invalid block linkage at index {index}: expected previous hash {expected}, got {actual}")]
    InvalidBlockLinkage {
        index: u64,
        expected: String,
        actual: String,
    },
    #[error("Invalid proof of work at index {index}: proof {proof} does not follow {last_proof}")]
    InvalidProofOfWork {
        index: u64,
        last_proof: u64,
        proof: u64,
    },
    #[error("Invalid block: {0}")]
    InvalidBlock(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::SerializationError(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::ConfigError(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
