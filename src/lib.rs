//! forgechain - a single-node proof-of-work ledger
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Ledger
//! - [`blockchain`] - Blocks, the ledger, its shared handle and chain validation
//! - [`transaction`] - Transfer records
//!
//! ## Hashing
//! - [`canonical`] - Sorted-key JSON encoding that block digests are taken over
//! - [`crypto`] - SHA-256 helpers and node identifiers
//!
//! ## Consensus & Mining
//! - [`miner`] - Proof-of-work search and the mining protocol
//!
//! ## Integration
//! - [`api`] - HTTP API (axum)
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod blockchain;
pub mod transaction;

// ============================================================================
// Hashing
// ============================================================================
pub mod canonical;
pub mod crypto;

// ============================================================================
// Consensus & Mining
// ============================================================================
pub mod miner;

// ============================================================================
// Integration
// ============================================================================
#[cfg(feature = "api")]
pub mod api;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
