// Thin re-export module: implementation is in `blockchain/core.rs`, split
// into the ledger itself, its shared handle, and chain validation.

pub mod core;
pub use core::*;
