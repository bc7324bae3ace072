//! Tamper-evident hash chain: the single authoritative audit ledger.

pub mod chain;
pub mod entry;

pub use chain::{HashChain, SharedChain};
pub use entry::{ChainPayload, LedgerEntry};
