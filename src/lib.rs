//! # anchorlog - accountable-decision audit pipeline
//!
//! Continuous risk scoring over in-flight decisions with a tamper-evident
//! audit trail:
//! - **risk**: a dynamic stream of bounded risk samples scored from an
//!   evolving decision context
//! - **anchor**: a write-once anchor commit when risk crosses the policy
//!   threshold, with amber-band lite traces below it
//! - **chain**: an append-only hash chain totally ordering all records
//! - **attest**: quorum attestation of sealed records by a stake-weighted
//!   set of semi-trusted attestor nodes
//! - **session**: the orchestrator binding one decision session together
//!
//! ## Quick Start
//!
//! ```rust
//! use anchorlog::chain::{ChainPayload, HashChain};
//! use anchorlog::core::Hash256;
//! use uuid::Uuid;
//!
//! let mut chain = HashChain::new();
//! let entry = chain
//!     .append(ChainPayload::Seal {
//!         session_id: Uuid::new_v4(),
//!         cumulative_hash: Hash256::zero(),
//!     })
//!     .unwrap();
//! assert!(chain.verify());
//! assert!(chain.receipt(&entry.entry_hash));
//! ```

pub mod anchor;
pub mod attest;
pub mod chain;
pub mod core;
pub mod crypto;
pub mod risk;
pub mod session;

pub use crate::core::error::{Error, Result};
