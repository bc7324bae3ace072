//! Ledger entries and the closed set of chain payload variants.

use crate::anchor::{Anchor, LiteTrace};
use crate::core::{Hash256, Result, Timestamp};
use crate::crypto::{sha3_256, sha3_256_multi};
use crate::risk::RiskSample;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Everything the ledger can record. A closed, tagged set with one
/// canonical encoding (sorted-map JSON) used consistently for hashing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ChainPayload {
    /// Chain initialization marker.
    Genesis,
    /// One scored sample from a session's dynamic stream.
    Sample { session_id: Uuid, sample: RiskSample },
    /// The write-once anchor committed when risk crossed the threshold.
    Anchor(Anchor),
    /// A near-threshold lite trace, written at seal time.
    Trace { session_id: Uuid, trace: LiteTrace },
    /// Session finalization with the cumulative hash over its entries.
    Seal {
        session_id: Uuid,
        cumulative_hash: Hash256,
    },
}

impl ChainPayload {
    /// Canonical byte encoding used for `payload_hash`.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// SHA3-256 over the canonical encoding.
    pub fn hash(&self) -> Result<Hash256> {
        Ok(sha3_256(&self.canonical_bytes()?))
    }

    /// Session this payload belongs to, if any.
    pub fn session_id(&self) -> Option<Uuid> {
        match self {
            ChainPayload::Genesis => None,
            ChainPayload::Sample { session_id, .. } => Some(*session_id),
            ChainPayload::Anchor(anchor) => Some(anchor.session_id),
            ChainPayload::Trace { session_id, .. } => Some(*session_id),
            ChainPayload::Seal { session_id, .. } => Some(*session_id),
        }
    }

    /// Variant name for logging.
    pub fn label(&self) -> &'static str {
        match self {
            ChainPayload::Genesis => "genesis",
            ChainPayload::Sample { .. } => "sample",
            ChainPayload::Anchor(_) => "anchor",
            ChainPayload::Trace { .. } => "trace",
            ChainPayload::Seal { .. } => "seal",
        }
    }
}

/// One hash-linked entry in the ledger. Owned exclusively by the chain;
/// immutable once appended.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Global append position, contiguous from 0 (genesis).
    pub sequence_number: u64,
    /// When the entry was appended.
    pub timestamp: Timestamp,
    /// The recorded payload.
    pub payload: ChainPayload,
    /// Hash of the payload's canonical encoding.
    pub payload_hash: Hash256,
    /// `entry_hash` of the predecessor (zero for genesis).
    pub previous_hash: Hash256,
    /// `H(sequence_number ∥ payload_hash ∥ previous_hash ∥ timestamp)`.
    pub entry_hash: Hash256,
}

impl LedgerEntry {
    /// Compute the link hash from an entry's constituent fields.
    pub fn compute_entry_hash(
        sequence_number: u64,
        payload_hash: &Hash256,
        previous_hash: &Hash256,
        timestamp: &Timestamp,
    ) -> Hash256 {
        let seq_bytes = sequence_number.to_le_bytes();
        let ts = timestamp.to_rfc3339();
        sha3_256_multi(&[
            &seq_bytes,
            payload_hash.as_bytes(),
            previous_hash.as_bytes(),
            ts.as_bytes(),
        ])
    }

    /// Recompute both hashes from stored fields and compare. Fails closed:
    /// any mismatch (including a payload that no longer encodes) is
    /// reported as invalid.
    pub fn is_intact(&self) -> bool {
        let payload_hash = match self.payload.hash() {
            Ok(hash) => hash,
            Err(_) => return false,
        };
        if payload_hash != self.payload_hash {
            return false;
        }
        let entry_hash = Self::compute_entry_hash(
            self.sequence_number,
            &self.payload_hash,
            &self.previous_hash,
            &self.timestamp,
        );
        entry_hash == self.entry_hash
    }
}
