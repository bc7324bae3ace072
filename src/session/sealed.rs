//! Sealed session logs handed off for durable storage or external
//! anchoring.

use crate::anchor::{Anchor, LiteTrace};
use crate::chain::LedgerEntry;
use crate::core::{Hash256, Result};
use crate::crypto::sha3_256_multi;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What the caller learns about how the session ended. Never a silent
/// default: "anchored and attested", "anchored but inconclusive", and
/// "not anchored" are distinct.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionOutcome {
    /// An anchor was committed and its attestation round reached quorum.
    AnchoredAttested,
    /// An anchor was committed but attestation did not reach quorum;
    /// policy decision escalated to the caller.
    AnchoredInconclusive,
    /// Risk never crossed the threshold.
    NotAnchored,
}

/// The finalized record of one session: its ledger entries, optional
/// anchor, sampled traces, and a cumulative hash binding them.
///
/// The pipeline guarantees internal consistency of this record, not its
/// durability once handed off.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SealedLog {
    /// The session this log belongs to.
    pub session_id: Uuid,
    /// The write-once anchor, if risk crossed the threshold.
    pub anchor: Option<Anchor>,
    /// The session's ledger entries in global append order.
    pub entries: Vec<LedgerEntry>,
    /// Amber-band traces sampled during the session.
    pub lite_traces: Vec<LiteTrace>,
    /// SHA3-256 over the session's entry hashes in order.
    pub cumulative_hash: Hash256,
    /// How the session ended.
    pub outcome: SessionOutcome,
}

impl SealedLog {
    /// Cumulative hash over a sequence of entries.
    pub fn cumulative_hash_over(entries: &[LedgerEntry]) -> Hash256 {
        let chunks: Vec<&[u8]> = entries
            .iter()
            .map(|e| e.entry_hash.as_bytes().as_slice())
            .collect();
        sha3_256_multi(&chunks)
    }

    /// Re-derive the cumulative hash and check each entry's internal
    /// integrity. Excludes the trailing seal entry, which records the
    /// cumulative hash and is appended after it is computed.
    pub fn verify_internal(&self) -> bool {
        if self.entries.is_empty() || !self.entries.iter().all(LedgerEntry::is_intact) {
            return false;
        }
        let body = &self.entries[..self.entries.len() - 1];
        Self::cumulative_hash_over(body) == self.cumulative_hash
    }

    /// Compact binary export.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Restore from the binary export.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{ChainPayload, HashChain};

    fn sealed_for_chain() -> SealedLog {
        let mut chain = HashChain::new();
        let session_id = Uuid::new_v4();
        let mut entries = Vec::new();
        for tag in [1u8, 2, 3] {
            entries.push(
                chain
                    .append(ChainPayload::Seal {
                        session_id,
                        cumulative_hash: Hash256::new([tag; 32]),
                    })
                    .unwrap(),
            );
        }
        let cumulative_hash = SealedLog::cumulative_hash_over(&entries[..2]);
        SealedLog {
            session_id,
            anchor: None,
            entries,
            lite_traces: Vec::new(),
            cumulative_hash,
            outcome: SessionOutcome::NotAnchored,
        }
    }

    #[test]
    fn test_cumulative_hash_order_sensitive() {
        let log = sealed_for_chain();
        let forward = SealedLog::cumulative_hash_over(&log.entries);
        let mut reversed = log.entries.clone();
        reversed.reverse();
        assert_ne!(forward, SealedLog::cumulative_hash_over(&reversed));
    }

    #[test]
    fn test_verify_internal() {
        let log = sealed_for_chain();
        assert!(log.verify_internal());

        let mut tampered = log.clone();
        tampered.cumulative_hash = Hash256::new([0xaa; 32]);
        assert!(!tampered.verify_internal());
    }

    #[test]
    fn test_binary_roundtrip() {
        let log = sealed_for_chain();
        let bytes = log.to_bytes().unwrap();
        let restored = SealedLog::from_bytes(&bytes).unwrap();
        assert_eq!(restored.session_id, log.session_id);
        assert_eq!(restored.cumulative_hash, log.cumulative_hash);
        assert_eq!(restored.entries.len(), log.entries.len());
        assert_eq!(restored.outcome, log.outcome);
    }
}
