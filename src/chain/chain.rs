//! The append-only, tamper-evident hash chain.
//!
//! A single chain totally orders entries across all sessions. The head is
//! never exposed as raw mutable state; every write goes through `append`,
//! and callers share the chain behind a single lock (`SharedChain`).

use crate::chain::entry::{ChainPayload, LedgerEntry};
use crate::core::{now, Error, Hash256, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// The chain handle shared between the anchor controller and the
/// orchestrator. The mutex is the single-writer critical section for
/// `append`; appends are serialized, never interleaved.
pub type SharedChain = Arc<tokio::sync::Mutex<HashChain>>;

/// Append-only hash-linked ledger with O(1) receipts.
pub struct HashChain {
    entries: Vec<LedgerEntry>,
    /// entry_hash -> sequence_number, for O(1) membership checks.
    index: HashMap<Hash256, u64>,
    /// Set on detected integrity violation; latched until manual review.
    halted: bool,
}

impl HashChain {
    /// Create a chain seeded with a genesis entry, so the head is always
    /// defined.
    pub fn new() -> Self {
        let timestamp = now();
        let payload = ChainPayload::Genesis;
        // Genesis encoding is infallible: no float or map content.
        let payload_hash = payload.hash().unwrap_or_default();
        let previous_hash = Hash256::zero();
        let entry_hash =
            LedgerEntry::compute_entry_hash(0, &payload_hash, &previous_hash, &timestamp);

        let genesis = LedgerEntry {
            sequence_number: 0,
            timestamp,
            payload,
            payload_hash,
            previous_hash,
            entry_hash: entry_hash.clone(),
        };

        let mut index = HashMap::new();
        index.insert(entry_hash, 0);

        Self {
            entries: vec![genesis],
            index,
            halted: false,
        }
    }

    /// Wrap a fresh chain in the shared handle.
    pub fn shared() -> SharedChain {
        Arc::new(tokio::sync::Mutex::new(Self::new()))
    }

    /// Append a payload as the next entry.
    ///
    /// All hashing happens before any mutation; the entry push and index
    /// update are the final statements, so no error path leaves a
    /// half-written entry.
    pub fn append(&mut self, payload: ChainPayload) -> Result<LedgerEntry> {
        if self.halted {
            return Err(Error::ChainHalted);
        }

        let sequence_number = self.entries.len() as u64;
        let timestamp = now();
        let payload_hash = payload.hash()?;
        let previous_hash = self.head_hash().clone();
        let entry_hash = LedgerEntry::compute_entry_hash(
            sequence_number,
            &payload_hash,
            &previous_hash,
            &timestamp,
        );

        let entry = LedgerEntry {
            sequence_number,
            timestamp,
            payload,
            payload_hash,
            previous_hash,
            entry_hash: entry_hash.clone(),
        };

        self.entries.push(entry.clone());
        self.index.insert(entry_hash, sequence_number);

        Ok(entry)
    }

    /// Hash of the most recent entry.
    pub fn head_hash(&self) -> &Hash256 {
        // The chain is never empty: genesis is seeded at construction.
        &self.entries.last().unwrap().entry_hash
    }

    /// Number of entries, genesis included.
    pub fn len(&self) -> u64 {
        self.entries.len() as u64
    }

    /// A seeded chain is never empty.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Entry at a given sequence number.
    pub fn entry(&self, sequence_number: u64) -> Option<&LedgerEntry> {
        self.entries.get(sequence_number as usize)
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Entries belonging to one session, in global append order.
    pub fn entries_for_session(&self, session_id: Uuid) -> Vec<LedgerEntry> {
        self.entries
            .iter()
            .filter(|e| e.payload.session_id() == Some(session_id))
            .cloned()
            .collect()
    }

    /// O(1) membership check for an entry hash.
    pub fn receipt(&self, entry_hash: &Hash256) -> bool {
        self.index.contains_key(entry_hash)
    }

    /// Sequence number of the first entry failing verification, if any.
    pub fn first_invalid(&self) -> Option<u64> {
        let mut previous: Option<&LedgerEntry> = None;
        for (i, entry) in self.entries.iter().enumerate() {
            if entry.sequence_number != i as u64 {
                return Some(i as u64);
            }
            if !entry.is_intact() {
                return Some(entry.sequence_number);
            }
            let expected_previous = match previous {
                Some(prior) => &prior.entry_hash,
                None => {
                    if entry.previous_hash != Hash256::zero() {
                        return Some(entry.sequence_number);
                    }
                    &entry.previous_hash
                }
            };
            if &entry.previous_hash != expected_previous {
                return Some(entry.sequence_number);
            }
            previous = Some(entry);
        }
        None
    }

    /// Pure full-chain verification: recomputes every hash and checks
    /// every link. Fails closed on any mismatch, truncation, or
    /// out-of-order sequence number.
    pub fn verify(&self) -> bool {
        self.first_invalid().is_none()
    }

    /// Latch the chain halted; all subsequent appends fail until manual
    /// review. Never auto-repaired.
    pub fn halt(&mut self) {
        if !self.halted {
            warn!(entries = self.entries.len(), "chain halted for review");
        }
        self.halted = true;
    }

    /// Whether the chain is halted.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Export all entries as JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.entries)?)
    }

    /// Import a chain from JSON, verifying it before accepting.
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<LedgerEntry> = serde_json::from_str(json)?;
        if entries.is_empty() {
            return Err(Error::EntryCreationFailed("empty chain".into()));
        }

        let index = entries
            .iter()
            .map(|e| (e.entry_hash.clone(), e.sequence_number))
            .collect();

        let chain = Self {
            entries,
            index,
            halted: false,
        };

        if let Some(sequence) = chain.first_invalid() {
            return Err(Error::IntegrityViolation(sequence));
        }
        Ok(chain)
    }
}

impl Default for HashChain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seal(tag: u8) -> ChainPayload {
        ChainPayload::Seal {
            session_id: Uuid::nil(),
            cumulative_hash: Hash256::new([tag; 32]),
        }
    }

    #[test]
    fn test_genesis_seeded() {
        let chain = HashChain::new();
        assert_eq!(chain.len(), 1);
        assert!(chain.verify());
        assert_eq!(chain.entry(0).unwrap().previous_hash, Hash256::zero());
    }

    #[test]
    fn test_append_links_to_head() {
        let mut chain = HashChain::new();
        let genesis_hash = chain.head_hash().clone();
        let entry = chain.append(seal(1)).unwrap();
        assert_eq!(entry.previous_hash, genesis_hash);
        assert_eq!(entry.sequence_number, 1);
        assert_eq!(chain.head_hash(), &entry.entry_hash);
    }

    #[test]
    fn test_verify_after_many_appends() {
        let mut chain = HashChain::new();
        for tag in 0..25u8 {
            chain.append(seal(tag)).unwrap();
        }
        assert!(chain.verify());
    }

    #[test]
    fn test_receipt_membership() {
        let mut chain = HashChain::new();
        let entry = chain.append(seal(1)).unwrap();
        assert!(chain.receipt(&entry.entry_hash));
        assert!(!chain.receipt(&Hash256::new([0xee; 32])));
    }

    #[test]
    fn test_tampered_payload_fails_verify() {
        let mut chain = HashChain::new();
        chain.append(seal(1)).unwrap();
        chain.append(seal(2)).unwrap();

        chain.entries[1].payload = seal(9);
        assert!(!chain.verify());
        assert_eq!(chain.first_invalid(), Some(1));
    }

    #[test]
    fn test_tampered_stored_hash_fails_verify() {
        let mut chain = HashChain::new();
        chain.append(seal(1)).unwrap();

        let mut bytes = *chain.entries[1].payload_hash.as_bytes();
        bytes[0] ^= 0x01;
        chain.entries[1].payload_hash = Hash256::new(bytes);
        assert!(!chain.verify());
    }

    #[test]
    fn test_tampered_sequence_fails_verify() {
        let mut chain = HashChain::new();
        chain.append(seal(1)).unwrap();
        chain.entries[1].sequence_number = 7;
        assert!(!chain.verify());
    }

    #[test]
    fn test_reordered_entries_fail_verify() {
        // Three payloads "a","b","c" in order verify; swapping 2 and 3
        // in storage must not.
        let mut chain = HashChain::new();
        for tag in [b'a', b'b', b'c'] {
            chain.append(seal(tag)).unwrap();
        }
        assert!(chain.verify());

        chain.entries.swap(2, 3);
        assert!(!chain.verify());
    }

    #[test]
    fn test_truncation_fails_verify() {
        let mut chain = HashChain::new();
        for tag in 0..5u8 {
            chain.append(seal(tag)).unwrap();
        }
        // Drop an interior entry.
        chain.entries.remove(2);
        assert!(!chain.verify());
    }

    #[test]
    fn test_halted_chain_rejects_appends() {
        let mut chain = HashChain::new();
        chain.halt();
        assert!(chain.is_halted());
        assert!(matches!(chain.append(seal(1)), Err(Error::ChainHalted)));
    }

    #[test]
    fn test_json_roundtrip_verifies() {
        let mut chain = HashChain::new();
        chain.append(seal(1)).unwrap();
        chain.append(seal(2)).unwrap();

        let json = chain.to_json().unwrap();
        let restored = HashChain::from_json(&json).unwrap();
        assert_eq!(restored.len(), chain.len());
        assert!(restored.verify());
    }

    #[test]
    fn test_tampered_json_import_rejected() {
        let mut chain = HashChain::new();
        chain.append(seal(1)).unwrap();
        chain.entries[1].sequence_number = 3;

        let json = chain.to_json().unwrap();
        assert!(matches!(
            HashChain::from_json(&json),
            Err(Error::IntegrityViolation(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_appends_serialized() {
        let chain = HashChain::shared();
        let mut handles = Vec::new();
        for tag in 0..8u8 {
            let chain = chain.clone();
            handles.push(tokio::spawn(async move {
                chain.lock().await.append(seal(tag)).unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        let chain = chain.lock().await;
        assert_eq!(chain.len(), 9);
        assert!(chain.verify());
    }
}
