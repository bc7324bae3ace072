//! Attestation rounds: per-record confirmation collection and the 2/3
//! weight quorum.

use crate::attest::node::{AttestorNode, NodeKind};
use crate::core::{now, Hash256, Timestamp};
use serde::{Deserialize, Serialize};

/// A signed confirmation from one attestor.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Confirmation {
    /// Confirming node.
    pub node_id: String,
    /// The record hash being attested.
    pub record_hash: Hash256,
    /// When the node signed.
    pub timestamp: Timestamp,
    /// Ed25519 signature over `message(record_hash, node_id)`.
    pub signature: Vec<u8>,
}

impl Confirmation {
    /// The canonical byte string an attestor signs.
    pub fn message(record_hash: &Hash256, node_id: &str) -> Vec<u8> {
        let mut message = record_hash.as_bytes().to_vec();
        message.extend_from_slice(node_id.as_bytes());
        message
    }
}

/// Identity and weight of one selected attestor, kept after the full node
/// record is no longer needed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SelectedAttestor {
    pub node_id: String,
    pub kind: NodeKind,
    pub stake: u64,
}

/// One attestation round over a sealed record. Ephemeral: resolved, handed
/// to the caller, and discarded.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AttestationRound {
    /// The record under attestation.
    pub record_hash: Hash256,
    /// The selected attestor set.
    pub selected: Vec<SelectedAttestor>,
    /// Confirmations accepted so far.
    pub confirmations: Vec<Confirmation>,
    /// Stake behind accepted confirmations.
    pub confirmed_stake: u64,
    /// Total stake of the selected set.
    pub selected_stake: u64,
    /// Quorum outcome; meaningful after `resolve`.
    pub consensus: bool,
    /// Set when an unresponsive node could not be replaced because the
    /// backup pool was empty; escalation signal for the caller.
    pub backup_exhausted: bool,
    /// When the round was resolved.
    pub resolved_at: Option<Timestamp>,
}

impl AttestationRound {
    /// Open a round over a selected set.
    pub fn new(record_hash: Hash256, selected: &[AttestorNode]) -> Self {
        Self {
            record_hash,
            selected: selected
                .iter()
                .map(|n| SelectedAttestor {
                    node_id: n.node_id.clone(),
                    kind: n.kind,
                    stake: n.stake,
                })
                .collect(),
            confirmations: Vec::new(),
            confirmed_stake: 0,
            selected_stake: selected.iter().map(|n| n.stake).sum(),
            consensus: false,
            backup_exhausted: false,
            resolved_at: None,
        }
    }

    /// Swap an unresponsive member for a backup node. The departed
    /// member's stake leaves the denominator; the substitute's enters it.
    pub fn replace(&mut self, node_id: &str, substitute: &AttestorNode) {
        if let Some(pos) = self.selected.iter().position(|s| s.node_id == node_id) {
            self.selected_stake -= self.selected[pos].stake;
            self.selected.remove(pos);
        }
        self.selected.push(SelectedAttestor {
            node_id: substitute.node_id.clone(),
            kind: substitute.kind,
            stake: substitute.stake,
        });
        self.selected_stake += substitute.stake;
    }

    /// Stake of a selected member, if present.
    pub fn stake_of(&self, node_id: &str) -> Option<u64> {
        self.selected
            .iter()
            .find(|s| s.node_id == node_id)
            .map(|s| s.stake)
    }

    /// Accept a (signature-checked) confirmation from a selected member.
    /// Duplicate confirmations from the same node are ignored.
    pub fn accept(&mut self, confirmation: Confirmation) {
        if self
            .confirmations
            .iter()
            .any(|c| c.node_id == confirmation.node_id)
        {
            return;
        }
        if let Some(stake) = self.stake_of(&confirmation.node_id) {
            self.confirmed_stake += stake;
            self.confirmations.push(confirmation);
        }
    }

    /// Inclusive 2/3 quorum on integer weights: no float rounding at the
    /// boundary, so 2-of-3 equal stakes (exactly 2/3) is consensus.
    pub fn meets_quorum(confirmed_stake: u64, selected_stake: u64) -> bool {
        selected_stake > 0 && confirmed_stake * 3 >= selected_stake * 2
    }

    /// Evaluate consensus over whatever confirmations arrived and stamp
    /// the resolution time.
    pub fn resolve(&mut self) -> bool {
        self.consensus = Self::meets_quorum(self.confirmed_stake, self.selected_stake);
        self.resolved_at = Some(now());
        self.consensus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SigningSuite;

    fn node(id: &str, stake: u64) -> AttestorNode {
        AttestorNode::new(
            id,
            NodeKind::Full,
            stake,
            "mem://test",
            SigningSuite::generate().verifying_key(),
        )
    }

    fn confirmation(id: &str, record: &Hash256) -> Confirmation {
        Confirmation {
            node_id: id.to_string(),
            record_hash: record.clone(),
            timestamp: now(),
            signature: Vec::new(),
        }
    }

    #[test]
    fn test_quorum_boundary_inclusive() {
        // 2 of 3 equal stakes is exactly 2/3 and counts as consensus.
        assert!(AttestationRound::meets_quorum(2, 3));
        // Just below: 199 of 300.
        assert!(!AttestationRound::meets_quorum(199, 300));
        assert!(AttestationRound::meets_quorum(200, 300));
        // Empty set never reaches quorum.
        assert!(!AttestationRound::meets_quorum(0, 0));
    }

    #[test]
    fn test_round_resolves_consensus_by_stake() {
        let record = Hash256::new([7u8; 32]);
        let nodes = vec![node("a", 10_000), node("b", 10_000), node("c", 10_000)];
        let mut round = AttestationRound::new(record.clone(), &nodes);

        round.accept(confirmation("a", &record));
        assert!(!round.resolve());

        round.accept(confirmation("b", &record));
        assert!(round.resolve());
        assert!(round.resolved_at.is_some());
    }

    #[test]
    fn test_duplicate_confirmations_ignored() {
        let record = Hash256::new([7u8; 32]);
        let nodes = vec![node("a", 30_000), node("b", 15_000)];
        let mut round = AttestationRound::new(record.clone(), &nodes);

        round.accept(confirmation("a", &record));
        round.accept(confirmation("a", &record));
        assert_eq!(round.confirmations.len(), 1);
        assert_eq!(round.confirmed_stake, 30_000);
    }

    #[test]
    fn test_unselected_node_cannot_confirm() {
        let record = Hash256::new([7u8; 32]);
        let nodes = vec![node("a", 30_000)];
        let mut round = AttestationRound::new(record.clone(), &nodes);

        round.accept(confirmation("intruder", &record));
        assert!(round.confirmations.is_empty());
        assert_eq!(round.confirmed_stake, 0);
    }

    #[test]
    fn test_unequal_stakes_decide_quorum() {
        let record = Hash256::new([7u8; 32]);
        // One whale holds 2/3 of the stake on its own.
        let nodes = vec![node("whale", 40_000), node("a", 10_000), node("b", 10_000)];
        let mut round = AttestationRound::new(record.clone(), &nodes);

        round.accept(confirmation("whale", &record));
        assert!(round.resolve());
    }
}
