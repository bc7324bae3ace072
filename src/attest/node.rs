//! Attestor nodes and the registry tracking their standing.

use crate::core::{Error, Result};
use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Minimum stake required to register.
pub const MIN_STAKE: u64 = 10_000;

/// Reputation multiplier applied on each failure.
const REPUTATION_DECAY: f64 = 0.95;
/// Reputation recovered on each success (capped at 1.0).
const REPUTATION_RECOVERY: f64 = 0.01;
/// Fraction of stake slashed after two consecutive failures.
const SLASH_RATIO: f64 = 0.10;
/// Rounds a slashed node sits out of selection.
const EXCLUSION_ROUNDS: u64 = 5;

/// Node capability class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Operates attested hardware; eligible for any round.
    Full,
    /// Verification-only node.
    Lightweight,
}

/// A semi-trusted attestor node.
#[derive(Clone, Debug)]
pub struct AttestorNode {
    /// Stable node identifier.
    pub node_id: String,
    /// Capability class.
    pub kind: NodeKind,
    /// Stake backing the node's confirmations; the consensus weight.
    pub stake: u64,
    /// Standing in `[0, 1]`; decays on failure, recovers slowly.
    pub reputation: f64,
    /// Transport endpoint (opaque to the core).
    pub endpoint: String,
    /// Key its confirmations are verified against.
    pub public_key: VerifyingKey,
}

impl AttestorNode {
    /// Create a node with full reputation.
    pub fn new(
        node_id: &str,
        kind: NodeKind,
        stake: u64,
        endpoint: &str,
        public_key: VerifyingKey,
    ) -> Self {
        Self {
            node_id: node_id.to_string(),
            kind,
            stake,
            reputation: 1.0,
            endpoint: endpoint.to_string(),
            public_key,
        }
    }

    /// Selection weight: stake scaled by standing.
    pub fn weight(&self) -> f64 {
        self.stake as f64 * self.reputation.clamp(0.0, 1.0)
    }
}

struct NodeRecord {
    node: AttestorNode,
    consecutive_failures: u32,
    excluded_until: u64,
}

/// Long-lived registry of attestor nodes.
///
/// Tracks reputation, consecutive failures, and temporary exclusions by a
/// monotonically increasing round counter.
#[derive(Default)]
pub struct AttestorRegistry {
    records: HashMap<String, NodeRecord>,
    round_counter: u64,
}

impl AttestorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node; rejects stakes below `MIN_STAKE`.
    pub fn register(&mut self, node: AttestorNode) -> Result<()> {
        if node.stake < MIN_STAKE {
            return Err(Error::InsufficientStake(node.stake));
        }
        self.records.insert(
            node.node_id.clone(),
            NodeRecord {
                node,
                consecutive_failures: 0,
                excluded_until: 0,
            },
        );
        Ok(())
    }

    /// Remove a node entirely.
    pub fn deregister(&mut self, node_id: &str) {
        self.records.remove(node_id);
    }

    /// Number of registered nodes.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up a node by id.
    pub fn get(&self, node_id: &str) -> Option<&AttestorNode> {
        self.records.get(node_id).map(|r| &r.node)
    }

    /// Advance the round counter and return the new round number.
    pub fn next_round(&mut self) -> u64 {
        self.round_counter += 1;
        self.round_counter
    }

    /// Nodes currently eligible for selection (not temporarily excluded).
    pub fn eligible(&self) -> Vec<AttestorNode> {
        self.records
            .values()
            .filter(|r| r.excluded_until <= self.round_counter)
            .map(|r| r.node.clone())
            .collect()
    }

    /// Backup candidates outside `exclude`, best `reputation * stake`
    /// first.
    pub fn backup_pool(&self, exclude: &[String]) -> Vec<AttestorNode> {
        let mut pool: Vec<AttestorNode> = self
            .records
            .values()
            .filter(|r| {
                r.excluded_until <= self.round_counter
                    && !exclude.contains(&r.node.node_id)
            })
            .map(|r| r.node.clone())
            .collect();
        pool.sort_by(|a, b| {
            b.weight()
                .partial_cmp(&a.weight())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        pool
    }

    /// Record a successful confirmation: slow reputation recovery and a
    /// reset of the failure streak.
    pub fn record_success(&mut self, node_id: &str) {
        if let Some(record) = self.records.get_mut(node_id) {
            record.consecutive_failures = 0;
            record.node.reputation = (record.node.reputation + REPUTATION_RECOVERY).min(1.0);
        }
    }

    /// Record a timeout or invalid signature: reputation decay, and after
    /// two consecutive failures a partial stake slash plus temporary
    /// exclusion from selection. Returns true if the node was slashed.
    pub fn record_failure(&mut self, node_id: &str) -> bool {
        let round = self.round_counter;
        let Some(record) = self.records.get_mut(node_id) else {
            return false;
        };

        record.consecutive_failures += 1;
        record.node.reputation *= REPUTATION_DECAY;

        if record.consecutive_failures >= 2 {
            let slashed = (record.node.stake as f64 * SLASH_RATIO) as u64;
            record.node.stake = record.node.stake.saturating_sub(slashed);
            record.excluded_until = round + EXCLUSION_ROUNDS;
            record.consecutive_failures = 0;
            warn!(
                node = node_id,
                slashed, "attestor slashed and temporarily excluded"
            );
            return true;
        }
        false
    }
}
