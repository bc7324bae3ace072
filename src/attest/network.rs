//! The attestation network: selection, submission, and verification of
//! quorum rounds over sealed records.

use crate::attest::node::{AttestorNode, AttestorRegistry};
use crate::attest::round::{AttestationRound, Confirmation};
use crate::attest::selection::{self, RoundCriticality};
use crate::core::{Hash256, Result};
use crate::crypto;
use async_trait::async_trait;
use futures::future::join_all;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Transport seam to attestor nodes. Message delivery is external; the
/// core only hands over a record hash and expects a signed confirmation
/// back.
#[async_trait]
pub trait AttestorTransport: Send + Sync {
    /// Request a signed confirmation of `record_hash` from one node.
    async fn confirm(&self, node: &AttestorNode, record_hash: &Hash256) -> Result<Confirmation>;
}

/// Distributes sealed records to weighted-random attestor subsets and
/// computes quorum consensus.
///
/// The random source is injected so selection is reproducible under a
/// seeded RNG in tests without being predictable in production.
pub struct AttestationNetwork {
    registry: RwLock<AttestorRegistry>,
    transport: Arc<dyn AttestorTransport>,
    rng: Mutex<StdRng>,
    deadline: Duration,
}

impl AttestationNetwork {
    /// Build a network with an explicit RNG.
    pub fn new(transport: Arc<dyn AttestorTransport>, deadline: Duration, rng: StdRng) -> Self {
        Self {
            registry: RwLock::new(AttestorRegistry::new()),
            transport,
            rng: Mutex::new(rng),
            deadline,
        }
    }

    /// Build a network seeded from system entropy.
    pub fn with_entropy(transport: Arc<dyn AttestorTransport>, deadline: Duration) -> Self {
        Self::new(transport, deadline, StdRng::from_entropy())
    }

    /// Register an attestor node.
    pub async fn register(&self, node: AttestorNode) -> Result<()> {
        self.registry.write().await.register(node)
    }

    /// Number of registered nodes.
    pub async fn node_count(&self) -> usize {
        self.registry.read().await.len()
    }

    /// Current view of a node's standing.
    pub async fn node(&self, node_id: &str) -> Option<AttestorNode> {
        self.registry.read().await.get(node_id).cloned()
    }

    /// Select the attestor set for a round: stake-weighted sampling
    /// without replacement plus the full-node diversity correction.
    pub async fn select(&self, criticality: RoundCriticality) -> Vec<AttestorNode> {
        let pool = {
            let mut registry = self.registry.write().await;
            registry.next_round();
            registry.eligible()
        };
        let mut rng = self.rng.lock().await;
        let selected = selection::select(&pool, criticality, &mut *rng);
        debug!(
            requested = criticality.set_size(),
            selected = selected.len(),
            "attestor set selected"
        );
        selected
    }

    /// Submit a record hash to the selected set and resolve consensus.
    ///
    /// Each request is bounded by the round deadline; on timeout,
    /// consensus is evaluated over whatever confirmations arrived — never
    /// silently retried. Unresponsive nodes get one substitution attempt
    /// from the backup pool (best `reputation * stake` first).
    pub async fn submit(
        &self,
        record_hash: &Hash256,
        selected: &[AttestorNode],
    ) -> AttestationRound {
        let mut round = AttestationRound::new(record_hash.clone(), selected);
        if selected.is_empty() {
            round.resolve();
            return round;
        }

        let mut timed_out = Vec::new();
        let outcomes = self.fan_out(selected, record_hash).await;
        {
            let mut registry = self.registry.write().await;
            for (node, outcome) in outcomes {
                match outcome {
                    ConfirmOutcome::Confirmed(confirmation) => {
                        round.accept(confirmation);
                        registry.record_success(&node.node_id);
                    }
                    ConfirmOutcome::InvalidSignature => {
                        warn!(node = %node.node_id, "invalid confirmation signature");
                        registry.record_failure(&node.node_id);
                    }
                    ConfirmOutcome::Failed => {
                        registry.record_failure(&node.node_id);
                    }
                    ConfirmOutcome::TimedOut => {
                        registry.record_failure(&node.node_id);
                        timed_out.push(node);
                    }
                }
            }
        }

        if !timed_out.is_empty() {
            self.substitute(&mut round, &timed_out, selected, record_hash)
                .await;
        }

        let consensus = round.resolve();
        info!(
            record = %record_hash.short(),
            confirmed = round.confirmed_stake,
            selected = round.selected_stake,
            consensus,
            "attestation round resolved"
        );
        round
    }

    /// Recompute the quorum from scratch: every confirmation's signature
    /// is independently checked against the registered public key, and
    /// invalid ones are excluded from the confirmed weight. The round may
    /// have arrived from an untrusted party, so each node's stake counts
    /// at most once no matter how often its confirmation is repeated.
    pub async fn verify(&self, round: &AttestationRound) -> bool {
        let registry = self.registry.read().await;
        let mut counted: HashSet<&str> = HashSet::new();
        let mut confirmed_stake = 0u64;
        for confirmation in &round.confirmations {
            if counted.contains(confirmation.node_id.as_str()) {
                continue;
            }
            let Some(node) = registry.get(&confirmation.node_id) else {
                continue;
            };
            if confirmation.record_hash != round.record_hash {
                continue;
            }
            let message = Confirmation::message(&round.record_hash, &confirmation.node_id);
            if crypto::verify(&node.public_key, &message, &confirmation.signature).is_ok() {
                if let Some(stake) = round.stake_of(&confirmation.node_id) {
                    counted.insert(confirmation.node_id.as_str());
                    confirmed_stake += stake;
                }
            }
        }
        AttestationRound::meets_quorum(confirmed_stake, round.selected_stake)
    }

    /// Fan the record hash out to every node, each bounded by the round
    /// deadline, and classify each outcome.
    async fn fan_out(
        &self,
        nodes: &[AttestorNode],
        record_hash: &Hash256,
    ) -> Vec<(AttestorNode, ConfirmOutcome)> {
        let transport = &self.transport;
        let deadline = self.deadline;
        join_all(nodes.iter().map(|node| async move {
            let outcome =
                match tokio::time::timeout(deadline, transport.confirm(node, record_hash)).await {
                    Ok(Ok(confirmation)) => {
                        if confirmation_is_valid(node, record_hash, &confirmation) {
                            ConfirmOutcome::Confirmed(confirmation)
                        } else {
                            ConfirmOutcome::InvalidSignature
                        }
                    }
                    Ok(Err(_)) => ConfirmOutcome::Failed,
                    Err(_) => ConfirmOutcome::TimedOut,
                };
            (node.clone(), outcome)
        }))
        .await
    }

    /// One substitution pass for nodes that never responded.
    async fn substitute(
        &self,
        round: &mut AttestationRound,
        timed_out: &[AttestorNode],
        selected: &[AttestorNode],
        record_hash: &Hash256,
    ) {
        let exclude: Vec<String> = selected.iter().map(|n| n.node_id.clone()).collect();
        let backups = {
            let registry = self.registry.read().await;
            registry.backup_pool(&exclude)
        };

        if backups.len() < timed_out.len() {
            warn!(
                missing = timed_out.len() - backups.len(),
                "backup attestor pool exhausted"
            );
            round.backup_exhausted = true;
        }

        let substitutes: Vec<AttestorNode> =
            backups.into_iter().take(timed_out.len()).collect();
        if substitutes.is_empty() {
            return;
        }

        for (failed, substitute) in timed_out.iter().zip(substitutes.iter()) {
            debug!(
                failed = %failed.node_id,
                substitute = %substitute.node_id,
                "substituting unresponsive attestor"
            );
            round.replace(&failed.node_id, substitute);
        }

        let outcomes = self.fan_out(&substitutes, record_hash).await;
        let mut registry = self.registry.write().await;
        for (node, outcome) in outcomes {
            match outcome {
                ConfirmOutcome::Confirmed(confirmation) => {
                    round.accept(confirmation);
                    registry.record_success(&node.node_id);
                }
                _ => {
                    registry.record_failure(&node.node_id);
                }
            }
        }
    }
}

enum ConfirmOutcome {
    Confirmed(Confirmation),
    InvalidSignature,
    Failed,
    TimedOut,
}

fn confirmation_is_valid(
    node: &AttestorNode,
    record_hash: &Hash256,
    confirmation: &Confirmation,
) -> bool {
    if confirmation.node_id != node.node_id || &confirmation.record_hash != record_hash {
        return false;
    }
    let message = Confirmation::message(record_hash, &node.node_id);
    crypto::verify(&node.public_key, &message, &confirmation.signature).is_ok()
}
