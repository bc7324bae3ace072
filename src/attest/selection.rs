//! Stake-weighted attestor selection with a full-node diversity floor.

use crate::attest::node::{AttestorNode, NodeKind};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// How consequential the record under attestation is; sets the selected
/// set size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundCriticality {
    /// Routine ledger entry.
    Routine,
    /// High-stakes but non-anchoring record.
    Elevated,
    /// Anchor-triggering record.
    Anchor,
}

impl RoundCriticality {
    /// Target selected-set size, capped by registry size at selection.
    pub fn set_size(&self) -> usize {
        match self {
            RoundCriticality::Routine => 3,
            RoundCriticality::Elevated => 7,
            RoundCriticality::Anchor => 11,
        }
    }
}

/// Minimum full-kind nodes for a selected set of `n`: `ceil(0.6 * n)`.
pub fn min_full(n: usize) -> usize {
    (n * 3 + 4) / 5
}

/// Stake-weighted random sampling without replacement, followed by the
/// diversity correction. The random source is caller-supplied so tests
/// can seed it.
pub fn select(
    pool: &[AttestorNode],
    criticality: RoundCriticality,
    rng: &mut impl Rng,
) -> Vec<AttestorNode> {
    let count = criticality.set_size().min(pool.len());
    let mut remaining: Vec<AttestorNode> = pool.to_vec();
    let mut selected = Vec::with_capacity(count);

    while selected.len() < count && !remaining.is_empty() {
        let total: f64 = remaining.iter().map(AttestorNode::weight).sum();
        let pick = if total > 0.0 {
            let mut roll = rng.gen_range(0.0..total);
            let mut chosen = remaining.len() - 1;
            for (i, node) in remaining.iter().enumerate() {
                let weight = node.weight();
                if roll < weight {
                    chosen = i;
                    break;
                }
                roll -= weight;
            }
            chosen
        } else {
            // All remaining weights are zero; fall back to uniform.
            rng.gen_range(0..remaining.len())
        };
        selected.push(remaining.swap_remove(pick));
    }

    ensure_diversity(selected, pool)
}

/// Swap lightweight picks for unselected full nodes until at least 60% of
/// the set is full-kind, or the pool has no full nodes left to give.
fn ensure_diversity(mut selected: Vec<AttestorNode>, pool: &[AttestorNode]) -> Vec<AttestorNode> {
    let required = min_full(selected.len());
    let mut full_count = selected
        .iter()
        .filter(|n| n.kind == NodeKind::Full)
        .count();
    if full_count >= required {
        return selected;
    }

    let mut spares: Vec<AttestorNode> = pool
        .iter()
        .filter(|candidate| {
            candidate.kind == NodeKind::Full
                && !selected.iter().any(|s| s.node_id == candidate.node_id)
        })
        .cloned()
        .collect();
    // Ascending by weight so pop() hands out the strongest spare first.
    spares.sort_by(|a, b| {
        a.weight()
            .partial_cmp(&b.weight())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    while full_count < required {
        let Some(spare) = spares.pop() else { break };
        // Replace the weakest lightweight member.
        let victim = selected
            .iter()
            .enumerate()
            .filter(|(_, n)| n.kind == NodeKind::Lightweight)
            .min_by(|(_, a), (_, b)| {
                a.weight()
                    .partial_cmp(&b.weight())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i);
        match victim {
            Some(i) => {
                selected[i] = spare;
                full_count += 1;
            }
            None => break,
        }
    }
    selected
}
