//! The write-once anchor commit and amber-band sampling policy.

use crate::anchor::trace::{LiteTrace, TraceBuffer};
use crate::chain::{ChainPayload, LedgerEntry, SharedChain};
use crate::core::{now, Result, Timestamp};
use crate::risk::RiskSample;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

/// The single immutable record marking the moment risk crossed the policy
/// threshold for a session. Created at most once per session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Anchor {
    /// Unique anchor identifier.
    pub anchor_id: Uuid,
    /// When the threshold crossing was observed.
    pub timestamp: Timestamp,
    /// The sample value that triggered the anchor.
    pub initial_risk: f64,
    /// Session the anchor belongs to.
    pub session_id: Uuid,
    /// Policy version in force when the anchor was committed.
    pub policy_version: String,
}

/// Per-session controller state. `Anchored` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnchorState {
    /// Watching the stream; no anchor yet.
    Armed,
    /// Anchor committed; all further observations are no-ops.
    Anchored,
}

/// The anchor, together with the ledger entry that recorded it.
#[derive(Clone, Debug)]
pub struct AnchorCommit {
    pub anchor: Anchor,
    pub entry: LedgerEntry,
}

struct Inner {
    state: AnchorState,
    traces: TraceBuffer,
}

/// Enforces exactly-once anchoring for one session.
///
/// State and trace buffer sit behind one mutex, making `observe` a
/// single-writer check-then-act: two concurrent threshold crossings cannot
/// both see `Armed`. The chain append happens inside the same critical
/// section, so the state flip and the ledger write land together.
pub struct AnchorController {
    session_id: Uuid,
    policy_version: String,
    threshold: f64,
    amber_floor: f64,
    chain: SharedChain,
    inner: tokio::sync::Mutex<Inner>,
}

impl AnchorController {
    /// Create a controller in the `Armed` state.
    ///
    /// `threshold` comes from the domain policy; `amber_ratio` (typically
    /// 0.8) sets the lower edge of the amber band at `ratio * threshold`.
    pub fn new(
        session_id: Uuid,
        policy_version: &str,
        threshold: f64,
        amber_ratio: f64,
        trace_capacity: usize,
        chain: SharedChain,
    ) -> Self {
        Self {
            session_id,
            policy_version: policy_version.to_string(),
            threshold,
            amber_floor: amber_ratio * threshold,
            chain,
            inner: tokio::sync::Mutex::new(Inner {
                state: AnchorState::Armed,
                traces: TraceBuffer::new(trace_capacity),
            }),
        }
    }

    /// Feed one sample through the anchor policy.
    ///
    /// Returns the anchor commit iff this call won the `Armed -> Anchored`
    /// transition. After anchoring, every call returns `Ok(None)`
    /// regardless of the sample value; a concurrent caller that lost the
    /// race sees "already anchored", not an error.
    pub async fn observe(&self, sample: &RiskSample) -> Result<Option<AnchorCommit>> {
        let mut inner = self.inner.lock().await;

        if inner.state == AnchorState::Anchored {
            return Ok(None);
        }

        if sample.value >= self.threshold {
            let anchor = Anchor {
                anchor_id: Uuid::new_v4(),
                timestamp: now(),
                initial_risk: sample.value,
                session_id: self.session_id,
                policy_version: self.policy_version.clone(),
            };

            let entry = {
                let mut chain = self.chain.lock().await;
                chain.append(ChainPayload::Anchor(anchor.clone()))?
            };

            inner.state = AnchorState::Anchored;
            info!(
                session = %self.session_id,
                risk = sample.value,
                entry = %entry.entry_hash.short(),
                "anchor committed"
            );
            return Ok(Some(AnchorCommit { anchor, entry }));
        }

        if sample.value >= self.amber_floor {
            debug!(
                session = %self.session_id,
                risk = sample.value,
                "amber-band sample traced"
            );
            inner.traces.push(LiteTrace::from_sample(sample));
        }

        Ok(None)
    }

    /// Current state.
    pub async fn state(&self) -> AnchorState {
        self.inner.lock().await.state
    }

    /// Take the buffered lite traces, oldest first.
    pub async fn drain_traces(&self) -> Vec<LiteTrace> {
        self.inner.lock().await.traces.drain()
    }

    /// The resolved anchor threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}
