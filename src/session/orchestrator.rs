//! Session orchestration: binds one decision's evaluator, anchor
//! controller, and attestation rounds over the shared ledger.
//!
//! The orchestrator never decides whether the external action proceeds.
//! It guarantees that if an anchor was required it was written and its
//! attestation round resolved before `seal` returns. Sub-threshold ticks
//! never wait on attestation; only the tick that commits the anchor does.

use crate::anchor::{Anchor, AnchorController};
use crate::attest::{AttestationNetwork, AttestationRound, AttestorNode, AttestorTransport};
use crate::chain::{ChainPayload, HashChain, SharedChain};
use crate::core::{Error, Hash256, Result};
use crate::risk::{ContextDelta, DecisionContext, RiskEvaluator, RiskPolicy, RiskSample};
use crate::session::config::PipelineConfig;
use crate::session::sealed::{SealedLog, SessionOutcome};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What one tick produced.
#[derive(Clone, Debug)]
pub struct TickOutcome {
    /// The sample scored on this tick.
    pub sample: RiskSample,
    /// The anchor, iff this tick won the threshold crossing.
    pub anchor: Option<Anchor>,
    /// The attestation round run for that anchor.
    pub attestation: Option<AttestationRound>,
}

struct Session {
    context: DecisionContext,
    evaluator: RiskEvaluator,
    controller: AnchorController,
    anchor: Option<Anchor>,
    anchor_attested: Option<bool>,
    /// Set under the session lock by `seal`/`abort`; a tick that resolved
    /// its handle before the session left the map still sees it.
    sealed: bool,
}

/// Coordinates all decision sessions over one shared chain and one
/// attestation network.
pub struct DecisionOrchestrator {
    chain: SharedChain,
    network: AttestationNetwork,
    policy: RiskPolicy,
    config: PipelineConfig,
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<Session>>>>,
}

impl DecisionOrchestrator {
    /// Build an orchestrator with an entropy-seeded attestation network.
    pub fn new(
        policy: RiskPolicy,
        config: PipelineConfig,
        transport: Arc<dyn AttestorTransport>,
    ) -> Self {
        let network = AttestationNetwork::with_entropy(transport, config.attestation_deadline);
        Self::with_network(policy, config, network)
    }

    /// Build an orchestrator around an existing network (e.g. one with a
    /// seeded RNG).
    pub fn with_network(
        policy: RiskPolicy,
        config: PipelineConfig,
        network: AttestationNetwork,
    ) -> Self {
        Self {
            chain: HashChain::shared(),
            network,
            policy,
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// The attestation network, for attestor registration.
    pub fn network(&self) -> &AttestationNetwork {
        &self.network
    }

    /// Register an attestor node.
    pub async fn register_attestor(&self, node: AttestorNode) -> Result<()> {
        self.network.register(node).await
    }

    /// Begin a session over an initial context. The anchor threshold is
    /// resolved from the context's domain at this point and fixed for the
    /// session's lifetime.
    pub async fn start_session(&self, context: DecisionContext) -> Uuid {
        let session_id = Uuid::new_v4();
        let threshold = self.policy.threshold_for(&context.domain);
        let controller = AnchorController::new(
            session_id,
            &self.policy.policy_version,
            threshold,
            self.config.amber_ratio,
            self.config.trace_capacity,
            self.chain.clone(),
        );
        let evaluator = RiskEvaluator::new(self.policy.clone(), self.config.sample_capacity);

        let session = Session {
            context,
            evaluator,
            controller,
            anchor: None,
            anchor_attested: None,
            sealed: false,
        };
        self.sessions
            .write()
            .await
            .insert(session_id, Arc::new(Mutex::new(session)));
        info!(session = %session_id, threshold, "session started");
        session_id
    }

    /// Feed one context delta through the pipeline.
    ///
    /// The per-session lock serializes ticks, so the controller observes
    /// samples in sequence order. If this tick commits the anchor, the
    /// attestation round runs to resolution before returning; otherwise
    /// the call does not touch the network at all.
    pub async fn tick(&self, session_id: Uuid, delta: &ContextDelta) -> Result<TickOutcome> {
        let handle = self.session_handle(session_id).await?;
        self.tick_session(session_id, handle, delta).await
    }

    async fn tick_session(
        &self,
        session_id: Uuid,
        handle: Arc<Mutex<Session>>,
        delta: &ContextDelta,
    ) -> Result<TickOutcome> {
        let mut session = handle.lock().await;
        // Re-check after acquiring the lock: a seal racing this tick may
        // have finalized the session between the map lookup and here.
        if session.sealed {
            return Err(Error::SessionSealed(session_id.to_string()));
        }

        session.context.apply_delta(delta);
        let Session {
            context, evaluator, ..
        } = &mut *session;
        let sample = evaluator.evaluate(context);

        {
            let mut chain = self.chain.lock().await;
            chain.append(ChainPayload::Sample {
                session_id,
                sample: sample.clone(),
            })?;
        }

        let commit = session.controller.observe(&sample).await?;
        let mut outcome = TickOutcome {
            sample,
            anchor: None,
            attestation: None,
        };

        if let Some(commit) = commit {
            session.anchor = Some(commit.anchor.clone());
            let selected = self.network.select(self.config.anchor_criticality).await;
            let round = self
                .network
                .submit(&commit.entry.entry_hash, &selected)
                .await;
            if !round.consensus {
                warn!(
                    session = %session_id,
                    "anchor attestation inconclusive"
                );
            }
            session.anchor_attested = Some(round.consensus);
            outcome.anchor = Some(commit.anchor);
            outcome.attestation = Some(round);
        } else {
            debug!(
                session = %session_id,
                risk = outcome.sample.value,
                "tick recorded"
            );
        }

        Ok(outcome)
    }

    /// Finalize a session: write its traces and seal entry, and hand back
    /// the internally-consistent sealed log.
    pub async fn seal(&self, session_id: Uuid) -> Result<SealedLog> {
        let handle = self
            .sessions
            .write()
            .await
            .remove(&session_id)
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;
        let mut session = handle.lock().await;
        session.sealed = true;

        let lite_traces = session.controller.drain_traces().await;

        let (entries, cumulative_hash) = {
            let mut chain = self.chain.lock().await;
            for trace in &lite_traces {
                chain.append(ChainPayload::Trace {
                    session_id,
                    trace: trace.clone(),
                })?;
            }
            let body = chain.entries_for_session(session_id);
            let cumulative_hash = SealedLog::cumulative_hash_over(&body);
            chain.append(ChainPayload::Seal {
                session_id,
                cumulative_hash: cumulative_hash.clone(),
            })?;
            (chain.entries_for_session(session_id), cumulative_hash)
        };

        let outcome = match (&session.anchor, session.anchor_attested) {
            (None, _) => SessionOutcome::NotAnchored,
            (Some(_), Some(true)) => SessionOutcome::AnchoredAttested,
            (Some(_), _) => SessionOutcome::AnchoredInconclusive,
        };

        info!(
            session = %session_id,
            entries = entries.len(),
            ?outcome,
            "session sealed"
        );

        Ok(SealedLog {
            session_id,
            anchor: session.anchor.clone(),
            entries,
            lite_traces,
            cumulative_hash,
            outcome,
        })
    }

    /// Abort a session before sealing. Nothing further is written; any
    /// partial attestation state dies with the session (rounds only live
    /// inside `tick`).
    pub async fn abort(&self, session_id: Uuid) -> Result<()> {
        let handle = self
            .sessions
            .write()
            .await
            .remove(&session_id)
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;
        handle.lock().await.sealed = true;
        info!(session = %session_id, "session aborted");
        Ok(())
    }

    /// Verify the full chain. On failure the chain is latched halted —
    /// surfaced immediately, writes stop, never auto-repaired.
    pub async fn verify_chain(&self) -> bool {
        let mut chain = self.chain.lock().await;
        let ok = chain.verify();
        if !ok {
            chain.halt();
        }
        ok
    }

    /// O(1) receipt check for a ledger entry hash.
    pub async fn has_receipt(&self, entry_hash: &Hash256) -> bool {
        self.chain.lock().await.receipt(entry_hash)
    }

    /// Export the full chain as JSON for external archival.
    pub async fn export_chain(&self) -> Result<String> {
        self.chain.lock().await.to_json()
    }

    async fn session_handle(&self, session_id: Uuid) -> Result<Arc<Mutex<Session>>> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .cloned()
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))
    }
}
