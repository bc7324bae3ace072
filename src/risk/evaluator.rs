//! Risk evaluation over the dynamic stream.
//!
//! The evaluator owns only the combination rule `impact * vulnerability *
//! probability` and the clamp; the three factors are caller-supplied domain
//! policy.

use crate::core::now;
use crate::risk::context::DecisionContext;
use crate::risk::sample::RiskSample;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Clamp bound keeping risk strictly inside (0, 1) so threshold
/// comparisons never hit a degenerate endpoint.
pub const EPSILON: f64 = 1e-6;

/// A pluggable scoring function over the decision context.
pub type ScoreFn = Arc<dyn Fn(&DecisionContext) -> f64 + Send + Sync>;

/// Domain policy supplied by the caller: scoring factors, per-domain
/// thresholds, and the policy version stamped onto anchors.
#[derive(Clone)]
pub struct RiskPolicy {
    /// Impact factor in `[0, 1]`.
    pub impact: ScoreFn,
    /// Vulnerability factor in `[0, 1]`.
    pub vulnerability: ScoreFn,
    /// Probability factor in `[0, 1]`.
    pub probability: ScoreFn,
    /// Anchor threshold per domain.
    pub threshold_by_domain: HashMap<String, f64>,
    /// Threshold for domains without an explicit entry.
    pub default_threshold: f64,
    /// Version identifier recorded on every anchor.
    pub policy_version: String,
}

impl RiskPolicy {
    /// Build a policy from the three scoring factors.
    pub fn new(
        policy_version: &str,
        impact: ScoreFn,
        vulnerability: ScoreFn,
        probability: ScoreFn,
    ) -> Self {
        Self {
            impact,
            vulnerability,
            probability,
            threshold_by_domain: HashMap::new(),
            default_threshold: 0.6,
            policy_version: policy_version.to_string(),
        }
    }

    /// Set the threshold for one domain.
    pub fn with_threshold(mut self, domain: &str, threshold: f64) -> Self {
        self.threshold_by_domain
            .insert(domain.to_string(), threshold);
        self
    }

    /// Set the fallback threshold.
    pub fn with_default_threshold(mut self, threshold: f64) -> Self {
        self.default_threshold = threshold;
        self
    }

    /// Resolve the anchor threshold for a domain. Pure lookup.
    pub fn threshold_for(&self, domain: &str) -> f64 {
        self.threshold_by_domain
            .get(domain)
            .copied()
            .unwrap_or(self.default_threshold)
    }
}

/// Clamp a factor output to `[0, 1]`; a non-finite score counts as full
/// contribution rather than silently vanishing from the product.
fn clamp_factor(raw: f64) -> f64 {
    if raw.is_finite() {
        raw.clamp(0.0, 1.0)
    } else {
        1.0
    }
}

/// Session-scoped evaluator producing the monotonically-indexed sample
/// stream.
pub struct RiskEvaluator {
    policy: RiskPolicy,
    capacity: usize,
    buffer: VecDeque<RiskSample>,
    next_index: u64,
    peak: f64,
}

impl RiskEvaluator {
    /// Create an evaluator with a bounded sample buffer.
    pub fn new(policy: RiskPolicy, capacity: usize) -> Self {
        Self {
            policy,
            capacity: capacity.max(1),
            buffer: VecDeque::new(),
            next_index: 0,
            peak: 0.0,
        }
    }

    /// Score the context and append the sample to the stream.
    ///
    /// `value = clamp(impact * vulnerability * probability, ε, 1-ε)`.
    /// No side effects beyond the buffer append.
    pub fn evaluate(&mut self, context: &DecisionContext) -> RiskSample {
        let impact = clamp_factor((self.policy.impact)(context));
        let vulnerability = clamp_factor((self.policy.vulnerability)(context));
        let probability = clamp_factor((self.policy.probability)(context));

        let value = (impact * vulnerability * probability).clamp(EPSILON, 1.0 - EPSILON);

        let sample = RiskSample {
            timestamp: now(),
            value,
            sequence_index: self.next_index,
            features: context.features.clone(),
        };
        self.next_index += 1;
        if value > self.peak {
            self.peak = value;
        }

        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(sample.clone());

        sample
    }

    /// Read-only view of the buffered stream (oldest first).
    pub fn samples(&self) -> impl Iterator<Item = &RiskSample> {
        self.buffer.iter()
    }

    /// Number of currently buffered samples.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Total samples emitted over the session, including evicted ones.
    pub fn emitted(&self) -> u64 {
        self.next_index
    }

    /// Highest risk value seen across the whole session, surviving
    /// buffer eviction.
    pub fn peak(&self) -> f64 {
        self.peak
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(value: f64) -> ScoreFn {
        Arc::new(move |_ctx: &DecisionContext| value)
    }

    fn policy(i: f64, v: f64, p: f64) -> RiskPolicy {
        RiskPolicy::new("test-v1", constant(i), constant(v), constant(p))
    }

    #[test]
    fn test_combination_rule() {
        let mut eval = RiskEvaluator::new(policy(0.5, 0.8, 0.5), 16);
        let sample = eval.evaluate(&DecisionContext::new("d"));
        assert!((sample.value - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_value_never_reaches_endpoints() {
        let ctx = DecisionContext::new("d");

        let mut zero = RiskEvaluator::new(policy(0.0, 0.0, 0.0), 16);
        assert_eq!(zero.evaluate(&ctx).value, EPSILON);

        let mut one = RiskEvaluator::new(policy(1.0, 1.0, 1.0), 16);
        assert_eq!(one.evaluate(&ctx).value, 1.0 - EPSILON);
    }

    #[test]
    fn test_non_finite_factor_counts_as_full() {
        let mut eval = RiskEvaluator::new(policy(f64::NAN, 1.0, 1.0), 16);
        assert_eq!(eval.evaluate(&DecisionContext::new("d")).value, 1.0 - EPSILON);
    }

    #[test]
    fn test_factor_outputs_clamped() {
        let mut eval = RiskEvaluator::new(policy(5.0, 1.0, -3.0), 16);
        // 5.0 clamps to 1.0, -3.0 clamps to 0.0
        assert_eq!(eval.evaluate(&DecisionContext::new("d")).value, EPSILON);
    }

    #[test]
    fn test_sequence_index_monotonic() {
        let mut eval = RiskEvaluator::new(policy(0.5, 0.5, 0.5), 16);
        let ctx = DecisionContext::new("d");
        for expected in 0..5 {
            assert_eq!(eval.evaluate(&ctx).sequence_index, expected);
        }
    }

    #[test]
    fn test_buffer_evicts_oldest() {
        let mut eval = RiskEvaluator::new(policy(0.5, 0.5, 0.5), 3);
        let ctx = DecisionContext::new("d");
        for _ in 0..5 {
            eval.evaluate(&ctx);
        }
        assert_eq!(eval.buffered(), 3);
        assert_eq!(eval.emitted(), 5);
        let first = eval.samples().next().unwrap();
        assert_eq!(first.sequence_index, 2);
    }

    #[test]
    fn test_peak_survives_eviction() {
        let values = [0.9, 0.1, 0.1, 0.1, 0.1];
        let mut eval = RiskEvaluator::new(policy(1.0, 1.0, 1.0), 2);
        for v in values {
            let p = RiskPolicy::new("t", constant(v), constant(1.0), constant(1.0));
            eval.policy = p;
            eval.evaluate(&DecisionContext::new("d"));
        }
        assert!((eval.peak() - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_evaluation_repeatable() {
        let ctx = DecisionContext::new("d").with_feature("x", 0.4);
        let scorer: ScoreFn = Arc::new(|c: &DecisionContext| c.feature("x").unwrap_or(0.0));
        let p = RiskPolicy::new("t", scorer.clone(), constant(1.0), constant(1.0));
        let mut eval = RiskEvaluator::new(p, 16);

        let a = eval.evaluate(&ctx);
        let b = eval.evaluate(&ctx);
        assert_eq!(a.value, b.value);
    }

    #[test]
    fn test_threshold_lookup_with_fallback() {
        let p = policy(0.5, 0.5, 0.5)
            .with_threshold("medical", 0.4)
            .with_default_threshold(0.7);
        assert_eq!(p.threshold_for("medical"), 0.4);
        assert_eq!(p.threshold_for("unknown"), 0.7);
    }
}
