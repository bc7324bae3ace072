//! Pipeline configuration.

use crate::attest::RoundCriticality;
use std::time::Duration;

/// Tunables for one orchestrator instance. Thresholds themselves live in
/// the domain policy, not here.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Per-session risk sample buffer capacity.
    pub sample_capacity: usize,
    /// Per-session lite trace buffer capacity.
    pub trace_capacity: usize,
    /// Lower edge of the amber band as a fraction of the threshold.
    pub amber_ratio: f64,
    /// Deadline for each attestation request.
    pub attestation_deadline: Duration,
    /// Selected-set sizing for anchor-triggered rounds.
    pub anchor_criticality: RoundCriticality,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_capacity: 256,
            trace_capacity: 64,
            amber_ratio: 0.8,
            attestation_deadline: Duration::from_secs(2),
            anchor_criticality: RoundCriticality::Anchor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.amber_ratio, 0.8);
        assert_eq!(config.anchor_criticality, RoundCriticality::Anchor);
    }
}
