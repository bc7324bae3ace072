//! Risk samples: one scored point in a session's dynamic stream.

use crate::core::{Hash256, Timestamp};
use crate::crypto::sha3_256;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single scored observation of the decision context.
///
/// Immutable once emitted; ordered within a session by `sequence_index`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RiskSample {
    /// When the sample was evaluated.
    pub timestamp: Timestamp,
    /// Combined risk value, always within `[EPSILON, 1 - EPSILON]`.
    pub value: f64,
    /// Position in the session's stream (monotonic, starts at 0).
    pub sequence_index: u64,
    /// Point-in-time copy of the context features.
    pub features: BTreeMap<String, f64>,
}

impl RiskSample {
    /// Hash of the canonical feature map, identifying the scenario this
    /// sample was drawn from.
    pub fn feature_signature(&self) -> Hash256 {
        let encoded = serde_json::to_vec(&self.features).unwrap_or_default();
        sha3_256(&encoded)
    }

    /// The `count` features with the largest absolute values.
    pub fn top_features(&self, count: usize) -> Vec<(String, f64)> {
        let mut ranked: Vec<(String, f64)> = self
            .features
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        ranked.sort_by(|a, b| {
            b.1.abs()
                .partial_cmp(&a.1.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(count);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::now;

    fn sample_with(features: &[(&str, f64)]) -> RiskSample {
        RiskSample {
            timestamp: now(),
            value: 0.5,
            sequence_index: 0,
            features: features
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
        }
    }

    #[test]
    fn test_signature_depends_on_features_only() {
        let a = sample_with(&[("x", 1.0), ("y", 2.0)]);
        let mut b = a.clone();
        b.value = 0.9;
        b.sequence_index = 7;
        assert_eq!(a.feature_signature(), b.feature_signature());

        let c = sample_with(&[("x", 1.0), ("y", 2.5)]);
        assert_ne!(a.feature_signature(), c.feature_signature());
    }

    #[test]
    fn test_top_features_ranked_by_magnitude() {
        let sample = sample_with(&[("a", 0.1), ("b", -0.9), ("c", 0.5), ("d", 0.2)]);
        let top = sample.top_features(2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].0, "b");
        assert_eq!(top[1].0, "c");
    }
}
