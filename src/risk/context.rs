//! Decision context: the evolving feature map a session is scored against.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A per-tick update to the context feature map.
///
/// Keys are inserted or overwritten; a NaN value removes the key, so
/// deletions travel through the same map as updates.
pub type ContextDelta = BTreeMap<String, f64>;

/// Opaque decision context supplied by the action executor.
///
/// The core never interprets feature keys; scoring functions from the
/// domain policy do. A sorted map keeps the canonical encoding stable.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecisionContext {
    /// Policy domain this decision belongs to (threshold lookup key).
    pub domain: String,
    /// Feature name -> value.
    pub features: BTreeMap<String, f64>,
}

impl DecisionContext {
    /// Create an empty context for a domain.
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            features: BTreeMap::new(),
        }
    }

    /// Set a feature value.
    pub fn with_feature(mut self, key: &str, value: f64) -> Self {
        self.features.insert(key.to_string(), value);
        self
    }

    /// Read a feature value.
    pub fn feature(&self, key: &str) -> Option<f64> {
        self.features.get(key).copied()
    }

    /// Merge a tick's delta into the context.
    pub fn apply_delta(&mut self, delta: &ContextDelta) {
        for (key, value) in delta {
            if value.is_nan() {
                self.features.remove(key);
            } else {
                self.features.insert(key.clone(), *value);
            }
        }
    }
}
