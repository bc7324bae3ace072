//! Lite traces: lightweight, non-authoritative records of near-threshold
//! risk.

use crate::core::{Hash256, Timestamp};
use crate::risk::RiskSample;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// How many features a trace keeps.
const TOP_FEATURE_COUNT: usize = 3;

/// A sampled snapshot of a sub-threshold, amber-band risk event.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LiteTrace {
    /// When the underlying sample was evaluated.
    pub timestamp: Timestamp,
    /// Hash of the sample's feature map.
    pub scenario_signature: Hash256,
    /// Highest-magnitude features at the time of the sample.
    pub top_features: Vec<(String, f64)>,
    /// The risk value that landed in the amber band.
    pub risk_snapshot: f64,
}

impl LiteTrace {
    /// Build a trace from an amber-band sample.
    pub fn from_sample(sample: &RiskSample) -> Self {
        Self {
            timestamp: sample.timestamp,
            scenario_signature: sample.feature_signature(),
            top_features: sample.top_features(TOP_FEATURE_COUNT),
            risk_snapshot: sample.value,
        }
    }
}

/// Bounded trace buffer; oldest traces are evicted first.
#[derive(Debug)]
pub struct TraceBuffer {
    traces: VecDeque<LiteTrace>,
    capacity: usize,
}

impl TraceBuffer {
    /// Create a buffer holding at most `capacity` traces.
    pub fn new(capacity: usize) -> Self {
        Self {
            traces: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Push a trace, evicting the oldest if full.
    pub fn push(&mut self, trace: LiteTrace) {
        if self.traces.len() == self.capacity {
            self.traces.pop_front();
        }
        self.traces.push_back(trace);
    }

    /// Number of buffered traces.
    pub fn len(&self) -> usize {
        self.traces.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    /// Take all buffered traces, oldest first, leaving the buffer empty.
    pub fn drain(&mut self) -> Vec<LiteTrace> {
        self.traces.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::now;
    use std::collections::BTreeMap;

    fn sample(value: f64) -> RiskSample {
        let mut features = BTreeMap::new();
        features.insert("a".to_string(), 0.9);
        features.insert("b".to_string(), 0.1);
        RiskSample {
            timestamp: now(),
            value,
            sequence_index: 0,
            features,
        }
    }

    #[test]
    fn test_trace_captures_snapshot() {
        let s = sample(0.45);
        let trace = LiteTrace::from_sample(&s);
        assert_eq!(trace.risk_snapshot, 0.45);
        assert_eq!(trace.scenario_signature, s.feature_signature());
        assert_eq!(trace.top_features[0].0, "a");
    }

    #[test]
    fn test_buffer_evicts_oldest() {
        let mut buffer = TraceBuffer::new(2);
        for value in [0.1, 0.2, 0.3] {
            buffer.push(LiteTrace::from_sample(&sample(value)));
        }
        assert_eq!(buffer.len(), 2);
        let drained = buffer.drain();
        assert_eq!(drained[0].risk_snapshot, 0.2);
        assert_eq!(drained[1].risk_snapshot, 0.3);
        assert!(buffer.is_empty());
    }
}
