//! Risk evaluation: the dynamic stream of scored decision samples.

pub mod context;
pub mod evaluator;
pub mod sample;

pub use context::{ContextDelta, DecisionContext};
pub use evaluator::{RiskEvaluator, RiskPolicy, ScoreFn, EPSILON};
pub use sample::RiskSample;
