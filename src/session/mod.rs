//! Session orchestration and sealed log hand-off.

pub mod config;
pub mod orchestrator;
pub mod sealed;

pub use config::PipelineConfig;
pub use orchestrator::{DecisionOrchestrator, TickOutcome};
pub use sealed::{SealedLog, SessionOutcome};
