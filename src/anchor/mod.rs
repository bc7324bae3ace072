//! Anchor control: write-once threshold commits and amber-band traces.

pub mod controller;
pub mod trace;

pub use controller::{Anchor, AnchorCommit, AnchorController, AnchorState};
pub use trace::{LiteTrace, TraceBuffer};
