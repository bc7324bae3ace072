//! Distributed attestation: weighted attestor selection and quorum rounds.

pub mod network;
pub mod node;
pub mod round;
pub mod selection;

pub use network::{AttestationNetwork, AttestorTransport};
pub use node::{AttestorNode, AttestorRegistry, NodeKind, MIN_STAKE};
pub use round::{AttestationRound, Confirmation, SelectedAttestor};
pub use selection::{min_full, RoundCriticality};
