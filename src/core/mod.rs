//! Core utilities and common types.

pub mod error;
pub mod logging;
pub mod types;

pub use error::{Error, Result};
pub use logging::init_logging;
pub use types::*;
