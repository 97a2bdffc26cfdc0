//! Mock implementations for testing without a real site.
//!
//! Provides policies with scripted outcomes and observers that record what
//! the orchestrator did.

pub mod policies;
pub mod recorders;

pub use policies::*;
pub use recorders::*;
