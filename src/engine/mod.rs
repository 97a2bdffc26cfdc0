//! Execution engine.
//!
//! Provides the profile run orchestrator, per-policy sandboxes, progress
//! reporting and result accumulation.

pub mod orchestrator;
pub mod progress;
pub mod result;
pub mod sandbox;
