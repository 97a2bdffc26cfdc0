//! CLI module for argument parsing.
//!
//! Rendering lives in [`crate::report`]; this module only describes the
//! command surface.

pub mod args;
