//! Infrastructure layer for choreo.
//!
//! Contains the configuration loader, simulated implementations of the
//! collaborator ports defined in `choreo-core`, and the canned incident
//! scenarios used by the CLI.

pub mod config;
pub mod scenarios;
pub mod simulated;
