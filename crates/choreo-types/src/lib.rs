//! Shared domain types for choreo.
//!
//! Incident records, workflow and step state, action results, the team
//! roster, playbook results, configuration, and the collaborator payloads
//! and error types used across the engine.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod action;
pub mod collaborator;
pub mod config;
pub mod error;
pub mod incident;
pub mod playbook;
pub mod team;
pub mod workflow;
