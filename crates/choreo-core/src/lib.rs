//! Orchestration engine for incident response.
//!
//! This crate defines the collaborator ports (traits) that embedders
//! implement and the engine that drives them: dynamic workflows planned per
//! incident, and the fixed seven-stage playbook. It depends only on
//! `choreo-types`, never on `choreo-infra` or any I/O crate.

pub mod collaborator;
pub mod error;
pub mod playbook;
pub mod workflow;

#[cfg(test)]
mod testing;
