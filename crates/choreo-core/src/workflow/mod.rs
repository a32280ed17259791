//! Dynamic incident workflows.
//!
//! - `builder`: incident -> ordered step plan (recommended or fallback)
//! - `dispatcher` / `handlers`: per-step execution and failure isolation
//! - `context`: per-run state and result propagation between steps
//! - `selector`: responder selection from a roster
//! - `registry`: in-memory workflow snapshots with eviction
//! - `choreographer`: the facade that drives a run end to end

pub mod builder;
pub mod choreographer;
pub mod context;
pub mod dispatcher;
pub mod handlers;
pub mod registry;
pub mod selector;
