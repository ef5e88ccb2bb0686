//! AWS-oriented adapters and handlers for the ops Lambda functions.
//!
//! This crate owns runtime integration details (Lambda entrypoints, SDK
//! client adapters) for the mail relay and instance stop functions, and
//! exposes a single runtime module boundary for the configuration, message,
//! and storage-path primitives.
//! See `crates/ops_functions_lambda/README.md` for ownership boundaries.

pub mod adapters;
pub mod handlers;
pub mod runtime;
