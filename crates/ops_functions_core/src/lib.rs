//! Shared domain primitives for the ops Lambda functions.
//!
//! This crate owns deterministic behavior only: configuration contracts, the
//! raw-mail message model and relay rewrite, and storage key construction.
//! It intentionally excludes AWS SDK and Lambda runtime concerns.
//! See `crates/ops_functions_core/README.md` for ownership boundaries.

pub mod contract;
pub mod message;
pub mod storage_paths;
