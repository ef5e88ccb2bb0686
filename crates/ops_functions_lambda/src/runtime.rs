//! Re-exported core primitives, so handler and adapter code imports domain
//! types through one module boundary.

pub use ops_functions_core::{contract, message, storage_paths};
