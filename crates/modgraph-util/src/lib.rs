//! Shared utilities for modgraph.
//!
//! Cross-cutting concerns used by every other crate in the workspace:
//! the unified error type, file hashing, atomic file replacement and
//! terminal status output.

pub mod errors;
pub mod fs;
pub mod hash;
pub mod progress;
