//! Variant-aware dependency resolution.
//!
//! [`resolver::Resolver`] drives resolution to a fixed point over a
//! [`provider::MetadataProvider`]: each pass selects variants by attribute
//! matching ([`selector`]), applies [`rules`], resolves version conflicts
//! ([`conflict`]) and checks capabilities, until the graph is stable.

pub mod cache;
pub mod cancel;
pub mod conflict;
pub mod graph;
pub mod mapping;
pub mod provider;
pub mod resolver;
pub mod rules;
pub mod schema;
pub mod selector;
pub mod version;

