//! Core data types for modgraph.
//!
//! This crate defines the variant-aware module model shared by the resolver
//! and the metadata serializer: typed attributes, capabilities, the version
//! constraint grammar, module coordinates and exclude rules, declared
//! dependencies, published variants and the module data a metadata provider
//! hands to the resolver. It also parses the project manifest and the global
//! configuration.
//!
//! This crate is intentionally free of async code and I/O beyond reading
//! configuration files.

pub mod attribute;
pub mod capability;
pub mod config;
pub mod constraint;
pub mod dependency;
pub mod manifest;
pub mod module;
pub mod variant;
