//! Module metadata documents.
//!
//! A module document (`.module`) describes every variant of a published
//! component: its attributes, dependencies, dependency constraints, files
//! and capabilities. [`writer::ModuleMetadataWriter`] produces documents from
//! a [`component::Publication`]; [`reader`] parses them back into the
//! [`modgraph_core::variant::ModuleData`] the resolver consumes.

pub mod component;
pub mod document;
pub mod reader;
pub mod repository;
pub mod services;
pub mod writer;
