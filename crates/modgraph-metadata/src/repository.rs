//! Module repository layout: where documents live relative to each other.

use std::path::PathBuf;

use modgraph_core::module::{ModuleId, ModuleVersionId};

/// File extension of module metadata documents.
pub const MODULE_EXTENSION: &str = "module";

/// Standard layout directory for a module version.
///
/// `org.example:lib:1.0` becomes `org/example/lib/1.0`.
pub fn coordinate_path(id: &ModuleVersionId) -> PathBuf {
    module_dir(&id.module()).join(&id.version)
}

/// Directory holding every version of a module.
pub fn module_dir(module: &ModuleId) -> PathBuf {
    let mut path: PathBuf = module.group.split('.').collect();
    path.push(&module.name);
    path
}

/// File name of the document for a module version: `lib-1.0.module`.
pub fn module_file_name(id: &ModuleVersionId) -> String {
    format!("{}-{}.{MODULE_EXTENSION}", id.name, id.version)
}

/// Path of a module document relative to the repository root.
pub fn module_path(id: &ModuleVersionId) -> PathBuf {
    coordinate_path(id).join(module_file_name(id))
}

/// Relative URL from one module document to another's.
///
/// Assumes both modules share a group directory, which holds for a
/// component and the sub-components it publishes.
pub fn relative_url(to: &ModuleVersionId) -> String {
    format!("../../{}/{}/{}", to.name, to.version, module_file_name(to))
}
