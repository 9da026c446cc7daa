pub mod ops_publish;
pub mod ops_resolve;
pub mod repository;
pub mod strategy;

use std::path::{Path, PathBuf};

use modgraph_core::manifest::Manifest;
use modgraph_util::errors::ModgraphError;

/// Load the manifest at `manifest_path` along with its project directory.
pub fn load_project(manifest_path: &Path) -> miette::Result<(Manifest, PathBuf)> {
    let manifest = Manifest::from_path(manifest_path)?;
    let root = match manifest_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((manifest, root))
}

/// The module repository of a project, relative paths taken from the
/// project directory.
pub fn repository_root(manifest: &Manifest, project_root: &Path) -> miette::Result<PathBuf> {
    manifest
        .repository
        .as_ref()
        .map(|repo| project_root.join(repo))
        .ok_or_else(|| {
            ModgraphError::Manifest {
                message: "No 'repository' configured in Modgraph.toml".to_string(),
            }
            .into()
        })
}
