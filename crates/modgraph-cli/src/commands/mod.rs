//! Command dispatch and handler modules.

mod publish;
mod resolve;

use std::path::PathBuf;

use miette::Result;
use modgraph_util::errors::ModgraphError;

use crate::cli::{Cli, Command};

/// Route a parsed CLI invocation to the appropriate command handler.
pub async fn dispatch(cli: Cli) -> Result<()> {
    let manifest_path = manifest_path(cli.manifest_path)?;
    tracing::debug!("Using manifest {}", manifest_path.display());
    match cli.command {
        Command::Resolve {
            depth,
            why,
            conflicts,
        } => resolve::exec(&manifest_path, depth, why, conflicts).await,
        Command::Publish {
            output,
            resolved_versions,
        } => publish::exec(&manifest_path, output, resolved_versions).await,
    }
}

fn manifest_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(ModgraphError::Manifest {
                message: format!("{} does not exist", path.display()),
            }
            .into());
        }
        return Ok(path);
    }

    let cwd = std::env::current_dir().map_err(ModgraphError::Io)?;
    modgraph_util::fs::find_ancestor_with(&cwd, "Modgraph.toml")
        .map(|dir| dir.join("Modgraph.toml"))
        .ok_or_else(|| {
            ModgraphError::Manifest {
                message: "No Modgraph.toml found in current directory or any parent".to_string(),
            }
            .into()
        })
}
