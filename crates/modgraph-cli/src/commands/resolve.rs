//! Handler for `modgraph resolve`.

use std::path::Path;

use miette::Result;

use modgraph_core::config::GlobalConfig;
use modgraph_ops::ops_resolve::{self, ResolveOptions};

pub async fn exec(
    manifest_path: &Path,
    depth: Option<u32>,
    why: Option<String>,
    conflicts: bool,
) -> Result<()> {
    let config = GlobalConfig::load()?;
    let opts = ResolveOptions {
        depth: depth.map(|d| d as usize),
        why,
        conflicts,
    };
    ops_resolve::resolve(manifest_path, &opts, &config).await
}
