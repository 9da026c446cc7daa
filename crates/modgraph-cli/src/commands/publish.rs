//! Handler for `modgraph publish`.

use std::path::{Path, PathBuf};

use miette::Result;

use modgraph_core::config::GlobalConfig;
use modgraph_ops::ops_publish::{self, PublishOptions};

pub async fn exec(manifest_path: &Path, output: Option<PathBuf>, resolved_versions: bool) -> Result<()> {
    let config = GlobalConfig::load()?;
    let opts = PublishOptions {
        output,
        resolved_versions,
    };
    let path = ops_publish::publish(manifest_path, &opts, &config).await?;
    println!("{}", path.display());
    Ok(())
}
