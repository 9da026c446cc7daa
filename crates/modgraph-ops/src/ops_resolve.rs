//! Operation: resolve the project's dependency graph and display it.

use std::path::Path;
use std::sync::Arc;

use modgraph_core::config::GlobalConfig;
use modgraph_resolver::resolver::{Resolution, Resolver, ResolverOptions};
use modgraph_util::progress::{spinner, status, status_warn};

use crate::repository::LocalRepository;
use crate::strategy;

/// Options for `modgraph resolve`.
#[derive(Debug, Default, Clone)]
pub struct ResolveOptions {
    /// Maximum tree depth to display.
    pub depth: Option<usize>,
    /// Show how a module entered the graph and why its version was selected.
    pub why: Option<String>,
    /// Show version conflicts.
    pub conflicts: bool,
}

/// Resolve the graph of the project described by `manifest_path` against
/// its local repository.
pub async fn resolve_project(
    manifest_path: &Path,
    config: &GlobalConfig,
) -> miette::Result<Resolution> {
    let (manifest, project_root) = crate::load_project(manifest_path)?;
    let repository = LocalRepository::new(crate::repository_root(&manifest, &project_root)?);
    let request = strategy::resolve_request(&manifest)?;

    let resolver = Resolver::new(Arc::new(repository))
        .with_schema(strategy::attribute_schema(&manifest)?)
        .with_rules(strategy::resolution_rules(&manifest)?)
        .with_options(ResolverOptions::from(&config.resolution));

    status("Resolving", &request.root.to_string());
    let pb = spinner("Resolving dependency graph...");
    let result = resolver.resolve(&request).await;
    pb.finish_and_clear();
    let resolution = result?;

    tracing::debug!(
        "Resolved {} modules in {} passes",
        resolution.graph.len(),
        resolution.passes
    );
    Ok(resolution)
}

/// Render a resolution the way `modgraph resolve` prints it.
pub fn render(resolution: &Resolution, opts: &ResolveOptions) -> String {
    let graph = &resolution.graph;

    if let Some(ref target) = opts.why {
        let Some(path) = graph.find_path(target) else {
            return format!("Dependency '{target}' not found in the graph.\n");
        };
        let mut out = format!("Path to {target}:\n");
        for (i, node) in path.iter().enumerate() {
            out.push_str(&format!("{}{node}\n", "  ".repeat(i)));
        }
        out.push('\n');
        out.push_str(&graph.print_inverted_tree(target));
        return out;
    }

    if opts.conflicts {
        if resolution.conflicts.is_empty() {
            return "No version conflicts.\n".to_string();
        }
        return resolution.conflicts.to_string();
    }

    let tree = graph.print_tree(opts.depth);
    if graph.is_empty() {
        return format!("{tree}No dependencies.\n");
    }
    tree
}

/// Resolve and print the dependency graph.
pub async fn resolve(
    manifest_path: &Path,
    opts: &ResolveOptions,
    config: &GlobalConfig,
) -> miette::Result<()> {
    let resolution = resolve_project(manifest_path, config).await?;
    print!("{}", render(&resolution, opts));
    if !opts.conflicts && !resolution.conflicts.is_empty() {
        status_warn(
            "Conflicts",
            &format!(
                "{} requests resolved to another version (see --conflicts)",
                resolution.conflicts.len()
            ),
        );
    }
    Ok(())
}
