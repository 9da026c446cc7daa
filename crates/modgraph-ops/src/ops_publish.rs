//! Operation: write the module metadata document of a project into its
//! repository.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use modgraph_core::config::GlobalConfig;
use modgraph_core::manifest::{DependencyDecl, DependencyTarget, Manifest, VariantDecl};
use modgraph_core::module::ModuleVersionId;
use modgraph_metadata::component::{
    PublishArtifact, PublishedDependency, Publication, SoftwareComponent, UsageVariant,
};
use modgraph_metadata::repository::module_path;
use modgraph_metadata::services::{FileHasher, ProjectTable, StaticBuildIdentity};
use modgraph_metadata::writer::ModuleMetadataWriter;
use modgraph_resolver::mapping::ResolvedVersionMapping;
use modgraph_util::errors::ModgraphError;
use modgraph_util::progress::status;

use crate::ops_resolve;

/// Options for `modgraph publish`.
#[derive(Debug, Default, Clone)]
pub struct PublishOptions {
    /// Repository to publish into instead of the manifest's.
    pub output: Option<PathBuf>,
    /// Write the versions a resolution selects instead of the declared ones.
    pub resolved_versions: bool,
}

/// Every publication the manifest describes. The project's own publication
/// comes first; hosted variants and the owning component follow.
pub fn publications_from_manifest(
    manifest: &Manifest,
    project_root: &Path,
) -> miette::Result<Vec<Publication>> {
    let coordinates = manifest.component.id();
    let self_name = manifest.component.module.clone();
    let mut component = SoftwareComponent::new(&self_name);
    let mut hosted: Vec<(ModuleVersionId, SoftwareComponent)> = Vec::new();

    for decl in &manifest.variants {
        if let Some(host) = decl.available_at()? {
            let variant = UsageVariant::new(&decl.name, decl.attributes.clone());
            match hosted.iter_mut().find(|(id, _)| *id == host) {
                Some((_, child)) => child.variants.push(variant),
                None => {
                    let child = SoftwareComponent::new(host.to_string()).with_variant(variant);
                    component = component.with_child(host.to_string());
                    hosted.push((host, child));
                }
            }
            continue;
        }
        component = component.with_variant(usage_variant(manifest, decl, project_root)?);
    }

    let mut publications = vec![Publication::new(coordinates, component)
        .with_attributes(manifest.component.attributes.clone())];
    publications.extend(
        hosted
            .into_iter()
            .map(|(id, child)| Publication::new(id, child)),
    );

    if let Some(owner) = manifest.owner()? {
        let owner_component = SoftwareComponent::new(owner.to_string()).with_child(&self_name);
        publications.push(Publication::new(owner, owner_component));
    }
    Ok(publications)
}

fn usage_variant(
    manifest: &Manifest,
    decl: &VariantDecl,
    project_root: &Path,
) -> miette::Result<UsageVariant> {
    let mut variant = UsageVariant::new(&decl.name, decl.attributes.clone());

    let inherited = if decl.inherit_dependencies {
        manifest.dependencies.as_slice()
    } else {
        &[]
    };
    for dep in inherited.iter().chain(&decl.dependencies) {
        variant.dependencies.push(published_dependency(manifest, dep)?);
    }

    let inherited = if decl.inherit_dependencies {
        manifest.constraints.as_slice()
    } else {
        &[]
    };
    for constraint in inherited.iter().chain(&decl.constraints) {
        variant
            .constraints
            .push(constraint.to_constraint(&manifest.projects)?);
    }

    for file in &decl.files {
        let mut artifact = PublishArtifact::from_path(project_root.join(&file.path));
        if let Some(name) = &file.name {
            artifact.name = name.clone();
            artifact.url = name.clone();
        }
        if let Some(url) = &file.url {
            artifact.url = url.clone();
        }
        variant.artifacts.push(artifact);
    }

    variant.capabilities = decl.capabilities()?;
    variant.global_excludes = decl.exclude_rules()?;
    Ok(variant)
}

/// Project dependencies are published by project name and resolved to
/// coordinates by the writer.
fn published_dependency(
    manifest: &Manifest,
    decl: &DependencyDecl,
) -> miette::Result<PublishedDependency> {
    let spec = decl.to_spec(&manifest.projects)?;
    let mut published = PublishedDependency::from(&spec);
    if let DependencyTarget::Project { name, .. } = decl.target(&manifest.projects)? {
        published.target = PublishedDependency::project(name).target;
    }
    Ok(published)
}

fn project_table(manifest: &Manifest) -> miette::Result<ProjectTable> {
    let mut table = ProjectTable::new();
    for (name, coords) in &manifest.projects {
        let id = ModuleVersionId::parse(coords).ok_or_else(|| ModgraphError::Manifest {
            message: format!("Invalid coordinates '{coords}' for project '{name}'"),
        })?;
        table = table.with(name, id);
    }
    Ok(table)
}

fn build_identity(config: &GlobalConfig) -> StaticBuildIdentity {
    let version = config
        .tool
        .version
        .clone()
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());
    match &config.tool.build_id {
        Some(id) => StaticBuildIdentity::new(version, id.clone()),
        None => StaticBuildIdentity::for_invocation(version),
    }
}

/// Publish the project's module document. Returns the path written.
pub async fn publish(
    manifest_path: &Path,
    opts: &PublishOptions,
    config: &GlobalConfig,
) -> miette::Result<PathBuf> {
    let (manifest, project_root) = crate::load_project(manifest_path)?;
    let repository = match &opts.output {
        Some(output) => output.clone(),
        None => crate::repository_root(&manifest, &project_root)?,
    };

    let mut publications = publications_from_manifest(&manifest, &project_root)?;
    if opts.resolved_versions {
        let resolution = ops_resolve::resolve_project(manifest_path, config).await?;
        let mapping = ResolvedVersionMapping::from_graph(&resolution.graph);
        tracing::debug!("Mapping {} resolved versions", mapping.len());
        if let Some(own) = publications.first_mut() {
            *own = own.clone().with_version_mapping(Arc::new(mapping));
        }
    }

    let projects = project_table(&manifest)?;
    let identity = build_identity(config);
    let writer = ModuleMetadataWriter::new(&identity, &projects, &FileHasher);

    let coordinates = manifest.component.id();
    let path = repository.join(module_path(&coordinates));
    status("Writing", &format!("{coordinates} to {}", path.display()));
    writer.write_file(&publications[0], &publications, &path)?;
    Ok(path)
}
