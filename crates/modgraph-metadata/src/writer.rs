//! Module metadata writer.
//!
//! The whole document is built in memory before the first byte is written,
//! so a failure (an unsupported attribute value, an unknown project, an
//! unreadable artifact) never leaves a partial document behind.

use std::io::Write;
use std::path::Path;

use modgraph_core::constraint::VersionConstraint;
use modgraph_core::dependency::DependencyConstraint;
use modgraph_core::module::ExcludeRule;
use modgraph_util::errors::{ModgraphError, ModgraphResult};

use crate::component::{
    ComponentIndex, DependencyRef, Publication, PublishArtifact, PublishedDependency, UsageVariant,
};
use crate::document::{
    attributes_to_doc, AvailableAtDoc, CapabilityDoc, ComponentDoc, CreatedByDoc,
    DependencyConstraintDoc, DependencyDoc, ExcludeDoc, FileDoc, LocalVariantDoc, ModuleDocument,
    ToolDoc, VariantDoc, VariantSourceDoc, VersionDoc, FORMAT_VERSION,
};
use crate::repository::relative_url;
use crate::services::{BuildIdentity, HashingService, ProjectDependencyResolver, VersionMappingStrategy};

/// Produces module metadata documents for publications.
pub struct ModuleMetadataWriter<'a> {
    build_identity: &'a dyn BuildIdentity,
    projects: &'a dyn ProjectDependencyResolver,
    hasher: &'a dyn HashingService,
}

impl<'a> ModuleMetadataWriter<'a> {
    pub fn new(
        build_identity: &'a dyn BuildIdentity,
        projects: &'a dyn ProjectDependencyResolver,
        hasher: &'a dyn HashingService,
    ) -> Self {
        Self {
            build_identity,
            projects,
            hasher,
        }
    }

    /// Build the document for `publication`. `publications` is every
    /// publication of the build; it supplies owner and child coordinates.
    pub fn document(
        &self,
        publication: &Publication,
        publications: &[Publication],
    ) -> ModgraphResult<ModuleDocument> {
        let index = ComponentIndex::build(publications);
        tracing::debug!("Building module metadata for {}", publication.coordinates);

        Ok(ModuleDocument {
            format_version: FORMAT_VERSION.to_string(),
            component: self.component(publication, &index)?,
            created_by: Some(CreatedByDoc {
                gradle: ToolDoc {
                    version: self.build_identity.tool_version(),
                    build_id: Some(self.build_identity.build_id()),
                },
            }),
            variants: self.variants(publication, &index)?,
        })
    }

    /// Write the document for `publication` to `out`.
    pub fn generate_to<W: Write + ?Sized>(
        &self,
        publication: &Publication,
        publications: &[Publication],
        out: &mut W,
    ) -> ModgraphResult<()> {
        let document = self.document(publication, publications)?;
        write_document(&document, out)?;
        Ok(())
    }

    /// Write the document for `publication` to `path`, replacing it atomically.
    pub fn write_file(
        &self,
        publication: &Publication,
        publications: &[Publication],
        path: &Path,
    ) -> ModgraphResult<()> {
        let document = self.document(publication, publications)?;
        modgraph_util::fs::write_atomic(path, |out| write_document(&document, out))?;
        Ok(())
    }

    fn component(
        &self,
        publication: &Publication,
        index: &ComponentIndex<'_>,
    ) -> ModgraphResult<ComponentDoc> {
        let doc = match index.owner_of(&publication.component.name)? {
            None => ComponentDoc {
                url: None,
                group: publication.coordinates.group.clone(),
                module: publication.coordinates.name.clone(),
                version: publication.coordinates.version.clone(),
                attributes: attributes_to_doc(&publication.attributes)?,
            },
            Some(owner) => ComponentDoc {
                url: Some(relative_url(&owner.coordinates)),
                group: owner.coordinates.group.clone(),
                module: owner.coordinates.name.clone(),
                version: owner.coordinates.version.clone(),
                attributes: attributes_to_doc(&owner.attributes)?,
            },
        };
        Ok(doc)
    }

    fn variants(
        &self,
        publication: &Publication,
        index: &ComponentIndex<'_>,
    ) -> ModgraphResult<Vec<VariantDoc>> {
        let mut variants = Vec::new();
        for variant in &publication.component.variants {
            variants.push(self.local_variant(publication, variant)?);
        }

        for child in &publication.component.children {
            let (component, data) = match (index.component(child), index.data(child)) {
                (Some(component), Some(data)) => (component, data),
                _ => {
                    return Err(ModgraphError::Metadata {
                        message: format!(
                            "Component '{child}' of {} is not published",
                            publication.coordinates
                        ),
                    }
                    .into())
                }
            };
            for variant in &component.variants {
                variants.push(VariantDoc {
                    name: variant.name.clone(),
                    attributes: attributes_to_doc(&variant.attributes)?,
                    source: VariantSourceDoc::AvailableAt {
                        available_at: AvailableAtDoc {
                            url: relative_url(&data.coordinates),
                            group: data.coordinates.group.clone(),
                            module: data.coordinates.name.clone(),
                            version: data.coordinates.version.clone(),
                        },
                    },
                });
            }
        }
        Ok(variants)
    }

    fn local_variant(
        &self,
        publication: &Publication,
        variant: &UsageVariant,
    ) -> ModgraphResult<VariantDoc> {
        let mapping = publication.mapping_for(variant);

        let dependencies = variant
            .dependencies
            .iter()
            .map(|d| self.dependency(d, &variant.global_excludes, mapping))
            .collect::<ModgraphResult<Vec<_>>>()?;
        let dependency_constraints = variant
            .constraints
            .iter()
            .map(|c| dependency_constraint(c, mapping))
            .collect::<ModgraphResult<Vec<_>>>()?;
        let files = variant
            .artifacts
            .iter()
            .map(|a| self.file(a))
            .collect::<ModgraphResult<Vec<_>>>()?;
        let capabilities = variant
            .capabilities
            .iter()
            .map(|c| CapabilityDoc {
                group: c.group.clone(),
                name: c.name.clone(),
                version: c.version.clone(),
            })
            .collect();

        Ok(VariantDoc {
            name: variant.name.clone(),
            attributes: attributes_to_doc(&variant.attributes)?,
            source: VariantSourceDoc::Local(LocalVariantDoc {
                dependencies,
                dependency_constraints,
                files,
                capabilities,
            }),
        })
    }

    fn dependency(
        &self,
        dependency: &PublishedDependency,
        global_excludes: &[ExcludeRule],
        mapping: Option<&dyn VersionMappingStrategy>,
    ) -> ModgraphResult<DependencyDoc> {
        let (group, module, version) = match &dependency.target {
            DependencyRef::Project(project) => {
                let mut id = self.projects.resolve(project)?;
                let mut resolved = None;
                if let Some(mapped) = mapping.and_then(|m| m.maybe_resolve_version(&id.group, &id.name)) {
                    id = mapped;
                    resolved = Some(id.version.clone());
                }
                let constraint = VersionConstraint::require(id.version.clone());
                (id.group, id.name, version_doc(&constraint, resolved.as_deref()))
            }
            DependencyRef::External(target) => {
                match mapping.and_then(|m| m.maybe_resolve_version(&target.group, &target.name)) {
                    Some(mapped) => (
                        mapped.group,
                        mapped.name,
                        version_doc(&dependency.constraint, Some(&mapped.version)),
                    ),
                    None => (
                        target.group.clone(),
                        target.name.clone(),
                        version_doc(&dependency.constraint, None),
                    ),
                }
            }
        };

        let requested_capabilities = dependency
            .requested_capabilities
            .iter()
            .map(|c| CapabilityDoc {
                group: c.group.clone(),
                name: c.name.clone(),
                version: None,
            })
            .collect();

        Ok(DependencyDoc {
            group,
            module,
            version,
            excludes: excludes(dependency, global_excludes),
            attributes: attributes_to_doc(&dependency.attributes)?,
            requested_capabilities,
            reason: dependency.reason.clone().filter(|r| !r.is_empty()),
        })
    }

    fn file(&self, artifact: &PublishArtifact) -> ModgraphResult<FileDoc> {
        let io = |e: std::io::Error| -> miette::Report {
            ModgraphError::Metadata {
                message: format!("Cannot read artifact {}: {e}", artifact.file.display()),
            }
            .into()
        };
        Ok(FileDoc {
            name: artifact.name.clone(),
            url: artifact.url.clone(),
            size: self.hasher.size(&artifact.file).map_err(io)?,
            sha1: self.hasher.sha1(&artifact.file).map_err(io)?,
            md5: self.hasher.md5(&artifact.file).map_err(io)?,
        })
    }
}

/// Serialize `document` as pretty JSON with two-space indentation and a
/// trailing newline.
pub fn write_document<W: Write + ?Sized>(
    document: &ModuleDocument,
    out: &mut W,
) -> Result<(), ModgraphError> {
    serde_json::to_writer_pretty(&mut *out, document)
        .map_err(|e| ModgraphError::Io(e.into()))?;
    out.write_all(b"\n")?;
    Ok(())
}

/// Serialize `document` to a string.
pub fn document_to_string(document: &ModuleDocument) -> Result<String, ModgraphError> {
    let mut buf = Vec::new();
    write_document(document, &mut buf)?;
    String::from_utf8(buf).map_err(|e| ModgraphError::Generic {
        message: format!("Module document is not valid UTF-8: {e}"),
    })
}

/// The version object for a constraint, or `None` for the empty constraint.
/// A resolved version replaces `requires` and suppresses `prefers`.
fn version_doc(constraint: &VersionConstraint, resolved: Option<&str>) -> Option<VersionDoc> {
    if constraint.is_empty() {
        return None;
    }
    let (requires, prefers) = match resolved {
        Some(version) => (Some(version.to_string()), None),
        None => (constraint.required.clone(), constraint.preferred.clone()),
    };
    Some(VersionDoc {
        strictly: constraint.strict.clone(),
        requires,
        prefers,
        rejects: constraint.rejects.clone(),
        for_subgraph: constraint.for_subgraph,
    })
}

/// A non-transitive dependency excludes everything; otherwise the variant's
/// global excludes come first, followed by the dependency's own.
fn excludes(dependency: &PublishedDependency, global_excludes: &[ExcludeRule]) -> Vec<ExcludeDoc> {
    let mut rules: Vec<&ExcludeRule> = Vec::new();
    let all = ExcludeRule::all();
    if !dependency.transitive {
        rules.push(&all);
    } else {
        for rule in global_excludes.iter().chain(&dependency.excludes) {
            if !rules.contains(&rule) {
                rules.push(rule);
            }
        }
    }
    rules
        .into_iter()
        .map(|r| ExcludeDoc {
            group: r.group_or_wildcard().to_string(),
            module: r.module_or_wildcard().to_string(),
        })
        .collect()
}

fn dependency_constraint(
    constraint: &DependencyConstraint,
    mapping: Option<&dyn VersionMappingStrategy>,
) -> ModgraphResult<DependencyConstraintDoc> {
    let module = &constraint.module;
    let mapped = mapping.and_then(|m| m.maybe_resolve_version(&module.group, &module.name));
    let (group, name, resolved) = match &mapped {
        Some(id) => (id.group.clone(), id.name.clone(), Some(id.version.as_str())),
        None => (module.group.clone(), module.name.clone(), None),
    };
    Ok(DependencyConstraintDoc {
        group,
        module: name,
        version: version_doc(&constraint.constraint, resolved),
        attributes: attributes_to_doc(&constraint.attributes)?,
        reason: constraint.reason.clone().filter(|r| !r.is_empty()),
    })
}
