//! Module metadata reader.
//!
//! Accepts every field the writer emits. Documents declaring another
//! `formatVersion` are still read, with a warning.

use std::path::Path;

use modgraph_core::capability::{Capability, CapabilityId};
use modgraph_core::constraint::VersionConstraint;
use modgraph_core::dependency::{DependencyConstraint, DependencySpec};
use modgraph_core::module::{ExcludeRule, ModuleId, ModuleVersionId};
use modgraph_core::variant::{FileRef, LocalVariant, ModuleData, Variant, VariantSource};
use modgraph_util::errors::{ModgraphError, ModgraphResult};

use crate::document::{
    attributes_from_doc, CapabilityDoc, DependencyConstraintDoc, DependencyDoc, ModuleDocument,
    VariantDoc, VariantSourceDoc, VersionDoc, FORMAT_VERSION,
};

/// Parse a module document.
pub fn parse_document(content: &str) -> ModgraphResult<ModuleDocument> {
    let document: ModuleDocument =
        serde_json::from_str(content).map_err(|e| ModgraphError::Metadata {
            message: format!("Failed to parse module document: {e}"),
        })?;
    if document.format_version != FORMAT_VERSION {
        tracing::warn!(
            "Module document for {}:{}:{} has format version {}, expected {FORMAT_VERSION}",
            document.component.group,
            document.component.module,
            document.component.version,
            document.format_version
        );
    }
    Ok(document)
}

/// Read and parse a module document from disk.
pub fn read_document(path: &Path) -> ModgraphResult<ModuleDocument> {
    let content = std::fs::read_to_string(path).map_err(|e| ModgraphError::Metadata {
        message: format!("Failed to read {}: {e}", path.display()),
    })?;
    parse_document(&content)
}

/// Convert a document fetched for `id` into module data.
///
/// A component owned by another document names its owner's coordinates, so
/// the identity always comes from where the document was found.
pub fn to_module_data(document: &ModuleDocument, id: &ModuleVersionId) -> ModuleData {
    let component = &document.component;
    if component.url.is_none()
        && (component.group != id.group
            || component.module != id.name
            || component.version != id.version)
    {
        tracing::warn!(
            "Module document for {id} declares {}:{}:{}",
            component.group,
            component.module,
            component.version
        );
    }
    ModuleData {
        id: id.clone(),
        attributes: attributes_from_doc(&component.attributes),
        variants: document.variants.iter().map(variant).collect(),
        artifacts: Vec::new(),
    }
}

fn variant(doc: &VariantDoc) -> Variant {
    let attributes = attributes_from_doc(&doc.attributes);
    match &doc.source {
        VariantSourceDoc::AvailableAt { available_at } => Variant::available_at(
            doc.name.clone(),
            attributes,
            ModuleVersionId::new(
                &available_at.group,
                &available_at.module,
                &available_at.version,
            ),
        ),
        VariantSourceDoc::Local(local) => Variant {
            name: doc.name.clone(),
            attributes,
            capabilities: local.capabilities.iter().map(capability).collect(),
            source: VariantSource::Local(LocalVariant {
                dependencies: local.dependencies.iter().map(dependency).collect(),
                constraints: local
                    .dependency_constraints
                    .iter()
                    .map(dependency_constraint)
                    .collect(),
                files: local
                    .files
                    .iter()
                    .map(|f| FileRef {
                        name: f.name.clone(),
                        url: f.url.clone(),
                        size: f.size,
                        sha1: f.sha1.clone(),
                        md5: f.md5.clone(),
                    })
                    .collect(),
            }),
        },
    }
}

fn capability(doc: &CapabilityDoc) -> Capability {
    Capability::new(doc.group.clone(), doc.name.clone(), doc.version.clone())
}

fn constraint(doc: Option<&VersionDoc>) -> VersionConstraint {
    match doc {
        None => VersionConstraint::none(),
        Some(v) => VersionConstraint {
            preferred: v.prefers.clone(),
            required: v.requires.clone().or_else(|| v.strictly.clone()),
            strict: v.strictly.clone(),
            rejects: v.rejects.clone(),
            for_subgraph: v.for_subgraph,
        },
    }
}

fn wildcard(part: &str) -> Option<String> {
    (part != ExcludeRule::WILDCARD).then(|| part.to_string())
}

fn dependency(doc: &DependencyDoc) -> DependencySpec {
    let mut spec = DependencySpec::new(
        ModuleId::new(&doc.group, &doc.module),
        constraint(doc.version.as_ref()),
    );
    spec.excludes = doc
        .excludes
        .iter()
        .map(|e| ExcludeRule::new(wildcard(&e.group), wildcard(&e.module)))
        .collect();
    spec.attributes = attributes_from_doc(&doc.attributes);
    spec.requested_capabilities = doc
        .requested_capabilities
        .iter()
        .map(|c| CapabilityId::new(&c.group, &c.name))
        .collect();
    spec.reason = doc.reason.clone();
    spec
}

fn dependency_constraint(doc: &DependencyConstraintDoc) -> DependencyConstraint {
    DependencyConstraint {
        module: ModuleId::new(&doc.group, &doc.module),
        constraint: constraint(doc.version.as_ref()),
        attributes: attributes_from_doc(&doc.attributes),
        reason: doc.reason.clone(),
    }
}
