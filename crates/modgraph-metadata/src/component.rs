//! What gets published: components, their variants and the publications
//! that give them coordinates.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use modgraph_core::attribute::AttributeContainer;
use modgraph_core::capability::{Capability, CapabilityId};
use modgraph_core::constraint::VersionConstraint;
use modgraph_core::dependency::{DependencyConstraint, DependencySpec};
use modgraph_core::module::{ExcludeRule, ModuleId, ModuleVersionId};
use modgraph_util::errors::ModgraphError;

use crate::services::VersionMappingStrategy;

/// Target of a published dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyRef {
    External(ModuleId),
    /// Another project of the same build, mapped to coordinates at write time.
    Project(String),
}

/// A dependency of a published variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedDependency {
    pub target: DependencyRef,
    pub constraint: VersionConstraint,
    pub excludes: Vec<ExcludeRule>,
    pub transitive: bool,
    pub attributes: AttributeContainer,
    pub requested_capabilities: Vec<CapabilityId>,
    pub reason: Option<String>,
}

impl PublishedDependency {
    fn with_target(target: DependencyRef, constraint: VersionConstraint) -> Self {
        Self {
            target,
            constraint,
            excludes: Vec::new(),
            transitive: true,
            attributes: AttributeContainer::new(),
            requested_capabilities: Vec::new(),
            reason: None,
        }
    }

    pub fn external(module: ModuleId, constraint: VersionConstraint) -> Self {
        Self::with_target(DependencyRef::External(module), constraint)
    }

    /// A dependency on another project; its version is the project's own.
    pub fn project(name: impl Into<String>) -> Self {
        Self::with_target(DependencyRef::Project(name.into()), VersionConstraint::none())
    }
}

impl From<&DependencySpec> for PublishedDependency {
    fn from(spec: &DependencySpec) -> Self {
        Self {
            target: DependencyRef::External(spec.module.clone()),
            constraint: spec.constraint.clone(),
            excludes: spec.excludes.iter().cloned().collect(),
            transitive: spec.transitive,
            attributes: spec.attributes.clone(),
            requested_capabilities: spec.requested_capabilities.clone(),
            reason: spec.reason.clone(),
        }
    }
}

/// A file attached to a published variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishArtifact {
    pub name: String,
    /// Location relative to the module document.
    pub url: String,
    pub file: PathBuf,
}

impl PublishArtifact {
    /// An artifact published next to the document under its own file name.
    pub fn from_path(file: PathBuf) -> Self {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            url: name.clone(),
            name,
            file,
        }
    }
}

/// One variant of a published component.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageVariant {
    pub name: String,
    pub attributes: AttributeContainer,
    pub dependencies: Vec<PublishedDependency>,
    pub constraints: Vec<DependencyConstraint>,
    pub artifacts: Vec<PublishArtifact>,
    pub capabilities: Vec<Capability>,
    /// Excludes added to every transitive dependency of this variant.
    pub global_excludes: Vec<ExcludeRule>,
}

impl UsageVariant {
    pub fn new(name: impl Into<String>, attributes: AttributeContainer) -> Self {
        Self {
            name: name.into(),
            attributes,
            ..Self::default()
        }
    }
}

/// A publishable component. `children` names components whose variants
/// this component advertises as hosted elsewhere.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoftwareComponent {
    pub name: String,
    pub variants: Vec<UsageVariant>,
    pub children: Vec<String>,
}

impl SoftwareComponent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_variant(mut self, variant: UsageVariant) -> Self {
        self.variants.push(variant);
        self
    }

    pub fn with_child(mut self, component: impl Into<String>) -> Self {
        self.children.push(component.into());
        self
    }
}

/// A component published under fixed coordinates.
#[derive(Clone)]
pub struct Publication {
    pub coordinates: ModuleVersionId,
    pub attributes: AttributeContainer,
    pub component: SoftwareComponent,
    /// Candidate strategies; the first one that applies to a variant is used.
    pub version_mappings: Vec<Arc<dyn VersionMappingStrategy>>,
}

impl Publication {
    pub fn new(coordinates: ModuleVersionId, component: SoftwareComponent) -> Self {
        Self {
            coordinates,
            attributes: AttributeContainer::new(),
            component,
            version_mappings: Vec::new(),
        }
    }

    pub fn with_attributes(mut self, attributes: AttributeContainer) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_version_mapping(mut self, strategy: Arc<dyn VersionMappingStrategy>) -> Self {
        self.version_mappings.push(strategy);
        self
    }

    /// The mapping strategy for a variant, chosen by its attributes.
    pub fn mapping_for(&self, variant: &UsageVariant) -> Option<&dyn VersionMappingStrategy> {
        self.version_mappings
            .iter()
            .find(|s| s.applies_to(&variant.attributes))
            .map(|s| s.as_ref())
    }
}

impl std::fmt::Debug for Publication {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publication")
            .field("coordinates", &self.coordinates)
            .field("attributes", &self.attributes)
            .field("component", &self.component)
            .field("version_mappings", &self.version_mappings.len())
            .finish()
    }
}

/// Identity of a published component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentData {
    pub coordinates: ModuleVersionId,
    pub attributes: AttributeContainer,
}

/// Lookup tables over a set of publications, built once before writing.
#[derive(Debug)]
pub struct ComponentIndex<'a> {
    coordinates: BTreeMap<&'a str, ComponentData>,
    components: BTreeMap<&'a str, &'a SoftwareComponent>,
    owners: BTreeMap<&'a str, &'a str>,
}

impl<'a> ComponentIndex<'a> {
    pub fn build(publications: &'a [Publication]) -> Self {
        let mut coordinates = BTreeMap::new();
        let mut components = BTreeMap::new();
        let mut owners = BTreeMap::new();
        for publication in publications {
            let name = publication.component.name.as_str();
            coordinates.insert(
                name,
                ComponentData {
                    coordinates: publication.coordinates.clone(),
                    attributes: publication.attributes.clone(),
                },
            );
            components.insert(name, &publication.component);
            for child in &publication.component.children {
                owners.insert(child.as_str(), name);
            }
        }
        Self {
            coordinates,
            components,
            owners,
        }
    }

    pub fn data(&self, component: &str) -> Option<&ComponentData> {
        self.coordinates.get(component)
    }

    pub fn component(&self, name: &str) -> Option<&'a SoftwareComponent> {
        self.components.get(name).copied()
    }

    /// Identity of the component owning `component`, if it has one.
    pub fn owner_of(&self, component: &str) -> Result<Option<&ComponentData>, ModgraphError> {
        match self.owners.get(component) {
            None => Ok(None),
            Some(owner) => self.data(owner).map(Some).ok_or_else(|| ModgraphError::Metadata {
                message: format!("Owner '{owner}' of component '{component}' is not published"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_records_owners() {
        let parent = Publication::new(
            ModuleVersionId::new("org", "foo", "1.0"),
            SoftwareComponent::new("foo").with_child("foo-jvm"),
        );
        let child = Publication::new(
            ModuleVersionId::new("org", "foo-jvm", "1.0"),
            SoftwareComponent::new("foo-jvm"),
        );
        let publications = [parent, child];
        let index = ComponentIndex::build(&publications);
        let owner = index.owner_of("foo-jvm").unwrap().unwrap();
        assert_eq!(owner.coordinates.name, "foo");
        assert!(index.owner_of("foo").unwrap().is_none());
    }

    #[test]
    fn artifact_from_path_uses_file_name() {
        let artifact = PublishArtifact::from_path(PathBuf::from("build/libs/foo-1.0.jar"));
        assert_eq!(artifact.name, "foo-1.0.jar");
        assert_eq!(artifact.url, "foo-1.0.jar");
    }

    #[test]
    fn published_dependency_from_spec() {
        let spec = DependencySpec::require("org", "bar", "1.0")
            .exclude(ExcludeRule::parse("org:baz").unwrap())
            .with_reason("because");
        let published = PublishedDependency::from(&spec);
        assert_eq!(published.target, DependencyRef::External(ModuleId::new("org", "bar")));
        assert_eq!(published.excludes.len(), 1);
        assert_eq!(published.reason.as_deref(), Some("because"));
    }
}
