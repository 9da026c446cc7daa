//! Published variants and the module data handed to the resolver.

use std::fmt;

use crate::attribute::AttributeContainer;
use crate::capability::{effective_capabilities, Capability};
use crate::dependency::{DependencyConstraint, DependencySpec};
use crate::module::{ModuleId, ModuleVersionId};

/// An artifact file of a variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileRef {
    pub name: String,
    pub url: String,
    pub size: u64,
    pub sha1: String,
    pub md5: String,
}

/// Content of a variant hosted in the module's own document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalVariant {
    pub dependencies: Vec<DependencySpec>,
    pub constraints: Vec<DependencyConstraint>,
    pub files: Vec<FileRef>,
}

/// Where a variant's content lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantSource {
    Local(LocalVariant),
    /// The variant is published by another module; consumers follow the link.
    AvailableAt(ModuleVersionId),
}

/// One published view of a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub name: String,
    pub attributes: AttributeContainer,
    pub capabilities: Vec<Capability>,
    pub source: VariantSource,
}

impl Variant {
    pub fn local(name: impl Into<String>, attributes: AttributeContainer) -> Self {
        Self {
            name: name.into(),
            attributes,
            capabilities: Vec::new(),
            source: VariantSource::Local(LocalVariant::default()),
        }
    }

    pub fn available_at(
        name: impl Into<String>,
        attributes: AttributeContainer,
        target: ModuleVersionId,
    ) -> Self {
        Self {
            name: name.into(),
            attributes,
            capabilities: Vec::new(),
            source: VariantSource::AvailableAt(target),
        }
    }

    /// Builder-style dependency. Has no effect on `available-at` variants.
    pub fn with_dependency(mut self, dependency: DependencySpec) -> Self {
        if let VariantSource::Local(local) = &mut self.source {
            local.dependencies.push(dependency);
        }
        self
    }

    /// Builder-style dependency constraint. Has no effect on `available-at` variants.
    pub fn with_constraint(mut self, constraint: DependencyConstraint) -> Self {
        if let VariantSource::Local(local) = &mut self.source {
            local.constraints.push(constraint);
        }
        self
    }

    pub fn with_file(mut self, file: FileRef) -> Self {
        if let VariantSource::Local(local) = &mut self.source {
            local.files.push(file);
        }
        self
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    pub fn dependencies(&self) -> &[DependencySpec] {
        match &self.source {
            VariantSource::Local(local) => &local.dependencies,
            VariantSource::AvailableAt(_) => &[],
        }
    }

    pub fn constraints(&self) -> &[DependencyConstraint] {
        match &self.source {
            VariantSource::Local(local) => &local.constraints,
            VariantSource::AvailableAt(_) => &[],
        }
    }

    pub fn files(&self) -> &[FileRef] {
        match &self.source {
            VariantSource::Local(local) => &local.files,
            VariantSource::AvailableAt(_) => &[],
        }
    }

    /// Capabilities this variant provides for `module` at `version`.
    pub fn provided_capabilities(&self, module: &ModuleId, version: &str) -> Vec<Capability> {
        effective_capabilities(module, version, &self.capabilities)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.attributes)
    }
}

/// Everything a metadata provider knows about one module version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleData {
    pub id: ModuleVersionId,
    pub attributes: AttributeContainer,
    pub variants: Vec<Variant>,
    /// Raw artifact set, used when the module exposes no variants.
    pub artifacts: Vec<FileRef>,
}

impl ModuleData {
    pub fn new(id: ModuleVersionId) -> Self {
        Self {
            id,
            attributes: AttributeContainer::new(),
            variants: Vec::new(),
            artifacts: Vec::new(),
        }
    }

    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variants.push(variant);
        self
    }

    pub fn with_artifact(mut self, file: FileRef) -> Self {
        self.artifacts.push(file);
        self
    }

    pub fn variant(&self, name: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.name == name)
    }
}
