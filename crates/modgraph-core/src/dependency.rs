use std::collections::BTreeSet;
use std::fmt;

use crate::attribute::AttributeContainer;
use crate::capability::CapabilityId;
use crate::constraint::VersionConstraint;
use crate::module::{ExcludeRule, ModuleId};

/// A dependency declared by a variant or by the root of a resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencySpec {
    pub module: ModuleId,
    pub constraint: VersionConstraint,
    pub excludes: BTreeSet<ExcludeRule>,
    pub transitive: bool,
    /// Marks the edge as forced: its version wins over every other request.
    pub force: bool,
    /// Attributes merged over the consumer attributes when selecting the
    /// target's variant.
    pub attributes: AttributeContainer,
    pub requested_capabilities: Vec<CapabilityId>,
    pub reason: Option<String>,
    /// Explicit variant name, bypassing attribute matching.
    pub target_variant: Option<String>,
}

impl DependencySpec {
    pub fn new(module: ModuleId, constraint: VersionConstraint) -> Self {
        Self {
            module,
            constraint,
            excludes: BTreeSet::new(),
            transitive: true,
            force: false,
            attributes: AttributeContainer::new(),
            requested_capabilities: Vec::new(),
            reason: None,
            target_variant: None,
        }
    }

    /// Shorthand for a plain `requires` dependency on `group:name`.
    pub fn require(group: &str, name: &str, version: &str) -> Self {
        Self::new(ModuleId::new(group, name), VersionConstraint::require(version))
    }

    pub fn exclude(mut self, rule: ExcludeRule) -> Self {
        self.excludes.insert(rule);
        self
    }

    pub fn non_transitive(mut self) -> Self {
        self.transitive = false;
        self
    }

    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }

    pub fn with_attributes(mut self, attributes: AttributeContainer) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_capability(mut self, capability: CapabilityId) -> Self {
        self.requested_capabilities.push(capability);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_target_variant(mut self, name: impl Into<String>) -> Self {
        self.target_variant = Some(name.into());
        self
    }

    /// The exclude rules this edge applies to its subgraph. A non-transitive
    /// dependency excludes everything.
    pub fn effective_excludes(&self) -> BTreeSet<ExcludeRule> {
        if self.transitive {
            self.excludes.clone()
        } else {
            BTreeSet::from([ExcludeRule::all()])
        }
    }
}

impl fmt::Display for DependencySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.module, self.constraint)
    }
}

/// A dependency constraint: a version requirement that applies only if the
/// module enters the graph through some real dependency.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyConstraint {
    pub module: ModuleId,
    pub constraint: VersionConstraint,
    pub attributes: AttributeContainer,
    pub reason: Option<String>,
}

impl DependencyConstraint {
    pub fn new(module: ModuleId, constraint: VersionConstraint) -> Self {
        Self {
            module,
            constraint,
            attributes: AttributeContainer::new(),
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

impl fmt::Display for DependencyConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "constraint {} ({})", self.module, self.constraint)
    }
}
