//! Resolution rules.
//!
//! Dependency rules run as a fixed chain, first match wins within each
//! stage: substitutions rewrite the target module, then resolve rules may
//! pin its version. Forced versions and capability rules are consulted by
//! the conflict resolver; metadata rules rewrite module data as it is
//! fetched.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use modgraph_core::capability::CapabilityId;
use modgraph_core::constraint::VersionConstraint;
use modgraph_core::module::ModuleId;
use modgraph_core::variant::{ModuleData, VariantSource};

/// A dependency request as seen by a rule.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    pub module: &'a ModuleId,
    pub constraint: &'a VersionConstraint,
}

/// What a rule changes about a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOverride {
    pub target: Option<ModuleId>,
    pub version: Option<String>,
    pub description: String,
}

/// A pure function from a request to an optional override.
pub trait DependencyRule: fmt::Debug + Send + Sync {
    fn apply(&self, request: &RequestContext<'_>) -> Option<RuleOverride>;
}

/// Replace every request for `from` with a request for `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub from: ModuleId,
    pub to: ModuleId,
    /// Version requested from the replacement; the original request is kept
    /// when unset.
    pub version: Option<String>,
    pub reason: Option<String>,
}

impl DependencyRule for Substitution {
    fn apply(&self, request: &RequestContext<'_>) -> Option<RuleOverride> {
        if *request.module != self.from {
            return None;
        }
        let target = match &self.version {
            Some(v) => format!("{}:{v}", self.to),
            None => self.to.to_string(),
        };
        Some(RuleOverride {
            target: Some(self.to.clone()),
            version: self.version.clone(),
            description: self
                .reason
                .clone()
                .unwrap_or_else(|| format!("substituted {} with {target}", self.from)),
        })
    }
}

/// Pin the version of a module regardless of what is requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UseVersion {
    pub module: ModuleId,
    pub version: String,
    pub reason: Option<String>,
}

impl DependencyRule for UseVersion {
    fn apply(&self, request: &RequestContext<'_>) -> Option<RuleOverride> {
        (*request.module == self.module).then(|| RuleOverride {
            target: None,
            version: Some(self.version.clone()),
            description: self
                .reason
                .clone()
                .unwrap_or_else(|| format!("{} pinned to {}", self.module, self.version)),
        })
    }
}

/// Chooses the provider of a capability claimed by several modules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityRule {
    pub capability: CapabilityId,
    pub prefer: ModuleId,
    pub reason: Option<String>,
}

impl CapabilityRule {
    pub fn description(&self) -> String {
        self.reason.clone().unwrap_or_else(|| {
            format!("{} selected for capability {}", self.prefer, self.capability)
        })
    }
}

/// Rewrites module data before its variants are selected.
pub trait MetadataRule: fmt::Debug + Send + Sync {
    fn apply(&self, data: &mut ModuleData);
}

/// Promotes every dependency of one module to a subgraph constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubgraphMetadataRule {
    pub module: ModuleId,
}

impl MetadataRule for SubgraphMetadataRule {
    fn apply(&self, data: &mut ModuleData) {
        if data.id.module() != self.module {
            return;
        }
        for variant in &mut data.variants {
            if let VariantSource::Local(local) = &mut variant.source {
                for dependency in &mut local.dependencies {
                    dependency.constraint.for_subgraph = true;
                }
            }
        }
    }
}

/// A request after the dependency rule chain ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuledRequest {
    pub module: ModuleId,
    pub constraint: VersionConstraint,
    /// Description of the substitution that rewrote the target.
    pub substitution: Option<String>,
    /// Version pinned by a resolve rule, with the rule's description.
    pub pinned: Option<(String, String)>,
}

/// Every rule registered for one resolution.
#[derive(Debug, Clone, Default)]
pub struct ResolutionRules {
    forced: BTreeMap<ModuleId, String>,
    substitutions: Vec<Arc<dyn DependencyRule>>,
    resolve_rules: Vec<Arc<dyn DependencyRule>>,
    capability_rules: Vec<CapabilityRule>,
    metadata_rules: Vec<Arc<dyn MetadataRule>>,
}

impl ResolutionRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force `module` to `version` whatever else is requested.
    pub fn force(mut self, module: ModuleId, version: impl Into<String>) -> Self {
        self.forced.insert(module, version.into());
        self
    }

    pub fn substitute(self, substitution: Substitution) -> Self {
        self.with_substitution_rule(Arc::new(substitution))
    }

    pub fn use_version(self, rule: UseVersion) -> Self {
        self.with_resolve_rule(Arc::new(rule))
    }

    pub fn with_substitution_rule(mut self, rule: Arc<dyn DependencyRule>) -> Self {
        self.substitutions.push(rule);
        self
    }

    pub fn with_resolve_rule(mut self, rule: Arc<dyn DependencyRule>) -> Self {
        self.resolve_rules.push(rule);
        self
    }

    pub fn with_capability_rule(mut self, rule: CapabilityRule) -> Self {
        self.capability_rules.push(rule);
        self
    }

    pub fn with_metadata_rule(mut self, rule: Arc<dyn MetadataRule>) -> Self {
        self.metadata_rules.push(rule);
        self
    }

    pub fn forced_version(&self, module: &ModuleId) -> Option<&str> {
        self.forced.get(module).map(String::as_str)
    }

    pub fn capability_rule(&self, capability: &CapabilityId) -> Option<&CapabilityRule> {
        self.capability_rules
            .iter()
            .find(|r| r.capability == *capability)
    }

    /// Run the dependency rule chain over one request.
    pub fn apply(&self, module: &ModuleId, constraint: &VersionConstraint) -> RuledRequest {
        let mut ruled = RuledRequest {
            module: module.clone(),
            constraint: constraint.clone(),
            substitution: None,
            pinned: None,
        };

        let context = RequestContext { module, constraint };
        if let Some(o) = self.substitutions.iter().find_map(|r| r.apply(&context)) {
            if let Some(target) = o.target {
                ruled.module = target;
            }
            if let Some(version) = o.version {
                ruled.constraint = VersionConstraint {
                    for_subgraph: constraint.for_subgraph,
                    ..VersionConstraint::require(version)
                };
            }
            ruled.substitution = Some(o.description);
        }

        let context = RequestContext {
            module: &ruled.module,
            constraint: &ruled.constraint,
        };
        if let Some(o) = self.resolve_rules.iter().find_map(|r| r.apply(&context)) {
            if let Some(version) = o.version {
                ruled.pinned = Some((version, o.description));
            }
        }
        ruled
    }

    /// Run every metadata rule over freshly fetched module data.
    pub fn rewrite_metadata(&self, data: &mut ModuleData) {
        for rule in &self.metadata_rules {
            rule.apply(data);
        }
    }
}
