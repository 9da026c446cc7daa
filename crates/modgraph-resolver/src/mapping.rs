//! Publish-time version mapping backed by a resolved graph.

use std::collections::BTreeMap;

use modgraph_core::attribute::AttributeContainer;
use modgraph_core::module::{ModuleId, ModuleVersionId};
use modgraph_metadata::services::VersionMappingStrategy;

use crate::graph::ResolvedGraph;

/// Maps every module of a resolved graph to the version it resolved to, so a
/// published variant records what was actually selected instead of what was
/// requested.
#[derive(Debug, Clone, Default)]
pub struct ResolvedVersionMapping {
    versions: BTreeMap<ModuleId, ModuleVersionId>,
    /// When set, only variants carrying all of these attributes are mapped.
    variant_filter: Option<AttributeContainer>,
}

impl ResolvedVersionMapping {
    pub fn from_graph(graph: &ResolvedGraph) -> Self {
        let versions = graph
            .all_nodes()
            .into_iter()
            .map(|node| (node.key(), node.id.clone()))
            .collect();
        Self {
            versions,
            variant_filter: None,
        }
    }

    pub fn for_variants_with(mut self, attributes: AttributeContainer) -> Self {
        self.variant_filter = Some(attributes);
        self
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

impl VersionMappingStrategy for ResolvedVersionMapping {
    fn applies_to(&self, variant_attributes: &AttributeContainer) -> bool {
        let Some(filter) = &self.variant_filter else {
            return true;
        };
        filter.iter().all(|(name, wanted)| {
            variant_attributes
                .get(name)
                .is_some_and(|value| value.same_value(wanted))
        })
    }

    fn maybe_resolve_version(&self, group: &str, module: &str) -> Option<ModuleVersionId> {
        self.versions.get(&ModuleId::new(group, module)).cloned()
    }
}
