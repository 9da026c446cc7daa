//! Sources of module metadata.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use modgraph_core::module::{ModuleId, ModuleVersionId};
use modgraph_core::variant::ModuleData;
use modgraph_util::errors::ModgraphResult;

/// Supplies module metadata and version listings to the resolver.
///
/// `fetch` returns `Ok(None)` when the module version does not exist; errors
/// are reserved for failures that should abort the resolution.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn fetch(&self, id: &ModuleVersionId) -> ModgraphResult<Option<ModuleData>>;

    /// Every known version of `module`, in any order.
    async fn list_versions(&self, module: &ModuleId) -> ModgraphResult<Vec<String>>;
}

/// A provider over module data held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    modules: BTreeMap<ModuleVersionId, ModuleData>,
    fetches: Arc<AtomicUsize>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(mut self, data: ModuleData) -> Self {
        self.insert(data);
        self
    }

    pub fn insert(&mut self, data: ModuleData) {
        self.modules.insert(data.id.clone(), data);
    }

    /// Number of `fetch` calls served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataProvider for InMemoryProvider {
    async fn fetch(&self, id: &ModuleVersionId) -> ModgraphResult<Option<ModuleData>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.modules.get(id).cloned())
    }

    async fn list_versions(&self, module: &ModuleId) -> ModgraphResult<Vec<String>> {
        Ok(self
            .modules
            .keys()
            .filter(|id| id.group == module.group && id.name == module.name)
            .map(|id| id.version.clone())
            .collect())
    }
}
