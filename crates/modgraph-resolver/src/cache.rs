//! Per-resolution cache of fetched metadata.
//!
//! Every module version is fetched at most once per resolution, including
//! lookups that found nothing.

use std::collections::BTreeMap;
use std::sync::Arc;

use modgraph_core::module::{ModuleId, ModuleVersionId};
use modgraph_core::variant::ModuleData;

#[derive(Debug, Default)]
pub struct FetchCache {
    modules: BTreeMap<ModuleVersionId, Option<Arc<ModuleData>>>,
    listings: BTreeMap<ModuleId, Vec<String>>,
}

impl FetchCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` when never fetched, `Some(None)` when the fetch found nothing.
    pub fn module(&self, id: &ModuleVersionId) -> Option<Option<&Arc<ModuleData>>> {
        self.modules.get(id).map(Option::as_ref)
    }

    pub fn is_fetched(&self, id: &ModuleVersionId) -> bool {
        self.modules.contains_key(id)
    }

    pub fn insert_module(&mut self, id: ModuleVersionId, data: Option<ModuleData>) {
        self.modules.insert(id, data.map(Arc::new));
    }

    pub fn listing(&self, module: &ModuleId) -> Option<&[String]> {
        self.listings.get(module).map(Vec::as_slice)
    }

    pub fn insert_listing(&mut self, module: ModuleId, versions: Vec<String>) {
        self.listings.insert(module, versions);
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_modules_are_remembered() {
        let mut cache = FetchCache::new();
        let id = ModuleVersionId::new("org", "lib", "1.0");
        assert!(cache.module(&id).is_none());
        cache.insert_module(id.clone(), None);
        assert!(cache.is_fetched(&id));
        assert!(matches!(cache.module(&id), Some(None)));

        let other = ModuleVersionId::new("org", "lib", "2.0");
        cache.insert_module(other.clone(), Some(ModuleData::new(other.clone())));
        assert!(matches!(cache.module(&other), Some(Some(_))));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn listings() {
        let mut cache = FetchCache::new();
        let module = ModuleId::new("org", "lib");
        assert!(cache.listing(&module).is_none());
        cache.insert_listing(module.clone(), vec!["1.0".into()]);
        assert_eq!(cache.listing(&module), Some(&["1.0".to_string()][..]));
    }
}
