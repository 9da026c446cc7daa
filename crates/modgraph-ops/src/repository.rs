//! A module repository on the local filesystem.
//!
//! Documents are laid out as
//! `<group as dirs>/<module>/<version>/<module>-<version>.module`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use modgraph_core::module::{ModuleId, ModuleVersionId};
use modgraph_core::variant::ModuleData;
use modgraph_metadata::reader::{parse_document, to_module_data};
use modgraph_metadata::repository::{module_dir, module_path};
use modgraph_resolver::provider::MetadataProvider;
use modgraph_util::errors::{ModgraphError, ModgraphResult};

#[derive(Debug, Clone)]
pub struct LocalRepository {
    root: PathBuf,
}

impl LocalRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the document for `id` lives.
    pub fn document_path(&self, id: &ModuleVersionId) -> PathBuf {
        self.root.join(module_path(id))
    }
}

#[async_trait]
impl MetadataProvider for LocalRepository {
    async fn fetch(&self, id: &ModuleVersionId) -> ModgraphResult<Option<ModuleData>> {
        let path = self.document_path(id);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No module document at {}", path.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(ModgraphError::Metadata {
                    message: format!("Failed to read {}: {e}", path.display()),
                }
                .into())
            }
        };
        let document = parse_document(&content)?;
        Ok(Some(to_module_data(&document, id)))
    }

    async fn list_versions(&self, module: &ModuleId) -> ModgraphResult<Vec<String>> {
        let dir = self.root.join(module_dir(module));
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ModgraphError::Io(e).into()),
        };

        let mut versions = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(ModgraphError::Io)? {
            let version = entry.file_name().to_string_lossy().into_owned();
            let document = self.document_path(&module.with_version(version.as_str()));
            if tokio::fs::try_exists(&document).await.unwrap_or(false) {
                versions.push(version);
            }
        }
        versions.sort();
        Ok(versions)
    }
}
