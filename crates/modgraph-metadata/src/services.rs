//! Collaborators consumed by the writer.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use modgraph_core::attribute::AttributeContainer;
use modgraph_core::module::ModuleVersionId;
use modgraph_util::errors::ModgraphError;

/// Supplies the tool identity written into `createdBy`.
pub trait BuildIdentity: Send + Sync {
    fn tool_version(&self) -> String;
    /// Unique id of the current build invocation.
    fn build_id(&self) -> String;
}

/// A fixed build identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticBuildIdentity {
    pub version: String,
    pub build_id: String,
}

impl StaticBuildIdentity {
    pub fn new(version: impl Into<String>, build_id: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            build_id: build_id.into(),
        }
    }

    /// An identity for this invocation. The id is derived from the process id
    /// and the current timestamp, so it is unique per process and timestamp
    /// rather than globally.
    pub fn for_invocation(version: impl Into<String>) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let seed = format!("{nanos}-{}", std::process::id());
        let digest = modgraph_util::hash::sha256_bytes(seed.as_bytes());
        Self::new(version, &digest[..26])
    }
}

impl BuildIdentity for StaticBuildIdentity {
    fn tool_version(&self) -> String {
        self.version.clone()
    }

    fn build_id(&self) -> String {
        self.build_id.clone()
    }
}

/// Maps a reference to another project of the same build to the
/// coordinates it is published under.
pub trait ProjectDependencyResolver: Send + Sync {
    fn resolve(&self, project: &str) -> miette::Result<ModuleVersionId>;
}

/// Project resolver backed by a fixed table.
#[derive(Debug, Clone, Default)]
pub struct ProjectTable {
    projects: BTreeMap<String, ModuleVersionId>,
}

impl ProjectTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, project: impl Into<String>, id: ModuleVersionId) -> Self {
        self.projects.insert(project.into(), id);
        self
    }
}

impl ProjectDependencyResolver for ProjectTable {
    fn resolve(&self, project: &str) -> miette::Result<ModuleVersionId> {
        self.projects.get(project).cloned().ok_or_else(|| {
            ModgraphError::Generic {
                message: format!("Project '{project}' has no publication"),
            }
            .into()
        })
    }
}

/// Rewrites dependency coordinates at publication time, typically to the
/// versions a resolution actually selected.
pub trait VersionMappingStrategy: Send + Sync {
    /// Whether this strategy is used for a variant with these attributes.
    fn applies_to(&self, _variant_attributes: &AttributeContainer) -> bool {
        true
    }

    /// Replacement coordinates for `group:module`, if any. The result may
    /// rename the module as well as fix its version.
    fn maybe_resolve_version(&self, group: &str, module: &str) -> Option<ModuleVersionId>;
}

/// Produces the size and digests recorded for published files.
pub trait HashingService: Send + Sync {
    fn size(&self, path: &Path) -> std::io::Result<u64>;
    fn sha1(&self, path: &Path) -> std::io::Result<String>;
    fn md5(&self, path: &Path) -> std::io::Result<String>;
}

/// Hashes files on the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileHasher;

impl HashingService for FileHasher {
    fn size(&self, path: &Path) -> std::io::Result<u64> {
        Ok(std::fs::metadata(path)?.len())
    }

    fn sha1(&self, path: &Path) -> std::io::Result<String> {
        modgraph_util::hash::sha1_file(path)
    }

    fn md5(&self, path: &Path) -> std::io::Result<String> {
        modgraph_util::hash::md5_file(path)
    }
}
