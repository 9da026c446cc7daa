use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use modgraph_util::errors::ModgraphError;

use crate::attribute::{AttributeContainer, AttributeValue};
use crate::capability::{Capability, CapabilityId};
use crate::constraint::VersionConstraint;
use crate::dependency::{DependencyConstraint, DependencySpec};
use crate::module::{ExcludeRule, ModuleId, ModuleVersionId};

/// The parsed representation of a `Modgraph.toml` file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Local module repository, relative to the manifest directory.
    #[serde(default)]
    pub repository: Option<PathBuf>,

    pub component: ComponentDecl,

    #[serde(default)]
    pub consumer: ConsumerDecl,

    #[serde(default)]
    pub dependencies: Vec<DependencyDecl>,

    #[serde(default)]
    pub constraints: Vec<DependencyDecl>,

    #[serde(default)]
    pub resolution: ResolutionDecl,

    #[serde(default)]
    pub schema: BTreeMap<String, AttributeSchemaDecl>,

    /// In-build projects by name, mapped to their publishable coordinates.
    #[serde(default)]
    pub projects: BTreeMap<String, String>,

    #[serde(default)]
    pub variants: Vec<VariantDecl>,
}

/// Component identity from the `[component]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentDecl {
    pub group: String,
    pub module: String,
    pub version: String,
    #[serde(default)]
    pub attributes: AttributeContainer,
    /// Coordinates (`group:module:version`) of the component whose document
    /// hosts this one.
    #[serde(default)]
    pub owner: Option<String>,
}

impl ComponentDecl {
    pub fn id(&self) -> ModuleVersionId {
        ModuleVersionId::new(&self.group, &self.module, &self.version)
    }
}

/// Consumer attributes from `[consumer]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsumerDecl {
    #[serde(default)]
    pub attributes: AttributeContainer,
}

/// A dependency or dependency constraint declaration.
///
/// `version` is shorthand for `requires`. Exactly one of `module` and
/// `project` must be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencyDecl {
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub strictly: Option<String>,
    #[serde(default)]
    pub requires: Option<String>,
    #[serde(default)]
    pub prefers: Option<String>,
    #[serde(default)]
    pub rejects: Vec<String>,
    #[serde(default, rename = "for-subgraph")]
    pub for_subgraph: bool,
    #[serde(default)]
    pub force: bool,
    #[serde(default = "default_true")]
    pub transitive: bool,
    #[serde(default)]
    pub excludes: Vec<String>,
    #[serde(default)]
    pub attributes: AttributeContainer,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub variant: Option<String>,
}

fn default_true() -> bool {
    true
}

impl DependencyDecl {
    /// The version constraint this declaration describes.
    pub fn constraint(&self) -> VersionConstraint {
        let mut constraint = match &self.strictly {
            Some(strict) => VersionConstraint::strictly(strict.clone()),
            None => VersionConstraint {
                required: self.requires.clone().or_else(|| self.version.clone()),
                ..VersionConstraint::default()
            },
        };
        constraint.preferred = self.prefers.clone();
        constraint.rejects = self.rejects.clone();
        constraint.for_subgraph = self.for_subgraph;
        constraint
    }

    /// The module this declaration targets, mapping project references
    /// through `projects`.
    pub fn target(&self, projects: &BTreeMap<String, String>) -> miette::Result<DependencyTarget> {
        match (&self.module, &self.project) {
            (Some(module), None) => ModuleId::parse(module)
                .map(DependencyTarget::Module)
                .ok_or_else(|| manifest_error(format!("Invalid module coordinates '{module}'"))),
            (None, Some(project)) => {
                let coords = projects
                    .get(project)
                    .ok_or_else(|| manifest_error(format!("Unknown project '{project}'")))?;
                ModuleVersionId::parse(coords)
                    .map(|id| DependencyTarget::Project {
                        name: project.clone(),
                        id,
                    })
                    .ok_or_else(|| {
                        manifest_error(format!(
                            "Invalid coordinates '{coords}' for project '{project}'"
                        ))
                    })
            }
            (Some(_), Some(_)) => Err(manifest_error(
                "A dependency cannot declare both 'module' and 'project'".to_string(),
            )),
            (None, None) => Err(manifest_error(
                "A dependency must declare 'module' or 'project'".to_string(),
            )),
        }
    }

    pub fn exclude_rules(&self) -> miette::Result<Vec<ExcludeRule>> {
        parse_excludes(&self.excludes)
    }

    pub fn requested_capabilities(&self) -> miette::Result<Vec<CapabilityId>> {
        self.capabilities
            .iter()
            .map(|c| {
                CapabilityId::parse(c)
                    .ok_or_else(|| manifest_error(format!("Invalid capability '{c}'")))
            })
            .collect()
    }

    /// Convert into a dependency the resolver understands. Project
    /// dependencies require their project's version unless the declaration
    /// says otherwise.
    pub fn to_spec(&self, projects: &BTreeMap<String, String>) -> miette::Result<DependencySpec> {
        let mut constraint = self.constraint();
        let module = match self.target(projects)? {
            DependencyTarget::Module(module) => module,
            DependencyTarget::Project { id, .. } => {
                if constraint.requested_version().is_none() {
                    constraint.required = Some(id.version.clone());
                }
                id.module()
            }
        };
        let mut spec = DependencySpec::new(module, constraint);
        spec.excludes = self.exclude_rules()?.into_iter().collect();
        spec.transitive = self.transitive;
        spec.force = self.force;
        spec.attributes = self.attributes.clone();
        spec.requested_capabilities = self.requested_capabilities()?;
        spec.reason = self.reason.clone();
        spec.target_variant = self.variant.clone();
        Ok(spec)
    }

    pub fn to_constraint(
        &self,
        projects: &BTreeMap<String, String>,
    ) -> miette::Result<DependencyConstraint> {
        let module = match self.target(projects)? {
            DependencyTarget::Module(module) => module,
            DependencyTarget::Project { id, .. } => id.module(),
        };
        Ok(DependencyConstraint {
            module,
            constraint: self.constraint(),
            attributes: self.attributes.clone(),
            reason: self.reason.clone(),
        })
    }
}

/// What a declaration points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyTarget {
    Module(ModuleId),
    /// Another project of the same build, already mapped to coordinates.
    Project { name: String, id: ModuleVersionId },
}

/// Resolution strategy hooks from `[resolution]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolutionDecl {
    /// Forced versions, as `group:module:version`.
    #[serde(default)]
    pub force: Vec<String>,
    #[serde(default)]
    pub substitute: Vec<SubstituteDecl>,
    #[serde(default, rename = "use-version")]
    pub use_version: Vec<UseVersionDecl>,
    #[serde(default)]
    pub capability: Vec<CapabilityRuleDecl>,
    #[serde(default)]
    pub subgraph: Vec<SubgraphRuleDecl>,
}

/// `[[resolution.substitute]]`: replace `from` with `to`, where `to` may
/// carry a version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubstituteDecl {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// `[[resolution.use-version]]`: override the version of every request for `module`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UseVersionDecl {
    pub module: String,
    pub version: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// `[[resolution.capability]]`: pick `prefer` among the providers of `capability`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityRuleDecl {
    pub capability: String,
    pub prefer: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// `[[resolution.subgraph]]`: every dependency of `module` becomes `forSubgraph`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubgraphRuleDecl {
    pub module: String,
}

/// Per-attribute matching rules from `[schema.<attribute>]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttributeSchemaDecl {
    #[serde(default)]
    pub compatibility: Option<CompatibilityKind>,
    #[serde(default)]
    pub disambiguation: Option<DisambiguationKind>,
    /// Preferred value for `disambiguation = "prefer"`.
    #[serde(default)]
    pub value: Option<AttributeValue>,
    /// Ordered values, lowest first, for the `ordered` rules.
    #[serde(default)]
    pub values: Vec<AttributeValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompatibilityKind {
    Equal,
    AtMost,
    Ordered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisambiguationKind {
    Highest,
    Lowest,
    Prefer,
    Ordered,
}

/// A published variant from `[[variants]]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantDecl {
    pub name: String,
    #[serde(default)]
    pub attributes: AttributeContainer,
    #[serde(default)]
    pub files: Vec<FileDecl>,
    /// Capabilities as `group:name[:version]`.
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Copy the project's root dependencies and constraints into this variant.
    #[serde(default, rename = "inherit-dependencies")]
    pub inherit_dependencies: bool,
    #[serde(default)]
    pub dependencies: Vec<DependencyDecl>,
    #[serde(default)]
    pub constraints: Vec<DependencyDecl>,
    /// Excludes applied to every transitive dependency of this variant.
    #[serde(default)]
    pub excludes: Vec<String>,
    /// Coordinates of the module hosting this variant.
    #[serde(default, rename = "available-at")]
    pub available_at: Option<String>,
}

impl VariantDecl {
    pub fn capabilities(&self) -> miette::Result<Vec<Capability>> {
        self.capabilities
            .iter()
            .map(|c| {
                Capability::parse(c)
                    .ok_or_else(|| manifest_error(format!("Invalid capability '{c}'")))
            })
            .collect()
    }

    pub fn exclude_rules(&self) -> miette::Result<Vec<ExcludeRule>> {
        parse_excludes(&self.excludes)
    }

    pub fn available_at(&self) -> miette::Result<Option<ModuleVersionId>> {
        self.available_at
            .as_deref()
            .map(|coords| {
                ModuleVersionId::parse(coords).ok_or_else(|| {
                    manifest_error(format!(
                        "Invalid available-at coordinates '{coords}' in variant '{}'",
                        self.name
                    ))
                })
            })
            .transpose()
    }
}

/// An artifact of a published variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDecl {
    /// Path relative to the manifest directory.
    pub path: PathBuf,
    /// Published file name; defaults to the path's file name.
    #[serde(default)]
    pub name: Option<String>,
    /// Location relative to the module document; defaults to the name.
    #[serde(default)]
    pub url: Option<String>,
}

impl Manifest {
    /// Load and parse a `Modgraph.toml` file from the given path.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        tracing::debug!("Loading manifest from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| ModgraphError::Manifest {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        Self::from_str(&content)
    }

    /// Parse a `Modgraph.toml` from a string.
    pub fn from_str(content: &str) -> miette::Result<Self> {
        toml::from_str(content).map_err(|e| {
            ModgraphError::Manifest {
                message: format!("Failed to parse Modgraph.toml: {e}"),
            }
            .into()
        })
    }

    /// The root dependencies of a resolution.
    pub fn root_dependencies(&self) -> miette::Result<Vec<DependencySpec>> {
        self.dependencies
            .iter()
            .map(|d| d.to_spec(&self.projects))
            .collect()
    }

    /// The root dependency constraints of a resolution.
    pub fn root_constraints(&self) -> miette::Result<Vec<DependencyConstraint>> {
        self.constraints
            .iter()
            .map(|c| c.to_constraint(&self.projects))
            .collect()
    }

    /// The owning component's coordinates, if this component is hosted by another.
    pub fn owner(&self) -> miette::Result<Option<ModuleVersionId>> {
        self.component
            .owner
            .as_deref()
            .map(|coords| {
                ModuleVersionId::parse(coords)
                    .ok_or_else(|| manifest_error(format!("Invalid owner coordinates '{coords}'")))
            })
            .transpose()
    }
}

fn parse_excludes(raw: &[String]) -> miette::Result<Vec<ExcludeRule>> {
    raw.iter()
        .map(|e| {
            ExcludeRule::parse(e).ok_or_else(|| manifest_error(format!("Invalid exclude '{e}'")))
        })
        .collect()
}

fn manifest_error(message: String) -> miette::Report {
    ModgraphError::Manifest { message }.into()
}
