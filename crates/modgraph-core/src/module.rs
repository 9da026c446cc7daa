//! Module coordinates and exclude rules.

use std::fmt;

/// A module identity without a version: `group:name`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleId {
    pub group: String,
    pub name: String,
}

impl ModuleId {
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
        }
    }

    /// Parse `"group:name"`.
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [group, name] if !group.is_empty() && !name.is_empty() => {
                Some(Self::new(*group, *name))
            }
            _ => None,
        }
    }

    /// Attach a version to this module.
    pub fn with_version(&self, version: impl Into<String>) -> ModuleVersionId {
        ModuleVersionId {
            group: self.group.clone(),
            name: self.name.clone(),
            version: version.into(),
        }
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.name)
    }
}

/// Fully qualified module coordinates: `group:name:version`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleVersionId {
    pub group: String,
    pub name: String,
    pub version: String,
}

impl ModuleVersionId {
    pub fn new(
        group: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            version: version.into(),
        }
    }

    /// Parse `"group:name:version"` into coordinates.
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [group, name, version]
                if !group.is_empty() && !name.is_empty() && !version.is_empty() =>
            {
                Some(Self::new(*group, *name, *version))
            }
            _ => None,
        }
    }

    /// The versionless module identity.
    pub fn module(&self) -> ModuleId {
        ModuleId::new(self.group.clone(), self.name.clone())
    }
}

impl fmt::Display for ModuleVersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.version)
    }
}

/// Excludes transitive modules from a dependency's subgraph.
///
/// `None` on either side is the `*` wildcard. A non-transitive dependency is
/// the single rule [`ExcludeRule::all`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExcludeRule {
    pub group: Option<String>,
    pub module: Option<String>,
}

impl ExcludeRule {
    pub const WILDCARD: &'static str = "*";

    pub fn new(group: Option<String>, module: Option<String>) -> Self {
        Self { group, module }
    }

    /// The universal `(*, *)` rule.
    pub fn all() -> Self {
        Self {
            group: None,
            module: None,
        }
    }

    /// Parse `"group:module"`, where either side may be `*`, or a bare `"group"`.
    pub fn parse(s: &str) -> Option<Self> {
        let wildcard = |part: &str| {
            if part == Self::WILDCARD {
                None
            } else {
                Some(part.to_string())
            }
        };
        match s.split_once(':') {
            Some((group, module)) if !group.is_empty() && !module.is_empty() => {
                Some(Self::new(wildcard(group), wildcard(module)))
            }
            None if !s.is_empty() => Some(Self::new(wildcard(s), None)),
            _ => None,
        }
    }

    pub fn matches(&self, module: &ModuleId) -> bool {
        self.group.as_deref().is_none_or(|g| g == module.group)
            && self.module.as_deref().is_none_or(|m| m == module.name)
    }

    pub fn group_or_wildcard(&self) -> &str {
        self.group.as_deref().unwrap_or(Self::WILDCARD)
    }

    pub fn module_or_wildcard(&self) -> &str {
        self.module.as_deref().unwrap_or(Self::WILDCARD)
    }
}

impl fmt::Display for ExcludeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_or_wildcard(), self.module_or_wildcard())
    }
}
