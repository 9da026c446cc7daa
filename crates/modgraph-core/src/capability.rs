use std::fmt;

use serde::{Deserialize, Serialize};

use crate::module::ModuleId;

/// A `(group, name, version)` identity a variant claims to provide.
///
/// Identity for conflict detection ignores the version; see [`CapabilityId`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Capability {
    pub group: String,
    pub name: String,
    pub version: Option<String>,
}

impl Capability {
    pub fn new(
        group: impl Into<String>,
        name: impl Into<String>,
        version: Option<String>,
    ) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            version,
        }
    }

    /// The capability every component provides implicitly: its own coordinates.
    pub fn implicit(module: &ModuleId, version: &str) -> Self {
        Self::new(
            module.group.clone(),
            module.name.clone(),
            Some(version.to_string()),
        )
    }

    /// Parse `"group:name"` or `"group:name:version"`.
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [g, n] if !g.is_empty() && !n.is_empty() => Some(Self::new(*g, *n, None)),
            [g, n, v] if !g.is_empty() && !n.is_empty() && !v.is_empty() => {
                Some(Self::new(*g, *n, Some(v.to_string())))
            }
            _ => None,
        }
    }

    pub fn id(&self) -> CapabilityId {
        CapabilityId {
            group: self.group.clone(),
            name: self.name.clone(),
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{}:{}:{v}", self.group, self.name),
            None => write!(f, "{}:{}", self.group, self.name),
        }
    }
}

/// Versionless capability identity used to detect mutually exclusive providers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CapabilityId {
    pub group: String,
    pub name: String,
}

impl CapabilityId {
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        ModuleId::parse(s).map(|m| Self::new(m.group, m.name))
    }

    /// Whether this identity is the implicit capability of `module`.
    pub fn is_implicit_for(&self, module: &ModuleId) -> bool {
        self.group == module.group && self.name == module.name
    }
}

impl fmt::Display for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.name)
    }
}

/// The capabilities a variant of `module` effectively provides.
///
/// A variant that declares nothing provides only the implicit capability.
pub fn effective_capabilities(
    module: &ModuleId,
    version: &str,
    declared: &[Capability],
) -> Vec<Capability> {
    if declared.is_empty() {
        vec![Capability::implicit(module, version)]
    } else {
        declared.to_vec()
    }
}
