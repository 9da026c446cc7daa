use std::fmt;

/// A version requirement on a module.
///
/// `strict` implies `required` and `required` implies `preferred`: the
/// defining version of a constraint is the first one present in that order
/// (see [`VersionConstraint::requested_version`]). `rejects` holds version
/// selectors that are removed from the candidate pool. `for_subgraph` makes
/// the constraint binding for every node below the one that declares it.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionConstraint {
    pub preferred: Option<String>,
    pub required: Option<String>,
    pub strict: Option<String>,
    pub rejects: Vec<String>,
    pub for_subgraph: bool,
}

impl VersionConstraint {
    /// The empty constraint. Written dependencies carrying it have no
    /// `version` object.
    pub fn none() -> Self {
        Self::default()
    }

    /// A plain `requires` constraint.
    pub fn require(version: impl Into<String>) -> Self {
        Self {
            required: Some(version.into()),
            ..Self::default()
        }
    }

    /// A soft `prefers` constraint.
    pub fn prefer(version: impl Into<String>) -> Self {
        Self {
            preferred: Some(version.into()),
            ..Self::default()
        }
    }

    /// A `strictly` constraint. Also sets the required version.
    pub fn strictly(version: impl Into<String>) -> Self {
        let version = version.into();
        Self {
            required: Some(version.clone()),
            strict: Some(version),
            ..Self::default()
        }
    }

    /// Builder-style reject.
    pub fn reject(mut self, selector: impl Into<String>) -> Self {
        self.rejects.push(selector.into());
        self
    }

    /// Builder-style `forSubgraph` marker.
    pub fn subgraph(mut self) -> Self {
        self.for_subgraph = true;
        self
    }

    pub fn with_preferred(mut self, version: impl Into<String>) -> Self {
        self.preferred = Some(version.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.preferred.is_none()
            && self.required.is_none()
            && self.strict.is_none()
            && self.rejects.is_empty()
            && !self.for_subgraph
    }

    pub fn is_strict(&self) -> bool {
        self.strict.is_some()
    }

    /// Whether this constraint requires a version, as opposed to only
    /// preferring or rejecting one.
    pub fn is_required(&self) -> bool {
        self.strict.is_some() || self.required.is_some()
    }

    /// The defining version: strict, then required, then preferred.
    pub fn requested_version(&self) -> Option<&str> {
        self.strict
            .as_deref()
            .or(self.required.as_deref())
            .or(self.preferred.as_deref())
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(s) = &self.strict {
            parts.push(format!("strictly {s}"));
        } else if let Some(r) = &self.required {
            parts.push(r.clone());
        }
        if let Some(p) = &self.preferred {
            parts.push(format!("prefer {p}"));
        }
        if !self.rejects.is_empty() {
            parts.push(format!("reject {}", self.rejects.join(" | ")));
        }
        if self.for_subgraph {
            parts.push("for subgraph".to_string());
        }
        if parts.is_empty() {
            f.write_str("<any>")
        } else {
            f.write_str(&parts.join(", "))
        }
    }
}
