//! Version conflict resolution and conflict reporting.
//!
//! Precedence, highest first: a forced version, a version pinned by a
//! resolve rule, then comparison of the remaining requests. Requests
//! covered by an ancestor's subgraph constraint take no part in the
//! comparison; they are satisfied by whatever the ancestor's own request
//! resolves to.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use modgraph_core::constraint::VersionConstraint;
use modgraph_core::module::ModuleId;
use modgraph_util::errors::ModgraphError;

use crate::graph::{ResolvedGraph, SelectionReason};
use crate::version::{compare, VersionSelector};

/// One edge's version request for a module, after the rule chain ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRequest {
    /// Coordinates of the requesting node, for error messages.
    pub requested_by: String,
    pub constraint: VersionConstraint,
    pub forced: bool,
    /// Version pinned by a resolve rule, with the rule's description.
    pub pinned: Option<(String, String)>,
    /// Subgraph constraint inherited from an ancestor of the requesting node.
    pub inherited: Option<VersionConstraint>,
    /// Whether the edge is a dependency constraint rather than a dependency.
    pub is_constraint: bool,
}

impl VersionRequest {
    pub fn new(requested_by: impl Into<String>, constraint: VersionConstraint) -> Self {
        Self {
            requested_by: requested_by.into(),
            constraint,
            forced: false,
            pinned: None,
            inherited: None,
            is_constraint: false,
        }
    }
}

/// How the winning version was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cause {
    Forced,
    Rule(String),
    Compared,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedVersion {
    pub version: String,
    pub cause: Cause,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Selected(SelectedVersion),
    /// A dynamic selector needs the module's version listing first.
    NeedsListing,
}

/// Pick the version of `module` from every request made for it.
pub fn select_version(
    module: &ModuleId,
    requests: &[&VersionRequest],
    forced: Option<&str>,
    listing: Option<&[String]>,
) -> Result<Decision, ModgraphError> {
    if let Some(version) = forced {
        return settle(module, version, Cause::Forced, listing);
    }
    let forced_by_edges: Vec<&str> = requests
        .iter()
        .filter(|r| r.forced)
        .filter_map(|r| r.constraint.requested_version())
        .collect();
    if let Some(decision) = settle_highest(module, &forced_by_edges, |_| Cause::Forced, listing)? {
        return Ok(decision);
    }
    let pinned: Vec<&(String, String)> = requests.iter().filter_map(|r| r.pinned.as_ref()).collect();
    let pinned_versions: Vec<&str> = pinned.iter().map(|(v, _)| v.as_str()).collect();
    let rule = |i: usize| Cause::Rule(pinned[i].1.clone());
    if let Some(decision) = settle_highest(module, &pinned_versions, rule, listing)? {
        return Ok(decision);
    }

    let mut constraints: Vec<&VersionConstraint> = requests
        .iter()
        .filter(|r| r.inherited.is_none())
        .map(|r| &r.constraint)
        .collect();
    if constraints.is_empty() {
        constraints = requests.iter().filter_map(|r| r.inherited.as_ref()).collect();
    }

    let rejected: BTreeSet<&str> = requests
        .iter()
        .flat_map(|r| r.constraint.rejects.iter().chain(r.inherited.iter().flat_map(|c| &c.rejects)))
        .map(String::as_str)
        .collect();
    let reject_selectors: Vec<VersionSelector> =
        rejected.iter().map(|r| VersionSelector::parse(r)).collect();
    let is_rejected = |v: &str| reject_selectors.iter().any(|s| s.accepts(v));

    let hard: Vec<&str> = constraints
        .iter()
        .filter_map(|c| c.required.as_deref().or(c.strict.as_deref()))
        .collect();
    let soft: Vec<&str> = constraints
        .iter()
        .filter_map(|c| c.preferred.as_deref())
        .collect();
    let requested: BTreeSet<&str> = (if hard.is_empty() { soft } else { hard })
        .into_iter()
        .collect();

    let mut candidates = Vec::new();
    for &raw in &requested {
        let selector = VersionSelector::parse(raw);
        if !selector.is_dynamic() {
            if !is_rejected(raw) {
                candidates.push(raw.to_string());
            }
            continue;
        }
        let Some(listing) = listing else {
            return Ok(Decision::NeedsListing);
        };
        if let Some(v) = selector.best_match(listing, &is_rejected) {
            candidates.push(v.to_string());
        }
    }

    if candidates.is_empty() {
        return Err(ModgraphError::NoVersionSatisfiesConstraints {
            module: module.to_string(),
            requested: requested.iter().map(|s| s.to_string()).collect(),
            rejected: rejected.iter().map(|s| s.to_string()).collect(),
        });
    }

    let strict: Vec<(&VersionRequest, VersionSelector)> = requests
        .iter()
        .filter(|r| r.inherited.is_none())
        .filter_map(|r| Some((*r, VersionSelector::parse(r.constraint.strict.as_deref()?))))
        .collect();
    let best = highest(candidates.iter().map(String::as_str)).map(str::to_string);
    candidates.retain(|v| strict.iter().all(|(_, s)| s.accepts(v)));

    match highest(candidates.iter().map(String::as_str)) {
        Some(version) => Ok(selected(version, Cause::Compared)),
        None => Err(ModgraphError::VersionConflict {
            module: module.to_string(),
            selected: best.unwrap_or_default(),
            strict: strict
                .iter()
                .map(|(r, _)| {
                    format!(
                        "{} requires strictly {}",
                        r.requested_by,
                        r.constraint.strict.as_deref().unwrap_or_default()
                    )
                })
                .collect(),
        }),
    }
}

/// Turn a forced or pinned version into a decision. Dynamic selectors are
/// matched against the listing.
fn settle(
    module: &ModuleId,
    raw: &str,
    cause: Cause,
    listing: Option<&[String]>,
) -> Result<Decision, ModgraphError> {
    let selector = VersionSelector::parse(raw);
    if !selector.is_dynamic() {
        return Ok(selected(raw, cause));
    }
    let Some(listing) = listing else {
        return Ok(Decision::NeedsListing);
    };
    match selector.best_match(listing, |_| false) {
        Some(version) => Ok(selected(version, cause)),
        None => Err(ModgraphError::NoVersionSatisfiesConstraints {
            module: module.to_string(),
            requested: vec![raw.to_string()],
            rejected: Vec::new(),
        }),
    }
}

/// Settle every version in `raw` and keep the highest; `None` when there is
/// nothing to settle.
fn settle_highest(
    module: &ModuleId,
    raw: &[&str],
    cause: impl Fn(usize) -> Cause,
    listing: Option<&[String]>,
) -> Result<Option<Decision>, ModgraphError> {
    let mut best: Option<SelectedVersion> = None;
    for (i, version) in raw.iter().enumerate() {
        match settle(module, version, cause(i), listing)? {
            Decision::NeedsListing => return Ok(Some(Decision::NeedsListing)),
            Decision::Selected(settled) => {
                let higher = best
                    .as_ref()
                    .is_none_or(|b| compare(&settled.version, &b.version) == Ordering::Greater);
                if higher {
                    best = Some(settled);
                }
            }
        }
    }
    Ok(best.map(Decision::Selected))
}

fn selected(version: &str, cause: Cause) -> Decision {
    Decision::Selected(SelectedVersion {
        version: version.to_string(),
        cause,
    })
}

fn highest<'a>(versions: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    versions.max_by(|a, b| compare(a, b))
}

/// Whether `constraint` is satisfied by `version`.
pub fn accepts(constraint: &VersionConstraint, version: &str) -> bool {
    let requested = constraint
        .requested_version()
        .is_none_or(|r| VersionSelector::parse(r).accepts(version));
    requested
        && !constraint
            .rejects
            .iter()
            .any(|r| VersionSelector::parse(r).accepts(version))
}

/// The reason recorded on one edge once its module's version is known.
pub fn edge_reason(request: &VersionRequest, selected: &SelectedVersion) -> SelectionReason {
    match &selected.cause {
        Cause::Forced => SelectionReason::Forced,
        Cause::Rule(description) => SelectionReason::SelectedByRule(description.clone()),
        Cause::Compared if request.is_constraint => SelectionReason::ByConstraint,
        Cause::Compared => match &request.inherited {
            Some(c) if accepts(c, &selected.version) => SelectionReason::ByAncestor,
            _ => SelectionReason::ByRequest,
        },
    }
}

/// A report of every request that did not get the version it asked for.
#[derive(Debug, Default)]
pub struct ConflictReport {
    pub conflicts: Vec<VersionConflict>,
}

/// A module requested at one version but resolved to another.
#[derive(Debug, Clone)]
pub struct VersionConflict {
    pub module: ModuleId,
    pub requested: String,
    pub resolved: String,
    pub reason: String,
}

impl ConflictReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the disagreeing requests of a resolved graph.
    pub fn from_graph(graph: &ResolvedGraph) -> Self {
        let mut report = Self::new();
        let mut seen = BTreeSet::new();
        for node in graph.all_nodes() {
            for (_, edge) in graph.incoming(&node.key()) {
                let Some(requested) = edge.requested.requested_version() else {
                    continue;
                };
                if requested == node.id.version || !seen.insert((node.key(), requested.to_string()))
                {
                    continue;
                }
                let reason = edge
                    .reasons
                    .iter()
                    .map(|r| r.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                report.add(VersionConflict {
                    module: node.key(),
                    requested: requested.to_string(),
                    resolved: node.id.version.clone(),
                    reason,
                });
            }
        }
        report
    }

    pub fn add(&mut self, conflict: VersionConflict) {
        self.conflicts.push(conflict);
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conflicts.is_empty() {
            return write!(f, "No version conflicts.");
        }
        writeln!(f, "Version conflicts ({}):", self.conflicts.len())?;
        for c in &self.conflicts {
            writeln!(f, "  {c}")?;
        }
        Ok(())
    }
}

impl fmt::Display for VersionConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} requested {} but resolved {} ({})",
            self.module, self.requested, self.resolved, self.reason
        )
    }
}
