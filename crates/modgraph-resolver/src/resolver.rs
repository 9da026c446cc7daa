//! The resolution driver.
//!
//! Resolution runs in passes. A pass walks the graph breadth-first from the
//! root using the versions selected so far, records every edge it meets and
//! then runs conflict resolution for every reached module. Metadata the next
//! pass needs is fetched concurrently between passes. The graph is built
//! from the first pass that changes no selection and fetches nothing.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

use modgraph_core::attribute::AttributeContainer;
use modgraph_core::capability::{Capability, CapabilityId};
use modgraph_core::config::ResolutionConfig;
use modgraph_core::constraint::VersionConstraint;
use modgraph_core::dependency::{DependencyConstraint, DependencySpec};
use modgraph_core::module::{ExcludeRule, ModuleId, ModuleVersionId};
use modgraph_core::variant::{FileRef, ModuleData, VariantSource};
use modgraph_util::errors::{ModgraphError, ModgraphResult};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::cache::FetchCache;
use crate::cancel::CancellationFlag;
use crate::conflict::{
    edge_reason, select_version, ConflictReport, Decision, SelectedVersion, VersionRequest,
};
use crate::graph::{GraphEdge, GraphNode, ResolvedGraph, SelectionReason};
use crate::provider::MetadataProvider;
use crate::rules::{ResolutionRules, RuledRequest};
use crate::schema::AttributeSchema;
use crate::selector::{select_shared_variant, Selection, VariantRequest};

/// The root of a resolution and what it asks for.
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    pub root: ModuleVersionId,
    /// Consumer attributes used to select every variant in the graph.
    pub attributes: AttributeContainer,
    pub dependencies: Vec<DependencySpec>,
    pub constraints: Vec<DependencyConstraint>,
}

impl ResolveRequest {
    pub fn new(root: ModuleVersionId) -> Self {
        Self {
            root,
            attributes: AttributeContainer::new(),
            dependencies: Vec::new(),
            constraints: Vec::new(),
        }
    }

    pub fn with_attributes(mut self, attributes: AttributeContainer) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_dependency(mut self, dependency: DependencySpec) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn with_constraint(mut self, constraint: DependencyConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Maximum concurrent metadata fetches.
    pub jobs: usize,
    /// Passes allowed before resolution gives up.
    pub max_passes: usize,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            jobs: 8,
            max_passes: 64,
        }
    }
}

impl From<&ResolutionConfig> for ResolverOptions {
    fn from(config: &ResolutionConfig) -> Self {
        Self {
            jobs: config.jobs,
            max_passes: config.max_passes,
        }
    }
}

/// The output of a successful resolution.
#[derive(Debug)]
pub struct Resolution {
    pub graph: ResolvedGraph,
    pub conflicts: ConflictReport,
    /// Number of passes the driver ran.
    pub passes: usize,
}

/// Resolves dependency graphs against one metadata provider.
pub struct Resolver {
    provider: Arc<dyn MetadataProvider>,
    schema: AttributeSchema,
    rules: ResolutionRules,
    options: ResolverOptions,
    cancellation: CancellationFlag,
}

impl Resolver {
    pub fn new(provider: Arc<dyn MetadataProvider>) -> Self {
        Self {
            provider,
            schema: AttributeSchema::standard(),
            rules: ResolutionRules::default(),
            options: ResolverOptions::default(),
            cancellation: CancellationFlag::new(),
        }
    }

    pub fn with_schema(mut self, schema: AttributeSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_rules(mut self, rules: ResolutionRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_options(mut self, options: ResolverOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancellation = flag;
        self
    }

    /// Resolve the graph rooted at `request`.
    ///
    /// Fails as a whole: no partial graph is returned alongside an error.
    pub async fn resolve(&self, request: &ResolveRequest) -> ModgraphResult<Resolution> {
        let mut cache = FetchCache::new();
        let mut selections: BTreeMap<ModuleId, SelectedVersion> = BTreeMap::new();
        let mut redirects: BTreeMap<ModuleId, (ModuleId, String)> = BTreeMap::new();
        let mut passes = 0;

        loop {
            self.check_cancelled()?;
            passes += 1;
            if passes > self.options.max_passes {
                return Err(ModgraphError::Resolution {
                    message: format!(
                        "no stable graph after {} passes",
                        self.options.max_passes
                    ),
                }
                .into());
            }

            let mut pass = self.traverse(request, &selections, &cache, &redirects)?;
            let mut decided = decide(&pass, &self.rules, &cache);

            let fetches: Vec<ModuleVersionId> = decided
                .selections
                .iter()
                .map(|(module, selected)| module.with_version(&selected.version))
                .filter(|id| !cache.is_fetched(id))
                .collect();
            let listings: Vec<ModuleId> = decided
                .needs_listing
                .iter()
                .filter(|m| cache.listing(m).is_none())
                .cloned()
                .collect();
            debug!(
                pass = passes,
                nodes = pass.order.len(),
                edges = pass.edges.len(),
                fetches = fetches.len(),
                listings = listings.len(),
                "resolution pass"
            );

            let stable =
                decided.selections == selections && fetches.is_empty() && listings.is_empty();
            selections = std::mem::take(&mut decided.selections);
            if !stable {
                self.fetch_all(fetches, listings, &mut cache).await?;
                continue;
            }

            if let Some(err) = take_failure(&mut pass, &mut decided.errors) {
                return Err(err.into());
            }

            let new_redirects = self.capability_redirects(&pass)?;
            if !new_redirects.is_empty() {
                for (loser, (winner, description)) in &new_redirects {
                    debug!(%loser, %winner, %description, "capability conflict resolved by rule");
                }
                redirects.extend(new_redirects);
                continue;
            }

            let graph = build_graph(request, &pass, &selections);
            let conflicts = ConflictReport::from_graph(&graph);
            info!(
                root = %request.root,
                modules = graph.len(),
                conflicts = conflicts.len(),
                passes,
                fetched = cache.len(),
                "resolution complete"
            );
            return Ok(Resolution {
                graph,
                conflicts,
                passes,
            });
        }
    }

    fn check_cancelled(&self) -> Result<(), ModgraphError> {
        if self.cancellation.is_cancelled() {
            return Err(ModgraphError::Cancelled);
        }
        Ok(())
    }

    /// Run the rule chain, then any capability redirect, over one request.
    fn apply_rules(
        &self,
        module: &ModuleId,
        constraint: &VersionConstraint,
        redirects: &BTreeMap<ModuleId, (ModuleId, String)>,
    ) -> RuledRequest {
        let mut ruled = self.rules.apply(module, constraint);
        if let Some((winner, description)) = redirects.get(&ruled.module) {
            ruled.module = winner.clone();
            ruled.constraint = VersionConstraint {
                for_subgraph: ruled.constraint.for_subgraph,
                ..VersionConstraint::none()
            };
            ruled.pinned = None;
            ruled.substitution = Some(description.clone());
        }
        ruled
    }

    /// Walk the graph from the root with the current selections.
    fn traverse(
        &self,
        request: &ResolveRequest,
        selections: &BTreeMap<ModuleId, SelectedVersion>,
        cache: &FetchCache,
        redirects: &BTreeMap<ModuleId, (ModuleId, String)>,
    ) -> Result<Pass, ModgraphError> {
        let root = request.root.module();
        let mut pass = Pass::default();
        pass.nodes.insert(
            root.clone(),
            NodeState {
                excludes: vec![BTreeSet::new()],
                inherited: BTreeMap::new(),
                asks: vec![Ask::default()],
            },
        );
        let mut queue = VecDeque::from([root.clone()]);

        while let Some(module) = queue.pop_front() {
            self.check_cancelled()?;

            let (requested_by, dependencies, constraints) = if module == root {
                (
                    request.root.to_string(),
                    request.dependencies.clone(),
                    request.constraints.clone(),
                )
            } else {
                let Some(selected) = selections.get(&module) else {
                    continue;
                };
                let id = module.with_version(&selected.version);
                let data = match cache.module(&id) {
                    None => continue,
                    Some(None) => {
                        pass.outcomes.insert(module.clone(), Outcome::Missing(id));
                        continue;
                    }
                    Some(Some(data)) => Arc::clone(data),
                };
                let Some(asks) = pass.nodes.get(&module).map(|n| n.asks.clone()) else {
                    continue;
                };
                if !pass.outcomes.contains_key(&module) {
                    let outcome = self.select_outcome(&data, &asks);
                    pass.outcomes.insert(module.clone(), outcome);
                }
                let (dependencies, constraints) = match pass.outcomes.get(&module) {
                    Some(Outcome::Selected(selected)) => declarations(&data, selected, &asks),
                    _ => continue,
                };
                pass.truncate(&module, dependencies.len(), constraints.len());
                (id.to_string(), dependencies, constraints)
            };

            self.expand(
                &mut pass,
                &mut queue,
                &module,
                &root,
                &request.attributes,
                &requested_by,
                &dependencies,
                &constraints,
                redirects,
            );
        }
        Ok(pass)
    }

    /// Record the edges of one node and push its state to its targets.
    #[allow(clippy::too_many_arguments)]
    fn expand(
        &self,
        pass: &mut Pass,
        queue: &mut VecDeque<ModuleId>,
        module: &ModuleId,
        root: &ModuleId,
        consumer: &AttributeContainer,
        requested_by: &str,
        dependencies: &[DependencySpec],
        constraints: &[DependencyConstraint],
        redirects: &BTreeMap<ModuleId, (ModuleId, String)>,
    ) {
        let Some(node) = pass.nodes.get(module).cloned() else {
            return;
        };

        let ruled_dependencies: Vec<Option<RuledRequest>> = dependencies
            .iter()
            .map(|dep| {
                let ruled = self.apply_rules(&dep.module, &dep.constraint, redirects);
                (!node.excludes(&dep.module) && !node.excludes(&ruled.module)).then_some(ruled)
            })
            .collect();
        let ruled_constraints: Vec<RuledRequest> = constraints
            .iter()
            .map(|c| self.apply_rules(&c.module, &c.constraint, redirects))
            .collect();

        // Subgraph constraints visible below this node: the ones inherited
        // from ancestors, then this node's own.
        let mut passed_down = node.inherited.clone();
        for ruled in ruled_dependencies.iter().flatten().chain(&ruled_constraints) {
            if ruled.constraint.for_subgraph {
                passed_down
                    .entry(ruled.module.clone())
                    .or_insert_with(|| ruled.constraint.clone());
            }
        }

        for (i, (dep, ruled)) in dependencies.iter().zip(ruled_dependencies).enumerate() {
            let Some(ruled) = ruled else {
                continue;
            };
            let target = ruled.module.clone();
            let mut version_request = VersionRequest::new(requested_by, ruled.constraint);
            version_request.forced = dep.force;
            version_request.pinned = ruled.pinned;
            version_request.inherited = node.inherited.get(&target).cloned();
            pass.record(
                (module.clone(), false, i),
                Edge {
                    from: module.clone(),
                    to: target.clone(),
                    request: version_request,
                    substitution: ruled.substitution,
                },
            );
            if target == *root {
                continue;
            }

            let edge_excludes = dep.effective_excludes();
            let excludes: Vec<BTreeSet<ExcludeRule>> = node
                .excludes
                .iter()
                .map(|set| set.union(&edge_excludes).cloned().collect())
                .collect();
            let ask = Ask {
                attributes: consumer.merged(&dep.attributes),
                capabilities: dep.requested_capabilities.clone(),
                target_variant: dep.target_variant.clone(),
            };
            match pass.nodes.get_mut(&target) {
                Some(existing) => {
                    // A new variant request invalidates the selection made so far.
                    let asked = !existing.asks.contains(&ask);
                    if asked {
                        existing.asks.push(ask);
                        pass.outcomes.remove(&target);
                    }
                    if existing.merge(excludes, &passed_down) || asked {
                        queue.push_back(target);
                    }
                }
                None => {
                    pass.nodes.insert(
                        target.clone(),
                        NodeState {
                            excludes: normalize(excludes),
                            inherited: passed_down.clone(),
                            asks: vec![ask],
                        },
                    );
                    pass.order.push(target.clone());
                    queue.push_back(target);
                }
            }
        }

        for (j, ruled) in ruled_constraints.into_iter().enumerate() {
            if ruled.module == *root {
                continue;
            }
            let mut version_request = VersionRequest::new(requested_by, ruled.constraint);
            version_request.pinned = ruled.pinned;
            version_request.inherited = node.inherited.get(&ruled.module).cloned();
            version_request.is_constraint = true;
            pass.record(
                (module.clone(), true, j),
                Edge {
                    from: module.clone(),
                    to: ruled.module,
                    request: version_request,
                    substitution: ruled.substitution,
                },
            );
        }
    }

    fn select_outcome(&self, data: &ModuleData, asks: &[Ask]) -> Outcome {
        let requests: Vec<VariantRequest<'_>> = asks
            .iter()
            .map(|ask| VariantRequest {
                attributes: &ask.attributes,
                target_variant: ask.target_variant.as_deref(),
                requested_capabilities: &ask.capabilities,
            })
            .collect();
        let module = data.id.module();
        match select_shared_variant(data, &requests, &self.schema) {
            Ok(Selection::Variant(variant)) => Outcome::Selected(SelectedNode {
                version: data.id.version.clone(),
                variant: Some(variant.name.clone()),
                attributes: variant.attributes.clone(),
                capabilities: variant.provided_capabilities(&module, &data.id.version),
                files: variant.files().to_vec(),
                available_at: match &variant.source {
                    VariantSource::AvailableAt(target) => Some(target.clone()),
                    VariantSource::Local(_) => None,
                },
            }),
            Ok(Selection::Artifacts(files)) => Outcome::Selected(SelectedNode {
                version: data.id.version.clone(),
                variant: None,
                attributes: AttributeContainer::new(),
                capabilities: vec![Capability::implicit(&module, &data.id.version)],
                files: files.to_vec(),
                available_at: None,
            }),
            Err(err) => Outcome::Failed(err),
        }
    }

    /// Losing providers of each capability claimed by several modules,
    /// mapped to the module a capability rule prefers.
    fn capability_redirects(
        &self,
        pass: &Pass,
    ) -> Result<BTreeMap<ModuleId, (ModuleId, String)>, ModgraphError> {
        let mut providers: BTreeMap<CapabilityId, BTreeMap<ModuleId, String>> = BTreeMap::new();
        for module in &pass.order {
            if let Some(Outcome::Selected(selected)) = pass.outcomes.get(module) {
                let coordinates = module.with_version(&selected.version).to_string();
                for capability in &selected.capabilities {
                    providers
                        .entry(capability.id())
                        .or_default()
                        .insert(module.clone(), coordinates.clone());
                }
            }
        }

        let mut redirects = BTreeMap::new();
        for (capability, modules) in &providers {
            if modules.len() < 2 {
                continue;
            }
            let rule = self
                .rules
                .capability_rule(capability)
                .filter(|rule| modules.contains_key(&rule.prefer));
            let Some(rule) = rule else {
                return Err(ModgraphError::CapabilityConflict {
                    capability: capability.to_string(),
                    providers: modules.values().cloned().collect(),
                });
            };
            for loser in modules.keys().filter(|m| **m != rule.prefer) {
                redirects.insert(loser.clone(), (rule.prefer.clone(), rule.description()));
            }
        }
        Ok(redirects)
    }

    async fn fetch_all(
        &self,
        modules: Vec<ModuleVersionId>,
        listings: Vec<ModuleId>,
        cache: &mut FetchCache,
    ) -> ModgraphResult<()> {
        let semaphore = Arc::new(Semaphore::new(self.options.jobs.max(1)));
        let mut join_set = JoinSet::new();

        for id in modules {
            let provider = Arc::clone(&self.provider);
            let sem = semaphore.clone();
            join_set.spawn(async move {
                let _permit = sem.acquire().await;
                let result = provider.fetch(&id).await;
                Fetched::Module(id, result)
            });
        }
        for module in listings {
            let provider = Arc::clone(&self.provider);
            let sem = semaphore.clone();
            join_set.spawn(async move {
                let _permit = sem.acquire().await;
                let result = provider.list_versions(&module).await;
                Fetched::Listing(module, result)
            });
        }

        // Completion order varies; results are applied in key order.
        let mut fetched_modules = BTreeMap::new();
        let mut fetched_listings = BTreeMap::new();
        while let Some(joined) = join_set.join_next().await {
            let fetched = joined.map_err(|e| ModgraphError::Resolution {
                message: format!("metadata fetch task failed: {e}"),
            })?;
            match fetched {
                Fetched::Module(id, result) => {
                    fetched_modules.insert(id, result);
                }
                Fetched::Listing(module, result) => {
                    fetched_listings.insert(module, result);
                }
            }
        }

        for (id, result) in fetched_modules {
            let data = result?.map(|mut data| {
                self.rules.rewrite_metadata(&mut data);
                data
            });
            if data.is_none() {
                debug!(module = %id, "module not found");
            }
            cache.insert_module(id, data);
        }
        for (module, result) in fetched_listings {
            cache.insert_listing(module, result?);
        }
        Ok(())
    }
}

enum Fetched {
    Module(ModuleVersionId, ModgraphResult<Option<ModuleData>>),
    Listing(ModuleId, ModgraphResult<Vec<String>>),
}

/// Variant request carried by one edge into a node.
#[derive(Debug, Clone, Default, PartialEq)]
struct Ask {
    attributes: AttributeContainer,
    capabilities: Vec<CapabilityId>,
    target_variant: Option<String>,
}

#[derive(Debug, Clone)]
struct NodeState {
    /// One exclude set per distinct path to the node. A module is excluded
    /// below the node only when every set excludes it.
    excludes: Vec<BTreeSet<ExcludeRule>>,
    /// Subgraph constraints every path to the node agrees on.
    inherited: BTreeMap<ModuleId, VersionConstraint>,
    /// Distinct variant requests of the edges into the node, first seen first.
    asks: Vec<Ask>,
}

impl NodeState {
    fn excludes(&self, module: &ModuleId) -> bool {
        self.excludes
            .iter()
            .all(|set| set.iter().any(|rule| rule.matches(module)))
    }

    /// Merge the state of another path. Returns whether anything changed.
    fn merge(
        &mut self,
        excludes: Vec<BTreeSet<ExcludeRule>>,
        inherited: &BTreeMap<ModuleId, VersionConstraint>,
    ) -> bool {
        let mut changed = false;
        if !self.excludes.iter().any(BTreeSet::is_empty) {
            if excludes.iter().any(BTreeSet::is_empty) {
                self.excludes = vec![BTreeSet::new()];
                changed = true;
            } else {
                for set in excludes {
                    if !self.excludes.contains(&set) {
                        self.excludes.push(set);
                        changed = true;
                    }
                }
            }
        }

        let before = self.inherited.len();
        self.inherited
            .retain(|module, constraint| inherited.get(module) == Some(constraint));
        changed || self.inherited.len() != before
    }
}

fn normalize(mut excludes: Vec<BTreeSet<ExcludeRule>>) -> Vec<BTreeSet<ExcludeRule>> {
    if excludes.is_empty() || excludes.iter().any(BTreeSet::is_empty) {
        return vec![BTreeSet::new()];
    }
    excludes.sort();
    excludes.dedup();
    excludes
}

/// An edge recorded during a pass.
#[derive(Debug, Clone)]
struct Edge {
    from: ModuleId,
    to: ModuleId,
    request: VersionRequest,
    /// Description of the substitution or capability rule that retargeted it.
    substitution: Option<String>,
}

#[derive(Debug, Clone)]
struct SelectedNode {
    version: String,
    variant: Option<String>,
    attributes: AttributeContainer,
    capabilities: Vec<Capability>,
    files: Vec<FileRef>,
    available_at: Option<ModuleVersionId>,
}

#[derive(Debug)]
enum Outcome {
    Selected(SelectedNode),
    Missing(ModuleVersionId),
    Failed(ModgraphError),
}

/// Everything one traversal learned about the graph.
#[derive(Debug, Default)]
struct Pass {
    nodes: BTreeMap<ModuleId, NodeState>,
    /// Reached modules in discovery order, root excluded.
    order: Vec<ModuleId>,
    edges: Vec<Edge>,
    /// Edge position by (source, is constraint, declaration index), so a
    /// re-expanded node overwrites its own edges.
    slots: BTreeMap<(ModuleId, bool, usize), usize>,
    outcomes: BTreeMap<ModuleId, Outcome>,
}

impl Pass {
    fn record(&mut self, slot: (ModuleId, bool, usize), edge: Edge) {
        match self.slots.get(&slot) {
            Some(&i) => self.edges[i] = edge,
            None => {
                self.slots.insert(slot, self.edges.len());
                self.edges.push(edge);
            }
        }
    }

    /// Drop the edges a node recorded beyond its current declarations, left
    /// over from a variant it no longer selects.
    fn truncate(&mut self, module: &ModuleId, dependencies: usize, constraints: usize) {
        let stale: BTreeSet<usize> = self
            .slots
            .iter()
            .filter(|((from, constraint, i), _)| {
                from == module && *i >= if *constraint { constraints } else { dependencies }
            })
            .map(|(_, &edge)| edge)
            .collect();
        if stale.is_empty() {
            return;
        }
        self.slots.retain(|_, edge| !stale.contains(edge));
        for edge in self.slots.values_mut() {
            let shift = stale.range(..*edge).count();
            *edge -= shift;
        }
        let mut index = 0;
        self.edges.retain(|_| {
            let keep = !stale.contains(&index);
            index += 1;
            keep
        });
    }

    fn requests_for(&self, module: &ModuleId) -> Vec<&VersionRequest> {
        self.edges
            .iter()
            .filter(|e| e.to == *module)
            .map(|e| &e.request)
            .collect()
    }

    fn requesters(&self, module: &ModuleId) -> Vec<String> {
        let mut requesters: Vec<String> = Vec::new();
        for edge in self.edges.iter().filter(|e| e.to == *module && !e.request.is_constraint) {
            if !requesters.contains(&edge.request.requested_by) {
                requesters.push(edge.request.requested_by.clone());
            }
        }
        requesters
    }
}

#[derive(Debug, Default)]
struct Decided {
    selections: BTreeMap<ModuleId, SelectedVersion>,
    errors: BTreeMap<ModuleId, ModgraphError>,
    needs_listing: Vec<ModuleId>,
}

/// Run conflict resolution for every module the pass reached.
fn decide(pass: &Pass, rules: &ResolutionRules, cache: &FetchCache) -> Decided {
    let mut decided = Decided::default();
    for module in &pass.order {
        let requests = pass.requests_for(module);
        let forced = rules.forced_version(module);
        match select_version(module, &requests, forced, cache.listing(module)) {
            Ok(Decision::Selected(selected)) => {
                decided.selections.insert(module.clone(), selected);
            }
            Ok(Decision::NeedsListing) => decided.needs_listing.push(module.clone()),
            Err(err) => {
                decided.errors.insert(module.clone(), err);
            }
        }
    }
    decided
}

/// The first failure of a stable pass, in discovery order.
fn take_failure(
    pass: &mut Pass,
    errors: &mut BTreeMap<ModuleId, ModgraphError>,
) -> Option<ModgraphError> {
    for i in 0..pass.order.len() {
        let module = pass.order[i].clone();
        if let Some(err) = errors.remove(&module) {
            return Some(err);
        }
        if matches!(pass.outcomes.get(&module), Some(Outcome::Failed(_))) {
            if let Some(Outcome::Failed(err)) = pass.outcomes.remove(&module) {
                return Some(err);
            }
        }
        if let Some(Outcome::Missing(id)) = pass.outcomes.get(&module) {
            return Some(ModgraphError::ModuleNotFound {
                module: id.to_string(),
                required_by: pass.requesters(&module),
            });
        }
    }
    None
}

/// Dependencies and constraints of the selected variant. An `available-at`
/// variant contributes a single edge to the module hosting it.
fn declarations(
    data: &ModuleData,
    selected: &SelectedNode,
    asks: &[Ask],
) -> (Vec<DependencySpec>, Vec<DependencyConstraint>) {
    if let Some(target) = &selected.available_at {
        let mut hop = DependencySpec::new(
            target.module(),
            VersionConstraint::require(target.version.clone()),
        );
        if let Some(ask) = asks.first() {
            hop.attributes = ask.attributes.clone();
            hop.requested_capabilities = ask.capabilities.clone();
        }
        return (vec![hop], Vec::new());
    }
    match selected.variant.as_deref().and_then(|name| data.variant(name)) {
        Some(variant) => (variant.dependencies().to_vec(), variant.constraints().to_vec()),
        None => (Vec::new(), Vec::new()),
    }
}

fn build_graph(
    request: &ResolveRequest,
    pass: &Pass,
    selections: &BTreeMap<ModuleId, SelectedVersion>,
) -> ResolvedGraph {
    let mut graph = ResolvedGraph::new();
    let root = graph.add_node(GraphNode::new(request.root.clone()));
    graph.set_root(root);

    let edge_reasons: Vec<Vec<SelectionReason>> = pass
        .edges
        .iter()
        .map(|edge| {
            let Some(selected) = selections.get(&edge.to) else {
                return Vec::new();
            };
            let mut reasons = Vec::new();
            if let Some(description) = &edge.substitution {
                reasons.push(SelectionReason::SelectedByRule(description.clone()));
            }
            let reason = edge_reason(&edge.request, selected);
            if !reasons.contains(&reason) {
                reasons.push(reason);
            }
            reasons
        })
        .collect();

    for module in &pass.order {
        let Some(Outcome::Selected(selected)) = pass.outcomes.get(module) else {
            continue;
        };
        let mut node = GraphNode::new(module.with_version(&selected.version));
        node.variant = selected.variant.clone();
        node.attributes = selected.attributes.clone();
        node.capabilities = selected.capabilities.clone();
        node.files = selected.files.clone();
        node.available_at = selected.available_at.clone();
        for (_, reasons) in pass
            .edges
            .iter()
            .zip(&edge_reasons)
            .filter(|(edge, _)| edge.to == *module)
        {
            for reason in reasons {
                if !node.reasons.contains(reason) {
                    node.reasons.push(reason.clone());
                }
            }
        }
        graph.add_node(node);
    }

    for (edge, reasons) in pass.edges.iter().zip(edge_reasons) {
        let (Some(from), Some(to)) = (graph.find(&edge.from), graph.find(&edge.to)) else {
            continue;
        };
        graph.add_edge(
            from,
            to,
            GraphEdge {
                requested: edge.request.constraint.clone(),
                constraint: edge.request.is_constraint,
                reasons,
            },
        );
    }
    graph
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(rules: &[&str]) -> BTreeSet<ExcludeRule> {
        rules.iter().filter_map(|r| ExcludeRule::parse(r)).collect()
    }

    fn state(excludes: Vec<BTreeSet<ExcludeRule>>) -> NodeState {
        NodeState {
            excludes: normalize(excludes),
            inherited: BTreeMap::new(),
            asks: vec![Ask::default()],
        }
    }

    #[test]
    fn excluded_only_when_every_path_excludes() {
        let lib = ModuleId::new("org", "lib");
        let mut node = state(vec![set(&["org:lib"])]);
        assert!(node.excludes(&lib));

        assert!(node.merge(vec![set(&["org:other"])], &BTreeMap::new()));
        assert!(!node.excludes(&lib));
        assert!(!node.excludes(&ModuleId::new("org", "x")));
    }

    #[test]
    fn unexcluded_path_collapses_state() {
        let mut node = state(vec![set(&["org:lib"])]);
        assert!(node.merge(vec![BTreeSet::new()], &BTreeMap::new()));
        assert_eq!(node.excludes, vec![BTreeSet::new()]);
        assert!(!node.merge(vec![set(&["org:lib"])], &BTreeMap::new()));
    }

    #[test]
    fn inherited_constraints_are_intersected() {
        let baz = ModuleId::new("org", "baz");
        let foo = ModuleId::new("org", "foo");
        let mut node = state(vec![BTreeSet::new()]);
        node.inherited
            .insert(baz.clone(), VersionConstraint::require("1.0").subgraph());
        node.inherited
            .insert(foo.clone(), VersionConstraint::require("1.0").subgraph());

        let mut other = BTreeMap::new();
        other.insert(baz.clone(), VersionConstraint::require("1.0").subgraph());
        assert!(node.merge(vec![BTreeSet::new()], &other));
        assert!(node.inherited.contains_key(&baz));
        assert!(!node.inherited.contains_key(&foo));
        assert!(!node.merge(vec![BTreeSet::new()], &other));
    }

    #[test]
    fn rerecorded_edges_overwrite() {
        let a = ModuleId::new("org", "a");
        let b = ModuleId::new("org", "b");
        let mut pass = Pass::default();
        let edge = |version: &str| Edge {
            from: a.clone(),
            to: b.clone(),
            request: VersionRequest::new("org:a:1.0", VersionConstraint::require(version)),
            substitution: None,
        };
        pass.record((a.clone(), false, 0), edge("1.0"));
        pass.record((a.clone(), false, 0), edge("2.0"));
        pass.record((a.clone(), true, 0), edge("3.0"));
        assert_eq!(pass.edges.len(), 2);
        assert_eq!(pass.requests_for(&b)[0].constraint.required.as_deref(), Some("2.0"));
        assert_eq!(pass.requesters(&b), vec!["org:a:1.0"]);
    }

    #[test]
    fn truncated_node_drops_stale_edges() {
        let a = ModuleId::new("org", "a");
        let b = ModuleId::new("org", "b");
        let c = ModuleId::new("org", "c");
        let mut pass = Pass::default();
        let edge = |from: &ModuleId, to: &ModuleId| Edge {
            from: from.clone(),
            to: to.clone(),
            request: VersionRequest::new("x", VersionConstraint::require("1.0")),
            substitution: None,
        };
        pass.record((a.clone(), false, 0), edge(&a, &b));
        pass.record((a.clone(), false, 1), edge(&a, &c));
        pass.record((b.clone(), false, 0), edge(&b, &c));

        pass.truncate(&a, 1, 0);
        assert_eq!(pass.edges.len(), 2);
        assert_eq!(pass.requesters(&c), vec!["x"]);
        assert_eq!(pass.edges[1].from, b);

        pass.record((b.clone(), false, 0), edge(&b, &a));
        assert_eq!(pass.edges.len(), 2);
        assert_eq!(pass.edges[1].to, a);
    }
}
