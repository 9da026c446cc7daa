//! The resolved dependency graph, tree printing and path lookup.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use modgraph_core::attribute::AttributeContainer;
use modgraph_core::capability::Capability;
use modgraph_core::constraint::VersionConstraint;
use modgraph_core::module::{ModuleId, ModuleVersionId};
use modgraph_core::variant::FileRef;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

/// Why a version was selected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SelectionReason {
    ByRequest,
    ByAncestor,
    ByConstraint,
    Forced,
    SelectedByRule(String),
}

impl fmt::Display for SelectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionReason::ByRequest => f.write_str("byRequest"),
            SelectionReason::ByAncestor => f.write_str("byAncestor"),
            SelectionReason::ByConstraint => f.write_str("byConstraint"),
            SelectionReason::Forced => f.write_str("forced"),
            SelectionReason::SelectedByRule(description) => {
                write!(f, "selectedByRule({description})")
            }
        }
    }
}

fn join_reasons(reasons: &[SelectionReason]) -> String {
    reasons
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A resolved module: one per `group:module` in a graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub id: ModuleVersionId,
    /// Selected variant; `None` when the module only has raw artifacts.
    pub variant: Option<String>,
    pub attributes: AttributeContainer,
    pub capabilities: Vec<Capability>,
    pub files: Vec<FileRef>,
    /// Module hosting the selected variant, when it lives elsewhere.
    pub available_at: Option<ModuleVersionId>,
    /// Reasons of every incoming edge, in discovery order, without repeats.
    pub reasons: Vec<SelectionReason>,
}

impl GraphNode {
    pub fn new(id: ModuleVersionId) -> Self {
        Self {
            id,
            variant: None,
            attributes: AttributeContainer::new(),
            capabilities: Vec::new(),
            files: Vec::new(),
            available_at: None,
            reasons: Vec::new(),
        }
    }

    pub fn key(&self) -> ModuleId {
        self.id.module()
    }
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// A dependency or dependency constraint between two resolved modules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphEdge {
    pub requested: VersionConstraint,
    pub constraint: bool,
    pub reasons: Vec<SelectionReason>,
}

/// Resolved dependency graph backed by petgraph. Built once by the driver
/// and read-only afterwards.
#[derive(Debug, Clone)]
pub struct ResolvedGraph {
    graph: DiGraph<GraphNode, GraphEdge>,
    index: BTreeMap<ModuleId, NodeIndex>,
    pub root: Option<NodeIndex>,
}

impl ResolvedGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            index: BTreeMap::new(),
            root: None,
        }
    }

    /// Add or retrieve a node. If the module already exists, returns the existing index.
    pub(crate) fn add_node(&mut self, node: GraphNode) -> NodeIndex {
        let key = node.key();
        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }
        let idx = self.graph.add_node(node);
        self.index.insert(key, idx);
        idx
    }

    pub(crate) fn set_root(&mut self, idx: NodeIndex) {
        self.root = Some(idx);
    }

    pub(crate) fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, edge: GraphEdge) {
        let duplicate = self
            .graph
            .edges(from)
            .any(|e| e.target() == to && e.weight().constraint == edge.constraint);
        if !duplicate {
            self.graph.add_edge(from, to, edge);
        }
    }

    pub fn find(&self, module: &ModuleId) -> Option<NodeIndex> {
        self.index.get(module).copied()
    }

    pub fn node(&self, idx: NodeIndex) -> &GraphNode {
        &self.graph[idx]
    }

    /// The resolved node for `module`.
    pub fn get(&self, module: &ModuleId) -> Option<&GraphNode> {
        self.find(module).map(|idx| &self.graph[idx])
    }

    pub fn root_node(&self) -> Option<&GraphNode> {
        self.root.map(|idx| &self.graph[idx])
    }

    /// All resolved nodes (excluding root), in discovery order.
    pub fn all_nodes(&self) -> Vec<&GraphNode> {
        self.graph
            .node_indices()
            .filter(|&idx| Some(idx) != self.root)
            .map(|idx| &self.graph[idx])
            .collect()
    }

    /// Direct dependencies and constraints of a node.
    pub fn dependencies_of(&self, idx: NodeIndex) -> Vec<(NodeIndex, &GraphEdge)> {
        let mut deps: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.target(), e.weight()))
            .collect();
        // petgraph walks edges newest first
        deps.reverse();
        deps
    }

    /// Reverse dependencies (who depends on this node).
    pub fn dependents_of(&self, idx: NodeIndex) -> Vec<(NodeIndex, &GraphEdge)> {
        let mut deps: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| (e.source(), e.weight()))
            .collect();
        deps.reverse();
        deps
    }

    /// Incoming edges of `module` with the node each one starts from.
    pub fn incoming(&self, module: &ModuleId) -> Vec<(&GraphNode, &GraphEdge)> {
        match self.find(module) {
            Some(idx) => self
                .dependents_of(idx)
                .into_iter()
                .map(|(from, edge)| (&self.graph[from], edge))
                .collect(),
            None => Vec::new(),
        }
    }

    /// The edge from `from` to `to`, dependency edges first.
    pub fn edge(&self, from: &ModuleId, to: &ModuleId) -> Option<&GraphEdge> {
        let (from, to) = (self.find(from)?, self.find(to)?);
        let mut edges: Vec<&GraphEdge> = self
            .graph
            .edges(from)
            .filter(|e| e.target() == to)
            .map(|e| e.weight())
            .collect();
        edges.sort_by_key(|e| e.constraint);
        edges.into_iter().next()
    }

    /// Print the dependency tree with the requested version, the selected
    /// version when it differs, and the selection reasons of every edge.
    pub fn print_tree(&self, max_depth: Option<usize>) -> String {
        let mut output = String::new();
        let Some(root) = self.root else {
            return output;
        };

        output.push_str(&format!("{}\n", self.graph[root]));

        let mut visited = HashSet::new();
        visited.insert(root);

        let deps = self.dependencies_of(root);
        let count = deps.len();
        for (i, (idx, edge)) in deps.iter().enumerate() {
            let is_last = i == count - 1;
            self.print_subtree(&mut output, *idx, edge, "", is_last, 1, max_depth, &mut visited);
        }

        output
    }

    fn edge_label(&self, idx: NodeIndex, edge: &GraphEdge) -> String {
        let node = &self.graph[idx];
        let requested = edge.requested.requested_version();
        let mut label = match requested {
            Some(r) if r != node.id.version => format!("{}:{r} -> {}", node.key(), node.id.version),
            _ => node.id.to_string(),
        };
        if edge.constraint {
            label.push_str(" (c)");
        }
        if !edge.reasons.is_empty() {
            label.push_str(&format!(" [{}]", join_reasons(&edge.reasons)));
        }
        label
    }

    #[allow(clippy::too_many_arguments)]
    fn print_subtree(
        &self,
        output: &mut String,
        idx: NodeIndex,
        edge: &GraphEdge,
        prefix: &str,
        is_last: bool,
        depth: usize,
        max_depth: Option<usize>,
        visited: &mut HashSet<NodeIndex>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        output.push_str(&format!("{prefix}{connector}{}\n", self.edge_label(idx, edge)));

        if edge.constraint {
            return;
        }
        if let Some(max) = max_depth {
            if depth >= max {
                return;
            }
        }

        if !visited.insert(idx) {
            return;
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let deps = self.dependencies_of(idx);
        let count = deps.len();
        for (i, (child, child_edge)) in deps.iter().enumerate() {
            let is_last = i == count - 1;
            self.print_subtree(
                output,
                *child,
                child_edge,
                &child_prefix,
                is_last,
                depth + 1,
                max_depth,
                visited,
            );
        }

        visited.remove(&idx);
    }

    /// Find the path from root to a specific module.
    ///
    /// Accepts either `group:module` or just `module` (partial match).
    pub fn find_path(&self, target_key: &str) -> Option<Vec<&GraphNode>> {
        let root = self.root?;
        let target = self.resolve_key(target_key)?;
        let mut path = Vec::new();
        let mut visited = HashSet::new();
        if self.dfs_path(root, target, &mut path, &mut visited) {
            Some(path.iter().map(|&idx| &self.graph[idx]).collect())
        } else {
            None
        }
    }

    /// Resolve a user-provided key to a node index.
    ///
    /// Tries exact `group:module` first, then falls back to matching by module name.
    fn resolve_key(&self, key: &str) -> Option<NodeIndex> {
        if let Some(idx) = ModuleId::parse(key).and_then(|m| self.find(&m)) {
            return Some(idx);
        }
        self.index
            .iter()
            .find(|(module, _)| module.name == key)
            .map(|(_, &idx)| idx)
    }

    fn dfs_path(
        &self,
        current: NodeIndex,
        target: NodeIndex,
        path: &mut Vec<NodeIndex>,
        visited: &mut HashSet<NodeIndex>,
    ) -> bool {
        path.push(current);
        if current == target {
            return true;
        }
        if !visited.insert(current) {
            path.pop();
            return false;
        }
        for (child, edge) in self.dependencies_of(current) {
            if !edge.constraint && self.dfs_path(child, target, path, visited) {
                return true;
            }
        }
        path.pop();
        visited.remove(&current);
        false
    }

    /// Build an inverted dependency tree (reverse edges) for a single module,
    /// with the reasons each dependent's edge was resolved for.
    ///
    /// Accepts either `group:module` or just `module` (partial match).
    pub fn print_inverted_tree(&self, target_key: &str) -> String {
        let mut output = String::new();
        let Some(idx) = self.resolve_key(target_key) else {
            return output;
        };

        let node = &self.graph[idx];
        output.push_str(&format!("{node}"));
        if !node.reasons.is_empty() {
            output.push_str(&format!(" [{}]", join_reasons(&node.reasons)));
        }
        output.push('\n');

        let mut visited = HashSet::new();
        visited.insert(idx);

        let dependents = self.dependents_of(idx);
        let count = dependents.len();
        for (i, (dep_idx, edge)) in dependents.iter().enumerate() {
            let is_last = i == count - 1;
            self.print_inverted_subtree(&mut output, *dep_idx, Some(edge), "", is_last, &mut visited);
        }

        output
    }

    fn print_inverted_subtree(
        &self,
        output: &mut String,
        idx: NodeIndex,
        edge: Option<&GraphEdge>,
        prefix: &str,
        is_last: bool,
        visited: &mut HashSet<NodeIndex>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        let node = &self.graph[idx];
        match edge {
            Some(e) => output.push_str(&format!(
                "{prefix}{connector}{node} requested {}{}\n",
                e.requested,
                if e.constraint { " (c)" } else { "" }
            )),
            None => output.push_str(&format!("{prefix}{connector}{node}\n")),
        }

        if !visited.insert(idx) {
            return;
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let dependents = self.dependents_of(idx);
        let count = dependents.len();
        for (i, (dep_idx, _)) in dependents.iter().enumerate() {
            let is_last = i == count - 1;
            self.print_inverted_subtree(output, *dep_idx, None, &child_prefix, is_last, visited);
        }

        visited.remove(&idx);
    }

    /// Number of nodes (excluding root).
    pub fn len(&self) -> usize {
        let total = self.graph.node_count();
        if self.root.is_some() {
            total.saturating_sub(1)
        } else {
            total
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ResolvedGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_node(group: &str, name: &str, version: &str) -> GraphNode {
        GraphNode::new(ModuleVersionId::new(group, name, version))
    }

    fn edge(version: &str, reasons: Vec<SelectionReason>) -> GraphEdge {
        GraphEdge {
            requested: VersionConstraint::require(version),
            constraint: false,
            reasons,
        }
    }

    fn sample() -> ResolvedGraph {
        let mut g = ResolvedGraph::new();
        let root = g.add_node(make_node("com.example", "app", "1.0"));
        g.set_root(root);
        let a = g.add_node(make_node("org.a", "a", "1.0"));
        let b = g.add_node(make_node("org.b", "b", "2.0"));
        let c = g.add_node(make_node("org.c", "c", "3.0"));
        g.add_edge(root, a, edge("1.0", vec![SelectionReason::ByRequest]));
        g.add_edge(root, b, edge("2.0", vec![SelectionReason::ByRequest]));
        g.add_edge(a, c, edge("2.5", vec![SelectionReason::ByRequest]));
        g
    }

    #[test]
    fn add_and_find() {
        let mut g = ResolvedGraph::new();
        let idx = g.add_node(make_node("org.example", "lib", "1.0"));
        assert_eq!(g.find(&ModuleId::new("org.example", "lib")), Some(idx));
        assert_eq!(g.node(idx).id.version, "1.0");
    }

    #[test]
    fn duplicate_add_returns_same_index() {
        let mut g = ResolvedGraph::new();
        let idx1 = g.add_node(make_node("org.example", "lib", "1.0"));
        let idx2 = g.add_node(make_node("org.example", "lib", "2.0"));
        assert_eq!(idx1, idx2);
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn tree_printing() {
        let tree = sample().print_tree(None);
        let expected = "\
com.example:app:1.0
├── org.a:a:1.0 [byRequest]
│   └── org.c:c:2.5 -> 3.0 [byRequest]
└── org.b:b:2.0 [byRequest]
";
        assert_eq!(tree, expected);
    }

    #[test]
    fn tree_depth_limit() {
        let tree = sample().print_tree(Some(1));
        assert!(tree.contains("org.a:a:1.0"));
        assert!(!tree.contains("org.c:c"));
    }

    #[test]
    fn constraint_edges_are_marked() {
        let mut g = sample();
        let root = g.root.unwrap();
        let c = g.find(&ModuleId::new("org.c", "c")).unwrap();
        g.add_edge(
            root,
            c,
            GraphEdge {
                requested: VersionConstraint::require("3.0"),
                constraint: true,
                reasons: vec![SelectionReason::ByConstraint],
            },
        );
        assert!(g.print_tree(None).contains("└── org.c:c:3.0 (c) [byConstraint]"));
    }

    #[test]
    fn find_path_exists() {
        let g = sample();
        let path = g.find_path("org.c:c").unwrap();
        let names: Vec<&str> = path.iter().map(|n| n.id.name.as_str()).collect();
        assert_eq!(names, vec!["app", "a", "c"]);
    }

    #[test]
    fn find_path_partial_key() {
        let graph = sample();
        let path = graph.find_path("b").unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path[1].id.name, "b");
    }

    #[test]
    fn find_path_not_found() {
        assert!(sample().find_path("org.missing:lib").is_none());
    }

    #[test]
    fn inverted_tree() {
        let inv = sample().print_inverted_tree("org.c:c");
        assert!(inv.starts_with("org.c:c:3.0\n"));
        assert!(inv.contains("└── org.a:a:1.0 requested 2.5"));
        assert!(inv.contains("com.example:app:1.0"));
    }

    #[test]
    fn reason_display() {
        assert_eq!(SelectionReason::ByAncestor.to_string(), "byAncestor");
        assert_eq!(
            SelectionReason::SelectedByRule("pinned".into()).to_string(),
            "selectedByRule(pinned)"
        );
    }
}
