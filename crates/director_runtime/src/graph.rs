//! Graph structure: ordered node membership and nested subgraphs
//!
//! Graphs own ordering and nesting only. The nodes themselves live in the
//! Director's arena, and node ids are unique across the whole script, so a
//! graph is a tree of id lists.

use director_types::{GraphId, NodeId};

/// One graph in a script: an ordered list of node ids plus child graphs
#[derive(Debug, Default)]
pub struct DirectorGraph {
    id: GraphId,
    pub name: String,
    pub comment: String,
    nodes: Vec<NodeId>,
    subgraphs: Vec<DirectorGraph>,
}

impl DirectorGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: GraphId::new(),
            name: name.into(),
            comment: String::new(),
            nodes: Vec::new(),
            subgraphs: Vec::new(),
        }
    }

    pub fn id(&self) -> GraphId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: GraphId) {
        self.id = id;
    }

    /// Node ids of this graph in declaration order
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn subgraphs(&self) -> &[DirectorGraph] {
        &self.subgraphs
    }

    /// Append a child graph, returning its id
    pub fn add_subgraph(&mut self, graph: DirectorGraph) -> GraphId {
        let id = graph.id;
        self.subgraphs.push(graph);
        id
    }

    /// Find a graph by id, this graph included, recursing into children
    pub fn graph(&self, id: GraphId) -> Option<&DirectorGraph> {
        if self.id == id {
            return Some(self);
        }
        self.subgraphs.iter().find_map(|g| g.graph(id))
    }

    pub fn graph_mut(&mut self, id: GraphId) -> Option<&mut DirectorGraph> {
        if self.id == id {
            return Some(self);
        }
        self.subgraphs.iter_mut().find_map(|g| g.graph_mut(id))
    }

    pub(crate) fn push_node(&mut self, id: NodeId) {
        self.nodes.push(id);
    }

    /// Remove a node id wherever it appears in the tree
    pub(crate) fn remove_node(&mut self, id: NodeId) -> bool {
        if let Some(pos) = self.nodes.iter().position(|n| *n == id) {
            self.nodes.remove(pos);
            return true;
        }
        self.subgraphs.iter_mut().any(|g| g.remove_node(id))
    }

    pub fn contains(&self, id: NodeId, recurse: bool) -> bool {
        if self.nodes.contains(&id) {
            return true;
        }
        recurse && self.subgraphs.iter().any(|g| g.contains(id, true))
    }

    /// All node ids in declaration order: this graph's nodes first, then
    /// each subgraph in order
    pub fn node_ids(&self, recurse: bool) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_node_ids(recurse, &mut out);
        out
    }

    fn collect_node_ids(&self, recurse: bool, out: &mut Vec<NodeId>) {
        out.extend_from_slice(&self.nodes);
        if recurse {
            for g in &self.subgraphs {
                g.collect_node_ids(true, out);
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_order_spans_subgraphs() {
        let mut root = DirectorGraph::new("root");
        let a = NodeId::new();
        let b = NodeId::new();
        root.push_node(a);
        root.push_node(b);

        let mut child = DirectorGraph::new("child");
        let c = NodeId::new();
        child.push_node(c);
        root.add_subgraph(child);

        assert_eq!(root.node_ids(true), vec![a, b, c]);
        assert_eq!(root.node_ids(false), vec![a, b]);
    }

    #[test]
    fn test_remove_node_recurses() {
        let mut root = DirectorGraph::new("root");
        let mut child = DirectorGraph::new("child");
        let inner = NodeId::new();
        child.push_node(inner);
        root.add_subgraph(child);

        assert!(root.contains(inner, true));
        assert!(!root.contains(inner, false));
        assert!(root.remove_node(inner));
        assert!(!root.contains(inner, true));
        assert!(!root.remove_node(inner));
    }

    #[test]
    fn test_graph_lookup_by_id() {
        let mut root = DirectorGraph::new("root");
        let child_id = root.add_subgraph(DirectorGraph::new("child"));
        assert_eq!(root.graph(root.id()).unwrap().name, "root");
        assert_eq!(root.graph(child_id).unwrap().name, "child");
        assert!(root.graph(GraphId::new()).is_none());
    }
}
