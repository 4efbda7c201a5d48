//! Core identifier, node type, and script data model types
//!
//! The script data model is the serde-facing shape of a saved script: a tree
//! of graphs, each holding node records with their properties and links.
//! Connections reference node ids plus link names, never indices, so records
//! stay valid when a node type gains or loses links.

use serde::{Deserialize, Serialize};

use crate::Value;

// ─────────────────────────────────────────────────────────────────────────────
// Identifiers
// ─────────────────────────────────────────────────────────────────────────────

/// Unique identifier for a node, stable across save/load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub uuid::Uuid);

impl NodeId {
    /// Create a new unique node ID
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a graph within a script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphId(pub uuid::Uuid);

impl GraphId {
    /// Create a new unique graph ID
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for GraphId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GraphId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Node Types
// ─────────────────────────────────────────────────────────────────────────────

/// Execution role of a node
///
/// A closed set of capabilities, checked with the `is_*` queries below rather
/// than downcasting. `Mixed` nodes answer yes to every query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Entry point triggered from outside the graph
    Event,
    /// Chain-executed logic, possibly latent
    Action,
    /// Passive data storage read and written through value links
    Value,
    /// Combines capabilities (e.g. an action that also stores a value)
    Mixed,
}

impl NodeKind {
    /// Whether this node can be triggered as an event
    pub fn is_event(self) -> bool {
        matches!(self, NodeKind::Event | NodeKind::Mixed)
    }

    /// Whether this node participates in activation chains
    pub fn is_action(self) -> bool {
        matches!(self, NodeKind::Action | NodeKind::Mixed)
    }

    /// Whether this node can sit on the far end of a value link
    pub fn is_value(self) -> bool {
        matches!(self, NodeKind::Value | NodeKind::Mixed)
    }
}

/// Identity of a node type as registered with the node registry
///
/// The registry key is `(name, category)`; two categories may each register
/// a type with the same name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeType {
    /// Display name, e.g. "Remote Event"
    pub name: String,
    /// Category folder, e.g. "Core"
    pub category: String,
    /// Human-readable description of what the node does
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl NodeType {
    /// Create a node type descriptor
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            description: description.into(),
        }
    }

    /// Fully qualified name, `category.name`
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.category, self.name)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Script Data Model
// ─────────────────────────────────────────────────────────────────────────────

/// A complete saved script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptData {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub author: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub copyright: String,
    /// Root graph; nested graphs hang off it
    pub graph: GraphData,
}

/// One graph in the script tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    pub id: GraphId,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
    /// Nodes in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<NodeRecord>,
    /// Child graphs in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subgraphs: Vec<GraphData>,
}

/// One saved node: identity, property values, and outgoing connections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    /// Node type name, resolved against the registry on load
    #[serde(rename = "type")]
    pub type_name: String,
    pub category: String,
    /// Properties in declaration order, including the base
    /// "Enabled"/"Comment" pair
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<PropertyRecord>,
    /// Chain connections, recorded on the output side only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chain_links: Vec<ChainLinkRecord>,
    /// Value link connections to value nodes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub value_links: Vec<ValueLinkRecord>,
}

/// One saved property value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub name: String,
    pub value: Value,
}

/// One chain connection from an output link to another node's input link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainLinkRecord {
    /// Output link name on the owning node
    pub output: String,
    /// Destination node
    pub to_node: NodeId,
    /// Input link name on the destination node
    pub to_input: String,
}

/// Value nodes connected to one value link, in connection order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueLinkRecord {
    /// Value link name on the owning node
    pub link: String,
    pub nodes: Vec<NodeId>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Load Diagnostics
// ─────────────────────────────────────────────────────────────────────────────

/// Non-fatal problem found while reconstructing a script from data
///
/// Loading never hard-fails on script content; unknown types and dangling
/// references are reported and the rest of the script loads.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoadDiagnostic {
    #[error("unknown node type {category}.{name} for node {node}")]
    MissingNodeType {
        name: String,
        category: String,
        node: NodeId,
    },
    #[error("dangling link {link:?} on node {node}")]
    DanglingLink { node: NodeId, link: String },
    #[error("unknown property {property:?} on node {node}")]
    UnknownProperty { node: NodeId, property: String },
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
