//! Node registry: maps (name, category) to node factories
//!
//! One registry is built at startup, wrapped in an `Arc`, and shared by
//! every Director. Registration order is preserved for stable enumeration.

use std::collections::HashMap;

use director_types::NodeType;

use crate::{DirectorError, Node, NodeBehavior};

/// Zero-argument constructor for a node behavior
pub type NodeFactory = Box<dyn Fn() -> Box<dyn NodeBehavior> + Send + Sync>;

struct RegistryEntry {
    node_type: NodeType,
    factory: NodeFactory,
}

/// Registry of creatable node types
#[derive(Default)]
pub struct NodeRegistry {
    entries: Vec<RegistryEntry>,
    index: HashMap<(String, String), usize>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-loaded with the built-in node library
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::nodes::register_builtins(&mut registry);
        registry
    }

    /// Register a node type. Re-registering a (name, category) pair
    /// replaces the previous factory.
    pub fn register<F>(&mut self, node_type: NodeType, factory: F)
    where
        F: Fn() -> Box<dyn NodeBehavior> + Send + Sync + 'static,
    {
        let key = (node_type.name.clone(), node_type.category.clone());
        let entry = RegistryEntry {
            node_type,
            factory: Box::new(factory),
        };
        match self.index.get(&key) {
            Some(&pos) => self.entries[pos] = entry,
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    pub fn contains(&self, name: &str, category: &str) -> bool {
        self.index
            .contains_key(&(name.to_string(), category.to_string()))
    }

    pub fn node_type(&self, name: &str, category: &str) -> Option<&NodeType> {
        self.index
            .get(&(name.to_string(), category.to_string()))
            .map(|&pos| &self.entries[pos].node_type)
    }

    /// Registered node types in registration order
    pub fn node_types(&self) -> impl Iterator<Item = &NodeType> {
        self.entries.iter().map(|e| &e.node_type)
    }

    /// Instantiate a registered node type
    pub fn create(&self, name: &str, category: &str) -> Result<Node, DirectorError> {
        let entry = self
            .index
            .get(&(name.to_string(), category.to_string()))
            .map(|&pos| &self.entries[pos])
            .ok_or_else(|| DirectorError::UnknownNodeType {
                name: name.to_string(),
                category: category.to_string(),
            })?;
        Ok(Node::new(entry.node_type.clone(), (entry.factory)()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
