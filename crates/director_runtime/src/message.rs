//! Game message bridge
//!
//! Nodes subscribe to message types by pattern. Patterns use `*`/`?`
//! wildcards; the empty pattern subscribes to every message. Registrations
//! keep insertion order so delivery order is deterministic.

use director_types::{NodeId, Value};
use wildmatch::WildMatch;

/// One game message delivered to the script
#[derive(Debug, Clone)]
pub struct Message {
    pub msg_type: String,
    pub data: Value,
    /// Identity of whoever caused the message, matched against event
    /// instigator filters
    pub instigator: Option<Value>,
}

impl Message {
    pub fn new(msg_type: impl Into<String>) -> Self {
        Self {
            msg_type: msg_type.into(),
            data: Value::Null,
            instigator: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn with_instigator(mut self, instigator: Value) -> Self {
        self.instigator = Some(instigator);
        self
    }
}

/// Ordered (pattern, subscriber) registrations
#[derive(Debug, Default)]
pub(crate) struct MessageDispatch {
    registrations: Vec<(String, NodeId)>,
}

impl MessageDispatch {
    pub fn register(&mut self, pattern: impl Into<String>, node: NodeId) {
        self.registrations.push((pattern.into(), node));
    }

    /// Drop every registration held by `node`
    pub fn unregister(&mut self, node: NodeId) {
        self.registrations.retain(|(_, n)| *n != node);
    }

    /// Subscribers whose pattern matches, one entry per matching
    /// registration, in registration order. `live_pattern` overrides the
    /// registered pattern, so subscribers whose pattern lives in a node
    /// property follow edits made after registration.
    pub fn matching(
        &self,
        msg_type: &str,
        live_pattern: impl Fn(NodeId) -> Option<String>,
    ) -> Vec<NodeId> {
        self.registrations
            .iter()
            .filter(|(registered, node)| {
                let live = live_pattern(*node);
                let pattern = live.as_deref().unwrap_or(registered);
                pattern.is_empty() || WildMatch::new(pattern).matches(msg_type)
            })
            .map(|(_, n)| *n)
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
