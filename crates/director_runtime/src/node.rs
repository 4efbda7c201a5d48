//! Node model: properties, links, and the behavior trait
//!
//! A node is plain data (`NodeData`: identity, an ordered property map, and
//! three kinds of named links) paired with a boxed `NodeBehavior` that gives
//! it semantics. Links store node ids, never references; the arena of nodes
//! lives on the `Director` and resolves ids on demand.

use director_types::{NodeId, NodeKind, NodeType, Value, ValueKind};
use tracing::debug;

use crate::{DirectorError, Message, UpdateContext};

/// Name of the base enabled property, always registered first
pub const PROP_ENABLED: &str = "Enabled";
/// Name of the base comment property, always registered second
pub const PROP_COMMENT: &str = "Comment";
/// Name of the event trigger limit property (0 = unbounded)
pub const PROP_MAX_TRIGGERS: &str = "Max Trigger Count";

// ─────────────────────────────────────────────────────────────────────────────
// Properties
// ─────────────────────────────────────────────────────────────────────────────

/// One named property slot on a node
#[derive(Debug, Clone)]
pub struct Property {
    pub name: String,
    pub description: String,
    pub read_only: bool,
    pub value: Value,
}

// ─────────────────────────────────────────────────────────────────────────────
// Links
// ─────────────────────────────────────────────────────────────────────────────

/// Named entry point for chain activation
///
/// Connections record the source node and the output link name on it, so
/// both sides of a chain connection can be walked.
#[derive(Debug, Clone, Default)]
pub struct InputLink {
    pub name: String,
    pub connections: Vec<(NodeId, String)>,
}

impl InputLink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            connections: Vec::new(),
        }
    }
}

/// Named exit point for chain activation
///
/// `activate` only bumps a counter; the scheduler drains counters into stack
/// frames after the owning node's update returns. Activating the same output
/// n times schedules n frames per connected input.
#[derive(Debug, Clone, Default)]
pub struct OutputLink {
    pub name: String,
    /// (destination node, input link name) pairs
    pub connections: Vec<(NodeId, String)>,
    activations: u32,
}

impl OutputLink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            connections: Vec::new(),
            activations: 0,
        }
    }

    /// Request activation of every connected input
    pub fn activate(&mut self) {
        self.activations += 1;
    }

    pub(crate) fn take_activations(&mut self) -> u32 {
        std::mem::take(&mut self.activations)
    }

    pub(crate) fn pending_activations(&self) -> u32 {
        self.activations
    }
}

/// Named connection slot to value nodes
#[derive(Debug, Clone)]
pub struct ValueLink {
    pub name: String,
    /// Shown in editors; hidden links are only wired programmatically
    pub exposed: bool,
    /// Whether the owning node writes through this link
    pub is_out: bool,
    /// Whether more than one value node may connect
    pub allow_multiple: bool,
    /// Whether connections are kind-checked against `expected`
    pub type_check: bool,
    pub expected: ValueKind,
    pub connections: Vec<NodeId>,
}

impl ValueLink {
    /// A single-connection, untyped input link
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            exposed: true,
            is_out: false,
            allow_multiple: false,
            type_check: false,
            expected: ValueKind::Null,
            connections: Vec::new(),
        }
    }

    /// Mark as written by the owning node
    pub fn out(mut self) -> Self {
        self.is_out = true;
        self
    }

    /// Allow fan-in from multiple value nodes
    pub fn multiple(mut self) -> Self {
        self.allow_multiple = true;
        self
    }

    /// Enforce a value kind at connect time
    pub fn typed(mut self, expected: ValueKind) -> Self {
        self.type_check = true;
        self.expected = expected;
        self
    }

    /// Hide from editors
    pub fn hidden(mut self) -> Self {
        self.exposed = false;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Node Data
// ─────────────────────────────────────────────────────────────────────────────

/// The data half of a node: identity, properties, and links
#[derive(Debug)]
pub struct NodeData {
    id: NodeId,
    node_type: NodeType,
    kind: NodeKind,
    label: String,
    trigger_count: u32,
    properties: Vec<Property>,
    inputs: Vec<InputLink>,
    outputs: Vec<OutputLink>,
    values: Vec<ValueLink>,
}

impl NodeData {
    pub(crate) fn new(node_type: NodeType, kind: NodeKind) -> Self {
        let label = node_type.name.clone();
        Self {
            id: NodeId::new(),
            node_type,
            kind,
            label,
            trigger_count: 0,
            properties: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: NodeId) {
        self.id = id;
    }

    pub fn node_type(&self) -> &NodeType {
        &self.node_type
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Display label; behaviors update it from their properties
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn is_enabled(&self) -> bool {
        self.property(PROP_ENABLED)
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.set_property_value(PROP_ENABLED, Value::Bool(enabled));
    }

    pub fn comment(&self) -> &str {
        self.property(PROP_COMMENT)
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    /// How many times this event has fired since the script started
    pub fn trigger_count(&self) -> u32 {
        self.trigger_count
    }

    pub(crate) fn count_trigger(&mut self) {
        self.trigger_count += 1;
    }

    /// Trigger limit from the "Max Trigger Count" property, 0 = unbounded
    pub fn max_trigger_count(&self) -> u32 {
        self.property(PROP_MAX_TRIGGERS)
            .and_then(Value::as_i64)
            .map(|n| n.max(0) as u32)
            .unwrap_or(0)
    }

    // ── Properties ──

    /// Register a property; declaration order is the iteration order
    pub fn add_property(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        value: Value,
    ) {
        self.properties.push(Property {
            name: name.into(),
            description: description.into(),
            read_only: false,
            value,
        });
    }

    /// Register a property that rejects writes through `set_property`
    pub fn add_property_read_only(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        value: Value,
    ) {
        self.properties.push(Property {
            name: name.into(),
            description: description.into(),
            read_only: true,
            value,
        });
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }

    pub fn property_entry(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Set a property value without invoking the behavior hook
    pub fn set_property_value(&mut self, name: &str, value: Value) -> bool {
        match self.properties.iter_mut().find(|p| p.name == name) {
            Some(p) => {
                p.value = value;
                true
            }
            None => false,
        }
    }

    /// Properties in declaration order
    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.iter()
    }

    // ── Links ──

    pub fn add_input(&mut self, link: InputLink) {
        self.inputs.push(link);
    }

    pub fn add_output(&mut self, link: OutputLink) {
        self.outputs.push(link);
    }

    /// Drop output links beyond `len`; nodes with a variable output set use
    /// this when their count property shrinks
    pub fn truncate_outputs(&mut self, len: usize) {
        self.outputs.truncate(len);
    }

    pub fn add_value_link(&mut self, link: ValueLink) {
        self.values.push(link);
    }

    pub fn inputs(&self) -> &[InputLink] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[OutputLink] {
        &self.outputs
    }

    pub fn value_links(&self) -> &[ValueLink] {
        &self.values
    }

    pub fn input_link(&self, name: &str) -> Option<&InputLink> {
        self.inputs.iter().find(|l| l.name == name)
    }

    pub fn input_link_mut(&mut self, name: &str) -> Option<&mut InputLink> {
        self.inputs.iter_mut().find(|l| l.name == name)
    }

    pub fn output_link(&self, name: &str) -> Option<&OutputLink> {
        self.outputs.iter().find(|l| l.name == name)
    }

    pub fn output_link_mut(&mut self, name: &str) -> Option<&mut OutputLink> {
        self.outputs.iter_mut().find(|l| l.name == name)
    }

    pub fn value_link(&self, name: &str) -> Option<&ValueLink> {
        self.values.iter().find(|l| l.name == name)
    }

    pub fn value_link_mut(&mut self, name: &str) -> Option<&mut ValueLink> {
        self.values.iter_mut().find(|l| l.name == name)
    }

    /// Position of an input link, the index carried by stack frames
    pub fn input_index(&self, name: &str) -> Option<usize> {
        self.inputs.iter().position(|l| l.name == name)
    }

    /// Request activation of a named output; unknown names are a no-op
    pub fn activate_output(&mut self, name: &str) -> bool {
        match self.outputs.iter_mut().find(|l| l.name == name) {
            Some(link) => {
                link.activate();
                true
            }
            None => {
                debug!(node = %self.id, output = name, "activating unknown output, ignored");
                false
            }
        }
    }

    pub(crate) fn inputs_mut(&mut self) -> &mut [InputLink] {
        &mut self.inputs
    }

    pub(crate) fn outputs_mut(&mut self) -> &mut [OutputLink] {
        &mut self.outputs
    }

    pub(crate) fn values_mut(&mut self) -> &mut [ValueLink] {
        &mut self.values
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Node Behavior
// ─────────────────────────────────────────────────────────────────────────────

/// Semantics of a node type
///
/// Behaviors hold per-node execution state (loop cursors, elapsed time) and
/// operate on the `NodeData` they are paired with. All hooks run on the
/// simulation thread.
pub trait NodeBehavior: Send {
    /// Execution role, fixed per type
    fn kind(&self) -> NodeKind;

    /// Declare links and properties. Called by `Node::init`, which registers
    /// the base "Enabled"/"Comment" properties beforehand.
    fn build(&mut self, node: &mut NodeData);

    /// Run one scheduled activation. `ctx.input` is the activated input
    /// index, `ctx.first` is false for latent continuations. Return true to
    /// stay scheduled for the next tick.
    fn update(&mut self, node: &mut NodeData, ctx: &mut UpdateContext<'_>) -> bool {
        let _ = ctx;
        node.activate_output("Out");
        false
    }

    /// Synchronous reaction to a property write (relabeling, cache refresh)
    fn on_property_changed(&mut self, node: &mut NodeData, name: &str) {
        let _ = (node, name);
    }

    /// Called once when the script begins running
    fn on_start(&mut self, node: &mut NodeData, ctx: &mut UpdateContext<'_>) {
        let _ = (node, ctx);
    }

    /// Called for each game message matching one of the node's registrations
    fn on_message(&mut self, node: &mut NodeData, ctx: &mut UpdateContext<'_>, message: &Message) {
        let _ = (node, ctx, message);
    }

    /// Fresh behavior of the same type with default execution state
    fn clone_behavior(&self) -> Box<dyn NodeBehavior>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Node
// ─────────────────────────────────────────────────────────────────────────────

/// A node: data plus the behavior that drives it
pub struct Node {
    pub(crate) data: NodeData,
    pub(crate) behavior: Box<dyn NodeBehavior>,
}

impl Node {
    /// Create and initialize a node of the given type
    pub fn new(node_type: NodeType, behavior: Box<dyn NodeBehavior>) -> Self {
        let mut node = Self {
            data: NodeData::new(node_type, behavior.kind()),
            behavior,
        };
        node.init();
        node
    }

    pub fn data(&self) -> &NodeData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut NodeData {
        &mut self.data
    }

    pub fn id(&self) -> NodeId {
        self.data.id
    }

    pub fn kind(&self) -> NodeKind {
        self.data.kind
    }

    /// Rebuild properties and links from the behavior
    ///
    /// Idempotent: property values and link connections whose names survive
    /// the rebuild are preserved, so re-initializing a wired node keeps its
    /// wiring. Base properties always come first, in fixed order.
    pub fn init(&mut self) {
        let data = &mut self.data;
        let old_props: Vec<(String, Value)> = data
            .properties
            .drain(..)
            .map(|p| (p.name, p.value))
            .collect();
        let old_inputs: Vec<(String, Vec<(NodeId, String)>)> = data
            .inputs
            .drain(..)
            .map(|l| (l.name, l.connections))
            .collect();
        let old_outputs: Vec<(String, Vec<(NodeId, String)>)> = data
            .outputs
            .drain(..)
            .map(|l| (l.name, l.connections))
            .collect();
        let old_values: Vec<(String, Vec<NodeId>)> = data
            .values
            .drain(..)
            .map(|l| (l.name, l.connections))
            .collect();

        data.add_property(
            PROP_ENABLED,
            "Whether this node runs; disabled nodes are skipped during execution.",
            Value::Bool(true),
        );
        data.add_property(
            PROP_COMMENT,
            "Free text describing why this node is here.",
            Value::String(String::new()),
        );
        self.behavior.build(data);

        for (name, value) in old_props {
            data.set_property_value(&name, value);
        }
        for (name, connections) in old_inputs {
            if let Some(link) = data.input_link_mut(&name) {
                link.connections = connections;
            }
        }
        for (name, connections) in old_outputs {
            if let Some(link) = data.output_link_mut(&name) {
                link.connections = connections;
            }
        }
        for (name, connections) in old_values {
            if let Some(link) = data.value_link_mut(&name) {
                link.connections = connections;
            }
        }
    }

    /// Write a property and run the behavior's change hook
    pub fn set_property(&mut self, name: &str, value: Value) -> Result<(), DirectorError> {
        let entry = self
            .data
            .properties
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| DirectorError::MissingProperty {
                node: self.data.id,
                property: name.to_string(),
            })?;
        if entry.read_only {
            return Err(DirectorError::ReadOnlyProperty {
                property: name.to_string(),
            });
        }
        entry.value = value;
        self.behavior.on_property_changed(&mut self.data, name);
        Ok(())
    }

    pub(crate) fn update(&mut self, ctx: &mut UpdateContext<'_>) -> bool {
        self.behavior.update(&mut self.data, ctx)
    }

    pub(crate) fn notify_start(&mut self, ctx: &mut UpdateContext<'_>) {
        self.behavior.on_start(&mut self.data, ctx);
    }

    pub(crate) fn deliver_message(&mut self, ctx: &mut UpdateContext<'_>, message: &Message) {
        self.behavior.on_message(&mut self.data, ctx, message);
    }

    /// A fresh node of the same type with this node's property values.
    /// Links and execution state are not copied.
    pub fn clone_node(&self) -> Node {
        let mut clone = Node::new(self.data.node_type.clone(), self.behavior.clone_behavior());
        let values: Vec<(String, Value)> = self
            .data
            .properties
            .iter()
            .map(|p| (p.name.clone(), p.value.clone()))
            .collect();
        for (name, value) in values {
            // read_only properties keep their defaults on the clone
            let _ = clone.set_property(&name, value);
        }
        clone
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.data.id)
            .field("type", &self.data.node_type.full_name())
            .field("kind", &self.data.kind)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
