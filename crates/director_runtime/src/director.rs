//! The Director: node arena, graph tree, and the stack-frame scheduler
//!
//! Execution is tick-driven and deterministic. Triggering an event schedules
//! stack frames; `update` drains them FIFO, and frames pushed while draining
//! run before `update` returns, so a whole activation chain completes within
//! one tick. A node whose update asks to stay scheduled is carried to the
//! next tick as a latent continuation.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use director_types::{GraphId, NodeId, Value, ValueKind};
use tracing::{debug, info, warn};

use crate::{
    DirectorError, DirectorGraph, Message, MessageDispatch, Node, NodeData, NodeRegistry,
};

/// Frames processed per update before the remainder is carried to the next
/// tick; guards against runaway cyclic graphs
const MAX_FRAMES_PER_UPDATE: usize = 10_000;

// ─────────────────────────────────────────────────────────────────────────────
// Threads and Stack Frames
// ─────────────────────────────────────────────────────────────────────────────

/// Identity of one logical execution thread within a script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThreadId(u64);

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One pending activation
///
/// `node` is None for a thread-boundary sentinel frame; it holds its thread
/// id on the stack without running anything.
#[derive(Debug, Clone)]
pub struct StackFrame {
    pub node: Option<NodeId>,
    pub input: usize,
    pub first: bool,
    pub thread: ThreadId,
}

/// Execution context handed to behavior hooks
///
/// Gives a behavior access to the rest of the script while its own node is
/// detached from the arena.
pub struct UpdateContext<'a> {
    pub director: &'a mut Director,
    /// Index of the activated input link
    pub input: usize,
    /// False when this is a latent continuation from a previous tick
    pub first: bool,
    /// Simulation seconds since the previous tick
    pub sim_delta: f32,
    /// Wall-clock seconds since the previous tick
    pub delta: f32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Director
// ─────────────────────────────────────────────────────────────────────────────

/// A running script: all nodes, their graph structure, and pending work
pub struct Director {
    registry: Arc<NodeRegistry>,
    nodes: HashMap<NodeId, Node>,
    graph: DirectorGraph,
    stack: VecDeque<StackFrame>,
    next_thread: u64,
    current_thread: Option<ThreadId>,
    armed_thread: Option<ThreadId>,
    messages: MessageDispatch,
    started: bool,
    pub name: String,
    pub description: String,
    pub author: String,
    pub comment: String,
    pub copyright: String,
}

impl Director {
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self {
            registry,
            nodes: HashMap::new(),
            graph: DirectorGraph::new(""),
            stack: VecDeque::new(),
            next_thread: 0,
            current_thread: None,
            armed_thread: None,
            messages: MessageDispatch::default(),
            started: false,
            name: String::new(),
            description: String::new(),
            author: String::new(),
            comment: String::new(),
            copyright: String::new(),
        }
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    pub fn graph(&self) -> &DirectorGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut DirectorGraph {
        &mut self.graph
    }

    pub fn has_started(&self) -> bool {
        self.started
    }

    // ── Node management ──

    /// Create a registered node type and add it to a graph (root if None)
    pub fn create_node(
        &mut self,
        name: &str,
        category: &str,
        graph: Option<GraphId>,
    ) -> Result<NodeId, DirectorError> {
        let node = self.registry.create(name, category)?;
        self.add_node(node, graph)
    }

    /// Add an existing node to a graph (root if None)
    pub fn add_node(&mut self, node: Node, graph: Option<GraphId>) -> Result<NodeId, DirectorError> {
        let id = node.id();
        let target = match graph {
            Some(gid) => self
                .graph
                .graph_mut(gid)
                .ok_or(DirectorError::GraphNotFound(gid))?,
            None => &mut self.graph,
        };
        target.push_node(id);
        self.nodes.insert(id, node);
        Ok(id)
    }

    /// Remove a node, scrubbing every connection, frame, and message
    /// registration that references it
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        let node = self.nodes.remove(&id)?;
        self.graph.remove_node(id);
        for other in self.nodes.values_mut() {
            let data = other.data_mut();
            for link in data.inputs_mut() {
                link.connections.retain(|(n, _)| *n != id);
            }
            for link in data.outputs_mut() {
                link.connections.retain(|(n, _)| *n != id);
            }
            for link in data.values_mut() {
                link.connections.retain(|n| *n != id);
            }
        }
        self.stack.retain(|f| f.node != Some(id));
        self.messages.unregister(id);
        Some(node)
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// All nodes of a type in declaration order, optionally filtered by the
    /// formatted string form of one property
    pub fn get_nodes(
        &self,
        name: &str,
        category: &str,
        property: Option<(&str, &str)>,
    ) -> Vec<NodeId> {
        self.graph
            .node_ids(true)
            .into_iter()
            .filter(|id| {
                let Some(node) = self.nodes.get(id) else {
                    return false;
                };
                let ty = node.data().node_type();
                if ty.name != name || ty.category != category {
                    return false;
                }
                match property {
                    Some((prop, expected)) => node
                        .data()
                        .property(prop)
                        .map(|v| v.to_string() == expected)
                        .unwrap_or(false),
                    None => true,
                }
            })
            .collect()
    }

    /// First value node whose "Name" property matches, in declaration order
    pub fn get_value_node(&self, name: &str) -> Option<NodeId> {
        self.graph.node_ids(true).into_iter().find(|id| {
            self.nodes
                .get(id)
                .filter(|n| n.kind().is_value())
                .and_then(|n| n.data().property("Name"))
                .and_then(Value::as_str)
                == Some(name)
        })
    }

    /// Clone a node's type and property values into a graph (root if None).
    /// Links are not copied. Returns None if the source does not exist.
    pub fn clone_node(&mut self, id: NodeId, graph: Option<GraphId>) -> Option<NodeId> {
        let clone = match self.nodes.get(&id) {
            Some(node) => node.clone_node(),
            None => {
                warn!(node = %id, "cannot clone a node that does not exist");
                return None;
            }
        };
        match self.add_node(clone, graph) {
            Ok(new_id) => Some(new_id),
            Err(err) => {
                warn!(node = %id, error = %err, "clone discarded");
                None
            }
        }
    }

    // ── Connections ──

    /// Connect an output link to another node's input link
    pub fn connect_chain(
        &mut self,
        from: NodeId,
        output: &str,
        to: NodeId,
        input: &str,
    ) -> Result<(), DirectorError> {
        let from_node = self.nodes.get(&from).ok_or(DirectorError::NodeNotFound(from))?;
        from_node
            .data()
            .output_link(output)
            .ok_or_else(|| DirectorError::MissingLink {
                node: from,
                link: output.to_string(),
            })?;
        let to_node = self.nodes.get(&to).ok_or(DirectorError::NodeNotFound(to))?;
        to_node
            .data()
            .input_link(input)
            .ok_or_else(|| DirectorError::MissingLink {
                node: to,
                link: input.to_string(),
            })?;

        if let Some(node) = self.nodes.get_mut(&from) {
            if let Some(link) = node.data_mut().output_link_mut(output) {
                let entry = (to, input.to_string());
                if !link.connections.contains(&entry) {
                    link.connections.push(entry);
                }
            }
        }
        if let Some(node) = self.nodes.get_mut(&to) {
            if let Some(link) = node.data_mut().input_link_mut(input) {
                let entry = (from, output.to_string());
                if !link.connections.contains(&entry) {
                    link.connections.push(entry);
                }
            }
        }
        Ok(())
    }

    pub fn disconnect_chain(
        &mut self,
        from: NodeId,
        output: &str,
        to: NodeId,
        input: &str,
    ) -> Result<(), DirectorError> {
        if let Some(node) = self.nodes.get_mut(&from) {
            if let Some(link) = node.data_mut().output_link_mut(output) {
                link.connections.retain(|(n, i)| !(*n == to && i == input));
            }
        }
        if let Some(node) = self.nodes.get_mut(&to) {
            if let Some(link) = node.data_mut().input_link_mut(input) {
                link.connections.retain(|(n, o)| !(*n == from && o == output));
            }
        }
        Ok(())
    }

    /// Connect a value link to a value node, validating fan-in and, when the
    /// link asks for it, the value kind
    pub fn connect_value(
        &mut self,
        node: NodeId,
        link: &str,
        value_node: NodeId,
    ) -> Result<(), DirectorError> {
        let target = self
            .nodes
            .get(&value_node)
            .ok_or(DirectorError::NodeNotFound(value_node))?;
        if !target.kind().is_value() {
            return Err(DirectorError::NotAValueNode(value_node));
        }
        let found = target
            .data()
            .property("Value")
            .map(Value::kind)
            .unwrap_or(ValueKind::Null);

        let owner = self.nodes.get(&node).ok_or(DirectorError::NodeNotFound(node))?;
        let value_link = owner
            .data()
            .value_link(link)
            .ok_or_else(|| DirectorError::MissingLink {
                node,
                link: link.to_string(),
            })?;
        if !value_link.allow_multiple && !value_link.connections.is_empty() {
            return Err(DirectorError::FanInNotAllowed {
                node,
                link: link.to_string(),
            });
        }
        if value_link.type_check && !found.is_compatible_with(value_link.expected) {
            return Err(DirectorError::TypeMismatch {
                link: link.to_string(),
                expected: value_link.expected,
                found,
            });
        }

        if let Some(owner) = self.nodes.get_mut(&node) {
            if let Some(value_link) = owner.data_mut().value_link_mut(link) {
                if !value_link.connections.contains(&value_node) {
                    value_link.connections.push(value_node);
                }
            }
        }
        Ok(())
    }

    pub fn disconnect_value(
        &mut self,
        node: NodeId,
        link: &str,
        value_node: NodeId,
    ) -> Result<(), DirectorError> {
        if let Some(owner) = self.nodes.get_mut(&node) {
            if let Some(value_link) = owner.data_mut().value_link_mut(link) {
                value_link.connections.retain(|n| *n != value_node);
            }
        }
        Ok(())
    }

    /// Write a property and run the node behavior's change hook
    pub fn set_node_property(
        &mut self,
        id: NodeId,
        name: &str,
        value: Value,
    ) -> Result<(), DirectorError> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(DirectorError::NodeNotFound(id))?;
        node.set_property(name, value)
    }

    // ── Messages ──

    /// Subscribe a node to game messages matching a wildcard pattern
    /// (empty = every message)
    pub fn register_message(&mut self, pattern: &str, node: NodeId) {
        self.messages.register(pattern, node);
    }

    /// Drop every message registration held by a node
    pub fn unregister_messages(&mut self, node: NodeId) {
        self.messages.unregister(node);
    }

    /// Deliver a game message to every matching registration. Delivery is
    /// gated like any other event trigger: the node must pass `test_event`
    /// with the message's instigator, and the "Max Trigger Count" property
    /// is enforced and counted. Subscribers with a "Message Type" property
    /// match against its current value, so pattern edits after registration
    /// take effect. Each delivery that schedules work runs as its own
    /// thread.
    pub fn process_message(&mut self, message: &Message) {
        let matching = self.messages.matching(&message.msg_type, |id| {
            self.nodes
                .get(&id)
                .and_then(|n| n.data().property("Message Type"))
                .and_then(Value::as_str)
                .map(str::to_string)
        });
        for id in matching {
            if !self.test_event(id, message.instigator.as_ref()) {
                continue;
            }
            let Some(mut node) = self.nodes.remove(&id) else {
                continue;
            };
            let max = node.data().max_trigger_count();
            if max > 0 && node.data().trigger_count() >= max {
                debug!(node = %id, max, "message event reached its trigger limit");
                self.nodes.insert(id, node);
                continue;
            }
            node.data_mut().count_trigger();
            let mut ctx = UpdateContext {
                director: self,
                input: 0,
                first: true,
                sim_delta: 0.0,
                delta: 0.0,
            };
            node.deliver_message(&mut ctx, message);
            self.flush_node(&mut node);
            self.nodes.insert(id, node);
        }
    }

    // ── Scheduling ──

    fn allocate_thread(&mut self) -> ThreadId {
        self.next_thread += 1;
        ThreadId(self.next_thread)
    }

    /// Schedule an activation frame
    ///
    /// `Some(node)` queues input `input` of that node on the current thread
    /// (a fresh one if called from outside an update). `None` is the
    /// thread-boundary sentinel: it enqueues an inert frame and arms a fresh
    /// thread id that the next `trigger_event` call adopts, so the triggered
    /// event runs as an independent thread.
    pub fn push_stack(&mut self, node: Option<NodeId>, input: usize) {
        match node {
            Some(id) => {
                let thread = match self.current_thread {
                    Some(t) => t,
                    None => self.allocate_thread(),
                };
                self.stack.push_back(StackFrame {
                    node: Some(id),
                    input,
                    first: true,
                    thread,
                });
            }
            None => {
                let thread = self.allocate_thread();
                self.armed_thread = Some(thread);
                self.stack.push_back(StackFrame {
                    node: None,
                    input: 0,
                    first: true,
                    thread,
                });
            }
        }
    }

    /// Whether an event would fire: it must be an enabled event node, and
    /// the instigator must pass the node's "Instigator" filter. A filter
    /// with connections rejects an absent instigator; a node without
    /// connections (or without the link) accepts anything. Never mutates
    /// trigger counters.
    pub fn test_event(&self, id: NodeId, instigator: Option<&Value>) -> bool {
        let Some(node) = self.nodes.get(&id) else {
            return false;
        };
        if !node.kind().is_event() || !node.data().is_enabled() {
            return false;
        }
        let Some(filter) = node.data().value_link("Instigator") else {
            return true;
        };
        if filter.connections.is_empty() {
            return true;
        }
        let Some(instigator) = instigator else {
            return false;
        };
        filter.connections.iter().any(|vid| {
            self.nodes
                .get(vid)
                .and_then(|v| v.data().property("Value"))
                .map(|v| v == instigator)
                .unwrap_or(false)
        })
    }

    /// Fire an event: gate through `test_event` and the "Max Trigger Count"
    /// property (0 = unbounded), then schedule one frame per enabled node
    /// connected to the named output. Returns the thread the frames run on,
    /// or None when nothing was scheduled. A missing output name is a no-op.
    pub fn trigger_event(
        &mut self,
        id: NodeId,
        output: &str,
        instigator: Option<&Value>,
        count_trigger: bool,
    ) -> Option<ThreadId> {
        if !self.test_event(id, instigator) {
            return None;
        }
        let connections = {
            let node = self.nodes.get_mut(&id)?;
            if count_trigger {
                let max = node.data().max_trigger_count();
                if max > 0 && node.data().trigger_count() >= max {
                    debug!(node = %id, max, "event reached its trigger limit");
                    return None;
                }
                node.data_mut().count_trigger();
            }
            let Some(link) = node.data().output_link(output) else {
                debug!(node = %id, output, "triggering unknown output, ignored");
                return None;
            };
            link.connections.clone()
        };

        let mut frames = Vec::new();
        for (to, input_name) in &connections {
            let Some(target) = self.nodes.get(to) else {
                debug!(node = %to, "skipping connection to removed node");
                continue;
            };
            if !target.data().is_enabled() {
                continue;
            }
            if let Some(input) = target.data().input_index(input_name) {
                frames.push((*to, input));
            }
        }
        if frames.is_empty() {
            return None;
        }

        let thread = match self.armed_thread.take() {
            Some(t) => t,
            None => self.allocate_thread(),
        };
        for (node, input) in frames {
            self.stack.push_back(StackFrame {
                node: Some(node),
                input,
                first: true,
                thread,
            });
        }
        Some(thread)
    }

    /// Whether any work is pending, for the whole script or one thread
    pub fn is_running(&self, thread: Option<ThreadId>) -> bool {
        match thread {
            None => !self.stack.is_empty(),
            Some(t) => self.stack.iter().any(|f| f.thread == t),
        }
    }

    /// Number of frames waiting on the stack
    pub fn pending_frames(&self) -> usize {
        self.stack.len()
    }

    /// Run one tick: drain the frame stack FIFO. Frames scheduled while
    /// draining run within this same call; latent continuations are queued
    /// for the next tick with `first = false`.
    pub fn update(&mut self, sim_delta: f32, delta: f32) {
        if !self.started {
            self.on_start();
        }

        let mut processed = 0usize;
        let mut latent: Vec<StackFrame> = Vec::new();
        while let Some(frame) = self.stack.pop_front() {
            if processed >= MAX_FRAMES_PER_UPDATE {
                self.stack.push_front(frame);
                warn!(
                    remaining = self.stack.len(),
                    "frame budget exhausted, carrying remainder to next tick"
                );
                break;
            }
            processed += 1;

            let Some(id) = frame.node else {
                // thread-boundary sentinel
                continue;
            };
            let Some(mut node) = self.nodes.remove(&id) else {
                debug!(node = %id, "dropping frame for removed node");
                continue;
            };
            if !node.data().is_enabled() {
                self.nodes.insert(id, node);
                continue;
            }

            debug!(
                node = %id,
                label = node.data().label(),
                input = frame.input,
                first = frame.first,
                thread = %frame.thread,
                "updating node"
            );
            self.current_thread = Some(frame.thread);
            let mut ctx = UpdateContext {
                director: self,
                input: frame.input,
                first: frame.first,
                sim_delta,
                delta,
            };
            let stay = node.update(&mut ctx);
            self.armed_thread = None;
            self.drain_activations(&mut node, frame.thread);
            if stay {
                latent.push(StackFrame {
                    node: Some(id),
                    input: frame.input,
                    first: false,
                    thread: frame.thread,
                });
            }
            self.nodes.insert(id, node);
            self.current_thread = None;
        }

        for frame in latent {
            self.stack.push_back(frame);
        }
    }

    /// Turn a node's pending output activations into stack frames
    fn drain_activations(&mut self, node: &mut Node, thread: ThreadId) {
        let node_id = node.id();
        let pending: Vec<(u32, Vec<(NodeId, String)>)> = node
            .data_mut()
            .outputs_mut()
            .iter_mut()
            .filter_map(|link| {
                let n = link.take_activations();
                (n > 0).then(|| (n, link.connections.clone()))
            })
            .collect();

        for (count, connections) in pending {
            for _ in 0..count {
                for (to, input_name) in &connections {
                    let input = if *to == node_id {
                        node.data()
                            .is_enabled()
                            .then(|| node.data().input_index(input_name))
                            .flatten()
                    } else {
                        match self.nodes.get(to) {
                            Some(target) if target.data().is_enabled() => {
                                target.data().input_index(input_name)
                            }
                            Some(_) => None,
                            None => {
                                debug!(node = %to, "skipping connection to removed node");
                                None
                            }
                        }
                    };
                    if let Some(input) = input {
                        self.stack.push_back(StackFrame {
                            node: Some(*to),
                            input,
                            first: true,
                            thread,
                        });
                    }
                }
            }
        }
    }

    /// Drain activations produced outside the update loop (start and
    /// message hooks) onto a fresh thread
    fn flush_node(&mut self, node: &mut Node) {
        let has_pending = node
            .data()
            .outputs()
            .iter()
            .any(|l| l.pending_activations() > 0);
        if has_pending {
            let thread = self.allocate_thread();
            self.drain_activations(node, thread);
        }
    }

    /// First-tick setup: notify every behavior, then fire each enabled
    /// "Start Event" node
    fn on_start(&mut self) {
        self.started = true;
        info!(script = %self.name, "script started");

        for id in self.graph.node_ids(true) {
            let Some(mut node) = self.nodes.remove(&id) else {
                continue;
            };
            let mut ctx = UpdateContext {
                director: self,
                input: 0,
                first: true,
                sim_delta: 0.0,
                delta: 0.0,
            };
            node.notify_start(&mut ctx);
            self.flush_node(&mut node);
            self.nodes.insert(id, node);
        }

        for id in self.get_nodes("Start Event", "Core", None) {
            self.trigger_event(id, "Out", None, true);
        }
    }

    // ── Value flow ──

    /// Read through a value link: indexes across the connected value nodes
    /// (arrays contribute one slot per element) and falls back to the
    /// node's own property of the same name when nothing is connected
    pub fn read_value(&self, node: &NodeData, link: &str, index: usize) -> Value {
        if let Some(value_link) = node.value_link(link) {
            if !value_link.connections.is_empty() {
                let mut index = index;
                for vid in &value_link.connections {
                    let count = self.value_node_count(*vid);
                    if index < count {
                        return self.value_node_element(*vid, index);
                    }
                    index -= count;
                }
                return Value::Null;
            }
        }
        node.property(link).cloned().unwrap_or(Value::Null)
    }

    /// Number of addressable slots behind a value link
    pub fn read_value_count(&self, node: &NodeData, link: &str) -> usize {
        if let Some(value_link) = node.value_link(link) {
            if !value_link.connections.is_empty() {
                return value_link
                    .connections
                    .iter()
                    .map(|vid| self.value_node_count(*vid))
                    .sum();
            }
        }
        usize::from(node.property(link).is_some())
    }

    /// Write through a value link: `index` selects one addressable slot,
    /// None writes every slot. Falls back to the node's own property when
    /// nothing is connected.
    pub fn write_value(&mut self, node: &mut NodeData, link: &str, index: Option<usize>, value: Value) {
        if let Some(value_link) = node.value_link(link) {
            if !value_link.connections.is_empty() {
                let targets = value_link.connections.clone();
                match index {
                    None => {
                        for vid in targets {
                            self.write_value_node(vid, None, value.clone());
                        }
                    }
                    Some(mut index) => {
                        for vid in targets {
                            let count = self.value_node_count(vid);
                            if index < count {
                                self.write_value_node(vid, Some(index), value);
                                return;
                            }
                            index -= count;
                        }
                    }
                }
                return;
            }
        }
        node.set_property_value(link, value);
    }

    /// Addressable slot count of one value node (array length, else 1)
    pub fn property_count(&self, id: NodeId) -> usize {
        self.value_node_count(id)
    }

    fn value_node_count(&self, id: NodeId) -> usize {
        match self.nodes.get(&id).and_then(|n| n.data().property("Value")) {
            Some(Value::Array(items)) => items.len(),
            Some(_) => 1,
            None => 0,
        }
    }

    fn value_node_element(&self, id: NodeId, index: usize) -> Value {
        match self.nodes.get(&id).and_then(|n| n.data().property("Value")) {
            Some(Value::Array(items)) => items.get(index).cloned().unwrap_or(Value::Null),
            Some(value) if index == 0 => value.clone(),
            _ => Value::Null,
        }
    }

    fn write_value_node(&mut self, id: NodeId, index: Option<usize>, value: Value) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        let current = node.data().property("Value").cloned();
        let next = match (current, index) {
            (Some(Value::Array(mut items)), Some(i)) => {
                if i < items.len() {
                    items[i] = value;
                }
                Value::Array(items)
            }
            (Some(Value::Array(items)), None) => {
                Value::Array(items.iter().map(|_| value.clone()).collect())
            }
            _ => value,
        };
        if let Err(err) = node.set_property("Value", next) {
            debug!(node = %id, error = %err, "value write rejected");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
