//! Built-in action nodes

use director_types::{NodeKind, NodeType, Value, ValueKind};
use tracing::{info, warn};

use crate::{
    InputLink, NodeBehavior, NodeData, NodeRegistry, OutputLink, UpdateContext, ValueLink,
};

pub(super) fn register(registry: &mut NodeRegistry) {
    registry.register(
        NodeType::new(
            "Call Remote Event",
            "Core",
            "Triggers every Remote Event with a matching name, each on its own thread.",
        ),
        || Box::new(CallRemoteEventAction),
    );
    registry.register(
        NodeType::new(
            "For Each",
            "Core",
            "Activates Each Item once per item in the list, then Finished.",
        ),
        || Box::new(ForEachAction::default()),
    );
    registry.register(
        NodeType::new("Delay", "Core", "Waits a number of simulation seconds."),
        || Box::new(DelayAction::default()),
    );
    registry.register(
        NodeType::new("Branch", "Core", "Activates True or False from a condition."),
        || Box::new(BranchAction),
    );
    registry.register(
        NodeType::new("Log Message", "Core", "Logs its message value."),
        || Box::new(LogAction),
    );
    registry.register(
        NodeType::new("Set Value", "Core", "Copies Source into Target."),
        || Box::new(SetValueAction),
    );
    registry.register(
        NodeType::new(
            "Loop",
            "Core",
            "Continually fires Cycle after a given time period while active.",
        ),
        || Box::new(LoopAction::default()),
    );
    registry.register(
        NodeType::new(
            "Switch",
            "Core",
            "Fires outputs in sequence, one per activation.",
        ),
        || Box::new(SwitchAction::default()),
    );
    registry.register(
        NodeType::new(
            "Arithmetic Operation",
            "Core",
            "Performs a simple operation between values A and B and outputs to Result.",
        ),
        || Box::new(OperationAction),
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Call Remote Event
// ─────────────────────────────────────────────────────────────────────────────

/// Fires every "Remote Event" whose EventName matches
pub struct CallRemoteEventAction;

impl NodeBehavior for CallRemoteEventAction {
    fn kind(&self) -> NodeKind {
        NodeKind::Action
    }

    fn build(&mut self, node: &mut NodeData) {
        node.add_input(InputLink::new("Call Event"));
        node.add_output(OutputLink::new("Event Finished"));
        node.add_property(
            "EventName",
            "Name of the remote event to call.",
            Value::String(String::new()),
        );
        node.add_value_link(ValueLink::new("Instigator").typed(ValueKind::Id));
    }

    fn update(&mut self, node: &mut NodeData, ctx: &mut UpdateContext<'_>) -> bool {
        let event_name = node
            .property("EventName")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        if !event_name.is_empty() {
            let instigator = ctx.director.read_value(node, "Instigator", 0);
            let instigator = (!instigator.is_null()).then_some(&instigator);
            let targets =
                ctx.director
                    .get_nodes("Remote Event", "Core", Some(("EventName", &event_name)));
            for target in targets {
                // each remote event runs as its own thread
                ctx.director.push_stack(None, 0);
                ctx.director
                    .trigger_event(target, "Out", instigator, true);
            }
        }
        node.activate_output("Event Finished");
        false
    }

    fn on_property_changed(&mut self, node: &mut NodeData, name: &str) {
        if name == "EventName" {
            let event = node
                .property("EventName")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            node.set_label(format!("Call Event: {event}"));
        }
    }

    fn clone_behavior(&self) -> Box<dyn NodeBehavior> {
        Box::new(CallRemoteEventAction)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// For Each
// ─────────────────────────────────────────────────────────────────────────────

const FOR_EACH_START: usize = 0;
// internal continuation inputs, scheduled by the node on itself
const FOR_EACH_ITEM: usize = 1;
const FOR_EACH_FINISHED: usize = 2;

/// Iterates an item list: one "Each Item" activation per item, then
/// "Finished", all within the starting tick
#[derive(Default)]
pub struct ForEachAction {
    cursor: usize,
}

impl NodeBehavior for ForEachAction {
    fn kind(&self) -> NodeKind {
        NodeKind::Action
    }

    fn build(&mut self, node: &mut NodeData) {
        node.add_input(InputLink::new("Start"));
        node.add_output(OutputLink::new("Each Item"));
        node.add_output(OutputLink::new("Finished"));
        node.add_value_link(ValueLink::new("Item List").multiple());
        node.add_value_link(ValueLink::new("Current Item").out());
        node.add_property(
            "Current Item",
            "Most recent item produced by the loop.",
            Value::Null,
        );
    }

    fn update(&mut self, node: &mut NodeData, ctx: &mut UpdateContext<'_>) -> bool {
        match ctx.input {
            FOR_EACH_START => {
                self.cursor = 0;
                let count = ctx.director.read_value_count(node, "Item List");
                for _ in 0..count {
                    ctx.director.push_stack(Some(node.id()), FOR_EACH_ITEM);
                }
                ctx.director.push_stack(Some(node.id()), FOR_EACH_FINISHED);
            }
            FOR_EACH_ITEM => {
                let item = ctx.director.read_value(node, "Item List", self.cursor);
                self.cursor += 1;
                ctx.director.write_value(node, "Current Item", None, item);
                node.activate_output("Each Item");
            }
            FOR_EACH_FINISHED => {
                node.activate_output("Finished");
            }
            _ => {}
        }
        false
    }

    fn clone_behavior(&self) -> Box<dyn NodeBehavior> {
        Box::new(ForEachAction::default())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Delay
// ─────────────────────────────────────────────────────────────────────────────

const DELAY_START: usize = 0;
const DELAY_STOP: usize = 1;
const DELAY_PAUSE: usize = 2;

/// Latent action: stays scheduled until its delay elapses
#[derive(Default)]
pub struct DelayAction {
    elapsed: f32,
    stopped: bool,
    paused: bool,
}

impl NodeBehavior for DelayAction {
    fn kind(&self) -> NodeKind {
        NodeKind::Action
    }

    fn build(&mut self, node: &mut NodeData) {
        node.add_input(InputLink::new("Start"));
        node.add_input(InputLink::new("Stop"));
        node.add_input(InputLink::new("Pause"));
        node.add_output(OutputLink::new("Started"));
        node.add_output(OutputLink::new("Stopped"));
        node.add_output(OutputLink::new("Time Elapsed"));
        node.add_property(
            "Delay",
            "Simulation seconds to wait before firing Time Elapsed.",
            Value::Double(1.0),
        );
        node.add_value_link(ValueLink::new("Delay").typed(ValueKind::Double));
    }

    fn update(&mut self, node: &mut NodeData, ctx: &mut UpdateContext<'_>) -> bool {
        match ctx.input {
            DELAY_START => {
                if ctx.first {
                    self.elapsed = 0.0;
                    self.stopped = false;
                    self.paused = false;
                    node.activate_output("Started");
                } else if !self.paused {
                    self.elapsed += ctx.sim_delta;
                }
                if self.stopped {
                    return false;
                }
                let delay = ctx
                    .director
                    .read_value(node, "Delay", 0)
                    .as_f64()
                    .unwrap_or(0.0) as f32;
                if self.elapsed >= delay {
                    node.activate_output("Time Elapsed");
                    false
                } else {
                    true
                }
            }
            DELAY_STOP => {
                self.stopped = true;
                node.activate_output("Stopped");
                false
            }
            DELAY_PAUSE => {
                self.paused = !self.paused;
                false
            }
            _ => false,
        }
    }

    fn clone_behavior(&self) -> Box<dyn NodeBehavior> {
        Box::new(DelayAction::default())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Branch
// ─────────────────────────────────────────────────────────────────────────────

/// Routes activation on a boolean condition
pub struct BranchAction;

impl NodeBehavior for BranchAction {
    fn kind(&self) -> NodeKind {
        NodeKind::Action
    }

    fn build(&mut self, node: &mut NodeData) {
        node.add_input(InputLink::new("In"));
        node.add_output(OutputLink::new("True"));
        node.add_output(OutputLink::new("False"));
        node.add_value_link(ValueLink::new("Condition").typed(ValueKind::Bool));
    }

    fn update(&mut self, node: &mut NodeData, ctx: &mut UpdateContext<'_>) -> bool {
        let condition = ctx
            .director
            .read_value(node, "Condition", 0)
            .as_bool()
            .unwrap_or(false);
        node.activate_output(if condition { "True" } else { "False" });
        false
    }

    fn clone_behavior(&self) -> Box<dyn NodeBehavior> {
        Box::new(BranchAction)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Log Message
// ─────────────────────────────────────────────────────────────────────────────

/// Writes its message value to the log
pub struct LogAction;

impl NodeBehavior for LogAction {
    fn kind(&self) -> NodeKind {
        NodeKind::Action
    }

    fn build(&mut self, node: &mut NodeData) {
        node.add_input(InputLink::new("In"));
        node.add_output(OutputLink::new("Out"));
        node.add_property(
            "Message",
            "Text to log when activated.",
            Value::String(String::new()),
        );
        node.add_value_link(ValueLink::new("Message"));
    }

    fn update(&mut self, node: &mut NodeData, ctx: &mut UpdateContext<'_>) -> bool {
        let message = ctx.director.read_value(node, "Message", 0);
        info!(target: "director::script", node = %node.id(), message = %message, "script log");
        node.activate_output("Out");
        false
    }

    fn clone_behavior(&self) -> Box<dyn NodeBehavior> {
        Box::new(LogAction)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Set Value
// ─────────────────────────────────────────────────────────────────────────────

/// Copies the Source value into every Target
pub struct SetValueAction;

impl NodeBehavior for SetValueAction {
    fn kind(&self) -> NodeKind {
        NodeKind::Action
    }

    fn build(&mut self, node: &mut NodeData) {
        node.add_input(InputLink::new("In"));
        node.add_output(OutputLink::new("Out"));
        node.add_value_link(ValueLink::new("Source"));
        node.add_value_link(ValueLink::new("Target").out().multiple());
    }

    fn update(&mut self, node: &mut NodeData, ctx: &mut UpdateContext<'_>) -> bool {
        let value = ctx.director.read_value(node, "Source", 0);
        ctx.director.write_value(node, "Target", None, value);
        node.activate_output("Out");
        false
    }

    fn clone_behavior(&self) -> Box<dyn NodeBehavior> {
        Box::new(SetValueAction)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Loop
// ─────────────────────────────────────────────────────────────────────────────

const LOOP_START: usize = 0;
const LOOP_STOP: usize = 1;

/// Latent action: fires "Cycle" every period of simulation time until
/// stopped, then "Finished"
#[derive(Default)]
pub struct LoopAction {
    elapsed: f32,
    stopped: bool,
}

impl NodeBehavior for LoopAction {
    fn kind(&self) -> NodeKind {
        NodeKind::Action
    }

    fn build(&mut self, node: &mut NodeData) {
        node.add_input(InputLink::new("Start"));
        node.add_input(InputLink::new("Stop"));
        node.add_output(OutputLink::new("Cycle"));
        node.add_output(OutputLink::new("Finished"));
        node.add_property(
            "Period",
            "Simulation seconds between Cycle activations.",
            Value::Double(1.0),
        );
        node.add_value_link(ValueLink::new("Period").typed(ValueKind::Double));
    }

    fn update(&mut self, node: &mut NodeData, ctx: &mut UpdateContext<'_>) -> bool {
        match ctx.input {
            LOOP_START => {
                if ctx.first {
                    self.elapsed = 0.0;
                    self.stopped = false;
                } else {
                    if self.stopped {
                        return false;
                    }
                    self.elapsed += ctx.sim_delta;
                }
                let period = ctx
                    .director
                    .read_value(node, "Period", 0)
                    .as_f64()
                    .unwrap_or(0.0) as f32;
                if period > 0.0 {
                    while self.elapsed >= period {
                        self.elapsed -= period;
                        node.activate_output("Cycle");
                    }
                }
                true
            }
            LOOP_STOP => {
                self.stopped = true;
                node.activate_output("Finished");
                false
            }
            _ => false,
        }
    }

    fn clone_behavior(&self) -> Box<dyn NodeBehavior> {
        Box::new(LoopAction::default())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Switch
// ─────────────────────────────────────────────────────────────────────────────

/// Fires its numbered outputs in sequence, one per activation
///
/// "Output Count" resizes the output set ("Out 1".."Out N"); with "Looping"
/// set the sequence wraps, otherwise activations past the end do nothing.
#[derive(Default)]
pub struct SwitchAction {
    cursor: usize,
}

impl NodeBehavior for SwitchAction {
    fn kind(&self) -> NodeKind {
        NodeKind::Action
    }

    fn build(&mut self, node: &mut NodeData) {
        node.add_input(InputLink::new("In"));
        node.add_output(OutputLink::new("Out 1"));
        node.add_property(
            "Output Count",
            "How many numbered outputs this switch has.",
            Value::Int(1),
        );
        node.add_property(
            "Looping",
            "Whether the sequence wraps back to Out 1 after the last output.",
            Value::Bool(true),
        );
    }

    fn update(&mut self, node: &mut NodeData, ctx: &mut UpdateContext<'_>) -> bool {
        let _ = ctx;
        let count = node.outputs().len();
        if count == 0 {
            return false;
        }
        if self.cursor >= count {
            let looping = node
                .property("Looping")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if !looping {
                return false;
            }
            self.cursor = 0;
        }
        let output = node.outputs()[self.cursor].name.clone();
        node.activate_output(&output);
        self.cursor += 1;
        false
    }

    fn on_property_changed(&mut self, node: &mut NodeData, name: &str) {
        if name == "Output Count" {
            let count = node
                .property("Output Count")
                .and_then(Value::as_i64)
                .unwrap_or(1)
                .max(1) as usize;
            while node.outputs().len() < count {
                let index = node.outputs().len() + 1;
                node.add_output(OutputLink::new(format!("Out {index}")));
            }
            node.truncate_outputs(count);
        }
    }

    fn clone_behavior(&self) -> Box<dyn NodeBehavior> {
        Box::new(SwitchAction::default())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Arithmetic Operation
// ─────────────────────────────────────────────────────────────────────────────

const OP_ADD: usize = 0;
const OP_SUBTRACT: usize = 1;
const OP_MULTIPLY: usize = 2;
const OP_DIVIDE: usize = 3;

/// Combines A and B with the operation named by the activated input and
/// writes the outcome to Result
pub struct OperationAction;

impl NodeBehavior for OperationAction {
    fn kind(&self) -> NodeKind {
        NodeKind::Action
    }

    fn build(&mut self, node: &mut NodeData) {
        node.add_input(InputLink::new("Add"));
        node.add_input(InputLink::new("Subtract"));
        node.add_input(InputLink::new("Multiply"));
        node.add_input(InputLink::new("Divide"));
        node.add_output(OutputLink::new("Out"));
        node.add_property("A", "Left operand.", Value::Double(0.0));
        node.add_property("B", "Right operand.", Value::Double(0.0));
        node.add_value_link(ValueLink::new("A"));
        node.add_value_link(ValueLink::new("B"));
        node.add_value_link(ValueLink::new("Result").out().multiple());
    }

    fn update(&mut self, node: &mut NodeData, ctx: &mut UpdateContext<'_>) -> bool {
        let a = ctx.director.read_value(node, "A", 0);
        let b = ctx.director.read_value(node, "B", 0);
        let both_int = a.kind() == ValueKind::Int && b.kind() == ValueKind::Int;
        let (x, y) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
        let outcome = match ctx.input {
            OP_ADD => x + y,
            OP_SUBTRACT => x - y,
            OP_MULTIPLY => x * y,
            OP_DIVIDE => {
                if y == 0.0 {
                    warn!(node = %node.id(), "division by zero, result is 0");
                    0.0
                } else {
                    x / y
                }
            }
            _ => return false,
        };
        let result = if both_int {
            Value::Int(outcome as i64)
        } else {
            Value::Double(outcome)
        };
        ctx.director.write_value(node, "Result", None, result);
        node.activate_output("Out");
        false
    }

    fn clone_behavior(&self) -> Box<dyn NodeBehavior> {
        Box::new(OperationAction)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::Director;
    use director_types::NodeId;

    /// Appends its tag to a shared log on every activation
    struct Recorder {
        tag: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl NodeBehavior for Recorder {
        fn kind(&self) -> NodeKind {
            NodeKind::Action
        }

        fn build(&mut self, node: &mut NodeData) {
            node.add_input(InputLink::new("In"));
            node.add_output(OutputLink::new("Out"));
        }

        fn update(&mut self, node: &mut NodeData, _ctx: &mut UpdateContext<'_>) -> bool {
            self.log.lock().unwrap().push(self.tag);
            node.activate_output("Out");
            false
        }

        fn clone_behavior(&self) -> Box<dyn NodeBehavior> {
            Box::new(Recorder {
                tag: self.tag,
                log: Arc::clone(&self.log),
            })
        }
    }

    fn setup_with_recorders(
        tags: &[&'static str],
    ) -> (Director, Arc<Mutex<Vec<&'static str>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = NodeRegistry::with_builtins();
        for tag in tags {
            let tag = *tag;
            let log = Arc::clone(&log);
            registry.register(NodeType::new(tag, "Test", ""), move || {
                Box::new(Recorder {
                    tag,
                    log: Arc::clone(&log),
                })
            });
        }
        (Director::new(Arc::new(registry)), log)
    }

    fn double_node(director: &mut Director, value: f64) -> NodeId {
        let id = director.create_node("Double", "Core", None).unwrap();
        director
            .set_node_property(id, "Value", Value::Double(value))
            .unwrap();
        id
    }

    #[test]
    fn test_branch_routes_on_condition() {
        let (mut director, log) = setup_with_recorders(&["true", "false"]);
        let branch = director.create_node("Branch", "Core", None).unwrap();
        let yes = director.create_node("true", "Test", None).unwrap();
        let no = director.create_node("false", "Test", None).unwrap();
        let cond = director.create_node("Boolean", "Core", None).unwrap();
        director.connect_chain(branch, "True", yes, "In").unwrap();
        director.connect_chain(branch, "False", no, "In").unwrap();
        director.connect_value(branch, "Condition", cond).unwrap();

        director.push_stack(Some(branch), 0);
        director.update(0.1, 0.1);
        assert_eq!(*log.lock().unwrap(), vec!["false"]);

        director
            .set_node_property(cond, "Value", Value::Bool(true))
            .unwrap();
        director.push_stack(Some(branch), 0);
        director.update(0.1, 0.1);
        assert_eq!(*log.lock().unwrap(), vec!["false", "true"]);
    }

    #[test]
    fn test_set_value_copies_source_to_target() {
        let (mut director, _log) = setup_with_recorders(&[]);
        let action = director.create_node("Set Value", "Core", None).unwrap();
        let source = double_node(&mut director, 100.0);
        let target = double_node(&mut director, 0.0);
        director.connect_value(action, "Source", source).unwrap();
        director.connect_value(action, "Target", target).unwrap();

        director.push_stack(Some(action), 0);
        director.update(0.1, 0.1);

        let result = director
            .get_node(target)
            .unwrap()
            .data()
            .property("Value")
            .and_then(Value::as_f64);
        assert_eq!(result, Some(100.0));
    }

    #[test]
    fn test_for_each_visits_items_then_finishes() {
        let (mut director, log) = setup_with_recorders(&["item", "finished"]);
        let for_each = director.create_node("For Each", "Core", None).unwrap();
        let list = director.create_node("Array", "Core", None).unwrap();
        director
            .set_node_property(
                list,
                "Value",
                Value::Array(vec![Value::Int(10), Value::Int(20), Value::Int(30)]),
            )
            .unwrap();
        let current = director.create_node("Int", "Core", None).unwrap();
        let item = director.create_node("item", "Test", None).unwrap();
        let finished = director.create_node("finished", "Test", None).unwrap();
        director.connect_value(for_each, "Item List", list).unwrap();
        director
            .connect_value(for_each, "Current Item", current)
            .unwrap();
        director
            .connect_chain(for_each, "Each Item", item, "In")
            .unwrap();
        director
            .connect_chain(for_each, "Finished", finished, "In")
            .unwrap();

        director.push_stack(Some(for_each), 0);
        director.update(0.1, 0.1);

        assert_eq!(
            *log.lock().unwrap(),
            vec!["item", "item", "item", "finished"]
        );
        let last = director
            .get_node(current)
            .unwrap()
            .data()
            .property("Value")
            .and_then(Value::as_i64);
        assert_eq!(last, Some(30));
    }

    #[test]
    fn test_for_each_empty_list_still_finishes() {
        let (mut director, log) = setup_with_recorders(&["item", "finished"]);
        let for_each = director.create_node("For Each", "Core", None).unwrap();
        let list = director.create_node("Array", "Core", None).unwrap();
        let item = director.create_node("item", "Test", None).unwrap();
        let finished = director.create_node("finished", "Test", None).unwrap();
        director.connect_value(for_each, "Item List", list).unwrap();
        director
            .connect_chain(for_each, "Each Item", item, "In")
            .unwrap();
        director
            .connect_chain(for_each, "Finished", finished, "In")
            .unwrap();

        director.push_stack(Some(for_each), 0);
        director.update(0.1, 0.1);
        assert_eq!(*log.lock().unwrap(), vec!["finished"]);
    }

    #[test]
    fn test_delay_spans_ticks() {
        let (mut director, log) = setup_with_recorders(&["started", "elapsed"]);
        let delay = director.create_node("Delay", "Core", None).unwrap();
        let started = director.create_node("started", "Test", None).unwrap();
        let elapsed = director.create_node("elapsed", "Test", None).unwrap();
        director
            .connect_chain(delay, "Started", started, "In")
            .unwrap();
        director
            .connect_chain(delay, "Time Elapsed", elapsed, "In")
            .unwrap();

        director.push_stack(Some(delay), 0);
        director.update(0.6, 0.6);
        assert_eq!(*log.lock().unwrap(), vec!["started"]);
        assert!(director.is_running(None));

        director.update(0.6, 0.6);
        assert_eq!(*log.lock().unwrap(), vec!["started"]);

        director.update(0.6, 0.6);
        assert_eq!(*log.lock().unwrap(), vec!["started", "elapsed"]);
        assert!(!director.is_running(None));
    }

    #[test]
    fn test_delay_stop_cancels() {
        let (mut director, log) = setup_with_recorders(&["stopped", "elapsed"]);
        let delay = director.create_node("Delay", "Core", None).unwrap();
        let stopped = director.create_node("stopped", "Test", None).unwrap();
        let elapsed = director.create_node("elapsed", "Test", None).unwrap();
        director
            .connect_chain(delay, "Stopped", stopped, "In")
            .unwrap();
        director
            .connect_chain(delay, "Time Elapsed", elapsed, "In")
            .unwrap();

        director.push_stack(Some(delay), DELAY_START);
        director.update(0.1, 0.1);
        director.push_stack(Some(delay), DELAY_STOP);
        director.update(0.1, 0.1);
        for _ in 0..20 {
            director.update(0.1, 0.1);
        }

        assert_eq!(*log.lock().unwrap(), vec!["stopped"]);
        assert!(!director.is_running(None));
    }

    #[test]
    fn test_call_remote_event_runs_each_match_on_its_own_thread() {
        let (mut director, log) = setup_with_recorders(&["a", "b", "after"]);
        let call = director
            .create_node("Call Remote Event", "Core", None)
            .unwrap();
        director
            .set_node_property(call, "EventName", Value::String("Ping".into()))
            .unwrap();
        assert_eq!(
            director.get_node(call).unwrap().data().label(),
            "Call Event: Ping"
        );

        for (event_name, tag) in [("Ping", "a"), ("Pong", "b"), ("Ping", "b")] {
            let event = director.create_node("Remote Event", "Core", None).unwrap();
            director
                .set_node_property(event, "EventName", Value::String(event_name.into()))
                .unwrap();
            let probe = director.create_node(tag, "Test", None).unwrap();
            director.connect_chain(event, "Out", probe, "In").unwrap();
        }
        let after = director.create_node("after", "Test", None).unwrap();
        director
            .connect_chain(call, "Event Finished", after, "In")
            .unwrap();

        director.push_stack(Some(call), 0);
        director.update(0.1, 0.1);

        // both "Ping" events fire, "Pong" does not, and the finished chain
        // still runs within the same tick
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "after"]);
    }

    #[test]
    fn test_loop_cycles_until_stopped() {
        let (mut director, log) = setup_with_recorders(&["cycle", "finished"]);
        let repeat = director.create_node("Loop", "Core", None).unwrap();
        let cycle = director.create_node("cycle", "Test", None).unwrap();
        let finished = director.create_node("finished", "Test", None).unwrap();
        director.connect_chain(repeat, "Cycle", cycle, "In").unwrap();
        director
            .connect_chain(repeat, "Finished", finished, "In")
            .unwrap();
        director
            .set_node_property(repeat, "Period", Value::Double(0.5))
            .unwrap();

        director.push_stack(Some(repeat), LOOP_START);
        director.update(0.5, 0.5);
        assert_eq!(*log.lock().unwrap(), Vec::<&str>::new());

        director.update(0.5, 0.5);
        director.update(0.5, 0.5);
        assert_eq!(*log.lock().unwrap(), vec!["cycle", "cycle"]);

        // the pending continuation runs before the stop frame in this tick
        director.push_stack(Some(repeat), LOOP_STOP);
        director.update(0.5, 0.5);
        assert_eq!(*log.lock().unwrap(), vec!["cycle", "cycle", "cycle", "finished"]);

        director.update(0.5, 0.5);
        assert_eq!(*log.lock().unwrap(), vec!["cycle", "cycle", "cycle", "finished"]);
        assert!(!director.is_running(None));
    }

    #[test]
    fn test_switch_fires_outputs_in_sequence() {
        let (mut director, log) = setup_with_recorders(&["one", "two"]);
        let switch = director.create_node("Switch", "Core", None).unwrap();
        director
            .set_node_property(switch, "Output Count", Value::Int(2))
            .unwrap();
        let one = director.create_node("one", "Test", None).unwrap();
        let two = director.create_node("two", "Test", None).unwrap();
        director.connect_chain(switch, "Out 1", one, "In").unwrap();
        director.connect_chain(switch, "Out 2", two, "In").unwrap();

        for _ in 0..3 {
            director.push_stack(Some(switch), 0);
        }
        director.update(0.1, 0.1);
        assert_eq!(*log.lock().unwrap(), vec!["one", "two", "one"]);
    }

    #[test]
    fn test_switch_without_looping_stops_at_end() {
        let (mut director, log) = setup_with_recorders(&["one", "two"]);
        let switch = director.create_node("Switch", "Core", None).unwrap();
        director
            .set_node_property(switch, "Output Count", Value::Int(2))
            .unwrap();
        director
            .set_node_property(switch, "Looping", Value::Bool(false))
            .unwrap();
        let one = director.create_node("one", "Test", None).unwrap();
        let two = director.create_node("two", "Test", None).unwrap();
        director.connect_chain(switch, "Out 1", one, "In").unwrap();
        director.connect_chain(switch, "Out 2", two, "In").unwrap();

        for _ in 0..3 {
            director.push_stack(Some(switch), 0);
        }
        director.update(0.1, 0.1);
        assert_eq!(*log.lock().unwrap(), vec!["one", "two"]);
    }

    #[test]
    fn test_switch_shrinking_output_count_drops_links() {
        let (mut director, _log) = setup_with_recorders(&[]);
        let switch = director.create_node("Switch", "Core", None).unwrap();
        director
            .set_node_property(switch, "Output Count", Value::Int(3))
            .unwrap();
        assert_eq!(director.get_node(switch).unwrap().data().outputs().len(), 3);

        director
            .set_node_property(switch, "Output Count", Value::Int(1))
            .unwrap();
        let data = director.get_node(switch).unwrap().data();
        assert_eq!(data.outputs().len(), 1);
        assert!(data.output_link("Out 1").is_some());
    }

    #[test]
    fn test_operation_combines_linked_values() {
        let (mut director, _log) = setup_with_recorders(&[]);
        let op = director
            .create_node("Arithmetic Operation", "Core", None)
            .unwrap();
        let a = director.create_node("Int", "Core", None).unwrap();
        director.set_node_property(a, "Value", Value::Int(8)).unwrap();
        let b = director.create_node("Int", "Core", None).unwrap();
        director.set_node_property(b, "Value", Value::Int(2)).unwrap();
        let result = director.create_node("Int", "Core", None).unwrap();
        director.connect_value(op, "A", a).unwrap();
        director.connect_value(op, "B", b).unwrap();
        director.connect_value(op, "Result", result).unwrap();

        director.push_stack(Some(op), OP_SUBTRACT);
        director.update(0.1, 0.1);
        assert_eq!(
            director
                .get_node(result)
                .unwrap()
                .data()
                .property("Value")
                .cloned(),
            Some(Value::Int(6))
        );

        director.push_stack(Some(op), OP_DIVIDE);
        director.update(0.1, 0.1);
        assert_eq!(
            director
                .get_node(result)
                .unwrap()
                .data()
                .property("Value")
                .cloned(),
            Some(Value::Int(4))
        );
    }

    #[test]
    fn test_operation_division_by_zero_is_zero() {
        let (mut director, _log) = setup_with_recorders(&[]);
        let op = director
            .create_node("Arithmetic Operation", "Core", None)
            .unwrap();
        director
            .set_node_property(op, "A", Value::Double(5.0))
            .unwrap();
        let result = double_node(&mut director, 99.0);
        director.connect_value(op, "Result", result).unwrap();

        director.push_stack(Some(op), OP_DIVIDE);
        director.update(0.1, 0.1);
        assert_eq!(
            director
                .get_node(result)
                .unwrap()
                .data()
                .property("Value")
                .and_then(Value::as_f64),
            Some(0.0)
        );
    }
}
