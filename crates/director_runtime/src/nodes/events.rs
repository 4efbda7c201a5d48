//! Built-in event nodes
//!
//! Event nodes are entry points: they are never scheduled themselves, the
//! Director fires them through `trigger_event` and their output connections
//! become the first frames of a new thread.

use director_types::{NodeKind, NodeType, Value, ValueKind};

use crate::{
    Message, NodeBehavior, NodeData, NodeRegistry, OutputLink, UpdateContext, ValueLink,
    PROP_MAX_TRIGGERS,
};

const MAX_TRIGGERS_DESC: &str =
    "Maximum number of times this event may fire, 0 for no limit.";

pub(super) fn register(registry: &mut NodeRegistry) {
    registry.register(
        NodeType::new("Start Event", "Core", "Fires once when the script starts."),
        || Box::new(StartEvent),
    );
    registry.register(
        NodeType::new(
            "Remote Event",
            "Core",
            "Fires when a Call Remote Event action calls its name.",
        ),
        || Box::new(RemoteEvent),
    );
    registry.register(
        NodeType::new(
            "Message Event",
            "Core",
            "Fires when a game message matching its pattern arrives.",
        ),
        || Box::new(MessageEvent),
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Start Event
// ─────────────────────────────────────────────────────────────────────────────

/// Fired by the Director on the first update
pub struct StartEvent;

impl NodeBehavior for StartEvent {
    fn kind(&self) -> NodeKind {
        NodeKind::Event
    }

    fn build(&mut self, node: &mut NodeData) {
        node.add_property(PROP_MAX_TRIGGERS, MAX_TRIGGERS_DESC, Value::Int(1));
        node.add_output(OutputLink::new("Out"));
    }

    fn clone_behavior(&self) -> Box<dyn NodeBehavior> {
        Box::new(StartEvent)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Remote Event
// ─────────────────────────────────────────────────────────────────────────────

/// Named entry point callable from anywhere in the script
pub struct RemoteEvent;

impl NodeBehavior for RemoteEvent {
    fn kind(&self) -> NodeKind {
        NodeKind::Event
    }

    fn build(&mut self, node: &mut NodeData) {
        node.add_property(
            "EventName",
            "Name used by Call Remote Event actions to find this event.",
            Value::String(String::new()),
        );
        node.add_property(PROP_MAX_TRIGGERS, MAX_TRIGGERS_DESC, Value::Int(0));
        node.add_value_link(
            ValueLink::new("Instigator")
                .typed(ValueKind::Id)
                .multiple(),
        );
        node.add_output(OutputLink::new("Out"));
    }

    fn on_property_changed(&mut self, node: &mut NodeData, name: &str) {
        if name == "EventName" {
            let event = node
                .property("EventName")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            if event.is_empty() {
                node.set_label("Remote Event");
            } else {
                node.set_label(event);
            }
        }
    }

    fn clone_behavior(&self) -> Box<dyn NodeBehavior> {
        Box::new(RemoteEvent)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Message Event
// ─────────────────────────────────────────────────────────────────────────────

/// Fires on game messages matching a wildcard pattern
pub struct MessageEvent;

impl NodeBehavior for MessageEvent {
    fn kind(&self) -> NodeKind {
        NodeKind::Event
    }

    fn build(&mut self, node: &mut NodeData) {
        node.add_property(
            "Message Type",
            "Wildcard pattern of message types to fire on; empty matches every message.",
            Value::String(String::new()),
        );
        node.add_property(PROP_MAX_TRIGGERS, MAX_TRIGGERS_DESC, Value::Int(0));
        node.add_value_link(
            ValueLink::new("Instigator")
                .typed(ValueKind::Id)
                .multiple(),
        );
        node.add_value_link(ValueLink::new("Data").out());
        node.add_output(OutputLink::new("Out"));
    }

    fn on_start(&mut self, node: &mut NodeData, ctx: &mut UpdateContext<'_>) {
        let pattern = node
            .property("Message Type")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        ctx.director.register_message(&pattern, node.id());
    }

    fn on_message(&mut self, node: &mut NodeData, ctx: &mut UpdateContext<'_>, message: &Message) {
        ctx.director
            .write_value(node, "Data", None, message.data.clone());
        node.activate_output("Out");
    }

    fn clone_behavior(&self) -> Box<dyn NodeBehavior> {
        Box::new(MessageEvent)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{Director, InputLink};

    struct Probe;

    impl NodeBehavior for Probe {
        fn kind(&self) -> NodeKind {
            NodeKind::Action
        }

        fn build(&mut self, node: &mut NodeData) {
            node.add_input(InputLink::new("In"));
            node.add_output(OutputLink::new("Out"));
            node.add_property("Count", "Number of activations so far.", Value::Int(0));
        }

        fn update(&mut self, node: &mut NodeData, _ctx: &mut UpdateContext<'_>) -> bool {
            let count = node.property("Count").and_then(Value::as_i64).unwrap_or(0);
            node.set_property_value("Count", Value::Int(count + 1));
            node.activate_output("Out");
            false
        }

        fn clone_behavior(&self) -> Box<dyn NodeBehavior> {
            Box::new(Probe)
        }
    }

    fn setup() -> Director {
        let mut registry = NodeRegistry::with_builtins();
        registry.register(NodeType::new("Probe", "Test", ""), || Box::new(Probe));
        Director::new(Arc::new(registry))
    }

    fn probe_count(director: &Director, id: director_types::NodeId) -> i64 {
        director
            .get_node(id)
            .unwrap()
            .data()
            .property("Count")
            .and_then(Value::as_i64)
            .unwrap()
    }

    #[test]
    fn test_start_event_fires_once() {
        let mut director = setup();
        let start = director.create_node("Start Event", "Core", None).unwrap();
        let probe = director.create_node("Probe", "Test", None).unwrap();
        director.connect_chain(start, "Out", probe, "In").unwrap();

        director.update(0.1, 0.1);
        director.update(0.1, 0.1);
        assert_eq!(probe_count(&director, probe), 1);

        // a second explicit trigger is also refused by the trigger limit
        assert!(director.trigger_event(start, "Out", None, true).is_none());
    }

    #[test]
    fn test_remote_event_relabels() {
        let mut director = setup();
        let remote = director.create_node("Remote Event", "Core", None).unwrap();
        director
            .set_node_property(remote, "EventName", Value::String("First".into()))
            .unwrap();
        assert_eq!(director.get_node(remote).unwrap().data().label(), "First");
    }

    #[test]
    fn test_message_event_pattern_delivery() {
        let mut director = setup();
        let event = director.create_node("Message Event", "Core", None).unwrap();
        director
            .set_node_property(event, "Message Type", Value::String("Actor *".into()))
            .unwrap();
        let probe = director.create_node("Probe", "Test", None).unwrap();
        director.connect_chain(event, "Out", probe, "In").unwrap();

        // registrations happen on the first update
        director.update(0.1, 0.1);

        director.process_message(&Message::new("Actor Moved"));
        director.process_message(&Message::new("Tick Local"));
        director.update(0.1, 0.1);
        assert_eq!(probe_count(&director, probe), 1);
    }

    #[test]
    fn test_message_event_honors_trigger_limit() {
        let mut director = setup();
        let event = director.create_node("Message Event", "Core", None).unwrap();
        director
            .set_node_property(event, PROP_MAX_TRIGGERS, Value::Int(1))
            .unwrap();
        let probe = director.create_node("Probe", "Test", None).unwrap();
        director.connect_chain(event, "Out", probe, "In").unwrap();
        director.update(0.1, 0.1);

        for _ in 0..3 {
            director.process_message(&Message::new("anything"));
            director.update(0.1, 0.1);
        }
        assert_eq!(probe_count(&director, probe), 1);
        assert_eq!(
            director.get_node(event).unwrap().data().trigger_count(),
            1
        );
    }

    #[test]
    fn test_message_event_instigator_filter() {
        let mut director = setup();
        let event = director.create_node("Message Event", "Core", None).unwrap();
        let probe = director.create_node("Probe", "Test", None).unwrap();
        director.connect_chain(event, "Out", probe, "In").unwrap();

        let actor = director.create_node("Actor", "Core", None).unwrap();
        let wanted = uuid::Uuid::new_v4();
        director
            .set_node_property(actor, "Value", Value::Id(wanted))
            .unwrap();
        director.connect_value(event, "Instigator", actor).unwrap();
        director.update(0.1, 0.1);

        // wrong instigator and no instigator are both rejected by the filter
        director
            .process_message(&Message::new("x").with_instigator(Value::Id(uuid::Uuid::new_v4())));
        director.process_message(&Message::new("x"));
        director.update(0.1, 0.1);
        assert_eq!(probe_count(&director, probe), 0);

        director.process_message(&Message::new("x").with_instigator(Value::Id(wanted)));
        director.update(0.1, 0.1);
        assert_eq!(probe_count(&director, probe), 1);
    }

    #[test]
    fn test_message_pattern_edit_applies_after_start() {
        let mut director = setup();
        let event = director.create_node("Message Event", "Core", None).unwrap();
        director
            .set_node_property(event, "Message Type", Value::String("Actor *".into()))
            .unwrap();
        let probe = director.create_node("Probe", "Test", None).unwrap();
        director.connect_chain(event, "Out", probe, "In").unwrap();
        director.update(0.1, 0.1);

        director
            .set_node_property(event, "Message Type", Value::String("Tick *".into()))
            .unwrap();
        director.process_message(&Message::new("Actor Moved"));
        director.process_message(&Message::new("Tick Local"));
        director.update(0.1, 0.1);
        assert_eq!(probe_count(&director, probe), 1);
    }

    #[test]
    fn test_message_event_unregister() {
        let mut director = setup();
        let event = director.create_node("Message Event", "Core", None).unwrap();
        let probe = director.create_node("Probe", "Test", None).unwrap();
        director.connect_chain(event, "Out", probe, "In").unwrap();
        director.update(0.1, 0.1);

        director.unregister_messages(event);
        director.process_message(&Message::new("anything"));
        director.update(0.1, 0.1);
        assert_eq!(probe_count(&director, probe), 0);
    }
}
