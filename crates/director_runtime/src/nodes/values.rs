//! Built-in value nodes
//!
//! All value nodes share one behavior: a "Name" property for script-wide
//! lookup and a typed "Value" property holding the data. The Array node's
//! elements each count as one addressable slot for indexed reads and writes.

use director_types::{NodeKind, NodeType, Value};

use crate::{NodeBehavior, NodeData, NodeRegistry};

pub(super) fn register(registry: &mut NodeRegistry) {
    let types: [(&str, &str, Value); 6] = [
        ("Boolean", "Stores a boolean value.", Value::Bool(false)),
        ("Int", "Stores an integer value.", Value::Int(0)),
        ("Double", "Stores a double value.", Value::Double(0.0)),
        ("String", "Stores a string value.", Value::String(String::new())),
        ("Actor", "Stores an actor id.", Value::Id(uuid::Uuid::nil())),
        ("Array", "Stores an ordered list of values.", Value::Array(Vec::new())),
    ];
    for (name, description, default) in types {
        registry.register(NodeType::new(name, "Core", description), move || {
            Box::new(ValueStorage::new(default.clone()))
        });
    }
}

/// Shared behavior of every built-in value node
pub struct ValueStorage {
    default: Value,
}

impl ValueStorage {
    pub fn new(default: Value) -> Self {
        Self { default }
    }

    fn relabel(node: &mut NodeData) {
        let name = node
            .property("Name")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        if name.is_empty() {
            let value = node.property("Value").cloned().unwrap_or(Value::Null);
            node.set_label(value.to_string());
        } else {
            node.set_label(name);
        }
    }
}

impl NodeBehavior for ValueStorage {
    fn kind(&self) -> NodeKind {
        NodeKind::Value
    }

    fn build(&mut self, node: &mut NodeData) {
        node.add_property(
            "Name",
            "Name used to look this value up from code and actions.",
            Value::String(String::new()),
        );
        node.add_property("Value", "The stored value.", self.default.clone());
    }

    fn on_property_changed(&mut self, node: &mut NodeData, name: &str) {
        if name == "Name" || name == "Value" {
            Self::relabel(node);
        }
    }

    fn clone_behavior(&self) -> Box<dyn NodeBehavior> {
        Box::new(ValueStorage::new(self.default.clone()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::Director;

    fn setup() -> Director {
        Director::new(Arc::new(NodeRegistry::with_builtins()))
    }

    #[test]
    fn test_label_follows_name_then_value() {
        let mut director = setup();
        let id = director.create_node("Double", "Core", None).unwrap();
        director
            .set_node_property(id, "Value", Value::Double(2.5))
            .unwrap();
        assert_eq!(director.get_node(id).unwrap().data().label(), "2.5");

        director
            .set_node_property(id, "Name", Value::String("Result".into()))
            .unwrap();
        assert_eq!(director.get_node(id).unwrap().data().label(), "Result");
    }

    #[test]
    fn test_value_node_lookup_by_name() {
        let mut director = setup();
        let a = director.create_node("Int", "Core", None).unwrap();
        let b = director.create_node("Int", "Core", None).unwrap();
        director
            .set_node_property(b, "Name", Value::String("Score".into()))
            .unwrap();

        assert_eq!(director.get_value_node("Score"), Some(b));
        assert_eq!(director.get_value_node("Missing"), None);
        assert_ne!(director.get_value_node("Score"), Some(a));
    }

    #[test]
    fn test_array_slot_count() {
        let mut director = setup();
        let scalar = director.create_node("Int", "Core", None).unwrap();
        let array = director.create_node("Array", "Core", None).unwrap();
        director
            .set_node_property(
                array,
                "Value",
                Value::Array(vec![Value::Int(1), Value::Int(2)]),
            )
            .unwrap();

        assert_eq!(director.property_count(scalar), 1);
        assert_eq!(director.property_count(array), 2);
    }
}
