//! Script persistence
//!
//! A Director converts to and from the `ScriptData` model in stable order:
//! graphs in tree order, nodes in declaration order, properties in map
//! order, connections in link order. Loading is tolerant: unknown node
//! types, unknown properties, and dangling links become diagnostics and the
//! rest of the script loads.

use std::path::Path;
use std::sync::Arc;

use director_types::{
    ChainLinkRecord, GraphData, LoadDiagnostic, NodeId, NodeRecord, PropertyRecord, ScriptData,
    ValueLinkRecord,
};
use tracing::warn;

use crate::{Director, DirectorError, DirectorGraph, NodeRegistry};

impl Director {
    // ── Saving ──

    /// Snapshot the whole script
    pub fn to_data(&self) -> ScriptData {
        ScriptData {
            name: self.name.clone(),
            description: self.description.clone(),
            author: self.author.clone(),
            comment: self.comment.clone(),
            copyright: self.copyright.clone(),
            graph: self.graph_data(self.graph()),
        }
    }

    fn graph_data(&self, graph: &DirectorGraph) -> GraphData {
        GraphData {
            id: graph.id(),
            name: graph.name.clone(),
            comment: graph.comment.clone(),
            nodes: graph
                .nodes()
                .iter()
                .filter_map(|id| self.node_record(*id))
                .collect(),
            subgraphs: graph.subgraphs().iter().map(|g| self.graph_data(g)).collect(),
        }
    }

    fn node_record(&self, id: NodeId) -> Option<NodeRecord> {
        let node = self.get_node(id)?;
        let data = node.data();
        Some(NodeRecord {
            id,
            type_name: data.node_type().name.clone(),
            category: data.node_type().category.clone(),
            properties: data
                .properties()
                .map(|p| PropertyRecord {
                    name: p.name.clone(),
                    value: p.value.clone(),
                })
                .collect(),
            chain_links: data
                .outputs()
                .iter()
                .flat_map(|link| {
                    link.connections.iter().map(|(to, input)| ChainLinkRecord {
                        output: link.name.clone(),
                        to_node: *to,
                        to_input: input.clone(),
                    })
                })
                .collect(),
            value_links: data
                .value_links()
                .iter()
                .filter(|link| !link.connections.is_empty())
                .map(|link| ValueLinkRecord {
                    link: link.name.clone(),
                    nodes: link.connections.clone(),
                })
                .collect(),
        })
    }

    /// Save the script as pretty-printed JSON
    pub fn save_file(&self, path: impl AsRef<Path>) -> Result<(), DirectorError> {
        let json = serde_json::to_string_pretty(&self.to_data())?;
        std::fs::write(path, json)?;
        Ok(())
    }

    // ── Loading ──

    /// Reconstruct a script from data, collecting diagnostics for anything
    /// the registry or the data cannot resolve
    pub fn from_data(
        data: &ScriptData,
        registry: Arc<NodeRegistry>,
    ) -> (Director, Vec<LoadDiagnostic>) {
        let mut director = Director::new(registry);
        director.name = data.name.clone();
        director.description = data.description.clone();
        director.author = data.author.clone();
        director.comment = data.comment.clone();
        director.copyright = data.copyright.clone();

        let mut diagnostics = Vec::new();
        let root = {
            let graph = director.graph_mut();
            graph.set_id(data.graph.id);
            graph.name = data.graph.name.clone();
            graph.comment = data.graph.comment.clone();
            graph.id()
        };
        director.load_graph_into(root, &data.graph, &mut diagnostics);
        director.wire_graph(&data.graph, &mut diagnostics);
        (director, diagnostics)
    }

    /// Load a script from a JSON file
    pub fn load_file(
        path: impl AsRef<Path>,
        registry: Arc<NodeRegistry>,
    ) -> Result<(Director, Vec<LoadDiagnostic>), DirectorError> {
        let json = std::fs::read_to_string(path)?;
        let data: ScriptData = serde_json::from_str(&json)?;
        Ok(Self::from_data(&data, registry))
    }

    fn load_graph_into(
        &mut self,
        target: director_types::GraphId,
        data: &GraphData,
        diagnostics: &mut Vec<LoadDiagnostic>,
    ) {
        for record in &data.nodes {
            let mut node = match self.registry().create(&record.type_name, &record.category) {
                Ok(node) => node,
                Err(_) => {
                    diagnostics.push(LoadDiagnostic::MissingNodeType {
                        name: record.type_name.clone(),
                        category: record.category.clone(),
                        node: record.id,
                    });
                    continue;
                }
            };
            node.data_mut().set_id(record.id);
            for prop in &record.properties {
                if node.set_property(&prop.name, prop.value.clone()).is_err() {
                    diagnostics.push(LoadDiagnostic::UnknownProperty {
                        node: record.id,
                        property: prop.name.clone(),
                    });
                }
            }
            if let Err(err) = self.add_node(node, Some(target)) {
                warn!(node = %record.id, error = %err, "discarding node during load");
            }
        }

        for sub in &data.subgraphs {
            let mut graph = DirectorGraph::new(sub.name.clone());
            graph.set_id(sub.id);
            graph.comment = sub.comment.clone();
            let Some(parent) = self.graph_mut().graph_mut(target) else {
                continue;
            };
            let sub_id = parent.add_subgraph(graph);
            self.load_graph_into(sub_id, sub, diagnostics);
        }
    }

    fn wire_graph(&mut self, data: &GraphData, diagnostics: &mut Vec<LoadDiagnostic>) {
        for record in &data.nodes {
            if self.get_node(record.id).is_none() {
                // missing node type, already reported
                continue;
            }
            for link in &record.chain_links {
                if self
                    .connect_chain(record.id, &link.output, link.to_node, &link.to_input)
                    .is_err()
                {
                    diagnostics.push(LoadDiagnostic::DanglingLink {
                        node: record.id,
                        link: link.output.clone(),
                    });
                }
            }
            for link in &record.value_links {
                for target in &link.nodes {
                    if self.connect_value(record.id, &link.link, *target).is_err() {
                        diagnostics.push(LoadDiagnostic::DanglingLink {
                            node: record.id,
                            link: link.link.clone(),
                        });
                    }
                }
            }
        }
        for sub in &data.subgraphs {
            self.wire_graph(sub, diagnostics);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NodeRegistry;
    use director_types::Value;

    fn registry() -> Arc<NodeRegistry> {
        Arc::new(NodeRegistry::with_builtins())
    }

    /// Remote Event "First" -> Set Value copying 100.0 into "Result"
    fn sample_script(registry: &Arc<NodeRegistry>) -> Director {
        let mut director = Director::new(Arc::clone(registry));
        director.name = "sample".to_string();

        let remote = director.create_node("Remote Event", "Core", None).unwrap();
        director
            .set_node_property(remote, "EventName", Value::String("First".into()))
            .unwrap();
        let action = director.create_node("Set Value", "Core", None).unwrap();
        let hundred = director.create_node("Double", "Core", None).unwrap();
        director
            .set_node_property(hundred, "Value", Value::Double(100.0))
            .unwrap();
        let result = director.create_node("Double", "Core", None).unwrap();
        director
            .set_node_property(result, "Name", Value::String("Result".into()))
            .unwrap();

        director.connect_chain(remote, "Out", action, "In").unwrap();
        director.connect_value(action, "Source", hundred).unwrap();
        director.connect_value(action, "Target", result).unwrap();
        director
    }

    #[test]
    fn test_data_roundtrip_is_stable() {
        let registry = registry();
        let director = sample_script(&registry);

        let data = director.to_data();
        let (loaded, diagnostics) = Director::from_data(&data, Arc::clone(&registry));
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(loaded.to_data(), data);
    }

    #[test]
    fn test_loaded_script_still_runs() {
        let registry = registry();
        let data = sample_script(&registry).to_data();
        let (mut loaded, _) = Director::from_data(&data, Arc::clone(&registry));

        let remote = loaded
            .get_nodes("Remote Event", "Core", Some(("EventName", "First")))
            .into_iter()
            .next()
            .unwrap();
        loaded.trigger_event(remote, "Out", None, true).unwrap();
        loaded.update(0.1, 0.1);

        let result = loaded.get_value_node("Result").unwrap();
        let value = loaded
            .get_node(result)
            .unwrap()
            .data()
            .property("Value")
            .and_then(Value::as_f64);
        assert_eq!(value, Some(100.0));
    }

    #[test]
    fn test_file_roundtrip() {
        let registry = registry();
        let director = sample_script(&registry);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.dtscript.json");
        director.save_file(&path).unwrap();

        let (loaded, diagnostics) = Director::load_file(&path, Arc::clone(&registry)).unwrap();
        assert!(diagnostics.is_empty());
        assert_eq!(loaded.to_data(), director.to_data());
        assert_eq!(loaded.name, "sample");
    }

    #[test]
    fn test_missing_node_type_is_a_diagnostic() {
        let registry = registry();
        let mut data = sample_script(&registry).to_data();
        data.graph.nodes[1].type_name = "Frobnicate".to_string();

        let (loaded, diagnostics) = Director::from_data(&data, Arc::clone(&registry));
        assert!(diagnostics.iter().any(|d| matches!(
            d,
            LoadDiagnostic::MissingNodeType { name, .. } if name == "Frobnicate"
        )));
        // the remaining nodes still loaded
        assert_eq!(loaded.graph().nodes().len(), 3);
    }

    #[test]
    fn test_dangling_link_is_a_diagnostic() {
        let registry = registry();
        let mut data = sample_script(&registry).to_data();
        data.graph.nodes[0].chain_links[0].to_node = NodeId::new();

        let (loaded, diagnostics) = Director::from_data(&data, Arc::clone(&registry));
        assert!(diagnostics
            .iter()
            .any(|d| matches!(d, LoadDiagnostic::DanglingLink { .. })));
        assert_eq!(loaded.graph().nodes().len(), 4);
    }

    #[test]
    fn test_unknown_property_is_a_diagnostic() {
        let registry = registry();
        let mut data = sample_script(&registry).to_data();
        data.graph.nodes[0].properties.push(PropertyRecord {
            name: "Ancient Setting".to_string(),
            value: Value::Int(3),
        });

        let (_, diagnostics) = Director::from_data(&data, Arc::clone(&registry));
        assert!(diagnostics.iter().any(|d| matches!(
            d,
            LoadDiagnostic::UnknownProperty { property, .. } if property == "Ancient Setting"
        )));
    }
}
