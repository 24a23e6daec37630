// SPDX-License-Identifier: MIT OR Apache-2.0
//! Snapshot export/import: the sole persisted form of the graph.
//!
//! A snapshot is `{ modules: { name: { nodes: { id: Node } } } }`,
//! serializable to JSON. Export and import both deep-copy, so holders of a
//! snapshot are never aliased to live store state, and every mutation path
//! stays reconstructable from this structure alone.

use crate::link::ConnectionRef;
use crate::module::Module;
use crate::node::NodeId;
use crate::store::GraphStore;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Complete serializable state of all modules
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Modules by name
    pub modules: IndexMap<String, Module>,
}

/// Import/serialization failures
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// JSON (de)serialization failed
    #[error("Snapshot JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A node is stored under a key that differs from its own id
    #[error("Node keyed {key:?} carries id {id}")]
    IdMismatch {
        /// Map key
        key: String,
        /// Id stored inside the node
        id: NodeId,
    },

    /// The same node id appears in more than one module
    #[error("Node id {0} appears in more than one module")]
    DuplicateNodeId(NodeId),

    /// An endpoint references a node or port that does not resolve
    #[error("Dangling endpoint in module {module:?}: {connection:?}")]
    DanglingEndpoint {
        /// Module the endpoint was found in
        module: String,
        /// The unresolvable connection
        connection: ConnectionRef,
    },

    /// An endpoint exists on one side of the mirror only
    #[error("Unmirrored endpoint in module {module:?}: {connection:?}")]
    UnmirroredEndpoint {
        /// Module the endpoint was found in
        module: String,
        /// The half-present connection
        connection: ConnectionRef,
    },
}

impl Snapshot {
    /// Serialize to the JSON interchange form
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse from the JSON interchange form (structure only; referential
    /// validation happens at [`GraphStore::import`])
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check keys, graph-wide id uniqueness, endpoint resolution, and the
    /// mirror invariant.
    fn validate(&self) -> Result<(), SnapshotError> {
        let mut seen: HashSet<&NodeId> = HashSet::new();
        for (key, node) in self.modules.values().flat_map(|m| &m.nodes) {
            if key != &node.id {
                return Err(SnapshotError::IdMismatch {
                    key: key.to_string(),
                    id: node.id.clone(),
                });
            }
            if !seen.insert(&node.id) {
                return Err(SnapshotError::DuplicateNodeId(node.id.clone()));
            }
        }

        for (name, module) in &self.modules {
            for node in module.iter() {
                for (port, slot) in &node.outputs {
                    for link in &slot.connections {
                        let conn = ConnectionRef::new(
                            node.id.clone(),
                            *port,
                            link.node.clone(),
                            link.port,
                        );
                        let target = module.node(&link.node).ok_or_else(|| {
                            SnapshotError::DanglingEndpoint {
                                module: name.clone(),
                                connection: conn.clone(),
                            }
                        })?;
                        let mirror = target.incoming(link.port).ok_or_else(|| {
                            SnapshotError::DanglingEndpoint {
                                module: name.clone(),
                                connection: conn.clone(),
                            }
                        })?;
                        if !mirror
                            .iter()
                            .any(|m| m.node == node.id && m.port == *port)
                        {
                            return Err(SnapshotError::UnmirroredEndpoint {
                                module: name.clone(),
                                connection: conn,
                            });
                        }
                    }
                }
                for (port, slot) in &node.inputs {
                    for link in &slot.connections {
                        let conn = ConnectionRef::new(
                            link.node.clone(),
                            link.port,
                            node.id.clone(),
                            *port,
                        );
                        let source = module.node(&link.node).ok_or_else(|| {
                            SnapshotError::DanglingEndpoint {
                                module: name.clone(),
                                connection: conn.clone(),
                            }
                        })?;
                        let mirror = source.outgoing(link.port).ok_or_else(|| {
                            SnapshotError::DanglingEndpoint {
                                module: name.clone(),
                                connection: conn.clone(),
                            }
                        })?;
                        if !mirror
                            .iter()
                            .any(|m| m.node == node.id && m.port == *port)
                        {
                            return Err(SnapshotError::UnmirroredEndpoint {
                                module: name.clone(),
                                connection: conn,
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl GraphStore {
    /// Deep-copy the complete graph state out
    pub fn export(&self) -> Snapshot {
        Snapshot {
            modules: self.modules_ref().clone(),
        }
    }

    /// Replace all module state with a deep copy of the snapshot.
    ///
    /// The snapshot is validated first; a rejected import leaves the store
    /// untouched. The active module becomes the default module when the
    /// snapshot carries one, otherwise the snapshot's first module.
    pub fn import(&mut self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        snapshot.validate()?;
        self.replace_modules(snapshot.modules.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::PathPoint;
    use crate::node::{NodeSpec, RenderSpec};
    use crate::port::PortId;
    use serde_json::json;

    fn populated_store() -> GraphStore {
        let mut store = GraphStore::default();
        let data = json!({
            "label": "feed",
            "limits": { "min": 0, "max": 10, "tags": ["a", "b"] },
        });
        let a = store.add_node(
            NodeSpec::new("source", 0, 1)
                .at(40.0, 80.0)
                .with_data(data.as_object().unwrap().clone())
                .with_render(RenderSpec::Template("feed-card".into())),
        );
        let b = store.add_node(NodeSpec::new("sink", 1, 0).at(400.0, 120.0));
        let conn = ConnectionRef::new(a, PortId::output(1), b, PortId::input(1));
        store.add_connection(&conn).unwrap();
        store
            .insert_point(&conn, 0, PathPoint::new(200.0, 60.0))
            .unwrap();
        store
            .insert_point(&conn, 1, PathPoint::new(300.0, 140.0))
            .unwrap();
        store
    }

    #[test]
    fn test_round_trip_is_lossless() {
        let store = populated_store();
        let exported = store.export();

        let json = exported.to_json().unwrap();
        let parsed = Snapshot::from_json(&json).unwrap();
        assert_eq!(parsed, exported);

        let mut restored = GraphStore::default();
        restored.import(&parsed).unwrap();
        assert_eq!(restored.export(), exported);
    }

    #[test]
    fn test_export_is_a_deep_copy() {
        let mut store = populated_store();
        let exported = store.export();
        store.remove_node(&"1".into());
        // The earlier snapshot still sees the removed node
        assert!(exported.modules["main"].contains(&"1".into()));
        assert!(!store.export().modules["main"].contains(&"1".into()));
    }

    #[test]
    fn test_import_restores_id_counter() {
        let mut restored = GraphStore::default();
        restored.import(&populated_store().export()).unwrap();
        let next = restored.add_node(NodeSpec::new("fresh", 0, 0));
        assert_eq!(next.as_str(), "3");
    }

    #[test]
    fn test_import_rejects_dangling_endpoint() {
        let mut snapshot = populated_store().export();
        // Drop the target node but keep the endpoint referencing it
        snapshot
            .modules
            .get_mut("main")
            .unwrap()
            .nodes
            .shift_remove(&NodeId::from("2"));
        let mut store = GraphStore::default();
        assert!(matches!(
            store.import(&snapshot),
            Err(SnapshotError::DanglingEndpoint { .. })
        ));
        // Rejected import leaves the store untouched
        assert!(store.export().modules["main"].is_empty());
    }

    #[test]
    fn test_import_rejects_unmirrored_endpoint() {
        let mut snapshot = populated_store().export();
        let target = snapshot
            .modules
            .get_mut("main")
            .unwrap()
            .nodes
            .get_mut(&NodeId::from("2"))
            .unwrap();
        target.inputs[&PortId::input(1)].connections.clear();
        let mut store = GraphStore::default();
        assert!(matches!(
            store.import(&snapshot),
            Err(SnapshotError::UnmirroredEndpoint { .. })
        ));
    }

    #[test]
    fn test_import_rejects_key_id_mismatch() {
        let mut snapshot = populated_store().export();
        let node = snapshot
            .modules
            .get_mut("main")
            .unwrap()
            .nodes
            .get_mut(&NodeId::from("1"))
            .unwrap();
        node.id = "7".into();
        let mut store = GraphStore::default();
        assert!(matches!(
            store.import(&snapshot),
            Err(SnapshotError::IdMismatch { .. })
        ));
    }

    #[test]
    fn test_import_rejects_id_reused_across_modules() {
        let mut snapshot = populated_store().export();
        let cloned = snapshot.modules["main"].clone();
        snapshot.modules.insert("copy".into(), cloned);
        let mut store = GraphStore::default();
        assert!(matches!(
            store.import(&snapshot),
            Err(SnapshotError::DuplicateNodeId(_))
        ));
    }

    #[test]
    fn test_wire_format_shape() {
        let store = populated_store();
        let value = serde_json::to_value(store.export()).unwrap();
        let node = &value["modules"]["main"]["nodes"]["1"];
        assert_eq!(node["name"], "source");
        assert_eq!(node["data"]["limits"]["max"], 10);
        let link = &node["outputs"]["output_1"]["connections"][0];
        assert_eq!(link["node"], "2");
        assert_eq!(link["port"], "input_1");
        assert_eq!(link["points"][0]["x"], 200.0);
        // Inputs mirror carries no points list
        let mirror = &value["modules"]["main"]["nodes"]["2"]["inputs"]["input_1"]["connections"][0];
        assert_eq!(mirror["node"], "1");
        assert_eq!(mirror["port"], "output_1");
        assert!(mirror.get("points").is_none());
    }
}
