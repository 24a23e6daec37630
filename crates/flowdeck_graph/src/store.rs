// SPDX-License-Identifier: MIT OR Apache-2.0
//! The multi-module graph store and its consistency invariants.
//!
//! Every operation validates before it mutates: a rejected call returns an
//! error value and leaves the graph untouched. Both mirrored sides of a
//! connection are always updated inside one call, so the mirror invariant
//! holds whenever control is outside this module.

use crate::link::{ConnectionRef, IncomingLink, OutgoingLink, PathPoint};
use crate::module::{Module, DEFAULT_MODULE};
use crate::node::{IdAllocator, IdPolicy, Node, NodeId, NodeSpec};
use crate::port::{PortId, PortKind};
use indexmap::IndexMap;

/// Rejection reasons for store operations.
///
/// None of these are fatal: the store stays consistent and interactive
/// after any rejected call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Module not found
    #[error("Module not found: {0:?}")]
    ModuleNotFound(String),

    /// Module already exists
    #[error("Module already exists: {0:?}")]
    ModuleExists(String),

    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Port not found on the node
    #[error("Port {port} not found on node {node}")]
    PortNotFound {
        /// Owning node
        node: NodeId,
        /// Missing label
        port: PortId,
    },

    /// A node cannot connect to itself
    #[error("Connection from node {0} to itself")]
    SelfConnection(NodeId),

    /// Connections cannot cross module boundaries
    #[error("Nodes {source_node} and {target} are in different modules")]
    CrossModule {
        /// Source node
        source_node: NodeId,
        /// Target node
        target: NodeId,
    },

    /// The identical endpoint pair already exists
    #[error("Duplicate connection")]
    DuplicateConnection,

    /// No such connection
    #[error("Connection not found")]
    ConnectionNotFound,

    /// Target id already in use
    #[error("Node id already in use: {0}")]
    IdCollision(NodeId),

    /// Rename to the same id
    #[error("New id equals the old id")]
    SameId,

    /// Reroute point ordinal outside the points list
    #[error("Point ordinal {ordinal} out of range (len {len})")]
    PointOutOfRange {
        /// Requested ordinal
        ordinal: usize,
        /// Current list length
        len: usize,
    },
}

/// The graph store: modules, nodes, ports, mirrored connections.
#[derive(Debug, Clone)]
pub struct GraphStore {
    modules: IndexMap<String, Module>,
    active: String,
    ids: IdAllocator,
}

impl GraphStore {
    /// Create a store with one empty default module
    pub fn new(policy: IdPolicy) -> Self {
        let mut modules = IndexMap::new();
        modules.insert(DEFAULT_MODULE.to_owned(), Module::new());
        Self {
            modules,
            active: DEFAULT_MODULE.to_owned(),
            ids: IdAllocator::new(policy),
        }
    }

    // ── Modules ────────────────────────────────────────────────

    /// Name of the active module
    pub fn active_module(&self) -> &str {
        &self.active
    }

    /// All module names, in creation order
    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    /// Get a module by name
    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    /// Create an empty module
    pub fn add_module(&mut self, name: &str) -> Result<(), GraphError> {
        if self.modules.contains_key(name) {
            return Err(GraphError::ModuleExists(name.to_owned()));
        }
        self.modules.insert(name.to_owned(), Module::new());
        Ok(())
    }

    /// Switch the active module
    pub fn set_active_module(&mut self, name: &str) -> Result<(), GraphError> {
        if !self.modules.contains_key(name) {
            return Err(GraphError::ModuleNotFound(name.to_owned()));
        }
        self.active = name.to_owned();
        Ok(())
    }

    /// Remove a module and everything in it.
    ///
    /// Removing the active module falls back to the default module, which
    /// is recreated if it was the one removed.
    pub fn remove_module(&mut self, name: &str) -> Result<(), GraphError> {
        self.modules
            .shift_remove(name)
            .ok_or_else(|| GraphError::ModuleNotFound(name.to_owned()))?;
        if !self.modules.contains_key(DEFAULT_MODULE) {
            self.modules
                .insert(DEFAULT_MODULE.to_owned(), Module::new());
        }
        if self.active == name {
            self.active = DEFAULT_MODULE.to_owned();
        }
        Ok(())
    }

    /// Remove every node in the active module
    pub fn clear(&mut self) {
        if let Some(module) = self.modules.get_mut(&self.active) {
            module.nodes.clear();
        }
    }

    // ── Node lookups ───────────────────────────────────────────

    /// Name of the module holding a node (ids are graph-wide unique)
    pub fn module_of(&self, id: &NodeId) -> Option<&str> {
        self.modules
            .iter()
            .find(|(_, m)| m.contains(id))
            .map(|(name, _)| name.as_str())
    }

    /// Get a node by id, scanning all modules
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.modules.values().find_map(|m| m.node(id))
    }

    /// Get a mutable node by id, scanning all modules
    pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.modules.values_mut().find_map(|m| m.node_mut(id))
    }

    /// All nodes with the given display name, across modules
    pub fn nodes_by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Node> {
        self.modules
            .values()
            .flat_map(|m| m.iter())
            .filter(move |n| n.name == name)
    }

    fn contains_id(&self, id: &NodeId) -> bool {
        self.modules.values().any(|m| m.contains(id))
    }

    // ── Nodes ──────────────────────────────────────────────────

    /// Create a node in the active module and return its assigned id
    pub fn add_node(&mut self, spec: NodeSpec) -> NodeId {
        let id = {
            let modules = &self.modules;
            self.ids
                .allocate(|candidate| modules.values().any(|m| m.contains(candidate)))
        };
        let node = Node::from_spec(id.clone(), spec);
        self.modules
            .get_mut(&self.active)
            .expect("active module always exists")
            .nodes
            .insert(id.clone(), node);
        id
    }

    /// Remove a node, cascading removal of every connection touching it.
    ///
    /// Idempotent: removing an id that is already gone is a no-op and
    /// returns `false`.
    pub fn remove_node(&mut self, id: &NodeId) -> bool {
        if !self.contains_id(id) {
            return false;
        }
        self.remove_node_connections(id);
        for module in self.modules.values_mut() {
            if module.nodes.shift_remove(id).is_some() {
                return true;
            }
        }
        false
    }

    /// Update a node's position. Returns `false` for unknown ids.
    pub fn update_node_position(&mut self, id: &NodeId, x: f64, y: f64) -> bool {
        let Some(node) = self.node_mut(id) else {
            return false;
        };
        node.pos_x = x;
        node.pos_y = y;
        true
    }

    /// Replace a node's consumer payload. Returns `false` for unknown ids.
    pub fn update_node_data(
        &mut self,
        id: &NodeId,
        data: serde_json::Map<String, serde_json::Value>,
    ) -> bool {
        let Some(node) = self.node_mut(id) else {
            return false;
        };
        node.data = data;
        true
    }

    /// Relocate a node under a new id, rewriting every endpoint that
    /// referenced the old one. Atomic: on error nothing has changed.
    pub fn rename_node_id(&mut self, old: &NodeId, new: &NodeId) -> Result<(), GraphError> {
        if old == new {
            return Err(GraphError::SameId);
        }
        if self.contains_id(new) {
            return Err(GraphError::IdCollision(new.clone()));
        }
        let module_name = self
            .module_of(old)
            .ok_or_else(|| GraphError::NodeNotFound(old.clone()))?
            .to_owned();
        let module = self
            .modules
            .get_mut(&module_name)
            .expect("module_of returned a live module");

        let index = module
            .nodes
            .get_index_of(old)
            .expect("node present in its module");
        let mut node = module
            .nodes
            .shift_remove(old)
            .expect("node present in its module");
        node.id = new.clone();
        module.nodes.insert(new.clone(), node);
        let last = module.nodes.len() - 1;
        module.nodes.move_index(last, index);

        // Connections are intra-module, so only this module can reference
        // the old id.
        for other in module.nodes.values_mut() {
            for port in other.inputs.values_mut() {
                for link in &mut port.connections {
                    if link.node == *old {
                        link.node = new.clone();
                    }
                }
            }
            for port in other.outputs.values_mut() {
                for link in &mut port.connections {
                    if link.node == *old {
                        link.node = new.clone();
                    }
                }
            }
        }
        self.ids.observe(new);
        Ok(())
    }

    // ── Connections ────────────────────────────────────────────

    /// Create a connection, appending both mirrored endpoint records.
    ///
    /// Rejected (graph untouched) for self-connections, cross-module pairs,
    /// missing nodes/ports, and exact duplicates.
    pub fn add_connection(&mut self, conn: &ConnectionRef) -> Result<(), GraphError> {
        if conn.source == conn.target {
            return Err(GraphError::SelfConnection(conn.source.clone()));
        }
        let source_module = self
            .module_of(&conn.source)
            .ok_or_else(|| GraphError::NodeNotFound(conn.source.clone()))?;
        let target_module = self
            .module_of(&conn.target)
            .ok_or_else(|| GraphError::NodeNotFound(conn.target.clone()))?;
        if source_module != target_module {
            return Err(GraphError::CrossModule {
                source_node: conn.source.clone(),
                target: conn.target.clone(),
            });
        }

        let source = self.node(&conn.source).expect("module_of found it");
        if !source.has_port(conn.source_port) {
            return Err(GraphError::PortNotFound {
                node: conn.source.clone(),
                port: conn.source_port,
            });
        }
        let target = self.node(&conn.target).expect("module_of found it");
        if !target.has_port(conn.target_port) {
            return Err(GraphError::PortNotFound {
                node: conn.target.clone(),
                port: conn.target_port,
            });
        }
        if self.connection_exists(conn) {
            return Err(GraphError::DuplicateConnection);
        }

        let source = self.node_mut(&conn.source).expect("validated above");
        source.outputs[&conn.source_port]
            .connections
            .push(OutgoingLink::new(conn.target.clone(), conn.target_port));
        let target = self.node_mut(&conn.target).expect("validated above");
        target.inputs[&conn.target_port]
            .connections
            .push(IncomingLink::new(conn.source.clone(), conn.source_port));
        Ok(())
    }

    /// Whether the exact endpoint pair exists (checked on the output side)
    pub fn connection_exists(&self, conn: &ConnectionRef) -> bool {
        self.node(&conn.source)
            .and_then(|n| n.outgoing(conn.source_port))
            .is_some_and(|links| {
                links
                    .iter()
                    .any(|l| l.node == conn.target && l.port == conn.target_port)
            })
    }

    /// Remove a connection, detaching both mirrored endpoint records
    pub fn remove_connection(&mut self, conn: &ConnectionRef) -> Result<(), GraphError> {
        if !self.connection_exists(conn) {
            return Err(GraphError::ConnectionNotFound);
        }
        let source = self.node_mut(&conn.source).expect("connection exists");
        if let Some(port) = source.outputs.get_mut(&conn.source_port) {
            port.connections
                .retain(|l| !(l.node == conn.target && l.port == conn.target_port));
        }
        let target = self.node_mut(&conn.target).expect("connection exists");
        if let Some(port) = target.inputs.get_mut(&conn.target_port) {
            port.connections
                .retain(|l| !(l.node == conn.source && l.port == conn.source_port));
        }
        Ok(())
    }

    /// Every connection touching a node, as source and as target
    pub fn connections_of(&self, id: &NodeId) -> Vec<ConnectionRef> {
        let Some(node) = self.node(id) else {
            return Vec::new();
        };
        let mut refs = Vec::new();
        for (port, slot) in &node.outputs {
            for link in &slot.connections {
                refs.push(ConnectionRef::new(
                    id.clone(),
                    *port,
                    link.node.clone(),
                    link.port,
                ));
            }
        }
        for (port, slot) in &node.inputs {
            for link in &slot.connections {
                refs.push(ConnectionRef::new(
                    link.node.clone(),
                    link.port,
                    id.clone(),
                    *port,
                ));
            }
        }
        refs
    }

    /// Remove every connection touching a node; returns what was removed.
    ///
    /// Used before node deletion.
    pub fn remove_node_connections(&mut self, id: &NodeId) -> Vec<ConnectionRef> {
        let refs = self.connections_of(id);
        for conn in &refs {
            // Already-validated refs; a failure here would mean the mirror
            // invariant was broken before this call.
            let _ = self.remove_connection(conn);
        }
        refs
    }

    // ── Ports ──────────────────────────────────────────────────

    /// Append the next positional port of the given kind
    pub fn add_port(&mut self, id: &NodeId, kind: PortKind) -> Result<PortId, GraphError> {
        let node = self
            .node_mut(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.clone()))?;
        Ok(node.append_port(kind))
    }

    /// Remove a port: drop its connections, compact higher labels down by
    /// one, and rewrite the stored label on every opposite endpoint that
    /// referenced a shifted port. Returns the dropped connections.
    pub fn remove_port(
        &mut self,
        id: &NodeId,
        port: PortId,
    ) -> Result<Vec<ConnectionRef>, GraphError> {
        {
            let node = self
                .node(id)
                .ok_or_else(|| GraphError::NodeNotFound(id.clone()))?;
            if !node.has_port(port) {
                return Err(GraphError::PortNotFound {
                    node: id.clone(),
                    port,
                });
            }
        }

        // Drop the removed port's own connections first (both mirror sides).
        let dropped: Vec<ConnectionRef> = self
            .connections_of(id)
            .into_iter()
            .filter(|c| match port.kind {
                PortKind::Output => c.source == *id && c.source_port == port,
                PortKind::Input => c.target == *id && c.target_port == port,
            })
            .collect();
        for conn in &dropped {
            let _ = self.remove_connection(conn);
        }

        // Plan the opposite-endpoint rewrites for every shifted label.
        let mut rewrites: Vec<(NodeId, PortId, PortId, PortId)> = Vec::new();
        {
            let node = self.node(id).expect("validated above");
            match port.kind {
                PortKind::Output => {
                    for (label, slot) in &node.outputs {
                        if label.index > port.index {
                            let shifted = PortId::output(label.index - 1);
                            for link in &slot.connections {
                                rewrites.push((link.node.clone(), link.port, *label, shifted));
                            }
                        }
                    }
                }
                PortKind::Input => {
                    for (label, slot) in &node.inputs {
                        if label.index > port.index {
                            let shifted = PortId::input(label.index - 1);
                            for link in &slot.connections {
                                rewrites.push((link.node.clone(), link.port, *label, shifted));
                            }
                        }
                    }
                }
            }
        }

        // Compact this node's port map.
        let node = self.node_mut(id).expect("validated above");
        match port.kind {
            PortKind::Output => {
                node.outputs = std::mem::take(&mut node.outputs)
                    .into_iter()
                    .filter(|(label, _)| *label != port)
                    .map(|(label, slot)| {
                        if label.index > port.index {
                            (PortId::output(label.index - 1), slot)
                        } else {
                            (label, slot)
                        }
                    })
                    .collect();
            }
            PortKind::Input => {
                node.inputs = std::mem::take(&mut node.inputs)
                    .into_iter()
                    .filter(|(label, _)| *label != port)
                    .map(|(label, slot)| {
                        if label.index > port.index {
                            (PortId::input(label.index - 1), slot)
                        } else {
                            (label, slot)
                        }
                    })
                    .collect();
            }
        }

        // Rewrite the mirrors on the opposite nodes.
        for (other, other_port, old_label, new_label) in rewrites {
            let Some(other_node) = self.node_mut(&other) else {
                continue;
            };
            match port.kind {
                PortKind::Output => {
                    if let Some(slot) = other_node.inputs.get_mut(&other_port) {
                        for link in &mut slot.connections {
                            if link.node == *id && link.port == old_label {
                                link.port = new_label;
                            }
                        }
                    }
                }
                PortKind::Input => {
                    if let Some(slot) = other_node.outputs.get_mut(&other_port) {
                        for link in &mut slot.connections {
                            if link.node == *id && link.port == old_label {
                                link.port = new_label;
                            }
                        }
                    }
                }
            }
        }

        Ok(dropped)
    }

    // ── Reroute points ─────────────────────────────────────────

    /// The reroute points of a connection, in path order
    pub fn points(&self, conn: &ConnectionRef) -> Option<&[PathPoint]> {
        self.node(&conn.source)
            .and_then(|n| n.outgoing(conn.source_port))
            .and_then(|links| {
                links
                    .iter()
                    .find(|l| l.node == conn.target && l.port == conn.target_port)
            })
            .map(|l| l.points.as_slice())
    }

    fn points_mut(&mut self, conn: &ConnectionRef) -> Option<&mut Vec<PathPoint>> {
        let target = conn.target.clone();
        let target_port = conn.target_port;
        self.node_mut(&conn.source)
            .and_then(|n| n.outputs.get_mut(&conn.source_port))
            .and_then(move |p| {
                p.connections
                    .iter_mut()
                    .find(|l| l.node == target && l.port == target_port)
            })
            .map(|l| &mut l.points)
    }

    /// Insert a reroute point at the given ordinal (0-based, may equal len)
    pub fn insert_point(
        &mut self,
        conn: &ConnectionRef,
        ordinal: usize,
        point: PathPoint,
    ) -> Result<(), GraphError> {
        let points = self
            .points_mut(conn)
            .ok_or(GraphError::ConnectionNotFound)?;
        if ordinal > points.len() {
            return Err(GraphError::PointOutOfRange {
                ordinal,
                len: points.len(),
            });
        }
        points.insert(ordinal, point);
        Ok(())
    }

    /// Remove the reroute point at the given ordinal
    pub fn remove_point(
        &mut self,
        conn: &ConnectionRef,
        ordinal: usize,
    ) -> Result<PathPoint, GraphError> {
        let points = self
            .points_mut(conn)
            .ok_or(GraphError::ConnectionNotFound)?;
        if ordinal >= points.len() {
            return Err(GraphError::PointOutOfRange {
                ordinal,
                len: points.len(),
            });
        }
        Ok(points.remove(ordinal))
    }

    /// Move the reroute point at the given ordinal
    pub fn set_point(
        &mut self,
        conn: &ConnectionRef,
        ordinal: usize,
        point: PathPoint,
    ) -> Result<(), GraphError> {
        let points = self
            .points_mut(conn)
            .ok_or(GraphError::ConnectionNotFound)?;
        let len = points.len();
        let slot = points
            .get_mut(ordinal)
            .ok_or(GraphError::PointOutOfRange { ordinal, len })?;
        *slot = point;
        Ok(())
    }

    // ── Snapshot plumbing (see snapshot.rs for the service) ────

    pub(crate) fn modules_ref(&self) -> &IndexMap<String, Module> {
        &self.modules
    }

    pub(crate) fn replace_modules(&mut self, modules: IndexMap<String, Module>) {
        for module in modules.values() {
            for id in module.nodes.keys() {
                self.ids.observe(id);
            }
        }
        self.active = if modules.contains_key(DEFAULT_MODULE) {
            DEFAULT_MODULE.to_owned()
        } else {
            modules
                .keys()
                .next()
                .cloned()
                .unwrap_or_else(|| DEFAULT_MODULE.to_owned())
        };
        self.modules = modules;
        if !self.modules.contains_key(&self.active) {
            self.modules.insert(self.active.clone(), Module::new());
        }
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new(IdPolicy::Sequential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_pair() -> (GraphStore, NodeId, NodeId) {
        let mut store = GraphStore::default();
        let a = store.add_node(NodeSpec::new("a", 1, 2));
        let b = store.add_node(NodeSpec::new("b", 2, 1));
        (store, a, b)
    }

    /// Collect the endpoint 4-tuples seen from each side of the mirror.
    fn mirror_tuples(store: &GraphStore) -> (Vec<ConnectionRef>, Vec<ConnectionRef>) {
        let mut from_outputs = Vec::new();
        let mut from_inputs = Vec::new();
        for name in store.module_names().map(String::from).collect::<Vec<_>>() {
            let module = store.module(&name).unwrap();
            for node in module.iter() {
                for (port, slot) in &node.outputs {
                    for link in &slot.connections {
                        from_outputs.push(ConnectionRef::new(
                            node.id.clone(),
                            *port,
                            link.node.clone(),
                            link.port,
                        ));
                    }
                }
                for (port, slot) in &node.inputs {
                    for link in &slot.connections {
                        from_inputs.push(ConnectionRef::new(
                            link.node.clone(),
                            link.port,
                            node.id.clone(),
                            *port,
                        ));
                    }
                }
            }
        }
        from_outputs.sort();
        from_inputs.sort();
        (from_outputs, from_inputs)
    }

    fn assert_mirror(store: &GraphStore) {
        let (outputs, inputs) = mirror_tuples(store);
        assert_eq!(outputs, inputs, "mirror invariant violated");
    }

    #[test]
    fn test_sequential_ids_and_port_init() {
        let (store, a, b) = store_with_pair();
        assert_eq!(a.as_str(), "1");
        assert_eq!(b.as_str(), "2");
        let node = store.node(&a).unwrap();
        assert_eq!(node.port_count(PortKind::Output), 2);
        assert!(node.outgoing(PortId::output(2)).unwrap().is_empty());
    }

    #[test]
    fn test_add_connection_mirrors_both_sides() {
        let (mut store, a, b) = store_with_pair();
        let conn = ConnectionRef::new(a.clone(), PortId::output(1), b.clone(), PortId::input(1));
        store.add_connection(&conn).unwrap();
        assert_mirror(&store);
        assert!(store.connection_exists(&conn));

        let incoming = store.node(&b).unwrap().incoming(PortId::input(1)).unwrap();
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].node, a);
        assert_eq!(incoming[0].port, PortId::output(1));
    }

    #[test]
    fn test_duplicate_connection_suppressed() {
        let (mut store, a, b) = store_with_pair();
        let conn = ConnectionRef::new(a, PortId::output(1), b, PortId::input(1));
        store.add_connection(&conn).unwrap();
        assert_eq!(
            store.add_connection(&conn),
            Err(GraphError::DuplicateConnection)
        );
        let (outputs, _) = mirror_tuples(&store);
        assert_eq!(outputs.len(), 1);
    }

    #[test]
    fn test_self_connection_rejected() {
        let (mut store, a, _) = store_with_pair();
        let conn = ConnectionRef::new(a.clone(), PortId::output(1), a, PortId::input(1));
        assert!(matches!(
            store.add_connection(&conn),
            Err(GraphError::SelfConnection(_))
        ));
        assert_mirror(&store);
    }

    #[test]
    fn test_cross_module_connection_rejected() {
        let mut store = GraphStore::default();
        let a = store.add_node(NodeSpec::new("a", 0, 1));
        store.add_module("other").unwrap();
        store.set_active_module("other").unwrap();
        let b = store.add_node(NodeSpec::new("b", 1, 0));

        let conn = ConnectionRef::new(a, PortId::output(1), b, PortId::input(1));
        assert!(matches!(
            store.add_connection(&conn),
            Err(GraphError::CrossModule { .. })
        ));
        let (outputs, _) = mirror_tuples(&store);
        assert!(outputs.is_empty());
    }

    #[test]
    fn test_missing_port_rejected() {
        let (mut store, a, b) = store_with_pair();
        let conn = ConnectionRef::new(a, PortId::output(9), b, PortId::input(1));
        assert!(matches!(
            store.add_connection(&conn),
            Err(GraphError::PortNotFound { .. })
        ));
    }

    #[test]
    fn test_remove_connection_detaches_mirror() {
        let (mut store, a, b) = store_with_pair();
        let conn = ConnectionRef::new(a.clone(), PortId::output(1), b.clone(), PortId::input(1));
        store.add_connection(&conn).unwrap();
        store.remove_connection(&conn).unwrap();
        assert_mirror(&store);
        assert!(!store.connection_exists(&conn));
        assert_eq!(
            store.remove_connection(&conn),
            Err(GraphError::ConnectionNotFound)
        );
    }

    #[test]
    fn test_remove_node_cascades_and_is_idempotent() {
        let (mut store, a, b) = store_with_pair();
        let conn = ConnectionRef::new(a.clone(), PortId::output(1), b.clone(), PortId::input(1));
        store.add_connection(&conn).unwrap();

        assert!(store.remove_node(&a));
        assert!(store.node(&a).is_none());
        assert_mirror(&store);
        // b's input side no longer references a
        assert!(store.node(&b).unwrap().incoming(PortId::input(1)).unwrap().is_empty());
        // Second removal is a no-op
        assert!(!store.remove_node(&a));
    }

    #[test]
    fn test_port_compaction_shifts_labels_and_rewrites_mirrors() {
        // output_1..output_4 with two connections on output_3: removing
        // output_2 leaves output_1..output_3, the connections now report
        // output_2, and no endpoint dangles.
        let mut store = GraphStore::default();
        let a = store.add_node(NodeSpec::new("a", 0, 4));
        let b = store.add_node(NodeSpec::new("b", 2, 0));

        let on_3_first =
            ConnectionRef::new(a.clone(), PortId::output(3), b.clone(), PortId::input(1));
        let on_3_second =
            ConnectionRef::new(a.clone(), PortId::output(3), b.clone(), PortId::input(2));
        store.add_connection(&on_3_first).unwrap();
        store.add_connection(&on_3_second).unwrap();

        let dropped = store.remove_port(&a, PortId::output(2)).unwrap();
        assert!(dropped.is_empty());

        let node = store.node(&a).unwrap();
        assert_eq!(node.port_count(PortKind::Output), 3);
        assert!(node.has_port(PortId::output(3)));
        assert!(!node.has_port(PortId::output(4)));

        // Former output_3 connections now live under output_2, mirrors agree.
        assert_eq!(node.outgoing(PortId::output(2)).unwrap().len(), 2);
        let incoming = store.node(&b).unwrap().incoming(PortId::input(1)).unwrap();
        assert_eq!(incoming[0].port, PortId::output(2));
        assert_mirror(&store);
    }

    #[test]
    fn test_remove_port_drops_own_connections() {
        let (mut store, a, b) = store_with_pair();
        let conn = ConnectionRef::new(a.clone(), PortId::output(1), b.clone(), PortId::input(2));
        store.add_connection(&conn).unwrap();

        let dropped = store.remove_port(&b, PortId::input(2)).unwrap();
        assert_eq!(dropped, vec![conn]);
        assert_mirror(&store);
        assert_eq!(store.node(&b).unwrap().port_count(PortKind::Input), 1);
        // a's output side holds no dangling record
        assert!(store.node(&a).unwrap().outgoing(PortId::output(1)).unwrap().is_empty());
    }

    #[test]
    fn test_rename_propagates_to_every_endpoint() {
        let mut store = GraphStore::default();
        let a = store.add_node(NodeSpec::new("a", 1, 1));
        let b = store.add_node(NodeSpec::new("b", 1, 1));
        let c = store.add_node(NodeSpec::new("c", 1, 1));
        store
            .add_connection(&ConnectionRef::new(
                a.clone(),
                PortId::output(1),
                c.clone(),
                PortId::input(1),
            ))
            .unwrap();
        store
            .add_connection(&ConnectionRef::new(
                c.clone(),
                PortId::output(1),
                b.clone(),
                PortId::input(1),
            ))
            .unwrap();

        let new_id = NodeId::new("99");
        store.rename_node_id(&c, &new_id).unwrap();

        assert!(store.node(&c).is_none());
        assert!(store.node(&new_id).is_some());
        assert_mirror(&store);
        let incoming = store.node(&b).unwrap().incoming(PortId::input(1)).unwrap();
        assert_eq!(incoming[0].node, new_id);
        let outgoing = store.node(&a).unwrap().outgoing(PortId::output(1)).unwrap();
        assert_eq!(outgoing[0].node, new_id);
    }

    #[test]
    fn test_rename_collision_rejected_without_mutation() {
        let (mut store, a, b) = store_with_pair();
        let conn = ConnectionRef::new(a.clone(), PortId::output(1), b.clone(), PortId::input(1));
        store.add_connection(&conn).unwrap();

        let before = store.clone();
        assert_eq!(
            store.rename_node_id(&a, &b),
            Err(GraphError::IdCollision(b.clone()))
        );
        assert_eq!(
            mirror_tuples(&store),
            mirror_tuples(&before),
            "rejected rename must not mutate"
        );
        assert!(store.node(&a).is_some());
    }

    #[test]
    fn test_rename_does_not_reset_sequential_counter() {
        let mut store = GraphStore::default();
        let a = store.add_node(NodeSpec::new("a", 0, 0));
        store.rename_node_id(&a, &NodeId::new("50")).unwrap();
        let next = store.add_node(NodeSpec::new("b", 0, 0));
        assert_eq!(next.as_str(), "51");
    }

    #[test]
    fn test_reroute_point_ordering() {
        let (mut store, a, b) = store_with_pair();
        let conn = ConnectionRef::new(a, PortId::output(1), b, PortId::input(1));
        store.add_connection(&conn).unwrap();

        store
            .insert_point(&conn, 0, PathPoint::new(10.0, 10.0))
            .unwrap();
        store
            .insert_point(&conn, 1, PathPoint::new(30.0, 30.0))
            .unwrap();
        store
            .insert_point(&conn, 1, PathPoint::new(20.0, 20.0))
            .unwrap();

        let xs: Vec<f64> = store.points(&conn).unwrap().iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![10.0, 20.0, 30.0]);

        store.set_point(&conn, 1, PathPoint::new(25.0, 25.0)).unwrap();
        assert_eq!(store.points(&conn).unwrap()[1].x, 25.0);

        let removed = store.remove_point(&conn, 0).unwrap();
        assert_eq!(removed.x, 10.0);
        assert_eq!(store.points(&conn).unwrap().len(), 2);

        assert!(matches!(
            store.remove_point(&conn, 5),
            Err(GraphError::PointOutOfRange { .. })
        ));
    }

    #[test]
    fn test_remove_active_module_falls_back_to_default() {
        let mut store = GraphStore::default();
        store.add_module("flow-a").unwrap();
        store.set_active_module("flow-a").unwrap();
        store.remove_module("flow-a").unwrap();
        assert_eq!(store.active_module(), DEFAULT_MODULE);
        // Default module survives its own removal by being recreated
        store.remove_module(DEFAULT_MODULE).unwrap();
        assert_eq!(store.active_module(), DEFAULT_MODULE);
        assert!(store.module(DEFAULT_MODULE).is_some());
    }

    #[test]
    fn test_clear_wipes_only_active_module() {
        let mut store = GraphStore::default();
        store.add_node(NodeSpec::new("a", 0, 0));
        store.add_module("other").unwrap();
        store.set_active_module("other").unwrap();
        store.add_node(NodeSpec::new("b", 0, 0));

        store.clear();
        assert!(store.module("other").unwrap().is_empty());
        assert_eq!(store.module(DEFAULT_MODULE).unwrap().len(), 1);
    }

    #[test]
    fn test_nodes_by_name_scans_all_modules() {
        let mut store = GraphStore::default();
        store.add_node(NodeSpec::new("pump", 0, 0));
        store.add_module("other").unwrap();
        store.set_active_module("other").unwrap();
        store.add_node(NodeSpec::new("pump", 0, 0));
        store.add_node(NodeSpec::new("valve", 0, 0));

        assert_eq!(store.nodes_by_name("pump").count(), 2);
        assert_eq!(store.nodes_by_name("valve").count(), 1);
    }
}
