// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node records, node ids, and the id allocation policies.

use crate::link::{IncomingLink, OutgoingLink};
use crate::port::{InputPort, OutputPort, PortId, PortKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a node, unique across the entire graph (all modules).
///
/// String-valued so both id policies share one representation: sequential
/// ids render as decimal strings (`"7"`), random ids as UUIDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Wrap an id value
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// How the store assigns ids to new nodes.
///
/// Fixed at store construction; not changeable per node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IdPolicy {
    /// Auto-incrementing counter, rendered as decimal strings
    #[default]
    Sequential,
    /// Random UUID v4, collision-checked against the whole graph
    Random,
}

/// Id generator implementing the two [`IdPolicy`] variants
#[derive(Debug, Clone)]
pub(crate) struct IdAllocator {
    policy: IdPolicy,
    next: u64,
}

impl IdAllocator {
    pub(crate) fn new(policy: IdPolicy) -> Self {
        Self { policy, next: 1 }
    }

    /// Produce a fresh id not yet present in the graph.
    ///
    /// `taken` must answer for every module, not just the active one.
    pub(crate) fn allocate(&mut self, taken: impl Fn(&NodeId) -> bool) -> NodeId {
        match self.policy {
            IdPolicy::Sequential => loop {
                let id = NodeId::new(self.next.to_string());
                self.next += 1;
                if !taken(&id) {
                    return id;
                }
            },
            IdPolicy::Random => loop {
                let id = NodeId::new(Uuid::new_v4().to_string());
                if !taken(&id) {
                    return id;
                }
            },
        }
    }

    /// Keep the sequential counter ahead of an id adopted from outside
    /// (import, rename), so future allocations cannot collide with it.
    pub(crate) fn observe(&mut self, id: &NodeId) {
        if self.policy == IdPolicy::Sequential {
            if let Ok(n) = id.as_str().parse::<u64>() {
                self.next = self.next.max(n + 1);
            }
        }
    }
}

/// How a node's content region is materialized by the render surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RenderSpec {
    /// Static markup injected verbatim
    Markup(String),
    /// Name of a template registered in the render registry
    Template(String),
    /// Name of a callback renderer invoked with the node's context
    Callback(String),
}

impl Default for RenderSpec {
    fn default() -> Self {
        Self::Markup(String::new())
    }
}

/// A node instance in the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique node id
    pub id: NodeId,
    /// Display name
    pub name: String,
    /// Horizontal position in unscaled graph coordinates
    pub pos_x: f64,
    /// Vertical position in unscaled graph coordinates
    pub pos_y: f64,
    /// Consumer-defined payload, round-tripped verbatim
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
    /// Content materialization spec
    pub render: RenderSpec,
    /// CSS class hook for the render surface
    #[serde(default)]
    pub css_class: String,
    /// Input ports by positional label, contiguous from `input_1`
    pub inputs: IndexMap<PortId, InputPort>,
    /// Output ports by positional label, contiguous from `output_1`
    pub outputs: IndexMap<PortId, OutputPort>,
}

impl Node {
    /// Build a node from a spec with a freshly assigned id
    pub(crate) fn from_spec(id: NodeId, spec: NodeSpec) -> Self {
        let inputs = (1..=spec.inputs)
            .map(|i| (PortId::input(i), InputPort::default()))
            .collect();
        let outputs = (1..=spec.outputs)
            .map(|i| (PortId::output(i), OutputPort::default()))
            .collect();
        Self {
            id,
            name: spec.name,
            pos_x: spec.pos_x,
            pos_y: spec.pos_y,
            data: spec.data,
            render: spec.render,
            css_class: spec.css_class,
            inputs,
            outputs,
        }
    }

    /// Whether the given port label exists on this node
    pub fn has_port(&self, port: PortId) -> bool {
        match port.kind {
            PortKind::Input => self.inputs.contains_key(&port),
            PortKind::Output => self.outputs.contains_key(&port),
        }
    }

    /// Number of ports on the given side
    pub fn port_count(&self, kind: PortKind) -> u32 {
        match kind {
            PortKind::Input => self.inputs.len() as u32,
            PortKind::Output => self.outputs.len() as u32,
        }
    }

    /// First input port with no connections, falling back to `input_1`.
    ///
    /// This is the target resolution rule under the force-first-input
    /// policy; `None` means the node has no inputs at all.
    pub fn first_free_input(&self) -> Option<PortId> {
        self.inputs
            .iter()
            .find(|(_, p)| p.connections.is_empty())
            .map(|(id, _)| *id)
            .or_else(|| self.inputs.keys().next().copied())
    }

    /// Append the next positional port of the given kind
    pub(crate) fn append_port(&mut self, kind: PortKind) -> PortId {
        match kind {
            PortKind::Input => {
                let id = PortId::input(self.inputs.len() as u32 + 1);
                self.inputs.insert(id, InputPort::default());
                id
            }
            PortKind::Output => {
                let id = PortId::output(self.outputs.len() as u32 + 1);
                self.outputs.insert(id, OutputPort::default());
                id
            }
        }
    }

    /// Outgoing endpoint list for an output port
    pub fn outgoing(&self, port: PortId) -> Option<&[OutgoingLink]> {
        self.outputs.get(&port).map(|p| p.connections.as_slice())
    }

    /// Incoming endpoint list for an input port
    pub fn incoming(&self, port: PortId) -> Option<&[IncomingLink]> {
        self.inputs.get(&port).map(|p| p.connections.as_slice())
    }
}

/// Construction spec for [`GraphStore::add_node`](crate::GraphStore::add_node)
#[derive(Debug, Clone, Default)]
pub struct NodeSpec {
    /// Display name
    pub name: String,
    /// Number of input ports (`input_1..=input_n`)
    pub inputs: u32,
    /// Number of output ports (`output_1..=output_n`)
    pub outputs: u32,
    /// Horizontal position
    pub pos_x: f64,
    /// Vertical position
    pub pos_y: f64,
    /// Consumer payload
    pub data: serde_json::Map<String, serde_json::Value>,
    /// Content spec
    pub render: RenderSpec,
    /// CSS class hook
    pub css_class: String,
}

impl NodeSpec {
    /// Start a spec with a name and port counts
    pub fn new(name: impl Into<String>, inputs: u32, outputs: u32) -> Self {
        Self {
            name: name.into(),
            inputs,
            outputs,
            ..Self::default()
        }
    }

    /// Set the position
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.pos_x = x;
        self.pos_y = y;
        self
    }

    /// Set the payload
    pub fn with_data(mut self, data: serde_json::Map<String, serde_json::Value>) -> Self {
        self.data = data;
        self
    }

    /// Set the content spec
    pub fn with_render(mut self, render: RenderSpec) -> Self {
        self.render = render;
        self
    }

    /// Set the CSS class hook
    pub fn with_css_class(mut self, class: impl Into<String>) -> Self {
        self.css_class = class.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_allocator_skips_taken() {
        let mut alloc = IdAllocator::new(IdPolicy::Sequential);
        let a = alloc.allocate(|_| false);
        assert_eq!(a.as_str(), "1");
        // "2" already exists in the graph
        let b = alloc.allocate(|id| id.as_str() == "2");
        assert_eq!(b.as_str(), "3");
    }

    #[test]
    fn test_sequential_allocator_observes_imported_ids() {
        let mut alloc = IdAllocator::new(IdPolicy::Sequential);
        alloc.observe(&NodeId::new("41"));
        assert_eq!(alloc.allocate(|_| false).as_str(), "42");
        // Non-numeric ids are ignored by the counter
        alloc.observe(&NodeId::new("not-a-number"));
        assert_eq!(alloc.allocate(|_| false).as_str(), "43");
    }

    #[test]
    fn test_random_allocator_yields_unique_ids() {
        let mut alloc = IdAllocator::new(IdPolicy::Random);
        let a = alloc.allocate(|_| false);
        let b = alloc.allocate(|_| false);
        assert_ne!(a, b);
    }

    #[test]
    fn test_from_spec_initializes_contiguous_ports() {
        let node = Node::from_spec(NodeId::new("1"), NodeSpec::new("sum", 2, 1));
        assert!(node.has_port(PortId::input(1)));
        assert!(node.has_port(PortId::input(2)));
        assert!(!node.has_port(PortId::input(3)));
        assert!(node.has_port(PortId::output(1)));
        assert_eq!(node.port_count(PortKind::Input), 2);
        assert!(node.incoming(PortId::input(1)).unwrap().is_empty());
    }

    #[test]
    fn test_first_free_input_prefers_unconnected() {
        let mut node = Node::from_spec(NodeId::new("1"), NodeSpec::new("n", 2, 0));
        node.inputs[&PortId::input(1)]
            .connections
            .push(IncomingLink::new(NodeId::new("9"), PortId::output(1)));
        assert_eq!(node.first_free_input(), Some(PortId::input(2)));

        node.inputs[&PortId::input(2)]
            .connections
            .push(IncomingLink::new(NodeId::new("9"), PortId::output(2)));
        // All busy: fall back to the first input
        assert_eq!(node.first_free_input(), Some(PortId::input(1)));

        let bare = Node::from_spec(NodeId::new("2"), NodeSpec::new("bare", 0, 1));
        assert_eq!(bare.first_free_input(), None);
    }
}
