// SPDX-License-Identifier: MIT OR Apache-2.0
//! Modules: named sub-graphs, exactly one rendered at a time.

use crate::node::{Node, NodeId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Name of the module every store starts with and falls back to when the
/// active module is removed.
pub const DEFAULT_MODULE: &str = "main";

/// A named namespace holding part of the graph.
///
/// Connections never cross module boundaries; node ids are nevertheless
/// unique across all modules so lookups by id can scan the whole graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Module {
    /// Nodes by id, in insertion order
    pub nodes: IndexMap<NodeId, Node>,
}

impl Module {
    /// Create an empty module
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a node by id
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Get a mutable node by id
    pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Whether a node with this id lives here
    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Iterate over all nodes
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Number of nodes in this module
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether this module holds no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
