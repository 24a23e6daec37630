// SPDX-License-Identifier: MIT OR Apache-2.0
//! Mirrored connection endpoint records and reroute points.
//!
//! A connection is not a first-class entity: it exists as a pair of endpoint
//! records, one stored on the source node's output port ([`OutgoingLink`])
//! and a mirror stored on the target node's input port ([`IncomingLink`]).
//! Every mutation touches both sides atomically; the store enforces that.

use crate::node::NodeId;
use crate::port::PortId;
use serde::{Deserialize, Serialize};

/// A user-placed waypoint bending a connection's path.
///
/// Coordinates are in unscaled graph space. Order in the owning `points`
/// list defines the path's segment order from source to target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    /// Horizontal graph coordinate
    pub x: f64,
    /// Vertical graph coordinate
    pub y: f64,
}

impl PathPoint {
    /// Create a point from graph coordinates
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Endpoint record stored on the source node's output port.
///
/// Carries the reroute points: the output side is the authoritative home of
/// everything a connection owns beyond the two endpoints themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingLink {
    /// Target node
    pub node: NodeId,
    /// Target input port on that node
    pub port: PortId,
    /// Reroute waypoints, ordered source to target
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub points: Vec<PathPoint>,
}

impl OutgoingLink {
    /// Create an endpoint record with no reroute points
    pub fn new(node: NodeId, port: PortId) -> Self {
        Self {
            node,
            port,
            points: Vec::new(),
        }
    }
}

/// Mirror endpoint record stored on the target node's input port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingLink {
    /// Source node
    pub node: NodeId,
    /// Source output port on that node
    pub port: PortId,
}

impl IncomingLink {
    /// Create a mirror endpoint record
    pub fn new(node: NodeId, port: PortId) -> Self {
        Self { node, port }
    }
}

/// Canonical identity of one connection: the full endpoint 4-tuple.
///
/// Used to address a connection in events, selection, and path lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionRef {
    /// Source node
    pub source: NodeId,
    /// Source output port
    pub source_port: PortId,
    /// Target node
    pub target: NodeId,
    /// Target input port
    pub target_port: PortId,
}

impl ConnectionRef {
    /// Build a connection reference
    pub fn new(source: NodeId, source_port: PortId, target: NodeId, target_port: PortId) -> Self {
        Self {
            source,
            source_port,
            target,
            target_port,
        }
    }

    /// Check if this connection touches a specific node on either side
    pub fn involves_node(&self, node_id: &NodeId) -> bool {
        self.source == *node_id || self.target == *node_id
    }
}
