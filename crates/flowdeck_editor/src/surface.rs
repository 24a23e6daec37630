// SPDX-License-Identifier: MIT OR Apache-2.0
//! The render-surface contract: what the core needs from a painter.
//!
//! The core never paints. It requires a collaborator that materializes
//! nodes into positioned visuals, strokes path primitives, reports
//! screen-space anchor geometry, and resolves what sits under a screen
//! position. Everything visual beyond that contract is the surface's
//! business.

use crate::geometry::{PathDescriptor, Point, Rect};
use crate::interaction::Selection;
use crate::renderer::RenderRegistry;
use flowdeck_graph::{ConnectionRef, Node, NodeId, PortId};

/// What sits under a screen position
#[derive(Debug, Clone, PartialEq, Default)]
pub enum HitTarget {
    /// Empty canvas
    #[default]
    Canvas,
    /// A node's body (including its content region)
    NodeBody(NodeId),
    /// An input port handle
    InputPort(NodeId, PortId),
    /// An output port handle
    OutputPort(NodeId, PortId),
    /// A connection's stroked path
    ConnectionPath(ConnectionRef),
    /// A reroute point handle, with its ordinal in the points list
    ReroutePoint(ConnectionRef, usize),
}

/// A connection's materialized path under one of the two rendering policies
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionPath {
    /// All segments collapsed into one continuous descriptor
    Collapsed(PathDescriptor),
    /// One independently addressable descriptor per segment; required when
    /// reroute points must be individually draggable
    PerSegment(Vec<PathDescriptor>),
}

impl ConnectionPath {
    /// Every segment of the path regardless of policy
    pub fn descriptors(&self) -> Vec<&PathDescriptor> {
        match self {
            Self::Collapsed(d) => vec![d],
            Self::PerSegment(ds) => ds.iter().collect(),
        }
    }
}

/// Contract between the editor core and the painting layer.
///
/// All positions given to the surface are unscaled graph coordinates; all
/// geometry reported back ([`port_anchor`](Self::port_anchor), hit testing)
/// is in screen space. The editor converts between the two using its own
/// pan/zoom transform.
pub trait RenderSurface {
    /// Materialize a node into a positioned visual with stable handles for
    /// its container, each port, and the content region
    fn materialize_node(&mut self, node: &Node, registry: &RenderRegistry);

    /// Remove a node's visual and every handle belonging to it
    fn destroy_node(&mut self, id: &NodeId);

    /// Re-key a node's handles after an id change
    fn rename_node(&mut self, old: &NodeId, new: &NodeId);

    /// Move a node's visual to a graph-space position
    fn set_node_position(&mut self, id: &NodeId, x: f64, y: f64);

    /// Re-resolve a node's content region and port handles (payload or
    /// port-count changes)
    fn refresh_node(&mut self, node: &Node, registry: &RenderRegistry);

    /// Screen-space bounding geometry of a port's visual, if materialized
    fn port_anchor(&self, id: &NodeId, port: PortId) -> Option<Rect>;

    /// Create or replace the path primitives for a connection
    fn set_connection_path(&mut self, conn: &ConnectionRef, path: &ConnectionPath);

    /// Remove a connection's path primitives
    fn remove_connection_path(&mut self, conn: &ConnectionRef);

    /// Re-key a connection's path primitives after an endpoint identifier
    /// changed (node rename, port compaction)
    fn rekey_connection(&mut self, old: &ConnectionRef, new: &ConnectionRef);

    /// Create the provisional path shown while a connection is dragged
    fn begin_provisional_path(&mut self, from: Point);

    /// Update the provisional path
    fn update_provisional_path(&mut self, path: &PathDescriptor);

    /// Discard the provisional path
    fn drop_provisional_path(&mut self);

    /// Resolve the element under a screen position
    fn hit_test(&self, pos: Point) -> HitTarget;

    /// Apply the canvas pan/zoom transform
    fn apply_transform(&mut self, x: f64, y: f64, zoom: f64);

    /// Attach the delete affordance overlay to the current selection
    /// (`Selection::None` removes it)
    fn set_delete_affordance(&mut self, selection: &Selection);

    /// Drop every visual (module switch, import)
    fn clear(&mut self);
}
