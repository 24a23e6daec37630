// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data model for the Flowdeck editor.
//!
//! This crate owns the persistent state of a node graph:
//! - Modules (named sub-graphs, one active at a time)
//! - Nodes with positional input/output ports
//! - Connections stored as mirrored endpoint pairs
//! - Reroute points bending a connection's path
//! - Snapshot export/import (lossless JSON round-trip)
//!
//! ## Architecture
//!
//! The store is pure data with no rendering knowledge. Every mutation
//! validates before it touches state, keeps both mirrored sides of a
//! connection in agreement, and is atomic: a rejected operation leaves the
//! graph exactly as it was.

pub mod link;
pub mod module;
pub mod node;
pub mod port;
pub mod snapshot;
pub mod store;

pub use link::{ConnectionRef, IncomingLink, OutgoingLink, PathPoint};
pub use module::{Module, DEFAULT_MODULE};
pub use node::{IdPolicy, Node, NodeId, NodeSpec, RenderSpec};
pub use port::{InputPort, OutputPort, PortId, PortKind};
pub use snapshot::{Snapshot, SnapshotError};
pub use store::{GraphError, GraphStore};
