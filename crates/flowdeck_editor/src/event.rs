// SPDX-License-Identifier: MIT OR Apache-2.0
//! Generic publish/subscribe bus and the editor event taxonomy.
//!
//! The bus is synchronous and single-threaded: `emit` runs every matching
//! callback to completion before returning, so a mutation + recompute +
//! notify sequence is atomic with respect to other interactions.

use flowdeck_graph::{ConnectionRef, NodeId, PortId, Snapshot};
use std::fmt;

/// Handle returned by [`EventBus::on`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// Implemented by event types dispatched through [`EventBus`]
pub trait BusEvent {
    /// Fieldless discriminant used for kind-filtered subscriptions
    type Kind: Copy + PartialEq + fmt::Debug;

    /// The discriminant of this event
    fn kind(&self) -> Self::Kind;
}

struct Subscriber<E: BusEvent> {
    id: SubscriberId,
    filter: Option<E::Kind>,
    callback: Box<dyn FnMut(&E)>,
}

/// Kind-filtered publish/subscribe dispatcher
pub struct EventBus<E: BusEvent> {
    subscribers: Vec<Subscriber<E>>,
    next_id: u64,
}

impl<E: BusEvent> EventBus<E> {
    /// Create an empty bus
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            next_id: 1,
        }
    }

    /// Subscribe to one event kind
    pub fn on(&mut self, kind: E::Kind, callback: impl FnMut(&E) + 'static) -> SubscriberId {
        self.subscribe(Some(kind), Box::new(callback))
    }

    /// Subscribe to every event
    pub fn on_any(&mut self, callback: impl FnMut(&E) + 'static) -> SubscriberId {
        self.subscribe(None, Box::new(callback))
    }

    fn subscribe(&mut self, filter: Option<E::Kind>, callback: Box<dyn FnMut(&E)>) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.subscribers.push(Subscriber {
            id,
            filter,
            callback,
        });
        id
    }

    /// Unsubscribe. Returns `false` for unknown ids.
    pub fn off(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() < before
    }

    /// Dispatch an event to every matching subscriber, in subscription order
    pub fn emit(&mut self, event: &E) {
        let kind = event.kind();
        for sub in &mut self.subscribers {
            if sub.filter.is_none() || sub.filter == Some(kind) {
                (sub.callback)(event);
            }
        }
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl<E: BusEvent> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: BusEvent> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

/// Everything the editor announces to its host application
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// A node was created
    NodeCreated {
        /// New node
        id: NodeId,
    },
    /// A node was removed
    NodeRemoved {
        /// Former node
        id: NodeId,
    },
    /// A node drag finished somewhere new
    NodeMoved {
        /// Moved node
        id: NodeId,
        /// Final horizontal graph coordinate
        x: f64,
        /// Final vertical graph coordinate
        y: f64,
    },
    /// A node became the selection
    NodeSelected {
        /// Selected node
        id: NodeId,
    },
    /// The selected node was deselected
    NodeDeselected,
    /// A node's consumer payload was replaced
    NodeDataChanged {
        /// Affected node
        id: NodeId,
    },
    /// A node was relocated under a new id
    NodeIdChanged {
        /// Previous id
        old: NodeId,
        /// New id
        new: NodeId,
    },
    /// A connection drag started from an output port
    ConnectionStart {
        /// Originating node
        source: NodeId,
        /// Originating output port
        source_port: PortId,
    },
    /// A connection was committed
    ConnectionCreated {
        /// The new connection
        connection: ConnectionRef,
    },
    /// A connection was removed
    ConnectionRemoved {
        /// The former connection
        connection: ConnectionRef,
    },
    /// A connection became the selection
    ConnectionSelected {
        /// Selected connection
        connection: ConnectionRef,
    },
    /// The selected connection was deselected
    ConnectionDeselected,
    /// An in-progress connection was discarded
    ConnectionCancel,
    /// A reroute point was inserted
    RerouteCreated {
        /// Owning connection
        connection: ConnectionRef,
    },
    /// A reroute point was removed
    RerouteRemoved {
        /// Owning connection
        connection: ConnectionRef,
    },
    /// A reroute point drag finished somewhere new
    RerouteMoved {
        /// Owning connection
        connection: ConnectionRef,
    },
    /// A module was created
    ModuleCreated {
        /// Module name
        name: String,
    },
    /// The active module changed
    ModuleChanged {
        /// Now-active module
        name: String,
    },
    /// A module was removed
    ModuleRemoved {
        /// Former module
        name: String,
    },
    /// The canvas pan offset changed
    Translate {
        /// Horizontal offset
        x: f64,
        /// Vertical offset
        y: f64,
    },
    /// The zoom level changed
    Zoom {
        /// New zoom factor
        level: f64,
    },
    /// The graph was exported
    Export {
        /// The exported state
        snapshot: Box<Snapshot>,
    },
    /// A snapshot was imported, replacing all state
    Import,
}

/// Fieldless discriminants of [`EditorEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum EditorEventKind {
    NodeCreated,
    NodeRemoved,
    NodeMoved,
    NodeSelected,
    NodeDeselected,
    NodeDataChanged,
    NodeIdChanged,
    ConnectionStart,
    ConnectionCreated,
    ConnectionRemoved,
    ConnectionSelected,
    ConnectionDeselected,
    ConnectionCancel,
    RerouteCreated,
    RerouteRemoved,
    RerouteMoved,
    ModuleCreated,
    ModuleChanged,
    ModuleRemoved,
    Translate,
    Zoom,
    Export,
    Import,
}

impl BusEvent for EditorEvent {
    type Kind = EditorEventKind;

    fn kind(&self) -> EditorEventKind {
        match self {
            Self::NodeCreated { .. } => EditorEventKind::NodeCreated,
            Self::NodeRemoved { .. } => EditorEventKind::NodeRemoved,
            Self::NodeMoved { .. } => EditorEventKind::NodeMoved,
            Self::NodeSelected { .. } => EditorEventKind::NodeSelected,
            Self::NodeDeselected => EditorEventKind::NodeDeselected,
            Self::NodeDataChanged { .. } => EditorEventKind::NodeDataChanged,
            Self::NodeIdChanged { .. } => EditorEventKind::NodeIdChanged,
            Self::ConnectionStart { .. } => EditorEventKind::ConnectionStart,
            Self::ConnectionCreated { .. } => EditorEventKind::ConnectionCreated,
            Self::ConnectionRemoved { .. } => EditorEventKind::ConnectionRemoved,
            Self::ConnectionSelected { .. } => EditorEventKind::ConnectionSelected,
            Self::ConnectionDeselected => EditorEventKind::ConnectionDeselected,
            Self::ConnectionCancel => EditorEventKind::ConnectionCancel,
            Self::RerouteCreated { .. } => EditorEventKind::RerouteCreated,
            Self::RerouteRemoved { .. } => EditorEventKind::RerouteRemoved,
            Self::RerouteMoved { .. } => EditorEventKind::RerouteMoved,
            Self::ModuleCreated { .. } => EditorEventKind::ModuleCreated,
            Self::ModuleChanged { .. } => EditorEventKind::ModuleChanged,
            Self::ModuleRemoved { .. } => EditorEventKind::ModuleRemoved,
            Self::Translate { .. } => EditorEventKind::Translate,
            Self::Zoom { .. } => EditorEventKind::Zoom,
            Self::Export { .. } => EditorEventKind::Export,
            Self::Import => EditorEventKind::Import,
        }
    }
}

impl EditorEvent {
    /// Whether this event concerns the given node (used for node-scoped
    /// renderer-plugin subscriptions)
    pub fn involves_node(&self, id: &NodeId) -> bool {
        match self {
            Self::NodeCreated { id: n }
            | Self::NodeRemoved { id: n }
            | Self::NodeMoved { id: n, .. }
            | Self::NodeSelected { id: n }
            | Self::NodeDataChanged { id: n } => n == id,
            Self::NodeIdChanged { old, new } => old == id || new == id,
            Self::ConnectionStart { source, .. } => source == id,
            Self::ConnectionCreated { connection }
            | Self::ConnectionRemoved { connection }
            | Self::ConnectionSelected { connection }
            | Self::RerouteCreated { connection }
            | Self::RerouteRemoved { connection }
            | Self::RerouteMoved { connection } => connection.involves_node(id),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn node_event(id: &str) -> EditorEvent {
        EditorEvent::NodeCreated { id: id.into() }
    }

    #[test]
    fn test_kind_filtered_dispatch() {
        let mut bus: EventBus<EditorEvent> = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let seen_created = Rc::clone(&seen);
        bus.on(EditorEventKind::NodeCreated, move |e| {
            seen_created.borrow_mut().push(format!("created:{e:?}"));
        });
        let seen_any = Rc::clone(&seen);
        bus.on_any(move |e| {
            seen_any.borrow_mut().push(format!("any:{:?}", e.kind()));
        });

        bus.emit(&node_event("1"));
        bus.emit(&EditorEvent::NodeDeselected);

        let log = seen.borrow();
        assert_eq!(log.len(), 3);
        assert!(log[0].starts_with("created:"));
        assert_eq!(log[1], "any:NodeCreated");
        assert_eq!(log[2], "any:NodeDeselected");
    }

    #[test]
    fn test_off_unsubscribes() {
        let mut bus: EventBus<EditorEvent> = EventBus::new();
        let count = Rc::new(RefCell::new(0));

        let counter = Rc::clone(&count);
        let id = bus.on(EditorEventKind::NodeCreated, move |_| {
            *counter.borrow_mut() += 1;
        });

        bus.emit(&node_event("1"));
        assert!(bus.off(id));
        assert!(!bus.off(id));
        bus.emit(&node_event("2"));

        assert_eq!(*count.borrow(), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_involves_node_covers_connection_endpoints() {
        let conn = ConnectionRef::new("1".into(), PortId::output(1), "2".into(), PortId::input(1));
        let event = EditorEvent::ConnectionCreated { connection: conn };
        assert!(event.involves_node(&"1".into()));
        assert!(event.involves_node(&"2".into()));
        assert!(!event.involves_node(&"3".into()));

        let rename = EditorEvent::NodeIdChanged {
            old: "2".into(),
            new: "9".into(),
        };
        assert!(rename.involves_node(&"9".into()));
        assert!(!EditorEvent::NodeDeselected.involves_node(&"1".into()));
    }
}
