// SPDX-License-Identifier: MIT OR Apache-2.0
//! The editor facade: public API surface and the interaction state machine.
//!
//! Every public mutation validates through the graph store, updates the
//! render surface, and announces itself on the event bus (unless silenced).
//! Input events drive the single live [`Interaction`]; a full
//! mutation + path-recompute + notify sequence runs to completion before
//! the next event is processed.

use crate::event::{EditorEvent, EditorEventKind, EventBus, SubscriberId};
use crate::geometry::{
    curve, nearest_segment, routed_path, routed_segments, CurvatureProfile, Point,
};
use crate::interaction::{
    InputEvent, Interaction, Key, PinchStep, PinchTracker, PointerButton, Selection,
};
use crate::renderer::RenderRegistry;
use crate::surface::{ConnectionPath, HitTarget, RenderSurface};
use flowdeck_graph::{
    ConnectionRef, GraphError, GraphStore, IdPolicy, NodeId, NodeSpec, PortId, PortKind, Snapshot,
    SnapshotError,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Whether a mutating call announces itself on the event bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Notify {
    /// Publish the corresponding events
    #[default]
    Events,
    /// Suppress them
    Silent,
}

impl Notify {
    fn events(self) -> bool {
        self == Self::Events
    }
}

/// How much interaction the editor accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditorMode {
    /// Full editing
    #[default]
    Edit,
    /// Pan/zoom only; the graph is read-only
    Fixed,
    /// No interaction at all
    View,
}

/// Path rendering policy for rerouted connections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathPolicy {
    /// Collapse all segments into one continuous descriptor
    #[default]
    Collapsed,
    /// Keep each segment independently addressable
    PerSegment,
}

/// Tunables of the editor facade
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditorConfig {
    /// Curvature of plain (unrerouted) connection paths
    pub curvature: f64,
    /// Whether double-click reroute editing is enabled
    pub reroute: bool,
    /// Curvatures of rerouted paths (first/last vs. interior segments)
    pub reroute_profile: CurvatureProfile,
    /// How rerouted paths are handed to the surface
    pub path_policy: PathPolicy,
    /// Allow dropping a connection anywhere on a node with a free input
    pub force_first_input: bool,
    /// Lower zoom clamp
    pub zoom_min: f64,
    /// Upper zoom clamp
    pub zoom_max: f64,
    /// Zoom step of `zoom_in`/`zoom_out`, wheel, and pinch
    pub zoom_step: f64,
    /// Pinch distance gate; steps register only past this baseline
    pub pinch_baseline: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            curvature: 0.5,
            reroute: false,
            reroute_profile: CurvatureProfile::default(),
            path_policy: PathPolicy::default(),
            force_first_input: false,
            zoom_min: 0.5,
            zoom_max: 1.6,
            zoom_step: 0.1,
            pinch_baseline: 0.0,
        }
    }
}

type NodeWatcher = (SubscriberId, Rc<RefCell<NodeId>>);

/// The embeddable node-graph editor
#[derive(Debug)]
pub struct Editor {
    store: GraphStore,
    bus: EventBus<EditorEvent>,
    registry: RenderRegistry,
    config: EditorConfig,
    mode: EditorMode,
    interaction: Interaction,
    selection: Selection,
    pinch: PinchTracker,
    node_watchers: HashMap<NodeId, Vec<NodeWatcher>>,
    translate: Point,
    zoom: f64,
}

impl Editor {
    /// Create an editor with default config and sequential node ids
    pub fn new() -> Self {
        Self::with_config(EditorConfig::default(), IdPolicy::Sequential)
    }

    /// Create an editor with explicit config and id policy
    pub fn with_config(config: EditorConfig, policy: IdPolicy) -> Self {
        Self {
            store: GraphStore::new(policy),
            bus: EventBus::new(),
            registry: RenderRegistry::new(),
            pinch: PinchTracker::new(config.pinch_baseline),
            config,
            mode: EditorMode::default(),
            interaction: Interaction::default(),
            selection: Selection::default(),
            node_watchers: HashMap::new(),
            translate: Point::default(),
            zoom: 1.0,
        }
    }

    // ── State access ───────────────────────────────────────────

    /// Read-only view of the graph store
    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    /// The editor tunables
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Mutable access to the tunables
    pub fn config_mut(&mut self) -> &mut EditorConfig {
        &mut self.config
    }

    /// The interaction mode
    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    /// Switch the interaction mode
    pub fn set_mode(&mut self, mode: EditorMode) {
        self.mode = mode;
    }

    /// The current exclusive selection
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// The live interaction
    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    /// Current zoom factor
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Current pan offset
    pub fn translate(&self) -> Point {
        self.translate
    }

    /// The content renderer registry
    pub fn registry(&self) -> &RenderRegistry {
        &self.registry
    }

    /// Mutable access to the content renderer registry
    pub fn registry_mut(&mut self) -> &mut RenderRegistry {
        &mut self.registry
    }

    // ── Events ─────────────────────────────────────────────────

    /// Subscribe to one event kind
    pub fn on(
        &mut self,
        kind: EditorEventKind,
        callback: impl FnMut(&EditorEvent) + 'static,
    ) -> SubscriberId {
        self.bus.on(kind, callback)
    }

    /// Subscribe to every event
    pub fn on_any(&mut self, callback: impl FnMut(&EditorEvent) + 'static) -> SubscriberId {
        self.bus.on_any(callback)
    }

    /// Unsubscribe. Returns `false` for unknown ids.
    pub fn off(&mut self, id: SubscriberId) -> bool {
        self.bus.off(id)
    }

    /// Register a node-scoped subscription for a renderer plugin.
    ///
    /// The callback receives only events involving the node (it follows the
    /// node through id changes) and is unregistered automatically when the
    /// node is removed. Unknown ids are a reported no-op.
    pub fn watch_node(
        &mut self,
        id: &NodeId,
        mut callback: impl FnMut(&EditorEvent) + 'static,
    ) -> Option<SubscriberId> {
        if self.store.node(id).is_none() {
            tracing::warn!(node = %id, "watch_node on a node that does not exist");
            return None;
        }
        let tracked = Rc::new(RefCell::new(id.clone()));
        let watched = Rc::clone(&tracked);
        let sub = self.bus.on_any(move |event| {
            if event.involves_node(&watched.borrow()) {
                callback(event);
            }
        });
        self.node_watchers
            .entry(id.clone())
            .or_default()
            .push((sub, tracked));
        Some(sub)
    }

    fn emit(&mut self, notify: Notify, event: EditorEvent) {
        if notify.events() {
            self.bus.emit(&event);
        }
    }

    // ── Modules ────────────────────────────────────────────────

    /// Create an empty module
    pub fn add_module(&mut self, name: &str, notify: Notify) -> Result<(), GraphError> {
        self.store.add_module(name)?;
        self.emit(notify, EditorEvent::ModuleCreated { name: name.into() });
        Ok(())
    }

    /// Switch the active module and rebuild the surface for it
    pub fn change_module(
        &mut self,
        name: &str,
        notify: Notify,
        surface: &mut dyn RenderSurface,
    ) -> Result<(), GraphError> {
        self.store.set_active_module(name)?;
        self.reset_view_state(surface);
        self.rebuild_surface(surface);
        self.emit(notify, EditorEvent::ModuleChanged { name: name.into() });
        Ok(())
    }

    /// Remove a module; removing the active one falls back to the default
    /// module and rebuilds the surface for it
    pub fn remove_module(
        &mut self,
        name: &str,
        notify: Notify,
        surface: &mut dyn RenderSurface,
    ) -> Result<(), GraphError> {
        let was_active = self.store.active_module() == name;
        self.store.remove_module(name)?;
        if was_active {
            self.reset_view_state(surface);
            self.rebuild_surface(surface);
            let fallback = self.store.active_module().to_owned();
            self.emit(notify, EditorEvent::ModuleChanged { name: fallback });
        }
        self.emit(notify, EditorEvent::ModuleRemoved { name: name.into() });
        Ok(())
    }

    /// Remove every node of the active module from store and surface
    pub fn clear(&mut self, surface: &mut dyn RenderSurface) {
        self.store.clear();
        self.reset_view_state(surface);
        surface.clear();
    }

    fn reset_view_state(&mut self, surface: &mut dyn RenderSurface) {
        self.interaction = Interaction::Idle;
        self.selection = Selection::None;
        surface.set_delete_affordance(&self.selection);
    }

    fn rebuild_surface(&mut self, surface: &mut dyn RenderSurface) {
        surface.clear();
        surface.apply_transform(self.translate.x, self.translate.y, self.zoom);
        let active = self.store.active_module().to_owned();
        let Some(module) = self.store.module(&active) else {
            return;
        };
        let mut connections = Vec::new();
        for node in module.iter() {
            surface.materialize_node(node, &self.registry);
            for (port, slot) in &node.outputs {
                for link in &slot.connections {
                    connections.push(ConnectionRef::new(
                        node.id.clone(),
                        *port,
                        link.node.clone(),
                        link.port,
                    ));
                }
            }
        }
        for conn in &connections {
            self.refresh_connection_path(conn, surface);
        }
    }

    // ── Nodes ──────────────────────────────────────────────────

    /// Create a node in the active module
    pub fn add_node(
        &mut self,
        spec: NodeSpec,
        notify: Notify,
        surface: &mut dyn RenderSurface,
    ) -> NodeId {
        let id = self.store.add_node(spec);
        if let Some(node) = self.store.node(&id) {
            surface.materialize_node(node, &self.registry);
        }
        self.emit(notify, EditorEvent::NodeCreated { id: id.clone() });
        id
    }

    /// Remove a node, cascading its connections. Unknown ids are a silent
    /// no-op returning `false`.
    pub fn remove_node(
        &mut self,
        id: &NodeId,
        notify: Notify,
        surface: &mut dyn RenderSurface,
    ) -> bool {
        if self.store.node(id).is_none() {
            return false;
        }
        let dropped = self.store.remove_node_connections(id);
        for conn in &dropped {
            surface.remove_connection_path(conn);
            self.untangle_selection_from(conn, surface);
            self.emit(
                notify,
                EditorEvent::ConnectionRemoved {
                    connection: conn.clone(),
                },
            );
        }
        self.store.remove_node(id);
        surface.destroy_node(id);
        if self.selection == Selection::Node(id.clone()) {
            self.selection = Selection::None;
            surface.set_delete_affordance(&self.selection);
        }
        self.emit(notify, EditorEvent::NodeRemoved { id: id.clone() });
        if let Some(watchers) = self.node_watchers.remove(id) {
            for (sub, _) in watchers {
                self.bus.off(sub);
            }
        }
        true
    }

    /// Relocate a node under a new id, rewriting endpoints and re-keying
    /// materialized path identifiers
    pub fn rename_node_id(
        &mut self,
        old: &NodeId,
        new: &NodeId,
        notify: Notify,
        surface: &mut dyn RenderSurface,
    ) -> Result<(), GraphError> {
        let before = self.store.connections_of(old);
        self.store.rename_node_id(old, new)?;
        surface.rename_node(old, new);
        for conn in before {
            let mut renamed = conn.clone();
            if renamed.source == *old {
                renamed.source = new.clone();
            }
            if renamed.target == *old {
                renamed.target = new.clone();
            }
            surface.rekey_connection(&conn, &renamed);
            if self.selection == Selection::Connection(conn) {
                self.selection = Selection::Connection(renamed);
            }
        }
        if self.selection == Selection::Node(old.clone()) {
            self.selection = Selection::Node(new.clone());
        }
        if let Some(watchers) = self.node_watchers.remove(old) {
            for (_, tracked) in &watchers {
                *tracked.borrow_mut() = new.clone();
            }
            self.node_watchers.insert(new.clone(), watchers);
        }
        self.emit(
            notify,
            EditorEvent::NodeIdChanged {
                old: old.clone(),
                new: new.clone(),
            },
        );
        Ok(())
    }

    /// Replace a node's consumer payload and re-resolve its content region.
    /// Unknown ids are a silent no-op returning `false`.
    pub fn update_node_data(
        &mut self,
        id: &NodeId,
        data: serde_json::Map<String, serde_json::Value>,
        notify: Notify,
        surface: &mut dyn RenderSurface,
    ) -> bool {
        if !self.store.update_node_data(id, data) {
            return false;
        }
        if let Some(node) = self.store.node(id) {
            surface.refresh_node(node, &self.registry);
        }
        self.emit(notify, EditorEvent::NodeDataChanged { id: id.clone() });
        true
    }

    // ── Ports ──────────────────────────────────────────────────

    /// Append the next positional port of the given kind
    pub fn add_port(
        &mut self,
        id: &NodeId,
        kind: PortKind,
        surface: &mut dyn RenderSurface,
    ) -> Result<PortId, GraphError> {
        let port = self.store.add_port(id, kind)?;
        if let Some(node) = self.store.node(id) {
            surface.refresh_node(node, &self.registry);
        }
        self.refresh_node_paths(id, surface);
        Ok(port)
    }

    /// Remove a port: drops its connections, compacts higher labels, and
    /// re-keys every shifted path identifier on the surface
    pub fn remove_port(
        &mut self,
        id: &NodeId,
        port: PortId,
        notify: Notify,
        surface: &mut dyn RenderSurface,
    ) -> Result<(), GraphError> {
        let shifted: Vec<ConnectionRef> = self
            .store
            .connections_of(id)
            .into_iter()
            .filter(|c| match port.kind {
                PortKind::Output => {
                    c.source == *id
                        && c.source_port.kind == PortKind::Output
                        && c.source_port.index > port.index
                }
                PortKind::Input => {
                    c.target == *id
                        && c.target_port.kind == PortKind::Input
                        && c.target_port.index > port.index
                }
            })
            .collect();

        let dropped = self.store.remove_port(id, port)?;
        for conn in &dropped {
            surface.remove_connection_path(conn);
            self.untangle_selection_from(conn, surface);
            self.emit(
                notify,
                EditorEvent::ConnectionRemoved {
                    connection: conn.clone(),
                },
            );
        }
        for old in shifted {
            let mut renamed = old.clone();
            match port.kind {
                PortKind::Output => {
                    renamed.source_port = PortId::output(old.source_port.index - 1);
                }
                PortKind::Input => {
                    renamed.target_port = PortId::input(old.target_port.index - 1);
                }
            }
            surface.rekey_connection(&old, &renamed);
            if self.selection == Selection::Connection(old) {
                self.selection = Selection::Connection(renamed);
            }
        }
        if let Some(node) = self.store.node(id) {
            surface.refresh_node(node, &self.registry);
        }
        self.refresh_node_paths(id, surface);
        Ok(())
    }

    // ── Connections ────────────────────────────────────────────

    /// Create a connection. Rejections (self, cross-module, duplicate,
    /// missing port) are error values; nothing is emitted for them.
    pub fn add_connection(
        &mut self,
        conn: &ConnectionRef,
        notify: Notify,
        surface: &mut dyn RenderSurface,
    ) -> Result<(), GraphError> {
        self.store.add_connection(conn)?;
        self.refresh_connection_path(conn, surface);
        self.emit(
            notify,
            EditorEvent::ConnectionCreated {
                connection: conn.clone(),
            },
        );
        Ok(())
    }

    /// Remove a connection and its path primitives
    pub fn remove_connection(
        &mut self,
        conn: &ConnectionRef,
        notify: Notify,
        surface: &mut dyn RenderSurface,
    ) -> Result<(), GraphError> {
        self.store.remove_connection(conn)?;
        surface.remove_connection_path(conn);
        self.untangle_selection_from(conn, surface);
        self.emit(
            notify,
            EditorEvent::ConnectionRemoved {
                connection: conn.clone(),
            },
        );
        Ok(())
    }

    fn untangle_selection_from(&mut self, conn: &ConnectionRef, surface: &mut dyn RenderSurface) {
        if self.selection == Selection::Connection(conn.clone()) {
            self.selection = Selection::None;
            surface.set_delete_affordance(&self.selection);
        }
    }

    // ── Snapshots ──────────────────────────────────────────────

    /// Deep-copy the complete graph state out
    pub fn export(&mut self, notify: Notify) -> Snapshot {
        let snapshot = self.store.export();
        self.emit(
            notify,
            EditorEvent::Export {
                snapshot: Box::new(snapshot.clone()),
            },
        );
        snapshot
    }

    /// Replace all state with a deep copy of the snapshot and rebuild the
    /// surface. A rejected import leaves everything untouched.
    pub fn import(
        &mut self,
        snapshot: &Snapshot,
        notify: Notify,
        surface: &mut dyn RenderSurface,
    ) -> Result<(), SnapshotError> {
        self.store.import(snapshot)?;
        self.reset_view_state(surface);
        self.rebuild_surface(surface);
        self.emit(notify, EditorEvent::Import);
        Ok(())
    }

    // ── View transform ─────────────────────────────────────────

    /// Zoom in one step
    pub fn zoom_in(&mut self, notify: Notify, surface: &mut dyn RenderSurface) {
        self.set_zoom(self.zoom + self.config.zoom_step, notify, surface);
    }

    /// Zoom out one step
    pub fn zoom_out(&mut self, notify: Notify, surface: &mut dyn RenderSurface) {
        self.set_zoom(self.zoom - self.config.zoom_step, notify, surface);
    }

    /// Reset zoom to 1.0
    pub fn reset_zoom(&mut self, notify: Notify, surface: &mut dyn RenderSurface) {
        self.set_zoom(1.0, notify, surface);
    }

    fn set_zoom(&mut self, level: f64, notify: Notify, surface: &mut dyn RenderSurface) {
        let clamped = level.clamp(self.config.zoom_min, self.config.zoom_max);
        if clamped == self.zoom {
            return;
        }
        // Scale the pan offset with the zoom change so content stays
        // anchored under the canvas origin.
        let ratio = clamped / self.zoom;
        self.translate = Point::new(self.translate.x * ratio, self.translate.y * ratio);
        self.zoom = clamped;
        surface.apply_transform(self.translate.x, self.translate.y, self.zoom);
        self.emit(notify, EditorEvent::Zoom { level: clamped });
    }

    /// Set the pan offset
    pub fn translate_to(
        &mut self,
        x: f64,
        y: f64,
        notify: Notify,
        surface: &mut dyn RenderSurface,
    ) {
        self.translate = Point::new(x, y);
        surface.apply_transform(x, y, self.zoom);
        self.emit(notify, EditorEvent::Translate { x, y });
    }

    // ── Path geometry ──────────────────────────────────────────

    /// Convert a screen position to unscaled graph coordinates
    pub fn screen_to_graph(&self, pos: Point) -> Point {
        Point::new(
            (pos.x - self.translate.x) / self.zoom,
            (pos.y - self.translate.y) / self.zoom,
        )
    }

    fn anchor_center(
        &self,
        surface: &dyn RenderSurface,
        node: &NodeId,
        port: PortId,
    ) -> Option<Point> {
        surface
            .port_anchor(node, port)
            .map(|rect| self.screen_to_graph(rect.center()))
    }

    fn connection_endpoints(
        &self,
        surface: &dyn RenderSurface,
        conn: &ConnectionRef,
    ) -> Option<(Point, Point)> {
        let from = self.anchor_center(surface, &conn.source, conn.source_port)?;
        let to = self.anchor_center(surface, &conn.target, conn.target_port)?;
        Some((from, to))
    }

    /// Recompute one connection's path and hand it to the surface
    pub fn refresh_connection_path(&self, conn: &ConnectionRef, surface: &mut dyn RenderSurface) {
        let Some((from, to)) = self.connection_endpoints(surface, conn) else {
            tracing::debug!(?conn, "skipping path refresh: anchors not materialized");
            return;
        };
        let via: Vec<Point> = self
            .store
            .points(conn)
            .map(|points| points.iter().copied().map(Point::from).collect())
            .unwrap_or_default();
        let path = if via.is_empty() {
            ConnectionPath::Collapsed(curve(from, to, self.config.curvature))
        } else {
            match self.config.path_policy {
                PathPolicy::Collapsed => ConnectionPath::Collapsed(routed_path(
                    from,
                    &via,
                    to,
                    self.config.reroute_profile,
                )),
                PathPolicy::PerSegment => ConnectionPath::PerSegment(routed_segments(
                    from,
                    &via,
                    to,
                    self.config.reroute_profile,
                )),
            }
        };
        surface.set_connection_path(conn, &path);
    }

    /// Recompute every path touching a node, both as source and as target
    pub fn refresh_node_paths(&self, id: &NodeId, surface: &mut dyn RenderSurface) {
        for conn in self.store.connections_of(id) {
            self.refresh_connection_path(&conn, surface);
        }
    }

    // ── Input handling ─────────────────────────────────────────

    /// Feed one discrete input event through the state machine
    pub fn handle_input(&mut self, event: InputEvent, surface: &mut dyn RenderSurface) {
        // Touch events share pointer semantics.
        let event = match event {
            InputEvent::TouchStart { pos } => InputEvent::PointerDown {
                pos,
                button: PointerButton::Primary,
            },
            InputEvent::TouchMove { pos } => InputEvent::PointerMove { pos },
            InputEvent::TouchEnd { pos } => InputEvent::PointerUp { pos },
            other => other,
        };

        match self.mode {
            EditorMode::View => return,
            EditorMode::Fixed => {
                if !matches!(
                    event,
                    InputEvent::PointerDown { .. }
                        | InputEvent::PointerMove { .. }
                        | InputEvent::PointerUp { .. }
                        | InputEvent::Wheel { .. }
                        | InputEvent::RawPointerDown { .. }
                        | InputEvent::RawPointerMove { .. }
                        | InputEvent::RawPointerUp { .. }
                ) {
                    return;
                }
            }
            EditorMode::Edit => {}
        }

        match event {
            InputEvent::PointerDown { pos, button } => self.on_pointer_down(pos, button, surface),
            InputEvent::PointerMove { pos } => self.on_pointer_move(pos, surface),
            InputEvent::PointerUp { pos } => self.on_pointer_up(pos, surface),
            InputEvent::DoubleClick { pos } => self.on_double_click(pos, surface),
            InputEvent::Wheel { delta } => {
                if delta > 0.0 {
                    self.zoom_in(Notify::Events, surface);
                } else if delta < 0.0 {
                    self.zoom_out(Notify::Events, surface);
                }
            }
            InputEvent::KeyDown { key, in_text_field } => {
                self.on_key_down(key, in_text_field, surface);
            }
            InputEvent::RawPointerDown { pointer, pos } => self.pinch.press(pointer, pos),
            InputEvent::RawPointerMove { pointer, pos } => {
                self.pinch.baseline = self.config.pinch_baseline;
                match self.pinch.update(pointer, pos) {
                    Some(PinchStep::In) => self.zoom_in(Notify::Events, surface),
                    Some(PinchStep::Out) => self.zoom_out(Notify::Events, surface),
                    None => {}
                }
            }
            InputEvent::RawPointerUp { pointer } => self.pinch.release(pointer),
            // Touch events were mapped to pointer events above.
            InputEvent::TouchStart { .. }
            | InputEvent::TouchMove { .. }
            | InputEvent::TouchEnd { .. } => {}
        }
    }

    fn on_pointer_down(
        &mut self,
        pos: Point,
        button: PointerButton,
        surface: &mut dyn RenderSurface,
    ) {
        if self.mode == EditorMode::Fixed || button != PointerButton::Primary {
            self.interaction = Interaction::PanningCanvas {
                origin: pos,
                start: self.translate,
            };
            return;
        }

        match surface.hit_test(pos) {
            HitTarget::NodeBody(id) | HitTarget::InputPort(id, _) => {
                self.select_node(&id, surface);
                let Some(node) = self.store.node(&id) else {
                    return;
                };
                let graph_pos = self.screen_to_graph(pos);
                self.interaction = Interaction::DraggingNode {
                    grab: Point::new(graph_pos.x - node.pos_x, graph_pos.y - node.pos_y),
                    id,
                    moved: false,
                };
            }
            HitTarget::OutputPort(id, port) => {
                let Some(from) = self.anchor_center(surface, &id, port) else {
                    tracing::warn!(node = %id, %port, "output port has no anchor geometry");
                    return;
                };
                surface.begin_provisional_path(from);
                self.interaction = Interaction::Connecting {
                    source: id.clone(),
                    source_port: port,
                    from,
                };
                self.emit(
                    Notify::Events,
                    EditorEvent::ConnectionStart {
                        source: id,
                        source_port: port,
                    },
                );
            }
            HitTarget::ReroutePoint(connection, ordinal) => {
                self.interaction = Interaction::DraggingPoint {
                    connection,
                    ordinal,
                    moved: false,
                };
            }
            HitTarget::ConnectionPath(conn) => {
                self.select_connection(&conn, surface);
            }
            HitTarget::Canvas => {
                self.deselect(surface);
                self.interaction = Interaction::PanningCanvas {
                    origin: pos,
                    start: self.translate,
                };
            }
        }
    }

    fn on_pointer_move(&mut self, pos: Point, surface: &mut dyn RenderSurface) {
        let mut interaction = std::mem::take(&mut self.interaction);
        match &mut interaction {
            Interaction::Idle => {}
            Interaction::DraggingNode { id, grab, moved } => {
                let graph_pos = self.screen_to_graph(pos);
                let x = graph_pos.x - grab.x;
                let y = graph_pos.y - grab.y;
                let changed = self
                    .store
                    .node(id)
                    .is_some_and(|n| n.pos_x != x || n.pos_y != y);
                if changed {
                    *moved = true;
                    self.store.update_node_position(id, x, y);
                    surface.set_node_position(id, x, y);
                    self.refresh_node_paths(id, surface);
                }
            }
            Interaction::Connecting { from, .. } => {
                let graph_pos = self.screen_to_graph(pos);
                surface.update_provisional_path(&curve(*from, graph_pos, self.config.curvature));
            }
            Interaction::PanningCanvas { origin, start } => {
                let x = start.x + (pos.x - origin.x);
                let y = start.y + (pos.y - origin.y);
                self.translate = Point::new(x, y);
                surface.apply_transform(x, y, self.zoom);
                self.emit(Notify::Events, EditorEvent::Translate { x, y });
            }
            Interaction::DraggingPoint {
                connection,
                ordinal,
                moved,
            } => {
                let graph_pos = self.screen_to_graph(pos);
                if self
                    .store
                    .set_point(connection, *ordinal, graph_pos.into())
                    .is_ok()
                {
                    *moved = true;
                    self.refresh_connection_path(connection, surface);
                }
            }
        }
        self.interaction = interaction;
    }

    fn on_pointer_up(&mut self, pos: Point, surface: &mut dyn RenderSurface) {
        match std::mem::take(&mut self.interaction) {
            Interaction::Idle | Interaction::PanningCanvas { .. } => {}
            Interaction::DraggingNode { id, moved, .. } => {
                if moved {
                    if let Some(node) = self.store.node(&id) {
                        let (x, y) = (node.pos_x, node.pos_y);
                        self.emit(Notify::Events, EditorEvent::NodeMoved { id, x, y });
                    }
                }
            }
            Interaction::Connecting {
                source,
                source_port,
                ..
            } => self.finish_connection(source, source_port, pos, surface),
            Interaction::DraggingPoint {
                connection, moved, ..
            } => {
                if moved {
                    self.emit(Notify::Events, EditorEvent::RerouteMoved { connection });
                }
            }
        }
    }

    fn finish_connection(
        &mut self,
        source: NodeId,
        source_port: PortId,
        pos: Point,
        surface: &mut dyn RenderSurface,
    ) {
        let target = match surface.hit_test(pos) {
            HitTarget::InputPort(node, port) => Some((node, port)),
            HitTarget::NodeBody(node) if self.config.force_first_input => self
                .store
                .node(&node)
                .and_then(|n| n.first_free_input())
                .map(|port| (node, port)),
            _ => None,
        };
        let committed = target.and_then(|(node, port)| {
            let conn = ConnectionRef::new(source, source_port, node, port);
            match self.store.add_connection(&conn) {
                Ok(()) => Some(conn),
                Err(err) => {
                    tracing::debug!(%err, "connection attempt rejected");
                    None
                }
            }
        });
        surface.drop_provisional_path();
        match committed {
            Some(conn) => {
                self.refresh_connection_path(&conn, surface);
                self.emit(
                    Notify::Events,
                    EditorEvent::ConnectionCreated { connection: conn },
                );
            }
            None => self.emit(Notify::Events, EditorEvent::ConnectionCancel),
        }
    }

    fn on_double_click(&mut self, pos: Point, surface: &mut dyn RenderSurface) {
        if !self.config.reroute {
            return;
        }
        match surface.hit_test(pos) {
            HitTarget::ConnectionPath(conn)
                if self.selection == Selection::Connection(conn.clone()) =>
            {
                let Some((from, to)) = self.connection_endpoints(surface, &conn) else {
                    return;
                };
                let graph_pos = self.screen_to_graph(pos);
                let via: Vec<Point> = self
                    .store
                    .points(&conn)
                    .map(|points| points.iter().copied().map(Point::from).collect())
                    .unwrap_or_default();
                let chain = routed_path(from, &via, to, self.config.reroute_profile);
                let ordinal = nearest_segment(chain.segments(), graph_pos);
                if self.store.insert_point(&conn, ordinal, graph_pos.into()).is_ok() {
                    self.refresh_connection_path(&conn, surface);
                    self.emit(
                        Notify::Events,
                        EditorEvent::RerouteCreated { connection: conn },
                    );
                }
            }
            HitTarget::ReroutePoint(conn, ordinal) => {
                if self.store.remove_point(&conn, ordinal).is_ok() {
                    self.refresh_connection_path(&conn, surface);
                    self.emit(
                        Notify::Events,
                        EditorEvent::RerouteRemoved { connection: conn },
                    );
                }
            }
            _ => {}
        }
    }

    fn on_key_down(&mut self, _key: Key, in_text_field: bool, surface: &mut dyn RenderSurface) {
        if in_text_field {
            return;
        }
        match self.selection.clone() {
            Selection::None => {}
            Selection::Node(id) => {
                self.remove_node(&id, Notify::Events, surface);
            }
            Selection::Connection(conn) => {
                let _ = self.remove_connection(&conn, Notify::Events, surface);
            }
        }
    }

    // ── Selection ──────────────────────────────────────────────

    fn deselect(&mut self, surface: &mut dyn RenderSurface) {
        match std::mem::take(&mut self.selection) {
            Selection::None => return,
            Selection::Node(_) => self.emit(Notify::Events, EditorEvent::NodeDeselected),
            Selection::Connection(_) => {
                self.emit(Notify::Events, EditorEvent::ConnectionDeselected);
            }
        }
        surface.set_delete_affordance(&self.selection);
    }

    fn select_node(&mut self, id: &NodeId, surface: &mut dyn RenderSurface) {
        if self.selection == Selection::Node(id.clone()) {
            return;
        }
        self.deselect(surface);
        self.selection = Selection::Node(id.clone());
        self.emit(Notify::Events, EditorEvent::NodeSelected { id: id.clone() });
        surface.set_delete_affordance(&self.selection);
    }

    fn select_connection(&mut self, conn: &ConnectionRef, surface: &mut dyn RenderSurface) {
        if self.selection == Selection::Connection(conn.clone()) {
            return;
        }
        self.deselect(surface);
        self.selection = Selection::Connection(conn.clone());
        self.emit(
            Notify::Events,
            EditorEvent::ConnectionSelected {
                connection: conn.clone(),
            },
        );
        surface.set_delete_affordance(&self.selection);
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}
