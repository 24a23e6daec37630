// SPDX-License-Identifier: MIT OR Apache-2.0
//! The egui graph canvas: painting, hit regions, and input translation.

use egui::{Color32, Pos2, Sense, Stroke, Vec2};
use flowdeck_editor::{
    ConnectionPath, Editor, HitTarget, InputEvent, Key, PathDescriptor, Point, PointerButton,
    Rect, RenderRegistry, RenderSurface, Selection,
};
use flowdeck_graph::{ConnectionRef, Node, NodeId, PortId, PortKind};
use std::collections::HashMap;

/// Node visual dimensions (graph units; scaled by zoom at paint time)
const NODE_WIDTH: f64 = 180.0;
const NODE_HEADER_HEIGHT: f64 = 24.0;
const PORT_HEIGHT: f64 = 22.0;
const PORT_RADIUS: f64 = 6.0;
const NODE_ROUNDING: f32 = 6.0;
const NODE_SHADOW_OFFSET: f32 = 3.0;

/// Connection visual parameters
const CONNECTION_THICKNESS: f32 = 2.5;
const PATH_SAMPLES: usize = 24;
const PATH_HIT_RADIUS: f64 = 5.0;
const POINT_RADIUS: f64 = 5.0;

/// Grid parameters
const GRID_SPACING: f32 = 20.0;

/// Cached visual state of one materialized node
#[derive(Debug, Clone)]
struct NodeVisual {
    name: String,
    inputs: u32,
    outputs: u32,
    content: String,
}

/// Markup sink handed to the render registry
#[derive(Default)]
struct MarkupRegion(String);

impl flowdeck_editor::ContentRegion for MarkupRegion {
    fn set_markup(&mut self, markup: &str) {
        self.0 = markup.to_owned();
    }
}

/// Reference render surface: an embeddable egui widget.
///
/// The canvas is the editor's persistent surface: pass it to every editor
/// call that takes a `RenderSurface`, and call [`show`](Self::show) once
/// per frame to paint and to feed input through the state machine.
#[derive(Debug)]
pub struct GraphCanvas {
    node_pos: HashMap<NodeId, (f64, f64)>,
    node_visual: HashMap<NodeId, NodeVisual>,
    paths: HashMap<ConnectionRef, ConnectionPath>,
    provisional: Option<PathDescriptor>,
    badge: Selection,
    translate: (f64, f64),
    zoom: f64,
    hit_regions: Vec<(Rect, HitTarget)>,
}

impl Default for GraphCanvas {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphCanvas {
    /// Create an empty canvas
    pub fn new() -> Self {
        Self {
            node_pos: HashMap::new(),
            node_visual: HashMap::new(),
            paths: HashMap::new(),
            provisional: None,
            badge: Selection::None,
            translate: (0.0, 0.0),
            zoom: 1.0,
            hit_regions: Vec::new(),
        }
    }

    // ── Coordinate mapping ─────────────────────────────────────
    //
    // Core screen space is canvas-local: screen = graph * zoom + translate.
    // egui positions are offset by the widget rect's origin on top.

    fn graph_to_local(&self, p: Point) -> Point {
        Point::new(
            p.x * self.zoom + self.translate.0,
            p.y * self.zoom + self.translate.1,
        )
    }

    fn local_to_pos2(&self, p: Point, origin: Pos2) -> Pos2 {
        Pos2::new(origin.x + p.x as f32, origin.y + p.y as f32)
    }

    fn graph_to_pos2(&self, p: Point, origin: Pos2) -> Pos2 {
        self.local_to_pos2(self.graph_to_local(p), origin)
    }

    fn node_height(visual: &NodeVisual) -> f64 {
        let rows = visual.inputs.max(visual.outputs).max(1) as f64;
        NODE_HEADER_HEIGHT + rows * PORT_HEIGHT + 8.0
    }

    fn port_center_graph(pos: (f64, f64), port: PortId) -> Point {
        let x = match port.kind {
            PortKind::Input => pos.0,
            PortKind::Output => pos.0 + NODE_WIDTH,
        };
        let y = pos.1 + NODE_HEADER_HEIGHT + (port.index - 1) as f64 * PORT_HEIGHT
            + PORT_HEIGHT / 2.0;
        Point::new(x, y)
    }

    fn local_rect_around(&self, center: Point, radius: f64) -> Rect {
        Rect::new(
            Point::new(center.x - radius, center.y - radius),
            Point::new(center.x + radius, center.y + radius),
        )
    }

    // ── Frame driver ───────────────────────────────────────────

    /// Paint the graph and feed this frame's input through the editor
    pub fn show(&mut self, ui: &mut egui::Ui, editor: &mut Editor) {
        let rect = ui.available_rect_before_wrap();
        let response = ui.allocate_rect(rect, Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        self.hit_regions.clear();
        self.draw_grid(&painter, rect);
        self.draw_connections(&painter, rect.min, editor);
        self.draw_provisional(&painter, rect.min);
        self.draw_nodes(&painter, rect.min, editor);
        self.draw_reroute_points(&painter, rect.min, editor);

        for event in self.collect_input(ui, &response, rect) {
            editor.handle_input(event, self);
        }
    }

    fn collect_input(
        &self,
        ui: &egui::Ui,
        response: &egui::Response,
        rect: egui::Rect,
    ) -> Vec<InputEvent> {
        let to_local = |pos: Pos2| {
            Point::new(
                f64::from(pos.x - rect.min.x),
                f64::from(pos.y - rect.min.y),
            )
        };
        let pointer = ui.input(|i| i.pointer.hover_pos()).map(to_local);
        let press = response.interact_pointer_pos().map(to_local).or(pointer);

        let mut events = Vec::new();
        let buttons = [
            (egui::PointerButton::Primary, PointerButton::Primary),
            (egui::PointerButton::Secondary, PointerButton::Secondary),
            (egui::PointerButton::Middle, PointerButton::Middle),
        ];
        for (egui_button, button) in buttons {
            if response.drag_started_by(egui_button) {
                if let Some(pos) = press {
                    events.push(InputEvent::PointerDown { pos, button });
                }
            }
        }
        if response.dragged() {
            if let Some(pos) = pointer {
                events.push(InputEvent::PointerMove { pos });
            }
        }
        if response.drag_stopped() {
            if let Some(pos) = pointer.or(press) {
                events.push(InputEvent::PointerUp { pos });
            }
        }
        // A click never reaches the drag threshold; synthesize the pair.
        if response.clicked() {
            if let Some(pos) = press {
                events.push(InputEvent::PointerDown {
                    pos,
                    button: PointerButton::Primary,
                });
                events.push(InputEvent::PointerUp { pos });
            }
        }
        if response.double_clicked() {
            if let Some(pos) = press {
                events.push(InputEvent::DoubleClick { pos });
            }
        }

        if response.hovered() {
            let scroll = ui.input(|i| i.raw_scroll_delta.y);
            if scroll != 0.0 {
                events.push(InputEvent::Wheel {
                    delta: f64::from(scroll),
                });
            }
        }

        let in_text_field = ui.ctx().wants_keyboard_input();
        ui.input(|i| {
            if i.key_pressed(egui::Key::Delete) {
                events.push(InputEvent::KeyDown {
                    key: Key::Delete,
                    in_text_field,
                });
            }
            if i.key_pressed(egui::Key::Backspace) {
                events.push(InputEvent::KeyDown {
                    key: Key::Backspace,
                    in_text_field,
                });
            }
            // Raw touch stream feeds the pinch cache.
            for event in &i.events {
                if let egui::Event::Touch { id, phase, pos, .. } = event {
                    let local = to_local(*pos);
                    events.push(match phase {
                        egui::TouchPhase::Start => InputEvent::RawPointerDown {
                            pointer: id.0,
                            pos: local,
                        },
                        egui::TouchPhase::Move => InputEvent::RawPointerMove {
                            pointer: id.0,
                            pos: local,
                        },
                        egui::TouchPhase::End | egui::TouchPhase::Cancel => {
                            InputEvent::RawPointerUp { pointer: id.0 }
                        }
                    });
                }
            }
        });

        events
    }

    // ── Painting ───────────────────────────────────────────────

    fn draw_grid(&self, painter: &egui::Painter, rect: egui::Rect) {
        let spacing = GRID_SPACING * self.zoom as f32;
        if spacing < 2.0 {
            return;
        }
        let color = Color32::from_rgba_unmultiplied(60, 60, 60, 100);
        let offset_x = (self.translate.0 as f32) % spacing;
        let offset_y = (self.translate.1 as f32) % spacing;

        let mut x = rect.left() + offset_x;
        while x < rect.right() {
            painter.line_segment(
                [Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())],
                Stroke::new(1.0, color),
            );
            x += spacing;
        }
        let mut y = rect.top() + offset_y;
        while y < rect.bottom() {
            painter.line_segment(
                [Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)],
                Stroke::new(1.0, color),
            );
            y += spacing;
        }
    }

    fn stroke_descriptor(
        &self,
        painter: &egui::Painter,
        origin: Pos2,
        path: &PathDescriptor,
        stroke: Stroke,
    ) {
        let points: Vec<Pos2> = path
            .flatten(PATH_SAMPLES)
            .into_iter()
            .map(|p| self.graph_to_pos2(p, origin))
            .collect();
        for pair in points.windows(2) {
            painter.line_segment([pair[0], pair[1]], stroke);
        }
    }

    fn draw_connections(&mut self, painter: &egui::Painter, origin: Pos2, editor: &Editor) {
        let selected = editor.selection().clone();
        let paths: Vec<(ConnectionRef, ConnectionPath)> = self
            .paths
            .iter()
            .map(|(c, p)| (c.clone(), p.clone()))
            .collect();
        for (conn, path) in paths {
            let is_selected = selected == Selection::Connection(conn.clone());
            let color = if is_selected {
                Color32::WHITE
            } else {
                Color32::from_rgb(130, 160, 200)
            };
            let stroke = Stroke::new(CONNECTION_THICKNESS * self.zoom as f32, color);
            for descriptor in path.descriptors() {
                self.stroke_descriptor(painter, origin, descriptor, stroke);
                // Hit regions along the sampled polyline.
                for sample in descriptor.flatten(PATH_SAMPLES) {
                    let local = self.graph_to_local(sample);
                    self.hit_regions.push((
                        self.local_rect_around(local, PATH_HIT_RADIUS * self.zoom),
                        HitTarget::ConnectionPath(conn.clone()),
                    ));
                }
            }
        }
    }

    fn draw_provisional(&self, painter: &egui::Painter, origin: Pos2) {
        if let Some(path) = &self.provisional {
            let stroke = Stroke::new(
                CONNECTION_THICKNESS * self.zoom as f32,
                Color32::from_rgb(220, 220, 120),
            );
            self.stroke_descriptor(painter, origin, path, stroke);
        }
    }

    fn draw_nodes(&mut self, painter: &egui::Painter, origin: Pos2, editor: &Editor) {
        let selected = editor.selection().clone();
        let nodes: Vec<(NodeId, (f64, f64), NodeVisual)> = self
            .node_pos
            .iter()
            .filter_map(|(id, pos)| {
                self.node_visual
                    .get(id)
                    .map(|v| (id.clone(), *pos, v.clone()))
            })
            .collect();

        for (id, pos, visual) in nodes {
            let height = Self::node_height(&visual);
            let min = self.graph_to_local(Point::new(pos.0, pos.1));
            let max = self.graph_to_local(Point::new(pos.0 + NODE_WIDTH, pos.1 + height));
            let local_rect = Rect::new(min, max);
            let screen_rect = egui::Rect::from_min_max(
                self.local_to_pos2(min, origin),
                self.local_to_pos2(max, origin),
            );
            let rounding = NODE_ROUNDING * self.zoom as f32;
            let is_selected = selected == Selection::Node(id.clone());

            // Shadow, body, header.
            painter.rect_filled(
                screen_rect.translate(Vec2::splat(NODE_SHADOW_OFFSET)),
                rounding,
                Color32::from_rgba_unmultiplied(0, 0, 0, 60),
            );
            let body = if is_selected {
                Color32::from_rgb(60, 70, 90)
            } else {
                Color32::from_rgb(45, 45, 48)
            };
            painter.rect_filled(screen_rect, rounding, body);
            let header_rect = egui::Rect::from_min_size(
                screen_rect.min,
                Vec2::new(
                    screen_rect.width(),
                    (NODE_HEADER_HEIGHT * self.zoom) as f32,
                ),
            );
            painter.rect_filled(
                header_rect,
                egui::Rounding {
                    nw: rounding,
                    ne: rounding,
                    sw: 0.0,
                    se: 0.0,
                },
                Color32::from_rgb(70, 100, 130),
            );
            painter.text(
                header_rect.center(),
                egui::Align2::CENTER_CENTER,
                &visual.name,
                egui::FontId::proportional(12.0 * self.zoom as f32),
                Color32::WHITE,
            );
            if !visual.content.is_empty() {
                painter.text(
                    Pos2::new(screen_rect.center().x, header_rect.bottom() + 4.0),
                    egui::Align2::CENTER_TOP,
                    &visual.content,
                    egui::FontId::proportional(10.0 * self.zoom as f32),
                    Color32::from_gray(190),
                );
            }
            if is_selected {
                painter.rect_stroke(
                    screen_rect,
                    rounding,
                    Stroke::new(2.0, Color32::from_rgb(100, 150, 255)),
                );
            }

            // Body hit region below the port regions pushed next.
            self.hit_regions
                .push((local_rect, HitTarget::NodeBody(id.clone())));

            for index in 1..=visual.inputs {
                self.draw_port(painter, origin, &id, pos, PortId::input(index));
            }
            for index in 1..=visual.outputs {
                self.draw_port(painter, origin, &id, pos, PortId::output(index));
            }

            // Delete affordance on the selected node.
            if self.badge == Selection::Node(id.clone()) {
                self.draw_badge(painter, screen_rect.right_top());
            }
        }
    }

    fn draw_port(
        &mut self,
        painter: &egui::Painter,
        origin: Pos2,
        id: &NodeId,
        pos: (f64, f64),
        port: PortId,
    ) {
        let center_graph = Self::port_center_graph(pos, port);
        let center_local = self.graph_to_local(center_graph);
        let radius = PORT_RADIUS * self.zoom;
        let color = match port.kind {
            PortKind::Input => Color32::from_rgb(120, 190, 120),
            PortKind::Output => Color32::from_rgb(200, 160, 90),
        };
        let center = self.local_to_pos2(center_local, origin);
        painter.circle_filled(center, radius as f32, color);
        painter.circle_stroke(center, radius as f32, Stroke::new(1.0, Color32::from_gray(30)));

        let target = match port.kind {
            PortKind::Input => HitTarget::InputPort(id.clone(), port),
            PortKind::Output => HitTarget::OutputPort(id.clone(), port),
        };
        self.hit_regions
            .push((self.local_rect_around(center_local, radius * 1.5), target));
    }

    fn draw_reroute_points(&mut self, painter: &egui::Painter, origin: Pos2, editor: &Editor) {
        let selected = editor.selection().clone();
        let conns: Vec<ConnectionRef> = self.paths.keys().cloned().collect();
        for conn in conns {
            let Some(points) = editor.store().points(&conn) else {
                continue;
            };
            let is_selected = selected == Selection::Connection(conn.clone());
            for (ordinal, point) in points.iter().enumerate() {
                let local = self.graph_to_local(Point::new(point.x, point.y));
                let color = if is_selected {
                    Color32::WHITE
                } else {
                    Color32::from_rgb(130, 160, 200)
                };
                painter.circle_filled(
                    self.local_to_pos2(local, origin),
                    (POINT_RADIUS * self.zoom) as f32,
                    color,
                );
                self.hit_regions.push((
                    self.local_rect_around(local, POINT_RADIUS * self.zoom * 1.5),
                    HitTarget::ReroutePoint(conn.clone(), ordinal),
                ));
            }
        }
    }

    fn draw_badge(&self, painter: &egui::Painter, at: Pos2) {
        let center = at + Vec2::new(0.0, -4.0);
        painter.circle_filled(center, 7.0, Color32::from_rgb(190, 70, 70));
        painter.text(
            center,
            egui::Align2::CENTER_CENTER,
            "x",
            egui::FontId::proportional(10.0),
            Color32::WHITE,
        );
    }
}

impl RenderSurface for GraphCanvas {
    fn materialize_node(&mut self, node: &Node, registry: &RenderRegistry) {
        let mut region = MarkupRegion::default();
        registry.populate(node, &mut region);
        self.node_pos
            .insert(node.id.clone(), (node.pos_x, node.pos_y));
        self.node_visual.insert(
            node.id.clone(),
            NodeVisual {
                name: node.name.clone(),
                inputs: node.port_count(PortKind::Input),
                outputs: node.port_count(PortKind::Output),
                content: region.0,
            },
        );
    }

    fn destroy_node(&mut self, id: &NodeId) {
        self.node_pos.remove(id);
        self.node_visual.remove(id);
    }

    fn rename_node(&mut self, old: &NodeId, new: &NodeId) {
        if let Some(pos) = self.node_pos.remove(old) {
            self.node_pos.insert(new.clone(), pos);
        }
        if let Some(visual) = self.node_visual.remove(old) {
            self.node_visual.insert(new.clone(), visual);
        }
    }

    fn set_node_position(&mut self, id: &NodeId, x: f64, y: f64) {
        if let Some(pos) = self.node_pos.get_mut(id) {
            *pos = (x, y);
        }
    }

    fn refresh_node(&mut self, node: &Node, registry: &RenderRegistry) {
        self.materialize_node(node, registry);
    }

    fn port_anchor(&self, id: &NodeId, port: PortId) -> Option<Rect> {
        let pos = self.node_pos.get(id)?;
        let visual = self.node_visual.get(id)?;
        let in_range = match port.kind {
            PortKind::Input => port.index >= 1 && port.index <= visual.inputs,
            PortKind::Output => port.index >= 1 && port.index <= visual.outputs,
        };
        if !in_range {
            return None;
        }
        let center = self.graph_to_local(Self::port_center_graph(*pos, port));
        Some(self.local_rect_around(center, PORT_RADIUS * self.zoom))
    }

    fn set_connection_path(&mut self, conn: &ConnectionRef, path: &ConnectionPath) {
        self.paths.insert(conn.clone(), path.clone());
    }

    fn remove_connection_path(&mut self, conn: &ConnectionRef) {
        self.paths.remove(conn);
    }

    fn rekey_connection(&mut self, old: &ConnectionRef, new: &ConnectionRef) {
        if let Some(path) = self.paths.remove(old) {
            self.paths.insert(new.clone(), path);
        }
    }

    fn begin_provisional_path(&mut self, from: Point) {
        self.provisional = Some(flowdeck_editor::curve(from, from, 0.0));
    }

    fn update_provisional_path(&mut self, path: &PathDescriptor) {
        self.provisional = Some(path.clone());
    }

    fn drop_provisional_path(&mut self) {
        self.provisional = None;
    }

    fn hit_test(&self, pos: Point) -> HitTarget {
        self.hit_regions
            .iter()
            .rev()
            .find(|(rect, _)| rect.contains(pos))
            .map(|(_, target)| target.clone())
            .unwrap_or_default()
    }

    fn apply_transform(&mut self, x: f64, y: f64, zoom: f64) {
        self.translate = (x, y);
        self.zoom = zoom;
    }

    fn set_delete_affordance(&mut self, selection: &Selection) {
        self.badge = selection.clone();
    }

    fn clear(&mut self) {
        self.node_pos.clear();
        self.node_visual.clear();
        self.paths.clear();
        self.provisional = None;
        self.badge = Selection::None;
        self.hit_regions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowdeck_editor::Notify;
    use flowdeck_graph::NodeSpec;

    #[test]
    fn test_port_anchor_layout() {
        let mut editor = Editor::new();
        let mut canvas = GraphCanvas::new();
        let id = editor.add_node(
            NodeSpec::new("n", 2, 1).at(100.0, 200.0),
            Notify::Silent,
            &mut canvas,
        );

        // input_2 sits one row below input_1, on the left edge.
        let anchor = canvas.port_anchor(&id, PortId::input(2)).unwrap();
        let center = anchor.center();
        assert_eq!(center.x, 100.0);
        assert_eq!(center.y, 200.0 + NODE_HEADER_HEIGHT + PORT_HEIGHT + PORT_HEIGHT / 2.0);

        // output_1 sits on the right edge.
        let anchor = canvas.port_anchor(&id, PortId::output(1)).unwrap();
        assert_eq!(anchor.center().x, 100.0 + NODE_WIDTH);

        // Ports outside the node's range have no anchor.
        assert!(canvas.port_anchor(&id, PortId::output(2)).is_none());
    }

    #[test]
    fn test_anchor_round_trips_through_editor_transform() {
        let mut editor = Editor::new();
        let mut canvas = GraphCanvas::new();
        let id = editor.add_node(
            NodeSpec::new("n", 1, 1).at(40.0, 60.0),
            Notify::Silent,
            &mut canvas,
        );
        editor.translate_to(35.0, -10.0, Notify::Silent, &mut canvas);

        // The anchor center mapped back through the editor's screen-to-graph
        // conversion lands on the logical port center.
        let anchor = canvas.port_anchor(&id, PortId::output(1)).unwrap();
        let graph = editor.screen_to_graph(anchor.center());
        let expected = GraphCanvas::port_center_graph((40.0, 60.0), PortId::output(1));
        assert!((graph.x - expected.x).abs() < 1e-9);
        assert!((graph.y - expected.y).abs() < 1e-9);
    }

    #[test]
    fn test_surface_state_follows_editor_mutations() {
        let mut editor = Editor::new();
        let mut canvas = GraphCanvas::new();
        let a = editor.add_node(NodeSpec::new("a", 0, 1), Notify::Silent, &mut canvas);
        let b = editor.add_node(
            NodeSpec::new("b", 1, 0).at(400.0, 0.0),
            Notify::Silent,
            &mut canvas,
        );
        let conn = ConnectionRef::new(a.clone(), PortId::output(1), b.clone(), PortId::input(1));
        editor
            .add_connection(&conn, Notify::Silent, &mut canvas)
            .unwrap();
        assert!(canvas.paths.contains_key(&conn));

        let renamed: NodeId = "9".into();
        editor
            .rename_node_id(&a, &renamed, Notify::Silent, &mut canvas)
            .unwrap();
        assert!(canvas.node_pos.contains_key(&renamed));
        let rekeyed =
            ConnectionRef::new(renamed, PortId::output(1), b.clone(), PortId::input(1));
        assert!(canvas.paths.contains_key(&rekeyed));

        editor.remove_node(&b, Notify::Silent, &mut canvas);
        assert!(!canvas.paths.contains_key(&rekeyed));
        assert!(!canvas.node_pos.contains_key(&b));
    }
}
