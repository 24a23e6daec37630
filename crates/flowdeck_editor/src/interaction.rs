// SPDX-License-Identifier: MIT OR Apache-2.0
//! Interaction state: input events, the live-interaction sum type, the
//! exclusive selection, and the pinch pointer cache.
//!
//! Exactly one interaction is live at a time. Modeling the live interaction
//! as one tagged enum makes invalid combinations (dragging while
//! connecting, panning while dragging a point) unrepresentable.

use crate::geometry::Point;
use flowdeck_graph::{ConnectionRef, NodeId, PortId};

/// Pointer button of a press
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerButton {
    /// Left button / single touch
    #[default]
    Primary,
    /// Right button
    Secondary,
    /// Middle button
    Middle,
}

/// Keys the editor reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Delete key
    Delete,
    /// Backspace key
    Backspace,
}

/// One discrete input event fed to the state machine.
///
/// Touch events carry the same semantics as the corresponding pointer
/// events; the raw-pointer stream is a second channel feeding only the
/// pinch cache and never the main state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Press at a screen position
    PointerDown {
        /// Screen position
        pos: Point,
        /// Pressed button
        button: PointerButton,
    },
    /// Movement while pressed or hovering
    PointerMove {
        /// Screen position
        pos: Point,
    },
    /// Release
    PointerUp {
        /// Screen position
        pos: Point,
    },
    /// Double click
    DoubleClick {
        /// Screen position
        pos: Point,
    },
    /// Wheel rotation; positive steps zoom in
    Wheel {
        /// Signed wheel delta
        delta: f64,
    },
    /// Key press
    KeyDown {
        /// The key
        key: Key,
        /// Focus is inside an editable text field (suppresses deletion)
        in_text_field: bool,
    },
    /// First finger down
    TouchStart {
        /// Screen position
        pos: Point,
    },
    /// Finger movement
    TouchMove {
        /// Screen position
        pos: Point,
    },
    /// Finger up
    TouchEnd {
        /// Screen position
        pos: Point,
    },
    /// Raw pointer down (pinch stream)
    RawPointerDown {
        /// Stable per-pointer id
        pointer: u64,
        /// Screen position
        pos: Point,
    },
    /// Raw pointer move (pinch stream)
    RawPointerMove {
        /// Stable per-pointer id
        pointer: u64,
        /// Screen position
        pos: Point,
    },
    /// Raw pointer up (pinch stream)
    RawPointerUp {
        /// Stable per-pointer id
        pointer: u64,
    },
}

/// The exclusive selection: at most one node XOR one connection
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Selection {
    /// Nothing selected
    #[default]
    None,
    /// A node is selected
    Node(NodeId),
    /// A connection is selected
    Connection(ConnectionRef),
}

/// The single live interaction
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Interaction {
    /// No interaction in progress
    #[default]
    Idle,
    /// A node is being dragged
    DraggingNode {
        /// The grabbed node
        id: NodeId,
        /// Graph-space offset from the pointer to the node origin at press
        grab: Point,
        /// Whether the pointer moved since the press
        moved: bool,
    },
    /// A provisional connection follows the pointer
    Connecting {
        /// Originating node
        source: NodeId,
        /// Originating output port
        source_port: PortId,
        /// Anchor center in graph coordinates
        from: Point,
    },
    /// The canvas is being panned
    PanningCanvas {
        /// Screen position of the press
        origin: Point,
        /// Pan offset at the press
        start: Point,
    },
    /// A reroute point is being dragged
    DraggingPoint {
        /// Owning connection
        connection: ConnectionRef,
        /// Index into the connection's points list
        ordinal: usize,
        /// Whether the pointer moved since the press
        moved: bool,
    },
}

/// Direction of one discrete pinch zoom step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinchStep {
    /// Fingers moved apart
    In,
    /// Fingers moved together
    Out,
}

/// Rolling cache of live raw pointers driving pinch zoom.
///
/// A step fires from the sign of the frame-to-frame distance delta between
/// exactly two live pointers. `baseline` gates steps until the tracked
/// distance exceeds it; the default of zero means no gating.
#[derive(Debug, Clone, Default)]
pub struct PinchTracker {
    pointers: Vec<(u64, Point)>,
    last_distance: Option<f64>,
    /// Minimum tracked distance before steps register
    pub baseline: f64,
}

impl PinchTracker {
    /// Create a tracker with the given baseline gate
    pub fn new(baseline: f64) -> Self {
        Self {
            baseline,
            ..Self::default()
        }
    }

    /// Record a pointer press
    pub fn press(&mut self, pointer: u64, pos: Point) {
        if let Some(entry) = self.pointers.iter_mut().find(|(id, _)| *id == pointer) {
            entry.1 = pos;
        } else {
            self.pointers.push((pointer, pos));
        }
        self.last_distance = None;
    }

    /// Record a pointer release
    pub fn release(&mut self, pointer: u64) {
        self.pointers.retain(|(id, _)| *id != pointer);
        self.last_distance = None;
    }

    /// Record a pointer move; returns a zoom step when one fires
    pub fn update(&mut self, pointer: u64, pos: Point) -> Option<PinchStep> {
        let Some(entry) = self.pointers.iter_mut().find(|(id, _)| *id == pointer) else {
            return None;
        };
        entry.1 = pos;

        if self.pointers.len() != 2 {
            self.last_distance = None;
            return None;
        }
        let distance = self.pointers[0].1.distance(self.pointers[1].1);
        let step = match self.last_distance {
            Some(last) if last >= self.baseline => {
                if distance > last {
                    Some(PinchStep::In)
                } else if distance < last {
                    Some(PinchStep::Out)
                } else {
                    None
                }
            }
            _ => None,
        };
        self.last_distance = Some(distance);
        step
    }

    /// Number of live pointers in the cache
    pub fn live_pointers(&self) -> usize {
        self.pointers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pinch_step_follows_distance_delta_sign() {
        let mut tracker = PinchTracker::new(0.0);
        tracker.press(1, Point::new(0.0, 0.0));
        tracker.press(2, Point::new(10.0, 0.0));

        // First move only establishes the tracked distance
        assert_eq!(tracker.update(2, Point::new(12.0, 0.0)), None);
        // Diverging fingers zoom in
        assert_eq!(tracker.update(2, Point::new(20.0, 0.0)), Some(PinchStep::In));
        // Converging fingers zoom out
        assert_eq!(
            tracker.update(2, Point::new(15.0, 0.0)),
            Some(PinchStep::Out)
        );
        // No distance change, no step
        assert_eq!(tracker.update(1, Point::new(5.0, 0.0)), Some(PinchStep::Out));
        assert_eq!(tracker.update(1, Point::new(5.0, 0.0)), None);
    }

    #[test]
    fn test_pinch_requires_exactly_two_pointers() {
        let mut tracker = PinchTracker::new(0.0);
        tracker.press(1, Point::new(0.0, 0.0));
        assert_eq!(tracker.update(1, Point::new(5.0, 0.0)), None);

        tracker.press(2, Point::new(10.0, 0.0));
        tracker.press(3, Point::new(20.0, 0.0));
        assert_eq!(tracker.update(2, Point::new(30.0, 0.0)), None);

        tracker.release(3);
        // Cache reset on membership change: first move re-establishes
        assert_eq!(tracker.update(2, Point::new(25.0, 0.0)), None);
        assert_eq!(
            tracker.update(2, Point::new(40.0, 0.0)),
            Some(PinchStep::In)
        );
    }

    #[test]
    fn test_pinch_baseline_gates_steps() {
        let mut tracker = PinchTracker::new(100.0);
        tracker.press(1, Point::new(0.0, 0.0));
        tracker.press(2, Point::new(50.0, 0.0));

        // Tracked distance below the baseline: no steps yet
        assert_eq!(tracker.update(2, Point::new(60.0, 0.0)), None);
        assert_eq!(tracker.update(2, Point::new(90.0, 0.0)), None);
        // Crosses the baseline; the next delta registers
        assert_eq!(tracker.update(2, Point::new(120.0, 0.0)), None);
        assert_eq!(
            tracker.update(2, Point::new(140.0, 0.0)),
            Some(PinchStep::In)
        );
    }

    #[test]
    fn test_unknown_pointer_is_ignored() {
        let mut tracker = PinchTracker::new(0.0);
        tracker.press(1, Point::new(0.0, 0.0));
        tracker.press(2, Point::new(10.0, 0.0));
        assert_eq!(tracker.update(7, Point::new(99.0, 99.0)), None);
        assert_eq!(tracker.live_pointers(), 2);
    }
}
