// SPDX-License-Identifier: MIT OR Apache-2.0
//! Flowdeck editor core.
//!
//! This crate turns the pure data model of `flowdeck_graph` into an
//! interactive editor:
//! - Event bus with kind-filtered subscriptions
//! - Cubic-Bézier path geometry through reroute points
//! - Pointer/touch interaction state machine (one live interaction,
//!   modeled as a sum type)
//! - Render-surface and renderer-plugin contracts
//! - The public editor facade with pan/zoom and snapshot handling
//!
//! ## Architecture
//!
//! The core never paints. A host embeds the editor by implementing
//! [`RenderSurface`] (or using the `flowdeck_egui` reference canvas),
//! feeding [`InputEvent`]s to [`Editor::handle_input`], and subscribing to
//! [`EditorEvent`]s.

pub mod editor;
pub mod event;
pub mod geometry;
pub mod interaction;
pub mod renderer;
pub mod surface;

pub use editor::{Editor, EditorConfig, EditorMode, Notify, PathPolicy};
pub use event::{BusEvent, EditorEvent, EditorEventKind, EventBus, SubscriberId};
pub use geometry::{curve, CubicSegment, CurvatureProfile, PathDescriptor, Point, Rect};
pub use interaction::{InputEvent, Interaction, Key, PointerButton, Selection};
pub use renderer::{ContentRegion, ContentRenderer, RenderRegistry};
pub use surface::{ConnectionPath, HitTarget, RenderSurface};
