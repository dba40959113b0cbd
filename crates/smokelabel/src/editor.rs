// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Smokelabel Contributors. All Rights Reserved.

//! Drag and resize state machine for a single overlay box.
//!
//! The engine has three states: idle, dragging and resizing from one of the
//! four corner handles. A gesture captures the pointer position and the box
//! geometry when it starts; every move recomputes the geometry from that
//! snapshot, so the result never depends on how many move events arrived.
//!
//! ## Constraints
//!
//! - Pointer positions are clamped to the container's bounding rectangle
//!   before use, so dragging past the edge behaves as if the pointer stopped
//!   at the edge.
//! - The box stays inside `[border, border + container.width]` horizontally
//!   and `[border, border + container.height]` vertically.
//! - Resizing never shrinks the box below the configured minimum size and
//!   keeps the corner opposite the grabbed handle fixed.
//!
//! The invariants hold for containers at least as large as the minimum box
//! size.

use crate::geometry::{Container, OverlayBox, Point, clamp};
use log::trace;
use serde::{Deserialize, Serialize};

/// Default minimum overlay box width in pixels.
pub const MIN_WIDTH: f64 = 20.0;

/// Default minimum overlay box height in pixels.
pub const MIN_HEIGHT: f64 = 20.0;

/// A corner grip used to resize a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Handle {
    #[serde(rename = "nw")]
    NorthWest,
    #[serde(rename = "ne")]
    NorthEast,
    #[serde(rename = "sw")]
    SouthWest,
    #[serde(rename = "se")]
    SouthEast,
}

impl Handle {
    pub fn all() -> &'static [Handle] {
        &[
            Handle::NorthWest,
            Handle::NorthEast,
            Handle::SouthWest,
            Handle::SouthEast,
        ]
    }

    /// Whether dragging this handle moves the box's left edge.
    fn moves_left(&self) -> bool {
        matches!(self, Handle::NorthWest | Handle::SouthWest)
    }

    /// Whether dragging this handle moves the box's top edge.
    fn moves_top(&self) -> bool {
        matches!(self, Handle::NorthWest | Handle::NorthEast)
    }

    /// Position of this corner on `bbox`.
    pub fn corner(&self, bbox: &OverlayBox) -> Point {
        let x = if self.moves_left() {
            bbox.left
        } else {
            bbox.right()
        };
        let y = if self.moves_top() {
            bbox.top
        } else {
            bbox.bottom()
        };
        Point::new(x, y)
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = match self {
            Handle::NorthWest => "nw",
            Handle::NorthEast => "ne",
            Handle::SouthWest => "sw",
            Handle::SouthEast => "se",
        };
        write!(f, "{}", value)
    }
}

/// The kind of gesture in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Dragging,
    Resizing(Handle),
}

/// Engine state as seen by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Dragging,
    Resizing(Handle),
}

/// Transient state captured on pointer-down and dropped on pointer-up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionState {
    pub gesture: Gesture,
    /// Pointer position when the gesture started, already constrained.
    pub anchor: Point,
    /// Box geometry when the gesture started.
    pub start: OverlayBox,
}

/// Tunable geometry constraints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditorConfig {
    /// Constant offset between the container edge and the coordinate origin.
    pub border: f64,
    pub min_width: f64,
    pub min_height: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            border: 0.0,
            min_width: MIN_WIDTH,
            min_height: MIN_HEIGHT,
        }
    }
}

/// Stateful drag/resize logic for one overlay box.
#[derive(Debug, Clone)]
pub struct BoxGeometryEngine {
    config: EditorConfig,
    current: OverlayBox,
    interaction: Option<InteractionState>,
}

impl BoxGeometryEngine {
    pub fn new(config: EditorConfig, initial: OverlayBox) -> Self {
        Self {
            config,
            current: initial,
            interaction: None,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// The live overlay geometry.
    pub fn current(&self) -> OverlayBox {
        self.current
    }

    /// Replace the live geometry, e.g. after the container was rescaled.
    ///
    /// An active gesture is rebased onto the new geometry so the next move
    /// does not jump back to the old snapshot.
    pub fn set_current(&mut self, bbox: OverlayBox) {
        self.current = bbox;
        if let Some(interaction) = self.interaction.as_mut() {
            interaction.start = bbox;
        }
    }

    pub fn interaction(&self) -> Option<&InteractionState> {
        self.interaction.as_ref()
    }

    pub fn state(&self) -> EngineState {
        match self.interaction.map(|i| i.gesture) {
            None => EngineState::Idle,
            Some(Gesture::Dragging) => EngineState::Dragging,
            Some(Gesture::Resizing(handle)) => EngineState::Resizing(handle),
        }
    }

    pub fn is_active(&self) -> bool {
        self.interaction.is_some()
    }

    /// Start a gesture at client-space `pointer`.
    ///
    /// Returns `false` without changing anything when a gesture is already
    /// in progress. A start geometry that violates the constraints is
    /// normalized first.
    pub fn begin(&mut self, gesture: Gesture, pointer: Point, container: &Container) -> bool {
        if self.interaction.is_some() {
            trace!("Ignoring {:?}: a gesture is already active", gesture);
            return false;
        }

        let start = self.normalized(&self.current, container);
        self.current = start;
        self.interaction = Some(InteractionState {
            gesture,
            anchor: container.constrain(pointer, self.config.border),
            start,
        });
        trace!("Begin {:?} at {:?} from {:?}", gesture, pointer, start);
        true
    }

    /// Apply a pointer move. Returns the new geometry, or `None` when idle.
    pub fn update(&mut self, pointer: Point, container: &Container) -> Option<OverlayBox> {
        let interaction = self.interaction?;
        let pointer = container.constrain(pointer, self.config.border);
        let delta = Point::new(
            pointer.x - interaction.anchor.x,
            pointer.y - interaction.anchor.y,
        );

        let next = match interaction.gesture {
            Gesture::Dragging => self.dragged(&interaction.start, delta, container),
            Gesture::Resizing(handle) => {
                self.resized(&interaction.start, handle, delta, container)
            }
        };
        self.current = next;
        Some(next)
    }

    /// Finish the gesture on pointer-up, touch-end or touch-cancel.
    ///
    /// Returns the committed geometry when a gesture was active.
    pub fn end(&mut self) -> Option<OverlayBox> {
        self.interaction.take().map(|_| self.current)
    }

    /// Grow `bbox` to the minimum size and shift it inside the container.
    pub fn normalized(&self, bbox: &OverlayBox, container: &Container) -> OverlayBox {
        let border = self.config.border;
        let width = bbox.width.max(self.config.min_width);
        let height = bbox.height.max(self.config.min_height);
        OverlayBox {
            left: clamp(bbox.left, border, border + container.width - width),
            top: clamp(bbox.top, border, border + container.height - height),
            width,
            height,
        }
    }

    fn dragged(&self, start: &OverlayBox, delta: Point, container: &Container) -> OverlayBox {
        let border = self.config.border;
        OverlayBox {
            left: clamp(
                start.left + delta.x,
                border,
                container.width - start.width + border,
            ),
            top: clamp(
                start.top + delta.y,
                border,
                container.height - start.height + border,
            ),
            width: start.width,
            height: start.height,
        }
    }

    fn resized(
        &self,
        start: &OverlayBox,
        handle: Handle,
        delta: Point,
        container: &Container,
    ) -> OverlayBox {
        let border = self.config.border;
        let (left, width) = resize_axis(
            start.left,
            start.width,
            delta.x,
            handle.moves_left(),
            border,
            border + container.width,
            self.config.min_width,
        );
        let (top, height) = resize_axis(
            start.top,
            start.height,
            delta.y,
            handle.moves_top(),
            border,
            border + container.height,
            self.config.min_height,
        );
        OverlayBox {
            left,
            top,
            width,
            height,
        }
    }
}

/// Resize one axis, keeping the edge opposite the grabbed one fixed.
///
/// Returns the new `(origin, extent)`.
fn resize_axis(
    origin: f64,
    extent: f64,
    delta: f64,
    moves_origin: bool,
    lower: f64,
    upper: f64,
    min_extent: f64,
) -> (f64, f64) {
    if moves_origin {
        let far = origin + extent;
        let next = clamp(origin + delta, lower, far - min_extent);
        (next, far - next)
    } else {
        let far = clamp(origin + extent + delta, origin + min_extent, upper);
        (origin, far - origin)
    }
}
