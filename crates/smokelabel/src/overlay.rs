// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Smokelabel Contributors. All Rights Reserved.

//! The annotation widget: one editable overlay box bound to one proposed box.
//!
//! The host mounts a container, then calls [`AnnotationOverlay::attach`] with
//! the box metadata. Pointer and touch events are forwarded as
//! [`AnnotationOverlay::press`], [`AnnotationOverlay::pointer_move`] and
//! [`AnnotationOverlay::pointer_up`] (or `pointer_cancel`) in client
//! coordinates. At submission time [`AnnotationOverlay::label`] reports the
//! verdict for the box.
//!
//! ## Example
//!
//! ```
//! use smokelabel::{AnnotationOverlay, BoxMetadata, Container, OverlayConfig, Point};
//!
//! let meta = BoxMetadata {
//!     id: 9,
//!     source_width: 900.0,
//!     source_height: 900.0,
//!     x: 366.0,
//!     y: 96.0,
//!     w: 75.0,
//!     h: 123.0,
//!     feedback_code: None,
//! };
//! let mut overlay = AnnotationOverlay::attach(
//!     meta,
//!     Container::new(420.0, 420.0),
//!     OverlayConfig::default(),
//! );
//!
//! // Grab the body and move it 10px to the right
//! assert!(overlay.press(Point::new(200.0, 90.0)).is_some());
//! overlay.pointer_move(Point::new(210.0, 90.0));
//! overlay.pointer_up();
//!
//! assert!(overlay.interacted());
//! ```

use crate::{
    editor::{BoxGeometryEngine, EditorConfig, EngineState, Gesture, Handle},
    geometry::{
        BoxMetadata, Classification, Container, OverlayBox, Point, Size, SourceBox, to_overlay,
        to_source,
    },
    label::{LabelEntry, RelativeBoxes},
    resize::ContainerResizeAdapter,
};
use log::{debug, trace};
use serde::{Deserialize, Serialize};

/// Default border between the container edge and the image content.
pub const DEFAULT_BORDER: f64 = 20.0;

/// Default edge length of the square grip drawn on each handle.
pub const DEFAULT_HANDLE_SIZE: f64 = 12.0;

/// Which corner handles an overlay shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleSet {
    /// North-west and south-east only.
    Diagonal,
    /// All four corners.
    #[default]
    All,
}

impl HandleSet {
    pub fn handles(&self) -> &'static [Handle] {
        match self {
            HandleSet::Diagonal => &[Handle::NorthWest, Handle::SouthEast],
            HandleSet::All => Handle::all(),
        }
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.handles().contains(&handle)
    }
}

/// Behaviour flags for one overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayConfig {
    pub editor: EditorConfig,
    pub handles: HandleSet,
    /// Allow moving the whole box by grabbing its body.
    pub drag_enabled: bool,
    /// Hide handles and ignore every gesture.
    pub read_only: bool,
    /// Edge length of a handle's grip in container pixels.
    pub handle_size: f64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            editor: EditorConfig {
                border: DEFAULT_BORDER,
                ..Default::default()
            },
            handles: HandleSet::All,
            drag_enabled: true,
            read_only: false,
            handle_size: DEFAULT_HANDLE_SIZE,
        }
    }
}

/// What a pointer landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Handle(Handle),
    Body,
}

/// One overlay box bound to one [`BoxMetadata`].
#[derive(Debug, Clone)]
pub struct AnnotationOverlay {
    meta: BoxMetadata,
    container: Container,
    config: OverlayConfig,
    engine: BoxGeometryEngine,
    resize: ContainerResizeAdapter,
    interacted: bool,
    visible: bool,
}

impl AnnotationOverlay {
    /// Bind `meta` to a mounted container.
    pub fn attach(meta: BoxMetadata, container: Container, config: OverlayConfig) -> Self {
        let border = config.editor.border;
        let initial = to_overlay(&meta, &container, border);
        debug!("Attached box {} at {:?}", meta.id, initial);

        Self {
            engine: BoxGeometryEngine::new(config.editor, initial),
            resize: ContainerResizeAdapter::with_initial(border, container.size()),
            meta,
            container,
            config,
            interacted: false,
            visible: true,
        }
    }

    pub fn id(&self) -> i64 {
        self.meta.id
    }

    pub fn metadata(&self) -> &BoxMetadata {
        &self.meta
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    /// True once the user started any drag or resize on this box.
    pub fn interacted(&self) -> bool {
        self.interacted
    }

    pub fn current_box(&self) -> OverlayBox {
        self.engine.current()
    }

    pub fn state(&self) -> EngineState {
        self.engine.state()
    }

    /// Whether move and up events are being tracked for an active gesture.
    pub fn is_tracking(&self) -> bool {
        self.engine.is_active()
    }

    /// The live box converted back into source-media pixels.
    pub fn source_box(&self) -> SourceBox {
        to_source(
            &self.engine.current(),
            Size::new(self.meta.source_width, self.meta.source_height),
            &self.container,
            self.config.editor.border,
        )
    }

    pub fn classification(&self) -> Option<Classification> {
        self.meta.classification()
    }

    pub fn class_names(&self) -> &'static [&'static str] {
        self.classification().map_or(&[], |c| c.class_names())
    }

    /// Handles the host should draw. Empty when read-only or hidden.
    pub fn visible_handles(&self) -> &'static [Handle] {
        if self.config.read_only || !self.visible {
            &[]
        } else {
            self.config.handles.handles()
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Show or hide the box. A hidden box submits `false`.
    ///
    /// Hiding ends any active gesture.
    pub fn set_visible(&mut self, visible: bool) {
        if !visible {
            self.engine.end();
        }
        self.visible = visible;
    }

    pub fn toggle_visible(&mut self) -> bool {
        self.set_visible(!self.visible);
        self.visible
    }

    /// Classify a client-space pointer position.
    ///
    /// Handles take precedence over the body so a grip that overlaps the
    /// box edge still starts a resize.
    pub fn hit_test(&self, pointer: Point) -> Option<HitTarget> {
        if self.config.read_only || !self.visible {
            return None;
        }

        let local = Point::new(pointer.x - self.container.left, pointer.y - self.container.top);
        let bbox = self.engine.current();
        let half = self.config.handle_size / 2.0;

        let handle = self.config.handles.handles().iter().find(|handle| {
            let corner = handle.corner(&bbox);
            (local.x - corner.x).abs() <= half && (local.y - corner.y).abs() <= half
        });
        if let Some(handle) = handle {
            return Some(HitTarget::Handle(*handle));
        }

        if self.config.drag_enabled && bbox.contains(local) {
            Some(HitTarget::Body)
        } else {
            None
        }
    }

    /// Pointer or touch down on `target`.
    ///
    /// Returns `false` when the gesture is not allowed for this overlay or a
    /// gesture is already active.
    pub fn pointer_down(&mut self, target: HitTarget, pointer: Point) -> bool {
        if self.config.read_only || !self.visible {
            return false;
        }

        let gesture = match target {
            HitTarget::Body if self.config.drag_enabled => Gesture::Dragging,
            HitTarget::Handle(handle) if self.config.handles.contains(handle) => {
                Gesture::Resizing(handle)
            }
            _ => {
                trace!("Box {}: {:?} is not enabled", self.meta.id, target);
                return false;
            }
        };

        if !self.engine.begin(gesture, pointer, &self.container) {
            return false;
        }
        self.interacted = true;
        true
    }

    /// Hit-test `pointer` and start the matching gesture.
    pub fn press(&mut self, pointer: Point) -> Option<HitTarget> {
        let target = self.hit_test(pointer)?;
        self.pointer_down(target, pointer).then_some(target)
    }

    /// Pointer or touch move. Returns the new geometry while a gesture is
    /// active.
    pub fn pointer_move(&mut self, pointer: Point) -> Option<OverlayBox> {
        let bbox = self.engine.update(pointer, &self.container)?;
        self.interacted = true;
        Some(bbox)
    }

    /// Pointer up or touch end. Returns the committed geometry.
    pub fn pointer_up(&mut self) -> Option<OverlayBox> {
        let committed = self.engine.end();
        if let Some(bbox) = committed {
            debug!("Box {} committed at {:?}", self.meta.id, bbox);
        }
        committed
    }

    /// Touch cancel. Keeps the geometry reached so far.
    pub fn pointer_cancel(&mut self) -> Option<OverlayBox> {
        self.engine.end()
    }

    /// Replace the live geometry, as when replaying a recorded edit.
    ///
    /// Counts as an interaction. The geometry is normalized into the
    /// container.
    pub fn apply_edit(&mut self, bbox: OverlayBox) {
        let normalized = self.engine.normalized(&bbox, &self.container);
        self.engine.set_current(normalized);
        self.interacted = true;
    }

    /// Notify the overlay that its container changed size.
    ///
    /// Returns true when the box was rescaled.
    pub fn container_resized(&mut self, size: Size) -> bool {
        self.container.set_size(size);
        match self.resize.observe(size, &self.engine.current()) {
            Some(bbox) => {
                trace!("Box {} rescaled to {:?}", self.meta.id, bbox);
                self.engine.set_current(bbox);
                true
            }
            None => false,
        }
    }

    /// Notify the overlay that its container moved in client space.
    pub fn container_moved(&mut self, left: f64, top: f64) {
        self.container.left = left;
        self.container.top = top;
    }

    /// The label entry submitted for this box.
    pub fn label(&self) -> LabelEntry {
        let relative_boxes = if !self.visible {
            RelativeBoxes::NoBox
        } else if !self.interacted {
            RelativeBoxes::Accepted
        } else {
            RelativeBoxes::Edited(self.source_box())
        };

        LabelEntry {
            id: self.meta.id,
            relative_boxes,
        }
    }
}
