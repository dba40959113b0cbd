// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Smokelabel Contributors. All Rights Reserved.

//! Coordinate conversion between source-media pixels and overlay pixels.
//!
//! ## Coordinate Systems
//!
//! - **Source media**: pixel coordinates of the original video frame or image,
//!   top-left origin, as sent by the server in the `*_bbox` fields.
//! - **Overlay**: pixel coordinates relative to the hosting container, offset
//!   by a constant border on every side. The image content occupies
//!   `[border, border + container.width]` horizontally and
//!   `[border, border + container.height]` vertically.
//!
//! All functions here are pure. Degenerate sizes map to `0` rather than
//! producing NaN or infinity.

use serde::{Deserialize, Serialize};

// =============================================================================
// Types
// =============================================================================

/// A point in client or container pixel space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Width and height of a container's content area.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// The host element an overlay box is drawn in.
///
/// `width` and `height` are the content size. `left` and `top` locate the
/// element's bounding rectangle in client space; they are only used to clamp
/// pointer coordinates. The bounding rectangle extends `border` beyond the
/// content on every side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Container {
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Container {
    /// Container whose bounding rectangle sits at the client origin.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width,
            height,
        }
    }

    /// Container whose bounding rectangle sits at `(left, top)` in client space.
    pub fn at(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn set_size(&mut self, size: Size) {
        self.width = size.width;
        self.height = size.height;
    }

    /// Clamp a client-space pointer position to the bounding rectangle.
    pub fn constrain(&self, pointer: Point, border: f64) -> Point {
        let right = self.left + self.width + 2.0 * border;
        let bottom = self.top + self.height + 2.0 * border;
        Point::new(
            clamp(pointer.x, self.left, right),
            clamp(pointer.y, self.top, bottom),
        )
    }
}

/// A bounding box in container pixel space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OverlayBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl OverlayBox {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left
            && point.x <= self.right()
            && point.y >= self.top
            && point.y <= self.bottom()
    }

    /// Returns true when every edge is within `tolerance` of `other`.
    pub fn approx_eq(&self, other: &OverlayBox, tolerance: f64) -> bool {
        (self.left - other.left).abs() <= tolerance
            && (self.top - other.top).abs() <= tolerance
            && (self.width - other.width).abs() <= tolerance
            && (self.height - other.height).abs() <= tolerance
    }
}

/// Presentation tag describing who provided a box.
///
/// Never affects coordinate math.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    /// Label provided by a researcher.
    Researcher,
    /// Gold standard label, a researcher label used for quality checks.
    GoldStandard,
}

impl Classification {
    /// Map a server feedback code to a classification.
    ///
    /// Codes 3, 4 and 5 are researcher labels; 16, 17 and 18 are gold
    /// standards. Anything else is an ordinary model proposal.
    pub fn from_feedback_code(code: i32) -> Option<Self> {
        match code {
            3..=5 => Some(Classification::Researcher),
            16..=18 => Some(Classification::GoldStandard),
            _ => None,
        }
    }

    /// CSS-style class names the host attaches to the rendered box.
    pub fn class_names(&self) -> &'static [&'static str] {
        match self {
            Classification::Researcher => &["researcher"],
            Classification::GoldStandard => &["researcher", "gold-standard"],
        }
    }
}

/// Bounding box metadata as delivered with a label batch.
///
/// Coordinates are in source-media pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxMetadata {
    /// Server identifier, echoed back in the label payload.
    pub id: i64,
    /// Source media width in pixels.
    #[serde(rename = "w_image")]
    pub source_width: f64,
    /// Source media height in pixels.
    #[serde(rename = "h_image")]
    pub source_height: f64,
    #[serde(rename = "x_bbox")]
    pub x: f64,
    #[serde(rename = "y_bbox")]
    pub y: f64,
    #[serde(rename = "w_bbox")]
    pub w: f64,
    #[serde(rename = "h_bbox")]
    pub h: f64,
    /// Provenance code; see [`Classification::from_feedback_code`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_code: Option<i32>,
}

impl BoxMetadata {
    pub fn classification(&self) -> Option<Classification> {
        self.feedback_code.and_then(Classification::from_feedback_code)
    }

    /// Returns true when the box lies inside the source media.
    pub fn is_normalized(&self) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.x + self.w <= self.source_width
            && self.y + self.h <= self.source_height
    }
}

/// A box in source-media pixels, rounded to whole pixels.
///
/// Serialized with the server's `*_bbox` field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceBox {
    #[serde(rename = "x_bbox")]
    pub x: i64,
    #[serde(rename = "y_bbox")]
    pub y: i64,
    #[serde(rename = "w_bbox")]
    pub w: i64,
    #[serde(rename = "h_bbox")]
    pub h: i64,
}

// =============================================================================
// Conversion
// =============================================================================

/// Convert source-media box metadata into overlay coordinates.
///
/// # Example
/// ```
/// use smokelabel::{BoxMetadata, Container, to_overlay};
///
/// let meta = BoxMetadata {
///     id: 1,
///     source_width: 900.0,
///     source_height: 900.0,
///     x: 366.0,
///     y: 96.0,
///     w: 75.0,
///     h: 123.0,
///     feedback_code: None,
/// };
/// let overlay = to_overlay(&meta, &Container::new(420.0, 420.0), 20.0);
/// assert!((overlay.left - 190.8).abs() < 1e-9);
/// assert!((overlay.height - 57.4).abs() < 1e-9);
/// ```
pub fn to_overlay(meta: &BoxMetadata, container: &Container, border: f64) -> OverlayBox {
    let sx = ratio(container.width, meta.source_width);
    let sy = ratio(container.height, meta.source_height);

    OverlayBox {
        left: border + meta.x * sx,
        top: border + meta.y * sy,
        width: meta.w * sx,
        height: meta.h * sy,
    }
}

/// Convert an overlay box back into source-media pixels.
///
/// Each coordinate is rounded to the nearest integer. Since the result is an
/// integer, a rounding artifact of `-0` becomes `0`.
pub fn to_source(
    overlay: &OverlayBox,
    source: Size,
    container: &Container,
    border: f64,
) -> SourceBox {
    let sx = ratio(source.width, container.width);
    let sy = ratio(source.height, container.height);

    SourceBox {
        x: round_pixel((overlay.left - border) * sx),
        y: round_pixel((overlay.top - border) * sy),
        w: round_pixel(overlay.width * sx),
        h: round_pixel(overlay.height * sy),
    }
}

/// Clamp `value` into `[lo, hi]`, favouring `lo` when the range is empty.
pub(crate) fn clamp(value: f64, lo: f64, hi: f64) -> f64 {
    value.min(hi).max(lo)
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 && denominator.is_finite() {
        numerator / denominator
    } else {
        0.0
    }
}

fn round_pixel(value: f64) -> i64 {
    if !value.is_finite() {
        return 0;
    }
    // -0.0 casts to 0
    value.round() as i64
}
