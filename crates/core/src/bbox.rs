//! Labeled axis-aligned bounding boxes.
//!
//! A [`BBox`] always satisfies `x1 <= x2` and `y1 <= y2`: construction
//! and [`set`](BBox::set) normalize the two corner inputs via min/max,
//! so callers may pass corners in any order.  The one deliberate
//! exception is [`resize`](BBox::resize), which moves a single corner
//! pair during a drag and leaves re-normalization to the commit path.

use serde::{Deserialize, Serialize};

use crate::draw::{validate_color_hex, DrawSurface};
use crate::error::CoreError;
use crate::geometry::Point;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Hit tolerance around a resize hotspot, in screen pixels (divided by
/// the zoom scale to get image pixels).
pub const HOTSPOT_TOLERANCE_PX: f64 = 4.0;

/// Side length of a drawn hotspot handle, in screen pixels.
pub const HOTSPOT_HANDLE_PX: f64 = 8.0;

/// Stroke width of a drawn box outline, in screen pixels.
pub const BOX_LINE_WIDTH_PX: f64 = 2.0;

/// Font size for the label text, in screen pixels.
pub const LABEL_FONT_PX: f64 = 12.0;

/// Fill color for the label background box.
pub const LABEL_BACKGROUND_COLOR: &str = "#000000C0";

/// Color for the label text itself.
pub const LABEL_TEXT_COLOR: &str = "#FFFFFF";

// ---------------------------------------------------------------------------
// Hotspot
// ---------------------------------------------------------------------------

/// The two draggable resize handles of a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Hotspot {
    /// The `(x1, y1)` corner.
    UpperLeft,
    /// The `(x2, y2)` corner.
    LowerRight,
}

// ---------------------------------------------------------------------------
// BBox
// ---------------------------------------------------------------------------

/// A labeled rectangle annotating an object in a frame.
///
/// Value object: identity is positional (index within a frame's box
/// list) and copies are freely made via `Clone`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    pub label: String,
}

impl BBox {
    /// Create a box from two corners in any order, normalizing so that
    /// `x1 <= x2` and `y1 <= y2`.
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32, label: impl Into<String>) -> Self {
        let mut bbox = Self {
            label: label.into(),
            ..Self::default()
        };
        bbox.set_corners(x1, y1, x2, y2);
        bbox
    }

    /// Replace all fields, normalizing the corners.
    pub fn set(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, label: impl Into<String>) {
        self.set_corners(x1, y1, x2, y2);
        self.label = label.into();
    }

    /// Replace just the corners, normalizing; the label is untouched.
    pub fn set_corners(&mut self, x1: i32, y1: i32, x2: i32, y2: i32) {
        self.x1 = x1.min(x2);
        self.x2 = x1.max(x2);
        self.y1 = y1.min(y2);
        self.y2 = y1.max(y2);
    }

    /// Copy the corner fields from another box, preserving this box's
    /// label.  Goes through [`set_corners`](Self::set_corners) so the
    /// result is normalized even if `other` was mid-resize.
    pub fn copy_corners_from(&mut self, other: &BBox) {
        self.set_corners(other.x1, other.y1, other.x2, other.y2);
    }

    /// Move one corner pair by a delta during a resize drag.
    ///
    /// Deliberately does not re-normalize: while a drag is in progress
    /// the corners may cross, and snapping them would make the handle
    /// jump under the pointer.  The commit path re-normalizes via
    /// [`copy_corners_from`](Self::copy_corners_from).
    pub fn resize(&mut self, hotspot: Hotspot, dx: i32, dy: i32) {
        match hotspot {
            Hotspot::UpperLeft => {
                self.x1 += dx;
                self.y1 += dy;
            }
            Hotspot::LowerRight => {
                self.x2 += dx;
                self.y2 += dy;
            }
        }
    }

    /// True iff the box has collapsed to a single point.
    pub fn is_empty(&self) -> bool {
        self.x1 == self.x2 && self.y1 == self.y2
    }

    /// Hit-test the resize hotspots at the current zoom scale.
    ///
    /// Returns the hotspot together with the corner-minus-point delta so
    /// that a resize drag does not snap the corner to the pointer.  The
    /// upper-left corner is tested first; for a degenerate near-empty box
    /// where both corners are within tolerance, upper-left wins.
    pub fn hit_resize_hotspot(&self, point: &Point, scale: f64) -> Option<(Hotspot, Point)> {
        let tolerance = HOTSPOT_TOLERANCE_PX / scale;

        let near = |cx: i32, cy: i32| {
            ((cx - point.x).abs() as f64) <= tolerance && ((cy - point.y).abs() as f64) <= tolerance
        };

        if near(self.x1, self.y1) {
            return Some((
                Hotspot::UpperLeft,
                Point::new(self.x1 - point.x, self.y1 - point.y),
            ));
        }
        if near(self.x2, self.y2) {
            return Some((
                Hotspot::LowerRight,
                Point::new(self.x2 - point.x, self.y2 - point.y),
            ));
        }
        None
    }

    /// Validate a label for use in the wire text format: commas and
    /// newlines would corrupt the record separators.
    pub fn validate_label(label: &str) -> Result<(), CoreError> {
        if label.contains(',') || label.contains('\n') {
            return Err(CoreError::Validation(format!(
                "Label '{label}' must not contain commas or newlines"
            )));
        }
        Ok(())
    }

    /// Draw the box outline, its two hotspot handles, and optionally the
    /// label, all sized inversely to `scale` so they stay a constant
    /// screen size while zooming.  The color must be `#RRGGBB` or
    /// `#RRGGBBAA` hex.
    pub fn draw(
        &self,
        surface: &mut dyn DrawSurface,
        scale: f64,
        draw_label: bool,
        color: &str,
    ) -> Result<(), CoreError> {
        validate_color_hex(color)?;
        let line_width = BOX_LINE_WIDTH_PX / scale;
        let handle = HOTSPOT_HANDLE_PX / scale;

        surface.stroke_rect(
            self.x1 as f64,
            self.y1 as f64,
            (self.x2 - self.x1) as f64,
            (self.y2 - self.y1) as f64,
            line_width,
            color,
        );

        // Square handles centered on the two defining corners.
        for (cx, cy) in [(self.x1, self.y1), (self.x2, self.y2)] {
            surface.fill_rect(
                cx as f64 - handle / 2.0,
                cy as f64 - handle / 2.0,
                handle,
                handle,
                color,
            );
        }

        if draw_label && !self.label.is_empty() {
            let font = LABEL_FONT_PX / scale;
            let pad = font * 0.25;
            let text_w = surface.text_width(&self.label, font);

            surface.fill_rect(
                self.x1 as f64,
                self.y1 as f64 - font - 2.0 * pad,
                text_w + 2.0 * pad,
                font + 2.0 * pad,
                LABEL_BACKGROUND_COLOR,
            );
            surface.fill_text(
                &self.label,
                self.x1 as f64 + pad,
                self.y1 as f64 - pad,
                font,
                LABEL_TEXT_COLOR,
            );
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
