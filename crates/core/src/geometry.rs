//! Pointer-to-image-space geometry.
//!
//! A [`Point`] is a coordinate in image pixel space.  Pointer input
//! arrives in page coordinates; converting it to image space needs the
//! summed offsets of the canvas element's ancestor chain, the current
//! zoom scale, and the image bounds to clamp into.  The rendering layer
//! supplies those as plain numbers, keeping this module free of any DOM
//! or windowing types.

use serde::{Deserialize, Serialize};

/// A 2D coordinate in image pixel space.
///
/// Ephemeral value type: recreated per interaction, no identity beyond
/// its field values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Convert a pointer event position into image pixel space.
    ///
    /// * `page_x`/`page_y` - event position in page coordinates.
    /// * `origin_offsets`  - per-ancestor `(x, y)` offsets of the canvas
    ///   element; they are summed to locate the canvas origin on the page.
    /// * `scale`           - current zoom factor (image px -> screen px).
    /// * `x_max`/`y_max`   - inclusive clamp bounds in image pixels.
    ///
    /// The canvas-relative position is divided by `scale`, rounded to the
    /// nearest pixel, and clamped into `[0, x_max] x [0, y_max]`.
    pub fn from_pointer_event(
        page_x: f64,
        page_y: f64,
        origin_offsets: impl IntoIterator<Item = (f64, f64)>,
        scale: f64,
        x_max: i32,
        y_max: i32,
    ) -> Self {
        let (origin_x, origin_y) = origin_offsets
            .into_iter()
            .fold((0.0, 0.0), |(ax, ay), (ox, oy)| (ax + ox, ay + oy));

        let x = ((page_x - origin_x) / scale).round() as i32;
        let y = ((page_y - origin_y) / scale).round() as i32;

        Self {
            x: x.clamp(0, x_max),
            y: y.clamp(0, y_max),
        }
    }

    /// Value copy from another point.
    pub fn copy_from(&mut self, other: &Point) {
        self.x = other.x;
        self.y = other.y;
    }
}
