//! Rendering-surface seam.
//!
//! Box drawing is parameterized over [`DrawSurface`], a minimal
//! canvas-like 2D interface, so the geometry code never touches a real
//! canvas, GPU surface, or DOM.  The UI layer implements this trait for
//! whatever it renders with; [`RecordingSurface`] is a ready-made
//! implementation that records calls for assertions in tests.

use crate::error::CoreError;

/// Minimal 2D drawing interface for box overlays.
///
/// Coordinates are in image pixel space; the implementation applies the
/// view transform.  Colors are `#RRGGBB` or `#RRGGBBAA` strings.
pub trait DrawSurface {
    /// Stroke the outline of a rectangle.
    fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64, line_width: f64, color: &str);

    /// Fill a rectangle.
    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: &str);

    /// Draw text with its baseline-left anchor at `(x, y)`.
    fn fill_text(&mut self, text: &str, x: f64, y: f64, font_px: f64, color: &str);

    /// Width the given text would occupy at `font_px`, in image pixels.
    fn text_width(&mut self, text: &str, font_px: f64) -> f64;
}

/// Validate that a color string matches `#RRGGBB` or `#RRGGBBAA` hex format.
pub fn validate_color_hex(color: &str) -> Result<(), CoreError> {
    let valid_length = color.len() == 7 || color.len() == 9;

    if !valid_length {
        return Err(CoreError::Validation(format!(
            "Invalid color '{color}'. Must be in #RRGGBB or #RRGGBBAA hex format"
        )));
    }

    if !color.starts_with('#') {
        return Err(CoreError::Validation(format!(
            "Invalid color '{color}'. Must start with '#'"
        )));
    }

    let hex_part = &color[1..];
    if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(CoreError::Validation(format!(
            "Invalid color '{color}'. Must contain only hex digits after '#'"
        )));
    }

    Ok(())
}

/// One recorded drawing operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    StrokeRect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        line_width: f64,
        color: String,
    },
    FillRect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        color: String,
    },
    FillText {
        text: String,
        x: f64,
        y: f64,
        font_px: f64,
        color: String,
    },
}

/// A [`DrawSurface`] that records every call.  Text is measured at a
/// fixed advance of 0.6 em per character.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub calls: Vec<DrawCall>,
}

impl DrawSurface for RecordingSurface {
    fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64, line_width: f64, color: &str) {
        self.calls.push(DrawCall::StrokeRect {
            x,
            y,
            w,
            h,
            line_width,
            color: color.to_string(),
        });
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: &str) {
        self.calls.push(DrawCall::FillRect {
            x,
            y,
            w,
            h,
            color: color.to_string(),
        });
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, font_px: f64, color: &str) {
        self.calls.push(DrawCall::FillText {
            text: text.to_string(),
            x,
            y,
            font_px,
            color: color.to_string(),
        });
    }

    fn text_width(&mut self, text: &str, font_px: f64) -> f64 {
        text.chars().count() as f64 * font_px * 0.6
    }
}
