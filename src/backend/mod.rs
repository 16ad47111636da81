//! Rendering targets under test
//!
//! The runner only sees the [`Target`] and [`Surface`] traits. Each target
//! knows how to build a surface of a given size and how to tear it down;
//! cases draw through the surface's primitives.
//!
//! ## Targets
//!
//! - **image.rgb**: in-memory 32-bit xRGB raster
//! - **image.argb**: in-memory 32-bit premultiplied ARGB raster
//! - **image.a8**: in-memory 8-bit alpha mask

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::error::HarnessResult;

pub mod image;

pub use image::{ImageSurface, ImageTarget};

// ============================================================================
// Types
// ============================================================================

/// Channels a surface stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Content {
    /// Color channels only
    Color,
    /// Color channels plus alpha
    ColorAlpha,
    /// Alpha only (masks)
    Alpha,
}

impl Content {
    /// Whether the surface stores color channels.
    pub fn has_color(&self) -> bool {
        !matches!(self, Content::Alpha)
    }

    /// Bytes per pixel in the raster layout.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            Content::Color | Content::ColorAlpha => 4,
            Content::Alpha => 1,
        }
    }
}

impl fmt::Display for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Content::Color => write!(f, "rgb"),
            Content::ColorAlpha => write!(f, "argb"),
            Content::Alpha => write!(f, "a8"),
        }
    }
}

/// Non-premultiplied 8-bit color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 0xff)
    }
}

/// Integer pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }
}

/// Compositing operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Replace destination
    Source,
    /// Porter-Duff source-over
    Over,
}

// ============================================================================
// Traits
// ============================================================================

/// A drawable surface owned by a single session.
pub trait Surface {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    fn content(&self) -> Content;

    /// Fill a rectangle, clipped to the surface bounds.
    fn fill_rect(&mut self, rect: Rect, color: Color, op: Operator);

    /// Fill the whole surface.
    fn paint(&mut self, color: Color, op: Operator) {
        let rect = Rect::new(0, 0, self.width(), self.height());
        self.fill_rect(rect, color, op);
    }

    /// Complete any deferred rendering.
    fn flush(&mut self) {}
}

/// A rendering backend configuration under test.
pub trait Target {
    /// Unique name used in reports and filters.
    fn name(&self) -> &str;

    /// Content kind of every surface this target creates.
    fn content(&self) -> Content;

    /// Build a surface of the given size.
    ///
    /// Returns `AllocationFailure` when backing storage cannot be obtained.
    fn create_surface(&self, width: u32, height: u32) -> HarnessResult<Box<dyn Surface>>;

    /// Release backend resources held by `surface`. Called exactly once per
    /// created surface, on every exit path; the box is dropped afterwards.
    fn destroy_surface(&self, surface: &mut dyn Surface) {
        surface.flush();
    }
}

/// Built-in targets in registration order.
pub fn registry() -> Vec<Box<dyn Target>> {
    vec![
        Box::new(ImageTarget::new("image.rgb", Content::Color)),
        Box::new(ImageTarget::new("image.argb", Content::ColorAlpha)),
        Box::new(ImageTarget::new("image.a8", Content::Alpha)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_order_and_names() {
        let names: Vec<String> = registry().iter().map(|t| t.name().to_string()).collect();
        assert_eq!(names, vec!["image.rgb", "image.argb", "image.a8"]);
    }

    #[test]
    fn test_content_layout() {
        assert_eq!(Content::ColorAlpha.bytes_per_pixel(), 4);
        assert_eq!(Content::Alpha.bytes_per_pixel(), 1);
        assert!(!Content::Alpha.has_color());
        assert_eq!(Content::ColorAlpha.to_string(), "argb");
    }
}
