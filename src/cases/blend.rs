//! Translucent source-over blending

use super::Case;
use crate::backend::{Color, Content, Operator, Rect, Surface};
use crate::core::error::{HarnessError, HarnessResult};

/// Composites a half-transparent color over a background of vertical stripes.
///
/// Color blending is meaningless on alpha-only masks, so the case declines
/// those targets.
#[derive(Debug, Default)]
pub struct BlendCase;

impl BlendCase {
    pub fn new() -> Self {
        Self
    }
}

impl Case for BlendCase {
    fn name(&self) -> &str {
        "blend"
    }

    fn min_size(&self) -> u32 {
        32
    }

    fn max_size(&self) -> u32 {
        256
    }

    fn supports(&self, content: Content) -> bool {
        content.has_color()
    }

    fn setup(&mut self, surface: &mut dyn Surface, size: u32) -> HarnessResult<()> {
        if !self.supports(surface.content()) {
            return Err(HarnessError::UnsupportedCase {
                case: self.name().to_string(),
                target: surface.content().to_string(),
            });
        }

        let stripe = (size / 8).max(1);
        let mut x = 0;
        let mut dark = true;
        while x < surface.width() {
            let shade = if dark { 0x30 } else { 0xc0 };
            surface.fill_rect(
                Rect::new(x, 0, stripe, surface.height()),
                Color::rgb(shade, shade, shade),
                Operator::Source,
            );
            x += stripe;
            dark = !dark;
        }
        Ok(())
    }

    fn run(&mut self, surface: &mut dyn Surface) {
        surface.paint(Color::rgba(0xe0, 0x30, 0x10, 0x80), Operator::Over);
        surface.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ImageSurface;

    #[test]
    fn test_declines_alpha_only_surfaces() {
        let mut case = BlendCase::new();
        assert!(!case.supports(Content::Alpha));

        let mut mask = ImageSurface::new(8, 8, Content::Alpha).unwrap();
        assert!(matches!(
            case.setup(&mut mask, 8),
            Err(HarnessError::UnsupportedCase { .. })
        ));
    }

    #[test]
    fn test_setup_draws_stripes() {
        let mut case = BlendCase::new();
        let mut surface = ImageSurface::new(16, 16, Content::Color).unwrap();
        case.setup(&mut surface, 16).unwrap();
        assert_eq!(surface.pixel(0, 0)[0], 0x30);
        assert_eq!(surface.pixel(2, 0)[0], 0xc0);

        case.run(&mut surface);
        assert_ne!(surface.pixel(0, 0)[0], 0x30);
    }
}
