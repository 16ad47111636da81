//! Full-surface solid paint

use super::Case;
use crate::backend::{Color, Operator, Surface};
use crate::core::error::HarnessResult;

const COLORS: [Color; 2] = [Color::rgb(0x20, 0x40, 0x80), Color::rgb(0x80, 0x40, 0x20)];

/// Paints the whole surface with an opaque color, alternating between two
/// colors so no iteration is a redundant store of identical pixels.
#[derive(Debug, Default)]
pub struct PaintCase {
    flip: usize,
}

impl PaintCase {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Case for PaintCase {
    fn name(&self) -> &str {
        "paint"
    }

    fn min_size(&self) -> u32 {
        32
    }

    fn max_size(&self) -> u32 {
        512
    }

    fn setup(&mut self, surface: &mut dyn Surface, _size: u32) -> HarnessResult<()> {
        self.flip = 0;
        surface.paint(Color::rgb(0, 0, 0), Operator::Source);
        Ok(())
    }

    fn run(&mut self, surface: &mut dyn Surface) {
        self.flip ^= 1;
        surface.paint(COLORS[self.flip], Operator::Source);
        surface.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Content, ImageSurface};

    #[test]
    fn test_paint_alternates_colors() {
        let mut surface = ImageSurface::new(4, 4, Content::Color).unwrap();
        let mut case = PaintCase::new();
        case.setup(&mut surface, 4).unwrap();

        case.run(&mut surface);
        let first = surface.pixel(0, 0).to_vec();
        case.run(&mut surface);
        assert_ne!(surface.pixel(0, 0), first.as_slice());
        assert_eq!(surface.pixel(3, 3), surface.pixel(0, 0));
    }
}
